use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    models::{Role, UploadKind},
};

/// Presigned URLs expire after ten minutes.
const PRESIGN_TTL: Duration = Duration::from_secs(600);

pub const ATTACHMENT_PREFIX: &str = "attachments";
pub const IMAGE_PREFIX: &str = "images";
const IMAGE_CONTENT_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// StorageService
///
/// Object storage for travel-order attachments, signatures and profile images.
/// Swapped for `MockStorageService` in tests.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Only called in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// Signed PUT URL; the upload must use `content_type`.
    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> Result<String, String>;

    /// Signed GET URL for an existing object.
    async fn get_presigned_download_url(&self, key: &str) -> Result<String, String>;
}

/// S3StorageClient
///
/// AWS SDK client pointed at any S3-compatible endpoint (MinIO locally).
/// Path-style addressing is forced for MinIO compatibility.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Builds the S3 client from the storage settings in `AppConfig`. Works against
    /// AWS S3 in production and the dockerized MinIO locally.
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        // 1. Static credentials from the environment; no provider chain lookup.
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        // 2. Client configuration.

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            // Path-style addressing (http://endpoint/bucket/key). MinIO requires it;
            // virtual-host style would need per-bucket DNS.
            .force_path_style(true)
            .build();

        // 3. The client itself is cheap to clone and shared for the process lifetime.

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// ensure_bucket_exists
    ///
    /// CreateBucket at startup (local only). An existing bucket is not an error.
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self.client.create_bucket().bucket(&self.bucket_name).send().await {
            // Already-exists is the common case on restart.
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
    }

    /// get_presigned_upload_url
    ///
    /// Short-lived PUT URL. The browser uploads straight to the bucket, so files never
    /// pass through this service; the signed content type must match the upload.
    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(PRESIGN_TTL).map_err(|e| e.to_string())?;
        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }

    /// get_presigned_download_url
    ///
    /// Short-lived GET URL. Callers check `can_read_object` first.
    async fn get_presigned_download_url(&self, key: &str) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(PRESIGN_TTL).map_err(|e| e.to_string())?;
        let presigned_req = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a client-supplied key cannot escape its prefix.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// object_key_for
///
/// Builds the storage key for a new upload. Attachments live under the uploader's id;
/// images live under the uploader's role. Returns `None` when `content_type` is not
/// allowed for `kind`.
pub fn object_key_for(
    kind: UploadKind,
    user: &AuthUser,
    filename: &str,
    content_type: &str,
) -> Option<String> {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    let unique_id = Uuid::new_v4();

    match kind {
        UploadKind::Attachment => Some(format!(
            "{ATTACHMENT_PREFIX}/{}/{unique_id}.{extension}",
            user.id
        )),
        UploadKind::Image if IMAGE_CONTENT_TYPES.contains(&content_type) => Some(format!(
            "{IMAGE_PREFIX}/{}/{unique_id}.{extension}",
            user.role.as_str().to_lowercase()
        )),
        UploadKind::Image => None,
    }
}

/// can_read_object
///
/// Attachments are readable by their owner and by reviewers (signatories, admins);
/// images by any signed-in user. Keys outside both prefixes are never readable.
pub fn can_read_object(key: &str, user: &AuthUser) -> bool {
    let mut segments = key.split('/');
    match (segments.next(), segments.next()) {
        (Some(ATTACHMENT_PREFIX), Some(owner)) => {
            user.role != Role::Client || owner == user.id.to_string()
        }
        (Some(IMAGE_PREFIX), Some(_)) => true,
        _ => false,
    }
}

/// MockStorageService
///
/// In-memory stand-in for tests. Produces deterministic local URLs.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn get_presigned_upload_url(&self, key: &str, _content_type: &str) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake&method=put",
            sanitize_key(key)
        ))
    }

    async fn get_presigned_download_url(&self, key: &str) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake&method=get",
            sanitize_key(key)
        ))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
