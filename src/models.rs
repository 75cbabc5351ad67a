use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Role Taxonomy ---

/// Role
///
/// The closed set of roles an account can hold. Every authenticated request carries
/// exactly one of these; the access gate and the landing table both key off this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Role {
    Client,
    Signatory,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Client, Role::Signatory, Role::Admin];

    /// Parses the stored textual form (`CLIENT`, `SIGNATORY`, `ADMIN`).
    /// Anything else is `None`, which callers must treat as "no role".
    pub fn parse(raw: &str) -> Option<Role> {
        match raw {
            "CLIENT" => Some(Role::Client),
            "SIGNATORY" => Some(Role::Signatory),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "CLIENT",
            Role::Signatory => "SIGNATORY",
            Role::Admin => "ADMIN",
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Raw row from the `users` table. The role is kept as stored text so that a
/// corrupted or legacy value is caught by `Role::parse` instead of failing the decode.
/// Never serialized: outbound payloads go through `UserProfile`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub station_id: Option<Uuid>,
    pub position_designation: Option<String>,
    // S3 keys for uploaded images.
    pub signature: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Station
///
/// A permanent station (office unit) an employee is assigned to.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Station {
    pub id: Uuid,
    pub unit: String,
}

/// TravelOrder
///
/// A submitted travel order from the `travel_orders` table. Approval is a two-step
/// signature chain: recommending approval first, then final approval.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct TravelOrder {
    pub id: Uuid,
    // Human-facing reference, e.g. `TO-07-03-25-QK`.
    pub code: String,
    pub user_id: Uuid,
    pub purpose: String,
    pub host: String,
    pub inclusive_dates: String,
    pub destination: String,
    pub fund_source: String,
    // S3 key of the supporting document.
    pub attached_file: String,
    pub additional_participants: String,
    pub is_recommending_approval_signed: bool,
    pub is_final_approval_signed: bool,
    pub is_disapproved: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// TravelOrderStatus
///
/// Derived view of the signature flags, used by the signatory queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TravelOrderStatus {
    Pending,
    Recommended,
    Approved,
    Disapproved,
}

/// ReviewAction
///
/// What a signatory does to a travel order (PUT /signatory/travel-orders/{id}/review).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ReviewAction {
    Approve,
    Disapprove,
}

/// The signature flags a review leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureState {
    pub recommending: bool,
    pub final_approval: bool,
    pub disapproved: bool,
}

impl TravelOrder {
    pub fn status(&self) -> TravelOrderStatus {
        if self.is_disapproved {
            TravelOrderStatus::Disapproved
        } else if self.is_final_approval_signed {
            TravelOrderStatus::Approved
        } else if self.is_recommending_approval_signed {
            TravelOrderStatus::Recommended
        } else {
            TravelOrderStatus::Pending
        }
    }

    pub fn signatures(&self) -> SignatureState {
        SignatureState {
            recommending: self.is_recommending_approval_signed,
            final_approval: self.is_final_approval_signed,
            disapproved: self.is_disapproved,
        }
    }

    /// Computes the flags after `action`. Returns `None` once the order is closed
    /// (fully approved or disapproved); closed orders cannot be reviewed again.
    pub fn review(&self, action: ReviewAction) -> Option<SignatureState> {
        let current = self.signatures();
        match (self.status(), action) {
            (TravelOrderStatus::Approved | TravelOrderStatus::Disapproved, _) => None,
            (_, ReviewAction::Disapprove) => Some(SignatureState {
                disapproved: true,
                ..current
            }),
            (TravelOrderStatus::Pending, ReviewAction::Approve) => Some(SignatureState {
                recommending: true,
                ..current
            }),
            (TravelOrderStatus::Recommended, ReviewAction::Approve) => Some(SignatureState {
                final_approval: true,
                ..current
            }),
        }
    }
}

/// generate_travel_order_code
///
/// Builds the `TO-DD-MM-YY-XX` reference. `entropy` supplies the two trailing letters;
/// each byte is folded into `A..=Z`.
pub fn generate_travel_order_code(now: DateTime<Utc>, entropy: [u8; 2]) -> String {
    let letters: String = entropy
        .iter()
        .map(|b| char::from(b'A' + (b % 26)))
        .collect();
    format!(
        "TO-{:02}-{:02}-{:02}-{}",
        now.day(),
        now.month(),
        now.year() % 100,
        letters
    )
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(email(message = "Email is required."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// RegisterRequest
///
/// Input payload for POST /auth/register. Self-registered accounts are always CLIENT.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[validate(email(message = "Email is required."))]
    pub email: String,
    #[validate(length(min = 6, message = "Minimum of 6 characters required."))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
}

/// AddUserRequest
///
/// Input payload for POST /users (admin-only account creation).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct AddUserRequest {
    #[validate(length(min = 5, message = "Name must be at least 5 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub station_id: Uuid,
    pub role: Role,
    #[validate(length(min = 1, message = "Position/Designation is required."))]
    pub position_designation: String,
    #[serde(default)]
    pub signature: Option<String>,
}

/// NewUser
///
/// Repository-level insert payload; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub station_id: Option<Uuid>,
    pub position_designation: Option<String>,
    pub signature: Option<String>,
}

/// SettingsRequest
///
/// Partial profile update (PUT /settings). Changing the password needs both the
/// current `password` and the `new_password`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[validate(schema(function = "validate_password_pair"))]
#[ts(export)]
pub struct SettingsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Email is required."))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 6, message = "Minimum of 6 characters required."))]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 6, message = "Minimum of 6 characters required."))]
    pub new_password: Option<String>,
}

fn validate_password_pair(req: &SettingsRequest) -> Result<(), ValidationError> {
    match (&req.password, &req.new_password) {
        (Some(_), None) => {
            Err(ValidationError::new("new_password").with_message("New password is required!".into()))
        }
        (None, Some(_)) => {
            Err(ValidationError::new("password").with_message("Old password is required!".into()))
        }
        _ => Ok(()),
    }
}

/// UserUpdate
///
/// Repository-level partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

/// TravelOrderRequest
///
/// Input payload for POST /client/travel-orders. The attached file is the S3 key
/// returned by the presigned upload flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct TravelOrderRequest {
    #[serde(default)]
    pub additional_participants: Option<String>,
    #[validate(length(min = 1, message = "Purpose is required."))]
    pub purpose: String,
    #[validate(length(min = 1, message = "Host is required."))]
    pub host: String,
    #[validate(length(min = 1, message = "Inclusive Dates is required."))]
    pub inclusive_dates: String,
    #[validate(length(min = 1, message = "Destination is required."))]
    pub destination: String,
    #[validate(length(min = 1, message = "Fund Source is required."))]
    pub fund_source: String,
    #[validate(length(min = 1, message = "Please attach a file."))]
    pub attached_file: String,
}

/// NewTravelOrder
///
/// Repository-level insert payload with the generated code and owner resolved.
#[derive(Debug, Clone)]
pub struct NewTravelOrder {
    pub code: String,
    pub user_id: Uuid,
    pub request: TravelOrderRequest,
}

/// ReviewRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReviewRequest {
    pub action: ReviewAction,
}

/// UploadKind
///
/// Selects the bucket prefix and the content-type policy for a presigned upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UploadKind {
    #[default]
    Attachment,
    Image,
}

/// PresignedUrlRequest
///
/// Input payload for requesting a short-lived S3 upload URL (POST /upload/presigned).
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlRequest {
    #[schema(example = "itinerary.pdf")]
    pub filename: String,
    #[schema(example = "application/pdf")]
    pub file_type: String,
    #[serde(default)]
    pub kind: UploadKind,
}

/// PresignedUrlResponse
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct PresignedUrlResponse {
    /// The time-limited URL for the PUT (upload) or GET (download) request.
    pub url: String,
    /// The S3 object key; stored on the travel order or user record.
    pub resource_key: String,
}

// --- Output Schemas ---

/// UserProfile
///
/// Outbound view of a `User`. Construction fails for rows whose role text is not
/// one of the known roles, so such accounts never leak with a guessed role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub station_id: Option<Uuid>,
    pub position_designation: Option<String>,
    pub signature: Option<String>,
    pub image: Option<String>,
}

impl TryFrom<User> for UserProfile {
    type Error = String;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        let role = Role::parse(&user.role)
            .ok_or_else(|| format!("user {} has unrecognized role {:?}", user.id, user.role))?;
        Ok(UserProfile {
            id: user.id,
            name: user.name,
            email: user.email,
            role,
            station_id: user.station_id,
            position_designation: user.position_designation,
            signature: user.signature,
            image: user.image,
        })
    }
}

/// LoginResponse
///
/// Returned by POST /auth/login. `redirect_to` is the landing path for the user's role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub success: String,
    pub redirect_to: String,
}

/// MessageResponse
///
/// Generic `{ "success": "..." }` acknowledgement used by the form endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub success: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: message.into(),
        }
    }
}

/// SessionResponse
///
/// Body of GET /api/auth/session; `user` is `null` for anonymous callers.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub user: Option<UserProfile>,
}

/// TravelOrderView
///
/// A travel order with its derived status, as shown in the client and signatory queues.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TravelOrderView {
    #[serde(flatten)]
    pub order: TravelOrder,
    pub status: TravelOrderStatus,
}

impl From<TravelOrder> for TravelOrderView {
    fn from(order: TravelOrder) -> Self {
        let status = order.status();
        TravelOrderView { order, status }
    }
}
