use crate::{
    AppState,
    auth::{self, AuthUser, MaybeAuthUser, SESSION_COOKIE},
    config::Env,
    error::{ApiError, ApiResult},
    models::{
        self, AddUserRequest, LoginRequest, LoginResponse, MessageResponse, NewTravelOrder,
        NewUser, PresignedUrlRequest, PresignedUrlResponse, RegisterRequest, ReviewRequest, Role,
        SessionResponse, SettingsRequest, Station, TravelOrderRequest, TravelOrderView, User,
        UserProfile, UserUpdate,
    },
    storage,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

// --- Query Structs ---

/// AuthErrorQuery
///
/// Query parameters of GET /auth/error.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct AuthErrorQuery {
    /// Machine-readable error code set by the page that redirected here.
    pub error: Option<String>,
}

/// DownloadQuery
///
/// Query parameters of GET /upload/presigned.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct DownloadQuery {
    /// The S3 object key previously returned by an upload.
    pub key: String,
}

// --- Helpers ---

async fn load_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found!".to_string()))
}

fn to_profile(user: User) -> ApiResult<UserProfile> {
    UserProfile::try_from(user).map_err(ApiError::Internal)
}

// --- Public ---

/// index
///
/// [Public Route] Service banner; doubles as the load balancer health check.
#[utoipa::path(get, path = "/", responses((status = 200, description = "Service is up")))]
pub async fn index() -> Json<Value> {
    Json(json!({ "service": "etravel-order", "status": "ok" }))
}

// --- Auth Routes ---

/// login
///
/// [Auth Route] Verifies credentials, sets the session cookie and returns the
/// landing path for the user's role.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    payload.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid credentials!".to_string());
    let Some(user) = state.repo.get_user_by_email(&payload.email).await? else {
        // Same hashing cost as a wrong password for a real account.
        auth::verify_dummy_password(&payload.password);
        return Err(invalid());
    };

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(invalid());
    }

    // No session for accounts the gate could never resolve.
    let Some(role) = Role::parse(&user.role) else {
        tracing::warn!(user_id = %user.id, role = %user.role, "login refused: unrecognized role");
        return Err(ApiError::Forbidden("Account has no assigned role!".to_string()));
    };

    let token = auth::issue_token(
        user.id,
        &state.config.session_secret,
        state.config.session_ttl_secs,
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;

    let secure = state.config.env == Env::Production;
    let redirect_to = state.policy.landing().landing_for(Some(role)).to_string();

    tracing::info!(user_id = %user.id, role = role.as_str(), "user logged in");

    Ok((
        jar.add(auth::session_cookie(token, secure)),
        Json(LoginResponse {
            success: "Logged in!".to_string(),
            redirect_to,
        }),
    ))
}

/// register
///
/// [Auth Route] Self-service sign-up. New accounts are always CLIENT.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    payload.validate()?;

    if state.repo.get_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists!".to_string()));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            role: Role::Client,
            station_id: None,
            position_designation: None,
            signature: None,
        })
        .await
        .map_err(|e| ApiError::conflict_on_unique(e, "Email already exists!"))?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(MessageResponse::new("User created!"))))
}

/// auth_error
///
/// [Auth Route] Landing spot for failed sign-in flows; turns an error code into a message.
#[utoipa::path(
    get,
    path = "/auth/error",
    params(AuthErrorQuery),
    responses((status = 200, description = "Error description"))
)]
pub async fn auth_error(Query(query): Query<AuthErrorQuery>) -> Json<Value> {
    let message = match query.error.as_deref() {
        Some("CredentialsSignin") => "Invalid credentials!",
        Some("AccessDenied") => "Access denied!",
        Some("SessionExpired") => "Your session has expired. Please log in again.",
        _ => "Oops! Something went wrong!",
    };
    Json(json!({ "error": message }))
}

// --- API Auth Routes ---

/// get_session
///
/// [API Auth Route] The current session's user, or `null`.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses((status = 200, description = "Session", body = SessionResponse))
)]
pub async fn get_session(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<SessionResponse>> {
    let user = match user {
        Some(AuthUser { id, .. }) => match state.repo.get_user(id).await? {
            Some(row) => Some(to_profile(row)?),
            None => None,
        },
        None => None,
    };
    Ok(Json(SessionResponse { user }))
}

/// sign_out
///
/// [API Auth Route] Clears the session cookie. Idempotent.
#[utoipa::path(
    post,
    path = "/api/auth/signout",
    responses((status = 200, description = "Signed out", body = MessageResponse))
)]
pub async fn sign_out(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse::new("Signed out!")),
    )
}

// --- Authenticated Routes ---

/// get_me
///
/// [Authenticated Route] Profile of the signed-in user.
#[utoipa::path(get, path = "/me", responses((status = 200, description = "Profile", body = UserProfile)))]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<UserProfile>> {
    let user = load_user(&state, id).await?;
    Ok(Json(to_profile(user)?))
}

/// get_settings
///
/// [Authenticated Route] Same payload as `/me`; backs the settings form.
#[utoipa::path(get, path = "/settings", responses((status = 200, description = "Settings", body = UserProfile)))]
pub async fn get_settings(user: AuthUser, state: State<AppState>) -> ApiResult<Json<UserProfile>> {
    get_me(user, state).await
}

/// update_settings
///
/// [Authenticated Route] Partial profile update. A password change needs the
/// current password.
#[utoipa::path(
    put,
    path = "/settings",
    request_body = SettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = MessageResponse),
        (status = 400, description = "Invalid fields or wrong password"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_settings(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<SettingsRequest>,
) -> ApiResult<Json<MessageResponse>> {
    payload.validate()?;
    let current = load_user(&state, id).await?;

    if let Some(email) = &payload.email {
        if let Some(other) = state.repo.get_user_by_email(email).await? {
            if other.id != id {
                return Err(ApiError::Conflict("Email already in use!".to_string()));
            }
        }
    }

    let password_hash = match (&payload.password, &payload.new_password) {
        (Some(old), Some(new)) => {
            if !auth::verify_password(old, &current.password_hash) {
                return Err(ApiError::BadRequest("Incorrect password!".to_string()));
            }
            Some(auth::hash_password(new)?)
        }
        _ => None,
    };

    let update = UserUpdate {
        name: payload.name,
        email: payload.email,
        password_hash,
    };

    state
        .repo
        .update_user(id, update)
        .await
        .map_err(|e| ApiError::conflict_on_unique(e, "Email already in use!"))?
        .ok_or_else(|| ApiError::NotFound("User not found!".to_string()))?;

    Ok(Json(MessageResponse::new("Settings updated!")))
}

/// get_stations
///
/// [Authenticated Route] Permanent stations, for the user form's station picker.
#[utoipa::path(get, path = "/stations", responses((status = 200, description = "Stations", body = [Station])))]
pub async fn get_stations(
    _user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Station>>> {
    Ok(Json(state.repo.list_stations().await?))
}

// --- Client Area ---

/// get_client_dashboard
///
/// [Authenticated Route, CLIENT] The caller's own travel orders, newest first.
#[utoipa::path(get, path = "/client", responses((status = 200, description = "My travel orders", body = [TravelOrderView])))]
pub async fn get_client_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TravelOrderView>>> {
    user.require(&[Role::Client])?;
    let orders = state.repo.get_travel_orders_by_user(user.id).await?;
    Ok(Json(orders.into_iter().map(TravelOrderView::from).collect()))
}

/// create_travel_order
///
/// [Authenticated Route, CLIENT] Submits a travel order owned by the caller.
#[utoipa::path(
    post,
    path = "/client/travel-orders",
    request_body = TravelOrderRequest,
    responses(
        (status = 201, description = "Travel order submitted", body = TravelOrderView),
        (status = 400, description = "Invalid fields")
    )
)]
pub async fn create_travel_order(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<TravelOrderRequest>,
) -> ApiResult<(StatusCode, Json<TravelOrderView>)> {
    user.require(&[Role::Client])?;
    payload.validate()?;

    let entropy = Uuid::new_v4().into_bytes();
    let code = models::generate_travel_order_code(Utc::now(), [entropy[0], entropy[1]]);

    let order = state
        .repo
        .create_travel_order(NewTravelOrder {
            code,
            user_id: user.id,
            request: payload,
        })
        .await?;

    tracing::info!(order_id = %order.id, code = %order.code, user_id = %user.id, "travel order submitted");
    Ok((StatusCode::CREATED, Json(TravelOrderView::from(order))))
}

/// get_my_travel_order
///
/// [Authenticated Route, CLIENT] One of the caller's travel orders. Someone else's
/// order is reported as missing.
#[utoipa::path(
    get,
    path = "/client/travel-orders/{id}",
    params(("id" = Uuid, Path, description = "Travel order ID")),
    responses(
        (status = 200, description = "Found", body = TravelOrderView),
        (status = 404, description = "Not found or not yours")
    )
)]
pub async fn get_my_travel_order(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TravelOrderView>> {
    user.require(&[Role::Client])?;
    match state.repo.get_travel_order(id).await? {
        Some(order) if order.user_id == user.id || user.is_admin() => Ok(Json(order.into())),
        _ => Err(ApiError::NotFound("Travel order not found!".to_string())),
    }
}

// --- Signatory Area ---

/// get_signatory_queue
///
/// [Authenticated Route, SIGNATORY] Travel orders still awaiting a signature, oldest first.
#[utoipa::path(get, path = "/signatory", responses((status = 200, description = "Open travel orders", body = [TravelOrderView])))]
pub async fn get_signatory_queue(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TravelOrderView>>> {
    user.require(&[Role::Signatory])?;
    let orders = state.repo.get_open_travel_orders().await?;
    Ok(Json(orders.into_iter().map(TravelOrderView::from).collect()))
}

/// get_travel_order
///
/// [Authenticated Route, SIGNATORY] Detail view of any travel order.
#[utoipa::path(
    get,
    path = "/signatory/travel-orders/{id}",
    params(("id" = Uuid, Path, description = "Travel order ID")),
    responses(
        (status = 200, description = "Found", body = TravelOrderView),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_travel_order(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TravelOrderView>> {
    user.require(&[Role::Signatory])?;
    state
        .repo
        .get_travel_order(id)
        .await?
        .map(|order| Json(order.into()))
        .ok_or_else(|| ApiError::NotFound("Travel order not found!".to_string()))
}

/// review_travel_order
///
/// [Authenticated Route, SIGNATORY] Approves (next signature in the chain) or
/// disapproves a travel order. Closed orders, and reviews that lose a race with a
/// concurrent review of the same order, answer 409.
#[utoipa::path(
    put,
    path = "/signatory/travel-orders/{id}/review",
    params(("id" = Uuid, Path, description = "Travel order ID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Reviewed", body = TravelOrderView),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already closed or reviewed concurrently")
    )
)]
pub async fn review_travel_order(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> ApiResult<Json<TravelOrderView>> {
    user.require(&[Role::Signatory])?;

    let order = state
        .repo
        .get_travel_order(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Travel order not found!".to_string()))?;

    let signatures = order
        .review(payload.action)
        .ok_or_else(|| ApiError::Conflict("Travel order is already closed!".to_string()))?;

    // A concurrent review changed the flags between the read and the write.
    let updated = state
        .repo
        .set_travel_order_signatures(id, order.signatures(), signatures)
        .await?
        .ok_or_else(|| {
            tracing::warn!(order_id = %id, reviewer = %user.id, "travel order review lost a race");
            ApiError::Conflict("Travel order was already reviewed!".to_string())
        })?;

    tracing::info!(
        order_id = %id,
        reviewer = %user.id,
        action = ?payload.action,
        status = ?updated.status(),
        "travel order reviewed"
    );
    Ok(Json(updated.into()))
}

// --- Admin Area ---

/// list_users
///
/// [Admin Route] All accounts. Rows with an unrecognized role are skipped and logged.
#[utoipa::path(get, path = "/users", responses((status = 200, description = "Users", body = [UserProfile])))]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    user.require(&[Role::Admin])?;
    let profiles = state
        .repo
        .list_users()
        .await?
        .into_iter()
        .filter_map(|row| match UserProfile::try_from(row) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "skipping user with invalid role");
                None
            }
        })
        .collect();
    Ok(Json(profiles))
}

/// create_user
///
/// [Admin Route] Creates an account with any role.
#[utoipa::path(
    post,
    path = "/users",
    request_body = AddUserRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 409, description = "Email already exists")
    )
)]
pub async fn create_user(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AddUserRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    user.require(&[Role::Admin])?;
    payload.validate()?;

    if state.repo.get_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already exists!".to_string()));
    }

    let password_hash = auth::hash_password(&payload.password)?;
    let created = state
        .repo
        .create_user(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            role: payload.role,
            station_id: Some(payload.station_id),
            position_designation: Some(payload.position_designation),
            signature: payload.signature,
        })
        .await
        .map_err(|e| ApiError::conflict_on_unique(e, "Email already exists!"))?;

    tracing::info!(admin = %user.id, user_id = %created.id, role = %created.role, "user created");
    Ok((StatusCode::CREATED, Json(to_profile(created)?)))
}

// --- Uploads ---

/// get_presigned_url
///
/// [Authenticated Route] Short-lived S3 PUT URL for an attachment or image.
#[utoipa::path(
    post,
    path = "/upload/presigned",
    request_body = PresignedUrlRequest,
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 400, description = "File type not allowed")
    )
)]
pub async fn get_presigned_url(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PresignedUrlRequest>,
) -> ApiResult<Json<PresignedUrlResponse>> {
    let object_key =
        storage::object_key_for(payload.kind, &user, &payload.filename, &payload.file_type)
            .ok_or_else(|| ApiError::BadRequest("File type not allowed!".to_string()))?;

    let url = state
        .storage
        .get_presigned_upload_url(&object_key, &payload.file_type)
        .await
        .map_err(|e| ApiError::Internal(format!("storage error: {e}")))?;

    Ok(Json(PresignedUrlResponse {
        url,
        resource_key: object_key,
    }))
}

/// get_download_url
///
/// [Authenticated Route] Short-lived S3 GET URL, subject to `storage::can_read_object`.
#[utoipa::path(
    get,
    path = "/upload/presigned",
    params(DownloadQuery),
    responses(
        (status = 200, description = "URL", body = PresignedUrlResponse),
        (status = 403, description = "Not allowed to read this object")
    )
)]
pub async fn get_download_url(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Json<PresignedUrlResponse>> {
    let key = storage::sanitize_key(&query.key);
    if !storage::can_read_object(&key, &user) {
        return Err(ApiError::Forbidden("Forbidden".to_string()));
    }

    let url = state
        .storage
        .get_presigned_download_url(&key)
        .await
        .map_err(|e| ApiError::Internal(format!("storage error: {e}")))?;

    Ok(Json(PresignedUrlResponse {
        url,
        resource_key: key,
    }))
}

/// not_found
///
/// Fallback for unmatched paths. Anonymous callers only reach it under the API-auth
/// prefix; everywhere else the access gate redirects them first.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
