use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{debug, instrument, warn};

use crate::{
    auth::{
        dto::{
            AddAppRequest, AddAppResponse, LoginRequest, LoginResponse, RegisterRequest,
            RegisterResponse,
        },
        errors::AuthError,
    },
    state::AppState,
};

type Rejection = (StatusCode, String);

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn app_routes() -> Router<AppState> {
    Router::new().route("/apps", post(add_app))
}

fn required(field: &str) -> Rejection {
    (StatusCode::BAD_REQUEST, format!("{field} is required"))
}

/// Maps an engine error to a response without leaking its details.
fn reject(err: AuthError, invalid_credentials: &str, internal: &str) -> Rejection {
    let status = err.status();
    debug!(op = err.op(), error = %err, %status, "request rejected");
    let msg = match err {
        AuthError::InvalidCredentials { .. } => invalid_credentials.to_string(),
        AuthError::InvalidArgument { field, .. } => format!("invalid {field}"),
        AuthError::UserAlreadyExists { .. } => "user already exists".to_string(),
        AuthError::AppConflict { .. } => "app name is taken".to_string(),
        AuthError::Internal { .. } => internal.to_string(),
    };
    (status, msg)
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, Rejection> {
    if payload.email.is_empty() {
        return Err(required("email"));
    }
    if payload.password.is_empty() {
        return Err(required("password"));
    }

    let user_id = state
        .auth
        .register_user(&payload.email, &payload.password)
        .await
        .map_err(|e| reject(e, "invalid email or password", "failed to register user"))?;

    Ok(Json(RegisterResponse { user_id }))
}

#[instrument(skip_all, fields(app_id = payload.app_id))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, Rejection> {
    if payload.email.is_empty() {
        return Err(required("email"));
    }
    if payload.password.is_empty() {
        return Err(required("password"));
    }
    if payload.app_id == 0 {
        return Err(required("app_id"));
    }

    let token = state
        .auth
        .login(&payload.email, &payload.password, payload.app_id)
        .await
        .map_err(|e| reject(e, "invalid email or password", "failed to login"))?;

    Ok(Json(LoginResponse { token }))
}

#[instrument(skip_all, fields(app_name = %payload.name))]
pub async fn add_app(
    State(state): State<AppState>,
    Json(payload): Json<AddAppRequest>,
) -> Result<Json<AddAppResponse>, Rejection> {
    if payload.name.is_empty() {
        return Err(required("name"));
    }
    if payload.password.is_empty() {
        return Err(required("password"));
    }
    if payload.secret.is_empty() {
        return Err(required("secret"));
    }
    if payload.ttl_hours == 0 {
        return Err(required("ttl_hours"));
    }
    if payload.ttl_hours < 0 {
        warn!(ttl_hours = payload.ttl_hours, "negative ttl");
        return Err((
            StatusCode::BAD_REQUEST,
            "ttl_hours must be positive".into(),
        ));
    }

    let app_id = state
        .auth
        .register_or_update_app(
            &payload.name,
            &payload.password,
            &payload.secret,
            payload.ttl_hours,
        )
        .await
        .map_err(|e| reject(e, "invalid name or password", "failed to register app"))?;

    Ok(Json(AddAppResponse { app_id }))
}
