use crate::auth::{generate_token_key, verify_password, AuthUser};
use crate::handlers::is_unique_violation;
use crate::schemas::{db_error, ApiError, AppState, ErrorResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use model::entities::{auth_token, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

/// Request body for obtaining an auth token
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TokenLoginRequest {
    /// Email address (the login field)
    pub email: String,
    pub password: String,
}

/// Response carrying the issued token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub auth_token: String,
}

fn invalid_credentials() -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(
            "Unable to log in with the provided credentials",
            "INVALID_CREDENTIALS",
        )),
    )
}

/// Find the user's token or mint a new one. A concurrent login can win the
/// insert; the unique violation is answered by re-reading the winner's row.
async fn get_or_create_token(db: &DatabaseConnection, user_id: i32) -> Result<String, DbErr> {
    if let Some(token) = auth_token::Entity::find()
        .filter(auth_token::Column::UserId.eq(user_id))
        .one(db)
        .await?
    {
        return Ok(token.key);
    }

    let new_token = auth_token::ActiveModel {
        user_id: Set(user_id),
        key: Set(generate_token_key()),
        created: Set(Utc::now()),
        ..Default::default()
    };

    match new_token.insert(db).await {
        Ok(token) => Ok(token.key),
        Err(err) if is_unique_violation(&err) => {
            let token = auth_token::Entity::find()
                .filter(auth_token::Column::UserId.eq(user_id))
                .one(db)
                .await?
                .ok_or(err)?;
            Ok(token.key)
        }
        Err(err) => Err(err),
    }
}

/// Log in with email and password, returning the user's API token.
#[utoipa::path(
    post,
    path = "/api/auth/token/login/",
    tag = "auth",
    request_body = TokenLoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn token_login(
    State(state): State<AppState>,
    Json(request): Json<TokenLoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    debug!("Token login attempt for email: {}", request.email);

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(request.email.as_str()))
        .one(&state.db)
        .await
        .map_err(|e| db_error(e, "look up user"))?;

    let Some(user) = user else {
        warn!("Login attempt for unknown email");
        return Err(invalid_credentials());
    };

    if !verify_password(&request.password, &user.password_hash) {
        warn!("Login attempt with wrong password for user {}", user.id);
        return Err(invalid_credentials());
    }

    let key = get_or_create_token(&state.db, user.id)
        .await
        .map_err(|e| db_error(e, "issue token"))?;

    info!("Issued token for user {}", user.id);
    Ok(Json(TokenResponse { auth_token: key }))
}

/// Revoke the caller's token.
#[utoipa::path(
    post,
    path = "/api/auth/token/logout/",
    tag = "auth",
    responses(
        (status = 204, description = "Token revoked"),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn token_logout(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<StatusCode, ApiError> {
    auth_token::Entity::delete_many()
        .filter(auth_token::Column::UserId.eq(user.id))
        .exec(&state.db)
        .await
        .map_err(|e| db_error(e, "revoke token"))?;

    info!("Revoked token for user {}", user.id);
    Ok(StatusCode::NO_CONTENT)
}
