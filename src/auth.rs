use crate::schemas::{AppState, ErrorResponse};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
};
use model::entities::{auth_token, user};
use rand::RngCore;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use thiserror::Error;
use tracing::warn;

/// Header scheme, i.e. `Authorization: Token <key>`.
const TOKEN_SCHEME: &str = "Token ";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingCredentials,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Internal error while authenticating")]
    Database(#[from] DbErr),
}

impl AuthError {
    fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "NOT_AUTHENTICATED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::MissingCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Database(ref err) => {
                tracing::error!("Authentication lookup failed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse::new(self.to_string(), self.code());
        (status, Json(body)).into_response()
    }
}

/// Hash a raw password into an argon2 PHC string for storage.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    Ok(argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a raw password against a stored argon2 PHC string.
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let argon2 = Argon2::default();
    match PasswordHash::new(password_hash) {
        Ok(parsed_hash) => argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok(),
        Err(err) => {
            warn!("Stored password hash failed to parse: {err}");
            false
        }
    }
}

/// Generate a fresh token key: 20 random bytes as 40 hex characters.
pub fn generate_token_key() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Resolve a token key to its user, if the token exists.
pub async fn resolve_token(
    db: &DatabaseConnection,
    key: &str,
) -> Result<Option<user::Model>, DbErr> {
    let token = auth_token::Entity::find()
        .filter(auth_token::Column::Key.eq(key))
        .one(db)
        .await?;

    match token {
        Some(token) => user::Entity::find_by_id(token.user_id).one(db).await,
        None => Ok(None),
    }
}

fn token_from_parts(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::InvalidToken)?;
    let key = value
        .strip_prefix(TOKEN_SCHEME)
        .ok_or(AuthError::InvalidToken)?
        .trim();
    if key.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(Some(key))
}

/// Extractor for handlers that require an authenticated caller.
pub struct AuthUser(pub user::Model);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = token_from_parts(parts)?.ok_or(AuthError::MissingCredentials)?;
        let user = resolve_token(&state.db, key)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(AuthUser(user))
    }
}

/// Extractor for public endpoints whose representation depends on the viewer
/// (`is_subscribed`, `is_favorited`, ...). Absent credentials yield `None`;
/// a present but unknown token is still rejected.
pub struct MaybeAuthUser(pub Option<user::Model>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(key) = token_from_parts(parts)? else {
            return Ok(MaybeAuthUser(None));
        };
        let user = resolve_token(&state.db, key)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        Ok(MaybeAuthUser(Some(user)))
    }
}
