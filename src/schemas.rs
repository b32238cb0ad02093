use axum::http::StatusCode;
use axum::response::Json;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::{IntoParams, OpenApi, ToSchema};

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Root directory for uploaded media (avatars, recipe images)
    pub media_root: PathBuf,
}

/// API response wrapper
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            error: error.into(),
            code: code.to_string(),
            success: false,
        }
    }
}

/// The uniform error type handlers return alongside a status code.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// 400 with a message naming the violated rule.
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message, "VALIDATION_ERROR")),
    )
}

/// 404 for a missing referenced object.
pub fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("{what} not found"), "NOT_FOUND")),
    )
}

/// 403 for an operation on somebody else's object.
pub fn permission_denied(message: impl Into<String>) -> ApiError {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse::new(message, "PERMISSION_DENIED")),
    )
}

/// 500 for unexpected database failures. The error itself goes to the log;
/// the body stays generic.
pub fn db_error(err: sea_orm::DbErr, context: &str) -> ApiError {
    tracing::error!("Failed to {context}: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(
            format!("Failed to {context}"),
            "DATABASE_ERROR",
        )),
    )
}

/// Page-number pagination parameters shared by the list endpoints.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PaginationQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size override, capped at 1000
    pub limit: Option<u64>,
}

impl PaginationQuery {
    pub const DEFAULT_PAGE_SIZE: u64 = 6;
    pub const MAX_PAGE_SIZE: u64 = 1000;

    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u64 {
        self.limit
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE)
    }
}

/// One page of results plus the counters clients page by.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Paginated<T> {
    /// Total number of items across all pages
    pub count: u64,
    /// The 1-based page this response holds
    pub page: u64,
    /// Total number of pages at the current page size
    pub pages: u64,
    pub results: Vec<T>,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::token_login,
        crate::handlers::auth::token_logout,
        crate::handlers::users::register_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::current_user,
        crate::handlers::users::set_password,
        crate::handlers::users::update_avatar,
        crate::handlers::users::delete_avatar,
        crate::handlers::users::subscribe,
        crate::handlers::users::unsubscribe,
        crate::handlers::users::list_subscriptions,
        crate::handlers::tags::list_tags,
        crate::handlers::tags::get_tag,
        crate::handlers::ingredients::list_ingredients,
        crate::handlers::ingredients::get_ingredient,
        crate::handlers::recipes::list_recipes,
        crate::handlers::recipes::create_recipe,
        crate::handlers::recipes::get_recipe,
        crate::handlers::recipes::update_recipe,
        crate::handlers::recipes::delete_recipe,
        crate::handlers::recipes::favorite_recipe,
        crate::handlers::recipes::unfavorite_recipe,
        crate::handlers::recipes::add_to_shopping_cart,
        crate::handlers::recipes::remove_from_shopping_cart,
        crate::handlers::recipes::download_shopping_cart,
        crate::handlers::recipes::get_recipe_link,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            PaginationQuery,
            crate::handlers::auth::TokenLoginRequest,
            crate::handlers::auth::TokenResponse,
            crate::handlers::users::RegisterUserRequest,
            crate::handlers::users::RegistrationResponse,
            crate::handlers::users::SetPasswordRequest,
            crate::handlers::users::AvatarRequest,
            crate::handlers::users::AvatarResponse,
            crate::handlers::users::UserResponse,
            crate::handlers::users::SubscriptionResponse,
            crate::handlers::tags::TagResponse,
            crate::handlers::ingredients::IngredientResponse,
            crate::handlers::recipes::RecipeIngredientWrite,
            crate::handlers::recipes::CreateRecipeRequest,
            crate::handlers::recipes::UpdateRecipeRequest,
            crate::handlers::recipes::RecipeIngredientResponse,
            crate::handlers::recipes::RecipeResponse,
            crate::handlers::recipes::RecipeShortResponse,
            crate::handlers::recipes::RecipeLinkResponse,
            ApiResponse<crate::handlers::users::UserResponse>,
            ApiResponse<crate::handlers::tags::TagResponse>,
            ApiResponse<Vec<crate::handlers::tags::TagResponse>>,
            ApiResponse<Vec<crate::handlers::ingredients::IngredientResponse>>,
            ApiResponse<crate::handlers::recipes::RecipeResponse>,
            ApiResponse<crate::handlers::recipes::RecipeShortResponse>,
            Paginated<crate::handlers::recipes::RecipeResponse>,
            Paginated<crate::handlers::users::UserResponse>,
            Paginated<crate::handlers::users::SubscriptionResponse>,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Token authentication endpoints"),
        (name = "users", description = "Registration, profiles and subscriptions"),
        (name = "tags", description = "Read-only recipe tags"),
        (name = "ingredients", description = "Read-only ingredient reference data"),
        (name = "recipes", description = "Recipe CRUD, favorites and shopping cart"),
    ),
    info(
        title = "Foodrust API",
        description = "Recipe sharing backend - authors, tagged recipes, favorites, subscriptions and aggregated shopping lists",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
