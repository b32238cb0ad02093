use crate::auth::{hash_password, verify_password, AuthUser, MaybeAuthUser};
use crate::handlers::is_unique_violation;
use crate::handlers::recipes::RecipeShortResponse;
use crate::helpers::media::{media_url, remove_media_file, save_base64_image};
use crate::schemas::{
    bad_request, db_error, not_found, ApiError, ApiResponse, AppState, Paginated, PaginationQuery,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use model::entities::{follow, recipe, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Request body for registering a new user
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterUserRequest {
    /// Public handle (must be unique)
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    /// Login email address (must be unique)
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 150))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150))]
    pub last_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Response body for a successful registration. Deliberately excludes the
/// viewer-dependent fields of [`UserResponse`].
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// User profile as seen by a particular viewer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Public URL of the avatar, if one is set
    pub avatar: Option<String>,
    /// Whether the requesting user follows this user (false for anonymous)
    pub is_subscribed: bool,
}

/// Request body for changing the caller's password
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct SetPasswordRequest {
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
    pub current_password: String,
}

/// Request body for uploading an avatar as a base64 data URL
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AvatarRequest {
    pub avatar: String,
}

/// Response carrying the stored avatar URL
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvatarResponse {
    pub avatar: String,
}

/// A followed author together with their recipes
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub is_subscribed: bool,
    /// The author's recipes, newest first, optionally truncated by
    /// `recipes_limit`
    pub recipes: Vec<RecipeShortResponse>,
    /// Total number of recipes the author has published
    pub recipes_count: u64,
}

/// Query parameters for the subscriptions list
#[derive(Debug, Deserialize, IntoParams)]
pub struct SubscriptionsQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size override, capped at 1000
    pub limit: Option<u64>,
    /// Maximum number of recipes to embed per author
    pub recipes_limit: Option<u64>,
}

impl SubscriptionsQuery {
    fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    fn page_size(&self) -> u64 {
        self.limit
            .unwrap_or(PaginationQuery::DEFAULT_PAGE_SIZE)
            .clamp(1, PaginationQuery::MAX_PAGE_SIZE)
    }
}

/// Whether `viewer` follows the user with `author_id`.
pub(crate) async fn is_subscribed(
    db: &DatabaseConnection,
    viewer: Option<&user::Model>,
    author_id: i32,
) -> Result<bool, DbErr> {
    let Some(viewer) = viewer else {
        return Ok(false);
    };
    Ok(follow::Entity::find_by_id((viewer.id, author_id))
        .one(db)
        .await?
        .is_some())
}

/// Build the viewer-dependent profile representation.
pub(crate) async fn user_response(
    db: &DatabaseConnection,
    subject: &user::Model,
    viewer: Option<&user::Model>,
) -> Result<UserResponse, DbErr> {
    Ok(UserResponse {
        id: subject.id,
        username: subject.username.clone(),
        email: subject.email.clone(),
        first_name: subject.first_name.clone(),
        last_name: subject.last_name.clone(),
        avatar: subject.avatar.as_deref().map(media_url),
        is_subscribed: is_subscribed(db, viewer, subject.id).await?,
    })
}

async fn subscription_response(
    db: &DatabaseConnection,
    author: &user::Model,
    viewer: &user::Model,
    recipes_limit: Option<u64>,
) -> Result<SubscriptionResponse, DbErr> {
    let profile = user_response(db, author, Some(viewer)).await?;

    let mut recipe_query = recipe::Entity::find()
        .filter(recipe::Column::AuthorId.eq(author.id))
        .order_by_desc(recipe::Column::Id);
    if let Some(limit) = recipes_limit {
        recipe_query = recipe_query.limit(limit);
    }
    let recipes = recipe_query
        .all(db)
        .await?
        .into_iter()
        .map(RecipeShortResponse::from)
        .collect();

    let recipes_count = recipe::Entity::find()
        .filter(recipe::Column::AuthorId.eq(author.id))
        .count(db)
        .await?;

    Ok(SubscriptionResponse {
        id: profile.id,
        username: profile.username,
        email: profile.email,
        first_name: profile.first_name,
        last_name: profile.last_name,
        avatar: profile.avatar,
        is_subscribed: profile.is_subscribed,
        recipes,
        recipes_count,
    })
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/users/",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<RegistrationResponse>),
        (status = 400, description = "Invalid request or duplicate email/username", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, request))]
pub async fn register_user(
    State(state): State<AppState>,
    Valid(Json(request)): Valid<Json<RegisterUserRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<RegistrationResponse>>), ApiError> {
    debug!("Registering user with username: {}", request.username);

    let password_hash = hash_password(&request.password).map_err(|err| {
        tracing::error!("Failed to hash password: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(crate::schemas::ErrorResponse::new(
                "Failed to register user",
                "PASSWORD_HASH_ERROR",
            )),
        )
    })?;

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| db_error(e, "start transaction"))?;

    let new_user = user::ActiveModel {
        username: Set(request.username.clone()),
        email: Set(request.email.clone()),
        first_name: Set(request.first_name.clone()),
        last_name: Set(request.last_name.clone()),
        password_hash: Set(password_hash),
        avatar: Set(None),
        ..Default::default()
    };

    match new_user.insert(&txn).await {
        Ok(user_model) => {
            txn.commit()
                .await
                .map_err(|e| db_error(e, "commit registration"))?;
            info!(
                "User registered successfully with ID: {}, username: {}",
                user_model.id, user_model.username
            );
            let response = RegistrationResponse {
                id: user_model.id,
                username: user_model.username,
                email: user_model.email,
                first_name: user_model.first_name,
                last_name: user_model.last_name,
            };
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(response, "User registered successfully")),
            ))
        }
        Err(err) if is_unique_violation(&err) => {
            warn!(
                "Registration rejected, email or username already taken: {}",
                request.email
            );
            Err(bad_request(
                "A user with this email or username already exists",
            ))
        }
        Err(err) => Err(db_error(err, "register user")),
    }
}

/// Get all users (paginated)
#[utoipa::path(
    get,
    path = "/api/users/",
    tag = "users",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Paginated<UserResponse>>),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn list_users(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Paginated<UserResponse>>>, ApiError> {
    debug!("Fetching users page {}", pagination.page());

    let paginator = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .paginate(&state.db, pagination.page_size());

    let totals = paginator
        .num_items_and_pages()
        .await
        .map_err(|e| db_error(e, "count users"))?;
    let users = paginator
        .fetch_page(pagination.page() - 1)
        .await
        .map_err(|e| db_error(e, "fetch users"))?;

    let mut results = Vec::with_capacity(users.len());
    for subject in &users {
        results.push(
            user_response(&state.db, subject, viewer.as_ref())
                .await
                .map_err(|e| db_error(e, "build user response"))?,
        );
    }

    info!("Successfully retrieved {} users", results.len());
    Ok(Json(ApiResponse::new(
        Paginated {
            count: totals.number_of_items,
            page: pagination.page(),
            pages: totals.number_of_pages,
            results,
        },
        "Users retrieved successfully",
    )))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/api/users/{user_id}/",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "User ID"),
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 404, description = "User not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn get_user(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    debug!("Fetching user with ID: {}", user_id);

    let subject = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|e| db_error(e, "fetch user"))?;

    match subject {
        Some(subject) => {
            let response = user_response(&state.db, &subject, viewer.as_ref())
                .await
                .map_err(|e| db_error(e, "build user response"))?;
            Ok(Json(ApiResponse::new(
                response,
                "User retrieved successfully",
            )))
        }
        None => {
            warn!("User with ID {} not found", user_id);
            Err(not_found("User"))
        }
    }
}

/// Get the authenticated caller's own profile
#[utoipa::path(
    get,
    path = "/api/users/me/",
    tag = "users",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let response = user_response(&state.db, &me, Some(&me))
        .await
        .map_err(|e| db_error(e, "build user response"))?;
    Ok(Json(ApiResponse::new(
        response,
        "User retrieved successfully",
    )))
}

/// Change the caller's password
#[utoipa::path(
    post,
    path = "/api/users/set_password/",
    tag = "users",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Current password is incorrect", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me, request))]
pub async fn set_password(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Valid(Json(request)): Valid<Json<SetPasswordRequest>>,
) -> Result<StatusCode, ApiError> {
    if !verify_password(&request.current_password, &me.password_hash) {
        warn!("Password change rejected for user {}", me.id);
        return Err(bad_request("Current password is incorrect"));
    }

    let password_hash = hash_password(&request.new_password).map_err(|err| {
        tracing::error!("Failed to hash password: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(crate::schemas::ErrorResponse::new(
                "Failed to change password",
                "PASSWORD_HASH_ERROR",
            )),
        )
    })?;

    let user_id = me.id;
    let mut active: user::ActiveModel = me.into();
    active.password_hash = Set(password_hash);
    active
        .update(&state.db)
        .await
        .map_err(|e| db_error(e, "change password"))?;

    info!("Password changed for user {}", user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Upload or replace the caller's avatar (base64 data URL)
#[utoipa::path(
    put,
    path = "/api/users/me/avatar/",
    tag = "users",
    request_body = AvatarRequest,
    responses(
        (status = 200, description = "Avatar updated", body = ApiResponse<AvatarResponse>),
        (status = 400, description = "Invalid image payload", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me, request))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(request): Json<AvatarRequest>,
) -> Result<Json<ApiResponse<AvatarResponse>>, ApiError> {
    let stored_path = save_base64_image(&state.media_root, "avatars", &request.avatar)
        .await
        .map_err(|err| bad_request(err.to_string()))?;

    let previous = me.avatar.clone();
    let user_id = me.id;

    let mut active: user::ActiveModel = me.into();
    active.avatar = Set(Some(stored_path.clone()));
    active
        .update(&state.db)
        .await
        .map_err(|e| db_error(e, "update avatar"))?;

    if let Some(previous) = previous {
        remove_media_file(&state.media_root, &previous).await;
    }

    info!("Avatar updated for user {}", user_id);
    Ok(Json(ApiResponse::new(
        AvatarResponse {
            avatar: media_url(&stored_path),
        },
        "Avatar updated successfully",
    )))
}

/// Remove the caller's avatar
#[utoipa::path(
    delete,
    path = "/api/users/me/avatar/",
    tag = "users",
    responses(
        (status = 204, description = "Avatar removed"),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn delete_avatar(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<StatusCode, ApiError> {
    let Some(previous) = me.avatar.clone() else {
        return Ok(StatusCode::NO_CONTENT);
    };

    let mut active: user::ActiveModel = me.into();
    active.avatar = Set(None);
    active
        .update(&state.db)
        .await
        .map_err(|e| db_error(e, "remove avatar"))?;

    remove_media_file(&state.media_root, &previous).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Subscribe to an author
#[utoipa::path(
    post,
    path = "/api/users/{user_id}/subscribe/",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "Author to follow"),
    ),
    responses(
        (status = 201, description = "Subscribed", body = ApiResponse<SubscriptionResponse>),
        (status = 400, description = "Self-subscription or already subscribed", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn subscribe(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<SubscriptionResponse>>), ApiError> {
    let author = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|e| db_error(e, "fetch author"))?
        .ok_or_else(|| not_found("User"))?;

    if author.id == me.id {
        warn!("User {} attempted to subscribe to themselves", me.id);
        return Err(bad_request("You cannot subscribe to yourself"));
    }

    let new_follow = follow::ActiveModel {
        follower_id: Set(me.id),
        following_id: Set(author.id),
    };

    // Insert first; a duplicate surfaces as a unique violation instead of
    // racing a separate existence check.
    match new_follow.insert(&state.db).await {
        Ok(_) => {
            info!("User {} subscribed to author {}", me.id, author.id);
            let response = subscription_response(&state.db, &author, &me, None)
                .await
                .map_err(|e| db_error(e, "build subscription response"))?;
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(response, "Subscribed successfully")),
            ))
        }
        Err(err) if is_unique_violation(&err) => {
            warn!("User {} is already subscribed to author {}", me.id, author.id);
            Err(bad_request("You are already subscribed to this author"))
        }
        Err(err) => Err(db_error(err, "subscribe")),
    }
}

/// Unsubscribe from an author
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}/subscribe/",
    tag = "users",
    params(
        ("user_id" = i32, Path, description = "Author to unfollow"),
    ),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 400, description = "Was not subscribed", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Author not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn unsubscribe(
    Path(user_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<StatusCode, ApiError> {
    let author = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(|e| db_error(e, "fetch author"))?
        .ok_or_else(|| not_found("User"))?;

    let result = follow::Entity::delete_by_id((me.id, author.id))
        .exec(&state.db)
        .await
        .map_err(|e| db_error(e, "unsubscribe"))?;

    if result.rows_affected == 0 {
        warn!("User {} was not subscribed to author {}", me.id, author.id);
        return Err(bad_request("You were not subscribed to this author"));
    }

    info!("User {} unsubscribed from author {}", me.id, author.id);
    Ok(StatusCode::NO_CONTENT)
}

/// List the authors the caller follows, with their recipes
#[utoipa::path(
    get,
    path = "/api/users/subscriptions/",
    tag = "users",
    params(SubscriptionsQuery),
    responses(
        (status = 200, description = "Subscriptions retrieved successfully", body = ApiResponse<Paginated<SubscriptionResponse>>),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Query(query): Query<SubscriptionsQuery>,
) -> Result<Json<ApiResponse<Paginated<SubscriptionResponse>>>, ApiError> {
    debug!("Fetching subscriptions for user {}", me.id);

    let paginator = user::Entity::find()
        .join_rev(JoinType::InnerJoin, follow::Relation::Following.def())
        .filter(follow::Column::FollowerId.eq(me.id))
        .order_by_asc(user::Column::Id)
        .paginate(&state.db, query.page_size());

    let totals = paginator
        .num_items_and_pages()
        .await
        .map_err(|e| db_error(e, "count subscriptions"))?;
    let authors = paginator
        .fetch_page(query.page() - 1)
        .await
        .map_err(|e| db_error(e, "fetch subscriptions"))?;

    let mut results = Vec::with_capacity(authors.len());
    for author in &authors {
        results.push(
            subscription_response(&state.db, author, &me, query.recipes_limit)
                .await
                .map_err(|e| db_error(e, "build subscription response"))?,
        );
    }

    info!("Retrieved {} subscriptions for user {}", results.len(), me.id);
    Ok(Json(ApiResponse::new(
        Paginated {
            count: totals.number_of_items,
            page: query.page(),
            pages: totals.number_of_pages,
            results,
        },
        "Subscriptions retrieved successfully",
    )))
}
