use crate::auth::{AuthUser, MaybeAuthUser};
use crate::handlers::is_unique_violation;
use crate::handlers::tags::TagResponse;
use crate::handlers::users::{user_response, UserResponse};
use crate::helpers::media::{media_url, remove_media_file, save_base64_image};
use crate::helpers::shopping_list::{render_shopping_list, shopping_list_items};
use crate::schemas::{
    bad_request, db_error, not_found, permission_denied, ApiError, ApiResponse, AppState,
    Paginated, PaginationQuery,
};
use axum::{
    extract::{Host, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use axum_valid::Valid;
use chrono::Local;
use model::entities::{
    favorite, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag, user,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// One nested ingredient of a recipe write request
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct RecipeIngredientWrite {
    /// Ingredient ID (must exist)
    pub id: i32,
    /// Quantity of the ingredient in this recipe
    #[validate(range(min = 1.0))]
    pub amount: f64,
    /// Optional unit label override, defaults to "g"
    pub unit: Option<String>,
}

/// Request body for creating a recipe
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateRecipeRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: String,
    pub text: String,
    /// Cooking time in minutes, at least 1
    #[validate(range(min = 1))]
    pub cooking_time: i32,
    /// Base64 data URL of the recipe image
    pub image: String,
    #[validate(nested)]
    pub ingredients: Vec<RecipeIngredientWrite>,
    /// Tag IDs (must exist)
    pub tags: Vec<i32>,
}

/// Request body for updating a recipe. Nested ingredient and tag sets,
/// when present, replace the stored sets wholesale.
#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateRecipeRequest {
    #[validate(length(min = 1, max = 256))]
    pub name: Option<String>,
    pub text: Option<String>,
    #[validate(range(min = 1))]
    pub cooking_time: Option<i32>,
    /// Base64 data URL replacing the stored image
    pub image: Option<String>,
    #[validate(nested)]
    pub ingredients: Option<Vec<RecipeIngredientWrite>>,
    pub tags: Option<Vec<i32>>,
}

/// One ingredient of a recipe as rendered in responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipeIngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: f64,
    pub unit: String,
}

/// Full recipe representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipeResponse {
    pub id: i32,
    pub tags: Vec<TagResponse>,
    pub author: UserResponse,
    pub ingredients: Vec<RecipeIngredientResponse>,
    /// Whether the requesting user has favorited this recipe
    pub is_favorited: bool,
    /// Whether the recipe is in the requesting user's shopping cart
    pub is_in_shopping_cart: bool,
    pub name: String,
    /// Public URL of the recipe image
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Compact recipe representation used by favorites, the shopping cart and
/// subscription listings
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipeShortResponse {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipe::Model> for RecipeShortResponse {
    fn from(model: recipe::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            image: media_url(&model.image),
            cooking_time: model.cooking_time,
        }
    }
}

/// Response for the short-link endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipeLinkResponse {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

/// Query parameters for the recipe list
#[derive(Debug, Deserialize, IntoParams)]
pub struct RecipeListQuery {
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size override, capped at 1000
    pub limit: Option<u64>,
    /// Only recipes by this author
    pub author: Option<i32>,
    /// Comma-separated tag slugs; a recipe matches if it carries any of them
    pub tags: Option<String>,
    /// 1 restricts the list to the caller's favorites (authenticated only)
    pub is_favorited: Option<u8>,
    /// 1 restricts the list to the caller's shopping cart (authenticated only)
    pub is_in_shopping_cart: Option<u8>,
}

impl RecipeListQuery {
    fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    fn page_size(&self) -> u64 {
        self.limit
            .unwrap_or(PaginationQuery::DEFAULT_PAGE_SIZE)
            .clamp(1, PaginationQuery::MAX_PAGE_SIZE)
    }
}

/// Validate a nested ingredient set: non-empty, no duplicates, all
/// referenced ingredient rows present. Returns nothing; the join rows are
/// written from the request values.
async fn check_ingredients(
    db: &DatabaseConnection,
    ingredients: &[RecipeIngredientWrite],
) -> Result<(), ApiError> {
    if ingredients.is_empty() {
        return Err(bad_request("Recipe must contain at least one ingredient"));
    }

    let mut seen = HashSet::new();
    for item in ingredients {
        if !seen.insert(item.id) {
            return Err(bad_request("Recipe contains a duplicate ingredient"));
        }
        if item.amount < 1.0 {
            return Err(bad_request("Ingredient amount must be at least 1"));
        }
    }

    let ids: Vec<i32> = ingredients.iter().map(|i| i.id).collect();
    let found = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ids))
        .count(db)
        .await
        .map_err(|e| db_error(e, "validate ingredients"))?;
    if found != ingredients.len() as u64 {
        return Err(bad_request(
            "Recipe references an ingredient that does not exist",
        ));
    }

    Ok(())
}

/// Validate a nested tag set: non-empty, no duplicates, all IDs present.
async fn check_tags(db: &DatabaseConnection, tags: &[i32]) -> Result<(), ApiError> {
    if tags.is_empty() {
        return Err(bad_request("Recipe must contain at least one tag"));
    }

    let mut seen = HashSet::new();
    for id in tags {
        if !seen.insert(*id) {
            return Err(bad_request("Recipe contains a duplicate tag"));
        }
    }

    let found = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tags.to_vec()))
        .count(db)
        .await
        .map_err(|e| db_error(e, "validate tags"))?;
    if found != tags.len() as u64 {
        return Err(bad_request("Recipe references a tag that does not exist"));
    }

    Ok(())
}

/// Build the full viewer-dependent recipe representation.
async fn build_recipe_response(
    db: &DatabaseConnection,
    model: &recipe::Model,
    viewer: Option<&user::Model>,
) -> Result<RecipeResponse, DbErr> {
    let author = user::Entity::find_by_id(model.author_id)
        .one(db)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("author {} of recipe {}", model.author_id, model.id)))?;
    let author = user_response(db, &author, viewer).await?;

    let tags = model
        .find_related(tag::Entity)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(TagResponse::from)
        .collect();

    let ingredients = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(model.id))
        .find_also_related(ingredient::Entity)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(row, ingredient)| {
            ingredient.map(|ingredient| RecipeIngredientResponse {
                id: ingredient.id,
                name: ingredient.name,
                measurement_unit: ingredient.measurement_unit,
                amount: row.quantity,
                unit: row.unit,
            })
        })
        .collect();

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            favorite::Entity::find_by_id((viewer.id, model.id))
                .one(db)
                .await?
                .is_some(),
            shopping_cart::Entity::find_by_id((viewer.id, model.id))
                .one(db)
                .await?
                .is_some(),
        ),
        None => (false, false),
    };

    Ok(RecipeResponse {
        id: model.id,
        tags,
        author,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: model.name.clone(),
        image: media_url(&model.image),
        text: model.text.clone(),
        cooking_time: model.cooking_time,
    })
}

async fn find_recipe(db: &DatabaseConnection, recipe_id: i32) -> Result<recipe::Model, ApiError> {
    recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await
        .map_err(|e| db_error(e, "fetch recipe"))?
        .ok_or_else(|| {
            warn!("Recipe with ID {} not found", recipe_id);
            not_found("Recipe")
        })
}

/// Get recipes (paginated, newest first, filterable)
#[utoipa::path(
    get,
    path = "/api/recipes/",
    tag = "recipes",
    params(RecipeListQuery),
    responses(
        (status = 200, description = "Recipes retrieved successfully", body = ApiResponse<Paginated<RecipeResponse>>),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn list_recipes(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<ApiResponse<Paginated<RecipeResponse>>>, ApiError> {
    debug!("Fetching recipes page {}", query.page());

    let mut select = recipe::Entity::find();

    if let Some(author) = query.author {
        select = select.filter(recipe::Column::AuthorId.eq(author));
    }

    if let Some(tags_param) = query.tags.as_deref() {
        let slugs: Vec<String> = tags_param
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !slugs.is_empty() {
            select = select
                .join(JoinType::InnerJoin, recipe::Relation::RecipeTag.def())
                .join(JoinType::InnerJoin, recipe_tag::Relation::Tag.def())
                .filter(tag::Column::Slug.is_in(slugs))
                .distinct();
        }
    }

    // The favorite/cart filters only make sense for an authenticated viewer
    if let Some(viewer) = viewer.as_ref() {
        if query.is_favorited == Some(1) {
            select = select
                .join(JoinType::InnerJoin, recipe::Relation::Favorite.def())
                .filter(favorite::Column::UserId.eq(viewer.id));
        }
        if query.is_in_shopping_cart == Some(1) {
            select = select
                .join(JoinType::InnerJoin, recipe::Relation::ShoppingCart.def())
                .filter(shopping_cart::Column::UserId.eq(viewer.id));
        }
    }

    let paginator = select
        .order_by_desc(recipe::Column::Id)
        .paginate(&state.db, query.page_size());

    let totals = paginator
        .num_items_and_pages()
        .await
        .map_err(|e| db_error(e, "count recipes"))?;
    let models = paginator
        .fetch_page(query.page() - 1)
        .await
        .map_err(|e| db_error(e, "fetch recipes"))?;

    let mut results = Vec::with_capacity(models.len());
    for model in &models {
        results.push(
            build_recipe_response(&state.db, model, viewer.as_ref())
                .await
                .map_err(|e| db_error(e, "build recipe response"))?,
        );
    }

    info!("Successfully retrieved {} recipes", results.len());
    Ok(Json(ApiResponse::new(
        Paginated {
            count: totals.number_of_items,
            page: query.page(),
            pages: totals.number_of_pages,
            results,
        },
        "Recipes retrieved successfully",
    )))
}

/// Create a new recipe with nested ingredient and tag sets
#[utoipa::path(
    post,
    path = "/api/recipes/",
    tag = "recipes",
    request_body = CreateRecipeRequest,
    responses(
        (status = 201, description = "Recipe created successfully", body = ApiResponse<RecipeResponse>),
        (status = 400, description = "Invalid request data", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me, request))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Valid(Json(request)): Valid<Json<CreateRecipeRequest>>,
) -> Result<(StatusCode, Json<ApiResponse<RecipeResponse>>), ApiError> {
    debug!("Creating recipe '{}' for user {}", request.name, me.id);

    check_ingredients(&state.db, &request.ingredients).await?;
    check_tags(&state.db, &request.tags).await?;

    let image_path = save_base64_image(&state.media_root, "recipes", &request.image)
        .await
        .map_err(|err| bad_request(err.to_string()))?;

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| db_error(e, "start transaction"))?;

    let new_recipe = recipe::ActiveModel {
        name: Set(request.name.clone()),
        author_id: Set(me.id),
        image: Set(image_path),
        text: Set(request.text.clone()),
        cooking_time: Set(request.cooking_time),
        ..Default::default()
    };

    let recipe_model = new_recipe
        .insert(&txn)
        .await
        .map_err(|e| db_error(e, "create recipe"))?;

    for item in &request.ingredients {
        recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_model.id),
            ingredient_id: Set(item.id),
            quantity: Set(item.amount),
            unit: Set(item.unit.clone().unwrap_or_else(|| "g".to_string())),
        }
        .insert(&txn)
        .await
        .map_err(|e| db_error(e, "attach ingredient"))?;
    }

    for tag_id in &request.tags {
        recipe_tag::ActiveModel {
            recipe_id: Set(recipe_model.id),
            tag_id: Set(*tag_id),
        }
        .insert(&txn)
        .await
        .map_err(|e| db_error(e, "attach tag"))?;
    }

    txn.commit()
        .await
        .map_err(|e| db_error(e, "commit recipe"))?;

    info!("Recipe created with ID: {}", recipe_model.id);
    let response = build_recipe_response(&state.db, &recipe_model, Some(&me))
        .await
        .map_err(|e| db_error(e, "build recipe response"))?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(response, "Recipe created successfully")),
    ))
}

/// Get a specific recipe by ID
#[utoipa::path(
    get,
    path = "/api/recipes/{recipe_id}/",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 200, description = "Recipe retrieved successfully", body = ApiResponse<RecipeResponse>),
        (status = 404, description = "Recipe not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, viewer))]
pub async fn get_recipe(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
) -> Result<Json<ApiResponse<RecipeResponse>>, ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;
    let response = build_recipe_response(&state.db, &recipe_model, viewer.as_ref())
        .await
        .map_err(|e| db_error(e, "build recipe response"))?;
    Ok(Json(ApiResponse::new(
        response,
        "Recipe retrieved successfully",
    )))
}

/// Update a recipe (author only). Provided nested sets replace the stored
/// ones wholesale.
#[utoipa::path(
    patch,
    path = "/api/recipes/{recipe_id}/",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    request_body = UpdateRecipeRequest,
    responses(
        (status = 200, description = "Recipe updated successfully", body = ApiResponse<RecipeResponse>),
        (status = 400, description = "Invalid request data", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Not the author", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Recipe not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me, request))]
pub async fn update_recipe(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Valid(Json(request)): Valid<Json<UpdateRecipeRequest>>,
) -> Result<Json<ApiResponse<RecipeResponse>>, ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;

    if recipe_model.author_id != me.id {
        warn!(
            "User {} attempted to update recipe {} owned by {}",
            me.id, recipe_id, recipe_model.author_id
        );
        return Err(permission_denied("Only the author can modify this recipe"));
    }

    if let Some(ingredients) = request.ingredients.as_deref() {
        check_ingredients(&state.db, ingredients).await?;
    }
    if let Some(tags) = request.tags.as_deref() {
        check_tags(&state.db, tags).await?;
    }

    // Store the replacement image before touching the database; the old
    // file is removed only after a successful commit.
    let mut previous_image = None;
    let new_image_path = match request.image.as_deref() {
        Some(data) => Some(
            save_base64_image(&state.media_root, "recipes", data)
                .await
                .map_err(|err| bad_request(err.to_string()))?,
        ),
        None => None,
    };

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| db_error(e, "start transaction"))?;

    let mut active: recipe::ActiveModel = recipe_model.clone().into();
    if let Some(name) = &request.name {
        active.name = Set(name.clone());
    }
    if let Some(text) = &request.text {
        active.text = Set(text.clone());
    }
    if let Some(cooking_time) = request.cooking_time {
        active.cooking_time = Set(cooking_time);
    }
    if let Some(path) = &new_image_path {
        previous_image = Some(recipe_model.image.clone());
        active.image = Set(path.clone());
    }

    let updated = active
        .update(&txn)
        .await
        .map_err(|e| db_error(e, "update recipe"))?;

    if let Some(ingredients) = request.ingredients.as_deref() {
        recipe_ingredient::Entity::delete_many()
            .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await
            .map_err(|e| db_error(e, "replace ingredients"))?;
        for item in ingredients {
            recipe_ingredient::ActiveModel {
                recipe_id: Set(recipe_id),
                ingredient_id: Set(item.id),
                quantity: Set(item.amount),
                unit: Set(item.unit.clone().unwrap_or_else(|| "g".to_string())),
            }
            .insert(&txn)
            .await
            .map_err(|e| db_error(e, "attach ingredient"))?;
        }
    }

    if let Some(tags) = request.tags.as_deref() {
        recipe_tag::Entity::delete_many()
            .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
            .exec(&txn)
            .await
            .map_err(|e| db_error(e, "replace tags"))?;
        for tag_id in tags {
            recipe_tag::ActiveModel {
                recipe_id: Set(recipe_id),
                tag_id: Set(*tag_id),
            }
            .insert(&txn)
            .await
            .map_err(|e| db_error(e, "attach tag"))?;
        }
    }

    txn.commit()
        .await
        .map_err(|e| db_error(e, "commit recipe update"))?;

    if let Some(previous) = previous_image {
        remove_media_file(&state.media_root, &previous).await;
    }

    info!("Recipe {} updated", recipe_id);
    let response = build_recipe_response(&state.db, &updated, Some(&me))
        .await
        .map_err(|e| db_error(e, "build recipe response"))?;
    Ok(Json(ApiResponse::new(
        response,
        "Recipe updated successfully",
    )))
}

/// Delete a recipe (author only)
#[utoipa::path(
    delete,
    path = "/api/recipes/{recipe_id}/",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 403, description = "Not the author", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Recipe not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn delete_recipe(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<StatusCode, ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;

    if recipe_model.author_id != me.id {
        warn!(
            "User {} attempted to delete recipe {} owned by {}",
            me.id, recipe_id, recipe_model.author_id
        );
        return Err(permission_denied("Only the author can delete this recipe"));
    }

    let image = recipe_model.image.clone();
    recipe_model
        .delete(&state.db)
        .await
        .map_err(|e| db_error(e, "delete recipe"))?;
    remove_media_file(&state.media_root, &image).await;

    info!("Recipe {} deleted", recipe_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Add a recipe to the caller's favorites
#[utoipa::path(
    post,
    path = "/api/recipes/{recipe_id}/favorite/",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 201, description = "Recipe favorited", body = ApiResponse<RecipeShortResponse>),
        (status = 400, description = "Recipe is already in favorites", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Recipe not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn favorite_recipe(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<RecipeShortResponse>>), ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;

    let new_favorite = favorite::ActiveModel {
        user_id: Set(me.id),
        recipe_id: Set(recipe_model.id),
    };

    // Insert first; a duplicate surfaces as a unique violation instead of
    // racing a separate existence check.
    match new_favorite.insert(&state.db).await {
        Ok(_) => {
            info!("User {} favorited recipe {}", me.id, recipe_id);
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(
                    RecipeShortResponse::from(recipe_model),
                    "Recipe added to favorites",
                )),
            ))
        }
        Err(err) if is_unique_violation(&err) => {
            warn!("Recipe {} already favorited by user {}", recipe_id, me.id);
            Err(bad_request("Recipe is already in favorites"))
        }
        Err(err) => Err(db_error(err, "favorite recipe")),
    }
}

/// Remove a recipe from the caller's favorites
#[utoipa::path(
    delete,
    path = "/api/recipes/{recipe_id}/favorite/",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 204, description = "Recipe unfavorited"),
        (status = 400, description = "Recipe was not in favorites", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Recipe not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn unfavorite_recipe(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<StatusCode, ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;

    let result = favorite::Entity::delete_by_id((me.id, recipe_model.id))
        .exec(&state.db)
        .await
        .map_err(|e| db_error(e, "unfavorite recipe"))?;

    if result.rows_affected == 0 {
        warn!("Recipe {} was not favorited by user {}", recipe_id, me.id);
        return Err(bad_request("Recipe was not in favorites"));
    }

    info!("User {} unfavorited recipe {}", me.id, recipe_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Add a recipe to the caller's shopping cart
#[utoipa::path(
    post,
    path = "/api/recipes/{recipe_id}/shopping_cart/",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 201, description = "Recipe added to shopping cart", body = ApiResponse<RecipeShortResponse>),
        (status = 400, description = "Recipe is already in the shopping cart", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Recipe not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn add_to_shopping_cart(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<RecipeShortResponse>>), ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;

    let new_entry = shopping_cart::ActiveModel {
        user_id: Set(me.id),
        recipe_id: Set(recipe_model.id),
    };

    match new_entry.insert(&state.db).await {
        Ok(_) => {
            info!("User {} added recipe {} to shopping cart", me.id, recipe_id);
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(
                    RecipeShortResponse::from(recipe_model),
                    "Recipe added to shopping cart",
                )),
            ))
        }
        Err(err) if is_unique_violation(&err) => {
            warn!(
                "Recipe {} already in shopping cart of user {}",
                recipe_id, me.id
            );
            Err(bad_request("Recipe is already in the shopping cart"))
        }
        Err(err) => Err(db_error(err, "add recipe to shopping cart")),
    }
}

/// Remove a recipe from the caller's shopping cart
#[utoipa::path(
    delete,
    path = "/api/recipes/{recipe_id}/shopping_cart/",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 204, description = "Recipe removed from shopping cart"),
        (status = 400, description = "Recipe was not in the shopping cart", body = crate::schemas::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 404, description = "Recipe not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn remove_from_shopping_cart(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<StatusCode, ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;

    let result = shopping_cart::Entity::delete_by_id((me.id, recipe_model.id))
        .exec(&state.db)
        .await
        .map_err(|e| db_error(e, "remove recipe from shopping cart"))?;

    if result.rows_affected == 0 {
        warn!(
            "Recipe {} was not in shopping cart of user {}",
            recipe_id, me.id
        );
        return Err(bad_request("Recipe was not in the shopping cart"));
    }

    info!(
        "User {} removed recipe {} from shopping cart",
        me.id, recipe_id
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Download the caller's aggregated shopping list as a plain-text file.
/// Quantities are summed across all cart recipes, grouped by ingredient
/// name and measurement unit, in name order.
#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart/",
    tag = "recipes",
    responses(
        (status = 200, description = "Plain-text shopping list attachment", content_type = "text/plain"),
        (status = 401, description = "Not authenticated", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state, me))]
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<Response, ApiError> {
    let items = shopping_list_items(&state.db, me.id)
        .await
        .map_err(|e| db_error(e, "aggregate shopping list"))?;

    let body = render_shopping_list(&me.username, Local::now().date_naive(), &items);
    info!(
        "Rendered shopping list with {} items for user {}",
        items.len(),
        me.id
    );

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        (
            header::CONTENT_DISPOSITION,
            "attachment; filename=shopping_list.txt",
        ),
    ];
    Ok((headers, body).into_response())
}

/// Get a short link for a recipe
#[utoipa::path(
    get,
    path = "/api/recipes/{recipe_id}/get-link/",
    tag = "recipes",
    params(
        ("recipe_id" = i32, Path, description = "Recipe ID"),
    ),
    responses(
        (status = 200, description = "Short link", body = RecipeLinkResponse),
        (status = 404, description = "Recipe not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_recipe_link(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
    Host(host): Host,
) -> Result<Json<RecipeLinkResponse>, ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;

    Ok(Json(RecipeLinkResponse {
        short_link: format!("http://{host}/s/{}", recipe_model.id),
    }))
}

/// Resolve a short link to the recipe page
#[instrument(skip(state))]
pub async fn resolve_short_link(
    Path(recipe_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Redirect, ApiError> {
    let recipe_model = find_recipe(&state.db, recipe_id).await?;
    Ok(Redirect::temporary(&format!("/recipes/{}/", recipe_model.id)))
}
