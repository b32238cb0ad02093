use crate::schemas::{db_error, not_found, ApiError, ApiResponse, AppState};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use model::entities::ingredient;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

/// Response structure for ingredient operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngredientResponse {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientResponse {
    fn from(model: ingredient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            measurement_unit: model.measurement_unit,
        }
    }
}

/// Query parameters for the ingredient list
#[derive(Debug, Deserialize, IntoParams)]
pub struct IngredientListQuery {
    /// Case-insensitive name prefix to filter by
    pub name: Option<String>,
}

/// Get all ingredients, optionally filtered by a case-insensitive name
/// prefix. Reference data, not paginated.
#[utoipa::path(
    get,
    path = "/api/ingredients/",
    tag = "ingredients",
    params(IngredientListQuery),
    responses(
        (status = 200, description = "List of ingredients", body = ApiResponse<Vec<IngredientResponse>>),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_ingredients(
    Query(query): Query<IngredientListQuery>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<IngredientResponse>>>, ApiError> {
    debug!("Fetching ingredients, name prefix: {:?}", query.name);

    let mut select = ingredient::Entity::find().order_by_asc(ingredient::Column::Name);

    if let Some(name) = query.name.as_deref().filter(|n| !n.is_empty()) {
        select = select.filter(
            Expr::expr(Func::lower(Expr::col((
                ingredient::Entity,
                ingredient::Column::Name,
            ))))
            .like(format!("{}%", name.to_lowercase())),
        );
    }

    let ingredients = select
        .all(&state.db)
        .await
        .map_err(|e| db_error(e, "fetch ingredients"))?;

    let responses: Vec<IngredientResponse> = ingredients
        .into_iter()
        .map(IngredientResponse::from)
        .collect();
    info!("Successfully fetched {} ingredients", responses.len());

    Ok(Json(ApiResponse::new(
        responses,
        "Ingredients retrieved successfully",
    )))
}

/// Get a specific ingredient by ID
#[utoipa::path(
    get,
    path = "/api/ingredients/{ingredient_id}/",
    tag = "ingredients",
    params(
        ("ingredient_id" = i32, Path, description = "Ingredient ID")
    ),
    responses(
        (status = 200, description = "Ingredient details", body = ApiResponse<IngredientResponse>),
        (status = 404, description = "Ingredient not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_ingredient(
    Path(ingredient_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<IngredientResponse>>, ApiError> {
    debug!("Fetching ingredient with ID: {}", ingredient_id);

    match ingredient::Entity::find_by_id(ingredient_id)
        .one(&state.db)
        .await
        .map_err(|e| db_error(e, "fetch ingredient"))?
    {
        Some(model) => Ok(Json(ApiResponse::new(
            IngredientResponse::from(model),
            "Ingredient retrieved successfully",
        ))),
        None => {
            warn!("Ingredient with ID {} not found", ingredient_id);
            Err(not_found("Ingredient"))
        }
    }
}
