use crate::schemas::{db_error, not_found, ApiError, ApiResponse, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
};
use model::entities::tag;
use sea_orm::{EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

/// Response structure for tag operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TagResponse {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

impl From<tag::Model> for TagResponse {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
        }
    }
}

/// Get all tags. Tags are reference data and the list is not paginated.
#[utoipa::path(
    get,
    path = "/api/tags/",
    tag = "tags",
    responses(
        (status = 200, description = "List of all tags", body = ApiResponse<Vec<TagResponse>>),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<TagResponse>>>, ApiError> {
    debug!("Fetching all tags");

    let tags = tag::Entity::find()
        .order_by_asc(tag::Column::Name)
        .all(&state.db)
        .await
        .map_err(|e| db_error(e, "fetch tags"))?;

    let tag_responses: Vec<TagResponse> = tags.into_iter().map(TagResponse::from).collect();
    info!("Successfully fetched {} tags", tag_responses.len());

    Ok(Json(ApiResponse::new(
        tag_responses,
        "Tags retrieved successfully",
    )))
}

/// Get a specific tag by ID
#[utoipa::path(
    get,
    path = "/api/tags/{tag_id}/",
    tag = "tags",
    params(
        ("tag_id" = i32, Path, description = "Tag ID")
    ),
    responses(
        (status = 200, description = "Tag details", body = ApiResponse<TagResponse>),
        (status = 404, description = "Tag not found", body = crate::schemas::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn get_tag(
    Path(tag_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TagResponse>>, ApiError> {
    debug!("Fetching tag with ID: {}", tag_id);

    match tag::Entity::find_by_id(tag_id)
        .one(&state.db)
        .await
        .map_err(|e| db_error(e, "fetch tag"))?
    {
        Some(tag_model) => Ok(Json(ApiResponse::new(
            TagResponse::from(tag_model),
            "Tag retrieved successfully",
        ))),
        None => {
            warn!("Tag with ID {} not found", tag_id);
            Err(not_found("Tag"))
        }
    }
}
