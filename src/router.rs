use crate::handlers::{
    auth::{token_login, token_logout},
    health::health_check,
    ingredients::{get_ingredient, list_ingredients},
    recipes::{
        add_to_shopping_cart, create_recipe, delete_recipe, download_shopping_cart,
        favorite_recipe, get_recipe, get_recipe_link, list_recipes, remove_from_shopping_cart,
        resolve_short_link, unfavorite_recipe, update_recipe,
    },
    tags::{get_tag, list_tags},
    users::{
        current_user, delete_avatar, get_user, list_subscriptions, list_users, register_user,
        set_password, subscribe, unsubscribe, update_avatar,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let media_service = ServeDir::new(&state.media_root);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Token auth
        .route("/api/auth/token/login/", post(token_login))
        .route("/api/auth/token/logout/", post(token_logout))
        // Users, profiles and subscriptions
        .route("/api/users/", post(register_user).get(list_users))
        .route("/api/users/me/", get(current_user))
        .route("/api/users/set_password/", post(set_password))
        .route(
            "/api/users/me/avatar/",
            put(update_avatar).delete(delete_avatar),
        )
        .route("/api/users/subscriptions/", get(list_subscriptions))
        .route("/api/users/:user_id/", get(get_user))
        .route(
            "/api/users/:user_id/subscribe/",
            post(subscribe).delete(unsubscribe),
        )
        // Read-only reference data
        .route("/api/tags/", get(list_tags))
        .route("/api/tags/:tag_id/", get(get_tag))
        .route("/api/ingredients/", get(list_ingredients))
        .route("/api/ingredients/:ingredient_id/", get(get_ingredient))
        // Recipes
        .route("/api/recipes/", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/download_shopping_cart/",
            get(download_shopping_cart),
        )
        .route(
            "/api/recipes/:recipe_id/",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
        .route(
            "/api/recipes/:recipe_id/favorite/",
            post(favorite_recipe).delete(unfavorite_recipe),
        )
        .route(
            "/api/recipes/:recipe_id/shopping_cart/",
            post(add_to_shopping_cart).delete(remove_from_shopping_cart),
        )
        .route("/api/recipes/:recipe_id/get-link/", get(get_recipe_link))
        .route("/s/:recipe_id", get(resolve_short_link))
        // Uploaded avatar/recipe images
        .nest_service("/media", media_service)
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
