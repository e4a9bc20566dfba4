//! OpenAPI specification and Swagger UI configuration.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Recipe Recommender API",
        version = "0.1.0",
        description = "Recipe recommendations from fridge contents, ingredient similarity, ratings and popularity, plus a hybrid that votes across strategies.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Recommendations", description = "Per-strategy and hybrid recipe recommendations"),
        (name = "Catalog", description = "Recipes and reviews currently loaded"),
        (name = "Operations", description = "Health, readiness, liveness and data reload"),
    ),
    paths(
        // Recommendations
        crate::rest::handle_recommend,
        crate::rest::handle_fridge_matches,
        // Catalog
        crate::rest::list_recipes,
        crate::rest::list_reviews,
        // Operations
        crate::rest::welcome,
        crate::rest::handle_reload,
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        recipe_core::types::Recipe,
        recipe_core::types::Review,
        recipe_core::types::StrategyKind,
        crate::rest::RecommendRequest,
        crate::rest::RecommendResponse,
        crate::rest::RecommendedRecipe,
        crate::rest::FridgeMatchesRequest,
        crate::rest::FridgeMatchesResponse,
        crate::rest::FridgeMatchView,
        crate::rest::ReloadResponse,
        crate::rest::WelcomeResponse,
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;
