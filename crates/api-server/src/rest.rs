//! REST API handlers for recommendations, the recipe catalog and
//! operational endpoints.

use axum::extract::{MatchedPath, Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use recipe_core::config::RecommenderConfig;
use recipe_core::types::{Recipe, Review, StrategyKind};
use recipe_core::{RecipeId, RecommenderError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::snapshot::Snapshot;

/// Maximum string field length (user ID).
const MAX_FIELD_LEN: usize = 256;

/// Upper bound on `top_n` per request.
const MAX_TOP_N: usize = 100;

const DEFAULT_TOP_N: usize = 5;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    snapshot: Arc<RwLock<Arc<Snapshot>>>,
    pub data_dir: PathBuf,
    pub recommender: RecommenderConfig,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(snapshot: Snapshot, data_dir: PathBuf, recommender: RecommenderConfig) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
            data_dir,
            recommender,
            start_time: Instant::now(),
        }
    }

    /// The snapshot current at call time. Requests keep it alive across a
    /// concurrent reload.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }

    fn replace(&self, snapshot: Snapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

fn validation_error(message: &'static str) -> ApiError {
    metrics::counter!("api.validation_errors").increment(1);
    api_error(StatusCode::BAD_REQUEST, "invalid_request", message)
}

/// Validate the caller's identity and requested size at the API boundary.
fn validate_request(user_id: &str, top_n: Option<usize>) -> Result<usize, &'static str> {
    if user_id.is_empty() {
        return Err("'user_id' must not be empty");
    }
    if user_id.len() > MAX_FIELD_LEN {
        return Err("'user_id' exceeds maximum length");
    }
    let top_n = top_n.unwrap_or(DEFAULT_TOP_N);
    if top_n == 0 {
        return Err("'top_n' must be at least 1");
    }
    if top_n > MAX_TOP_N {
        return Err("'top_n' exceeds maximum of 100");
    }
    Ok(top_n)
}

/// Record per-route request latency in microseconds.
pub async fn track_latency(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_us = start.elapsed().as_micros() as u64;

    metrics::histogram!("api.latency_us", "endpoint" => endpoint).record(latency_us as f64);
    response
}

fn unscored(ids: Vec<RecipeId>) -> Vec<(RecipeId, Option<f64>)> {
    ids.into_iter().map(|id| (id, None)).collect()
}

/// GET /: Service banner.
#[utoipa::path(
    get,
    path = "/",
    tag = "Operations",
    responses(
        (status = 200, description = "Service is up", body = WelcomeResponse),
    )
)]
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Recipe recommender is running".to_string(),
        docs: "/swagger-ui".to_string(),
    })
}

/// POST /v1/recommend/:strategy: Recommend recipes with one strategy.
#[utoipa::path(
    post,
    path = "/v1/recommend/{strategy}",
    tag = "Recommendations",
    params(
        ("strategy" = StrategyKind, Path, description = "Strategy to answer with"),
    ),
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "Recommended recipes, best first", body = RecommendResponse),
        (status = 400, description = "Invalid request or unknown strategy", body = ErrorResponse),
        (status = 500, description = "Strategy failed", body = ErrorResponse),
    )
)]
pub async fn handle_recommend(
    State(state): State<AppState>,
    Path(strategy): Path<String>,
    Json(request): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
    metrics::counter!("api.requests", "endpoint" => "recommend").increment(1);

    let kind: StrategyKind = strategy.parse().map_err(|e: RecommenderError| {
        warn!(strategy = %strategy, "Unknown strategy requested");
        metrics::counter!("api.validation_errors").increment(1);
        api_error(StatusCode::BAD_REQUEST, "unknown_strategy", e.to_string())
    })?;

    let top_n = validate_request(&request.user_id, request.top_n).map_err(|msg| {
        warn!(user_id = %request.user_id, error = msg, "Recommend request validation failed");
        validation_error(msg)
    })?;

    let snapshot = state.snapshot();
    let result = match (kind, request.cuisine.as_deref()) {
        (StrategyKind::Popularity, Some(cuisine)) => Ok(unscored(
            snapshot
                .suite
                .popularity()
                .recommend_in_cuisine(cuisine, top_n),
        )),
        (StrategyKind::Personal, _) => Ok(snapshot
            .suite
            .personal()
            .scored(&request.user_id, top_n)
            .into_iter()
            .map(|(id, score)| (id, Some(score)))
            .collect()),
        _ => snapshot
            .suite
            .recommend(kind, Some(&request.user_id), top_n)
            .map(unscored),
    };

    let ranked = result.map_err(|e| {
        if e.is_client_error() {
            metrics::counter!("api.validation_errors").increment(1);
            api_error(StatusCode::BAD_REQUEST, "invalid_request", e.to_string())
        } else {
            error!(error = %e, strategy = %kind, user_id = %request.user_id, "Recommendation failed");
            metrics::counter!("api.errors").increment(1);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "recommendation_failed",
                "Internal processing error",
            )
        }
    })?;

    metrics::counter!("api.recommendations", "strategy" => kind.as_str()).increment(1);

    let recipes = ranked
        .into_iter()
        .map(|(id, score)| RecommendedRecipe {
            name: snapshot.title(&id),
            id,
            score,
        })
        .collect();

    Ok(Json(RecommendResponse {
        request_id: Uuid::new_v4(),
        strategy: kind,
        user_id: request.user_id,
        recipes,
        generated_at: Utc::now(),
    }))
}

/// POST /v1/fridge/matches: Recipes sharing at least one ingredient with the
/// user's fridge, scored by rarity-weighted coverage with a penalty per
/// missing ingredient.
#[utoipa::path(
    post,
    path = "/v1/fridge/matches",
    tag = "Recommendations",
    request_body = FridgeMatchesRequest,
    responses(
        (status = 200, description = "Best fridge matches", body = FridgeMatchesResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn handle_fridge_matches(
    State(state): State<AppState>,
    Json(request): Json<FridgeMatchesRequest>,
) -> Result<Json<FridgeMatchesResponse>, ApiError> {
    metrics::counter!("api.requests", "endpoint" => "fridge_matches").increment(1);

    let top_n = validate_request(&request.user_id, request.top_n).map_err(|msg| {
        warn!(user_id = %request.user_id, error = msg, "Fridge request validation failed");
        validation_error(msg)
    })?;

    let snapshot = state.snapshot();
    let matches = snapshot
        .suite
        .fridge()
        .detailed_matches(&request.user_id)
        .into_iter()
        .take(top_n)
        .map(|m| FridgeMatchView {
            name: snapshot.title(&m.recipe_id),
            score: m.score,
            missing: m
                .missing
                .iter()
                .map(|i| snapshot.ingredient_name(i))
                .collect(),
            recipe_id: m.recipe_id,
        })
        .collect();

    Ok(Json(FridgeMatchesResponse {
        user_id: request.user_id,
        matches,
    }))
}

/// GET /v1/recipes: The recipe catalog.
#[utoipa::path(
    get,
    path = "/v1/recipes",
    tag = "Catalog",
    responses(
        (status = 200, description = "All recipes", body = [Recipe]),
    )
)]
pub async fn list_recipes(State(state): State<AppState>) -> Json<Vec<Recipe>> {
    Json(state.snapshot().dataset.recipes.clone())
}

/// GET /v1/reviews: Every review in the dataset.
#[utoipa::path(
    get,
    path = "/v1/reviews",
    tag = "Catalog",
    responses(
        (status = 200, description = "All reviews", body = [Review]),
    )
)]
pub async fn list_reviews(State(state): State<AppState>) -> Json<Vec<Review>> {
    Json(state.snapshot().dataset.reviews.clone())
}

/// POST /v1/admin/reload: Re-read the data directory and rebuild every
/// recommender. The previous snapshot stays live if loading fails.
#[utoipa::path(
    post,
    path = "/v1/admin/reload",
    tag = "Operations",
    responses(
        (status = 200, description = "Snapshot replaced", body = ReloadResponse),
        (status = 500, description = "Reload failed, previous data kept", body = ErrorResponse),
    )
)]
pub async fn handle_reload(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, ApiError> {
    let dir = state.data_dir.clone();
    let config = state.recommender.clone();

    let loaded = tokio::task::spawn_blocking(move || Snapshot::load(&dir, &config))
        .await
        .map_err(|e| {
            error!(error = %e, "Reload task panicked");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "reload_failed",
                "Internal processing error",
            )
        })?;

    match loaded {
        Ok(snapshot) => {
            let response = ReloadResponse {
                users: snapshot.dataset.users.len(),
                recipes: snapshot.dataset.recipes.len(),
                reviews: snapshot.dataset.reviews.len(),
                loaded_at: snapshot.loaded_at,
            };
            state.replace(snapshot);
            metrics::counter!("api.reloads").increment(1);
            info!(recipes = response.recipes, "Data reloaded");
            Ok(Json(response))
        }
        Err(e) => {
            error!(error = %e, dir = %state.data_dir.display(), "Reload failed, keeping previous data");
            metrics::counter!("api.errors").increment(1);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "reload_failed",
                e.to_string(),
            ))
        }
    }
}

/// GET /health: Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses(
        (status = 200, description = "Service health", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.snapshot();
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        recipes: snapshot.dataset.recipes.len(),
        loaded_at: snapshot.loaded_at,
    })
}

/// GET /ready: Readiness probe for Kubernetes.
/// Returns 200 only once a non-empty catalog is loaded.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready to serve"),
        (status = 503, description = "No recipes loaded"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.snapshot().dataset.recipes.is_empty() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /live: Liveness probe for Kubernetes.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses(
        (status = 200, description = "Process is alive"),
    )
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecommendRequest {
    pub user_id: String,
    /// Defaults to 5, at most 100.
    #[serde(default)]
    pub top_n: Option<usize>,
    /// Restrict `popularity` to one cuisine.
    #[serde(default)]
    pub cuisine: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendedRecipe {
    pub id: String,
    pub name: String,
    /// Predicted rating, only for `personal`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecommendResponse {
    pub request_id: Uuid,
    pub strategy: StrategyKind,
    pub user_id: String,
    pub recipes: Vec<RecommendedRecipe>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FridgeMatchesRequest {
    pub user_id: String,
    #[serde(default)]
    pub top_n: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FridgeMatchView {
    pub recipe_id: String,
    pub name: String,
    pub score: f64,
    /// Names of the ingredients still to buy.
    pub missing: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FridgeMatchesResponse {
    pub user_id: String,
    pub matches: Vec<FridgeMatchView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReloadResponse {
    pub users: usize,
    pub recipes: usize,
    pub reviews: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WelcomeResponse {
    pub message: String,
    pub docs: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub recipes: usize,
    pub loaded_at: DateTime<Utc>,
}
