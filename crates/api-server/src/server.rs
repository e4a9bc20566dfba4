//! API server: the REST router and the Prometheus exporter.

use crate::rest::{self, AppState};
use crate::snapshot::Snapshot;
use crate::swagger::ApiDoc;
use axum::routing::{get, post};
use axum::Router;
use recipe_core::config::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the HTTP router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(rest::welcome))
        // Recommendations
        .route("/v1/recommend/:strategy", post(rest::handle_recommend))
        .route("/v1/fridge/matches", post(rest::handle_fridge_matches))
        // Catalog
        .route("/v1/recipes", get(rest::list_recipes))
        .route("/v1/reviews", get(rest::list_reviews))
        // Operational endpoints
        .route("/v1/admin/reload", post(rest::handle_reload))
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .route_layer(axum::middleware::from_fn(rest::track_latency))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Main API server managing the REST endpoints and the metrics exporter.
pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, snapshot: Snapshot) -> Self {
        let state = AppState::new(
            snapshot,
            PathBuf::from(&config.data.dir),
            config.recommender.clone(),
        );
        Self { config, state }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::{ErrorResponse, FridgeMatchesResponse, HealthResponse, RecommendResponse, ReloadResponse};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, SharedString, Unit};
    use recipe_core::config::RecommenderConfig;
    use recipe_core::types::{Dataset, FridgeItem, Ingredient, Recipe, RecipeIngredient, Review};
    use recipe_core::StrategyKind;
    use serde::de::DeserializeOwned;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn recipe(id: &str, name: &str) -> Recipe {
        Recipe {
            id: id.into(),
            name: name.into(),
            cuisine: None,
        }
    }

    fn review(user: &str, recipe: &str, rating: f64) -> Review {
        Review {
            user_id: user.into(),
            recipe_id: recipe.into(),
            rating: Some(rating),
            has_photos: false,
            timestamp: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            recipes: vec![recipe("r1", "Omelette"), recipe("r2", "Pancakes")],
            ingredients: vec![
                Ingredient {
                    id: "egg".into(),
                    name: "Egg".into(),
                    importance: None,
                },
                Ingredient {
                    id: "flour".into(),
                    name: "Flour".into(),
                    importance: None,
                },
            ],
            recipe_ingredients: vec![
                RecipeIngredient {
                    recipe_id: "r1".into(),
                    ingredient_id: "egg".into(),
                },
                RecipeIngredient {
                    recipe_id: "r2".into(),
                    ingredient_id: "egg".into(),
                },
                RecipeIngredient {
                    recipe_id: "r2".into(),
                    ingredient_id: "flour".into(),
                },
                // ingredient list for a recipe missing from the catalog
                RecipeIngredient {
                    recipe_id: "r3".into(),
                    ingredient_id: "egg".into(),
                },
                // shares nothing with u1's fridge
                RecipeIngredient {
                    recipe_id: "r4".into(),
                    ingredient_id: "bread".into(),
                },
            ],
            reviews: vec![
                review("u1", "r1", 5.0),
                review("u2", "r2", 4.0),
                review("u2", "r3", 5.0),
                review("u2", "r1", 4.0),
            ],
            fridge: vec![FridgeItem {
                user_id: "u1".into(),
                ingredient_id: "egg".into(),
            }],
            ..Default::default()
        }
    }

    fn state_with_dir(dir: PathBuf) -> AppState {
        let config = RecommenderConfig::default();
        let snapshot = Snapshot::build(dataset(), &config).unwrap();
        AppState::new(snapshot, dir, config)
    }

    fn test_router() -> Router {
        router(state_with_dir(PathBuf::from("/nonexistent")))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body<T: DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_probes() {
        let app = test_router();
        let response = app.clone().oneshot(get("/live")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(get("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = json_body(response).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.recipes, 2);
    }

    #[tokio::test]
    async fn test_recommend_popularity() {
        let response = test_router()
            .oneshot(post_json(
                "/v1/recommend/popularity",
                r#"{"user_id": "u1", "top_n": 2}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: RecommendResponse = json_body(response).await;
        assert_eq!(body.strategy, StrategyKind::Popularity);
        assert_eq!(body.user_id, "u1");
        assert_eq!(body.recipes.len(), 2);
        // r3 has a review but no catalog entry
        for recipe in &body.recipes {
            if recipe.id == "r3" {
                assert_eq!(recipe.name, "(missing title: r3)");
            }
        }
    }

    #[tokio::test]
    async fn test_recommend_hybrid_defaults_top_n() {
        let response = test_router()
            .oneshot(post_json("/v1/recommend/hybrid", r#"{"user_id": "u1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: RecommendResponse = json_body(response).await;
        assert!(body.recipes.len() <= 5);
    }

    #[tokio::test]
    async fn test_unknown_strategy_is_bad_request() {
        let response = test_router()
            .oneshot(post_json("/v1/recommend/svd", r#"{"user_id": "u1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = json_body(response).await;
        assert_eq!(body.error, "unknown_strategy");
    }

    #[tokio::test]
    async fn test_validation_errors() {
        for body in [
            r#"{"user_id": ""}"#,
            r#"{"user_id": "u1", "top_n": 0}"#,
            r#"{"user_id": "u1", "top_n": 101}"#,
        ] {
            let response = test_router()
                .oneshot(post_json("/v1/recommend/content", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            let error: ErrorResponse = json_body(response).await;
            assert_eq!(error.error, "invalid_request");
        }
    }

    #[tokio::test]
    async fn test_fridge_matches_name_missing_ingredients() {
        let response = test_router()
            .oneshot(post_json("/v1/fridge/matches", r#"{"user_id": "u1", "top_n": 3}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: FridgeMatchesResponse = json_body(response).await;
        let pancakes = body
            .matches
            .iter()
            .find(|m| m.recipe_id == "r2")
            .unwrap();
        assert_eq!(pancakes.name, "Pancakes");
        assert_eq!(pancakes.missing, vec!["Flour"]);
        // egg is in every egg recipe (0.1), flour is rare (0.77): 0.1 / 0.87 - 0.05
        assert_eq!(pancakes.score, 0.06);
        assert!(body.matches.iter().all(|m| m.recipe_id != "r4"));
    }

    #[tokio::test]
    async fn test_recommend_personal_includes_scores() {
        let response = test_router()
            .oneshot(post_json(
                "/v1/recommend/personal",
                r#"{"user_id": "u1", "top_n": 2}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: RecommendResponse = json_body(response).await;
        let ids: Vec<&str> = body.recipes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r2"]);
        let scores: Vec<f64> = body.recipes.iter().filter_map(|r| r.score).collect();
        assert_eq!(scores.len(), 2);
        assert!(scores[0] > scores[1] && scores[1] > 0.0);
    }

    #[tokio::test]
    async fn test_non_personal_recommendations_omit_scores() {
        let response = test_router()
            .oneshot(post_json("/v1/recommend/popularity", r#"{"user_id": "u1"}"#))
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        for recipe in body["recipes"].as_array().unwrap() {
            assert!(recipe.get("score").is_none());
        }
    }

    /// Captures histogram names and labels.
    #[derive(Default)]
    struct HistogramCapture {
        seen: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
    }

    impl metrics::Recorder for HistogramCapture {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, _: &Key, _: &Metadata<'_>) -> Counter {
            Counter::noop()
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            let labels = key
                .labels()
                .map(|l| (l.key().to_string(), l.value().to_string()))
                .collect();
            self.seen
                .lock()
                .unwrap()
                .push((key.name().to_string(), labels));
            Histogram::noop()
        }
    }

    #[test]
    fn test_request_latency_is_recorded_per_route() {
        let recorder = HistogramCapture::default();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let status = metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async { test_router().oneshot(get("/live")).await.unwrap().status() })
        });
        assert_eq!(status, StatusCode::OK);

        let seen = recorder.seen.lock().unwrap();
        assert!(seen.iter().any(|(name, labels)| {
            name == "api.latency_us"
                && labels.contains(&("endpoint".to_string(), "/live".to_string()))
        }));
    }

    #[tokio::test]
    async fn test_catalog_endpoints() {
        let app = test_router();
        let response = app.clone().oneshot(get("/v1/recipes")).await.unwrap();
        let recipes: Vec<Recipe> = json_body(response).await;
        assert_eq!(recipes.len(), 2);

        let response = app.oneshot(get("/v1/reviews")).await.unwrap();
        let reviews: Vec<Review> = json_body(response).await;
        assert_eq!(reviews.len(), 4);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_previous_data() {
        let state = state_with_dir(PathBuf::from("/nonexistent/recipe-data"));
        let app = router(state.clone());

        let response = app
            .oneshot(post_json("/v1/admin/reload", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.snapshot().dataset.recipes.len(), 2);
    }

    #[tokio::test]
    async fn test_reload_swaps_snapshot() {
        let dir = TempDir::new().unwrap();
        let files = [
            ("users.csv", "id\nu1\n"),
            ("recipes.csv", "id,name\nr9,Focaccia\n"),
            ("ingredients.csv", "id,name\nflour,Flour\n"),
            ("recipe_ingredients.csv", "recipe_id,ingredient_id\nr9,flour\n"),
            ("reviews.csv", "user_id,recipe_id,rating\nu1,r9,5\n"),
            ("user_fridge_ingredients.csv", "user_id,ingredient_id\nu1,flour\n"),
            ("user_cookbook_recipes.csv", "user_id,recipe_id\n"),
        ];
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }

        let state = state_with_dir(dir.path().to_path_buf());
        let app = router(state.clone());

        let response = app
            .oneshot(post_json("/v1/admin/reload", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: ReloadResponse = json_body(response).await;
        assert_eq!(body.recipes, 1);
        assert_eq!(state.snapshot().title("r9"), "Focaccia");
    }

    #[tokio::test]
    async fn test_swagger_document_is_served() {
        let response = test_router()
            .oneshot(get("/api-docs/openapi.json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
