use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Root application configuration. Loaded from environment variables
/// with the prefix `RECIPE_RECOMMENDER__` and an optional TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub recommender: RecommenderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommenderConfig {
    #[serde(default)]
    pub fridge: FridgeConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub popularity: PopularityConfig,
    #[serde(default)]
    pub hybrid: HybridConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FridgeConfig {
    /// Recipes missing at most this many ingredients get `low_effort_bonus`.
    #[serde(default = "default_low_effort_missing")]
    pub low_effort_missing: usize,
    #[serde(default = "default_low_effort_bonus")]
    pub low_effort_bonus: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Minimum rating for a reviewed recipe to count as liked.
    #[serde(default = "default_like_threshold")]
    pub like_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PopularityConfig {
    /// Bayesian smoothing constant `m`.
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
    #[serde(default = "default_recency_days")]
    pub recency_days: i64,
    #[serde(default)]
    pub use_cuisine: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HybridConfig {
    /// Strategies combined by the hybrid, in registration order.
    #[serde(default = "default_hybrid_members")]
    pub members: Vec<String>,
    /// Per-strategy weight; strategies not listed weigh 1.0.
    #[serde(default)]
    pub weights: HashMap<String, f64>,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8000
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_low_effort_missing() -> usize {
    2
}
fn default_low_effort_bonus() -> f64 {
    0.1
}
fn default_like_threshold() -> f64 {
    4.0
}
fn default_smoothing() -> f64 {
    5.0
}
fn default_recency_days() -> i64 {
    30
}
fn default_hybrid_members() -> Vec<String> {
    vec![
        "content".to_string(),
        "collaborative".to_string(),
        "popularity".to_string(),
    ]
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
        }
    }
}

impl Default for FridgeConfig {
    fn default() -> Self {
        Self {
            low_effort_missing: default_low_effort_missing(),
            low_effort_bonus: default_low_effort_bonus(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            like_threshold: default_like_threshold(),
        }
    }
}

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
            recency_days: default_recency_days(),
            use_cuisine: false,
        }
    }
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            members: default_hybrid_members(),
            weights: HashMap::new(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            data: DataConfig::default(),
            recommender: RecommenderConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file overlaid with
    /// environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let builder = builder.add_source(
            config::Environment::with_prefix("RECIPE_RECOMMENDER")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("recommender.hybrid.members"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Like [`AppConfig::load`], but without an explicit file a broken
    /// environment falls back to defaults. An explicit file that is missing
    /// or malformed is always an error.
    pub fn load_or_default(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        match file {
            Some(_) => Self::load(file),
            None => Ok(Self::load(None).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to load config from environment, using defaults");
                Self::default()
            })),
        }
    }
}
