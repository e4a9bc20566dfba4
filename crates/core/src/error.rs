use thiserror::Error;

pub type RecommenderResult<T> = Result<T, RecommenderError>;

#[derive(Error, Debug)]
pub enum RecommenderError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dataset error in {file}: {message}")]
    Data { file: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Recommender '{name}' failed: {message}")]
    Strategy { name: String, message: String },

    #[error("Recommender '{0}' registered more than once")]
    DuplicateRecommender(String),

    #[error("Weight for recommender '{name}' must be finite, got {weight}")]
    InvalidWeight { name: String, weight: f64 },

    #[error("Unknown recommendation strategy: {0}")]
    UnknownStrategy(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RecommenderError {
    pub fn data(file: impl Into<String>, message: impl ToString) -> Self {
        Self::Data {
            file: file.into(),
            message: message.to_string(),
        }
    }

    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::UnknownStrategy(_)
        )
    }
}
