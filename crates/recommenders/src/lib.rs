//! Recipe recommenders: fridge matching, content similarity, item-item
//! collaborative filtering, user-user personal ratings, popularity ranking,
//! and the hybrid aggregator that votes across them.

#![warn(clippy::unwrap_used)]

pub mod collaborative;
pub mod content;
pub mod fridge;
pub mod hybrid;
pub mod personal;
pub mod popularity;
pub mod similarity;
pub mod strategy;
pub mod suite;

pub use collaborative::CollaborativeRecommender;
pub use content::ContentRecommender;
pub use fridge::{FridgeMatch, FridgeRecommender};
pub use hybrid::HybridRecommender;
pub use personal::PersonalRecommender;
pub use popularity::PopularityRecommender;
pub use strategy::{IdentityNeed, Recommender};
pub use suite::RecommenderSuite;
