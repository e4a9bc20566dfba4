use recipe_core::config::RecommenderConfig;
use recipe_core::types::{Dataset, StrategyKind};
use recipe_core::{RecipeId, RecommenderError, RecommenderResult};
use std::sync::Arc;
use tracing::info;

use crate::collaborative::CollaborativeRecommender;
use crate::content::ContentRecommender;
use crate::fridge::FridgeRecommender;
use crate::hybrid::HybridRecommender;
use crate::personal::PersonalRecommender;
use crate::popularity::PopularityRecommender;
use crate::strategy::Recommender;

/// Every strategy built over the same dataset snapshot.
pub struct RecommenderSuite {
    fridge: Arc<FridgeRecommender>,
    content: Arc<ContentRecommender>,
    collaborative: Arc<CollaborativeRecommender>,
    personal: Arc<PersonalRecommender>,
    popularity: Arc<PopularityRecommender>,
    hybrid: HybridRecommender,
}

impl RecommenderSuite {
    /// Build all strategies, then register the configured hybrid members
    /// by name.
    pub fn build(dataset: &Dataset, config: &RecommenderConfig) -> RecommenderResult<Self> {
        let fridge = Arc::new(FridgeRecommender::from_dataset(dataset, &config.fridge));
        let content = Arc::new(ContentRecommender::from_dataset(dataset, &config.content));
        let collaborative = Arc::new(CollaborativeRecommender::from_dataset(dataset));
        let personal = Arc::new(PersonalRecommender::from_dataset(dataset));
        let popularity = Arc::new(PopularityRecommender::from_dataset(dataset, &config.popularity));

        let mut members: Vec<(String, Arc<dyn Recommender>)> = Vec::new();
        for name in &config.hybrid.members {
            let kind: StrategyKind = name.parse()?;
            let member: Arc<dyn Recommender> = match kind {
                StrategyKind::Fridge => fridge.clone(),
                StrategyKind::Content => content.clone(),
                StrategyKind::Collaborative => collaborative.clone(),
                StrategyKind::Personal => personal.clone(),
                StrategyKind::Popularity => popularity.clone(),
                // the hybrid cannot vote for itself
                StrategyKind::Hybrid => return Err(RecommenderError::UnknownStrategy(name.clone())),
            };
            members.push((name.clone(), member));
        }
        let hybrid = HybridRecommender::new(members, Some(config.hybrid.weights.clone()))?;

        info!(members = ?hybrid.member_names(), "Recommender suite built");

        Ok(Self {
            fridge,
            content,
            collaborative,
            personal,
            popularity,
            hybrid,
        })
    }

    pub fn strategy(&self, kind: StrategyKind) -> &dyn Recommender {
        match kind {
            StrategyKind::Fridge => self.fridge.as_ref(),
            StrategyKind::Content => self.content.as_ref(),
            StrategyKind::Collaborative => self.collaborative.as_ref(),
            StrategyKind::Personal => self.personal.as_ref(),
            StrategyKind::Popularity => self.popularity.as_ref(),
            StrategyKind::Hybrid => &self.hybrid,
        }
    }

    /// Run one strategy. Unlike the hybrid, a single strategy's failure is
    /// returned to the caller.
    pub fn recommend(
        &self,
        kind: StrategyKind,
        user_id: Option<&str>,
        top_n: usize,
    ) -> RecommenderResult<Vec<RecipeId>> {
        if top_n == 0 {
            return Err(RecommenderError::InvalidArgument(
                "top_n must be a positive integer".to_string(),
            ));
        }
        self.strategy(kind).recommend(user_id, top_n)
    }

    pub fn fridge(&self) -> &FridgeRecommender {
        &self.fridge
    }

    pub fn personal(&self) -> &PersonalRecommender {
        &self.personal
    }

    pub fn popularity(&self) -> &PopularityRecommender {
        &self.popularity
    }

    pub fn hybrid(&self) -> &HybridRecommender {
        &self.hybrid
    }
}
