//! Popularity ranking, the same for every user.
//!
//! Each reviewed recipe gets a Bayesian average rating
//! `(avg * n + mu * m) / (n + m)` so a single five-star review cannot beat
//! a hundred four-star ones. Recent reviews add `ln(1 + recent)` and
//! cookbook saves add `ln(1 + saves)`.

use chrono::{DateTime, Duration, Utc};
use recipe_core::config::PopularityConfig;
use recipe_core::types::Dataset;
use recipe_core::{RecipeId, RecommenderResult};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::similarity::rank_descending;
use crate::strategy::{IdentityNeed, Recommender};

pub struct PopularityRecommender {
    /// Recipes best first with their final score.
    ranked: Vec<(RecipeId, f64)>,
    cuisines: Option<HashMap<RecipeId, String>>,
}

#[derive(Default)]
struct RecipeStats {
    rating_sum: f64,
    rating_count: usize,
    recent: usize,
    saves: usize,
}

impl PopularityRecommender {
    pub fn from_dataset(dataset: &Dataset, config: &PopularityConfig) -> Self {
        Self::build_at(dataset, config, Utc::now())
    }

    /// Build with an explicit clock for the recency window.
    pub fn build_at(dataset: &Dataset, config: &PopularityConfig, now: DateTime<Utc>) -> Self {
        let cutoff = Duration::try_days(config.recency_days)
            .and_then(|window| now.checked_sub_signed(window));
        if cutoff.is_none() {
            warn!(recency_days = config.recency_days, "Recency window out of range, ignoring recency");
        }
        let has_timestamps = dataset.reviews.iter().any(|r| r.timestamp.is_some());

        let mut stats: BTreeMap<&str, RecipeStats> = BTreeMap::new();
        let mut global_sum = 0.0;
        let mut global_count = 0usize;

        for review in &dataset.reviews {
            let entry = stats.entry(review.recipe_id.as_str()).or_default();
            if let Some(rating) = review.rating {
                entry.rating_sum += rating;
                entry.rating_count += 1;
                global_sum += rating;
                global_count += 1;
            }
            if cutoff.is_some_and(|cutoff| review.timestamp.is_some_and(|ts| ts >= cutoff)) {
                entry.recent += 1;
            }
        }
        for save in &dataset.cookbook {
            if let Some(entry) = stats.get_mut(save.recipe_id.as_str()) {
                entry.saves += 1;
            }
        }

        let mu = if global_count > 0 {
            global_sum / global_count as f64
        } else {
            0.0
        };
        let m = config.smoothing;

        let scored: Vec<(RecipeId, f64)> = stats
            .into_iter()
            .filter(|(_, s)| s.rating_count > 0)
            .map(|(recipe_id, s)| {
                let n = s.rating_count as f64;
                let avg = s.rating_sum / n;
                let mut score = (avg * n + mu * m) / (n + m);
                if has_timestamps {
                    score += (s.recent as f64).ln_1p();
                }
                if !dataset.cookbook.is_empty() {
                    score += (s.saves as f64).ln_1p();
                }
                (recipe_id.to_string(), score)
            })
            .collect();

        let ranked = rank_descending(scored, usize::MAX);

        let cuisines = config.use_cuisine.then(|| {
            dataset
                .recipes
                .iter()
                .filter_map(|r| r.cuisine.as_ref().map(|c| (r.id.clone(), c.clone())))
                .collect()
        });

        debug!(recipes = ranked.len(), mu, "Popularity recommender built");

        Self { ranked, cuisines }
    }

    /// Ranked recipes with their scores.
    pub fn ranking(&self) -> &[(RecipeId, f64)] {
        &self.ranked
    }

    /// Top recipes of one cuisine. Without cuisine data this is the global
    /// ranking.
    pub fn recommend_in_cuisine(&self, cuisine: &str, count: usize) -> Vec<RecipeId> {
        let Some(cuisines) = &self.cuisines else {
            return self.top(count);
        };
        self.ranked
            .iter()
            .filter(|(id, _)| cuisines.get(id).is_some_and(|c| c == cuisine))
            .take(count)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn top(&self, count: usize) -> Vec<RecipeId> {
        self.ranked
            .iter()
            .take(count)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl Recommender for PopularityRecommender {
    fn identity_need(&self) -> IdentityNeed {
        IdentityNeed::Unused
    }

    fn recommend(&self, _user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>> {
        Ok(self.top(count))
    }
}
