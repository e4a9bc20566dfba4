//! Item-item collaborative filtering over a user × recipe interaction
//! matrix. Reviews contribute their rating (3 when unrated) plus one point
//! for attached photos; cookbook saves contribute 1.5, or 2.5 for
//! favourites. Interactions for the same pair add up.

use ndarray::Array2;
use recipe_core::types::Dataset;
use recipe_core::{RecipeId, RecommenderResult};
use std::collections::HashSet;
use tracing::debug;

use crate::similarity::{cosine_similarity, rank_descending, Index};
use crate::strategy::{require_user, Recommender};

const UNRATED_REVIEW: f64 = 3.0;
const PHOTO_BONUS: f64 = 1.0;
const SAVE_SCORE: f64 = 1.5;
const FAVORITE_BONUS: f64 = 1.0;

pub struct CollaborativeRecommender {
    users: Index,
    recipes: Index,
    interactions: Array2<f64>,
    /// Recipe × recipe cosine similarity of the interaction columns.
    similarity: Array2<f64>,
}

impl CollaborativeRecommender {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut events: Vec<(&str, &str, f64)> = dataset
            .reviews
            .iter()
            .map(|r| {
                let base = r.rating.unwrap_or(UNRATED_REVIEW);
                let bonus = if r.has_photos { PHOTO_BONUS } else { 0.0 };
                (r.user_id.as_str(), r.recipe_id.as_str(), base + bonus)
            })
            .collect();
        events.extend(dataset.cookbook.iter().map(|c| {
            let bonus = if c.is_favorite { FAVORITE_BONUS } else { 0.0 };
            (c.user_id.as_str(), c.recipe_id.as_str(), SAVE_SCORE + bonus)
        }));

        let user_keys: Vec<String> = events.iter().map(|e| e.0.to_string()).collect();
        let recipe_keys: Vec<String> = events.iter().map(|e| e.1.to_string()).collect();
        let users = Index::new(&user_keys);
        let recipes = Index::new(&recipe_keys);

        let mut interactions = Array2::<f64>::zeros((users.len(), recipes.len()));
        for (user, recipe, score) in events {
            if let (Some(u), Some(r)) = (users.position(user), recipes.position(recipe)) {
                interactions[[u, r]] += score;
            }
        }

        let similarity = cosine_similarity(&interactions.t().to_owned());

        debug!(
            users = users.len(),
            recipes = recipes.len(),
            "Collaborative recommender built"
        );

        Self {
            users,
            recipes,
            interactions,
            similarity,
        }
    }
}

impl Recommender for CollaborativeRecommender {
    fn recommend(&self, user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>> {
        let user_id = require_user(user_id, "collaborative")?;
        let Some(u) = self.users.position(user_id) else {
            return Ok(Vec::new());
        };

        let user_vector = self.interactions.row(u);
        let scores = self.similarity.dot(&user_vector);
        let seen: HashSet<usize> = user_vector
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > 0.0)
            .map(|(i, _)| i)
            .collect();

        let scored: Vec<(usize, f64)> = scores
            .iter()
            .enumerate()
            .filter(|(i, _)| !seen.contains(i))
            .map(|(i, &s)| (i, s))
            .collect();

        Ok(rank_descending(scored, count)
            .into_iter()
            .map(|(i, _)| self.recipes.key(i).to_string())
            .collect())
    }
}
