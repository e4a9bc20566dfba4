//! Personal recommendations from similar users' ratings.
//!
//! Explicit ratings and favourites (an implicit 4.5) form a user × recipe
//! matrix. Other users are weighted by cosine similarity to the requesting
//! user and their ratings summed; recipes the user already rated or saved
//! as favourite are dropped.

use ndarray::{Array1, Array2, Axis};
use recipe_core::types::{Dataset, UserId};
use recipe_core::{RecipeId, RecommenderResult};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::similarity::{rank_descending, Index};
use crate::strategy::{require_user, Recommender};

const FAVORITE_RATING: f64 = 4.5;

pub struct PersonalRecommender {
    users: Index,
    recipes: Index,
    ratings: Array2<f64>,
    norms: Array1<f64>,
    seen: HashMap<UserId, HashSet<usize>>,
}

impl PersonalRecommender {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        // Favourites come after explicit ratings and win for the same pair.
        let rated = dataset
            .reviews
            .iter()
            .filter_map(|r| r.rating.map(|rating| (&r.user_id, &r.recipe_id, rating)));
        let favorites = dataset
            .cookbook
            .iter()
            .filter(|c| c.is_favorite)
            .map(|c| (&c.user_id, &c.recipe_id, FAVORITE_RATING));
        let entries: Vec<(&String, &String, f64)> = rated.chain(favorites).collect();

        let users = Index::new(entries.iter().map(|e| e.0));
        let recipes = Index::new(entries.iter().map(|e| e.1));

        let mut ratings = Array2::<f64>::zeros((users.len(), recipes.len()));
        let mut seen: HashMap<UserId, HashSet<usize>> = HashMap::new();
        for (user, recipe, rating) in entries {
            if let (Some(u), Some(r)) = (users.position(user), recipes.position(recipe)) {
                ratings[[u, r]] = rating;
                seen.entry(user.clone()).or_default().insert(r);
            }
        }
        let norms = ratings.map_axis(Axis(1), |row| row.dot(&row).sqrt());

        debug!(
            users = users.len(),
            recipes = recipes.len(),
            "Personal recommender built"
        );

        Self {
            users,
            recipes,
            ratings,
            norms,
            seen,
        }
    }

    /// Predicted scores for unseen recipes, best first, rounded to two
    /// decimals.
    pub fn scored(&self, user_id: &str, count: usize) -> Vec<(RecipeId, f64)> {
        let Some(u) = self.users.position(user_id) else {
            return Vec::new();
        };

        let target = self.ratings.row(u);
        let target_norm = self.norms[u];
        let similarities: Array1<f64> = self
            .ratings
            .rows()
            .into_iter()
            .zip(self.norms.iter())
            .map(|(row, &norm)| {
                if norm > 0.0 && target_norm > 0.0 {
                    target.dot(&row) / (target_norm * norm)
                } else {
                    0.0
                }
            })
            .collect();

        let predictions = similarities.dot(&self.ratings);
        let seen = self.seen.get(user_id);

        let scored: Vec<(usize, f64)> = predictions
            .iter()
            .enumerate()
            .filter(|(i, _)| seen.map_or(true, |s| !s.contains(i)))
            .map(|(i, &score)| (i, score))
            .collect();

        rank_descending(scored, count)
            .into_iter()
            .map(|(i, score)| (self.recipes.key(i).to_string(), (score * 100.0).round() / 100.0))
            .collect()
    }
}

impl Recommender for PersonalRecommender {
    fn recommend(&self, user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>> {
        let user_id = require_user(user_id, "personal")?;
        Ok(self
            .scored(user_id, count)
            .into_iter()
            .map(|(id, _)| id)
            .collect())
    }
}
