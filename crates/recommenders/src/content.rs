//! Content-based recommendations from shared ingredients.
//!
//! Recipes are vectors over ingredients, weighted `1 / ln(1 + n)` where `n`
//! is the number of recipes using the ingredient, so rare ingredients say
//! more about a recipe than salt does. A user's liked recipes are the
//! anchors; candidates are ranked by mean cosine similarity to them.

use ndarray::{Array1, Array2};
use recipe_core::config::ContentConfig;
use recipe_core::types::{Dataset, UserId};
use recipe_core::{RecipeId, RecommenderResult};
use std::collections::HashMap;
use tracing::debug;

use crate::similarity::{cosine_similarity, rank_descending, Index};
use crate::strategy::{require_user, Recommender};

pub struct ContentRecommender {
    recipes: Index,
    similarity: Array2<f64>,
    /// Recipes each user rated at or above the like threshold, in review order.
    liked: HashMap<UserId, Vec<RecipeId>>,
}

impl ContentRecommender {
    pub fn from_dataset(dataset: &Dataset, config: &ContentConfig) -> Self {
        let recipes = Index::new(dataset.recipe_ingredients.iter().map(|r| &r.recipe_id));
        let ingredients = Index::new(dataset.recipe_ingredients.iter().map(|r| &r.ingredient_id));

        let mut usage = vec![0usize; ingredients.len()];
        for row in &dataset.recipe_ingredients {
            if let Some(col) = ingredients.position(&row.ingredient_id) {
                usage[col] += 1;
            }
        }
        let weights: Vec<f64> = usage.iter().map(|&n| 1.0 / (n as f64).ln_1p()).collect();

        let mut matrix = Array2::<f64>::zeros((recipes.len(), ingredients.len()));
        for row in &dataset.recipe_ingredients {
            if let (Some(r), Some(c)) = (
                recipes.position(&row.recipe_id),
                ingredients.position(&row.ingredient_id),
            ) {
                matrix[[r, c]] += weights[c];
            }
        }

        let mut liked: HashMap<UserId, Vec<RecipeId>> = HashMap::new();
        for review in &dataset.reviews {
            if review.rating.is_some_and(|r| r >= config.like_threshold) {
                liked
                    .entry(review.user_id.clone())
                    .or_default()
                    .push(review.recipe_id.clone());
            }
        }

        debug!(
            recipes = recipes.len(),
            ingredients = ingredients.len(),
            "Content recommender built"
        );

        Self {
            similarity: cosine_similarity(&matrix),
            recipes,
            liked,
        }
    }

    /// The recipes used as anchors for this user. Without any liked recipe
    /// the first recipe in the catalog stands in, so everyone gets results.
    fn anchors(&self, user_id: &str) -> Vec<RecipeId> {
        match self.liked.get(user_id) {
            Some(liked) if !liked.is_empty() => liked.clone(),
            _ => self.recipes.keys().iter().take(1).cloned().collect(),
        }
    }
}

impl Recommender for ContentRecommender {
    fn recommend(&self, user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>> {
        let user_id = require_user(user_id, "content")?;
        let anchors = self.anchors(user_id);
        if anchors.is_empty() {
            return Ok(Vec::new());
        }

        let mut mean = Array1::<f64>::zeros(self.recipes.len());
        for anchor in &anchors {
            if let Some(idx) = self.recipes.position(anchor) {
                mean += &self.similarity.row(idx);
            }
        }
        mean /= anchors.len() as f64;

        let scored: Vec<(&str, f64)> = mean
            .iter()
            .enumerate()
            .map(|(i, &score)| (self.recipes.key(i), score))
            .filter(|(id, _)| !anchors.iter().any(|a| a.as_str() == *id))
            .collect();

        Ok(rank_descending(scored, count)
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect())
    }
}
