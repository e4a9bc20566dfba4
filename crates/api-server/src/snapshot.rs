//! An immutable view of the loaded data and every recommender built on it.
//! Handlers read the current snapshot; a reload swaps in a new one.

use chrono::{DateTime, Utc};
use recipe_core::config::RecommenderConfig;
use recipe_core::types::{Dataset, IngredientId};
use recipe_core::{RecipeId, RecommenderResult};
use recipe_data::DatasetLoader;
use recipe_recommenders::RecommenderSuite;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub struct Snapshot {
    pub dataset: Dataset,
    pub suite: RecommenderSuite,
    titles: HashMap<RecipeId, String>,
    ingredient_names: HashMap<IngredientId, String>,
    pub loaded_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn build(dataset: Dataset, config: &RecommenderConfig) -> RecommenderResult<Self> {
        let suite = RecommenderSuite::build(&dataset, config)?;
        Ok(Self {
            titles: dataset.recipe_titles(),
            ingredient_names: dataset.ingredient_names(),
            dataset,
            suite,
            loaded_at: Utc::now(),
        })
    }

    /// Read the CSV directory and build a fresh snapshot from it.
    pub fn load(dir: &Path, config: &RecommenderConfig) -> RecommenderResult<Self> {
        let dataset = DatasetLoader::new(dir).load()?;
        let snapshot = Self::build(dataset, config)?;
        info!(
            dir = %dir.display(),
            recipes = snapshot.dataset.recipes.len(),
            reviews = snapshot.dataset.reviews.len(),
            "Snapshot loaded"
        );
        Ok(snapshot)
    }

    /// Display title for a recipe; ids missing from the catalog still render.
    pub fn title(&self, recipe_id: &str) -> String {
        self.titles
            .get(recipe_id)
            .cloned()
            .unwrap_or_else(|| format!("(missing title: {recipe_id})"))
    }

    pub fn ingredient_name(&self, ingredient_id: &str) -> String {
        self.ingredient_names
            .get(ingredient_id)
            .cloned()
            .unwrap_or_else(|| ingredient_id.to_string())
    }
}
