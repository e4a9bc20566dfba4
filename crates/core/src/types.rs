use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::RecommenderError;

pub type RecipeId = String;
pub type UserId = String;
pub type IngredientId = String;
pub type CategoryId = String;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    #[serde(default)]
    pub cuisine: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    /// Weight of the ingredient when matching a fridge (core=2, optional=1).
    #[serde(default)]
    pub importance: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
    /// 1-5 stars; `None` when the reviewer left no rating.
    pub rating: Option<f64>,
    #[serde(default)]
    pub has_photos: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FridgeItem {
    pub user_id: UserId,
    pub ingredient_id: IngredientId,
}

/// A recipe saved to a user's cookbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookbookEntry {
    pub user_id: UserId,
    pub recipe_id: RecipeId,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DietaryRestriction {
    pub user_id: UserId,
    pub ingredient_category_id: CategoryId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientCategory {
    pub ingredient_id: IngredientId,
    pub category_id: CategoryId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Substitution {
    pub ingredient_id: IngredientId,
    pub substitute_id: IngredientId,
}

/// Every table the recommenders are built from. Immutable once loaded;
/// a data refresh produces a new `Dataset`.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub users: Vec<User>,
    pub recipes: Vec<Recipe>,
    pub ingredients: Vec<Ingredient>,
    pub recipe_ingredients: Vec<RecipeIngredient>,
    pub reviews: Vec<Review>,
    pub fridge: Vec<FridgeItem>,
    pub cookbook: Vec<CookbookEntry>,
    pub dietary_restrictions: Vec<DietaryRestriction>,
    pub ingredient_categories: Vec<IngredientCategory>,
    pub substitutions: Vec<Substitution>,
}

impl Dataset {
    pub fn recipe_titles(&self) -> HashMap<RecipeId, String> {
        self.recipes
            .iter()
            .map(|r| (r.id.clone(), r.name.clone()))
            .collect()
    }

    pub fn ingredient_names(&self) -> HashMap<IngredientId, String> {
        self.ingredients
            .iter()
            .map(|i| (i.id.clone(), i.name.clone()))
            .collect()
    }
}

/// Strategies the service can answer a recommendation request with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Fridge,
    Content,
    Collaborative,
    Personal,
    Popularity,
    Hybrid,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::Fridge,
        StrategyKind::Content,
        StrategyKind::Collaborative,
        StrategyKind::Personal,
        StrategyKind::Popularity,
        StrategyKind::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Fridge => "fridge",
            StrategyKind::Content => "content",
            StrategyKind::Collaborative => "collaborative",
            StrategyKind::Personal => "personal",
            StrategyKind::Popularity => "popularity",
            StrategyKind::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = RecommenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| RecommenderError::UnknownStrategy(s.to_string()))
    }
}
