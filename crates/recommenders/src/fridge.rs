//! Fridge-based recommendations: rank recipes by how much of them the user
//! can cook with what is already in their fridge.
//!
//! Each ingredient carries an importance weight (core ingredients count for
//! more than garnish). An ingredient counts as matched when it, or one of
//! its accepted substitutes, is in the fridge. Recipes containing an
//! ingredient the user's dietary restrictions ban are skipped, and recipes
//! that need only a couple of extra purchases get a small bonus.
//!
//! [`FridgeRecommender::detailed_matches`] is the view behind the fridge
//! endpoint: it weighs ingredients by rarity instead of importance, drops
//! recipes with nothing in the fridge and penalises every missing item.

use recipe_core::config::FridgeConfig;
use recipe_core::types::{Dataset, IngredientId, UserId};
use recipe_core::{RecipeId, RecommenderResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::debug;

use crate::similarity::rank_descending;
use crate::strategy::{require_user, IdentityNeed, Recommender};

/// Score deducted per missing ingredient in [`FridgeRecommender::detailed_matches`].
const MISSING_PENALTY: f64 = 0.05;
/// Weight of an ingredient every recipe uses.
const RARITY_FLOOR: f64 = 0.1;

/// How well one recipe fits a user's fridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FridgeMatch {
    pub recipe_id: RecipeId,
    pub score: f64,
    /// Ingredients neither in the fridge nor substitutable, sorted by id.
    pub missing: Vec<IngredientId>,
}

pub struct FridgeRecommender {
    user_fridge: HashMap<UserId, HashSet<IngredientId>>,
    recipe_ingredients: BTreeMap<RecipeId, BTreeSet<IngredientId>>,
    importance: HashMap<IngredientId, f64>,
    substitutions: HashMap<IngredientId, Vec<IngredientId>>,
    banned: HashMap<UserId, HashSet<IngredientId>>,
    low_effort_missing: usize,
    low_effort_bonus: f64,
}

impl FridgeRecommender {
    pub fn new(config: &FridgeConfig) -> Self {
        Self {
            user_fridge: HashMap::new(),
            recipe_ingredients: BTreeMap::new(),
            importance: HashMap::new(),
            substitutions: HashMap::new(),
            banned: HashMap::new(),
            low_effort_missing: config.low_effort_missing,
            low_effort_bonus: config.low_effort_bonus,
        }
    }

    pub fn from_dataset(dataset: &Dataset, config: &FridgeConfig) -> Self {
        let mut recommender = Self::new(config);

        for item in &dataset.fridge {
            recommender.add_to_fridge(&item.user_id, &item.ingredient_id);
        }
        for row in &dataset.recipe_ingredients {
            recommender.add_recipe_ingredient(&row.recipe_id, &row.ingredient_id);
        }
        for ingredient in &dataset.ingredients {
            if let Some(weight) = ingredient.importance {
                recommender.set_importance(&ingredient.id, weight);
            }
        }
        for sub in &dataset.substitutions {
            recommender.add_substitution(&sub.ingredient_id, &sub.substitute_id);
        }

        // category -> ingredients, then user -> banned ingredients
        let mut by_category: HashMap<&str, Vec<&IngredientId>> = HashMap::new();
        for row in &dataset.ingredient_categories {
            by_category
                .entry(row.category_id.as_str())
                .or_default()
                .push(&row.ingredient_id);
        }
        for restriction in &dataset.dietary_restrictions {
            if let Some(ingredients) = by_category.get(restriction.ingredient_category_id.as_str()) {
                for ingredient in ingredients {
                    recommender.ban(&restriction.user_id, ingredient);
                }
            }
        }

        debug!(
            users = recommender.user_fridge.len(),
            recipes = recommender.recipe_ingredients.len(),
            "Fridge recommender built"
        );
        recommender
    }

    pub fn add_to_fridge(&mut self, user_id: &str, ingredient_id: &str) {
        self.user_fridge
            .entry(user_id.to_string())
            .or_default()
            .insert(ingredient_id.to_string());
    }

    pub fn add_recipe_ingredient(&mut self, recipe_id: &str, ingredient_id: &str) {
        self.recipe_ingredients
            .entry(recipe_id.to_string())
            .or_default()
            .insert(ingredient_id.to_string());
    }

    pub fn set_importance(&mut self, ingredient_id: &str, weight: f64) {
        self.importance.insert(ingredient_id.to_string(), weight);
    }

    pub fn add_substitution(&mut self, ingredient_id: &str, substitute_id: &str) {
        self.substitutions
            .entry(ingredient_id.to_string())
            .or_default()
            .push(substitute_id.to_string());
    }

    /// Forbid recipes containing `ingredient_id` for this user.
    pub fn ban(&mut self, user_id: &str, ingredient_id: &str) {
        self.banned
            .entry(user_id.to_string())
            .or_default()
            .insert(ingredient_id.to_string());
    }

    fn weight(&self, ingredient_id: &str) -> f64 {
        self.importance.get(ingredient_id).copied().unwrap_or(1.0)
    }

    fn in_fridge(&self, fridge: &HashSet<IngredientId>, ingredient_id: &str) -> bool {
        fridge.contains(ingredient_id)
            || self
                .substitutions
                .get(ingredient_id)
                .is_some_and(|subs| subs.iter().any(|s| fridge.contains(s)))
    }

    /// `(recipe, matched, missing)` for every recipe the user may cook.
    /// `None` when the user has no fridge.
    fn candidates<'a>(&'a self, user_id: &str) -> Option<Vec<Candidate<'a>>> {
        let fridge = self.user_fridge.get(user_id)?;
        let banned = self.banned.get(user_id);

        let candidates = self
            .recipe_ingredients
            .iter()
            .filter(|(_, ingredients)| {
                banned.map_or(true, |banned| ingredients.iter().all(|i| !banned.contains(i)))
            })
            .map(|(recipe_id, ingredients)| {
                let (matched, missing): (Vec<&IngredientId>, Vec<&IngredientId>) = ingredients
                    .iter()
                    .partition(|ingredient| self.in_fridge(fridge, ingredient));
                Candidate {
                    recipe_id,
                    matched,
                    missing,
                }
            })
            .collect();
        Some(candidates)
    }

    /// Score every eligible recipe for the user, best first. Users without
    /// a fridge get nothing.
    pub fn matches(&self, user_id: &str) -> Vec<FridgeMatch> {
        let Some(candidates) = self.candidates(user_id) else {
            return Vec::new();
        };

        let scored: Vec<(FridgeMatch, f64)> = candidates
            .into_iter()
            .map(|candidate| {
                let total_weight: f64 = candidate
                    .matched
                    .iter()
                    .chain(&candidate.missing)
                    .map(|i| self.weight(i))
                    .sum();
                let matched_weight: f64 = candidate.matched.iter().map(|i| self.weight(i)).sum();
                let mut score = if total_weight > 0.0 {
                    matched_weight / total_weight
                } else {
                    0.0
                };
                if candidate.missing.len() <= self.low_effort_missing {
                    score += self.low_effort_bonus;
                }
                (candidate.into_match(score), score)
            })
            .collect();

        rank_descending(scored, usize::MAX)
            .into_iter()
            .map(|(entry, _)| entry)
            .collect()
    }

    /// Rarity weight per ingredient: ingredients used by fewer recipes
    /// weigh more, never less than [`RARITY_FLOOR`].
    fn rarity_weights(&self) -> HashMap<&str, f64> {
        let mut frequency: HashMap<&str, usize> = HashMap::new();
        for ingredients in self.recipe_ingredients.values() {
            for ingredient in ingredients {
                *frequency.entry(ingredient.as_str()).or_default() += 1;
            }
        }
        let max_frequency = frequency.values().copied().max().unwrap_or(1) as f64;

        frequency
            .into_iter()
            .map(|(ingredient, n)| (ingredient, round2(1.0 - n as f64 / max_frequency) + RARITY_FLOOR))
            .collect()
    }

    /// Detailed fridge view: only recipes sharing at least one ingredient
    /// with the fridge, scored by rarity-weighted coverage minus
    /// [`MISSING_PENALTY`] per missing ingredient, floored at 0 and rounded
    /// to two decimals. Best first.
    pub fn detailed_matches(&self, user_id: &str) -> Vec<FridgeMatch> {
        let Some(candidates) = self.candidates(user_id) else {
            return Vec::new();
        };
        let rarity = self.rarity_weights();
        let weight = |ingredient: &IngredientId| rarity.get(ingredient.as_str()).copied().unwrap_or(1.0);

        let scored: Vec<(FridgeMatch, f64)> = candidates
            .into_iter()
            .filter(|candidate| !candidate.matched.is_empty())
            .map(|candidate| {
                let matched_weight: f64 = candidate.matched.iter().copied().map(weight).sum();
                let total_weight: f64 =
                    matched_weight + candidate.missing.iter().copied().map(weight).sum::<f64>();
                let coverage = if total_weight > 0.0 {
                    matched_weight / total_weight
                } else {
                    0.0
                };
                let penalty = MISSING_PENALTY * candidate.missing.len() as f64;
                let score = round2((coverage - penalty).max(0.0));
                (candidate.into_match(score), score)
            })
            .collect();

        rank_descending(scored, usize::MAX)
            .into_iter()
            .map(|(entry, _)| entry)
            .collect()
    }
}

struct Candidate<'a> {
    recipe_id: &'a RecipeId,
    matched: Vec<&'a IngredientId>,
    missing: Vec<&'a IngredientId>,
}

impl Candidate<'_> {
    fn into_match(self, score: f64) -> FridgeMatch {
        FridgeMatch {
            recipe_id: self.recipe_id.clone(),
            score,
            missing: self.missing.into_iter().cloned().collect(),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl Recommender for FridgeRecommender {
    fn recommend(&self, user_id: Option<&str>, count: usize) -> RecommenderResult<Vec<RecipeId>> {
        let user_id = require_user(user_id, "fridge")?;
        Ok(self
            .matches(user_id)
            .into_iter()
            .take(count)
            .map(|m| m.recipe_id)
            .collect())
    }
}
