//! Loads a `Dataset` from a directory of CSV tables.
//!
//! Required tables: users, recipes, ingredients, recipe_ingredients,
//! reviews, user_fridge_ingredients, user_cookbook_recipes. Dietary
//! restriction, ingredient category and substitution tables are optional.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use recipe_core::types::{
    CookbookEntry, Dataset, DietaryRestriction, FridgeItem, Ingredient, IngredientCategory,
    Recipe, RecipeIngredient, Review, Substitution, User,
};
use recipe_core::{RecommenderError, RecommenderResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const USERS_FILE: &str = "users.csv";
pub const RECIPES_FILE: &str = "recipes.csv";
pub const INGREDIENTS_FILE: &str = "ingredients.csv";
pub const RECIPE_INGREDIENTS_FILE: &str = "recipe_ingredients.csv";
pub const REVIEWS_FILE: &str = "reviews.csv";
pub const FRIDGE_FILE: &str = "user_fridge_ingredients.csv";
pub const COOKBOOK_FILE: &str = "user_cookbook_recipes.csv";
pub const DIETARY_FILE: &str = "user_dietary_restrictions.csv";
pub const INGREDIENT_CATEGORIES_FILE: &str = "ingredient_categories_connection.csv";
pub const SUBSTITUTIONS_FILE: &str = "ingredient_substitutions.csv";

#[derive(Debug, Deserialize)]
struct RawReview {
    user_id: String,
    recipe_id: String,
    rating: Option<f64>,
    #[serde(default)]
    has_photos: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCookbookEntry {
    user_id: String,
    recipe_id: String,
    #[serde(default)]
    is_favorite: Option<String>,
}

/// Reads the CSV tables under one data directory.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    dir: PathBuf,
}

impl DatasetLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> RecommenderResult<Dataset> {
        let reviews = self
            .read_table::<RawReview>(REVIEWS_FILE)?
            .into_iter()
            .map(review_from_raw)
            .collect::<RecommenderResult<Vec<_>>>()?;

        let cookbook = self
            .read_table::<RawCookbookEntry>(COOKBOOK_FILE)?
            .into_iter()
            .map(|raw| {
                Ok(CookbookEntry {
                    is_favorite: parse_flag(raw.is_favorite.as_deref())
                        .map_err(|msg| RecommenderError::data(COOKBOOK_FILE, msg))?,
                    user_id: raw.user_id,
                    recipe_id: raw.recipe_id,
                })
            })
            .collect::<RecommenderResult<Vec<_>>>()?;

        let dataset = Dataset {
            users: self.read_table::<User>(USERS_FILE)?,
            recipes: self.read_table::<Recipe>(RECIPES_FILE)?,
            ingredients: self.read_table::<Ingredient>(INGREDIENTS_FILE)?,
            recipe_ingredients: self.read_table::<RecipeIngredient>(RECIPE_INGREDIENTS_FILE)?,
            reviews,
            fridge: self.read_table::<FridgeItem>(FRIDGE_FILE)?,
            cookbook,
            dietary_restrictions: self.read_optional_table::<DietaryRestriction>(DIETARY_FILE)?,
            ingredient_categories: self
                .read_optional_table::<IngredientCategory>(INGREDIENT_CATEGORIES_FILE)?,
            substitutions: self.read_optional_table::<Substitution>(SUBSTITUTIONS_FILE)?,
        };

        info!(
            dir = %self.dir.display(),
            users = dataset.users.len(),
            recipes = dataset.recipes.len(),
            reviews = dataset.reviews.len(),
            "Dataset loaded"
        );

        Ok(dataset)
    }

    fn read_table<T: DeserializeOwned>(&self, file: &str) -> RecommenderResult<Vec<T>> {
        let path = self.dir.join(file);
        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| RecommenderError::data(file, e))?;

        let rows = reader
            .deserialize::<T>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RecommenderError::data(file, e))?;

        debug!(file, rows = rows.len(), "Table read");
        Ok(rows)
    }

    fn read_optional_table<T: DeserializeOwned>(&self, file: &str) -> RecommenderResult<Vec<T>> {
        if !self.dir.join(file).exists() {
            debug!(file, "Optional table not present");
            return Ok(Vec::new());
        }
        self.read_table(file)
    }
}

fn review_from_raw(raw: RawReview) -> RecommenderResult<Review> {
    let has_photos = parse_flag(raw.has_photos.as_deref())
        .map_err(|msg| RecommenderError::data(REVIEWS_FILE, msg))?;
    let timestamp = match raw.timestamp.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(
            parse_timestamp(value).map_err(|msg| RecommenderError::data(REVIEWS_FILE, msg))?,
        ),
    };

    Ok(Review {
        user_id: raw.user_id,
        recipe_id: raw.recipe_id,
        rating: raw.rating,
        has_photos,
        timestamp,
    })
}

/// Accepts the spellings spreadsheet and dataframe exports produce
/// (`True`, `false`, `1`, `0`, ...). An empty cell is `false`.
fn parse_flag(value: Option<&str>) -> Result<bool, String> {
    let value = value.map(str::trim).unwrap_or_default();
    match value.to_ascii_lowercase().as_str() {
        "" | "false" | "f" | "0" | "no" => Ok(false),
        "true" | "t" | "1" | "yes" => Ok(true),
        _ => Err(format!("invalid boolean value '{value}'")),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid timestamp '{value}'"))
}
