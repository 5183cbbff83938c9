//! Menu assembly from `TheMealDB`, a free public recipe database.
//!
//! Recipes are pulled from categories that fit the chosen diets, topped up
//! with random recipes, filtered against allergens and excluded foods, then
//! laid out three per day. Calories, cost and time are per-slot estimates;
//! the database doesn't carry them.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::config::RecipesConfig;
use crate::menu::{DayPlan, MealEntry, MealSlot, Menu, MenuOrError, WEEKDAYS};
use crate::preferences::{Diet, Preferences};

use super::filter::matches;
use super::translate::Translator;
use super::MenuProvider;

/// Recipes needed for a week of breakfast, lunch and dinner.
const MEALS_PER_WEEK: usize = 21;

/// Pool size below which random recipes are mixed in.
const MIN_POOL: usize = 30;

/// Extra random batches tried when filtering leaves too few recipes.
const TOP_UP_ROUNDS: usize = 4;
const TOP_UP_BATCH: usize = 5;

const DEFAULT_CATEGORIES: [&str; 7] = [
    "Beef",
    "Chicken",
    "Pork",
    "Seafood",
    "Vegetarian",
    "Pasta",
    "Dessert",
];

/// Per-slot estimates: calories, minutes, and share of the per-meal budget.
const SLOT_ESTIMATES: [(MealSlot, u32, u32, f64); 3] = [
    (MealSlot::Breakfast, 400, 20, 0.8),
    (MealSlot::Lunch, 650, 35, 1.2),
    (MealSlot::Dinner, 550, 30, 1.0),
];

#[derive(Clone)]
pub struct RecipeProvider {
    client: reqwest::Client,
    base_url: String,
    per_category: usize,
    translator: Option<Translator>,
}

/// A recipe as far as menu planning cares.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Recipe {
    id: String,
    name: String,
    instructions: String,
    ingredients: Vec<String>,
}

impl Recipe {
    /// Read a `TheMealDB` meal object.
    fn from_meal(meal: &Value) -> Option<Self> {
        let field = |key: &str| {
            meal.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let ingredients = (1..=20)
            .filter_map(|i| field(&format!("strIngredient{i}")))
            .map(String::from)
            .collect();

        Some(Self {
            id: field("idMeal")?.to_string(),
            name: field("strMeal")?.to_string(),
            instructions: field("strInstructions").unwrap_or_default().to_string(),
            ingredients,
        })
    }

    /// Whether the recipe avoids every allergen and excluded food.
    fn is_allowed(&self, preferences: &Preferences) -> bool {
        let text = format!(
            "{} {} {}",
            self.name,
            self.instructions,
            self.ingredients.join(", ")
        );

        if matches(&text, &preferences.excluded_foods) {
            return false;
        }

        !preferences
            .allergens
            .iter()
            .any(|a| matches(&text, a.keywords()))
    }
}

/// `TheMealDB` categories to draw from, without duplicates.
fn categories_for(preferences: &Preferences) -> Vec<&'static str> {
    if preferences.diet.is_empty() {
        return DEFAULT_CATEGORIES.to_vec();
    }

    let mut seen = BTreeSet::new();
    preferences
        .diet
        .iter()
        .flat_map(|diet| diet_categories(*diet).iter().copied())
        .filter(|c| seen.insert(*c))
        .collect()
}

const fn diet_categories(diet: Diet) -> &'static [&'static str] {
    match diet {
        Diet::None => &[
            "Beef",
            "Chicken",
            "Pork",
            "Seafood",
            "Lamb",
            "Pasta",
            "Miscellaneous",
        ],
        Diet::Vegetarian => &["Vegetarian"],
        Diet::Vegan => &["Vegan"],
        Diet::Keto | Diet::Paleo | Diet::Lowcarb => &["Beef", "Chicken", "Pork", "Seafood", "Lamb"],
    }
}

/// Lay out the first 21 recipes as seven days of three meals.
fn assemble(recipes: &[Recipe], preferences: &Preferences) -> Result<Menu> {
    if recipes.len() < MEALS_PER_WEEK {
        anyhow::bail!("Could not load enough recipes");
    }

    #[allow(clippy::cast_precision_loss)]
    let per_meal = f64::from(preferences.budget) / MEALS_PER_WEEK as f64;

    let days = recipes
        .chunks(SLOT_ESTIMATES.len())
        .zip(WEEKDAYS)
        .map(|(chunk, day)| {
            let meals = SLOT_ESTIMATES
                .iter()
                .zip(chunk)
                .map(|(&(slot, calories, minutes, share), recipe)| {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let cost = (per_meal * share).floor() as u32;
                    let entry = MealEntry {
                        name: recipe.name.clone(),
                        calories,
                        cost,
                        prep_time_minutes: minutes,
                        protein: None,
                        carbs: None,
                        fat: None,
                    };
                    (slot, entry)
                })
                .collect::<BTreeMap<_, _>>();

            DayPlan {
                day: day.to_string(),
                meals,
            }
        })
        .collect();

    Menu::new(days)
}

impl RecipeProvider {
    /// Create a provider from config.
    pub fn from_config(config: &RecipesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let translator = config
            .translate_to
            .as_deref()
            .filter(|lang| !lang.is_empty() && *lang != "en")
            .map(|lang| Translator::new(client.clone(), lang));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            per_category: config.per_category,
            translator,
        })
    }

    async fn get_meals(&self, path: &str) -> Result<Vec<Value>> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach recipe database ({path})"))?;

        if !response.status().is_success() {
            anyhow::bail!("Recipe database returned {} for {path}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse recipe database response")?;

        // `meals` is null when nothing matches
        Ok(body
            .get("meals")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    async fn lookup(&self, id: &str) -> Option<Recipe> {
        match self
            .get_meals(&format!("lookup.php?i={}", urlencoding::encode(id)))
            .await
        {
            Ok(meals) => meals.first().and_then(Recipe::from_meal),
            Err(e) => {
                tracing::warn!("Recipe lookup {id} failed: {e}");
                None
            }
        }
    }

    async fn fetch_category(&self, category: &str) -> Vec<Recipe> {
        let summaries = match self
            .get_meals(&format!("filter.php?c={}", urlencoding::encode(category)))
            .await
        {
            Ok(meals) => meals,
            Err(e) => {
                tracing::warn!("Category {category} failed: {e}");
                return Vec::new();
            }
        };

        let ids: Vec<String> = summaries
            .iter()
            .filter_map(|m| m.get("idMeal").and_then(Value::as_str))
            .take(self.per_category)
            .map(String::from)
            .collect();

        join_all(ids.iter().map(|id| self.lookup(id)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn fetch_random(&self, count: usize) -> Vec<Recipe> {
        let results = join_all((0..count).map(|_| self.get_meals("random.php"))).await;

        results
            .into_iter()
            .filter_map(|r| match r {
                Ok(meals) => meals.first().and_then(Recipe::from_meal),
                Err(e) => {
                    tracing::warn!("Random recipe failed: {e}");
                    None
                }
            })
            .collect()
    }

    /// Collect at least 21 allowed, distinct recipes in random order.
    async fn collect_recipes(&self, preferences: &Preferences) -> Result<Vec<Recipe>> {
        let categories = categories_for(preferences);
        tracing::debug!("Fetching recipes from categories {categories:?}");

        let mut pool: Vec<Recipe> = join_all(categories.iter().map(|c| self.fetch_category(c)))
            .await
            .into_iter()
            .flatten()
            .collect();

        if pool.len() < MIN_POOL {
            let missing = MIN_POOL - pool.len();
            pool.extend(self.fetch_random(missing).await);
        }

        if pool.len() < MEALS_PER_WEEK {
            anyhow::bail!("Could not load enough recipes from the database");
        }

        let mut seen = HashSet::new();
        let mut allowed: Vec<Recipe> = pool
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .filter(|r| r.is_allowed(preferences))
            .collect();

        for _ in 0..TOP_UP_ROUNDS {
            if allowed.len() >= MEALS_PER_WEEK {
                break;
            }
            for recipe in self.fetch_random(TOP_UP_BATCH).await {
                if recipe.is_allowed(preferences) && seen.insert(recipe.id.clone()) {
                    allowed.push(recipe);
                }
            }
        }

        if allowed.len() < MEALS_PER_WEEK {
            anyhow::bail!(
                "Only {} recipes fit your restrictions, not enough for a week",
                allowed.len()
            );
        }

        allowed.shuffle(&mut rand::rng());
        allowed.truncate(MEALS_PER_WEEK);
        Ok(allowed)
    }

    async fn build_menu(&self, preferences: &Preferences) -> Result<Menu> {
        let mut recipes = self.collect_recipes(preferences).await?;

        if let Some(translator) = &self.translator {
            let names = join_all(recipes.iter().map(|r| translator.translate(&r.name))).await;
            for (recipe, name) in recipes.iter_mut().zip(names) {
                recipe.name = name;
            }
        }

        assemble(&recipes, preferences)
    }
}

#[async_trait]
impl MenuProvider for RecipeProvider {
    fn name(&self) -> &str {
        "recipes"
    }

    async fn generate(&self, preferences: &Preferences) -> MenuOrError {
        let started = Instant::now();
        let result = self.build_menu(preferences).await;
        tracing::info!("Recipe menu assembled in {:?}", started.elapsed());

        match result {
            Ok(menu) => MenuOrError::Menu(menu),
            Err(e) => {
                tracing::error!("Menu assembly failed: {e:?}");
                MenuOrError::Error(e.to_string())
            }
        }
    }
}
