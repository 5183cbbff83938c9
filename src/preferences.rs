//! Dietary preferences collected over the dialogue.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Diet tags offered on the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diet {
    None,
    Vegetarian,
    Vegan,
    Keto,
    Paleo,
    Lowcarb,
}

impl Diet {
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::Vegetarian,
        Self::Vegan,
        Self::Keto,
        Self::Paleo,
        Self::Lowcarb,
    ];

    /// Tag used in callback tokens and storage.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::Keto => "keto",
            Self::Paleo => "paleo",
            Self::Lowcarb => "lowcarb",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.tag() == tag)
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "Regular",
            Self::Vegetarian => "Vegetarian",
            Self::Vegan => "Vegan",
            Self::Keto => "Keto",
            Self::Paleo => "Paleo",
            Self::Lowcarb => "Low-carb",
        }
    }
}

impl fmt::Display for Diet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Allergens offered on the second step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Allergen {
    Dairy,
    Eggs,
    Nuts,
    Gluten,
    Seafood,
    Citrus,
}

impl Allergen {
    pub const ALL: [Self; 6] = [
        Self::Dairy,
        Self::Eggs,
        Self::Nuts,
        Self::Gluten,
        Self::Seafood,
        Self::Citrus,
    ];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Dairy => "dairy",
            Self::Eggs => "eggs",
            Self::Nuts => "nuts",
            Self::Gluten => "gluten",
            Self::Seafood => "seafood",
            Self::Citrus => "citrus",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.tag() == tag)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dairy => "Dairy",
            Self::Eggs => "Eggs",
            Self::Nuts => "Nuts",
            Self::Gluten => "Gluten",
            Self::Seafood => "Seafood",
            Self::Citrus => "Citrus",
        }
    }

    /// Ingredient words that indicate this allergen in recipe text.
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Dairy => &["milk", "cheese", "cream", "butter", "yogurt"],
            Self::Eggs => &["egg"],
            Self::Nuts => &["nut", "almond", "peanut", "walnut", "cashew"],
            Self::Gluten => &["flour", "wheat", "bread", "pasta"],
            Self::Seafood => &["fish", "shrimp", "crab", "lobster", "salmon"],
            Self::Citrus => &["lemon", "lime", "orange", "grapefruit"],
        }
    }
}

impl fmt::Display for Allergen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upper bound on cooking time: plain minutes or a range such as "30-60".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CookingTime {
    Minutes(u32),
    Range(String),
}

impl Default for CookingTime {
    fn default() -> Self {
        Self::Range("60".to_string())
    }
}

impl fmt::Display for CookingTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minutes(m) => write!(f, "{m}"),
            Self::Range(r) => f.write_str(r),
        }
    }
}

/// Budget presets offered on the third step, per week.
pub const BUDGET_PRESETS: [u32; 4] = [3000, 5000, 7000, 10000];

/// Servings presets offered on the fourth step. The last one means "or more".
pub const SERVINGS_PRESETS: [u32; 4] = [1, 2, 3, 4];

/// Accumulated preferences for one conversation.
///
/// Diet tags and allergens only grow within one dialogue run; a reset is the
/// only way to drop them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub diet: BTreeSet<Diet>,
    #[serde(default)]
    pub allergens: BTreeSet<Allergen>,
    #[serde(default)]
    pub excluded_foods: Vec<String>,
    #[serde(default = "default_budget")]
    pub budget: u32,
    #[serde(default)]
    pub cooking_time: CookingTime,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default = "default_meals_per_day")]
    pub meals_per_day: u32,
}

const fn default_budget() -> u32 {
    5000
}

const fn default_servings() -> u32 {
    2
}

const fn default_meals_per_day() -> u32 {
    3
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            diet: BTreeSet::new(),
            allergens: BTreeSet::new(),
            excluded_foods: Vec::new(),
            budget: default_budget(),
            cooking_time: CookingTime::default(),
            servings: default_servings(),
            meals_per_day: default_meals_per_day(),
        }
    }
}

impl Preferences {
    /// Add a diet tag. Returns `false` if it was already selected.
    pub fn add_diet(&mut self, diet: Diet) -> bool {
        self.diet.insert(diet)
    }

    /// Add an allergen. Returns `false` if it was already selected.
    pub fn add_allergen(&mut self, allergen: Allergen) -> bool {
        self.allergens.insert(allergen)
    }

    /// Append a food to exclude, keeping the user's spelling.
    ///
    /// Blank input and exact duplicates are ignored. Returns whether the
    /// list changed.
    pub fn exclude_food(&mut self, food: &str) -> bool {
        let food = food.trim();
        if food.is_empty() || self.excluded_foods.iter().any(|f| f == food) {
            return false;
        }
        self.excluded_foods.push(food.to_string());
        true
    }

    /// Effective diet tags, treating an empty set and `none` alike.
    pub fn restricted_diets(&self) -> impl Iterator<Item = Diet> + '_ {
        self.diet.iter().copied().filter(|d| *d != Diet::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_diet_tag_is_stored_once() {
        let mut prefs = Preferences::default();
        assert!(prefs.add_diet(Diet::Vegan));
        assert!(!prefs.add_diet(Diet::Vegan));
        assert!(!prefs.add_diet(Diet::Vegan));
        assert!(prefs.add_diet(Diet::Keto));

        assert_eq!(prefs.diet.len(), 2);
        assert_eq!(prefs.diet.iter().filter(|d| **d == Diet::Vegan).count(), 1);
    }

    #[test]
    fn repeated_allergen_is_stored_once() {
        let mut prefs = Preferences::default();
        assert!(prefs.add_allergen(Allergen::Nuts));
        assert!(!prefs.add_allergen(Allergen::Nuts));
        assert_eq!(prefs.allergens.len(), 1);
    }

    #[test]
    fn excluded_foods_keep_order_and_spelling() {
        let mut prefs = Preferences::default();
        assert!(prefs.exclude_food("  Mushrooms "));
        assert!(prefs.exclude_food("cilantro"));
        assert!(!prefs.exclude_food("Mushrooms"));
        assert!(!prefs.exclude_food("   "));
        assert_eq!(prefs.excluded_foods, vec!["Mushrooms", "cilantro"]);
    }

    #[test]
    fn tags_parse_from_tokens() {
        for diet in Diet::ALL {
            assert_eq!(Diet::from_tag(diet.tag()), Some(diet));
        }
        for allergen in Allergen::ALL {
            assert_eq!(Allergen::from_tag(allergen.tag()), Some(allergen));
        }
        assert_eq!(Diet::from_tag("carnivore"), None);
        assert_eq!(Allergen::from_tag("Dairy"), None);
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let mut prefs = Preferences::default();
        prefs.add_diet(Diet::Vegetarian);
        prefs.exclude_food("olives");

        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["diet"], serde_json::json!(["vegetarian"]));
        assert_eq!(json["excludedFoods"], serde_json::json!(["olives"]));
        assert_eq!(json["cookingTime"], serde_json::json!("60"));
        assert_eq!(json["mealsPerDay"], serde_json::json!(3));
    }

    #[test]
    fn cooking_time_accepts_number_or_string() {
        let prefs: Preferences =
            serde_json::from_str(r#"{"cookingTime": 45, "budget": 3000}"#).unwrap();
        assert_eq!(prefs.cooking_time, CookingTime::Minutes(45));
        assert_eq!(prefs.budget, 3000);
        assert_eq!(prefs.servings, 2);

        let prefs: Preferences = serde_json::from_str(r#"{"cookingTime": "30-60"}"#).unwrap();
        assert_eq!(prefs.cooking_time.to_string(), "30-60");
    }

    #[test]
    fn none_diet_is_not_a_restriction() {
        let mut prefs = Preferences::default();
        prefs.add_diet(Diet::None);
        assert_eq!(prefs.restricted_diets().count(), 0);
        prefs.add_diet(Diet::Paleo);
        assert_eq!(prefs.restricted_diets().collect::<Vec<_>>(), vec![Diet::Paleo]);
    }
}
