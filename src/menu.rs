//! Weekly menu model and provider payload parsing.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Fixed weekday labels, Monday first.
pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Meal slot within a day, in serving order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    /// Slots every day must fill. Snacks are optional.
    pub const REQUIRED: [Self; 3] = [Self::Breakfast, Self::Lunch, Self::Dinner];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Dinner => "Dinner",
            Self::Snack => "Snack",
        }
    }

    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Breakfast => "🌅",
            Self::Lunch => "☀️",
            Self::Dinner => "🌙",
            Self::Snack => "🍏",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One dish in the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    pub name: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub calories: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub cost: u32,
    #[serde(
        default,
        alias = "time",
        alias = "cookingTime",
        deserialize_with = "lenient_u32"
    )]
    pub prep_time_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
}

/// One day of the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    #[serde(default)]
    pub day: String,
    pub meals: BTreeMap<MealSlot, MealEntry>,
}

impl DayPlan {
    /// Sum of the day's meal costs. Widened so provider figures cannot overflow.
    #[must_use]
    pub fn cost(&self) -> u64 {
        self.meals.values().map(|m| u64::from(m.cost)).sum()
    }
}

/// A validated seven-day menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DayPlan>", into = "Vec<DayPlan>")]
pub struct Menu {
    days: Vec<DayPlan>,
}

impl Menu {
    /// Build a menu from exactly seven days, each with breakfast, lunch and dinner.
    ///
    /// Days are labelled Monday to Sunday by position, whatever the provider called them.
    pub fn new(mut days: Vec<DayPlan>) -> Result<Self> {
        if days.len() != WEEKDAYS.len() {
            bail!("expected {} days, got {}", WEEKDAYS.len(), days.len());
        }

        for (day, label) in days.iter_mut().zip(WEEKDAYS) {
            if let Some(slot) = MealSlot::REQUIRED
                .into_iter()
                .find(|slot| !day.meals.contains_key(slot))
            {
                bail!("{label} has no {}", slot.label().to_lowercase());
            }
            day.day = label.to_string();
        }

        Ok(Self { days })
    }

    #[must_use]
    pub fn days(&self) -> &[DayPlan] {
        &self.days
    }

    /// Weekly total cost.
    #[must_use]
    pub fn total_cost(&self) -> u64 {
        self.days.iter().map(DayPlan::cost).sum()
    }

    /// Every dish name, day by day in slot order. Duplicates are kept.
    #[must_use]
    pub fn shopping_items(&self) -> Vec<String> {
        self.days
            .iter()
            .flat_map(|day| day.meals.values().map(|m| m.name.clone()))
            .collect()
    }
}

impl TryFrom<Vec<DayPlan>> for Menu {
    type Error = anyhow::Error;

    fn try_from(days: Vec<DayPlan>) -> Result<Self> {
        Self::new(days)
    }
}

impl From<Menu> for Vec<DayPlan> {
    fn from(menu: Menu) -> Self {
        menu.days
    }
}

/// What a provider hands back: a menu, or a message explaining why not.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuOrError {
    Menu(Menu),
    Error(String),
}

impl MenuOrError {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    /// The menu, if generation succeeded.
    #[must_use]
    pub fn into_menu(self) -> Option<Menu> {
        match self {
            Self::Menu(menu) => Some(menu),
            Self::Error(_) => None,
        }
    }
}

/// Parse a provider response body: `{"menu": [...]}` or `{"error": "..."}`.
///
/// Anything else, including a menu that fails validation, becomes an error.
#[must_use]
pub fn parse_payload(body: &Value) -> MenuOrError {
    if let Some(message) = body.get("error") {
        let message = message
            .as_str()
            .map(String::from)
            .or_else(|| {
                message
                    .get("message")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .unwrap_or_else(|| message.to_string());
        return MenuOrError::Error(message);
    }

    let Some(days) = body.get("menu") else {
        return MenuOrError::error("Menu is missing from the response");
    };

    match serde_json::from_value::<Menu>(days.clone()) {
        Ok(menu) => MenuOrError::Menu(menu),
        Err(e) => {
            tracing::warn!("Malformed menu payload: {e}");
            MenuOrError::Error(format!("Malformed menu: {e}"))
        }
    }
}

/// Accept integers, floats (rounded) and numeric strings.
fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(n) if n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX) => Ok(n.round() as u32),
        _ => Err(D::Error::custom(format!("expected a non-negative number, got {value}"))),
    }
}
