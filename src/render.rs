//! Message rendering: menus, shopping lists, step prompts and keyboards.
//!
//! Text uses the light markdown understood by [`crate::telegram::to_telegram_html`]:
//! `**bold**` and `- ` bullets.

use std::fmt::Write as _;

use crate::dialogue::{Action, Step};
use crate::menu::{Menu, MenuOrError};
use crate::preferences::{Allergen, BUDGET_PRESETS, Diet, Preferences, SERVINGS_PRESETS};

/// An inline button: label plus the callback token it sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            token: action.token(),
        }
    }
}

/// Grid of buttons, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Lay buttons out two per row.
    #[must_use]
    pub fn pairs(buttons: &[Button]) -> Self {
        Self {
            rows: buttons.chunks(2).map(<[Button]>::to_vec).collect(),
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        self.rows.push(row);
        self
    }

    /// Whether any button sends `token`.
    #[cfg(test)]
    pub fn has_token(&self, token: &str) -> bool {
        self.rows.iter().flatten().any(|b| b.token == token)
    }
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

pub const NO_MENU_YET: &str = "❌ Create a menu first! Send /start to begin.";
pub const PLEASE_WAIT: &str = "⏳ Putting together your menu... This takes about 30 seconds.";
pub const PLEASE_WAIT_AGAIN: &str = "⏳ Creating a new menu...";

fn regenerate_button() -> Button {
    Button::new("🔄 New menu", Action::Regenerate)
}

fn shopping_list_button() -> Button {
    Button::new("🛒 Shopping list", Action::ShoppingList)
}

/// Keyboard shown under a generated menu.
#[must_use]
pub fn menu_keyboard() -> Keyboard {
    Keyboard {
        rows: vec![vec![regenerate_button()], vec![shopping_list_button()]],
    }
}

/// Render a provider result.
///
/// A menu gets one block per day with meal lines and a day subtotal, then the
/// weekly total. An error gets a single line and only the retry button.
#[must_use]
pub fn render_menu(result: &MenuOrError, currency: &str) -> Reply {
    match result {
        MenuOrError::Error(message) => Reply::text(format!("❌ {message}")).with_keyboard(Keyboard {
            rows: vec![vec![regenerate_button()]],
        }),
        MenuOrError::Menu(menu) => {
            Reply::text(render_menu_text(menu, currency)).with_keyboard(menu_keyboard())
        }
    }
}

fn render_menu_text(menu: &Menu, currency: &str) -> String {
    let mut text = String::from("🍽 **Your menu for the week**\n\n");

    for day in menu.days() {
        let _ = writeln!(text, "📅 **{}**", day.day);
        for (slot, meal) in &day.meals {
            let _ = writeln!(
                text,
                "{} {}: {} ({} kcal)",
                slot.icon(),
                slot.label(),
                meal.name,
                meal.calories
            );
        }
        let _ = writeln!(text, "💰 Day total: {} {currency}", day.cost());
        text.push('\n');
    }

    let _ = write!(text, "📊 **Week total: {} {currency}**", menu.total_cost());
    text
}

/// Render the shopping list for a stored menu.
#[must_use]
pub fn render_shopping_list(items: &[String]) -> Reply {
    let mut text = String::from("🛒 **Shopping list for the week**\n\nTo cook these dishes:\n");
    for item in items {
        let _ = writeln!(text, "- {item}");
    }
    text.push_str("\n💡 Check what you already have at home and buy the rest!");
    Reply::text(text)
}

/// Greeting plus the first step.
#[must_use]
pub fn welcome() -> Reply {
    let prompt = diet_prompt();
    Reply {
        text: format!(
            "👋 Hi! I'll help you plan a menu for the week.\n\n{}",
            prompt.text
        ),
        keyboard: prompt.keyboard,
    }
}

#[must_use]
pub fn diet_prompt() -> Reply {
    let buttons: Vec<Button> = Diet::ALL
        .into_iter()
        .map(|d| Button::new(format!("{} {}", diet_icon(d), d.label()), Action::AddDiet(d)))
        .collect();

    Reply::text("🍽 **Step 1/4: Diet**\nPick your preferences (you can choose several):")
        .with_keyboard(
            Keyboard::pairs(&buttons).with_row(vec![Button::new("✅ Done", Action::DietDone)]),
        )
}

#[must_use]
pub fn allergen_prompt() -> Reply {
    let buttons: Vec<Button> = Allergen::ALL
        .into_iter()
        .map(|a| {
            Button::new(
                format!("{} {}", allergen_icon(a), a.label()),
                Action::AddAllergen(a),
            )
        })
        .collect();

    Reply::text("🚫 **Step 2/4: Allergens**\nWhat should be left out of the menu?").with_keyboard(
        Keyboard::pairs(&buttons).with_row(vec![Button::new("✅ Done", Action::AllergensDone)]),
    )
}

#[must_use]
pub fn budget_prompt(currency: &str) -> Reply {
    let buttons: Vec<Button> = BUDGET_PRESETS
        .into_iter()
        .map(|b| Button::new(format!("💰 {b} {currency}"), Action::SetBudget(b)))
        .collect();

    Reply::text("💵 **Step 3/4: Budget**\nHow much do you want to spend on food per week?")
        .with_keyboard(Keyboard::pairs(&buttons))
}

#[must_use]
pub fn servings_prompt() -> Reply {
    let buttons: Vec<Button> = SERVINGS_PRESETS
        .into_iter()
        .map(|n| {
            let label = match n {
                1 => "👤 1 person".to_string(),
                n if n == SERVINGS_PRESETS[SERVINGS_PRESETS.len() - 1] => {
                    format!("👨‍👩‍👧‍👦 {n}+ people")
                }
                n => format!("👥 {n} people"),
            };
            Button::new(label, Action::SetServings(n))
        })
        .collect();

    Reply::text("👥 **Step 4/4: Servings**\nHow many people are you cooking for?")
        .with_keyboard(Keyboard::pairs(&buttons))
}

/// The prompt for the step the user is on, used to re-ask after a stray button.
#[must_use]
pub fn step_prompt(step: Step, has_menu: bool, currency: &str) -> Reply {
    match step {
        Step::CollectingDiet => diet_prompt(),
        Step::CollectingAllergens => allergen_prompt(),
        Step::CollectingBudget => budget_prompt(currency),
        Step::CollectingServings => servings_prompt(),
        Step::Ready if has_menu => {
            Reply::text("Your menu is ready. Want a new one or the shopping list?")
                .with_keyboard(menu_keyboard())
        }
        Step::Ready => Reply::text("The last attempt failed. Try again?").with_keyboard(Keyboard {
            rows: vec![vec![regenerate_button()]],
        }),
    }
}

#[must_use]
pub fn diet_added(diet: Diet, added: bool) -> Reply {
    if added {
        Reply::text(format!("✅ Added: {}", diet.label()))
    } else {
        Reply::text(format!("☑️ Already selected: {}", diet.label()))
    }
}

#[must_use]
pub fn allergen_added(allergen: Allergen, added: bool) -> Reply {
    if added {
        Reply::text(format!("✅ Excluded: {}", allergen.label()))
    } else {
        Reply::text(format!("☑️ Already excluded: {}", allergen.label()))
    }
}

/// Reply to `/exclude`.
#[must_use]
pub fn excluded_foods(prefs: &Preferences) -> Reply {
    if prefs.excluded_foods.is_empty() {
        return Reply::text("Nothing excluded yet. Usage: /exclude mushrooms, olives");
    }
    Reply::text(format!(
        "🚫 Never in your menu: {}",
        prefs.excluded_foods.join(", ")
    ))
}

/// Reply to `/prefs`.
#[must_use]
pub fn preferences_summary(prefs: &Preferences, step: Step, currency: &str) -> String {
    fn list<T: std::fmt::Display>(items: impl Iterator<Item = T>, empty: &str) -> String {
        let items: Vec<String> = items.map(|item| item.to_string()).collect();
        if items.is_empty() {
            empty.to_string()
        } else {
            items.join(", ")
        }
    }

    format!(
        "⚙️ **Your preferences**\n\n\
         - Diet: {}\n\
         - Allergens: {}\n\
         - Excluded foods: {}\n\
         - Budget: {} {currency} per week\n\
         - Cooking time: up to {} min\n\
         - Servings: {}\n\
         - Meals per day: {}\n\n\
         Current step: {step}",
        list(prefs.diet.iter(), "no restrictions"),
        list(prefs.allergens.iter(), "none"),
        list(prefs.excluded_foods.iter(), "none"),
        prefs.budget,
        prefs.cooking_time,
        prefs.servings,
        prefs.meals_per_day,
    )
}

pub const HELP: &str = "I plan a menu for the week and write the shopping list.\n\n\
    Commands:\n\
    /start - Start over and pick your preferences\n\
    /menu - Show your current menu\n\
    /prefs - Show your preferences\n\
    /exclude - Exclude foods, e.g. /exclude mushrooms, olives\n\
    /help - Show this message";

pub const FALLBACK: &str = "Use /start to create a menu, or /help to see what I can do.";

pub const NOT_AVAILABLE: &str = "That option isn't available right now.";

const fn diet_icon(diet: Diet) -> &'static str {
    match diet {
        Diet::None => "🥗",
        Diet::Vegetarian => "🌱",
        Diet::Vegan => "🥑",
        Diet::Keto => "🥩",
        Diet::Paleo => "🍖",
        Diet::Lowcarb => "🥦",
    }
}

const fn allergen_icon(allergen: Allergen) -> &'static str {
    match allergen {
        Allergen::Dairy => "🥛",
        Allergen::Eggs => "🥚",
        Allergen::Nuts => "🥜",
        Allergen::Gluten => "🌾",
        Allergen::Seafood => "🦐",
        Allergen::Citrus => "🍋",
    }
}
