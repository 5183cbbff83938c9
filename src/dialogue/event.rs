//! Inbound events and the transition table.

use crate::preferences::{Allergen, Diet};

use super::state::Step;

/// A button press, decoded from its callback token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AddDiet(Diet),
    DietDone,
    AddAllergen(Allergen),
    AllergensDone,
    SetBudget(u32),
    SetServings(u32),
    Regenerate,
    ShoppingList,
}

impl Action {
    /// Decode a callback token. Unknown tokens and tags yield `None`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "diet_done" => return Some(Self::DietDone),
            "allergen_done" => return Some(Self::AllergensDone),
            "regenerate" => return Some(Self::Regenerate),
            "shopping_list" => return Some(Self::ShoppingList),
            _ => {}
        }

        let (prefix, value) = token.split_once('_')?;
        match prefix {
            "diet" => Diet::from_tag(value).map(Self::AddDiet),
            "allergen" => Allergen::from_tag(value).map(Self::AddAllergen),
            "budget" => positive(value).map(Self::SetBudget),
            "servings" => positive(value).map(Self::SetServings),
            _ => None,
        }
    }

    /// Callback token for this action.
    #[must_use]
    pub fn token(self) -> String {
        match self {
            Self::AddDiet(diet) => format!("diet_{}", diet.tag()),
            Self::DietDone => "diet_done".to_string(),
            Self::AddAllergen(allergen) => format!("allergen_{}", allergen.tag()),
            Self::AllergensDone => "allergen_done".to_string(),
            Self::SetBudget(budget) => format!("budget_{budget}"),
            Self::SetServings(servings) => format!("servings_{servings}"),
            Self::Regenerate => "regenerate".to_string(),
            Self::ShoppingList => "shopping_list".to_string(),
        }
    }
}

fn positive(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|n| *n > 0)
}

/// Text commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
    Prefs,
    Help,
    Exclude(Vec<String>),
}

impl Command {
    /// Parse a `/command`, ignoring a trailing `@botname`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;
        let (head, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let name = head.split('@').next().unwrap_or(head);

        match name {
            "start" => Some(Self::Start),
            "menu" => Some(Self::Menu),
            "prefs" => Some(Self::Prefs),
            "help" => Some(Self::Help),
            "exclude" => Some(Self::Exclude(
                args.split([',', '\n'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            )),
            _ => None,
        }
    }
}

/// One inbound event for a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Button(String),
    Command(Command),
    Text(String),
}

impl Event {
    /// Classify a text message as a command or plain text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Command::parse(text).map_or_else(|| Self::Text(text.to_string()), Self::Command)
    }
}

/// Outcome of applying a button action at a given step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    AddDiet(Diet),
    AskAllergens,
    AddAllergen(Allergen),
    AskBudget,
    AskServings,
    /// Ask the provider for a menu and move to (or stay in) `Ready`.
    Generate,
    ShowShoppingList,
    /// The action has no transition from this step.
    Rejected,
}

impl Transition {
    /// The step the conversation is in after this transition.
    #[must_use]
    pub const fn next_step(self, current: Step) -> Step {
        match self {
            Self::AddDiet(_) => Step::CollectingDiet,
            Self::AskAllergens | Self::AddAllergen(_) => Step::CollectingAllergens,
            Self::AskBudget => Step::CollectingBudget,
            Self::AskServings => Step::CollectingServings,
            Self::Generate | Self::ShowShoppingList => Step::Ready,
            Self::Rejected => current,
        }
    }
}

/// The transition table. Pairs not listed here are rejected.
#[must_use]
pub const fn transition(step: Step, action: Action) -> Transition {
    match (step, action) {
        (Step::CollectingDiet, Action::AddDiet(diet)) => Transition::AddDiet(diet),
        (Step::CollectingDiet, Action::DietDone) => Transition::AskAllergens,
        (Step::CollectingAllergens, Action::AddAllergen(allergen)) => {
            Transition::AddAllergen(allergen)
        }
        (Step::CollectingAllergens, Action::AllergensDone) => Transition::AskBudget,
        (Step::CollectingBudget, Action::SetBudget(_)) => Transition::AskServings,
        (Step::CollectingServings, Action::SetServings(_)) | (Step::Ready, Action::Regenerate) => {
            Transition::Generate
        }
        (Step::Ready, Action::ShoppingList) => Transition::ShowShoppingList,
        _ => Transition::Rejected,
    }
}
