//! Per-conversation state: the current step, preferences and last menu.

use serde::{Deserialize, Serialize};

use crate::menu::Menu;
use crate::preferences::Preferences;

/// Steps of the dialogue, in order.
///
/// Progresses linearly: Diet → Allergens → Budget → Servings → Ready.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    #[default]
    #[serde(rename = "diet")]
    CollectingDiet,
    #[serde(rename = "allergens")]
    CollectingAllergens,
    #[serde(rename = "budget")]
    CollectingBudget,
    #[serde(rename = "servings")]
    CollectingServings,
    #[serde(rename = "ready")]
    Ready,
}

impl Step {
    /// Name used in storage and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CollectingDiet => "diet",
            Self::CollectingAllergens => "allergens",
            Self::CollectingBudget => "budget",
            Self::CollectingServings => "servings",
            Self::Ready => "ready",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::CollectingDiet,
            Self::CollectingAllergens,
            Self::CollectingBudget,
            Self::CollectingServings,
            Self::Ready,
        ]
        .into_iter()
        .find(|step| step.as_str() == s)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything remembered about one chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub step: Step,
    pub preferences: Preferences,
    pub menu: Option<Menu>,
}

impl ConversationState {
    /// Fresh state, as after `/start`.
    #[must_use]
    pub fn initial() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_starts_collecting_diet() {
        let state = ConversationState::initial();
        assert_eq!(state.step, Step::CollectingDiet);
        assert!(state.preferences.diet.is_empty());
        assert!(state.menu.is_none());
    }

    #[test]
    fn step_names_match_serde() {
        for name in ["diet", "allergens", "budget", "servings", "ready"] {
            let step = Step::parse(name).unwrap();
            assert_eq!(step.as_str(), name);
            assert_eq!(serde_json::to_value(step).unwrap(), serde_json::json!(name));
        }
        assert_eq!(Step::parse("done"), None);
    }
}
