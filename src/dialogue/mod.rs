//! The conversation: steps, inbound events, and how each event is handled.

mod event;
mod state;

use std::sync::Arc;
use std::time::Instant;

use crate::channel::Messenger;
use crate::menu::MenuOrError;
use crate::provider::MenuProvider;
use crate::render::{self, Reply};
use crate::store::StateStore;

pub use event::{Action, Command, Event, Transition, transition};
pub use state::{ConversationState, Step};

/// What handling one event produced.
struct Outcome {
    /// State to persist. `None` leaves the stored row untouched.
    save: Option<ConversationState>,
    reply: Reply,
}

impl Outcome {
    const fn read_only(reply: Reply) -> Self {
        Self { save: None, reply }
    }

    const fn write(state: ConversationState, reply: Reply) -> Self {
        Self {
            save: Some(state),
            reply,
        }
    }
}

/// Handles events for every chat.
///
/// State is loaded fresh for each event. Callers serialize events per chat;
/// see [`crate::dispatch::Dispatcher`].
pub struct Dialogue {
    store: Arc<StateStore>,
    provider: Arc<dyn MenuProvider>,
    messenger: Arc<dyn Messenger>,
    currency: String,
}

impl Dialogue {
    pub fn new(
        store: Arc<StateStore>,
        provider: Arc<dyn MenuProvider>,
        messenger: Arc<dyn Messenger>,
        currency: &str,
    ) -> Self {
        Self {
            store,
            provider,
            messenger,
            currency: currency.to_string(),
        }
    }

    /// Handle one event. Failures are logged, never returned.
    pub async fn handle(&self, chat_id: i64, event: Event) {
        let outcome = match self.load(chat_id) {
            Some(state) => self.respond(chat_id, state, event).await,
            None => {
                tracing::info!("Chat {chat_id} has no state, starting over");
                Outcome::write(ConversationState::initial(), render::welcome())
            }
        };

        if let Some(state) = &outcome.save
            && let Err(e) = self.store.save(chat_id, state)
        {
            tracing::error!("Failed to save state for chat {chat_id}: {e:?}");
        }

        self.deliver(chat_id, &outcome.reply).await;
    }

    fn load(&self, chat_id: i64) -> Option<ConversationState> {
        self.store.load(chat_id).unwrap_or_else(|e| {
            tracing::error!("Failed to load state for chat {chat_id}: {e:?}");
            None
        })
    }

    async fn deliver(&self, chat_id: i64, reply: &Reply) {
        if let Err(e) = self.messenger.send(chat_id, reply).await {
            tracing::warn!("Failed to deliver reply to chat {chat_id}: {e:?}");
        }
    }

    async fn respond(&self, chat_id: i64, state: ConversationState, event: Event) -> Outcome {
        match event {
            Event::Command(command) => self.command(chat_id, state, command),
            Event::Text(_) => Outcome::read_only(Reply::text(render::FALLBACK)),
            Event::Button(token) => self.button(chat_id, state, &token).await,
        }
    }

    fn command(&self, chat_id: i64, state: ConversationState, command: Command) -> Outcome {
        match command {
            Command::Start => {
                tracing::info!("Chat {chat_id} reset");
                Outcome::write(ConversationState::initial(), render::welcome())
            }
            Command::Menu => Outcome::read_only(state.menu.map_or_else(
                || Reply::text(render::NO_MENU_YET),
                |menu| render::render_menu(&MenuOrError::Menu(menu), &self.currency),
            )),
            Command::Prefs => Outcome::read_only(Reply::text(render::preferences_summary(
                &state.preferences,
                state.step,
                &self.currency,
            ))),
            Command::Help => Outcome::read_only(Reply::text(render::HELP)),
            Command::Exclude(foods) if foods.is_empty() => {
                Outcome::read_only(render::excluded_foods(&state.preferences))
            }
            Command::Exclude(foods) => {
                let mut state = state;
                for food in &foods {
                    state.preferences.exclude_food(food);
                }
                let reply = render::excluded_foods(&state.preferences);
                Outcome::write(state, reply)
            }
        }
    }

    async fn button(&self, chat_id: i64, mut state: ConversationState, token: &str) -> Outcome {
        let Some(action) = Action::parse(token) else {
            tracing::debug!("Chat {chat_id} sent unknown token '{token}'");
            return self.rejected(&state);
        };

        let next = transition(state.step, action);
        let from = state.step;
        state.step = next.next_step(from);
        if from != state.step {
            tracing::info!("Chat {chat_id}: {from} -> {}", state.step);
        }

        let reply = match (next, action) {
            (Transition::Rejected, Action::ShoppingList) => {
                return Outcome::read_only(Reply::text(render::NO_MENU_YET));
            }
            (Transition::Rejected, _) => {
                tracing::debug!("Chat {chat_id}: {action:?} not allowed at {from}");
                return self.rejected(&state);
            }
            (Transition::AddDiet(diet), _) => {
                let added = state.preferences.add_diet(diet);
                render::diet_added(diet, added)
            }
            (Transition::AskAllergens, _) => render::allergen_prompt(),
            (Transition::AddAllergen(allergen), _) => {
                let added = state.preferences.add_allergen(allergen);
                render::allergen_added(allergen, added)
            }
            (Transition::AskBudget, _) => render::budget_prompt(&self.currency),
            (Transition::AskServings, Action::SetBudget(budget)) => {
                state.preferences.budget = budget;
                render::servings_prompt()
            }
            (Transition::AskServings, _) => render::servings_prompt(),
            (Transition::Generate, action) => {
                let wait = if let Action::SetServings(servings) = action {
                    state.preferences.servings = servings;
                    render::PLEASE_WAIT
                } else {
                    render::PLEASE_WAIT_AGAIN
                };
                self.deliver(chat_id, &Reply::text(wait)).await;

                let result = self.generate(chat_id, &state).await;
                let reply = render::render_menu(&result, &self.currency);
                state.menu = result.into_menu();
                reply
            }
            (Transition::ShowShoppingList, _) => state.menu.as_ref().map_or_else(
                || Reply::text(render::NO_MENU_YET),
                |menu| render::render_shopping_list(&menu.shopping_items()),
            ),
        };

        Outcome::write(state, reply)
    }

    async fn generate(&self, chat_id: i64, state: &ConversationState) -> MenuOrError {
        let started = Instant::now();
        let result = self.provider.generate(&state.preferences).await;
        match &result {
            MenuOrError::Menu(menu) => tracing::info!(
                "Menu for chat {chat_id} from {} in {:?} ({} total)",
                self.provider.name(),
                started.elapsed(),
                menu.total_cost()
            ),
            MenuOrError::Error(message) => tracing::warn!(
                "Provider {} failed for chat {chat_id}: {message}",
                self.provider.name()
            ),
        }
        result
    }

    /// A stray or stale button: say so and repeat the current prompt.
    fn rejected(&self, state: &ConversationState) -> Outcome {
        let prompt = render::step_prompt(state.step, state.menu.is_some(), &self.currency);
        Outcome::read_only(Reply {
            text: format!("{}\n\n{}", render::NOT_AVAILABLE, prompt.text),
            keyboard: prompt.keyboard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::RecordingMessenger;
    use crate::menu::fixtures::week;
    use crate::preferences::{Allergen, Diet};
    use crate::provider::testing::StubProvider;

    const CHAT: i64 = 100;

    struct Harness {
        dialogue: Dialogue,
        store: Arc<StateStore>,
        provider: Arc<StubProvider>,
        messenger: Arc<RecordingMessenger>,
    }

    impl Harness {
        fn new(results: Vec<MenuOrError>) -> Self {
            Self::with_messenger(results, RecordingMessenger::default())
        }

        fn with_messenger(results: Vec<MenuOrError>, messenger: RecordingMessenger) -> Self {
            let store = Arc::new(StateStore::open_in_memory().unwrap());
            let provider = Arc::new(StubProvider::new(results));
            let messenger = Arc::new(messenger);
            let dialogue = Dialogue::new(store.clone(), provider.clone(), messenger.clone(), "₽");
            Self {
                dialogue,
                store,
                provider,
                messenger,
            }
        }

        async fn text(&self, text: &str) {
            self.dialogue.handle(CHAT, Event::from_text(text)).await;
        }

        async fn press(&self, token: &str) {
            self.dialogue
                .handle(CHAT, Event::Button(token.to_string()))
                .await;
        }

        fn state(&self) -> ConversationState {
            self.store.load(CHAT).unwrap().unwrap()
        }

        /// Walk from `/start` to a generated menu.
        async fn complete_flow(&self) {
            for token in [
                "diet_vegan",
                "diet_done",
                "allergen_nuts",
                "allergen_done",
                "budget_7000",
                "servings_2",
            ] {
                self.press(token).await;
            }
        }
    }

    fn ok_week() -> MenuOrError {
        MenuOrError::Menu(week())
    }

    #[tokio::test]
    async fn start_resets_and_greets() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;

        assert_eq!(h.state(), ConversationState::initial());
        let reply = h.messenger.last();
        assert!(reply.text.contains("Step 1/4"));
        assert!(reply.keyboard.unwrap().has_token("diet_done"));
    }

    #[tokio::test]
    async fn unknown_chat_is_initialized_whatever_the_event() {
        let h = Harness::new(vec![ok_week()]);
        h.press("budget_3000").await;

        assert_eq!(h.state(), ConversationState::initial());
        assert!(h.messenger.last().text.contains("Step 1/4"));
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn diet_selection_is_an_idempotent_union() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.press("diet_vegan").await;
        h.press("diet_keto").await;
        h.press("diet_vegan").await;

        let state = h.state();
        assert_eq!(state.step, Step::CollectingDiet);
        assert_eq!(
            state.preferences.diet.into_iter().collect::<Vec<_>>(),
            vec![Diet::Vegan, Diet::Keto]
        );
        assert!(h.messenger.last().text.contains("Already selected"));
    }

    #[tokio::test]
    async fn full_flow_generates_and_stores_a_menu() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.complete_flow().await;

        let state = h.state();
        assert_eq!(state.step, Step::Ready);
        assert_eq!(state.menu, Some(week()));
        assert_eq!(state.preferences.budget, 7000);
        assert_eq!(state.preferences.servings, 2);
        assert!(state.preferences.allergens.contains(&Allergen::Nuts));

        assert_eq!(h.provider.calls(), 1);
        let seen = h.provider.seen.lock().unwrap()[0].clone();
        assert_eq!(seen, state.preferences);

        let replies = h.messenger.replies();
        let n = replies.len();
        assert_eq!(replies[n - 2].text, render::PLEASE_WAIT);
        assert!(replies[n - 1].text.contains("Week total: 4830 ₽"));
    }

    #[tokio::test]
    async fn start_resets_from_any_step() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.complete_flow().await;
        assert_eq!(h.state().step, Step::Ready);

        h.text("/start").await;
        assert_eq!(h.state(), ConversationState::initial());
    }

    #[tokio::test]
    async fn shopping_list_follows_the_stored_menu() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.complete_flow().await;
        h.press("shopping_list").await;

        let text = h.messenger.last().text;
        let bullets: Vec<&str> = text.lines().filter(|l| l.starts_with("- ")).collect();
        assert_eq!(bullets.len(), 21);
        assert_eq!(bullets[0], "- Monday porridge");
        assert_eq!(bullets[20], "- Sunday stew");
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn shopping_list_before_any_menu() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        let before = h.store.raw_row(CHAT);

        h.press("shopping_list").await;

        assert_eq!(h.messenger.last().text, render::NO_MENU_YET);
        assert_eq!(h.provider.calls(), 0);
        assert_eq!(h.store.raw_row(CHAT), before);
    }

    #[tokio::test]
    async fn unrecognized_button_when_ready_changes_nothing() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.complete_flow().await;
        let before = h.store.raw_row(CHAT).unwrap();

        h.press("budget_3000").await;
        h.press("teleport_home").await;

        assert_eq!(h.store.raw_row(CHAT).unwrap(), before);
        let reply = h.messenger.last();
        assert!(reply.text.starts_with(render::NOT_AVAILABLE));
        assert!(reply.keyboard.unwrap().has_token("shopping_list"));
        assert_eq!(h.provider.calls(), 1);
    }

    #[tokio::test]
    async fn out_of_order_button_repeats_the_prompt() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.press("servings_2").await;

        assert_eq!(h.state().step, Step::CollectingDiet);
        let reply = h.messenger.last();
        assert!(reply.text.contains("Step 1/4"));
        assert!(reply.keyboard.unwrap().has_token("diet_vegan"));
    }

    #[tokio::test]
    async fn regenerate_replaces_the_menu() {
        let mut second = week().days().to_vec();
        second[0].meals.values_mut().for_each(|m| m.name = "Pancakes".to_string());
        let second = crate::menu::Menu::new(second).unwrap();

        let h = Harness::new(vec![ok_week(), MenuOrError::Menu(second.clone())]);
        h.text("/start").await;
        h.complete_flow().await;
        h.press("regenerate").await;

        assert_eq!(h.provider.calls(), 2);
        assert_eq!(h.state().menu, Some(second));
        let replies = h.messenger.replies();
        assert_eq!(replies[replies.len() - 2].text, render::PLEASE_WAIT_AGAIN);
    }

    #[tokio::test]
    async fn provider_error_is_shown_and_clears_the_menu() {
        let h = Harness::new(vec![ok_week(), MenuOrError::error("service unavailable")]);
        h.text("/start").await;
        h.complete_flow().await;
        h.press("regenerate").await;

        let state = h.state();
        assert_eq!(state.step, Step::Ready);
        assert!(state.menu.is_none());

        let reply = h.messenger.last();
        assert!(reply.text.contains("service unavailable"));
        let keyboard = reply.keyboard.unwrap();
        assert!(keyboard.has_token("regenerate"));
        assert!(!keyboard.has_token("shopping_list"));

        h.press("shopping_list").await;
        assert_eq!(h.messenger.last().text, render::NO_MENU_YET);
    }

    #[tokio::test]
    async fn menu_command_is_read_only() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.text("/menu").await;
        assert_eq!(h.messenger.last().text, render::NO_MENU_YET);

        h.complete_flow().await;
        let before = h.store.raw_row(CHAT);
        h.text("/menu").await;
        h.text("/prefs").await;
        h.text("/help").await;
        h.text("what's for dinner?").await;

        assert_eq!(h.store.raw_row(CHAT), before);
        let replies = h.messenger.replies();
        let n = replies.len();
        assert!(replies[n - 4].text.contains("Your menu for the week"));
        assert!(replies[n - 3].text.contains("Budget: 7000 ₽ per week"));
        assert_eq!(replies[n - 2].text, render::HELP);
        assert_eq!(replies[n - 1].text, render::FALLBACK);
    }

    #[tokio::test]
    async fn exclude_appends_new_foods() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.text("/exclude mushrooms, olives").await;
        h.text("/exclude olives, blue cheese").await;

        assert_eq!(
            h.state().preferences.excluded_foods,
            vec!["mushrooms", "olives", "blue cheese"]
        );
        assert!(h.messenger.last().text.contains("mushrooms, olives, blue cheese"));
        assert_eq!(h.state().step, Step::CollectingDiet);
    }

    #[tokio::test]
    async fn exclusions_reach_the_provider() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.text("/exclude liver").await;
        h.complete_flow().await;

        let seen = h.provider.seen.lock().unwrap()[0].clone();
        assert_eq!(seen.excluded_foods, vec!["liver"]);
    }

    #[tokio::test]
    async fn delivery_failure_still_saves() {
        let h = Harness::with_messenger(vec![ok_week()], RecordingMessenger::failing());
        h.text("/start").await;
        h.press("diet_keto").await;

        assert!(h.state().preferences.diet.contains(&Diet::Keto));
        assert!(h.messenger.replies().is_empty());
    }

    #[tokio::test]
    async fn save_failure_still_replies() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.store.execute_raw(
            "CREATE TRIGGER frozen_insert BEFORE INSERT ON user_states
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;
             CREATE TRIGGER frozen_update BEFORE UPDATE ON user_states
                 BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        );

        h.press("diet_keto").await;

        assert_eq!(h.messenger.last().text, "✅ Added: Keto");
        assert_eq!(h.state(), ConversationState::initial());
    }

    #[tokio::test]
    async fn unknown_stored_step_starts_over() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.press("diet_vegan").await;
        h.store
            .execute_raw("UPDATE user_states SET step = 'cooking' WHERE chat_id = 100");
        h.messenger.clear();

        h.press("diet_keto").await;

        assert_eq!(h.state(), ConversationState::initial());
        assert_eq!(h.messenger.replies().len(), 1);
        assert!(h.messenger.last().text.contains("Step 1/4"));
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn undecodable_stored_preferences_start_over() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.complete_flow().await;
        h.store
            .execute_raw("UPDATE user_states SET preferences = '{not json' WHERE chat_id = 100");

        h.text("/menu").await;

        assert_eq!(h.state(), ConversationState::initial());
        assert!(h.messenger.last().text.starts_with("👋"));
    }

    #[tokio::test]
    async fn chats_are_independent() {
        let h = Harness::new(vec![ok_week()]);
        h.text("/start").await;
        h.press("diet_paleo").await;
        h.dialogue
            .handle(200, Event::Command(Command::Start))
            .await;

        assert!(h.state().preferences.diet.contains(&Diet::Paleo));
        let other = h.store.load(200).unwrap().unwrap();
        assert!(other.preferences.diet.is_empty());
    }
}
