//! Conversation state store backed by `SQLite`.
//!
//! One row per chat, upserted as a whole on every accepted event. Last write wins.

#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::dialogue::{ConversationState, Step};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS user_states (
        chat_id INTEGER PRIMARY KEY,
        step TEXT NOT NULL,
        preferences TEXT NOT NULL,
        menu TEXT,
        updated_at TEXT NOT NULL
    );";

/// Keyed record store for conversation state.
///
/// Thread-safe via internal `Mutex`.
pub struct StateStore {
    conn: Mutex<Connection>,
}

impl StateStore {
    /// Open or create the state database.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        Self::with_connection(conn)
    }

    /// In-memory store, for previews and tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Load the state for a chat, or `None` if the chat has never been seen.
    pub fn load(&self, chat_id: i64) -> Result<Option<ConversationState>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {e}"))?;

        let row: Option<(String, String, Option<String>)> = conn
            .query_row(
                "SELECT step, preferences, menu FROM user_states WHERE chat_id = ?1",
                params![chat_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .context("Failed to query state")?;

        let Some((step, preferences, menu)) = row else {
            return Ok(None);
        };

        let step = Step::parse(&step).with_context(|| format!("Unknown step '{step}'"))?;
        let preferences =
            serde_json::from_str(&preferences).context("Failed to decode stored preferences")?;
        let menu = menu
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("Failed to decode stored menu")?;

        Ok(Some(ConversationState {
            step,
            preferences,
            menu,
        }))
    }

    /// Insert or replace the full state for a chat.
    pub fn save(&self, chat_id: i64, state: &ConversationState) -> Result<()> {
        let preferences =
            serde_json::to_string(&state.preferences).context("Failed to encode preferences")?;
        let menu = state
            .menu
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to encode menu")?;
        let updated_at = Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {e}"))?;

        conn.execute(
            "INSERT INTO user_states (chat_id, step, preferences, menu, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (chat_id) DO UPDATE SET
                step = excluded.step,
                preferences = excluded.preferences,
                menu = excluded.menu,
                updated_at = excluded.updated_at",
            params![chat_id, state.step.as_str(), preferences, menu, updated_at],
        )
        .context("Failed to save state")?;

        tracing::debug!("State saved for chat {chat_id} at step {}", state.step);
        Ok(())
    }

    /// Number of chats with stored state.
    pub fn count(&self) -> Result<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {e}"))?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM user_states", [], |row| row.get(0))
            .context("Failed to count states")?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Run arbitrary SQL against the database.
    #[cfg(test)]
    pub fn execute_raw(&self, sql: &str) {
        self.conn.lock().unwrap().execute_batch(sql).unwrap();
    }

    /// Raw stored row, including the update timestamp.
    #[cfg(test)]
    pub fn raw_row(&self, chat_id: i64) -> Option<(String, String, Option<String>, String)> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT step, preferences, menu, updated_at FROM user_states WHERE chat_id = ?1",
            params![chat_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::fixtures::week;
    use crate::preferences::{Allergen, Diet};
    use tempfile::TempDir;

    fn test_store() -> (StateStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(&dir.path().join("state.db")).unwrap();
        (store, dir)
    }

    #[test]
    fn unknown_chat_has_no_state() {
        let (store, _dir) = test_store();
        assert!(store.load(42).unwrap().is_none());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn saves_and_loads_full_state() {
        let (store, _dir) = test_store();
        let mut state = ConversationState::initial();
        state.step = Step::Ready;
        state.preferences.add_diet(Diet::Vegan);
        state.preferences.add_allergen(Allergen::Citrus);
        state.preferences.budget = 7000;
        state.menu = Some(week());

        store.save(42, &state).unwrap();
        assert_eq!(store.load(42).unwrap(), Some(state));
    }

    #[test]
    fn save_overwrites_previous_state() {
        let (store, _dir) = test_store();
        let mut state = ConversationState::initial();
        state.menu = Some(week());
        store.save(42, &state).unwrap();

        let fresh = ConversationState::initial();
        store.save(42, &fresh).unwrap();

        let loaded = store.load(42).unwrap().unwrap();
        assert!(loaded.menu.is_none());
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.raw_row(42).unwrap().2.is_none());
    }

    #[test]
    fn chats_have_separate_state() {
        let (store, _dir) = test_store();
        let mut a = ConversationState::initial();
        a.preferences.add_diet(Diet::Keto);
        let mut b = ConversationState::initial();
        b.step = Step::CollectingBudget;

        store.save(1, &a).unwrap();
        store.save(2, &b).unwrap();

        assert_eq!(store.load(1).unwrap(), Some(a));
        assert_eq!(store.load(2).unwrap(), Some(b));
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.db");
        let mut state = ConversationState::initial();
        state.step = Step::CollectingServings;

        StateStore::open(&path).unwrap().save(7, &state).unwrap();
        let reopened = StateStore::open(&path).unwrap();
        assert_eq!(reopened.load(7).unwrap(), Some(state));
    }

    #[test]
    fn corrupt_row_is_an_error() {
        let store = StateStore::open_in_memory().unwrap();
        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO user_states VALUES (5, 'lost', '{}', NULL, '')",
                [],
            )
            .unwrap();
        }
        assert!(store.load(5).is_err());
    }
}
