//! Configuration loading and management.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Menubot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Currency symbol shown next to costs.
    #[serde(default = "default_currency")]
    pub currency: String,
    pub telegram: TelegramConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub recipes: RecipesConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Telegram user ids allowed to talk to the bot. Empty means everyone.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_users: Vec<u64>,
}

/// Webhook server settings, used by `menubot serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_webhook_path")]
    pub path: String,
    /// Public HTTPS URL registered with Telegram on startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    /// Expected value of the `X-Telegram-Bot-Api-Secret-Token` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
}

/// Which menu provider generates menus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Llm,
    Recipes,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Llm => write!(f, "llm"),
            Self::Recipes => write!(f, "recipes"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
}

/// `OpenAI`-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

/// `TheMealDB` recipe source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipesConfig {
    #[serde(default = "default_recipes_base_url")]
    pub base_url: String,
    /// How many recipes to look up per category.
    #[serde(default = "default_per_category")]
    pub per_category: usize,
    /// Translate dish names into this language (e.g. "ru"). Unset keeps English.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_to: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the `SQLite` state database. Defaults to `state.db` in the config dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl StoreConfig {
    /// Resolved database path, with `~` expanded.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.path.as_ref().map_or_else(
            || config_dir().join("state.db"),
            |p| PathBuf::from(shellexpand::tilde(p).as_ref()),
        )
    }
}

fn default_currency() -> String {
    "₽".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_path() -> String {
    "telegram".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

const fn default_temperature() -> f32 {
    0.8
}

const fn default_llm_timeout() -> u64 {
    90
}

fn default_recipes_base_url() -> String {
    "https://www.themealdb.com/api/json/v1/1".to_string()
}

const fn default_per_category() -> usize {
    10
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            base_url: default_recipes_base_url(),
            per_category: default_per_category(),
            translate_to: None,
        }
    }
}

impl Config {
    /// Load configuration from the default path, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = config_path();
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let mut config = Self::parse(&contents)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config.toml")
    }

    /// Override secrets from the environment.
    ///
    /// `TELEGRAM_BOT_TOKEN` replaces the bot token. `OPENAI_API_KEY` replaces
    /// the LLM key, creating the `[llm]` section if it was missing.
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = var("TELEGRAM_BOT_TOKEN").filter(|t| !t.is_empty()) {
            self.telegram.bot_token = token;
        }

        if let Some(key) = var("OPENAI_API_KEY").filter(|k| !k.is_empty()) {
            self.llm
                .get_or_insert_with(|| LlmConfig::with_key(String::new()))
                .api_key = key;
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let path = config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Create a new config with the given token and provider.
    #[must_use]
    pub fn new(telegram_token: String, kind: ProviderKind, llm: Option<LlmConfig>) -> Self {
        Self {
            currency: default_currency(),
            telegram: TelegramConfig {
                bot_token: telegram_token,
                allowed_users: Vec::new(),
            },
            webhook: None,
            provider: ProviderConfig { kind },
            llm,
            recipes: RecipesConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl LlmConfig {
    /// LLM settings with defaults for everything but the key.
    #[must_use]
    pub fn with_key(api_key: String) -> Self {
        Self {
            api_key,
            model: default_model(),
            base_url: default_llm_base_url(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Get the menubot config directory (~/menubot).
pub fn config_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("./menubot"),
        |d| d.home_dir().join("menubot"),
    )
}

/// Get the config file path. `MENUBOT_CONFIG` points at an alternate file.
pub fn config_path() -> PathBuf {
    std::env::var("MENUBOT_CONFIG")
        .ok()
        .filter(|p| !p.is_empty())
        .map_or_else(|| config_dir().join("config.toml"), PathBuf::from)
}
