//! Menu providers: turn preferences into a weekly menu.

mod filter;
mod llm;
mod recipes;
mod translate;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{Config, ProviderKind};
use crate::menu::MenuOrError;
use crate::preferences::Preferences;

use llm::LlmProvider;
use recipes::RecipeProvider;

/// Generates a weekly menu for a set of preferences.
///
/// Implementations fold transport and parsing failures into
/// [`MenuOrError::Error`]; they never fail outright.
#[async_trait]
pub trait MenuProvider: Send + Sync {
    /// Short name for logs and status output.
    fn name(&self) -> &str;

    async fn generate(&self, preferences: &Preferences) -> MenuOrError;
}

/// Build the provider selected in config.
pub fn from_config(config: &Config) -> Result<Arc<dyn MenuProvider>> {
    match config.provider.kind {
        ProviderKind::Llm => {
            let llm = config
                .llm
                .as_ref()
                .context("Provider 'llm' needs an [llm] section or OPENAI_API_KEY")?;
            Ok(Arc::new(LlmProvider::from_config(llm)?))
        }
        ProviderKind::Recipes => Ok(Arc::new(RecipeProvider::from_config(&config.recipes)?)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_provider_requires_key() {
        let config = Config::parse("[telegram]\nbot_token = \"1:a\"").unwrap();
        assert!(from_config(&config).is_err());
    }

    #[test]
    fn builds_selected_provider() {
        let config = Config::parse(
            "[telegram]\nbot_token = \"1:a\"\n[provider]\nkind = \"recipes\"",
        )
        .unwrap();
        assert_eq!(from_config(&config).unwrap().name(), "recipes");

        let config = Config::parse(
            "[telegram]\nbot_token = \"1:a\"\n[llm]\napi_key = \"sk-test\"",
        )
        .unwrap();
        assert_eq!(from_config(&config).unwrap().name(), "llm");
    }
}
