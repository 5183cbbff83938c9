//! Input prompts for the setup wizard.

use anyhow::Result;
use console::style;
use dialoguer::{Input, Select};

/// Prompt label with context and optional URL.
pub struct PromptConfig<'a> {
    pub label: &'a str,
    pub context: &'a str,
    pub url: Option<&'a str>,
}

impl<'a> PromptConfig<'a> {
    #[must_use]
    pub const fn new(label: &'a str, context: &'a str) -> Self {
        Self {
            label,
            context,
            url: None,
        }
    }

    #[must_use]
    pub const fn with_url(mut self, url: &'a str) -> Self {
        self.url = Some(url);
        self
    }
}

fn print_header(config: &PromptConfig<'_>) {
    println!();
    println!("{} {}", style("»").bold(), config.label);
    println!("  {}", style(config.context).dim());

    if let Some(url) = config.url {
        println!("  {}", style(url).cyan());
    }
}

/// Prompt for a secret with validation.
///
/// If `existing` is Some, shows it masked and Enter keeps it.
pub fn prompt_secret<F>(config: &PromptConfig<'_>, existing: Option<&str>, validator: F) -> Result<String>
where
    F: Fn(&str) -> std::result::Result<(), &'static str> + Clone,
{
    print_header(config);

    if let Some(val) = existing {
        println!();
        println!(
            "  {}",
            style(format!("Current: {} (Enter to keep)", mask_value(val))).dim()
        );
    }

    let has_existing = existing.is_some();
    let value: String = Input::<String>::new()
        .with_prompt("  >")
        .allow_empty(has_existing)
        .validate_with(move |input: &String| -> std::result::Result<(), &str> {
            if input.is_empty() && has_existing {
                return Ok(());
            }
            validator(input.trim())
        })
        .interact_text()?;

    if value.is_empty()
        && let Some(existing_val) = existing
    {
        return Ok(existing_val.to_string());
    }

    Ok(value.trim().to_string())
}

/// Prompt for a value with a default. Enter keeps the default.
pub fn prompt_with_default(config: &PromptConfig<'_>, default: &str) -> Result<String> {
    print_header(config);

    let value: String = Input::<String>::new()
        .with_prompt("  >")
        .default(default.to_string())
        .interact_text()?;

    Ok(value.trim().to_string())
}

/// Pick one item. Returns its index.
pub fn select(label: &str, items: &[&str], default: usize) -> Result<usize> {
    println!();
    let index = Select::new()
        .with_prompt(format!("{} {label}", style("»").bold()))
        .items(items)
        .default(default)
        .interact()?;
    Ok(index)
}

/// Prompt for confirmation (yes/no).
pub fn confirm(message: &str) -> Result<bool> {
    let result = dialoguer::Confirm::new()
        .with_prompt(format!("{} {message}", style("»").bold()))
        .default(false)
        .interact()?;
    Ok(result)
}

/// Mask a sensitive value for display.
fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}

/// Validate a Telegram bot token format.
///
/// Format: `123456789:ABCdefGHIjklMNOpqrsTUVwxyz`
pub fn validate_telegram_token(token: &str) -> std::result::Result<(), &'static str> {
    if token.is_empty() {
        return Err("Token cannot be empty");
    }

    let Some((id, secret)) = token.split_once(':') else {
        return Err("Invalid format (expected ID:token)");
    };

    if id.parse::<u64>().is_err() {
        return Err("Invalid bot ID (should be numeric)");
    }

    if secret.len() < 30 {
        return Err("Token part looks too short");
    }

    Ok(())
}

/// Validate an `OpenAI`-style API key format.
pub fn validate_api_key(key: &str) -> std::result::Result<(), &'static str> {
    if key.is_empty() {
        return Err("API key cannot be empty");
    }

    if !key.starts_with("sk-") {
        return Err("Should start with 'sk-'");
    }

    if key.len() < 20 {
        return Err("Key looks too short");
    }

    Ok(())
}

/// Validate a two-letter language code, or empty for none.
pub fn validate_language(code: &str) -> std::result::Result<(), &'static str> {
    if code.is_empty() || (code.len() == 2 && code.chars().all(|c| c.is_ascii_lowercase())) {
        Ok(())
    } else {
        Err("Use a two-letter language code like 'ru', or leave empty")
    }
}
