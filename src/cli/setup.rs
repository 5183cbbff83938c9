//! Setup wizard for initial menubot configuration.

use anyhow::Result;
use console::style;

use crate::config::{Config, LlmConfig, ProviderKind};
use crate::telegram::TelegramApi;
use crate::ui::prompt::{self, PromptConfig};
use crate::ui::{self, Spinner, StatusLine};

const PROVIDERS: [&str; 2] = [
    "LLM (OpenAI-compatible API, needs a key)",
    "Recipe database (TheMealDB, free)",
];

pub async fn setup() -> Result<()> {
    let existing = Config::load().ok();

    if existing.is_some() {
        println!();
        let reconfigure = prompt::confirm("menubot is already configured. Reconfigure?")?;
        if !reconfigure {
            println!();
            println!("  Run `menubot config` to edit existing configuration.");
            println!();
            return Ok(());
        }
    }

    println!();
    println!("{}", style("Welcome to menubot").bold());
    println!();
    println!("A week of meals and a shopping list, one tap at a time.");

    let token = prompt::prompt_secret(
        &PromptConfig::new(
            "Telegram bot token",
            "Message @BotFather, send /newbot, copy the token",
        )
        .with_url("https://t.me/BotFather"),
        existing.as_ref().map(|c| c.telegram.bot_token.as_str()),
        prompt::validate_telegram_token,
    )?;

    let spinner = Spinner::new("Checking token");
    let bot_info = TelegramApi::new(&token).get_me().await;
    match &bot_info {
        Ok(_) => spinner.finish(),
        Err(_) => spinner.finish_error(),
    }
    let bot_info = bot_info?;

    let current_kind = existing.as_ref().map_or(ProviderKind::Llm, |c| c.provider.kind);
    let kind = match prompt::select(
        "Where should menus come from?",
        &PROVIDERS,
        usize::from(current_kind == ProviderKind::Recipes),
    )? {
        0 => ProviderKind::Llm,
        _ => ProviderKind::Recipes,
    };

    let mut config = existing.clone().unwrap_or_else(|| Config::new(token.clone(), kind, None));
    config.telegram.bot_token = token;
    config.provider.kind = kind;

    match kind {
        ProviderKind::Llm => {
            let key = prompt::prompt_secret(
                &PromptConfig::new("API key", "Used for chat completions")
                    .with_url("https://platform.openai.com/api-keys"),
                existing
                    .as_ref()
                    .and_then(|c| c.llm.as_ref())
                    .map(|l| l.api_key.as_str()),
                prompt::validate_api_key,
            )?;
            config
                .llm
                .get_or_insert_with(|| LlmConfig::with_key(String::new()))
                .api_key = key;
        }
        ProviderKind::Recipes => {
            let current = config.recipes.translate_to.clone().unwrap_or_default();
            let lang = prompt::prompt_with_default(
                &PromptConfig::new(
                    "Translate dish names to",
                    "Two-letter language code, empty keeps English",
                ),
                &current,
            )?;
            prompt::validate_language(&lang).map_err(anyhow::Error::msg)?;
            config.recipes.translate_to = Some(lang).filter(|l| !l.is_empty());
        }
    }

    config.currency = prompt::prompt_with_default(
        &PromptConfig::new("Currency", "Shown next to every price"),
        &config.currency,
    )?;

    config.save()?;

    println!();
    StatusLine::ok(format!("Telegram: @{}", bot_info.username)).print();
    StatusLine::ok(format!("Menus: {kind}")).print();
    StatusLine::ok(format!("Config written: {}", crate::config::config_path().display())).print();

    ui::status::print_success(
        "Setup complete",
        Some(
            "Run `menubot` to start the bot!\n\nCommands:\n  menubot          Start with long polling\n  menubot serve    Start behind a webhook\n  menubot check    Check configuration\n  menubot preview  Try a menu in the terminal",
        ),
    );

    Ok(())
}
