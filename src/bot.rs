//! Bot startup: wire config, store, provider and channel, then take updates.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;

use crate::channel::{Messenger, TelegramMessenger};
use crate::config::Config;
use crate::dialogue::Dialogue;
use crate::dispatch::Dispatcher;
use crate::provider;
use crate::server;
use crate::store::StateStore;
use crate::telegram::TelegramApi;
use crate::ui::StatusLine;

/// Version from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How updates reach the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `getUpdates` long polling.
    Poll,
    /// Telegram pushes updates to our webhook.
    Serve,
}

pub async fn run(mode: Mode) -> Result<()> {
    let config = Config::load()?;
    let api = TelegramApi::new(&config.telegram.bot_token);

    // Fetch bot info first (needed for header)
    let bot_info = api
        .get_me()
        .await
        .context("Failed to reach Telegram. Check the bot token")?;

    println!();
    println!(
        "{} (@{}) {}",
        style(&bot_info.name).bold(),
        style(&bot_info.username).dim(),
        style(format!("v{VERSION}")).dim()
    );
    println!();

    StatusLine::ok(format!("Telegram: @{}", bot_info.username)).print();

    let db_path = config.store.db_path();
    let store = Arc::new(StateStore::open(&db_path)?);
    StatusLine::ok(format!(
        "State: {} ({} chats)",
        db_path.display(),
        store.count()?
    ))
    .print();

    let provider = provider::from_config(&config)?;
    StatusLine::ok(format!("Menus: {}", provider.name())).print();

    if config.telegram.allowed_users.is_empty() {
        StatusLine::skip("Open to everyone (no allowed_users)").print();
    } else {
        StatusLine::ok(format!(
            "Allowed users: {}",
            config.telegram.allowed_users.len()
        ))
        .print();
    }

    if let Err(e) = api.register_commands().await {
        tracing::warn!("Failed to register commands: {e:?}");
    }

    let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(&config.telegram.bot_token));
    let dialogue = Dialogue::new(store, provider, Arc::clone(&messenger), &config.currency);
    let dispatcher = Arc::new(Dispatcher::new(
        dialogue,
        messenger,
        config.telegram.allowed_users.clone(),
    ));

    match mode {
        Mode::Poll => {
            StatusLine::ok("Long polling").print();
            listening();
            server::poll(dispatcher, &api).await
        }
        Mode::Serve => {
            let webhook = config
                .webhook
                .as_ref()
                .context("`menubot serve` needs a [webhook] section in config.toml")?;

            match &webhook.public_url {
                Some(url) => {
                    api.set_webhook(url, webhook.secret_token.as_deref())
                        .await
                        .context("Failed to register webhook")?;
                    StatusLine::ok(format!("Webhook: {url}")).print();
                }
                None => StatusLine::skip("Webhook URL not set, leaving registration as is").print(),
            }
            StatusLine::ok(format!("Listening on {}/{}", webhook.listen, webhook.path)).print();

            listening();
            server::serve(dispatcher, webhook).await
        }
    }
}

fn listening() {
    println!();
    println!("  Ready. {}", style("(Ctrl+C to stop)").dim());
    println!();
}
