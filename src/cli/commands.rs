//! CLI commands.

use std::process::ExitCode;

use anyhow::Result;

use crate::config::{self, Config};
use crate::menu::{Menu, MenuOrError, MealSlot};
use crate::provider;
use crate::render;
use crate::store::StateStore;
use crate::telegram::TelegramApi;
use crate::ui::{self, Align, Spinner, StatusLine, Table};

use super::PreviewArgs;

/// Run health checks and return appropriate exit code.
pub async fn check() -> ExitCode {
    println!();
    println!("menubot {}", env!("CARGO_PKG_VERSION"));
    println!();

    let config = match Config::load() {
        Ok(config) => {
            StatusLine::ok(format!("Config: {}", config::config_path().display())).print();
            config
        }
        Err(e) => {
            StatusLine::error(format!("Config: {e}")).print();
            ui::status::hint("Run `menubot setup` to create one.");
            println!();
            return ExitCode::FAILURE;
        }
    };

    let db_path = config.store.db_path();
    let store = StateStore::open(&db_path).and_then(|s| s.count());
    let lines = [
        match &store {
            Ok(count) => StatusLine::ok(format!("State: {} ({count} chats)", db_path.display())),
            Err(e) => StatusLine::error(format!("State: {e}")),
        },
        StatusLine::from_result("Menu provider", &provider::from_config(&config).map(|_| ())),
        match TelegramApi::new(&config.telegram.bot_token).get_me().await {
            Ok(info) => StatusLine::ok(format!("Telegram: @{}", info.username)),
            Err(e) => StatusLine::error(format!("Telegram: {e}")),
        },
        match &config.webhook {
            Some(webhook) if webhook.public_url.is_some() => {
                StatusLine::ok(format!("Webhook: listens on {}", webhook.listen))
            }
            Some(_) => StatusLine::skip("Webhook: no public_url, register it yourself"),
            None => StatusLine::skip("Webhook (not configured, use `menubot poll`)"),
        },
    ];

    for line in &lines {
        line.print();
    }
    println!();

    if lines.iter().any(StatusLine::is_error) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

pub fn config_cmd() -> Result<()> {
    let config_path = config::config_path();

    if !config_path.exists() {
        ui::status::print_error(
            "No config file found",
            Some("Run `menubot setup` to create one."),
        );
        return Ok(());
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());

    std::process::Command::new(editor)
        .arg(&config_path)
        .status()?;

    Ok(())
}

/// Generate one menu with the configured provider and print it.
pub async fn preview(args: &PreviewArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let provider = provider::from_config(&config)?;
    let preferences = args.preferences();

    println!();
    let spinner = Spinner::new(&format!("Planning a week with {}", provider.name()));
    let result = provider.generate(&preferences).await;

    match &result {
        MenuOrError::Menu(menu) => {
            spinner.finish();
            println!();
            print_table(menu, &config.currency);
            println!();
            println!("{}", render::render_menu(&result, &config.currency).text);
            println!();
            Ok(ExitCode::SUCCESS)
        }
        MenuOrError::Error(message) => {
            spinner.finish_error();
            ui::status::print_error(message, None);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_table(menu: &Menu, currency: &str) {
    let slots = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];
    let mut headers = vec!["Day"];
    headers.extend(slots.iter().copied().map(MealSlot::label));
    headers.push("Cost");

    let mut table = Table::new(&headers).align(slots.len() + 1, Align::Right);
    for day in menu.days() {
        let mut row = vec![day.day.clone()];
        row.extend(
            slots
                .iter()
                .map(|slot| day.meals.get(slot).map_or_else(|| "-".to_string(), |m| m.name.clone())),
        );
        row.push(format!("{} {currency}", day.cost()));
        table.add_row(&row);
    }
    table.print();
}
