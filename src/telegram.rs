//! Telegram Bot API helpers and formatting utilities.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

const API_BASE: &str = "https://api.telegram.org";

/// Convert the renderer's markdown subset to Telegram HTML.
///
/// Supported:
/// - `**bold**` becomes `<b>bold</b>`
/// - `- ` at the start of a line becomes a `•` bullet
///
/// Everything else is escaped, so dish names from providers can't inject tags.
pub fn to_telegram_html(text: &str) -> String {
    let text = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut content = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == '*' && chars.peek() == Some(&'*') {
                        chars.next();
                        closed = true;
                        break;
                    }
                    content.push(c);
                }
                if closed {
                    result.push_str("<b>");
                    result.push_str(&content);
                    result.push_str("</b>");
                } else {
                    result.push_str("**");
                    result.push_str(&content);
                }
            }
            '-' if chars.peek() == Some(&' ') && (result.is_empty() || result.ends_with('\n')) => {
                result.push('•');
            }
            _ => result.push(c),
        }
    }

    result
}

/// Bot identity from Telegram API.
pub struct BotInfo {
    /// Bot's display name
    pub name: String,
    /// Bot's username (e.g., `WeeklyMenuBot`)
    pub username: String,
}

/// Raw Bot API client for the calls teloxide isn't used for.
#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    token: String,
}

impl TelegramApi {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.to_string(),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{API_BASE}/bot{}/{method}", self.token)
    }

    /// Call a Bot API method and return its `result` field.
    async fn call(&self, method: &str, body: &Value, timeout: Duration) -> Result<Value> {
        let response: Value = self
            .client
            .post(self.url(method))
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("Failed to call Telegram {method}"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram {method} response"))?;

        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = response
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            anyhow::bail!("Telegram API error in {method}: {description}");
        }

        response
            .get("result")
            .cloned()
            .context("Missing result in response")
    }

    /// Fetch bot info.
    pub async fn get_me(&self) -> Result<BotInfo> {
        let result = self
            .call("getMe", &serde_json::json!({}), Duration::from_secs(10))
            .await?;

        let username = result
            .get("username")
            .and_then(Value::as_str)
            .map(String::from)
            .context("Missing username in response")?;

        // Use first_name as the friendly name, fallback to username
        let name = result
            .get("first_name")
            .and_then(Value::as_str)
            .map_or_else(|| username.clone(), String::from);

        Ok(BotInfo { name, username })
    }

    /// Register bot commands with Telegram for autocomplete.
    pub async fn register_commands(&self) -> Result<()> {
        let commands = serde_json::json!({
            "commands": [
                {"command": "start", "description": "Plan a new weekly menu"},
                {"command": "menu", "description": "Show your current menu"},
                {"command": "prefs", "description": "Show your preferences"},
                {"command": "exclude", "description": "Exclude foods from your menu"},
                {"command": "help", "description": "Show available commands"},
            ]
        });

        self.call("setMyCommands", &commands, Duration::from_secs(10))
            .await
            .map(|_| ())
    }

    /// Acknowledge a button press.
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let body = serde_json::json!({ "callback_query_id": callback_query_id });
        self.call("answerCallbackQuery", &body, Duration::from_secs(10))
            .await
            .map(|_| ())
    }

    /// Point Telegram at our webhook.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({
            "url": url,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = Value::String(secret.to_string());
        }

        self.call("setWebhook", &body, Duration::from_secs(10))
            .await
            .map(|_| ())
    }

    /// Remove any webhook so `getUpdates` works.
    pub async fn delete_webhook(&self) -> Result<()> {
        self.call("deleteWebhook", &serde_json::json!({}), Duration::from_secs(10))
            .await
            .map(|_| ())
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Value>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });

        // Leave headroom over the server-side long-poll timeout
        let result = self
            .call("getUpdates", &body, Duration::from_secs(timeout_secs + 10))
            .await?;

        match result {
            Value::Array(updates) => Ok(updates),
            _ => anyhow::bail!("getUpdates returned a non-array result"),
        }
    }
}

/// Offset to request after a batch of updates.
#[must_use]
pub fn next_offset(updates: &[Value], current: i64) -> i64 {
    updates
        .iter()
        .filter_map(|u| u.get("update_id").and_then(Value::as_i64))
        .map(|id| id + 1)
        .fold(current, i64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold() {
        assert_eq!(to_telegram_html("**bold**"), "<b>bold</b>");
    }

    #[test]
    fn test_unclosed_bold_is_literal() {
        assert_eq!(to_telegram_html("**half"), "**half");
    }

    #[test]
    fn test_single_star_is_literal() {
        assert_eq!(to_telegram_html("Salad *special*"), "Salad *special*");
    }

    #[test]
    fn test_list_items() {
        assert_eq!(to_telegram_html("- item"), "• item");
        assert_eq!(to_telegram_html("text\n- item"), "text\n• item");
        assert_eq!(to_telegram_html("stir-fry - spicy"), "stir-fry - spicy");
    }

    #[test]
    fn test_escapes_html() {
        assert_eq!(to_telegram_html("<script>"), "&lt;script&gt;");
        assert_eq!(to_telegram_html("Mac & cheese"), "Mac &amp; cheese");
    }

    #[test]
    fn test_next_offset() {
        let updates = vec![
            serde_json::json!({"update_id": 10}),
            serde_json::json!({"update_id": 12}),
            serde_json::json!({"no_id": true}),
        ];
        assert_eq!(next_offset(&updates, 0), 13);
        assert_eq!(next_offset(&[], 5), 5);
    }
}
