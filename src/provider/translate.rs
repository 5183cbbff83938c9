//! Best-effort translation of dish names.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

const TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Translates short English texts. Failures return the input unchanged.
#[derive(Clone)]
pub struct Translator {
    client: reqwest::Client,
    target: String,
}

impl Translator {
    #[must_use]
    pub fn new(client: reqwest::Client, target: &str) -> Self {
        Self {
            client,
            target: target.to_string(),
        }
    }

    pub async fn translate(&self, text: &str) -> String {
        match self.request(text).await {
            Ok(Some(translated)) => translated,
            Ok(None) => text.to_string(),
            Err(e) => {
                tracing::warn!("Translation of '{text}' failed: {e}");
                text.to_string()
            }
        }
    }

    async fn request(&self, text: &str) -> Result<Option<String>> {
        let url = format!(
            "{TRANSLATE_URL}?client=gtx&sl=en&tl={}&dt=t&q={}",
            urlencoding::encode(&self.target),
            urlencoding::encode(text)
        );

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Failed to reach translation service")?;

        if !response.status().is_success() {
            anyhow::bail!("Translation service returned {}", response.status());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse translation response")?;

        Ok(extract_translation(&body))
    }
}

/// The response is nested arrays: `[[["translated", "original", ...], ...], ...]`.
/// Long inputs come back in several segments that are joined in order.
fn extract_translation(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let text: String = segments
        .iter()
        .filter_map(|s| s.get(0).and_then(Value::as_str))
        .collect();

    (!text.trim().is_empty()).then_some(text)
}
