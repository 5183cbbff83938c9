//! Menu generation through an `OpenAI`-compatible chat completion API.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::menu::{MenuOrError, WEEKDAYS, parse_payload};
use crate::preferences::{Allergen, Diet, Preferences};

use super::MenuProvider;

const SYSTEM_PROMPT: &str = "You are an expert dietitian. Strictly honor every food exclusion. \
     Reply with valid JSON only, without any extra text.";

#[derive(Clone)]
pub struct LlmProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl LlmProvider {
    /// Create a provider from config.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    async fn request(&self, preferences: &Preferences) -> Result<MenuOrError> {
        let prompt = build_prompt(preferences);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to connect to the menu service")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
                anyhow::bail!("Menu service error: {}", api_error.error.message);
            }
            anyhow::bail!("Menu service error ({status})");
        }

        parse_completion(&body)
    }
}

/// Pull the menu JSON out of a chat completion body.
fn parse_completion(body: &str) -> Result<MenuOrError> {
    let completion: ChatResponse =
        serde_json::from_str(body).context("Failed to parse completion response")?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("Completion has no content")?;

    let payload: serde_json::Value =
        serde_json::from_str(strip_code_fence(&content)).context("Menu is not valid JSON")?;

    Ok(parse_payload(&payload))
}

/// Some models wrap JSON in a markdown fence despite `json_object` mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map_or(trimmed, str::trim)
}

/// Build the user prompt from preferences.
pub fn build_prompt(preferences: &Preferences) -> String {
    fn join_or<T: std::fmt::Display>(items: impl Iterator<Item = T>, empty: &str) -> String {
        let items: Vec<String> = items.map(|item| item.to_string()).collect();
        if items.is_empty() {
            empty.to_string()
        } else {
            items.join(", ")
        }
    }

    let mut prompt = format!(
        "Plan a weekly menu for {} person(s) for 7 days with these requirements:\n\n",
        preferences.servings
    );

    let _ = writeln!(
        prompt,
        "MANDATORY EXCLUSIONS (NEVER USE THESE FOODS OR DISHES):\n{}\n",
        join_or(preferences.excluded_foods.iter(), "No exclusions")
    );
    let _ = writeln!(
        prompt,
        "Allergens (exclude): {}",
        join_or(preferences.allergens.iter().copied().map(Allergen::tag), "None")
    );
    let _ = writeln!(
        prompt,
        "Diet: {}",
        join_or(preferences.restricted_diets().map(Diet::tag), "Regular")
    );
    let _ = writeln!(prompt, "Weekly budget: {}", preferences.budget);
    let _ = writeln!(
        prompt,
        "Cooking time per dish: {} minutes",
        preferences.cooking_time
    );
    let _ = writeln!(prompt, "Meals per day: {}", preferences.meals_per_day);

    prompt.push_str(
        "\nIMPORTANT: Check that NOT A SINGLE dish contains a product from the exclusion list!\n\n\
         Return JSON in EXACTLY this format:\n\
         {\n  \"menu\": [\n    {\n      \"day\": \"Monday\",\n      \"meals\": {\n        \
         \"breakfast\": {\"name\": \"Name\", \"calories\": 320, \"protein\": 12, \"carbs\": 54, \"fat\": 8, \"cookingTime\": 15, \"cost\": 120},\n        \
         \"lunch\": {\"name\": \"Name\", \"calories\": 520, \"protein\": 42, \"carbs\": 58, \"fat\": 12, \"cookingTime\": 35, \"cost\": 200},\n        \
         \"dinner\": {\"name\": \"Name\", \"calories\": 450, \"protein\": 36, \"carbs\": 42, \"fat\": 16, \"cookingTime\": 45, \"cost\": 300}\n      \
         }\n    }\n  ]\n}\n\n",
    );
    let _ = writeln!(prompt, "Days of the week: {}", WEEKDAYS.join(", "));
    prompt.push_str("Use seasonal produce. Vary the menu. Give realistic prices.");

    prompt
}

#[async_trait]
impl MenuProvider for LlmProvider {
    fn name(&self) -> &str {
        "llm"
    }

    async fn generate(&self, preferences: &Preferences) -> MenuOrError {
        let started = Instant::now();
        let result = self.request(preferences).await;
        tracing::info!(
            "LLM menu request ({}) finished in {:?}",
            self.model,
            started.elapsed()
        );

        result.unwrap_or_else(|e| {
            tracing::error!("Menu generation failed: {e:?}");
            MenuOrError::Error(format!("Could not generate a menu: {e}"))
        })
    }
}
