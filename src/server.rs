//! Update intake: the webhook endpoint and the long-polling loop.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedSender, error::SendError};

use crate::config::WebhookConfig;
use crate::dispatch::{Dispatcher, Inbound};
use crate::telegram::{TelegramApi, next_offset};

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Long-poll timeout passed to `getUpdates`.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed `getUpdates` call.
const POLL_ERROR_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct WebhookState {
    dispatcher: Arc<Dispatcher>,
    secret: Option<String>,
}

/// Build the webhook router: `POST /{path}` and `GET /health`.
pub fn router(dispatcher: Arc<Dispatcher>, path: &str, secret: Option<String>) -> Router {
    let state = WebhookState { dispatcher, secret };

    Router::new()
        .route(&format!("/{}", path.trim_matches('/')), post(webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// Whether the request carries the configured secret. No secret configured
/// accepts everything.
fn secret_matches(expected: Option<&str>, headers: &HeaderMap) -> bool {
    expected.is_none_or(|secret| {
        headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|got| got == secret)
    })
}

async fn webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if !secret_matches(state.secret.as_deref(), &headers) {
        tracing::warn!("Rejected webhook call with a bad secret token");
        return (StatusCode::UNAUTHORIZED, Json(json!({"ok": false})));
    }

    // Telegram redelivers on non-200, so malformed bodies are acknowledged too
    match serde_json::from_slice::<Value>(&body) {
        Ok(update) => state.dispatcher.dispatch(&update).await,
        Err(e) => tracing::warn!("Malformed webhook payload: {e}"),
    }

    (StatusCode::OK, Json(json!({"ok": true})))
}

async fn health() -> &'static str {
    "ok"
}

/// Run the webhook server until Ctrl-C.
pub async fn serve(dispatcher: Arc<Dispatcher>, config: &WebhookConfig) -> Result<()> {
    let app = router(dispatcher, &config.path, config.secret_token.clone());

    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    tracing::info!("Webhook server listening on {}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down webhook server");
        })
        .await
        .context("Webhook server failed")
}

/// Long-poll Telegram until Ctrl-C.
pub async fn poll(dispatcher: Arc<Dispatcher>, api: &TelegramApi) -> Result<()> {
    api.delete_webhook()
        .await
        .context("Failed to remove webhook before polling")?;

    let mut queues = ChatQueues::new(dispatcher);
    let mut offset = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping poller");
                return Ok(());
            }
            result = api.get_updates(offset, POLL_TIMEOUT_SECS) => match result {
                Ok(updates) => {
                    offset = next_offset(&updates, offset);
                    for update in updates {
                        queues.push(update);
                    }
                }
                Err(e) => {
                    tracing::warn!("getUpdates failed: {e:?}");
                    tokio::time::sleep(POLL_ERROR_DELAY).await;
                }
            }
        }
    }
}

/// One worker task per chat, fed in arrival order.
///
/// A slow menu generation holds up later updates for its own chat only.
struct ChatQueues {
    dispatcher: Arc<Dispatcher>,
    workers: HashMap<i64, UnboundedSender<Value>>,
}

impl ChatQueues {
    fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            workers: HashMap::new(),
        }
    }

    fn push(&mut self, update: Value) {
        let Some(chat_id) = Inbound::classify(&update).chat_id() else {
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(&update).await });
            return;
        };

        let update = match self.workers.get(&chat_id) {
            Some(worker) => match worker.send(update) {
                Ok(()) => return,
                Err(SendError(update)) => update,
            },
            None => update,
        };

        let (worker, mut queue) = mpsc::unbounded_channel::<Value>();
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::spawn(async move {
            while let Some(update) = queue.recv().await {
                dispatcher.dispatch(&update).await;
            }
        });

        if worker.send(update).is_ok() {
            self.workers.insert(chat_id, worker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::RecordingMessenger;
    use crate::dialogue::{Dialogue, Step};
    use crate::menu::{MenuOrError, fixtures::week};
    use crate::provider::testing::StubProvider;
    use crate::store::StateStore;
    use axum::http::HeaderValue;

    /// Start a server on a random port.
    async fn start_server(secret: Option<&str>) -> (String, Arc<StateStore>) {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        let messenger = Arc::new(RecordingMessenger::default());
        let provider = Arc::new(StubProvider::new(vec![MenuOrError::Menu(week())]));
        let dialogue = Dialogue::new(store.clone(), provider, messenger.clone(), "₽");
        let dispatcher = Arc::new(Dispatcher::new(dialogue, messenger, Vec::new()));
        let app = router(dispatcher, "telegram", secret.map(String::from));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://127.0.0.1:{port}"), store)
    }

    fn start_update(chat_id: i64) -> Value {
        json!({
            "update_id": 1,
            "message": {"message_id": 1, "chat": {"id": chat_id}, "text": "/start"}
        })
    }

    #[test]
    fn secret_check() {
        let mut headers = HeaderMap::new();
        assert!(secret_matches(None, &headers));
        assert!(!secret_matches(Some("s3cret"), &headers));

        headers.insert(SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(!secret_matches(Some("s3cret"), &headers));

        headers.insert(SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(secret_matches(Some("s3cret"), &headers));
    }

    #[tokio::test]
    async fn webhook_dispatches_and_acknowledges() {
        let (base, store) = start_server(None).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/telegram"))
            .json(&start_update(9))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"ok": true}));
        assert_eq!(store.load(9).unwrap().unwrap().step, Step::CollectingDiet);
    }

    #[tokio::test]
    async fn malformed_payloads_still_get_ok() {
        let (base, store) = start_server(None).await;
        let client = reqwest::Client::new();

        for body in ["not json", "{}", r#"{"message": {"chat": {}}}"#] {
            let response = client
                .post(format!("{base}/telegram"))
                .body(body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK, "{body}");
        }
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn wrong_secret_is_unauthorized() {
        let (base, store) = start_server(Some("s3cret")).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/telegram"))
            .header(SECRET_HEADER, "guess")
            .json(&start_update(9))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(store.count().unwrap(), 0);

        let response = client
            .post(format!("{base}/telegram"))
            .header(SECRET_HEADER, "s3cret")
            .json(&start_update(9))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(store.count().unwrap(), 1);
    }

    fn press(chat_id: i64, data: &str) -> Value {
        json!({
            "update_id": 2,
            "callback_query": {
                "id": "cb",
                "message": {"message_id": 1, "chat": {"id": chat_id}},
                "data": data,
            }
        })
    }

    #[tokio::test]
    async fn queued_updates_keep_arrival_order_per_chat() {
        let store = Arc::new(StateStore::open_in_memory().unwrap());
        let messenger = Arc::new(RecordingMessenger::default());
        let provider = Arc::new(StubProvider::new(vec![MenuOrError::Menu(week())]));
        let dialogue = Dialogue::new(store.clone(), provider, messenger.clone(), "₽");
        let dispatcher = Arc::new(Dispatcher::new(dialogue, messenger, Vec::new()));
        let mut queues = ChatQueues::new(dispatcher);

        queues.push(start_update(9));
        queues.push(press(9, "diet_vegan"));
        queues.push(press(9, "diet_done"));
        queues.push(press(9, "allergen_nuts"));
        queues.push(json!({"update_id": 3}));
        assert_eq!(queues.workers.len(), 1);

        let state = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(state) = store.load(9).unwrap()
                    && !state.preferences.allergens.is_empty()
                {
                    return state;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(state.step, Step::CollectingAllergens);
        assert_eq!(state.preferences.diet.len(), 1);
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (base, _store) = start_server(None).await;
        let body = reqwest::get(format!("{base}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }
}
