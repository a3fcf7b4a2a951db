//! Chat service integration for the ledger-bot.
//!
//! This module provides the Telegram implementation of the chat service:
//! - A webhook HTTP server that receives `Update` payloads
//! - Outgoing Bot API calls (`getMe`, `setWebhook`, `sendMessage`)
//! - Update deduplication before dispatching to the interaction layer

use std::sync::Arc;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    interaction,
    service::{llm::LlmClient, store::StoreClient, warehouse::WarehouseClient},
};
use async_trait::async_trait;
use axum::{
    Router,
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::{ChatClient, GenericChatClient};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

// Wire types for the subset of the Bot API the bot consumes.

/// An incoming Telegram update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// An incoming Telegram message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

/// A Telegram user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// The user's display name, matching Telegram's "full name" notion.
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// A Telegram chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Envelope every Bot API response is wrapped in.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<T>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

// Extra methods on `ChatClient` applied by the telegram implementation.

impl ChatClient {
    /// Creates a new Telegram chat client.
    pub async fn telegram(config: &Config, store: StoreClient, warehouse: WarehouseClient, llm: LlmClient) -> Res<Self> {
        let client = TelegramChatClient::new(config, store, warehouse, llm).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<TelegramChatClient> for ChatClient {
    fn from(client: TelegramChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// Shared state for the webhook server.
struct TelegramServerState {
    config: Config,
    store: StoreClient,
    warehouse: WarehouseClient,
    llm: LlmClient,
    chat: ChatClient,
}

/// Telegram client implementation.
#[derive(Clone)]
pub struct TelegramChatClient {
    config: Config,
    http: reqwest::Client,
    api_base: String,
    store: StoreClient,
    warehouse: WarehouseClient,
    llm: LlmClient,
}

impl TelegramChatClient {
    /// Create a new Telegram chat client.
    #[instrument(name = "TelegramChatClient::new", skip_all)]
    pub async fn new(config: &Config, store: StoreClient, warehouse: WarehouseClient, llm: LlmClient) -> Res<Self> {
        let client = Self {
            config: config.clone(),
            http: reqwest::Client::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
            store,
            warehouse,
            llm,
        };

        // `getMe` validates the token before the server comes up.
        let me: User = client.call("getMe", &serde_json::json!({})).await?;
        info!("Telegram bot user ID: {}", me.id);

        Ok(client)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.config.telegram_token, method)
    }

    /// Call a Bot API method and unwrap the response envelope.
    async fn call<B, T>(&self, method: &str, body: &B) -> Res<T>
    where
        B: Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let response: ApiResponse<T> = self.http.post(self.method_url(method)).json(body).send().await?.json().await?;

        if !response.ok {
            return Err(anyhow::anyhow!("Telegram `{method}` failed: {}", response.description.unwrap_or_default()));
        }

        response.result.ok_or_else(|| anyhow::anyhow!("Telegram `{method}` returned no result"))
    }
}

#[async_trait]
impl GenericChatClient for TelegramChatClient {
    async fn start(&self) -> Void {
        let state = Arc::new(TelegramServerState {
            config: self.config.clone(),
            store: self.store.clone(),
            warehouse: self.warehouse.clone(),
            llm: self.llm.clone(),
            chat: ChatClient::from(self.clone()),
        });

        let app = Router::new().route("/telegram_bot", get(register_webhook).post(receive_update)).with_state(state);

        let listener = tokio::net::TcpListener::bind(&self.config.listen_addr).await?;
        info!("Webhook server listening on {}", self.config.listen_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_webhook(&self, url: &str) -> Void {
        let _: bool = self.call("setWebhook", &serde_json::json!({ "url": url })).await?;
        info!("Webhook registered at {}", url);

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, chat_id: i64, text: &str) -> Void {
        let request = SendMessageRequest { chat_id, text, parse_mode: None };
        let _: Message = self.call("sendMessage", &request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {e}"))?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_markdown(&self, chat_id: i64, text: &str) -> Void {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: Some("MarkdownV2"),
        };
        let _: Message = self.call("sendMessage", &request).await.map_err(|e| anyhow::anyhow!("Failed to send markdown message: {e}"))?;

        Ok(())
    }
}

// Webhook handlers.

/// Registers the Telegram webhook for the serving host.
async fn register_webhook(State(state): State<Arc<TelegramServerState>>, headers: HeaderMap) -> &'static str {
    let host = state
        .config
        .public_host
        .clone()
        .or_else(|| headers.get("host").and_then(|h| h.to_str().ok()).map(str::to_string));

    let Some(host) = host else {
        error!("No public host configured and no Host header present.");
        return "Failed to set webhook";
    };

    match state.chat.set_webhook(&format!("https://{host}/telegram_bot")).await {
        Ok(()) => "Webhook set",
        Err(err) => {
            error!("Failed to set webhook: {err}");
            "Failed to set webhook"
        }
    }
}

/// Receives one update, deduplicates it, and dispatches it for processing.
///
/// A 2xx acknowledges the delivery to Telegram, so store failures must answer
/// with a 5xx: Telegram then redelivers the update instead of dropping it.
#[instrument(skip_all)]
async fn receive_update(State(state): State<Arc<TelegramServerState>>, Json(update): Json<Update>) -> (StatusCode, &'static str) {
    let update_id = update.update_id;

    match state.store.is_duplicate_update(update_id).await {
        Ok(true) => {
            warn!("Duplicate update received: {update_id}");
            return (StatusCode::OK, "ok");
        }
        Ok(false) => {}
        Err(err) => {
            error!("Failed to check update {update_id} for duplication: {err}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "error");
        }
    }

    if let Err(err) = state.store.mark_update_processed(update_id).await {
        error!("Failed to mark update {update_id} as processed: {err}");
        return (StatusCode::INTERNAL_SERVER_ERROR, "error");
    }

    interaction::update::handle_update(
        update,
        state.config.clone(),
        state.store.clone(),
        state.warehouse.clone(),
        state.llm.clone(),
        state.chat.clone(),
    );

    (StatusCode::OK, "ok")
}

// Tests.
