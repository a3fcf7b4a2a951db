pub mod telegram;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::Void;

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Telegram. Implementing this trait allows different chat services to be
/// used with the ledger-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Start the chat client listener.
    ///
    /// This brings up the webhook endpoint and begins processing incoming updates.
    async fn start(&self) -> Void;

    /// Register the webhook URL with the chat platform.
    async fn set_webhook(&self, url: &str) -> Void;

    /// Send a plain-text message to a chat.
    async fn send_message(&self, chat_id: i64, text: &str) -> Void;

    /// Send a MarkdownV2-formatted message to a chat.
    ///
    /// Used for monospaced transaction ids so users can copy them.
    async fn send_markdown(&self, chat_id: i64, text: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
