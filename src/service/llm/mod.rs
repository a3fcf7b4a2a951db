pub mod openai;

use crate::base::types::{InventoryEntry, ParsedTransaction, Res};
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the extraction and summary capabilities the bot relies
/// on. Implementing this trait allows different LLM providers to be used with
/// the ledger-bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Extract structured sales and expenses from a free-form message.
    ///
    /// Messages are usually dictated in Spanish; the extraction prompt
    /// carries the trigger-word rules and the output schema.
    async fn interpret_transaction(&self, message: &str, model: &str) -> Res<ParsedTransaction>;

    /// Extract inventory entries from a bulk `inventario:` or `perdida:` message.
    async fn interpret_inventory(&self, message: &str, model: &str) -> Res<Vec<InventoryEntry>>;

    /// Produce a short Spanish confirmation summary of an extracted transaction.
    async fn summarize_transaction(&self, parsed: &ParsedTransaction, original_message: &str, model: &str) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
