pub mod surreal;

use std::{collections::HashSet, ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::base::types::{InventoryEntry, InventoryIssue, Res, Void};

// Data types owned by the store.

/// Operator-managed bot settings, kept in the store so they can be changed
/// without a redeploy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotSettings {
    /// Override for the LLM model name.
    #[serde(default)]
    pub gpt_model: Option<String>,
    /// Whether the owner receives a notification for every operation.
    #[serde(default)]
    pub live_notifications: bool,
    /// Telegram id that receives error reports.
    #[serde(default)]
    pub developer_id: Option<i64>,
}

/// A recorded inventory loss (`perdida:` command).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLossRecord {
    pub timestamp: String,
    pub user_id: i64,
    pub user_name: String,
    pub chat_id: i64,
    pub item: String,
    pub quality: String,
    pub quantity: i64,
    pub original_message: String,
}

// Traits.

/// Generic operational store trait that clients must implement.
///
/// The store holds everything the bot needs besides the ledger itself:
/// authorized users, settings, webhook deduplication state, and the
/// inventory with its synonym table.
#[async_trait]
pub trait GenericStoreClient: Send + Sync + 'static {
    /// The set of Telegram user ids allowed to operate the bot.
    async fn load_allowed_user_ids(&self) -> Res<HashSet<i64>>;

    /// The Telegram id of the shop owner, recipient of live notifications.
    async fn load_owner_id(&self) -> Res<i64>;

    /// The operator-managed bot settings.
    async fn load_bot_settings(&self) -> Res<BotSettings>;

    /// Whether this update id has already been processed.
    async fn is_duplicate_update(&self, update_id: i64) -> Res<bool>;

    /// Record an update id so redelivered webhooks are dropped.
    async fn mark_update_processed(&self, update_id: i64) -> Void;

    /// Resolve an item alias to its canonical `(item, quality)` pair.
    ///
    /// Unknown aliases resolve to themselves.
    async fn resolve_synonym(&self, item: &str, quality: &str) -> Res<(String, String)>;

    /// Deduct sold quantities from the inventory.
    ///
    /// Unknown items and insufficient stock are recorded as issues and
    /// returned; stock never goes below zero. Issues are also persisted.
    async fn deduct_inventory(&self, entries: &[InventoryEntry], transaction_id: &str) -> Res<Vec<InventoryIssue>>;

    /// Set the stock for an item to an absolute quantity.
    async fn update_inventory(&self, entry: &InventoryEntry) -> Void;

    /// Add stock back for an item, creating it when unknown.
    async fn restore_inventory(&self, entry: &InventoryEntry) -> Void;

    /// Persist a loss record for auditability.
    async fn log_inventory_loss(&self, loss: &InventoryLossRecord) -> Void;
}

// Structs.

/// Store client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct StoreClient {
    inner: Arc<dyn GenericStoreClient>,
}

impl Deref for StoreClient {
    type Target = dyn GenericStoreClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl StoreClient {
    pub fn new(inner: Arc<dyn GenericStoreClient>) -> Self {
        Self { inner }
    }
}
