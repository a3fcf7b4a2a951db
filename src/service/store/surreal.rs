//! SurrealDB implementation of the operational store.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tracing::{info, instrument};

use crate::base::{
    config::Config,
    types::{InventoryEntry, InventoryIssue, Res, Void, now_local_iso},
};

use super::{BotSettings, GenericStoreClient, InventoryLossRecord, StoreClient};

// Extra methods on `StoreClient` applied by the surreal implementation.

impl StoreClient {
    /// Connect to the configured SurrealDB endpoint.
    pub async fn surreal(config: &Config) -> Res<Self> {
        let client = SurrealStoreClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }

    /// An in-memory store, used by tests.
    pub async fn surreal_memory() -> Res<Self> {
        let client = SurrealStoreClient::memory().await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Record types.

/// An authorized user record.
#[derive(Debug, Serialize, Deserialize)]
struct AllowedUser {
    user_id: i64,
}

/// The settings singleton record, keyed as `settings:bot`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSettings {
    #[serde(default)]
    gpt_model: Option<String>,
    #[serde(default)]
    live_notifications: bool,
    #[serde(default)]
    developer_id: Option<i64>,
    #[serde(default)]
    owner_id: Option<i64>,
}

/// Deduplication marker for a processed Telegram update.
#[derive(Debug, Serialize, Deserialize)]
struct ProcessedUpdate {
    update_id: i64,
    processed_at: String,
}

/// Stock for one `(item, quality)` pair, keyed as `inventory:{item}_{quality}`.
#[derive(Debug, Serialize, Deserialize)]
struct InventoryRecord {
    item: String,
    quality: String,
    quantity: i64,
}

/// Alias mapping onto a canonical item.
#[derive(Debug, Serialize, Deserialize)]
struct SynonymRecord {
    alias: String,
    item: String,
    #[serde(default)]
    quality: Option<String>,
}

/// SurrealDB store client implementation.
#[derive(Clone)]
pub struct SurrealStoreClient {
    db: Surreal<Any>,
}

impl SurrealStoreClient {
    /// Create a new store client against the configured endpoint.
    #[instrument(name = "SurrealStoreClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        let db = connect(&config.db_endpoint).await?;

        // The in-memory engine has no authentication layer.
        if !config.db_endpoint.starts_with("mem:") {
            db.signin(Root {
                username: &config.db_username,
                password: &config.db_password,
            })
            .await?;
        }

        db.use_ns("ledger").use_db("bot").await?;

        info!("Store initialized successfully.");

        Ok(Self { db })
    }

    /// Create an in-memory store client.
    pub async fn memory() -> Res<Self> {
        let db = connect("mem://").await?;
        db.use_ns("ledger").use_db("bot").await?;

        Ok(Self { db })
    }

    fn inventory_key(item: &str, quality: &str) -> String {
        format!("{item}_{quality}")
    }

    async fn get_inventory(&self, item: &str, quality: &str) -> Res<Option<InventoryRecord>> {
        let record: Option<InventoryRecord> = self.db.select(("inventory", Self::inventory_key(item, quality))).await?;
        Ok(record)
    }

    async fn set_inventory(&self, item: &str, quality: &str, quantity: i64) -> Void {
        let record = InventoryRecord {
            item: item.to_string(),
            quality: quality.to_string(),
            quantity,
        };

        let _: Option<InventoryRecord> = self.db.upsert(("inventory", Self::inventory_key(item, quality))).content(record).await?;

        Ok(())
    }
}

#[async_trait]
impl GenericStoreClient for SurrealStoreClient {
    #[instrument(skip(self))]
    async fn load_allowed_user_ids(&self) -> Res<HashSet<i64>> {
        let users: Vec<AllowedUser> = self.db.select("allowed_user").await?;
        Ok(users.into_iter().map(|u| u.user_id).collect())
    }

    #[instrument(skip(self))]
    async fn load_owner_id(&self) -> Res<i64> {
        let settings: Option<StoredSettings> = self.db.select(("settings", "bot")).await?;

        settings
            .and_then(|s| s.owner_id)
            .ok_or_else(|| anyhow::anyhow!("Owner id not configured in the store."))
    }

    #[instrument(skip(self))]
    async fn load_bot_settings(&self) -> Res<BotSettings> {
        let settings: Option<StoredSettings> = self.db.select(("settings", "bot")).await?;
        let settings = settings.ok_or_else(|| anyhow::anyhow!("Settings record not found in the store."))?;

        Ok(BotSettings {
            gpt_model: settings.gpt_model,
            live_notifications: settings.live_notifications,
            developer_id: settings.developer_id,
        })
    }

    #[instrument(skip(self))]
    async fn is_duplicate_update(&self, update_id: i64) -> Res<bool> {
        let marker: Option<ProcessedUpdate> = self.db.select(("processed_update", update_id.to_string())).await?;
        Ok(marker.is_some())
    }

    #[instrument(skip(self))]
    async fn mark_update_processed(&self, update_id: i64) -> Void {
        let marker = ProcessedUpdate {
            update_id,
            processed_at: now_local_iso(),
        };

        let _: Option<ProcessedUpdate> = self.db.upsert(("processed_update", update_id.to_string())).content(marker).await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn resolve_synonym(&self, item: &str, quality: &str) -> Res<(String, String)> {
        let mut response = self
            .db
            .query("SELECT * FROM inventory_synonym WHERE string::lowercase(alias) = $alias")
            .bind(("alias", item.to_lowercase()))
            .await?;

        let synonyms: Vec<SynonymRecord> = response.take(0)?;

        match synonyms.into_iter().next() {
            Some(synonym) => Ok((synonym.item, synonym.quality.unwrap_or_else(|| quality.to_string()))),
            None => Ok((item.to_string(), quality.to_string())),
        }
    }

    #[instrument(skip(self, entries))]
    async fn deduct_inventory(&self, entries: &[InventoryEntry], transaction_id: &str) -> Res<Vec<InventoryIssue>> {
        let mut issues = Vec::new();

        for entry in entries {
            let (item, quality) = self.resolve_synonym(&entry.item, &entry.quality).await?;
            let requested = entry.quantity;

            let Some(record) = self.get_inventory(&item, &quality).await? else {
                issues.push(InventoryIssue {
                    timestamp: now_local_iso(),
                    transaction_id: transaction_id.to_string(),
                    item,
                    quality,
                    requested_qty: requested,
                    reason: "no existe en inventario".to_string(),
                });
                continue;
            };

            if record.quantity < requested {
                issues.push(InventoryIssue {
                    timestamp: now_local_iso(),
                    transaction_id: transaction_id.to_string(),
                    item: item.clone(),
                    quality: quality.clone(),
                    requested_qty: requested,
                    reason: "no hay suficiente inventario".to_string(),
                });
            }

            // Deduct what we can; stock never goes negative.
            self.set_inventory(&item, &quality, (record.quantity - requested).max(0)).await?;
        }

        for issue in &issues {
            let _: Option<InventoryIssue> = self.db.create("inventory_issue").content(issue.clone()).await?;
        }

        Ok(issues)
    }

    #[instrument(skip(self, entry))]
    async fn update_inventory(&self, entry: &InventoryEntry) -> Void {
        let (item, quality) = self.resolve_synonym(&entry.item, &entry.quality).await?;
        self.set_inventory(&item, &quality, entry.quantity).await
    }

    #[instrument(skip(self, entry))]
    async fn restore_inventory(&self, entry: &InventoryEntry) -> Void {
        let (item, quality) = self.resolve_synonym(&entry.item, &entry.quality).await?;

        match self.get_inventory(&item, &quality).await? {
            Some(record) => self.set_inventory(&item, &quality, (record.quantity + entry.quantity).max(0)).await,
            None => self.set_inventory(&item, &quality, entry.quantity).await,
        }
    }

    #[instrument(skip_all)]
    async fn log_inventory_loss(&self, loss: &InventoryLossRecord) -> Void {
        let _: Option<InventoryLossRecord> = self.db.create("inventory_loss").content(loss.clone()).await?;
        Ok(())
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(item: &str, quality: &str, quantity: i64) -> InventoryEntry {
        InventoryEntry {
            item: item.to_string(),
            quality: quality.to_string(),
            quantity,
        }
    }

    async fn seed_settings(client: &SurrealStoreClient, settings: StoredSettings) {
        let _: Option<StoredSettings> = client.db.upsert(("settings", "bot")).content(settings).await.unwrap();
    }

    #[tokio::test]
    async fn update_deduplication_round_trips() {
        let client = SurrealStoreClient::memory().await.unwrap();

        assert!(!client.is_duplicate_update(42).await.unwrap());
        client.mark_update_processed(42).await.unwrap();
        assert!(client.is_duplicate_update(42).await.unwrap());
        assert!(!client.is_duplicate_update(43).await.unwrap());
    }

    #[tokio::test]
    async fn allowed_users_start_empty_and_accumulate() {
        let client = SurrealStoreClient::memory().await.unwrap();

        assert!(client.load_allowed_user_ids().await.unwrap().is_empty());

        let _: Option<AllowedUser> = client.db.create("allowed_user").content(AllowedUser { user_id: 111 }).await.unwrap();
        let _: Option<AllowedUser> = client.db.create("allowed_user").content(AllowedUser { user_id: 222 }).await.unwrap();

        let users = client.load_allowed_user_ids().await.unwrap();
        assert!(users.contains(&111) && users.contains(&222));
    }

    #[tokio::test]
    async fn settings_record_is_required() {
        let client = SurrealStoreClient::memory().await.unwrap();

        assert!(client.load_bot_settings().await.is_err());
        assert!(client.load_owner_id().await.is_err());

        seed_settings(
            &client,
            StoredSettings {
                gpt_model: Some("gpt-4.1".to_string()),
                live_notifications: true,
                developer_id: Some(7),
                owner_id: Some(9),
            },
        )
        .await;

        let settings = client.load_bot_settings().await.unwrap();
        assert_eq!(settings.gpt_model.as_deref(), Some("gpt-4.1"));
        assert!(settings.live_notifications);
        assert_eq!(client.load_owner_id().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn deduct_floors_at_zero_and_records_issues() {
        let client = SurrealStoreClient::memory().await.unwrap();

        client.update_inventory(&entry("rosa", "regular", 10)).await.unwrap();

        // More than in stock: issue recorded, stock floors at zero.
        let issues = client.deduct_inventory(&[entry("rosa", "regular", 12)], "tx-1").await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].reason, "no hay suficiente inventario");
        assert_eq!(client.get_inventory("rosa", "regular").await.unwrap().unwrap().quantity, 0);

        // Unknown item: issue recorded, nothing created.
        let issues = client.deduct_inventory(&[entry("girasol", "regular", 1)], "tx-2").await.unwrap();
        assert_eq!(issues[0].reason, "no existe en inventario");
        assert!(client.get_inventory("girasol", "regular").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deduct_and_restore_round_trip() {
        let client = SurrealStoreClient::memory().await.unwrap();

        client.update_inventory(&entry("rosa", "premium", 24)).await.unwrap();

        let issues = client.deduct_inventory(&[entry("rosa", "premium", 12)], "tx-1").await.unwrap();
        assert!(issues.is_empty());
        assert_eq!(client.get_inventory("rosa", "premium").await.unwrap().unwrap().quantity, 12);

        client.restore_inventory(&entry("rosa", "premium", 12)).await.unwrap();
        assert_eq!(client.get_inventory("rosa", "premium").await.unwrap().unwrap().quantity, 24);

        // Restoring an unknown item creates it.
        client.restore_inventory(&entry("tulipan", "regular", 5)).await.unwrap();
        assert_eq!(client.get_inventory("tulipan", "regular").await.unwrap().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn synonyms_resolve_case_insensitively() {
        let client = SurrealStoreClient::memory().await.unwrap();

        let _: Option<SynonymRecord> = client
            .db
            .create("inventory_synonym")
            .content(SynonymRecord {
                alias: "Rosas".to_string(),
                item: "rosa".to_string(),
                quality: Some("regular".to_string()),
            })
            .await
            .unwrap();

        let (item, quality) = client.resolve_synonym("ROSAS", "premium").await.unwrap();
        assert_eq!(item, "rosa");
        assert_eq!(quality, "regular");

        // Unknown aliases resolve to themselves with the caller's quality.
        let (item, quality) = client.resolve_synonym("girasol", "premium").await.unwrap();
        assert_eq!(item, "girasol");
        assert_eq!(quality, "premium");
    }
}
