//! Runtime services and shared state for the ledger-bot.

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{chat::ChatClient, llm::LlmClient, store::StoreClient, warehouse::WarehouseClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the store, warehouse, LLM, and chat clients along with
/// the configuration. It is designed to be trivially cloneable, allowing it
/// to be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The operational store client instance.
    pub store: StoreClient,
    /// The warehouse (ledger) client instance.
    pub warehouse: WarehouseClient,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The Telegram chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the operational store.
        let store = StoreClient::surreal(&config).await?;

        // Initialize the warehouse client.
        let warehouse = WarehouseClient::bigquery(&config);

        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        // Initialize the Telegram client.
        let chat = ChatClient::telegram(&config, store.clone(), warehouse.clone(), llm.clone()).await?;

        Ok(Self {
            config,
            store,
            warehouse,
            llm,
            chat,
        })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}
