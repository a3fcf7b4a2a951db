//! Library root for `ledger-bot`.
//!
//! Ledger-bot is an OpenAI-powered bookkeeping assistant for a flower shop,
//! operated entirely over Telegram:
//! - Extracts sales and expenses from free-form Spanish messages
//! - Persists every movement to an append-only BigQuery ledger
//! - Tracks flower inventory, synonyms, and losses
//! - Produces end-of-day cash closure reports
//!
//! The bot integrates with Telegram for chat, BigQuery for the ledger,
//! SurrealDB for operational state, and OpenAI for extraction. The
//! architecture is built around extensible traits that allow for different
//! implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the ledger-bot runtime:
/// - Creates the runtime context with store, warehouse, LLM, and chat clients
/// - Starts the webhook server that processes incoming updates
pub async fn start(config: Config) -> Void {
    info!("Starting ledger-bot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
