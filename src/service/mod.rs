//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for various services used by the ledger-bot:
//! - Chat services (e.g., Telegram)
//! - LLM services (e.g., OpenAI)
//! - Analytics warehouse services (e.g., BigQuery)
//! - Operational store services (e.g., SurrealDB)
//!
//! Each service module defines both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod llm;
pub mod store;
pub mod warehouse;
