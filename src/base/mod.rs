//! Core components, types, and utilities for the ledger-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - System prompts for the LLM extraction and summary agents.
//! - Common types and result handling.

pub mod config;
pub mod prompts;
pub mod types;
