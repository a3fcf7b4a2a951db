//! Update handling and user interactions for the ledger-bot.
//!
//! This module routes incoming Telegram updates to their handlers:
//! - Access control and audit logging for every operation
//! - Command parsing (delete, edit, closure, inventory, loss)
//! - Free-form transaction capture through the LLM
//! - Owner and developer notifications

pub mod command;
pub mod inventory;
pub mod notify;
pub mod report;
pub mod transaction;
pub mod update;

use crate::{
    base::types::{AuditEntry, InventoryIssue, OperationType, SaleLine, Void, now_local_iso},
    service::{chat::ChatClient, llm::LlmClient, store::BotSettings, store::StoreClient, warehouse::WarehouseClient},
};

/// Everything a handler needs to process one authorized message.
pub struct UpdateContext {
    pub store: StoreClient,
    pub warehouse: WarehouseClient,
    pub llm: LlmClient,
    pub chat: ChatClient,
    pub settings: BotSettings,
    /// The owner's Telegram id, recipient of live notifications.
    pub owner_id: i64,
    /// LLM model for this update: the stored override, or the config default.
    pub model: String,
    pub chat_id: i64,
    pub user_id: i64,
    pub user_name: String,
}

impl UpdateContext {
    /// Append an audit row for the current operation.
    pub async fn audit(&self, operation_type: OperationType, message: &str, user_name: &str, transaction_id: Option<String>) -> Void {
        self.warehouse
            .log_audit(&AuditEntry {
                timestamp: now_local_iso(),
                user_id: self.user_id,
                chat_id: self.chat_id,
                operation_type,
                message_content: message.to_string(),
                user_name: user_name.to_string(),
                transaction_id,
            })
            .await
    }
}

/// One bullet line per inventory issue, for owner notifications.
pub(crate) fn format_issue_list(issues: &[InventoryIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("- {} ({}): {}", issue.item, issue.quality, issue.reason))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert a sale line into the inventory entry it consumes.
pub(crate) fn sale_to_inventory_entry(sale: &SaleLine) -> crate::base::types::InventoryEntry {
    crate::base::types::InventoryEntry {
        item: sale.item.clone(),
        quality: sale.quality.clone(),
        quantity: sale.quantity.unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_list_formats_one_line_per_issue() {
        let issues = vec![
            InventoryIssue {
                timestamp: "t".to_string(),
                transaction_id: "tx".to_string(),
                item: "rosa".to_string(),
                quality: "regular".to_string(),
                requested_qty: 12,
                reason: "no hay suficiente inventario".to_string(),
            },
            InventoryIssue {
                timestamp: "t".to_string(),
                transaction_id: "tx".to_string(),
                item: "girasol".to_string(),
                quality: "premium".to_string(),
                requested_qty: 3,
                reason: "no existe en inventario".to_string(),
            },
        ];

        let formatted = format_issue_list(&issues);
        assert_eq!(formatted, "- rosa (regular): no hay suficiente inventario\n- girasol (premium): no existe en inventario");
    }

    #[test]
    fn sale_without_quantity_consumes_nothing() {
        let sale = SaleLine {
            item: "rosa".to_string(),
            quality: "regular".to_string(),
            quantity: None,
            unit_price: Some(1.5),
        };

        assert_eq!(sale_to_inventory_entry(&sale).quantity, 0);
    }
}
