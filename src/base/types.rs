//! Common result aliases and the domain types shared across services.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// The crate-wide error type.
pub type Err = anyhow::Error;
/// The crate-wide result type.
pub type Res<T> = Result<T, Err>;
/// A result carrying no value on success.
pub type Void = Res<()>;

/// The shop operates on fixed UTC-6 (America/El_Salvador, no DST).
const LOCAL_UTC_OFFSET_HOURS: i32 = -6;

/// The fixed business timezone offset.
pub fn local_offset() -> FixedOffset {
    FixedOffset::east_opt(LOCAL_UTC_OFFSET_HOURS * 3600).unwrap()
}

/// Current time in the business timezone.
pub fn now_local() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&local_offset())
}

/// Current business date as `YYYY-MM-DD`.
pub fn today_local() -> String {
    now_local().format("%Y-%m-%d").to_string()
}

/// Current business timestamp in ISO 8601.
pub fn now_local_iso() -> String {
    now_local().to_rfc3339()
}

fn default_quality() -> String {
    "regular".to_string()
}

/// Warehouse reads emit every column, so absent values arrive as explicit
/// `null` rather than missing keys. Treat both the same.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn quality_or_regular<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_quality))
}

/// Payment method for a sale, as stored in the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid in cash.
    Cash,
    /// Paid by bank transfer.
    BankTransfer,
}

/// A single sold item extracted from a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    /// The item sold.
    pub item: String,
    /// The quality grade of the item; defaults to `regular`.
    #[serde(default = "default_quality", deserialize_with = "quality_or_regular")]
    pub quality: String,
    /// How many units were sold, when stated.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// The per-unit price, when stated.
    #[serde(default)]
    pub unit_price: Option<f64>,
}

/// A single expense extracted from a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseLine {
    /// What the expense was for.
    pub description: String,
    /// The amount spent.
    pub amount: f64,
}

/// Structured data extracted by the LLM from a free-form message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    /// Total price of the sale, when stated.
    #[serde(default)]
    pub total_sale_price: Option<f64>,
    /// How the sale was paid, when stated.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Items sold in this transaction.
    #[serde(default)]
    pub sales: Vec<SaleLine>,
    /// Expenses recorded in this transaction.
    #[serde(default)]
    pub expenses: Vec<ExpenseLine>,
    /// Name of the person reporting the transaction, when stated.
    #[serde(default)]
    pub sender_name: Option<String>,
}

impl ParsedTransaction {
    /// True when the LLM found neither sales nor expenses.
    pub fn is_empty(&self) -> bool {
        self.sales.is_empty() && self.expenses.is_empty()
    }
}

/// A transaction row as persisted in the warehouse.
///
/// The warehouse is append-only: deletes and edits append shadow rows rather
/// than mutating or removing existing ones. A row is "live" when `operation`
/// is unset and `is_deleted` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    /// Unique identifier of the transaction.
    pub transaction_id: String,
    /// Business date (`YYYY-MM-DD`) in the shop's timezone.
    pub date: String,
    /// Name of the person who reported the transaction, when known.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Total price of the sale, when stated.
    #[serde(default)]
    pub total_sale_price: Option<f64>,
    /// How the sale was paid, when stated.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    /// Items sold in this transaction.
    #[serde(default, deserialize_with = "null_to_default")]
    pub sales: Vec<SaleLine>,
    /// Expenses recorded in this transaction.
    #[serde(default, deserialize_with = "null_to_default")]
    pub expenses: Vec<ExpenseLine>,
    /// Shadow-row marker (e.g. `deleted`); unset for live rows.
    #[serde(default)]
    pub operation: Option<String>,
    /// True for soft-deleted shadow rows.
    #[serde(default, deserialize_with = "null_to_default")]
    pub is_deleted: bool,
}

impl TransactionRow {
    /// Build a live row from LLM output, stamping the id and business date.
    pub fn from_parsed(parsed: ParsedTransaction, transaction_id: String, date: String) -> Self {
        Self {
            transaction_id,
            date,
            sender_name: parsed.sender_name,
            total_sale_price: parsed.total_sale_price,
            payment_method: parsed.payment_method,
            sales: parsed.sales,
            expenses: parsed.expenses,
            operation: None,
            is_deleted: false,
        }
    }

    /// The shadow copy appended when this row is soft-deleted.
    pub fn deleted_shadow(&self) -> Self {
        let mut shadow = self.clone();
        shadow.operation = Some("deleted".to_string());
        shadow.is_deleted = true;
        shadow.date = today_local();
        shadow
    }
}

/// Aggregated figures for the end-of-day cash closure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosureReport {
    /// Total of cash sales for the day.
    #[serde(default)]
    pub efectivo_sales: Option<f64>,
    /// Total of bank-transfer sales for the day.
    #[serde(default)]
    pub transfer_sales: Option<f64>,
    /// Sum of all expense line amounts for the day.
    #[serde(default)]
    pub total_expenses: Option<f64>,
}

impl ClosureReport {
    /// Cash sales for the day, treating a missing figure as zero.
    pub fn cash_sales(&self) -> f64 {
        self.efectivo_sales.unwrap_or(0.0)
    }

    /// Bank-transfer sales for the day, treating a missing figure as zero.
    pub fn transfer(&self) -> f64 {
        self.transfer_sales.unwrap_or(0.0)
    }

    /// Total expenses for the day, treating a missing figure as zero.
    pub fn expenses(&self) -> f64 {
        self.total_expenses.unwrap_or(0.0)
    }

    /// Cash expected in the till: cash sales minus the day's expenses.
    pub fn cash_in_till(&self) -> f64 {
        self.cash_sales() - self.expenses()
    }

    /// True when no figure was recorded for the day.
    pub fn is_empty(&self) -> bool {
        self.efectivo_sales.is_none() && self.transfer_sales.is_none() && self.total_expenses.is_none()
    }
}

/// The operation recorded by an audit log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// A message from a chat that is not authorized to use the bot.
    UnauthorizedAccess,
    /// A new transaction was recorded.
    DataInsert,
    /// A transaction was soft-deleted.
    DeleteTransaction,
    /// A transaction was edited.
    EditTransaction,
    /// An end-of-day cash closure report was produced.
    ClosureReport,
    /// Inventory was replaced via a bulk `inventario:` message.
    BulkInventoryUpdate,
    /// Inventory was reduced via a `perdida:` loss message.
    InventoryLoss,
}

/// A row appended to the warehouse audit log for every bot operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the operation happened, in ISO 8601.
    pub timestamp: String,
    /// Telegram user ID of the actor.
    pub user_id: i64,
    /// Telegram chat ID the message came from.
    pub chat_id: i64,
    /// What kind of operation was performed.
    pub operation_type: OperationType,
    /// The raw message text that triggered the operation.
    pub message_content: String,
    /// Display name of the actor.
    pub user_name: String,
    /// The transaction the operation touched, when applicable.
    #[serde(default)]
    pub transaction_id: Option<String>,
}

/// One inventory line extracted from a bulk `inventario:` or `perdida:` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// The inventory item.
    pub item: String,
    /// The quality grade of the item; defaults to `regular`.
    #[serde(default = "default_quality", deserialize_with = "quality_or_regular")]
    pub quality: String,
    /// Number of units.
    #[serde(default, deserialize_with = "null_to_default")]
    pub quantity: i64,
}

/// A problem encountered while deducting inventory for a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryIssue {
    /// When the issue occurred, in ISO 8601.
    pub timestamp: String,
    /// The sale transaction that triggered the deduction.
    pub transaction_id: String,
    /// The inventory item involved.
    pub item: String,
    /// The quality grade of the item.
    pub quality: String,
    /// How many units the sale asked to deduct.
    pub requested_qty: i64,
    /// Why the deduction could not be applied cleanly.
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_uses_snake_case_on_the_wire() {
        assert_eq!(serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(), "\"bank_transfer\"");
        assert_eq!(serde_json::from_str::<PaymentMethod>("\"cash\"").unwrap(), PaymentMethod::Cash);
    }

    #[test]
    fn sale_line_quality_defaults_to_regular() {
        let line: SaleLine = serde_json::from_str(r#"{"item": "rosas", "quantity": 12, "unit_price": 1.5}"#).unwrap();
        assert_eq!(line.quality, "regular");
    }

    #[test]
    fn parsed_transaction_tolerates_missing_fields() {
        let parsed: ParsedTransaction = serde_json::from_str(r#"{"expenses": [{"description": "agua", "amount": 3.0}]}"#).unwrap();
        assert!(parsed.total_sale_price.is_none());
        assert!(parsed.sales.is_empty());
        assert!(!parsed.is_empty());
    }

    #[test]
    fn transaction_row_tolerates_explicit_nulls_from_warehouse_reads() {
        let row: TransactionRow = serde_json::from_str(
            r#"{
                "transaction_id": "abc",
                "date": "2026-08-23",
                "sender_name": null,
                "total_sale_price": null,
                "payment_method": null,
                "sales": [{"item": "rosa", "quality": null, "quantity": null, "unit_price": null}],
                "expenses": null,
                "operation": null,
                "is_deleted": null
            }"#,
        )
        .unwrap();

        assert_eq!(row.sales[0].quality, "regular");
        assert!(row.expenses.is_empty());
        assert!(!row.is_deleted);
    }

    #[test]
    fn deleted_shadow_preserves_id_and_flags_the_copy() {
        let row = TransactionRow::from_parsed(ParsedTransaction::default(), "abc-123".to_string(), "2026-01-01".to_string());
        let shadow = row.deleted_shadow();

        assert_eq!(shadow.transaction_id, "abc-123");
        assert_eq!(shadow.operation.as_deref(), Some("deleted"));
        assert!(shadow.is_deleted);
        assert!(!row.is_deleted);
    }

    #[test]
    fn closure_report_cash_in_till_treats_missing_figures_as_zero() {
        let report = ClosureReport {
            efectivo_sales: Some(120.0),
            transfer_sales: None,
            total_expenses: Some(45.5),
        };

        assert_eq!(report.cash_in_till(), 74.5);
        assert_eq!(report.transfer(), 0.0);
        assert!(!report.is_empty());
        assert!(ClosureReport::default().is_empty());
    }

    #[test]
    fn operation_type_serializes_like_the_audit_schema() {
        assert_eq!(serde_json::to_string(&OperationType::UnauthorizedAccess).unwrap(), "\"unauthorized_access\"");
        assert_eq!(serde_json::to_string(&OperationType::DataInsert).unwrap(), "\"data_insert\"");
    }
}
