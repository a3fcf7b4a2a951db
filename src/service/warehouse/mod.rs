pub mod bigquery;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::{AuditEntry, ClosureReport, Res, TransactionRow, Void};

// Traits.

/// Generic analytics warehouse trait that clients must implement.
///
/// The warehouse holds the transaction ledger and the audit log. It is
/// append-only: a transaction row is never mutated or removed, deletes and
/// edits append shadow rows instead. Implementing this trait allows different
/// warehouse backends to be used with the ledger-bot.
#[async_trait]
pub trait GenericWarehouseClient: Send + Sync + 'static {
    /// Append a live transaction row to the ledger.
    async fn insert_transaction(&self, row: &TransactionRow) -> Void;

    /// Fetch the live row for a transaction id, if any.
    async fn get_transaction(&self, transaction_id: &str) -> Res<Option<TransactionRow>>;

    /// Soft-delete a transaction by appending a shadow copy flagged as deleted.
    ///
    /// Returns the original live row. Fails when no live row matches the id.
    async fn soft_delete(&self, transaction_id: &str) -> Res<TransactionRow>;

    /// Replace a transaction: soft-delete the live row, then append the
    /// replacement carrying the same transaction id.
    async fn soft_edit(&self, transaction_id: &str, replacement: TransactionRow) -> Void;

    /// Aggregate the closure figures for a business date over live rows only.
    async fn closure_report(&self, date: &str) -> Res<ClosureReport>;

    /// Append an entry to the audit log.
    async fn log_audit(&self, entry: &AuditEntry) -> Void;
}

// Structs.

/// Warehouse client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct WarehouseClient {
    inner: Arc<dyn GenericWarehouseClient>,
}

impl Deref for WarehouseClient {
    type Target = dyn GenericWarehouseClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl WarehouseClient {
    pub fn new(inner: Arc<dyn GenericWarehouseClient>) -> Self {
        Self { inner }
    }
}
