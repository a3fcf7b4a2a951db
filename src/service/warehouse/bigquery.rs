//! BigQuery implementation of the analytics warehouse.
//!
//! Talks to the BigQuery REST API directly: `insertAll` for streaming row
//! appends and `jobs.query` with named parameters for reads. Row reads go
//! through `TO_JSON_STRING` so results deserialize with serde instead of the
//! positional `f`/`v` cell format.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::base::{
    config::Config,
    types::{AuditEntry, ClosureReport, Res, TransactionRow, Void},
};

use super::{GenericWarehouseClient, WarehouseClient};

/// Token endpoint of the GCE metadata server, used when no static token is configured.
const METADATA_TOKEN_URL: &str = "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Table holding the audit log, alongside the transactions table in the same dataset.
const AUDIT_TABLE: &str = "audit_logs";

// Extra methods on `WarehouseClient` applied by the bigquery implementation.

impl WarehouseClient {
    pub fn bigquery(config: &Config) -> Self {
        let client = BigQueryWarehouseClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// BigQuery warehouse client implementation.
#[derive(Clone)]
pub struct BigQueryWarehouseClient {
    config: Config,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl BigQueryWarehouseClient {
    /// Create a new BigQuery warehouse client.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Fully-qualified transactions table for use inside query text.
    fn transactions_table(&self) -> String {
        format!("`{}.{}.{}`", self.config.bq_project, self.config.bq_dataset, self.config.bq_table)
    }

    /// Resolve the bearer token: static config token, or the metadata server.
    async fn access_token(&self) -> Res<String> {
        if let Some(token) = &self.config.google_access_token {
            return Ok(token.clone());
        }

        let token: MetadataToken = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(token.access_token)
    }

    /// Stream rows into a table via `insertAll`.
    #[instrument(skip(self, rows))]
    async fn insert_all(&self, table: &str, rows: Vec<Value>) -> Void {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables/{}/insertAll",
            self.config.bq_endpoint, self.config.bq_project, self.config.bq_dataset, table
        );

        let body = json!({
            "rows": rows.into_iter().map(|row| json!({ "json": row })).collect::<Vec<_>>(),
        });

        let token = self.access_token().await?;
        let response: Value = self.http.post(&url).bearer_auth(token).json(&body).send().await?.error_for_status()?.json().await?;

        if let Some(errors) = response.get("insertErrors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            return Err(anyhow::anyhow!("BigQuery insert errors on `{table}`: {errors:?}"));
        }

        Ok(())
    }

    /// Run a query with named string parameters, returning the first column
    /// of each row as a string.
    #[instrument(skip(self, query))]
    async fn query_strings(&self, query: String, params: Vec<(&str, &str)>) -> Res<Vec<String>> {
        let url = format!("{}/projects/{}/queries", self.config.bq_endpoint, self.config.bq_project);

        let body = json!({
            "query": query,
            "useLegacySql": false,
            "parameterMode": "NAMED",
            "queryParameters": params.into_iter().map(|(name, value)| string_param(name, value)).collect::<Vec<_>>(),
        });

        let token = self.access_token().await?;
        let response: Value = self.http.post(&url).bearer_auth(token).json(&body).send().await?.error_for_status()?.json().await?;

        if response.get("jobComplete").and_then(Value::as_bool) == Some(false) {
            return Err(anyhow::anyhow!("BigQuery query did not complete synchronously"));
        }

        Ok(first_column_strings(&response))
    }

    /// Fetch the live row for a transaction id.
    async fn fetch_live_row(&self, transaction_id: &str) -> Res<Option<TransactionRow>> {
        let query = format!(
            "SELECT TO_JSON_STRING(t) FROM {} AS t \
             WHERE transaction_id = @transaction_id AND operation IS NULL AND is_deleted = FALSE \
             LIMIT 1",
            self.transactions_table()
        );

        let rows = self.query_strings(query, vec![("transaction_id", transaction_id)]).await?;

        match rows.first() {
            Some(row) => Ok(Some(serde_json::from_str(row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GenericWarehouseClient for BigQueryWarehouseClient {
    #[instrument(name = "BigQueryWarehouseClient::insert_transaction", skip_all)]
    async fn insert_transaction(&self, row: &TransactionRow) -> Void {
        self.insert_all(&self.config.bq_table, vec![serde_json::to_value(row)?]).await?;
        info!("Inserted transaction `{}`.", row.transaction_id);

        Ok(())
    }

    #[instrument(name = "BigQueryWarehouseClient::get_transaction", skip(self))]
    async fn get_transaction(&self, transaction_id: &str) -> Res<Option<TransactionRow>> {
        self.fetch_live_row(transaction_id).await
    }

    #[instrument(name = "BigQueryWarehouseClient::soft_delete", skip(self))]
    async fn soft_delete(&self, transaction_id: &str) -> Res<TransactionRow> {
        let original = self
            .fetch_live_row(transaction_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No matching rows found for transaction_id: {transaction_id}"))?;

        let shadow = original.deleted_shadow();
        self.insert_all(&self.config.bq_table, vec![serde_json::to_value(&shadow)?]).await?;
        info!("Soft-deleted transaction `{transaction_id}`.");

        Ok(original)
    }

    #[instrument(name = "BigQueryWarehouseClient::soft_edit", skip(self, replacement))]
    async fn soft_edit(&self, transaction_id: &str, replacement: TransactionRow) -> Void {
        self.soft_delete(transaction_id).await?;

        let mut replacement = replacement;
        replacement.transaction_id = transaction_id.to_string();
        replacement.operation = None;
        replacement.is_deleted = false;

        self.insert_all(&self.config.bq_table, vec![serde_json::to_value(&replacement)?]).await?;
        info!("Replaced transaction `{transaction_id}`.");

        Ok(())
    }

    #[instrument(name = "BigQueryWarehouseClient::closure_report", skip(self))]
    async fn closure_report(&self, date: &str) -> Res<ClosureReport> {
        let table = self.transactions_table();
        let query = format!(
            "WITH latest_transactions AS ( \
               SELECT * FROM {table} WHERE operation IS NULL \
             ) \
             SELECT TO_JSON_STRING(STRUCT( \
               (SELECT SUM(total_sale_price) FROM latest_transactions WHERE payment_method = 'cash' AND date = @date) AS efectivo_sales, \
               (SELECT SUM(total_sale_price) FROM latest_transactions WHERE payment_method = 'bank_transfer' AND date = @date) AS transfer_sales, \
               (SELECT SUM(expense.amount) FROM latest_transactions, UNNEST(expenses) AS expense WHERE date = @date) AS total_expenses \
             ))"
        );

        let rows = self.query_strings(query, vec![("date", date)]).await?;

        match rows.first() {
            Some(row) => Ok(serde_json::from_str(row)?),
            None => Ok(ClosureReport::default()),
        }
    }

    #[instrument(name = "BigQueryWarehouseClient::log_audit", skip_all)]
    async fn log_audit(&self, entry: &AuditEntry) -> Void {
        if let Err(err) = self.insert_all(AUDIT_TABLE, vec![serde_json::to_value(entry)?]).await {
            // The audit log must never take the user-facing operation down with it.
            warn!("Audit log insert failed: {err}");
        }

        Ok(())
    }
}

// Helpers.

/// Build a named STRING query parameter.
fn string_param(name: &str, value: &str) -> Value {
    json!({
        "name": name,
        "parameterType": { "type": "STRING" },
        "parameterValue": { "value": value },
    })
}

/// Extract the first column of each result row from a `jobs.query` response.
fn first_column_strings(response: &Value) -> Vec<String> {
    response
        .get("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.pointer("/f/0/v").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_param_matches_the_rest_shape() {
        let param = string_param("transaction_id", "abc-123");

        assert_eq!(param["name"], "transaction_id");
        assert_eq!(param["parameterType"]["type"], "STRING");
        assert_eq!(param["parameterValue"]["value"], "abc-123");
    }

    #[test]
    fn first_column_strings_reads_the_cell_format() {
        let response = json!({
            "jobComplete": true,
            "totalRows": "2",
            "rows": [
                { "f": [ { "v": "{\"a\":1}" } ] },
                { "f": [ { "v": "{\"a\":2}" } ] }
            ]
        });

        assert_eq!(first_column_strings(&response), vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    #[test]
    fn first_column_strings_handles_empty_result_sets() {
        let response = json!({ "jobComplete": true, "totalRows": "0" });
        assert!(first_column_strings(&response).is_empty());
    }

    #[test]
    fn closure_struct_row_deserializes() {
        let row = r#"{"efectivo_sales": 120.5, "transfer_sales": null, "total_expenses": 30.0}"#;
        let report: ClosureReport = serde_json::from_str(row).unwrap();

        assert_eq!(report.cash_in_till(), 90.5);
        assert_eq!(report.transfer(), 0.0);
    }
}
