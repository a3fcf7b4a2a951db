//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Default OpenAI model to use when the bot settings do not pin one.
fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

/// Default sampling temperature for extraction requests.
fn default_openai_temperature() -> f32 {
    0.2
}

/// Default max output tokens for OpenAI requests.
fn default_openai_max_tokens() -> u32 {
    4096
}

/// Default address the webhook server binds to.
fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Default BigQuery REST endpoint.
fn default_bq_endpoint() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".to_string()
}

/// Configuration for the ledger-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// The shared configuration values.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The configuration values, shared behind [`Config`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// Telegram bot token (`TELEGRAM_TOKEN`).
    pub telegram_token: String,
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI model to use (`OPENAI_MODEL`), unless overridden by the stored bot settings.
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Sampling temperature for extraction requests (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2. Low values keep the extraction deterministic.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Max output tokens for OpenAI requests (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// BigQuery project id (`BQ_PROJECT`).
    pub bq_project: String,
    /// BigQuery dataset id (`BQ_DATASET`).
    pub bq_dataset: String,
    /// BigQuery transactions table id (`BQ_TABLE`).
    pub bq_table: String,
    /// BigQuery REST endpoint (`BQ_ENDPOINT`); override for emulators and tests.
    #[serde(default = "default_bq_endpoint")]
    pub bq_endpoint: String,
    /// Static Google OAuth access token (`GOOGLE_ACCESS_TOKEN`).
    /// When unset, the client fetches one from the GCE metadata server.
    #[serde(default)]
    pub google_access_token: Option<String>,
    /// Operational store endpoint URL (`DB_ENDPOINT`), e.g. `ws://...` or `mem://`.
    pub db_endpoint: String,
    /// Operational store username (`DB_USERNAME`).
    #[serde(default)]
    pub db_username: String,
    /// Operational store password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: String,
    /// Address the webhook server binds to (`LISTEN_ADDR`).
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Public hostname used when registering the Telegram webhook (`PUBLIC_HOST`).
    /// When unset, the `Host` header of the registration request is used.
    #[serde(default)]
    pub public_host: Option<String>,
}

impl Config {
    /// Load configuration from the environment and an optional TOML file.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("LEDGER_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        if result.openai_temperature < 0.0 || result.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if result.openai_max_tokens < 1 || result.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let inner: ConfigInner = serde_json::from_str(
            r#"{
                "telegram_token": "123:abc",
                "openai_api_key": "sk-test",
                "bq_project": "p",
                "bq_dataset": "d",
                "bq_table": "t",
                "db_endpoint": "mem://"
            }"#,
        )
        .unwrap();

        assert_eq!(inner.openai_model, "gpt-4.1-mini");
        assert_eq!(inner.openai_temperature, 0.2);
        assert_eq!(inner.openai_max_tokens, 4096);
        assert_eq!(inner.listen_addr, "0.0.0.0:8080");
        assert!(inner.google_access_token.is_none());
        assert!(inner.bq_endpoint.starts_with("https://bigquery.googleapis.com"));
    }
}
