//! Integration with Large Language Model services.
//!
//! This module provides a thin wrapper around LLM clients (e.g., OpenAI)
//! for interpreting free-form shop messages into structured transactions,
//! extracting inventory entries, and generating Spanish confirmation summaries.
//!
//! The module implements the `GenericLlmClient` trait for OpenAI.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::base::{
    config::Config,
    prompts,
    types::{InventoryEntry, ParsedTransaction, Res},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{Content, CreateResponseArgs, Input, InputItem, InputMessageArgs, OutputContent, Response, ResponseFormatJsonSchema, Role, TextConfig, TextResponseFormat},
};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build a single-user-message input.
    fn build_user_input(content: String) -> Res<Input> {
        Ok(Input::Items(vec![InputItem::Message(InputMessageArgs::default().role(Role::User).content(content).build()?)]))
    }

    /// Prepare a request with the shared model, token, and temperature settings.
    fn base_request(&self, model: &str, instructions: &str, text_config: TextConfig, input: Input) -> CreateResponseArgs {
        let mut request = CreateResponseArgs::default();

        request
            .instructions(instructions.to_string())
            .max_output_tokens(self.config.openai_max_tokens)
            .model(model)
            .text(text_config)
            .input(input);

        // Reasoning models reject the temperature knob.
        if model.starts_with("gpt") {
            request.temperature(self.config.openai_temperature);
        }

        request
    }

    /// Helper function to make OpenAI API calls with retry logic and timeout handling.
    async fn call_openai_api(&self, request_builder: CreateResponseArgs) -> Res<Response> {
        const MAX_RETRIES: u32 = 3;
        const TIMEOUT: u64 = 120;
        const RETRY_DELAY_MS: u64 = 1000;

        let mut retries = 0;

        loop {
            let request = request_builder.build()?;
            let result = timeout(Duration::from_secs(TIMEOUT), self.client.responses().create(request)).await;

            match result {
                Ok(Ok(response)) => {
                    info!("OpenAI API call succeeded after {} attempts", retries + 1);
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call failed after {MAX_RETRIES} retries: {err}"));
                    }
                    retries += 1;
                    warn!("OpenAI API call failed, retrying {retries}/{MAX_RETRIES}: {err}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
                Err(_) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call timed out after {MAX_RETRIES} attempts"));
                    }
                    retries += 1;
                    warn!("OpenAI API call timed out, retrying {retries}/{MAX_RETRIES}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::interpret_transaction", skip_all)]
    async fn interpret_transaction(&self, message: &str, model: &str) -> Res<ParsedTransaction> {
        let input = Self::build_user_input(message.to_string())?;
        let request = self.base_request(model, prompts::TRANSACTION_SYSTEM_PROMPT, get_transaction_text_config().clone(), input);

        let response = self.call_openai_api(request).await?;
        let text = extract_output_text(&response)?;

        parse_transaction_json(&text)
    }

    #[instrument(name = "OpenAiLlmClient::interpret_inventory", skip_all)]
    async fn interpret_inventory(&self, message: &str, model: &str) -> Res<Vec<InventoryEntry>> {
        let input = Self::build_user_input(message.to_string())?;
        let request = self.base_request(model, prompts::INVENTORY_SYSTEM_PROMPT, get_inventory_text_config().clone(), input);

        let response = self.call_openai_api(request).await?;
        let text = extract_output_text(&response)?;

        parse_inventory_json(&text)
    }

    #[instrument(name = "OpenAiLlmClient::summarize_transaction", skip_all)]
    async fn summarize_transaction(&self, parsed: &ParsedTransaction, original_message: &str, model: &str) -> Res<String> {
        let content = format!(
            "## Extracted Data\n\n{}\n\n## Original Message\n\n{}\n\n",
            serde_json::to_string_pretty(parsed)?,
            original_message
        );

        let input = Self::build_user_input(content)?;
        let text_config = TextConfig { format: TextResponseFormat::Text };
        let request = self.base_request(model, prompts::SUMMARY_SYSTEM_PROMPT, text_config, input);

        let response = self.call_openai_api(request).await?;

        extract_output_text(&response)
    }
}

/// Collect all output text from an OpenAI response into a single string.
#[instrument(skip_all)]
fn extract_output_text(response: &Response) -> Res<String> {
    let mut parts = Vec::new();

    for output in &response.output {
        match output {
            OutputContent::Message(message) => {
                for message_content in &message.content {
                    match message_content {
                        Content::OutputText(text) => parts.push(text.text.clone()),
                        Content::Refusal(reason) => {
                            return Err(anyhow::anyhow!("Request refused: {reason:#?}"));
                        }
                    }
                }
            }
            _ => {
                warn!("Unexpected output: {output:#?}");
            }
        }
    }

    if parts.is_empty() {
        return Err(anyhow::anyhow!("LLM response contained no output text"));
    }

    Ok(parts.join("\n"))
}

/// Parse the extraction output into a transaction, with a code-fence fallback.
fn parse_transaction_json(text: &str) -> Res<ParsedTransaction> {
    Ok(serde_json::from_str(strip_code_fences(text))?)
}

/// Parse the extraction output into inventory entries.
fn parse_inventory_json(text: &str) -> Res<Vec<InventoryEntry>> {
    #[derive(Deserialize)]
    struct InventoryEnvelope {
        #[serde(default)]
        inventory: Vec<InventoryEntry>,
    }

    let envelope: InventoryEnvelope = serde_json::from_str(strip_code_fences(text))?;
    Ok(envelope.inventory)
}

/// Models occasionally wrap JSON output in markdown code fences despite instructions.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

// Statics.

static TRANSACTION_TEXT_CONFIG: OnceLock<TextConfig> = OnceLock::new();
static INVENTORY_TEXT_CONFIG: OnceLock<TextConfig> = OnceLock::new();

fn get_transaction_text_config() -> &'static TextConfig {
    TRANSACTION_TEXT_CONFIG.get_or_init(|| TextConfig {
        format: TextResponseFormat::JsonSchema(ResponseFormatJsonSchema {
            name: "ShopTransaction".to_string(),
            description: Some("Structured sales and expenses extracted from a shop message.".to_string()),
            schema: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "total_sale_price": { "type": ["number", "null"] },
                    "payment_method": { "type": ["string", "null"], "enum": ["cash", "bank_transfer"] },
                    "sales": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "item": { "type": "string" },
                                "quality": { "type": "string" },
                                "quantity": { "type": ["integer", "null"] },
                                "unit_price": { "type": ["number", "null"] }
                            },
                            "required": ["item", "quality", "quantity", "unit_price"],
                            "additionalProperties": false
                        }
                    },
                    "expenses": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "description": { "type": "string" },
                                "amount": { "type": "number" }
                            },
                            "required": ["description", "amount"],
                            "additionalProperties": false
                        }
                    },
                    "sender_name": { "type": ["string", "null"] }
                },
                "required": ["total_sale_price", "payment_method", "sales", "expenses", "sender_name"],
                "additionalProperties": false
            })),
            strict: Some(true),
        }),
    })
}

fn get_inventory_text_config() -> &'static TextConfig {
    INVENTORY_TEXT_CONFIG.get_or_init(|| TextConfig {
        format: TextResponseFormat::JsonSchema(ResponseFormatJsonSchema {
            name: "ShopInventory".to_string(),
            description: Some("Inventory entries extracted from a bulk inventory message.".to_string()),
            schema: Some(serde_json::json!({
                "type": "object",
                "properties": {
                    "inventory": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "item": { "type": "string" },
                                "quality": { "type": "string" },
                                "quantity": { "type": "integer" }
                            },
                            "required": ["item", "quality", "quantity"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["inventory"],
                "additionalProperties": false
            })),
            strict: Some(true),
        }),
    })
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::types::PaymentMethod;

    #[test]
    fn parses_a_sale_with_expenses() {
        let text = r#"{
            "total_sale_price": 18.0,
            "payment_method": "cash",
            "sales": [{"item": "rosa", "quality": "premium", "quantity": 12, "unit_price": 1.5}],
            "expenses": [{"description": "cinta", "amount": 2.0}],
            "sender_name": null
        }"#;

        let parsed = parse_transaction_json(text).unwrap();

        assert_eq!(parsed.total_sale_price, Some(18.0));
        assert_eq!(parsed.payment_method, Some(PaymentMethod::Cash));
        assert_eq!(parsed.sales.len(), 1);
        assert_eq!(parsed.sales[0].quality, "premium");
        assert_eq!(parsed.expenses[0].amount, 2.0);
    }

    #[test]
    fn parses_transaction_wrapped_in_code_fences() {
        let text = "```json\n{\"total_sale_price\": null, \"payment_method\": null, \"sales\": [], \"expenses\": [], \"sender_name\": null}\n```";

        let parsed = parse_transaction_json(text).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn parses_inventory_envelope() {
        let text = r#"{"inventory": [{"item": "rosa", "quality": "regular", "quantity": 24}, {"item": "girasol", "quantity": 6}]}"#;

        let entries = parse_inventory_json(text).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].quantity, 24);
        assert_eq!(entries[1].quality, "regular");
    }

    #[test]
    fn empty_inventory_is_not_an_error() {
        let entries = parse_inventory_json(r#"{"inventory": []}"#).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn rejects_non_json_output() {
        assert!(parse_transaction_json("no pude procesar el mensaje").is_err());
    }
}
