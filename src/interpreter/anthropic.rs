//! Anthropic-backed interpreter
//!
//! Asks the model for a JSON verdict and converts it into an `Interpretation`.
//! Accepted values are re-parsed and bounds-checked locally, so a model reply
//! can never put a malformed or out-of-range value into the session.

use super::rules::{bounds_rejection, normalize_phone};
use super::{InterpretError, InterpretRequest, Interpretation, Interpreter};
use crate::state_machine::{Confidence, Field, FieldValue, Step};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveTime};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

const MAX_TOKENS: u32 = 256;

const SYSTEM_PROMPT: &str = "\
You extract restaurant reservation details from one guest reply at a time.
You receive JSON with the current `step`, the guest's `input`, today's date, and the \
fields collected so far. Reply with exactly one JSON object and nothing else.

If the input answers the step:
  {\"value\": <value>, \"confidence\": <0..1>, \"also\": {<field>: <value>, ...}}
If it does not:
  {\"rejected\": true, \"reason\": \"<short reason for the guest>\", \"confidence\": <0..1>}

Value formats: party_size integer 1-20; date \"YYYY-MM-DD\" within 90 days from today; \
time \"HH:MM\" 24h between 11:00 and 22:59; name text; phone text with at least 10 digits. \
For step `greeting` any seating preference is acceptable; use null as the value. \
`also` is optional and may only contain later fields the guest volunteered \
(party_size, date, time, name, phone). Keep `reason` under 60 characters.";

/// Anthropic Messages API interpreter
pub struct AnthropicInterpreter {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicInterpreter {
    pub fn new(
        api_key: String,
        model: Option<String>,
        gateway: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, InterpretError> {
        let base_url = match gateway {
            Some(gw) => format!("{}/_/gateway/anthropic/v1/messages", gw.trim_end_matches('/')),
            None => "https://api.anthropic.com/v1/messages".to_string(),
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InterpretError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url,
        })
    }

    fn build_request(&self, request: &InterpretRequest, today: NaiveDate) -> MessagesRequest {
        let payload = json!({
            "step": request.step,
            "input": request.raw_input,
            "today": today.to_string(),
            "fields": request.existing_fields,
        });

        MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: payload.to_string(),
            }],
        }
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> InterpretError {
        match status.as_u16() {
            401 | 403 => InterpretError::auth(format!("Authentication failed: {body}")),
            429 => InterpretError::rate_limit(format!("Rate limited: {body}")),
            400 => InterpretError::invalid_request(format!("Invalid request: {body}")),
            500..=599 => InterpretError::server_error(format!("Server error: {body}")),
            _ => InterpretError::unknown(format!("HTTP {status}: {body}")),
        }
    }
}

#[async_trait]
impl Interpreter for AnthropicInterpreter {
    async fn interpret(
        &self,
        request: &InterpretRequest,
    ) -> Result<Interpretation, InterpretError> {
        let today = Local::now().date_naive();
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&self.build_request(request, today))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InterpretError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    InterpretError::network(format!("Connection failed: {e}"))
                } else {
                    InterpretError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InterpretError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| InterpretError::malformed(format!("Failed to parse response: {e}")))?;

        let text = parsed
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.as_str()),
                ResponseBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        parse_verdict(request.step, &text, today)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Verdict parsing
// ============================================================================

/// JSON verdict as the model is asked to produce it
#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    value: Value,
    confidence: f64,
    #[serde(default)]
    rejected: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    also: Map<String, Value>,
}

/// Convert model text into an interpretation for `step`
///
/// A value outside the booking limits turns the verdict into the same
/// rejection the rule interpreter gives; such extras are dropped.
pub fn parse_verdict(
    step: Step,
    text: &str,
    today: NaiveDate,
) -> Result<Interpretation, InterpretError> {
    let json_text = extract_json_object(text)
        .ok_or_else(|| InterpretError::malformed(format!("No JSON object in reply: {text}")))?;
    let verdict: Verdict = serde_json::from_str(json_text)
        .map_err(|e| InterpretError::malformed(format!("Invalid verdict: {e}")))?;
    let confidence = Confidence::new(verdict.confidence).ok_or_else(|| {
        InterpretError::malformed(format!("Confidence {} outside [0, 1]", verdict.confidence))
    })?;

    if verdict.rejected {
        return Ok(Interpretation::Rejected {
            reason: verdict.reason.unwrap_or_default(),
            confidence,
        });
    }

    let value = match step.field() {
        Some(field) => {
            let value = field_value(field, &verdict.value).ok_or_else(|| {
                InterpretError::malformed(format!("Unusable {field:?} value: {}", verdict.value))
            })?;
            if let Some(rejection) = bounds_rejection(&value, today) {
                return Ok(rejection);
            }
            Some(value)
        }
        None => None,
    };

    // Extras that fail to parse or break a limit are dropped rather than
    // failing the turn.
    let extra = verdict
        .also
        .iter()
        .filter_map(|(name, raw)| {
            let field = serde_json::from_value::<Field>(Value::String(name.clone())).ok()?;
            let value = field_value(field, raw)?;
            bounds_rejection(&value, today).is_none().then_some(value)
        })
        .collect();

    Ok(Interpretation::Accepted {
        value,
        confidence,
        extra,
    })
}

fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Parse a model-supplied JSON value for `field`
fn field_value(field: Field, raw: &Value) -> Option<FieldValue> {
    match field {
        Field::PartySize => {
            let size = match raw {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            u32::try_from(size).ok().map(FieldValue::PartySize)
        }
        Field::Date => NaiveDate::parse_from_str(raw.as_str()?.trim(), "%Y-%m-%d")
            .ok()
            .map(FieldValue::Date),
        Field::Time => NaiveTime::parse_from_str(raw.as_str()?.trim(), "%H:%M")
            .ok()
            .map(FieldValue::Time),
        Field::Name => {
            let name = raw.as_str()?.trim();
            (!name.is_empty()).then(|| FieldValue::Name(name.to_string()))
        }
        Field::Phone => {
            let digits = normalize_phone(raw.as_str()?);
            (!digits.is_empty()).then_some(FieldValue::Phone(digits))
        }
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
