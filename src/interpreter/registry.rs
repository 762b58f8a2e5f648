//! Interpreter selection from configuration

use super::{AnthropicInterpreter, Interpreter, LoggingInterpreter, RuleInterpreter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Which interpreter backs the sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpreterKind {
    #[default]
    Rules,
    Anthropic,
}

impl FromStr for InterpreterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rules" => Ok(Self::Rules),
            "anthropic" | "llm" => Ok(Self::Anthropic),
            other => Err(format!("unknown interpreter: {other}")),
        }
    }
}

/// Configuration for interpreters
#[derive(Debug, Clone, Default)]
pub struct InterpreterConfig {
    pub kind: InterpreterKind,
    pub anthropic_api_key: Option<String>,
    /// Gateway base URL; when set the API key is handled by the gateway
    pub gateway: Option<String>,
    pub model: Option<String>,
    /// HTTP timeout for remote interpreters
    pub request_timeout: Duration,
}

impl InterpreterConfig {
    /// Read settings through `lookup`, usually the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let kind = lookup("RESERVATION_INTERPRETER")
            .and_then(|raw| match raw.parse() {
                Ok(kind) => Some(kind),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring RESERVATION_INTERPRETER");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            kind,
            anthropic_api_key: lookup("ANTHROPIC_API_KEY"),
            gateway: lookup("LLM_GATEWAY"),
            model: lookup("RESERVATION_MODEL"),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Build the configured interpreter, wrapped with logging
///
/// Falls back to the rule interpreter when the LLM one cannot be built.
pub fn build_interpreter(config: &InterpreterConfig) -> Arc<dyn Interpreter> {
    let inner: Arc<dyn Interpreter> = match config.kind {
        InterpreterKind::Rules => Arc::new(RuleInterpreter::new()),
        InterpreterKind::Anthropic => match try_anthropic(config) {
            Some(interpreter) => Arc::new(interpreter),
            None => {
                tracing::warn!(
                    "Anthropic interpreter unavailable. Set ANTHROPIC_API_KEY or LLM_GATEWAY; \
                     using rule interpreter."
                );
                Arc::new(RuleInterpreter::new())
            }
        },
    };
    Arc::new(LoggingInterpreter::new(inner))
}

fn try_anthropic(config: &InterpreterConfig) -> Option<AnthropicInterpreter> {
    // In gateway mode the gateway authenticates
    let api_key = if config.gateway.is_some() {
        "implicit".to_string()
    } else {
        config.anthropic_api_key.clone().filter(|k| !k.is_empty())?
    };

    match AnthropicInterpreter::new(
        api_key,
        config.model.clone(),
        config.gateway.as_deref(),
        config.request_timeout,
    ) {
        Ok(interpreter) => Some(interpreter),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create Anthropic interpreter");
            None
        }
    }
}
