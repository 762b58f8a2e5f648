//! Input interpretation
//!
//! The interpreter owns all natural-language understanding. The session core
//! only sees its verdicts.

mod anthropic;
mod error;
mod registry;
mod rules;
mod types;

pub use anthropic::AnthropicInterpreter;
pub use error::{InterpretError, InterpretErrorKind};
pub use registry::{build_interpreter, InterpreterConfig, InterpreterKind};
pub use rules::RuleInterpreter;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Extracts a field value (or a rejection) from one guest reply
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, request: &InterpretRequest) -> Result<Interpretation, InterpretError>;

    /// Short name for logs
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Interpreter + ?Sized> Interpreter for Arc<T> {
    async fn interpret(
        &self,
        request: &InterpretRequest,
    ) -> Result<Interpretation, InterpretError> {
        (**self).interpret(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Logging wrapper for interpreters
pub struct LoggingInterpreter {
    inner: Arc<dyn Interpreter>,
    name: String,
}

impl LoggingInterpreter {
    pub fn new(inner: Arc<dyn Interpreter>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl Interpreter for LoggingInterpreter {
    async fn interpret(
        &self,
        request: &InterpretRequest,
    ) -> Result<Interpretation, InterpretError> {
        let start = std::time::Instant::now();
        let result = self.inner.interpret(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(verdict) => {
                tracing::info!(
                    interpreter = %self.name,
                    step = %request.step,
                    duration_ms = %duration.as_millis(),
                    rejected = verdict.is_rejected(),
                    confidence = %verdict.confidence(),
                    "Interpretation completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    interpreter = %self.name,
                    step = %request.step,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Interpretation failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}
