//! Service configuration from environment variables

use crate::interpreter::InterpreterConfig;
use crate::runtime::RuntimeConfig;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_INTERPRET_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub runtime: RuntimeConfig,
    pub interpreter: InterpreterConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = parse_or(&lookup, "RESERVATION_PORT", DEFAULT_PORT);
        let interpret_timeout = Duration::from_secs(parse_or(
            &lookup,
            "RESERVATION_INTERPRET_TIMEOUT_SECS",
            DEFAULT_INTERPRET_TIMEOUT_SECS,
        ));
        let idle_timeout = Duration::from_secs(parse_or(
            &lookup,
            "RESERVATION_SESSION_IDLE_SECS",
            DEFAULT_SESSION_IDLE_SECS,
        ));

        let mut interpreter = InterpreterConfig::from_lookup(&lookup);
        // The HTTP client never outlives the runtime's own deadline
        interpreter.request_timeout = interpret_timeout;

        Self {
            port,
            runtime: RuntimeConfig {
                interpret_timeout,
                idle_timeout,
            },
            interpreter,
        }
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Unparseable setting, using default");
            default
        }),
        None => default,
    }
}
