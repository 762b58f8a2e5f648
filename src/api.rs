//! HTTP API for the reservation desk

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::interpreter::Interpreter;
use crate::runtime::{RuntimeConfig, SessionManager};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(interpreter: Arc<dyn Interpreter>, config: RuntimeConfig) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(interpreter, config)),
        }
    }
}
