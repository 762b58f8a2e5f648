//! API request and response types

use crate::presentation::View;
use crate::runtime::SessionReply;
use crate::state_machine::SessionSnapshot;
use serde::{Deserialize, Serialize};

/// Guest reply for the step named in `field`
#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub input: String,
    pub field: String,
}

/// Session state as the client renders it
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionSnapshot,
    pub agent_response: String,
    pub view: View,
}

impl From<SessionReply> for SessionResponse {
    fn from(reply: SessionReply) -> Self {
        let view = View::derive(&reply.snapshot, &reply.message);
        Self {
            session: reply.snapshot,
            agent_response: reply.message.into_string(),
            view,
        }
    }
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSnapshot>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, kind: &'static str) -> Self {
        Self {
            error: message.into(),
            kind,
            retryable: false,
            agent_response: None,
            session: None,
        }
    }
}
