//! Session runtime
//!
//! Each live session is owned by one actor task. Commands for a session are
//! queued on its channel, so `apply` calls on the same session never overlap
//! while distinct sessions run in parallel.

mod actor;

#[cfg(test)]
pub mod testing;

use actor::{Command, SessionActor};

use crate::interpreter::Interpreter;
use crate::state_machine::{self, AgentMessage, Outcome, SessionError, SessionSnapshot, Step};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch, RwLock};
use tokio_util::sync::CancellationToken;

/// Timing limits applied by session actors
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Longest wait for one interpretation
    pub interpret_timeout: Duration,
    /// Session is discarded after this long without commands
    pub idle_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interpret_timeout: Duration::from_secs(15),
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Snapshot plus the agent message that goes with it
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReply {
    pub snapshot: SessionSnapshot,
    pub message: AgentMessage,
}

/// A rejected submit
///
/// `current` is the untouched session with a re-prompt, absent when the
/// session does not exist.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct SubmitError {
    pub error: SessionError,
    pub current: Option<SessionReply>,
}

impl SubmitError {
    fn not_found(session_id: &str) -> Self {
        Self {
            error: SessionError::SessionNotFound(session_id.to_string()),
            current: None,
        }
    }
}

/// Why a session actor stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Completed,
    Abandoned,
    Expired,
    Shutdown,
}

/// Events sent to stream subscribers
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Updated {
        reply: SessionReply,
        outcome: Outcome,
    },
    Closed {
        reason: CloseReason,
    },
}

/// Handle to interact with a running session
#[derive(Clone)]
struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    latest: watch::Receiver<SessionReply>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    abandon: CancellationToken,
}

impl SessionHandle {
    /// The actor has exited once its command queue is closed
    fn is_live(&self) -> bool {
        !self.command_tx.is_closed()
    }
}

/// Manager for all session actors
pub struct SessionManager {
    interpreter: Arc<dyn Interpreter>,
    config: RuntimeConfig,
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
    shutdown: CancellationToken,
}

impl SessionManager {
    pub fn new(interpreter: Arc<dyn Interpreter>, config: RuntimeConfig) -> Self {
        Self {
            interpreter,
            config,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            shutdown: CancellationToken::new(),
        }
    }

    /// Start a session and its actor
    pub async fn create(&self) -> SessionReply {
        let (session, message) = state_machine::start();
        let session_id = session.id.clone();
        let initial = SessionReply {
            snapshot: session.snapshot(),
            message: message.clone(),
        };

        let (command_tx, command_rx) = mpsc::channel(16);
        let (latest_tx, latest) = watch::channel(initial.clone());
        let (broadcast_tx, _) = broadcast::channel(64);
        let abandon = CancellationToken::new();

        let actor = SessionActor {
            session,
            message,
            interpreter: Arc::clone(&self.interpreter),
            config: self.config,
            command_rx,
            latest_tx,
            broadcast_tx: broadcast_tx.clone(),
            abandon: abandon.clone(),
            shutdown: self.shutdown.child_token(),
        };

        let handle = SessionHandle {
            command_tx,
            latest,
            broadcast_tx,
            abandon,
        };

        let active = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session_id.clone(), handle);
            sessions.len()
        };

        let sessions = Arc::clone(&self.sessions);
        let id = session_id.clone();
        tokio::spawn(async move {
            actor.run().await;
            // Dropping the handle drops the last update sender
            sessions.write().await.remove(&id);
        });
        tracing::info!(session_id = %session_id, active, "Session started");

        initial
    }

    async fn handle(&self, session_id: &str) -> Result<SessionHandle, SessionError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .filter(|handle| handle.is_live())
            .cloned()
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))
    }

    /// Submit one guest reply aimed at `target`
    pub async fn submit(
        &self,
        session_id: &str,
        input: String,
        target: Step,
    ) -> Result<SessionReply, SubmitError> {
        let handle = self
            .handle(session_id)
            .await
            .map_err(|_| SubmitError::not_found(session_id))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        handle
            .command_tx
            .send(Command::Submit {
                input,
                target,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SubmitError::not_found(session_id))?;

        // A dropped reply sender means the actor stopped before answering
        reply_rx
            .await
            .unwrap_or_else(|_| Err(SubmitError::not_found(session_id)))
    }

    /// Latest committed state
    pub async fn snapshot(&self, session_id: &str) -> Result<SessionReply, SessionError> {
        let handle = self.handle(session_id).await?;
        let latest = handle.latest.borrow().clone();
        Ok(latest)
    }

    /// Current state plus a receiver for every later change
    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<(SessionReply, broadcast::Receiver<SessionEvent>), SessionError> {
        let handle = self.handle(session_id).await?;
        // Subscribe before reading so no commit falls between the two
        let rx = handle.broadcast_tx.subscribe();
        let latest = handle.latest.borrow().clone();
        Ok((latest, rx))
    }

    /// Discard a session
    pub async fn abandon(&self, session_id: &str) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .filter(SessionHandle::is_live)
            .ok_or_else(|| SessionError::SessionNotFound(session_id.to_string()))?;
        handle.abandon.cancel();
        tracing::info!(session_id = %session_id, "Session abandoned");
        Ok(())
    }

    /// Number of sessions whose actor is still running
    #[allow(dead_code)] // Used by tests
    pub async fn active_sessions(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|handle| handle.is_live())
            .count()
    }

    /// Stop every actor
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
