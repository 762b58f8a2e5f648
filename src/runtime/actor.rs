//! Per-session actor loop

use super::{CloseReason, RuntimeConfig, SessionEvent, SessionReply, SubmitError};
use crate::interpreter::Interpreter;
use crate::state_machine::{apply, AgentMessage, Outcome, Session, SessionError, Step};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

pub(super) enum Command {
    Submit {
        input: String,
        target: Step,
        reply: oneshot::Sender<Result<SessionReply, SubmitError>>,
    },
}

enum Flow {
    Continue,
    Stop(CloseReason),
}

/// Sole owner of one session's state
pub(super) struct SessionActor {
    pub(super) session: Session,
    pub(super) message: AgentMessage,
    pub(super) interpreter: Arc<dyn Interpreter>,
    pub(super) config: RuntimeConfig,
    pub(super) command_rx: mpsc::Receiver<Command>,
    pub(super) latest_tx: watch::Sender<SessionReply>,
    pub(super) broadcast_tx: broadcast::Sender<SessionEvent>,
    pub(super) abandon: CancellationToken,
    pub(super) shutdown: CancellationToken,
}

impl SessionActor {
    pub(super) async fn run(mut self) {
        let reason = loop {
            // The idle timer restarts with every command
            let idle = tokio::time::sleep(self.config.idle_timeout);

            let flow = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => Flow::Stop(CloseReason::Shutdown),
                () = self.abandon.cancelled() => Flow::Stop(CloseReason::Abandoned),
                command = self.command_rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => Flow::Stop(CloseReason::Abandoned),
                },
                () = idle => Flow::Stop(CloseReason::Expired),
            };

            if let Flow::Stop(reason) = flow {
                break reason;
            }
        };

        // Closing the queue marks the handle dead for the manager
        self.command_rx.close();
        let _ = self.broadcast_tx.send(SessionEvent::Closed { reason });
        tracing::info!(
            session_id = %self.session.id,
            reason = ?reason,
            step = %self.session.current_step,
            "Session closed"
        );
    }

    async fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Submit {
                input,
                target,
                reply,
            } => self.submit(&input, target, reply).await,
        }
    }

    async fn submit(
        &mut self,
        input: &str,
        target: Step,
        mut reply: oneshot::Sender<Result<SessionReply, SubmitError>>,
    ) -> Flow {
        if reply.is_closed() {
            return Flow::Continue;
        }

        let started = Instant::now();
        let timeout = self.config.interpret_timeout;
        let applying = tokio::time::timeout(
            timeout,
            apply(&self.session, input, target, self.interpreter.as_ref()),
        );

        let result = tokio::select! {
            result = applying => result.unwrap_or_else(|_| {
                Err(SessionError::CollaboratorUnavailable(format!(
                    "interpretation timed out after {}s",
                    timeout.as_secs_f64()
                )))
            }),
            () = reply.closed() => {
                tracing::info!(
                    session_id = %self.session.id,
                    step = %self.session.current_step,
                    "Caller went away; discarding in-flight input"
                );
                return Flow::Continue;
            }
            // The dropped reply tells the caller the session is gone
            () = self.shutdown.cancelled() => return Flow::Stop(CloseReason::Shutdown),
            () = self.abandon.cancelled() => return Flow::Stop(CloseReason::Abandoned),
        };

        let duration_ms = started.elapsed().as_millis();

        match result {
            Ok(result) => {
                // Commit only if someone is still waiting for the answer
                if reply.is_closed() {
                    return Flow::Continue;
                }

                let from = self.session.current_step;
                self.session = result.session;
                self.message = result.message;
                let committed = SessionReply {
                    snapshot: self.session.snapshot(),
                    message: self.message.clone(),
                };

                tracing::info!(
                    session_id = %self.session.id,
                    from = %from,
                    to = %self.session.current_step,
                    confidence = %self.session.confidence,
                    duration_ms = %duration_ms,
                    "Input applied"
                );

                self.latest_tx.send_replace(committed.clone());
                let _ = self.broadcast_tx.send(SessionEvent::Updated {
                    reply: committed.clone(),
                    outcome: result.outcome,
                });
                let _ = reply.send(Ok(committed));

                if result.outcome == Outcome::Completed {
                    Flow::Stop(CloseReason::Completed)
                } else {
                    Flow::Continue
                }
            }
            Err(error) => {
                tracing::warn!(
                    session_id = %self.session.id,
                    step = %self.session.current_step,
                    kind = ?error.kind(),
                    retryable = error.is_retryable(),
                    duration_ms = %duration_ms,
                    error = %error,
                    "Input not applied"
                );
                let current = SessionReply {
                    snapshot: self.session.snapshot(),
                    message: error.reprompt(&self.session),
                };
                let _ = reply.send(Err(SubmitError {
                    error,
                    current: Some(current),
                }));
                Flow::Continue
            }
        }
    }
}
