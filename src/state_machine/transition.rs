//! Pure state transition function
//!
//! Given a session snapshot and an event, produce the next snapshot and the
//! agent message for it. No I/O happens here; the interpreter call lives in
//! `apply`, which feeds its verdict back in as an `Event`.

use super::event::{ConfirmationChoice, Event};
use super::message::{AgentMessage, INPUT_TOO_LONG};
use super::state::{Confidence, FieldValue, Session};
use super::step::Step;
use crate::interpreter::Interpretation;
use serde::Serialize;
use thiserror::Error;

/// Confidence recorded when input is too long to consider
const TOO_LONG_CONFIDENCE: f64 = 0.2;

/// Confidence recorded when a declined confirmation restarts collection
const RESTART_CONFIDENCE: f64 = 0.8;

/// What a successful transition did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    /// Input taken; the session moved forward
    Advanced { from: Step, to: Step },
    /// Input not taken; same step, re-prompted
    Rejected { step: Step },
    /// Confirmation declined; collection starts over at `party_size`
    Restarted,
    /// Confirmation accepted
    Completed,
}

/// Result of a state transition
#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub session: Session,
    pub message: AgentMessage,
    pub outcome: Outcome,
}

/// Errors that leave the session exactly as it was
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Input is empty")]
    EmptyInput,
    #[error("Input answers {got} but the session is at {expected}")]
    StepMismatch { expected: Step, got: Step },
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Expected yes or no, got {0:?}")]
    InvalidConfirmationChoice(String),
    #[error("Interpreter unavailable: {0}")]
    CollaboratorUnavailable(String),
    #[error("Reservation already completed")]
    SessionCompleted,
}

/// Stable wire name for each `SessionError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyInput,
    StepMismatch,
    SessionNotFound,
    InvalidConfirmationChoice,
    CollaboratorUnavailable,
    SessionCompleted,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::EmptyInput => "empty_input",
            ErrorKind::StepMismatch => "step_mismatch",
            ErrorKind::SessionNotFound => "session_not_found",
            ErrorKind::InvalidConfirmationChoice => "invalid_confirmation_choice",
            ErrorKind::CollaboratorUnavailable => "collaborator_unavailable",
            ErrorKind::SessionCompleted => "session_completed",
        }
    }
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::EmptyInput => ErrorKind::EmptyInput,
            SessionError::StepMismatch { .. } => ErrorKind::StepMismatch,
            SessionError::SessionNotFound(_) => ErrorKind::SessionNotFound,
            SessionError::InvalidConfirmationChoice(_) => ErrorKind::InvalidConfirmationChoice,
            SessionError::CollaboratorUnavailable(_) => ErrorKind::CollaboratorUnavailable,
            SessionError::SessionCompleted => ErrorKind::SessionCompleted,
        }
    }

    /// Only interpreter outages may be resubmitted verbatim
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::CollaboratorUnavailable(_))
    }

    /// Message asking for fresh input at the session's current step
    pub fn reprompt(&self, session: &Session) -> AgentMessage {
        let step = session.current_step;
        let fields = &session.fields;
        let confidence = session.confidence;
        match self {
            SessionError::EmptyInput => {
                AgentMessage::rejection("Please type a response.", step, fields, confidence)
            }
            SessionError::StepMismatch { .. } => AgentMessage::rejection(
                "That answer was for another question.",
                step,
                fields,
                confidence,
            ),
            SessionError::InvalidConfirmationChoice(_) => {
                AgentMessage::rejection("Please answer yes or no.", step, fields, confidence)
            }
            SessionError::CollaboratorUnavailable(_) => AgentMessage::rejection(
                "Sorry, I couldn't process that. Please try again.",
                step,
                fields,
                confidence,
            ),
            SessionError::SessionNotFound(_) | SessionError::SessionCompleted => {
                AgentMessage::prompt(step, fields, confidence)
            }
        }
    }
}

/// Pure transition function
///
/// Given the same snapshot and event it always yields the same result. On
/// `Err` the caller keeps the snapshot it passed in.
pub fn transition(session: &Session, event: Event) -> Result<TransitionResult, SessionError> {
    if session.completed || session.current_step == Step::Completed {
        return Err(SessionError::SessionCompleted);
    }

    match event {
        Event::InputTooLong => {
            let mut next = session.clone();
            next.confidence = Confidence::saturating(TOO_LONG_CONFIDENCE);
            Ok(TransitionResult {
                session: next,
                message: AgentMessage::new(INPUT_TOO_LONG),
                outcome: Outcome::Rejected {
                    step: session.current_step,
                },
            })
        }

        Event::Confirmed(choice) => {
            if session.current_step != Step::Confirmation {
                return Err(SessionError::StepMismatch {
                    expected: session.current_step,
                    got: Step::Confirmation,
                });
            }
            Ok(confirm(session, choice))
        }

        Event::Interpreted {
            step,
            interpretation,
        } => {
            if step != session.current_step {
                return Err(SessionError::StepMismatch {
                    expected: session.current_step,
                    got: step,
                });
            }
            // Only a parsed yes or no can answer the confirmation step
            if step == Step::Confirmation {
                return Err(SessionError::InvalidConfirmationChoice(
                    "interpreter verdict".to_string(),
                ));
            }
            match interpretation {
                Interpretation::Rejected { reason, confidence } => {
                    let mut next = session.clone();
                    next.confidence = confidence;
                    let message = AgentMessage::rejection(&reason, step, &next.fields, confidence);
                    Ok(TransitionResult {
                        session: next,
                        message,
                        outcome: Outcome::Rejected { step },
                    })
                }
                Interpretation::Accepted {
                    value,
                    confidence,
                    extra,
                } => accept(session, step, value, confidence, extra),
            }
        }
    }
}

fn confirm(session: &Session, choice: ConfirmationChoice) -> TransitionResult {
    let mut next = session.clone();
    match choice {
        ConfirmationChoice::Yes => {
            next.current_step = Step::Completed;
            next.completed = true;
            next.confidence = Confidence::CERTAIN;
            let message = AgentMessage::prompt(Step::Completed, &next.fields, next.confidence);
            TransitionResult {
                session: next,
                message,
                outcome: Outcome::Completed,
            }
        }
        ConfirmationChoice::No => {
            next.current_step = Step::PartySize;
            next.fields.clear();
            next.confidence = Confidence::saturating(RESTART_CONFIDENCE);
            let message = AgentMessage::prompt(Step::PartySize, &next.fields, next.confidence);
            TransitionResult {
                session: next,
                message,
                outcome: Outcome::Restarted,
            }
        }
    }
}

fn accept(
    session: &Session,
    step: Step,
    value: Option<FieldValue>,
    confidence: Confidence,
    extra: Vec<FieldValue>,
) -> Result<TransitionResult, SessionError> {
    let mut next = session.clone();

    match (step.field(), value) {
        (Some(expected), Some(value)) if value.field() == expected => next.fields.set(value),
        (None, None) => {}
        (Some(expected), Some(value)) => {
            return Err(SessionError::CollaboratorUnavailable(format!(
                "interpreter returned {:?} while {expected:?} was requested",
                value.field()
            )));
        }
        (Some(expected), None) => {
            return Err(SessionError::CollaboratorUnavailable(format!(
                "interpreter accepted input without a {expected:?} value"
            )));
        }
        (None, Some(value)) => {
            return Err(SessionError::CollaboratorUnavailable(format!(
                "interpreter returned {:?} for {step}, which collects nothing",
                value.field()
            )));
        }
    }

    // Extras only pre-fill steps that come later in the order.
    for value in extra {
        if value.field().step().order() > step.order() {
            next.fields.set(value);
        }
    }

    let mut to = step.next();
    while let Some(field) = to.field() {
        if !next.fields.is_filled(field) {
            break;
        }
        to = to.next();
    }

    next.current_step = to;
    next.confidence = confidence;
    let message = AgentMessage::prompt(to, &next.fields, confidence);

    Ok(TransitionResult {
        session: next,
        message,
        outcome: Outcome::Advanced { from: step, to },
    })
}
