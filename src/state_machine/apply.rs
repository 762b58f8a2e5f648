//! Input validation and the interpreter round-trip
//!
//! `apply` never mutates the session it is given. It returns the next
//! snapshot, so dropping the future mid-flight leaves the caller's copy as it
//! was before the call.

use super::event::{ConfirmationChoice, Event};
use super::state::Session;
use super::step::Step;
use super::transition::{transition, SessionError, TransitionResult};
use crate::interpreter::{InterpretRequest, Interpreter};

/// Longest raw input passed on, in characters
pub const MAX_INPUT_CHARS: usize = 120;

/// What to do with validated input
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    /// Ask the interpreter
    Interpret(InterpretRequest),
    /// Confirmation answered; no interpreter needed
    Confirm(ConfirmationChoice),
    /// Over the length cap; rejected without asking
    TooLong,
}

/// Check `raw_input` against the session without touching it
pub fn prepare(session: &Session, raw_input: &str, target: Step) -> Result<Prepared, SessionError> {
    let input = raw_input.trim();
    if input.is_empty() {
        return Err(SessionError::EmptyInput);
    }
    if session.completed || session.current_step == Step::Completed {
        return Err(SessionError::SessionCompleted);
    }
    if target != session.current_step {
        return Err(SessionError::StepMismatch {
            expected: session.current_step,
            got: target,
        });
    }
    if input.chars().count() > MAX_INPUT_CHARS {
        return Ok(Prepared::TooLong);
    }

    if target == Step::Confirmation {
        return ConfirmationChoice::parse(input)
            .map(Prepared::Confirm)
            .ok_or_else(|| SessionError::InvalidConfirmationChoice(input.to_string()));
    }

    Ok(Prepared::Interpret(InterpretRequest {
        step: target,
        raw_input: input.to_string(),
        existing_fields: session.fields.clone(),
    }))
}

/// Validate, interpret and transition
///
/// The interpreter await is the only suspension point.
pub async fn apply<I>(
    session: &Session,
    raw_input: &str,
    target: Step,
    interpreter: &I,
) -> Result<TransitionResult, SessionError>
where
    I: Interpreter + ?Sized,
{
    let event = match prepare(session, raw_input, target)? {
        Prepared::TooLong => Event::InputTooLong,
        Prepared::Confirm(choice) => Event::Confirmed(choice),
        Prepared::Interpret(request) => {
            let interpretation = interpreter
                .interpret(&request)
                .await
                .map_err(|e| SessionError::CollaboratorUnavailable(e.to_string()))?;
            Event::Interpreted {
                step: request.step,
                interpretation,
            }
        }
    };

    transition(session, event)
}
