//! Reservation session state machine
//!
//! Pure transitions over `Session` snapshots, with the interpreter round-trip
//! kept at the edge in `apply`.

mod apply;
pub mod event;
mod message;
pub mod state;
pub mod step;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use apply::{apply, prepare, Prepared, MAX_INPUT_CHARS};
pub use event::{ConfirmationChoice, Event};
pub use message::AgentMessage;
pub use state::{Confidence, FieldValue, ReservationFields, Session, SessionSnapshot};
pub use step::{Field, Step, StepStatus};
pub use transition::{transition, ErrorKind, Outcome, SessionError, TransitionResult};

/// Begin a new session at the greeting step
pub fn start() -> (Session, AgentMessage) {
    let session = Session::new(uuid::Uuid::new_v4().to_string());
    let message = AgentMessage::prompt(Step::Greeting, &session.fields, session.confidence);
    (session, message)
}
