//! Events that drive session transitions

use super::step::Step;
use crate::interpreter::Interpretation;
use serde::{Deserialize, Serialize};

/// Guest answer to the confirmation prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationChoice {
    Yes,
    No,
}

impl ConfirmationChoice {
    /// Case-insensitive match against exactly `yes` / `no`
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("yes") {
            Some(Self::Yes)
        } else if input.eq_ignore_ascii_case("no") {
            Some(Self::No)
        } else {
            None
        }
    }
}

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Interpreter verdict on input for `step`
    Interpreted {
        step: Step,
        interpretation: Interpretation,
    },
    /// Guest answered the confirmation prompt
    Confirmed(ConfirmationChoice),
    /// Raw input exceeded the length cap and never reached the interpreter
    InputTooLong,
}
