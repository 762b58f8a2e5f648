//! Agent prompts for each step

use super::state::{Confidence, ReservationFields};
use super::step::Step;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Below this confidence the agent asks the guest to double-check
pub const UNSURE_BELOW: f64 = 0.7;

const UNSURE_SUFFIX: &str = " [?] Sure?";

pub const INPUT_TOO_LONG: &str = "Input too long! Max 120 characters.";

pub const GREETING: &str =
    "What's your seating preference? e.g Window Seat, Bar, Patio, Quiet, High-top, No Preference";

/// Natural-language text shown to the guest for one turn
///
/// Stored untruncated; `presentation::truncate_message` applies the display cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentMessage(String);

impl AgentMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Prompt for `step`, flagged when `confidence` is low
    pub fn prompt(step: Step, fields: &ReservationFields, confidence: Confidence) -> Self {
        let mut text = prompt_text(step, fields);
        if confidence.value() < UNSURE_BELOW {
            text.push_str(UNSURE_SUFFIX);
        }
        Self(text)
    }

    /// Re-prompt for the same step, leading with why the input was not taken
    pub fn rejection(
        reason: &str,
        step: Step,
        fields: &ReservationFields,
        confidence: Confidence,
    ) -> Self {
        let prompt = Self::prompt(step, fields, confidence);
        let reason = reason.trim();
        if reason.is_empty() {
            prompt
        } else {
            Self(format!("{reason} {}", prompt.0))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AgentMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn prompt_text(step: Step, fields: &ReservationFields) -> String {
    match step {
        Step::Greeting => GREETING.to_string(),
        Step::PartySize => "How many guests? (1-20)".to_string(),
        Step::Date => "What date? (YYYY-MM-DD)".to_string(),
        Step::Time => "What time? (HH:MM, 11AM-10PM)".to_string(),
        Step::Name => "Your name?".to_string(),
        Step::Phone => "Your phone number?".to_string(),
        Step::Confirmation => confirmation_text(fields),
        Step::Completed => "Reservation confirmed! See you soon.".to_string(),
    }
}

fn confirmation_text(fields: &ReservationFields) -> String {
    fn or_missing<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "?".to_string(), |v| v.to_string())
    }

    format!(
        "Confirm: {} on {} at {}, {}, {}? (Yes/No)",
        or_missing(fields.party_size),
        or_missing(fields.date),
        or_missing(fields.time.map(|t| t.format("%H:%M"))),
        or_missing(fields.name.as_deref()),
        or_missing(fields.phone.as_deref()),
    )
}
