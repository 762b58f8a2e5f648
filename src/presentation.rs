//! View state derived from a session snapshot
//!
//! Everything here is a pure function of the snapshot. Ordering comes from
//! the step-order table in `state_machine::step`.

use crate::state_machine::{AgentMessage, SessionSnapshot, Step, StepStatus};
use serde::Serialize;

/// Hard cap on displayed agent text, in characters
pub const MESSAGE_CHAR_LIMIT: usize = 120;

const ELLIPSIS: &str = "...";

const GENERIC_PLACEHOLDER: &str = "Enter your response";

// ============================================================================
// Progress
// ============================================================================

/// One progress indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub step: Step,
    pub order: u8,
    pub label: &'static str,
    pub status: StepStatus,
}

pub fn step_label(step: Step) -> &'static str {
    match step {
        Step::Greeting => "Start",
        Step::PartySize => "Guests",
        Step::Date => "Date",
        Step::Time => "Time",
        Step::Name => "Name",
        Step::Phone => "Contact",
        Step::Confirmation => "Confirm",
        Step::Completed => "Done",
    }
}

/// Eight indicators in step order
///
/// Lazy and `Clone`, so a caller can walk it again from the start.
pub fn progress(current: Step) -> impl Iterator<Item = ProgressEntry> + Clone {
    Step::all().map(move |step| ProgressEntry {
        step,
        order: step.order(),
        label: step_label(step),
        status: step.status_relative_to(current),
    })
}

// ============================================================================
// Input affordance
// ============================================================================

/// What the client should offer for the next reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputAffordance {
    Text { placeholder: &'static str },
    Date { placeholder: &'static str },
    Time { placeholder: &'static str },
    /// Two buttons instead of a text box
    Choice { options: [&'static str; 2] },
    /// Dialogue is over
    None,
}

/// Input type for the step's widget: date and time steps get typed inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    Text,
    Date,
    Time,
}

pub fn widget_kind(step: Step) -> WidgetKind {
    match step {
        Step::Date => WidgetKind::Date,
        Step::Time => WidgetKind::Time,
        _ => WidgetKind::Text,
    }
}

pub fn placeholder(step: Step) -> &'static str {
    match step {
        Step::PartySize => "Number of guests (1-20)",
        Step::Date => "Select date (YYYY-MM-DD)",
        Step::Time => "Select time (HH:MM)",
        Step::Name => "Your full name",
        Step::Phone => "Your phone number",
        Step::Greeting | Step::Confirmation | Step::Completed => GENERIC_PLACEHOLDER,
    }
}

pub fn input_affordance(step: Step) -> InputAffordance {
    match step {
        Step::Confirmation => InputAffordance::Choice {
            options: ["yes", "no"],
        },
        Step::Completed => InputAffordance::None,
        _ => {
            let placeholder = placeholder(step);
            match widget_kind(step) {
                WidgetKind::Date => InputAffordance::Date { placeholder },
                WidgetKind::Time => InputAffordance::Time { placeholder },
                WidgetKind::Text => InputAffordance::Text { placeholder },
            }
        }
    }
}

// ============================================================================
// Message and confidence
// ============================================================================

/// Cap `message` at 120 characters: longer text keeps 117 plus `...`
pub fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MESSAGE_CHAR_LIMIT {
        return message.to_string();
    }
    let keep = MESSAGE_CHAR_LIMIT - ELLIPSIS.len();
    let mut out: String = message.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceLabel {
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    /// `< 0.7` Low, `[0.7, 0.9)` Medium, `>= 0.9` High
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < 0.7 {
            Self::Low
        } else if confidence < 0.9 {
            Self::Medium
        } else {
            Self::High
        }
    }
}

// ============================================================================
// Combined view
// ============================================================================

/// Everything a client needs to render one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub progress: Vec<ProgressEntry>,
    pub progress_percentage: u8,
    pub input: InputAffordance,
    pub message: String,
    pub confidence: f64,
    pub confidence_label: ConfidenceLabel,
    pub completed: bool,
}

impl View {
    pub fn derive(snapshot: &SessionSnapshot, message: &AgentMessage) -> Self {
        let confidence = snapshot.confidence.value();
        Self {
            progress: progress(snapshot.current_step).collect(),
            progress_percentage: snapshot.progress_percentage,
            input: input_affordance(snapshot.current_step),
            message: truncate_message(message.as_str()),
            confidence,
            confidence_label: ConfidenceLabel::from_confidence(confidence),
            completed: snapshot.completed,
        }
    }
}
