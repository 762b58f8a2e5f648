//! Reservation steps and their ordinal table
//!
//! The table below is the single source of truth for step ordering. Both
//! advancement in `transition` and progress rendering in `presentation`
//! read it; nothing else derives order from array positions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A step in the reservation dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Greeting,
    PartySize,
    Date,
    Time,
    Name,
    Phone,
    Confirmation,
    Completed,
}

/// A collectible reservation field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PartySize,
    Date,
    Time,
    Name,
    Phone,
}

/// One row of the step-order table
#[derive(Debug, Clone, Copy)]
pub struct StepRow {
    pub step: Step,
    pub order: u8,
    pub field: Option<Field>,
}

const fn step_row(step: Step, order: u8, field: Option<Field>) -> StepRow {
    StepRow { step, order, field }
}

/// Authoritative step-order table
pub const STEP_TABLE: [StepRow; 8] = [
    step_row(Step::Greeting, 1, None),
    step_row(Step::PartySize, 2, Some(Field::PartySize)),
    step_row(Step::Date, 3, Some(Field::Date)),
    step_row(Step::Time, 4, Some(Field::Time)),
    step_row(Step::Name, 5, Some(Field::Name)),
    step_row(Step::Phone, 6, Some(Field::Phone)),
    step_row(Step::Confirmation, 7, None),
    step_row(Step::Completed, 8, None),
];

/// Relation of a step to the session's current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Current,
    Pending,
}

impl Step {
    /// All steps in table order
    pub fn all() -> impl Iterator<Item = Step> + Clone {
        STEP_TABLE.iter().map(|row| row.step)
    }

    fn row(self) -> &'static StepRow {
        // Every variant has exactly one row; the match keeps lookup exhaustive.
        let index = match self {
            Step::Greeting => 0,
            Step::PartySize => 1,
            Step::Date => 2,
            Step::Time => 3,
            Step::Name => 4,
            Step::Phone => 5,
            Step::Confirmation => 6,
            Step::Completed => 7,
        };
        &STEP_TABLE[index]
    }

    /// 1-based ordinal from the step-order table
    pub fn order(self) -> u8 {
        self.row().order
    }

    /// Field written when this step accepts input, if any
    pub fn field(self) -> Option<Field> {
        self.row().field
    }

    /// The step that follows in the fixed order (`Completed` is absorbing)
    pub fn next(self) -> Step {
        let order = self.order();
        STEP_TABLE
            .iter()
            .find(|row| row.order == order + 1)
            .map_or(Step::Completed, |row| row.step)
    }

    /// Whether `self` is completed, current or pending relative to `current`
    pub fn status_relative_to(self, current: Step) -> StepStatus {
        match self.order().cmp(&current.order()) {
            std::cmp::Ordering::Less => StepStatus::Completed,
            std::cmp::Ordering::Equal => StepStatus::Current,
            std::cmp::Ordering::Greater => StepStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Greeting => "greeting",
            Step::PartySize => "party_size",
            Step::Date => "date",
            Step::Time => "time",
            Step::Name => "name",
            Step::Phone => "phone",
            Step::Confirmation => "confirmation",
            Step::Completed => "completed",
        }
    }
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::PartySize,
        Field::Date,
        Field::Time,
        Field::Name,
        Field::Phone,
    ];

    /// The step that collects this field
    pub fn step(self) -> Step {
        match self {
            Field::PartySize => Step::PartySize,
            Field::Date => Step::Date,
            Field::Time => Step::Time,
            Field::Name => Step::Name,
            Field::Phone => Step::Phone,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for Step {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::all()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}
