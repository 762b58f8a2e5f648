//! Deterministic rule-based interpreter
//!
//! Parses each field with fixed formats and business-hour limits. Used when
//! no LLM is configured and as the reference behavior in tests.

use super::{InterpretError, InterpretRequest, Interpretation, Interpreter};
use crate::state_machine::{Confidence, FieldValue, Step};
use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveTime, Timelike};

pub const MAX_PARTY_SIZE: u32 = 20;
pub const BOOKING_WINDOW_DAYS: i64 = 90;
pub const FIRST_SEATING_HOUR: u32 = 11;
pub const LAST_SEATING_HOUR: u32 = 22;
pub const MIN_PHONE_DIGITS: usize = 10;
pub const MIN_NAME_CHARS: usize = 2;

const SEATING_HOURS: std::ops::RangeInclusive<u32> = FIRST_SEATING_HOUR..=LAST_SEATING_HOUR;

fn conf(value: f64) -> Confidence {
    Confidence::saturating(value)
}

/// Rule-based interpreter
#[derive(Debug, Clone, Default)]
pub struct RuleInterpreter {
    /// Fixed "today" for the booking window; local date when unset
    today: Option<NaiveDate>,
}

impl RuleInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the booking window to `today`
    #[allow(dead_code)] // Used by tests
    pub fn with_today(today: NaiveDate) -> Self {
        Self { today: Some(today) }
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Judge one input for `step`
    pub fn judge(&self, step: Step, input: &str) -> Result<Interpretation, InterpretError> {
        let (parsed, confidence) = match step {
            Step::Greeting => {
                return Ok(Interpretation::Accepted {
                    value: None,
                    confidence: conf(0.95),
                    extra: Vec::new(),
                });
            }
            Step::PartySize => (party_size(input), 0.9),
            Step::Date => (date(input), 0.85),
            Step::Time => (time(input), 0.9),
            Step::Name => (Ok(FieldValue::Name(input.to_string())), 0.95),
            Step::Phone => (Ok(FieldValue::Phone(normalize_phone(input))), 0.98),
            Step::Confirmation | Step::Completed => {
                return Err(InterpretError::invalid_request(format!(
                    "no interpretation for step {step}"
                )));
            }
        };

        let verdict = match parsed {
            Ok(value) => bounds_rejection(&value, self.today())
                .unwrap_or_else(|| Interpretation::accepted(value, conf(confidence))),
            Err(rejection) => rejection,
        };
        Ok(verdict)
    }
}

/// Rejection for a well-formed value that breaks a booking limit
///
/// Dates are measured from `today`. `None` means the value may be stored.
pub fn bounds_rejection(value: &FieldValue, today: NaiveDate) -> Option<Interpretation> {
    let rejection = match value {
        FieldValue::PartySize(size) if !(1..=MAX_PARTY_SIZE).contains(size) => {
            Interpretation::rejected(
                format!("We seat parties of 1 to {MAX_PARTY_SIZE}."),
                conf(0.3),
            )
        }
        FieldValue::Date(date)
            if !(0..=BOOKING_WINDOW_DAYS).contains(&(*date - today).num_days()) =>
        {
            Interpretation::rejected(
                format!("Please pick a date within the next {BOOKING_WINDOW_DAYS} days."),
                conf(0.5),
            )
        }
        FieldValue::Time(time) if !SEATING_HOURS.contains(&time.hour()) => Interpretation::rejected(
            format!("We seat guests between {FIRST_SEATING_HOUR}:00 and {LAST_SEATING_HOUR}:59."),
            conf(0.7),
        ),
        FieldValue::Name(name) if name.chars().count() < MIN_NAME_CHARS => {
            Interpretation::rejected("Please enter your full name.", conf(0.5))
        }
        FieldValue::Phone(digits) if digits.len() < MIN_PHONE_DIGITS => Interpretation::rejected(
            format!("Please enter a phone number with at least {MIN_PHONE_DIGITS} digits."),
            conf(0.6),
        ),
        _ => return None,
    };
    Some(rejection)
}

fn party_size(input: &str) -> Result<FieldValue, Interpretation> {
    let size = input
        .parse::<i64>()
        .map_err(|_| Interpretation::rejected("Please enter the number of guests.", conf(0.4)))?;
    // Negative and oversized counts fail the range check
    Ok(FieldValue::PartySize(u32::try_from(size.max(0)).unwrap_or(u32::MAX)))
}

fn date(input: &str) -> Result<FieldValue, Interpretation> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(FieldValue::Date)
        .map_err(|_| Interpretation::rejected("Please use the format YYYY-MM-DD.", conf(0.4)))
}

fn time(input: &str) -> Result<FieldValue, Interpretation> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .map(FieldValue::Time)
        .map_err(|_| Interpretation::rejected("Please use the format HH:MM.", conf(0.4)))
}

/// Digits only, e.g. `(555) 121-2000` becomes `5551212000`
pub fn normalize_phone(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

#[async_trait]
impl Interpreter for RuleInterpreter {
    async fn interpret(
        &self,
        request: &InterpretRequest,
    ) -> Result<Interpretation, InterpretError> {
        self.judge(request.step, &request.raw_input)
    }

    fn name(&self) -> &str {
        "rules"
    }
}
