//! Session state types

use super::step::{Field, Step};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Confidence
// ============================================================================

/// Certainty of the most recent interpretation, always within [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const CERTAIN: Confidence = Confidence(1.0);

    /// Returns `None` for NaN or values outside [0, 1]
    pub fn new(value: f64) -> Option<Self> {
        (0.0..=1.0).contains(&value).then_some(Self(value))
    }

    /// Clamp into [0, 1]; NaN becomes 0
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            Self(0.0)
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::CERTAIN
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> f64 {
        c.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::new(value).ok_or_else(|| format!("confidence {value} is outside [0, 1]"))
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ============================================================================
// Field values
// ============================================================================

/// A typed value extracted for one reservation field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    PartySize(u32),
    Date(NaiveDate),
    Time(#[serde(with = "hhmm")] NaiveTime),
    Name(String),
    Phone(String),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::PartySize(_) => Field::PartySize,
            FieldValue::Date(_) => Field::Date,
            FieldValue::Time(_) => Field::Time,
            FieldValue::Name(_) => Field::Name,
            FieldValue::Phone(_) => Field::Phone,
        }
    }
}

/// Collected reservation fields; `None` means not yet collected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationFields {
    pub party_size: Option<u32>,
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub time: Option<NaiveTime>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

impl ReservationFields {
    /// Write a value, overwriting any earlier value for the same field
    pub fn set(&mut self, value: FieldValue) {
        match value {
            FieldValue::PartySize(v) => self.party_size = Some(v),
            FieldValue::Date(v) => self.date = Some(v),
            FieldValue::Time(v) => self.time = Some(v),
            FieldValue::Name(v) => self.name = Some(v),
            FieldValue::Phone(v) => self.phone = Some(v),
        }
    }

    pub fn is_filled(&self, field: Field) -> bool {
        match field {
            Field::PartySize => self.party_size.is_some(),
            Field::Date => self.date.is_some(),
            Field::Time => self.time.is_some(),
            Field::Name => self.name.is_some(),
            Field::Phone => self.phone.is_some(),
        }
    }

    pub fn filled_count(&self) -> usize {
        Field::ALL.iter().filter(|f| self.is_filled(**f)).count()
    }

    /// Share of the five fields collected, as a whole percentage
    pub fn progress_percentage(&self) -> u8 {
        let filled = self.filled_count();
        let pct = filled * 100 / Field::ALL.len();
        u8::try_from(pct.min(100)).unwrap_or(100)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

// ============================================================================
// Session
// ============================================================================

/// Conversation state for one reservation dialogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub current_step: Step,
    pub fields: ReservationFields,
    pub confidence: Confidence,
    pub completed: bool,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            current_step: Step::Greeting,
            fields: ReservationFields::default(),
            confidence: Confidence::CERTAIN,
            completed: false,
        }
    }

    /// Read-only projection handed to clients
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            current_step: self.current_step,
            fields: self.fields.clone(),
            confidence: self.confidence,
            completed: self.completed,
            progress_percentage: self.fields.progress_percentage(),
        }
    }
}

/// Client-visible session snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub current_step: Step,
    pub fields: ReservationFields,
    pub confidence: Confidence,
    pub completed: bool,
    pub progress_percentage: u8,
}

/// `HH:MM` serialization for reservation times
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)] // serde `with` signature
        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => s.collect_str(&t.format(super::FORMAT)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| {
                    NaiveTime::parse_from_str(&raw, super::FORMAT).map_err(serde::de::Error::custom)
                })
                .transpose()
        }
    }
}
