//! Request and verdict types exchanged with an interpreter

use crate::state_machine::{Confidence, FieldValue, ReservationFields, Step};

/// Input handed to the interpreter for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretRequest {
    pub step: Step,
    /// Trimmed, non-empty, at most 120 characters
    pub raw_input: String,
    pub existing_fields: ReservationFields,
}

/// Interpreter verdict
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    Accepted {
        /// Value for the step's field; `None` for steps that collect nothing
        value: Option<FieldValue>,
        confidence: Confidence,
        /// Values for later fields found in the same input
        extra: Vec<FieldValue>,
    },
    Rejected {
        reason: String,
        confidence: Confidence,
    },
}

impl Interpretation {
    pub fn accepted(value: FieldValue, confidence: Confidence) -> Self {
        Interpretation::Accepted {
            value: Some(value),
            confidence,
            extra: Vec::new(),
        }
    }

    pub fn rejected(reason: impl Into<String>, confidence: Confidence) -> Self {
        Interpretation::Rejected {
            reason: reason.into(),
            confidence,
        }
    }

    pub fn confidence(&self) -> Confidence {
        match self {
            Interpretation::Accepted { confidence, .. }
            | Interpretation::Rejected { confidence, .. } => *confidence,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Interpretation::Rejected { .. })
    }
}
