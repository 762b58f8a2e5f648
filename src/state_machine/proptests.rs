//! Property-based tests for the session state machine
//!
//! These tests check ordering and non-mutation invariants across arbitrary
//! sessions and interpreter verdicts.

use super::*;
use crate::interpreter::Interpretation;
use chrono::{Duration, NaiveDate, NaiveTime};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_confidence() -> impl Strategy<Value = Confidence> {
    (0.0f64..=1.0).prop_map(Confidence::saturating)
}

fn arb_value(field: Field) -> BoxedStrategy<FieldValue> {
    match field {
        Field::PartySize => (1u32..=20).prop_map(FieldValue::PartySize).boxed(),
        Field::Date => (0i64..=90)
            .prop_map(|days| {
                let base = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
                FieldValue::Date(base + Duration::days(days))
            })
            .boxed(),
        Field::Time => (11u32..=22, 0u32..60)
            .prop_map(|(h, m)| FieldValue::Time(NaiveTime::from_hms_opt(h, m, 0).unwrap()))
            .boxed(),
        Field::Name => "[A-Z][a-z]{1,10}".prop_map(FieldValue::Name).boxed(),
        Field::Phone => "[0-9]{10,12}".prop_map(FieldValue::Phone).boxed(),
    }
}

fn arb_any_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        arb_value(Field::PartySize),
        arb_value(Field::Date),
        arb_value(Field::Time),
        arb_value(Field::Name),
        arb_value(Field::Phone),
    ]
}

fn arb_fields() -> impl Strategy<Value = ReservationFields> {
    proptest::collection::vec(arb_any_value(), 0..6).prop_map(|values| {
        let mut fields = ReservationFields::default();
        for value in values {
            fields.set(value);
        }
        fields
    })
}

/// Any step that still accepts input
fn arb_open_step() -> impl Strategy<Value = Step> {
    (0usize..7).prop_map(|index| Step::all().nth(index).unwrap_or(Step::Greeting))
}

fn arb_session() -> impl Strategy<Value = Session> {
    (arb_open_step(), arb_fields(), arb_confidence()).prop_map(
        |(current_step, fields, confidence)| Session {
            id: "prop".to_string(),
            current_step,
            fields,
            confidence,
            completed: false,
        },
    )
}

fn arb_input() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 :-]{1,40}".prop_filter("non-blank", |s| !s.trim().is_empty())
}

/// One guest turn, resolved against whatever step the session is at
#[derive(Debug, Clone)]
struct Turn {
    accept: bool,
    values: Vec<FieldValue>,
    extra: Vec<FieldValue>,
    confidence: Confidence,
    confirm_yes: bool,
    too_long: bool,
}

fn arb_turn() -> impl Strategy<Value = Turn> {
    (
        any::<bool>(),
        (
            arb_value(Field::PartySize),
            arb_value(Field::Date),
            arb_value(Field::Time),
            arb_value(Field::Name),
            arb_value(Field::Phone),
        ),
        proptest::collection::vec(arb_any_value(), 0..3),
        arb_confidence(),
        any::<bool>(),
        prop::bool::weighted(0.1),
    )
        .prop_map(
            |(accept, (p, d, t, n, ph), extra, confidence, confirm_yes, too_long)| Turn {
                accept,
                values: vec![p, d, t, n, ph],
                extra,
                confidence,
                confirm_yes,
                too_long,
            },
        )
}

impl Turn {
    fn event_for(&self, step: Step) -> Event {
        if self.too_long {
            return Event::InputTooLong;
        }
        if step == Step::Confirmation {
            let choice = if self.confirm_yes {
                ConfirmationChoice::Yes
            } else {
                ConfirmationChoice::No
            };
            return Event::Confirmed(choice);
        }
        let interpretation = if self.accept {
            let value = step.field().and_then(|field| {
                self.values.iter().find(|v| v.field() == field).cloned()
            });
            Interpretation::Accepted {
                value,
                confidence: self.confidence,
                extra: self.extra.clone(),
            }
        } else {
            Interpretation::Rejected {
                reason: "Try again.".to_string(),
                confidence: self.confidence,
            }
        };
        Event::Interpreted {
            step,
            interpretation,
        }
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Step order only moves forward, except the confirmation restart
    #[test]
    fn prop_order_never_decreases_except_restart(
        turns in proptest::collection::vec(arb_turn(), 1..30),
    ) {
        let mut session = Session::new("prop");
        for turn in &turns {
            if session.completed {
                break;
            }
            let before = session.current_step;
            let result = transition(&session, turn.event_for(before)).unwrap();
            let after = result.session.current_step;

            if result.outcome == Outcome::Restarted {
                prop_assert_eq!(before, Step::Confirmation);
                prop_assert_eq!(after, Step::PartySize);
                prop_assert_eq!(result.session.fields.filled_count(), 0);
            } else {
                prop_assert!(after.order() >= before.order());
            }
            prop_assert!(after.order() <= Step::Confirmation.order() || result.session.completed);
            session = result.session;
        }
    }

    /// Answers aimed at another step are refused before anything changes
    #[test]
    fn prop_mismatched_target_never_mutates(
        session in arb_session(),
        target in arb_open_step(),
        input in arb_input(),
    ) {
        prop_assume!(target != session.current_step);
        let err = prepare(&session, &input, target).unwrap_err();
        prop_assert_eq!(
            err,
            SessionError::StepMismatch { expected: session.current_step, got: target }
        );
    }

    /// Whitespace-only input is always `EmptyInput`
    #[test]
    fn prop_blank_input_is_empty(
        session in arb_session(),
        blank in "[ \t\n]{0,10}",
    ) {
        let target = session.current_step;
        prop_assert_eq!(prepare(&session, &blank, target), Err(SessionError::EmptyInput));
    }

    /// Rejections keep fields and step, only confidence changes
    #[test]
    fn prop_rejection_keeps_fields(session in arb_session(), confidence in arb_confidence()) {
        prop_assume!(session.current_step != Step::Confirmation);
        let step = session.current_step;
        let result = transition(&session, Event::Interpreted {
            step,
            interpretation: Interpretation::Rejected { reason: "No.".to_string(), confidence },
        }).unwrap();
        prop_assert_eq!(&result.session.fields, &session.fields);
        prop_assert_eq!(result.session.current_step, step);
        prop_assert_eq!(result.session.confidence, confidence);
    }

    /// Accepting confirmation keeps the collected fields
    #[test]
    fn prop_confirm_yes_keeps_fields(fields in arb_fields()) {
        let session = Session {
            current_step: Step::Confirmation,
            fields: fields.clone(),
            ..Session::new("prop")
        };
        let result = transition(&session, Event::Confirmed(ConfirmationChoice::Yes)).unwrap();
        prop_assert!(result.session.completed);
        prop_assert_eq!(result.session.current_step, Step::Completed);
        prop_assert_eq!(result.session.fields, fields);
    }

    /// A completed step always means a completed session
    #[test]
    fn prop_interpreter_never_completes_session(
        fields in arb_fields(),
        value in proptest::option::of(arb_any_value()),
        confidence in arb_confidence(),
    ) {
        let session = Session {
            current_step: Step::Confirmation,
            fields,
            ..Session::new("prop")
        };
        let result = transition(&session, Event::Interpreted {
            step: Step::Confirmation,
            interpretation: Interpretation::Accepted { value, confidence, extra: vec![] },
        });
        prop_assert_eq!(
            result.map(|r| r.session.current_step).map_err(|e| e.kind()),
            Err(ErrorKind::InvalidConfirmationChoice)
        );
    }

    /// Percentage is twenty points per filled field
    #[test]
    fn prop_progress_percentage_counts_fields(fields in arb_fields()) {
        let expected = u8::try_from(fields.filled_count() * 20).unwrap();
        prop_assert_eq!(fields.progress_percentage(), expected);
    }

    /// Input longer than the cap never reaches the interpreter
    #[test]
    fn prop_long_input_is_too_long(session in arb_session(), extra in 1usize..50) {
        let input = "x".repeat(MAX_INPUT_CHARS + extra);
        let target = session.current_step;
        prop_assert_eq!(prepare(&session, &input, target), Ok(Prepared::TooLong));
    }
}
