//! Mock interpreters for testing
//!
//! These mocks let the session core and the runtime run without a model.

use crate::interpreter::{InterpretError, InterpretRequest, Interpretation, Interpreter};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{Notify, Semaphore};

// ============================================================================
// Mock Interpreter
// ============================================================================

/// Mock interpreter that returns queued verdicts
pub struct MockInterpreter {
    verdicts: Mutex<VecDeque<Result<Interpretation, InterpretError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<InterpretRequest>>,
}

impl MockInterpreter {
    pub fn new() -> Self {
        Self {
            verdicts: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a verdict
    pub fn queue(&self, verdict: Interpretation) {
        self.verdicts.lock().unwrap().push_back(Ok(verdict));
    }

    /// Queue an error
    pub fn queue_error(&self, error: InterpretError) {
        self.verdicts.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<InterpretRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interpreter for MockInterpreter {
    async fn interpret(
        &self,
        request: &InterpretRequest,
    ) -> Result<Interpretation, InterpretError> {
        self.requests.lock().unwrap().push(request.clone());
        self.verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InterpretError::network("No mock verdict queued")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ============================================================================
// Gated Interpreter
// ============================================================================

/// Mock interpreter that holds each request until the test releases it
pub struct GatedInterpreter {
    inner: MockInterpreter,
    gate: Semaphore,
    /// Signalled whenever a request reaches the gate
    pub started: Notify,
}

impl GatedInterpreter {
    pub fn new() -> Self {
        Self {
            inner: MockInterpreter::new(),
            gate: Semaphore::new(0),
            started: Notify::new(),
        }
    }

    pub fn queue(&self, verdict: Interpretation) {
        self.inner.queue(verdict);
    }

    /// Let one waiting (or future) request through
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn recorded_requests(&self) -> Vec<InterpretRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl Interpreter for GatedInterpreter {
    async fn interpret(
        &self,
        request: &InterpretRequest,
    ) -> Result<Interpretation, InterpretError> {
        self.started.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| InterpretError::network("gate closed"))?;
        permit.forget();
        self.inner.interpret(request).await
    }

    fn name(&self) -> &str {
        "gated"
    }
}

// ============================================================================
// Stalled Interpreter
// ============================================================================

/// Never answers
pub struct StalledInterpreter;

#[async_trait]
impl Interpreter for StalledInterpreter {
    async fn interpret(
        &self,
        _request: &InterpretRequest,
    ) -> Result<Interpretation, InterpretError> {
        std::future::pending().await
    }

    fn name(&self) -> &str {
        "stalled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::RuleInterpreter;
    use crate::runtime::{CloseReason, RuntimeConfig, SessionEvent, SessionManager};
    use crate::state_machine::{Confidence, ErrorKind, FieldValue, Outcome, SessionError, Step};
    use chrono::NaiveDate;
    use std::sync::Arc;
    use std::time::Duration;

    fn config() -> RuntimeConfig {
        RuntimeConfig {
            interpret_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
        }
    }

    fn rules_manager() -> SessionManager {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        SessionManager::new(Arc::new(RuleInterpreter::with_today(today)), config())
    }

    /// Wait for the exited actors to drop out of the session map
    async fn wait_for_empty_map(manager: &SessionManager) {
        for _ in 0..100 {
            if manager.sessions.read().await.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("closed sessions still in the map");
    }

    fn greeting_verdict() -> Interpretation {
        Interpretation::Accepted {
            value: None,
            confidence: Confidence::new(0.95).unwrap(),
            extra: vec![],
        }
    }

    #[tokio::test]
    async fn test_mock_interpreter_queue() {
        let mock = MockInterpreter::new();
        mock.queue(greeting_verdict());

        let request = InterpretRequest {
            step: Step::Greeting,
            raw_input: "Patio".to_string(),
            existing_fields: Default::default(),
        };
        assert_eq!(mock.interpret(&request).await.unwrap(), greeting_verdict());

        // Nothing left queued
        assert!(mock.interpret(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_full_dialogue_discards_completed_session() {
        let manager = rules_manager();
        let start = manager.create().await;
        let id = start.snapshot.id.clone();
        assert_eq!(start.snapshot.current_step, Step::Greeting);

        let turns = [
            ("Window", Step::Greeting),
            ("4", Step::PartySize),
            ("2024-06-01", Step::Date),
            ("19:00", Step::Time),
            ("Ana", Step::Name),
            ("555-121-2000", Step::Phone),
        ];
        for (input, step) in turns {
            let reply = manager.submit(&id, input.to_string(), step).await.unwrap();
            assert_eq!(reply.snapshot.current_step, step.next());
        }

        let (_, mut events) = manager.subscribe(&id).await.unwrap();
        let done = manager
            .submit(&id, "YES".to_string(), Step::Confirmation)
            .await
            .unwrap();
        assert!(done.snapshot.completed);
        assert_eq!(done.snapshot.progress_percentage, 100);

        match events.recv().await.unwrap() {
            SessionEvent::Updated { outcome, .. } => assert_eq!(outcome, Outcome::Completed),
            other => panic!("expected update, got {other:?}"),
        }
        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason } => assert_eq!(reason, CloseReason::Completed),
            other => panic!("expected close, got {other:?}"),
        }

        let err = manager.snapshot(&id).await.unwrap_err();
        assert_eq!(err, SessionError::SessionNotFound(id.clone()));
        let err = manager
            .submit(&id, "yes".to_string(), Step::Confirmation)
            .await
            .unwrap_err();
        assert_eq!(err.error.kind(), ErrorKind::SessionNotFound);
        assert!(err.current.is_none());
        wait_for_empty_map(&manager).await;
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let manager = rules_manager();
        let err = manager
            .submit("nope", "4".to_string(), Step::PartySize)
            .await
            .unwrap_err();
        assert_eq!(err.error, SessionError::SessionNotFound("nope".to_string()));
        assert!(manager.abandon("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_error_returns_unchanged_snapshot_with_reprompt() {
        let manager = rules_manager();
        let start = manager.create().await;
        let id = start.snapshot.id.clone();

        let err = manager
            .submit(&id, "   ".to_string(), Step::Greeting)
            .await
            .unwrap_err();
        assert_eq!(err.error, SessionError::EmptyInput);
        let current = err.current.unwrap();
        assert_eq!(current.snapshot, start.snapshot);
        assert!(current.message.as_str().starts_with("Please type a response."));

        assert_eq!(manager.snapshot(&id).await.unwrap().snapshot, start.snapshot);
    }

    #[tokio::test]
    async fn test_timeout_leaves_session_unchanged() {
        let manager = SessionManager::new(
            Arc::new(StalledInterpreter),
            RuntimeConfig {
                interpret_timeout: Duration::from_millis(50),
                idle_timeout: Duration::from_secs(60),
            },
        );
        let start = manager.create().await;
        let id = start.snapshot.id.clone();

        let err = manager
            .submit(&id, "Patio".to_string(), Step::Greeting)
            .await
            .unwrap_err();
        assert_eq!(err.error.kind(), ErrorKind::CollaboratorUnavailable);
        assert!(err.error.is_retryable());
        assert_eq!(manager.snapshot(&id).await.unwrap().snapshot, start.snapshot);
    }

    #[tokio::test]
    async fn test_dropped_caller_discards_in_flight_input() {
        let gated = Arc::new(GatedInterpreter::new());
        let manager = Arc::new(SessionManager::new(gated.clone(), config()));
        let start = manager.create().await;
        let id = start.snapshot.id.clone();

        gated.queue(greeting_verdict());
        let task = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move {
                manager
                    .submit(&id, "Patio".to_string(), Step::Greeting)
                    .await
            })
        };
        gated.started.notified().await;
        task.abort();
        let _ = task.await;

        // The queued verdict was never consumed, so the retry can use it
        let retry = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move {
                manager
                    .submit(&id, "Patio".to_string(), Step::Greeting)
                    .await
            })
        };
        gated.started.notified().await;
        assert_eq!(manager.snapshot(&id).await.unwrap().snapshot, start.snapshot);

        gated.release();
        let reply = retry.await.unwrap().unwrap();
        assert_eq!(reply.snapshot.current_step, Step::PartySize);
        assert_eq!(gated.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_submits_are_serialized() {
        let manager = rules_manager();
        let start = manager.create().await;
        let id = start.snapshot.id.clone();
        manager
            .submit(&id, "Bar".to_string(), Step::Greeting)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            manager.submit(&id, "4".to_string(), Step::PartySize),
            manager.submit(&id, "4".to_string(), Step::PartySize),
        );
        let results = [a, b];
        let advanced = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(advanced, 1);

        let mismatch = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(
            mismatch.error,
            SessionError::StepMismatch {
                expected: Step::Date,
                got: Step::PartySize
            }
        );

        let latest = manager.snapshot(&id).await.unwrap().snapshot;
        assert_eq!(latest.current_step, Step::Date);
        assert_eq!(latest.fields.party_size, Some(4));
    }

    #[tokio::test]
    async fn test_pre_filled_extras_skip_steps() {
        let mock = Arc::new(MockInterpreter::new());
        let manager = SessionManager::new(mock.clone(), config());
        let id = manager.create().await.snapshot.id;

        mock.queue(greeting_verdict());
        manager
            .submit(&id, "Patio".to_string(), Step::Greeting)
            .await
            .unwrap();

        mock.queue(Interpretation::Accepted {
            value: Some(FieldValue::PartySize(2)),
            confidence: Confidence::new(0.9).unwrap(),
            extra: vec![FieldValue::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())],
        });
        let reply = manager
            .submit(&id, "2 of us on June 1st".to_string(), Step::PartySize)
            .await
            .unwrap();
        assert_eq!(reply.snapshot.current_step, Step::Time);
        assert_eq!(reply.snapshot.progress_percentage, 40);
    }

    #[tokio::test]
    async fn test_abandon_closes_stream() {
        let manager = rules_manager();
        let id = manager.create().await.snapshot.id;
        let (latest, mut events) = manager.subscribe(&id).await.unwrap();
        assert_eq!(latest.snapshot.current_step, Step::Greeting);

        manager.abandon(&id).await.unwrap();
        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason } => assert_eq!(reason, CloseReason::Abandoned),
            other => panic!("expected close, got {other:?}"),
        }
        assert!(manager.snapshot(&id).await.is_err());
        assert_eq!(manager.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_idle_session_expires() {
        let manager = SessionManager::new(
            Arc::new(MockInterpreter::new()),
            RuntimeConfig {
                interpret_timeout: Duration::from_secs(5),
                idle_timeout: Duration::from_millis(30),
            },
        );
        let id = manager.create().await.snapshot.id;
        let (_, mut events) = manager.subscribe(&id).await.unwrap();

        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason } => assert_eq!(reason, CloseReason::Expired),
            other => panic!("expected close, got {other:?}"),
        }
        wait_for_empty_map(&manager).await;
        assert!(manager.snapshot(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_stops_all_sessions() {
        let manager = rules_manager();
        let first = manager.create().await.snapshot.id;
        let second = manager.create().await.snapshot.id;
        let (_, mut events) = manager.subscribe(&first).await.unwrap();

        manager.shutdown();
        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason } => assert_eq!(reason, CloseReason::Shutdown),
            other => panic!("expected close, got {other:?}"),
        }
        wait_for_empty_map(&manager).await;
        assert!(manager.snapshot(&second).await.is_err());
    }

    #[tokio::test]
    async fn test_abandon_interrupts_in_flight_input() {
        let gated = Arc::new(GatedInterpreter::new());
        let manager = Arc::new(SessionManager::new(gated.clone(), config()));
        let id = manager.create().await.snapshot.id;
        let (_, mut events) = manager.subscribe(&id).await.unwrap();

        let task = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move {
                manager
                    .submit(&id, "Patio".to_string(), Step::Greeting)
                    .await
            })
        };
        gated.started.notified().await;
        manager.abandon(&id).await.unwrap();

        // Well inside the five second interpret timeout
        let err = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("submit still waiting on the interpreter")
            .unwrap()
            .unwrap_err();
        assert_eq!(err.error.kind(), ErrorKind::SessionNotFound);
        match events.recv().await.unwrap() {
            SessionEvent::Closed { reason } => assert_eq!(reason, CloseReason::Abandoned),
            other => panic!("expected close, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_in_flight_input() {
        let gated = Arc::new(GatedInterpreter::new());
        let manager = Arc::new(SessionManager::new(gated.clone(), config()));
        let id = manager.create().await.snapshot.id;
        let (_, mut events) = manager.subscribe(&id).await.unwrap();

        let task = {
            let manager = Arc::clone(&manager);
            let id = id.clone();
            tokio::spawn(async move {
                manager
                    .submit(&id, "Patio".to_string(), Step::Greeting)
                    .await
            })
        };
        gated.started.notified().await;
        manager.shutdown();

        let closed = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("actor still waiting on the interpreter")
            .unwrap();
        assert!(matches!(
            closed,
            SessionEvent::Closed {
                reason: CloseReason::Shutdown
            }
        ));
        assert!(task.await.unwrap().is_err());
        wait_for_empty_map(&manager).await;
    }
}
