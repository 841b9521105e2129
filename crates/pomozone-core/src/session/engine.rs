//! Focus-session engine.
//!
//! A perpetual work/break cycle driven by explicit commands. Persistence is
//! delegated to a [`SessionStore`]; the engine only changes state once the
//! store has confirmed the write.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start_work--> Running(Work) --complete--> Running(Break) --complete--> Idle
//!   \--start_break--> Running(Break) ------------------------------^
//! ```
//!
//! Completing a break raises the "break finished" flag. The flag stays up
//! until [`FocusSessionEngine::reset_completion_flag`] is called, and a later
//! break completion will not raise it again before that.
//!
//! Commands take `&mut self`, so callers serialize them by construction.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::model::{
    clamp_work_minutes, BreakKind, FocusSession, Phase, SessionKind, DEFAULT_WORK_MINUTES,
};
use super::store::SessionStore;
use crate::error::{Result, StateError};
use crate::events::Event;

/// Process-local cycle state. Not persisted by the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusCycleState {
    pub phase: Phase,
    #[serde(default)]
    pub active_session: Option<FocusSession>,
    #[serde(default)]
    pub selected_break_kind: BreakKind,
    pub configured_work_minutes: u32,
    #[serde(default)]
    pub break_finished: bool,
}

impl Default for FocusCycleState {
    fn default() -> Self {
        Self {
            phase: Phase::Work,
            active_session: None,
            selected_break_kind: BreakKind::Short,
            configured_work_minutes: DEFAULT_WORK_MINUTES,
            break_finished: false,
        }
    }
}

/// Coarse engine status derived from the cycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EngineStatus {
    Idle {
        next_phase: Phase,
        break_finished: bool,
    },
    Running {
        phase: Phase,
        session: FocusSession,
    },
}

pub struct FocusSessionEngine<S> {
    store: S,
    state: FocusCycleState,
}

impl<S: SessionStore> FocusSessionEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_state(store, FocusCycleState::default())
    }

    /// Resume from a previously captured cycle state.
    ///
    /// The configured work length is re-clamped in case the snapshot was
    /// edited by hand.
    pub fn with_state(store: S, mut state: FocusCycleState) -> Self {
        state.configured_work_minutes = clamp_work_minutes(state.configured_work_minutes as i64);
        Self { store, state }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &FocusCycleState {
        &self.state
    }

    pub fn into_state(self) -> FocusCycleState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn active_session(&self) -> Option<&FocusSession> {
        self.state.active_session.as_ref()
    }

    pub fn break_finished(&self) -> bool {
        self.state.break_finished
    }

    pub fn selected_break_kind(&self) -> BreakKind {
        self.state.selected_break_kind
    }

    pub fn configured_work_minutes(&self) -> u32 {
        self.state.configured_work_minutes
    }

    pub fn status(&self) -> EngineStatus {
        match &self.state.active_session {
            Some(session) => EngineStatus::Running {
                phase: session.phase(),
                session: session.clone(),
            },
            None => EngineStatus::Idle {
                next_phase: self.state.phase,
                break_finished: self.state.break_finished,
            },
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a work interval.
    ///
    /// An explicit `work_minutes` is clamped to [1, 120]; otherwise the
    /// configured length is used. On store failure the engine stays idle.
    pub fn start_work(&mut self, work_minutes: Option<i64>, task_id: Option<String>) -> Result<Event> {
        self.ensure_idle()?;
        let minutes = work_minutes
            .map(clamp_work_minutes)
            .unwrap_or(self.state.configured_work_minutes);
        self.begin(SessionKind::Work, minutes, task_id)
    }

    /// Start a break of the given kind. Break lengths are fixed policy.
    pub fn start_break(&mut self, kind: BreakKind, task_id: Option<String>) -> Result<Event> {
        self.ensure_idle()?;
        self.begin(kind.session_kind(), kind.minutes(), task_id)
    }

    /// Complete the running session.
    ///
    /// A completed work interval chains straight into a break of the
    /// selected kind. A completed break leaves the engine idle with the
    /// next phase set to work. On store failure the running session is
    /// kept and the call may be retried.
    pub fn complete(&mut self) -> Result<Vec<Event>> {
        let active = self
            .state
            .active_session
            .as_ref()
            .ok_or(StateError::NoActiveSession)?;

        let finished = active.finished();
        let saved = self.store.update(&finished).map_err(|e| {
            warn!(session_id = finished.id, error = %e, "session completion not persisted");
            e
        })?;

        info!(
            session_id = saved.id,
            kind = saved.kind.as_str(),
            "session completed"
        );
        self.state.active_session = None;

        let mut events = vec![Event::SessionCompleted {
            session: saved.clone(),
            at: Utc::now(),
        }];

        match saved.phase() {
            Phase::Work => {
                self.state.phase = Phase::Break;
                let kind = self.state.selected_break_kind;
                debug!(?kind, "chaining into break");
                events.push(self.start_break(kind, saved.task_id.clone())?);
            }
            Phase::Break => {
                self.state.phase = Phase::Work;
                if self.state.break_finished {
                    debug!("break finished flag still raised; waiting for reset");
                } else {
                    self.state.break_finished = true;
                    events.push(Event::BreakFinished {
                        session_id: saved.id,
                        task_id: saved.task_id.clone(),
                        at: Utc::now(),
                    });
                }
            }
        }
        Ok(events)
    }

    /// Lower the "break finished" flag so the next break completion can raise it.
    pub fn reset_completion_flag(&mut self) {
        self.state.break_finished = false;
    }

    /// Set the default work length. Out-of-range input is clamped, never rejected.
    /// Returns the stored value.
    pub fn update_configured_work_minutes(&mut self, minutes: i64) -> u32 {
        let stored = clamp_work_minutes(minutes);
        if stored as i64 != minutes {
            debug!(requested = minutes, stored, "work minutes clamped");
        }
        self.state.configured_work_minutes = stored;
        stored
    }

    pub fn select_break_kind(&mut self, kind: BreakKind) {
        self.state.selected_break_kind = kind;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn ensure_idle(&self) -> Result<()> {
        match &self.state.active_session {
            Some(s) => Err(StateError::SessionAlreadyActive { session_id: s.id }.into()),
            None => Ok(()),
        }
    }

    fn begin(&mut self, kind: SessionKind, minutes: u32, task_id: Option<String>) -> Result<Event> {
        let draft = FocusSession::begin(kind, minutes, task_id)?;
        let saved = self.store.create(&draft).map_err(|e| {
            warn!(kind = kind.as_str(), error = %e, "session start not persisted");
            e
        })?;

        info!(
            session_id = saved.id,
            kind = kind.as_str(),
            duration_minutes = saved.duration_minutes,
            "session started"
        );
        self.state.phase = saved.phase();
        self.state.active_session = Some(saved.clone());
        Ok(Event::SessionStarted {
            session: saved,
            at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CollaboratorError, CoreError};
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct FakeStore {
        next_id: Cell<i64>,
        fail_create: Cell<bool>,
        fail_update: Cell<bool>,
        records: RefCell<Vec<FocusSession>>,
    }

    impl SessionStore for FakeStore {
        fn create(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError> {
            if self.fail_create.get() {
                return Err(CollaboratorError::new("fake", "create refused"));
            }
            self.next_id.set(self.next_id.get() + 1);
            let saved = FocusSession {
                id: self.next_id.get(),
                ..session.clone()
            };
            self.records.borrow_mut().push(saved.clone());
            Ok(saved)
        }

        fn update(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError> {
            if self.fail_update.get() {
                return Err(CollaboratorError::new("fake", "update refused"));
            }
            let mut records = self.records.borrow_mut();
            let slot = records
                .iter_mut()
                .find(|r| r.id == session.id)
                .ok_or_else(|| CollaboratorError::new("fake", "unknown id"))?;
            *slot = session.clone();
            Ok(session.clone())
        }
    }

    #[test]
    fn starts_idle_in_work_phase() {
        let store = FakeStore::default();
        let engine = FocusSessionEngine::new(&store);
        assert_eq!(engine.phase(), Phase::Work);
        assert!(engine.active_session().is_none());
        assert_eq!(engine.configured_work_minutes(), 25);
        assert_eq!(engine.selected_break_kind(), BreakKind::Short);
    }

    #[test]
    fn start_work_uses_configured_minutes() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);
        engine.update_configured_work_minutes(40);
        engine.start_work(None, Some("task-1".into())).unwrap();

        let active = engine.active_session().unwrap();
        assert_eq!(active.kind, SessionKind::Work);
        assert_eq!(active.duration_minutes, 40);
        assert_eq!(active.task_id.as_deref(), Some("task-1"));
        assert_eq!(active.id, 1);
    }

    #[test]
    fn explicit_work_minutes_are_clamped() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);
        engine.start_work(Some(500), None).unwrap();
        assert_eq!(engine.active_session().unwrap().duration_minutes, 120);
    }

    #[test]
    fn start_while_running_is_a_state_error() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);
        engine.start_work(None, None).unwrap();
        let before = engine.state().clone();

        let err = engine.start_break(BreakKind::Long, None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::State(StateError::SessionAlreadyActive { session_id: 1 })
        ));
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn failed_start_stays_idle() {
        let store = FakeStore::default();
        store.fail_create.set(true);
        let mut engine = FocusSessionEngine::new(&store);

        let err = engine.start_work(None, None).unwrap_err();
        assert!(matches!(err, CoreError::Collaborator(_)));
        assert!(engine.active_session().is_none());
        assert_eq!(engine.phase(), Phase::Work);
    }

    #[test]
    fn completing_work_chains_into_selected_break() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);
        engine.select_break_kind(BreakKind::Long);
        engine.start_work(Some(30), Some("t".into())).unwrap();

        let events = engine.complete().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::SessionCompleted { .. }));
        assert!(matches!(events[1], Event::SessionStarted { .. }));

        let active = engine.active_session().unwrap();
        assert_eq!(active.kind, SessionKind::LongBreak);
        assert_eq!(active.duration_minutes, 15);
        assert_eq!(active.task_id.as_deref(), Some("t"));
        assert_eq!(engine.phase(), Phase::Break);

        let records = store.records.borrow();
        assert!(records[0].completed);
        assert!(records[0].end_time.is_some());
        assert!(!records[1].completed);
    }

    #[test]
    fn completing_break_raises_flag_once() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);

        engine.start_break(BreakKind::Short, None).unwrap();
        let events = engine.complete().unwrap();
        assert!(matches!(events.last(), Some(Event::BreakFinished { .. })));
        assert!(engine.break_finished());
        assert!(engine.active_session().is_none());
        assert_eq!(engine.phase(), Phase::Work);

        // A second complete without a running session is rejected, flag untouched.
        let err = engine.complete().unwrap_err();
        assert!(matches!(err, CoreError::State(StateError::NoActiveSession)));
        assert!(engine.break_finished());

        // Another break without reset: no second BreakFinished event.
        engine.start_break(BreakKind::Short, None).unwrap();
        let events = engine.complete().unwrap();
        assert_eq!(events.len(), 1);
        assert!(engine.break_finished());

        engine.reset_completion_flag();
        assert!(!engine.break_finished());
        engine.start_break(BreakKind::Short, None).unwrap();
        let events = engine.complete().unwrap();
        assert!(matches!(events.last(), Some(Event::BreakFinished { .. })));
    }

    #[test]
    fn failed_completion_keeps_active_session() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);
        engine.start_work(None, None).unwrap();
        let running = engine.active_session().cloned();

        store.fail_update.set(true);
        assert!(engine.complete().is_err());
        assert_eq!(engine.active_session().cloned(), running);

        store.fail_update.set(false);
        engine.complete().unwrap();
        assert_eq!(engine.active_session().unwrap().kind, SessionKind::ShortBreak);
    }

    #[test]
    fn failed_chained_break_leaves_break_pending() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);
        engine.start_work(None, None).unwrap();

        store.fail_create.set(true);
        assert!(matches!(engine.complete(), Err(CoreError::Collaborator(_))));
        assert!(engine.active_session().is_none());
        assert_eq!(engine.phase(), Phase::Break);
        assert!(store.records.borrow()[0].completed);
    }

    #[test]
    fn configured_minutes_clamp() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);
        assert_eq!(engine.update_configured_work_minutes(0), 1);
        assert_eq!(engine.configured_work_minutes(), 1);
        assert_eq!(engine.update_configured_work_minutes(999), 120);
        assert_eq!(engine.configured_work_minutes(), 120);
    }

    #[test]
    fn state_snapshot_roundtrip() {
        let store = FakeStore::default();
        let mut engine = FocusSessionEngine::new(&store);
        engine.start_work(Some(50), None).unwrap();
        let json = serde_json::to_string(&engine.into_state()).unwrap();

        let restored: FocusCycleState = serde_json::from_str(&json).unwrap();
        let engine = FocusSessionEngine::with_state(&store, restored);
        match engine.status() {
            EngineStatus::Running { phase, session } => {
                assert_eq!(phase, Phase::Work);
                assert_eq!(session.duration_minutes, 50);
            }
            other => panic!("expected running, got {other:?}"),
        }
    }
}
