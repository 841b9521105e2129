mod engine;
mod model;
mod store;

pub use engine::{EngineStatus, FocusCycleState, FocusSessionEngine};
pub use model::{
    clamp_work_minutes, BreakKind, FocusSession, Phase, SessionKind, DEFAULT_WORK_MINUTES,
    LONG_BREAK_MINUTES, MAX_WORK_MINUTES, MIN_WORK_MINUTES, SHORT_BREAK_MINUTES,
};
pub use store::SessionStore;
