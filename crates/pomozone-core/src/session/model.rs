use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lower bound for a work interval, in minutes.
pub const MIN_WORK_MINUTES: u32 = 1;
/// Upper bound for a work interval, in minutes.
pub const MAX_WORK_MINUTES: u32 = 120;
/// Work length used until the user picks another one.
pub const DEFAULT_WORK_MINUTES: u32 = 25;
/// Fixed break policy. Not user-configurable.
pub const SHORT_BREAK_MINUTES: u32 = 5;
pub const LONG_BREAK_MINUTES: u32 = 15;

/// Clamp a requested work length into `[MIN_WORK_MINUTES, MAX_WORK_MINUTES]`.
pub fn clamp_work_minutes(minutes: i64) -> u32 {
    minutes.clamp(MIN_WORK_MINUTES as i64, MAX_WORK_MINUTES as i64) as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Work => "work",
            SessionKind::ShortBreak => "short_break",
            SessionKind::LongBreak => "long_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "work" => Some(SessionKind::Work),
            "short_break" => Some(SessionKind::ShortBreak),
            "long_break" => Some(SessionKind::LongBreak),
            _ => None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            SessionKind::Work => Phase::Work,
            SessionKind::ShortBreak | SessionKind::LongBreak => Phase::Break,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    #[default]
    Short,
    Long,
}

impl BreakKind {
    pub fn minutes(&self) -> u32 {
        match self {
            BreakKind::Short => SHORT_BREAK_MINUTES,
            BreakKind::Long => LONG_BREAK_MINUTES,
        }
    }

    pub fn session_kind(&self) -> SessionKind {
        match self {
            BreakKind::Short => SessionKind::ShortBreak,
            BreakKind::Long => SessionKind::LongBreak,
        }
    }
}

impl std::str::FromStr for BreakKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "short" => Ok(BreakKind::Short),
            "long" => Ok(BreakKind::Long),
            other => Err(format!("unknown break kind '{other}' (expected short|long)")),
        }
    }
}

/// One work or break interval.
///
/// `id` is 0 until the session store has created the record.
/// `task_id` is a weak reference: the task may no longer exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: i64,
    pub kind: SessionKind,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub task_id: Option<String>,
}

impl FocusSession {
    /// Build an unsaved, running session starting now.
    pub fn begin(
        kind: SessionKind,
        duration_minutes: u32,
        task_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        if duration_minutes == 0 {
            return Err(ValidationError::NonPositive {
                field: "duration_minutes",
                value: 0.0,
            });
        }
        Ok(Self {
            id: 0,
            kind,
            start_time: Utc::now(),
            end_time: None,
            duration_minutes,
            completed: false,
            task_id,
        })
    }

    pub fn phase(&self) -> Phase {
        self.kind.phase()
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Copy of this session marked completed at `now`.
    pub fn finished(&self) -> Self {
        Self {
            end_time: Some(Utc::now()),
            completed: true,
            ..self.clone()
        }
    }
}
