use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::FocusSession;

/// Every state change in the system produces an Event.
/// The CLI prints them; the notification layer consumes zone entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        session: FocusSession,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session: FocusSession,
        at: DateTime<Utc>,
    },
    /// A break ended; the caller may offer navigation back to task selection.
    BreakFinished {
        session_id: i64,
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    ZonesReconciled {
        monitored: Vec<String>,
        at: DateTime<Utc>,
    },
    ZoneRemoved {
        zone_id: String,
        was_monitored: bool,
        at: DateTime<Utc>,
    },
    ZoneEntered {
        zone_id: String,
        zone_name: Option<String>,
        message: String,
        at: DateTime<Utc>,
    },
    ZoneExited {
        zone_id: String,
        at: DateTime<Utc>,
    },
    ZoneDwelled {
        zone_id: String,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_serialization() {
        let ev = Event::ZoneExited {
            zone_id: "z1".into(),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "zone_exited");
        assert_eq!(json["zone_id"], "z1");
    }
}
