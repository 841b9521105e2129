//! # Pomozone Core Library
//!
//! This library provides the core business logic for Pomozone: Pomodoro-style
//! focus sessions and geofenced focus zones. The CLI binary is a thin layer
//! over the same core library.
//!
//! ## Architecture
//!
//! - **Focus-Session Engine**: work/break state machine; completing a work
//!   interval chains straight into a break
//! - **Focus-Zone Monitor**: keeps the platform's monitored regions in sync
//!   with the user's zone list and turns region transitions into zone events
//! - **Storage**: SQLite-based session/zone storage and TOML-based configuration
//!
//! The engines never talk to the platform or the database directly; they go
//! through the collaborator traits [`SessionStore`], [`ZoneStore`],
//! [`LocationService`] and [`NotificationSink`].

pub mod error;
pub mod events;
pub mod notify;
pub mod session;
pub mod storage;
pub mod zone;

pub use error::{
    CollaboratorError, ConfigError, CoreError, DatabaseError, MonitorError, ReconcilePhase,
    StateError, ValidationError,
};
pub use events::Event;
pub use notify::{
    spawn_region_listener, zone_event_channel, NotificationDispatcher, NotificationSink,
    RegionEvent, ZoneEvent,
};
pub use session::{BreakKind, FocusCycleState, FocusSession, FocusSessionEngine, Phase, SessionKind, SessionStore};
pub use storage::{Config, Database, Stats};
pub use zone::{
    FocusZone, FocusZoneMonitor, LocationService, MonitoredRegion, MonitoredRegionSet,
    NotificationPolicy, RegionTransition, SimulatedLocationService, ZoneRegistry, ZoneStore,
};
