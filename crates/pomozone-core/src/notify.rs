//! Message-passing boundaries around the focus-zone monitor.
//!
//! Platform callbacks come in as [`RegionEvent`]s on a bounded channel and
//! are fed to the monitor by [`spawn_region_listener`]. Notifying
//! transitions leave the monitor as [`ZoneEvent`]s on an unbounded channel
//! that a [`NotificationDispatcher`] drains into a [`NotificationSink`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::zone::{FocusZoneMonitor, LocationService, RegionTransition};

/// Title used when the zone is no longer known to the monitor.
pub const FALLBACK_TITLE: &str = "Focus zone";

/// Outbound event for the notification layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneEvent {
    pub zone_id: String,
    pub zone_name: Option<String>,
    pub message: String,
    pub transition: RegionTransition,
    pub at: DateTime<Utc>,
}

impl ZoneEvent {
    pub fn title(&self) -> &str {
        self.zone_name.as_deref().unwrap_or(FALLBACK_TITLE)
    }
}

/// Inbound platform callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEvent {
    pub zone_id: String,
    pub transition: RegionTransition,
}

pub type ZoneEventSender = mpsc::UnboundedSender<ZoneEvent>;
pub type ZoneEventReceiver = mpsc::UnboundedReceiver<ZoneEvent>;

pub fn zone_event_channel() -> (ZoneEventSender, ZoneEventReceiver) {
    mpsc::unbounded_channel()
}

/// Fire-and-forget notification output.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn notify(&self, title: &str, message: &str) {
        (**self).notify(title, message)
    }
}

pub struct NotificationDispatcher<N> {
    rx: ZoneEventReceiver,
    sink: N,
    enabled: bool,
}

impl<N: NotificationSink> NotificationDispatcher<N> {
    pub fn new(rx: ZoneEventReceiver, sink: N) -> Self {
        Self {
            rx,
            sink,
            enabled: true,
        }
    }

    /// When disabled, events are consumed but not rendered.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Deliver everything already queued. Returns the number of events consumed.
    pub fn drain(&mut self) -> usize {
        let mut n = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.deliver(&event);
            n += 1;
        }
        n
    }

    /// Deliver until every sender is dropped.
    pub async fn run(mut self) -> usize {
        let mut n = 0;
        while let Some(event) = self.rx.recv().await {
            self.deliver(&event);
            n += 1;
        }
        n
    }

    fn deliver(&self, event: &ZoneEvent) {
        if !self.enabled {
            debug!(zone_id = %event.zone_id, "notifications disabled; event dropped");
            return;
        }
        self.sink.notify(event.title(), &event.message);
    }
}

/// Feed inbound platform callbacks to `monitor` until the channel closes.
///
/// The monitor's region lock is a blocking mutex that a reconcile holds for
/// both platform calls, so each callback runs on the blocking pool rather
/// than on a runtime worker. The task resolves to the number of callbacks
/// handled.
pub fn spawn_region_listener<L>(
    monitor: Arc<FocusZoneMonitor<L>>,
    mut rx: mpsc::Receiver<RegionEvent>,
) -> JoinHandle<usize>
where
    L: LocationService + 'static,
{
    tokio::spawn(async move {
        let mut handled = 0;
        while let Some(event) = rx.recv().await {
            let monitor = Arc::clone(&monitor);
            let zone_id = event.zone_id.clone();
            let outcome = tokio::task::spawn_blocking(move || {
                monitor.on_region_event(&event.zone_id, event.transition)
            })
            .await;
            match outcome {
                Ok(_) => handled += 1,
                Err(e) => warn!(zone_id = %zone_id, error = %e, "region callback panicked"),
            }
        }
        handled
    })
}
