//! Focus-zone monitor.
//!
//! Keeps the platform's monitored regions in line with the user's zone list
//! and turns platform transitions into [`ZoneEvent`]s.
//!
//! Reconcile is a full replace: every monitored region is removed, then one
//! region per enabled zone is added in list order, up to the platform cap.
//! The region set sits behind a single mutex that is held for the whole
//! reconcile, including both platform calls, so a concurrent region event
//! or reader sees either the old set or the new one.

use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use super::location::{LocationService, MonitoredRegion, PlatformError};
use super::model::{FocusZone, RegionTransition, DEFAULT_NOTIFICATION_MESSAGE};
use crate::error::{MonitorError, ReconcilePhase, Result, ValidationError};
use crate::events::Event;
use crate::notify::{ZoneEvent, ZoneEventSender};

/// Zone id -> platform region handle, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonitoredRegionSet {
    regions: IndexMap<String, MonitoredRegion>,
}

impl MonitoredRegionSet {
    pub fn from_regions(regions: impl IntoIterator<Item = MonitoredRegion>) -> Self {
        Self {
            regions: regions.into_iter().map(|r| (r.zone_id.clone(), r)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn contains(&self, zone_id: &str) -> bool {
        self.regions.contains_key(zone_id)
    }

    pub fn get(&self, zone_id: &str) -> Option<&MonitoredRegion> {
        self.regions.get(zone_id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.regions.keys().cloned().collect()
    }

    pub fn regions(&self) -> impl Iterator<Item = &MonitoredRegion> {
        self.regions.values()
    }
}

/// Which transitions produce a notification. Enter-only by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPolicy {
    pub on_enter: bool,
    pub on_exit: bool,
    pub on_dwell: bool,
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            on_enter: true,
            on_exit: false,
            on_dwell: false,
        }
    }
}

impl NotificationPolicy {
    pub fn notifies(&self, transition: RegionTransition) -> bool {
        match transition {
            RegionTransition::Enter => self.on_enter,
            RegionTransition::Exit => self.on_exit,
            RegionTransition::Dwell => self.on_dwell,
        }
    }
}

pub struct FocusZoneMonitor<L> {
    location: L,
    regions: Mutex<MonitoredRegionSet>,
    policy: NotificationPolicy,
    events: Option<ZoneEventSender>,
}

impl<L: LocationService> FocusZoneMonitor<L> {
    pub fn new(location: L) -> Self {
        Self {
            location,
            regions: Mutex::new(MonitoredRegionSet::default()),
            policy: NotificationPolicy::default(),
            events: None,
        }
    }

    /// Seed the set with regions known to be registered already.
    pub fn with_regions(mut self, regions: MonitoredRegionSet) -> Self {
        self.regions = Mutex::new(regions);
        self
    }

    pub fn with_policy(mut self, policy: NotificationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Route notifying transitions into `sender`.
    pub fn with_events(mut self, sender: ZoneEventSender) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    pub fn policy(&self) -> NotificationPolicy {
        self.policy
    }

    /// Consistent copy of the monitored set.
    pub fn monitored(&self) -> MonitoredRegionSet {
        self.lock().clone()
    }

    pub fn monitored_ids(&self) -> Vec<String> {
        self.lock().ids()
    }

    /// Replace the monitored set with the enabled zones of `zones`.
    ///
    /// Fails fast without touching the platform when permission is missing
    /// or a zone is invalid. A remove-phase failure leaves the previous set
    /// in place; an add-phase failure leaves the set empty. When the cap is
    /// hit, zones up to the cap stay registered and the rest are reported
    /// in [`MonitorError::RegionLimitExceeded`].
    pub fn reconcile(&self, zones: &[FocusZone]) -> Result<Event> {
        let mut set = self.lock();

        if !self.location.permission_granted() {
            warn!("reconcile skipped: location permission missing");
            return Err(MonitorError::PermissionDenied.into());
        }

        let mut wanted: IndexMap<String, MonitoredRegion> = IndexMap::new();
        for zone in zones.iter().filter(|z| z.enabled) {
            zone.validate()?;
            let region = MonitoredRegion::from_zone(zone)
                .ok_or(ValidationError::EmptyField { field: "id" })?;
            wanted.entry(region.zone_id.clone()).or_insert(region);
        }

        let limit = self.location.region_limit();
        let mut accepted: Vec<MonitoredRegion> = wanted.into_values().collect();
        let rejected: Vec<String> = if accepted.len() > limit {
            accepted.split_off(limit).into_iter().map(|r| r.zone_id).collect()
        } else {
            Vec::new()
        };

        debug!(
            current = set.len(),
            wanted = accepted.len(),
            over_limit = rejected.len(),
            "reconciling focus zones"
        );

        if !set.is_empty() {
            self.location
                .remove_regions(&set.ids())
                .map_err(|e| phase_error(e, ReconcilePhase::Remove, limit, &[]))?;
            set.regions.clear();
        }

        if !accepted.is_empty() {
            self.location
                .add_regions(&accepted)
                .map_err(|e| phase_error(e, ReconcilePhase::Add, limit, &accepted))?;
        }
        *set = MonitoredRegionSet::from_regions(accepted);

        let monitored = set.ids();
        if !rejected.is_empty() {
            warn!(limit, ?rejected, "region limit reached");
            return Err(MonitorError::RegionLimitExceeded {
                limit,
                registered: monitored,
                rejected,
            }
            .into());
        }

        info!(monitored = monitored.len(), "focus zones reconciled");
        Ok(Event::ZonesReconciled {
            monitored,
            at: Utc::now(),
        })
    }

    /// Stop monitoring a single zone without a full reconcile.
    pub fn remove_zone(&self, zone_id: &str) -> Result<Event> {
        let mut set = self.lock();
        let was_monitored = set.contains(zone_id);
        if was_monitored {
            let limit = self.location.region_limit();
            self.location
                .remove_regions(&[zone_id.to_string()])
                .map_err(|e| phase_error(e, ReconcilePhase::Remove, limit, &[]))?;
            set.regions.shift_remove(zone_id);
        }
        info!(zone_id, was_monitored, "focus zone removed from monitoring");
        Ok(Event::ZoneRemoved {
            zone_id: zone_id.to_string(),
            was_monitored,
            at: Utc::now(),
        })
    }

    /// Handle a platform transition for `zone_id`.
    ///
    /// Every transition is logged and returned as an [`Event`]; those the
    /// policy marks as notifying are also pushed to the zone-event channel.
    /// Events for zones no longer monitored are still delivered, with the
    /// default message.
    pub fn on_region_event(&self, zone_id: &str, transition: RegionTransition) -> Event {
        let set = self.lock();
        let region = set.get(zone_id);
        let now = Utc::now();

        info!(zone_id, ?transition, known = region.is_some(), "region transition");

        if self.policy.notifies(transition) {
            let event = ZoneEvent {
                zone_id: zone_id.to_string(),
                zone_name: region.map(|r| r.name.clone()),
                message: region
                    .map(|r| r.message.clone())
                    .unwrap_or_else(|| DEFAULT_NOTIFICATION_MESSAGE.to_string()),
                transition,
                at: now,
            };
            if let Some(tx) = &self.events {
                if tx.send(event).is_err() {
                    warn!(zone_id, "zone event dropped: no notification listener");
                }
            }
        }

        match transition {
            RegionTransition::Enter => Event::ZoneEntered {
                zone_id: zone_id.to_string(),
                zone_name: region.map(|r| r.name.clone()),
                message: region
                    .map(|r| r.message.clone())
                    .unwrap_or_else(|| DEFAULT_NOTIFICATION_MESSAGE.to_string()),
                at: now,
            },
            RegionTransition::Exit => Event::ZoneExited {
                zone_id: zone_id.to_string(),
                at: now,
            },
            RegionTransition::Dwell => Event::ZoneDwelled {
                zone_id: zone_id.to_string(),
                at: now,
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitoredRegionSet> {
        self.regions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn phase_error(
    err: PlatformError,
    phase: ReconcilePhase,
    limit: usize,
    attempted: &[MonitoredRegion],
) -> MonitorError {
    warn!(%phase, error = %err, "location service call failed");
    match err {
        PlatformError::PermissionDenied => MonitorError::PermissionDenied,
        PlatformError::Unavailable => MonitorError::PlatformUnavailable { phase },
        PlatformError::LimitReached => MonitorError::RegionLimitExceeded {
            limit,
            registered: Vec::new(),
            rejected: attempted.iter().map(|r| r.zone_id.clone()).collect(),
        },
        PlatformError::Rejected(message) => MonitorError::Platform { phase, message },
    }
}
