//! Location-monitoring collaborator.
//!
//! The platform owns geofence accuracy and event delivery. This module only
//! describes the contract the monitor needs, plus an in-process
//! implementation used by the CLI and tests.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use super::model::FocusZone;

/// Platform-side handle for one monitored zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredRegion {
    pub zone_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub message: String,
}

impl MonitoredRegion {
    /// `None` for zones that have not been persisted yet.
    pub fn from_zone(zone: &FocusZone) -> Option<Self> {
        Some(Self {
            zone_id: zone.id.clone()?,
            name: zone.name.clone(),
            latitude: zone.latitude,
            longitude: zone.longitude,
            radius_meters: zone.radius_meters,
            message: zone.notification_message.clone(),
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location service unavailable")]
    Unavailable,

    #[error("platform region limit reached")]
    LimitReached,

    #[error("{0}")]
    Rejected(String),
}

pub trait LocationService: Send + Sync {
    /// Whether the app currently holds location permission.
    fn permission_granted(&self) -> bool;

    /// Maximum number of simultaneously monitored regions.
    fn region_limit(&self) -> usize;

    fn remove_regions(&self, zone_ids: &[String]) -> Result<(), PlatformError>;

    fn add_regions(&self, regions: &[MonitoredRegion]) -> Result<(), PlatformError>;
}

impl<T: LocationService + ?Sized> LocationService for std::sync::Arc<T> {
    fn permission_granted(&self) -> bool {
        (**self).permission_granted()
    }

    fn region_limit(&self) -> usize {
        (**self).region_limit()
    }

    fn remove_regions(&self, zone_ids: &[String]) -> Result<(), PlatformError> {
        (**self).remove_regions(zone_ids)
    }

    fn add_regions(&self, regions: &[MonitoredRegion]) -> Result<(), PlatformError> {
        (**self).add_regions(regions)
    }
}

/// Default cap, matching the common mobile geofence limit.
pub const DEFAULT_REGION_LIMIT: usize = 100;

#[derive(Debug)]
struct SimState {
    permission: bool,
    available: bool,
    limit: usize,
    regions: IndexMap<String, MonitoredRegion>,
}

/// In-process location service with switchable permission/availability.
#[derive(Debug)]
pub struct SimulatedLocationService {
    inner: Mutex<SimState>,
}

impl Default for SimulatedLocationService {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_LIMIT)
    }
}

impl SimulatedLocationService {
    pub fn new(limit: usize) -> Self {
        Self::with_regions(limit, Vec::new())
    }

    /// Start with regions registered by an earlier process.
    pub fn with_regions(limit: usize, regions: Vec<MonitoredRegion>) -> Self {
        Self {
            inner: Mutex::new(SimState {
                permission: true,
                available: true,
                limit,
                regions: regions
                    .into_iter()
                    .map(|r| (r.zone_id.clone(), r))
                    .collect(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_permission(&self, granted: bool) {
        self.state().permission = granted;
    }

    pub fn set_available(&self, available: bool) {
        self.state().available = available;
    }

    /// Regions currently registered, in registration order.
    pub fn registered(&self) -> Vec<MonitoredRegion> {
        self.state().regions.values().cloned().collect()
    }

    fn check(state: &SimState) -> Result<(), PlatformError> {
        if !state.permission {
            return Err(PlatformError::PermissionDenied);
        }
        if !state.available {
            return Err(PlatformError::Unavailable);
        }
        Ok(())
    }
}

impl LocationService for SimulatedLocationService {
    fn permission_granted(&self) -> bool {
        self.state().permission
    }

    fn region_limit(&self) -> usize {
        self.state().limit
    }

    fn remove_regions(&self, zone_ids: &[String]) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state)?;
        for id in zone_ids {
            state.regions.shift_remove(id);
        }
        Ok(())
    }

    fn add_regions(&self, regions: &[MonitoredRegion]) -> Result<(), PlatformError> {
        let mut state = self.state();
        Self::check(&state)?;
        let new_ids = regions
            .iter()
            .filter(|r| !state.regions.contains_key(&r.zone_id))
            .count();
        if state.regions.len() + new_ids > state.limit {
            return Err(PlatformError::LimitReached);
        }
        for region in regions {
            state.regions.insert(region.zone_id.clone(), region.clone());
        }
        Ok(())
    }
}
