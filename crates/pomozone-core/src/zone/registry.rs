//! Zone list edits that keep the monitored set current.
//!
//! Every edit goes to the zone store first; the monitor is only touched once
//! the store has accepted the change. If the follow-up reconcile fails the
//! edit stays persisted and [`ZoneRegistry::refresh`] can be retried.

use std::sync::Arc;
use tracing::info;

use super::location::LocationService;
use super::model::FocusZone;
use super::monitor::FocusZoneMonitor;
use super::store::ZoneStore;
use crate::error::{Result, ValidationError};
use crate::events::Event;

pub struct ZoneRegistry<Z, L> {
    store: Z,
    monitor: Arc<FocusZoneMonitor<L>>,
}

impl<Z: ZoneStore, L: LocationService> ZoneRegistry<Z, L> {
    pub fn new(store: Z, monitor: Arc<FocusZoneMonitor<L>>) -> Self {
        Self { store, monitor }
    }

    pub fn monitor(&self) -> &Arc<FocusZoneMonitor<L>> {
        &self.monitor
    }

    pub fn zones(&self) -> Result<Vec<FocusZone>> {
        Ok(self.store.list()?)
    }

    /// Re-read the zone list and reconcile the monitor against it.
    pub fn refresh(&self) -> Result<Event> {
        let zones = self.store.list()?;
        self.monitor.reconcile(&zones)
    }

    pub fn add_zone(&self, zone: FocusZone) -> Result<(FocusZone, Event)> {
        zone.validate()?;
        let saved = self.store.create(&zone)?;
        info!(zone_id = ?saved.id, name = %saved.name, "focus zone added");
        let event = self.refresh()?;
        Ok((saved, event))
    }

    pub fn update_zone(&self, zone: &FocusZone) -> Result<(FocusZone, Event)> {
        zone.validate()?;
        if zone.id.is_none() {
            return Err(ValidationError::EmptyField { field: "id" }.into());
        }
        let saved = self.store.update(zone)?;
        let event = self.refresh()?;
        Ok((saved, event))
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(FocusZone, Event)> {
        let mut zone = self.find(id)?;
        zone.enabled = enabled;
        let saved = self.store.update(&zone)?;
        info!(zone_id = id, enabled, "focus zone toggled");
        let event = self.refresh()?;
        Ok((saved, event))
    }

    /// Delete from the store, then drop the single region.
    pub fn delete_zone(&self, id: &str) -> Result<Event> {
        self.store.delete(id)?;
        self.monitor.remove_zone(id)
    }

    fn find(&self, id: &str) -> Result<FocusZone> {
        self.store
            .list()?
            .into_iter()
            .find(|z| z.id.as_deref() == Some(id))
            .ok_or_else(|| ValidationError::UnknownZone { id: id.to_string() }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CollaboratorError, CoreError, MonitorError};
    use crate::zone::SimulatedLocationService;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct FakeZones {
        zones: RefCell<Vec<FocusZone>>,
        next: Cell<u32>,
        fail: Cell<bool>,
    }

    impl FakeZones {
        fn guard(&self) -> Result<(), CollaboratorError> {
            if self.fail.get() {
                Err(CollaboratorError::new("fake", "offline"))
            } else {
                Ok(())
            }
        }
    }

    impl ZoneStore for FakeZones {
        fn list(&self) -> Result<Vec<FocusZone>, CollaboratorError> {
            self.guard()?;
            Ok(self.zones.borrow().clone())
        }

        fn create(&self, zone: &FocusZone) -> Result<FocusZone, CollaboratorError> {
            self.guard()?;
            self.next.set(self.next.get() + 1);
            let saved = FocusZone {
                id: Some(format!("z{}", self.next.get())),
                ..zone.clone()
            };
            self.zones.borrow_mut().push(saved.clone());
            Ok(saved)
        }

        fn update(&self, zone: &FocusZone) -> Result<FocusZone, CollaboratorError> {
            self.guard()?;
            let mut zones = self.zones.borrow_mut();
            let slot = zones
                .iter_mut()
                .find(|z| z.id == zone.id)
                .ok_or_else(|| CollaboratorError::new("fake", "missing"))?;
            *slot = zone.clone();
            Ok(zone.clone())
        }

        fn delete(&self, id: &str) -> Result<(), CollaboratorError> {
            self.guard()?;
            self.zones.borrow_mut().retain(|z| z.id.as_deref() != Some(id));
            Ok(())
        }
    }

    fn registry(store: &FakeZones) -> ZoneRegistry<&FakeZones, SimulatedLocationService> {
        ZoneRegistry::new(
            store,
            Arc::new(FocusZoneMonitor::new(SimulatedLocationService::new(10))),
        )
    }

    #[test]
    fn add_then_toggle_updates_monitoring() {
        let store = FakeZones::default();
        let reg = registry(&store);

        let (zone, _) = reg.add_zone(FocusZone::new("Library", "Rua 1", 38.7, -9.1)).unwrap();
        let id = zone.id.unwrap();
        assert_eq!(reg.monitor().monitored_ids(), vec![id.clone()]);

        reg.set_enabled(&id, false).unwrap();
        assert!(reg.monitor().monitored().is_empty());
        assert!(!store.zones.borrow()[0].enabled);

        reg.set_enabled(&id, true).unwrap();
        assert_eq!(reg.monitor().monitored_ids(), vec![id]);
    }

    #[test]
    fn invalid_zone_never_reaches_store() {
        let store = FakeZones::default();
        let reg = registry(&store);
        let err = reg.add_zone(FocusZone::new("", "Rua 1", 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(store.zones.borrow().is_empty());
    }

    #[test]
    fn delete_removes_from_store_and_monitor() {
        let store = FakeZones::default();
        let reg = registry(&store);
        let (a, _) = reg.add_zone(FocusZone::new("A", "x", 0.0, 0.0)).unwrap();
        let (b, _) = reg.add_zone(FocusZone::new("B", "y", 1.0, 1.0)).unwrap();
        let a_id = a.id.unwrap();

        reg.delete_zone(&a_id).unwrap();
        assert_eq!(reg.monitor().monitored_ids(), vec![b.id.unwrap()]);
        assert_eq!(store.zones.borrow().len(), 1);
    }

    #[test]
    fn store_failure_leaves_monitor_alone() {
        let store = FakeZones::default();
        let reg = registry(&store);
        let (a, _) = reg.add_zone(FocusZone::new("A", "x", 0.0, 0.0)).unwrap();

        store.fail.set(true);
        let err = reg.delete_zone(a.id.as_deref().unwrap()).unwrap_err();
        assert!(matches!(err, CoreError::Collaborator(_)));
        assert_eq!(reg.monitor().monitored().len(), 1);
    }

    #[test]
    fn unknown_zone_toggle_is_validation_error() {
        let store = FakeZones::default();
        let reg = registry(&store);
        let err = reg.set_enabled("nope", true).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::UnknownZone { .. })
        ));
    }

    #[test]
    fn reconcile_failure_keeps_persisted_edit() {
        let store = FakeZones::default();
        let reg = registry(&store);
        reg.monitor().location().set_permission(false);

        let err = reg.add_zone(FocusZone::new("A", "x", 0.0, 0.0)).unwrap_err();
        assert!(matches!(err, CoreError::Monitor(MonitorError::PermissionDenied)));
        assert_eq!(store.zones.borrow().len(), 1);

        reg.monitor().location().set_permission(true);
        reg.refresh().unwrap();
        assert_eq!(reg.monitor().monitored().len(), 1);
    }
}
