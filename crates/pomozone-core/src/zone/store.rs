use crate::error::CollaboratorError;

use super::model::FocusZone;

/// Zone persistence collaborator.
pub trait ZoneStore {
    /// All zones, in creation order.
    fn list(&self) -> Result<Vec<FocusZone>, CollaboratorError>;

    /// Persist a new zone, assigning an id when it has none.
    fn create(&self, zone: &FocusZone) -> Result<FocusZone, CollaboratorError>;

    fn update(&self, zone: &FocusZone) -> Result<FocusZone, CollaboratorError>;

    fn delete(&self, id: &str) -> Result<(), CollaboratorError>;
}

impl<T: ZoneStore + ?Sized> ZoneStore for &T {
    fn list(&self) -> Result<Vec<FocusZone>, CollaboratorError> {
        (**self).list()
    }

    fn create(&self, zone: &FocusZone) -> Result<FocusZone, CollaboratorError> {
        (**self).create(zone)
    }

    fn update(&self, zone: &FocusZone) -> Result<FocusZone, CollaboratorError> {
        (**self).update(zone)
    }

    fn delete(&self, id: &str) -> Result<(), CollaboratorError> {
        (**self).delete(id)
    }
}
