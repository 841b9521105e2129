use crate::error::CollaboratorError;

use super::model::FocusSession;

/// Session persistence collaborator.
///
/// `create` assigns the id; `update` replaces the stored record with the
/// same id. Both may fail and the engine reports the failure verbatim.
pub trait SessionStore {
    fn create(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError>;

    fn update(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError>;
}

impl<T: SessionStore + ?Sized> SessionStore for &T {
    fn create(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError> {
        (**self).create(session)
    }

    fn update(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError> {
        (**self).update(session)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Box<T> {
    fn create(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError> {
        (**self).create(session)
    }

    fn update(&self, session: &FocusSession) -> Result<FocusSession, CollaboratorError> {
        (**self).update(session)
    }
}
