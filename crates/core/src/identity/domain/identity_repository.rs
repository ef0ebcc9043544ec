use crate::identity::domain::identity_store::{IdentityStore, IdentityStoreError};

/// Domain interface for persisting the identity store between runs.
///
/// `load` returns an empty store when nothing has been saved yet and fails
/// only when existing data cannot be read back into a valid store.
pub trait IdentityRepository: Send {
    fn load(&self) -> Result<IdentityStore, IdentityStoreError>;

    fn save(&self, store: &IdentityStore) -> Result<(), IdentityStoreError>;
}
