//! Thread-safe in-memory [`CredentialStore`] implementation for demos and tests.

// self
use crate::{
	_prelude::*,
	auth::{Credential, IdentityId},
	store::{CredentialStore, StoreFuture},
};

/// Storage backend that keeps records in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<HashMap<IdentityId, Credential>>>);
impl MemoryStore {
	/// Returns a copy of the record held for `identity`.
	pub fn get(&self, identity: &str) -> Option<Credential> {
		self.0.read().get(identity).cloned()
	}

	/// Seeds a record without going through the async contract.
	pub fn insert(&self, identity: IdentityId, credential: Credential) {
		self.0.write().insert(identity, credential);
	}

	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when no records are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn load<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, Option<Credential>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(identity).cloned()) })
	}

	fn save<'a>(
		&'a self,
		identity: &'a IdentityId,
		credential: &'a Credential,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(identity.clone(), credential.clone());

			Ok(())
		})
	}

	fn delete<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(identity).is_some()) })
	}
}
