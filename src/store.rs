//! Storage contracts and built-in store implementations for persisted credentials.
//!
//! Every identity owns at most one record. Stores assume a single writer per record; no
//! locking is performed across processes.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, IdentityId},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Loads the record of `identity`, if one exists.
	fn load<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, Option<Credential>>;

	/// Persists `credential`, fully replacing any prior record of `identity`.
	fn save<'a>(
		&'a self,
		identity: &'a IdentityId,
		credential: &'a Credential,
	) -> StoreFuture<'a, ()>;

	/// Deletes the record of `identity`; returns whether one existed.
	fn delete<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, bool>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Record exists but cannot be decoded (or encoded).
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure such as an unwritable directory.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
