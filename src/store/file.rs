//! File-backed [`CredentialStore`] keeping one JSON document per identity.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, IdentityId},
	store::{CredentialStore, StoreError, StoreFuture},
};

/// Persists each identity's credential to `<dir>/token_<identity stem>.json`.
///
/// Writes go through a temporary sibling file and a rename, so a reader never observes a
/// partially written record and every save fully replaces prior content.
#[derive(Clone, Debug)]
pub struct FileStore {
	dir: PathBuf,
}
impl FileStore {
	/// Creates a store rooted at `dir`. The directory is created on first save.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Directory holding the credential documents.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Location of the document owned by `identity`.
	pub fn path_for(&self, identity: &IdentityId) -> PathBuf {
		self.dir.join(format!("token_{}.json", identity.file_stem()))
	}

	fn load_now(&self, identity: &IdentityId) -> Result<Option<Credential>, StoreError> {
		let path = self.path_for(identity);
		let bytes = match fs::read(&path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) =>
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};
		let mut de = serde_json::Deserializer::from_slice(&bytes);
		let credential = serde_path_to_error::deserialize(&mut de).map_err(|e| {
			StoreError::Serialization {
				message: format!("Failed to parse {} at `{}`: {}", path.display(), e.path(), e.inner()),
			}
		})?;

		Ok(Some(credential))
	}

	fn save_now(&self, identity: &IdentityId, credential: &Credential) -> Result<(), StoreError> {
		fs::create_dir_all(&self.dir).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", self.dir.display()),
		})?;

		let path = self.path_for(identity);
		let serialized =
			serde_json::to_vec_pretty(credential).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize credential for {identity}: {e}"),
			})?;
		let mut tmp_path = path.clone();

		tmp_path.set_extension("json.tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}

	fn delete_now(&self, identity: &IdentityId) -> Result<bool, StoreError> {
		let path = self.path_for(identity);

		match fs::remove_file(&path) {
			Ok(()) => Ok(true),
			Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
			Err(e) => Err(StoreError::Backend {
				message: format!("Failed to remove {}: {e}", path.display()),
			}),
		}
	}
}
impl CredentialStore for FileStore {
	fn load<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, Option<Credential>> {
		Box::pin(async move { self.load_now(identity) })
	}

	fn save<'a>(
		&'a self,
		identity: &'a IdentityId,
		credential: &'a Credential,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move { self.save_now(identity, credential) })
	}

	fn delete<'a>(&'a self, identity: &'a IdentityId) -> StoreFuture<'a, bool> {
		Box::pin(async move { self.delete_now(identity) })
	}
}
