//! Auth-domain identifiers, scope sets, capabilities, and credential models.

pub mod capability;
pub mod credential;
pub mod id;
pub mod scope;
pub mod secret;

pub use capability::*;
pub use credential::*;
pub use id::*;
pub use scope::*;
pub use secret::*;
