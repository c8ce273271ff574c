//! Shared helpers for flow implementations (guards, grant checks, scope parsing).

// self
use crate::{
	_prelude::*,
	auth::{IdentityId, ScopeSet},
	error::ConfigError,
	flows::CredentialBroker,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	provider::{GrantType, ProviderDescriptor},
};

/// Returns (and creates on demand) the per-identity guard.
pub(crate) fn flow_guard<C, M>(
	broker: &CredentialBroker<C, M>,
	identity: &IdentityId,
) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut guards = broker.flow_guards.lock();

	guards.entry(identity.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Fails with [`ConfigError::UnsupportedGrant`] unless the descriptor enables `grant`.
pub(crate) fn ensure_supported(descriptor: &ProviderDescriptor, grant: GrantType) -> Result<()> {
	if descriptor.supports(grant) {
		Ok(())
	} else {
		Err(ConfigError::UnsupportedGrant {
			descriptor: descriptor.id.to_string(),
			grant: grant.as_str(),
		}
		.into())
	}
}

/// Parses a delimiter-joined `scope` answer; blank answers yield `None`.
pub(crate) fn parse_scope(raw: Option<&str>, delimiter: char) -> Result<Option<ScopeSet>> {
	let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
		return Ok(None);
	};
	let scopes = ScopeSet::new(raw.split(delimiter).map(str::trim).filter(|scope| !scope.is_empty()))
		.map_err(ConfigError::from)?;

	Ok(Some(scopes))
}
