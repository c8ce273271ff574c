//! Provider descriptor data structures and helpers shared by all flows.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant helpers wired into provider descriptors.
pub mod grant;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use grant::*;
pub use quirks::*;

// self
use crate::{_prelude::*, auth::ProviderId};

const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_DEVICE_AUTHORIZATION_ENDPOINT: &str = "https://oauth2.googleapis.com/device/code";

/// Preferred client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	#[default]
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint used by the manual-code fallback.
	pub authorization: Url,
	/// Default token endpoint used for exchanges and device polling.
	pub token: Url,
	/// Device-authorization endpoint (RFC 8628), when the provider offers one.
	pub device_authorization: Option<Url>,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Supported grant flags.
	pub supported_grants: SupportedGrants,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Descriptor for Google's OAuth 2.0 endpoints with every grant enabled.
	pub fn google() -> Result<Self, ProviderDescriptorError> {
		Self::builder(ProviderId::new("google")?)
			.authorization_endpoint(parse_endpoint("authorization", GOOGLE_AUTHORIZATION_ENDPOINT)?)
			.token_endpoint(parse_endpoint("token", GOOGLE_TOKEN_ENDPOINT)?)
			.device_authorization_endpoint(parse_endpoint(
				"device_authorization",
				GOOGLE_DEVICE_AUTHORIZATION_ENDPOINT,
			)?)
			.support_grants([
				GrantType::AuthorizationCode,
				GrantType::RefreshToken,
				GrantType::DeviceCode,
			])
			.build()
	}

	/// Checks whether the descriptor supports a given grant.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}

	/// Joins scopes using the provider's delimiter.
	pub fn join_scopes<'a, I>(&self, scopes: I) -> String
	where
		I: IntoIterator<Item = &'a str>,
	{
		let delimiter = self.quirks.scope_delimiter.to_string();

		scopes.into_iter().collect::<Vec<_>>().join(&delimiter)
	}
}

fn parse_endpoint(endpoint: &'static str, raw: &str) -> Result<Url, ProviderDescriptorError> {
	Url::parse(raw).map_err(|source| ProviderDescriptorError::MalformedEndpoint { endpoint, source })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn google_preset_enables_every_grant() {
		let descriptor = ProviderDescriptor::google().expect("Google preset should validate.");

		assert!(descriptor.supports(GrantType::DeviceCode));
		assert!(descriptor.supports(GrantType::RefreshToken));
		assert!(descriptor.supports(GrantType::AuthorizationCode));
		assert_eq!(
			descriptor.endpoints.device_authorization.as_ref().map(Url::as_str),
			Some("https://oauth2.googleapis.com/device/code")
		);
		assert_eq!(descriptor.endpoints.token.as_str(), "https://oauth2.googleapis.com/token");
		assert_eq!(descriptor.quirks.device_poll_interval(), Duration::seconds(5));
	}

	#[test]
	fn join_scopes_uses_the_configured_delimiter() {
		let mut descriptor = ProviderDescriptor::google().expect("Google preset should validate.");

		assert_eq!(descriptor.join_scopes(["a", "b"]), "a b");

		descriptor.quirks.scope_delimiter = ',';

		assert_eq!(descriptor.join_scopes(["a", "b"]), "a,b");
	}
}
