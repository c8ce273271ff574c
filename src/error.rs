//! Crate-level error types shared across flows, the retry engine, stores, and collaborators.

// self
use crate::{_prelude::*, auth::IdentityId};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Credential could not be produced for an identity; never retried.
	#[error(transparent)]
	Authentication(#[from] AuthError),
	/// Temporary token-endpoint failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Remote service reported an exhausted quota or rate limit.
	#[error("Remote quota exhausted: {message}.")]
	QuotaExceeded {
		/// Provider-supplied message.
		message: String,
		/// Server-provided retry delay hint, when one was recognized.
		retry_after: Option<Duration>,
	},
	/// Remote service is overloaded or temporarily unavailable.
	#[error("Remote service unavailable: {message}.")]
	ServiceUnavailable {
		/// Provider-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Any other remote failure; surfaced immediately and never retried.
	#[error("Remote call failed: {message}.")]
	FatalApi {
		/// Provider-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},

	/// Requested scopes exceed what was granted.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
}

/// Authentication failures. Always fatal for the identity being processed.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Client-secret document does not exist or cannot be read.
	#[error("Client secret material is missing at {path}.")]
	MissingClientSecret {
		/// Location that was inspected.
		path: String,
	},
	/// Client-secret document exists but cannot be interpreted.
	#[error("Client secret material is malformed: {reason}.")]
	MalformedClientSecret {
		/// Parser or validation message.
		reason: String,
	},
	/// No usable credential exists and interactive grants are disabled.
	#[error("Authentication required for `{identity}` but interactive mode is disabled.")]
	InteractionRequired {
		/// Identity lacking a credential.
		identity: IdentityId,
	},
	/// A stored credential exists but lacks scopes and interactive grants are disabled.
	#[error("Stored credential for `{identity}` is missing scopes [{missing}] and interactive mode is disabled.")]
	InsufficientScope {
		/// Identity owning the credential.
		identity: IdentityId,
		/// Space-delimited scopes that were not granted.
		missing: String,
	},
	/// Device code lifetime elapsed before the operator approved the request.
	#[error("Device code expired before authorization completed.")]
	DeviceCodeExpired,
	/// Every configured grant method failed.
	#[error("All grant methods failed for `{identity}`: {}.", describe_failures(.failures))]
	GrantsExhausted {
		/// Identity being authorized.
		identity: IdentityId,
		/// One entry per attempted grant method, in attempt order.
		failures: Vec<GrantFailure>,
	},
}

/// Outcome of a single failed grant method.
#[derive(Debug)]
pub struct GrantFailure {
	/// Stable label of the grant method.
	pub method: &'static str,
	/// Error returned by the method.
	pub error: Box<Error>,
}
impl Display for GrantFailure {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}: {}", self.method, self.error)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor or registration contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Descriptor does not enable the requested grant.
	#[error("Descriptor `{descriptor}` does not enable the {grant} grant.")]
	UnsupportedGrant {
		/// Provider identifier string.
		descriptor: String,
		/// Disabled grant label.
		grant: &'static str,
	},
	/// Cached record is missing a refresh secret.
	#[error("Cached credential is missing a refresh token.")]
	MissingRefreshToken,
	/// Request scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Credential builder validation failed.
	#[error("Unable to build credential.")]
	CredentialBuild(#[from] crate::auth::CredentialBuilderError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary token-endpoint failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Endpoint responded with malformed JSON that could not be parsed.
	#[error("Endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the remote endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the remote endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Terminal failure for one identity, tagged with the operation that failed.
#[derive(Debug, ThisError)]
#[error("Identity `{identity}` failed during {operation}: {error}")]
pub struct IdentityFailure {
	/// Identity whose processing stopped.
	pub identity: IdentityId,
	/// Operation label (for example `obtain`).
	pub operation: &'static str,
	/// Underlying error.
	#[source]
	pub error: Error,
}

fn describe_failures(failures: &[GrantFailure]) -> String {
	if failures.is_empty() {
		return "no grant methods are configured".into();
	}

	failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn grants_exhausted_lists_every_method() {
		let identity = IdentityId::new("user-1").expect("Identity fixture should be valid.");
		let err = Error::from(AuthError::GrantsExhausted {
			identity,
			failures: vec![
				GrantFailure {
					method: "device_authorization",
					error: Box::new(AuthError::DeviceCodeExpired.into()),
				},
				GrantFailure {
					method: "manual_code",
					error: Box::new(Error::InvalidGrant { reason: "declined".into() }),
				},
			],
		});
		let rendered = err.to_string();

		assert!(rendered.contains("user-1"));
		assert!(rendered.contains("device_authorization: Device code expired"));
		assert!(rendered.contains("manual_code: Provider rejected the grant: declined."));
	}

	#[test]
	fn empty_grant_list_is_reported() {
		let identity = IdentityId::new("user-2").expect("Identity fixture should be valid.");
		let err = AuthError::GrantsExhausted { identity, failures: Vec::new() };

		assert!(err.to_string().contains("no grant methods are configured"));
	}

	#[test]
	fn identity_failure_names_identity_and_operation() {
		let failure = IdentityFailure {
			identity: IdentityId::new("admin").expect("Identity fixture should be valid."),
			operation: "obtain",
			error: Error::FatalApi { message: "boom".into(), status: Some(500) },
		};

		assert_eq!(
			failure.to_string(),
			"Identity `admin` failed during obtain: Remote call failed: boom."
		);
		assert!(StdError::source(&failure).is_some());
	}
}
