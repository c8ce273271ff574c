//! Persistable OAuth credential, lifecycle helpers, and builder.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, TokenSecret},
};

/// Lifecycle status of a credential at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Access token is usable (or carries no expiry at all).
	Active,
	/// Access token passed its expiry instant.
	Expired,
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no (or an empty) access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
}

/// OAuth credential for one identity, in the shape it is persisted.
///
/// The same struct is the on-disk record: `access_token` (the legacy `token` key is
/// accepted on load), optional `refresh_token`, `token_uri`, `client_id`, `client_secret`,
/// `scopes`, and an optional RFC 3339 `expiry`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Short-lived access token.
	#[serde(alias = "token")]
	pub access_token: TokenSecret,
	/// Long-lived refresh token, if the provider issued one.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Token endpoint used for refreshes.
	pub token_uri: Url,
	/// OAuth client identifier that minted the credential.
	pub client_id: String,
	/// OAuth client secret paired with `client_id`.
	pub client_secret: TokenSecret,
	/// Scopes granted to the access token.
	pub scopes: ScopeSet,
	/// Expiry instant; `None` means the provider did not declare one.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub expiry: Option<OffsetDateTime>,
}
impl Credential {
	/// Returns a builder seeded with client material and the granted scopes.
	pub fn builder(
		token_uri: Url,
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		scopes: ScopeSet,
	) -> CredentialBuilder {
		CredentialBuilder::new(token_uri, client_id.into(), client_secret.into(), scopes)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		match self.expiry {
			Some(expiry) if instant >= expiry => CredentialStatus::Expired,
			_ => CredentialStatus::Active,
		}
	}

	/// Returns `true` if the credential has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expired)
	}

	/// Returns `true` if the credential is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` when the granted scopes are a superset of `required`.
	pub fn covers(&self, required: &ScopeSet) -> bool {
		self.scopes.covers(required)
	}

	/// Applies a refresh response in place.
	///
	/// The refresh token is only replaced when the provider rotated it.
	pub fn apply_refresh(
		&mut self,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
		expiry: Option<OffsetDateTime>,
	) {
		self.access_token = access_token;

		if let Some(rotated) = refresh_token {
			self.refresh_token = Some(rotated);
		}

		self.expiry = expiry;
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("token_uri", &self.token_uri.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("scopes", &self.scopes)
			.field("expiry", &self.expiry)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug)]
pub struct CredentialBuilder {
	token_uri: Url,
	client_id: String,
	client_secret: TokenSecret,
	scopes: ScopeSet,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	fn new(token_uri: Url, client_id: String, client_secret: String, scopes: ScopeSet) -> Self {
		Self {
			token_uri,
			client_id,
			client_secret: TokenSecret::new(client_secret),
			scopes,
			access_token: None,
			refresh_token: None,
			issued_at: None,
			expires_at: None,
			expires_in: None,
		}
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the instant relative expiries are measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let access_token = self
			.access_token
			.filter(|token| !token.is_empty())
			.ok_or(CredentialBuilderError::MissingAccessToken)?;
		let expiry = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) =>
				Some(self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta),
			(None, None) => None,
		};

		Ok(Credential {
			access_token,
			refresh_token: self.refresh_token,
			token_uri: self.token_uri,
			client_id: self.client_id,
			client_secret: self.client_secret,
			scopes: self.scopes,
			expiry,
		})
	}
}
