//! Manual authorization-code fallback with PKCE.
//!
//! The broker builds an authorize URL (S256 challenge, random state, offline access), the
//! operator opens it and pastes back either the bare code or the whole redirect URL, and the
//! code is exchanged at the token endpoint.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	auth::{IdentityId, ScopeSet},
	error::ConfigError,
	flows::{CredentialBroker, common},
	http::TokenHttpClient,
	oauth::{BasicFacade, OAuth2Facade, TokenGrant, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{GrantType, ProviderDescriptor},
};

/// Redirect URI used when none is configured.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost";

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods surfaced via [`AuthorizationSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// One manual-code handshake: the authorize URL plus the secrets needed to redeem its code.
#[derive(Clone)]
pub struct AuthorizationSession {
	/// Scopes requested by the authorize URL.
	pub scope: ScopeSet,
	/// Opaque state value echoed back on the redirect.
	pub state: String,
	/// Redirect URI embedded in the authorize URL.
	pub redirect_uri: Url,
	/// URL the operator opens in a browser.
	pub authorize_url: Url,
	pkce: PkcePair,
}
impl AuthorizationSession {
	/// Builds a fresh session with a random state and PKCE verifier.
	pub fn new(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		scope: ScopeSet,
		redirect_uri: Url,
	) -> Self {
		let state = random_string(STATE_LEN);
		let pkce = PkcePair::generate();
		let authorize_url =
			build_authorize_url(descriptor, client_id, &redirect_uri, &scope, &state, &pkce);

		Self { scope, state, redirect_uri, authorize_url, pkce }
	}

	/// PKCE code challenge derived from the secret verifier.
	pub fn code_challenge(&self) -> &str {
		&self.pkce.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn code_challenge_method(&self) -> PkceCodeChallengeMethod {
		self.pkce.method
	}

	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state {
			Ok(())
		} else {
			Err(Error::InvalidGrant { reason: "Authorization state mismatch.".into() })
		}
	}

	/// Extracts the authorization code from operator input.
	///
	/// Accepts a bare code or a pasted redirect URL. A pasted URL must carry the session's
	/// `state`, and an `error` parameter rejects the grant.
	pub fn code_from_input(&self, input: &str) -> Result<String> {
		let input = input.trim();

		if input.is_empty() {
			return Err(Error::InvalidGrant { reason: "No authorization code was provided.".into() });
		}

		let Ok(redirect) = Url::parse(input) else {
			return Ok(input.to_owned());
		};
		let mut code = None;
		let mut state = None;

		for (key, value) in redirect.query_pairs() {
			match key.as_ref() {
				"code" => code = Some(value.into_owned()),
				"state" => state = Some(value.into_owned()),
				"error" =>
					return Err(Error::InvalidGrant {
						reason: format!("Authorization was denied: {value}"),
					}),
				_ => {},
			}
		}

		let state = state.ok_or_else(|| Error::InvalidGrant {
			reason: "Redirect URL does not carry the authorization state.".into(),
		})?;

		self.validate_state(&state)?;

		code.filter(|code| !code.is_empty()).ok_or_else(|| Error::InvalidGrant {
			reason: "Redirect URL does not carry an authorization code.".into(),
		})
	}
}
impl Debug for AuthorizationSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizationSession")
			.field("scope", &self.scope)
			.field("state", &self.state)
			.field("redirect_uri", &self.redirect_uri)
			.field("authorize_url", &self.authorize_url)
			.field("code_challenge", &self.pkce.challenge)
			.field("code_challenge_method", &self.pkce.method)
			.finish()
	}
}

#[derive(Clone)]
struct PkcePair {
	verifier: String,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier, challenge, method: PkceCodeChallengeMethod::S256 }
	}
}

impl<C, M> CredentialBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Runs the manual-code fallback for `identity` and returns the issued tokens.
	pub async fn manual_code(&self, identity: &IdentityId, scope: &ScopeSet) -> Result<TokenGrant> {
		const KIND: FlowKind = FlowKind::ManualCode;

		let span = FlowSpan::new(KIND, "manual_code");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				common::ensure_supported(&self.descriptor, GrantType::AuthorizationCode)?;

				let redirect_uri = match &self.redirect_uri {
					Some(uri) => uri.clone(),
					None => Url::parse(DEFAULT_REDIRECT_URI)
						.map_err(|source| ConfigError::InvalidRedirect { source })?,
				};
				let session = AuthorizationSession::new(
					&self.descriptor,
					&self.registration.client_id,
					scope.clone(),
					redirect_uri,
				);
				let input = self.operator.authorization_code(identity, &session.authorize_url)?;
				let code = session.code_from_input(&input)?;
				let token_uri = self.registration.token_endpoint(&self.descriptor);
				let facade = <BasicFacade<C, M>>::new(
					&self.descriptor,
					&self.registration.client_id,
					&self.registration.client_secret,
					&token_uri,
					Some(&session.redirect_uri),
					self.http_client.clone(),
					self.transport_mapper.clone(),
				)?;

				facade
					.exchange_authorization_code(self.strategy.as_ref(), &code, &session.pkce.verifier)
					.await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}

fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
	scope: &ScopeSet,
	state: &str,
	pkce: &PkcePair,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("response_type", "code");
	pairs.append_pair("client_id", client_id);
	pairs.append_pair("redirect_uri", redirect_uri.as_str());

	if !scope.is_empty() {
		pairs.append_pair("scope", &descriptor.join_scopes(scope.iter()));
	}

	pairs.append_pair("state", state);
	pairs.append_pair("code_challenge", &pkce.challenge);
	pairs.append_pair("code_challenge_method", pkce.method.as_str());
	// Offline access is what makes the provider issue a refresh token.
	pairs.append_pair("access_type", "offline");
	pairs.append_pair("prompt", "consent");

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let mut hasher = Sha256::new();

	hasher.update(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(hasher.finalize())
}
