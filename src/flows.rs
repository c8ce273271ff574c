//! Credential acquisition for one identity at a time.
//!
//! [`CredentialBroker`] owns the transport, store, provider descriptor, client registration,
//! and operator so the grant flows ([`device`], [`manual_code`]) and refreshes only deal
//! with protocol logic. [`CredentialBroker::obtain`] walks the lifecycle
//! `load → refresh → grant → persist` and never prompts when interaction is disabled.

pub mod device;
pub mod manual_code;
pub mod obtain;
pub mod operator;

mod common;
mod refresh;

pub use device::*;
pub use manual_code::*;
pub use obtain::*;
pub use operator::*;

// self
use crate::{
	_prelude::*,
	auth::IdentityId,
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	provider::{ClientRegistration, ProviderDescriptor, ProviderStrategy},
	sleep::{Sleeper, TokioSleeper},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = CredentialBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Interactive grant strategies, tried in the broker's configured order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantMethod {
	/// OAuth 2.0 device-authorization grant.
	DeviceAuthorization,
	/// Authorization code pasted back by the operator.
	ManualCode,
}
impl GrantMethod {
	/// Returns a stable label suitable for log fields and failure reports.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantMethod::DeviceAuthorization => "device_authorization",
			GrantMethod::ManualCode => "manual_code",
		}
	}
}
impl Display for GrantMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Scopes requested when a stored credential has to be replaced by a fresh grant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegrantScope {
	/// Request exactly the scopes the caller asked for.
	#[default]
	Requested,
	/// Request the caller's scopes plus whatever the replaced credential held.
	RequestedAndPrevious,
}

/// Produces valid credentials for identities against a single provider.
#[derive(Clone)]
pub struct CredentialBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Persistence for per-identity credentials.
	pub store: Arc<dyn CredentialStore>,
	/// Provider descriptor that defines OAuth endpoints and quirks.
	pub descriptor: ProviderDescriptor,
	/// Strategy responsible for provider-specific error classification.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// OAuth client used for new grants.
	pub registration: ClientRegistration,
	operator: Arc<dyn Operator>,
	sleeper: Arc<dyn Sleeper>,
	grant_methods: Vec<GrantMethod>,
	regrant_scope: RegrantScope,
	redirect_uri: Option<Url>,
	flow_guards: Arc<Mutex<HashMap<IdentityId, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> CredentialBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	///
	/// Defaults: console operator, tokio sleeper, device authorization followed by the
	/// manual-code fallback, and [`RegrantScope::Requested`].
	pub fn with_http_client(
		store: Arc<dyn CredentialStore>,
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		registration: ClientRegistration,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			strategy,
			registration,
			operator: Arc::new(ConsoleOperator),
			sleeper: Arc::new(TokioSleeper),
			grant_methods: vec![GrantMethod::DeviceAuthorization, GrantMethod::ManualCode],
			regrant_scope: RegrantScope::default(),
			redirect_uri: None,
			flow_guards: Default::default(),
		}
	}

	/// Replaces the operator that sees device codes and supplies authorization codes.
	pub fn with_operator(mut self, operator: Arc<dyn Operator>) -> Self {
		self.operator = operator;

		self
	}

	/// Replaces the sleeper used between device-code polls.
	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.sleeper = sleeper;

		self
	}

	/// Replaces the ordered list of interactive grant methods.
	pub fn with_grant_methods(mut self, methods: impl IntoIterator<Item = GrantMethod>) -> Self {
		self.grant_methods = methods.into_iter().collect();

		self
	}

	/// Chooses which scopes a replacement grant requests.
	pub fn with_regrant_scope(mut self, regrant_scope: RegrantScope) -> Self {
		self.regrant_scope = regrant_scope;

		self
	}

	/// Overrides the redirect URI used by the manual-code fallback (`http://localhost`).
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	/// Interactive grant methods in attempt order.
	pub fn grant_methods(&self) -> &[GrantMethod] {
		&self.grant_methods
	}

	/// Configured re-grant scope policy.
	pub fn regrant_scope(&self) -> RegrantScope {
		self.regrant_scope
	}
}
#[cfg(feature = "reqwest")]
impl CredentialBroker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a broker with its own reqwest-backed transport.
	pub fn new(
		store: Arc<dyn CredentialStore>,
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		registration: ClientRegistration,
	) -> Self {
		Self::with_http_client(
			store,
			descriptor,
			strategy,
			registration,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for CredentialBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialBroker")
			.field("descriptor", &self.descriptor)
			.field("registration", &self.registration)
			.field("grant_methods", &self.grant_methods)
			.field("regrant_scope", &self.regrant_scope)
			.field("redirect_uri", &self.redirect_uri.as_ref().map(Url::as_str))
			.finish_non_exhaustive()
	}
}
