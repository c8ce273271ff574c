//! Credential lifecycle: load, refresh, grant, persist.

// self
use crate::{
	_prelude::*,
	auth::{Capability, Credential, IdentityId, ScopeSet},
	error::{AuthError, GrantFailure, IdentityFailure},
	flows::{CredentialBroker, GrantMethod, RegrantScope, common},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, events},
};

/// Request for a usable credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObtainRequest {
	/// Identity the credential belongs to.
	pub identity: IdentityId,
	/// Scopes the returned credential must cover.
	pub scope: ScopeSet,
	/// Whether interactive grant methods may run.
	pub interactive: bool,
}
impl ObtainRequest {
	/// Interactive request for `scope`.
	pub fn new(identity: IdentityId, scope: ScopeSet) -> Self {
		Self { identity, scope, interactive: true }
	}

	/// Interactive request for the scopes of `capabilities`.
	pub fn for_capabilities<'a, I>(identity: IdentityId, capabilities: I) -> Self
	where
		I: IntoIterator<Item = &'a Capability>,
	{
		Self::new(identity, Capability::scope_set(capabilities))
	}

	/// Enables or disables interactive grants.
	pub fn with_interactive(mut self, interactive: bool) -> Self {
		self.interactive = interactive;

		self
	}
}

// What a stored credential contributed before grants were considered.
#[derive(Default)]
struct Fallthrough {
	previous_scopes: Option<ScopeSet>,
	missing_scopes: Option<String>,
}

impl<C, M> CredentialBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a valid credential covering `request.scope`, persisting it first.
	///
	/// Order: stored credential, refresh of an expired one, then the configured grant methods
	/// (only when `request.interactive`). Unreadable records and failed refreshes are logged
	/// and treated as absent. Calls for the same identity are serialized.
	pub async fn obtain(&self, request: &ObtainRequest) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Obtain;

		let span = FlowSpan::new(KIND, "obtain");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let guard = common::flow_guard(self, &request.identity);
				let _serialized = guard.lock().await;

				self.obtain_locked(request).await
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Obtains credentials for several identities in order.
	///
	/// A failure for one identity is recorded in its slot and never stops the others.
	pub async fn obtain_each(
		&self,
		requests: &[ObtainRequest],
	) -> Vec<Result<Credential, IdentityFailure>> {
		let mut results = Vec::with_capacity(requests.len());

		for request in requests {
			results.push(self.obtain(request).await.map_err(|error| IdentityFailure {
				identity: request.identity.clone(),
				operation: "obtain",
				error,
			}));
		}

		results
	}

	/// Deletes the persisted credential of `identity`; returns whether one existed.
	pub async fn forget(&self, identity: &IdentityId) -> Result<bool> {
		let guard = common::flow_guard(self, identity);
		let _serialized = guard.lock().await;

		Ok(self.store.delete(identity).await?)
	}

	async fn obtain_locked(&self, request: &ObtainRequest) -> Result<Credential> {
		let identity = &request.identity;
		let stored = match self.store.load(identity).await {
			Ok(stored) => stored,
			Err(e) => {
				events::stored_credential_unreadable(identity, &e);

				None
			},
		};
		let mut fallthrough = Fallthrough::default();

		if let Some(credential) = stored {
			if !credential.covers(&request.scope) {
				let missing = credential.scopes.missing(&request.scope).join(" ");

				events::stored_scopes_insufficient(identity, &missing);

				fallthrough.missing_scopes = Some(missing);
			} else if !credential.is_expired() {
				return self.persist(identity, credential, "stored").await;
			} else if credential.refresh_token.is_some() {
				match self.refresh(&credential).await {
					Ok(refreshed) => return self.persist(identity, refreshed, "refresh").await,
					Err(e) => events::refresh_failed(identity, &e),
				}
			}

			fallthrough.previous_scopes = Some(credential.scopes);
		}
		if !request.interactive {
			let err = match fallthrough.missing_scopes {
				Some(missing) => AuthError::InsufficientScope { identity: identity.clone(), missing },
				None => AuthError::InteractionRequired { identity: identity.clone() },
			};

			return Err(err.into());
		}

		let scope = match (self.regrant_scope, &fallthrough.previous_scopes) {
			(RegrantScope::RequestedAndPrevious, Some(previous)) => request.scope.union(previous),
			_ => request.scope.clone(),
		};
		let mut failures = Vec::new();

		for method in self.grant_methods.iter().copied() {
			match self.attempt_grant(method, identity, &scope).await {
				Ok(credential) if credential.covers(&request.scope) =>
					return self.persist(identity, credential, method.as_str()).await,
				Ok(credential) => {
					let error = Error::InsufficientScope {
						reason: format!(
							"granted scopes lack [{}]",
							credential.scopes.missing(&request.scope).join(" ")
						),
					};

					events::grant_method_failed(identity, method.as_str(), &error);
					failures.push(GrantFailure { method: method.as_str(), error: Box::new(error) });
				},
				Err(error) => {
					events::grant_method_failed(identity, method.as_str(), &error);
					failures.push(GrantFailure { method: method.as_str(), error: Box::new(error) });
				},
			}
		}

		Err(AuthError::GrantsExhausted { identity: identity.clone(), failures }.into())
	}

	/// Runs one grant method and binds its tokens to the registration.
	async fn attempt_grant(
		&self,
		method: GrantMethod,
		identity: &IdentityId,
		scope: &ScopeSet,
	) -> Result<Credential> {
		let issued_at = OffsetDateTime::now_utc();
		let grant = match method {
			GrantMethod::DeviceAuthorization => self.device_authorization(identity, scope).await?,
			GrantMethod::ManualCode => self.manual_code(identity, scope).await?,
		};

		grant.into_credential(
			self.registration.token_endpoint(&self.descriptor),
			&self.registration.client_id,
			&self.registration.client_secret,
			scope,
			issued_at,
		)
	}

	async fn persist(
		&self,
		identity: &IdentityId,
		credential: Credential,
		source: &'static str,
	) -> Result<Credential> {
		self.store.save(identity, &credential).await?;

		events::credential_ready(identity, source);

		Ok(credential)
	}
}
