//! Refresh-token exchange against the credential's own token endpoint and client.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::ConfigError,
	flows::{CredentialBroker, common},
	http::TokenHttpClient,
	oauth::{BasicFacade, OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::GrantType,
};

impl<C, M> CredentialBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges the refresh token of `credential` and returns the updated credential.
	///
	/// Scopes and client material are carried over; the refresh token is only replaced when
	/// the provider rotates it. Nothing is persisted here.
	pub async fn refresh(&self, credential: &Credential) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				common::ensure_supported(&self.descriptor, GrantType::RefreshToken)?;

				let refresh_token =
					credential.refresh_token.as_ref().ok_or(ConfigError::MissingRefreshToken)?;
				let facade = <BasicFacade<C, M>>::new(
					&self.descriptor,
					&credential.client_id,
					&credential.client_secret,
					&credential.token_uri,
					None,
					self.http_client.clone(),
					self.transport_mapper.clone(),
				)?;
				let issued_at = OffsetDateTime::now_utc();
				let grant =
					facade.refresh_token(self.strategy.as_ref(), refresh_token.expose()).await?;
				let mut refreshed = credential.clone();

				refreshed.apply_refresh(
					grant.access_token,
					grant.refresh_token,
					grant.expires_in.map(|lifetime| issued_at + lifetime),
				);

				Ok(refreshed)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
