//! Device-authorization grant (RFC 8628) with interval-respecting polling.
//!
//! The broker requests a device code, shows the verification URL and user code through the
//! [`Operator`](crate::flows::Operator), then polls the token endpoint. `slow_down` widens
//! the interval and the server-declared lifetime bounds the whole exchange: before every
//! wait the broker checks that `elapsed + interval` still fits, where `elapsed` is the
//! larger of wall-clock time and total time slept.

// crates.io
use oauth2::HttpResponse;
// self
use crate::{
	_prelude::*,
	auth::{IdentityId, ScopeSet, TokenSecret},
	error::{AuthError, ConfigError, TransientError},
	flows::{CredentialBroker, common},
	http::{self, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	oauth::{self, TokenGrant, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{DevicePollSignal, GrantType},
};

/// What the operator needs to approve a device-code request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceCodePrompt {
	/// Page where the operator enters the code.
	pub verification_url: Url,
	/// Short code to type on the verification page.
	pub user_code: String,
	/// Lifetime of the device code.
	pub expires_in: Duration,
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorizationResponse {
	device_code: String,
	user_code: String,
	#[serde(alias = "verification_uri")]
	verification_url: Url,
	#[serde(default)]
	interval: Option<u64>,
	#[serde(default)]
	expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DeviceTokenResponse {
	access_token: String,
	#[serde(default)]
	refresh_token: Option<String>,
	#[serde(default)]
	expires_in: Option<u64>,
	#[serde(default)]
	scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
	error: String,
	#[serde(default)]
	error_description: Option<String>,
}

enum PollOutcome {
	Granted(TokenGrant),
	Pending,
	SlowDown,
	Expired,
}

impl<C, M> CredentialBroker<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Runs the device-authorization grant for `identity` and returns the issued tokens.
	pub async fn device_authorization(
		&self,
		identity: &IdentityId,
		scope: &ScopeSet,
	) -> Result<TokenGrant> {
		const KIND: FlowKind = FlowKind::DeviceAuthorization;

		let span = FlowSpan::new(KIND, "device_authorization");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.run_device_authorization(identity, scope)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn run_device_authorization(
		&self,
		identity: &IdentityId,
		scope: &ScopeSet,
	) -> Result<TokenGrant> {
		common::ensure_supported(&self.descriptor, GrantType::DeviceCode)?;

		let quirks = &self.descriptor.quirks;
		let device_endpoint = self.descriptor.endpoints.device_authorization.as_ref().ok_or_else(
			|| ConfigError::UnsupportedGrant {
				descriptor: self.descriptor.id.to_string(),
				grant: GrantType::DeviceCode.as_str(),
			},
		)?;
		let started = OffsetDateTime::now_utc();
		let authorization = self.request_device_code(device_endpoint, scope).await?;
		let lifetime = authorization
			.expires_in
			.filter(|secs| *secs > 0)
			.map_or_else(|| quirks.device_code_lifetime(), secs_to_duration);
		let mut interval = authorization
			.interval
			.filter(|secs| *secs > 0)
			.map_or_else(|| quirks.device_poll_interval(), secs_to_duration);

		self.operator.present_device_code(
			identity,
			&DeviceCodePrompt {
				verification_url: authorization.verification_url.clone(),
				user_code: authorization.user_code.clone(),
				expires_in: lifetime,
			},
		);

		let mut slept = Duration::ZERO;

		loop {
			let elapsed = (OffsetDateTime::now_utc() - started).max(slept);

			if elapsed.saturating_add(interval) > lifetime {
				return Err(AuthError::DeviceCodeExpired.into());
			}

			self.sleeper.sleep(interval).await;

			slept = slept.saturating_add(interval);

			match self.poll_device_token(&authorization.device_code).await? {
				PollOutcome::Granted(grant) => return Ok(grant),
				PollOutcome::Pending => {},
				PollOutcome::SlowDown =>
					interval = interval.saturating_add(quirks.slow_down_increment()),
				PollOutcome::Expired => return Err(AuthError::DeviceCodeExpired.into()),
			}
		}
	}

	async fn request_device_code(
		&self,
		endpoint: &Url,
		scope: &ScopeSet,
	) -> Result<DeviceAuthorizationResponse> {
		let mut form = BTreeMap::new();

		form.insert("client_id".to_owned(), self.registration.client_id.clone());

		if !scope.is_empty() {
			form.insert("scope".to_owned(), self.descriptor.join_scopes(scope.iter()));
		}

		self.strategy.augment_token_request(GrantType::DeviceCode, &mut form);

		let (response, meta) = self.post_device_form(endpoint, &form).await?;

		if !response.status().is_success() {
			return Err(self.error_from_body(&response, meta.as_ref()));
		}

		parse_json(&response)
	}

	async fn poll_device_token(&self, device_code: &str) -> Result<PollOutcome> {
		let token_endpoint = self.registration.token_endpoint(&self.descriptor);
		let mut form = BTreeMap::new();

		form.insert("client_id".to_owned(), self.registration.client_id.clone());
		form.insert(
			"client_secret".to_owned(),
			self.registration.client_secret.expose().to_owned(),
		);
		form.insert("device_code".to_owned(), device_code.to_owned());
		form.insert("grant_type".to_owned(), GrantType::DeviceCode.as_str().to_owned());

		self.strategy.augment_token_request(GrantType::DeviceCode, &mut form);

		let (response, meta) = self.post_device_form(&token_endpoint, &form).await?;

		if let Ok(body) = serde_json::from_slice::<OAuthErrorBody>(response.body()) {
			return match self.strategy.classify_device_poll(&body.error) {
				DevicePollSignal::Pending => Ok(PollOutcome::Pending),
				DevicePollSignal::SlowDown => Ok(PollOutcome::SlowDown),
				DevicePollSignal::Expired => Ok(PollOutcome::Expired),
				DevicePollSignal::Abort => Err(oauth::map_oauth_error(
					self.strategy.as_ref(),
					GrantType::DeviceCode,
					&body.error,
					body.error_description.as_deref(),
					meta.as_ref(),
				)),
			};
		}
		if !response.status().is_success() {
			return Err(self.error_from_body(&response, meta.as_ref()));
		}

		let token: DeviceTokenResponse = parse_json(&response)?;
		let expires_in = token.expires_in.map(oauth::expires_in_from_secs).transpose()?;
		let scopes =
			common::parse_scope(token.scope.as_deref(), self.descriptor.quirks.scope_delimiter)?;

		Ok(PollOutcome::Granted(TokenGrant {
			access_token: TokenSecret::new(token.access_token),
			refresh_token: token.refresh_token.map(TokenSecret::new),
			expires_in,
			scopes,
		}))
	}

	async fn post_device_form(
		&self,
		url: &Url,
		form: &BTreeMap<String, String>,
	) -> Result<(HttpResponse, Option<ResponseMetadata>)> {
		let slot = ResponseMetadataSlot::default();

		match http::post_form(self.http_client.as_ref(), slot.clone(), url, form).await {
			Ok(response) => Ok((response, slot.take())),
			Err(err) => {
				let meta = slot.take();

				Err(self.transport_mapper.map_transport_error(
					self.strategy.as_ref(),
					GrantType::DeviceCode,
					meta.as_ref(),
					err,
				))
			},
		}
	}

	fn error_from_body(&self, response: &HttpResponse, meta: Option<&ResponseMetadata>) -> Error {
		let status = response.status().as_u16();

		match serde_json::from_slice::<OAuthErrorBody>(response.body()) {
			Ok(body) => oauth::map_oauth_error(
				self.strategy.as_ref(),
				GrantType::DeviceCode,
				&body.error,
				body.error_description.as_deref(),
				meta,
			),
			Err(_) => TransientError::TokenEndpoint {
				message: format!("device endpoint answered with HTTP {status}"),
				status: Some(status),
				retry_after: meta.and_then(|meta| meta.retry_after),
			}
			.into(),
		}
	}
}

fn parse_json<T>(response: &HttpResponse) -> Result<T>
where
	T: for<'de> Deserialize<'de>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::TokenResponseParse { source, status: Some(response.status().as_u16()) }
			.into()
	})
}

fn secs_to_duration(secs: u64) -> Duration {
	Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}
