//! Resilient integration layer for a daily-schedule assistant: an OAuth 2.0 credential broker
//! that survives headless runs, a hint-aware retry engine for quota-limited model APIs, and a
//! normalizer that flattens paged list responses into clean entity sequences.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod flows;
pub mod http;
pub mod normalize;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod retry;
pub mod service;
pub mod sleep;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
	};
	// self
	use crate::{
		auth::IdentityId,
		error::{ConfigError, TransientError, TransportError},
		flows::{CredentialBroker, DeviceCodePrompt, Operator},
		http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
		oauth::{ReqwestTransportErrorMapper, TransportErrorMapper},
		provider::{
			ClientRegistration, DefaultProviderStrategy, GrantType, ProviderDescriptor,
			ProviderStrategy,
		},
		sleep::{SleepFuture, Sleeper},
		store::{CredentialStore, MemoryStore},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = CredentialBroker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Sleeper that returns immediately and records every requested duration.
	#[derive(Clone, Debug, Default)]
	pub struct RecordingSleeper(Arc<Mutex<Vec<Duration>>>);
	impl RecordingSleeper {
		/// Returns every duration requested so far, in order.
		pub fn recorded(&self) -> Vec<Duration> {
			self.0.lock().clone()
		}

		/// Sum of every recorded duration.
		pub fn total(&self) -> Duration {
			self.0.lock().iter().fold(Duration::ZERO, |acc, value| acc + *value)
		}
	}
	impl Sleeper for RecordingSleeper {
		fn sleep(&self, duration: Duration) -> SleepFuture {
			self.0.lock().push(duration);

			Box::pin(async {})
		}
	}

	/// Operator that never touches the terminal; records device prompts and replays a fixed
	/// authorization code (or refuses when none is configured).
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedOperator {
		/// User codes shown to the operator, in order.
		pub shown_codes: Arc<Mutex<Vec<String>>>,
		/// Authorize URLs presented for the manual-code fallback.
		pub authorize_urls: Arc<Mutex<Vec<Url>>>,
		code: Option<String>,
	}
	impl ScriptedOperator {
		/// Builds an operator that answers the manual-code prompt with `code`.
		pub fn answering(code: impl Into<String>) -> Self {
			Self { code: Some(code.into()), ..Default::default() }
		}
	}
	impl Operator for ScriptedOperator {
		fn present_device_code(&self, _identity: &IdentityId, prompt: &DeviceCodePrompt) {
			self.shown_codes.lock().push(prompt.user_code.clone());
		}

		fn authorization_code(&self, _identity: &IdentityId, authorize_url: &Url) -> Result<String> {
			self.authorize_urls.lock().push(authorize_url.clone());

			self.code.clone().ok_or_else(|| Error::InvalidGrant {
				reason: "Operator declined to provide an authorization code".into(),
			})
		}
	}

	/// Form request observed by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub struct RecordedRequest {
		/// Target URL.
		pub url: String,
		/// Decoded form fields.
		pub form: BTreeMap<String, String>,
	}

	/// In-process transport that replays queued `(status, body)` answers in order and records
	/// every request. Running out of answers is reported as a connection failure.
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedHttpClient {
		answers: Arc<Mutex<VecDeque<(u16, String)>>>,
		requests: Arc<Mutex<Vec<RecordedRequest>>>,
	}
	impl ScriptedHttpClient {
		/// Queues one answer.
		pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
			self.answers.lock().push_back((status, body.into()));

			self
		}

		/// Every request seen so far, in order.
		pub fn requests(&self) -> Vec<RecordedRequest> {
			self.requests.lock().clone()
		}

		/// Requests whose URL ends with `path`.
		pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
			self.requests().into_iter().filter(|request| request.url.ends_with(path)).collect()
		}
	}
	impl TokenHttpClient for ScriptedHttpClient {
		type Handle = ScriptedHandle;
		type TransportError = std::io::Error;

		fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
			ScriptedHandle { client: self.clone(), slot }
		}
	}

	/// Handle returned by [`ScriptedHttpClient`].
	#[derive(Clone, Debug)]
	pub struct ScriptedHandle {
		client: ScriptedHttpClient,
		slot: ResponseMetadataSlot,
	}
	impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
		type Error = HttpClientError<std::io::Error>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, request: HttpRequest) -> Self::Future {
			Box::pin(async move {
				self.slot.take();

				let form = url::form_urlencoded::parse(request.body()).into_owned().collect();

				self.client
					.requests
					.lock()
					.push(RecordedRequest { url: request.uri().to_string(), form });

				let (status, body) = self.client.answers.lock().pop_front().ok_or_else(|| {
					HttpClientError::Io(std::io::Error::new(
						std::io::ErrorKind::ConnectionRefused,
						"no scripted answer left",
					))
				})?;

				self.slot.store(ResponseMetadata { status: Some(status), retry_after: None });

				let mut response = HttpResponse::new(body.into_bytes());

				*response.status_mut() =
					StatusCode::from_u16(status).map_err(|e| HttpClientError::Other(e.to_string()))?;
				response
					.headers_mut()
					.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

				Ok(response)
			})
		}
	}

	/// Mapper paired with [`ScriptedHttpClient`].
	#[derive(Clone, Debug, Default)]
	pub struct ScriptedTransportErrorMapper;
	impl TransportErrorMapper<std::io::Error> for ScriptedTransportErrorMapper {
		fn map_transport_error(
			&self,
			_strategy: &dyn ProviderStrategy,
			_grant: GrantType,
			meta: Option<&ResponseMetadata>,
			error: HttpClientError<std::io::Error>,
		) -> Error {
			match error {
				HttpClientError::Io(inner) => TransportError::Io(inner).into(),
				HttpClientError::Http(inner) => ConfigError::from(inner).into(),
				other => TransientError::TokenEndpoint {
					message: other.to_string(),
					status: meta.and_then(|meta| meta.status),
					retry_after: None,
				}
				.into(),
			}
		}
	}

	/// Broker driven by a [`ScriptedHttpClient`].
	pub type ScriptedTestBroker = CredentialBroker<ScriptedHttpClient, ScriptedTransportErrorMapper>;

	/// Constructs a [`CredentialBroker`] over a scripted transport, an in-memory store, a
	/// recording sleeper, and `operator`.
	pub fn build_scripted_test_broker(
		descriptor: ProviderDescriptor,
		registration: ClientRegistration,
		operator: ScriptedOperator,
	) -> (ScriptedTestBroker, ScriptedHttpClient, Arc<MemoryStore>, RecordingSleeper) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let http_client = ScriptedHttpClient::default();
		let sleeper = RecordingSleeper::default();
		let broker = CredentialBroker::with_http_client(
			store,
			descriptor,
			Arc::new(DefaultProviderStrategy),
			registration,
			http_client.clone(),
			Arc::new(ScriptedTransportErrorMapper),
		)
		.with_sleeper(Arc::new(sleeper.clone()))
		.with_operator(Arc::new(operator));

		(broker, http_client, store_backend, sleeper)
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`CredentialBroker`] backed by an in-memory store, the default provider
	/// strategy, a recording sleeper, and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_broker(
		descriptor: ProviderDescriptor,
		registration: ClientRegistration,
	) -> (ReqwestTestBroker, Arc<MemoryStore>, RecordingSleeper) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let strategy: Arc<dyn ProviderStrategy> = Arc::new(DefaultProviderStrategy);
		let http_client = test_reqwest_http_client();
		let mapper = Arc::new(ReqwestTransportErrorMapper);
		let sleeper = RecordingSleeper::default();
		let broker = CredentialBroker::with_http_client(
			store,
			descriptor,
			strategy,
			registration,
			http_client,
			mapper,
		)
		.with_sleeper(Arc::new(sleeper.clone()))
		.with_operator(Arc::new(ScriptedOperator::default()));

		(broker, store_backend, sleeper)
	}
}

mod _prelude {
	pub use std::{
		borrow::Cow,
		collections::{BTreeMap, HashMap, HashSet, hash_map::DefaultHasher},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
