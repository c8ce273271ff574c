#![cfg(all(feature = "reqwest", feature = "test"))]

// crates.io
use httpmock::prelude::*;
// self
use agenda_broker::{
	_preludet::*,
	auth::{IdentityId, ProviderId, ScopeSet},
	error::{TransientError, TransportError},
	provider::{ClientRegistration, GrantType, ProviderDescriptor},
};

fn build_descriptor(device_endpoint: Url, token_endpoint: Url) -> ProviderDescriptor {
	ProviderDescriptor::builder(
		ProviderId::new("mock-transport").expect("Provider identifier should be valid."),
	)
	.authorization_endpoint(Url::parse("https://mock.example.com/authorize").expect("URL should parse."))
	.token_endpoint(token_endpoint)
	.device_authorization_endpoint(device_endpoint)
	.support_grants([GrantType::DeviceCode])
	.build()
	.expect("Provider descriptor should build successfully.")
}

fn scope() -> ScopeSet {
	ScopeSet::new(["agenda.read"]).expect("Scope fixture should be valid.")
}

fn identity() -> IdentityId {
	IdentityId::new("transport-user").expect("Identity fixture should be valid.")
}

#[tokio::test]
async fn throttled_device_endpoint_surfaces_retry_after() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/device/code").body_includes("client_id=transport-client");
			then.status(503).header("retry-after", "7").body("upstream overloaded");
		})
		.await;
	let descriptor = build_descriptor(
		Url::parse(&server.url("/device/code")).expect("Mock device endpoint should parse."),
		Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
	);
	let (broker, _, sleeper) = build_reqwest_test_broker(
		descriptor,
		ClientRegistration::new("transport-client", "transport-secret"),
	);
	let err = broker
		.device_authorization(&identity(), &scope())
		.await
		.expect_err("A throttled device endpoint must fail the grant.");

	mock.assert_async().await;

	match err {
		Error::Transient(TransientError::TokenEndpoint { status, retry_after, .. }) => {
			assert_eq!(status, Some(503));
			assert_eq!(retry_after, Some(Duration::seconds(7)));
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	assert!(sleeper.recorded().is_empty());
}

#[tokio::test]
async fn malformed_device_answer_reports_the_failing_field() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/device/code");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"device_code\":\"d\",\"verification_url\":\"https://example.com/device\"}");
		})
		.await;
	let descriptor = build_descriptor(
		Url::parse(&server.url("/device/code")).expect("Mock device endpoint should parse."),
		Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
	);
	let (broker, _, _) =
		build_reqwest_test_broker(descriptor, ClientRegistration::new("client", "secret"));
	let err = broker
		.device_authorization(&identity(), &scope())
		.await
		.expect_err("A device answer without user_code must be rejected.");

	mock.assert_async().await;

	match err {
		Error::Transient(TransientError::TokenResponseParse { source, status }) => {
			assert_eq!(status, Some(200));
			assert!(source.inner().to_string().contains("user_code"), "{source}");
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
	// Nothing listens on the discard port of the loopback interface.
	let descriptor = build_descriptor(
		Url::parse("https://127.0.0.1:9/device/code").expect("URL should parse."),
		Url::parse("https://127.0.0.1:9/token").expect("URL should parse."),
	);
	let (broker, _, _) =
		build_reqwest_test_broker(descriptor, ClientRegistration::new("client", "secret"));
	let err = broker
		.device_authorization(&identity(), &scope())
		.await
		.expect_err("Connection failures must surface.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })), "{err:?}");
}
