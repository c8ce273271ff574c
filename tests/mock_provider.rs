#![cfg(all(feature = "reqwest", feature = "test"))]

// self
use agenda_broker::{
	_preludet::*,
	auth::{IdentityId, ProviderId, ScopeSet},
	provider::{
		ClientRegistration, DevicePollSignal, GrantType, ProviderDescriptor,
		ProviderDescriptorBuilder, ProviderDescriptorError, ProviderErrorContext,
		ProviderErrorKind, ProviderQuirks, ProviderStrategy,
	},
};

fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse mock provider URL.")
}

fn builder(id: &str) -> ProviderDescriptorBuilder {
	let provider_id =
		ProviderId::new(id).expect("Failed to build provider identifier for mock descriptor.");

	ProviderDescriptor::builder(provider_id)
}

/// Provider that says `waiting` instead of `authorization_pending` and wants an audience.
struct QuirkyStrategy;
impl ProviderStrategy for QuirkyStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		match ctx.oauth_error.as_deref() {
			Some("bad_refresh") => ProviderErrorKind::InvalidGrant,
			_ => ProviderErrorKind::Transient,
		}
	}

	fn classify_device_poll(&self, oauth_error: &str) -> DevicePollSignal {
		match oauth_error {
			"waiting" => DevicePollSignal::Pending,
			"too_fast" => DevicePollSignal::SlowDown,
			_ => DevicePollSignal::Abort,
		}
	}

	fn augment_token_request(&self, grant: GrantType, form: &mut BTreeMap<String, String>) {
		if grant == GrantType::DeviceCode {
			form.insert("audience".into(), "agenda".into());
		}
	}
}

#[test]
fn descriptor_rejects_insecure_endpoints_and_missing_grants() {
	let err = builder("mock-insecure")
		.authorization_endpoint(url("http://example.com/auth"))
		.token_endpoint(url("https://example.com/token"))
		.build()
		.expect_err("Descriptor builder should reject missing grants.");

	assert!(matches!(err, ProviderDescriptorError::NoSupportedGrants));

	let err = builder("mock")
		.authorization_endpoint(url("http://example.com/auth"))
		.token_endpoint(url("https://example.com/token"))
		.support_grant(GrantType::AuthorizationCode)
		.build()
		.expect_err("Descriptor builder should reject insecure authorization endpoints.");

	assert!(matches!(
		err,
		ProviderDescriptorError::InsecureEndpoint { endpoint: "authorization", .. }
	));
}

#[test]
fn descriptor_loads_from_configuration_with_quirk_defaults() {
	let descriptor: ProviderDescriptor = serde_json::from_str(
		r#"{
			"id": "configured",
			"endpoints": {
				"authorization": "https://example.com/auth",
				"token": "https://example.com/token",
				"device_authorization": "https://example.com/device"
			},
			"supported_grants": { "authorization_code": true, "refresh_token": true, "device_code": true },
			"preferred_client_auth_method": "client_secret_post",
			"quirks": { "device_poll_interval_secs": 7 }
		}"#,
	)
	.expect("Descriptor configuration should deserialize.");

	assert!(descriptor.supports(GrantType::DeviceCode));
	assert_eq!(descriptor.quirks.device_poll_interval(), Duration::seconds(7));
	assert_eq!(descriptor.quirks, ProviderQuirks { device_poll_interval_secs: 7, ..Default::default() });
}

#[tokio::test]
async fn custom_strategy_drives_device_polling() {
	let descriptor = builder("quirky")
		.authorization_endpoint(url("https://quirky.example.com/auth"))
		.token_endpoint(url("https://quirky.example.com/token"))
		.device_authorization_endpoint(url("https://quirky.example.com/device/code"))
		.support_grants([GrantType::DeviceCode, GrantType::RefreshToken])
		.quirks(ProviderQuirks { device_poll_interval_secs: 2, slow_down_increment_secs: 3, ..Default::default() })
		.build()
		.expect("Quirky descriptor should build.");
	let (broker, http, _, sleeper) = build_scripted_test_broker(
		descriptor,
		ClientRegistration::new("quirky-client", "quirky-secret"),
		ScriptedOperator::default(),
	);
	let mut broker = broker;

	broker.strategy = Arc::new(QuirkyStrategy);

	http.respond(
		200,
		"{\"device_code\":\"d\",\"user_code\":\"U\",\"verification_uri\":\"https://quirky.example.com/activate\"}",
	)
	.respond(400, "{\"error\":\"waiting\"}")
	.respond(400, "{\"error\":\"too_fast\"}")
	.respond(200, "{\"access_token\":\"quirky-access\",\"token_type\":\"Bearer\"}");

	let scope = ScopeSet::new(["agenda.read"]).expect("Scope fixture should be valid.");
	let grant = broker
		.device_authorization(&IdentityId::new("quinn").expect("Identity should be valid."), &scope)
		.await
		.expect("Quirky device flow should succeed.");

	assert_eq!(grant.access_token.expose(), "quirky-access");
	assert_eq!(grant.expires_in, None);
	assert_eq!(
		sleeper.recorded(),
		vec![Duration::seconds(2), Duration::seconds(2), Duration::seconds(5)]
	);
	assert!(
		http.requests()
			.iter()
			.all(|request| request.form.get("audience").map(String::as_str) == Some("agenda"))
	);
}
