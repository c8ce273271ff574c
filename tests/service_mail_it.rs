#![cfg(feature = "reqwest")]

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use httpmock::prelude::*;
use serde_json::json;
use time::{OffsetDateTime, macros};
// self
use agenda_broker::{
	auth::{Capability, Credential},
	error::Error,
	reqwest,
	service::{ASSISTANT_MAIL_LABEL, MailClient},
	url::Url,
};

fn credential(scopes: &[Capability]) -> Credential {
	Credential::builder(
		Url::parse("https://oauth2.googleapis.com/token").expect("Token URI fixture should parse."),
		"client-mail",
		"secret-mail",
		Capability::scope_set(scopes),
	)
	.access_token("access-mail")
	.expires_at(OffsetDateTime::now_utc() + time::Duration::hours(1))
	.build()
	.expect("Credential fixture should build successfully.")
}

fn client(server: &MockServer) -> MailClient {
	let http_client = reqwest::Client::builder()
		.danger_accept_invalid_certs(true)
		.build()
		.expect("Test reqwest client should build.");

	MailClient::builder()
		.with_base_url(Url::parse(&server.url("/gmail/v1/")).expect("Mock base URL should parse."))
		.with_http_client(http_client)
		.build(&credential(&[Capability::MailReadonly]))
		.expect("Mail client should build for a covering credential.")
}

#[tokio::test]
async fn labelled_messages_are_listed_across_pages_and_fetched_once() {
	let server = MockServer::start_async().await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/gmail/v1/users/me/messages")
				.header("authorization", "Bearer access-mail")
				.query_param("q", "label:TODOBOT after:2025/04/11")
				.query_param_missing("pageToken");
			then.status(200).json_body(json!({
				"messages": [{ "id": "m1", "threadId": "t1" }, { "id": "m2", "threadId": "t2" }],
				"nextPageToken": "older"
			}));
		})
		.await;
	let second = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/gmail/v1/users/me/messages")
				.query_param("q", "label:TODOBOT after:2025/04/11")
				.query_param("pageToken", "older");
			then.status(200).json_body(json!({ "messages": [{ "id": "m2", "threadId": "t2" }] }));
		})
		.await;
	let m1 = server
		.mock_async(|when, then| {
			when.method(GET).path("/gmail/v1/users/me/messages/m1");
			then.status(200).json_body(json!({
				"id": "m1",
				"snippet": "ignored",
				"payload": {
					"mimeType": "multipart/alternative",
					"headers": [
						{ "name": "From", "value": "Ada <ada@example.com>" },
						{ "name": "Date", "value": "Sat, 12 Apr 2025 08:00:00 +0000" },
						{ "name": "Subject", "value": "Book flights" }
					],
					"parts": [{
						"mimeType": "text/plain",
						"body": { "data": URL_SAFE_NO_PAD.encode("Flights before Friday.") }
					}]
				}
			}));
		})
		.await;
	let m2 = server
		.mock_async(|when, then| {
			when.method(GET).path("/gmail/v1/users/me/messages/m2");
			then.status(200).json_body(json!({
				"id": "m2",
				"snippet": "Call the plumber",
				"payload": {
					"mimeType": "text/html",
					"headers": [{ "name": "From", "value": "bob@example.com" }]
				}
			}));
		})
		.await;
	let messages = client(&server)
		.recent_labelled_messages(ASSISTANT_MAIL_LABEL, 3, macros::date!(2025 - 04 - 14))
		.await
		.expect("Listing labelled mail should succeed.");

	first.assert_async().await;
	second.assert_async().await;
	m1.assert_calls_async(1).await;
	m2.assert_calls_async(1).await;

	assert_eq!(messages.len(), 2);
	assert_eq!(messages[0].sender, "ada@example.com");
	assert_eq!(messages[0].subject, "Book flights");
	assert_eq!(messages[0].content, "Flights before Friday.");
	assert_eq!(messages[1].sender, "bob@example.com");
	assert_eq!(messages[1].content, "Call the plumber");
}

#[test]
fn mail_clients_require_the_mail_scope() {
	let err = MailClient::builder()
		.build(&credential(&[Capability::Calendar]))
		.expect_err("A calendar-only credential must not read mail.");

	assert!(matches!(err, Error::InsufficientScope { ref reason } if reason.contains("gmail.readonly")));
}
