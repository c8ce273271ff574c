//! Read-only mailbox client for messages the owner labels for the assistant.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use time::{Date, macros::format_description};
// self
use crate::{_prelude::*, normalize::Entity};
#[cfg(feature = "reqwest")]
use crate::{
	auth::{Capability, Credential},
	normalize,
	service::api::ApiClient,
};

/// Default base URL of the mail API.
pub const DEFAULT_MAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/";
/// Label the owner puts on mail meant for the assistant.
pub const ASSISTANT_MAIL_LABEL: &str = "TODOBOT";

/// Message reduced to what the planner reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
	/// Opaque message id.
	pub id: String,
	/// `Date` header, verbatim.
	pub date: String,
	/// Sender address, without the display name.
	pub sender: String,
	/// `Subject` header.
	pub subject: String,
	/// Plain-text body, or the snippet when no body could be decoded.
	pub content: String,
}

/// Message as returned by the API (`format=full`).
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
	/// Opaque message id.
	#[serde(default)]
	pub id: String,
	/// Short plain-text excerpt.
	#[serde(default)]
	pub snippet: String,
	/// Root MIME part.
	#[serde(default)]
	pub payload: MessagePart,
}
impl Entity for RawMessage {
	fn entity_id(&self) -> Option<Cow<'_, str>> {
		(!self.id.is_empty()).then(|| Cow::Borrowed(self.id.as_str()))
	}
}
impl RawMessage {
	/// Extracts headers, sender address, and body.
	pub fn into_message(self) -> MailMessage {
		let header = |name: &str| {
			self.payload
				.headers
				.iter()
				.find(|header| header.name.eq_ignore_ascii_case(name))
				.map(|header| header.value.clone())
				.unwrap_or_default()
		};
		let date = header("Date");
		let sender = sender_address(&header("From")).to_owned();
		let subject = header("Subject");
		let content = self.payload.plain_text().unwrap_or_else(|| self.snippet.clone());

		MailMessage { id: self.id, date, sender, subject, content }
	}
}

/// One MIME part.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
	/// MIME type, e.g. `text/plain`.
	#[serde(default)]
	pub mime_type: String,
	/// Headers of this part.
	#[serde(default)]
	pub headers: Vec<MessageHeader>,
	/// Inline body.
	#[serde(default)]
	pub body: MessageBody,
	/// Child parts of a multipart message.
	#[serde(default)]
	pub parts: Vec<MessagePart>,
}
impl MessagePart {
	/// First `text/plain` child of a multipart message, or the part's own body otherwise.
	///
	/// Returns `None` when nothing decodes to non-empty text.
	pub fn plain_text(&self) -> Option<String> {
		let data = if self.parts.is_empty() {
			self.body.data.as_deref()
		} else {
			self.parts
				.iter()
				.filter(|part| part.mime_type == "text/plain")
				.find_map(|part| part.body.data.as_deref())
		}?;

		decode_body_data(data).filter(|text| !text.is_empty())
	}
}

/// Header name/value pair.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageHeader {
	/// Header name.
	#[serde(default)]
	pub name: String,
	/// Header value.
	#[serde(default)]
	pub value: String,
}

/// Inline body of a part.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MessageBody {
	/// URL-safe base64 payload.
	#[serde(default)]
	pub data: Option<String>,
}

/// `Name <addr@example.com>` → `addr@example.com`; anything else is returned unchanged.
pub fn sender_address(from: &str) -> &str {
	from.split_once('<')
		.and_then(|(_, rest)| rest.split_once('>'))
		.map_or(from, |(address, _)| address)
}

/// Search query for mail carrying `label` received after `since`.
pub fn labelled_since_query(label: &str, since: Date) -> Result<String> {
	let day = since.format(format_description!("[year]/[month]/[day]")).map_err(|e| {
		Error::FatalApi { message: format!("date cannot be formatted: {e}"), status: None }
	})?;

	Ok(format!("label:{label} after:{day}"))
}

fn decode_body_data(data: &str) -> Option<String> {
	let bytes = URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')).ok()?;

	Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Builder for [`MailClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct MailClientBuilder {
	base_url: Option<Url>,
	http_client: ReqwestClient,
}
#[cfg(feature = "reqwest")]
impl MailClientBuilder {
	/// Overrides the API base URL (must end with `/`).
	pub fn with_base_url(mut self, base_url: Url) -> Self {
		self.base_url = Some(base_url);

		self
	}

	/// Reuses an existing reqwest client.
	pub fn with_http_client(mut self, http_client: ReqwestClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Builds a client for `credential`; it must cover [`Capability::MailReadonly`].
	pub fn build(self, credential: &Credential) -> Result<MailClient> {
		let api = ApiClient::new(
			self.http_client,
			self.base_url,
			DEFAULT_MAIL_BASE_URL,
			credential,
			&[Capability::MailReadonly],
		)?;

		Ok(MailClient { api })
	}
}

/// Mailbox client bound to one credential.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct MailClient {
	api: ApiClient,
}
#[cfg(feature = "reqwest")]
impl MailClient {
	/// Returns a builder with the default base URL.
	pub fn builder() -> MailClientBuilder {
		MailClientBuilder::default()
	}

	/// Messages carrying `label` from the `days` days before `today`, in API order.
	pub async fn recent_labelled_messages(
		&self,
		label: &str,
		days: u32,
		today: Date,
	) -> Result<Vec<MailMessage>> {
		let since = today.checked_sub(Duration::days(i64::from(days))).ok_or_else(|| {
			Error::FatalApi { message: format!("{days} days before {today} is out of range"), status: None }
		})?;

		self.search(&labelled_since_query(label, since)?).await
	}

	/// Every message matching the search `query`, fetched one by one.
	pub async fn search(&self, query: &str) -> Result<Vec<MailMessage>> {
		let url = self.api.endpoint(&["users", "me", "messages"])?;
		let refs: Vec<RawMessage> = normalize::normalize(
			self.api.collect_pages(url, &[("q".to_owned(), query.to_owned())]).await?,
		);
		let mut messages = Vec::with_capacity(refs.len());

		for message_ref in refs {
			messages.push(self.message(&message_ref.id).await?);
		}

		Ok(messages)
	}

	/// Fetches one message by id.
	pub async fn message(&self, message_id: &str) -> Result<MailMessage> {
		let url = self.api.endpoint(&["users", "me", "messages", message_id])?;
		let raw: RawMessage = self.api.send_json(self.api.http().get(url)).await?;

		Ok(raw.into_message())
	}
}
