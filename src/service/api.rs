//! Signed JSON transport shared by the service clients.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{Capability, Credential},
	error::{ConfigError, TransportError},
	normalize::Listing,
	service::{BearerSigner, RequestSigner, authorize_capabilities, classify_failure},
};

// One page of a Google-style list answer. Calendar lists name the entities `items`, mail lists
// name them `messages`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
struct Page<T> {
	#[serde(default, alias = "messages")]
	items: Vec<Listing<T>>,
	#[serde(default)]
	next_page_token: Option<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
	http_client: ReqwestClient,
	base_url: Url,
	credential: Credential,
	signer: BearerSigner,
}
impl ApiClient {
	pub(crate) fn new(
		http_client: ReqwestClient,
		base_url: Option<Url>,
		default_base_url: &str,
		credential: &Credential,
		capabilities: &[Capability],
	) -> Result<Self> {
		authorize_capabilities(credential, capabilities)?;

		let base_url = match base_url {
			Some(url) => url,
			None => Url::parse(default_base_url)
				.map_err(|source| ConfigError::InvalidDescriptor { source })?,
		};

		Ok(Self { http_client, base_url, credential: credential.clone(), signer: BearerSigner })
	}

	pub(crate) fn http(&self) -> &ReqwestClient {
		&self.http_client
	}

	pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
		let mut url = self.base_url.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidDescriptor {
				source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
			})?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	pub(crate) async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
		let request = self.signer.attach_token(request, &self.credential)?;
		let response = request.send().await.map_err(TransportError::from)?;
		let status = response.status();

		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();

		Err(classify_failure(Some(status.as_u16()), &body))
	}

	pub(crate) async fn send_json<T>(&self, request: reqwest::RequestBuilder) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.send(request).await?;
		let status = response.status().as_u16();
		let bytes = response.bytes().await.map_err(TransportError::from)?;

		decode_body(&bytes, status)
	}

	/// Follows `nextPageToken` until the last page and returns every page's elements in
	/// order, ready for the normalizer.
	pub(crate) async fn collect_pages<T>(
		&self,
		url: Url,
		query: &[(String, String)],
	) -> Result<Vec<Listing<T>>>
	where
		T: DeserializeOwned,
	{
		let mut listings = Vec::new();
		let mut page_token: Option<String> = None;

		loop {
			let mut request = self.http_client.get(url.clone()).query(query);

			if let Some(token) = &page_token {
				request = request.query(&[("pageToken", token.as_str())]);
			}

			let page: Page<T> = self.send_json(request).await?;

			listings.extend(page.items);

			match page.next_page_token.filter(|token| !token.is_empty()) {
				Some(next) if page_token.as_deref() != Some(next.as_str()) => page_token = Some(next),
				_ => break,
			}
		}

		Ok(listings)
	}
}

fn decode_body<T>(bytes: &[u8], status: u16) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|e| Error::FatalApi {
		message: format!("response body is unreadable at `{}`: {}", e.path(), e.inner()),
		status: Some(status),
	})
}
