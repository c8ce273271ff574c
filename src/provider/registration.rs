//! OAuth client registrations loaded from provider-issued client-secret documents.

// std
use std::path::Path;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::AuthError,
	provider::ProviderDescriptor,
};

/// OAuth client material used by every grant and refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRegistration {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Token endpoint override declared by the document.
	#[serde(default)]
	pub token_uri: Option<Url>,
}
impl ClientRegistration {
	/// Creates a registration from raw values.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			token_uri: None,
		}
	}

	/// Overrides the token endpoint stored on minted credentials.
	pub fn with_token_uri(mut self, token_uri: Url) -> Self {
		self.token_uri = Some(token_uri);

		self
	}

	/// Parses a client-secret document with an `installed` or `web` section.
	pub fn from_json_str(raw: &str) -> Result<Self, AuthError> {
		let document: ClientSecretDocument = serde_json::from_str(raw)
			.map_err(|e| AuthError::MalformedClientSecret { reason: e.to_string() })?;
		let section = document.installed.or(document.web).ok_or_else(|| {
			AuthError::MalformedClientSecret {
				reason: "expected an `installed` or `web` section".into(),
			}
		})?;

		if section.client_id.is_empty() {
			return Err(AuthError::MalformedClientSecret { reason: "client_id is empty".into() });
		}

		let token_uri = section
			.token_uri
			.map(|raw| Url::parse(&raw))
			.transpose()
			.map_err(|e| AuthError::MalformedClientSecret { reason: format!("token_uri: {e}") })?;

		Ok(Self {
			client_id: section.client_id,
			client_secret: TokenSecret::new(section.client_secret),
			token_uri,
		})
	}

	/// Reads and parses a client-secret document from disk.
	///
	/// A missing or unreadable file is [`AuthError::MissingClientSecret`].
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path)
			.map_err(|_| AuthError::MissingClientSecret { path: path.display().to_string() })?;

		Self::from_json_str(&raw)
	}

	/// Token endpoint for credentials minted with this registration.
	pub fn token_endpoint(&self, descriptor: &ProviderDescriptor) -> Url {
		self.token_uri.clone().unwrap_or_else(|| descriptor.endpoints.token.clone())
	}
}
impl Debug for ClientRegistration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientRegistration")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.field("token_uri", &self.token_uri.as_ref().map(Url::as_str))
			.finish()
	}
}

#[derive(Deserialize)]
struct ClientSecretDocument {
	installed: Option<ClientSecretSection>,
	web: Option<ClientSecretSection>,
}

#[derive(Deserialize)]
struct ClientSecretSection {
	client_id: String,
	#[serde(default)]
	client_secret: String,
	token_uri: Option<String>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn installed_and_web_sections_are_accepted() {
		let installed = ClientRegistration::from_json_str(
			r#"{"installed":{"client_id":"cid","client_secret":"cs","token_uri":"https://oauth2.googleapis.com/token"}}"#,
		)
		.expect("Installed section should parse.");

		assert_eq!(installed.client_id, "cid");
		assert_eq!(installed.client_secret.expose(), "cs");
		assert_eq!(
			installed.token_uri.as_ref().map(Url::as_str),
			Some("https://oauth2.googleapis.com/token")
		);

		let web = ClientRegistration::from_json_str(r#"{"web":{"client_id":"w","client_secret":"s"}}"#)
			.expect("Web section should parse.");

		assert_eq!(web.client_id, "w");
		assert_eq!(web.token_uri, None);
	}

	#[test]
	fn malformed_documents_are_authentication_errors() {
		for raw in ["not json", r#"{"other":{}}"#, r#"{"installed":{"client_id":""}}"#] {
			let err = ClientRegistration::from_json_str(raw)
				.expect_err("Malformed client secrets must be rejected.");

			assert!(matches!(err, AuthError::MalformedClientSecret { .. }), "{raw}: {err:?}");
		}
	}

	#[test]
	fn missing_file_is_reported_with_its_path() {
		let err = ClientRegistration::from_json_file("/nonexistent/client_secret.json")
			.expect_err("Missing files must be rejected.");

		assert!(matches!(
			err,
			AuthError::MissingClientSecret { ref path } if path.ends_with("client_secret.json")
		));
	}

	#[test]
	fn token_endpoint_falls_back_to_descriptor() {
		let descriptor = ProviderDescriptor::google().expect("Google preset should validate.");
		let registration = ClientRegistration::new("cid", "secret");

		assert_eq!(registration.token_endpoint(&descriptor), descriptor.endpoints.token);

		let custom = Url::parse("https://tokens.example.com/token").expect("URL should parse.");

		assert_eq!(
			registration.with_token_uri(custom.clone()).token_endpoint(&descriptor),
			custom
		);
	}

	#[test]
	fn debug_redacts_secret() {
		let rendered = format!("{:?}", ClientRegistration::new("cid", "very-secret"));

		assert!(!rendered.contains("very-secret"));
	}
}
