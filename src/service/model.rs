//! Language-model contract and the one place its failures are classified.
//!
//! Remote model errors are mapped into [`Error::QuotaExceeded`],
//! [`Error::ServiceUnavailable`], or [`Error::FatalApi`] right at the client boundary, so the
//! retry engine only ever sees typed errors. The delay hint is extracted from the payload
//! once, here.

// self
use crate::{
	_prelude::*,
	retry::{self, InvokeError, ResilientInvoker, RetryPolicy},
	service::ServiceFuture,
};

/// Tool the model may call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
	/// Tool name.
	pub name: String,
	/// What the tool does.
	pub description: String,
	/// JSON schema of the arguments.
	pub parameters: Value,
}

/// Tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
	/// Name of the called tool.
	pub name: String,
	/// Arguments, shaped by the tool's schema.
	pub arguments: Value,
}

/// Model answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
	/// Text answer, if any.
	#[serde(default)]
	pub text: Option<String>,
	/// Tool calls, in the order the model issued them.
	#[serde(default)]
	pub tool_calls: Vec<ToolCall>,
}

/// Chat/generate contract of the language-model service.
///
/// Implementations report remote failures through [`classify_failure`].
pub trait LanguageModel: Send + Sync {
	/// Sends `prompt` with the available `tools`.
	fn generate<'a>(
		&'a self,
		prompt: &'a str,
		tools: &'a [ToolSpec],
	) -> ServiceFuture<'a, ModelReply>;
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
	error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
	#[serde(default)]
	code: Option<u16>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	status: Option<String>,
}

/// Maps an HTTP status and response body into the crate error taxonomy.
///
/// The structured envelope `{"error": {"code", "message", "status"}}` wins over the HTTP
/// status: `RESOURCE_EXHAUSTED` (or 429) is a quota error carrying the extracted delay
/// hint, `UNAVAILABLE` (or 503) is a service-unavailable error, and anything else is fatal.
pub fn classify_failure(status: Option<u16>, body: &str) -> Error {
	let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|envelope| envelope.error);
	let code = envelope.as_ref().and_then(|error| error.code).or(status);
	let remote_status = envelope.as_ref().and_then(|error| error.status.as_deref());
	let message = envelope
		.as_ref()
		.and_then(|error| error.message.clone())
		.unwrap_or_else(|| body.trim().to_owned());

	match (remote_status, code) {
		(Some("RESOURCE_EXHAUSTED"), _) | (None, Some(429)) =>
			Error::QuotaExceeded { message, retry_after: retry::extract_retry_delay(body) },
		(Some("UNAVAILABLE"), _) | (None, Some(503)) =>
			Error::ServiceUnavailable { message, status: code },
		_ => Error::FatalApi { message, status: code },
	}
}

/// Calls `model` under `policy`, retrying quota and availability failures.
pub async fn generate_with_retry(
	model: &dyn LanguageModel,
	invoker: &ResilientInvoker,
	policy: &RetryPolicy,
	prompt: &str,
	tools: &[ToolSpec],
) -> Result<ModelReply, InvokeError<Error>> {
	invoker.invoke(|| model.generate(prompt, tools), policy).await
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn resource_exhausted_envelopes_carry_the_hint() {
		let body = r#"{
			"error": {
				"code": 429,
				"message": "Quota exceeded. Please retry in 37.5s.",
				"status": "RESOURCE_EXHAUSTED",
				"details": [{ "@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "37s" }]
			}
		}"#;

		match classify_failure(Some(429), body) {
			Error::QuotaExceeded { message, retry_after } => {
				assert!(message.starts_with("Quota exceeded"));
				assert_eq!(retry_after, Some(Duration::seconds(37)));
			},
			other => panic!("unexpected classification: {other:?}"),
		}
	}

	#[test]
	fn bare_statuses_are_classified_without_an_envelope() {
		assert!(matches!(
			classify_failure(Some(429), "Too Many Requests"),
			Error::QuotaExceeded { retry_after: None, .. }
		));
		assert!(matches!(
			classify_failure(Some(503), "The model is overloaded."),
			Error::ServiceUnavailable { status: Some(503), .. }
		));
		assert!(matches!(
			classify_failure(Some(400), "bad request"),
			Error::FatalApi { status: Some(400), .. }
		));
		assert!(matches!(classify_failure(None, ""), Error::FatalApi { status: None, .. }));
	}

	#[test]
	fn envelope_status_overrides_http_status() {
		let body = r#"{"error":{"code":500,"message":"busy","status":"UNAVAILABLE"}}"#;

		assert!(matches!(
			classify_failure(Some(500), body),
			Error::ServiceUnavailable { status: Some(500), .. }
		));

		let body = r#"{"error":{"code":503,"message":"denied","status":"PERMISSION_DENIED"}}"#;

		assert!(matches!(classify_failure(Some(503), body), Error::FatalApi { .. }));
	}
}
