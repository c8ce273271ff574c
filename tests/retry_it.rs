// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicU32, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::Duration;
// self
use agenda_broker::{
	error::Error,
	retry::{ResilientInvoker, RetryPolicy},
	service::{LanguageModel, ModelReply, ServiceFuture, ToolSpec, classify_failure, generate_with_retry},
	sleep::{SleepFuture, Sleeper},
};

#[derive(Clone, Default)]
struct Waits(Arc<Mutex<Vec<Duration>>>);
impl Waits {
	fn recorded(&self) -> Vec<Duration> {
		self.0.lock().clone()
	}
}
impl Sleeper for Waits {
	fn sleep(&self, duration: Duration) -> SleepFuture {
		self.0.lock().push(duration);

		Box::pin(async {})
	}
}

/// Model that replays `(status, body)` failures before answering.
#[derive(Default)]
struct ScriptedModel {
	failures: Mutex<VecDeque<(Option<u16>, String)>>,
	calls: AtomicU32,
}
impl ScriptedModel {
	fn failing_with(failures: impl IntoIterator<Item = (Option<u16>, &'static str)>) -> Self {
		Self {
			failures: Mutex::new(failures.into_iter().map(|(status, body)| (status, body.to_owned())).collect()),
			calls: AtomicU32::new(0),
		}
	}

	fn calls(&self) -> u32 {
		self.calls.load(Ordering::SeqCst)
	}
}
impl LanguageModel for ScriptedModel {
	fn generate<'a>(&'a self, prompt: &'a str, tools: &'a [ToolSpec]) -> ServiceFuture<'a, ModelReply> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if let Some((status, body)) = self.failures.lock().pop_front() {
				return Err(classify_failure(status, &body));
			}

			Ok(ModelReply {
				text: Some(format!("{prompt} ({} tools)", tools.len())),
				tool_calls: Vec::new(),
			})
		})
	}
}

const QUOTA_WITH_HINT: &str = r#"{"error":{"code":429,"message":"Quota exceeded. Please retry in 30s.","status":"RESOURCE_EXHAUSTED"}}"#;
const QUOTA_WITHOUT_HINT: &str =
	r#"{"error":{"code":429,"message":"Quota exceeded.","status":"RESOURCE_EXHAUSTED"}}"#;

#[tokio::test]
async fn quota_hint_sets_the_wait_and_the_call_succeeds() {
	let waits = Waits::default();
	let invoker = ResilientInvoker::new(Arc::new(waits.clone()));
	let model = ScriptedModel::failing_with([(Some(429), QUOTA_WITH_HINT), (Some(429), QUOTA_WITH_HINT)]);
	let reply = generate_with_retry(&model, &invoker, &RetryPolicy::new(), "plan my day", &[])
		.await
		.expect("Third attempt should succeed.");

	assert_eq!(reply.text.as_deref(), Some("plan my day (0 tools)"));
	assert_eq!(model.calls(), 3);
	assert_eq!(waits.recorded(), vec![Duration::seconds(31), Duration::seconds(31)]);
}

#[tokio::test]
async fn unhinted_quota_errors_exhaust_with_exponential_waits() {
	let waits = Waits::default();
	let invoker = ResilientInvoker::new(Arc::new(waits.clone()));
	let model = ScriptedModel::failing_with([(Some(429), QUOTA_WITHOUT_HINT); 6]);
	let err = generate_with_retry(&model, &invoker, &RetryPolicy::new(), "plan", &[])
		.await
		.expect_err("Five quota failures should exhaust the default policy.");

	assert!(err.is_exhausted());
	assert_eq!(err.attempts(), 5);
	assert!(matches!(err.error(), Error::QuotaExceeded { retry_after: None, .. }));
	assert_eq!(model.calls(), 5);
	assert_eq!(
		waits.recorded(),
		vec![Duration::seconds(2), Duration::seconds(4), Duration::seconds(8), Duration::seconds(16)]
	);
}

#[tokio::test]
async fn fatal_failures_are_not_retried() {
	let waits = Waits::default();
	let invoker = ResilientInvoker::new(Arc::new(waits.clone()));
	let model = ScriptedModel::failing_with([(
		Some(400),
		r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#,
	)]);
	let err = generate_with_retry(&model, &invoker, &RetryPolicy::new(), "plan", &[])
		.await
		.expect_err("Invalid arguments are fatal.");

	assert!(!err.is_exhausted());
	assert_eq!(err.attempts(), 1);
	assert!(matches!(err.into_inner(), Error::FatalApi { status: Some(400), .. }));
	assert_eq!(model.calls(), 1);
	assert!(waits.recorded().is_empty());
}

#[tokio::test]
async fn unavailable_service_backs_off_then_recovers() {
	let waits = Waits::default();
	let invoker = ResilientInvoker::new(Arc::new(waits.clone()));
	let model = ScriptedModel::failing_with([
		(Some(503), "Service Unavailable"),
		(Some(500), r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#),
	]);
	let tools = [ToolSpec {
		name: "list_events".into(),
		description: "Lists calendar events.".into(),
		parameters: serde_json::json!({ "type": "object" }),
	}];
	let reply = generate_with_retry(&model, &invoker, &RetryPolicy::new(), "plan", &tools)
		.await
		.expect("Third attempt should succeed.");

	assert_eq!(reply.text.as_deref(), Some("plan (1 tools)"));
	assert_eq!(waits.recorded(), vec![Duration::seconds(2), Duration::seconds(4)]);
}

#[tokio::test]
async fn small_hints_never_undercut_the_base_delay() {
	let waits = Waits::default();
	let invoker = ResilientInvoker::new(Arc::new(waits.clone()));
	let model = ScriptedModel::failing_with([(
		Some(429),
		r#"{"error":{"code":429,"message":"Please retry in 0.2s.","status":"RESOURCE_EXHAUSTED"}}"#,
	)]);
	let policy = RetryPolicy::new().with_base_delay(Duration::seconds(3)).with_max_attempts(2);

	generate_with_retry(&model, &invoker, &policy, "plan", &[])
		.await
		.expect("Second attempt should succeed.");

	assert_eq!(waits.recorded(), vec![Duration::seconds(3)]);
}

#[test]
fn structured_retry_delay_is_read_from_quota_payloads() {
	let body = r#"{"error":{"code":429,"message":"Quota exceeded for metric generate_requests.","status":"RESOURCE_EXHAUSTED","details":[{"@type":"type.googleapis.com/google.rpc.RetryInfo","retryDelay":"37s"}]}}"#;

	match classify_failure(Some(429), body) {
		Error::QuotaExceeded { message, retry_after } => {
			assert_eq!(message, "Quota exceeded for metric generate_requests.");
			assert_eq!(retry_after, Some(Duration::seconds(37)));
		},
		other => panic!("Unexpected classification: {other:?}"),
	}
}
