//! Retry policy value object and failure classification.

// self
use crate::_prelude::*;

/// Classifier mapping an error into an [`ErrorClass`].
pub type Classifier<E> = Arc<dyn Fn(&E) -> ErrorClass + Send + Sync>;

/// Retry classification of one failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
	/// Retry after the server-provided delay (plus buffer, floored at the base delay).
	RetryableWithHint(Duration),
	/// Retry on the exponential schedule.
	RetryableDefault,
	/// Do not retry.
	Fatal,
}
impl ErrorClass {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorClass::RetryableWithHint(_) => "retryable_with_hint",
			ErrorClass::RetryableDefault => "retryable_default",
			ErrorClass::Fatal => "fatal",
		}
	}
}

/// Bounded retry policy.
///
/// Defaults: 5 attempts, 2s base delay, 1s hint buffer, and [`classify_error`] as the
/// classifier.
pub struct RetryPolicy<E = Error> {
	max_attempts: u32,
	base_delay: Duration,
	hint_buffer: Duration,
	classifier: Classifier<E>,
}
impl RetryPolicy<Error> {
	/// Policy with the default limits and [`classify_error`].
	pub fn new() -> Self {
		Self::with_classifier(classify_error)
	}
}
impl<E> RetryPolicy<E> {
	/// Default attempt limit.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
	/// Default base delay.
	pub const DEFAULT_BASE_DELAY: Duration = Duration::seconds(2);
	/// Default buffer added on top of server hints.
	pub const DEFAULT_HINT_BUFFER: Duration = Duration::seconds(1);

	/// Policy with the default limits and a custom classifier.
	pub fn with_classifier<F>(classifier: F) -> Self
	where
		F: 'static + Fn(&E) -> ErrorClass + Send + Sync,
	{
		Self {
			max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
			base_delay: Self::DEFAULT_BASE_DELAY,
			hint_buffer: Self::DEFAULT_HINT_BUFFER,
			classifier: Arc::new(classifier),
		}
	}

	/// Overrides the total number of calls (clamped to at least one).
	pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
		self.max_attempts = max_attempts.max(1);

		self
	}

	/// Overrides the base delay (negative values become zero).
	pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
		self.base_delay = base_delay.max(Duration::ZERO);

		self
	}

	/// Overrides the buffer added to server hints (negative values become zero).
	pub fn with_hint_buffer(mut self, hint_buffer: Duration) -> Self {
		self.hint_buffer = hint_buffer.max(Duration::ZERO);

		self
	}

	/// Maximum number of calls to the wrapped operation.
	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Base delay of the exponential schedule and floor of every wait.
	pub fn base_delay(&self) -> Duration {
		self.base_delay
	}

	/// Buffer added on top of server hints.
	pub fn hint_buffer(&self) -> Duration {
		self.hint_buffer
	}

	/// Classifies `error`.
	pub fn classify(&self, error: &E) -> ErrorClass {
		(self.classifier)(error)
	}

	/// `base * 2^attempt`, saturating at [`Duration::MAX`].
	pub fn backoff(&self, attempt: u32) -> Duration {
		2_i32
			.checked_pow(attempt)
			.and_then(|factor| self.base_delay.checked_mul(factor))
			.unwrap_or(Duration::MAX)
	}

	/// Wait before the next call after a failure of `class` on `attempt` (counted from 0).
	///
	/// Returns `None` for fatal failures. Every wait is at least the base delay.
	pub fn delay_for(&self, class: ErrorClass, attempt: u32) -> Option<Duration> {
		match class {
			ErrorClass::RetryableWithHint(hint) =>
				Some(hint.saturating_add(self.hint_buffer).max(self.base_delay)),
			ErrorClass::RetryableDefault => Some(self.backoff(attempt).max(self.base_delay)),
			ErrorClass::Fatal => None,
		}
	}
}
impl Default for RetryPolicy<Error> {
	fn default() -> Self {
		Self::new()
	}
}
impl<E> Clone for RetryPolicy<E> {
	fn clone(&self) -> Self {
		Self {
			max_attempts: self.max_attempts,
			base_delay: self.base_delay,
			hint_buffer: self.hint_buffer,
			classifier: Arc::clone(&self.classifier),
		}
	}
}
impl<E> Debug for RetryPolicy<E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryPolicy")
			.field("max_attempts", &self.max_attempts)
			.field("base_delay", &self.base_delay)
			.field("hint_buffer", &self.hint_buffer)
			.finish_non_exhaustive()
	}
}

/// Default classifier over [`Error`].
///
/// Quota errors with a hint retry after the hint, quota errors without one and
/// service-unavailable errors use the exponential schedule, and everything else is fatal.
pub fn classify_error(error: &Error) -> ErrorClass {
	match error {
		Error::QuotaExceeded { retry_after: Some(hint), .. } => ErrorClass::RetryableWithHint(*hint),
		Error::QuotaExceeded { retry_after: None, .. } | Error::ServiceUnavailable { .. } =>
			ErrorClass::RetryableDefault,
		_ => ErrorClass::Fatal,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn quota(hint: Option<Duration>) -> Error {
		Error::QuotaExceeded { message: "quota".into(), retry_after: hint }
	}

	#[test]
	fn defaults_match_documented_values() {
		let policy = RetryPolicy::default();

		assert_eq!(policy.max_attempts(), 5);
		assert_eq!(policy.base_delay(), Duration::seconds(2));
		assert_eq!(policy.hint_buffer(), Duration::seconds(1));
		assert_eq!(RetryPolicy::new().with_max_attempts(0).max_attempts(), 1);
	}

	#[test]
	fn classification_follows_error_variants() {
		assert_eq!(
			classify_error(&quota(Some(Duration::seconds(7)))),
			ErrorClass::RetryableWithHint(Duration::seconds(7))
		);
		assert_eq!(classify_error(&quota(None)), ErrorClass::RetryableDefault);
		assert_eq!(
			classify_error(&Error::ServiceUnavailable { message: "overloaded".into(), status: Some(503) }),
			ErrorClass::RetryableDefault
		);
		assert_eq!(
			classify_error(&Error::FatalApi { message: "bad request".into(), status: Some(400) }),
			ErrorClass::Fatal
		);
		assert_eq!(
			classify_error(&Error::InvalidGrant { reason: "revoked".into() }),
			ErrorClass::Fatal
		);
	}

	#[test]
	fn exponential_schedule_doubles_from_base() {
		let policy = RetryPolicy::new();

		for attempt in 0..6 {
			let expected = Duration::seconds(2 * 2_i64.pow(attempt));

			assert_eq!(policy.delay_for(ErrorClass::RetryableDefault, attempt), Some(expected));
		}

		assert_eq!(policy.backoff(200), Duration::MAX);
	}

	#[test]
	fn hinted_waits_add_buffer_and_respect_the_floor() {
		let policy = RetryPolicy::new();

		for (hint, attempt) in [(0_i64, 0_u32), (1, 3), (5, 1), (37, 4), (600, 0)] {
			let hint = Duration::seconds(hint);
			let wait = policy
				.delay_for(ErrorClass::RetryableWithHint(hint), attempt)
				.expect("Hinted failures are retryable.");

			assert!(wait >= hint.max(policy.base_delay()), "hint {hint} produced {wait}");
			assert_eq!(wait, (hint + policy.hint_buffer()).max(policy.base_delay()));
		}

		assert_eq!(policy.delay_for(ErrorClass::Fatal, 0), None);
	}
}
