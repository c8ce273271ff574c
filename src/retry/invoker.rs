//! Bounded retry loop that waits through an injectable [`Sleeper`].

// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, events},
	retry::RetryPolicy,
	sleep::{Sleeper, TokioSleeper},
};

/// Terminal outcome of a retried call.
#[derive(Debug, ThisError)]
pub enum InvokeError<E>
where
	E: 'static + StdError,
{
	/// The failure was classified as fatal and surfaced without waiting.
	#[error("Call failed with a non-retryable error after {attempts} attempt(s).")]
	Fatal {
		/// Calls made, including the failing one.
		attempts: u32,
		/// The fatal error.
		#[source]
		error: E,
	},
	/// Every allowed attempt failed with a retryable error.
	#[error("Call still failing after {attempts} attempt(s).")]
	Exhausted {
		/// Calls made.
		attempts: u32,
		/// Error from the final attempt.
		#[source]
		error: E,
	},
}
impl<E> InvokeError<E>
where
	E: 'static + StdError,
{
	/// Number of calls made before giving up.
	pub fn attempts(&self) -> u32 {
		match self {
			InvokeError::Fatal { attempts, .. } | InvokeError::Exhausted { attempts, .. } => *attempts,
		}
	}

	/// Returns `true` when the loop gave up because the attempt budget ran out.
	pub fn is_exhausted(&self) -> bool {
		matches!(self, InvokeError::Exhausted { .. })
	}

	/// Borrows the last underlying error.
	pub fn error(&self) -> &E {
		match self {
			InvokeError::Fatal { error, .. } | InvokeError::Exhausted { error, .. } => error,
		}
	}

	/// Unwraps the last underlying error.
	pub fn into_inner(self) -> E {
		match self {
			InvokeError::Fatal { error, .. } | InvokeError::Exhausted { error, .. } => error,
		}
	}
}

/// Runs fallible async operations under a [`RetryPolicy`].
#[derive(Clone)]
pub struct ResilientInvoker {
	sleeper: Arc<dyn Sleeper>,
}
impl ResilientInvoker {
	/// Creates an invoker that waits through `sleeper`.
	pub fn new(sleeper: Arc<dyn Sleeper>) -> Self {
		Self { sleeper }
	}

	/// Calls `operation` until it succeeds, fails fatally, or exhausts the policy.
	///
	/// The operation is called at most `policy.max_attempts()` times and never waits after
	/// the final attempt. Each scheduled retry is logged at warning level.
	pub async fn invoke<T, E, F, Fut>(
		&self,
		mut operation: F,
		policy: &RetryPolicy<E>,
	) -> Result<T, InvokeError<E>>
	where
		E: 'static + StdError,
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		const KIND: FlowKind = FlowKind::Invoke;

		let span = FlowSpan::new(KIND, "invoke");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let max_attempts = policy.max_attempts();
				let mut attempt = 0_u32;

				loop {
					let error = match operation().await {
						Ok(value) => return Ok(value),
						Err(error) => error,
					};
					let class = policy.classify(&error);
					let made = attempt + 1;
					let Some(delay) = policy.delay_for(class, attempt) else {
						return Err(InvokeError::Fatal { attempts: made, error });
					};

					if made >= max_attempts {
						return Err(InvokeError::Exhausted { attempts: made, error });
					}

					events::retry_scheduled(made, max_attempts, delay, &error);
					obs::record_retry(class.as_str());

					self.sleeper.sleep(delay).await;

					attempt = made;
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
impl Default for ResilientInvoker {
	fn default() -> Self {
		Self::new(Arc::new(TokioSleeper))
	}
}
impl Debug for ResilientInvoker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResilientInvoker").finish_non_exhaustive()
	}
}
