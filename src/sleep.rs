//! Injectable sleeping used by device-code polling and retry backoff.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Suspends the current task for a duration.
///
/// The two waits of the crate (device polling and retry backoff) both go through this
/// trait so tests can observe requested delays without real time passing.
pub trait Sleeper: Send + Sync {
	/// Returns a future that completes after `duration`.
	fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// Sleeper backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
impl Sleeper for TokioSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture {
		// Negative durations collapse to an immediate wake-up.
		let duration = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(duration))
	}
}
