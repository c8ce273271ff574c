//! Structured log events. Every helper compiles to a no-op without the `tracing` feature.

// self
use crate::{_prelude::*, auth::IdentityId};

/// A failed call will be retried after `delay`.
pub fn retry_scheduled(attempt: u32, max_attempts: u32, delay: Duration, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(
		attempt,
		max_attempts,
		delay_ms = delay.whole_milliseconds() as i64,
		error = %error,
		"Remote call failed; retrying."
	);
	#[cfg(not(feature = "tracing"))]
	let _ = (attempt, max_attempts, delay, error);
}

/// A stored credential could not be read and is treated as absent.
pub fn stored_credential_unreadable(identity: &IdentityId, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(identity = %identity, error = %error, "Stored credential is unreadable; ignoring it.");
	#[cfg(not(feature = "tracing"))]
	let _ = (identity, error);
}

/// A stored credential does not cover the requested scopes.
pub fn stored_scopes_insufficient(identity: &IdentityId, missing: &str) {
	#[cfg(feature = "tracing")]
	tracing::info!(identity = %identity, missing, "Stored credential lacks required scopes.");
	#[cfg(not(feature = "tracing"))]
	let _ = (identity, missing);
}

/// Refreshing an expired credential failed; acquisition falls through to a grant.
pub fn refresh_failed(identity: &IdentityId, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(identity = %identity, error = %error, "Credential refresh failed.");
	#[cfg(not(feature = "tracing"))]
	let _ = (identity, error);
}

/// One grant method failed; the next one (if any) is attempted.
pub fn grant_method_failed(identity: &IdentityId, method: &'static str, error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(identity = %identity, method, error = %error, "Grant method failed.");
	#[cfg(not(feature = "tracing"))]
	let _ = (identity, method, error);
}

/// A credential became valid through `source` (`stored`, `refresh`, or a grant method).
pub fn credential_ready(identity: &IdentityId, source: &'static str) {
	#[cfg(feature = "tracing")]
	tracing::info!(identity = %identity, source, "Credential ready.");
	#[cfg(not(feature = "tracing"))]
	let _ = (identity, source);
}

/// The primary calendar's time zone could not be read; a new calendar falls back to UTC.
pub fn calendar_time_zone_fallback(error: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(error = %error, "Primary calendar time zone unavailable; using UTC.");
	#[cfg(not(feature = "tracing"))]
	let _ = error;
}

/// A list element was dropped or flagged while normalizing a response.
pub fn malformed_response(diagnostic: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::warn!(diagnostic = %diagnostic, "Malformed list element.");
	#[cfg(not(feature = "tracing"))]
	let _ = diagnostic;
}
