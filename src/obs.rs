//! Optional observability helpers for broker flows and the retry engine.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `agenda_broker.flow` with the `flow` and
//!   `stage` fields, plus the warning/info events in [`events`].
//! - Enable `metrics` to increment `agenda_broker_flow_total` (labeled by `flow` + `outcome`)
//!   and `agenda_broker_retry_total` (labeled by `class`).

pub mod events;

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flow kinds observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Full credential acquisition for one identity.
	Obtain,
	/// Refresh token exchange.
	Refresh,
	/// Device-authorization grant.
	DeviceAuthorization,
	/// Manual authorization-code fallback.
	ManualCode,
	/// Retried remote call.
	Invoke,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Obtain => "obtain",
			FlowKind::Refresh => "refresh",
			FlowKind::DeviceAuthorization => "device_authorization",
			FlowKind::ManualCode => "manual_code",
			FlowKind::Invoke => "invoke",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
