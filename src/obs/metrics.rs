// self
use crate::obs::{FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"agenda_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records one scheduled retry, labeled by the failure class that allowed it.
pub fn record_retry(class: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("agenda_broker_retry_total", "class" => class).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = class;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_are_safe_without_an_installed_recorder() {
		record_flow_outcome(FlowKind::DeviceAuthorization, FlowOutcome::Failure);
		record_retry("retryable_default");
	}
}
