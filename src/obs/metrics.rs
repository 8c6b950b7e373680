// self
use crate::obs::{AdmissionOutcome, FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"chat_auth_flow_total",
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

/// Records an admission decision for the bucket `scope` (when enabled).
pub fn record_admission(scope: &str, outcome: AdmissionOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"chat_auth_admission_total",
			"scope" => scope.to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (scope, outcome);
	}
}
