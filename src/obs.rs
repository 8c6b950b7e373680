//! Observability helpers shared by the auth flows and the admission controller.
//!
//! Every use-case flow runs inside a `chat_auth.flow` span carrying `flow` and `stage`
//! fields. With the `metrics` feature enabled, flow outcomes increment
//! `chat_auth_flow_total{flow, outcome}` and admission decisions increment
//! `chat_auth_admission_total{scope, outcome}`.

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Use-case flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// New account registration.
	Register,
	/// Password login.
	Login,
	/// Refresh-token rotation.
	Refresh,
	/// OAuth authorization redirect.
	OAuthLogin,
	/// OAuth callback handling.
	OAuthCallback,
	/// Bearer token authentication.
	Authenticate,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::Register => "register",
			FlowKind::Login => "login",
			FlowKind::Refresh => "refresh",
			FlowKind::OAuthLogin => "oauth_login",
			FlowKind::OAuthCallback => "oauth_callback",
			FlowKind::Authenticate => "authenticate",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each flow attempt.
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

/// Admission decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdmissionOutcome {
	/// Every applicable bucket granted a permit.
	Admitted,
	/// A bucket ran dry.
	Rejected,
}
impl AdmissionOutcome {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AdmissionOutcome::Admitted => "admitted",
			AdmissionOutcome::Rejected => "rejected",
		}
	}
}
impl Display for AdmissionOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
