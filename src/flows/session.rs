//! Refresh-token rotation and bearer authentication.

// self
use crate::{
	_prelude::*,
	auth::{Secret, UserId},
	flows::{AuthService, finish},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl AuthService {
	/// Exchanges a valid refresh token for a fresh access token.
	pub fn refresh(&self, refresh_token: &str) -> Result<Secret> {
		const KIND: FlowKind = FlowKind::Refresh;

		let _guard = FlowSpan::new(KIND, "refresh").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		finish(KIND, self.tokens.verify_and_rotate(refresh_token))
	}

	/// Resolves a bearer access token to its subject.
	pub fn authenticate(&self, access_token: &str) -> Result<UserId> {
		const KIND: FlowKind = FlowKind::Authenticate;

		let _guard = FlowSpan::new(KIND, "authenticate").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = self.tokens.verify_access(access_token).map(|claims| claims.sub);

		finish(KIND, result.map_err(Error::from))
	}
}
