//! OAuth redirect and callback handling.

// self
use crate::{
	_prelude::*,
	credential::RANDOM_PASSWORD_LEN,
	flows::{AuthService, finish},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{OAuthAccount, StoreError},
	token::SessionTokens,
};

impl AuthService {
	/// Starts an authorization attempt and returns the provider redirect URL.
	pub fn oauth_login(&self) -> Result<Url> {
		const KIND: FlowKind = FlowKind::OAuthLogin;

		let _guard = FlowSpan::new(KIND, "oauth_login").entered();

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let attempt = self.states.issue();

		finish(KIND, Ok(self.provider.authorization_url(&attempt)))
	}

	/// Completes an authorization attempt and issues session tokens for the provider account.
	///
	/// `state` is consumed before the provider is contacted; an unknown, expired, or reused
	/// state fails with [`Error::Unauthenticated`] and no provider call is made. First-time
	/// users are provisioned with a random, hashed password; returning users are looked up
	/// without hashing anything.
	pub async fn oauth_login_callback(&self, state: &str, code: &str) -> Result<SessionTokens> {
		const KIND: FlowKind = FlowKind::OAuthCallback;

		let span = FlowSpan::new(KIND, "oauth_login_callback");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let attempt = self
					.states
					.consume(state)
					.ok_or_else(|| Error::unauthenticated("OAuth state mismatch"))?;
				let profile = self.provider.exchange_code(code, &attempt).await?;
				let login = profile.login().map_err(|e| {
					tracing::warn!(error = %e, "OAuth profile email cannot be used as a login.");

					Error::unauthenticated("OAuth profile is unusable")
				})?;
				let user = match self.store.find_by_login(&login).await {
					Ok(user) => user,
					Err(StoreError::NotFound) => {
						let password = self.credentials.random_password(RANDOM_PASSWORD_LEN);
						let password_hash = self.hash_password(password).await?;

						// Another callback may have created the account while hashing.
						self.store
							.get_or_create_by_oauth(OAuthAccount {
								login,
								name: profile.name,
								email: profile.email,
								avatar_url: profile.picture,
								password_hash,
							})
							.await?
					},
					Err(e) => return Err(e.into()),
				};

				Ok(self.tokens.issue_pair(user.id)?)
			})
			.await;

		finish(KIND, result)
	}
}
