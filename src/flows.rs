//! Register / Login / Refresh / OAuth use cases composed over the lower-level components.
//!
//! [`AuthService`] owns the credential manager, token service, identity provider, and state
//! registry, and borrows user persistence through [`UserStore`]. Each flow runs inside an
//! [`obs::FlowSpan`] and records attempt/success/failure outcomes.

pub mod oauth_login;
pub mod password;
pub mod session;

pub use oauth_login::*;
pub use password::*;
pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::Secret,
	credential::CredentialManager,
	oauth::{IdentityProvider, StateRegistry},
	obs::{self, FlowKind, FlowOutcome},
	store::UserStore,
	token::TokenService,
};
#[cfg(feature = "reqwest")]
use crate::{config::AuthConfig, error::ConfigError, oauth::OAuthBroker};

/// Authentication use cases shared by every RPC handler.
#[derive(Clone)]
pub struct AuthService {
	store: Arc<dyn UserStore>,
	credentials: CredentialManager,
	tokens: TokenService,
	provider: Arc<dyn IdentityProvider>,
	states: Arc<StateRegistry>,
}
impl AuthService {
	/// Composes the service from its collaborators.
	pub fn new(
		store: Arc<dyn UserStore>,
		credentials: CredentialManager,
		tokens: TokenService,
		provider: Arc<dyn IdentityProvider>,
		states: StateRegistry,
	) -> Self {
		Self { store, credentials, tokens, provider, states: Arc::new(states) }
	}

	/// Token service used to mint and verify session tokens.
	pub fn tokens(&self) -> &TokenService {
		&self.tokens
	}

	/// Registry of pending OAuth attempts.
	pub fn states(&self) -> &StateRegistry {
		&self.states
	}

	// The blocking hash runs to completion even if the caller's deadline drops this future.
	async fn hash_password(&self, password: Secret) -> Result<String> {
		let manager = self.credentials;

		tokio::task::spawn_blocking(move || manager.hash(&password))
			.await
			.map_err(Error::internal)?
			.map_err(Error::from)
	}

	async fn verify_password(&self, hash: String, candidate: Secret) -> Result<()> {
		let manager = self.credentials;

		tokio::task::spawn_blocking(move || manager.verify(&hash, &candidate))
			.await
			.map_err(Error::internal)?
			.map_err(Error::from)
	}
}
#[cfg(feature = "reqwest")]
impl AuthService {
	/// Validates `config` and wires the production collaborators around `store`.
	pub fn from_config(
		config: &AuthConfig,
		store: Arc<dyn UserStore>,
	) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self::new(
			store,
			config.credential_manager()?,
			config.token_service()?,
			Arc::new(OAuthBroker::from_config(&config.oauth)?),
			StateRegistry::new(config.oauth.state_ttl()?),
		))
	}
}
impl Debug for AuthService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthService")
			.field("credentials", &self.credentials)
			.field("tokens", &self.tokens)
			.field("states", &self.states)
			.finish_non_exhaustive()
	}
}

/// Records the flow outcome and logs failures before handing `result` back.
fn finish<T>(kind: FlowKind, result: Result<T>) -> Result<T> {
	match &result {
		Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
		Err(e) => {
			obs::record_flow_outcome(kind, FlowOutcome::Failure);

			if e.kind() == ErrorKind::Internal {
				tracing::error!(
					flow = kind.as_str(),
					error = %e,
					cause = ?StdError::source(e),
					"Auth flow failed."
				);
			} else {
				tracing::warn!(
					flow = kind.as_str(),
					kind = %e.kind(),
					error = %e,
					"Auth flow rejected."
				);
			}
		},
	}

	result
}
