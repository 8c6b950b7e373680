//! Account registration and password login.

// self
use crate::{
	_prelude::*,
	auth::{Credentials, Login, Secret, User, UserId},
	flows::{AuthService, finish},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::StoreError,
	token::SessionTokens,
};

/// Validated registration input.
#[derive(Clone, Debug)]
pub struct Registration {
	/// Requested login.
	pub login: Login,
	/// Display name.
	pub name: String,
	/// Contact email.
	pub email: String,
	/// Plaintext password; hashed before it reaches the store.
	pub password: Secret,
}

impl AuthService {
	/// Creates an account whose password is stored only as a hash.
	///
	/// A login collision reported by the store surfaces as [`Error::AlreadyExists`].
	pub async fn register(&self, registration: Registration) -> Result<User> {
		const KIND: FlowKind = FlowKind::Register;

		let span = FlowSpan::new(KIND, "register");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let Registration { login, name, email, password } = registration;
				let password_hash = self.hash_password(password).await?;
				let user = User {
					id: UserId::random(),
					login,
					name,
					email,
					password_hash,
					avatar_url: None,
				};

				Ok(self.store.create_user(user).await?)
			})
			.await;

		finish(KIND, result)
	}

	/// Verifies credentials and issues an access/refresh token pair.
	///
	/// Unknown logins and wrong passwords are indistinguishable to the caller.
	pub async fn login(&self, credentials: Credentials) -> Result<SessionTokens> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let Credentials { login, password } = credentials;
				let user = match self.store.find_by_login(&login).await {
					Ok(user) => user,
					Err(StoreError::NotFound) => return Err(Error::CredentialInvalid),
					Err(e) => return Err(e.into()),
				};

				self.verify_password(user.password_hash, password).await?;

				Ok(self.tokens.issue_pair(user.id)?)
			})
			.await;

		finish(KIND, result)
	}
}
