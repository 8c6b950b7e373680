//! User records owned by the external store, plus the ephemeral credential pair.

// self
use crate::{
	_prelude::*,
	auth::{Login, Secret, UserId},
};

/// Persisted user account. The password field only ever holds a hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Opaque identifier, used as the session token subject.
	pub id: UserId,
	/// Unique, case-sensitive login.
	pub login: Login,
	/// Display name.
	pub name: String,
	/// Contact email.
	pub email: String,
	/// Credential-manager hash output; never plaintext.
	pub password_hash: String,
	/// Optional avatar URL (usually supplied by an OAuth provider).
	pub avatar_url: Option<String>,
}
impl Debug for User {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("User")
			.field("id", &self.id)
			.field("login", &self.login)
			.field("name", &self.name)
			.field("email", &self.email)
			.field("password_hash", &"<redacted>")
			.field("avatar_url", &self.avatar_url)
			.finish()
	}
}

/// Login/password pair presented for verification; never persisted.
#[derive(Clone, Debug)]
pub struct Credentials {
	/// Login being authenticated.
	pub login: Login,
	/// Plaintext candidate password.
	pub password: Secret,
}
impl Credentials {
	/// Bundles a login with a candidate password.
	pub fn new(login: Login, password: impl Into<Secret>) -> Self {
		Self { login, password: password.into() }
	}
}
