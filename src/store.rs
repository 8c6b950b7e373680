//! User-store capability and the built-in in-memory implementation.
//!
//! The store owns [`User`] records and enforces login uniqueness at creation time; the auth
//! flows never cache users across requests.

pub mod memory;

pub use memory::MemoryUserStore;

// self
use crate::{
	_prelude::*,
	auth::{Login, User},
};

/// Boxed future returned by [`UserStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for user accounts.
pub trait UserStore
where
	Self: Send + Sync,
{
	/// Persists a new user, failing with [`StoreError::AlreadyExists`] on a login collision.
	fn create_user(&self, user: User) -> StoreFuture<'_, User>;

	/// Fetches the user registered under `login`.
	fn find_by_login<'a>(&'a self, login: &'a Login) -> StoreFuture<'a, User>;

	/// Returns the user whose login matches `account.login`, creating it when absent.
	fn get_or_create_by_oauth(&self, account: OAuthAccount) -> StoreFuture<'_, User>;
}

/// Account material derived from an OAuth profile.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthAccount {
	/// Login derived from the provider email.
	pub login: Login,
	/// Display name.
	pub name: String,
	/// Contact email.
	pub email: String,
	/// Avatar URL.
	pub avatar_url: Option<String>,
	/// Hash of a random password, used only if the account is created.
	pub password_hash: String,
}
impl Debug for OAuthAccount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthAccount")
			.field("login", &self.login)
			.field("name", &self.name)
			.field("email", &self.email)
			.field("avatar_url", &self.avatar_url)
			.finish_non_exhaustive()
	}
}

/// Error type produced by [`UserStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Another user already holds the login.
	#[error("Login `{login}` already exists.")]
	AlreadyExists {
		/// Colliding login.
		login: String,
	},
	/// No user matched the lookup.
	#[error("User not found.")]
	NotFound,
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
impl From<StoreError> for Error {
	fn from(e: StoreError) -> Self {
		match e {
			StoreError::AlreadyExists { login } => Error::AlreadyExists { login },
			e => Error::internal(e),
		}
	}
}
