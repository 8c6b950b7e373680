//! Thread-safe in-memory [`UserStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{Login, User, UserId},
	store::{OAuthAccount, StoreError, StoreFuture, UserStore},
};

type UserMap = Arc<RwLock<HashMap<Login, User>>>;

/// Thread-safe storage backend that keeps users in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryUserStore(UserMap);
impl MemoryUserStore {
	/// Number of stored users.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true if no users are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn create_now(map: UserMap, user: User) -> Result<User, StoreError> {
		let mut guard = map.write();

		if guard.contains_key(&user.login) {
			return Err(StoreError::AlreadyExists { login: user.login.to_string() });
		}

		guard.insert(user.login.clone(), user.clone());

		Ok(user)
	}

	fn find_now(map: UserMap, login: &Login) -> Result<User, StoreError> {
		map.read().get(login).cloned().ok_or(StoreError::NotFound)
	}

	fn get_or_create_now(map: UserMap, account: OAuthAccount) -> User {
		let mut guard = map.write();

		guard
			.entry(account.login.clone())
			.or_insert_with(|| User {
				id: UserId::random(),
				login: account.login,
				name: account.name,
				email: account.email,
				password_hash: account.password_hash,
				avatar_url: account.avatar_url,
			})
			.clone()
	}
}
impl UserStore for MemoryUserStore {
	fn create_user(&self, user: User) -> StoreFuture<'_, User> {
		let map = self.0.clone();

		Box::pin(async move { Self::create_now(map, user) })
	}

	fn find_by_login<'a>(&'a self, login: &'a Login) -> StoreFuture<'a, User> {
		let map = self.0.clone();

		Box::pin(async move { Self::find_now(map, login) })
	}

	fn get_or_create_by_oauth(&self, account: OAuthAccount) -> StoreFuture<'_, User> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_or_create_now(map, account)) })
	}
}
