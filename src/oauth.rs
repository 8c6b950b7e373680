//! OAuth authorization-code login against a single identity provider.
//!
//! [`StateRegistry`] mints one [`AuthorizationAttempt`] per redirect: a random CSRF `state`
//! plus an S256 PKCE verifier, both valid for a bounded time and usable once. An
//! [`IdentityProvider`] turns an attempt into the redirect URL and, on callback, exchanges
//! the authorization code for the user's [`OAuthProfile`]. [`OAuthBroker`] is the production
//! provider built on the `oauth2` crate.

pub mod broker;
pub mod profile;
pub mod state;

pub use oauth2;

pub use broker::*;
pub use profile::*;
pub use state::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`IdentityProvider`] operations.
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Capability the auth flows use to talk to the identity provider.
pub trait IdentityProvider
where
	Self: Send + Sync,
{
	/// Builds the provider redirect URL for `attempt`. Pure; no I/O.
	fn authorization_url(&self, attempt: &AuthorizationAttempt) -> Url;

	/// Exchanges an authorization code for the user's profile.
	///
	/// Every provider-side failure is reported as [`Error::Unauthenticated`].
	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		attempt: &'a AuthorizationAttempt,
	) -> ProviderFuture<'a, OAuthProfile>;
}
