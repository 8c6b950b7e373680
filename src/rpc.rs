//! Upward-facing RPC surface of the auth service.
//!
//! Every call runs the same pipeline: admission control keyed by the full method name,
//! request validation, then the use case under the caller's deadline. Transport framing is
//! left to the host server; handlers translate its messages into the request types below
//! and map [`Error::kind`] onto status codes.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::{Credentials, Login, Secret, User, UserId},
	flows::{AuthService, Registration},
	limit::AdmissionController,
	token::SessionTokens,
};
#[cfg(feature = "reqwest")]
use crate::{config::AuthConfig, error::ConfigError, store::UserStore};

/// Fully qualified method names served by [`AuthGateway`].
pub mod method {
	/// `Register` RPC.
	pub const REGISTER: &str = "/chat.v1.AuthService/Register";
	/// `Login` RPC.
	pub const LOGIN: &str = "/chat.v1.AuthService/Login";
	/// `Refresh` RPC.
	pub const REFRESH: &str = "/chat.v1.AuthService/Refresh";
	/// `OAuthLogin` RPC.
	pub const OAUTH_LOGIN: &str = "/chat.v1.AuthService/OAuthLogin";
	/// `OAuthLoginCallback` RPC.
	pub const OAUTH_LOGIN_CALLBACK: &str = "/chat.v1.AuthService/OAuthLoginCallback";
}

/// Per-call metadata supplied by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
	/// Full RPC method name, used for admission control.
	pub method: String,
	/// Instant after which the caller no longer waits for a response.
	pub deadline: Option<Instant>,
}
impl RequestContext {
	/// Context without a deadline.
	pub fn new(method: impl Into<String>) -> Self {
		Self { method: method.into(), deadline: None }
	}

	/// Sets an absolute deadline.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(deadline);

		self
	}

	/// Sets a deadline `timeout` from now; a timeout past the clock's range sets none.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.deadline = Instant::now().checked_add(timeout);

		self
	}
}

/// `Register` request.
#[derive(Clone, Debug, Deserialize)]
pub struct RegisterRequest {
	/// Requested login.
	pub login: String,
	/// Display name.
	pub name: String,
	/// Contact email.
	pub email: String,
	/// Plaintext password.
	pub password: Secret,
}

/// `Login` request.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
	/// Login.
	pub login: String,
	/// Plaintext password.
	pub password: Secret,
}

/// `Refresh` request.
#[derive(Clone, Debug, Deserialize)]
pub struct RefreshRequest {
	/// Refresh token issued at login.
	pub refresh_token: Secret,
}

/// `OAuthLoginCallback` request.
#[derive(Clone, Debug, Deserialize)]
pub struct OAuthCallbackRequest {
	/// State echoed back by the provider.
	pub state: String,
	/// Authorization code.
	pub code: String,
}

/// `Refresh` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AccessToken {
	/// Newly issued access token.
	pub access_token: Secret,
}

/// `OAuthLogin` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuthorizationUrl {
	/// Provider URL the user agent should be redirected to.
	pub url: Url,
}

/// Admission-controlled, deadline-aware front of [`AuthService`].
#[derive(Clone, Debug)]
pub struct AuthGateway {
	service: AuthService,
	admission: AdmissionController,
}
impl AuthGateway {
	/// Fronts `service` with `admission`.
	pub fn new(service: AuthService, admission: AdmissionController) -> Self {
		Self { service, admission }
	}

	/// Underlying use cases.
	pub fn service(&self) -> &AuthService {
		&self.service
	}

	/// Admission controller consulted on every call.
	pub fn admission(&self) -> &AdmissionController {
		&self.admission
	}

	/// Creates an account.
	pub async fn register(&self, ctx: &RequestContext, request: RegisterRequest) -> Result<User> {
		self.admission.admit(&ctx.method)?;

		let registration = Registration {
			login: parse_login(&request.login)?,
			name: request.name.trim().to_owned(),
			email: parse_email(&request.email)?,
			password: require_secret("password", request.password)?,
		};

		within_deadline(ctx, self.service.register(registration)).await
	}

	/// Exchanges a login/password pair for session tokens.
	pub async fn login(
		&self,
		ctx: &RequestContext,
		request: LoginRequest,
	) -> Result<SessionTokens> {
		self.admission.admit(&ctx.method)?;

		let credentials = Credentials::new(
			parse_login(&request.login)?,
			require_secret("password", request.password)?,
		);

		within_deadline(ctx, self.service.login(credentials)).await
	}

	/// Exchanges a refresh token for a new access token.
	pub async fn refresh(
		&self,
		ctx: &RequestContext,
		request: RefreshRequest,
	) -> Result<AccessToken> {
		self.admission.admit(&ctx.method)?;

		let refresh_token = require_secret("refresh_token", request.refresh_token)?;

		within_deadline(ctx, async {
			Ok(AccessToken { access_token: self.service.refresh(refresh_token.expose())? })
		})
		.await
	}

	/// Starts an OAuth login.
	pub async fn oauth_login(&self, ctx: &RequestContext) -> Result<AuthorizationUrl> {
		self.admission.admit(&ctx.method)?;

		within_deadline(ctx, async { Ok(AuthorizationUrl { url: self.service.oauth_login()? }) })
			.await
	}

	/// Completes an OAuth login.
	pub async fn oauth_login_callback(
		&self,
		ctx: &RequestContext,
		request: OAuthCallbackRequest,
	) -> Result<SessionTokens> {
		self.admission.admit(&ctx.method)?;

		let state = require_text("state", &request.state)?;
		let code = require_text("code", &request.code)?;

		within_deadline(ctx, self.service.oauth_login_callback(state, code)).await
	}

	/// Resolves the bearer credential of any authenticated RPC to its user.
	///
	/// Accepts either the raw token or an `Authorization` header value (`Bearer <token>`).
	pub async fn authenticate(&self, ctx: &RequestContext, bearer: &str) -> Result<UserId> {
		self.admission.admit(&ctx.method)?;

		let token = strip_bearer(bearer);

		if token.is_empty() {
			return Err(Error::unauthenticated("missing bearer token"));
		}

		within_deadline(ctx, async { self.service.authenticate(token) }).await
	}
}
#[cfg(feature = "reqwest")]
impl AuthGateway {
	/// Validates `config` and wires the full production stack around `store`.
	pub fn from_config(
		config: &AuthConfig,
		store: Arc<dyn UserStore>,
	) -> Result<Self, ConfigError> {
		let service = AuthService::from_config(config, store)?;
		let admission = AdmissionController::from_config(&config.rate_limit)?;

		Ok(Self::new(service, admission))
	}
}

async fn within_deadline<T, F>(ctx: &RequestContext, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let Some(deadline) = ctx.deadline else {
		return fut.await;
	};

	if deadline <= Instant::now() {
		tracing::debug!(method = %ctx.method, "Request arrived after its deadline.");

		return Err(Error::DeadlineExceeded);
	}

	tokio::time::timeout_at(deadline, fut).await.unwrap_or_else(|_| {
		tracing::debug!(method = %ctx.method, "Request deadline exceeded.");

		Err(Error::DeadlineExceeded)
	})
}

fn parse_login(raw: &str) -> Result<Login> {
	Login::new(raw).map_err(|e| Error::InvalidArgument {
		field: "login",
		reason: e.to_string().trim_end_matches('.').to_owned(),
	})
}

fn parse_email(raw: &str) -> Result<String> {
	let email = raw.trim();

	match email.split_once('@') {
		Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_owned()),
		_ => Err(Error::InvalidArgument {
			field: "email",
			reason: "must be an address of the form name@domain".into(),
		}),
	}
}

fn require_secret(field: &'static str, value: Secret) -> Result<Secret> {
	if value.is_empty() {
		return Err(Error::InvalidArgument { field, reason: "must not be empty".into() });
	}

	Ok(value)
}

fn require_text<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
	if value.trim().is_empty() {
		return Err(Error::InvalidArgument { field, reason: "must not be empty".into() });
	}

	Ok(value)
}

fn strip_bearer(value: &str) -> &str {
	let value = value.trim();

	match value.split_once(' ') {
		Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
		_ => value,
	}
}
