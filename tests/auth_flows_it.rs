// std
use std::{
	collections::HashMap,
	num::NonZeroU32,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// self
use chat_auth::{
	auth::{Credentials, Login, Secret, User},
	credential::CredentialManager,
	error::{Error, ErrorKind},
	flows::{AuthService, Registration},
	limit::{AdmissionController, MethodLimiterRegistry, TokenBucket},
	oauth::{AuthorizationAttempt, IdentityProvider, OAuthProfile, ProviderFuture, StateRegistry},
	rpc::{
		AuthGateway, LoginRequest, OAuthCallbackRequest, RefreshRequest, RegisterRequest,
		RequestContext, method,
	},
	store::{MemoryUserStore, OAuthAccount, StoreFuture, UserStore},
	token::TokenService,
	url::Url,
};

/// Identity provider double that counts exchanges and can be made slow or unusable.
struct FakeProvider {
	calls: AtomicUsize,
	profile: OAuthProfile,
	delay: Option<Duration>,
}
impl FakeProvider {
	fn new(email: &str) -> Self {
		Self {
			calls: AtomicUsize::new(0),
			profile: OAuthProfile {
				id: "108".into(),
				name: "Ann Provider".into(),
				email: email.into(),
				picture: Some("https://img.example.com/ann.png".into()),
			},
			delay: None,
		}
	}

	fn slow(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl IdentityProvider for FakeProvider {
	fn authorization_url(&self, attempt: &AuthorizationAttempt) -> Url {
		let mut url =
			Url::parse("https://idp.example.com/authorize").expect("Fixture URL should parse.");

		url.query_pairs_mut()
			.append_pair("state", attempt.state())
			.append_pair("code_challenge", attempt.pkce().challenge());

		url
	}

	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		_attempt: &'a AuthorizationAttempt,
	) -> ProviderFuture<'a, OAuthProfile> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}
			if code == "rejected" {
				return Err(Error::unauthenticated("OAuth exchange failed"));
			}

			Ok(self.profile.clone())
		})
	}
}

/// Store double that counts how often an OAuth account is provisioned.
#[derive(Default)]
struct CountingStore {
	inner: MemoryUserStore,
	provisions: AtomicUsize,
}
impl CountingStore {
	fn provisions(&self) -> usize {
		self.provisions.load(Ordering::SeqCst)
	}
}
impl UserStore for CountingStore {
	fn create_user(&self, user: User) -> StoreFuture<'_, User> {
		self.inner.create_user(user)
	}

	fn find_by_login<'a>(&'a self, login: &'a Login) -> StoreFuture<'a, User> {
		self.inner.find_by_login(login)
	}

	fn get_or_create_by_oauth(&self, account: OAuthAccount) -> StoreFuture<'_, User> {
		self.provisions.fetch_add(1, Ordering::SeqCst);

		self.inner.get_or_create_by_oauth(account)
	}
}

struct Harness {
	service: AuthService,
	store: MemoryUserStore,
	provider: Arc<FakeProvider>,
}

fn harness(provider: FakeProvider) -> Harness {
	let store = MemoryUserStore::default();
	let provider = Arc::new(provider);
	let service = AuthService::new(
		Arc::new(store.clone()),
		credentials(),
		tokens(),
		provider.clone(),
		StateRegistry::default(),
	);

	Harness { service, store, provider }
}

fn credentials() -> CredentialManager {
	CredentialManager::new(4).expect("Minimum bcrypt cost should be accepted.")
}

fn tokens() -> TokenService {
	TokenService::from_secrets(&Secret::new("access-secret-it"), &Secret::new("refresh-secret-it"))
		.expect("Token service should build.")
}

fn registration(login: &str, password: &str) -> Registration {
	Registration {
		login: Login::new(login).expect("Login fixture should be valid."),
		name: "Ann".into(),
		email: "ann@example.com".into(),
		password: Secret::new(password),
	}
}

fn state_of(url: &Url) -> String {
	url.query_pairs()
		.into_owned()
		.collect::<HashMap<_, _>>()
		.remove("state")
		.expect("Redirect URL should carry a state.")
}

fn bucket(capacity: u32) -> Arc<TokenBucket> {
	Arc::new(TokenBucket::new(
		NonZeroU32::new(capacity).expect("Capacity fixture should be non-zero."),
		Duration::from_secs(60),
	))
}

#[tokio::test]
async fn register_login_refresh_and_authenticate() -> color_eyre::Result<()> {
	let Harness { service, store, .. } = harness(FakeProvider::new("ann@example.com"));
	let user = service.register(registration("ann", "secret1")).await?;

	assert_eq!(store.len(), 1);
	assert_ne!(user.password_hash, "secret1");
	assert!(user.password_hash.starts_with("$2"));

	let tokens = service.login(Credentials::new(Login::new("ann")?, "secret1")).await?;

	assert_eq!(service.authenticate(tokens.access_token.expose())?, user.id);

	let access = service.refresh(tokens.refresh_token.expose())?;

	assert_eq!(service.authenticate(access.expose())?, user.id);

	let err = service
		.refresh(tokens.access_token.expose())
		.expect_err("An access token must not refresh.");

	assert_eq!(err.kind(), ErrorKind::Unauthenticated);

	Ok(())
}

#[tokio::test]
async fn duplicate_login_is_already_exists() {
	let Harness { service, store, .. } = harness(FakeProvider::new("ann@example.com"));

	service
		.register(registration("ann", "secret1"))
		.await
		.expect("First registration should succeed.");

	let err = service
		.register(registration("ann", "secret2"))
		.await
		.expect_err("A taken login must be rejected.");

	assert_eq!(err.kind(), ErrorKind::AlreadyExists);
	assert_eq!(store.len(), 1);

	service
		.register(registration("Ann", "secret2"))
		.await
		.expect("Logins differing only by case are distinct.");
}

#[tokio::test]
async fn wrong_password_and_unknown_login_look_the_same() {
	let Harness { service, .. } = harness(FakeProvider::new("ann@example.com"));

	service.register(registration("ann", "secret1")).await.expect("Registration should succeed.");

	let login = Login::new("ann").expect("Login fixture should be valid.");
	let wrong = service
		.login(Credentials::new(login, "secret2"))
		.await
		.expect_err("A wrong password must be rejected.");
	let unknown = service
		.login(Credentials::new(Login::new("bob").expect("Login fixture should be valid."), "x"))
		.await
		.expect_err("An unknown login must be rejected.");

	assert_eq!(wrong.kind(), ErrorKind::CredentialInvalid);
	assert_eq!(unknown.kind(), ErrorKind::CredentialInvalid);
	assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn oauth_callback_provisions_the_account_once() -> color_eyre::Result<()> {
	let Harness { service, store, provider } = harness(FakeProvider::new("ann@example.com"));
	let first_url = service.oauth_login()?;

	assert_eq!(first_url.host_str(), Some("idp.example.com"));
	assert_eq!(service.states().len(), 1);

	let first = service.oauth_login_callback(&state_of(&first_url), "code-1").await?;
	let first_user = service.authenticate(first.access_token.expose())?;

	assert!(service.states().is_empty());
	assert_eq!(store.len(), 1);

	let second_url = service.oauth_login()?;

	assert_ne!(state_of(&first_url), state_of(&second_url));

	let second = service.oauth_login_callback(&state_of(&second_url), "code-2").await?;

	assert_eq!(service.authenticate(second.access_token.expose())?, first_user);
	assert_eq!(store.len(), 1);
	assert_eq!(provider.calls(), 2);

	let err = service
		.login(Credentials::new(Login::new("ann@example.com")?, ""))
		.await
		.expect_err("Provisioned accounts have no usable password.");

	assert_eq!(err.kind(), ErrorKind::CredentialInvalid);

	Ok(())
}

#[tokio::test]
async fn returning_oauth_users_are_not_provisioned_again() -> color_eyre::Result<()> {
	let store = Arc::new(CountingStore::default());
	let service = AuthService::new(
		store.clone(),
		credentials(),
		tokens(),
		Arc::new(FakeProvider::new("ann@example.com")),
		StateRegistry::default(),
	);
	let mut subjects = Vec::new();

	for code in ["code-1", "code-2", "code-3"] {
		let url = service.oauth_login()?;
		let session = service.oauth_login_callback(&state_of(&url), code).await?;

		subjects.push(service.authenticate(session.access_token.expose())?);
	}

	assert_eq!(store.provisions(), 1, "Only the first callback may hash and provision.");
	assert_eq!(store.inner.len(), 1);
	assert!(subjects.iter().all(|subject| *subject == subjects[0]));

	Ok(())
}

#[tokio::test]
async fn unknown_state_never_reaches_the_provider() {
	let Harness { service, store, provider } = harness(FakeProvider::new("ann@example.com"));

	service.oauth_login().expect("Issuing a redirect should succeed.");

	let err = service
		.oauth_login_callback("forged-state", "code")
		.await
		.expect_err("A forged state must be rejected.");

	assert_eq!(err.kind(), ErrorKind::Unauthenticated);
	assert_eq!(provider.calls(), 0);
	assert!(store.is_empty());
	assert_eq!(service.states().len(), 1, "A forged state must not consume a pending one.");
}

#[tokio::test]
async fn state_is_single_use_even_when_exchange_fails() {
	let Harness { service, provider, .. } = harness(FakeProvider::new("ann@example.com"));
	let state = state_of(&service.oauth_login().expect("Issuing a redirect should succeed."));
	let err = service
		.oauth_login_callback(&state, "rejected")
		.await
		.expect_err("A rejected code must fail the callback.");

	assert_eq!(err.kind(), ErrorKind::Unauthenticated);

	let err = service
		.oauth_login_callback(&state, "code")
		.await
		.expect_err("A consumed state must not be accepted again.");

	assert_eq!(err.kind(), ErrorKind::Unauthenticated);
	assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn unusable_profile_email_creates_nothing() {
	let Harness { service, store, .. } = harness(FakeProvider::new("ann smith@example.com"));
	let state = state_of(&service.oauth_login().expect("Issuing a redirect should succeed."));
	let err = service
		.oauth_login_callback(&state, "code")
		.await
		.expect_err("A profile email with whitespace cannot become a login.");

	assert_eq!(err.kind(), ErrorKind::Unauthenticated);
	assert!(store.is_empty());
}

#[tokio::test]
async fn gateway_rejects_before_dispatch_when_global_bucket_is_empty() {
	let Harness { service, .. } = harness(FakeProvider::new("ann@example.com"));
	let gateway = AuthGateway::new(
		service,
		AdmissionController::new(bucket(1), MethodLimiterRegistry::default()),
	);
	let ctx = RequestContext::new(method::OAUTH_LOGIN);

	gateway.oauth_login(&ctx).await.expect("First request fits the global bucket.");

	let err = gateway.oauth_login(&ctx).await.expect_err("The global bucket must be drained.");

	assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
	assert_eq!(gateway.service().states().len(), 1, "Rejected requests must not run.");
}

#[tokio::test]
async fn method_bucket_only_gates_matching_methods() {
	let Harness { service, store, .. } = harness(FakeProvider::new("ann@example.com"));
	let methods = MethodLimiterRegistry::new([("Register", bucket(1))])
		.expect("Method pattern should be valid.");
	let gateway = AuthGateway::new(service, AdmissionController::new(bucket(100), methods));
	let register = RequestContext::new(method::REGISTER);
	let request = |login: &str| RegisterRequest {
		login: login.into(),
		name: "Ann".into(),
		email: "ann@example.com".into(),
		password: Secret::new("secret1"),
	};

	gateway.register(&register, request("ann")).await.expect("First registration is admitted.");

	let err = gateway
		.register(&register, request("bob"))
		.await
		.expect_err("The register bucket must be drained.");

	assert!(matches!(err, Error::ResourceExhausted { ref scope } if scope == "register"));
	assert_eq!(store.len(), 1);

	gateway
		.login(
			&RequestContext::new(method::LOGIN),
			LoginRequest { login: "ann".into(), password: Secret::new("secret1") },
		)
		.await
		.expect("Login is not governed by the register bucket.");
}

#[tokio::test]
async fn gateway_validates_requests_before_dispatch() {
	let Harness { service, store, .. } = harness(FakeProvider::new("ann@example.com"));
	let gateway = AuthGateway::new(service, AdmissionController::disabled());
	let err = gateway
		.register(
			&RequestContext::new(method::REGISTER),
			RegisterRequest {
				login: "ann".into(),
				name: "Ann".into(),
				email: "not-an-address".into(),
				password: Secret::new("secret1"),
			},
		)
		.await
		.expect_err("A malformed email must be rejected.");

	assert!(matches!(err, Error::InvalidArgument { field: "email", .. }));
	assert!(store.is_empty());

	let err = gateway
		.refresh(
			&RequestContext::new(method::REFRESH),
			RefreshRequest { refresh_token: Secret::new("") },
		)
		.await
		.expect_err("An empty refresh token must be rejected.");

	assert_eq!(err.kind(), ErrorKind::InvalidArgument);

	let err = gateway
		.authenticate(&RequestContext::new("/chat.v1.ChatService/Send"), "Bearer ")
		.await
		.expect_err("A missing bearer token must be rejected.");

	assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn gateway_accepts_authorization_header_values() -> color_eyre::Result<()> {
	let Harness { service, .. } = harness(FakeProvider::new("ann@example.com"));
	let gateway = AuthGateway::new(service, AdmissionController::disabled());
	let user = gateway
		.register(
			&RequestContext::new(method::REGISTER),
			RegisterRequest {
				login: "ann".into(),
				name: " Ann ".into(),
				email: " ann@example.com ".into(),
				password: Secret::new("secret1"),
			},
		)
		.await?;

	assert_eq!(user.name, "Ann");
	assert_eq!(user.email, "ann@example.com");

	let tokens = gateway
		.login(
			&RequestContext::new(method::LOGIN),
			LoginRequest { login: "ann".into(), password: Secret::new("secret1") },
		)
		.await?;
	let ctx = RequestContext::new("/chat.v1.ChatService/Send");
	let header = format!("Bearer {}", tokens.access_token.expose());

	assert_eq!(gateway.authenticate(&ctx, &header).await?, user.id);
	assert_eq!(gateway.authenticate(&ctx, tokens.access_token.expose()).await?, user.id);

	Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_provider_exchange_hits_the_deadline() {
	let Harness { service, store, provider } =
		harness(FakeProvider::new("ann@example.com").slow(Duration::from_secs(30)));
	let gateway = AuthGateway::new(service, AdmissionController::disabled());
	let url = gateway
		.oauth_login(&RequestContext::new(method::OAUTH_LOGIN))
		.await
		.expect("Issuing a redirect should succeed.");
	let ctx = RequestContext::new(method::OAUTH_LOGIN_CALLBACK)
		.with_timeout(Duration::from_millis(200));
	let err = gateway
		.oauth_login_callback(&ctx, OAuthCallbackRequest {
			state: state_of(&url.url),
			code: "code".into(),
		})
		.await
		.expect_err("The callback must give up at the deadline.");

	assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
	assert_eq!(provider.calls(), 1);
	assert!(store.is_empty());
}
