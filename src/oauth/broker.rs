//! `oauth2`-backed [`IdentityProvider`].

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret,
	EndpointNotSet, EndpointSet, PkceCodeVerifier, RedirectUrl, TokenResponse, TokenUrl,
	basic::BasicClient,
	http::{Method, Request, header},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, Secret},
	error::{BoxError, ConfigError},
	http::{ProviderHttpClient, ResponseMetadataSlot},
	oauth::{AuthorizationAttempt, IdentityProvider, OAuthProfile, ProviderFuture},
	provider::{ClientAuthMethod, ProviderDescriptor},
};
#[cfg(feature = "reqwest")] use crate::{config::OAuthConfig, http::ReqwestHttpClient};

type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Stage at which a code exchange failed.
///
/// Logged with the provider status code, then reported to callers as
/// [`Error::Unauthenticated`] without detail.
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// Token endpoint call failed (transport, OAuth error response, or unparsable body).
	#[error("Token endpoint rejected the authorization code.")]
	TokenEndpoint {
		/// Underlying `oauth2` failure.
		#[source]
		source: BoxError,
	},
	/// Userinfo request could not be built.
	#[error("Userinfo request could not be built.")]
	ProfileRequest {
		/// Underlying request builder failure.
		#[source]
		source: oauth2::http::Error,
	},
	/// Userinfo endpoint could not be reached.
	#[error("Userinfo endpoint could not be reached.")]
	ProfileTransport {
		/// Underlying transport failure.
		#[source]
		source: BoxError,
	},
	/// Userinfo endpoint answered with a non-success status.
	#[error("Userinfo endpoint returned HTTP {status}.")]
	ProfileStatus {
		/// Returned status code.
		status: u16,
	},
	/// Userinfo body is not a valid profile document.
	#[error("Userinfo response is malformed at `{path}`.")]
	ProfileDecode {
		/// Field path where decoding failed.
		path: String,
		/// Structured decoding failure.
		#[source]
		source: serde_json::Error,
	},
}
impl From<ExchangeError> for Error {
	fn from(_: ExchangeError) -> Self {
		Error::unauthenticated("OAuth exchange failed")
	}
}

/// Identity provider speaking the authorization-code grant through `oauth2`.
pub struct OAuthBroker<C>
where
	C: ProviderHttpClient,
{
	descriptor: ProviderDescriptor,
	client_id: String,
	redirect_url: Url,
	scopes: ScopeSet,
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
}
impl<C> OAuthBroker<C>
where
	C: ProviderHttpClient,
{
	/// Wires a broker for `descriptor` using the provided transport.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		client_secret: &Secret,
		redirect_url: Url,
		scopes: ScopeSet,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, ConfigError> {
		let client_id = client_id.into();
		let auth_url =
			AuthUrl::new(descriptor.endpoints.authorization.to_string()).map_err(|source| {
				ConfigError::InvalidUrl { field: "authorization_endpoint", source }
			})?;
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidUrl { field: "token_endpoint", source })?;
		let redirect = RedirectUrl::new(redirect_url.to_string())
			.map_err(|source| ConfigError::InvalidUrl { field: "redirect_url", source })?;
		let mut oauth_client = BasicClient::new(ClientId::new(client_id.clone()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_redirect_uri(redirect);

		if matches!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			descriptor,
			client_id,
			redirect_url,
			scopes,
			oauth_client,
			http_client: http_client.into(),
		})
	}

	/// Descriptor the broker was built from.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	/// Exchanges `code` and fetches the profile, keeping the failure stage.
	///
	/// Failures are logged at `warn` with the last provider status code.
	pub async fn exchange(
		&self,
		code: &str,
		attempt: &AuthorizationAttempt,
	) -> Result<OAuthProfile, ExchangeError> {
		let meta = ResponseMetadataSlot::default();
		let result = self.exchange_with(&meta, code, attempt).await;

		if let Err(e) = &result {
			tracing::warn!(
				provider = %self.descriptor.id,
				status = ?meta.status(),
				error = %e,
				cause = ?StdError::source(e),
				"OAuth code exchange failed."
			);
		}

		result
	}

	async fn exchange_with(
		&self,
		meta: &ResponseMetadataSlot,
		code: &str,
		attempt: &AuthorizationAttempt,
	) -> Result<OAuthProfile, ExchangeError> {
		let handle = self.http_client.with_metadata(meta.clone());
		let mut request = self.oauth_client.exchange_code(AuthorizationCode::new(code.to_owned()));

		if self.descriptor.quirks.pkce {
			request = request.set_pkce_verifier(PkceCodeVerifier::new(
				attempt.pkce().verifier().expose().to_owned(),
			));
		}

		let token = request
			.request_async(&handle)
			.await
			.map_err(|e| ExchangeError::TokenEndpoint { source: Box::new(e) })?;
		let request = Request::builder()
			.method(Method::GET)
			.uri(self.descriptor.endpoints.userinfo.as_str())
			.header(header::ACCEPT, "application/json")
			.header(header::AUTHORIZATION, format!("Bearer {}", token.access_token().secret()))
			.body(Vec::new())
			.map_err(|source| ExchangeError::ProfileRequest { source })?;
		let response = handle
			.call(request)
			.await
			.map_err(|e| ExchangeError::ProfileTransport { source: Box::new(e) })?;

		if !response.status().is_success() {
			return Err(ExchangeError::ProfileStatus { status: response.status().as_u16() });
		}

		let mut deserializer = serde_json::Deserializer::from_slice(response.body());

		serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			ExchangeError::ProfileDecode { path: e.path().to_string(), source: e.into_inner() }
		})
	}
}
#[cfg(feature = "reqwest")]
impl OAuthBroker<ReqwestHttpClient> {
	/// Builds a reqwest-backed broker from configuration.
	pub fn from_config(config: &OAuthConfig) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::with_timeout(config.http_timeout()?)?;

		Self::new(
			config.descriptor()?,
			config.client_id.clone(),
			&config.client_secret,
			config.redirect_url()?,
			config.scope_set()?,
			http_client,
		)
	}
}
impl<C> IdentityProvider for OAuthBroker<C>
where
	C: ProviderHttpClient,
{
	fn authorization_url(&self, attempt: &AuthorizationAttempt) -> Url {
		let mut url = self.descriptor.endpoints.authorization.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("response_type", "code");
			pairs.append_pair("client_id", &self.client_id);
			pairs.append_pair("redirect_uri", self.redirect_url.as_str());

			if let Some(scope) = self.scopes.joined(self.descriptor.quirks.scope_delimiter) {
				pairs.append_pair("scope", &scope);
			}

			pairs.append_pair("state", attempt.state());

			if self.descriptor.quirks.pkce {
				pairs.append_pair("code_challenge", attempt.pkce().challenge());
				pairs.append_pair("code_challenge_method", attempt.pkce().method().as_str());
			}
		}

		url
	}

	fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		attempt: &'a AuthorizationAttempt,
	) -> ProviderFuture<'a, OAuthProfile> {
		Box::pin(async move { Ok(self.exchange(code, attempt).await?) })
	}
}
impl<C> Debug for OAuthBroker<C>
where
	C: ProviderHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("OAuthBroker")
			.field("provider", &self.descriptor.id)
			.field("client_id", &self.client_id)
			.field("redirect_url", &self.redirect_url)
			.field("scopes", &self.scopes)
			.finish_non_exhaustive()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::auth::ProviderId;

	fn broker(method: ClientAuthMethod) -> OAuthBroker<ReqwestHttpClient> {
		let url = |raw: &str| Url::parse(raw).expect("URL fixture should parse.");
		let descriptor = ProviderDescriptor::builder(
			ProviderId::new("google").expect("Provider fixture should be valid."),
		)
		.authorization_endpoint(url("https://accounts.example.com/o/oauth2/auth"))
		.token_endpoint(url("https://oauth2.example.com/token"))
		.userinfo_endpoint(url("https://www.example.com/oauth2/v2/userinfo"))
		.preferred_client_auth_method(method)
		.build()
		.expect("Descriptor fixture should build.");

		OAuthBroker::new(
			descriptor,
			"client-id",
			&Secret::new("client-secret"),
			url("https://chat.example.com/oauth/callback"),
			ScopeSet::new(["profile", "email"]).expect("Scope fixture should be valid."),
			ReqwestHttpClient::with_client(ReqwestClient::new()),
		)
		.expect("Broker fixture should build.")
	}

	#[test]
	fn authorization_url_carries_state_and_pkce_challenge() {
		let broker = broker(ClientAuthMethod::ClientSecretBasic);
		let attempt = AuthorizationAttempt::generate(OffsetDateTime::now_utc());
		let url = broker.authorization_url(&attempt);
		let query = url.query_pairs().into_owned().collect::<HashMap<_, _>>();

		assert_eq!(url.host_str(), Some("accounts.example.com"));
		assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(query.get("client_id").map(String::as_str), Some("client-id"));
		assert_eq!(
			query.get("redirect_uri").map(String::as_str),
			Some("https://chat.example.com/oauth/callback")
		);
		assert_eq!(query.get("scope").map(String::as_str), Some("email profile"));
		assert_eq!(query.get("state").map(String::as_str), Some(attempt.state()));
		assert_eq!(
			query.get("code_challenge").map(String::as_str),
			Some(attempt.pkce().challenge())
		);
		assert_eq!(query.get("code_challenge_method").map(String::as_str), Some("S256"));
		assert!(!url.as_str().contains(attempt.pkce().verifier().expose()));
	}

	#[test]
	fn authorization_url_is_deterministic_per_attempt() {
		let broker = broker(ClientAuthMethod::ClientSecretPost);
		let attempt = AuthorizationAttempt::generate(OffsetDateTime::now_utc());

		assert_eq!(broker.authorization_url(&attempt), broker.authorization_url(&attempt));
	}

	#[test]
	fn exchange_errors_surface_as_unauthenticated() {
		let err = Error::from(ExchangeError::ProfileStatus { status: 500 });

		assert_eq!(err.kind(), ErrorKind::Unauthenticated);
		assert!(!err.to_string().contains("500"));
	}
}
