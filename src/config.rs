//! Typed configuration for every component, deserializable from JSON.
//!
//! Loading from the environment or files belongs to the host process; this module only
//! parses a document it is handed and checks the invariants the components rely on.
//! Missing fields fall back to the defaults below, except signing secrets and OAuth client
//! credentials, which must be provided.

// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet, Secret},
	credential::{CredentialManager, DEFAULT_HASH_COST},
	error::ConfigError,
	provider::{ClientAuthMethod, ProviderDescriptor, ProviderQuirks},
	token::{DEFAULT_ACCESS_TTL, DEFAULT_REFRESH_TTL, TokenService},
};

const DEFAULT_PROVIDER: &str = "google";
const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_STATE_TTL_SECS: u64 = 600;
const DEFAULT_WINDOW_SECS: u64 = 60;
const MAX_WINDOW_SECS: u64 = 86_400;
const DEFAULT_GLOBAL_CAPACITY: u32 = 100_000;

/// Root configuration document.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
	/// Key signing access tokens.
	pub access_secret: Secret,
	/// Key signing refresh tokens; must differ from `access_secret`.
	pub refresh_secret: Secret,
	/// Access token validity in seconds.
	pub access_ttl_secs: u64,
	/// Refresh token validity in seconds.
	pub refresh_ttl_secs: u64,
	/// bcrypt work factor.
	pub bcrypt_cost: u32,
	/// Identity provider settings.
	pub oauth: OAuthConfig,
	/// Admission control settings.
	pub rate_limit: RateLimitConfig,
}
impl AuthConfig {
	/// Parses and validates a JSON document.
	///
	/// Parse failures report the path of the offending field (for example
	/// `rate_limit.methods[0].limit`).
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
			ConfigError::Parse { path: e.path().to_string(), source: e.into_inner() }
		})?;

		deserializer.end().map_err(|source| ConfigError::Parse { path: ".".into(), source })?;
		config.validate()?;

		Ok(config)
	}

	/// Checks every invariant without building long-lived components.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.token_service()?;
		self.credential_manager()?;
		self.oauth.validate()?;
		self.rate_limit.validate()?;

		Ok(())
	}

	/// Builds the token service with the configured secrets and validity windows.
	pub fn token_service(&self) -> Result<TokenService, ConfigError> {
		let access_ttl = positive_duration("access_ttl_secs", self.access_ttl_secs)?;
		let refresh_ttl = positive_duration("refresh_ttl_secs", self.refresh_ttl_secs)?;

		Ok(TokenService::from_secrets(&self.access_secret, &self.refresh_secret)?
			.with_ttls(access_ttl, refresh_ttl))
	}

	/// Builds the credential manager with the configured work factor.
	pub fn credential_manager(&self) -> Result<CredentialManager, ConfigError> {
		CredentialManager::new(self.bcrypt_cost)
	}
}
impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			access_secret: Secret::default(),
			refresh_secret: Secret::default(),
			access_ttl_secs: DEFAULT_ACCESS_TTL.whole_seconds().unsigned_abs(),
			refresh_ttl_secs: DEFAULT_REFRESH_TTL.whole_seconds().unsigned_abs(),
			bcrypt_cost: DEFAULT_HASH_COST,
			oauth: OAuthConfig::default(),
			rate_limit: RateLimitConfig::default(),
		}
	}
}

/// OAuth client registration and provider endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
	/// Provider identifier used in logs.
	pub provider: String,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Callback URL registered with the provider.
	pub redirect_url: String,
	/// Provider authorization endpoint.
	pub authorization_endpoint: String,
	/// Provider token endpoint.
	pub token_endpoint: String,
	/// Provider profile endpoint.
	pub userinfo_endpoint: String,
	/// Scopes requested during the redirect.
	pub scopes: Vec<String>,
	/// How the client authenticates at the token endpoint.
	pub client_auth_method: ClientAuthMethod,
	/// Provider quirks.
	pub quirks: ProviderQuirks,
	/// Timeout applied to every provider HTTP request, in seconds.
	pub http_timeout_secs: u64,
	/// Lifetime of a pending authorization attempt, in seconds.
	pub state_ttl_secs: u64,
}
impl OAuthConfig {
	/// Builds the validated provider descriptor.
	pub fn descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		let authorization = parse_url("authorization_endpoint", &self.authorization_endpoint)?;
		let token = parse_url("token_endpoint", &self.token_endpoint)?;
		let userinfo = parse_url("userinfo_endpoint", &self.userinfo_endpoint)?;

		Ok(ProviderDescriptor::builder(ProviderId::new(&self.provider)?)
			.authorization_endpoint(authorization)
			.token_endpoint(token)
			.userinfo_endpoint(userinfo)
			.preferred_client_auth_method(self.client_auth_method)
			.quirks(self.quirks)
			.build()?)
	}

	/// Parsed callback URL.
	pub fn redirect_url(&self) -> Result<Url, ConfigError> {
		if self.redirect_url.trim().is_empty() {
			return Err(ConfigError::MissingValue { field: "oauth.redirect_url" });
		}

		parse_url("redirect_url", &self.redirect_url)
	}

	/// Normalized scope set.
	pub fn scope_set(&self) -> Result<ScopeSet, ConfigError> {
		Ok(ScopeSet::new(self.scopes.iter().cloned())?)
	}

	/// Provider request timeout.
	pub fn http_timeout(&self) -> Result<StdDuration, ConfigError> {
		if self.http_timeout_secs == 0 {
			return Err(ConfigError::NonPositiveDuration { field: "oauth.http_timeout_secs" });
		}

		Ok(StdDuration::from_secs(self.http_timeout_secs))
	}

	/// Lifetime of a pending authorization attempt.
	pub fn state_ttl(&self) -> Result<Duration, ConfigError> {
		positive_duration("oauth.state_ttl_secs", self.state_ttl_secs)
	}

	/// Checks every OAuth setting.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingValue { field: "oauth.client_id" });
		}
		if self.client_secret.is_empty() {
			return Err(ConfigError::MissingValue { field: "oauth.client_secret" });
		}

		self.descriptor()?;
		self.redirect_url()?;
		self.scope_set()?;
		self.http_timeout()?;
		self.state_ttl()?;

		Ok(())
	}
}
impl Default for OAuthConfig {
	fn default() -> Self {
		Self {
			provider: DEFAULT_PROVIDER.into(),
			client_id: String::new(),
			client_secret: Secret::default(),
			redirect_url: String::new(),
			authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.into(),
			token_endpoint: DEFAULT_TOKEN_ENDPOINT.into(),
			userinfo_endpoint: DEFAULT_USERINFO_ENDPOINT.into(),
			scopes: vec!["profile".into(), "email".into()],
			client_auth_method: ClientAuthMethod::default(),
			quirks: ProviderQuirks::default(),
			http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
			state_ttl_secs: DEFAULT_STATE_TTL_SECS,
		}
	}
}

/// Admission control settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
	/// When false every request is admitted.
	pub enabled: bool,
	/// Refill window shared by every bucket, in seconds.
	pub window_secs: u64,
	/// Global bucket capacity per window.
	pub global: u32,
	/// Per-method buckets in match-priority order.
	pub methods: Vec<MethodLimitConfig>,
}
impl RateLimitConfig {
	/// Refill window.
	pub fn window(&self) -> Result<StdDuration, ConfigError> {
		if self.window_secs == 0 {
			return Err(ConfigError::NonPositiveDuration { field: "rate_limit.window_secs" });
		}
		if self.window_secs > MAX_WINDOW_SECS {
			return Err(ConfigError::DurationOutOfRange { field: "rate_limit.window_secs" });
		}

		Ok(StdDuration::from_secs(self.window_secs))
	}

	/// Checks window, capacities, and patterns.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.enabled {
			return Ok(());
		}

		self.window()?;

		if self.global == 0 {
			return Err(ConfigError::ZeroCapacity { field: "global".into() });
		}

		for method in &self.methods {
			if method.pattern.trim().is_empty() {
				return Err(ConfigError::EmptyMethodPattern);
			}
			if method.limit == 0 {
				return Err(ConfigError::ZeroCapacity { field: method.pattern.clone() });
			}
		}

		Ok(())
	}
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			window_secs: DEFAULT_WINDOW_SECS,
			global: DEFAULT_GLOBAL_CAPACITY,
			methods: Vec::new(),
		}
	}
}

/// Capacity dedicated to methods whose name contains `pattern`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodLimitConfig {
	/// Case-insensitive substring of the full RPC method name.
	pub pattern: String,
	/// Requests admitted per window.
	pub limit: u32,
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })
}

fn positive_duration(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
	if secs == 0 {
		return Err(ConfigError::NonPositiveDuration { field });
	}

	let duration = i64::try_from(secs)
		.map(Duration::seconds)
		.map_err(|_| ConfigError::DurationOutOfRange { field })?;

	// Expiries are computed as `now + duration`; reject windows that leave the date range.
	OffsetDateTime::now_utc()
		.checked_add(duration)
		.map(|_| duration)
		.ok_or(ConfigError::DurationOutOfRange { field })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const MINIMAL: &str = r#"{
		"access_secret": "access",
		"refresh_secret": "refresh",
		"oauth": {
			"client_id": "client",
			"client_secret": "shh",
			"redirect_url": "https://chat.example.com/oauth/callback"
		}
	}"#;

	#[test]
	fn minimal_document_fills_defaults() {
		let config = AuthConfig::from_json_str(MINIMAL).expect("Minimal config should load.");

		assert_eq!(config.access_ttl_secs, 3_600);
		assert_eq!(config.refresh_ttl_secs, 86_400);
		assert_eq!(config.bcrypt_cost, DEFAULT_HASH_COST);
		assert_eq!(config.oauth.scopes, ["profile", "email"]);
		assert_eq!(config.oauth.state_ttl_secs, 600);
		assert_eq!(config.rate_limit.global, 100_000);
		assert_eq!(config.rate_limit.window_secs, 60);
		assert!(config.rate_limit.methods.is_empty());
		assert_eq!(
			config.oauth.descriptor().expect("Default endpoints should validate.").id.to_string(),
			"google"
		);
	}

	#[test]
	fn parse_errors_report_field_path() {
		let err = AuthConfig::from_json_str(
			r#"{"rate_limit": {"methods": [{"pattern": "login", "limit": "many"}]}}"#,
		)
		.expect_err("A string limit must fail to parse.");

		match err {
			ConfigError::Parse { path, .. } => assert_eq!(path, "rate_limit.methods[0].limit"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn method_order_is_preserved() {
		let config = AuthConfig::from_json_str(&MINIMAL.replacen(
			'{',
			r#"{"rate_limit": {"methods": [
				{"pattern": "oauthlogin", "limit": 5},
				{"pattern": "login", "limit": 50}
			]},"#,
			1,
		))
		.expect("Config with method limits should load.");
		let patterns =
			config.rate_limit.methods.iter().map(|m| m.pattern.as_str()).collect::<Vec<_>>();

		assert_eq!(patterns, ["oauthlogin", "login"]);
	}

	#[test]
	fn validation_rejects_unsafe_settings() {
		let base = AuthConfig::from_json_str(MINIMAL).expect("Minimal config should load.");

		let shared = AuthConfig { refresh_secret: base.access_secret.clone(), ..base.clone() };
		assert!(matches!(shared.validate(), Err(ConfigError::SharedSigningSecret)));

		let zero_ttl = AuthConfig { access_ttl_secs: 0, ..base.clone() };
		assert!(matches!(zero_ttl.validate(), Err(ConfigError::NonPositiveDuration { .. })));

		let weak_cost = AuthConfig { bcrypt_cost: 2, ..base.clone() };
		assert!(matches!(weak_cost.validate(), Err(ConfigError::InvalidHashCost { cost: 2 })));

		let mut insecure = base.clone();
		insecure.oauth.token_endpoint = "http://oauth2.example.com/token".into();
		assert!(matches!(insecure.validate(), Err(ConfigError::InvalidDescriptor(_))));

		let mut no_client = base.clone();
		no_client.oauth.client_id = String::new();
		assert!(matches!(
			no_client.validate(),
			Err(ConfigError::MissingValue { field: "oauth.client_id" })
		));

		let mut zero_limit = base;
		zero_limit.rate_limit.methods.push(MethodLimitConfig { pattern: "login".into(), limit: 0 });
		assert!(matches!(zero_limit.validate(), Err(ConfigError::ZeroCapacity { .. })));
	}

	#[test]
	fn oversized_durations_fail_validation() {
		let huge_access = AuthConfig::from_json_str(
			&MINIMAL.replacen('{', r#"{"access_ttl_secs": 9223372036854775807,"#, 1),
		)
		.expect_err("An access window past the date range must fail validation.");

		assert!(matches!(
			huge_access,
			ConfigError::DurationOutOfRange { field: "access_ttl_secs" }
		));

		let base = AuthConfig::from_json_str(MINIMAL).expect("Minimal config should load.");
		let beyond_i64 = AuthConfig { refresh_ttl_secs: u64::MAX, ..base.clone() };

		assert!(matches!(
			beyond_i64.validate(),
			Err(ConfigError::DurationOutOfRange { field: "refresh_ttl_secs" })
		));

		let mut huge_state = base.clone();

		huge_state.oauth.state_ttl_secs = i64::MAX as u64;

		assert!(matches!(
			huge_state.validate(),
			Err(ConfigError::DurationOutOfRange { field: "oauth.state_ttl_secs" })
		));

		let mut huge_window = base;

		huge_window.rate_limit.window_secs = MAX_WINDOW_SECS + 1;

		assert!(matches!(
			huge_window.validate(),
			Err(ConfigError::DurationOutOfRange { field: "rate_limit.window_secs" })
		));
	}

	#[test]
	fn missing_secrets_fail_validation() {
		let err = AuthConfig::from_json_str("{}").expect_err("Secrets are required.");

		assert!(matches!(err, ConfigError::EmptySigningSecret { kind: "access" }));
	}
}
