//! Session token issuance, verification, and refresh rotation.
//!
//! Access and refresh tokens are both signed claim sets, but each kind is signed with its own
//! [`TokenSigner`] and carries its kind in the `typ` claim. A refresh token is therefore never
//! accepted where an access token is expected (and vice versa), and a leaked access-signing
//! key cannot mint refresh tokens. Expiry is the only way a token stops being valid.

pub mod claims;
pub mod signer;

pub use claims::*;
pub use signer::*;

// self
use crate::{
	_prelude::*,
	auth::{Secret, UserId},
	error::ConfigError,
};

/// Default access token validity.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::hours(1);
/// Default refresh token validity.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::hours(24);

/// Failures raised while signing or verifying session tokens.
#[derive(Debug, ThisError)]
pub enum TokenError {
	/// The claim set could not be signed.
	#[error("Session token could not be signed.")]
	Signing {
		/// Underlying JWT failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// The token's expiry has passed.
	#[error("Session token has expired.")]
	Expired,
	/// The token is malformed or its signature does not verify.
	#[error("Session token is invalid.")]
	Invalid {
		/// Underlying JWT failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// The token verified but is of the wrong kind.
	#[error("Expected a {expected} token but received a {found} token.")]
	WrongKind {
		/// Kind the caller asked for.
		expected: TokenKind,
		/// Kind found in the claims.
		found: TokenKind,
	},
	/// The validity window pushes the expiry past the representable date range.
	#[error("Session token expiry is out of range.")]
	ExpiryOutOfRange,
}
impl From<TokenError> for Error {
	fn from(e: TokenError) -> Self {
		match e {
			e @ (TokenError::Signing { .. } | TokenError::ExpiryOutOfRange) => Error::internal(e),
			_ => Error::unauthenticated("session token is invalid or expired"),
		}
	}
}

/// Access + refresh token pair returned by Login and OAuth callbacks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionTokens {
	/// Short-lived access token.
	pub access_token: Secret,
	/// Long-lived refresh token.
	pub refresh_token: Secret,
}

/// Issues and verifies session tokens with distinct per-kind signers.
#[derive(Clone)]
pub struct TokenService {
	access: Arc<dyn TokenSigner>,
	refresh: Arc<dyn TokenSigner>,
	access_ttl: Duration,
	refresh_ttl: Duration,
}
impl TokenService {
	/// Creates a service from two signers, using the default validity windows.
	pub fn new(access: Arc<dyn TokenSigner>, refresh: Arc<dyn TokenSigner>) -> Self {
		Self {
			access,
			refresh,
			access_ttl: DEFAULT_ACCESS_TTL,
			refresh_ttl: DEFAULT_REFRESH_TTL,
		}
	}

	/// Creates HMAC signers from the two configured secrets.
	///
	/// Rejects empty secrets and a secret shared between both kinds.
	pub fn from_secrets(
		access_secret: &Secret,
		refresh_secret: &Secret,
	) -> Result<Self, ConfigError> {
		if access_secret.is_empty() {
			return Err(ConfigError::EmptySigningSecret { kind: TokenKind::Access.as_str() });
		}
		if refresh_secret.is_empty() {
			return Err(ConfigError::EmptySigningSecret { kind: TokenKind::Refresh.as_str() });
		}
		if access_secret == refresh_secret {
			return Err(ConfigError::SharedSigningSecret);
		}

		Ok(Self::new(
			Arc::new(HmacSigner::new(access_secret)),
			Arc::new(HmacSigner::new(refresh_secret)),
		))
	}

	/// Overrides the validity windows.
	pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
		self.access_ttl = access_ttl;
		self.refresh_ttl = refresh_ttl;

		self
	}

	/// Validity window applied to tokens of `kind`.
	pub fn ttl(&self, kind: TokenKind) -> Duration {
		match kind {
			TokenKind::Access => self.access_ttl,
			TokenKind::Refresh => self.refresh_ttl,
		}
	}

	/// Issues an access token for `subject`, valid from now.
	pub fn issue_access_token(&self, subject: UserId) -> Result<Secret, TokenError> {
		self.issue_at(TokenKind::Access, subject, OffsetDateTime::now_utc())
	}

	/// Issues a refresh token for `subject`, valid from now.
	pub fn issue_refresh_token(&self, subject: UserId) -> Result<Secret, TokenError> {
		self.issue_at(TokenKind::Refresh, subject, OffsetDateTime::now_utc())
	}

	/// Issues both tokens for `subject`.
	pub fn issue_pair(&self, subject: UserId) -> Result<SessionTokens, TokenError> {
		let now = OffsetDateTime::now_utc();

		Ok(SessionTokens {
			access_token: self.issue_at(TokenKind::Access, subject, now)?,
			refresh_token: self.issue_at(TokenKind::Refresh, subject, now)?,
		})
	}

	/// Issues a token of `kind` whose validity window starts at `issued_at`.
	pub fn issue_at(
		&self,
		kind: TokenKind,
		subject: UserId,
		issued_at: OffsetDateTime,
	) -> Result<Secret, TokenError> {
		let claims = Claims::new(kind, subject, issued_at, self.ttl(kind))?;

		self.signer(kind).sign(&claims)
	}

	/// Verifies an access token and returns its claims.
	pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
		self.verify(TokenKind::Access, token)
	}

	/// Verifies a refresh token and returns its claims.
	pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
		self.verify(TokenKind::Refresh, token)
	}

	/// Verifies a refresh token and issues a fresh access token for the same subject.
	///
	/// Any parse, signature, kind, or expiry failure is reported as
	/// [`Error::Unauthenticated`]; nothing is issued in that case.
	pub fn verify_and_rotate(&self, refresh_token: &str) -> Result<Secret> {
		let claims = self.verify_refresh(refresh_token)?;

		Ok(self.issue_access_token(claims.sub)?)
	}

	fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
		let claims = self.signer(kind).verify(token)?;

		if claims.typ != kind {
			return Err(TokenError::WrongKind { expected: kind, found: claims.typ });
		}

		Ok(claims)
	}

	fn signer(&self, kind: TokenKind) -> &dyn TokenSigner {
		match kind {
			TokenKind::Access => self.access.as_ref(),
			TokenKind::Refresh => self.refresh.as_ref(),
		}
	}
}
impl Debug for TokenService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenService")
			.field("access_ttl", &self.access_ttl)
			.field("refresh_ttl", &self.refresh_ttl)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const ACCESS_SECRET: &str = "access-secret-for-tests";
	const REFRESH_SECRET: &str = "refresh-secret-for-tests";

	fn service() -> TokenService {
		TokenService::from_secrets(&Secret::new(ACCESS_SECRET), &Secret::new(REFRESH_SECRET))
			.expect("Distinct secrets should build a token service.")
	}

	#[test]
	fn fresh_access_token_verifies() {
		let service = service();
		let subject = UserId::random();
		let token = service.issue_access_token(subject).expect("Signing should succeed.");
		let claims = service.verify_access(token.expose()).expect("Fresh token should verify.");

		assert_eq!(claims.sub, subject);
		assert_eq!(claims.typ, TokenKind::Access);
		assert_eq!(claims.exp - claims.iat, DEFAULT_ACCESS_TTL.whole_seconds());
	}

	#[test]
	fn expired_token_is_unauthenticated() {
		let service = service();
		let issued = OffsetDateTime::now_utc() - Duration::hours(2);
		let token = service
			.issue_at(TokenKind::Access, UserId::random(), issued)
			.expect("Signing should succeed.");
		let err = service.verify_access(token.expose()).expect_err("Expired token must fail.");

		assert!(matches!(err, TokenError::Expired));
		assert_eq!(Error::from(err).kind(), ErrorKind::Unauthenticated);
	}

	#[test]
	fn refresh_rotation_keeps_subject() {
		let service = service();
		let subject = UserId::random();
		let pair = service.issue_pair(subject).expect("Signing should succeed.");
		let rotated = service
			.verify_and_rotate(pair.refresh_token.expose())
			.expect("Valid refresh token should rotate.");

		assert_ne!(rotated, pair.access_token, "Rotation must mint a new access token.");

		let claims = service.verify_access(rotated.expose()).expect("Rotated token should verify.");

		assert_eq!(claims.sub, subject);
	}

	#[test]
	fn refresh_token_signed_with_access_key_is_rejected() {
		let service = service();
		let forged = HmacSigner::new(&Secret::new(ACCESS_SECRET))
			.sign(&Claims::new(
				TokenKind::Refresh,
				UserId::random(),
				OffsetDateTime::now_utc(),
				DEFAULT_REFRESH_TTL,
			)
			.expect("Default refresh window should be representable."))
			.expect("Signing should succeed.");
		let err = service
			.verify_and_rotate(forged.expose())
			.expect_err("Refresh tokens signed with the access key must be rejected.");

		assert_eq!(err.kind(), ErrorKind::Unauthenticated);
	}

	#[test]
	fn kinds_are_not_interchangeable() {
		let service = service();
		let pair = service.issue_pair(UserId::random()).expect("Signing should succeed.");

		assert!(service.verify_and_rotate(pair.access_token.expose()).is_err());
		assert!(service.verify_access(pair.refresh_token.expose()).is_err());
		assert!(service.verify_access("not.a.jwt").is_err());
	}

	#[test]
	fn oversized_ttl_fails_issuance_without_panicking() {
		let service = service().with_ttls(Duration::MAX, DEFAULT_REFRESH_TTL);
		let err = service
			.issue_pair(UserId::random())
			.expect_err("An unrepresentable access expiry must fail issuance.");

		assert!(matches!(err, TokenError::ExpiryOutOfRange));
		assert_eq!(Error::from(err).kind(), ErrorKind::Internal);
	}

	#[test]
	fn shared_or_empty_secrets_are_rejected() {
		let same = Secret::new("same");

		assert!(matches!(
			TokenService::from_secrets(&same, &same),
			Err(ConfigError::SharedSigningSecret)
		));
		assert!(matches!(
			TokenService::from_secrets(&Secret::new(""), &same),
			Err(ConfigError::EmptySigningSecret { kind: "access" })
		));
	}
}
