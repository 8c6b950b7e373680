//! Claim set carried by access and refresh tokens.

// crates.io
use uuid::Uuid;
// self
use crate::{_prelude::*, auth::UserId, token::TokenError};

/// Distinguishes access tokens from refresh tokens inside the claim set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
	/// Short-lived token authorizing requests.
	Access,
	/// Long-lived token used solely to mint new access tokens.
	Refresh,
}
impl TokenKind {
	/// Returns a stable label suitable for claims, spans, and metrics.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenKind::Access => "access",
			TokenKind::Refresh => "refresh",
		}
	}
}
impl Display for TokenKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Signed claim set; timestamps are Unix seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Subject user id.
	pub sub: UserId,
	/// Expiry instant.
	pub exp: i64,
	/// Issued-at instant.
	pub iat: i64,
	/// Random token id; keeps tokens minted within the same second distinct.
	pub jti: Uuid,
	/// Token kind.
	pub typ: TokenKind,
}
impl Claims {
	/// Builds a claim set valid from `issued_at` for `ttl`.
	///
	/// Fails when the expiry falls outside the representable date range.
	pub fn new(
		kind: TokenKind,
		subject: UserId,
		issued_at: OffsetDateTime,
		ttl: Duration,
	) -> Result<Self, TokenError> {
		let expires_at = issued_at.checked_add(ttl).ok_or(TokenError::ExpiryOutOfRange)?;

		Ok(Self {
			sub: subject,
			exp: expires_at.unix_timestamp(),
			iat: issued_at.unix_timestamp(),
			jti: Uuid::new_v4(),
			typ: kind,
		})
	}
}
