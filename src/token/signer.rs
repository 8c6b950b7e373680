//! Token signing capability and its HMAC implementation.

// crates.io
use jsonwebtoken::{
	Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind as JwtErrorKind,
};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	token::{Claims, TokenError},
};

/// Signs and verifies claim sets with a single key.
///
/// Implementations must check the signature and the `exp` claim; the token service checks
/// the token kind on top.
pub trait TokenSigner
where
	Self: Send + Sync,
{
	/// Serializes and signs the claim set.
	fn sign(&self, claims: &Claims) -> Result<Secret, TokenError>;

	/// Parses the token and validates its signature and expiry.
	fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// HS256 signer backed by a shared secret.
#[derive(Clone)]
pub struct HmacSigner {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
}
impl HmacSigner {
	/// Builds a signer for the provided secret.
	pub fn new(secret: &Secret) -> Self {
		let bytes = secret.expose().as_bytes();
		let mut validation = Validation::new(Algorithm::HS256);

		validation.leeway = 0;
		validation.set_required_spec_claims(&["exp", "sub"]);

		Self {
			encoding: EncodingKey::from_secret(bytes),
			decoding: DecodingKey::from_secret(bytes),
			validation,
		}
	}
}
impl TokenSigner for HmacSigner {
	fn sign(&self, claims: &Claims) -> Result<Secret, TokenError> {
		jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
			.map(Secret::new)
			.map_err(|source| TokenError::Signing { source })
	}

	fn verify(&self, token: &str) -> Result<Claims, TokenError> {
		match jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation) {
			Ok(data) => Ok(data.claims),
			Err(e) if matches!(e.kind(), JwtErrorKind::ExpiredSignature) => Err(TokenError::Expired),
			Err(source) => Err(TokenError::Invalid { source }),
		}
	}
}
impl Debug for HmacSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HmacSigner").field("algorithm", &Algorithm::HS256).finish_non_exhaustive()
	}
}
