//! Password hashing and verification.
//!
//! Hashes are bcrypt strings (`$2b$<cost>$<salt><digest>`), so each output embeds its own
//! random salt and work factor. Verification defers to bcrypt's comparison and never
//! distinguishes a malformed stored hash from a wrong password to the caller.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, auth::Secret, error::ConfigError};

/// Default bcrypt work factor.
pub const DEFAULT_HASH_COST: u32 = 10;
/// Length of passwords minted for OAuth-provisioned accounts.
pub const RANDOM_PASSWORD_LEN: usize = 32;

const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

/// Failures raised by the [`CredentialManager`].
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// The hashing primitive failed.
	#[error("Password hashing failed.")]
	HashingFailed {
		/// Underlying bcrypt failure.
		#[source]
		source: bcrypt::BcryptError,
	},
	/// The candidate password does not match the stored hash.
	#[error("Password does not match the stored hash.")]
	Mismatch,
}
impl From<CredentialError> for Error {
	fn from(e: CredentialError) -> Self {
		match e {
			CredentialError::Mismatch => Error::CredentialInvalid,
			e @ CredentialError::HashingFailed { .. } => Error::internal(e),
		}
	}
}

/// Hashes, verifies, and mints passwords with a fixed work factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CredentialManager {
	cost: u32,
}
impl CredentialManager {
	/// Creates a manager using the provided bcrypt cost.
	pub fn new(cost: u32) -> Result<Self, ConfigError> {
		if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
			return Err(ConfigError::InvalidHashCost { cost });
		}

		Ok(Self { cost })
	}

	/// Configured bcrypt work factor.
	pub fn cost(&self) -> u32 {
		self.cost
	}

	/// Hashes the password with a fresh random salt.
	///
	/// Blocks the calling thread for the duration of the adaptive hash; async callers should
	/// run it on the blocking pool.
	pub fn hash(&self, password: &Secret) -> Result<String, CredentialError> {
		bcrypt::hash(password.expose(), self.cost)
			.map_err(|source| CredentialError::HashingFailed { source })
	}

	/// Checks `candidate` against a hash produced by [`hash`](Self::hash).
	pub fn verify(&self, hash: &str, candidate: &Secret) -> Result<(), CredentialError> {
		match bcrypt::verify(candidate.expose(), hash) {
			Ok(true) => Ok(()),
			Ok(false) => Err(CredentialError::Mismatch),
			Err(e) => {
				tracing::warn!(error = %e, "Stored password hash could not be parsed.");

				Err(CredentialError::Mismatch)
			},
		}
	}

	/// Mints an alphanumeric password of `len` characters.
	///
	/// Only used to satisfy the "password required" storage invariant for accounts created
	/// through OAuth; the value is hashed immediately and never surfaced.
	pub fn random_password(&self, len: usize) -> Secret {
		let value: String = rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect();

		Secret::new(value)
	}
}
impl Default for CredentialManager {
	fn default() -> Self {
		Self { cost: DEFAULT_HASH_COST }
	}
}
