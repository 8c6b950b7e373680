//! CSRF state and PKCE material for pending authorization attempts.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::Secret};

/// Default lifetime of a pending authorization attempt.
pub const DEFAULT_STATE_TTL: Duration = Duration::minutes(10);

const STATE_LEN: usize = 32;
const PKCE_VERIFIER_LEN: usize = 64;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PkceCodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl PkceCodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			PkceCodeChallengeMethod::S256 => "S256",
		}
	}
}

/// PKCE verifier plus its derived challenge.
#[derive(Clone, Debug)]
pub struct PkcePair {
	verifier: Secret,
	challenge: String,
	method: PkceCodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh verifier and its S256 challenge.
	pub fn generate() -> Self {
		let verifier = random_string(PKCE_VERIFIER_LEN);
		let challenge = compute_pkce_challenge(&verifier);

		Self { verifier: Secret::new(verifier), challenge, method: PkceCodeChallengeMethod::S256 }
	}

	/// Secret verifier sent with the code exchange.
	pub fn verifier(&self) -> &Secret {
		&self.verifier
	}

	/// Challenge sent with the authorization redirect.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// Challenge method (currently always `S256`).
	pub fn method(&self) -> PkceCodeChallengeMethod {
		self.method
	}
}

/// One pending redirect: the CSRF `state` the callback must echo plus PKCE material.
#[derive(Clone, Debug)]
pub struct AuthorizationAttempt {
	state: String,
	pkce: PkcePair,
	issued_at: OffsetDateTime,
}
impl AuthorizationAttempt {
	/// Mints a fresh attempt issued at `issued_at`.
	pub fn generate(issued_at: OffsetDateTime) -> Self {
		Self { state: random_string(STATE_LEN), pkce: PkcePair::generate(), issued_at }
	}

	/// Opaque state value that must round-trip through the provider redirect.
	pub fn state(&self) -> &str {
		&self.state
	}

	/// PKCE material bound to this attempt.
	pub fn pkce(&self) -> &PkcePair {
		&self.pkce
	}

	/// Instant the attempt was minted.
	pub fn issued_at(&self) -> OffsetDateTime {
		self.issued_at
	}

	// An expiry past the date range never arrives.
	fn is_expired_at(&self, ttl: Duration, now: OffsetDateTime) -> bool {
		self.issued_at.checked_add(ttl).is_some_and(|expires_at| now >= expires_at)
	}
}

/// Process-owned registry of pending authorization attempts.
///
/// A state is accepted at most once and only within `ttl` of being issued. Expired entries
/// are purged whenever a new attempt is issued.
#[derive(Debug)]
pub struct StateRegistry {
	ttl: Duration,
	pending: Mutex<HashMap<String, AuthorizationAttempt>>,
}
impl StateRegistry {
	/// Creates an empty registry whose attempts live for `ttl`.
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, pending: Mutex::new(HashMap::new()) }
	}

	/// Lifetime of an attempt.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Number of attempts awaiting a callback, including expired ones not yet purged.
	pub fn len(&self) -> usize {
		self.pending.lock().len()
	}

	/// Returns true if no attempts are pending.
	pub fn is_empty(&self) -> bool {
		self.pending.lock().is_empty()
	}

	/// Mints and records a new attempt.
	pub fn issue(&self) -> AuthorizationAttempt {
		self.issue_at(OffsetDateTime::now_utc())
	}

	/// Mints and records a new attempt issued at `now`.
	pub fn issue_at(&self, now: OffsetDateTime) -> AuthorizationAttempt {
		let attempt = AuthorizationAttempt::generate(now);
		let mut pending = self.pending.lock();

		pending.retain(|_, candidate| !candidate.is_expired_at(self.ttl, now));
		pending.insert(attempt.state.clone(), attempt.clone());

		attempt
	}

	/// Removes and returns the attempt for `state` if it is still live.
	pub fn consume(&self, state: &str) -> Option<AuthorizationAttempt> {
		self.consume_at(state, OffsetDateTime::now_utc())
	}

	/// Removes and returns the attempt for `state` if it is live at `now`.
	pub fn consume_at(&self, state: &str, now: OffsetDateTime) -> Option<AuthorizationAttempt> {
		let attempt = self.pending.lock().remove(state)?;

		if attempt.is_expired_at(self.ttl, now) {
			tracing::debug!("Authorization state presented after expiry.");

			return None;
		}

		Some(attempt)
	}
}
impl Default for StateRegistry {
	fn default() -> Self {
		Self::new(DEFAULT_STATE_TTL)
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

fn compute_pkce_challenge(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());

	URL_SAFE_NO_PAD.encode(digest)
}
