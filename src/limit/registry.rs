//! Per-method limiter lookup by case-insensitive substring match.

// self
use crate::{_prelude::*, error::ConfigError, limit::TokenBucket};

/// Bucket dedicated to every RPC method whose name contains `pattern`.
#[derive(Clone, Debug)]
pub struct MethodLimiter {
	pattern: String,
	bucket: Arc<TokenBucket>,
}
impl MethodLimiter {
	/// Lowercased substring this limiter matches.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Bucket consulted for matching methods.
	pub fn bucket(&self) -> &Arc<TokenBucket> {
		&self.bucket
	}
}

/// Immutable, ordered set of method limiters built once at startup.
///
/// When several patterns match the same method, the one registered first wins.
#[derive(Clone, Debug, Default)]
pub struct MethodLimiterRegistry(Arc<[MethodLimiter]>);
impl MethodLimiterRegistry {
	/// Builds a registry from `(pattern, bucket)` pairs, preserving their order.
	pub fn new<I, S>(entries: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = (S, Arc<TokenBucket>)>,
		S: AsRef<str>,
	{
		let mut limiters = Vec::new();

		for (pattern, bucket) in entries {
			let pattern = pattern.as_ref().trim().to_lowercase();

			if pattern.is_empty() {
				return Err(ConfigError::EmptyMethodPattern);
			}

			limiters.push(MethodLimiter { pattern, bucket });
		}

		Ok(Self(limiters.into()))
	}

	/// Returns the first limiter whose pattern occurs in `method`, ignoring case.
	pub fn find(&self, method: &str) -> Option<&MethodLimiter> {
		let method = method.to_lowercase();

		self.0.iter().find(|limiter| method.contains(limiter.pattern.as_str()))
	}

	/// Number of registered limiters.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no limiters are registered.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over limiters in registration order.
	pub fn iter(&self) -> impl Iterator<Item = &MethodLimiter> {
		self.0.iter()
	}
}
