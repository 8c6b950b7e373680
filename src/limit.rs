//! Two-tier admission control: a global token bucket, then an optional per-method bucket.
//!
//! Admission is checked before any request reaches the use-case layer. A rejection is final
//! for that request; the controller never queues or retries, callers try again later. A
//! permit taken from the global bucket is not returned when the method bucket rejects.

pub mod bucket;
pub mod registry;

pub use bucket::*;
pub use registry::*;

// std
use std::num::NonZeroU32;
// self
use crate::{
	_prelude::*,
	config::RateLimitConfig,
	error::ConfigError,
	obs::{self, AdmissionOutcome},
};

/// Label used for rejections issued by the global bucket.
pub const GLOBAL_SCOPE: &str = "global";

/// Gatekeeper holding every bucket that governs inbound requests.
#[derive(Clone, Debug)]
pub struct AdmissionController {
	global: Option<Arc<TokenBucket>>,
	methods: MethodLimiterRegistry,
}
impl AdmissionController {
	/// Creates a controller from pre-built buckets.
	pub fn new(global: Arc<TokenBucket>, methods: MethodLimiterRegistry) -> Self {
		Self { global: Some(global), methods }
	}

	/// Controller that admits every request.
	pub fn disabled() -> Self {
		Self { global: None, methods: MethodLimiterRegistry::default() }
	}

	/// Builds the buckets described by `config` on the system clock.
	pub fn from_config(config: &RateLimitConfig) -> Result<Self, ConfigError> {
		Self::from_config_with_clock(config, BucketClock::System)
	}

	/// Builds the buckets described by `config`, all sharing `clock`.
	pub fn from_config_with_clock(
		config: &RateLimitConfig,
		clock: BucketClock,
	) -> Result<Self, ConfigError> {
		if !config.enabled {
			return Ok(Self::disabled());
		}

		let window = config.window()?;
		let global = NonZeroU32::new(config.global)
			.ok_or_else(|| ConfigError::ZeroCapacity { field: GLOBAL_SCOPE.into() })?;
		let mut entries = Vec::with_capacity(config.methods.len());

		for method in &config.methods {
			let capacity = NonZeroU32::new(method.limit)
				.ok_or_else(|| ConfigError::ZeroCapacity { field: method.pattern.clone() })?;
			let bucket = Arc::new(TokenBucket::with_clock(capacity, window, clock.clone()));

			entries.push((method.pattern.as_str(), bucket));
		}

		let methods = MethodLimiterRegistry::new(entries)?;
		let global = Arc::new(TokenBucket::with_clock(global, window, clock));

		Ok(Self::new(global, methods))
	}

	/// Global bucket, if admission control is enabled.
	pub fn global(&self) -> Option<&Arc<TokenBucket>> {
		self.global.as_ref()
	}

	/// Per-method limiters.
	pub fn methods(&self) -> &MethodLimiterRegistry {
		&self.methods
	}

	/// Takes a permit for `method` from the global bucket, then from the first matching
	/// method bucket.
	pub fn admit(&self, method: &str) -> Result<()> {
		if let Some(global) = &self.global
			&& !global.try_acquire()
		{
			return Err(reject(method, GLOBAL_SCOPE));
		}

		let scope = match self.methods.find(method) {
			Some(limiter) if !limiter.bucket().try_acquire() =>
				return Err(reject(method, limiter.pattern())),
			Some(limiter) => limiter.pattern(),
			None => GLOBAL_SCOPE,
		};

		obs::record_admission(scope, AdmissionOutcome::Admitted);

		Ok(())
	}
}

fn reject(method: &str, scope: &str) -> Error {
	obs::record_admission(scope, AdmissionOutcome::Rejected);
	tracing::debug!(method, scope, "Request rejected by admission control.");

	Error::ResourceExhausted { scope: scope.to_owned() }
}
