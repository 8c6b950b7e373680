//! Token bucket backed by governor's GCRA limiter, plus the clock it reads.

// std
use std::{num::NonZeroU32, time::Duration as StdDuration};
// crates.io
use governor::{
	Quota, RateLimiter,
	clock::{DefaultClock, FakeRelativeClock},
	middleware::NoOpMiddleware,
	nanos::Nanos,
	state::{InMemoryState, NotKeyed},
};
// self
use crate::_prelude::*;

/// Hand-driven clock for deterministic refill behaviour; clones share the same instant.
pub type ManualClock = FakeRelativeClock;

/// Time source consulted on every bucket check.
#[derive(Clone, Debug, Default)]
pub enum BucketClock {
	/// Monotonic system clock.
	#[default]
	System,
	/// Clock moved forward by hand.
	Manual(ManualClock),
}
impl From<ManualClock> for BucketClock {
	fn from(clock: ManualClock) -> Self {
		Self::Manual(clock)
	}
}

enum Limiter {
	System(RateLimiter<NotKeyed, InMemoryState, DefaultClock>),
	Manual(RateLimiter<NotKeyed, InMemoryState, ManualClock, NoOpMiddleware<Nanos>>),
}

/// Token bucket holding up to `capacity` permits, refilled linearly over `window`.
///
/// One permit is replenished every `window / capacity` and at most `capacity` are stored.
/// Checks update the limiter state atomically, so concurrent callers can never both take
/// the last permit.
pub struct TokenBucket {
	capacity: NonZeroU32,
	window: StdDuration,
	limiter: Limiter,
}
impl TokenBucket {
	/// Creates a full bucket driven by the system clock.
	pub fn new(capacity: NonZeroU32, window: StdDuration) -> Self {
		Self::with_clock(capacity, window, BucketClock::System)
	}

	/// Creates a full bucket driven by the provided clock.
	pub fn with_clock(capacity: NonZeroU32, window: StdDuration, clock: BucketClock) -> Self {
		let quota = quota(capacity, window);
		let limiter = match clock {
			BucketClock::System => Limiter::System(RateLimiter::direct(quota)),
			BucketClock::Manual(clock) =>
				Limiter::Manual(RateLimiter::direct_with_clock(quota, clock)),
		};

		Self { capacity, window, limiter }
	}

	/// Maximum number of permits.
	pub fn capacity(&self) -> u32 {
		self.capacity.get()
	}

	/// Window over which an empty bucket refills completely.
	pub fn window(&self) -> StdDuration {
		self.window
	}

	/// Takes one permit if available; never blocks or queues.
	pub fn try_acquire(&self) -> bool {
		match &self.limiter {
			Limiter::System(limiter) => limiter.check().is_ok(),
			Limiter::Manual(limiter) => limiter.check().is_ok(),
		}
	}
}
impl Debug for TokenBucket {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBucket")
			.field("capacity", &self.capacity)
			.field("window", &self.window)
			.finish_non_exhaustive()
	}
}

fn quota(capacity: NonZeroU32, window: StdDuration) -> Quota {
	let period = (window / capacity.get()).max(StdDuration::from_nanos(1));

	Quota::with_period(period).unwrap_or_else(|| Quota::per_second(capacity)).allow_burst(capacity)
}
