//! Reconnect backoff policy.
//!
//! Delays grow geometrically from `initial_delay` and are capped at
//! `max_delay`; the sequence is non-decreasing and ends after
//! `max_attempts`, so a dead endpoint settles into a terminal state instead
//! of looping forever.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
	pub initial_delay: Duration,
	/// Growth factor between consecutive delays (values below 1 are treated as 1).
	pub multiplier: u32,
	pub max_delay: Duration,
	/// Number of attempts after which reconnecting gives up.
	pub max_attempts: u32,
	/// Consecutive failed attempts tolerated silently before the UI is told.
	pub surface_after: u32,
}

impl Default for BackoffPolicy {
	fn default() -> Self {
		Self {
			initial_delay: Duration::from_millis(250),
			multiplier: 2,
			max_delay: Duration::from_secs(10),
			max_attempts: 10,
			surface_after: 2,
		}
	}
}

impl BackoffPolicy {
	/// Delay before attempt number `attempt` (1-based), or `None` once exhausted.
	pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
		if attempt == 0 || attempt > self.max_attempts {
			return None;
		}
		let factor = self.multiplier.max(1).saturating_pow(attempt - 1);
		Some(self.initial_delay.saturating_mul(factor).min(self.max_delay))
	}

	/// Returns true once `attempt` failures should be shown as "reconnecting".
	pub fn should_surface(&self, attempt: u32) -> bool {
		attempt >= self.surface_after
	}

	/// Iterator over every delay the policy will ever produce.
	pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
		(1..=self.max_attempts).filter_map(|attempt| self.delay_for(attempt))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn delays_grow_then_cap() {
		let policy = BackoffPolicy {
			initial_delay: Duration::from_millis(100),
			multiplier: 2,
			max_delay: Duration::from_millis(500),
			max_attempts: 6,
			surface_after: 2,
		};
		let delays: Vec<u128> = policy.delays().map(|d| d.as_millis()).collect();
		assert_eq!(delays, vec![100, 200, 400, 500, 500, 500]);
	}

	#[test]
	fn delays_are_monotonic_for_many_policies() {
		for multiplier in 0..5 {
			for initial_ms in [0, 1, 50, 999, 20_000] {
				let policy = BackoffPolicy {
					initial_delay: Duration::from_millis(initial_ms),
					multiplier,
					max_delay: Duration::from_secs(5),
					max_attempts: 64,
					surface_after: 1,
				};
				let delays: Vec<Duration> = policy.delays().collect();
				assert_eq!(delays.len(), 64);
				for pair in delays.windows(2) {
					assert!(pair[1] >= pair[0], "non-monotonic delays for {policy:?}: {pair:?}");
				}
				assert!(delays.iter().all(|d| *d <= policy.max_delay));
			}
		}
	}

	#[test]
	fn exhausted_after_max_attempts() {
		let policy = BackoffPolicy {
			max_attempts: 3,
			..Default::default()
		};
		assert!(policy.delay_for(3).is_some());
		assert_eq!(policy.delay_for(4), None);
		assert_eq!(policy.delay_for(0), None);
	}

	#[test]
	fn huge_attempt_numbers_saturate() {
		let policy = BackoffPolicy {
			max_attempts: u32::MAX,
			..Default::default()
		};
		assert_eq!(policy.delay_for(1_000), Some(policy.max_delay));
	}

	#[test]
	fn surfacing_threshold() {
		let policy = BackoffPolicy::default();
		assert!(!policy.should_surface(1));
		assert!(policy.should_surface(2));
	}
}
