//! Session phase and the one-shot completion latch.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Where a refresh session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
	Creating,
	Loading,
	/// The sibling tab sits on an authentication interstitial.
	LoginWait,
	Closing,
	Restoring,
	Done,
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Creating => "creating",
			Self::Loading => "loading",
			Self::LoginWait => "login_wait",
			Self::Closing => "closing",
			Self::Restoring => "restoring",
			Self::Done => "done",
		};
		f.write_str(name)
	}
}

/// What asked for completion first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishTrigger {
	/// The sibling tab finished loading its destination.
	Loaded,
	/// The sibling tab left the authentication interstitial.
	LoginResolved,
	/// Nothing resolved before the session deadline.
	SafetyTimeout,
	/// The update stream closed underneath the session.
	TabLost,
}

/// Completion scheduled by the first trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
	pub trigger: FinishTrigger,
	pub at: Instant,
}

/// One-shot latch guarding completion.
///
/// Every trigger source (load complete, URL change, poll, safety timer) calls
/// [`schedule`](Self::schedule); only the first call arms the deadline.
#[derive(Debug, Default)]
pub struct CompletionLatch {
	scheduled: Option<Scheduled>,
}

impl CompletionLatch {
	pub fn new() -> Self {
		Self::default()
	}

	/// Arms completion `delay` after `now`. Returns `false` if already armed.
	pub fn schedule(&mut self, trigger: FinishTrigger, delay: Duration, now: Instant) -> bool {
		if self.scheduled.is_some() {
			return false;
		}
		self.scheduled = Some(Scheduled { trigger, at: now + delay });
		true
	}

	pub fn is_scheduled(&self) -> bool {
		self.scheduled.is_some()
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.scheduled.map(|s| s.at)
	}

	pub fn trigger(&self) -> Option<FinishTrigger> {
		self.scheduled.map(|s| s.trigger)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn first_schedule_wins() {
		let now = Instant::now();
		let mut latch = CompletionLatch::new();

		assert!(latch.schedule(FinishTrigger::Loaded, Duration::from_millis(500), now));
		for _ in 0..5 {
			assert!(!latch.schedule(FinishTrigger::SafetyTimeout, Duration::ZERO, now));
		}

		assert_eq!(latch.trigger(), Some(FinishTrigger::Loaded));
		assert_eq!(latch.deadline(), Some(now + Duration::from_millis(500)));
	}

	#[test]
	fn unarmed_latch_has_no_deadline() {
		let latch = CompletionLatch::new();
		assert!(!latch.is_scheduled());
		assert_eq!(latch.deadline(), None);
		assert_eq!(latch.trigger(), None);
	}

	#[test]
	fn phase_names_are_snake_case() {
		assert_eq!(Phase::LoginWait.to_string(), "login_wait");
		assert_eq!(serde_json::to_value(Phase::LoginWait).unwrap(), "login_wait");
	}
}
