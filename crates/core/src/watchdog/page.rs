//! Per-frame agent combining the countdown and activity detection.

use keepalive_protocol::RuntimeMessage;
use tokio::time::Instant;

use super::activity::{ActivityDetector, ElementNode};
use super::{BannerChange, Tick, Visibility, Watchdog};
use crate::config::WatchdogConfig;

/// Everything a content script does, minus the DOM.
///
/// Every frame reports activity; only the top frame owns the countdown.
#[derive(Debug, Clone)]
pub struct PageAgent {
	activity: ActivityDetector,
	watchdog: Option<Watchdog>,
}

impl PageAgent {
	/// Agent for the top-level frame, with a countdown for `url`.
	pub fn top_frame(config: &WatchdogConfig, url: impl Into<String>, now: Instant) -> Self {
		Self {
			activity: ActivityDetector::new(config),
			watchdog: Some(Watchdog::new(config, url, now)),
		}
	}

	/// Agent for an embedded frame: activity only.
	pub fn sub_frame(config: &WatchdogConfig) -> Self {
		Self {
			activity: ActivityDetector::new(config),
			watchdog: None,
		}
	}

	pub fn watchdog(&self) -> Option<&Watchdog> {
		self.watchdog.as_ref()
	}

	/// Handles a message from the background. Returns a banner change if one is needed.
	pub fn on_message(&mut self, message: &RuntimeMessage, now: Instant) -> Option<BannerChange> {
		match (message, self.watchdog.as_mut()) {
			(RuntimeMessage::ResetFromBg, Some(watchdog)) => watchdog.reset(now),
			_ => None,
		}
	}

	pub fn tick(&mut self, now: Instant, visibility: Visibility) -> Option<Tick> {
		self.watchdog.as_mut().map(|w| w.tick(now, visibility))
	}

	pub fn on_visibility_change(&mut self, now: Instant, visibility: Visibility) -> Option<RuntimeMessage> {
		self.watchdog.as_mut()?.on_visibility_change(now, visibility)
	}

	/// Reset button or expired-banner link.
	pub fn request_refresh(&self) -> Option<RuntimeMessage> {
		self.watchdog.as_ref().map(Watchdog::request_refresh)
	}

	pub fn on_pointer<N: ElementNode>(&mut self, target: N, now: Instant) -> Option<RuntimeMessage> {
		self.activity.on_pointer(target, now)
	}

	pub fn on_key<N: ElementNode>(&mut self, key: &str, focused: N, now: Instant) -> Option<RuntimeMessage> {
		self.activity.on_key(key, focused, now)
	}
}
