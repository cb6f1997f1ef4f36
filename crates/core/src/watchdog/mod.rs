//! Page-side idle watchdog.
//!
//! The watchdog owns the visible countdown of one page. It asks the background
//! for a refresh when the countdown has run out while the page is visible, or
//! when the user explicitly asks. A `reset_from_bg` restarts the countdown.
//!
//! Everything here takes the current time as an argument, so a binding can
//! drive it from any timer and tests can step it deterministically.

mod activity;
mod page;

use std::time::Duration;

use keepalive_protocol::RuntimeMessage;
use tokio::time::Instant;
use tracing::debug;

pub use activity::{ActivityDetector, ElementNode, ElementRef, ElementTree, NodeId, POINTER_EVENTS, is_actionable};
pub use page::PageAgent;

use crate::config::WatchdogConfig;

/// Whether the page is currently shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
	Visible,
	Hidden,
}

/// Edge-triggered change of the "session expired" banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerChange {
	Show,
	Hide,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
	/// Remaining time as `mm:ss`.
	pub label: String,
	pub banner: Option<BannerChange>,
	/// Refresh request to forward to the background, if the tick auto-triggered one.
	pub request: Option<RuntimeMessage>,
}

/// Countdown and auto-trigger state of one page.
#[derive(Debug, Clone)]
pub struct Watchdog {
	duration: Duration,
	cooldown: Duration,
	url: String,
	deadline: Instant,
	expired_shown: bool,
	last_auto_trigger: Option<Instant>,
}

impl Watchdog {
	pub fn new(config: &WatchdogConfig, url: impl Into<String>, now: Instant) -> Self {
		Self {
			duration: config.session_duration(),
			cooldown: config.auto_trigger_cooldown(),
			url: url.into(),
			deadline: now + config.session_duration(),
			expired_shown: false,
			last_auto_trigger: None,
		}
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Updates the URL sent with future refresh requests.
	pub fn set_url(&mut self, url: impl Into<String>) {
		self.url = url.into();
	}

	/// Restarts the full window from `now`. Returns `Hide` if the banner was up.
	pub fn reset(&mut self, now: Instant) -> Option<BannerChange> {
		self.deadline = now + self.duration;
		debug!(target = "keepalive.watchdog", url = %self.url, "countdown reset");
		if std::mem::replace(&mut self.expired_shown, false) {
			Some(BannerChange::Hide)
		} else {
			None
		}
	}

	pub fn remaining(&self, now: Instant) -> Duration {
		self.deadline.saturating_duration_since(now)
	}

	pub fn is_expired(&self, now: Instant) -> bool {
		self.remaining(now).is_zero()
	}

	/// Remaining time as zero-padded `mm:ss`, rounded down.
	pub fn countdown_label(&self, now: Instant) -> String {
		format_countdown(self.remaining(now))
	}

	/// Advances the countdown display and fires the auto-trigger when due.
	pub fn tick(&mut self, now: Instant, visibility: Visibility) -> Tick {
		if !self.is_expired(now) {
			let banner = std::mem::replace(&mut self.expired_shown, false).then_some(BannerChange::Hide);
			return Tick {
				label: self.countdown_label(now),
				banner,
				request: None,
			};
		}

		let banner = (!std::mem::replace(&mut self.expired_shown, true)).then_some(BannerChange::Show);
		Tick {
			label: format_countdown(Duration::ZERO),
			banner,
			request: self.try_auto_trigger(now, visibility),
		}
	}

	/// A page that becomes visible after expiring refreshes right away.
	pub fn on_visibility_change(&mut self, now: Instant, visibility: Visibility) -> Option<RuntimeMessage> {
		self.try_auto_trigger(now, visibility)
	}

	/// Explicit user request (reset button, expired banner link). Never throttled.
	pub fn request_refresh(&self) -> RuntimeMessage {
		debug!(target = "keepalive.watchdog", url = %self.url, "explicit refresh requested");
		RuntimeMessage::open_and_close(self.url.clone())
	}

	fn try_auto_trigger(&mut self, now: Instant, visibility: Visibility) -> Option<RuntimeMessage> {
		if visibility != Visibility::Visible || !self.is_expired(now) {
			return None;
		}
		if let Some(last) = self.last_auto_trigger {
			if now.saturating_duration_since(last) <= self.cooldown {
				return None;
			}
		}
		self.last_auto_trigger = Some(now);
		debug!(target = "keepalive.watchdog", url = %self.url, "countdown expired; requesting refresh");
		Some(RuntimeMessage::open_and_close(self.url.clone()))
	}
}

fn format_countdown(remaining: Duration) -> String {
	let secs = remaining.as_secs();
	format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
	use super::*;

	const URL: &str = "https://intranet.example/app";

	fn watchdog(now: Instant) -> Watchdog {
		Watchdog::new(&WatchdogConfig::default(), URL, now)
	}

	#[test]
	fn fresh_countdown_shows_full_window() {
		let now = Instant::now();
		let dog = watchdog(now);
		assert_eq!(dog.countdown_label(now), "15:00");
		assert_eq!(dog.countdown_label(now + Duration::from_millis(1500)), "14:58");
		assert!(!dog.is_expired(now + Duration::from_secs(899)));
	}

	#[test]
	fn expiry_shows_banner_once_and_requests_refresh() {
		let start = Instant::now();
		let mut dog = watchdog(start);
		let expired = start + Duration::from_secs(900);

		let tick = dog.tick(expired, Visibility::Visible);
		assert_eq!(tick.label, "00:00");
		assert_eq!(tick.banner, Some(BannerChange::Show));
		assert_eq!(tick.request, Some(RuntimeMessage::open_and_close(URL)));

		let tick = dog.tick(expired + Duration::from_secs(1), Visibility::Visible);
		assert_eq!(tick.banner, None);
		assert_eq!(tick.request, None, "cooldown suppresses a second request");
	}

	#[test]
	fn auto_trigger_respects_cooldown() {
		let start = Instant::now();
		let mut dog = watchdog(start);
		let expired = start + Duration::from_secs(900);

		assert!(dog.tick(expired, Visibility::Visible).request.is_some());
		assert!(dog.tick(expired + Duration::from_secs(3), Visibility::Visible).request.is_none());
		assert!(dog.tick(expired + Duration::from_millis(3001), Visibility::Visible).request.is_some());
	}

	#[test]
	fn hidden_page_waits_until_visible() {
		let start = Instant::now();
		let mut dog = watchdog(start);
		let expired = start + Duration::from_secs(901);

		let tick = dog.tick(expired, Visibility::Hidden);
		assert_eq!(tick.banner, Some(BannerChange::Show));
		assert!(tick.request.is_none());

		assert!(dog.on_visibility_change(expired, Visibility::Hidden).is_none());
		assert_eq!(dog.on_visibility_change(expired, Visibility::Visible), Some(RuntimeMessage::open_and_close(URL)));
	}

	#[test]
	fn visibility_before_expiry_does_nothing() {
		let start = Instant::now();
		let mut dog = watchdog(start);
		assert!(dog.on_visibility_change(start + Duration::from_secs(10), Visibility::Visible).is_none());
	}

	#[test]
	fn reset_hides_banner_and_restarts_window() {
		let start = Instant::now();
		let mut dog = watchdog(start);
		let expired = start + Duration::from_secs(900);
		dog.tick(expired, Visibility::Hidden);

		assert_eq!(dog.reset(expired), Some(BannerChange::Hide));
		assert_eq!(dog.countdown_label(expired), "15:00");
		assert_eq!(dog.reset(expired), None);
	}

	#[test]
	fn explicit_request_ignores_cooldown() {
		let start = Instant::now();
		let mut dog = watchdog(start);
		dog.set_url("https://intranet.example/other");
		assert_eq!(dog.request_refresh(), RuntimeMessage::open_and_close("https://intranet.example/other"));
		assert_eq!(dog.request_refresh(), dog.request_refresh());
	}

	#[test]
	fn long_windows_format_minutes_past_an_hour() {
		assert_eq!(format_countdown(Duration::from_secs(3725)), "62:05");
	}
}
