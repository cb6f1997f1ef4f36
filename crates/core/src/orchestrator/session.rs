//! One refresh session: the state machine driving the sibling tab.

use std::time::Duration;

use keepalive_protocol::{CreateTab, TabId, TabUpdate};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use super::interstitial::InterstitialMatcher;
use super::restore::{self, Activation};
use super::state::{CompletionLatch, FinishTrigger, Phase};
use super::{Outcome, RefreshRequest, SessionReport};
use crate::config::OrchestratorConfig;
use crate::host::{TabHost, TabSubscription, best_effort};

pub(super) struct Session<'a, H: TabHost + ?Sized> {
	host: &'a H,
	config: &'a OrchestratorConfig,
	matcher: &'a InterstitialMatcher,
	request: RefreshRequest,
	phase: Phase,
	latch: CompletionLatch,
	started: Instant,
}

impl<'a, H: TabHost + ?Sized> Session<'a, H> {
	pub(super) fn new(host: &'a H, config: &'a OrchestratorConfig, matcher: &'a InterstitialMatcher, request: RefreshRequest) -> Self {
		Self {
			host,
			config,
			matcher,
			request,
			phase: Phase::Creating,
			latch: CompletionLatch::new(),
			started: Instant::now(),
		}
	}

	pub(super) async fn run(mut self) -> SessionReport {
		info!(target = "keepalive.session", origin = %self.request.origin_tab, url = %self.request.url, "refresh session started");

		let mut updates = TabSubscription::open(self.host);
		let created = self
			.host
			.create_tab(CreateTab {
				url: self.request.url.clone(),
				active: true,
				index: Some(self.request.sibling_index()),
				window_id: self.request.origin_window,
			})
			.await;

		let tab = match created {
			Ok(tab) => tab,
			Err(err) => {
				warn!(target = "keepalive.session", origin = %self.request.origin_tab, error = %err, "sibling tab creation failed");
				drop(updates);
				let notified = restore::notify_reset(self.host, &self.request).await;
				self.advance(Phase::Done);
				return SessionReport {
					origin_tab: self.request.origin_tab,
					new_tab: None,
					outcome: Outcome::CreateFailed,
					closed: false,
					activation: Activation::Skipped,
					window_focused: false,
					notified,
					elapsed_ms: self.elapsed_ms(),
				};
			}
		};
		updates.watch(tab.id);

		// Tabs created in the background can leave the window defocused on some
		// platforms; bring it forward explicitly.
		best_effort("focus_window", self.host.focus_window(tab.window_id).await);

		self.advance(Phase::Loading);
		let trigger = self.await_completion(tab.id, &mut updates).await;

		self.advance(Phase::Closing);
		let closed = best_effort("close_tab", self.host.close_tab(tab.id).await);

		self.advance(Phase::Restoring);
		// Shorter than the browser's own neighbour activation, so ours lands last.
		sleep(self.config.restore_delay()).await;
		let restored = restore::restore_origin(self.host, &self.request).await;

		drop(updates);
		self.advance(Phase::Done);

		let report = SessionReport {
			origin_tab: self.request.origin_tab,
			new_tab: Some(tab.id),
			outcome: trigger.into(),
			closed,
			activation: restored.activation,
			window_focused: restored.window_focused,
			notified: restored.notified,
			elapsed_ms: self.elapsed_ms(),
		};
		info!(
			target = "keepalive.session",
			origin = %report.origin_tab,
			outcome = ?report.outcome,
			activation = ?report.activation,
			elapsed_ms = report.elapsed_ms,
			"refresh session finished"
		);
		report
	}

	/// Multiplexes update events, the login poll, the safety timer and the
	/// completion deadline until the deadline passes.
	async fn await_completion(&mut self, tab: TabId, updates: &mut TabSubscription) -> FinishTrigger {
		let safety = sleep_until(self.started + self.config.safety_timeout());
		tokio::pin!(safety);
		let mut safety_armed = true;
		let mut stream_open = true;
		let mut next_poll: Option<Instant> = None;

		loop {
			if self.latch.is_scheduled() {
				next_poll = None;
			}
			let finish_at = self.latch.deadline();

			tokio::select! {
				biased;

				_ = sleep_until_opt(finish_at) => break,

				_ = &mut safety, if safety_armed => {
					safety_armed = false;
					if self.latch.schedule(FinishTrigger::SafetyTimeout, Duration::ZERO, Instant::now()) {
						warn!(target = "keepalive.session", %tab, phase = %self.phase, "safety timeout reached; forcing completion");
					}
				}

				_ = sleep_until_opt(next_poll) => {
					next_poll = self.poll_interstitial(tab).await;
				}

				update = updates.next(), if stream_open && !self.latch.is_scheduled() => match update {
					Some(update) => {
						if let Some(poll_at) = self.on_update(&update) {
							next_poll = Some(poll_at);
						}
					}
					None => {
						stream_open = false;
						warn!(target = "keepalive.session", %tab, "tab update stream closed");
						self.latch.schedule(FinishTrigger::TabLost, Duration::ZERO, Instant::now());
					}
				},
			}
		}

		self.latch.trigger().unwrap_or(FinishTrigger::SafetyTimeout)
	}

	/// Applies one update of the sibling tab. Returns the first poll time when
	/// the tab just landed on the interstitial.
	fn on_update(&mut self, update: &TabUpdate) -> Option<Instant> {
		let now = Instant::now();

		if let Some(url) = update.change.url.as_deref() {
			if self.phase == Phase::LoginWait && !self.matcher.matches(url) {
				self.leave_login(now);
			}
		}

		if !update.change.is_complete() {
			return None;
		}

		if self.matcher.matches(&update.tab.url) {
			if self.phase != Phase::LoginWait {
				debug!(target = "keepalive.session", tab = %update.tab_id, url = %update.tab.url, "authentication interstitial detected");
				self.advance(Phase::LoginWait);
				return Some(now + self.config.login_poll_interval());
			}
		} else if self.phase != Phase::LoginWait {
			self.schedule(FinishTrigger::Loaded, self.config.settle_delay(), now);
		}
		None
	}

	/// Re-checks the interstitial. Returns the next poll time while still on it.
	async fn poll_interstitial(&mut self, tab: TabId) -> Option<Instant> {
		if self.latch.is_scheduled() || self.phase != Phase::LoginWait {
			return None;
		}

		// A tab that can no longer be queried is not on the interstitial.
		let on_login = match self.host.get_tab(tab).await {
			Ok(info) => self.matcher.matches(&info.url),
			Err(err) => {
				debug!(target = "keepalive.session", %tab, error = %err, "interstitial poll could not query tab");
				false
			}
		};

		let now = Instant::now();
		if on_login {
			Some(now + self.config.login_poll_interval())
		} else {
			self.leave_login(now);
			None
		}
	}

	fn leave_login(&mut self, now: Instant) {
		debug!(target = "keepalive.session", origin = %self.request.origin_tab, "left authentication interstitial");
		self.advance(Phase::Loading);
		self.schedule(FinishTrigger::LoginResolved, self.config.login_settle_delay(), now);
	}

	fn schedule(&mut self, trigger: FinishTrigger, delay: Duration, now: Instant) {
		if self.latch.schedule(trigger, delay, now) {
			debug!(target = "keepalive.session", origin = %self.request.origin_tab, ?trigger, delay_ms = millis(delay), "completion scheduled");
		}
	}

	fn advance(&mut self, next: Phase) {
		if self.phase != next {
			debug!(target = "keepalive.session", origin = %self.request.origin_tab, from = %self.phase, to = %next, "phase transition");
			self.phase = next;
		}
	}

	fn elapsed_ms(&self) -> u64 {
		millis(self.started.elapsed())
	}
}

fn millis(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

async fn sleep_until_opt(deadline: Option<Instant>) {
	match deadline {
		Some(at) => sleep_until(at).await,
		None => std::future::pending().await,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn millis_saturates_instead_of_wrapping() {
		assert_eq!(millis(Duration::from_millis(1500)), 1500);
		assert_eq!(millis(Duration::MAX), u64::MAX);
	}
}
