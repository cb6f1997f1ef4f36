//! Browser host abstraction.
//!
//! A [`TabHost`] is the orchestrator's only view of the browser: tab and
//! window calls plus a broadcast stream of "tab updated" notifications.
//! Every call may fail because the target vanished; callers decide whether a
//! failure matters.

use async_trait::async_trait;
use keepalive_protocol::{CreateTab, RuntimeMessage, TabId, TabInfo, TabUpdate, WindowId};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::Result;

/// Tab and window operations consumed by the orchestrator and the background router.
#[async_trait]
pub trait TabHost: Send + Sync + 'static {
	/// Opens a tab. Fails when the host could not produce a usable tab.
	async fn create_tab(&self, params: CreateTab) -> Result<TabInfo>;

	/// Returns the current snapshot of `tab`.
	async fn get_tab(&self, tab: TabId) -> Result<TabInfo>;

	async fn close_tab(&self, tab: TabId) -> Result<()>;

	/// Makes `tab` the active tab of its window.
	async fn activate_tab(&self, tab: TabId) -> Result<()>;

	/// Activates whatever tab sits at `index` in `window`.
	async fn highlight_tab(&self, window: WindowId, index: u32) -> Result<()>;

	async fn focus_window(&self, window: WindowId) -> Result<()>;

	/// Delivers a runtime message to the page loaded in `tab`.
	async fn send_message(&self, tab: TabId, message: RuntimeMessage) -> Result<()>;

	/// Opens a receiver on the host's tab update stream.
	fn subscribe(&self) -> broadcast::Receiver<TabUpdate>;
}

/// Scoped view of the update stream, narrowed to a single tab.
///
/// Dropping the subscription unsubscribes.
pub struct TabSubscription {
	rx: broadcast::Receiver<TabUpdate>,
	tab: Option<TabId>,
}

impl TabSubscription {
	/// Subscribes before the watched tab is known, so no early update is lost.
	pub fn open<H: TabHost + ?Sized>(host: &H) -> Self {
		Self { rx: host.subscribe(), tab: None }
	}

	/// Narrows the subscription to `tab`. Updates already buffered for it are kept.
	pub fn watch(&mut self, tab: TabId) {
		self.tab = Some(tab);
	}

	/// Next update for the watched tab, or `None` once the host stream closes.
	///
	/// Updates for other tabs, and every update while no tab is watched, are skipped.
	pub async fn next(&mut self) -> Option<TabUpdate> {
		loop {
			match self.rx.recv().await {
				Ok(update) if Some(update.tab_id) == self.tab => return Some(update),
				Ok(_) => continue,
				Err(broadcast::error::RecvError::Lagged(skipped)) => {
					warn!(target = "keepalive.host", skipped, watched = ?self.tab, "tab update subscriber lagged");
				}
				Err(broadcast::error::RecvError::Closed) => return None,
			}
		}
	}
}

/// Logs and discards the failure of a best-effort host call.
///
/// Returns whether the call succeeded.
pub(crate) fn best_effort(op: &'static str, result: Result<()>) -> bool {
	match result {
		Ok(()) => true,
		Err(err) => {
			debug!(target = "keepalive.host", op, error = %err, "best-effort call failed");
			false
		}
	}
}
