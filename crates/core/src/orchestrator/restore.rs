//! Giving focus back to the origin tab once the sibling is closed.

use keepalive_protocol::RuntimeMessage;
use serde::Serialize;
use tracing::debug;

use super::RefreshRequest;
use crate::host::{TabHost, best_effort};

/// How the origin tab regained activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
	/// Reactivated by identifier.
	ById,
	/// Origin id was gone; the tab at its former position was highlighted.
	ByPosition,
	/// Both attempts failed.
	Unresolved,
	/// Restoration never ran (no sibling tab was created).
	Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Restoration {
	pub activation: Activation,
	pub window_focused: bool,
	pub notified: bool,
}

/// Reactivates the origin, refocuses its window and tells its page to reset.
///
/// Each step is independent; a failure never stops the next one.
pub(crate) async fn restore_origin<H: TabHost + ?Sized>(host: &H, request: &RefreshRequest) -> Restoration {
	let activation = reactivate(host, request).await;

	let window_focused = match request.origin_window {
		Some(window) => best_effort("focus_window", host.focus_window(window).await),
		None => false,
	};

	// The origin page may be gone by now.
	let notified = notify_reset(host, request).await;

	Restoration {
		activation,
		window_focused,
		notified,
	}
}

/// Activation by id, falling back once to the origin's former position.
async fn reactivate<H: TabHost + ?Sized>(host: &H, request: &RefreshRequest) -> Activation {
	let Err(err) = host.activate_tab(request.origin_tab).await else {
		return Activation::ById;
	};
	debug!(target = "keepalive.session", origin = %request.origin_tab, error = %err, "origin tab reactivation failed; trying position");

	let (Some(window), Some(index)) = (request.origin_window, request.origin_index) else {
		return Activation::Unresolved;
	};
	if best_effort("highlight_tab", host.highlight_tab(window, index).await) {
		Activation::ByPosition
	} else {
		Activation::Unresolved
	}
}

/// Sends `reset_from_bg` to the origin page. Failure is ignored.
pub(crate) async fn notify_reset<H: TabHost + ?Sized>(host: &H, request: &RefreshRequest) -> bool {
	best_effort("send_message", host.send_message(request.origin_tab, RuntimeMessage::ResetFromBg).await)
}
