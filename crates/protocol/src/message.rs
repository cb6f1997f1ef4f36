//! Runtime messages exchanged between pages and the background worker.

use serde::{Deserialize, Serialize};

use crate::tab::{TabId, TabInfo, WindowId};

/// A message on the page <-> background channel.
///
/// Serialized with an internal `type` tag:
/// ```json
/// { "type": "open_and_close_same_url", "url": "https://example.com/app" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeMessage {
	/// The user interacted with something actionable; keep the page alive.
	ActivityPing,
	/// Soft-refresh the sender's session through a sibling tab.
	OpenAndCloseSameUrl(OpenAndClose),
	/// Background -> page: restart the countdown.
	ResetFromBg,
}

impl RuntimeMessage {
	/// Builds the request a page sends for its own URL.
	pub fn open_and_close(url: impl Into<String>) -> Self {
		Self::OpenAndCloseSameUrl(OpenAndClose {
			url: Some(url.into()),
			..Default::default()
		})
	}

	/// Wire name of the message kind.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::ActivityPing => "activity_ping",
			Self::OpenAndCloseSameUrl(_) => "open_and_close_same_url",
			Self::ResetFromBg => "reset_from_bg",
		}
	}
}

/// Payload of `open_and_close_same_url`.
///
/// Pages normally send only `url`; the origin fields are filled from the
/// sender tab. Explicit values take precedence when present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAndClose {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub origin_tab_id: Option<TabId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub origin_window_id: Option<WindowId>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub origin_index: Option<u32>,
}

/// Describes who sent a runtime message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
	/// Sending tab; absent for messages from extension pages.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tab: Option<TabInfo>,
}

impl MessageSender {
	pub fn from_tab(tab: TabInfo) -> Self {
		Self { tab: Some(tab) }
	}
}
