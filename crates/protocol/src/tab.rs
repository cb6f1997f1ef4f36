//! Tab and window shapes reported by a browser host.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Browser-assigned tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "tab#{}", self.0)
	}
}

/// Browser-assigned window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "window#{}", self.0)
	}
}

/// Loading status of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
	#[default]
	Loading,
	Complete,
}

/// Snapshot of a tab as the host reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
	pub id: TabId,
	pub window_id: WindowId,
	/// Zero-based position inside the window.
	pub index: u32,
	pub url: String,
	#[serde(default)]
	pub status: TabStatus,
}

/// Delta carried by a "tab updated" notification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabChange {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<TabStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

impl TabChange {
	/// Returns `true` when this delta reports the tab reaching "load complete".
	pub fn is_complete(&self) -> bool {
		self.status == Some(TabStatus::Complete)
	}
}

/// A single "tab updated" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabUpdate {
	pub tab_id: TabId,
	pub change: TabChange,
	/// Tab state after the change was applied.
	pub tab: TabInfo,
}

/// Parameters of a create-tab call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTab {
	pub url: String,
	pub active: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub index: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub window_id: Option<WindowId>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn tab_update_uses_browser_field_names() {
		let update: TabUpdate = serde_json::from_value(json!({
			"tabId": 12,
			"change": { "status": "complete" },
			"tab": { "id": 12, "windowId": 1, "index": 3, "url": "https://x", "status": "complete" }
		}))
		.unwrap();

		assert_eq!(update.tab_id, TabId(12));
		assert!(update.change.is_complete());
		assert_eq!(update.change.url, None);
		assert_eq!(update.tab.window_id, WindowId(1));
	}

	#[test]
	fn loading_change_is_not_complete() {
		let change = TabChange {
			status: Some(TabStatus::Loading),
			url: Some("https://x".into()),
		};
		assert!(!change.is_complete());
	}

	#[test]
	fn create_tab_omits_absent_index() {
		let value = serde_json::to_value(CreateTab {
			url: "https://x".into(),
			active: true,
			index: None,
			window_id: None,
		})
		.unwrap();
		assert_eq!(value, json!({ "url": "https://x", "active": true }));
	}
}
