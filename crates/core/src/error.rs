//! Error types for keep-alive orchestration.

use std::path::PathBuf;

use keepalive_protocol::{TabId, WindowId};
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KeepAliveError>;

/// Failures surfaced by a [`TabHost`](crate::host::TabHost) or by configuration loading.
///
/// Host failures are "resource unavailable" errors: the orchestrator catches
/// them locally and degrades to best effort. They never reach the page that
/// asked for the refresh.
#[derive(Debug, Error)]
pub enum KeepAliveError {
	#[error("{0} does not exist")]
	TabNotFound(TabId),

	#[error("{0} does not exist")]
	WindowNotFound(WindowId),

	#[error("no tab at index {index} in {window}")]
	NoTabAtPosition { window: WindowId, index: u32 },

	#[error("tab creation returned no usable tab: {0}")]
	CreateFailed(String),

	#[error("browser host is gone")]
	HostClosed,

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("failed to read config {path}: {source}")]
	ConfigRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse config {path}: {source}")]
	ConfigParse {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

impl KeepAliveError {
	/// Returns `true` when the error means the targeted tab or window is gone.
	pub fn is_resource_unavailable(&self) -> bool {
		matches!(
			self,
			Self::TabNotFound(_) | Self::WindowNotFound(_) | Self::NoTabAtPosition { .. } | Self::HostClosed
		)
	}
}

/// Why a refresh request was refused before any tab was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RequestError {
	#[error("refresh request has no origin tab")]
	MissingOriginTab,

	#[error("refresh request has no url")]
	MissingUrl,
}
