//! Tab lifecycle orchestration.
//!
//! A refresh session opens a sibling tab at the origin's URL, waits for it to
//! load (sitting out an authentication interstitial if one shows up), closes
//! it and hands activation back to the origin tab.
//!
//! # Session flow
//!
//! 1. Subscribe to tab updates, then create the sibling tab next to the origin
//! 2. Wait for "load complete"; a login page switches to polling
//! 3. The first trigger (load, login resolved, safety timeout, lost tab) arms completion
//! 4. Close the sibling tab
//! 5. Reactivate the origin, refocus its window, send `reset_from_bg`
//!
//! Host failures never propagate out of a session. They are logged and the
//! session moves on to the next step.

mod interstitial;
mod restore;
mod session;
mod state;

use std::sync::Arc;

use keepalive_protocol::{MessageSender, OpenAndClose, TabId, WindowId};
use serde::Serialize;
use tokio::task::JoinHandle;

pub use interstitial::InterstitialMatcher;
pub use restore::Activation;
pub use state::{CompletionLatch, FinishTrigger, Phase, Scheduled};

use crate::config::OrchestratorConfig;
use crate::error::RequestError;
use crate::host::TabHost;

/// A validated request to soft-refresh one origin tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
	pub origin_tab: TabId,
	pub origin_window: Option<WindowId>,
	/// Zero-based position of the origin tab in its window.
	pub origin_index: Option<u32>,
	pub url: String,
}

impl RefreshRequest {
	/// Builds a request from an `open_and_close_same_url` payload and its sender.
	///
	/// Explicit payload fields win; the sender tab fills the gaps. An empty URL
	/// counts as missing.
	pub fn from_message(payload: &OpenAndClose, sender: &MessageSender) -> Result<Self, RequestError> {
		let tab = sender.tab.as_ref();
		let origin_tab = payload.origin_tab_id.or(tab.map(|t| t.id)).ok_or(RequestError::MissingOriginTab)?;
		let url = payload
			.url
			.as_deref()
			.filter(|u| !u.trim().is_empty())
			.or(tab.map(|t| t.url.as_str()).filter(|u| !u.trim().is_empty()))
			.ok_or(RequestError::MissingUrl)?;

		Ok(Self {
			origin_tab,
			origin_window: payload.origin_window_id.or(tab.map(|t| t.window_id)),
			origin_index: payload.origin_index.or(tab.map(|t| t.index)),
			url: url.to_string(),
		})
	}

	/// Position the sibling tab is created at: right after the origin, or at
	/// index 1 when the origin's position is unknown.
	pub fn sibling_index(&self) -> u32 {
		self.origin_index.unwrap_or(0).saturating_add(1)
	}
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
	Loaded,
	AfterLogin,
	SafetyTimeout,
	TabLost,
	/// No sibling tab could be created; only the origin was notified.
	CreateFailed,
}

impl From<FinishTrigger> for Outcome {
	fn from(trigger: FinishTrigger) -> Self {
		match trigger {
			FinishTrigger::Loaded => Self::Loaded,
			FinishTrigger::LoginResolved => Self::AfterLogin,
			FinishTrigger::SafetyTimeout => Self::SafetyTimeout,
			FinishTrigger::TabLost => Self::TabLost,
		}
	}
}

/// What a finished session did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
	pub origin_tab: TabId,
	pub new_tab: Option<TabId>,
	pub outcome: Outcome,
	/// Whether the sibling tab close call succeeded.
	pub closed: bool,
	pub activation: Activation,
	pub window_focused: bool,
	/// Whether `reset_from_bg` reached the origin page.
	pub notified: bool,
	pub elapsed_ms: u64,
}

/// Runs refresh sessions against a [`TabHost`].
pub struct Orchestrator<H: TabHost> {
	host: Arc<H>,
	config: Arc<OrchestratorConfig>,
	matcher: InterstitialMatcher,
}

impl<H: TabHost> Clone for Orchestrator<H> {
	fn clone(&self) -> Self {
		Self {
			host: Arc::clone(&self.host),
			config: Arc::clone(&self.config),
			matcher: self.matcher.clone(),
		}
	}
}

impl<H: TabHost> Orchestrator<H> {
	pub fn new(host: Arc<H>, config: OrchestratorConfig) -> Self {
		let matcher = InterstitialMatcher::new(&config.interstitial_hosts);
		Self {
			host,
			config: Arc::new(config),
			matcher,
		}
	}

	pub fn host(&self) -> &Arc<H> {
		&self.host
	}

	pub fn config(&self) -> &OrchestratorConfig {
		&self.config
	}

	/// Drives one session to completion.
	pub async fn run(&self, request: RefreshRequest) -> SessionReport {
		session::Session::new(self.host.as_ref(), &self.config, &self.matcher, request).run().await
	}

	/// Runs a session on its own task.
	pub fn spawn(&self, request: RefreshRequest) -> JoinHandle<SessionReport> {
		let this = self.clone();
		tokio::spawn(async move { this.run(request).await })
	}
}
