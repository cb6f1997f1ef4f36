//! Background message routing.
//!
//! The background worker receives runtime messages from every frame. Activity
//! pings are answered straight away with `reset_from_bg`; refresh requests
//! become orchestrator sessions, at most one per origin tab.

use std::collections::HashSet;
use std::sync::Arc;

use keepalive_protocol::{MessageSender, RuntimeMessage, TabId};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::OrchestratorConfig;
use crate::error::RequestError;
use crate::host::{TabHost, best_effort};
use crate::orchestrator::{Orchestrator, RefreshRequest, SessionReport};

/// What a message asks the background to do, before any host call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
	/// Answer the sending tab with `reset_from_bg`.
	Ping { tab: TabId },
	Refresh { request: RefreshRequest },
	/// Malformed refresh request; `notify` is the origin to reset, when known.
	Reject {
		#[serde(serialize_with = "serialize_display")]
		error: RequestError,
		notify: Option<TabId>,
	},
	Ignore { reason: &'static str },
}

fn serialize_display<S: serde::Serializer>(value: &RequestError, serializer: S) -> Result<S::Ok, S::Error> {
	serializer.collect_str(value)
}

/// Classifies a message from `sender`.
pub fn classify(message: &RuntimeMessage, sender: &MessageSender) -> Route {
	match message {
		RuntimeMessage::ActivityPing => match sender.tab.as_ref() {
			Some(tab) => Route::Ping { tab: tab.id },
			None => Route::Ignore {
				reason: "activity ping without sender tab",
			},
		},
		RuntimeMessage::OpenAndCloseSameUrl(payload) => match RefreshRequest::from_message(payload, sender) {
			Ok(request) => Route::Refresh { request },
			Err(error) => Route::Reject {
				error,
				notify: payload.origin_tab_id.or(sender.tab.as_ref().map(|t| t.id)),
			},
		},
		RuntimeMessage::ResetFromBg => Route::Ignore {
			reason: "reset_from_bg is page-bound",
		},
	}
}

/// Outcome of handing one message to the background.
#[derive(Debug)]
pub enum Dispatch {
	Pinged { tab: TabId, delivered: bool },
	Started { origin: TabId, session: JoinHandle<SessionReport> },
	Rejected { error: RequestError, notified: bool },
	/// A session for this origin is already running.
	Busy { origin: TabId },
	Ignored { reason: &'static str },
}

/// Releases an origin's in-flight slot when the session task ends, however it ends.
struct InFlightGuard {
	origins: Arc<Mutex<HashSet<TabId>>>,
	origin: TabId,
}

impl Drop for InFlightGuard {
	fn drop(&mut self) {
		self.origins.lock().remove(&self.origin);
	}
}

/// Message router owning the orchestrator.
pub struct Background<H: TabHost> {
	orchestrator: Orchestrator<H>,
	in_flight: Arc<Mutex<HashSet<TabId>>>,
}

impl<H: TabHost> Background<H> {
	pub fn new(host: Arc<H>, config: OrchestratorConfig) -> Self {
		Self {
			orchestrator: Orchestrator::new(host, config),
			in_flight: Arc::new(Mutex::new(HashSet::new())),
		}
	}

	pub fn orchestrator(&self) -> &Orchestrator<H> {
		&self.orchestrator
	}

	/// Whether a refresh for `origin` is currently running.
	pub fn is_refreshing(&self, origin: TabId) -> bool {
		self.in_flight.lock().contains(&origin)
	}

	pub async fn handle(&self, message: RuntimeMessage, sender: &MessageSender) -> Dispatch {
		let host = self.orchestrator.host();
		match classify(&message, sender) {
			Route::Ping { tab } => {
				let delivered = best_effort("send_message", host.send_message(tab, RuntimeMessage::ResetFromBg).await);
				debug!(target = "keepalive.background", %tab, delivered, "activity ping answered");
				Dispatch::Pinged { tab, delivered }
			}
			Route::Refresh { request } => self.start(request),
			Route::Reject { error, notify } => {
				debug!(target = "keepalive.background", %error, "refresh request rejected");
				let notified = match notify {
					Some(tab) => best_effort("send_message", host.send_message(tab, RuntimeMessage::ResetFromBg).await),
					None => false,
				};
				Dispatch::Rejected { error, notified }
			}
			Route::Ignore { reason } => {
				debug!(target = "keepalive.background", kind = message.kind(), reason, "message ignored");
				Dispatch::Ignored { reason }
			}
		}
	}

	fn start(&self, request: RefreshRequest) -> Dispatch {
		let origin = request.origin_tab;
		if !self.in_flight.lock().insert(origin) {
			info!(target = "keepalive.background", %origin, "refresh already in flight; request dropped");
			return Dispatch::Busy { origin };
		}

		let guard = InFlightGuard {
			origins: Arc::clone(&self.in_flight),
			origin,
		};
		let orchestrator = self.orchestrator.clone();
		let session = tokio::spawn(async move {
			let _guard = guard;
			orchestrator.run(request).await
		});
		Dispatch::Started { origin, session }
	}
}
