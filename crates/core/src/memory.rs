//! In-memory browser host.
//!
//! Provides a scriptable [`TabHost`] for exercising the orchestrator without a
//! browser: tabs live in per-window ordered lists, newly created tabs replay a
//! [`LoadPlan`] on the tokio clock, and every host call is recorded.
//!
//! # Example
//!
//! ```ignore
//! let browser = InMemoryBrowser::new();
//! browser.add_tab(TabId(7), WindowId(1), "https://x");
//! browser.set_load_plan(LoadPlan::complete_immediately());
//!
//! let report = Orchestrator::new(Arc::new(browser.clone()), config).run(request).await;
//! assert!(browser.calls().iter().any(|c| matches!(c.call, HostCall::Close { .. })));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keepalive_protocol::{CreateTab, RuntimeMessage, TabChange, TabId, TabInfo, TabStatus, TabUpdate, WindowId};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::trace;

use crate::error::{KeepAliveError, Result};
use crate::host::TabHost;

const UPDATE_CHANNEL_CAPACITY: usize = 256;
const FIRST_CREATED_TAB_ID: u32 = 1000;

/// One scripted step a created tab goes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStep {
	/// Delay after the previous step.
	pub after: Duration,
	pub action: LoadAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadAction {
	/// Navigate to `url`: status goes back to loading, an update with the new URL is emitted.
	Navigate(String),
	/// Status reaches "complete".
	Complete,
	/// Change the URL without emitting any update (only visible to `get_tab`).
	QuietRedirect(String),
}

/// Script replayed by every tab the host creates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPlan {
	pub steps: Vec<LoadStep>,
}

impl LoadPlan {
	/// A tab that never reports anything after creation.
	pub fn never() -> Self {
		Self::default()
	}

	/// Completes right away at the requested URL.
	pub fn complete_immediately() -> Self {
		Self::default().then(Duration::ZERO, LoadAction::Complete)
	}

	/// Lands on `login_url`, stays there for `login_for`, then navigates to `final_url`.
	pub fn via_login(login_url: &str, login_for: Duration, final_url: &str) -> Self {
		Self::default()
			.then(Duration::ZERO, LoadAction::Navigate(login_url.to_string()))
			.then(Duration::ZERO, LoadAction::Complete)
			.then(login_for, LoadAction::Navigate(final_url.to_string()))
			.then(Duration::ZERO, LoadAction::Complete)
	}

	/// Lands on `login_url`; after `login_for` the URL changes without any update event.
	pub fn via_silent_login(login_url: &str, login_for: Duration, final_url: &str) -> Self {
		Self::default()
			.then(Duration::ZERO, LoadAction::Navigate(login_url.to_string()))
			.then(Duration::ZERO, LoadAction::Complete)
			.then(login_for, LoadAction::QuietRedirect(final_url.to_string()))
	}

	pub fn then(mut self, after: Duration, action: LoadAction) -> Self {
		self.steps.push(LoadStep { after, action });
		self
	}
}

/// A host call as observed by the in-memory browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostCall {
	Create { url: String, active: bool, index: Option<u32>, created: Option<TabId> },
	Get { tab: TabId },
	Close { tab: TabId },
	Activate { tab: TabId },
	Highlight { window: WindowId, index: u32 },
	FocusWindow { window: WindowId },
	SendMessage { tab: TabId, message: RuntimeMessage },
}

/// Recorded call plus its outcome and time.
#[derive(Debug, Clone)]
pub struct RecordedCall {
	pub call: HostCall,
	pub ok: bool,
	pub at: Instant,
}

#[derive(Debug, Clone)]
struct TabState {
	window: WindowId,
	url: String,
	status: TabStatus,
}

#[derive(Default)]
struct BrowserState {
	tabs: HashMap<TabId, TabState>,
	/// Ordered tab lists; position is the tab index.
	windows: Vec<(WindowId, Vec<TabId>)>,
	active: HashMap<WindowId, TabId>,
	focused: Option<WindowId>,
	next_id: u32,
	load_plan: LoadPlan,
	fail_create: bool,
	calls: Vec<RecordedCall>,
}

impl BrowserState {
	fn window_tabs(&self, window: WindowId) -> Option<&Vec<TabId>> {
		self.windows.iter().find(|(id, _)| *id == window).map(|(_, tabs)| tabs)
	}

	fn window_tabs_mut(&mut self, window: WindowId) -> Option<&mut Vec<TabId>> {
		self.windows.iter_mut().find(|(id, _)| *id == window).map(|(_, tabs)| tabs)
	}

	fn snapshot(&self, id: TabId) -> Option<TabInfo> {
		let tab = self.tabs.get(&id)?;
		let index = self.window_tabs(tab.window)?.iter().position(|t| *t == id)?;
		Some(TabInfo {
			id,
			window_id: tab.window,
			index: index as u32,
			url: tab.url.clone(),
			status: tab.status,
		})
	}

	fn record(&mut self, call: HostCall, ok: bool) {
		trace!(target = "keepalive.host", ?call, ok, "in-memory host call");
		self.calls.push(RecordedCall { call, ok, at: Instant::now() });
	}

	fn remove_tab(&mut self, id: TabId) -> bool {
		let Some(tab) = self.tabs.remove(&id) else {
			return false;
		};
		let Some(tabs) = self.window_tabs_mut(tab.window) else {
			return true;
		};
		let Some(pos) = tabs.iter().position(|t| *t == id) else {
			return true;
		};
		tabs.remove(pos);
		// Mimic the browser picking a neighbour when the active tab goes away.
		let neighbour = tabs.get(pos.saturating_sub(1)).or_else(|| tabs.first()).copied();
		if self.active.get(&tab.window) == Some(&id) {
			match neighbour {
				Some(next) => self.active.insert(tab.window, next),
				None => self.active.remove(&tab.window),
			};
		}
		true
	}
}

struct Inner {
	state: Mutex<BrowserState>,
	updates: broadcast::Sender<TabUpdate>,
}

impl Inner {
	fn emit(&self, id: TabId, change: TabChange) {
		let Some(tab) = self.state.lock().snapshot(id) else {
			return;
		};
		// No subscribers is not an error for a browser.
		let _ = self.updates.send(TabUpdate { tab_id: id, change, tab });
	}
}

/// Scriptable in-memory [`TabHost`].
#[derive(Clone)]
pub struct InMemoryBrowser {
	inner: Arc<Inner>,
}

impl Default for InMemoryBrowser {
	fn default() -> Self {
		Self::new()
	}
}

impl InMemoryBrowser {
	pub fn new() -> Self {
		let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
		Self {
			inner: Arc::new(Inner {
				state: Mutex::new(BrowserState {
					next_id: FIRST_CREATED_TAB_ID,
					..Default::default()
				}),
				updates,
			}),
		}
	}

	/// Appends an existing tab at the end of `window`, creating the window if needed.
	///
	/// The first window becomes the focused one and every window's first tab its active tab.
	pub fn add_tab(&self, id: TabId, window: WindowId, url: &str) {
		let mut state = self.inner.state.lock();
		state.tabs.insert(
			id,
			TabState {
				window,
				url: url.to_string(),
				status: TabStatus::Complete,
			},
		);
		match state.window_tabs_mut(window) {
			Some(tabs) => tabs.push(id),
			None => state.windows.push((window, vec![id])),
		}
		state.active.entry(window).or_insert(id);
		state.focused.get_or_insert(window);
	}

	pub fn set_load_plan(&self, plan: LoadPlan) {
		self.inner.state.lock().load_plan = plan;
	}

	/// Makes every subsequent `create_tab` fail.
	pub fn fail_creates(&self, fail: bool) {
		self.inner.state.lock().fail_create = fail;
	}

	/// Closes a tab as if the user did it. Not recorded as a host call.
	pub fn close_externally(&self, id: TabId) -> bool {
		self.inner.state.lock().remove_tab(id)
	}

	/// Forces the active tab of `window`, as the user clicking another tab would.
	pub fn set_active(&self, window: WindowId, id: TabId) {
		self.inner.state.lock().active.insert(window, id);
	}

	pub fn tab(&self, id: TabId) -> Option<TabInfo> {
		self.inner.state.lock().snapshot(id)
	}

	pub fn active_tab(&self, window: WindowId) -> Option<TabId> {
		self.inner.state.lock().active.get(&window).copied()
	}

	pub fn focused_window(&self) -> Option<WindowId> {
		self.inner.state.lock().focused
	}

	pub fn tab_ids(&self, window: WindowId) -> Vec<TabId> {
		self.inner.state.lock().window_tabs(window).cloned().unwrap_or_default()
	}

	pub fn calls(&self) -> Vec<RecordedCall> {
		self.inner.state.lock().calls.clone()
	}

	/// Takes all recorded calls, clearing the log.
	pub fn take_calls(&self) -> Vec<RecordedCall> {
		std::mem::take(&mut self.inner.state.lock().calls)
	}

	/// Messages successfully delivered to `tab`.
	pub fn messages_to(&self, tab: TabId) -> Vec<RuntimeMessage> {
		self.inner
			.state
			.lock()
			.calls
			.iter()
			.filter(|c| c.ok)
			.filter_map(|c| match &c.call {
				HostCall::SendMessage { tab: to, message } if *to == tab => Some(message.clone()),
				_ => None,
			})
			.collect()
	}

	/// Number of live update subscribers.
	pub fn subscriber_count(&self) -> usize {
		self.inner.updates.receiver_count()
	}

	/// Emits an update for `id` from the current tab state.
	pub fn emit(&self, id: TabId, change: TabChange) {
		self.inner.emit(id, change);
	}

	fn play(&self, id: TabId, plan: LoadPlan) {
		if plan.steps.is_empty() {
			return;
		}
		let inner = Arc::clone(&self.inner);
		tokio::spawn(async move {
			for step in plan.steps {
				if !step.after.is_zero() {
					tokio::time::sleep(step.after).await;
				}
				let change = {
					let mut state = inner.state.lock();
					let Some(tab) = state.tabs.get_mut(&id) else {
						return;
					};
					match step.action {
						LoadAction::Navigate(url) => {
							tab.url = url.clone();
							tab.status = TabStatus::Loading;
							Some(TabChange {
								status: Some(TabStatus::Loading),
								url: Some(url),
							})
						}
						LoadAction::Complete => {
							tab.status = TabStatus::Complete;
							Some(TabChange {
								status: Some(TabStatus::Complete),
								url: None,
							})
						}
						LoadAction::QuietRedirect(url) => {
							tab.url = url;
							tab.status = TabStatus::Complete;
							None
						}
					}
				};
				if let Some(change) = change {
					inner.emit(id, change);
				}
			}
		});
	}
}

#[async_trait]
impl TabHost for InMemoryBrowser {
	async fn create_tab(&self, params: CreateTab) -> Result<TabInfo> {
		let (created, plan) = {
			let mut state = self.inner.state.lock();
			let window = params
				.window_id
				.or(state.focused)
				.or_else(|| state.windows.first().map(|(id, _)| *id));
			let created = match window {
				Some(window) if !state.fail_create && state.window_tabs(window).is_some() => {
					let id = TabId(state.next_id);
					state.next_id += 1;
					state.tabs.insert(
						id,
						TabState {
							window,
							url: params.url.clone(),
							status: TabStatus::Loading,
						},
					);
					if let Some(tabs) = state.window_tabs_mut(window) {
						let at = params.index.map_or(tabs.len(), |i| (i as usize).min(tabs.len()));
						tabs.insert(at, id);
					}
					if params.active {
						state.active.insert(window, id);
					}
					Some(id)
				}
				_ => None,
			};
			state.record(
				HostCall::Create {
					url: params.url.clone(),
					active: params.active,
					index: params.index,
					created,
				},
				created.is_some(),
			);
			(created, state.load_plan.clone())
		};

		let Some(id) = created else {
			return Err(KeepAliveError::CreateFailed("in-memory browser refused the tab".into()));
		};
		self.emit(
			id,
			TabChange {
				status: Some(TabStatus::Loading),
				url: None,
			},
		);
		self.play(id, plan);
		self.tab(id).ok_or(KeepAliveError::TabNotFound(id))
	}

	async fn get_tab(&self, tab: TabId) -> Result<TabInfo> {
		let mut state = self.inner.state.lock();
		let snapshot = state.snapshot(tab);
		state.record(HostCall::Get { tab }, snapshot.is_some());
		snapshot.ok_or(KeepAliveError::TabNotFound(tab))
	}

	async fn close_tab(&self, tab: TabId) -> Result<()> {
		let mut state = self.inner.state.lock();
		let removed = state.remove_tab(tab);
		state.record(HostCall::Close { tab }, removed);
		if removed { Ok(()) } else { Err(KeepAliveError::TabNotFound(tab)) }
	}

	async fn activate_tab(&self, tab: TabId) -> Result<()> {
		let mut state = self.inner.state.lock();
		let window = state.tabs.get(&tab).map(|t| t.window);
		state.record(HostCall::Activate { tab }, window.is_some());
		let window = window.ok_or(KeepAliveError::TabNotFound(tab))?;
		state.active.insert(window, tab);
		Ok(())
	}

	async fn highlight_tab(&self, window: WindowId, index: u32) -> Result<()> {
		let mut state = self.inner.state.lock();
		let target = state.window_tabs(window).and_then(|tabs| tabs.get(index as usize)).copied();
		state.record(HostCall::Highlight { window, index }, target.is_some());
		let target = target.ok_or(KeepAliveError::NoTabAtPosition { window, index })?;
		state.active.insert(window, target);
		Ok(())
	}

	async fn focus_window(&self, window: WindowId) -> Result<()> {
		let mut state = self.inner.state.lock();
		let exists = state.window_tabs(window).is_some();
		state.record(HostCall::FocusWindow { window }, exists);
		if !exists {
			return Err(KeepAliveError::WindowNotFound(window));
		}
		state.focused = Some(window);
		Ok(())
	}

	async fn send_message(&self, tab: TabId, message: RuntimeMessage) -> Result<()> {
		let mut state = self.inner.state.lock();
		let exists = state.tabs.contains_key(&tab);
		state.record(HostCall::SendMessage { tab, message }, exists);
		if exists { Ok(()) } else { Err(KeepAliveError::TabNotFound(tab)) }
	}

	fn subscribe(&self) -> broadcast::Receiver<TabUpdate> {
		self.inner.updates.subscribe()
	}
}
