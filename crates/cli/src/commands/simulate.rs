//! `keepalive simulate`: scripted refresh sessions on the in-memory browser.
//!
//! Window 1 holds four tabs; tab 7 at index 2 is the page being kept alive.
//! Sessions run on the real clock, so `never-loads` takes the full safety
//! timeout unless `--safety-timeout-ms` shortens it.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use colored::Colorize;
use keepalive::protocol::{MessageSender, RuntimeMessage, TabId, WindowId};
use keepalive::{Background, Dispatch, HostCall, InMemoryBrowser, KeepAliveConfig, KeepAliveError, LoadPlan, SessionReport};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::info;

use crate::cli::Scenario;
use crate::error::Result;
use crate::output::{RenderText, wire_name};

const WINDOW: WindowId = WindowId(1);
const ORIGIN: TabId = TabId(7);
const LOGIN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";

/// Delay before the user closes the origin in `origin-closed`.
const ORIGIN_CLOSE_AFTER: Duration = Duration::from_millis(200);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationData {
	pub scenario: String,
	pub url: String,
	pub dispatches: Vec<DispatchSummary>,
	pub reports: Vec<SessionReport>,
	pub calls: Vec<CallEntry>,
	/// Active tab of the window once every session has ended.
	pub active_tab: Option<TabId>,
	pub tabs: Vec<TabId>,
}

/// Serializable view of a [`Dispatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "dispatch", rename_all = "snake_case")]
pub enum DispatchSummary {
	Pinged { tab: TabId, delivered: bool },
	Started { origin: TabId },
	Rejected { error: String, notified: bool },
	Busy { origin: TabId },
	Ignored { reason: &'static str },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEntry {
	pub at_ms: u64,
	pub ok: bool,
	pub call: HostCall,
}

fn describe_call(call: &HostCall) -> String {
	match call {
		HostCall::Create { url, index, created, .. } => {
			let at = index.map(|i| format!(" at index {i}")).unwrap_or_default();
			match created {
				Some(tab) => format!("create_tab {url}{at} -> {tab}"),
				None => format!("create_tab {url}{at}"),
			}
		}
		HostCall::Get { tab } => format!("get_tab {tab}"),
		HostCall::Close { tab } => format!("close_tab {tab}"),
		HostCall::Activate { tab } => format!("activate_tab {tab}"),
		HostCall::Highlight { window, index } => format!("highlight_tab {window} index {index}"),
		HostCall::FocusWindow { window } => format!("focus_window {window}"),
		HostCall::SendMessage { tab, message } => format!("send_message {tab} {}", message.kind()),
	}
}

impl RenderText for SimulationData {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{} {}", self.scenario.bold(), self.url)?;
		for dispatch in &self.dispatches {
			match dispatch {
				DispatchSummary::Started { origin } => writeln!(out, "  request from {origin}: session started")?,
				DispatchSummary::Busy { origin } => writeln!(out, "  request from {origin}: {}", "busy, dropped".yellow())?,
				DispatchSummary::Pinged { tab, delivered } => writeln!(out, "  ping from {tab}: delivered={delivered}")?,
				DispatchSummary::Rejected { error, notified } => writeln!(out, "  request rejected: {error} (notified={notified})")?,
				DispatchSummary::Ignored { reason } => writeln!(out, "  message ignored: {reason}")?,
			}
		}
		for entry in &self.calls {
			let status = if entry.ok { "ok".green() } else { "failed".red() };
			writeln!(out, "  {:>7}ms  {:<48} {status}", entry.at_ms, describe_call(&entry.call))?;
		}
		for report in &self.reports {
			writeln!(
				out,
				"  {} {}: {}, origin {}, notified={}, {}ms",
				"session".bold(),
				report.origin_tab,
				wire_name(&report.outcome),
				wire_name(&report.activation),
				report.notified,
				report.elapsed_ms
			)?;
		}
		match self.active_tab {
			Some(tab) => writeln!(out, "  active tab afterwards: {tab}"),
			None => writeln!(out, "  no active tab afterwards"),
		}
	}
}

fn plan_for(scenario: Scenario, url: &str) -> LoadPlan {
	match scenario {
		Scenario::Login => LoadPlan::via_login(LOGIN_URL, Duration::from_secs(3), url),
		Scenario::LoginPoll => LoadPlan::via_silent_login(LOGIN_URL, Duration::from_millis(2500), url),
		Scenario::NeverLoads => LoadPlan::never(),
		Scenario::Instant | Scenario::OriginClosed | Scenario::CreateFails | Scenario::DoubleRequest => LoadPlan::complete_immediately(),
	}
}

fn browser_for(scenario: Scenario, url: &str) -> InMemoryBrowser {
	let browser = InMemoryBrowser::new();
	browser.add_tab(TabId(5), WINDOW, "https://mail.example.com");
	browser.add_tab(TabId(6), WINDOW, "https://docs.example.com");
	browser.add_tab(ORIGIN, WINDOW, url);
	browser.add_tab(TabId(8), WINDOW, "https://chat.example.com");
	browser.set_active(WINDOW, ORIGIN);
	browser.set_load_plan(plan_for(scenario, url));
	browser.fail_creates(scenario == Scenario::CreateFails);
	browser
}

fn summarize(dispatch: Dispatch, sessions: &mut Vec<JoinHandle<SessionReport>>) -> DispatchSummary {
	match dispatch {
		Dispatch::Pinged { tab, delivered } => DispatchSummary::Pinged { tab, delivered },
		Dispatch::Started { origin, session } => {
			sessions.push(session);
			DispatchSummary::Started { origin }
		}
		Dispatch::Rejected { error, notified } => DispatchSummary::Rejected {
			error: error.to_string(),
			notified,
		},
		Dispatch::Busy { origin } => DispatchSummary::Busy { origin },
		Dispatch::Ignored { reason } => DispatchSummary::Ignored { reason },
	}
}

pub async fn execute(scenario: Scenario, url: &str, safety_timeout_ms: Option<u64>, config: &KeepAliveConfig) -> Result<SimulationData> {
	let mut config = config.orchestrator.clone();
	if let Some(ms) = safety_timeout_ms {
		config.safety_timeout_ms = ms;
	}
	config.validate()?;

	let browser = browser_for(scenario, url);
	let background = Background::new(Arc::new(browser.clone()), config);
	let sender = MessageSender::from_tab(browser.tab(ORIGIN).ok_or(KeepAliveError::TabNotFound(ORIGIN))?);
	let message = RuntimeMessage::open_and_close(url);

	info!(target = "keepalive", ?scenario, url, "simulation started");
	let start = Instant::now();
	let mut sessions = Vec::new();
	let mut dispatches = vec![summarize(background.handle(message.clone(), &sender).await, &mut sessions)];

	match scenario {
		Scenario::DoubleRequest => dispatches.push(summarize(background.handle(message, &sender).await, &mut sessions)),
		Scenario::OriginClosed => {
			tokio::time::sleep(ORIGIN_CLOSE_AFTER).await;
			browser.close_externally(ORIGIN);
		}
		_ => {}
	}

	let mut reports = Vec::with_capacity(sessions.len());
	for session in sessions {
		reports.push(session.await?);
	}

	let calls = browser
		.calls()
		.into_iter()
		.map(|c| CallEntry {
			at_ms: u64::try_from(c.at.saturating_duration_since(start).as_millis()).unwrap_or(u64::MAX),
			ok: c.ok,
			call: c.call,
		})
		.collect();

	Ok(SimulationData {
		scenario: scenario.to_possible_value().map(|v| v.get_name().to_owned()).unwrap_or_default(),
		url: url.to_string(),
		dispatches,
		reports,
		calls,
		active_tab: browser.active_tab(WINDOW),
		tabs: browser.tab_ids(WINDOW),
	})
}

#[cfg(test)]
mod tests {
	use keepalive::{Activation, Outcome};

	use super::*;

	async fn run(scenario: Scenario) -> SimulationData {
		execute(scenario, "https://portal.example.com/app", None, &KeepAliveConfig::default()).await.unwrap()
	}

	#[tokio::test(start_paused = true)]
	async fn instant_refresh_restores_origin() {
		let data = run(Scenario::Instant).await;

		assert_eq!(data.dispatches, vec![DispatchSummary::Started { origin: ORIGIN }]);
		assert_eq!(data.reports.len(), 1);
		assert_eq!(data.reports[0].outcome, Outcome::Loaded);
		assert_eq!(data.active_tab, Some(ORIGIN));
		assert_eq!(data.tabs, vec![TabId(5), TabId(6), ORIGIN, TabId(8)]);

		let close = data.calls.iter().find(|c| matches!(c.call, HostCall::Close { .. })).unwrap();
		assert!((500..550).contains(&close.at_ms), "closed at {}ms", close.at_ms);
	}

	#[tokio::test(start_paused = true)]
	async fn text_view_lists_timeline() {
		colored::control::set_override(false);
		let data = run(Scenario::Instant).await;
		let mut buf = Vec::new();
		data.render_text(&mut buf).unwrap();
		let text = String::from_utf8(buf).unwrap();

		assert!(text.starts_with("instant https://portal.example.com/app\n"), "{text}");
		assert!(text.contains("request from tab#7: session started"));
		assert!(text.contains("create_tab https://portal.example.com/app at index 3 -> tab#1000"));
		assert!(text.contains("session tab#7: loaded, origin by_id, notified=true"));
		assert!(text.ends_with("active tab afterwards: tab#7\n"));
	}

	#[tokio::test(start_paused = true)]
	async fn double_request_runs_one_session() {
		let data = run(Scenario::DoubleRequest).await;

		assert_eq!(data.dispatches[1], DispatchSummary::Busy { origin: ORIGIN });
		assert_eq!(data.reports.len(), 1);
		assert_eq!(data.calls.iter().filter(|c| matches!(c.call, HostCall::Create { .. })).count(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn origin_closed_falls_back_to_position() {
		let data = run(Scenario::OriginClosed).await;

		assert_eq!(data.reports[0].activation, Activation::ByPosition);
		assert!(!data.tabs.contains(&ORIGIN));
	}

	#[tokio::test(start_paused = true)]
	async fn create_failure_only_notifies() {
		let data = run(Scenario::CreateFails).await;

		assert_eq!(data.reports[0].outcome, Outcome::CreateFailed);
		assert_eq!(data.calls.len(), 2);
		assert!(data.calls.iter().all(|c| c.at_ms == 0));
	}

	#[tokio::test(start_paused = true)]
	async fn safety_timeout_override_is_applied() {
		let data = execute(Scenario::NeverLoads, "https://x", Some(2000), &KeepAliveConfig::default()).await.unwrap();

		assert_eq!(data.reports[0].outcome, Outcome::SafetyTimeout);
		let close = data.calls.iter().find(|c| matches!(c.call, HostCall::Close { .. })).unwrap();
		assert!((2000..2050).contains(&close.at_ms), "closed at {}ms", close.at_ms);
	}

	#[tokio::test(start_paused = true)]
	async fn zero_safety_timeout_is_rejected() {
		let err = execute(Scenario::NeverLoads, "https://x", Some(0), &KeepAliveConfig::default()).await.unwrap_err();
		assert!(matches!(err, crate::error::CliError::KeepAlive(KeepAliveError::Config(_))));
	}

	#[tokio::test(start_paused = true)]
	async fn login_scenario_closes_after_leaving_login() {
		let data = run(Scenario::Login).await;

		assert_eq!(data.reports[0].outcome, Outcome::AfterLogin);
		let close = data.calls.iter().find(|c| matches!(c.call, HostCall::Close { .. })).unwrap();
		assert!(close.at_ms >= 4000, "closed at {}ms", close.at_ms);
	}
}
