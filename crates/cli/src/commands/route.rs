//! `keepalive route`: classify a raw runtime message without touching a browser.

use std::io::{self, Write};

use keepalive::protocol::{MessageSender, RuntimeMessage, TabInfo};
use keepalive::{Route, classify};
use serde::Serialize;

use crate::error::{CliError, Result};
use crate::output::RenderText;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
	pub kind: &'static str,
	pub message: RuntimeMessage,
	pub route: Route,
}

impl RenderText for RouteData {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		match &self.route {
			Route::Ping { tab } => writeln!(out, "{}: answer {tab} with reset_from_bg", self.kind),
			Route::Refresh { request } => {
				write!(out, "{}: refresh {} via a sibling at index {}", self.kind, request.origin_tab, request.sibling_index())?;
				if let Some(window) = request.origin_window {
					write!(out, " of {window}")?;
				}
				writeln!(out, "\n  url {}", request.url)
			}
			Route::Reject { error, notify: Some(tab) } => writeln!(out, "{}: rejected ({error}); reset sent to {tab}", self.kind),
			Route::Reject { error, notify: None } => writeln!(out, "{}: rejected ({error}); nobody to notify", self.kind),
			Route::Ignore { reason } => writeln!(out, "{}: ignored ({reason})", self.kind),
		}
	}
}

pub fn execute(message: &str, sender: Option<&str>) -> Result<RouteData> {
	let message: RuntimeMessage = serde_json::from_str(message).map_err(CliError::InvalidMessage)?;
	let sender = match sender {
		Some(raw) => MessageSender::from_tab(serde_json::from_str::<TabInfo>(raw).map_err(CliError::InvalidSender)?),
		None => MessageSender::default(),
	};

	Ok(RouteData {
		kind: message.kind(),
		route: classify(&message, &sender),
		message,
	})
}

#[cfg(test)]
mod tests {
	use keepalive::protocol::TabId;

	use super::*;

	const SENDER: &str = r#"{"id":7,"windowId":1,"index":2,"url":"https://x","status":"complete"}"#;

	#[test]
	fn ping_from_tab_routes_to_sender() {
		let data = execute(r#"{"type":"activity_ping"}"#, Some(SENDER)).unwrap();

		assert_eq!(data.kind, "activity_ping");
		assert_eq!(data.route, Route::Ping { tab: TabId(7) });
	}

	#[test]
	fn refresh_request_picks_up_sender_position() {
		let data = execute(r#"{"type":"open_and_close_same_url","url":"https://x/app"}"#, Some(SENDER)).unwrap();

		let Route::Refresh { request } = data.route else {
			panic!("expected a refresh route");
		};
		assert_eq!(request.origin_tab, TabId(7));
		assert_eq!(request.sibling_index(), 3);
		assert_eq!(request.url, "https://x/app");
	}

	#[test]
	fn refresh_without_sender_is_rejected() {
		let data = execute(r#"{"type":"open_and_close_same_url","url":"https://x"}"#, None).unwrap();
		assert!(matches!(data.route, Route::Reject { notify: None, .. }));
	}

	#[test]
	fn text_view_names_sibling_position() {
		let data = execute(r#"{"type":"open_and_close_same_url","url":"https://x/app"}"#, Some(SENDER)).unwrap();
		let mut buf = Vec::new();
		data.render_text(&mut buf).unwrap();

		assert_eq!(
			String::from_utf8(buf).unwrap(),
			"open_and_close_same_url: refresh tab#7 via a sibling at index 3 of window#1\n  url https://x/app\n"
		);
	}

	#[test]
	fn malformed_json_is_invalid_input() {
		assert!(matches!(execute("{", None), Err(CliError::InvalidMessage(_))));
		assert!(matches!(execute(r#"{"type":"activity_ping"}"#, Some("[]")), Err(CliError::InvalidSender(_))));
	}
}
