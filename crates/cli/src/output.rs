//! Result envelope printed by every command.
//!
//! stdout carries exactly one envelope per invocation: whether the command
//! succeeded, its typed data or an error code, and the wall time it took.
//! `--format text` swaps the JSON for each command's own [`RenderText`] view.

use std::io::{self, Write};
use std::time::Instant;

use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub const SCHEMA_VERSION: u32 = 1;

/// Text view of a command's data.
pub trait RenderText {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Stable error codes for scripts consuming the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	InvalidInput,
	ConfigError,
	IoError,
	SessionError,
	InternalError,
}

impl ErrorCode {
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorCode::InvalidInput => "INVALID_INPUT",
			ErrorCode::ConfigError => "CONFIG_ERROR",
			ErrorCode::IoError => "IO_ERROR",
			ErrorCode::SessionError => "SESSION_ERROR",
			ErrorCode::InternalError => "INTERNAL_ERROR",
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
	pub code: ErrorCode,
	pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
	pub schema_version: u32,
	pub ok: bool,
	pub command: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<Failure>,
	pub duration_ms: u64,
}

/// Milliseconds since `started`, saturating at `u64::MAX`.
pub fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl<T: Serialize + RenderText> Envelope<T> {
	pub fn success(command: &'static str, data: T, started: Instant) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: true,
			command,
			data: Some(data),
			error: None,
			duration_ms: elapsed_ms(started),
		}
	}

	pub fn failure(command: &'static str, err: &CliError, started: Instant) -> Self {
		Self {
			schema_version: SCHEMA_VERSION,
			ok: false,
			command,
			data: None,
			error: Some(Failure {
				code: err.code(),
				message: err.to_string(),
			}),
			duration_ms: elapsed_ms(started),
		}
	}

	/// Prints to stdout. Write errors (a closed pipe) are ignored.
	pub fn print(&self, format: OutputFormat) {
		let _ = self.write_to(format, &mut io::stdout().lock());
	}

	pub fn write_to(&self, format: OutputFormat, out: &mut dyn Write) -> io::Result<()> {
		match format {
			OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(self)?),
			OutputFormat::Ndjson => writeln!(out, "{}", serde_json::to_string(self)?),
			OutputFormat::Toon => writeln!(out, "{}", toon::encode(&serde_json::to_value(self)?, None)),
			OutputFormat::Text => self.write_text(out),
		}
	}

	fn write_text(&self, out: &mut dyn Write) -> io::Result<()> {
		if let Some(data) = &self.data {
			data.render_text(out)?;
		}
		if let Some(error) = &self.error {
			writeln!(out, "{} [{}]: {}", "error".red().bold(), error.code.as_str(), error.message)?;
		}
		writeln!(out, "{}", format!("{} finished in {}ms", self.command, self.duration_ms).dimmed())
	}
}

/// Snake-case wire name of a unit enum value, for text views.
pub fn wire_name<T: Serialize>(value: &T) -> String {
	serde_json::to_value(value)
		.ok()
		.and_then(|v| v.as_str().map(str::to_owned))
		.unwrap_or_default()
}
