//! `keepalive config show|check`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use keepalive::KeepAliveConfig;
use serde::Serialize;

use crate::error::Result;
use crate::output::{RenderText, wire_name};
use crate::settings::{self, ConfigSource};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigShowData {
	pub source: ConfigSource,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub path: Option<PathBuf>,
	pub config: KeepAliveConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigCheckData {
	pub path: PathBuf,
	pub valid: bool,
	pub config: KeepAliveConfig,
}

fn write_config(config: &KeepAliveConfig, out: &mut dyn Write) -> io::Result<()> {
	writeln!(out, "{}", serde_json::to_string_pretty(config)?)
}

impl RenderText for ConfigShowData {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		match &self.path {
			Some(path) => writeln!(out, "source: {} ({})", wire_name(&self.source), path.display())?,
			None => writeln!(out, "source: {}", wire_name(&self.source))?,
		}
		write_config(&self.config, out)
	}
}

impl RenderText for ConfigCheckData {
	fn render_text(&self, out: &mut dyn Write) -> io::Result<()> {
		writeln!(out, "{}: valid", self.path.display())?;
		write_config(&self.config, out)
	}
}

pub fn show(flag: Option<&Path>) -> Result<ConfigShowData> {
	let settings = settings::resolve(flag)?;
	Ok(ConfigShowData {
		source: settings.source,
		path: settings.path,
		config: settings.config,
	})
}

pub fn check(file: &Path) -> Result<ConfigCheckData> {
	let config = KeepAliveConfig::load(file)?;
	Ok(ConfigCheckData {
		path: file.to_path_buf(),
		valid: true,
		config,
	})
}
