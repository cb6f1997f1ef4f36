//! Locating the configuration file.
//!
//! Lookup order: `--config`, then `$KEEPALIVE_CONFIG`, then
//! `<config dir>/keepalive/config.json` when it exists, then built-in defaults.
//! An explicitly named file must exist; the user-dir file is optional.

use std::path::{Path, PathBuf};

use keepalive::KeepAliveConfig;
use serde::Serialize;
use tracing::debug;

use crate::error::{CliError, Result};

pub const CONFIG_ENV: &str = "KEEPALIVE_CONFIG";

/// Where the effective configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
	CliFlag,
	Env,
	UserDir,
	Defaults,
}

#[derive(Debug, Clone)]
pub struct Settings {
	pub config: KeepAliveConfig,
	pub source: ConfigSource,
	pub path: Option<PathBuf>,
}

/// `<config dir>/keepalive/config.json`, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("keepalive").join("config.json"))
}

/// Resolves settings from the flag, the environment and the user config dir.
pub fn resolve(flag: Option<&Path>) -> Result<Settings> {
	let env = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);
	resolve_from(flag, env, user_config_path())
}

fn resolve_from(flag: Option<&Path>, env: Option<PathBuf>, user: Option<PathBuf>) -> Result<Settings> {
	let explicit = match (flag, env) {
		(Some(path), _) => Some((path.to_path_buf(), ConfigSource::CliFlag)),
		(None, Some(path)) => Some((path, ConfigSource::Env)),
		(None, None) => None,
	};

	if let Some((path, source)) = explicit {
		if !path.exists() {
			return Err(CliError::ConfigMissing(path));
		}
		return load(path, source);
	}

	match user.filter(|p| p.is_file()) {
		Some(path) => load(path, ConfigSource::UserDir),
		None => {
			debug!(target = "keepalive", "no config file found; using defaults");
			Ok(Settings {
				config: KeepAliveConfig::default(),
				source: ConfigSource::Defaults,
				path: None,
			})
		}
	}
}

fn load(path: PathBuf, source: ConfigSource) -> Result<Settings> {
	let config = KeepAliveConfig::load(&path)?;
	debug!(target = "keepalive", path = %path.display(), ?source, "loaded config");
	Ok(Settings {
		config,
		source,
		path: Some(path),
	})
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;

	fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
		let path = dir.path().join(name);
		fs::write(&path, body).unwrap();
		path
	}

	#[test]
	fn flag_wins_over_env_and_user_dir() {
		let dir = TempDir::new().unwrap();
		let flag = write(&dir, "flag.json", r#"{"orchestrator":{"settle_delay_ms":1}}"#);
		let env = write(&dir, "env.json", r#"{"orchestrator":{"settle_delay_ms":2}}"#);
		let user = write(&dir, "user.json", r#"{"orchestrator":{"settle_delay_ms":3}}"#);

		let settings = resolve_from(Some(&flag), Some(env), Some(user)).unwrap();

		assert_eq!(settings.source, ConfigSource::CliFlag);
		assert_eq!(settings.config.orchestrator.settle_delay_ms, 1);
		assert_eq!(settings.path, Some(flag));
	}

	#[test]
	fn env_wins_over_user_dir() {
		let dir = TempDir::new().unwrap();
		let env = write(&dir, "env.json", r#"{"orchestrator":{"settle_delay_ms":2}}"#);
		let user = write(&dir, "user.json", "{}");

		let settings = resolve_from(None, Some(env), Some(user)).unwrap();

		assert_eq!(settings.source, ConfigSource::Env);
		assert_eq!(settings.config.orchestrator.settle_delay_ms, 2);
	}

	#[test]
	fn user_dir_file_is_used_when_present() {
		let dir = TempDir::new().unwrap();
		let user = write(&dir, "user.json", r#"{"watchdog":{"tick_ms":500}}"#);

		let settings = resolve_from(None, None, Some(user)).unwrap();

		assert_eq!(settings.source, ConfigSource::UserDir);
		assert_eq!(settings.config.watchdog.tick_ms, 500);
	}

	#[test]
	fn missing_user_dir_file_falls_back_to_defaults() {
		let dir = TempDir::new().unwrap();
		let settings = resolve_from(None, None, Some(dir.path().join("absent.json"))).unwrap();

		assert_eq!(settings.source, ConfigSource::Defaults);
		assert_eq!(settings.config, KeepAliveConfig::default());
		assert!(settings.path.is_none());
	}

	#[test]
	fn missing_explicit_file_is_an_error() {
		let dir = TempDir::new().unwrap();
		let err = resolve_from(Some(&dir.path().join("nope.json")), None, None).unwrap_err();
		assert!(matches!(err, CliError::ConfigMissing(_)));
	}

	#[test]
	fn invalid_file_is_reported() {
		let dir = TempDir::new().unwrap();
		let bad = write(&dir, "bad.json", r#"{"orchestrator":{"login_poll_interval_ms":0}}"#);

		assert!(matches!(resolve_from(Some(&bad), None, None), Err(CliError::KeepAlive(_))));
	}
}
