//! Timing and matching configuration loaded from JSON.
//!
//! Every field has a default, so an empty object (or no file at all) yields
//! the stock behaviour. Durations are stored as millisecond integers to keep
//! the file format obvious.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KeepAliveError, Result};

/// Login provider whose pages count as an authentication interstitial.
pub const DEFAULT_INTERSTITIAL_HOST: &str = "login.microsoftonline.com";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeepAliveConfig {
	pub orchestrator: OrchestratorConfig,
	pub watchdog: WatchdogConfig,
}

impl KeepAliveConfig {
	/// Reads and validates a config file.
	pub fn load(path: &Path) -> Result<Self> {
		let raw = std::fs::read_to_string(path).map_err(|source| KeepAliveError::ConfigRead {
			path: path.to_path_buf(),
			source,
		})?;
		let config: Self = serde_json::from_str(&raw).map_err(|source| KeepAliveError::ConfigParse {
			path: path.to_path_buf(),
			source,
		})?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		self.orchestrator.validate()?;
		self.watchdog.validate()
	}
}

/// Timings of one refresh session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
	/// Wait after "load complete" before closing the sibling tab.
	pub settle_delay_ms: u64,
	/// Wait after leaving the interstitial before closing.
	pub login_settle_delay_ms: u64,
	/// Interval between interstitial re-checks.
	pub login_poll_interval_ms: u64,
	/// Wait after the close before reclaiming activation for the origin tab.
	pub restore_delay_ms: u64,
	/// Upper bound on a session; completion is forced when it elapses.
	pub safety_timeout_ms: u64,
	/// Hostname substrings identifying an authentication interstitial.
	pub interstitial_hosts: Vec<String>,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			settle_delay_ms: 500,
			login_settle_delay_ms: 1000,
			login_poll_interval_ms: 1000,
			restore_delay_ms: 100,
			safety_timeout_ms: 60_000,
			interstitial_hosts: vec![DEFAULT_INTERSTITIAL_HOST.to_string()],
		}
	}
}

impl OrchestratorConfig {
	pub fn settle_delay(&self) -> Duration {
		Duration::from_millis(self.settle_delay_ms)
	}

	pub fn login_settle_delay(&self) -> Duration {
		Duration::from_millis(self.login_settle_delay_ms)
	}

	pub fn login_poll_interval(&self) -> Duration {
		Duration::from_millis(self.login_poll_interval_ms)
	}

	pub fn restore_delay(&self) -> Duration {
		Duration::from_millis(self.restore_delay_ms)
	}

	pub fn safety_timeout(&self) -> Duration {
		Duration::from_millis(self.safety_timeout_ms)
	}

	pub fn validate(&self) -> Result<()> {
		if self.login_poll_interval_ms == 0 {
			return Err(KeepAliveError::Config("orchestrator.login_poll_interval_ms must be positive".into()));
		}
		if self.safety_timeout_ms == 0 {
			return Err(KeepAliveError::Config("orchestrator.safety_timeout_ms must be positive".into()));
		}
		if self.interstitial_hosts.is_empty() {
			return Err(KeepAliveError::Config("orchestrator.interstitial_hosts must not be empty".into()));
		}
		if self.interstitial_hosts.iter().any(|host| host.trim().is_empty()) {
			return Err(KeepAliveError::Config("orchestrator.interstitial_hosts contains an empty entry".into()));
		}
		Ok(())
	}
}

/// Page-side countdown and activity settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchdogConfig {
	/// Length of the keep-alive window restarted by every reset.
	pub session_duration_ms: u64,
	/// Minimum gap between two automatic refresh requests.
	pub auto_trigger_cooldown_ms: u64,
	/// Minimum gap between two activity pings.
	pub activity_throttle_ms: u64,
	/// How many ancestors the actionable-element walk inspects.
	pub actionable_max_hops: usize,
	/// Countdown refresh cadence.
	pub tick_ms: u64,
}

impl Default for WatchdogConfig {
	fn default() -> Self {
		Self {
			session_duration_ms: 15 * 60 * 1000,
			auto_trigger_cooldown_ms: 3000,
			activity_throttle_ms: 250,
			actionable_max_hops: 10,
			tick_ms: 1000,
		}
	}
}

impl WatchdogConfig {
	pub fn session_duration(&self) -> Duration {
		Duration::from_millis(self.session_duration_ms)
	}

	pub fn auto_trigger_cooldown(&self) -> Duration {
		Duration::from_millis(self.auto_trigger_cooldown_ms)
	}

	pub fn activity_throttle(&self) -> Duration {
		Duration::from_millis(self.activity_throttle_ms)
	}

	pub fn tick(&self) -> Duration {
		Duration::from_millis(self.tick_ms)
	}

	pub fn validate(&self) -> Result<()> {
		if self.session_duration_ms == 0 {
			return Err(KeepAliveError::Config("watchdog.session_duration_ms must be positive".into()));
		}
		if self.tick_ms == 0 {
			return Err(KeepAliveError::Config("watchdog.tick_ms must be positive".into()));
		}
		Ok(())
	}
}
