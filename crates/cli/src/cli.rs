use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "keepalive")]
#[command(about = "Keep web sessions alive by refreshing them through a sibling tab")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Configuration file (falls back to $KEEPALIVE_CONFIG, then the user config dir)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a scripted refresh against the in-memory browser
	#[command(alias = "sim")]
	Simulate {
		#[arg(value_enum)]
		scenario: Scenario,
		/// URL of the page being kept alive
		#[arg(long, default_value = "https://portal.example.com/app")]
		url: String,
		/// Override the session safety timeout
		#[arg(long, value_name = "MS")]
		safety_timeout_ms: Option<u64>,
	},

	/// Inspect or validate configuration
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},

	/// Show how the background would route a runtime message
	Route {
		/// Message JSON, e.g. '{"type":"activity_ping"}'
		message: String,
		/// Sending tab as JSON (a tab snapshot)
		#[arg(long, value_name = "JSON")]
		sender: Option<String>,
	},
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Simulate { .. } => "simulate",
			Commands::Config {
				action: ConfigAction::Show,
			} => "config show",
			Commands::Config {
				action: ConfigAction::Check { .. },
			} => "config check",
			Commands::Route { .. } => "route",
		}
	}
}

/// How results are printed on stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Pretty-printed JSON envelope
	#[default]
	Json,
	/// Envelope on a single line
	Ndjson,
	/// TOON encoding of the envelope
	Toon,
	/// Session timeline for humans
	Text,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
	/// Print the effective configuration and where it came from
	Show,
	/// Validate a configuration file
	Check { file: PathBuf },
}

/// Scripted browser behaviour for `simulate`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
	/// The sibling tab loads straight away
	Instant,
	/// The sibling passes through a login page, reported by URL change
	Login,
	/// The login page is left without an update; only polling notices
	LoginPoll,
	/// The sibling never finishes loading
	NeverLoads,
	/// The user closes the origin tab mid-session
	OriginClosed,
	/// Tab creation is refused by the browser
	CreateFails,
	/// The page asks twice before the first session ends
	DoubleRequest,
}
