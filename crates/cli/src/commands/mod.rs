mod config;
mod route;
mod simulate;

use std::time::Instant;

use anyhow::Context;
use serde::Serialize;

use crate::cli::{Cli, Commands, ConfigAction, OutputFormat};
use crate::error::Result;
use crate::output::{Envelope, RenderText};
use crate::settings;

pub use simulate::{CallEntry, DispatchSummary, SimulationData};

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
	let name = cli.command.name();
	let format = cli.format;
	let started = Instant::now();

	let outcome = match cli.command {
		Commands::Simulate {
			scenario,
			url,
			safety_timeout_ms,
		} => {
			let outcome = match settings::resolve(cli.config.as_deref()) {
				Ok(settings) => simulate::execute(scenario, &url, safety_timeout_ms, &settings.config).await,
				Err(err) => Err(err),
			};
			emit(name, started, outcome, format)
		}
		Commands::Config {
			action: ConfigAction::Show,
		} => emit(name, started, config::show(cli.config.as_deref()), format),
		Commands::Config {
			action: ConfigAction::Check { file },
		} => emit(name, started, config::check(&file), format),
		Commands::Route { message, sender } => emit(name, started, route::execute(&message, sender.as_deref()), format),
	};
	outcome.with_context(|| format!("{name} failed"))
}

/// Prints the envelope for `outcome`; failures are printed and then returned.
fn emit<T: Serialize + RenderText>(command: &'static str, started: Instant, outcome: Result<T>, format: OutputFormat) -> anyhow::Result<()> {
	match outcome {
		Ok(data) => {
			Envelope::success(command, data, started).print(format);
			Ok(())
		}
		Err(err) => {
			Envelope::<T>::failure(command, &err, started).print(format);
			Err(err.into())
		}
	}
}
