use keepalive::KeepAliveError;
use thiserror::Error;

use crate::output::ErrorCode;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	KeepAlive(#[from] KeepAliveError),

	#[error("invalid runtime message: {0}")]
	InvalidMessage(#[source] serde_json::Error),

	#[error("invalid sender tab: {0}")]
	InvalidSender(#[source] serde_json::Error),

	#[error("config file {0} does not exist")]
	ConfigMissing(std::path::PathBuf),

	#[error("session task failed: {0}")]
	Session(#[from] tokio::task::JoinError),

	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::KeepAlive(err) if err.is_resource_unavailable() => ErrorCode::SessionError,
			CliError::KeepAlive(_) | CliError::ConfigMissing(_) => ErrorCode::ConfigError,
			CliError::InvalidMessage(_) | CliError::InvalidSender(_) => ErrorCode::InvalidInput,
			CliError::Session(_) => ErrorCode::InternalError,
			CliError::Io(_) => ErrorCode::IoError,
		}
	}
}

pub type Result<T> = std::result::Result<T, CliError>;
