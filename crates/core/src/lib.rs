//! Keeps web sessions alive by soft-refreshing them through a sibling tab.
//!
//! The crate is split along the same lines as the browser extension it models:
//!
//! * [`background`]: routes runtime messages and starts refresh sessions
//! * [`orchestrator`]: the tab lifecycle state machine (create, load, login wait, close, restore)
//! * [`watchdog`]: page-side countdown and activity detection
//! * [`host`]: the [`TabHost`] trait the browser is reached through
//! * [`memory`]: an in-memory [`TabHost`] for tests and simulation
//!
//! # Example
//!
//! ```ignore
//! let browser = Arc::new(InMemoryBrowser::new());
//! let background = Background::new(browser, OrchestratorConfig::default());
//!
//! if let Dispatch::Started { session, .. } = background.handle(message, &sender).await {
//!     let report = session.await?;
//!     println!("{:?}", report.outcome);
//! }
//! ```

pub mod background;
pub mod config;
pub mod error;
pub mod host;
pub mod memory;
pub mod orchestrator;
pub mod watchdog;

pub use background::{Background, Dispatch, Route, classify};
pub use config::{KeepAliveConfig, OrchestratorConfig, WatchdogConfig};
pub use error::{KeepAliveError, RequestError, Result};
pub use host::{TabHost, TabSubscription};
pub use memory::{HostCall, InMemoryBrowser, LoadAction, LoadPlan, RecordedCall};
pub use orchestrator::{Activation, Orchestrator, Outcome, Phase, RefreshRequest, SessionReport};
pub use watchdog::{PageAgent, Visibility, Watchdog};

pub use keepalive_protocol as protocol;
