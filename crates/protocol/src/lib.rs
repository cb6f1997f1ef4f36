//! Wire types for the keep-alive runtime.
//!
//! This crate contains the serde-serializable types exchanged between a page
//! and the background worker, plus the tab/window shapes a browser host
//! reports. These types represent the "protocol layer" - the shapes of data
//! as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and trivial accessors
//! * 1:1 with the wire: field names match the extension message shapes (camelCase)
//! * Stable: Changes only when the message format changes
//!
//! Orchestration built on top of these types lives in `keepalive-core`.

pub mod message;
pub mod tab;

pub use message::*;
pub use tab::*;
