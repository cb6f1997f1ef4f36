//! Command line front end for the keep-alive orchestrator.
//!
//! The binary drives the real orchestrator against the in-memory browser so
//! refresh behaviour can be inspected without a browser attached.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod settings;
