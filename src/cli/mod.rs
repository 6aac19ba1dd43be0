//! CLI module
//!
//! Command-line interface for the list service and its cursor tooling.
//!
//! # Commands
//!
//! - `serve` - Start the HTTP list service
//! - `encode` / `decode` - Mint or inspect a cursor token
//! - `fingerprint` - Fingerprint a filter set
//! - `fetch` - Page through a remote list endpoint
//! - `resources` - List configured resources
//! - `validate` - Validate the configuration

mod commands;
mod runner;
mod server;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
pub use server::{build_router, page_request, serve, AppState, SharedSource};
