//! CLI module
//!
//! Command-line access to catalog providers through the generic REST
//! connector.
//!
//! # Commands
//!
//! - `providers` - List catalog providers
//! - `info` - Show a provider with its URLs resolved
//! - `read` - Read one page of records
//! - `write` - Create or update a record
//! - `delete` - Delete a record
//! - `metadata` - Describe objects

mod commands;
mod runner;

pub use commands::{Cli, Commands, ConnectionArgs, OutputFormat};
pub use runner::Runner;
