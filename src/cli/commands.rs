//! CLI commands and argument parsing

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy connector runtime CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-connect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Provider catalog (YAML); the built-in catalog when omitted
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Generic REST connector settings (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Connection inputs shared by every provider command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Provider name in the catalog
    pub provider: String,

    /// Provider module (sub-API)
    #[arg(short, long)]
    pub module: Option<String>,

    /// Workspace substituted into `{{workspace}}`
    #[arg(short, long)]
    pub workspace: Option<String>,

    /// Metadata input as key=value (repeatable)
    #[arg(long = "metadata", value_parser = parse_key_val)]
    pub metadata: Vec<(String, String)>,

    /// API key, placed where the provider's catalog entry says
    #[arg(long, env = "SOLIDAFY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Bearer token
    #[arg(long, env = "SOLIDAFY_BEARER_TOKEN", hide_env_values = true)]
    pub bearer: Option<String>,

    /// Basic credentials as user:password
    #[arg(long)]
    pub basic: Option<String>,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List catalog providers
    Providers,

    /// Show a provider with its URLs resolved
    Info {
        /// Provider name in the catalog
        provider: String,

        /// Workspace substituted into `{{workspace}}`
        #[arg(short, long)]
        workspace: Option<String>,

        /// Metadata input as key=value (repeatable)
        #[arg(long = "metadata", value_parser = parse_key_val)]
        metadata: Vec<(String, String)>,
    },

    /// Read one page of records
    Read {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Object to read
        object: String,

        /// Fields to return (comma-separated)
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Token returned by the previous page
        #[arg(long)]
        next_page: Option<String>,

        /// Lower time bound (RFC 3339)
        #[arg(long)]
        since: Option<DateTime<Utc>>,

        /// Upper time bound (RFC 3339)
        #[arg(long)]
        until: Option<DateTime<Utc>>,

        /// Records per page
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Create a record, or update one when --record-id is given
    Write {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Object to write
        object: String,

        /// Record body (JSON)
        #[arg(long)]
        data: String,

        /// Id of the record to update
        #[arg(long)]
        record_id: Option<String>,
    },

    /// Delete a record
    Delete {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Object the record belongs to
        object: String,

        /// Id of the record
        record_id: String,
    },

    /// Describe objects
    Metadata {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Objects to describe
        #[arg(required = true)]
        objects: Vec<String>,
    },
}

impl Commands {
    /// Subcommand name as typed
    pub fn name(&self) -> &'static str {
        match self {
            Self::Providers => "providers",
            Self::Info { .. } => "info",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Delete { .. } => "delete",
            Self::Metadata { .. } => "metadata",
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON
    Json,
    /// Indented JSON
    Pretty,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{s}'"))
}
