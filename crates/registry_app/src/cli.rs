use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use registry_core::{EntityKind, SortKey};
use registry_logging::LogDestination;

use crate::platform::config::DEFAULT_CONFIG_FILE;

#[derive(Debug, Parser)]
#[command(name = "registry", version, about = "Browse and maintain the asset registry")]
pub struct Cli {
    /// RON configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[arg(long, value_enum, global = true, default_value_t = LogTarget::Terminal)]
    pub log: LogTarget,

    /// Log retries and probes at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show one page of a resource list.
    List {
        resource: EntityKind,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Defaults to the configured page size.
        #[arg(long)]
        page_size: Option<u32>,
        /// Case-insensitive filter over every displayed field.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,
        #[arg(long)]
        desc: bool,
    },
    /// Delete a record, then show the refreshed first page.
    Delete {
        resource: EntityKind,
        id: String,
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Create a name-only record; without a name the saved draft is resumed.
    Add {
        resource: EntityKind,
        name: Option<String>,
    },
    /// Show a record, or rename it with `--name`.
    Edit {
        resource: EntityKind,
        id: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Upload an image and print its hosted URL.
    Upload { file: PathBuf },
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        token: String,
    },
    Logout,
    Whoami,
}

impl Command {
    /// Route the command corresponds to, for the session guard.
    pub fn route(&self) -> String {
        match self {
            Command::List { resource, .. } | Command::Delete { resource, .. } => {
                format!("/{}/list", resource.stem())
            }
            Command::Add { resource, .. } => format!("/{}/add", resource.stem()),
            Command::Edit { resource, id, .. } => format!("/{}/edit/{id}", resource.stem()),
            Command::Upload { .. } => "/image".to_string(),
            Command::Login { .. } => registry_core::session::LOGIN_ROUTE.to_string(),
            Command::Logout | Command::Whoami => "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    Terminal,
    File,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Name,
    Id,
    Newest,
}

impl From<SortArg> for SortKey {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Name => SortKey::Name,
            SortArg::Id => SortKey::Id,
            SortArg::Newest => SortKey::Newest,
        }
    }
}
