use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::scan::ScanKind;

#[derive(Debug, Clone, Parser)]
#[command(name = "graph-inspector")]
#[command(about = "Inspect a snapshot of a host object graph: list roots, search and scan components")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, value_name = "FILE", global = true)]
    pub snapshot: Option<PathBuf>,

    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, global = true, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Sorted root nodes after a full refresh.
    Roots,
    /// Nodes anywhere under the roots whose name or components match `text`.
    Search {
        text: String,

        /// Also match component member values.
        #[arg(long)]
        members: bool,
    },
    Scan {
        #[arg(value_enum)]
        kind: ScanArg,
    },
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ScanArg {
    Roots,
    Positional,
    Behavioural,
    Other,
    Singletons,
}

impl From<ScanArg> for ScanKind {
    fn from(arg: ScanArg) -> Self {
        match arg {
            ScanArg::Roots => ScanKind::Roots,
            ScanArg::Positional => ScanKind::Positional,
            ScanArg::Behavioural => ScanKind::Behavioural,
            ScanArg::Other => ScanKind::Other,
            ScanArg::Singletons => ScanKind::Singletons,
        }
    }
}
