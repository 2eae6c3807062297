use clap::{Args, Parser, Subcommand};
use dsmeta::document::{Format, TextFormat};
use dsmeta::filter::View;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "dsmeta")]
#[command(about = "Check, merge and filter dataset metadata documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding dsmeta.json (defaults to ./.dsmeta, then the user config dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Render only what these principals may read
    #[arg(long = "as", value_name = "UUID", num_args = 1.., value_delimiter = ',')]
    pub requester: Option<Vec<Uuid>>,

    /// Tree format for every root (full or simple)
    #[arg(short, long, value_parser = parse_format)]
    pub format: Option<Format>,

    /// Text encoding when printing (yaml or json)
    #[arg(short, long)]
    pub text: Option<TextFormat>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse().map_err(|e: dsmeta::error::MetaError| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply defaults and verify a document
    #[command(alias = "c")]
    Check {
        /// Document path (.json for JSON, anything else is YAML)
        path: PathBuf,
    },

    /// Print a document, optionally converted or pruned for a reader
    #[command(alias = "s")]
    Show {
        path: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Merge documents left to right
    #[command(alias = "m")]
    Merge {
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,

        /// Let later documents overwrite conflicting values
        #[arg(long)]
        overwrite: bool,

        /// Principals performing the merge, checked against write permissions
        #[arg(long, value_name = "UUID", num_args = 1.., value_delimiter = ',')]
        by: Option<Vec<Uuid>>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Project a document through a named view (ml, sql, regular)
    #[command(alias = "f")]
    Filter {
        path: PathBuf,

        #[arg(long, short = 'V', default_value = "regular")]
        view: View,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Get or set configuration
    Config {
        /// Configuration key (e.g., owner_uuids)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
