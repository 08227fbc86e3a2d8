//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlvein")]
#[command(author, version, about = "SQL data lineage analysis tool")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the inputs and derive the lineage document
    Analyze {
        /// Index document (declared object metadata)
        #[arg(short, long, value_name = "FILE")]
        index: Option<PathBuf>,

        /// AST document (parsed statement bodies)
        #[arg(short, long, value_name = "FILE")]
        ast: Option<PathBuf>,

        /// Where to write the lineage document
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// SQL flavor (controls the default schema for name qualification)
        #[arg(long)]
        flavor: Option<String>,

        /// Configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Directory with replacement JSON Schemas
        #[arg(long = "schema-dir", value_name = "DIR")]
        schema_dir: Option<PathBuf>,

        /// Output format for validation failure reports
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Check the inputs against their schemas and each other, without analyzing
    Validate {
        /// Index document
        #[arg(short, long, value_name = "FILE")]
        index: PathBuf,

        /// AST document
        #[arg(short, long, value_name = "FILE")]
        ast: PathBuf,

        /// SQL flavor
        #[arg(long, default_value = "tsql")]
        flavor: String,

        /// Directory with replacement JSON Schemas
        #[arg(long = "schema-dir", value_name = "DIR")]
        schema_dir: Option<PathBuf>,

        /// Output format for validation failure reports
        #[arg(short, long, default_value = "human", value_enum)]
        format: OutputFormat,
    },

    /// Summarize an existing lineage document
    Inspect {
        /// Lineage document to summarize
        file: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
}
