// tfredact/src/cli.rs
//! This file defines the command-line interface (CLI) for the tfredact application,
//! including all available commands and their arguments.
//! License: MIT OR Apache-2.0

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tfredact_core::{DocumentKind, OutputFormat};

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "tfredact",
    version = env!("CARGO_PKG_VERSION"),
    about = "Strip sensitive values from Terraform state and plan JSON",
    long_about = "tfredact removes passwords, keys and other secrets from Terraform state and plan documents before they are shared. Rules come from built-in defaults, an optional .tfredact.yaml found by searching upward from the working directory, and optional organization settings.",
    arg_required_else_help = true,
)]
pub struct Cli {
    /// Disable informational messages
    #[arg(long, short = 'q', global = true, help = "Suppress all informational and debug messages.")]
    pub quiet: bool,

    /// Enable debug logging (overrides RUST_LOG)
    #[arg(long, short = 'd', global = true, help = "Enable debug logging.")]
    pub debug: bool,

    /// Specify the path to a custom YAML theme file.
    #[arg(long = "theme", value_name = "FILE", global = true, help = "Specify the path to a custom YAML theme file.")]
    pub theme: Option<PathBuf>,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// All available commands for the `tfredact` CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Filters a Terraform state document (`terraform show -json` or a raw .tfstate).
    #[command(about = "Filter a Terraform state document.")]
    State(FilterArgs),

    /// Filters a Terraform plan document (`terraform show -json <planfile>`).
    #[command(about = "Filter a Terraform plan document.")]
    Plan(FilterArgs),
}

impl Commands {
    pub fn kind(&self) -> DocumentKind {
        match self {
            Commands::State(_) => DocumentKind::State,
            Commands::Plan(_) => DocumentKind::Plan,
        }
    }

    pub fn args(&self) -> &FilterArgs {
        match self {
            Commands::State(args) | Commands::Plan(args) => args,
        }
    }
}

/// Arguments shared by the `state` and `plan` commands.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Path to an input file (reads from stdin if not provided).
    #[arg(long, short = 'f', value_name = "FILE", help = "Read the document from a file instead of stdin.")]
    pub file: Option<PathBuf>,

    /// Write the filtered document to this file instead of stdout.
    #[arg(long, short = 'o', value_name = "FILE", help = "Write the filtered document to a file instead of stdout.")]
    pub output: Option<PathBuf>,

    /// Directory where the upward search for .tfredact.yaml starts.
    #[arg(long = "project-dir", value_name = "DIR", help = "Start the project config search here (defaults to the working directory).")]
    pub project_dir: Option<PathBuf>,

    /// Organization settings: a discovery document or a bare sensitiveFiltering object.
    #[arg(long = "platform-policy", value_name = "FILE", env = "TFREDACT_PLATFORM_POLICY", help = "Apply organization filter settings from a JSON file.")]
    pub platform_policy: Option<PathBuf>,

    /// Ask to skip filtering. Refused when the organization enforces it.
    #[arg(long = "no-filter", help = "Skip filtering (refused if your organization enforces it).")]
    pub no_filter: bool,

    /// Print the omission report instead of the filtered document.
    #[arg(long = "dry-run", help = "Show what would be omitted without emitting the document.")]
    pub dry_run: bool,

    /// Format of the dry-run report.
    #[arg(long = "output-format", value_name = "FORMAT", default_value = "text", help = "Dry-run report format: text or json.")]
    pub output_format: OutputFormat,

    /// Print a short preview of omissions on stderr.
    #[arg(long, short = 'v', help = "Print a short omission preview on stderr.")]
    pub verbose: bool,
}
