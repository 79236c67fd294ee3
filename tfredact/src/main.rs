// tfredact/src/main.rs
//! tfredact entry point.
//!
//! Parses arguments, sets up logging and the theme, then hands off to the filter
//! command. Errors are printed once, styled, and turned into a non-zero exit code.

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use tfredact::cli::Cli;
use tfredact::commands::filter::{error_msg, run_filter_command, FilterOptions};
use tfredact::logger;
use tfredact::ui::theme::{build_theme_map, ThemeMap, ThemeStyle};
use tfredact_core::{FilterError, FragmentCache};

/// Exit code used when organization settings forbid the requested run.
const EXIT_POLICY_VIOLATION: u8 = 3;

fn run(cli: &Cli, theme_map: &ThemeMap) -> Result<()> {
    let args = cli.command.args();
    let opts = FilterOptions {
        kind: cli.command.kind(),
        input_path: args.file.clone(),
        output_path: args.output.clone(),
        project_dir: args.project_dir.clone(),
        platform_policy: args.platform_policy.clone(),
        no_filter: args.no_filter,
        dry_run: args.dry_run,
        output_format: args.output_format,
        verbose: args.verbose,
        quiet: cli.quiet,
    };

    let cache = FragmentCache::default();
    run_filter_command(&opts, &cache, theme_map)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init_logger(logger::level_from_flags(cli.quiet, cli.debug));

    let theme_map = match build_theme_map(cli.theme.as_deref()).context("Theme error") {
        Ok(theme) => theme,
        Err(e) => {
            let fallback = ThemeStyle::default_theme_map();
            error_msg(format!("{:#}", e), &fallback);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &theme_map) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error_msg(format!("{:#}", e), &theme_map);
            match e.downcast_ref::<FilterError>() {
                Some(FilterError::PolicyViolation(_)) => ExitCode::from(EXIT_POLICY_VIOLATION),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
