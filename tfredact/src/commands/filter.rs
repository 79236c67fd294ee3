// tfredact/src/commands/filter.rs
//! Filter command implementation for Terraform state and plan documents.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tfredact_core::{
    run_with_policy, write_dry_run_report, write_verbose_preview, DocumentKind, FragmentCache,
    OutputFormat, PlatformFragment, PolicyResolver, ResolvedPolicy,
};

use crate::ui::output_format;
use crate::ui::theme::ThemeMap;
use crate::utils::atomic_write::write_atomically;

/// Options for one filter run.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub kind: DocumentKind,
    pub input_path: Option<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub project_dir: Option<PathBuf>,
    pub platform_policy: Option<PathBuf>,
    pub no_filter: bool,
    pub dry_run: bool,
    pub output_format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
}

/// Helper for printing info messages to stderr.
pub fn info_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_info_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing success messages to stderr.
pub fn success_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_success_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing error messages to stderr.
pub fn error_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_error_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

/// Helper for printing warning messages to stderr.
pub fn warn_msg(msg: impl AsRef<str>, theme: &ThemeMap) {
    let stderr_supports_color = io::stderr().is_terminal();
    let _ = output_format::print_warn_message(&mut io::stderr(), msg.as_ref(), theme, stderr_supports_color);
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read input file: {}", path.display())),
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

/// Resolves the policy for this run, loading organization settings through `cache`.
pub fn resolve_policy(opts: &FilterOptions, cache: &FragmentCache) -> Result<ResolvedPolicy> {
    let platform = match opts.platform_policy.as_deref() {
        Some(path) => {
            let key = path.display().to_string();
            let fragment = cache
                .get_or_load(&key, || PlatformFragment::load_from_file(path))
                .with_context(|| format!("Failed to load organization settings from {}", path.display()))?;
            Some((*fragment).clone())
        }
        None => None,
    };

    let search_root = match opts.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine the working directory")?,
    };

    let resolved = PolicyResolver::new()
        .search_from(search_root)
        .platform(platform)
        .disable_filtering(opts.no_filter)
        .resolve()?;
    Ok(resolved)
}

/// The main operation runner for the `state` and `plan` commands.
pub fn run_filter_command(opts: &FilterOptions, cache: &FragmentCache, theme_map: &ThemeMap) -> Result<()> {
    info!("Starting {} filter.", opts.kind);

    let resolved = resolve_policy(opts, cache)?;
    if !opts.quiet {
        for warning in &resolved.warnings {
            warn_msg(warning, theme_map);
        }
    }
    debug!("Policy source: {}", resolved.source);

    let raw = read_input(opts.input_path.as_deref())?;
    let result = run_with_policy(opts.kind, &raw, &resolved)
        .with_context(|| format!("Failed to filter {} document", opts.kind))?;

    if opts.dry_run {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        write_dry_run_report(
            &mut writer,
            &result,
            &resolved.policy,
            &resolved.source.to_string(),
            opts.output_format,
        )?;
        writer.flush()?;
        return Ok(());
    }

    if !resolved.filtering_enabled && !opts.quiet {
        warn_msg("Sensitive data filtering is disabled for this run.", theme_map);
    }

    if opts.verbose && !opts.quiet {
        write_verbose_preview(&mut io::stderr(), &result)?;
    }

    match opts.output_path.as_deref() {
        Some(path) => {
            write_atomically(path, &result.filtered_json)?;
            if !opts.quiet {
                info_msg(format!("Filtered {} written to {}", opts.kind, path.display()), theme_map);
            }
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            writer.write_all(&result.filtered_json)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }

    if !opts.quiet && resolved.filtering_enabled {
        success_msg(
            format!(
                "{} resources and {} attributes omitted.",
                result.summary.omitted_resources, result.summary.omitted_attributes
            ),
            theme_map,
        );
    }
    info!("{} filter completed.", opts.kind);
    Ok(())
}
