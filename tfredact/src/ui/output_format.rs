// tfredact/src/ui/output_format.rs
//! Styled status messages for stderr.
//!
//! Every printer takes the sink explicitly and a `supports_color` flag decided by the
//! caller, so tests can render into a `Vec<u8>` without ANSI codes.

use owo_colors::OwoColorize;
use std::io::{self, Write};

use super::theme::{ThemeEntry, ThemeMap};

fn styled(text: &str, entry: ThemeEntry, theme: &ThemeMap, supports_color: bool) -> String {
    if !supports_color {
        return text.to_string();
    }
    match theme.get(&entry).and_then(|style| style.fg.as_ref()) {
        Some(color) => text.color(color.to_ansi_color()).to_string(),
        None => text.to_string(),
    }
}

fn print_tagged<W: Write>(
    out: &mut W,
    msg: &str,
    entry: ThemeEntry,
    theme: &ThemeMap,
    supports_color: bool,
) -> io::Result<()> {
    writeln!(out, "{} {}", styled(entry.tag(), entry, theme, supports_color), msg)
}

pub fn print_info_message<W: Write>(out: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(out, msg, ThemeEntry::Info, theme, supports_color)
}

pub fn print_success_message<W: Write>(out: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(out, msg, ThemeEntry::Success, theme, supports_color)
}

pub fn print_warn_message<W: Write>(out: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(out, msg, ThemeEntry::Warn, theme, supports_color)
}

pub fn print_error_message<W: Write>(out: &mut W, msg: &str, theme: &ThemeMap, supports_color: bool) -> io::Result<()> {
    print_tagged(out, msg, ThemeEntry::Error, theme, supports_color)
}
