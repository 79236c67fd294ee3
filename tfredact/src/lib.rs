// tfredact/src/lib.rs
//! # tfredact CLI Application
//!
//! Thin command-line driver over `tfredact-core`: it reads a Terraform document from a
//! file or stdin, resolves the filtering policy, and writes the filtered document or
//! a dry-run report.

pub mod cli;
pub mod commands;
pub mod logger;
pub mod ui;
pub mod utils;

pub use commands::filter::{run_filter_command, FilterOptions};
