// tfredact-core/src/lib.rs
//! # tfredact Core Library
//!
//! `tfredact-core` removes sensitive values from Terraform state and plan documents
//! before they leave the machine. It is pure and performs no network I/O: the caller
//! hands in document bytes plus a policy and gets back filtered bytes, an ordered list
//! of omissions and summary counts.
//!
//! ## Modules
//!
//! * `patterns`: built-in omit tables and the case-insensitive name matcher.
//! * `config`: the `.tfredact.yaml` project file and its upward discovery.
//! * `platform`: the account-level fragment and its caller-owned TTL cache.
//! * `policy`: merging defaults, project file and fragment into a `FilterPolicy`.
//! * `redactor`: the recursive `ValueRedactor` shared by every filter.
//! * `engine`: the `DocumentFilter` trait and `DocumentKind`.
//! * `state` / `plan`: the concrete filters.
//! * `report`: text, JSON and preview renderings of omissions.
//! * `headless`: one-shot helpers.
//!
//! ## Usage Example
//!
//! ```rust
//! use tfredact_core::{filter_document, DocumentKind, PolicyResolver};
//!
//! fn main() -> Result<(), tfredact_core::FilterError> {
//!     let resolved = PolicyResolver::new().resolve()?;
//!     let state = br#"{"version":4,"resources":[{"mode":"managed","type":"aws_db_instance",
//!         "name":"main","instances":[{"attributes":{"password":"x","name":"y"}}]}]}"#;
//!
//!     let result = filter_document(DocumentKind::State, state, &resolved.policy)?;
//!     assert_eq!(result.summary.omitted_attributes, 1);
//!     assert_eq!(result.omissions[0].path, "aws_db_instance.main.password");
//!     Ok(())
//! }
//! ```
//!
//! ---
//! License: MIT OR Apache-2.0

pub mod config;
pub mod engine;
pub mod errors;
pub mod headless;
pub mod omission;
pub mod patterns;
pub mod plan;
pub mod platform;
pub mod policy;
pub mod redactor;
pub mod report;
pub mod state;

/// Re-exports the project configuration types.
pub use config::{find_project_config, FilteringSection, ProjectConfig};

/// Re-exports the custom error type for clear error reporting.
pub use errors::FilterError;

pub use engine::{DocumentFilter, DocumentKind};
pub use plan::PlanFilter;
pub use state::StateFilter;

pub use omission::{FilterResult, FilterSummary, Omission, OmissionKind};

pub use patterns::{attribute_matching_pattern, resource_type_matches};

pub use platform::{FragmentCache, PlatformFragment, DEFAULT_FRAGMENT_TTL};

pub use policy::{FilterPolicy, PolicyResolver, PolicySource, ResolvedPolicy};

pub use redactor::{Redacted, SensitiveSet, ValueRedactor};

pub use report::{
    write_dry_run_report, write_json_report, write_text_report, write_verbose_preview, OutputFormat,
};

/// Re-exports the one-shot helpers.
pub use headless::{filter_document, run_with_policy};
