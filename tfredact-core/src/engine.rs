// tfredact-core/src/engine.rs
//! Defines the core `DocumentFilter` trait and the document kinds it covers.
//!
//! The `DocumentFilter` trait is the one seam every Terraform document goes through:
//! state and plan filters implement it, the plan filter calls back into the state
//! filter through it for an embedded prior state, and the headless helpers pick an
//! implementation at runtime behind it.
//!
//! License: MIT OR APACHE 2.0

use serde_json::Value;
use std::fmt;

use crate::errors::{FilterError, Result};
use crate::omission::FilterResult;
use crate::plan::PlanFilter;
use crate::policy::FilterPolicy;
use crate::redactor::Redacted;
use crate::state::StateFilter;

/// The Terraform documents this crate knows how to filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    State,
    Plan,
}

impl DocumentKind {
    /// Lowercase noun used in error messages and reports.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::State => "state",
            DocumentKind::Plan => "plan",
        }
    }

    /// Builds the filter for this kind of document, bound to `policy`.
    pub fn filter_for(self, policy: &FilterPolicy) -> Box<dyn DocumentFilter + '_> {
        match self {
            DocumentKind::State => Box::new(StateFilter::new(policy)),
            DocumentKind::Plan => Box::new(PlanFilter::new(policy)),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A policy-bound filter for one kind of Terraform document.
///
/// Implementors provide the structural walk ([`DocumentFilter::filter_value`]) and the
/// shape check ([`DocumentFilter::validate`]); parsing and re-serialization of raw bytes
/// are shared.
pub trait DocumentFilter {
    fn kind(&self) -> DocumentKind;

    /// The policy this filter was built with.
    fn policy(&self) -> &FilterPolicy;

    /// Rejects documents that lack the required top-level fields.
    fn validate(&self, doc: &Value) -> Result<()>;

    /// Filters an already parsed document.
    fn filter_value(&self, doc: Value) -> Result<Redacted>;

    /// Parses `raw`, filters it and serializes the result.
    ///
    /// Nothing is returned unless every step succeeds.
    fn filter(&self, raw: &[u8]) -> Result<FilterResult> {
        let document = self.kind().label();
        let doc = parse_document(raw, document)?;
        let redacted = self.filter_value(doc)?;
        let filtered_json = serde_json::to_vec_pretty(&redacted.value)
            .map_err(|source| FilterError::Serialization { document, source })?;

        Ok(FilterResult {
            filtered_json,
            omissions: redacted.omissions,
            summary: redacted.summary,
        })
    }

    /// Parses and validates `raw` without filtering it.
    fn check(&self, raw: &[u8]) -> Result<()> {
        let doc = parse_document(raw, self.kind().label())?;
        self.validate(&doc)
    }
}

fn parse_document(raw: &[u8], document: &'static str) -> Result<Value> {
    serde_json::from_slice(raw).map_err(|source| FilterError::InvalidJson { document, source })
}
