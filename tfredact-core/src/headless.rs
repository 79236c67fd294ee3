// tfredact-core/src/headless.rs

//! `headless.rs`
//! Convenience wrappers for one-shot, non-interactive filtering.
//!
//! [`filter_document`] runs a filter with an explicit policy. [`run_with_policy`] takes
//! the outcome of [`crate::PolicyResolver`] and also covers the "filtering disabled"
//! path, where the document is still validated but passed through untouched.

use log::{debug, info};

use crate::engine::DocumentKind;
use crate::errors::Result;
use crate::omission::{FilterResult, FilterSummary};
use crate::policy::{FilterPolicy, ResolvedPolicy};

/// Filters `raw` as a document of the given kind.
pub fn filter_document(kind: DocumentKind, raw: &[u8], policy: &FilterPolicy) -> Result<FilterResult> {
    debug!("Filtering {} document ({} bytes).", kind, raw.len());
    kind.filter_for(policy).filter(raw)
}

/// Filters `raw` under a resolved policy.
///
/// When filtering was disabled (and the platform allowed it), the document is
/// validated and returned byte-for-byte with an empty omission list.
pub fn run_with_policy(kind: DocumentKind, raw: &[u8], resolved: &ResolvedPolicy) -> Result<FilterResult> {
    if resolved.filtering_enabled {
        return filter_document(kind, raw, &resolved.policy);
    }

    info!("Sensitive data filtering disabled; passing {} through unchanged.", kind);
    kind.filter_for(&resolved.policy).check(raw)?;
    Ok(FilterResult {
        filtered_json: raw.to_vec(),
        omissions: Vec::new(),
        summary: FilterSummary::default(),
    })
}
