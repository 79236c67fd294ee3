// tfredact-core/src/omission.rs
//! Provides the data structures that record redaction decisions: one [`Omission`] per
//! removed value, a running [`FilterSummary`], and the [`FilterResult`] handed back
//! to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason recorded for data sources dropped by the `omit_data_sources` switch.
pub const REASON_DATA_SOURCE: &str = "data source lookup omitted";
/// Reason recorded when a provider marker flagged the attribute.
pub const REASON_TERRAFORM_SENSITIVE: &str = "marked as sensitive by Terraform";
/// Reason recorded for outputs carrying `sensitive: true`.
pub const REASON_SENSITIVE_OUTPUT: &str = "output marked as sensitive";

/// What kind of thing was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmissionKind {
    Resource,
    Attribute,
}

impl fmt::Display for OmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OmissionKind::Resource => write!(f, "resource"),
            OmissionKind::Attribute => write!(f, "attribute"),
        }
    }
}

/// A single redaction decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Omission {
    /// Full address of the removed value, e.g. `aws_db_instance.main.password`.
    pub path: String,
    pub reason: String,
    #[serde(rename = "type")]
    pub kind: OmissionKind,
    /// Set when the rule that fired came from the platform fragment.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_platform: bool,
}

impl Omission {
    pub fn resource(path: impl Into<String>, reason: impl Into<String>, from_platform: bool) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
            kind: OmissionKind::Resource,
            from_platform,
        }
    }

    pub fn attribute(path: impl Into<String>, reason: impl Into<String>, from_platform: bool) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
            kind: OmissionKind::Attribute,
            from_platform,
        }
    }

    pub fn is_data_source(&self) -> bool {
        self.kind == OmissionKind::Resource && self.reason == REASON_DATA_SOURCE
    }
}

/// Aggregate counters for one filter pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSummary {
    pub total_resources: usize,
    pub omitted_resources: usize,
    pub total_attributes: usize,
    pub omitted_attributes: usize,
}

impl FilterSummary {
    /// Adds every counter of `other` into `self`.
    pub fn absorb(&mut self, other: &FilterSummary) {
        self.total_resources += other.total_resources;
        self.omitted_resources += other.omitted_resources;
        self.total_attributes += other.total_attributes;
        self.omitted_attributes += other.omitted_attributes;
    }
}

/// Append-only log of decisions plus the counters they imply.
///
/// Filters push through [`OmissionLog::record`] so the summary can never drift from
/// the list.
#[derive(Debug, Default)]
pub(crate) struct OmissionLog {
    pub(crate) omissions: Vec<Omission>,
    pub(crate) summary: FilterSummary,
}

impl OmissionLog {
    pub(crate) fn record(&mut self, omission: Omission) {
        match omission.kind {
            OmissionKind::Resource => self.summary.omitted_resources += 1,
            OmissionKind::Attribute => self.summary.omitted_attributes += 1,
        }
        self.omissions.push(omission);
    }

    pub(crate) fn merge(&mut self, omissions: Vec<Omission>, summary: &FilterSummary) {
        self.omissions.extend(omissions);
        self.summary.absorb(summary);
    }
}

/// Output of a filter invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    /// The filtered document, serialized.
    #[serde(skip)]
    pub filtered_json: Vec<u8>,
    pub omissions: Vec<Omission>,
    pub summary: FilterSummary,
}

impl FilterResult {
    /// Omissions attributed to the platform fragment.
    pub fn platform_omissions(&self) -> impl Iterator<Item = &Omission> {
        self.omissions.iter().filter(|o| o.from_platform)
    }
}
