// tfredact-core/src/report.rs
//! Rendering of omission lists for humans and machines.
//!
//! Three renderers, all writing to a caller-supplied [`std::io::Write`] sink:
//!
//! * [`write_text_report`]: the grouped dry-run report;
//! * [`write_json_report`]: the full omission list plus policy provenance;
//! * [`write_verbose_preview`]: a few lines shown while a real filter runs.
//!
//! License: MIT OR APACHE 2.0

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::errors::{FilterError, Result};
use crate::omission::{FilterResult, FilterSummary, Omission, OmissionKind};
use crate::policy::FilterPolicy;

/// Maximum attribute groups listed in the platform section.
pub const PLATFORM_GROUP_LIMIT: usize = 10;
/// Maximum attribute groups listed in the general attribute section.
pub const ATTRIBUTE_GROUP_LIMIT: usize = 20;
/// Omissions shown by the verbose preview.
pub const PREVIEW_LIMIT: usize = 5;

static INDEX_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[\d+\]|\["[^"]+"\]"#).expect("index token pattern is valid")
});

/// Dry-run report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(FilterError::UnknownOutputFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Machine-readable dry-run report.
#[derive(Debug, Serialize)]
pub struct DryRunReport<'a> {
    pub omissions: &'a [Omission],
    pub summary: FilterSummary,
    pub config: ConfigReport,
}

/// Which policy produced the report.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub source: String,
    pub omit_resource_types: Vec<String>,
    pub omit_attribute_pattern_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preserve_attributes: Vec<String>,
}

impl ConfigReport {
    pub fn new(policy: &FilterPolicy, source: &str) -> Self {
        Self {
            source: source.to_string(),
            omit_resource_types: policy.all_omit_resource_types(),
            omit_attribute_pattern_count: policy.omit_attribute_pattern_count(),
            preserve_attributes: policy.preserve_attributes.clone(),
        }
    }
}

/// Writes the dry-run report for `result` in the requested format.
pub fn write_dry_run_report<W: Write>(
    out: &mut W,
    result: &FilterResult,
    policy: &FilterPolicy,
    source: &str,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => write_text_report(out, result, policy, source),
        OutputFormat::Json => write_json_report(out, result, policy, source),
    }
}

pub fn write_json_report<W: Write>(
    out: &mut W,
    result: &FilterResult,
    policy: &FilterPolicy,
    source: &str,
) -> Result<()> {
    let report = DryRunReport {
        omissions: &result.omissions,
        summary: result.summary,
        config: ConfigReport::new(policy, source),
    };
    serde_json::to_writer_pretty(&mut *out, &report).map_err(|source| FilterError::Serialization {
        document: "dry-run report",
        source,
    })?;
    writeln!(out)?;
    Ok(())
}

/// Omissions that share a path once index tokens are wildcarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeGroup {
    /// Path with `[0]` / `["key"]` replaced by `[*]`.
    pub pattern_path: String,
    /// The first concrete path seen for the group.
    pub example_path: String,
    pub reason: String,
    pub count: usize,
}

impl AttributeGroup {
    fn label(&self) -> String {
        if self.count > 1 {
            format!("{} ({} occurrences)", self.pattern_path, self.count)
        } else {
            self.example_path.clone()
        }
    }
}

/// Groups omissions by normalized path, most frequent first, ties broken by path.
pub fn group_attribute_omissions<'a, I>(omissions: I) -> Vec<AttributeGroup>
where
    I: IntoIterator<Item = &'a Omission>,
{
    let mut groups: HashMap<String, AttributeGroup> = HashMap::new();
    for omission in omissions {
        let pattern_path = INDEX_TOKEN.replace_all(&omission.path, "[*]").into_owned();
        groups
            .entry(pattern_path.clone())
            .and_modify(|g| g.count += 1)
            .or_insert_with(|| AttributeGroup {
                pattern_path,
                example_path: omission.path.clone(),
                reason: omission.reason.clone(),
                count: 1,
            });
    }

    let mut groups: Vec<AttributeGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.pattern_path.cmp(&b.pattern_path))
    });
    groups
}

fn write_groups<W: Write>(out: &mut W, groups: &[AttributeGroup], limit: usize) -> Result<()> {
    for group in groups.iter().take(limit) {
        writeln!(out, "   - {}", group.label())?;
        writeln!(out, "     {}", group.reason)?;
    }
    if groups.len() > limit {
        writeln!(out, "   ... and {} more attribute groups", groups.len() - limit)?;
    }
    Ok(())
}

fn write_resources<W: Write>(out: &mut W, omissions: &[&Omission]) -> Result<()> {
    for omission in omissions {
        writeln!(out, "   x {}", omission.path)?;
        writeln!(out, "     {}", omission.reason)?;
    }
    Ok(())
}

/// Writes the grouped human-readable report.
pub fn write_text_report<W: Write>(
    out: &mut W,
    result: &FilterResult,
    policy: &FilterPolicy,
    source: &str,
) -> Result<()> {
    let summary = &result.summary;
    writeln!(out)?;
    writeln!(out, "Sensitive Data Filter - Dry Run Report")?;
    writeln!(out, "{}", "-".repeat(50))?;
    writeln!(out)?;
    writeln!(out, "Summary")?;
    writeln!(
        out,
        "   Resources: {} total, {} omitted",
        summary.total_resources, summary.omitted_resources
    )?;
    writeln!(
        out,
        "   Attributes: {} total, {} omitted",
        summary.total_attributes, summary.omitted_attributes
    )?;
    writeln!(out, "   Config source: {}", source)?;
    if policy.has_platform_rules() {
        writeln!(out, "   Organization settings: active")?;
    }
    writeln!(out)?;

    if result.omissions.is_empty() {
        writeln!(out, "No sensitive data detected")?;
        writeln!(out)?;
        return Ok(());
    }

    let mut platform_resources = Vec::new();
    let mut platform_attributes = Vec::new();
    let mut data_sources = 0usize;
    let mut resources = Vec::new();
    let mut attributes = Vec::new();
    for omission in &result.omissions {
        match (omission.from_platform, omission.kind) {
            (true, OmissionKind::Resource) => platform_resources.push(omission),
            (true, OmissionKind::Attribute) => platform_attributes.push(omission),
            (false, _) if omission.is_data_source() => data_sources += 1,
            (false, OmissionKind::Resource) => resources.push(omission),
            (false, OmissionKind::Attribute) => attributes.push(omission),
        }
    }

    if !platform_resources.is_empty() || !platform_attributes.is_empty() {
        writeln!(out, "Omitted by Organization Settings")?;
        writeln!(out, "   These filters are configured in your account settings.")?;
        writeln!(out)?;
        write_resources(out, &platform_resources)?;
        let groups = group_attribute_omissions(platform_attributes);
        write_groups(out, &groups, PLATFORM_GROUP_LIMIT)?;
        writeln!(out)?;
    }

    if data_sources > 0 {
        writeln!(
            out,
            "Omitted {} data source lookups (read-only queries, not infrastructure)",
            data_sources
        )?;
        writeln!(out)?;
    }

    if !resources.is_empty() {
        writeln!(out, "Omitted Resources")?;
        write_resources(out, &resources)?;
        writeln!(out)?;
    }

    if !attributes.is_empty() {
        writeln!(out, "Omitted Attributes")?;
        let groups = group_attribute_omissions(attributes);
        write_groups(out, &groups, ATTRIBUTE_GROUP_LIMIT)?;
        writeln!(out)?;
    }

    writeln!(
        out,
        "Use --no-filter to skip filtering (if allowed by your organization)"
    )?;
    writeln!(out)?;
    Ok(())
}

/// Writes a short preview: one summary line and the first [`PREVIEW_LIMIT`] omissions.
pub fn write_verbose_preview<W: Write>(out: &mut W, result: &FilterResult) -> Result<()> {
    if result.omissions.is_empty() {
        writeln!(out, "No sensitive data detected")?;
        return Ok(());
    }

    writeln!(
        out,
        "Filtering sensitive data: {} resources omitted, {} attributes omitted",
        result.summary.omitted_resources, result.summary.omitted_attributes
    )?;
    for omission in result.omissions.iter().take(PREVIEW_LIMIT) {
        writeln!(out, "   {} {}", omission.kind, omission.path)?;
    }
    if result.omissions.len() > PREVIEW_LIMIT {
        writeln!(
            out,
            "   ... and {} more omissions",
            result.omissions.len() - PREVIEW_LIMIT
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omission::REASON_DATA_SOURCE;
    use crate::platform::PlatformFragment;
    use serde_json::Value;

    fn result_with(omissions: Vec<Omission>) -> FilterResult {
        let mut summary = FilterSummary::default();
        for o in &omissions {
            match o.kind {
                OmissionKind::Resource => summary.omitted_resources += 1,
                OmissionKind::Attribute => summary.omitted_attributes += 1,
            }
        }
        FilterResult {
            filtered_json: Vec::new(),
            omissions,
            summary,
        }
    }

    fn render_text(result: &FilterResult, policy: &FilterPolicy) -> String {
        let mut buf = Vec::new();
        write_text_report(&mut buf, result, policy, "defaults").unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!(matches!(
            "yaml".parse::<OutputFormat>(),
            Err(FilterError::UnknownOutputFormat(f)) if f == "yaml"
        ));
    }

    #[test]
    fn test_grouping_collapses_index_tokens() {
        let omissions = vec![
            Omission::attribute("aws_instance.web[0].password", "matches pattern 'password'", false),
            Omission::attribute("aws_instance.web[1].password", "matches pattern 'password'", false),
            Omission::attribute("aws_instance.web[\"blue\"].password", "matches pattern 'password'", false),
            Omission::attribute("aws_db_instance.main.password", "matches pattern 'password'", false),
        ];
        let groups = group_attribute_omissions(&omissions);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].pattern_path, "aws_instance.web[*].password");
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[1].label(), "aws_db_instance.main.password");
    }

    #[test]
    fn test_text_report_sections() {
        let mut policy = FilterPolicy::default();
        policy.apply_platform(&PlatformFragment {
            additional_omit_attributes: vec!["pin".into()],
            ..PlatformFragment::default()
        });
        let result = result_with(vec![
            Omission::attribute("aws_card.c.pin", "matches pattern 'pin'", true),
            Omission::resource("data.aws_ami.a", REASON_DATA_SOURCE, false),
            Omission::resource("data.aws_ami.b", REASON_DATA_SOURCE, false),
            Omission::resource("random_password.db", "resource type 'random_password' is in omit list", false),
            Omission::attribute("aws_db_instance.main.password", "matches pattern 'password'", false),
        ]);
        let text = render_text(&result, &policy);

        assert!(text.contains("Organization settings: active"));
        let platform = text.find("Omitted by Organization Settings").unwrap();
        let resources = text.find("Omitted Resources").unwrap();
        let attributes = text.find("Omitted Attributes").unwrap();
        assert!(platform < resources && resources < attributes);
        assert!(text.contains("Omitted 2 data source lookups"));
        assert!(!text.contains("data.aws_ami.a"));
        assert!(text.contains("   x random_password.db"));
        assert!(text.contains("   - aws_db_instance.main.password"));
    }

    #[test]
    fn test_text_report_without_omissions() {
        let text = render_text(&result_with(Vec::new()), &FilterPolicy::default());
        assert!(text.contains("No sensitive data detected"));
        assert!(!text.contains("Omitted Attributes"));
        assert!(!text.contains("Organization settings"));
    }

    #[test]
    fn test_attribute_groups_are_truncated() {
        let omissions = (0..25)
            .map(|i| Omission::attribute(format!("r.x.field_{:02}.token", i), "matches pattern 'token'", false))
            .collect();
        let text = render_text(&result_with(omissions), &FilterPolicy::default());
        assert!(text.contains("... and 5 more attribute groups"));
        assert!(text.contains("r.x.field_00.token"));
        assert!(!text.contains("r.x.field_24.token"));
    }

    #[test]
    fn test_json_report_shape() {
        let mut policy = FilterPolicy::default();
        let result = result_with(vec![Omission::attribute("a.b.password", "matches pattern 'password'", false)]);

        let mut buf = Vec::new();
        write_json_report(&mut buf, &result, &policy, "defaults").unwrap();
        let v: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["omissions"][0]["path"], "a.b.password");
        assert_eq!(v["summary"]["omitted_attributes"], 1);
        assert_eq!(v["config"]["source"], "defaults");
        assert_eq!(
            v["config"]["omit_attribute_pattern_count"],
            policy.omit_attributes.len()
        );
        assert!(v["config"].get("preserve_attributes").is_none());

        policy.preserve_attributes = vec!["public_ip".into()];
        let mut buf = Vec::new();
        write_dry_run_report(&mut buf, &result, &policy, "defaults", OutputFormat::Json).unwrap();
        let v: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(v["config"]["preserve_attributes"][0], "public_ip");
    }

    #[test]
    fn test_verbose_preview_is_capped() {
        let omissions = (0..8)
            .map(|i| Omission::attribute(format!("r.x{}.password", i), "matches pattern 'password'", false))
            .collect();
        let mut buf = Vec::new();
        write_verbose_preview(&mut buf, &result_with(omissions)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Filtering sensitive data: 0 resources omitted, 8 attributes omitted"));
        assert!(text.contains("attribute r.x4.password"));
        assert!(!text.contains("r.x5.password"));
        assert!(text.contains("... and 3 more omissions"));
    }
}
