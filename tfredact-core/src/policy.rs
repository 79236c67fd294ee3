//! policy.rs - Effective filtering policy and its resolution.
//!
//! A [`FilterPolicy`] is built once per invocation by [`PolicyResolver`] from three
//! layers, applied in this order:
//!
//! 1. the built-in tables in [`crate::patterns`];
//! 2. the optional project file (`.tfredact.yaml`), whose omit lists are appended and
//!    whose preserve list and booleans replace the defaults;
//! 3. the optional [`PlatformFragment`], whose omit lists are appended and tracked
//!    separately so every decision they cause can be attributed to the platform.
//!
//! Preserve entries beat every omit source, platform ones included.
//!
//! License: MIT OR Apache-2.0

use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{find_project_config, ProjectConfig};
use crate::errors::{FilterError, Result};
use crate::patterns::{
    attribute_matching_pattern, is_preserved, resource_type_matches, DEFAULT_OMIT_ATTRIBUTES,
    DEFAULT_OMIT_RESOURCE_TYPES,
};
use crate::platform::PlatformFragment;

/// The merged rules a filter pass runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterPolicy {
    /// Default + project resource types.
    pub omit_resource_types: Vec<String>,
    /// Default + project attribute patterns, in match order.
    pub omit_attributes: Vec<String>,
    /// Attribute names never omitted.
    pub preserve_attributes: Vec<String>,
    pub honor_sensitive_markers: bool,
    pub omit_data_sources: bool,
    /// Resource types added by the platform fragment.
    pub platform_omit_resource_types: Vec<String>,
    /// Attribute patterns added by the platform fragment.
    pub platform_omit_attributes: Vec<String>,
    /// The platform forbids disabling the filter.
    pub enforced: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            omit_resource_types: DEFAULT_OMIT_RESOURCE_TYPES.iter().map(|s| s.to_string()).collect(),
            omit_attributes: DEFAULT_OMIT_ATTRIBUTES.iter().map(|s| s.to_string()).collect(),
            preserve_attributes: Vec::new(),
            honor_sensitive_markers: true,
            omit_data_sources: true,
            platform_omit_resource_types: Vec::new(),
            platform_omit_attributes: Vec::new(),
            enforced: false,
        }
    }
}

/// Which omit list produced a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch<'a> {
    pub pattern: &'a str,
    pub from_platform: bool,
}

impl FilterPolicy {
    /// Applies a project configuration on top of `self`.
    pub fn apply_project(&mut self, project: &ProjectConfig) {
        let filtering = &project.filtering;
        self.omit_resource_types
            .extend(filtering.omit_resource_types.iter().cloned());
        self.omit_attributes
            .extend(filtering.omit_attributes.iter().cloned());
        if !filtering.preserve_attributes.is_empty() {
            self.preserve_attributes = filtering.preserve_attributes.clone();
        }
        if let Some(honor) = filtering.honor_terraform_sensitive {
            debug!("Project overrides honor_terraform_sensitive={}", honor);
            self.honor_sensitive_markers = honor;
        }
        if let Some(omit) = filtering.omit_data_sources {
            debug!("Project overrides omit_data_sources={}", omit);
            self.omit_data_sources = omit;
        }
    }

    /// Applies a platform fragment on top of `self`. Unavailable fragments are ignored.
    pub fn apply_platform(&mut self, fragment: &PlatformFragment) {
        if !fragment.available {
            debug!("Platform fragment not available; skipping merge.");
            return;
        }
        self.platform_omit_resource_types
            .extend(fragment.additional_omit_types.iter().cloned());
        self.platform_omit_attributes
            .extend(fragment.additional_omit_attributes.iter().cloned());
        self.enforced = fragment.enforced;
    }

    pub fn is_preserved(&self, attr_name: &str) -> bool {
        is_preserved(attr_name, &self.preserve_attributes)
    }

    /// Checks the platform patterns, then the project/default patterns.
    ///
    /// Preservation is *not* considered here; callers check it first.
    pub fn match_attribute(&self, attr_name: &str) -> Option<PatternMatch<'_>> {
        if let Some(pattern) = attribute_matching_pattern(attr_name, &self.platform_omit_attributes) {
            return Some(PatternMatch {
                pattern,
                from_platform: true,
            });
        }
        attribute_matching_pattern(attr_name, &self.omit_attributes).map(|pattern| PatternMatch {
            pattern,
            from_platform: false,
        })
    }

    /// Returns `Some(from_platform)` when the type is in either omit-type set.
    pub fn match_resource_type(&self, resource_type: &str) -> Option<bool> {
        if resource_type_matches(resource_type, &self.platform_omit_resource_types) {
            Some(true)
        } else if resource_type_matches(resource_type, &self.omit_resource_types) {
            Some(false)
        } else {
            None
        }
    }

    /// True when the platform fragment contributed any rule.
    pub fn has_platform_rules(&self) -> bool {
        !self.platform_omit_resource_types.is_empty() || !self.platform_omit_attributes.is_empty()
    }

    /// Every omitted resource type, project/default first.
    pub fn all_omit_resource_types(&self) -> Vec<String> {
        self.omit_resource_types
            .iter()
            .chain(self.platform_omit_resource_types.iter())
            .cloned()
            .collect()
    }

    pub fn omit_attribute_pattern_count(&self) -> usize {
        self.omit_attributes.len() + self.platform_omit_attributes.len()
    }
}

/// Where the project-level portion of the policy came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PolicySource {
    /// No project file was found or it could not be used.
    #[default]
    Defaults,
    /// The discovered project file.
    ProjectFile(PathBuf),
}

impl fmt::Display for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicySource::Defaults => write!(f, "defaults"),
            PolicySource::ProjectFile(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Outcome of policy resolution.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    pub policy: FilterPolicy,
    pub source: PolicySource,
    /// False when the caller asked to skip filtering and the platform allows it.
    pub filtering_enabled: bool,
    /// Non-fatal configuration problems the caller should surface.
    pub warnings: Vec<String>,
}

/// How the project file is located.
#[derive(Debug, Clone, Default)]
enum ProjectLookup {
    #[default]
    None,
    SearchFrom(PathBuf),
    File(PathBuf),
    Loaded(ProjectConfig, PathBuf),
}

/// Builds the effective [`FilterPolicy`] for one invocation.
#[derive(Debug, Clone, Default)]
pub struct PolicyResolver {
    project: ProjectLookup,
    platform: Option<PlatformFragment>,
    disable_requested: bool,
}

impl PolicyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovers the project file by searching `start` and its ancestors.
    pub fn search_from(mut self, start: impl AsRef<Path>) -> Self {
        self.project = ProjectLookup::SearchFrom(start.as_ref().to_path_buf());
        self
    }

    /// Uses an explicit project file path instead of searching.
    pub fn project_file(mut self, path: impl AsRef<Path>) -> Self {
        self.project = ProjectLookup::File(path.as_ref().to_path_buf());
        self
    }

    /// Uses an already parsed project configuration; `origin` is the provenance label.
    pub fn project_config(mut self, config: ProjectConfig, origin: impl AsRef<Path>) -> Self {
        self.project = ProjectLookup::Loaded(config, origin.as_ref().to_path_buf());
        self
    }

    pub fn platform(mut self, fragment: Option<PlatformFragment>) -> Self {
        self.platform = fragment;
        self
    }

    /// Records that the caller would like to skip filtering entirely.
    pub fn disable_filtering(mut self, disable: bool) -> Self {
        self.disable_requested = disable;
        self
    }

    /// Merges all layers and checks enforcement.
    ///
    /// Fails only with [`FilterError::PolicyViolation`]; project file problems degrade
    /// to defaults with a warning.
    pub fn resolve(self) -> Result<ResolvedPolicy> {
        let mut policy = FilterPolicy::default();
        let mut warnings = Vec::new();

        let path = match self.project {
            ProjectLookup::None => None,
            ProjectLookup::SearchFrom(start) => find_project_config(&start),
            ProjectLookup::File(path) => Some(path),
            ProjectLookup::Loaded(config, origin) => {
                policy.apply_project(&config);
                return finish(policy, PolicySource::ProjectFile(origin), self.platform, self.disable_requested, warnings);
            }
        };

        let source = match path {
            None => PolicySource::Defaults,
            Some(path) => match load_project(&path) {
                ProjectLoad::Loaded(config) => {
                    policy.apply_project(&config);
                    info!("Filter config source: {}", path.display());
                    PolicySource::ProjectFile(path)
                }
                ProjectLoad::Unreadable => PolicySource::Defaults,
                ProjectLoad::Malformed(message) => {
                    warn!("{}", message);
                    warnings.push(message);
                    PolicySource::Defaults
                }
            },
        };

        finish(policy, source, self.platform, self.disable_requested, warnings)
    }
}

enum ProjectLoad {
    Loaded(ProjectConfig),
    Unreadable,
    Malformed(String),
}

fn load_project(path: &Path) -> ProjectLoad {
    match ProjectConfig::load_from_file(path) {
        Ok(config) => ProjectLoad::Loaded(config),
        Err(e) if e.root_cause().downcast_ref::<std::io::Error>().is_some() => {
            debug!("Project config unreadable ({:#}); using defaults.", e);
            ProjectLoad::Unreadable
        }
        Err(e) => ProjectLoad::Malformed(format!(
            "Ignoring malformed filter config ({:#}). Falling back to defaults.",
            e
        )),
    }
}

fn finish(
    mut policy: FilterPolicy,
    source: PolicySource,
    platform: Option<PlatformFragment>,
    disable_requested: bool,
    warnings: Vec<String>,
) -> Result<ResolvedPolicy> {
    if let Some(fragment) = platform.as_ref() {
        policy.apply_platform(fragment);
        debug!(
            "Merged platform settings: {} types, {} attribute patterns, enforced={}",
            policy.platform_omit_resource_types.len(),
            policy.platform_omit_attributes.len(),
            policy.enforced
        );
    }

    if disable_requested && policy.enforced {
        return Err(FilterError::PolicyViolation(
            "filtering cannot be disabled".to_string(),
        ));
    }

    Ok(ResolvedPolicy {
        policy,
        source,
        filtering_enabled: !disable_requested,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(yaml: &str) -> ProjectConfig {
        ProjectConfig::from_yaml_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults_only() -> Result<()> {
        let resolved = PolicyResolver::new().resolve()?;
        assert_eq!(resolved.source, PolicySource::Defaults);
        assert_eq!(resolved.policy, FilterPolicy::default());
        assert!(resolved.filtering_enabled);
        assert!(resolved.policy.honor_sensitive_markers);
        assert!(resolved.policy.omit_data_sources);
        Ok(())
    }

    #[test]
    fn test_project_lists_are_appended_not_replaced() {
        let mut policy = FilterPolicy::default();
        let defaults_len = policy.omit_attributes.len();
        policy.apply_project(&project("filtering:\n  omit_attributes: [license_key]\n  omit_resource_types: [my_secret]\n"));
        assert_eq!(policy.omit_attributes.len(), defaults_len + 1);
        assert_eq!(policy.omit_attributes.last().map(String::as_str), Some("license_key"));
        assert!(policy.omit_resource_types.iter().any(|t| t == "random_password"));
        assert!(policy.omit_resource_types.iter().any(|t| t == "my_secret"));
    }

    #[test]
    fn test_project_preserve_and_booleans_replace() {
        let mut policy = FilterPolicy::default();
        policy.apply_project(&project(
            "filtering:\n  preserve_attributes: [public_ip]\n  honor_terraform_sensitive: false\n  omit_data_sources: false\n",
        ));
        assert_eq!(policy.preserve_attributes, vec!["public_ip"]);
        assert!(!policy.honor_sensitive_markers);
        assert!(!policy.omit_data_sources);
    }

    #[test]
    fn test_platform_rules_are_tracked_separately() {
        let mut policy = FilterPolicy::default();
        policy.apply_platform(&PlatformFragment {
            additional_omit_types: vec!["custom_vault".into()],
            additional_omit_attributes: vec!["pin".into()],
            ..PlatformFragment::default()
        });
        assert_eq!(policy.platform_omit_attributes, vec!["pin"]);
        assert!(!policy.omit_attributes.iter().any(|a| a == "pin"));
        assert_eq!(policy.match_resource_type("custom_vault"), Some(true));
        assert_eq!(
            policy.match_attribute("card_pin"),
            Some(PatternMatch { pattern: "pin", from_platform: true })
        );
    }

    #[test]
    fn test_type_in_both_sets_is_attributed_to_platform() {
        let mut policy = FilterPolicy::default();
        policy.apply_platform(&PlatformFragment {
            additional_omit_types: vec!["random_password".into()],
            ..PlatformFragment::default()
        });
        assert_eq!(policy.match_resource_type("random_password"), Some(true));
        assert_eq!(policy.match_resource_type("tls_private_key"), Some(false));
        assert_eq!(policy.match_resource_type("aws_instance"), None);
    }

    #[test]
    fn test_unavailable_fragment_contributes_nothing() -> Result<()> {
        let resolved = PolicyResolver::new()
            .platform(Some(PlatformFragment {
                available: false,
                enforced: true,
                additional_omit_attributes: vec!["pin".into()],
                ..PlatformFragment::default()
            }))
            .disable_filtering(true)
            .resolve()?;
        assert!(!resolved.filtering_enabled);
        assert!(!resolved.policy.has_platform_rules());
        Ok(())
    }

    #[test]
    fn test_enforced_fragment_rejects_disable() {
        let result = PolicyResolver::new()
            .platform(Some(PlatformFragment {
                enforced: true,
                ..PlatformFragment::default()
            }))
            .disable_filtering(true)
            .resolve();
        assert!(matches!(result, Err(FilterError::PolicyViolation(_))));
    }

    #[test]
    fn test_disable_without_enforcement_is_honored() -> Result<()> {
        let resolved = PolicyResolver::new().disable_filtering(true).resolve()?;
        assert!(!resolved.filtering_enabled);
        Ok(())
    }

    #[test]
    fn test_preloaded_project_reports_origin() -> Result<()> {
        let resolved = PolicyResolver::new()
            .project_config(project("filtering:\n  omit_attributes: [pin]\n"), ".tfredact.yaml")
            .resolve()?;
        assert_eq!(resolved.source.to_string(), ".tfredact.yaml");
        assert!(resolved.policy.match_attribute("pin").is_some());
        Ok(())
    }

    #[test]
    fn test_source_display() {
        assert_eq!(PolicySource::Defaults.to_string(), "defaults");
        assert_eq!(
            PolicySource::ProjectFile(PathBuf::from("/repo/.tfredact.yaml")).to_string(),
            "/repo/.tfredact.yaml"
        );
    }
}
