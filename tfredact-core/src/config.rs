//! Configuration management for `tfredact-core`.
//!
//! This module defines the on-disk project configuration (`.tfredact.yaml`), the upward
//! directory search that discovers it, and the YAML loader. Merging the loaded file
//! with the built-in defaults and the platform fragment happens in [`crate::policy`].
//!
//! License: MIT OR Apache-2.0

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names recognized as a project configuration, in lookup order.
pub const PROJECT_CONFIG_FILENAMES: &[&str] = &[".tfredact.yaml", ".tfredact.yml"];

/// Top-level structure of a project configuration file.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    pub version: u32,
    pub filtering: FilteringSection,
}

/// The `filtering:` block of a project configuration file.
///
/// The omit lists are additive on top of the defaults. The preserve list replaces
/// whatever came before it. The two booleans are tri-state so an absent key means
/// "use the default" rather than `false`.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct FilteringSection {
    pub omit_resource_types: Vec<String>,
    pub omit_attributes: Vec<String>,
    pub preserve_attributes: Vec<String>,
    pub honor_terraform_sensitive: Option<bool>,
    pub omit_data_sources: Option<bool>,
}

impl ProjectConfig {
    /// Loads a project configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading project filter config from: {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parses a project configuration from YAML text.
    ///
    /// An empty document is a valid, empty configuration.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ProjectConfig = serde_yml::from_str(text)?;
        debug!(
            "Project config declares {} omit types, {} omit attributes, {} preserve entries.",
            config.filtering.omit_resource_types.len(),
            config.filtering.omit_attributes.len(),
            config.filtering.preserve_attributes.len()
        );
        Ok(config)
    }
}

/// Searches `start` and each of its ancestors for a project configuration file.
///
/// A relative `start` is resolved against the working directory first, so the search
/// still climbs to the filesystem root. Returns the first match, or `None` once the
/// root has been checked.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    match std::env::current_dir() {
        Ok(cwd) => find_project_config_from(start, &cwd),
        Err(e) => {
            debug!("Working directory unavailable ({}); searching from {} as given.", e, start.display());
            find_project_config_from(start, Path::new(""))
        }
    }
}

/// [`find_project_config`] with `base` standing in for the working directory.
fn find_project_config_from(start: &Path, base: &Path) -> Option<PathBuf> {
    let start = base.join(start);
    for dir in start.ancestors() {
        for name in PROJECT_CONFIG_FILENAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                debug!("Found project config at {}", candidate.display());
                return Some(candidate);
            }
        }
    }
    debug!("No project config found above {}", start.display());
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_filtering_section() -> Result<()> {
        let yaml = r#"
version: 1
filtering:
  omit_resource_types: [my_secret]
  omit_attributes: [license_key]
  preserve_attributes: [public_ip]
  honor_terraform_sensitive: false
  omit_data_sources: true
"#;
        let config = ProjectConfig::from_yaml_str(yaml)?;
        assert_eq!(config.version, 1);
        assert_eq!(config.filtering.omit_resource_types, vec!["my_secret"]);
        assert_eq!(config.filtering.omit_attributes, vec!["license_key"]);
        assert_eq!(config.filtering.preserve_attributes, vec!["public_ip"]);
        assert_eq!(config.filtering.honor_terraform_sensitive, Some(false));
        assert_eq!(config.filtering.omit_data_sources, Some(true));
        Ok(())
    }

    #[test]
    fn test_absent_booleans_stay_unset() -> Result<()> {
        let config = ProjectConfig::from_yaml_str("filtering:\n  omit_attributes: [x]\n")?;
        assert_eq!(config.filtering.honor_terraform_sensitive, None);
        assert_eq!(config.filtering.omit_data_sources, None);
        Ok(())
    }

    #[test]
    fn test_empty_file_is_empty_config() -> Result<()> {
        assert_eq!(ProjectConfig::from_yaml_str("  \n")?, ProjectConfig::default());
        Ok(())
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        assert!(ProjectConfig::from_yaml_str("filtering: [not, a, map").is_err());
    }

    #[test]
    fn test_find_walks_up_to_parent() -> Result<()> {
        let root = tempdir()?;
        let nested = root.path().join("envs").join("prod");
        fs::create_dir_all(&nested)?;
        fs::write(root.path().join(".tfredact.yml"), "version: 1\n")?;

        let found = find_project_config(&nested);
        assert_eq!(found, Some(root.path().join(".tfredact.yml")));
        Ok(())
    }

    #[test]
    fn test_find_prefers_closest_directory_and_yaml_extension() -> Result<()> {
        let root = tempdir()?;
        let child = root.path().join("child");
        fs::create_dir_all(&child)?;
        fs::write(root.path().join(".tfredact.yaml"), "version: 1\n")?;
        fs::write(child.join(".tfredact.yml"), "version: 1\n")?;
        fs::write(child.join(".tfredact.yaml"), "version: 1\n")?;

        assert_eq!(find_project_config(&child), Some(child.join(".tfredact.yaml")));
        Ok(())
    }

    #[test]
    fn test_relative_start_climbs_past_the_working_directory() -> Result<()> {
        let root = tempdir()?;
        let cwd = root.path().join("a");
        fs::create_dir_all(cwd.join("b"))?;
        fs::write(root.path().join(".tfredact.yaml"), "version: 1\n")?;

        let found = find_project_config_from(Path::new("b"), &cwd);
        assert_eq!(found, Some(root.path().join(".tfredact.yaml")));
        Ok(())
    }

    #[test]
    fn test_load_from_file_names_the_file() -> Result<()> {
        let root = tempdir()?;
        let path = root.path().join(".tfredact.yaml");
        fs::write(&path, "filtering: [broken")?;
        let err = ProjectConfig::load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
        Ok(())
    }
}
