//! platform.rs - Account-level filtering rules supplied by the remote service.
//!
//! The service publishes its filtering settings inside a discovery document. This
//! module owns the typed boundary for that fragment and an explicit, caller-owned
//! cache for it. Fetching the document is the caller's business; the cache only
//! decides whether a previously loaded fragment is still fresh.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::errors::{FilterError, Result};

/// Default lifetime of a cached fragment.
pub const DEFAULT_FRAGMENT_TTL: Duration = Duration::from_secs(60 * 60);

fn default_available() -> bool {
    true
}

/// Filtering rules configured in the organization's account settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformFragment {
    /// When false the fragment contributes nothing to the policy.
    #[serde(default = "default_available")]
    pub available: bool,
    /// Filtering may not be disabled by the caller.
    #[serde(default)]
    pub enforced: bool,
    #[serde(default)]
    pub additional_omit_types: Vec<String>,
    #[serde(default)]
    pub additional_omit_attributes: Vec<String>,
}

impl Default for PlatformFragment {
    fn default() -> Self {
        Self {
            available: true,
            enforced: false,
            additional_omit_types: Vec::new(),
            additional_omit_attributes: Vec::new(),
        }
    }
}

impl PlatformFragment {
    /// Parses either a full discovery document
    /// (`{"features":{"sensitiveFiltering":{..}}}`) or a bare fragment object.
    ///
    /// A discovery document without a `sensitiveFiltering` feature yields an
    /// unavailable fragment.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let doc: Value = serde_json::from_slice(bytes).map_err(|source| FilterError::InvalidJson {
            document: "platform fragment",
            source,
        })?;

        let fragment_value = match doc.get("features") {
            Some(features) => match features.get("sensitiveFiltering") {
                Some(section) => section.clone(),
                None => {
                    debug!("Discovery document has no sensitiveFiltering feature.");
                    return Ok(Self {
                        available: false,
                        ..Self::default()
                    });
                }
            },
            None => doc,
        };

        serde_json::from_value(fragment_value)
            .map_err(|e| FilterError::invalid("platform fragment", e.to_string()))
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_json(&bytes)
    }

    /// True when the fragment adds any omit rule.
    pub fn has_rules(&self) -> bool {
        self.available
            && (!self.additional_omit_types.is_empty() || !self.additional_omit_attributes.is_empty())
    }
}

#[derive(Debug)]
struct CachedFragment {
    source_key: String,
    loaded_at: Instant,
    fragment: Arc<PlatformFragment>,
}

/// A time-bounded cache for one platform fragment.
///
/// Entries are keyed by their source (typically the service base URL) so switching
/// sources never serves a stale fragment from another account.
#[derive(Debug)]
pub struct FragmentCache {
    ttl: Duration,
    slot: RwLock<Option<CachedFragment>>,
}

impl Default for FragmentCache {
    fn default() -> Self {
        Self::new(DEFAULT_FRAGMENT_TTL)
    }
}

impl FragmentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Returns the cached fragment for `source_key` if it is younger than the TTL.
    pub fn get(&self, source_key: &str) -> Option<Arc<PlatformFragment>> {
        let guard = self.slot.read().ok()?;
        guard.as_ref().and_then(|cached| {
            let fresh = cached.source_key == source_key && cached.loaded_at.elapsed() < self.ttl;
            fresh.then(|| Arc::clone(&cached.fragment))
        })
    }

    /// Stores `fragment` as the current entry, replacing any previous one.
    pub fn insert(&self, source_key: &str, fragment: PlatformFragment) -> Arc<PlatformFragment> {
        let fragment = Arc::new(fragment);
        if let Ok(mut guard) = self.slot.write() {
            *guard = Some(CachedFragment {
                source_key: source_key.to_string(),
                loaded_at: Instant::now(),
                fragment: Arc::clone(&fragment),
            });
        }
        fragment
    }

    /// Returns the fresh cached fragment or runs `load` and caches its result.
    ///
    /// Load failures are returned as-is and leave the cache untouched.
    pub fn get_or_load<F>(&self, source_key: &str, load: F) -> Result<Arc<PlatformFragment>>
    where
        F: FnOnce() -> Result<PlatformFragment>,
    {
        if let Some(hit) = self.get(source_key) {
            debug!("Platform fragment cache hit for '{}'.", source_key);
            return Ok(hit);
        }
        debug!("Platform fragment cache miss for '{}'; loading.", source_key);
        let fragment = load()?;
        Ok(self.insert(source_key, fragment))
    }

    /// Drops the cached entry. Used by tests and when the service URL changes.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.slot.write() {
            *guard = None;
        }
    }
}
