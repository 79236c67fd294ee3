// tfredact-core/src/redactor.rs
//! The recursive redactor shared by the state and plan filters.
//!
//! Terraform attribute schemas are provider-defined, so the traversal works on plain
//! `serde_json::Value` trees. Both document filters route every object they do not
//! understand structurally through [`ValueRedactor`]; that keeps the precedence rules
//! identical everywhere.
//!
//! Decision order for an object key (first match wins):
//!
//! 1. preserved name: kept, descendants still filtered;
//! 2. platform attribute pattern: omitted, attributed to the platform;
//! 3. project/default attribute pattern: omitted;
//! 4. provider-flagged name (when markers are honored): omitted;
//! 5. otherwise kept, recursing into objects and arrays.
//!
//! Resource-type checks happen once per resource in [`ValueRedactor::resource_omission`].

use log::trace;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::omission::{
    FilterSummary, Omission, OmissionLog, REASON_DATA_SOURCE, REASON_TERRAFORM_SENSITIVE,
};
use crate::policy::FilterPolicy;

/// Attribute names a provider flagged as sensitive for the value being filtered.
pub type SensitiveSet = HashSet<String>;

/// Output of [`ValueRedactor::redact`].
#[derive(Debug, Clone, PartialEq)]
pub struct Redacted {
    pub value: Value,
    pub omissions: Vec<Omission>,
    pub summary: FilterSummary,
}

impl Redacted {
    pub(crate) fn from_log(value: Value, log: OmissionLog) -> Self {
        Self {
            value,
            omissions: log.omissions,
            summary: log.summary,
        }
    }
}

/// Policy-bound redactor for untyped JSON trees.
#[derive(Debug, Clone, Copy)]
pub struct ValueRedactor<'p> {
    policy: &'p FilterPolicy,
}

impl<'p> ValueRedactor<'p> {
    pub fn new(policy: &'p FilterPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &'p FilterPolicy {
        self.policy
    }

    /// Redacts `value`, addressing omissions relative to `base_path`.
    pub fn redact(&self, value: Value, base_path: &str, sensitive: &SensitiveSet) -> Redacted {
        let mut log = OmissionLog::default();
        let value = self.redact_value(value, base_path, sensitive, &mut log);
        Redacted::from_log(value, log)
    }

    pub(crate) fn redact_value(
        &self,
        value: Value,
        path: &str,
        sensitive: &SensitiveSet,
        log: &mut OmissionLog,
    ) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.redact_object(map, path, sensitive, log)),
            Value::Array(items) => Value::Array(self.redact_array(items, path, sensitive, log)),
            scalar => scalar,
        }
    }

    pub(crate) fn redact_object(
        &self,
        attrs: Map<String, Value>,
        base_path: &str,
        sensitive: &SensitiveSet,
        log: &mut OmissionLog,
    ) -> Map<String, Value> {
        let mut filtered = Map::new();

        for (key, value) in attrs {
            log.summary.total_attributes += 1;
            let attr_path = format!("{}.{}", base_path, key);

            if !self.policy.is_preserved(&key) {
                if let Some(omission) = self.key_omission(&key, &attr_path, sensitive) {
                    trace!("Omitting {} ({})", omission.path, omission.reason);
                    log.record(omission);
                    continue;
                }
            }

            let value = self.redact_value(value, &attr_path, sensitive, log);
            filtered.insert(key, value);
        }

        filtered
    }

    fn redact_array(
        &self,
        items: Vec<Value>,
        base_path: &str,
        sensitive: &SensitiveSet,
        log: &mut OmissionLog,
    ) -> Vec<Value> {
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(_) | Value::Array(_) => {
                    let item_path = format!("{}[{}]", base_path, i);
                    self.redact_value(item, &item_path, sensitive, log)
                }
                scalar => scalar,
            })
            .collect()
    }

    /// Redacts a legacy flatmap (`"settings.db_password" = "x"`). Every dotted segment
    /// is checked like a nested key, so a key goes when any non-preserved segment
    /// matches; provider markers only apply to the first segment.
    pub(crate) fn redact_flat_attributes(
        &self,
        flat: Map<String, Value>,
        base_path: &str,
        sensitive: &SensitiveSet,
        log: &mut OmissionLog,
    ) -> Map<String, Value> {
        let mut filtered = Map::new();
        for (key, value) in flat {
            log.summary.total_attributes += 1;
            let attr_path = format!("{}.{}", base_path, key);
            match self.flat_key_omission(&key, &attr_path, sensitive) {
                Some(omission) => {
                    trace!("Omitting {} ({})", omission.path, omission.reason);
                    log.record(omission);
                }
                None => {
                    filtered.insert(key, value);
                }
            }
        }
        filtered
    }

    fn flat_key_omission(&self, key: &str, path: &str, sensitive: &SensitiveSet) -> Option<Omission> {
        let empty = SensitiveSet::new();
        key.split('.')
            .enumerate()
            .filter(|(_, segment)| !self.policy.is_preserved(segment))
            .find_map(|(i, segment)| {
                let markers = if i == 0 { sensitive } else { &empty };
                self.key_omission(segment, path, markers)
            })
    }

    fn key_omission(&self, key: &str, path: &str, sensitive: &SensitiveSet) -> Option<Omission> {
        if let Some(hit) = self.policy.match_attribute(key) {
            return Some(Omission::attribute(
                path,
                format!("matches pattern '{}'", hit.pattern),
                hit.from_platform,
            ));
        }
        if self.policy.honor_sensitive_markers && sensitive.contains(key) {
            return Some(Omission::attribute(path, REASON_TERRAFORM_SENSITIVE, false));
        }
        None
    }

    /// Name-only check for outputs and variables: preserve, then platform and
    /// project patterns. No descent into the value.
    pub fn name_omission(&self, name: &str, path: &str) -> Option<Omission> {
        if self.policy.is_preserved(name) {
            return None;
        }
        self.policy.match_attribute(name).map(|hit| {
            Omission::attribute(
                path,
                format!("matches pattern '{}'", hit.pattern),
                hit.from_platform,
            )
        })
    }

    /// Resource-level gate: data source, then platform type list, then the
    /// project/default type list.
    pub fn resource_omission(&self, address: &str, mode: &str, resource_type: &str) -> Option<Omission> {
        if self.policy.omit_data_sources && mode == "data" {
            return Some(Omission::resource(address, REASON_DATA_SOURCE, false));
        }
        self.policy
            .match_resource_type(resource_type)
            .map(|from_platform| {
                Omission::resource(
                    address,
                    format!("resource type '{}' is in omit list", resource_type),
                    from_platform,
                )
            })
    }
}

/// Formats an instance key the way Terraform addresses do: `[0]` or `["blue"]`.
/// String keys are JSON-quoted.
pub fn format_index_key(key: &Value) -> String {
    format!("[{}]", key)
}

/// Reduces a state instance's `sensitive_attributes` (a list of step paths such as
/// `[{"type":"get_attr","value":"password"}]`) to the top-level attribute names.
pub fn state_sensitive_names(markers: &[Value]) -> SensitiveSet {
    markers
        .iter()
        .filter_map(|path| path.as_array()?.first())
        .filter(|step| step.get("type").and_then(Value::as_str) == Some("get_attr"))
        .filter_map(|step| step.get("value").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Union of the top-level `true` entries of plan sensitivity maps
/// (`before_sensitive`, `after_sensitive`, `sensitive_values`).
pub fn plan_sensitive_names<'a>(markers: impl IntoIterator<Item = Option<&'a Value>>) -> SensitiveSet {
    markers
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .flat_map(|map| map.iter())
        .filter(|(_, flag)| flag.as_bool() == Some(true))
        .map(|(name, _)| name.clone())
        .collect()
}
