// tfredact-core/src/state.rs
//! Filtering of Terraform state documents.
//!
//! The walk is resources → instances → attributes, followed by the top-level outputs.
//! Resource and instance envelopes are typed (unknown fields ride along in a flattened
//! map); attribute trees stay untyped and go through [`ValueRedactor`].
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::engine::{DocumentFilter, DocumentKind};
use crate::errors::{FilterError, Result};
use crate::omission::{Omission, OmissionLog, REASON_SENSITIVE_OUTPUT};
use crate::policy::FilterPolicy;
use crate::redactor::{format_index_key, state_sensitive_names, Redacted, ValueRedactor};

const DOCUMENT: &str = "state";

/// One entry of a state's `resources` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StateResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default)]
    pub mode: String,
    #[serde(rename = "type", default)]
    pub resource_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instances: Vec<StateInstance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateResource {
    /// Terraform's address for the resource: `[module.]type.name`, with `data.` before
    /// the type for data sources.
    pub fn address(&self) -> String {
        let mut address = String::new();
        if let Some(module) = self.module.as_deref().filter(|m| !m.is_empty()) {
            address.push_str(module);
            address.push('.');
        }
        if self.mode == "data" {
            address.push_str("data.");
        }
        address.push_str(&self.resource_type);
        address.push('.');
        address.push_str(&self.name);
        address
    }
}

/// Treats an explicit `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Keeps an explicit `null` as `Some(Value::Null)`; only an absent field is `None`.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StateInstance {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub index_key: Option<Value>,
    #[serde(default)]
    pub attributes: Value,
    /// Pre-0.12 flatmap form (`"tags.%"`, `"ingress.0.cidr"`), still found in old states.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub attributes_flat: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sensitive_attributes: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filters Terraform state documents (`terraform show -json` of a state, or the raw
/// `terraform.tfstate` file).
#[derive(Debug, Clone, Copy)]
pub struct StateFilter<'p> {
    redactor: ValueRedactor<'p>,
}

impl<'p> StateFilter<'p> {
    pub fn new(policy: &'p FilterPolicy) -> Self {
        Self {
            redactor: ValueRedactor::new(policy),
        }
    }

    fn filter_resource(&self, mut resource: StateResource, log: &mut OmissionLog) -> Option<StateResource> {
        let address = resource.address();

        if let Some(omission) =
            self.redactor
                .resource_omission(&address, &resource.mode, &resource.resource_type)
        {
            debug!("Omitting resource {}: {}", address, omission.reason);
            log.record(omission);
            return None;
        }

        let count = resource.instances.len();
        resource.instances = std::mem::take(&mut resource.instances)
            .into_iter()
            .enumerate()
            .map(|(i, instance)| self.filter_instance(instance, &address, i, count, log))
            .collect();
        Some(resource)
    }

    fn filter_instance(
        &self,
        mut instance: StateInstance,
        address: &str,
        position: usize,
        count: usize,
        log: &mut OmissionLog,
    ) -> StateInstance {
        let path = match &instance.index_key {
            Some(key) if !key.is_null() => format!("{}{}", address, format_index_key(key)),
            _ if count > 1 => format!("{}[{}]", address, position),
            _ => address.to_string(),
        };

        let flagged = state_sensitive_names(&instance.sensitive_attributes);
        let attributes = std::mem::take(&mut instance.attributes);
        instance.attributes = self.redactor.redact_value(attributes, &path, &flagged, log);
        if let Some(Value::Object(flat)) = instance.attributes_flat.as_mut() {
            let taken = std::mem::take(flat);
            *flat = self.redactor.redact_flat_attributes(taken, &path, &flagged, log);
        }
        // The markers pointed at values that may no longer exist.
        instance.sensitive_attributes.clear();
        instance
    }
}

impl DocumentFilter for StateFilter<'_> {
    fn kind(&self) -> DocumentKind {
        DocumentKind::State
    }

    fn policy(&self) -> &FilterPolicy {
        self.redactor.policy()
    }

    fn validate(&self, doc: &Value) -> Result<()> {
        let root = doc
            .as_object()
            .ok_or_else(|| FilterError::invalid(DOCUMENT, "expected a JSON object"))?;
        if !root.contains_key("version") {
            return Err(FilterError::invalid(DOCUMENT, "missing required field 'version'"));
        }
        match root.get("resources") {
            Some(Value::Array(_)) => Ok(()),
            Some(_) => Err(FilterError::invalid(DOCUMENT, "'resources' must be an array")),
            None => Err(FilterError::invalid(DOCUMENT, "missing required field 'resources'")),
        }
    }

    fn filter_value(&self, doc: Value) -> Result<Redacted> {
        self.validate(&doc)?;
        let mut root = match doc {
            Value::Object(root) => root,
            _ => return Err(FilterError::invalid(DOCUMENT, "expected a JSON object")),
        };

        let resources = root.remove("resources").unwrap_or_default();
        let resources: Vec<StateResource> = serde_json::from_value(resources)
            .map_err(|e| FilterError::invalid(DOCUMENT, format!("malformed resource entry: {}", e)))?;

        let mut log = OmissionLog::default();
        log.summary.total_resources = resources.len();

        let kept: Vec<StateResource> = resources
            .into_iter()
            .filter_map(|resource| self.filter_resource(resource, &mut log))
            .collect();
        let kept = serde_json::to_value(kept)
            .map_err(|source| FilterError::Serialization { document: DOCUMENT, source })?;
        root.insert("resources".to_string(), kept);

        filter_outputs_in_place(&self.redactor, &mut root, "outputs", &mut log);

        debug!(
            "Filtered state: {}/{} resources omitted, {} attribute omissions.",
            log.summary.omitted_resources, log.summary.total_resources, log.summary.omitted_attributes
        );
        Ok(Redacted::from_log(Value::Object(root), log))
    }
}

/// Filters `container["outputs"]` when it is an object; any other value is left as is.
pub(crate) fn filter_outputs_in_place(
    redactor: &ValueRedactor<'_>,
    container: &mut Map<String, Value>,
    prefix: &str,
    log: &mut OmissionLog,
) {
    if let Some(Value::Object(outputs)) = container.get_mut("outputs") {
        let taken = std::mem::take(outputs);
        *outputs = filter_outputs(redactor, taken, prefix, log);
    }
}

/// Name-only filtering of an outputs map. Values are not descended into; an output
/// whose object carries `sensitive: true` is dropped regardless of its name.
fn filter_outputs(
    redactor: &ValueRedactor<'_>,
    outputs: Map<String, Value>,
    prefix: &str,
    log: &mut OmissionLog,
) -> Map<String, Value> {
    let mut kept = Map::new();
    for (name, output) in outputs {
        log.summary.total_attributes += 1;
        let path = format!("{}.{}", prefix, name);

        if let Some(omission) = redactor.name_omission(&name, &path) {
            log.record(omission);
            continue;
        }
        if output.get("sensitive").and_then(Value::as_bool) == Some(true) {
            log.record(Omission::attribute(path, REASON_SENSITIVE_OUTPUT, false));
            continue;
        }
        kept.insert(name, output);
    }
    kept
}
