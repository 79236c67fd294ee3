// tfredact-core/src/plan.rs
//! Filtering of Terraform plan documents (`terraform show -json <planfile>`).
//!
//! A plan carries the same secrets in several places, and each one is filtered:
//!
//! * `resource_changes[].change.before` / `.after`, and the same shape in `resource_drift`
//! * `planned_values.root_module` and its nested `child_modules`
//! * `planned_values.outputs`, `output_changes` and top-level `variables`
//! * `prior_state`, delegated to [`StateFilter`] when it is state-shaped
//!
//! Every resource entry that passes the resource gate, in any section, counts toward
//! `total_resources`, so the omitted count can never exceed the total.
//!
//! License: MIT OR APACHE 2.0

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::{DocumentFilter, DocumentKind};
use crate::errors::{FilterError, Result};
use crate::omission::{Omission, OmissionLog, REASON_SENSITIVE_OUTPUT};
use crate::policy::FilterPolicy;
use crate::redactor::{plan_sensitive_names, Redacted, ValueRedactor};
use crate::state::{filter_outputs_in_place, StateFilter};

const DOCUMENT: &str = "plan";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResourceChange {
    #[serde(default)]
    address: String,
    #[serde(default)]
    mode: String,
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    change: Option<Change>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Change {
    #[serde(default)]
    before: Value,
    #[serde(default)]
    after: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    before_sensitive: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    after_sensitive: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// A module in the "values" representation used by `planned_values` and by a
/// `prior_state` rendered with `terraform show -json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ValuesModule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resources: Option<Vec<ValuesResource>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    child_modules: Option<Vec<ValuesModule>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ValuesResource {
    #[serde(default)]
    address: String,
    #[serde(default)]
    mode: String,
    #[serde(rename = "type", default)]
    resource_type: String,
    #[serde(default)]
    values: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sensitive_values: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// True when a sensitivity marker flags anything: `true` itself or any `true` nested in
/// an object or array marker.
fn marks_sensitive(marker: &Value) -> bool {
    match marker {
        Value::Bool(flag) => *flag,
        Value::Array(items) => items.iter().any(marks_sensitive),
        Value::Object(map) => map.values().any(marks_sensitive),
        _ => false,
    }
}

/// Filters Terraform plan documents.
#[derive(Debug, Clone, Copy)]
pub struct PlanFilter<'p> {
    redactor: ValueRedactor<'p>,
}

impl<'p> PlanFilter<'p> {
    pub fn new(policy: &'p FilterPolicy) -> Self {
        Self {
            redactor: ValueRedactor::new(policy),
        }
    }

    /// Parses and filters a `resource_changes`-shaped array (`resource_changes`,
    /// `resource_drift`).
    fn filter_changes(&self, section: &str, changes: Value, log: &mut OmissionLog) -> Result<Value> {
        let changes: Vec<ResourceChange> = serde_json::from_value(changes).map_err(|e| {
            FilterError::invalid(DOCUMENT, format!("malformed entry in '{}': {}", section, e))
        })?;
        log.summary.total_resources += changes.len();
        let kept: Vec<ResourceChange> = changes
            .into_iter()
            .filter_map(|rc| self.filter_change(rc, log))
            .collect();
        to_value(&kept)
    }

    fn filter_change(&self, mut rc: ResourceChange, log: &mut OmissionLog) -> Option<ResourceChange> {
        if let Some(omission) = self
            .redactor
            .resource_omission(&rc.address, &rc.mode, &rc.resource_type)
        {
            debug!("Omitting change {}: {}", rc.address, omission.reason);
            log.record(omission);
            return None;
        }

        if let Some(change) = rc.change.as_mut() {
            let flagged = plan_sensitive_names([
                change.before_sensitive.as_ref(),
                change.after_sensitive.as_ref(),
            ]);
            let before = std::mem::take(&mut change.before);
            change.before = self.redactor.redact_value(
                before,
                &format!("{}.before", rc.address),
                &flagged,
                log,
            );
            let after = std::mem::take(&mut change.after);
            change.after = self.redactor.redact_value(
                after,
                &format!("{}.after", rc.address),
                &flagged,
                log,
            );
            change.before_sensitive = None;
            change.after_sensitive = None;
        }
        Some(rc)
    }

    /// Depth-first walk of a values-representation module tree.
    fn filter_module(&self, mut module: ValuesModule, log: &mut OmissionLog) -> ValuesModule {
        if let Some(resources) = module.resources.take() {
            log.summary.total_resources += resources.len();
            module.resources = Some(
                resources
                    .into_iter()
                    .filter_map(|resource| self.filter_values_resource(resource, log))
                    .collect(),
            );
        }
        if let Some(children) = module.child_modules.take() {
            module.child_modules = Some(
                children
                    .into_iter()
                    .map(|child| self.filter_module(child, log))
                    .collect(),
            );
        }
        module
    }

    fn filter_values_resource(&self, mut resource: ValuesResource, log: &mut OmissionLog) -> Option<ValuesResource> {
        if let Some(omission) =
            self.redactor
                .resource_omission(&resource.address, &resource.mode, &resource.resource_type)
        {
            log.record(omission);
            return None;
        }

        let flagged = plan_sensitive_names([resource.sensitive_values.as_ref()]);
        let values = std::mem::take(&mut resource.values);
        resource.values = self
            .redactor
            .redact_value(values, &resource.address, &flagged, log);
        resource.sensitive_values = None;
        Some(resource)
    }

    /// Filters a `{root_module, outputs}` values object in place.
    fn filter_values_object(
        &self,
        values: &mut Map<String, Value>,
        outputs_prefix: &str,
        log: &mut OmissionLog,
    ) -> Result<()> {
        if let Some(root) = values.remove("root_module") {
            let root: ValuesModule = serde_json::from_value(root).map_err(|e| {
                FilterError::invalid(DOCUMENT, format!("malformed module in {}: {}", outputs_prefix, e))
            })?;
            let root = self.filter_module(root, log);
            values.insert("root_module".to_string(), to_value(&root)?);
        }
        filter_outputs_in_place(&self.redactor, values, outputs_prefix, log);
        Ok(())
    }

    /// Name check for each `output_changes` entry, then drops entries whose
    /// `before_sensitive` or `after_sensitive` flags anything.
    fn filter_output_changes(&self, changes: Map<String, Value>, log: &mut OmissionLog) -> Map<String, Value> {
        let mut kept = Map::new();
        for (name, change) in changes {
            log.summary.total_attributes += 1;
            let path = format!("output_changes.{}", name);

            if let Some(omission) = self.redactor.name_omission(&name, &path) {
                log.record(omission);
                continue;
            }
            let flagged = ["before_sensitive", "after_sensitive"]
                .iter()
                .filter_map(|key| change.get(*key))
                .any(marks_sensitive);
            if flagged {
                log.record(Omission::attribute(path, REASON_SENSITIVE_OUTPUT, false));
                continue;
            }
            kept.insert(name, change);
        }
        kept
    }

    fn filter_variables(&self, variables: Map<String, Value>, log: &mut OmissionLog) -> Map<String, Value> {
        let mut kept = Map::new();
        for (name, value) in variables {
            log.summary.total_attributes += 1;
            let path = format!("variables.{}", name);
            match self.redactor.name_omission(&name, &path) {
                Some(omission) => log.record(omission),
                None => {
                    kept.insert(name, value);
                }
            }
        }
        kept
    }

    /// Filters an embedded prior state and folds its decisions into `log`.
    ///
    /// A raw state (`version` + `resources`) goes through [`StateFilter`]; the
    /// `values.root_module` representation goes through the module walker. Any other
    /// shape is rejected rather than passed through unfiltered.
    fn filter_prior_state(&self, prior: Value, log: &mut OmissionLog) -> Result<Value> {
        let state_filter = StateFilter::new(self.redactor.policy());
        if state_filter.validate(&prior).is_ok() {
            let redacted = state_filter.filter_value(prior)?;
            log.merge(redacted.omissions, &redacted.summary);
            return Ok(redacted.value);
        }

        let mut prior = match prior {
            Value::Object(prior) => prior,
            Value::Null => return Ok(Value::Null),
            _ => return Err(FilterError::invalid(DOCUMENT, "'prior_state' must be an object")),
        };
        match prior.remove("values") {
            Some(Value::Object(mut values)) => {
                let mut prior_log = OmissionLog::default();
                self.filter_values_object(&mut values, "prior_state.values.outputs", &mut prior_log)?;
                log.merge(prior_log.omissions, &prior_log.summary);
                prior.insert("values".to_string(), Value::Object(values));
                Ok(Value::Object(prior))
            }
            None if prior.is_empty() => Ok(Value::Object(prior)),
            _ => Err(FilterError::invalid(
                DOCUMENT,
                "'prior_state' is neither a state document nor a values representation",
            )),
        }
    }
}

impl DocumentFilter for PlanFilter<'_> {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Plan
    }

    fn policy(&self) -> &FilterPolicy {
        self.redactor.policy()
    }

    fn validate(&self, doc: &Value) -> Result<()> {
        let root = doc
            .as_object()
            .ok_or_else(|| FilterError::invalid(DOCUMENT, "expected a JSON object"))?;
        match root.get("resource_changes") {
            Some(Value::Array(_)) => Ok(()),
            Some(_) => Err(FilterError::invalid(DOCUMENT, "'resource_changes' must be an array")),
            None if root.contains_key("resources") => Err(FilterError::invalid(
                DOCUMENT,
                "missing 'resource_changes'; this looks like a state file, use the state command",
            )),
            None => Err(FilterError::invalid(
                DOCUMENT,
                "missing required field 'resource_changes'",
            )),
        }
    }

    fn filter_value(&self, doc: Value) -> Result<Redacted> {
        self.validate(&doc)?;
        let mut root = match doc {
            Value::Object(root) => root,
            _ => return Err(FilterError::invalid(DOCUMENT, "expected a JSON object")),
        };
        let mut log = OmissionLog::default();

        for section in ["resource_changes", "resource_drift"] {
            match root.remove(section) {
                Some(Value::Null) => {
                    root.insert(section.to_string(), Value::Null);
                }
                Some(changes) => {
                    let kept = self.filter_changes(section, changes, &mut log)?;
                    root.insert(section.to_string(), kept);
                }
                None => {}
            }
        }

        if let Some(Value::Object(planned)) = root.get_mut("planned_values") {
            self.filter_values_object(planned, "planned_values.outputs", &mut log)?;
        }

        if let Some(Value::Object(changes)) = root.get_mut("output_changes") {
            let taken = std::mem::take(changes);
            *changes = self.filter_output_changes(taken, &mut log);
        }

        if let Some(prior) = root.remove("prior_state") {
            let prior = self.filter_prior_state(prior, &mut log)?;
            root.insert("prior_state".to_string(), prior);
        }

        if let Some(Value::Object(variables)) = root.get_mut("variables") {
            let taken = std::mem::take(variables);
            *variables = self.filter_variables(taken, &mut log);
        }

        debug!(
            "Filtered plan: {} omissions across {} resource entries.",
            log.omissions.len(),
            log.summary.total_resources
        );
        Ok(Redacted::from_log(Value::Object(root), log))
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|source| FilterError::Serialization {
        document: DOCUMENT,
        source,
    })
}
