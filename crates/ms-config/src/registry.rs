//! Schema registry: the recognized module and variable fields.
//!
//! Two projections of the same field set live side by side:
//!
//! 1. **Flat field lists** ([`MODULE_FIELDS`], [`VARIABLE_FIELDS`]) consumed by
//!    the data collector. Maintained by hand.
//! 2. **Structured template** ([`schema_template`]) consumed by the UI. Derived
//!    from the record types in [`crate::model`] via `schemars`, with `$ref`s
//!    inlined so every property descriptor sits under its parent.
//!
//! [`check_consistency`] reports any drift between the two. It never edits
//! either side.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Configuration;

/// Module attributes known to the data collector.
pub const MODULE_FIELDS: &[&str] = &[
    "name",
    "enabled",
    "order",
    "prompt",
    "contentPrompt",
    "timingPrompt",
    "positionPrompt",
    "outputPosition",
    "outputMode",
    "rangeMode",
    "retainLayers",
    "itemMin",
    "itemMax",
    "compatibleModuleNames",
    "timeReferenceStandard",
];

/// Variable attributes known to the data collector.
pub const VARIABLE_FIELDS: &[&str] = &[
    "name",
    "displayName",
    "description",
    "compatibleVariableNames",
    "isIdentifier",
    "isBackupIdentifier",
    "isHideCondition",
    "hideConditionValues",
    "enabled",
];

/// Module properties that hold nested records rather than attributes.
/// They appear in the template but never in the flat lists.
pub const STRUCTURAL_MODULE_FIELDS: &[&str] = &["variables"];

/// Flat field lists, owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedFields {
    pub module_fields: Vec<String>,
    pub variable_fields: Vec<String>,
}

/// The authoritative flat field lists.
pub fn supported_fields() -> SupportedFields {
    SupportedFields {
        module_fields: MODULE_FIELDS.iter().map(|s| s.to_string()).collect(),
        variable_fields: VARIABLE_FIELDS.iter().map(|s| s.to_string()).collect(),
    }
}

/// The structured schema template for a configuration document.
///
/// Shape (abridged):
///
/// ```text
/// { "type": "object",
///   "properties": { "modules": { "type": "array", "items": {
///       "properties": { "name": {...}, ..., "variables": { "items": {
///           "properties": { "name": {...}, ... } } } } } } } }
/// ```
pub fn schema_template() -> Value {
    let schema = Value::from(schemars::schema_for!(Configuration));
    inline_definitions(schema)
}

fn inline_definitions(mut root: Value) -> Value {
    let defs = match root.as_object_mut() {
        Some(obj) => {
            obj.remove("$schema");
            let mut defs = Map::new();
            for key in ["$defs", "definitions"] {
                if let Some(Value::Object(found)) = obj.remove(key) {
                    defs.extend(found);
                }
            }
            defs
        }
        None => return root,
    };
    resolve_refs(root, &defs)
}

fn resolve_refs(value: Value, defs: &Map<String, Value>) -> Value {
    match value {
        Value::Object(mut obj) => {
            if let Some(Value::String(reference)) = obj.remove("$ref") {
                let name = reference
                    .strip_prefix("#/$defs/")
                    .or_else(|| reference.strip_prefix("#/definitions/"));
                if let Some(Value::Object(target)) = name.and_then(|n| defs.get(n)) {
                    let mut merged = target.clone();
                    // sibling keywords (description, default) take precedence
                    merged.extend(obj);
                    return resolve_refs(Value::Object(merged), defs);
                }
                obj.insert("$ref".to_string(), Value::String(reference));
            }
            Value::Object(
                obj.into_iter()
                    .map(|(k, v)| (k, resolve_refs(v, defs)))
                    .collect(),
            )
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|v| resolve_refs(v, defs)).collect())
        }
        other => other,
    }
}

fn property_names(node: Option<&Value>) -> BTreeSet<String> {
    node.and_then(|n| n.get("properties"))
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().collect())
        .unwrap_or_default()
}

fn module_item(template: &Value) -> Option<&Value> {
    template.pointer("/properties/modules/items")
}

/// Module attribute names declared by a template (structural fields excluded).
pub fn template_module_fields(template: &Value) -> BTreeSet<String> {
    let mut names = property_names(module_item(template));
    for structural in STRUCTURAL_MODULE_FIELDS {
        names.remove(*structural);
    }
    names
}

/// Variable attribute names declared by a template.
pub fn template_variable_fields(template: &Value) -> BTreeSet<String> {
    let variable_item =
        module_item(template).and_then(|m| m.pointer("/properties/variables/items"));
    property_names(variable_item)
}

/// Drift between the flat lists and the structured template.
///
/// "Missing" fields are declared by the template but absent from the flat
/// list; "extra" fields are in the flat list but not in the template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftReport {
    pub module_fields_missing: BTreeSet<String>,
    pub module_fields_extra: BTreeSet<String>,
    pub variable_fields_missing: BTreeSet<String>,
    pub variable_fields_extra: BTreeSet<String>,
}

impl DriftReport {
    /// All four sets empty.
    pub fn is_consistent(&self) -> bool {
        self.module_fields_missing.is_empty()
            && self.module_fields_extra.is_empty()
            && self.variable_fields_missing.is_empty()
            && self.variable_fields_extra.is_empty()
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for DriftReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_consistent() {
            return write!(f, "field lists and schema template are consistent");
        }
        write!(f, "schema drift detected")?;
        let sections = [
            ("module fields missing from list", &self.module_fields_missing),
            ("module fields not in template", &self.module_fields_extra),
            ("variable fields missing from list", &self.variable_fields_missing),
            ("variable fields not in template", &self.variable_fields_extra),
        ];
        for (label, set) in sections {
            if !set.is_empty() {
                write!(f, "; {label}: {}", join(set))?;
            }
        }
        Ok(())
    }
}

fn diff(list: &[String], declared: &BTreeSet<String>) -> (BTreeSet<String>, BTreeSet<String>) {
    let listed: BTreeSet<String> = list.iter().cloned().collect();
    let missing = declared.difference(&listed).cloned().collect();
    let extra = listed.difference(declared).cloned().collect();
    (missing, extra)
}

/// Compare arbitrary flat lists against an arbitrary template.
pub fn check_consistency_between(fields: &SupportedFields, template: &Value) -> DriftReport {
    let (module_fields_missing, module_fields_extra) =
        diff(&fields.module_fields, &template_module_fields(template));
    let (variable_fields_missing, variable_fields_extra) =
        diff(&fields.variable_fields, &template_variable_fields(template));

    let report = DriftReport {
        module_fields_missing,
        module_fields_extra,
        variable_fields_missing,
        variable_fields_extra,
    };
    if !report.is_consistent() {
        tracing::warn!(%report, "schema drift");
    }
    report
}

/// Compare the built-in flat lists against the built-in template.
pub fn check_consistency() -> DriftReport {
    check_consistency_between(&supported_fields(), &schema_template())
}

/// Whether `field` is a recognized module key in a document (attribute or
/// structural).
pub fn is_known_module_key(field: &str) -> bool {
    MODULE_FIELDS.contains(&field) || STRUCTURAL_MODULE_FIELDS.contains(&field)
}

/// Whether `field` is a recognized variable key in a document.
pub fn is_known_variable_key(field: &str) -> bool {
    VARIABLE_FIELDS.contains(&field)
}
