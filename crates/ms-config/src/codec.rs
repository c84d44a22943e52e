//! Export/import of configuration documents.
//!
//! The document is pretty-printed JSON with the modules under a top-level
//! `modules` key and an optional `formatVersion` string:
//!
//! ```json
//! {
//!   "formatVersion": "1.0.0",
//!   "modules": [ { "name": "A", "enabled": true, "variables": [] } ]
//! }
//! ```
//!
//! Reading validates shape before anything else: the text must parse, the
//! top level must be an object, `modules` must be present and an array, each
//! record must match its type, and names must be unique. Any violation
//! rejects the whole document. Reading never merges.

use ms_common::schema::is_compatible;
use ms_common::{Error, Result, FORMAT_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{Configuration, ModuleRecord};
use crate::registry::{is_known_module_key, is_known_variable_key};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut<'a> {
    format_version: &'a str,
    modules: &'a [ModuleRecord],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentIn {
    #[serde(default)]
    format_version: Option<String>,
    modules: Vec<ModuleRecord>,
}

/// Render a configuration as a document.
pub fn serialize(configuration: &Configuration) -> Result<String> {
    let doc = DocumentOut {
        format_version: FORMAT_VERSION,
        modules: &configuration.modules,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parse a document into a configuration.
///
/// # Errors
///
/// [`Error::MalformedConfig`] for any shape violation,
/// [`Error::UnsupportedFormatVersion`] for an incompatible `formatVersion`.
pub fn deserialize(text: &str) -> Result<Configuration> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::malformed(format!("not valid JSON: {e}")))?;
    deserialize_value(value)
}

/// Like [`deserialize`], for an already-parsed value.
pub fn deserialize_value(value: Value) -> Result<Configuration> {
    check_shape(&value)?;
    report_unknown_keys(&value);

    let doc: DocumentIn =
        serde_json::from_value(value).map_err(|e| Error::malformed(e.to_string()))?;

    if let Some(version) = &doc.format_version {
        if !is_compatible(version) {
            return Err(Error::UnsupportedFormatVersion(version.clone()));
        }
    }

    let configuration = Configuration::new(doc.modules);
    configuration
        .validate()
        .map_err(|e| Error::malformed(e.to_string()))?;

    debug!(
        modules = configuration.modules.len(),
        "parsed configuration document"
    );
    Ok(configuration)
}

fn check_shape(value: &Value) -> Result<()> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::malformed("top-level value must be an object"))?;
    let modules = obj
        .get("modules")
        .ok_or_else(|| Error::malformed("missing `modules` field"))?;
    if !modules.is_array() {
        return Err(Error::malformed("`modules` must be an array"));
    }
    if let Some(version) = obj.get("formatVersion") {
        if !version.is_string() {
            return Err(Error::malformed("`formatVersion` must be a string"));
        }
    }
    Ok(())
}

/// Unknown keys are ignored by the record types; say so in the log so a
/// newer document read by an older build does not lose fields silently.
fn report_unknown_keys(value: &Value) {
    let Some(modules) = value.get("modules").and_then(Value::as_array) else {
        return;
    };
    for module in modules.iter().filter_map(Value::as_object) {
        let name = module.get("name").and_then(Value::as_str).unwrap_or("?");
        for key in module.keys().filter(|k| !is_known_module_key(k)) {
            warn!(module = name, field = %key, "ignoring unknown module field");
        }
        let variables = module.get("variables").and_then(Value::as_array);
        for variable in variables.into_iter().flatten().filter_map(Value::as_object) {
            for key in variable.keys().filter(|k| !is_known_variable_key(k)) {
                warn!(module = name, field = %key, "ignoring unknown variable field");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VariableRecord;

    fn sample() -> Configuration {
        let mut m = ModuleRecord::new("A")
            .with_enabled(false)
            .with_order(2.0)
            .with_prompt("summarize")
            .with_variables(vec![
                VariableRecord::new("v1").with_display_name("First"),
                VariableRecord::new("v2").with_enabled(false),
            ]);
        m.time_reference_standard = Some(true);
        Configuration::new(vec![m, ModuleRecord::new("B")])
    }

    fn assert_malformed(text: &str) {
        match deserialize(text) {
            Err(Error::MalformedConfig { .. }) => {}
            other => panic!("expected malformed for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_roundtrip() {
        let cfg = sample();
        let text = serialize(&cfg).unwrap();
        assert_eq!(deserialize(&text).unwrap(), cfg);
    }

    #[test]
    fn test_serialized_form_is_pretty_and_wrapped() {
        let text = serialize(&sample()).unwrap();
        assert!(text.contains('\n'));
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["formatVersion"], FORMAT_VERSION);
        assert_eq!(value["modules"][0]["name"], "A");
        assert_eq!(value["modules"][0]["variables"][0]["displayName"], "First");
    }

    #[test]
    fn test_empty_configuration_roundtrip() {
        let text = serialize(&Configuration::default()).unwrap();
        assert_eq!(deserialize(&text).unwrap(), Configuration::default());
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert_malformed("{not json");
        assert_malformed("");
    }

    #[test]
    fn test_rejects_missing_modules() {
        assert_malformed(r#"{"items": []}"#);
    }

    #[test]
    fn test_rejects_non_array_modules() {
        assert_malformed(r#"{"modules": {"A": {}}}"#);
        assert_malformed(r#"{"modules": null}"#);
        assert_malformed(r#"{"modules": "A"}"#);
    }

    #[test]
    fn test_rejects_non_object_top_level() {
        assert_malformed(r#"[{"name": "A"}]"#);
        assert_malformed("42");
    }

    #[test]
    fn test_rejects_bad_records_wholesale() {
        assert_malformed(r#"{"modules": [{"name": "A"}, {"enabled": true}]}"#);
        assert_malformed(r#"{"modules": [{"name": "A", "enabled": "yes"}]}"#);
        assert_malformed(r#"{"modules": [{"name": "A", "variables": [{"name": 3}]}]}"#);
    }

    #[test]
    fn test_rejects_duplicate_names() {
        assert_malformed(r#"{"modules": [{"name": "A"}, {"name": "A"}]}"#);
        assert_malformed(
            r#"{"modules": [{"name": "A", "variables": [{"name": "v"}, {"name": "v"}]}]}"#,
        );
    }

    #[test]
    fn test_format_version_checks() {
        assert!(deserialize(r#"{"modules": []}"#).is_ok());
        assert!(deserialize(r#"{"formatVersion": "1.4.0", "modules": []}"#).is_ok());
        assert!(matches!(
            deserialize(r#"{"formatVersion": "2.0.0", "modules": []}"#),
            Err(Error::UnsupportedFormatVersion(v)) if v == "2.0.0"
        ));
        assert_malformed(r#"{"formatVersion": 1, "modules": []}"#);
    }

    #[test]
    fn test_fractional_numbers_roundtrip() {
        let cfg = deserialize(
            r#"{"modules": [{"name": "A", "order": 1.5, "itemMax": 2.0, "retainLayers": 3}]}"#,
        )
        .unwrap();
        let module = cfg.module("A").unwrap();
        assert_eq!(module.order, Some(1.5));
        assert_eq!(module.item_max, Some(2.0));
        assert_eq!(module.retain_layers, Some(3.0));
        assert_eq!(deserialize(&serialize(&cfg).unwrap()).unwrap(), cfg);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let cfg =
            deserialize(r#"{"modules": [{"name": "A", "color": "red"}], "extra": 1}"#).unwrap();
        assert_eq!(cfg, Configuration::new(vec![ModuleRecord::new("A")]));
    }
}
