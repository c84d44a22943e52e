//! Module and variable record types.
//!
//! These types match the persisted configuration document. Field names are
//! serialized in camelCase; absent optional fields are omitted on write.
//!
//! Optional attributes are `Option` so a configuration can tell "never set"
//! apart from "set to the default". The merge engine relies on that to decide
//! whether the local side holds an opinion about a field.

use std::collections::HashSet;

use ms_common::{Error, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Sort position for modules without an explicit `order`.
pub const UNORDERED_SENTINEL: f64 = 999.0;

fn default_enabled() -> bool {
    true
}

/// A named sub-field of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VariableRecord {
    /// Identity within the owning module.
    pub name: String,

    /// Label shown to the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Comma-separated aliases accepted on import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_variable_names: Option<String>,

    /// Marks the primary identifier variable of the module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_identifier: Option<bool>,

    /// Fallback identifier when the primary one is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_backup_identifier: Option<bool>,

    /// Whether this variable's value can hide the module entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hide_condition: Option<bool>,

    /// Values that trigger hiding, comma-separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_condition_values: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl VariableRecord {
    /// Create an enabled variable with no optional attributes set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            compatible_variable_names: None,
            is_identifier: None,
            is_backup_identifier: None,
            is_hide_condition: None,
            hide_condition_values: None,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Whether this variable identifies its module entry (primary or backup).
    pub fn is_any_identifier(&self) -> bool {
        self.is_identifier.unwrap_or(false) || self.is_backup_identifier.unwrap_or(false)
    }
}

/// A named, user-configurable unit holding prompts, output settings and
/// an ordered list of variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleRecord {
    /// Identity within a configuration.
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Advisory sort position; modules without one sort last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<f64>,

    #[serde(default)]
    pub variables: Vec<VariableRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_prompt: Option<String>,

    /// Where the module output is placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_position: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_mode: Option<String>,

    /// Number of history layers to keep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_layers: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_max: Option<f64>,

    /// Comma-separated aliases accepted on import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_module_names: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_reference_standard: Option<bool>,
}

impl ModuleRecord {
    /// Create an enabled module with no variables and no optional attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            order: None,
            variables: Vec::new(),
            prompt: None,
            content_prompt: None,
            timing_prompt: None,
            position_prompt: None,
            output_position: None,
            output_mode: None,
            range_mode: None,
            retain_layers: None,
            item_min: None,
            item_max: None,
            compatible_module_names: None,
            time_reference_standard: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_order(mut self, order: f64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_variables(mut self, variables: Vec<VariableRecord>) -> Self {
        self.variables = variables;
        self
    }

    /// Effective sort position.
    pub fn sort_order(&self) -> f64 {
        self.order.unwrap_or(UNORDERED_SENTINEL)
    }

    pub fn variable(&self, name: &str) -> Option<&VariableRecord> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut VariableRecord> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    /// Variables flagged as primary or backup identifiers, in list order.
    pub fn identifier_variables(&self) -> impl Iterator<Item = &VariableRecord> {
        self.variables.iter().filter(|v| v.is_any_identifier())
    }

    /// Check that variable names are unique within this module.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for variable in &self.variables {
            if !seen.insert(variable.name.as_str()) {
                return Err(Error::DuplicateName {
                    kind: "variable",
                    name: format!("{}.{}", self.name, variable.name),
                });
            }
        }
        Ok(())
    }
}

/// The full set of modules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Configuration {
    pub modules: Vec<ModuleRecord>,
}

impl Configuration {
    pub fn new(modules: Vec<ModuleRecord>) -> Self {
        Self { modules }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn module_mut(&mut self, name: &str) -> Option<&mut ModuleRecord> {
        self.modules.iter_mut().find(|m| m.name == name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }

    /// Modules sorted by advisory order. The sort is stable, so modules
    /// sharing an order (or lacking one) keep their stored sequence.
    pub fn ordered_modules(&self) -> Vec<&ModuleRecord> {
        let mut modules: Vec<&ModuleRecord> = self.modules.iter().collect();
        modules.sort_by(|a, b| a.sort_order().total_cmp(&b.sort_order()));
        modules
    }

    /// Check the uniqueness invariants: module names within the
    /// configuration, variable names within each module.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.name.as_str()) {
                return Err(Error::DuplicateName {
                    kind: "module",
                    name: module.name.clone(),
                });
            }
            module.validate()?;
        }
        Ok(())
    }
}
