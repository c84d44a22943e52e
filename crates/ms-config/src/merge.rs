//! Reconcile an imported configuration with the locally held one.
//!
//! # Precedence
//!
//! The imported configuration owns **membership**: the result contains exactly
//! the modules it lists, in its order, and for every matched module exactly
//! the variables it lists, in its order. The current configuration owns
//! **state**: for an entity both sides know, `enabled` and every attribute the
//! current side has set come from current.
//!
//! | entity                     | result                                |
//! |----------------------------|---------------------------------------|
//! | in both                    | current's state over imported's shape |
//! | only in imported           | imported, verbatim                    |
//! | only in current            | dropped                               |
//!
//! The algorithm runs in two passes per level: [`plan_membership`] pairs each
//! imported entity with its current counterpart, then the overlay step folds
//! current's state into each matched pair.

use std::collections::{HashMap, HashSet};
use std::fmt;

use ms_common::{Error, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::model::{Configuration, ModuleRecord, VariableRecord};

/// Anything identified by a name within its container.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for ModuleRecord {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for VariableRecord {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Membership decision for one imported entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership<'a, T> {
    /// No local counterpart; keep imported as-is.
    New(&'a T),
    /// Both sides know this entity.
    Matched { current: &'a T, imported: &'a T },
}

/// First pass: pair every imported entity with the current entity of the
/// same name. Output order is imported order.
pub fn plan_membership<'a, T: Named>(
    current: &'a [T],
    imported: &'a [T],
) -> Vec<Membership<'a, T>> {
    let mut by_name: HashMap<&str, &T> = HashMap::with_capacity(current.len());
    for entity in current {
        // first occurrence wins, matching lookup by name elsewhere
        by_name.entry(entity.name()).or_insert(entity);
    }
    imported
        .iter()
        .map(|entity| match by_name.get(entity.name()).copied() {
            Some(current) => Membership::Matched {
                current,
                imported: entity,
            },
            None => Membership::New(entity),
        })
        .collect()
}

/// Names present in `current` but not in `imported`, in current order.
fn dropped_names<'a, T: Named>(current: &'a [T], imported: &[T]) -> Vec<&'a str> {
    let keep: HashSet<&str> = imported.iter().map(Named::name).collect();
    current
        .iter()
        .map(Named::name)
        .filter(|name| !keep.contains(name))
        .collect()
}

fn prefer<T: Clone>(current: &Option<T>, imported: &Option<T>) -> Option<T> {
    current.clone().or_else(|| imported.clone())
}

/// Second pass, variable level.
fn overlay_variable(current: &VariableRecord, imported: &VariableRecord) -> VariableRecord {
    // Destructured so a new field cannot be added without a decision here.
    let VariableRecord {
        name,
        display_name,
        description,
        compatible_variable_names,
        is_identifier,
        is_backup_identifier,
        is_hide_condition,
        hide_condition_values,
        enabled,
    } = current;

    VariableRecord {
        name: name.clone(),
        display_name: prefer(display_name, &imported.display_name),
        description: prefer(description, &imported.description),
        compatible_variable_names: prefer(
            compatible_variable_names,
            &imported.compatible_variable_names,
        ),
        is_identifier: prefer(is_identifier, &imported.is_identifier),
        is_backup_identifier: prefer(is_backup_identifier, &imported.is_backup_identifier),
        is_hide_condition: prefer(is_hide_condition, &imported.is_hide_condition),
        hide_condition_values: prefer(hide_condition_values, &imported.hide_condition_values),
        enabled: *enabled,
    }
}

/// Second pass, module level. `variables` is the already-merged list.
fn overlay_module(
    current: &ModuleRecord,
    imported: &ModuleRecord,
    variables: Vec<VariableRecord>,
) -> ModuleRecord {
    let ModuleRecord {
        name,
        enabled,
        order,
        variables: _,
        prompt,
        content_prompt,
        timing_prompt,
        position_prompt,
        output_position,
        output_mode,
        range_mode,
        retain_layers,
        item_min,
        item_max,
        compatible_module_names,
        time_reference_standard,
    } = current;

    ModuleRecord {
        name: name.clone(),
        enabled: *enabled,
        order: prefer(order, &imported.order),
        variables,
        prompt: prefer(prompt, &imported.prompt),
        content_prompt: prefer(content_prompt, &imported.content_prompt),
        timing_prompt: prefer(timing_prompt, &imported.timing_prompt),
        position_prompt: prefer(position_prompt, &imported.position_prompt),
        output_position: prefer(output_position, &imported.output_position),
        output_mode: prefer(output_mode, &imported.output_mode),
        range_mode: prefer(range_mode, &imported.range_mode),
        retain_layers: prefer(retain_layers, &imported.retain_layers),
        item_min: prefer(item_min, &imported.item_min),
        item_max: prefer(item_max, &imported.item_max),
        compatible_module_names: prefer(
            compatible_module_names,
            &imported.compatible_module_names,
        ),
        time_reference_standard: prefer(
            time_reference_standard,
            &imported.time_reference_standard,
        ),
    }
}

/// A variable addressed through its module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VariablePath {
    pub module: String,
    pub variable: String,
}

impl VariablePath {
    fn new(module: &str, variable: &str) -> Self {
        Self {
            module: module.to_string(),
            variable: variable.to_string(),
        }
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.variable)
    }
}

/// What a merge did, for user-facing summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Modules present on both sides (current state kept).
    pub matched_modules: Vec<String>,
    /// Modules only in the import (taken verbatim).
    pub added_modules: Vec<String>,
    /// Modules only in the current configuration (removed).
    pub dropped_modules: Vec<String>,
    pub matched_variables: Vec<VariablePath>,
    /// Variables new to a matched module. Variables of added modules are
    /// not listed individually.
    pub added_variables: Vec<VariablePath>,
    pub dropped_variables: Vec<VariablePath>,
}

impl MergeReport {
    /// Whether the merge removed anything from the current configuration.
    pub fn dropped_anything(&self) -> bool {
        !self.dropped_modules.is_empty() || !self.dropped_variables.is_empty()
    }
}

fn merge_variables(
    module: &str,
    current: &[VariableRecord],
    imported: &[VariableRecord],
    report: &mut MergeReport,
) -> Vec<VariableRecord> {
    let merged = plan_membership(current, imported)
        .into_iter()
        .map(|plan| match plan {
            Membership::New(variable) => {
                report.added_variables.push(VariablePath::new(module, &variable.name));
                variable.clone()
            }
            Membership::Matched { current, imported } => {
                report.matched_variables.push(VariablePath::new(module, &current.name));
                overlay_variable(current, imported)
            }
        })
        .collect();

    for name in dropped_names(current, imported) {
        debug!(module, variable = name, "dropping variable absent from import");
        report.dropped_variables.push(VariablePath::new(module, name));
    }
    merged
}

fn check_imported(imported: Option<&Configuration>) -> Result<&Configuration> {
    let imported = imported.ok_or(Error::ImportEmpty)?;
    if imported.is_empty() {
        return Err(Error::ImportEmpty);
    }
    imported.validate()?;
    Ok(imported)
}

/// Merge `imported` into `current`, returning a new configuration and a
/// summary. Neither argument is modified.
///
/// # Errors
///
/// - [`Error::ImportEmpty`] when `imported` is absent or has no modules.
/// - [`Error::DuplicateName`] when `imported` breaks the uniqueness
///   invariants.
pub fn merge_with_report(
    current: Option<&Configuration>,
    imported: Option<&Configuration>,
) -> Result<(Configuration, MergeReport)> {
    let imported = check_imported(imported)?;
    let current = current.map(|c| c.modules.as_slice()).unwrap_or_default();

    let mut report = MergeReport::default();
    let modules = plan_membership(current, &imported.modules)
        .into_iter()
        .map(|plan| match plan {
            Membership::New(module) => {
                debug!(module = %module.name, "adding module from import");
                report.added_modules.push(module.name.clone());
                module.clone()
            }
            Membership::Matched { current, imported } => {
                debug!(module = %current.name, "keeping local state for module");
                report.matched_modules.push(current.name.clone());
                let variables = merge_variables(
                    &current.name,
                    &current.variables,
                    &imported.variables,
                    &mut report,
                );
                overlay_module(current, imported, variables)
            }
        })
        .collect();

    for name in dropped_names(current, &imported.modules) {
        debug!(module = name, "dropping module absent from import");
        report.dropped_modules.push(name.to_string());
    }

    info!(
        matched = report.matched_modules.len(),
        added = report.added_modules.len(),
        dropped = report.dropped_modules.len(),
        "merged imported configuration"
    );
    Ok((Configuration::new(modules), report))
}

/// Merge `imported` into `current`. See [`merge_with_report`].
pub fn merge(
    current: Option<&Configuration>,
    imported: Option<&Configuration>,
) -> Result<Configuration> {
    merge_with_report(current, imported).map(|(merged, _)| merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, enabled: bool) -> VariableRecord {
        VariableRecord::new(name).with_enabled(enabled)
    }

    fn module(name: &str, enabled: bool, variables: Vec<VariableRecord>) -> ModuleRecord {
        ModuleRecord::new(name)
            .with_enabled(enabled)
            .with_variables(variables)
    }

    fn names(cfg: &Configuration) -> Vec<&str> {
        cfg.module_names().collect()
    }

    #[test]
    fn test_import_absent_is_error() {
        let current = Configuration::new(vec![module("A", true, vec![])]);
        assert!(matches!(merge(Some(&current), None), Err(Error::ImportEmpty)));
    }

    #[test]
    fn test_import_without_modules_is_error() {
        let current = Configuration::new(vec![module("A", true, vec![])]);
        let imported = Configuration::default();
        assert!(matches!(
            merge(Some(&current), Some(&imported)),
            Err(Error::ImportEmpty)
        ));
    }

    #[test]
    fn test_import_with_duplicates_is_rejected() {
        let imported =
            Configuration::new(vec![module("A", true, vec![]), module("A", false, vec![])]);
        assert!(matches!(
            merge(None, Some(&imported)),
            Err(Error::DuplicateName { kind: "module", .. })
        ));
    }

    #[test]
    fn test_empty_current_returns_imported() {
        let imported = Configuration::new(vec![
            module("A", false, vec![var("v1", false)]),
            module("B", true, vec![]),
        ]);
        assert_eq!(merge(None, Some(&imported)).unwrap(), imported);
        assert_eq!(
            merge(Some(&Configuration::default()), Some(&imported)).unwrap(),
            imported
        );
    }

    #[test]
    fn test_existing_module_keeps_current_enabled() {
        let current = Configuration::new(vec![module("A", false, vec![])]);
        let imported = Configuration::new(vec![module("A", true, vec![])]);
        let merged = merge(Some(&current), Some(&imported)).unwrap();
        assert!(!merged.modules[0].enabled);

        let current = Configuration::new(vec![module("A", true, vec![])]);
        let imported = Configuration::new(vec![module("A", false, vec![])]);
        let merged = merge(Some(&current), Some(&imported)).unwrap();
        assert!(merged.modules[0].enabled);
    }

    #[test]
    fn test_new_module_keeps_imported_enabled() {
        let current = Configuration::new(vec![module("A", true, vec![])]);
        let imported = Configuration::new(vec![
            module("A", true, vec![]),
            module("C", false, vec![var("x", false)]),
        ]);
        let merged = merge(Some(&current), Some(&imported)).unwrap();
        assert_eq!(merged.module("C"), imported.module("C"));
    }

    #[test]
    fn test_membership_and_order_follow_import() {
        let current = Configuration::new(vec![
            module("A", true, vec![]),
            module("B", true, vec![]),
            module("C", true, vec![]),
        ]);
        let imported = Configuration::new(vec![
            module("C", true, vec![]),
            module("D", true, vec![]),
            module("A", true, vec![]),
        ]);
        let (merged, report) = merge_with_report(Some(&current), Some(&imported)).unwrap();
        assert_eq!(names(&merged), vec!["C", "D", "A"]);
        assert_eq!(report.matched_modules, vec!["C", "A"]);
        assert_eq!(report.added_modules, vec!["D"]);
        assert_eq!(report.dropped_modules, vec!["B"]);
        assert!(report.dropped_anything());
    }

    #[test]
    fn test_variable_order_follows_import() {
        let current = Configuration::new(vec![module(
            "A",
            true,
            vec![var("v1", true), var("v2", true), var("v3", true)],
        )]);
        let imported = Configuration::new(vec![module(
            "A",
            true,
            vec![var("v3", true), var("v1", true), var("v4", true)],
        )]);
        let (merged, report) = merge_with_report(Some(&current), Some(&imported)).unwrap();
        let vars: Vec<&str> = merged.modules[0]
            .variables
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(vars, vec!["v3", "v1", "v4"]);
        assert_eq!(report.added_variables, vec![VariablePath::new("A", "v4")]);
        assert_eq!(report.dropped_variables, vec![VariablePath::new("A", "v2")]);
        assert_eq!(report.dropped_variables[0].to_string(), "A.v2");
    }

    #[test]
    fn test_current_scalars_win_and_gaps_fill_from_import() {
        let mut local = ModuleRecord::new("A").with_prompt("local prompt");
        local.item_max = Some(5.0);
        let mut incoming = ModuleRecord::new("A").with_prompt("shipped prompt").with_order(3.0);
        incoming.item_max = Some(10.0);
        incoming.output_mode = Some("append".to_string());

        let merged = merge(
            Some(&Configuration::new(vec![local])),
            Some(&Configuration::new(vec![incoming])),
        )
        .unwrap();
        let m = &merged.modules[0];
        assert_eq!(m.prompt.as_deref(), Some("local prompt"));
        assert_eq!(m.item_max, Some(5.0));
        assert_eq!(m.output_mode.as_deref(), Some("append"));
        assert_eq!(m.order, Some(3.0));
    }

    #[test]
    fn test_variable_scalars_follow_current() {
        let mut local = VariableRecord::new("v1").with_display_name("Mine");
        local.is_identifier = Some(false);
        let mut incoming = VariableRecord::new("v1").with_display_name("Theirs");
        incoming.is_identifier = Some(true);
        incoming.description = Some("from import".to_string());

        let merged = merge(
            Some(&Configuration::new(vec![module("A", true, vec![local])])),
            Some(&Configuration::new(vec![module("A", true, vec![incoming])])),
        )
        .unwrap();
        let v = &merged.modules[0].variables[0];
        assert_eq!(v.display_name.as_deref(), Some("Mine"));
        assert_eq!(v.is_identifier, Some(false));
        assert_eq!(v.description.as_deref(), Some("from import"));
    }

    #[test]
    fn test_inputs_are_not_modified() {
        let current = Configuration::new(vec![module("A", false, vec![var("v1", false)])]);
        let imported = Configuration::new(vec![module("A", true, vec![var("v1", true)])]);
        let before = (current.clone(), imported.clone());
        let _ = merge(Some(&current), Some(&imported)).unwrap();
        assert_eq!((current, imported), before);
    }

    #[test]
    fn test_plan_membership_pairs_by_name() {
        let current = vec![var("a", true), var("b", false)];
        let imported = vec![var("b", true), var("c", true)];
        let plan = plan_membership(&current, &imported);
        assert_eq!(
            plan,
            vec![
                Membership::Matched {
                    current: &current[1],
                    imported: &imported[0]
                },
                Membership::New(&imported[1]),
            ]
        );
    }
}
