//! The active configuration and its change notifications.
//!
//! A [`ConfigSession`] is the single place where the active configuration
//! changes. Every successful, state-changing operation calls each registered
//! listener exactly once with the new configuration; failed or no-op
//! operations call nobody. Renderers subscribe here instead of polling.

use std::fmt;
use std::sync::Arc;

use ms_common::{Error, Result};
use tracing::debug;

use crate::codec;
use crate::merge::{merge_with_report, MergeReport};
use crate::model::Configuration;

/// Callback invoked after the active configuration changed.
pub type ChangeListener = Arc<dyn Fn(&Configuration) + Send + Sync>;

/// Owner of the active configuration.
#[derive(Clone, Default)]
pub struct ConfigSession {
    current: Configuration,
    listeners: Vec<ChangeListener>,
}

impl fmt::Debug for ConfigSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSession")
            .field("current", &self.current)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ConfigSession {
    /// Start from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateName`] if `initial` breaks the uniqueness invariants.
    pub fn new(initial: Configuration) -> Result<Self> {
        initial.validate()?;
        Ok(Self {
            current: initial,
            listeners: Vec::new(),
        })
    }

    pub fn current(&self) -> &Configuration {
        &self.current
    }

    pub fn into_configuration(self) -> Configuration {
        self.current
    }

    /// Register a listener for subsequent changes.
    pub fn subscribe(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    fn notify(&self) {
        debug!(listeners = self.listeners.len(), "configuration changed");
        for listener in &self.listeners {
            listener(&self.current);
        }
    }

    /// Merge an imported document into the active configuration.
    pub fn import_merge(&mut self, text: &str) -> Result<MergeReport> {
        let imported = codec::deserialize(text)?;
        let (merged, report) = merge_with_report(Some(&self.current), Some(&imported))?;
        self.set(merged);
        Ok(report)
    }

    /// Replace the active configuration with an imported document.
    pub fn import_replace(&mut self, text: &str) -> Result<()> {
        let imported = codec::deserialize(text)?;
        self.set(imported);
        Ok(())
    }

    /// Replace the active configuration with a value.
    pub fn replace(&mut self, configuration: Configuration) -> Result<()> {
        configuration.validate()?;
        self.set(configuration);
        Ok(())
    }

    fn set(&mut self, configuration: Configuration) {
        if configuration == self.current {
            return;
        }
        self.current = configuration;
        self.notify();
    }

    /// Toggle a module. Returns whether anything changed.
    pub fn set_module_enabled(&mut self, module: &str, enabled: bool) -> Result<bool> {
        let record = self
            .current
            .module_mut(module)
            .ok_or_else(|| Error::ModuleNotFound {
                name: module.to_string(),
            })?;
        if record.enabled == enabled {
            return Ok(false);
        }
        record.enabled = enabled;
        self.notify();
        Ok(true)
    }

    /// Toggle a variable within a module. Returns whether anything changed.
    pub fn set_variable_enabled(
        &mut self,
        module: &str,
        variable: &str,
        enabled: bool,
    ) -> Result<bool> {
        let record = self
            .current
            .module_mut(module)
            .ok_or_else(|| Error::ModuleNotFound {
                name: module.to_string(),
            })?
            .variable_mut(variable)
            .ok_or_else(|| Error::VariableNotFound {
                module: module.to_string(),
                variable: variable.to_string(),
            })?;
        if record.enabled == enabled {
            return Ok(false);
        }
        record.enabled = enabled;
        self.notify();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModuleRecord, VariableRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_session(initial: Configuration) -> (ConfigSession, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let mut session = ConfigSession::new(initial).unwrap();
        session.subscribe(Arc::new(move |_: &Configuration| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        (session, count)
    }

    fn base() -> Configuration {
        Configuration::new(vec![
            ModuleRecord::new("A").with_variables(vec![VariableRecord::new("v1")])
        ])
    }

    #[test]
    fn test_import_merge_notifies_once() {
        let (mut session, count) = counting_session(base());
        let report = session
            .import_merge(r#"{"modules": [{"name": "A", "enabled": false}, {"name": "B"}]}"#)
            .unwrap();
        assert_eq!(report.added_modules, vec!["B"]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        // current's enabled kept
        assert!(session.current().module("A").unwrap().enabled);
    }

    #[test]
    fn test_failed_import_leaves_state_and_stays_silent() {
        let (mut session, count) = counting_session(base());
        assert!(matches!(
            session.import_merge(r#"{"nope": 1}"#),
            Err(Error::MalformedConfig { .. })
        ));
        assert!(matches!(
            session.import_merge(r#"{"modules": []}"#),
            Err(Error::ImportEmpty)
        ));
        assert_eq!(session.current(), &base());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_noop_change_is_silent() {
        let (mut session, count) = counting_session(base());
        session.replace(base()).unwrap();
        assert!(!session.set_module_enabled("A", true).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_import_replace() {
        let (mut session, count) = counting_session(base());
        session
            .import_replace(r#"{"modules": [{"name": "Z", "enabled": false}]}"#)
            .unwrap();
        assert_eq!(session.current().module_names().collect::<Vec<_>>(), vec!["Z"]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_toggles() {
        let (mut session, count) = counting_session(base());
        assert!(session.set_module_enabled("A", false).unwrap());
        assert!(session.set_variable_enabled("A", "v1", false).unwrap());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        let module = session.current().module("A").unwrap();
        assert!(!module.enabled);
        assert!(!module.variable("v1").unwrap().enabled);
    }

    #[test]
    fn test_toggle_unknown_targets() {
        let (mut session, _) = counting_session(base());
        assert!(matches!(
            session.set_module_enabled("nope", false),
            Err(Error::ModuleNotFound { .. })
        ));
        assert!(matches!(
            session.set_variable_enabled("A", "nope", false),
            Err(Error::VariableNotFound { .. })
        ));
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let cfg = Configuration::new(vec![ModuleRecord::new("A"), ModuleRecord::new("A")]);
        assert!(ConfigSession::new(cfg).is_err());
    }
}
