//! Modsync configuration core.
//!
//! This crate provides:
//! - Typed module/variable records for the configuration document
//! - The schema registry and its drift check
//! - The import merge engine ("import owns membership, current owns state")
//! - Document export/import with shape validation
//! - File storage, path resolution, settings, and change notification

pub mod codec;
pub mod merge;
pub mod model;
pub mod registry;
pub mod resolve;
pub mod session;
pub mod settings;
pub mod store;

pub use codec::{deserialize, serialize};
pub use merge::{merge, merge_with_report, MergeReport, VariablePath};
pub use model::{Configuration, ModuleRecord, VariableRecord};
pub use registry::{
    check_consistency, check_consistency_between, schema_template, supported_fields, DriftReport,
    SupportedFields,
};
pub use resolve::{resolve_config, ConfigPaths, PathSource};
pub use session::{ChangeListener, ConfigSession};
pub use settings::Settings;
pub use store::ConfigStore;
