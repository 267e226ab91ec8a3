//! Process-wide settings consumed by the query builder, the row mapper and
//! the reference loader.
//!
//! Settings are ambient: set them before use and restore them afterwards.
//! [`OrmSettings::apply`] hands back a guard that puts the previous
//! settings back when dropped. Nothing here is scoped per call, so threads
//! that need conflicting settings must coordinate among themselves.

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, PoisonError, RwLock};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::entity_catalog::EntityMetadata;
use crate::query_builder::{Query, QueryError};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Settings with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct OrmSettings {
    /// Compare textual keys case-insensitively when stitching references
    pub case_insensitive: bool,

    /// Fail instead of guessing when a field has no matching column
    pub strict_column_mapping: bool,

    /// Maximum number of keys in one `IN (..)` list of a reference query
    #[validate(range(
        min = 1,
        max = 100000,
        message = "IN batch size must be between 1 and 100000"
    ))]
    pub in_batch_size: usize,
}

impl Default for OrmSettings {
    fn default() -> Self {
        Self {
            case_insensitive: false,
            strict_column_mapping: false,
            in_batch_size: 1000,
        }
    }
}

impl OrmSettings {
    /// Create settings from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = Self {
            case_insensitive: parse_env_var("ORMGRAPH_CASE_INSENSITIVE", "false")?,
            strict_column_mapping: parse_env_var("ORMGRAPH_STRICT_COLUMN_MAPPING", "false")?,
            in_batch_size: parse_env_var("ORMGRAPH_IN_BATCH_SIZE", "1000")?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Create settings from a YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let settings: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Make these the process-wide settings until the guard is dropped.
    pub fn apply(self) -> Result<SettingsGuard, ConfigError> {
        self.validate()?;
        let mut current = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
        log::debug!("Applying settings: {:?}", self);
        let previous = std::mem::replace(&mut *current, self);
        Ok(SettingsGuard {
            previous: Some(previous),
        })
    }
}

/// Restores the settings that were active before [`OrmSettings::apply`].
#[must_use = "settings are restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SettingsGuard {
    previous: Option<OrmSettings>,
}

impl Drop for SettingsGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let mut current = SETTINGS.write().unwrap_or_else(PoisonError::into_inner);
            *current = previous;
        }
    }
}

/// Maps a parameter name to the form used for matching.
pub type ParamNameFilter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Adjusts a query over an entity that declares a capability, e.g. to hide
/// soft-deleted rows.
pub type SelectFilter = Arc<dyn Fn(&mut Query) -> Result<(), QueryError> + Send + Sync>;

lazy_static! {
    static ref SETTINGS: RwLock<OrmSettings> = RwLock::new(OrmSettings::default());
    static ref PARAM_NAME_FILTER: RwLock<Option<ParamNameFilter>> = RwLock::new(None);
    static ref SELECT_FILTERS: RwLock<HashMap<String, Vec<SelectFilter>>> =
        RwLock::new(HashMap::new());
}

/// Snapshot of the active settings.
pub fn current() -> OrmSettings {
    SETTINGS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn set_param_name_filter<F>(filter: F)
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    *PARAM_NAME_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(filter));
}

pub fn clear_param_name_filter() {
    *PARAM_NAME_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

/// `name` after the registered parameter-name filter, unchanged without one.
pub fn param_name(name: &str) -> String {
    let filter = PARAM_NAME_FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match filter {
        Some(filter) => filter(name),
        None => name.to_string(),
    }
}

/// Register a filter for every entity declaring `capability`.
pub fn register_select_filter<F>(capability: &str, filter: F)
where
    F: Fn(&mut Query) -> Result<(), QueryError> + Send + Sync + 'static,
{
    log::debug!("Registered select filter for capability '{}'", capability);
    SELECT_FILTERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(capability.to_string())
        .or_default()
        .push(Arc::new(filter));
}

pub fn clear_select_filters() {
    SELECT_FILTERS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// Filters that apply to queries over `meta`, in capability declaration order.
pub fn select_filters_for(meta: &EntityMetadata) -> Vec<SelectFilter> {
    let filters = SELECT_FILTERS.read().unwrap_or_else(PoisonError::into_inner);
    meta.capabilities()
        .iter()
        .filter_map(|capability| filters.get(capability))
        .flatten()
        .cloned()
        .collect()
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = match env::var(key) {
        Ok(value) => value,
        Err(env::VarError::NotPresent) => default.to_string(),
        Err(e) => return Err(e.into()),
    };
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
