//! Named configuration profiles.
//!
//! A [`ConfigStore`] maps a component model to its profiles. On disk each model
//! is one TOML file whose top-level tables are the profiles:
//!
//! ```toml
//! # config/cartesian_interpolator.toml
//! [default]
//! period = 0.01
//!
//! [default.linear]
//! max_speed = 0.5
//!
//! [slow.linear]
//! max_speed = 0.1
//! ```
//!
//! Resolving `["default", "slow"]` merges the tables in order: later profiles
//! override earlier ones, nested tables merge key by key.

use crate::error::{PortflowError, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use toml::{Table, Value};

/// Extension of configuration files.
pub const CONFIG_FILE_EXTENSION: &str = "toml";

/// The merged result of one or more profiles, ready for a component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigProfile {
    names: Vec<String>,
    properties: Table,
}

impl ConfigProfile {
    /// A profile with no properties; components fall back to their defaults.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_table(name: impl Into<String>, properties: Table) -> Self {
        Self {
            names: vec![name.into()],
            properties,
        }
    }

    /// Names of the profiles merged into this one, in application order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn properties(&self) -> &Table {
        &self.properties
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Read a property as seconds, e.g. `period = 0.01`.
    pub fn seconds(&self, key: &str) -> Result<Option<f64>> {
        match self.properties.get(key) {
            None => Ok(None),
            Some(Value::Float(v)) if v.is_finite() && *v > 0.0 => Ok(Some(*v)),
            Some(Value::Integer(v)) if *v > 0 => Ok(Some(*v as f64)),
            Some(other) => Err(PortflowError::Configuration(format!(
                "property '{key}' must be a positive number of seconds, got {other}"
            ))),
        }
    }

    /// Read a property in seconds as a [`Duration`].
    ///
    /// Values too large for a `Duration` are a configuration error.
    pub fn duration(&self, key: &str) -> Result<Option<Duration>> {
        self.seconds(key)?
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|e| {
                    PortflowError::Configuration(format!("property '{key}' = {secs}: {e}"))
                })
            })
            .transpose()
    }

    /// Deserialize the properties into a component's typed configuration.
    pub fn deserialize<C: DeserializeOwned>(&self) -> Result<C> {
        Value::Table(self.properties.clone())
            .try_into()
            .map_err(|e: toml::de::Error| {
                PortflowError::Configuration(format!(
                    "profile {:?} is malformed: {}",
                    self.names,
                    e.message()
                ))
            })
    }

    fn merge(&mut self, name: &str, table: &Table) {
        self.names.push(name.to_string());
        merge_tables(&mut self.properties, table);
    }
}

fn merge_tables(base: &mut Table, overlay: &Table) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Profiles for every known component model.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    models: HashMap<String, HashMap<String, Table>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `<model>.toml` file in `dir`.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut store = Self::new();

        let entries = std::fs::read_dir(dir).map_err(|e| {
            PortflowError::Configuration(format!(
                "cannot read config directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(CONFIG_FILE_EXTENSION) {
                continue;
            }
            let Some(model) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            store.insert_toml(model, &content).map_err(|e| {
                e.with_context(format!("loading {}", path.display()))
            })?;
            tracing::debug!("Loaded configuration for model '{}' from {:?}", model, path);
        }

        Ok(store)
    }

    /// Parse a TOML document holding the profiles of `model`.
    pub fn insert_toml(&mut self, model: &str, content: &str) -> Result<()> {
        let doc: Table = toml::from_str(content)?;
        for (name, value) in doc {
            match value {
                Value::Table(table) => self.insert(model, &name, table),
                other => {
                    return Err(PortflowError::Configuration(format!(
                        "profile '{name}' of model '{model}' must be a table, got {}",
                        other.type_str()
                    )))
                }
            }
        }
        Ok(())
    }

    /// Add or replace one profile.
    pub fn insert(&mut self, model: &str, profile: &str, properties: Table) {
        self.models
            .entry(model.to_string())
            .or_default()
            .insert(profile.to_string(), properties);
    }

    pub fn has_profile(&self, model: &str, profile: &str) -> bool {
        self.models
            .get(model)
            .is_some_and(|profiles| profiles.contains_key(profile))
    }

    /// Sorted profile names for a model.
    pub fn profile_names(&self, model: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .models
            .get(model)
            .map(|profiles| profiles.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Merge `profiles` in order for `model`.
    ///
    /// `known` lists the top-level properties the component understands. In
    /// strict mode any other key is an error; otherwise it is dropped with a
    /// warning.
    pub fn resolve<S: AsRef<str>>(
        &self,
        model: &str,
        profiles: &[S],
        strict: bool,
        known: &[&str],
    ) -> Result<ConfigProfile> {
        let available = self.models.get(model);
        let mut merged = ConfigProfile::default();

        for name in profiles {
            let name = name.as_ref();
            let table = available.and_then(|p| p.get(name)).ok_or_else(|| {
                PortflowError::Configuration(format!(
                    "profile '{name}' not found for model '{model}'"
                ))
            })?;
            merged.merge(name, table);
        }

        let unknown: Vec<String> = merged
            .properties
            .keys()
            .filter(|k| !known.contains(&k.as_str()))
            .cloned()
            .collect();

        if !unknown.is_empty() {
            if strict {
                return Err(PortflowError::Configuration(format!(
                    "unknown options for model '{model}': {}",
                    unknown.join(", ")
                )));
            }
            for key in &unknown {
                tracing::warn!("Ignoring unknown option '{}' for model '{}'", key, model);
                merged.properties.remove(key);
            }
        }

        tracing::debug!(
            "Resolved profiles {:?} for model '{}' ({} properties)",
            merged.names,
            model,
            merged.properties.len()
        );
        Ok(merged)
    }
}
