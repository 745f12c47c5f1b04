//! Permission configuration loaded from caveats.toml.
//!
//! ```toml
//! [[permission]]
//! method = "eth_accounts"
//!
//! [[permission.caveat]]
//! type = "filterResponse"
//! value = ["0xa"]
//!
//! [[permission]]
//! method = "eth_sign"
//!
//! [[permission.caveat]]
//! type = "fixedParams"
//! value = ["0xa", ""]
//! open = [1]
//! ```

use std::collections::HashSet;
use std::path::Path;

use caveats::{CaveatOptions, Permission, Registry, kinds};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default, rename = "permission")]
    pub permissions: Vec<PermissionConfig>,
}

/// One granted permission.
#[derive(Debug, Deserialize)]
pub struct PermissionConfig {
    /// Restricted method the permission grants.
    pub method: String,

    /// Fixed identifier; a random one is generated when absent.
    pub id: Option<Uuid>,

    /// Creation time; defaults to now.
    pub date: Option<DateTime<Utc>>,

    #[serde(default, rename = "caveat")]
    pub caveats: Vec<CaveatConfig>,
}

/// One caveat on a permission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaveatConfig {
    #[serde(rename = "type")]
    pub kind: String,

    pub sub_type: Option<String>,

    pub value: Option<Value>,

    /// Positions of a fixedParams value left to the caller.
    #[serde(default)]
    pub open: Vec<usize>,
}

impl CaveatConfig {
    fn options(&self) -> Result<CaveatOptions, ConfigError> {
        if self.kind == kinds::CONDITION {
            return Err(ConfigError::Invalid(
                "condition caveats need a validator and cannot be configured".to_string(),
            ));
        }

        let mut options = CaveatOptions::new(&self.kind);
        if let Some(sub_type) = &self.sub_type {
            options = options.sub_type(sub_type);
        }

        if self.open.is_empty() {
            if let Some(value) = &self.value {
                options = options.value(value.clone());
            }
            return Ok(options);
        }

        if self.kind != kinds::FIXED_PARAMS {
            return Err(ConfigError::Invalid(format!(
                "`open` only applies to fixedParams caveats, not {:?}",
                self.kind
            )));
        }
        let Some(Value::Array(params)) = &self.value else {
            return Err(ConfigError::Invalid(
                "fixedParams with `open` positions needs a list value".to_string(),
            ));
        };
        let slots = params
            .iter()
            .enumerate()
            .map(|(index, param)| (!self.open.contains(&index)).then(|| param.clone()))
            .collect();
        Ok(options.slots(slots))
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the configured permissions, attaching caveats through `registry`.
    pub fn permissions(&self, registry: &Registry) -> Result<Vec<Permission>, ConfigError> {
        let mut seen = HashSet::new();
        let mut permissions = Vec::with_capacity(self.permissions.len());

        for config in &self.permissions {
            if !seen.insert(config.method.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate permission for method {:?}",
                    config.method
                )));
            }

            let mut permission = Permission::new(&config.method);
            if let Some(id) = config.id {
                permission = permission.with_id(id);
            }
            if let Some(date) = config.date {
                permission = permission.with_date(date);
            }
            for caveat in &config.caveats {
                registry.add_caveat(&mut permission, caveat.options()?)?;
            }
            permissions.push(permission);
        }

        Ok(permissions)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid caveat: {0}")]
    Caveat(#[from] caveats::Error),
}
