//! Serializable calculator configuration.
//!
//! Loaded from a TOML file; credentials may come from the environment
//! instead (`METAAPI_ACCESS_TOKEN`, `METAAPI_ACCOUNT_ID`, `METAAPI_BASE_URL`).
//! Every section has defaults, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::MetaApiCredentials;
use crate::domain::ContractSpec;
use crate::indicators::{AtrParams, Smoothing};
use crate::pipeline::{CalculatorConfig, FallbackPolicy};

pub const ENV_ACCESS_TOKEN: &str = "METAAPI_ACCESS_TOKEN";
pub const ENV_ACCOUNT_ID: &str = "METAAPI_ACCOUNT_ID";
pub const ENV_BASE_URL: &str = "METAAPI_BASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("missing MetaAPI {0}: set it in [metaapi] or the environment")]
    MissingCredential(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxsizeConfig {
    pub atr: AtrSection,
    pub risk: RiskSection,
    pub contract: ContractSection,
    pub data: DataSection,
    pub metaapi: MetaApiSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtrSection {
    pub periods: usize,
    pub smoothing: Smoothing,
    pub include_forming_bar: bool,
    /// Fall back to the reference table's daily ATR when bars are unavailable.
    pub fallback_to_default: bool,
}

impl Default for AtrSection {
    fn default() -> Self {
        Self {
            periods: 14,
            smoothing: Smoothing::Simple,
            include_forming_bar: false,
            fallback_to_default: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub account_equity: Option<f64>,
    pub risk_percent: f64,
    pub atr_multiple: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            account_equity: None,
            risk_percent: 1.0,
            atr_multiple: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractSection {
    /// Overrides the standard 100,000.
    pub units_per_lot: Option<f64>,
    pub max_lots: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    #[default]
    MetaApi,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub source: DataSourceKind,
    pub csv_dir: PathBuf,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            source: DataSourceKind::MetaApi,
            csv_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaApiSection {
    pub base_url: Option<String>,
    pub account_id: Option<String>,
    pub access_token: Option<String>,
}

impl FxsizeConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Apply environment overrides for the MetaAPI credentials.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v: &String| !v.trim().is_empty());
        if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
            self.metaapi.access_token = Some(token);
        }
        if let Some(account) = non_empty(ENV_ACCOUNT_ID) {
            self.metaapi.account_id = Some(account);
        }
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.metaapi.base_url = Some(url);
        }
    }

    pub fn atr_params(&self) -> AtrParams {
        AtrParams {
            periods: self.atr.periods,
            smoothing: self.atr.smoothing,
            include_forming_bar: self.atr.include_forming_bar,
        }
    }

    pub fn calculator_config(&self) -> CalculatorConfig {
        CalculatorConfig {
            atr: self.atr_params(),
            fallback: if self.atr.fallback_to_default {
                FallbackPolicy::DefaultTable
            } else {
                FallbackPolicy::None
            },
            ..CalculatorConfig::default()
        }
    }

    /// Contract spec for `symbol`, with this config's overrides applied.
    pub fn contract_for(&self, symbol: &str) -> ContractSpec {
        let mut spec = ContractSpec::for_symbol(symbol);
        if let Some(units) = self.contract.units_per_lot {
            spec.units_per_lot = units;
        }
        spec.max_lots = self.contract.max_lots;
        spec
    }

    pub fn metaapi_credentials(&self) -> Result<MetaApiCredentials, ConfigError> {
        let access_token = self
            .metaapi
            .access_token
            .clone()
            .ok_or(ConfigError::MissingCredential("access token"))?;
        let account_id = self
            .metaapi
            .account_id
            .clone()
            .ok_or(ConfigError::MissingCredential("account id"))?;
        Ok(MetaApiCredentials {
            access_token,
            account_id,
        })
    }
}
