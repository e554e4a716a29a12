//! Serializable backtest configuration.
//!
//! A config file is TOML with four optional sections:
//!
//! ```toml
//! [data]
//! path = "data/xauusd_1h.csv"
//! symbol = "XAUUSD"
//!
//! [strategy]
//! fast_period = 12
//! slow_period = 26
//!
//! [risk]
//! initial_capital = 10000.0
//! risk_percent = 2.0
//! stop_loss_percent = 2.0
//! take_profit_percent = 5.0
//!
//! [metrics]
//! bars_per_year = 6048.0
//! ```
//!
//! Every field has a default, so an empty file is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crosslab_core::params::{ParamError, StrategyParams, HOURLY_BARS_PER_YEAR};

/// Content-addressable identifier for a config (blake3 hex).
pub type ConfigHash = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid strategy parameters: {0}")]
    Params(#[from] ParamError),
}

/// Where the price series comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub path: Option<PathBuf>,
    /// Display label only; not used for lookup.
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    pub initial_capital: f64,
    pub risk_percent: f64,
    pub stop_loss_percent: f64,
    pub take_profit_percent: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            risk_percent: 2.0,
            stop_loss_percent: 2.0,
            take_profit_percent: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    pub bars_per_year: f64,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            bars_per_year: HOURLY_BARS_PER_YEAR,
        }
    }
}

/// Complete configuration for one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub data: DataSection,
    pub strategy: StrategySection,
    pub risk: RiskSection,
    pub metrics: MetricsSection,
}

impl BacktestConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Build validated strategy parameters.
    pub fn to_params(&self) -> Result<StrategyParams, ConfigError> {
        let params = StrategyParams {
            fast_period: self.strategy.fast_period,
            slow_period: self.strategy.slow_period,
            initial_capital: self.risk.initial_capital,
            risk_percent: self.risk.risk_percent,
            stop_loss_percent: self.risk.stop_loss_percent,
            take_profit_percent: self.risk.take_profit_percent,
            bars_per_year: self.metrics.bars_per_year,
        };
        params.validate()?;
        Ok(params)
    }

    /// Config with every strategy and risk value taken from `params`.
    pub fn with_params(&self, params: &StrategyParams) -> Self {
        Self {
            data: self.data.clone(),
            strategy: StrategySection {
                fast_period: params.fast_period,
                slow_period: params.slow_period,
            },
            risk: RiskSection {
                initial_capital: params.initial_capital,
                risk_percent: params.risk_percent,
                stop_loss_percent: params.stop_loss_percent,
                take_profit_percent: params.take_profit_percent,
            },
            metrics: MetricsSection {
                bars_per_year: params.bars_per_year,
            },
        }
    }

    /// Deterministic hash of the strategy, risk, and metrics sections.
    ///
    /// The data section is excluded: the same rules on a different file
    /// share a hash.
    pub fn config_hash(&self) -> ConfigHash {
        let key = (&self.strategy, &self.risk, &self.metrics);
        let json = serde_json::to_vec(&key).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = BacktestConfig::from_toml("").unwrap();
        assert_eq!(config, BacktestConfig::default());
        assert_eq!(config.to_params().unwrap(), StrategyParams::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = BacktestConfig::from_toml(
            r#"
            [strategy]
            fast_period = 8

            [risk]
            take_profit_percent = 3.0
            "#,
        )
        .unwrap();
        let params = config.to_params().unwrap();
        assert_eq!(params.fast_period, 8);
        assert_eq!(params.slow_period, 26);
        assert_eq!(params.take_profit_percent, 3.0);
        assert_eq!(params.stop_loss_percent, 2.0);
    }

    #[test]
    fn invalid_periods_rejected() {
        let config = BacktestConfig::from_toml(
            r#"
            [strategy]
            fast_period = 30
            slow_period = 26
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.to_params(),
            Err(ConfigError::Params(ParamError::FastNotBelowSlow { .. }))
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = BacktestConfig::from_toml("[strategy\nfast_period = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn toml_roundtrip_preserves_data_path() {
        let mut config = BacktestConfig::default();
        config.data.path = Some(PathBuf::from("prices.csv"));
        config.data.symbol = Some("XAUUSD".into());
        let text = config.to_toml().unwrap();
        assert_eq!(BacktestConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn hash_ignores_data_section() {
        let a = BacktestConfig::default();
        let mut b = BacktestConfig::default();
        b.data.path = Some(PathBuf::from("other.csv"));
        assert_eq!(a.config_hash(), b.config_hash());

        let c = a.with_params(&StrategyParams::default().with_periods(5, 20));
        assert_ne!(a.config_hash(), c.config_hash());
        assert_eq!(a.config_hash().len(), 64);
    }
}
