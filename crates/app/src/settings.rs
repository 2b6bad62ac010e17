//! Handles settings for the application. Configuration is read from
//! `settings.toml`, every key can be overridden with a `SPLITLEDGER__`
//! prefixed environment variable (`SPLITLEDGER__SERVER__PORT=8080`).

use config::{Config, ConfigError, Environment, File};
use engine::{Currency, ScorePolicy};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sweep {
    pub interval_secs: u64,
}

impl Default for Sweep {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
        }
    }
}

/// One directed exchange rate, scaled by 10 000.
#[derive(Debug, Deserialize)]
pub struct Rate {
    pub from: Currency,
    pub to: Currency,
    pub rate_bps: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Rates {
    pub reference_currency: Currency,
    pub table: Vec<Rate>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub score: ScorePolicy,
    #[serde(default)]
    pub sweep: Sweep,
    #[serde(default)]
    pub rates: Rates,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(Environment::with_prefix("SPLITLEDGER").separator("__"))
                .build()?,
        )
    }

    fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }
}
