// Layered settings: defaults, optional veil.toml, VEIL_* env vars, then the
// two well-known variables INFURA_API_KEY and PRIVATE_KEY.

use std::fmt;
use std::str::FromStr;

use config::{Config, Environment, File};
use ethers::signers::{LocalWallet, Signer};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{Result, VeilError};
use crate::network::NetworkId;

pub const DEFAULT_CONFIG_FILE: &str = "veil";
pub const DEFAULT_NETWORK: &str = "kovan";
pub const DEFAULT_MIN_AMOUNT: &str = "0.005";
pub const DEFAULT_MAX_AMOUNT: &str = "1";
pub const DEFAULT_LOG_FILTER: &str = "info,veil_rs=debug";

#[derive(Debug, Deserialize)]
struct RawSettings {
    network: String,
    infura_api_key: Option<String>,
    private_key: Option<String>,
    rpc_url: Option<String>,
    veil_api_url: Option<String>,
    min_amount: Decimal,
    max_amount: Decimal,
    log_filter: String,
}

#[derive(Clone)]
pub struct Settings {
    pub network: NetworkId,
    pub infura_api_key: Option<String>,
    pub private_key: Option<String>,
    /// Overrides the Infura URL derived from `network`.
    pub rpc_url: Option<String>,
    /// Overrides the veil.co API URL derived from `network`.
    pub veil_api_url: Option<String>,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub log_filter: String,
}

impl Settings {
    /// Load from the environment. `config_file` defaults to `veil.toml` in
    /// the working directory; `network` wins over every other source.
    pub fn load(config_file: Option<&str>, network: Option<&str>) -> Result<Self> {
        let cfg = Config::builder()
            .set_default("network", DEFAULT_NETWORK)?
            .set_default("min_amount", DEFAULT_MIN_AMOUNT)?
            .set_default("max_amount", DEFAULT_MAX_AMOUNT)?
            .set_default("log_filter", DEFAULT_LOG_FILTER)?
            .add_source(File::with_name(config_file.unwrap_or(DEFAULT_CONFIG_FILE)).required(config_file.is_some()))
            .add_source(Environment::with_prefix("VEIL").try_parsing(false))
            .set_override_option("infura_api_key", std::env::var("INFURA_API_KEY").ok())?
            .set_override_option("private_key", std::env::var("PRIVATE_KEY").ok())?
            .set_override_option("network", network)?
            .build()?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: Config) -> Result<Self> {
        let raw: RawSettings = cfg.try_deserialize()?;
        if raw.min_amount > raw.max_amount {
            return Err(VeilError::InvalidValue(format!(
                "min_amount {} exceeds max_amount {}",
                raw.min_amount, raw.max_amount
            )));
        }
        Ok(Self {
            network: NetworkId::from_str(&raw.network)?,
            infura_api_key: raw.infura_api_key.filter(|k| !k.trim().is_empty()),
            private_key: raw.private_key.filter(|k| !k.trim().is_empty()),
            rpc_url: raw.rpc_url,
            veil_api_url: raw.veil_api_url,
            min_amount: raw.min_amount,
            max_amount: raw.max_amount,
            log_filter: raw.log_filter,
        })
    }

    pub fn veil_api_url(&self) -> Result<String> {
        match &self.veil_api_url {
            Some(url) => Ok(url.clone()),
            None => self.network.veil_api_url().map(str::to_string),
        }
    }

    pub fn rpc_url(&self) -> Result<String> {
        if let Some(url) = &self.rpc_url {
            return Ok(url.clone());
        }
        match (&self.infura_api_key, self.network) {
            (_, NetworkId::Ganache) => Ok(self.network.infura_url("")),
            (Some(key), network) => Ok(network.infura_url(key)),
            (None, _) => Err(VeilError::InvalidValue(
                "INFURA_API_KEY or VEIL_RPC_URL must be set".to_string(),
            )),
        }
    }

    /// Signing wallet bound to the network's chain id, if a key is configured.
    pub fn wallet(&self) -> Result<Option<LocalWallet>> {
        let Some(key) = &self.private_key else {
            return Ok(None);
        };
        let wallet = LocalWallet::from_str(key.trim().trim_start_matches("0x"))
            .map_err(|e| VeilError::InvalidKey(e.to_string()))?;
        Ok(Some(wallet.with_chain_id(self.network.chain_id())))
    }
}

fn redact(v: &Option<String>) -> &'static str {
    if v.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("network", &self.network)
            .field("infura_api_key", &redact(&self.infura_api_key))
            .field("private_key", &redact(&self.private_key))
            .field("rpc_url", &self.rpc_url)
            .field("veil_api_url", &self.veil_api_url)
            .field("min_amount", &self.min_amount)
            .field("max_amount", &self.max_amount)
            .field("log_filter", &self.log_filter)
            .finish()
    }
}
