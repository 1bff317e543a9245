//! Service configuration, read from the environment (after `dotenv`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{address, Address, B256};
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use url::Url;

pub const DEFAULT_REPUTATION_API_URL: &str = "https://api.kaito.ai/api/v1/yaps";

// Mainnet defaults.
const UNISWAP_POOL: Address = address!("1d42064Fc4Beb5F8aAF85F4617AE8b3b5B8Bd801");
const AAVE_POOL: Address = address!("7d2768dE32b0b80b7a3454c06BdAc94A69DDc7A9");
const CURVE_POOL: Address = address!("DC24316b9AA028AcF3BeD0E1B0DF50765D7fA2b1");
const MAKER_VAT: Address = address!("35D1b3F3D7966A1DFe207aa4514C12a259A0492B");
const PENDLE_MARKET: Address = address!("4f3a120E72C76c22ae802D129F599BFDbc31cb81");

// ─────────────────────────────────────────────────────────
// Protocol contracts
// ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProtocolAddresses {
    pub uniswap_pool: Address,
    pub aave_pool: Address,
    pub curve_pool: Address,
    /// Older Curve pools keep LP accounting in a separate token contract.
    pub curve_lp_token: Address,
    pub curve_n_coins: u64,
    pub maker_vat: Address,
    /// Collateral type used for the Vat `urns` lookup, e.g. `ETH-A`.
    pub maker_ilk: B256,
    pub pendle_market: Address,
}

impl Default for ProtocolAddresses {
    fn default() -> Self {
        Self {
            uniswap_pool: UNISWAP_POOL,
            aave_pool: AAVE_POOL,
            curve_pool: CURVE_POOL,
            curve_lp_token: CURVE_POOL,
            curve_n_coins: 2,
            maker_vat: MAKER_VAT,
            maker_ilk: B256::right_padding_from(b"ETH-A"),
            pendle_market: PENDLE_MARKET,
        }
    }
}

/// Encodes a Maker collateral name as a right-padded `bytes32`.
pub fn ilk(name: &str) -> Result<B256> {
    let name = name.trim();
    if name.is_empty() {
        bail!("collateral name is empty");
    }
    if name.len() > 32 {
        bail!("collateral name {name} is longer than 32 bytes");
    }
    Ok(B256::right_padding_from(name.as_bytes()))
}

// ─────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct ServiceConfig {
    pub rpc_url: Url,
    pub private_key: SecretString,
    pub nft_contract: Address,
    pub reputation_api_url: Url,
    pub reputation_api_key: Option<SecretString>,
    pub reputation_timeout: Duration,
    pub protocols: ProtocolAddresses,
    pub update_interval: Duration,
    pub confirmation_timeout: Duration,
    pub required_confirmations: u64,
    pub shutdown_grace: Duration,
    pub log_dir: Option<PathBuf>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing optional keys take their
    /// defaults; present but malformed values are errors.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} must be set"))
        };

        let rpc_url: Url = required("RPC_URL")?.parse().context("invalid RPC_URL")?;
        let private_key = SecretString::from(required("PRIVATE_KEY")?);
        let nft_contract: Address = required("NFT_CONTRACT_ADDRESS")?
            .parse()
            .context("invalid NFT_CONTRACT_ADDRESS")?;

        let defaults = ProtocolAddresses::default();
        let curve_pool = parse_or(&var, "CURVE_POOL", defaults.curve_pool)?;
        let protocols = ProtocolAddresses {
            uniswap_pool: parse_or(&var, "UNISWAP_POOL", defaults.uniswap_pool)?,
            aave_pool: parse_or(&var, "AAVE_POOL", defaults.aave_pool)?,
            curve_pool,
            curve_lp_token: parse_or(&var, "CURVE_LP_TOKEN", curve_pool)?,
            curve_n_coins: parse_or(&var, "CURVE_N_COINS", defaults.curve_n_coins)?,
            maker_vat: parse_or(&var, "MAKER_VAT", defaults.maker_vat)?,
            maker_ilk: match var("MAKER_ILK") {
                Some(raw) => ilk(&raw).context("invalid MAKER_ILK")?,
                None => defaults.maker_ilk,
            },
            pendle_market: parse_or(&var, "PENDLE_MARKET", defaults.pendle_market)?,
        };
        if protocols.curve_n_coins == 0 {
            bail!("CURVE_N_COINS must be at least 1");
        }

        let update_interval = Duration::from_secs(parse_or(&var, "UPDATE_INTERVAL_SECS", 300u64)?);
        if update_interval.is_zero() {
            bail!("UPDATE_INTERVAL_SECS must be greater than zero");
        }

        let required_confirmations = parse_or(&var, "REQUIRED_CONFIRMATIONS", 1u64)?;
        if required_confirmations == 0 {
            bail!("REQUIRED_CONFIRMATIONS must be at least 1");
        }

        Ok(Self {
            rpc_url,
            private_key,
            nft_contract,
            reputation_api_url: parse_or(
                &var,
                "REPUTATION_API_URL",
                Url::parse(DEFAULT_REPUTATION_API_URL)?,
            )?,
            reputation_api_key: var("KAITO_API_KEY")
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            reputation_timeout: Duration::from_secs(parse_or(&var, "REPUTATION_TIMEOUT_SECS", 10u64)?),
            protocols,
            update_interval,
            confirmation_timeout: Duration::from_secs(parse_or(
                &var,
                "CONFIRMATION_TIMEOUT_SECS",
                120u64,
            )?),
            required_confirmations,
            shutdown_grace: Duration::from_secs(parse_or(&var, "SHUTDOWN_GRACE_SECS", 30u64)?),
            log_dir: var("LOG_DIR").filter(|v| !v.is_empty()).map(PathBuf::from),
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw}: {e}")),
        _ => Ok(default),
    }
}
