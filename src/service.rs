//! Wires the configured provider, contract, sources and reputation client
//! into a [`MetadataUpdater`].

use std::sync::Arc;

use alloy_provider::ProviderBuilder;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::aggregator::Aggregator;
use crate::config::ServiceConfig;
use crate::ledger::{MetadataRegistry, NftContract};
use crate::orchestrator::MetadataUpdater;
use crate::reputation::ReputationClient;
use crate::sources::build_sources;
use crate::submitter::UpdateSubmitter;

pub fn build_updater(cfg: &ServiceConfig) -> Result<MetadataUpdater> {
    let signer: PrivateKeySigner = cfg
        .private_key
        .expose_secret()
        .trim()
        .parse()
        .context("PRIVATE_KEY is not a valid secp256k1 key")?;
    info!("🔑 Updater account: {:?}", signer.address());

    let provider = ProviderBuilder::new()
        .wallet(signer)
        .connect_http(cfg.rpc_url.clone());
    let provider = Arc::new(provider);

    let registry: Arc<dyn MetadataRegistry> = Arc::new(NftContract::new(
        cfg.nft_contract,
        provider.clone(),
        cfg.required_confirmations,
    ));
    let sources = build_sources(provider, &cfg.protocols);
    let reputation = ReputationClient::new(
        cfg.reputation_api_url.clone(),
        cfg.reputation_api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_owned())),
        cfg.reputation_timeout,
    )?;
    let aggregator = Aggregator::new(sources, Arc::new(reputation))?;
    let submitter = UpdateSubmitter::new(registry.clone(), cfg.confirmation_timeout);

    info!(
        "📦 Updater wired | contract={:?} rpc={} confirmations={}",
        cfg.nft_contract,
        cfg.rpc_url.host_str().unwrap_or("?"),
        cfg.required_confirmations,
    );
    Ok(MetadataUpdater::new(registry, aggregator, submitter))
}
