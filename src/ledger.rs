//! Ledger boundary: the NFT collection contract that enumerates tokens and
//! stores their performance metrics.

use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::network::ReceiptResponse;
use alloy_provider::Provider;
use alloy_sol_types::sol;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::{TokenId, PROTOCOL_COUNT};

sol! {
    #[sol(rpc)]
    interface IPerformanceNft {
        function totalSupply() external view returns (uint256);
        function tokenByIndex(uint256 index) external view returns (uint256);
        function ownerOf(uint256 tokenId) external view returns (address);
        function tokenTwitterHandles(uint256 tokenId) external view returns (string);
        function updatePerformanceMetrics(
            uint256 _tokenId,
            uint256 _uniswapValue,
            uint256 _aaveValue,
            uint256 _curveValue,
            uint256 _makerDAOValue,
            uint256 _pendleValue,
            uint256 _yapsScore
        ) external;
    }
}

/// Read and write primitives of the authoritative metadata store.
#[async_trait]
pub trait MetadataRegistry: Send + Sync {
    async fn total_supply(&self) -> Result<U256>;

    async fn token_by_index(&self, index: U256) -> Result<TokenId>;

    async fn owner_of(&self, token_id: TokenId) -> Result<Address>;

    async fn social_handle(&self, token_id: TokenId) -> Result<String>;

    /// Sends the update transaction and returns once its receipt is
    /// confirmed. A reverted transaction is an error.
    async fn update_performance_metrics(
        &self,
        token_id: TokenId,
        args: [U256; PROTOCOL_COUNT + 1],
    ) -> Result<TxHash>;
}

pub struct NftContract<P>
where
    P: Provider + Clone + 'static,
{
    address: Address,
    provider: Arc<P>,
    required_confirmations: u64,
}

impl<P> NftContract<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(address: Address, provider: Arc<P>, required_confirmations: u64) -> Self {
        Self {
            address,
            provider,
            required_confirmations,
        }
    }

    fn instance(&self) -> IPerformanceNft::IPerformanceNftInstance<Arc<P>> {
        IPerformanceNft::new(self.address, self.provider.clone())
    }
}

#[async_trait]
impl<P> MetadataRegistry for NftContract<P>
where
    P: Provider + Clone + 'static,
{
    async fn total_supply(&self) -> Result<U256> {
        let supply = self
            .instance()
            .totalSupply()
            .call()
            .await
            .context("totalSupply() failed")?;
        Ok(supply)
    }

    async fn token_by_index(&self, index: U256) -> Result<TokenId> {
        let token_id = self
            .instance()
            .tokenByIndex(index)
            .call()
            .await
            .with_context(|| format!("tokenByIndex({index}) failed"))?;
        Ok(token_id)
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Address> {
        let owner = self
            .instance()
            .ownerOf(token_id)
            .call()
            .await
            .with_context(|| format!("ownerOf({token_id}) failed"))?;
        Ok(owner)
    }

    async fn social_handle(&self, token_id: TokenId) -> Result<String> {
        let handle = self
            .instance()
            .tokenTwitterHandles(token_id)
            .call()
            .await
            .with_context(|| format!("tokenTwitterHandles({token_id}) failed"))?;
        Ok(handle)
    }

    async fn update_performance_metrics(
        &self,
        token_id: TokenId,
        args: [U256; PROTOCOL_COUNT + 1],
    ) -> Result<TxHash> {
        let [uniswap, aave, curve, maker, pendle, score] = args;
        let contract = self.instance();
        let pending = contract
            .updatePerformanceMetrics(token_id, uniswap, aave, curve, maker, pendle, score)
            .send()
            .await
            .with_context(|| format!("updatePerformanceMetrics({token_id}) rejected"))?;
        debug!("token {} update sent: {:?}", token_id, pending.tx_hash());

        let receipt = pending
            .with_required_confirmations(self.required_confirmations)
            .get_receipt()
            .await
            .with_context(|| format!("waiting for token {token_id} update receipt"))?;
        confirmed_update(token_id, receipt.status(), receipt.transaction_hash())
    }
}

fn confirmed_update(token_id: TokenId, succeeded: bool, tx: TxHash) -> Result<TxHash> {
    if !succeeded {
        bail!("update for token {} reverted in {:?}", token_id, tx);
    }
    Ok(tx)
}
