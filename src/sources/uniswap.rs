use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_sol_types::sol;
use async_trait::async_trait;
use tracing::debug;

use super::{pro_rata_share, PositionSource};
use crate::error::SourceUnavailable;
use crate::ProtocolSource;

sol! {
    #[sol(rpc)]
    interface IUniswapV2Pair {
        function balanceOf(address owner) external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }
}

/// Owner's share of a V2-style pair: LP balance over LP supply, applied to
/// the sum of both reserves.
#[derive(Clone)]
pub struct UniswapShareSource<P>
where
    P: Provider + Clone + 'static,
{
    pair: Address,
    provider: Arc<P>,
}

impl<P> UniswapShareSource<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(pair: Address, provider: Arc<P>) -> Self {
        Self { pair, provider }
    }
}

#[async_trait]
impl<P> PositionSource for UniswapShareSource<P>
where
    P: Provider + Clone + 'static,
{
    fn protocol(&self) -> ProtocolSource {
        ProtocolSource::Uniswap
    }

    async fn fetch_value(&self, owner: Address) -> Result<U256, SourceUnavailable> {
        let pair = IUniswapV2Pair::new(self.pair, self.provider.clone());
        let balance_builder = pair.balanceOf(owner);
        let supply_builder = pair.totalSupply();
        let reserves_builder = pair.getReserves();
        let (balance, supply, reserves) = tokio::try_join!(
            balance_builder.call(),
            supply_builder.call(),
            reserves_builder.call()
        )
        .map_err(|e| SourceUnavailable::new(self.protocol(), e))?;

        let pooled = U256::from(reserves.reserve0).saturating_add(U256::from(reserves.reserve1));
        let value = pro_rata_share(balance, supply, pooled);
        debug!(
            "uniswap {:?}: balance={} supply={} pooled={} -> {}",
            owner, balance, supply, pooled, value
        );
        Ok(value)
    }
}
