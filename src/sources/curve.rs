use std::future::IntoFuture;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_sol_types::sol;
use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use super::{pro_rata_share, PositionSource};
use crate::error::SourceUnavailable;
use crate::ProtocolSource;

sol! {
    #[sol(rpc)]
    interface ICurvePool {
        function balances(uint256 i) external view returns (uint256);
    }

    #[sol(rpc)]
    interface ICurveLpToken {
        function balanceOf(address owner) external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }
}

/// Owner's share of a Curve stable pool: LP balance over LP supply, applied
/// to the sum of the pool's coin balances.
#[derive(Clone)]
pub struct CurveShareSource<P>
where
    P: Provider + Clone + 'static,
{
    pool: Address,
    lp_token: Address,
    n_coins: u64,
    provider: Arc<P>,
}

impl<P> CurveShareSource<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(pool: Address, lp_token: Address, n_coins: u64, provider: Arc<P>) -> Self {
        Self {
            pool,
            lp_token,
            n_coins,
            provider,
        }
    }
}

#[async_trait]
impl<P> PositionSource for CurveShareSource<P>
where
    P: Provider + Clone + 'static,
{
    fn protocol(&self) -> ProtocolSource {
        ProtocolSource::Curve
    }

    async fn fetch_value(&self, owner: Address) -> Result<U256, SourceUnavailable> {
        let pool = ICurvePool::new(self.pool, self.provider.clone());
        let lp = ICurveLpToken::new(self.lp_token, self.provider.clone());

        let balance_builder = lp.balanceOf(owner);
        let supply_builder = lp.totalSupply();
        let coin_builders: Vec<_> = (0..self.n_coins)
            .map(|i| pool.balances(U256::from(i)))
            .collect();
        let (balance, supply, coin_balances) = tokio::try_join!(
            balance_builder.call(),
            supply_builder.call(),
            try_join_all(coin_builders.iter().map(|b| b.call().into_future()))
        )
        .map_err(|e| SourceUnavailable::new(self.protocol(), e))?;

        let pooled = total_pooled(&coin_balances);
        let value = pro_rata_share(balance, supply, pooled);
        debug!(
            "curve {:?}: balance={} supply={} pooled={} -> {}",
            owner, balance, supply, pooled, value
        );
        Ok(value)
    }
}

fn total_pooled(coin_balances: &[U256]) -> U256 {
    coin_balances
        .iter()
        .fold(U256::ZERO, |acc, b| acc.saturating_add(*b))
}
