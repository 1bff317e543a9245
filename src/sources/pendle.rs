use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_sol_types::sol;
use async_trait::async_trait;

use super::PositionSource;
use crate::error::SourceUnavailable;
use crate::ProtocolSource;

sol! {
    #[sol(rpc)]
    interface IPendleMarket {
        function balanceOf(address owner) external view returns (uint256);
    }
}

/// Owner's LP balance in a Pendle market.
#[derive(Clone)]
pub struct PendleBalanceSource<P>
where
    P: Provider + Clone + 'static,
{
    market: Address,
    provider: Arc<P>,
}

impl<P> PendleBalanceSource<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(market: Address, provider: Arc<P>) -> Self {
        Self { market, provider }
    }
}

#[async_trait]
impl<P> PositionSource for PendleBalanceSource<P>
where
    P: Provider + Clone + 'static,
{
    fn protocol(&self) -> ProtocolSource {
        ProtocolSource::Pendle
    }

    async fn fetch_value(&self, owner: Address) -> Result<U256, SourceUnavailable> {
        let market = IPendleMarket::new(self.market, self.provider.clone());
        market
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| SourceUnavailable::new(self.protocol(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{abi_word, mocked_provider, owner_of};
    use alloy_transport::mock::Asserter;

    fn source(asserter: &Asserter) -> PendleBalanceSource<impl Provider + Clone + 'static> {
        PendleBalanceSource::new(Address::repeat_byte(0x55), mocked_provider(asserter))
    }

    #[tokio::test]
    async fn test_value_is_market_balance() {
        let asserter = Asserter::new();
        asserter.push_success(&abi_word(U256::from(42u64)));

        let value = source(&asserter).fetch_value(owner_of(5)).await.unwrap();
        assert_eq!(value, U256::from(42u64));
    }

    #[tokio::test]
    async fn test_revert_is_source_unavailable() {
        let asserter = Asserter::new();
        asserter.push_failure_msg("execution reverted");

        let err = source(&asserter).fetch_value(owner_of(5)).await.unwrap_err();
        assert_eq!(err.protocol, ProtocolSource::Pendle);
        assert!(err.reason.contains("execution reverted"));
    }
}
