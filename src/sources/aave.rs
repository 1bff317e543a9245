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
    interface IAaveLendingPool {
        function getUserAccountData(address user) external view returns (
            uint256 totalCollateralBase,
            uint256 totalDebtBase,
            uint256 availableBorrowsBase,
            uint256 currentLiquidationThreshold,
            uint256 ltv,
            uint256 healthFactor
        );
    }
}

/// Total collateral the owner has supplied to the lending pool, in the
/// pool's base currency.
#[derive(Clone)]
pub struct AaveCollateralSource<P>
where
    P: Provider + Clone + 'static,
{
    pool: Address,
    provider: Arc<P>,
}

impl<P> AaveCollateralSource<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(pool: Address, provider: Arc<P>) -> Self {
        Self { pool, provider }
    }
}

#[async_trait]
impl<P> PositionSource for AaveCollateralSource<P>
where
    P: Provider + Clone + 'static,
{
    fn protocol(&self) -> ProtocolSource {
        ProtocolSource::Aave
    }

    async fn fetch_value(&self, owner: Address) -> Result<U256, SourceUnavailable> {
        let pool = IAaveLendingPool::new(self.pool, self.provider.clone());
        let account = pool
            .getUserAccountData(owner)
            .call()
            .await
            .map_err(|e| SourceUnavailable::new(self.protocol(), e))?;
        Ok(account.totalCollateralBase)
    }
}
