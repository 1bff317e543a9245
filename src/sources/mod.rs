//! Position source adapters, one per DeFi protocol, all behind [`PositionSource`].
//!
//! Adapters only issue read-only calls and never retry: a failed read fails
//! the token for this cycle and the next cycle tries again.

pub mod aave;
pub mod curve;
pub mod maker;
pub mod pendle;
pub mod uniswap;

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use async_trait::async_trait;

use crate::config::ProtocolAddresses;
use crate::error::SourceUnavailable;
use crate::ProtocolSource;

pub use aave::AaveCollateralSource;
pub use curve::CurveShareSource;
pub use maker::MakerVaultSource;
pub use pendle::PendleBalanceSource;
pub use uniswap::UniswapShareSource;

#[async_trait]
pub trait PositionSource: Send + Sync {
    fn protocol(&self) -> ProtocolSource;

    /// Current valuation of `owner`'s position in this protocol.
    async fn fetch_value(&self, owner: Address) -> Result<U256, SourceUnavailable>;
}

/// Builds the five adapters in [`ProtocolSource::ALL`] order.
pub fn build_sources<P>(provider: Arc<P>, addrs: &ProtocolAddresses) -> Vec<Arc<dyn PositionSource>>
where
    P: Provider + Clone + 'static,
{
    vec![
        Arc::new(UniswapShareSource::new(addrs.uniswap_pool, provider.clone())),
        Arc::new(AaveCollateralSource::new(addrs.aave_pool, provider.clone())),
        Arc::new(CurveShareSource::new(
            addrs.curve_pool,
            addrs.curve_lp_token,
            addrs.curve_n_coins,
            provider.clone(),
        )),
        Arc::new(MakerVaultSource::new(addrs.maker_vat, addrs.maker_ilk, provider.clone())),
        Arc::new(PendleBalanceSource::new(addrs.pendle_market, provider)),
    ]
}

/// `pooled × balance ÷ supply`, the owner's pro-rata slice of a pool.
///
/// Zero supply yields zero. Multiplies first to keep precision; when the
/// product does not fit in 256 bits it divides first and saturates.
pub fn pro_rata_share(balance: U256, supply: U256, pooled: U256) -> U256 {
    if supply.is_zero() {
        return U256::ZERO;
    }
    match pooled.checked_mul(balance) {
        Some(product) => product / supply,
        None => (pooled / supply).saturating_mul(balance),
    }
}
