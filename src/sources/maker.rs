use std::sync::Arc;

use alloy_primitives::{Address, B256, U256};
use alloy_provider::Provider;
use alloy_sol_types::sol;
use async_trait::async_trait;

use super::PositionSource;
use crate::error::SourceUnavailable;
use crate::ProtocolSource;

sol! {
    #[sol(rpc)]
    interface IVat {
        function urns(bytes32 ilk, address urn) external view returns (uint256 ink, uint256 art);
    }
}

/// Net position of the owner's vault: locked collateral (`ink`) minus
/// normalized debt (`art`).
#[derive(Clone)]
pub struct MakerVaultSource<P>
where
    P: Provider + Clone + 'static,
{
    vat: Address,
    ilk: B256,
    provider: Arc<P>,
}

impl<P> MakerVaultSource<P>
where
    P: Provider + Clone + 'static,
{
    pub fn new(vat: Address, ilk: B256, provider: Arc<P>) -> Self {
        Self { vat, ilk, provider }
    }
}

#[async_trait]
impl<P> PositionSource for MakerVaultSource<P>
where
    P: Provider + Clone + 'static,
{
    fn protocol(&self) -> ProtocolSource {
        ProtocolSource::MakerDao
    }

    async fn fetch_value(&self, owner: Address) -> Result<U256, SourceUnavailable> {
        let vat = IVat::new(self.vat, self.provider.clone());
        let urn = vat
            .urns(self.ilk, owner)
            .call()
            .await
            .map_err(|e| SourceUnavailable::new(self.protocol(), e))?;
        Ok(net_position(urn.ink, urn.art))
    }
}

/// Position values are non-negative; an underwater vault reports zero.
fn net_position(ink: U256, art: U256) -> U256 {
    ink.saturating_sub(art)
}
