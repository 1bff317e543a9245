//! Concurrent fan-out to every source plus the reputation API
//! for one token, composed into a [`MetadataRecord`].
//!
//! Financial fields are all-or-nothing: if any source fails the token gets no
//! record this cycle. Reputation never fails the token (it degrades to 0).

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use anyhow::{bail, Result};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::UpdateError;
use crate::reputation::ReputationSource;
use crate::sources::PositionSource;
use crate::{MetadataRecord, ProtocolSource, TokenId, PROTOCOL_COUNT};

pub struct Aggregator {
    sources: Vec<Arc<dyn PositionSource>>,
    reputation: Arc<dyn ReputationSource>,
}

impl Aggregator {
    /// `sources` must cover [`ProtocolSource::ALL`] exactly, in that order.
    pub fn new(
        sources: Vec<Arc<dyn PositionSource>>,
        reputation: Arc<dyn ReputationSource>,
    ) -> Result<Self> {
        let configured: Vec<ProtocolSource> = sources.iter().map(|s| s.protocol()).collect();
        if configured != ProtocolSource::ALL {
            bail!(
                "source list {:?} does not match the metadata layout {:?}",
                configured,
                ProtocolSource::ALL
            );
        }
        Ok(Self {
            sources,
            reputation,
        })
    }

    pub async fn aggregate(
        &self,
        token_id: TokenId,
        owner: Address,
        handle: &str,
    ) -> Result<MetadataRecord, UpdateError> {
        let position_calls = join_all(self.sources.iter().map(|s| s.fetch_value(owner)));
        let (results, reputation) =
            tokio::join!(position_calls, self.reputation.fetch_score(handle));

        let mut positions = [U256::ZERO; PROTOCOL_COUNT];
        let mut first_failure = None;
        for (slot, result) in positions.iter_mut().zip(results) {
            match result {
                Ok(value) => *slot = value,
                Err(e) => {
                    warn!("token {} owner {:?}: {}", token_id, owner, e);
                    first_failure.get_or_insert(e);
                }
            }
        }
        if let Some(source) = first_failure {
            return Err(UpdateError::AggregationFailed { token_id, source });
        }

        let record = MetadataRecord::new(token_id, positions, reputation);
        debug!("token {} aggregated: {:?}", token_id, record.update_args());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reputation::ReputationClient;
    use crate::testing::{as_dyn, healthy_sources, owner_of, token, FakeSource, StaticReputation};
    use std::time::Duration;

    fn aggregator(sources: &[Arc<FakeSource>], score: u64) -> Aggregator {
        Aggregator::new(as_dyn(sources), Arc::new(StaticReputation(U256::from(score)))).unwrap()
    }

    #[tokio::test]
    async fn test_record_fields_in_fixed_order() {
        let sources = healthy_sources();
        let agg = aggregator(&sources, 77);

        let record = agg.aggregate(token(7), owner_of(7), "holder7").await.unwrap();
        let args: Vec<u64> = record.update_args().iter().map(|v| v.to::<u64>()).collect();
        assert_eq!(args, vec![10, 20, 30, 40, 50, 77]);
        assert_eq!(record.token_id(), token(7));
        assert_eq!(record.position(ProtocolSource::MakerDao), U256::from(40u64));
    }

    #[tokio::test]
    async fn test_any_source_failure_fails_token() {
        let mut sources = healthy_sources();
        sources[1] = Arc::new(FakeSource::new(ProtocolSource::Aave, 20).failing_for(owner_of(12)));
        let agg = aggregator(&sources, 1);

        let err = agg.aggregate(token(12), owner_of(12), "holder12").await.unwrap_err();
        match err {
            UpdateError::AggregationFailed { token_id, source } => {
                assert_eq!(token_id, token(12));
                assert_eq!(source.protocol, ProtocolSource::Aave);
            }
            other => panic!("unexpected error: {other}"),
        }
        // every adapter was still awaited
        assert!(sources.iter().all(|s| s.calls() == 1));
    }

    #[tokio::test]
    async fn test_first_failure_in_protocol_order_is_reported() {
        let owner = owner_of(3);
        let mut sources = healthy_sources();
        sources[4] = Arc::new(FakeSource::new(ProtocolSource::Pendle, 50).failing_for(owner));
        sources[2] = Arc::new(FakeSource::new(ProtocolSource::Curve, 30).failing_for(owner));
        let agg = aggregator(&sources, 1);

        let err = agg.aggregate(token(3), owner, "").await.unwrap_err();
        assert!(matches!(
            err,
            UpdateError::AggregationFailed { source, .. } if source.protocol == ProtocolSource::Curve
        ));
    }

    #[tokio::test]
    async fn test_reputation_failure_yields_zero_score() {
        let sources = healthy_sources();
        let unreachable = ReputationClient::new(
            "http://127.0.0.1:1/api/v1/yaps".parse().unwrap(),
            None,
            Duration::from_secs(2),
        )
        .unwrap();
        let agg = Aggregator::new(as_dyn(&sources), Arc::new(unreachable)).unwrap();

        let record = agg.aggregate(token(1), owner_of(1), "holder1").await.unwrap();
        assert_eq!(record.reputation(), U256::ZERO);
        assert_eq!(record.position(ProtocolSource::Uniswap), U256::from(10u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_slowest_source_not_sum() {
        let sources: Vec<Arc<FakeSource>> = ProtocolSource::ALL
            .iter()
            .map(|p| Arc::new(FakeSource::new(*p, 1).with_delay(Duration::from_millis(100))))
            .collect();
        let agg = aggregator(&sources, 0);

        let start = tokio::time::Instant::now();
        agg.aggregate(token(1), owner_of(1), "holder1").await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(200), "took {elapsed:?}");
    }

    #[test]
    fn test_rejects_misordered_sources() {
        let mut sources = healthy_sources();
        sources.swap(0, 1);
        let result = Aggregator::new(as_dyn(&sources), Arc::new(StaticReputation(U256::ZERO)));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_missing_source() {
        let mut sources = healthy_sources();
        sources.pop();
        let result = Aggregator::new(as_dyn(&sources), Arc::new(StaticReputation(U256::ZERO)));
        assert!(result.is_err());
    }
}
