//! One full update cycle: enumerate, then resolve, aggregate
//! and submit each token in enumeration order.
//!
//! Only enumeration failure aborts a cycle. Per-token failures are logged,
//! collected in the [`CycleReport`] and retried by the next cycle.

use std::sync::Arc;

use alloy_primitives::TxHash;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::aggregator::Aggregator;
use crate::enumerator::list_token_ids;
use crate::error::UpdateError;
use crate::ledger::MetadataRegistry;
use crate::scheduler::CycleRunner;
use crate::submitter::{SubmitOutcome, UpdateSubmitter};
use crate::{MetadataRecord, TokenId};

/// A confirmed per-token update.
#[derive(Debug, Clone)]
pub struct TokenUpdate {
    pub record: MetadataRecord,
    pub tx: TxHash,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Tokens returned by enumeration, i.e. iterations attempted.
    pub attempted: usize,
    pub updated: Vec<TokenId>,
    pub failed: Vec<(TokenId, UpdateError)>,
}

impl CycleReport {
    pub fn summary(&self) -> String {
        format!(
            "cycle {} | tokens={} updated={} failed={} took={}ms",
            self.cycle_id,
            self.attempted,
            self.updated.len(),
            self.failed.len(),
            (self.finished_at - self.started_at).num_milliseconds(),
        )
    }
}

pub struct MetadataUpdater {
    registry: Arc<dyn MetadataRegistry>,
    aggregator: Aggregator,
    submitter: UpdateSubmitter,
}

impl MetadataUpdater {
    pub fn new(
        registry: Arc<dyn MetadataRegistry>,
        aggregator: Aggregator,
        submitter: UpdateSubmitter,
    ) -> Self {
        Self {
            registry,
            aggregator,
            submitter,
        }
    }

    /// Resolve → aggregate, without writing anything.
    pub async fn preview_token(&self, token_id: TokenId) -> Result<MetadataRecord, UpdateError> {
        let holder = self.submitter.resolve_holder(token_id).await?;
        self.aggregator
            .aggregate(token_id, holder.owner, &holder.handle)
            .await
    }

    /// Resolve → aggregate → submit for a single token.
    pub async fn update_token(&self, token_id: TokenId) -> Result<TokenUpdate, UpdateError> {
        let record = self.preview_token(token_id).await?;
        match self.submitter.submit(&record).await {
            SubmitOutcome::Confirmed(tx) => Ok(TokenUpdate { record, tx }),
            SubmitOutcome::Failed(e) => Err(e.into()),
        }
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, UpdateError> {
        let mut report = CycleReport {
            cycle_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ..Default::default()
        };

        let token_ids = match list_token_ids(self.registry.as_ref()).await {
            Ok(ids) => ids,
            Err(e) => {
                error!("🚨 cycle {} aborted: {}", report.cycle_id, e);
                return Err(e);
            }
        };
        report.attempted = token_ids.len();
        info!("🔄 cycle {}: updating metadata for {} tokens", report.cycle_id, token_ids.len());

        for token_id in token_ids {
            match self.update_token(token_id).await {
                Ok(_) => report.updated.push(token_id),
                Err(e) => {
                    warn!("token {} skipped this cycle [{}]: {}", token_id, e.kind(), e);
                    report.failed.push((token_id, e));
                }
            }
        }

        report.finished_at = Utc::now();
        Ok(report)
    }
}

#[async_trait]
impl CycleRunner for MetadataUpdater {
    async fn run_cycle(&self) -> Result<CycleReport, UpdateError> {
        MetadataUpdater::run_cycle(self).await
    }
}
