//! Writes one token's record back to the collection
//! contract and waits for the receipt.
//!
//! Failures are reported as a value ([`SubmitOutcome::Failed`]) and logged
//! here, so the orchestrator's token loop never unwinds.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::TxHash;
use tracing::{debug, info, warn};

use crate::error::{SubmissionError, SubmitStage};
use crate::ledger::MetadataRegistry;
use crate::{Holder, MetadataRecord, TokenId};

#[derive(Debug)]
pub enum SubmitOutcome {
    Confirmed(TxHash),
    Failed(SubmissionError),
}

pub struct UpdateSubmitter {
    registry: Arc<dyn MetadataRegistry>,
    confirmation_timeout: Duration,
}

impl UpdateSubmitter {
    pub fn new(registry: Arc<dyn MetadataRegistry>, confirmation_timeout: Duration) -> Self {
        Self {
            registry,
            confirmation_timeout,
        }
    }

    /// Reads the token's current owner and handle. Called right before
    /// aggregation so a transfer between cycles is always picked up.
    pub async fn resolve_holder(&self, token_id: TokenId) -> Result<Holder, SubmissionError> {
        let (owner, handle) = tokio::try_join!(
            self.registry.owner_of(token_id),
            self.registry.social_handle(token_id)
        )
        .map_err(|e| SubmissionError::new(token_id, SubmitStage::ResolveHolder, format!("{e:#}")))?;
        debug!("token {} held by {:?} (@{})", token_id, owner, handle);
        Ok(Holder { owner, handle })
    }

    pub async fn submit(&self, record: &MetadataRecord) -> SubmitOutcome {
        let token_id = record.token_id();
        match serde_json::to_string(&record.to_token_metadata()) {
            Ok(json) => debug!("token {} metadata: {}", token_id, json),
            Err(e) => debug!("token {} metadata not renderable: {}", token_id, e),
        }

        let update = self
            .registry
            .update_performance_metrics(token_id, record.update_args());
        let outcome = match tokio::time::timeout(self.confirmation_timeout, update).await {
            Ok(Ok(tx)) => SubmitOutcome::Confirmed(tx),
            Ok(Err(e)) => SubmitOutcome::Failed(SubmissionError::new(
                token_id,
                SubmitStage::Submit,
                format!("{e:#}"),
            )),
            Err(_) => SubmitOutcome::Failed(SubmissionError::new(
                token_id,
                SubmitStage::Timeout,
                format!("update not sent and confirmed within {:?}", self.confirmation_timeout),
            )),
        };

        match &outcome {
            SubmitOutcome::Confirmed(tx) => info!("✅ token {} metadata updated in {:?}", token_id, tx),
            SubmitOutcome::Failed(e) => warn!("❌ {}", e),
        }
        outcome
    }
}
