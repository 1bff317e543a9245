//! Error taxonomy of the update pipeline.
//!
//! Only [`UpdateError::EnumerationFailed`] aborts a cycle. The other kinds are
//! scoped to a single token and are logged and skipped by the orchestrator.

use std::fmt;

use crate::{ProtocolSource, TokenId};

/// A source adapter could not produce a position value.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{protocol} source unavailable: {reason}")]
pub struct SourceUnavailable {
    pub protocol: ProtocolSource,
    pub reason: String,
}

impl SourceUnavailable {
    pub fn new(protocol: ProtocolSource, reason: impl fmt::Display) -> Self {
        Self {
            protocol,
            reason: reason.to_string(),
        }
    }
}

/// The reputation API could not be used. Never leaves the reputation adapter.
#[derive(Debug, thiserror::Error)]
#[error("reputation unavailable for '{handle}': {reason}")]
pub struct ReputationUnavailable {
    pub handle: String,
    pub reason: String,
}

/// Where a token's update broke down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    ResolveHolder,
    Submit,
    /// The deadline covers both the send and the receipt wait.
    Timeout,
}

impl fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmitStage::ResolveHolder => "holder resolution",
            SubmitStage::Submit => "update submission",
            SubmitStage::Timeout => "send/confirmation",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("token {token_id}: {stage} failed: {reason}")]
pub struct SubmissionError {
    pub token_id: TokenId,
    pub stage: SubmitStage,
    pub reason: String,
}

impl SubmissionError {
    pub fn new(token_id: TokenId, stage: SubmitStage, reason: impl fmt::Display) -> Self {
        Self {
            token_id,
            stage,
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("token enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("aggregation failed for token {token_id}: {source}")]
    AggregationFailed {
        token_id: TokenId,
        #[source]
        source: SourceUnavailable,
    },

    #[error(transparent)]
    SubmissionFailed(#[from] SubmissionError),
}

impl UpdateError {
    /// Short kind label for log lines and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateError::EnumerationFailed(_) => "EnumerationFailed",
            UpdateError::AggregationFailed { .. } => "AggregationFailed",
            UpdateError::SubmissionFailed(_) => "SubmissionFailed",
        }
    }
}
