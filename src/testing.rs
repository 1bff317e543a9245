//! In-memory fakes for the ledger, the sources and the reputation API.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_sol_types::SolValue;
use alloy_transport::mock::Asserter;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::error::SourceUnavailable;
use crate::ledger::MetadataRegistry;
use crate::reputation::ReputationSource;
use crate::sources::PositionSource;
use crate::{ProtocolSource, TokenId, PROTOCOL_COUNT};

pub fn token(id: u64) -> TokenId {
    U256::from(id)
}

/// Deterministic owner of a fake token.
pub fn owner_of(id: u64) -> Address {
    Address::with_last_byte(id as u8)
}

pub fn handle_of(id: u64) -> String {
    format!("holder{id}")
}

pub fn tx_of(token_id: TokenId) -> TxHash {
    TxHash::with_last_byte(token_id.to::<u8>())
}

// ─────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeRegistry {
    tokens: Vec<u64>,
    fail_count: bool,
    vanished: HashSet<u64>,
    unresolvable: HashSet<u64>,
    rejected: HashSet<u64>,
    confirm_delay: Duration,
    index_reads: AtomicUsize,
    owner_lookups: Mutex<Vec<TokenId>>,
    submissions: Mutex<Vec<(TokenId, [U256; PROTOCOL_COUNT + 1])>>,
}

impl FakeRegistry {
    pub fn new(tokens: &[u64]) -> Self {
        Self {
            tokens: tokens.to_vec(),
            ..Default::default()
        }
    }

    pub fn failing_count(mut self) -> Self {
        self.fail_count = true;
        self
    }

    pub fn vanished_index(mut self, index: u64) -> Self {
        self.vanished.insert(index);
        self
    }

    pub fn unresolvable(mut self, id: u64) -> Self {
        self.unresolvable.insert(id);
        self
    }

    pub fn rejecting(mut self, id: u64) -> Self {
        self.rejected.insert(id);
        self
    }

    pub fn confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    pub fn index_reads(&self) -> usize {
        self.index_reads.load(Ordering::SeqCst)
    }

    pub fn owner_lookups(&self) -> Vec<TokenId> {
        self.owner_lookups.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<(TokenId, [U256; PROTOCOL_COUNT + 1])> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataRegistry for FakeRegistry {
    async fn total_supply(&self) -> Result<U256> {
        if self.fail_count {
            bail!("connection refused");
        }
        Ok(U256::from(self.tokens.len()))
    }

    async fn token_by_index(&self, index: U256) -> Result<TokenId> {
        self.index_reads.fetch_add(1, Ordering::SeqCst);
        let i = index.to::<u64>();
        if self.vanished.contains(&i) {
            bail!("execution reverted: index out of bounds");
        }
        self.tokens
            .get(i as usize)
            .map(|id| token(*id))
            .ok_or_else(|| anyhow!("execution reverted: index out of bounds"))
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Address> {
        self.owner_lookups.lock().unwrap().push(token_id);
        let id = token_id.to::<u64>();
        if self.unresolvable.contains(&id) {
            bail!("execution reverted: invalid token ID");
        }
        Ok(owner_of(id))
    }

    async fn social_handle(&self, token_id: TokenId) -> Result<String> {
        Ok(handle_of(token_id.to::<u64>()))
    }

    async fn update_performance_metrics(
        &self,
        token_id: TokenId,
        args: [U256; PROTOCOL_COUNT + 1],
    ) -> Result<TxHash> {
        if self.rejected.contains(&token_id.to::<u64>()) {
            bail!("execution reverted: caller is not the updater");
        }
        if !self.confirm_delay.is_zero() {
            tokio::time::sleep(self.confirm_delay).await;
        }
        self.submissions.lock().unwrap().push((token_id, args));
        Ok(tx_of(token_id))
    }
}

// ─────────────────────────────────────────────────────────
// Sources
// ─────────────────────────────────────────────────────────

pub struct FakeSource {
    protocol: ProtocolSource,
    value: U256,
    failing_owners: HashSet<Address>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(protocol: ProtocolSource, value: u64) -> Self {
        Self {
            protocol,
            value: U256::from(value),
            failing_owners: HashSet::new(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_for(mut self, owner: Address) -> Self {
        self.failing_owners.insert(owner);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionSource for FakeSource {
    fn protocol(&self) -> ProtocolSource {
        self.protocol
    }

    async fn fetch_value(&self, owner: Address) -> Result<U256, SourceUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing_owners.contains(&owner) {
            return Err(SourceUnavailable::new(self.protocol, "execution reverted"));
        }
        Ok(self.value)
    }
}

/// One healthy fake per protocol, valued 10, 20, 30, 40, 50.
pub fn healthy_sources() -> Vec<Arc<FakeSource>> {
    ProtocolSource::ALL
        .iter()
        .enumerate()
        .map(|(i, p)| Arc::new(FakeSource::new(*p, (i as u64 + 1) * 10)))
        .collect()
}

pub fn as_dyn(sources: &[Arc<FakeSource>]) -> Vec<Arc<dyn PositionSource>> {
    sources
        .iter()
        .map(|s| s.clone() as Arc<dyn PositionSource>)
        .collect()
}

// ─────────────────────────────────────────────────────────
// Reputation
// ─────────────────────────────────────────────────────────

pub struct StaticReputation(pub U256);

#[async_trait]
impl ReputationSource for StaticReputation {
    async fn fetch_score(&self, _handle: &str) -> U256 {
        self.0
    }
}

// ─────────────────────────────────────────────────────────
// Chain
// ─────────────────────────────────────────────────────────

/// Provider whose JSON-RPC responses are popped, in request order, from
/// `asserter`.
pub fn mocked_provider(asserter: &Asserter) -> Arc<impl Provider + Clone + 'static> {
    Arc::new(ProviderBuilder::new().connect_mocked_client(asserter.clone()))
}

/// `eth_call` return data of a single `uint256`.
pub fn abi_word(value: U256) -> Bytes {
    Bytes::from((value,).abi_encode_params())
}

/// `eth_call` return data of several static words.
pub fn abi_words(values: &[U256]) -> Bytes {
    Bytes::from(values.iter().flat_map(|v| v.to_be_bytes::<32>()).collect::<Vec<u8>>())
}
