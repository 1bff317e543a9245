use alloy_primitives::U256;
use tracing::{debug, warn};

use crate::error::UpdateError;
use crate::ledger::MetadataRegistry;
use crate::TokenId;

/// Lists every tracked token by reading the count, then resolving each index.
///
/// Only a failed count read is an error. The collection may change between
/// the count read and the index reads; an index that no longer resolves is
/// logged and skipped.
pub async fn list_token_ids(registry: &dyn MetadataRegistry) -> Result<Vec<TokenId>, UpdateError> {
    let supply = registry
        .total_supply()
        .await
        .map_err(|e| UpdateError::EnumerationFailed(format!("{e:#}")))?;
    let count = u64::try_from(supply)
        .map_err(|_| UpdateError::EnumerationFailed(format!("implausible token count {supply}")))?;

    let mut token_ids = Vec::with_capacity(count.min(1024) as usize);
    for index in 0..count {
        match registry.token_by_index(U256::from(index)).await {
            Ok(token_id) => token_ids.push(token_id),
            Err(e) => {
                warn!("Skipping index {}/{}: {:#}", index, count, e);
            }
        }
    }
    debug!("Enumerated {} of {} tokens", token_ids.len(), count);
    Ok(token_ids)
}
