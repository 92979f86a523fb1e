//! Per-inventory sequence counters.

use std::{pin::Pin, sync::Arc, task::Poll};

use dashmap::DashMap;
use tower::Service;
#[cfg(feature = "shelfmark_tracing")]
use tracing::info;

use crate::catalog::{
    api::{SequenceRequest, SequenceResponse},
    error::CatalogError,
    identity::InventoryId,
};

/// Issues strictly increasing counter values, one counter per inventory.
///
/// The entry guard taken by [`advance`](Self::advance) is the single
/// serialization point: two concurrent advances on the same inventory can
/// never observe the same value.
#[derive(Clone, Default)]
pub struct SequenceService {
    sequences: Arc<DashMap<InventoryId, i64>>,
}

impl SequenceService {
    /// Advance the counter for `inventory_id` and return the new value.
    /// The first advance on a fresh inventory returns 1.
    async fn advance(&self, inventory_id: InventoryId) -> i64 {
        let mut entry = self.sequences.entry(inventory_id).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Read the last issued value, 0 when nothing was issued yet.
    async fn last(&self, inventory_id: InventoryId) -> i64 {
        self.sequences.get(&inventory_id).map(|v| *v).unwrap_or(0)
    }
}

impl Service<SequenceRequest> for SequenceService {
    type Response = SequenceResponse;
    type Error = CatalogError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: SequenceRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                SequenceRequest::Advance(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[sequence] Advance: inventory: {}", inventory_id);
                    Ok(SequenceResponse::Value(this.advance(inventory_id).await))
                }
                SequenceRequest::Last(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[sequence] Last: inventory: {}", inventory_id);
                    Ok(SequenceResponse::LastValue(this.last(inventory_id).await))
                }
            }
        })
    }
}
