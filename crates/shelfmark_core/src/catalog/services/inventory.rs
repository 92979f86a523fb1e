//! Inventory lifecycle.

use std::{
    pin::Pin,
    sync::{Arc, atomic::{AtomicU64, Ordering}},
    task::Poll,
};

use chrono::Utc;
use dashmap::DashMap;
use tower::Service;
#[cfg(feature = "shelfmark_tracing")]
use tracing::info;

use crate::catalog::{
    api::{InventoryRequest, InventoryResponse},
    error::CatalogError,
    identity::{InventoryId, VersionToken},
    model::{Inventory, InventoryDraft},
};

/// Stores inventories and applies full-overwrite updates guarded by a
/// version token.
#[derive(Clone, Default)]
pub struct InventoryService {
    inventories: Arc<DashMap<InventoryId, Inventory>>,
    next_id: Arc<AtomicU64>,
}

impl InventoryService {
    /// The live inventory table, shared with the access service.
    pub fn table(&self) -> Arc<DashMap<InventoryId, Inventory>> {
        self.inventories.clone()
    }

    async fn create(&self, owner: String, draft: InventoryDraft) -> Inventory {
        let id = InventoryId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let now = Utc::now();
        let inventory = Inventory {
            id,
            title: draft.title,
            description: draft.description,
            category: draft.category,
            image_url: draft.image_url,
            owner,
            is_public: draft.is_public,
            created_at: now,
            updated_at: now,
            version: VersionToken::initial(),
            schema: draft.schema,
        };
        self.inventories.insert(id, inventory.clone());
        inventory
    }

    /// Overwrite every caller-editable field.
    ///
    /// `precondition` is checked against the version the caller last
    /// observed before any mutation; the row guard then re-checks so a
    /// concurrent writer loses cleanly instead of silently overwriting.
    async fn update(
        &self,
        inventory_id: InventoryId,
        precondition: Option<VersionToken>,
        draft: InventoryDraft,
    ) -> Result<Inventory, CatalogError> {
        let current_version = self
            .inventories
            .get(&inventory_id)
            .map(|row| row.version)
            .ok_or(CatalogError::InventoryNotFound(inventory_id))?;
        if let Some(token) = precondition
            && token != current_version
        {
            return Err(CatalogError::PreconditionFailed);
        }
        let mut row = self
            .inventories
            .get_mut(&inventory_id)
            .ok_or(CatalogError::InventoryNotFound(inventory_id))?;
        if row.version != current_version {
            return Err(CatalogError::Conflict);
        }
        row.title = draft.title;
        row.description = draft.description;
        row.category = draft.category;
        row.image_url = draft.image_url;
        row.is_public = draft.is_public;
        row.schema = draft.schema;
        row.updated_at = Utc::now();
        row.version = row.version.next();
        Ok(row.clone())
    }

    async fn delete(&self, inventory_id: InventoryId) -> Result<(), CatalogError> {
        self.inventories
            .remove(&inventory_id)
            .map(|_| ())
            .ok_or(CatalogError::InventoryNotFound(inventory_id))
    }

    async fn get(&self, inventory_id: InventoryId) -> Result<Inventory, CatalogError> {
        self.inventories
            .get(&inventory_id)
            .map(|row| row.clone())
            .ok_or(CatalogError::InventoryNotFound(inventory_id))
    }
}

impl Service<InventoryRequest> for InventoryService {
    type Response = InventoryResponse;
    type Error = CatalogError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: InventoryRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                InventoryRequest::Create { owner, draft } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[inventory] Create: owner: {}", owner);
                    Ok(InventoryResponse::Record(this.create(owner, draft).await))
                }
                InventoryRequest::Update { inventory_id, precondition, draft } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[inventory] Update: inventory: {}", inventory_id);
                    Ok(InventoryResponse::Record(
                        this.update(inventory_id, precondition, draft).await?,
                    ))
                }
                InventoryRequest::Delete(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[inventory] Delete: inventory: {}", inventory_id);
                    this.delete(inventory_id).await?;
                    Ok(InventoryResponse::Deleted)
                }
                InventoryRequest::Get(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[inventory] Get: inventory: {}", inventory_id);
                    Ok(InventoryResponse::Record(this.get(inventory_id).await?))
                }
            }
        })
    }
}
