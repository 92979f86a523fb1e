//! Write-access evaluation and grant management.

use std::{pin::Pin, sync::Arc, task::Poll};

use dashmap::DashMap;
use tower::Service;
#[cfg(feature = "shelfmark_tracing")]
use tracing::info;

use crate::catalog::{
    api::{AccessRequest, AccessResponse},
    error::CatalogError,
    identity::{InventoryId, Principal},
    model::{AccessGrant, Inventory},
};

/// Answers "may this principal write to this inventory" and manages the
/// per-user grant table backing that answer.
///
/// Decision order: anonymous callers are refused, admins are allowed,
/// then ownership, then the explicit grant. A missing inventory refuses
/// everyone but admins.
#[derive(Clone)]
pub struct AccessService {
    grants: Arc<DashMap<(InventoryId, String), bool>>,
    inventories: Arc<DashMap<InventoryId, Inventory>>,
}

impl AccessService {
    /// `inventories` is the live table shared with the inventory service.
    pub fn new(inventories: Arc<DashMap<InventoryId, Inventory>>) -> Self {
        Self { grants: Arc::new(DashMap::new()), inventories }
    }

    async fn can_write(&self, principal: &Principal, inventory_id: InventoryId) -> bool {
        let Some(user_id) = principal.user_id() else {
            return false;
        };
        if principal.is_admin() {
            return true;
        }
        let Some(inventory) = self.inventories.get(&inventory_id) else {
            return false;
        };
        if inventory.owner == user_id {
            return true;
        }
        self.grants
            .get(&(inventory_id, user_id.to_string()))
            .map(|can_write| *can_write)
            .unwrap_or(false)
    }

    /// Upsert a grant; a `can_write: false` grant explicitly refuses.
    async fn grant(&self, inventory_id: InventoryId, user_id: String, can_write: bool) -> AccessGrant {
        self.grants.insert((inventory_id, user_id.clone()), can_write);
        AccessGrant { inventory_id, user_id, can_write }
    }

    async fn revoke(&self, inventory_id: InventoryId, user_id: String) -> bool {
        self.grants.remove(&(inventory_id, user_id)).is_some()
    }

    async fn purge_inventory(&self, inventory_id: InventoryId) -> usize {
        let users: Vec<String> = self
            .grants
            .iter()
            .filter(|entry| entry.key().0 == inventory_id)
            .map(|entry| entry.key().1.clone())
            .collect();
        for user_id in &users {
            self.grants.remove(&(inventory_id, user_id.clone()));
        }
        users.len()
    }

    async fn list(&self, inventory_id: InventoryId) -> Vec<AccessGrant> {
        let mut grants: Vec<AccessGrant> = self
            .grants
            .iter()
            .filter(|entry| entry.key().0 == inventory_id)
            .map(|entry| AccessGrant {
                inventory_id,
                user_id: entry.key().1.clone(),
                can_write: *entry.value(),
            })
            .collect();
        grants.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        grants
    }
}

impl Service<AccessRequest> for AccessService {
    type Response = AccessResponse;
    type Error = CatalogError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: AccessRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                AccessRequest::CanWrite { principal, inventory_id } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!(
                        "[access] CanWrite: user: {:?}, inventory: {}",
                        principal.user_id(),
                        inventory_id
                    );
                    Ok(AccessResponse::WriteAccess(this.can_write(&principal, inventory_id).await))
                }
                AccessRequest::Grant { inventory_id, user_id, can_write } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!(
                        "[access] Grant: user: {}, inventory: {}, can_write: {}",
                        user_id, inventory_id, can_write
                    );
                    Ok(AccessResponse::Granted(this.grant(inventory_id, user_id, can_write).await))
                }
                AccessRequest::Revoke { inventory_id, user_id } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[access] Revoke: user: {}, inventory: {}", user_id, inventory_id);
                    Ok(AccessResponse::Revoked(this.revoke(inventory_id, user_id).await))
                }
                AccessRequest::List(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[access] List: inventory: {}", inventory_id);
                    Ok(AccessResponse::Grants(this.list(inventory_id).await))
                }
                AccessRequest::PurgeInventory(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[access] PurgeInventory: inventory: {}", inventory_id);
                    Ok(AccessResponse::Purged(this.purge_inventory(inventory_id).await))
                }
            }
        })
    }
}
