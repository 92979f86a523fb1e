//! The public catalog API service.
//!
//! Orchestrates the leaf services and evaluates write access in one place:
//! every mutating operation resolves the target inventory first and refuses
//! the caller before any state is touched.

use std::{pin::Pin, task::Poll};

use tower::Service;
#[cfg(feature = "shelfmark_tracing")]
use tracing::info;

use crate::catalog::{
    api::types::{
        AccessRequest, AccessResponse, CatalogRequest, CatalogResponse, FormatRequest,
        FormatResponse, GenerateRequest, GenerateResponse, InventoryRequest, InventoryResponse,
        ItemRequest, ItemResponse,
    },
    error::CatalogError,
    format::parse_definition,
    identity::{InventoryId, Principal},
};

#[derive(Clone)]
pub struct CatalogApiService<A, V, I, G, F> {
    access: A,
    inventories: V,
    items: I,
    generator: G,
    formats: F,
}

impl<A, V, I, G, F> CatalogApiService<A, V, I, G, F> {
    pub fn new(access: A, inventories: V, items: I, generator: G, formats: F) -> Self {
        Self { access, inventories, items, generator, formats }
    }
}

/// Refuse the caller unless the access service grants write on the inventory.
async fn require_write<A>(
    access: &A,
    principal: Principal,
    inventory_id: InventoryId,
) -> Result<(), CatalogError>
where
    A: Service<AccessRequest, Response = AccessResponse, Error = CatalogError> + Clone + Sync,
{
    match access.clone().call(AccessRequest::CanWrite { principal, inventory_id }).await? {
        AccessResponse::WriteAccess(true) => Ok(()),
        AccessResponse::WriteAccess(false) => Err(CatalogError::Unauthorized),
        _ => Err(CatalogError::InternalCatalogError),
    }
}

impl<A, V, I, G, F> Service<CatalogRequest> for CatalogApiService<A, V, I, G, F>
where
    A: Service<AccessRequest, Response = AccessResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    A::Future: Send,
    V: Service<InventoryRequest, Response = InventoryResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    V::Future: Send,
    I: Service<ItemRequest, Response = ItemResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    I::Future: Send,
    G: Service<GenerateRequest, Response = GenerateResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    G::Future: Send,
    F: Service<FormatRequest, Response = FormatResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    F::Future: Send,
{
    type Response = CatalogResponse;
    type Error = CatalogError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: CatalogRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                CatalogRequest::GetFormat { inventory_id } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] GetFormat: inventory: {}", inventory_id);
                    match this.formats.clone().call(FormatRequest::Get(inventory_id)).await? {
                        FormatResponse::Document(format) => {
                            Ok(CatalogResponse::FormatDocument(format))
                        }
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::PreviewId { principal, inventory_id, definition } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] PreviewId: inventory: {}", inventory_id);
                    // Any authenticated caller may preview, write access is
                    // not required.
                    if !principal.is_authenticated() {
                        return Err(CatalogError::Unauthorized);
                    }
                    // The submitted document must parse, but the sample comes
                    // from the stored format and consumes a real sequence
                    // value.
                    parse_definition(&definition)?;
                    match this
                        .generator
                        .clone()
                        .call(GenerateRequest::Generate(inventory_id))
                        .await?
                    {
                        GenerateResponse::Identifier(sample) => Ok(CatalogResponse::Sample(sample)),
                    }
                }
                CatalogRequest::SaveFormat {
                    principal,
                    inventory_id,
                    definition,
                    validation_pattern,
                } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] SaveFormat: inventory: {}", inventory_id);
                    require_write(&this.access, principal, inventory_id).await?;
                    match this
                        .formats
                        .clone()
                        .call(FormatRequest::Save { inventory_id, definition, validation_pattern })
                        .await?
                    {
                        FormatResponse::Saved(format) => Ok(CatalogResponse::FormatSaved(format)),
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::ValidateId { inventory_id, value } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] ValidateId: inventory: {}", inventory_id);
                    match this
                        .formats
                        .clone()
                        .call(FormatRequest::Validate { inventory_id, value })
                        .await?
                    {
                        FormatResponse::Verdict(verdict) => Ok(CatalogResponse::Verdict(verdict)),
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::CreateItem { principal, inventory_id, fields } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] CreateItem: inventory: {}", inventory_id);
                    let created_by = principal
                        .user_id()
                        .map(str::to_string)
                        .ok_or(CatalogError::Unauthorized)?;
                    require_write(&this.access, principal, inventory_id).await?;
                    // Admins pass the access check even for unknown
                    // inventories, so existence is checked separately.
                    this.inventories.clone().call(InventoryRequest::Get(inventory_id)).await?;
                    match this
                        .items
                        .clone()
                        .call(ItemRequest::Create { inventory_id, created_by, fields })
                        .await?
                    {
                        ItemResponse::Record(item) => Ok(CatalogResponse::Item(item)),
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::UpdateItem { principal, item_id, version, custom_id, fields } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] UpdateItem: item: {}", item_id);
                    let inventory_id =
                        match this.items.clone().call(ItemRequest::Get(item_id)).await? {
                            ItemResponse::Record(item) => item.inventory_id,
                            _ => return Err(CatalogError::InternalCatalogError),
                        };
                    require_write(&this.access, principal, inventory_id).await?;
                    match this
                        .items
                        .clone()
                        .call(ItemRequest::Update { item_id, version, custom_id, fields })
                        .await?
                    {
                        ItemResponse::Record(item) => Ok(CatalogResponse::Item(item)),
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::DeleteItem { principal, item_id } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] DeleteItem: item: {}", item_id);
                    let inventory_id =
                        match this.items.clone().call(ItemRequest::Get(item_id)).await? {
                            ItemResponse::Record(item) => item.inventory_id,
                            _ => return Err(CatalogError::InternalCatalogError),
                        };
                    require_write(&this.access, principal, inventory_id).await?;
                    match this.items.clone().call(ItemRequest::Delete(item_id)).await? {
                        ItemResponse::Deleted => Ok(CatalogResponse::Deleted),
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::CreateInventory { principal, draft } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] CreateInventory: owner: {:?}", principal.user_id());
                    let owner = principal
                        .user_id()
                        .map(str::to_string)
                        .ok_or(CatalogError::Unauthorized)?;
                    match this
                        .inventories
                        .clone()
                        .call(InventoryRequest::Create { owner, draft })
                        .await?
                    {
                        InventoryResponse::Record(inventory) => {
                            Ok(CatalogResponse::Inventory(inventory))
                        }
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::UpdateInventory {
                    principal,
                    inventory_id,
                    precondition,
                    draft,
                } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] UpdateInventory: inventory: {}", inventory_id);
                    require_write(&this.access, principal, inventory_id).await?;
                    match this
                        .inventories
                        .clone()
                        .call(InventoryRequest::Update { inventory_id, precondition, draft })
                        .await?
                    {
                        InventoryResponse::Record(inventory) => {
                            Ok(CatalogResponse::Inventory(inventory))
                        }
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::DeleteInventory { principal, inventory_id } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] DeleteInventory: inventory: {}", inventory_id);
                    require_write(&this.access, principal, inventory_id).await?;
                    match this
                        .inventories
                        .clone()
                        .call(InventoryRequest::Delete(inventory_id))
                        .await?
                    {
                        InventoryResponse::Deleted => {
                            // Cascade: items, stored format and grants go
                            // with the inventory. The sequence counter is
                            // kept, inventory ids never recycle.
                            this.items
                                .clone()
                                .call(ItemRequest::PurgeInventory(inventory_id))
                                .await?;
                            this.formats
                                .clone()
                                .call(FormatRequest::Delete(inventory_id))
                                .await?;
                            this.access
                                .clone()
                                .call(AccessRequest::PurgeInventory(inventory_id))
                                .await?;
                            Ok(CatalogResponse::Deleted)
                        }
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::GrantAccess { principal, inventory_id, user_id, can_write } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] GrantAccess: inventory: {}, user: {}", inventory_id, user_id);
                    require_write(&this.access, principal, inventory_id).await?;
                    match this
                        .access
                        .clone()
                        .call(AccessRequest::Grant { inventory_id, user_id, can_write })
                        .await?
                    {
                        AccessResponse::Granted(grant) => Ok(CatalogResponse::Access(grant)),
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::RevokeAccess { principal, inventory_id, user_id } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] RevokeAccess: inventory: {}, user: {}", inventory_id, user_id);
                    require_write(&this.access, principal, inventory_id).await?;
                    match this
                        .access
                        .clone()
                        .call(AccessRequest::Revoke { inventory_id, user_id })
                        .await?
                    {
                        AccessResponse::Revoked(revoked) => Ok(CatalogResponse::Revoked(revoked)),
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::ListAccess { principal, inventory_id } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] ListAccess: inventory: {}", inventory_id);
                    require_write(&this.access, principal, inventory_id).await?;
                    match this.access.clone().call(AccessRequest::List(inventory_id)).await? {
                        AccessResponse::Grants(grants) => Ok(CatalogResponse::AccessList(grants)),
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
                CatalogRequest::CheckWriteAccess { principal, inventory_id } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[catalog] CheckWriteAccess: inventory: {}", inventory_id);
                    match this
                        .access
                        .clone()
                        .call(AccessRequest::CanWrite { principal, inventory_id })
                        .await?
                    {
                        AccessResponse::WriteAccess(can_write) => {
                            Ok(CatalogResponse::WriteAccess(can_write))
                        }
                        _ => Err(CatalogError::InternalCatalogError),
                    }
                }
            }
        })
    }
}
