use thiserror::Error;

use crate::catalog::identity::{InventoryId, ItemId};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CatalogError {
    #[error("Catalog error, caller lacks write access")]
    Unauthorized,
    #[error("Catalog error, inventory not found: {0}")]
    InventoryNotFound(InventoryId),
    #[error("Catalog error, item not found: {0}")]
    ItemNotFound(ItemId),
    #[error("Catalog error, validation failed: {0}")]
    ValidationFailed(String),
    #[error("Catalog error, concurrent modification detected")]
    Conflict,
    #[error("Catalog error, update precondition failed")]
    PreconditionFailed,
    #[error("Catalog error, duplicate custom identifier {custom_id} in inventory {inventory_id}")]
    DuplicateIdentifier { inventory_id: InventoryId, custom_id: String },
    #[error("Catalog error, internal failure")]
    InternalCatalogError,
}
