//! Request and response types exchanged between the catalog services.

use crate::catalog::{
    format::CustomIdFormat,
    identity::{InventoryId, ItemId, Principal, VersionToken},
    model::{AccessGrant, Inventory, InventoryDraft, Item, ItemFields},
};

/// Per-inventory sequence counter operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceRequest {
    /// Advance the counter by one and return the new value.
    Advance(InventoryId),
    /// Read the last issued value without advancing.
    Last(InventoryId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceResponse {
    Value(i64),
    LastValue(i64),
}

/// Custom identifier format storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatRequest {
    Get(InventoryId),
    Save {
        inventory_id: InventoryId,
        /// JSON segment document, stored wholesale after a parse check.
        definition: String,
        validation_pattern: Option<String>,
    },
    Validate {
        inventory_id: InventoryId,
        value: String,
    },
    Delete(InventoryId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatResponse {
    Document(Option<CustomIdFormat>),
    Saved(CustomIdFormat),
    Verdict(bool),
    Removed(bool),
}

/// Identifier generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateRequest {
    Generate(InventoryId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateResponse {
    Identifier(String),
}

/// Write-access evaluation and grant management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequest {
    CanWrite { principal: Principal, inventory_id: InventoryId },
    Grant { inventory_id: InventoryId, user_id: String, can_write: bool },
    Revoke { inventory_id: InventoryId, user_id: String },
    List(InventoryId),
    /// Drop every grant of one inventory.
    PurgeInventory(InventoryId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessResponse {
    WriteAccess(bool),
    Granted(AccessGrant),
    Revoked(bool),
    Grants(Vec<AccessGrant>),
    Purged(usize),
}

/// Item lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRequest {
    Create {
        inventory_id: InventoryId,
        created_by: String,
        fields: ItemFields,
    },
    Update {
        item_id: ItemId,
        version: VersionToken,
        /// Replacement custom identifier; `None` keeps the current one.
        custom_id: Option<String>,
        fields: ItemFields,
    },
    Delete(ItemId),
    Get(ItemId),
    /// Drop every item of one inventory.
    PurgeInventory(InventoryId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemResponse {
    Record(Item),
    Deleted,
    Purged(usize),
}

/// Inventory lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryRequest {
    Create {
        owner: String,
        draft: InventoryDraft,
    },
    Update {
        inventory_id: InventoryId,
        /// Version the caller last observed; `None` skips the check.
        precondition: Option<VersionToken>,
        draft: InventoryDraft,
    },
    Delete(InventoryId),
    Get(InventoryId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryResponse {
    Record(Inventory),
    Deleted,
}

/// The public catalog surface. Every mutating variant carries the caller's
/// [`Principal`] so write access can be evaluated in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRequest {
    GetFormat {
        inventory_id: InventoryId,
    },
    PreviewId {
        principal: Principal,
        inventory_id: InventoryId,
        /// Candidate segment document; parse-checked but the sample is
        /// rendered from the stored format.
        definition: String,
    },
    SaveFormat {
        principal: Principal,
        inventory_id: InventoryId,
        definition: String,
        validation_pattern: Option<String>,
    },
    ValidateId {
        inventory_id: InventoryId,
        value: String,
    },
    CreateItem {
        principal: Principal,
        inventory_id: InventoryId,
        fields: ItemFields,
    },
    UpdateItem {
        principal: Principal,
        item_id: ItemId,
        version: VersionToken,
        custom_id: Option<String>,
        fields: ItemFields,
    },
    DeleteItem {
        principal: Principal,
        item_id: ItemId,
    },
    CreateInventory {
        principal: Principal,
        draft: InventoryDraft,
    },
    UpdateInventory {
        principal: Principal,
        inventory_id: InventoryId,
        precondition: Option<VersionToken>,
        draft: InventoryDraft,
    },
    DeleteInventory {
        principal: Principal,
        inventory_id: InventoryId,
    },
    GrantAccess {
        principal: Principal,
        inventory_id: InventoryId,
        user_id: String,
        can_write: bool,
    },
    RevokeAccess {
        principal: Principal,
        inventory_id: InventoryId,
        user_id: String,
    },
    ListAccess {
        principal: Principal,
        inventory_id: InventoryId,
    },
    CheckWriteAccess {
        principal: Principal,
        inventory_id: InventoryId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResponse {
    FormatDocument(Option<CustomIdFormat>),
    Sample(String),
    FormatSaved(CustomIdFormat),
    Verdict(bool),
    Item(Item),
    Inventory(Inventory),
    Access(AccessGrant),
    AccessList(Vec<AccessGrant>),
    WriteAccess(bool),
    Deleted,
    Revoked(bool),
}
