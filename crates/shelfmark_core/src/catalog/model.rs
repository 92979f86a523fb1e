//! Catalog records: inventories, items and access grants.

use chrono::{DateTime, Utc};

use crate::catalog::identity::{InventoryId, ItemId, VersionToken};

/// Whether a custom field slot participates in an inventory's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    #[default]
    NotPresent,
    Optional,
    Required,
}

/// One of the fixed custom field slots of an inventory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldSlot {
    pub state: FieldState,
    pub name: Option<String>,
}

/// The custom field layout of an inventory: three slots per value kind.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomFieldSchema {
    pub strings: [FieldSlot; 3],
    pub integers: [FieldSlot; 3],
    pub booleans: [FieldSlot; 3],
    pub texts: [FieldSlot; 3],
    pub links: [FieldSlot; 3],
}

/// Caller-supplied inventory fields, used for both create and update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InventoryDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_public: bool,
    pub schema: CustomFieldSchema,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    pub id: InventoryId,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub owner: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: VersionToken,
    pub schema: CustomFieldSchema,
}

/// The fifteen optional typed value slots of an item.
///
/// Which slots are meaningful is dictated by the owning inventory's
/// [`CustomFieldSchema`]; the record itself stores them all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemFields {
    pub strings: [Option<String>; 3],
    pub integers: [Option<i64>; 3],
    pub booleans: [Option<bool>; 3],
    pub texts: [Option<String>; 3],
    pub links: [Option<String>; 3],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub inventory_id: InventoryId,
    pub custom_id: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: VersionToken,
    pub fields: ItemFields,
}

/// A per-user write grant on an inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub inventory_id: InventoryId,
    pub user_id: String,
    pub can_write: bool,
}
