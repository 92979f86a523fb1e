//! The catalog engine.
//!
//! Leaf services own one concern each (sequence counters, formats,
//! identifier generation, access, items, inventories); the API service in
//! [`api`] composes them behind a single [`tower::Service`] surface.

pub mod api;
pub mod error;
pub mod format;
pub mod identity;
pub mod model;
pub mod services;

use api::catalog::CatalogApiService;
use services::{
    access::AccessService, format::FormatService, generator::IdGeneratorService,
    inventory::InventoryService, item::ItemService, sequence::SequenceService,
};

pub type IdGeneratorDefaultStack = IdGeneratorService<SequenceService, FormatService>;

pub type CatalogDefaultStack = CatalogApiService<
    AccessService,
    InventoryService,
    ItemService<IdGeneratorDefaultStack, FormatService>,
    IdGeneratorDefaultStack,
    FormatService,
>;

/// Wire up the default in-memory catalog stack.
pub fn init_catalog() -> CatalogDefaultStack {
    let sequences = SequenceService::default();
    let formats = FormatService::default();
    let generator = IdGeneratorService::new(sequences, formats.clone());
    let inventories = InventoryService::default();
    let access = AccessService::new(inventories.table());
    let items = ItemService::new(generator.clone(), formats.clone());
    CatalogApiService::new(access, inventories, items, generator, formats)
}
