//! Item lifecycle.

use std::{
    pin::Pin,
    sync::{Arc, atomic::{AtomicU64, Ordering}},
    task::Poll,
};

use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use tower::Service;
#[cfg(feature = "shelfmark_tracing")]
use tracing::info;

use crate::catalog::{
    api::{FormatRequest, FormatResponse, GenerateRequest, GenerateResponse, ItemRequest,
        ItemResponse},
    error::CatalogError,
    identity::{InventoryId, ItemId, VersionToken},
    model::{Item, ItemFields},
};

/// Stores items, keeps custom identifiers unique per inventory, and applies
/// full-overwrite updates guarded by a version token.
///
/// The `custom_ids` index is the uniqueness backstop: whatever the
/// generator produced, two items of one inventory never share an
/// identifier.
#[derive(Clone)]
pub struct ItemService<G, F> {
    items: Arc<DashMap<ItemId, Item>>,
    custom_ids: Arc<DashMap<(InventoryId, String), ItemId>>,
    next_id: Arc<AtomicU64>,
    generator: G,
    formats: F,
}

impl<G, F> ItemService<G, F> {
    pub fn new(generator: G, formats: F) -> Self {
        Self {
            items: Arc::new(DashMap::new()),
            custom_ids: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(0)),
            generator,
            formats,
        }
    }
}

impl<G, F> ItemService<G, F>
where
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
    async fn create(
        &self,
        inventory_id: InventoryId,
        created_by: String,
        fields: ItemFields,
    ) -> Result<Item, CatalogError> {
        let custom_id =
            match self.generator.clone().call(GenerateRequest::Generate(inventory_id)).await? {
                GenerateResponse::Identifier(custom_id) => custom_id,
            };
        let item_id = ItemId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        // Claim the identifier before the row exists; losing the claim
        // surfaces the duplicate instead of silently retrying.
        match self.custom_ids.entry((inventory_id, custom_id.clone())) {
            Entry::Occupied(_) => {
                return Err(CatalogError::DuplicateIdentifier { inventory_id, custom_id });
            }
            Entry::Vacant(slot) => {
                slot.insert(item_id);
            }
        }
        let now = Utc::now();
        let item = Item {
            id: item_id,
            inventory_id,
            custom_id,
            created_by,
            created_at: now,
            updated_at: now,
            version: VersionToken::initial(),
            fields,
        };
        self.items.insert(item_id, item.clone());
        Ok(item)
    }

    /// Overwrite the item's fields and, when requested, its identifier.
    ///
    /// A replacement identifier is validated against the inventory's stored
    /// format before any state changes; the version check happens under the
    /// row guard so a stale writer cannot clobber a newer revision.
    async fn update(
        &self,
        item_id: ItemId,
        version: VersionToken,
        custom_id: Option<String>,
        fields: ItemFields,
    ) -> Result<Item, CatalogError> {
        let current = self
            .items
            .get(&item_id)
            .map(|row| (row.inventory_id, row.custom_id.clone()))
            .ok_or(CatalogError::ItemNotFound(item_id))?;
        let (inventory_id, current_custom_id) = current;

        let replacement = custom_id.filter(|c| !c.is_empty() && *c != current_custom_id);
        if let Some(candidate) = &replacement {
            let verdict = match self
                .formats
                .clone()
                .call(FormatRequest::Validate {
                    inventory_id,
                    value: candidate.clone(),
                })
                .await?
            {
                FormatResponse::Verdict(verdict) => verdict,
                _ => return Err(CatalogError::InternalCatalogError),
            };
            if !verdict {
                return Err(CatalogError::ValidationFailed(format!(
                    "custom identifier {candidate} does not match the inventory format"
                )));
            }
        }

        let mut row =
            self.items.get_mut(&item_id).ok_or(CatalogError::ItemNotFound(item_id))?;
        if row.version != version {
            return Err(CatalogError::Conflict);
        }
        if let Some(candidate) = replacement {
            match self.custom_ids.entry((inventory_id, candidate.clone())) {
                Entry::Occupied(_) => {
                    return Err(CatalogError::DuplicateIdentifier {
                        inventory_id,
                        custom_id: candidate,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(item_id);
                }
            }
            self.custom_ids.remove(&(inventory_id, row.custom_id.clone()));
            row.custom_id = candidate;
        }
        row.fields = fields;
        row.updated_at = Utc::now();
        row.version = row.version.next();
        Ok(row.clone())
    }

    async fn delete(&self, item_id: ItemId) -> Result<(), CatalogError> {
        let (_, item) =
            self.items.remove(&item_id).ok_or(CatalogError::ItemNotFound(item_id))?;
        self.custom_ids.remove(&(item.inventory_id, item.custom_id));
        Ok(())
    }

    async fn get(&self, item_id: ItemId) -> Result<Item, CatalogError> {
        self.items
            .get(&item_id)
            .map(|row| row.clone())
            .ok_or(CatalogError::ItemNotFound(item_id))
    }

    async fn purge_inventory(&self, inventory_id: InventoryId) -> usize {
        let doomed: Vec<ItemId> = self
            .items
            .iter()
            .filter(|entry| entry.value().inventory_id == inventory_id)
            .map(|entry| *entry.key())
            .collect();
        for item_id in &doomed {
            if let Some((_, item)) = self.items.remove(item_id) {
                self.custom_ids.remove(&(item.inventory_id, item.custom_id));
            }
        }
        doomed.len()
    }
}

impl<G, F> Service<ItemRequest> for ItemService<G, F>
where
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
    type Response = ItemResponse;
    type Error = CatalogError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ItemRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                ItemRequest::Create { inventory_id, created_by, fields } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[item] Create: inventory: {}, by: {}", inventory_id, created_by);
                    Ok(ItemResponse::Record(this.create(inventory_id, created_by, fields).await?))
                }
                ItemRequest::Update { item_id, version, custom_id, fields } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[item] Update: item: {}", item_id);
                    Ok(ItemResponse::Record(
                        this.update(item_id, version, custom_id, fields).await?,
                    ))
                }
                ItemRequest::Delete(item_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[item] Delete: item: {}", item_id);
                    this.delete(item_id).await?;
                    Ok(ItemResponse::Deleted)
                }
                ItemRequest::Get(item_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[item] Get: item: {}", item_id);
                    Ok(ItemResponse::Record(this.get(item_id).await?))
                }
                ItemRequest::PurgeInventory(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[item] PurgeInventory: inventory: {}", inventory_id);
                    Ok(ItemResponse::Purged(this.purge_inventory(inventory_id).await))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::services::{
        format::FormatService, generator::IdGeneratorService, sequence::SequenceService,
    };

    type TestItemService = ItemService<IdGeneratorService<SequenceService, FormatService>, FormatService>;

    fn items() -> (TestItemService, FormatService) {
        let formats = FormatService::default();
        let generator = IdGeneratorService::new(SequenceService::default(), formats.clone());
        (ItemService::new(generator, formats.clone()), formats)
    }

    async fn save_sku_format(formats: &mut FormatService, inventory_id: InventoryId) {
        formats
            .call(FormatRequest::Save {
                inventory_id,
                definition: r#"[{"kind":"fixed","value":"SKU-"},{"kind":"sequence","format":"D3"}]"#
                    .to_string(),
                validation_pattern: Some(r"SKU-\d{3}".to_string()),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unit_item_impl_create_generates_sequential_ids() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, mut formats) = items();
        save_sku_format(&mut formats, InventoryId(1)).await;
        let first =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        let second =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        assert_eq!(first.custom_id, "SKU-001");
        assert_eq!(second.custom_id, "SKU-002");
        assert_eq!(first.version, VersionToken::initial());
        assert_eq!(first.created_by, "alice");
    }

    #[tokio::test]
    async fn unit_item_impl_create_duplicate_identifier_rejected() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, mut formats) = items();
        formats
            .call(FormatRequest::Save {
                inventory_id: InventoryId(1),
                definition: r#"[{"kind":"fixed","value":"X"}]"#.to_string(),
                validation_pattern: None,
            })
            .await
            .unwrap();
        items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        assert_eq!(
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await,
            Err(CatalogError::DuplicateIdentifier {
                inventory_id: InventoryId(1),
                custom_id: "X".to_string()
            })
        );
        // The same fixed identifier is fine in another inventory
        formats
            .call(FormatRequest::Save {
                inventory_id: InventoryId(2),
                definition: r#"[{"kind":"fixed","value":"X"}]"#.to_string(),
                validation_pattern: None,
            })
            .await
            .unwrap();
        assert!(items.create(InventoryId(2), "alice".to_string(), ItemFields::default()).await.is_ok());
    }

    #[tokio::test]
    async fn unit_item_impl_update_overwrites_fields_wholesale() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, _) = items();
        let mut fields = ItemFields::default();
        fields.strings[0] = Some("red".to_string());
        fields.integers[1] = Some(42);
        let created = items.create(InventoryId(1), "alice".to_string(), fields).await.unwrap();

        let mut replacement = ItemFields::default();
        replacement.booleans[2] = Some(true);
        let updated =
            items.update(created.id, created.version, None, replacement.clone()).await.unwrap();
        // Slots absent from the replacement are cleared
        assert_eq!(updated.fields, replacement);
        assert_eq!(updated.custom_id, created.custom_id);
        assert_eq!(updated.version, created.version.next());
    }

    #[tokio::test]
    async fn unit_item_impl_update_stale_version_conflicts_without_mutation() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, _) = items();
        let created =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        let mut fields = ItemFields::default();
        fields.strings[0] = Some("winner".to_string());
        items.update(created.id, created.version, None, fields).await.unwrap();

        let mut stale_fields = ItemFields::default();
        stale_fields.strings[0] = Some("loser".to_string());
        assert_eq!(
            items.update(created.id, created.version, None, stale_fields).await,
            Err(CatalogError::Conflict)
        );
        let current = items.get(created.id).await.unwrap();
        assert_eq!(current.fields.strings[0].as_deref(), Some("winner"));
        assert_eq!(current.version, created.version.next());
    }

    #[tokio::test]
    async fn unit_item_impl_update_replacement_identifier_validated() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, mut formats) = items();
        save_sku_format(&mut formats, InventoryId(1)).await;
        let created =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        assert!(matches!(
            items
                .update(
                    created.id,
                    created.version,
                    Some("bogus".to_string()),
                    ItemFields::default()
                )
                .await,
            Err(CatalogError::ValidationFailed(_))
        ));
        // Rejection happened before any state change
        let current = items.get(created.id).await.unwrap();
        assert_eq!(current.version, created.version);

        let updated = items
            .update(created.id, created.version, Some("SKU-999".to_string()), ItemFields::default())
            .await
            .unwrap();
        assert_eq!(updated.custom_id, "SKU-999");
    }

    #[tokio::test]
    async fn unit_item_impl_update_cannot_steal_identifier() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, mut formats) = items();
        save_sku_format(&mut formats, InventoryId(1)).await;
        let first =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        let second =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        assert_eq!(
            items
                .update(
                    second.id,
                    second.version,
                    Some(first.custom_id.clone()),
                    ItemFields::default()
                )
                .await,
            Err(CatalogError::DuplicateIdentifier {
                inventory_id: InventoryId(1),
                custom_id: first.custom_id
            })
        );
    }

    #[tokio::test]
    async fn unit_item_impl_update_releases_previous_identifier() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, mut formats) = items();
        save_sku_format(&mut formats, InventoryId(1)).await;
        let created =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        let updated = items
            .update(created.id, created.version, Some("SKU-500".to_string()), ItemFields::default())
            .await
            .unwrap();
        // The old identifier is reusable again
        let reclaimed = items
            .update(
                updated.id,
                updated.version,
                Some(created.custom_id.clone()),
                ItemFields::default(),
            )
            .await
            .unwrap();
        assert_eq!(reclaimed.custom_id, created.custom_id);
    }

    #[tokio::test]
    async fn unit_item_impl_purge_drops_items_and_identifiers() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, mut formats) = items();
        save_sku_format(&mut formats, InventoryId(1)).await;
        let first =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        let kept =
            items.create(InventoryId(2), "alice".to_string(), ItemFields::default()).await.unwrap();

        assert_eq!(items.purge_inventory(InventoryId(1)).await, 2);
        assert_eq!(
            items.get(first.id).await.unwrap_err(),
            CatalogError::ItemNotFound(first.id)
        );
        // The other inventory is untouched
        assert!(items.get(kept.id).await.is_ok());
        // Purged identifiers are claimable again
        let fresh =
            items.create(InventoryId(1), "alice".to_string(), ItemFields::default()).await.unwrap();
        assert_eq!(fresh.custom_id, "SKU-003");
        let renamed = items
            .update(fresh.id, fresh.version, Some("SKU-001".to_string()), ItemFields::default())
            .await
            .unwrap();
        assert_eq!(renamed.custom_id, "SKU-001");
        assert_eq!(items.purge_inventory(InventoryId(3)).await, 0);
    }

    #[tokio::test]
    async fn unit_item_layer_delete_releases_identifier() {
        #[cfg(feature = "shelfmark_tracing")]
        crate::shelfmark_tracing::init();
        let (items, mut formats) = items();
        formats
            .call(FormatRequest::Save {
                inventory_id: InventoryId(1),
                definition: r#"[{"kind":"fixed","value":"X"}]"#.to_string(),
                validation_pattern: None,
            })
            .await
            .unwrap();
        let mut items = items;
        let created = match items
            .call(ItemRequest::Create {
                inventory_id: InventoryId(1),
                created_by: "alice".to_string(),
                fields: ItemFields::default(),
            })
            .await
            .unwrap()
        {
            ItemResponse::Record(item) => item,
            other => panic!("unexpected response: {other:?}"),
        };
        assert_eq!(
            items.call(ItemRequest::Delete(created.id)).await.unwrap(),
            ItemResponse::Deleted
        );
        assert_eq!(
            items.call(ItemRequest::Get(created.id)).await.unwrap_err(),
            CatalogError::ItemNotFound(created.id)
        );
        // Identifier is free again
        assert!(items
            .call(ItemRequest::Create {
                inventory_id: InventoryId(1),
                created_by: "alice".to_string(),
                fields: ItemFields::default(),
            })
            .await
            .is_ok());
        assert_eq!(
            items.call(ItemRequest::Delete(ItemId(99))).await.unwrap_err(),
            CatalogError::ItemNotFound(ItemId(99))
        );
    }
}
