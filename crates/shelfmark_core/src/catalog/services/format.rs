//! Custom identifier format storage.

use std::{pin::Pin, sync::Arc, task::Poll};

use chrono::Utc;
use dashmap::DashMap;
use tower::Service;
#[cfg(feature = "shelfmark_tracing")]
use tracing::info;

use crate::catalog::{
    api::{FormatRequest, FormatResponse},
    error::CatalogError,
    format::{CustomIdFormat, compile_pattern, parse_definition, validate_value},
    identity::InventoryId,
};

/// Stores at most one [`CustomIdFormat`] per inventory and answers
/// validation queries against it.
#[derive(Clone, Default)]
pub struct FormatService {
    formats: Arc<DashMap<InventoryId, CustomIdFormat>>,
}

impl FormatService {
    async fn get(&self, inventory_id: InventoryId) -> Option<CustomIdFormat> {
        self.formats.get(&inventory_id).map(|f| f.clone())
    }

    /// Replace the stored format wholesale.
    ///
    /// The document must parse and the pattern must compile before anything
    /// is persisted; an empty pattern is stored as no pattern at all.
    async fn save(
        &self,
        inventory_id: InventoryId,
        definition: String,
        validation_pattern: Option<String>,
    ) -> Result<CustomIdFormat, CatalogError> {
        let definition = parse_definition(&definition)?;
        let validation_pattern = validation_pattern.filter(|p| !p.is_empty());
        if let Some(pattern) = &validation_pattern {
            compile_pattern(pattern)?;
        }
        let format =
            CustomIdFormat { inventory_id, definition, validation_pattern, updated_at: Utc::now() };
        self.formats.insert(inventory_id, format.clone());
        Ok(format)
    }

    async fn validate(&self, inventory_id: InventoryId, value: &str) -> bool {
        validate_value(self.formats.get(&inventory_id).as_deref(), value)
    }

    async fn delete(&self, inventory_id: InventoryId) -> bool {
        self.formats.remove(&inventory_id).is_some()
    }
}

impl Service<FormatRequest> for FormatService {
    type Response = FormatResponse;
    type Error = CatalogError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: FormatRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                FormatRequest::Get(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[format] Get: inventory: {}", inventory_id);
                    Ok(FormatResponse::Document(this.get(inventory_id).await))
                }
                FormatRequest::Save { inventory_id, definition, validation_pattern } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[format] Save: inventory: {}", inventory_id);
                    Ok(FormatResponse::Saved(
                        this.save(inventory_id, definition, validation_pattern).await?,
                    ))
                }
                FormatRequest::Validate { inventory_id, value } => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[format] Validate: inventory: {}, value: {:?}", inventory_id, value);
                    Ok(FormatResponse::Verdict(this.validate(inventory_id, &value).await))
                }
                FormatRequest::Delete(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[format] Delete: inventory: {}", inventory_id);
                    Ok(FormatResponse::Removed(this.delete(inventory_id).await))
                }
            }
        })
    }
}
