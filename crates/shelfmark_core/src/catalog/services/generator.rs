//! Custom identifier generation.

use std::{pin::Pin, task::Poll};

use chrono::Utc;
use tower::Service;
#[cfg(feature = "shelfmark_tracing")]
use tracing::info;

use crate::catalog::{
    api::{FormatRequest, FormatResponse, GenerateRequest, GenerateResponse, SequenceRequest,
        SequenceResponse},
    error::CatalogError,
    format::{render, short_guid},
    identity::InventoryId,
};

/// Renders identifiers from an inventory's stored format.
///
/// Every generation consumes one sequence value, whether or not the format
/// references it; this keeps concurrent generations race free regardless of
/// the document's content. An inventory without a stored format falls back
/// to a short random identifier.
#[derive(Clone)]
pub struct IdGeneratorService<S, F> {
    sequences: S,
    formats: F,
}

impl<S, F> IdGeneratorService<S, F> {
    pub fn new(sequences: S, formats: F) -> Self {
        Self { sequences, formats }
    }
}

impl<S, F> IdGeneratorService<S, F>
where
    S: Service<SequenceRequest, Response = SequenceResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    S::Future: Send,
    F: Service<FormatRequest, Response = FormatResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    F::Future: Send,
{
    async fn generate(&self, inventory_id: InventoryId) -> Result<String, CatalogError> {
        let format = match self.formats.clone().call(FormatRequest::Get(inventory_id)).await? {
            FormatResponse::Document(format) => format,
            _ => return Err(CatalogError::InternalCatalogError),
        };
        let sequence_value =
            match self.sequences.clone().call(SequenceRequest::Advance(inventory_id)).await? {
                SequenceResponse::Value(value) => value,
                _ => return Err(CatalogError::InternalCatalogError),
            };
        Ok(match format {
            Some(format) => render(&format.definition, sequence_value, Utc::now()),
            None => short_guid(),
        })
    }
}

impl<S, F> Service<GenerateRequest> for IdGeneratorService<S, F>
where
    S: Service<SequenceRequest, Response = SequenceResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    S::Future: Send,
    F: Service<FormatRequest, Response = FormatResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    F::Future: Send,
{
    type Response = GenerateResponse;
    type Error = CatalogError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: GenerateRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                GenerateRequest::Generate(inventory_id) => {
                    #[cfg(feature = "shelfmark_tracing")]
                    info!("[generator] Generate: inventory: {}", inventory_id);
                    Ok(GenerateResponse::Identifier(this.generate(inventory_id).await?))
                }
            }
        })
    }
}
