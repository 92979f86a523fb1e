//! gRPC transport for the catalog service.
use tonic::{Request, Response, Status};
use tower::Service;

pub const DEFAULT_GRPC_PORT: u16 = 50051;

pub mod proto {
    tonic::include_proto!("shelfmark");
    pub const CATALOG_DESCRIPTOR_SET: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/shelfmark_descriptor.bin"));
}

use crate::catalog::{
    api::{CatalogRequest, CatalogResponse},
    error::CatalogError,
    format::CustomIdFormat,
    identity::{InventoryId, ItemId, Principal, VersionToken},
    model::{
        AccessGrant, CustomFieldSchema, FieldSlot, FieldState, Inventory, InventoryDraft, Item,
        ItemFields,
    },
};

impl From<CatalogError> for Status {
    fn from(error: CatalogError) -> Self {
        let message = error.to_string();
        match error {
            CatalogError::Unauthorized => Status::permission_denied(message),
            CatalogError::InventoryNotFound(_) | CatalogError::ItemNotFound(_) => {
                Status::not_found(message)
            }
            CatalogError::ValidationFailed(_) => Status::invalid_argument(message),
            CatalogError::Conflict => Status::aborted(message),
            CatalogError::PreconditionFailed => Status::failed_precondition(message),
            CatalogError::DuplicateIdentifier { .. } => Status::already_exists(message),
            CatalogError::InternalCatalogError => Status::internal(message),
        }
    }
}

pub struct CatalogRouter<CatalogApi> {
    catalog: CatalogApi,
}

impl<CatalogApi> CatalogRouter<CatalogApi> {
    pub fn new(catalog: CatalogApi) -> Self {
        Self { catalog }
    }
}

#[tonic::async_trait]
impl<CatalogApi> proto::catalog_server::Catalog for CatalogRouter<CatalogApi>
where
    CatalogApi: Service<CatalogRequest, Response = CatalogResponse, Error = CatalogError>
        + Clone
        + Sync
        + Send
        + 'static,
    CatalogApi::Future: Send,
{
    async fn get_format(
        &self,
        request: Request<proto::FormatQuery>,
    ) -> Result<Response<proto::FormatDocument>, Status> {
        let req = request.into_inner();
        let inventory_id = InventoryId(req.inventory_id);
        let mut catalog = self.catalog.clone();
        match catalog.call(CatalogRequest::GetFormat { inventory_id }).await? {
            CatalogResponse::FormatDocument(format) => {
                Ok(Response::new(format_document(inventory_id, format)))
            }
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn preview_id(
        &self,
        request: Request<proto::PreviewQuery>,
    ) -> Result<Response<proto::IdSample>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::PreviewId {
                principal: principal(req.caller),
                inventory_id: InventoryId(req.inventory_id),
                definition: req.definition,
            })
            .await?
        {
            CatalogResponse::Sample(sample) => Ok(Response::new(proto::IdSample { sample })),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn save_format(
        &self,
        request: Request<proto::SaveFormatRequest>,
    ) -> Result<Response<proto::FormatDocument>, Status> {
        let req = request.into_inner();
        let inventory_id = InventoryId(req.inventory_id);
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::SaveFormat {
                principal: principal(req.caller),
                inventory_id,
                definition: req.definition,
                validation_pattern: req.validation_pattern,
            })
            .await?
        {
            CatalogResponse::FormatSaved(format) => {
                Ok(Response::new(format_document(inventory_id, Some(format))))
            }
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn validate_id(
        &self,
        request: Request<proto::ValidateIdRequest>,
    ) -> Result<Response<proto::ValidationVerdict>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::ValidateId {
                inventory_id: InventoryId(req.inventory_id),
                value: req.value,
            })
            .await?
        {
            CatalogResponse::Verdict(valid) => {
                Ok(Response::new(proto::ValidationVerdict { valid }))
            }
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn create_item(
        &self,
        request: Request<proto::CreateItemRequest>,
    ) -> Result<Response<proto::ItemRecord>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::CreateItem {
                principal: principal(req.caller),
                inventory_id: InventoryId(req.inventory_id),
                fields: req.fields.map(ItemFields::from).unwrap_or_default(),
            })
            .await?
        {
            CatalogResponse::Item(item) => Ok(Response::new(item.into())),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn update_item(
        &self,
        request: Request<proto::UpdateItemRequest>,
    ) -> Result<Response<proto::ItemRecord>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::UpdateItem {
                principal: principal(req.caller),
                item_id: ItemId(req.item_id),
                version: VersionToken::from_revision(req.version),
                custom_id: req.custom_id,
                fields: req.fields.map(ItemFields::from).unwrap_or_default(),
            })
            .await?
        {
            CatalogResponse::Item(item) => Ok(Response::new(item.into())),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn delete_item(
        &self,
        request: Request<proto::DeleteItemRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::DeleteItem {
                principal: principal(req.caller),
                item_id: ItemId(req.item_id),
            })
            .await?
        {
            CatalogResponse::Deleted => Ok(Response::new(proto::Ack {})),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn create_inventory(
        &self,
        request: Request<proto::CreateInventoryRequest>,
    ) -> Result<Response<proto::InventoryRecord>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::CreateInventory {
                principal: principal(req.caller),
                draft: req.draft.map(InventoryDraft::from).unwrap_or_default(),
            })
            .await?
        {
            CatalogResponse::Inventory(inventory) => Ok(Response::new(inventory.into())),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn update_inventory(
        &self,
        request: Request<proto::UpdateInventoryRequest>,
    ) -> Result<Response<proto::InventoryRecord>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::UpdateInventory {
                principal: principal(req.caller),
                inventory_id: InventoryId(req.inventory_id),
                precondition: req.precondition.map(VersionToken::from_revision),
                draft: req.draft.map(InventoryDraft::from).unwrap_or_default(),
            })
            .await?
        {
            CatalogResponse::Inventory(inventory) => Ok(Response::new(inventory.into())),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn delete_inventory(
        &self,
        request: Request<proto::DeleteInventoryRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::DeleteInventory {
                principal: principal(req.caller),
                inventory_id: InventoryId(req.inventory_id),
            })
            .await?
        {
            CatalogResponse::Deleted => Ok(Response::new(proto::Ack {})),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn grant_access(
        &self,
        request: Request<proto::GrantAccessRequest>,
    ) -> Result<Response<proto::AccessRecord>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::GrantAccess {
                principal: principal(req.caller),
                inventory_id: InventoryId(req.inventory_id),
                user_id: req.user_id,
                can_write: req.can_write,
            })
            .await?
        {
            CatalogResponse::Access(grant) => Ok(Response::new(grant.into())),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn revoke_access(
        &self,
        request: Request<proto::RevokeAccessRequest>,
    ) -> Result<Response<proto::Ack>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::RevokeAccess {
                principal: principal(req.caller),
                inventory_id: InventoryId(req.inventory_id),
                user_id: req.user_id,
            })
            .await?
        {
            CatalogResponse::Revoked(_) => Ok(Response::new(proto::Ack {})),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn list_access(
        &self,
        request: Request<proto::AccessQuery>,
    ) -> Result<Response<proto::AccessList>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::ListAccess {
                principal: principal(req.caller),
                inventory_id: InventoryId(req.inventory_id),
            })
            .await?
        {
            CatalogResponse::AccessList(grants) => Ok(Response::new(proto::AccessList {
                grants: grants.into_iter().map(|grant| grant.into()).collect(),
            })),
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }

    async fn check_write_access(
        &self,
        request: Request<proto::AccessQuery>,
    ) -> Result<Response<proto::WriteAccessVerdict>, Status> {
        let req = request.into_inner();
        let mut catalog = self.catalog.clone();
        match catalog
            .call(CatalogRequest::CheckWriteAccess {
                principal: principal(req.caller),
                inventory_id: InventoryId(req.inventory_id),
            })
            .await?
        {
            CatalogResponse::WriteAccess(can_write) => {
                Ok(Response::new(proto::WriteAccessVerdict { can_write }))
            }
            _ => Err(Status::internal("Internal catalog API error")),
        }
    }
}

// Conversion trait implementations

fn principal(caller: Option<proto::Caller>) -> Principal {
    match caller {
        Some(caller) if !caller.user_id.is_empty() => {
            if caller.admin {
                Principal::admin(caller.user_id)
            } else {
                Principal::user(caller.user_id)
            }
        }
        _ => Principal::anonymous(),
    }
}

fn format_document(
    inventory_id: InventoryId,
    format: Option<CustomIdFormat>,
) -> proto::FormatDocument {
    match format {
        Some(format) => proto::FormatDocument {
            inventory_id: format.inventory_id.0,
            defined: true,
            definition: format.definition_json(),
            validation_pattern: format.validation_pattern,
            updated_at: format.updated_at.to_rfc3339(),
        },
        None => proto::FormatDocument {
            inventory_id: inventory_id.0,
            defined: false,
            definition: "[]".to_string(),
            validation_pattern: None,
            updated_at: String::new(),
        },
    }
}

impl From<proto::ItemFields> for ItemFields {
    fn from(fields: proto::ItemFields) -> Self {
        ItemFields {
            strings: [fields.string1, fields.string2, fields.string3],
            integers: [fields.int1, fields.int2, fields.int3],
            booleans: [fields.bool1, fields.bool2, fields.bool3],
            texts: [fields.text1, fields.text2, fields.text3],
            links: [fields.link1, fields.link2, fields.link3],
        }
    }
}

impl From<ItemFields> for proto::ItemFields {
    fn from(fields: ItemFields) -> Self {
        let [string1, string2, string3] = fields.strings;
        let [int1, int2, int3] = fields.integers;
        let [bool1, bool2, bool3] = fields.booleans;
        let [text1, text2, text3] = fields.texts;
        let [link1, link2, link3] = fields.links;
        proto::ItemFields {
            string1,
            string2,
            string3,
            int1,
            int2,
            int3,
            bool1,
            bool2,
            bool3,
            text1,
            text2,
            text3,
            link1,
            link2,
            link3,
        }
    }
}

impl From<proto::FieldSlot> for FieldSlot {
    fn from(slot: proto::FieldSlot) -> Self {
        let state = match slot.state() {
            proto::FieldState::NotPresent => FieldState::NotPresent,
            proto::FieldState::Optional => FieldState::Optional,
            proto::FieldState::Required => FieldState::Required,
        };
        FieldSlot { state, name: slot.name }
    }
}

impl From<FieldSlot> for proto::FieldSlot {
    fn from(slot: FieldSlot) -> Self {
        let state = match slot.state {
            FieldState::NotPresent => proto::FieldState::NotPresent,
            FieldState::Optional => proto::FieldState::Optional,
            FieldState::Required => proto::FieldState::Required,
        };
        proto::FieldSlot { state: state as i32, name: slot.name }
    }
}

/// Take the first three slots, padding with not-present ones.
fn slots(mut slots: Vec<proto::FieldSlot>) -> [FieldSlot; 3] {
    slots.truncate(3);
    let mut converted: Vec<FieldSlot> = slots.into_iter().map(|slot| slot.into()).collect();
    converted.resize_with(3, Default::default);
    converted.try_into().unwrap_or_default()
}

impl From<proto::CustomFieldSchema> for CustomFieldSchema {
    fn from(schema: proto::CustomFieldSchema) -> Self {
        CustomFieldSchema {
            strings: slots(schema.strings),
            integers: slots(schema.integers),
            booleans: slots(schema.booleans),
            texts: slots(schema.texts),
            links: slots(schema.links),
        }
    }
}

impl From<CustomFieldSchema> for proto::CustomFieldSchema {
    fn from(schema: CustomFieldSchema) -> Self {
        proto::CustomFieldSchema {
            strings: schema.strings.into_iter().map(|slot| slot.into()).collect(),
            integers: schema.integers.into_iter().map(|slot| slot.into()).collect(),
            booleans: schema.booleans.into_iter().map(|slot| slot.into()).collect(),
            texts: schema.texts.into_iter().map(|slot| slot.into()).collect(),
            links: schema.links.into_iter().map(|slot| slot.into()).collect(),
        }
    }
}

impl From<proto::InventoryDraft> for InventoryDraft {
    fn from(draft: proto::InventoryDraft) -> Self {
        InventoryDraft {
            title: draft.title,
            description: draft.description,
            category: draft.category,
            image_url: draft.image_url,
            is_public: draft.is_public,
            schema: draft.schema.map(CustomFieldSchema::from).unwrap_or_default(),
        }
    }
}

impl From<Inventory> for proto::InventoryRecord {
    fn from(inventory: Inventory) -> Self {
        proto::InventoryRecord {
            id: inventory.id.0,
            title: inventory.title,
            description: inventory.description,
            category: inventory.category,
            image_url: inventory.image_url,
            owner: inventory.owner,
            is_public: inventory.is_public,
            created_at: inventory.created_at.to_rfc3339(),
            updated_at: inventory.updated_at.to_rfc3339(),
            version: inventory.version.revision(),
            schema: Some(inventory.schema.into()),
        }
    }
}

impl From<Item> for proto::ItemRecord {
    fn from(item: Item) -> Self {
        proto::ItemRecord {
            id: item.id.0,
            inventory_id: item.inventory_id.0,
            custom_id: item.custom_id,
            created_by: item.created_by,
            created_at: item.created_at.to_rfc3339(),
            updated_at: item.updated_at.to_rfc3339(),
            version: item.version.revision(),
            fields: Some(item.fields.into()),
        }
    }
}

impl From<AccessGrant> for proto::AccessRecord {
    fn from(grant: AccessGrant) -> Self {
        proto::AccessRecord {
            inventory_id: grant.inventory_id.0,
            user_id: grant.user_id,
            can_write: grant.can_write,
        }
    }
}
