//! Uniform data access for every resource the console works with.
//!
//! Each resource is routed through [`strategy`]: the courier API, the local
//! offline cache, or an explicit rejection.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use jiff::tz::TimeZone;
use serde_json::Value;
use thiserror::Error;
use time::Date;
use tracing::{debug, info, instrument};

use crate::infra::local_store::LocalCollection;
use crate::infra::sameday::{SamedayClient, SamedayError};
use crate::util::assets::DatasetError;
use crate::util::persistence::{KeyValueStore, StoreError};
use crate::util::time_window::TimeWindow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Shipments,
    PickupPoints,
    Products,
    Clients,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Shipments,
        Resource::PickupPoints,
        Resource::Products,
        Resource::Clients,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Shipments => "awbs",
            Resource::PickupPoints => "pickup-points",
            Resource::Products => "products",
            Resource::Clients => "clients",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resource {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "awbs" | "shipments" => Ok(Resource::Shipments),
            "pickup-points" => Ok(Resource::PickupPoints),
            "products" => Ok(Resource::Products),
            "clients" => Ok(Resource::Clients),
            _ => Err(GatewayError::UnknownResource(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Get,
    GetMany,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::GetMany => "getMany",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Remote,
    LocalCache,
    Unsupported,
}

/// Backing strategy for `operation` on `resource`.
pub fn strategy(resource: Resource, operation: Operation) -> Strategy {
    use Operation::*;

    match (resource, operation) {
        (_, Delete) => Strategy::Unsupported,
        (Resource::Shipments | Resource::PickupPoints, List | Create) => Strategy::Remote,
        (Resource::Shipments | Resource::PickupPoints, _) => Strategy::Unsupported,
        (Resource::Products | Resource::Clients, _) => Strategy::LocalCache,
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            _ => Err(GatewayError::InvalidPayload(format!(
                "unknown sort order `{s}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Business day to bound the shipment list to.
    pub date: Option<Date>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListParams {
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
    pub sort: Option<Sort>,
    pub filter: ListFilter,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
            sort: None,
            filter: ListFilter::default(),
        }
    }
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            ..Self::default()
        }
    }

    pub fn sorted_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(Sort::new(field, order));
        self
    }

    pub fn on_date(mut self, date: Date) -> Self {
        self.filter.date = Some(date);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListResult {
    pub items: Vec<Value>,
    pub total: u64,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unknown resource `{0}`")]
    UnknownResource(String),
    #[error("{operation} is not supported for {resource}")]
    UnsupportedOperation {
        resource: Resource,
        operation: Operation,
    },
    #[error("{message} (HTTP {status})")]
    Remote {
        status: u16,
        message: String,
        body: Option<Value>,
    },
    #[error("{resource} record `{id}` was not found")]
    NotFound { resource: Resource, id: String },
    #[error("courier API unreachable: {0}")]
    Transport(#[source] SamedayError),
    #[error("bundled dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("local storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<SamedayError> for GatewayError {
    fn from(err: SamedayError) -> Self {
        match err {
            SamedayError::Api {
                status,
                message,
                body,
            } => GatewayError::Remote {
                status,
                message,
                body,
            },
            other => GatewayError::Transport(other),
        }
    }
}

impl GatewayError {
    fn unsupported(resource: Resource, operation: Operation) -> Self {
        GatewayError::UnsupportedOperation {
            resource,
            operation,
        }
    }

    /// Text shown to the operator; the server's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

enum Route<'a> {
    Remote,
    Local(&'a LocalCollection),
}

#[derive(Clone)]
pub struct ResourceGateway {
    remote: SamedayClient,
    products: LocalCollection,
    clients: LocalCollection,
    zone: TimeZone,
}

impl ResourceGateway {
    pub fn new(remote: SamedayClient, store: Arc<dyn KeyValueStore>, zone: TimeZone) -> Self {
        Self {
            remote,
            products: LocalCollection::products(store.clone()),
            clients: LocalCollection::clients(store),
            zone,
        }
    }

    pub fn remote(&self) -> &SamedayClient {
        &self.remote
    }

    #[instrument(skip(self, params), fields(page = params.page, per_page = params.per_page))]
    pub async fn list(
        &self,
        resource: Resource,
        params: &ListParams,
    ) -> Result<ListResult, GatewayError> {
        match self.route(resource, Operation::List)? {
            Route::Local(collection) => {
                collection.list(params.page, params.per_page, params.sort.as_ref())
            }
            Route::Remote => self.list_remote(resource, params).await,
        }
    }

    pub async fn get(&self, resource: Resource, id: &str) -> Result<Value, GatewayError> {
        match self.route(resource, Operation::Get)? {
            Route::Local(collection) => collection.get(id),
            Route::Remote => Err(GatewayError::unsupported(resource, Operation::Get)),
        }
    }

    pub async fn get_many(
        &self,
        resource: Resource,
        ids: &[String],
    ) -> Result<Vec<Value>, GatewayError> {
        match self.route(resource, Operation::GetMany)? {
            Route::Local(collection) => collection.get_many(ids),
            Route::Remote => Err(GatewayError::unsupported(resource, Operation::GetMany)),
        }
    }

    #[instrument(skip(self, data))]
    pub async fn create(&self, resource: Resource, data: Value) -> Result<Value, GatewayError> {
        match self.route(resource, Operation::Create)? {
            Route::Local(collection) => collection.create(data),
            Route::Remote => {
                let created = match resource {
                    Resource::Shipments => {
                        with_awb_id(self.remote.create_awb(&data).await?)
                    }
                    Resource::PickupPoints => {
                        let body = wrap_contact_person(data);
                        self.remote.create_pickup_point(&body).await?
                    }
                    _ => return Err(GatewayError::unsupported(resource, Operation::Create)),
                };
                info!(%resource, "created remote record");
                Ok(created)
            }
        }
    }

    pub async fn update(
        &self,
        resource: Resource,
        id: &str,
        data: Value,
    ) -> Result<Value, GatewayError> {
        match self.route(resource, Operation::Update)? {
            Route::Local(collection) => collection.update(id, data),
            Route::Remote => Err(GatewayError::unsupported(resource, Operation::Update)),
        }
    }

    pub async fn delete(&self, resource: Resource, _id: &str) -> Result<Value, GatewayError> {
        Err(GatewayError::unsupported(resource, Operation::Delete))
    }

    fn route(&self, resource: Resource, operation: Operation) -> Result<Route<'_>, GatewayError> {
        match (strategy(resource, operation), resource) {
            (Strategy::Remote, _) => Ok(Route::Remote),
            (Strategy::LocalCache, Resource::Products) => Ok(Route::Local(&self.products)),
            (Strategy::LocalCache, Resource::Clients) => Ok(Route::Local(&self.clients)),
            _ => Err(GatewayError::unsupported(resource, operation)),
        }
    }

    async fn list_remote(
        &self,
        resource: Resource,
        params: &ListParams,
    ) -> Result<ListResult, GatewayError> {
        if params.sort.is_some() {
            debug!(%resource, "courier API ignores sort parameters");
        }
        match resource {
            Resource::Shipments => {
                let window = params
                    .filter
                    .date
                    .map(|date| TimeWindow::for_date(date, &self.zone));
                let page = self
                    .remote
                    .list_awbs(params.page, params.per_page, window)
                    .await?;
                Ok(ListResult {
                    items: page.data.into_iter().map(with_awb_id).collect(),
                    total: page.total,
                })
            }
            Resource::PickupPoints => {
                let page = self
                    .remote
                    .list_pickup_points(params.page, params.per_page)
                    .await?;
                Ok(ListResult {
                    items: page.data,
                    total: page.total,
                })
            }
            _ => Err(GatewayError::unsupported(resource, Operation::List)),
        }
    }
}

// Shipments are keyed by their AWB number.
fn with_awb_id(mut record: Value) -> Value {
    if let Value::Object(fields) = &mut record {
        if let Some(number) = fields.get("awbNumber").cloned() {
            fields.insert("id".to_string(), number);
        }
    }
    record
}

// The API wants a list of contact persons, the form sends one.
fn wrap_contact_person(mut body: Value) -> Value {
    if let Some(contact) = body.get_mut("pickupPointContactPerson") {
        if contact.is_object() {
            let single = contact.take();
            *contact = Value::Array(vec![single]);
        }
    }
    body
}
