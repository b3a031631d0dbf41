//! Offline collections backed by the key-value store.
//!
//! On first access the bundled dataset seeds the cache; from then on every
//! read and write goes to the cache only. Read-modify-write cycles are not
//! locked: two processes sharing one store race and the last write wins.

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::domain::entities::value_to_string;
use crate::infra::gateway::{GatewayError, ListResult, Resource, Sort, SortOrder};
use crate::util::assets::{bundled_dataset, CLIENTS_DATASET, PRODUCTS_DATASET};
use crate::util::generate_id;
use crate::util::persistence::{read_json, write_json, KeyValueStore};

pub const PRODUCTS_KEY: &str = "ra-products";
pub const CLIENTS_KEY: &str = "ra-clients";

type Record = Map<String, Value>;

#[derive(Clone)]
pub struct LocalCollection {
    resource: Resource,
    key: &'static str,
    dataset: &'static str,
    store: Arc<dyn KeyValueStore>,
}

impl LocalCollection {
    pub fn products(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            resource: Resource::Products,
            key: PRODUCTS_KEY,
            dataset: PRODUCTS_DATASET,
            store,
        }
    }

    pub fn clients(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            resource: Resource::Clients,
            key: CLIENTS_KEY,
            dataset: CLIENTS_DATASET,
            store,
        }
    }

    pub fn list(
        &self,
        page: u32,
        per_page: u32,
        sort: Option<&Sort>,
    ) -> Result<ListResult, GatewayError> {
        let mut records = self.load()?;
        if let Some(sort) = sort {
            records.sort_by(|a, b| {
                let ordering = compare_fields(a.get(&sort.field), b.get(&sort.field));
                match sort.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let total = records.len() as u64;
        let start = (page.max(1) as usize - 1).saturating_mul(per_page as usize);
        let items = records
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .map(Value::Object)
            .collect();
        Ok(ListResult { items, total })
    }

    pub fn get(&self, id: &str) -> Result<Value, GatewayError> {
        self.load()?
            .into_iter()
            .find(|record| record_id(record).as_deref() == Some(id))
            .map(Value::Object)
            .ok_or_else(|| self.not_found(id))
    }

    pub fn get_many(&self, ids: &[String]) -> Result<Vec<Value>, GatewayError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|record| record_id(record).is_some_and(|id| ids.contains(&id)))
            .map(Value::Object)
            .collect())
    }

    /// Appends `data` under a freshly generated id.
    pub fn create(&self, data: Value) -> Result<Value, GatewayError> {
        let mut fields = into_record(self.resource, data)?;
        let mut records = self.load()?;

        let id = generate_id();
        fields.insert("id".to_string(), Value::String(id.clone()));
        records.push(fields.clone());
        self.save(&records)?;

        debug!(resource = %self.resource, %id, "created local record");
        Ok(Value::Object(fields))
    }

    /// Merges `data` over the stored record; the id never changes.
    pub fn update(&self, id: &str, data: Value) -> Result<Value, GatewayError> {
        let changes = into_record(self.resource, data)?;
        let mut records = self.load()?;
        let record = records
            .iter_mut()
            .find(|record| record_id(record).as_deref() == Some(id))
            .ok_or_else(|| self.not_found(id))?;

        let original_id = record.get("id").cloned();
        record.extend(changes);
        if let Some(original_id) = original_id {
            record.insert("id".to_string(), original_id);
        }
        let updated = record.clone();
        self.save(&records)?;

        debug!(resource = %self.resource, id, "updated local record");
        Ok(Value::Object(updated))
    }

    fn load(&self) -> Result<Vec<Record>, GatewayError> {
        match read_json::<Vec<Record>>(self.store.as_ref(), self.key) {
            Ok(Some(records)) => return Ok(records),
            Ok(None) => {}
            Err(err) => {
                warn!(key = self.key, error = %err, "local cache unreadable, reseeding");
            }
        }

        let records: Vec<Record> = bundled_dataset(self.dataset)?
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                other => {
                    warn!(dataset = self.dataset, record = %other, "skipping non-object record");
                    None
                }
            })
            .collect();
        self.save(&records)?;
        info!(
            key = self.key,
            count = records.len(),
            "seeded local cache from bundled dataset"
        );
        Ok(records)
    }

    fn save(&self, records: &[Record]) -> Result<(), GatewayError> {
        write_json(self.store.as_ref(), self.key, records)?;
        Ok(())
    }

    fn not_found(&self, id: &str) -> GatewayError {
        GatewayError::NotFound {
            resource: self.resource,
            id: id.to_string(),
        }
    }
}

fn into_record(resource: Resource, data: Value) -> Result<Record, GatewayError> {
    match data {
        Value::Object(fields) => Ok(fields),
        _ => Err(GatewayError::InvalidPayload(format!(
            "{resource} records must be JSON objects"
        ))),
    }
}

fn record_id(record: &Record) -> Option<String> {
    record.get("id").and_then(value_to_string)
}

// Missing values sort last; numbers numerically; text case-insensitively.
fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.filter(|v| !v.is_null()), b.filter(|v| !v.is_null())) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => {
            let x = value_to_string(x).unwrap_or_default().to_lowercase();
            let y = value_to_string(y).unwrap_or_default().to_lowercase();
            x.cmp(&y)
        }
    }
}
