use std::borrow::Cow;

use rust_embed::RustEmbed;
use serde_json::Value;

/// Embed the bundled read-only datasets under `resources/` into the binary.
#[derive(RustEmbed)]
#[folder = "resources"]
struct BundledResources;

pub const PRODUCTS_DATASET: &str = "/resources/products.json";
pub const CLIENTS_DATASET: &str = "/resources/clients.json";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("bundled dataset {0} is missing")]
    Missing(String),
    #[error("bundled dataset {path} is not valid JSON: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("bundled dataset {0} is not a JSON list")]
    NotAList(String),
}

/// Loads a bundled dataset as a list of JSON records.
pub fn bundled_dataset(path: &str) -> Result<Vec<Value>, DatasetError> {
    let data = load_asset(path).ok_or_else(|| DatasetError::Missing(path.to_string()))?;
    let value: Value =
        serde_json::from_slice(data.as_ref()).map_err(|source| DatasetError::Malformed {
            path: path.to_string(),
            source,
        })?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(DatasetError::NotAList(path.to_string())),
    }
}

fn load_asset(path: &str) -> Option<Cow<'static, [u8]>> {
    let canonical = canonical_asset_path(path);
    BundledResources::get(&canonical).map(|file| file.data)
}

fn canonical_asset_path(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if let Some(rest) = trimmed.strip_prefix("resources/") {
        rest.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_datasets_are_lists_of_records_with_ids() {
        for path in [PRODUCTS_DATASET, CLIENTS_DATASET] {
            let records = bundled_dataset(path).expect("dataset loads");
            assert!(!records.is_empty(), "{path} should not be empty");
            assert!(records.iter().all(|r| r.get("id").is_some()));
        }
    }

    #[test]
    fn prefix_is_optional() {
        assert_eq!(canonical_asset_path("/resources/products.json"), "products.json");
        assert_eq!(canonical_asset_path("clients.json"), "clients.json");
    }

    #[test]
    fn unknown_dataset_is_reported() {
        assert!(matches!(
            bundled_dataset("/resources/nope.json"),
            Err(DatasetError::Missing(_))
        ));
    }
}
