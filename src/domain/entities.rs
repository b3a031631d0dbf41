use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Opaque identifier of a record served by the gateway.
pub type RecordId = String;

/// A customer that can receive a shipment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: RecordId,
    pub name: String,
    pub email: Option<String>,
    pub county: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub postal_code: Option<String>,
}

impl Client {
    pub fn from_record(record: Value) -> Option<Self> {
        decode_record::<ClientDto>("clients", record).map(Self::from)
    }

    /// Display label: `name (email)`.
    pub fn label(&self) -> String {
        match &self.email {
            Some(email) => format!("{} ({email})", self.name),
            None => self.name.clone(),
        }
    }
}

/// Something the operator ships; its price becomes the cash-on-delivery amount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    pub name: String,
    /// Price in RON.
    pub price: Option<f64>,
    /// Parcel weight in kilograms.
    pub weight: Option<f64>,
}

impl Product {
    pub fn from_record(record: Value) -> Option<Self> {
        decode_record::<ProductDto>("products", record).map(Self::from)
    }

    pub fn label(&self) -> String {
        match self.price {
            Some(price) => format!("{} ({})", self.name, format_ron(price)),
            None => self.name.clone(),
        }
    }
}

/// A warehouse or shop address where the courier collects parcels.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupPoint {
    pub id: RecordId,
    pub label: String,
}

impl PickupPoint {
    pub fn from_record(record: Value) -> Option<Self> {
        decode_record::<PickupPointDto>("pickup-points", record).map(Self::from)
    }

    pub fn display(&self) -> String {
        format!("{} (ID: {})", self.label, self.id)
    }
}

/// One row of the courier's AWB list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    #[serde(deserialize_with = "string_from_json")]
    pub awb_number: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub awb_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub service_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient_county: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient_city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient_phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub client_observations: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cash_on_delivery: Option<f64>,
}

impl Shipment {
    pub fn from_record(record: Value) -> Option<Self> {
        decode_record::<Self>("awbs", record)
    }
}

/// Formats an amount the way the console shows prices, e.g. `25,50 RON`.
pub fn format_ron(amount: f64) -> String {
    format!("{amount:.2} RON").replacen('.', ",", 1)
}

fn decode_record<T>(resource: &str, record: Value) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    match serde_json::from_value(record) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(resource, error = %err, "skipping malformed record");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientDto {
    #[serde(deserialize_with = "string_from_json")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    county: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    phone_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    postal_code: Option<String>,
}

impl From<ClientDto> for Client {
    fn from(dto: ClientDto) -> Self {
        let name = dto
            .name
            .or(dto.full_name)
            .unwrap_or_else(|| dto.id.clone());
        Self {
            id: dto.id,
            name,
            email: dto.email,
            county: dto.county,
            city: dto.city,
            address: dto.address,
            phone_number: dto.phone_number,
            postal_code: dto.postal_code,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductDto {
    #[serde(deserialize_with = "string_from_json")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    weight: Option<f64>,
}

impl From<ProductDto> for Product {
    fn from(dto: ProductDto) -> Self {
        let name = dto.name.or(dto.sku).unwrap_or_else(|| dto.id.clone());
        Self {
            id: dto.id,
            name,
            price: dto.price,
            weight: dto.weight,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PickupPointDto {
    #[serde(deserialize_with = "string_from_json")]
    id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    alias: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    address: Option<String>,
}

impl From<PickupPointDto> for PickupPoint {
    fn from(dto: PickupPointDto) -> Self {
        let label = dto.alias.or(dto.address).unwrap_or_else(|| dto.id.clone());
        Self { id: dto.id, label }
    }
}

/// Renders scalar JSON as a string. Empty strings count as absent.
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(value_to_string))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

pub(crate) fn string_from_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumber;

    impl<'de> serde::de::Visitor<'de> for StringOrNumber {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_name_falls_back_to_full_name_then_id() {
        let client = Client::from_record(json!({"id": 7, "fullName": "Elena Dumitru"})).unwrap();
        assert_eq!(client.id, "7");
        assert_eq!(client.name, "Elena Dumitru");

        let anonymous = Client::from_record(json!({"id": "c9", "email": ""})).unwrap();
        assert_eq!(anonymous.name, "c9");
        assert_eq!(anonymous.email, None);
    }

    #[test]
    fn client_label_includes_email_when_known() {
        let client = Client::from_record(json!({
            "id": "c1", "name": "Ana Pop", "email": "ana@example.ro", "postalCode": 21101
        }))
        .unwrap();
        assert_eq!(client.label(), "Ana Pop (ana@example.ro)");
        assert_eq!(client.postal_code.as_deref(), Some("21101"));
    }

    #[test]
    fn product_numbers_accept_strings() {
        let product = Product::from_record(json!({
            "id": "p3", "sku": "SC-4", "price": "119.90", "weight": "2.4"
        }))
        .unwrap();
        assert_eq!(product.name, "SC-4");
        assert_eq!(product.price, Some(119.9));
        assert_eq!(product.weight, Some(2.4));
        assert_eq!(product.label(), "SC-4 (119,90 RON)");
    }

    #[test]
    fn product_without_price_or_weight_keeps_them_unset() {
        let product =
            Product::from_record(json!({"id": "p4", "name": "Tricou", "price": null})).unwrap();
        assert_eq!(product.price, None);
        assert_eq!(product.weight, None);
        assert_eq!(product.label(), "Tricou");
    }

    #[test]
    fn pickup_point_label_prefers_alias() {
        let with_alias =
            PickupPoint::from_record(json!({"id": 12, "alias": "Depozit", "address": "Str. Y"}))
                .unwrap();
        let with_address =
            PickupPoint::from_record(json!({"id": 13, "address": "Str. Y"})).unwrap();
        let bare = PickupPoint::from_record(json!({"id": 14})).unwrap();

        assert_eq!(with_alias.display(), "Depozit (ID: 12)");
        assert_eq!(with_address.label, "Str. Y");
        assert_eq!(bare.label, "14");
    }

    #[test]
    fn records_without_an_id_are_skipped() {
        assert!(Client::from_record(json!({"name": "Nobody"})).is_none());
        assert!(Product::from_record(json!("not an object")).is_none());
    }

    #[test]
    fn shipment_rows_decode_loosely() {
        let shipment = Shipment::from_record(json!({
            "awbNumber": 1_234_567,
            "awbStatus": "Livrat",
            "cashOnDelivery": "25.5",
            "unknownField": true
        }))
        .unwrap();
        assert_eq!(shipment.awb_number, "1234567");
        assert_eq!(shipment.awb_status.as_deref(), Some("Livrat"));
        assert_eq!(shipment.cash_on_delivery, Some(25.5));
        assert_eq!(shipment.recipient_name, None);
    }
}
