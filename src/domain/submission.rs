use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::draft::{DeliveryMethod, Draft, Recipient};
use super::entities::string_from_json;
use super::workflow::{gates_between, Step, ValidationError};

/// Body of `POST /awb`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwbRequest {
    pub service: u32,
    pub package_type: u8,
    pub awb_recipient: Recipient,
    pub cash_on_delivery: f64,
    pub package_weight: f64,
    pub parcels: Vec<Parcel>,
    pub pickup_point: String,
    pub awb_payment: u8,
    pub insured_value: f64,
    pub third_party_pickup: u8,
    pub ooh_last_mile: u64,
    pub observation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parcel {
    pub weight: f64,
}

/// Recipient pays the shipping.
const AWB_PAYMENT_RECIPIENT: u8 = 1;

impl AwbRequest {
    pub fn from_draft(draft: &Draft) -> Result<Self, ValidationError> {
        gates_between(Step::DeliveryMethod, Step::Summary, draft)?;

        let (Some(method), Some(size), Some(recipient), Some(product), Some(pickup_point)) = (
            draft.delivery_method,
            draft.package_size,
            draft.recipient.as_ref(),
            draft.product.as_ref(),
            draft.pickup_point.as_ref(),
        ) else {
            // gates_between already rejected every incomplete draft
            return Err(ValidationError {
                step: Step::DeliveryMethod,
                message: "Draft is incomplete",
            });
        };

        // A locker picked earlier must never leak into an address delivery.
        let ooh_last_mile = match method {
            DeliveryMethod::ToAddress => 0,
            DeliveryMethod::ToLocker => match &draft.locker {
                Some(locker) => locker.locker_id,
                None => {
                    warn!("locker delivery submitted without a selected locker");
                    0
                }
            },
        };

        Ok(Self {
            service: method.service_code(),
            package_type: size.package_type(),
            awb_recipient: recipient.clone(),
            cash_on_delivery: product.price.unwrap_or(0.0),
            package_weight: product.weight.unwrap_or(0.0),
            parcels: product
                .weight
                .map(|weight| vec![Parcel { weight }])
                .unwrap_or_default(),
            pickup_point: pickup_point.id.clone(),
            awb_payment: AWB_PAYMENT_RECIPIENT,
            insured_value: 0.0,
            third_party_pickup: 0,
            ooh_last_mile,
            observation: product.name.clone(),
        })
    }
}

/// The waybill the courier created for a submitted draft.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAwb {
    #[serde(deserialize_with = "string_from_json")]
    pub awb_number: String,
    #[serde(skip)]
    pub record: Value,
}

impl CreatedAwb {
    pub fn from_record(record: Value) -> Option<Self> {
        let mut created: CreatedAwb = serde_json::from_value(record.clone()).ok()?;
        created.record = record;
        Some(created)
    }
}
