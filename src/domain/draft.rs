//! The in-progress shipment and the actions that mutate it.
//!
//! Every change to a [`Draft`] goes through [`Draft::apply`], including the
//! locker selection that arrives asynchronously from the widget.

use serde::{Deserialize, Serialize};

use super::entities::{Client, PickupPoint, Product};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryMethod {
    ToAddress,
    ToLocker,
}

impl DeliveryMethod {
    /// Courier service code.
    pub fn service_code(self) -> u32 {
        match self {
            DeliveryMethod::ToAddress => 7,
            DeliveryMethod::ToLocker => 15,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DeliveryMethod::ToAddress => "Address delivery",
            DeliveryMethod::ToLocker => "Locker delivery",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageSize {
    Medium,
    Small,
    Large,
}

impl PackageSize {
    /// Courier package type code.
    pub fn package_type(self) -> u8 {
        match self {
            PackageSize::Medium => 0,
            PackageSize::Small => 1,
            PackageSize::Large => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PackageSize::Medium => "Parcel M (max. 46 x 44 x 18 cm, up to 9 kg)",
            PackageSize::Small => "Parcel S (max. 46 x 44 x 9 cm, up to 4 kg)",
            PackageSize::Large => "Parcel L (max. 46 x 44 x 38 cm, up to 19 kg)",
        }
    }
}

/// Recipient address as the courier API expects it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    #[serde(rename = "countyString")]
    pub county: Option<String>,
    #[serde(rename = "cityString")]
    pub city: Option<String>,
    pub name: String,
    #[serde(rename = "personType")]
    pub person_type: u8,
    pub address: Option<String>,
    #[serde(rename = "phoneNumber")]
    pub phone: Option<String>,
    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,
    pub email: Option<String>,
}

impl From<&Client> for Recipient {
    fn from(client: &Client) -> Self {
        Self {
            county: client.county.clone(),
            city: client.city.clone(),
            name: client.name.clone(),
            // Individuals only.
            person_type: 0,
            address: client.address.clone(),
            phone: client.phone_number.clone(),
            postal_code: client.postal_code.clone(),
            email: client.email.clone(),
        }
    }
}

/// Locker chosen in the external widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockerSelection {
    pub locker_id: u64,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Draft {
    pub delivery_method: Option<DeliveryMethod>,
    pub package_size: Option<PackageSize>,
    pub recipient: Option<Recipient>,
    pub product: Option<Product>,
    pub pickup_point: Option<PickupPoint>,
    pub locker: Option<LockerSelection>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DraftAction {
    SelectDeliveryMethod(DeliveryMethod),
    SelectPackageSize(PackageSize),
    ChooseRecipient(Client),
    ClearRecipient,
    ChooseProduct(Product),
    ClearProduct,
    ChoosePickupPoint(PickupPoint),
    ClearPickupPoint,
    LockerSelected(LockerSelection),
    Reset,
}

/// Follow-up work the controller owes after an action was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftEffect {
    None,
    OpenLockerSelector,
}

impl Draft {
    pub fn apply(&mut self, action: DraftAction) -> DraftEffect {
        match action {
            DraftAction::SelectDeliveryMethod(method) => {
                let previous = self.delivery_method.replace(method);
                // Re-selecting locker delivery retries a selection that never completed.
                let reopen = previous != Some(DeliveryMethod::ToLocker) || self.locker.is_none();
                if method == DeliveryMethod::ToLocker && reopen {
                    return DraftEffect::OpenLockerSelector;
                }
            }
            DraftAction::SelectPackageSize(size) => self.package_size = Some(size),
            DraftAction::ChooseRecipient(client) => self.recipient = Some(Recipient::from(&client)),
            DraftAction::ClearRecipient => self.recipient = None,
            DraftAction::ChooseProduct(product) => self.product = Some(product),
            DraftAction::ClearProduct => self.product = None,
            DraftAction::ChoosePickupPoint(point) => self.pickup_point = Some(point),
            DraftAction::ClearPickupPoint => self.pickup_point = None,
            DraftAction::LockerSelected(selection) => self.locker = Some(selection),
            DraftAction::Reset => *self = Draft::default(),
        }
        DraftEffect::None
    }

    pub fn is_locker_delivery(&self) -> bool {
        self.delivery_method == Some(DeliveryMethod::ToLocker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client {
            id: "c1".into(),
            name: "Ana Pop".into(),
            email: Some("ana@example.ro".into()),
            county: Some("Bucuresti".into()),
            city: Some("Sectorul 2".into()),
            address: Some("Str. X 1".into()),
            phone_number: Some("0722000111".into()),
            postal_code: None,
        }
    }

    #[test]
    fn choosing_locker_opens_selector_on_change_or_retry() {
        let mut draft = Draft::default();
        assert_eq!(
            draft.apply(DraftAction::SelectDeliveryMethod(DeliveryMethod::ToLocker)),
            DraftEffect::OpenLockerSelector
        );
        assert_eq!(
            draft.apply(DraftAction::SelectDeliveryMethod(DeliveryMethod::ToLocker)),
            DraftEffect::OpenLockerSelector
        );
        draft.apply(DraftAction::LockerSelected(LockerSelection {
            locker_id: 4821,
            name: "easybox Mega Mall".into(),
        }));
        assert_eq!(
            draft.apply(DraftAction::SelectDeliveryMethod(DeliveryMethod::ToLocker)),
            DraftEffect::None
        );
        assert_eq!(
            draft.apply(DraftAction::SelectDeliveryMethod(DeliveryMethod::ToAddress)),
            DraftEffect::None
        );
        assert_eq!(
            draft.apply(DraftAction::SelectDeliveryMethod(DeliveryMethod::ToLocker)),
            DraftEffect::OpenLockerSelector
        );
    }

    #[test]
    fn switching_to_address_keeps_previous_locker_for_later_overwrite() {
        let mut draft = Draft::default();
        draft.apply(DraftAction::SelectDeliveryMethod(DeliveryMethod::ToLocker));
        draft.apply(DraftAction::LockerSelected(LockerSelection {
            locker_id: 4821,
            name: "easybox Mega Mall".into(),
        }));
        draft.apply(DraftAction::SelectDeliveryMethod(DeliveryMethod::ToAddress));

        assert!(!draft.is_locker_delivery());
        assert_eq!(draft.locker.as_ref().map(|l| l.locker_id), Some(4821));
    }

    #[test]
    fn recipient_copies_client_address_fields() {
        let mut draft = Draft::default();
        draft.apply(DraftAction::ChooseRecipient(client()));

        let recipient = draft.recipient.clone().expect("recipient set");
        assert_eq!(recipient.name, "Ana Pop");
        assert_eq!(recipient.county.as_deref(), Some("Bucuresti"));
        assert_eq!(recipient.phone.as_deref(), Some("0722000111"));
        assert_eq!(recipient.person_type, 0);

        draft.apply(DraftAction::ClearRecipient);
        assert_eq!(draft.recipient, None);
    }

    #[test]
    fn reset_discards_everything() {
        let mut draft = Draft::default();
        draft.apply(DraftAction::SelectPackageSize(PackageSize::Large));
        draft.apply(DraftAction::ChooseRecipient(client()));
        draft.apply(DraftAction::Reset);
        assert_eq!(draft, Draft::default());
    }

    #[test]
    fn wire_codes_match_the_courier_api() {
        assert_eq!(DeliveryMethod::ToAddress.service_code(), 7);
        assert_eq!(DeliveryMethod::ToLocker.service_code(), 15);
        assert_eq!(PackageSize::Medium.package_type(), 0);
        assert_eq!(PackageSize::Small.package_type(), 1);
        assert_eq!(PackageSize::Large.package_type(), 2);
    }
}
