//! Ordered steps of the AWB creation flow and the gate guarding each one.

use std::fmt;

use thiserror::Error;

use super::draft::Draft;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    DeliveryMethod,
    PackageSize,
    Recipient,
    Product,
    PickupPoint,
    Summary,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::DeliveryMethod,
        Step::PackageSize,
        Step::Recipient,
        Step::Product,
        Step::PickupPoint,
        Step::Summary,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Step> {
        Step::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Step> {
        self.index().checked_sub(1).and_then(|i| Step::ALL.get(i).copied())
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::DeliveryMethod => "Delivery",
            Step::PackageSize => "Parcel",
            Step::Recipient => "Recipient",
            Step::Product => "Product",
            Step::PickupPoint => "Pickup point",
            Step::Summary => "Summary",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// A step gate did not hold; the user has to complete `step` first.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub step: Step,
    pub message: &'static str,
}

/// Gate that must hold before leaving `step` forwards.
pub fn gate(step: Step, draft: &Draft) -> Result<(), ValidationError> {
    let (holds, message) = match step {
        Step::DeliveryMethod => (draft.delivery_method.is_some(), "Select a delivery method"),
        Step::PackageSize => (draft.package_size.is_some(), "Select a parcel size"),
        Step::Recipient => (draft.recipient.is_some(), "Select a recipient"),
        Step::Product => (draft.product.is_some(), "Select a product"),
        Step::PickupPoint => (draft.pickup_point.is_some(), "Select a pickup point"),
        Step::Summary => (true, ""),
    };
    if holds {
        Ok(())
    } else {
        Err(ValidationError { step, message })
    }
}

/// Checks every gate between `from` (inclusive) and `to` (exclusive).
pub fn gates_between(from: Step, to: Step, draft: &Draft) -> Result<(), ValidationError> {
    Step::ALL
        .iter()
        .filter(|step| **step >= from && **step < to)
        .try_for_each(|step| gate(*step, draft))
}
