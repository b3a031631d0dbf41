//! Shipment-creation domain: choices, the draft, step gates and the payload.

pub mod app_state;
pub mod draft;
pub mod entities;
pub mod submission;
pub mod workflow;

pub use app_state::{ChoiceSlot, Notice, NoticeKind, WorkflowState};
pub use draft::{
    DeliveryMethod, Draft, DraftAction, DraftEffect, LockerSelection, PackageSize, Recipient,
};
pub use entities::{format_ron, Client, PickupPoint, Product, RecordId, Shipment};
pub use submission::{AwbRequest, CreatedAwb, Parcel};
pub use workflow::{gate, gates_between, Step, ValidationError};
