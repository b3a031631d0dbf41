//! Adapters to everything outside the process: courier API, local cache, widget.

pub mod gateway;
pub mod local_store;
pub mod locker;
pub mod sameday;
pub mod session;

pub use gateway::{
    strategy, GatewayError, ListFilter, ListParams, ListResult, Operation, Resource,
    ResourceGateway, Sort, SortOrder, Strategy,
};
pub use local_store::LocalCollection;
pub use locker::{BridgeError, LockerBridge, LockerConfig, LockerInstance, LockerWidget};
pub use sameday::{SamedayClient, SamedayError};
pub use session::{CredentialSource, StaticCredential, StoredSession};
