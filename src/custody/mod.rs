//! Custody engine: durable wallet operation records, the event correlation
//! task that enriches them, and the synchronous operation surface.

pub mod correlator;
pub mod events;
pub mod records;
pub mod service;
pub mod store;

pub use correlator::EventCorrelator;
pub use records::{OperationKind, OperationState, RecordPatch, WalletOperationRecord};
pub use service::{CustodyPolicy, CustodyService, OperationError};
pub use store::{MemoryStore, RecordStore, StoreError};
