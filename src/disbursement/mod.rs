//! The disbursement core: batch building and the payment lifecycle.

pub mod batch;
pub mod ids;
pub mod orchestrator;
pub mod phone;
pub mod resolver;
pub mod types;

pub use batch::{BatchBuilder, ChangedField};
pub use orchestrator::{validate_payment, DisbursementOrchestrator};
pub use resolver::{DateWindow, ResolvedContact, SourceRecordResolver};
pub use types::{
    BatchLineItem, CommandId, DocCommitState, PartyType, PaymentRecord, PaymentStatus,
    SourceDocType, TransactionRecord,
};
