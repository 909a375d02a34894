//! B2C mobile-money disbursement core.
//!
//! Builds disbursement batches from upstream business records (payroll
//! slips, expense claims, advances, purchase invoices, generic payment
//! entries), resolves and canonicalises beneficiary phone numbers, and
//! drives each payment record through a status-gated lifecycle from
//! "Not Initiated" through gateway submission to its terminal result.
//!
//! The host application owns record storage, the UI, and the callback
//! endpoint; this crate talks to them through the [`store::DocumentStore`],
//! [`gateway::InitiationTransport`], and [`gateway::AccessTokenProvider`]
//! seams. [`gateway::daraja`] provides ready implementations of the gateway
//! side against the Daraja API.

pub mod config;
pub mod disbursement;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod store;

pub use crate::config::AppConfig;
pub use crate::disbursement::{
    validate_payment, BatchBuilder, BatchLineItem, ChangedField, CommandId, DateWindow,
    DisbursementOrchestrator, DocCommitState, PartyType, PaymentRecord, PaymentStatus,
    SourceDocType, SourceRecordResolver, TransactionRecord,
};
pub use crate::error::{DisbursementError, DisbursementResult};
pub use crate::gateway::{B2cRequest, GatewayReply, InitiationAck};
pub use crate::store::{DocumentStore, QueryFilters, RecordMatch, StoredRecord};
