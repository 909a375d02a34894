//! Originator conversation id generation.
//!
//! The conversation id is the idempotency key correlating a submission with
//! its asynchronous result callback. It is generated at most once per payment
//! record; re-assignment is a caller-side no-op (see
//! [`PaymentRecord::ensure_conversation_id`](crate::disbursement::types::PaymentRecord::ensure_conversation_id)).

use uuid::Uuid;

/// Produces a fresh 36-character UUID v4 in canonical textual layout.
pub fn generate_conversation_id() -> String {
    Uuid::new_v4().to_string()
}
