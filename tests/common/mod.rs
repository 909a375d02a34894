#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mpesa_b2c::disbursement::types::PAYMENT_DOCTYPE;
use mpesa_b2c::gateway::{B2cRequest, GatewayReply, InitiationTransport, TransportError};
use mpesa_b2c::store::in_memory::InMemoryDocumentStore;
use mpesa_b2c::store::StoredRecord;
use mpesa_b2c::{CommandId, DateWindow, DocCommitState, PartyType, PaymentRecord, PaymentStatus};

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn window(start_day: u32, end_day: u32) -> DateWindow {
    DateWindow {
        start: ts(start_day, 0),
        end: ts(end_day, 23),
    }
}

/// A committed supplier payment that passes validation as-is.
pub fn supplier_payment(name: &str) -> PaymentRecord {
    PaymentRecord {
        name: name.to_string(),
        command_id: CommandId::BusinessPayment,
        party_type: PartyType::Supplier,
        party: None,
        party_name: Some("Acme Ltd".to_string()),
        party_b: Some("254708993268".to_string()),
        amount: dec!(10),
        remarks: "test remarks".to_string(),
        occasion: "Testing".to_string(),
        originator_conversation_id: None,
        status: PaymentStatus::NotInitiated,
        account_paid_from: None,
        items: Vec::new(),
        doc_commit_state: DocCommitState::Committed,
        gateway_conversation_id: None,
        error_code: None,
        error_description: None,
    }
}

pub async fn seed_payment(store: &InMemoryDocumentStore, payment: &PaymentRecord) {
    let record = StoredRecord::from_document(payment.name.clone(), ts(1, 8), payment)
        .expect("payment serialises");
    store.seed(PAYMENT_DOCTYPE, vec![record]).await;
}

pub async fn load_payment(store: &InMemoryDocumentStore, name: &str) -> PaymentRecord {
    use mpesa_b2c::store::{DocumentStore, RecordMatch};
    store
        .get(PAYMENT_DOCTYPE, &RecordMatch::Name(name.to_string()), &[])
        .await
        .expect("store reachable")
        .expect("payment exists")
        .deserialize()
        .expect("payment deserialises")
}

/// Scripted gateway transport: pops one reply per submission and records
/// every request it sees. An exhausted script answers "successful".
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<GatewayReply, TransportError>>>,
    submissions: Mutex<Vec<B2cRequest>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new(replies: Vec<Result<GatewayReply, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            submissions: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(Vec::new())
    }

    pub fn replying(message: &str) -> Arc<Self> {
        Self::new(vec![Ok(GatewayReply::new(message))])
    }

    pub fn slow_accepting(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub fn submissions(&self) -> Vec<B2cRequest> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl InitiationTransport for MockTransport {
    async fn submit(&self, request: &B2cRequest) -> Result<GatewayReply, TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.submissions.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GatewayReply::new("successful")))
    }
}
