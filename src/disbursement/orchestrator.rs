//! Payment lifecycle orchestration.
//!
//! Guards which actions are legal in which status, drives a payment record
//! through submission to the gateway, and applies the asynchronous result
//! callbacks the host receives. Initiation is serialised per record so a
//! double-triggered action cannot submit twice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::PaymentConfig;
use crate::disbursement::phone;
use crate::disbursement::types::{
    PaymentRecord, PaymentStatus, TransactionRecord, PAYMENT_DOCTYPE, TRANSACTION_DOCTYPE,
};
use crate::error::{DisbursementError, DisbursementResult};
use crate::gateway::result::B2cResult;
use crate::gateway::{interpret_ack, B2cRequest, InitiationAck, InitiationTransport};
use crate::store::{DocumentStore, RecordMatch, StoredRecord};

/// Checks every commit-time rule and reports all violations together; a
/// record failing one rule is still checked against the rest.
pub fn validate_payment(
    payment: &PaymentRecord,
    minimum_amount: Decimal,
) -> DisbursementResult<()> {
    let mut violations = Vec::new();

    if let Some(party_b) = payment.party_b.as_deref() {
        if !phone::validate(party_b) {
            violations.push(format!(
                "Receiver phone number {party_b} is not a valid mobile number"
            ));
        }
    }

    if payment.amount < minimum_amount {
        violations.push(format!(
            "Amount {} is below the minimum disbursement amount of {}",
            payment.amount, minimum_amount
        ));
    }

    for item in &payment.items {
        match item.party_b.as_deref() {
            Some(party_b) if !phone::validate(party_b) => violations.push(format!(
                "Line for {} has an invalid receiver phone number: {party_b}",
                item.record
            )),
            None => violations.push(format!(
                "Line for {} has no receiver phone number",
                item.record
            )),
            _ => {}
        }

        match (item.amount, item.record_amount) {
            (None, None) => violations.push(format!("Line for {} has no amount", item.record)),
            (Some(amount), Some(record_amount)) if amount > record_amount => {
                violations.push(format!(
                    "Line for {} pays {amount}, more than the source record amount {record_amount}",
                    item.record
                ))
            }
            _ => {}
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DisbursementError::Validation { violations })
    }
}

pub struct DisbursementOrchestrator {
    store: Arc<dyn DocumentStore>,
    transport: Arc<dyn InitiationTransport>,
    minimum_amount: Decimal,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DisbursementOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        transport: Arc<dyn InitiationTransport>,
        config: &PaymentConfig,
    ) -> Self {
        Self {
            store,
            transport,
            minimum_amount: config.minimum_amount,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Per-record mutex; initiation and callback application for one record
    /// are serialised through it.
    async fn record_lock(&self, payment_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(payment_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load(&self, payment_name: &str) -> DisbursementResult<StoredRecord> {
        self.store
            .get(
                PAYMENT_DOCTYPE,
                &RecordMatch::Name(payment_name.to_string()),
                &[],
            )
            .await?
            .ok_or_else(|| {
                DisbursementError::no_data(format!("B2C Payment {payment_name} does not exist"))
            })
    }

    async fn find_by_conversation_id(
        &self,
        conversation_id: &str,
    ) -> DisbursementResult<StoredRecord> {
        self.store
            .get(
                PAYMENT_DOCTYPE,
                &RecordMatch::Field {
                    field: "originator_conversation_id".to_string(),
                    value: conversation_id.to_string(),
                },
                &[],
            )
            .await?
            .ok_or_else(|| {
                DisbursementError::no_data(format!(
                    "No B2C Payment matches originator conversation id {conversation_id}"
                ))
            })
    }

    async fn persist(
        &self,
        payment: &PaymentRecord,
        created: DateTime<Utc>,
    ) -> DisbursementResult<()> {
        let record = StoredRecord::from_document(payment.name.clone(), created, payment)?;
        self.store.upsert(PAYMENT_DOCTYPE, record).await?;
        Ok(())
    }

    /// Submits a payment record to the gateway.
    ///
    /// Preconditions are re-checked under the per-record lock so two
    /// concurrent triggers cannot both submit. The originator conversation
    /// id is generated (once) and persisted before the request goes out, so
    /// a transport failure never loses the idempotency key. The only status
    /// transition performed here is `→ Initiated` on a confirmed acceptance.
    pub async fn initiate(&self, payment_name: &str) -> DisbursementResult<PaymentRecord> {
        let lock = self.record_lock(payment_name).await;
        let _guard = lock.lock().await;

        let stored = self.load(payment_name).await?;
        let created = stored.created;
        let mut payment: PaymentRecord = stored.deserialize()?;

        if !payment.can_initiate() {
            return Err(DisbursementError::invalid_state(format!(
                "Payment {} cannot be initiated: status is {} and the record is {}",
                payment.name,
                payment.status,
                if payment.doc_commit_state.is_committed() {
                    "committed"
                } else {
                    "a draft"
                },
            )));
        }
        validate_payment(&payment, self.minimum_amount)?;

        if payment.ensure_conversation_id() {
            self.persist(&payment, created).await?;
        }

        let request = B2cRequest::from_payment(&payment)?;
        let reply = self.transport.submit(&request).await?;

        match interpret_ack(&reply) {
            InitiationAck::Accepted => {
                payment.status = PaymentStatus::Initiated;
                self.persist(&payment, created).await?;
                info!(
                    payment = %payment.name,
                    conversation_id = payment.originator_conversation_id.as_deref().unwrap_or(""),
                    "payment request accepted by gateway"
                );
                Ok(payment)
            }
            InitiationAck::AuthenticationMissing(message) => {
                warn!(payment = %payment.name, %message, "gateway rejected credentials");
                Err(DisbursementError::Authentication { message })
            }
            InitiationAck::Unknown(reply) => {
                warn!(payment = %payment.name, %reply, "unrecognised gateway acknowledgment");
                Err(DisbursementError::UnknownResponse { reply })
            }
        }
    }

    /// Applies an asynchronous gateway result to the payment it settles.
    ///
    /// Only `Initiated` records accept a terminal result; anything else is
    /// an illegal transition and changes nothing. A successful result also
    /// writes a transaction document named by the gateway transaction id.
    pub async fn apply_result(&self, result: &B2cResult) -> DisbursementResult<PaymentRecord> {
        let located = self
            .find_by_conversation_id(&result.originator_conversation_id)
            .await?;
        let lock = self.record_lock(&located.name).await;
        let _guard = lock.lock().await;

        // Reload under the lock; the record may have moved since we found it.
        let stored = self.load(&located.name).await?;
        let created = stored.created;
        let mut payment: PaymentRecord = stored.deserialize()?;

        let target = if result.is_successful() {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        };
        if !payment.status.can_transition_to(target) {
            return Err(DisbursementError::invalid_state(format!(
                "Payment {} is {}; a gateway result cannot move it to {target}",
                payment.name, payment.status,
            )));
        }

        if result.is_successful() {
            let values = result.transaction_values();
            if let Some(amount) = values.transaction_amount {
                if amount != payment.amount {
                    return Err(DisbursementError::Validation {
                        violations: vec![format!(
                            "Transaction amount {amount} does not match payment amount {} for {}",
                            payment.amount, payment.name,
                        )],
                    });
                }
            }
            let transaction_id = result.transaction_id.clone().ok_or_else(|| {
                DisbursementError::Serialization {
                    message: format!(
                        "Successful result for {} carried no transaction id",
                        payment.name
                    ),
                }
            })?;

            let transaction = TransactionRecord {
                b2c_payment: payment.name.clone(),
                transaction_id: transaction_id.clone(),
                transaction_amount: values.transaction_amount,
                transaction_receipt: values.transaction_receipt,
                receiver_public_name: values.receiver_public_name,
                transaction_completed_datetime: values.transaction_completed_datetime,
                recipient_is_registered_customer: values.recipient_is_registered_customer,
                charges_paid_available_funds: values.charges_paid_available_funds,
                utility_account_funds: values.utility_account_funds,
                working_account_funds: values.working_account_funds,
            };
            self.store
                .upsert(
                    TRANSACTION_DOCTYPE,
                    StoredRecord::from_document(transaction_id, Utc::now(), &transaction)?,
                )
                .await?;

            payment.status = PaymentStatus::Success;
            payment.error_code = None;
            payment.error_description = None;
        } else {
            payment.status = PaymentStatus::Failed;
            payment.error_code = Some(result.result_code.to_string());
            payment.error_description = Some(result.result_desc.clone());
        }
        payment.gateway_conversation_id = result.conversation_id.clone();

        self.persist(&payment, created).await?;
        info!(
            payment = %payment.name,
            status = %payment.status,
            result_code = result.result_code,
            "applied gateway result"
        );
        Ok(payment)
    }

    /// Marks an initiated payment as timed out after the gateway's queue
    /// timeout callback, making it eligible for retry.
    pub async fn apply_queue_timeout(
        &self,
        conversation_id: &str,
    ) -> DisbursementResult<PaymentRecord> {
        let located = self.find_by_conversation_id(conversation_id).await?;
        let lock = self.record_lock(&located.name).await;
        let _guard = lock.lock().await;

        let stored = self.load(&located.name).await?;
        let created = stored.created;
        let mut payment: PaymentRecord = stored.deserialize()?;

        if !payment.status.can_transition_to(PaymentStatus::TimedOut) {
            return Err(DisbursementError::invalid_state(format!(
                "Payment {} is {}; it cannot time out",
                payment.name, payment.status,
            )));
        }

        payment.status = PaymentStatus::TimedOut;
        self.persist(&payment, created).await?;
        warn!(payment = %payment.name, "gateway timed out; payment eligible for retry");
        Ok(payment)
    }
}
