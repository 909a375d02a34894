mod common;

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use common::{load_payment, seed_payment, supplier_payment, MockTransport};
use mpesa_b2c::config::PaymentConfig;
use mpesa_b2c::gateway::TransportError;
use mpesa_b2c::store::in_memory::InMemoryDocumentStore;
use mpesa_b2c::{DisbursementError, DisbursementOrchestrator, DocCommitState, PaymentStatus};

fn orchestrator(
    store: &Arc<InMemoryDocumentStore>,
    transport: &Arc<MockTransport>,
) -> DisbursementOrchestrator {
    DisbursementOrchestrator::new(store.clone(), transport.clone(), &PaymentConfig::default())
}

#[tokio::test]
async fn accepted_submission_transitions_to_initiated() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let transport = MockTransport::accepting();
    seed_payment(&store, &supplier_payment("B2C-0001")).await;

    let orchestrator = orchestrator(&store, &transport);
    let payment = orchestrator.initiate("B2C-0001").await.unwrap();

    assert_eq!(payment.status, PaymentStatus::Initiated);
    let conversation_id = payment.originator_conversation_id.clone().unwrap();
    assert_eq!(conversation_id.len(), 36);

    // The transition is persisted, and the request carried the record fields.
    let stored = load_payment(&store, "B2C-0001").await;
    assert_eq!(stored.status, PaymentStatus::Initiated);
    let submissions = transport.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].originator_conversation_id, conversation_id);
    assert_eq!(submissions[0].party_b, "254708993268");
    assert_eq!(submissions[0].amount, dec!(10));
}

#[tokio::test]
async fn conversation_id_survives_a_transport_failure() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let transport = MockTransport::new(vec![Err(TransportError::Network {
        message: "connection reset".to_string(),
    })]);
    seed_payment(&store, &supplier_payment("B2C-0002")).await;

    let orchestrator = orchestrator(&store, &transport);
    let err = orchestrator.initiate("B2C-0002").await.unwrap_err();
    assert!(matches!(err, DisbursementError::Network { .. }));

    // The idempotency key was persisted before the send and is reused on
    // retry; the status never moved.
    let stored = load_payment(&store, "B2C-0002").await;
    assert_eq!(stored.status, PaymentStatus::NotInitiated);
    let first_id = stored.originator_conversation_id.clone().unwrap();

    let payment = orchestrator.initiate("B2C-0002").await.unwrap();
    assert_eq!(payment.originator_conversation_id.as_deref(), Some(first_id.as_str()));

    let submissions = transport.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].originator_conversation_id, first_id);
    assert_eq!(submissions[1].originator_conversation_id, first_id);
}

#[tokio::test]
async fn missing_certificate_reply_reports_authentication_without_transition() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let transport = MockTransport::replying("No certificate file found in server");
    seed_payment(&store, &supplier_payment("B2C-0003")).await;

    let orchestrator = orchestrator(&store, &transport);
    let err = orchestrator.initiate("B2C-0003").await.unwrap_err();

    match err {
        DisbursementError::Authentication { message } => {
            assert_eq!(message, "No certificate file found in server");
        }
        other => panic!("expected an authentication error, got {other:?}"),
    }
    let stored = load_payment(&store, "B2C-0003").await;
    assert_eq!(stored.status, PaymentStatus::NotInitiated);
}

#[tokio::test]
async fn unrecognised_reply_is_surfaced_verbatim() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let transport = MockTransport::replying("The initiator information is invalid.");
    seed_payment(&store, &supplier_payment("B2C-0004")).await;

    let orchestrator = orchestrator(&store, &transport);
    let err = orchestrator.initiate("B2C-0004").await.unwrap_err();

    match err {
        DisbursementError::UnknownResponse { reply } => {
            assert_eq!(reply, "The initiator information is invalid.");
        }
        other => panic!("expected an unknown-response error, got {other:?}"),
    }
    assert_eq!(
        load_payment(&store, "B2C-0004").await.status,
        PaymentStatus::NotInitiated
    );
}

#[tokio::test]
async fn drafts_and_ineligible_statuses_cannot_be_initiated() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let transport = MockTransport::accepting();

    let mut draft = supplier_payment("B2C-0005");
    draft.doc_commit_state = DocCommitState::Draft;
    seed_payment(&store, &draft).await;

    let orchestrator = orchestrator(&store, &transport);
    let err = orchestrator.initiate("B2C-0005").await.unwrap_err();
    assert!(matches!(err, DisbursementError::InvalidState { .. }));

    for status in [
        PaymentStatus::Pending,
        PaymentStatus::Initiated,
        PaymentStatus::Success,
        PaymentStatus::Failed,
    ] {
        let mut payment = supplier_payment("B2C-0006");
        payment.status = status;
        seed_payment(&store, &payment).await;
        let err = orchestrator.initiate("B2C-0006").await.unwrap_err();
        assert!(
            matches!(err, DisbursementError::InvalidState { .. }),
            "status {status} must block initiation"
        );
    }

    // Nothing ever reached the gateway.
    assert!(transport.submissions().is_empty());
}

#[tokio::test]
async fn timed_out_payment_can_be_retried() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let transport = MockTransport::accepting();

    let mut payment = supplier_payment("B2C-0007");
    payment.status = PaymentStatus::TimedOut;
    payment.originator_conversation_id =
        Some("1e0ee138-1398-4df9-aeb0-a44c1c9ee0af".to_string());
    seed_payment(&store, &payment).await;

    let orchestrator = orchestrator(&store, &transport);
    let retried = orchestrator.initiate("B2C-0007").await.unwrap();

    assert_eq!(retried.status, PaymentStatus::Initiated);
    // Retry reuses the original conversation id.
    assert_eq!(
        retried.originator_conversation_id.as_deref(),
        Some("1e0ee138-1398-4df9-aeb0-a44c1c9ee0af")
    );
}

#[tokio::test]
async fn validation_failures_block_initiation() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let transport = MockTransport::accepting();

    let mut payment = supplier_payment("B2C-0008");
    payment.amount = dec!(5);
    payment.party_b = Some("0712345678".to_string()); // unsanitised
    seed_payment(&store, &payment).await;

    let orchestrator = orchestrator(&store, &transport);
    let err = orchestrator.initiate("B2C-0008").await.unwrap_err();

    match err {
        DisbursementError::Validation { violations } => {
            assert_eq!(violations.len(), 2);
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(transport.submissions().is_empty());
}

#[tokio::test]
async fn concurrent_initiations_submit_exactly_once() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let transport = MockTransport::slow_accepting(Duration::from_millis(50));
    seed_payment(&store, &supplier_payment("B2C-0009")).await;

    let orchestrator = Arc::new(orchestrator(&store, &transport));
    let (first, second) = tokio::join!(
        orchestrator.initiate("B2C-0009"),
        orchestrator.initiate("B2C-0009"),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|r| matches!(
        r,
        Err(DisbursementError::InvalidState { .. })
    )));
    assert_eq!(transport.submissions().len(), 1);
    assert_eq!(
        load_payment(&store, "B2C-0009").await.status,
        PaymentStatus::Initiated
    );
}
