//! Payment gateway boundary: outbound wire types, synchronous acknowledgment
//! interpretation, and the transport/credential trait seams.

pub mod daraja;
pub mod result;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::disbursement::types::{CommandId, PaymentRecord};
use crate::error::{DisbursementError, DisbursementResult};

/// Substring the gateway reply carries when the authentication certificate
/// has not been provisioned server-side. Matched case-insensitively.
pub const AUTH_CERTIFICATE_MISSING: &str = "no certificate file found in server";

/// Reply message signalling the request was accepted for processing.
pub const ACCEPTED_REPLY: &str = "successful";

/// The outbound B2C payment request. Field names are the gateway's, verbatim
/// and case-sensitive — including the double-s in `Occassion`, which the wire
/// format requires. Authentication material (initiator name, security
/// credential, shortcode, callback URLs) is attached by the transport, not
/// carried here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct B2cRequest {
    #[serde(rename = "OriginatorConversationID")]
    pub originator_conversation_id: String,
    #[serde(rename = "CommandID")]
    pub command_id: CommandId,
    #[serde(rename = "Amount")]
    pub amount: Decimal,
    #[serde(rename = "PartyB")]
    pub party_b: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "Occassion")]
    pub occasion: String,
}

impl B2cRequest {
    /// Maps a payment record 1:1 onto the wire shape. The record must carry
    /// a conversation id and receiver number by the time this is called.
    pub fn from_payment(payment: &PaymentRecord) -> DisbursementResult<Self> {
        let originator_conversation_id = payment
            .originator_conversation_id
            .clone()
            .ok_or_else(|| {
                DisbursementError::invalid_state(format!(
                    "Payment {} has no originator conversation id",
                    payment.name
                ))
            })?;
        let party_b = payment.party_b.clone().ok_or_else(|| {
            DisbursementError::invalid_state(format!(
                "Payment {} has no receiver phone number",
                payment.name
            ))
        })?;

        Ok(Self {
            originator_conversation_id,
            command_id: payment.command_id,
            amount: payment.amount,
            party_b,
            remarks: payment.remarks.clone(),
            occasion: payment.occasion.clone(),
        })
    }
}

/// The gateway's synchronous acknowledgment, reduced to its message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub message: String,
}

impl GatewayReply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The three acknowledgment outcomes this core distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiationAck {
    /// Accepted for processing; the final result arrives asynchronously.
    Accepted,
    /// Credential material missing server-side; nothing was sent onwards.
    AuthenticationMissing(String),
    /// Anything else, surfaced verbatim for operator triage.
    Unknown(String),
}

pub fn interpret_ack(reply: &GatewayReply) -> InitiationAck {
    let lowered = reply.message.to_lowercase();
    if lowered.contains(AUTH_CERTIFICATE_MISSING) {
        InitiationAck::AuthenticationMissing(reply.message.clone())
    } else if lowered == ACCEPTED_REPLY {
        InitiationAck::Accepted
    } else {
        InitiationAck::Unknown(reply.message.clone())
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("gateway request failed: {message}")]
    Network { message: String },

    #[error("gateway request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("credential material unavailable: {message}")]
    Credentials { message: String },
}

impl From<TransportError> for DisbursementError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Credentials { message } => DisbursementError::Authentication { message },
            other => DisbursementError::Network {
                message: other.to_string(),
            },
        }
    }
}

/// A bearer token with its fetch and expiry instants.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// The expiry must be strictly later than the fetch time.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.expires_at <= self.fetched_at {
            return Err(TransportError::Credentials {
                message: "access token expiry time cannot be the same as or earlier than the \
                          fetch time"
                    .to_string(),
            });
        }
        Ok(())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Sends a built request to the gateway and returns the synchronous
/// acknowledgment. Transport failures never mutate payment status.
#[async_trait]
pub trait InitiationTransport: Send + Sync {
    async fn submit(&self, request: &B2cRequest) -> Result<GatewayReply, TransportError>;
}

/// Supplies a cached bearer token for gateway calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<AccessToken, TransportError>;
}
