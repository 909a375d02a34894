//! Asynchronous result callback payloads.
//!
//! The host owns the HTTP endpoint the gateway calls back on; it hands the
//! decoded body to the orchestrator's `apply_result`. These types model the
//! gateway's `Result` envelope and pull the flat key/value
//! `ResultParameters` list apart into typed transaction values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Result code the gateway uses for a fully processed disbursement.
pub const RESULT_CODE_SUCCESS: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct B2cResultEnvelope {
    #[serde(rename = "Result")]
    pub result: B2cResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct B2cResult {
    #[serde(rename = "ResultType", default)]
    pub result_type: i64,
    #[serde(rename = "ResultCode")]
    pub result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,
    #[serde(rename = "OriginatorConversationID")]
    pub originator_conversation_id: String,
    #[serde(rename = "ConversationID", default)]
    pub conversation_id: Option<String>,
    #[serde(rename = "TransactionID", default)]
    pub transaction_id: Option<String>,
    #[serde(rename = "ResultParameters", default)]
    pub result_parameters: Option<ResultParameters>,
    #[serde(rename = "ReferenceData", default)]
    pub reference_data: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultParameters {
    #[serde(rename = "ResultParameter")]
    pub entries: Vec<ResultParameter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultParameter {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: JsonValue,
}

/// Transaction details flattened out of the result parameter list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionValues {
    pub transaction_amount: Option<Decimal>,
    pub transaction_receipt: Option<String>,
    pub recipient_is_registered_customer: Option<String>,
    pub charges_paid_available_funds: Option<Decimal>,
    pub receiver_public_name: Option<String>,
    pub transaction_completed_datetime: Option<String>,
    pub utility_account_funds: Option<Decimal>,
    pub working_account_funds: Option<Decimal>,
}

impl B2cResult {
    pub fn is_successful(&self) -> bool {
        self.result_code == RESULT_CODE_SUCCESS
    }

    fn parameter(&self, key: &str) -> Option<&JsonValue> {
        self.result_parameters
            .as_ref()?
            .entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    fn string_parameter(&self, key: &str) -> Option<String> {
        match self.parameter(key)? {
            JsonValue::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn decimal_parameter(&self, key: &str) -> Option<Decimal> {
        match self.parameter(key)? {
            JsonValue::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            JsonValue::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    /// Pulls the eight transaction values a successful result carries.
    pub fn transaction_values(&self) -> TransactionValues {
        TransactionValues {
            transaction_amount: self.decimal_parameter("TransactionAmount"),
            transaction_receipt: self.string_parameter("TransactionReceipt"),
            recipient_is_registered_customer: self
                .string_parameter("B2CRecipientIsRegisteredCustomer"),
            charges_paid_available_funds: self
                .decimal_parameter("B2CChargesPaidAccountAvailableFunds"),
            receiver_public_name: self.string_parameter("ReceiverPartyPublicName"),
            transaction_completed_datetime: self
                .string_parameter("TransactionCompletedDateTime"),
            utility_account_funds: self.decimal_parameter("B2CUtilityAccountAvailableFunds"),
            working_account_funds: self.decimal_parameter("B2CWorkingAccountAvailableFunds"),
        }
    }
}
