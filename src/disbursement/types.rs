//! Core data model for B2C disbursement payments.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::disbursement::ids;

/// Document type names under which records live in the document store.
pub const PAYMENT_DOCTYPE: &str = "B2C Payment";
pub const TRANSACTION_DOCTYPE: &str = "B2C Payment Transaction";
pub const EMPLOYEE_DOCTYPE: &str = "Employee";
pub const CONTACT_DOCTYPE: &str = "Contact";
pub const COMPANY_DOCTYPE: &str = "Company";
pub const ACCOUNT_DOCTYPE: &str = "Account";

/// Gateway-defined disbursement category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CommandId {
    SalaryPayment,
    BusinessPayment,
}

impl CommandId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::SalaryPayment => "SalaryPayment",
            CommandId::BusinessPayment => "BusinessPayment",
        }
    }

    /// The only party type a category may pay out to.
    pub fn party_type(&self) -> PartyType {
        match self {
            CommandId::SalaryPayment => PartyType::Employee,
            CommandId::BusinessPayment => PartyType::Supplier,
        }
    }
}

impl std::fmt::Display for CommandId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of beneficiary a payment record pays out to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PartyType {
    Employee,
    Supplier,
}

impl PartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyType::Employee => "Employee",
            PartyType::Supplier => "Supplier",
        }
    }

    pub fn command_id(&self) -> CommandId {
        match self {
            PartyType::Employee => CommandId::SalaryPayment,
            PartyType::Supplier => CommandId::BusinessPayment,
        }
    }

    /// Source document types a batch may be built from for this party type.
    pub fn source_doc_types(&self) -> &'static [SourceDocType] {
        match self {
            PartyType::Employee => &[
                SourceDocType::SalarySlip,
                SourceDocType::ExpenseClaim,
                SourceDocType::EmployeeAdvance,
            ],
            PartyType::Supplier => &[SourceDocType::PurchaseInvoice, SourceDocType::PaymentEntry],
        }
    }
}

impl std::fmt::Display for PartyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Upstream business records a disbursement batch can be sourced from.
///
/// A closed set: contact resolution and amount extraction dispatch on this
/// tag with exhaustive matches, so adding a variant forces every strategy to
/// be revisited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceDocType {
    #[serde(rename = "Salary Slip")]
    SalarySlip,
    #[serde(rename = "Expense Claim")]
    ExpenseClaim,
    #[serde(rename = "Employee Advance")]
    EmployeeAdvance,
    #[serde(rename = "Purchase Invoice")]
    PurchaseInvoice,
    #[serde(rename = "Payment Entry")]
    PaymentEntry,
}

impl SourceDocType {
    /// Document-store type name for this source.
    pub fn doctype(&self) -> &'static str {
        match self {
            SourceDocType::SalarySlip => "Salary Slip",
            SourceDocType::ExpenseClaim => "Expense Claim",
            SourceDocType::EmployeeAdvance => "Employee Advance",
            SourceDocType::PurchaseInvoice => "Purchase Invoice",
            SourceDocType::PaymentEntry => "Payment Entry",
        }
    }

    /// Amount fields tried in order; the first present wins. A record with
    /// none of them yields a line with an absent amount, which fails
    /// payment validation later.
    pub fn amount_fields(&self) -> &'static [&'static str] {
        match self {
            SourceDocType::SalarySlip => &["base_rounded_total", "rounded_total"],
            SourceDocType::ExpenseClaim => &["total_sanctioned_amount", "grand_total"],
            SourceDocType::EmployeeAdvance => &["total_sanctioned_amount", "advance_amount"],
            SourceDocType::PurchaseInvoice => &["base_rounded_total", "grand_total"],
            SourceDocType::PaymentEntry => &["paid_amount", "base_paid_amount"],
        }
    }

    /// True for the payroll-adjacent types whose beneficiary is an Employee.
    pub fn is_employee_sourced(&self) -> bool {
        matches!(
            self,
            SourceDocType::SalarySlip | SourceDocType::ExpenseClaim | SourceDocType::EmployeeAdvance
        )
    }
}

impl std::fmt::Display for SourceDocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.doctype())
    }
}

/// Lifecycle status of a payment record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "Not Initiated")]
    NotInitiated,
    Pending,
    Initiated,
    #[serde(rename = "Timed-Out")]
    TimedOut,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            PaymentStatus::NotInitiated => "Not Initiated",
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Initiated => "Initiated",
            PaymentStatus::TimedOut => "Timed-Out",
            PaymentStatus::Success => "Success",
            PaymentStatus::Failed => "Failed",
        }
    }

    /// Legal transitions out of this status. Terminal-state transitions are
    /// driven by the asynchronous gateway result; this table only defines
    /// which of them are legal.
    pub fn valid_transitions(&self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::NotInitiated => &[PaymentStatus::Initiated],
            // Parked: awaiting an operator decision, never submitted from here.
            PaymentStatus::Pending => &[],
            PaymentStatus::Initiated => &[
                PaymentStatus::Success,
                PaymentStatus::Failed,
                PaymentStatus::TimedOut,
            ],
            PaymentStatus::TimedOut => &[PaymentStatus::Initiated],
            PaymentStatus::Success => &[],
            PaymentStatus::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, target: PaymentStatus) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Success | PaymentStatus::Failed)
    }

    /// True for the statuses from which a submission may be attempted.
    pub fn allows_initiation(&self) -> bool {
        matches!(self, PaymentStatus::NotInitiated | PaymentStatus::TimedOut)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// Whether the host document store considers the record a draft or committed.
/// Only committed records may be submitted to the gateway.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocCommitState {
    #[default]
    Draft,
    Committed,
}

impl DocCommitState {
    pub fn is_committed(&self) -> bool {
        matches!(self, DocCommitState::Committed)
    }
}

/// One line of a disbursement batch, derived from a single source record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchLineItem {
    /// Source document type this line was derived from.
    pub reference_doctype: SourceDocType,
    /// Name of the source record in the document store.
    pub record: String,
    #[serde(default)]
    pub receiver_name: Option<String>,
    /// Resolved receiver number; absent when contact resolution failed.
    #[serde(default)]
    pub party_b: Option<String>,
    /// Amount pulled from the source record.
    #[serde(default)]
    pub record_amount: Option<Decimal>,
    /// Amount to actually disburse for this line; entered by the operator,
    /// capped at `record_amount`.
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// A single B2C disbursement payment record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub name: String,
    pub command_id: CommandId,
    pub party_type: PartyType,
    /// Reference to the beneficiary entity (Employee or Supplier name).
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub party_name: Option<String>,
    /// Canonical receiver number; validated before initiation.
    #[serde(default)]
    pub party_b: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub occasion: String,
    /// Idempotency key; assigned exactly once, immutable afterwards.
    #[serde(default)]
    pub originator_conversation_id: Option<String>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub account_paid_from: Option<String>,
    #[serde(default)]
    pub items: Vec<BatchLineItem>,
    #[serde(default)]
    pub doc_commit_state: DocCommitState,
    /// Gateway-side conversation id recorded from the result callback.
    #[serde(default)]
    pub gateway_conversation_id: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl PaymentRecord {
    /// Assigns an originator conversation id if and only if none is set.
    /// Returns true when a new id was assigned.
    pub fn ensure_conversation_id(&mut self) -> bool {
        if self.originator_conversation_id.is_none() {
            self.originator_conversation_id = Some(ids::generate_conversation_id());
            true
        } else {
            false
        }
    }

    /// True iff the record is committed and its status permits submission.
    pub fn can_initiate(&self) -> bool {
        self.doc_commit_state.is_committed() && self.status.allows_initiation()
    }
}

/// Transaction details recorded when a successful result callback lands,
/// stored as a `B2C Payment Transaction` document named by the gateway
/// transaction id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    /// Name of the payment record this transaction settles.
    pub b2c_payment: String,
    pub transaction_id: String,
    #[serde(default)]
    pub transaction_amount: Option<Decimal>,
    #[serde(default)]
    pub transaction_receipt: Option<String>,
    #[serde(default)]
    pub receiver_public_name: Option<String>,
    #[serde(default)]
    pub transaction_completed_datetime: Option<String>,
    #[serde(default)]
    pub recipient_is_registered_customer: Option<String>,
    #[serde(default)]
    pub charges_paid_available_funds: Option<Decimal>,
    #[serde(default)]
    pub utility_account_funds: Option<Decimal>,
    #[serde(default)]
    pub working_account_funds: Option<Decimal>,
}
