//! Source record resolution: candidate queries and per-type contact lookup.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;

use crate::disbursement::types::{SourceDocType, CONTACT_DOCTYPE, EMPLOYEE_DOCTYPE};
use crate::error::{DisbursementError, DisbursementResult};
use crate::store::{DocumentStore, QueryFilters, RecordMatch, StoredRecord};

/// Date window for candidate selection: creation strictly after `start`,
/// at or before `end`.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Outcome of contact resolution for one source record. Either side may be
/// absent; a missing phone number is caught by payment validation, not here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedContact {
    pub receiver_name: Option<String>,
    pub party_b: Option<String>,
}

pub struct SourceRecordResolver {
    store: Arc<dyn DocumentStore>,
}

impl SourceRecordResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Fetches the source records of `source_type` created inside `window`.
    /// An empty result is a reported condition, not a defect.
    pub async fn resolve_candidates(
        &self,
        source_type: SourceDocType,
        window: &DateWindow,
    ) -> DisbursementResult<Vec<StoredRecord>> {
        let filters = QueryFilters::created_between(window.start, window.end);
        let candidates = self.store.query(source_type.doctype(), &filters).await?;

        if candidates.is_empty() {
            return Err(DisbursementError::no_data(format!(
                "No records fetched for {} with the date filters specified",
                source_type.doctype(),
            )));
        }

        Ok(candidates)
    }

    /// Resolves the beneficiary name and phone number for one source record.
    ///
    /// Lookup failures degrade to absent fields so a single bad record never
    /// aborts the batch; the invalid line is caught at payment validation.
    pub async fn resolve_contact(
        &self,
        source_type: SourceDocType,
        record: &StoredRecord,
    ) -> ResolvedContact {
        match source_type {
            SourceDocType::SalarySlip
            | SourceDocType::ExpenseClaim
            | SourceDocType::EmployeeAdvance => self.resolve_employee_contact(record).await,
            SourceDocType::PurchaseInvoice => self.resolve_supplier_contact(record).await,
            // Generic payments carry their own phone number, or none at all.
            SourceDocType::PaymentEntry => ResolvedContact {
                receiver_name: record
                    .str_field("party_name")
                    .or_else(|| record.str_field("party"))
                    .map(str::to_string),
                party_b: record
                    .str_field("phone")
                    .or_else(|| record.str_field("mobile_no"))
                    .map(str::to_string),
            },
        }
    }

    async fn resolve_employee_contact(&self, record: &StoredRecord) -> ResolvedContact {
        let Some(employee) = record.str_field("employee") else {
            warn!(record = %record.name, "source record has no linked employee");
            return ResolvedContact::default();
        };
        let receiver_name = record
            .str_field("employee_name")
            .unwrap_or(employee)
            .to_string();

        let party_b = match self
            .store
            .get(
                EMPLOYEE_DOCTYPE,
                &RecordMatch::Name(employee.to_string()),
                &["cell_number"],
            )
            .await
        {
            Ok(Some(contact)) => contact.str_field("cell_number").map(str::to_string),
            Ok(None) => {
                warn!(record = %record.name, employee, "linked employee not found");
                None
            }
            Err(err) => {
                warn!(record = %record.name, employee, error = %err, "employee lookup failed");
                None
            }
        };

        ResolvedContact {
            receiver_name: Some(receiver_name),
            party_b,
        }
    }

    async fn resolve_supplier_contact(&self, record: &StoredRecord) -> ResolvedContact {
        let Some(supplier) = record.str_field("supplier") else {
            warn!(record = %record.name, "source record has no linked supplier");
            return ResolvedContact::default();
        };
        let receiver_name = record
            .str_field("supplier_name")
            .unwrap_or(supplier)
            .to_string();

        // Contacts are named after the party they belong to, so a substring
        // match on the supplier name finds the right one.
        let party_b = match self
            .store
            .get(
                CONTACT_DOCTYPE,
                &RecordMatch::NameLike(supplier.to_string()),
                &["phone", "mobile_no"],
            )
            .await
        {
            Ok(Some(contact)) => contact
                .str_field("phone")
                .or_else(|| contact.str_field("mobile_no"))
                .map(str::to_string),
            Ok(None) => {
                warn!(record = %record.name, supplier, "no contact matched supplier");
                None
            }
            Err(err) => {
                warn!(record = %record.name, supplier, error = %err, "contact lookup failed");
                None
            }
        };

        ResolvedContact {
            receiver_name: Some(receiver_name),
            party_b,
        }
    }

    /// Pulls the line amount from the source record using the type-specific
    /// field order; absent when none of the fields is present.
    pub fn extract_amount(source_type: SourceDocType, record: &StoredRecord) -> Option<Decimal> {
        source_type
            .amount_fields()
            .iter()
            .find_map(|field| record.decimal_field(field))
    }
}
