//! Batch building: turning resolved source records into payment line items.

use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

use crate::disbursement::phone;
use crate::disbursement::resolver::{DateWindow, SourceRecordResolver};
use crate::disbursement::types::{
    BatchLineItem, PartyType, PaymentRecord, SourceDocType, ACCOUNT_DOCTYPE, COMPANY_DOCTYPE,
    CONTACT_DOCTYPE, EMPLOYEE_DOCTYPE,
};
use crate::error::{DisbursementError, DisbursementResult};
use crate::store::{DocumentStore, RecordMatch};

/// Which of the two coupled category fields the user just edited; the other
/// is reconciled to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangedField {
    CommandId,
    PartyType,
}

pub struct BatchBuilder {
    store: Arc<dyn DocumentStore>,
    resolver: SourceRecordResolver,
}

impl BatchBuilder {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let resolver = SourceRecordResolver::new(Arc::clone(&store));
        Self { store, resolver }
    }

    /// Replaces the payment's line items with one item per source record of
    /// `source_type` created inside `window`, preserving source order.
    ///
    /// Contact resolutions run concurrently but the item list is written in
    /// one ordered pass after all of them complete. Phone numbers are
    /// sanitised here but deliberately not validated, so an operator can fix
    /// bad entries before submission. Returns the number of items built; an
    /// empty window surfaces as [`DisbursementError::NoData`] with the item
    /// list left empty.
    pub async fn rebuild(
        &self,
        payment: &mut PaymentRecord,
        source_type: SourceDocType,
        window: &DateWindow,
    ) -> DisbursementResult<usize> {
        payment.items.clear();

        let candidates = self.resolver.resolve_candidates(source_type, window).await?;
        let contacts = join_all(
            candidates
                .iter()
                .map(|record| self.resolver.resolve_contact(source_type, record)),
        )
        .await;

        for (record, contact) in candidates.iter().zip(contacts) {
            payment.items.push(BatchLineItem {
                reference_doctype: source_type,
                record: record.name.clone(),
                receiver_name: contact.receiver_name,
                party_b: contact.party_b.as_deref().map(phone::sanitize),
                record_amount: SourceRecordResolver::extract_amount(source_type, record),
                amount: None,
            });
        }

        info!(
            payment = %payment.name,
            source = %source_type,
            items = payment.items.len(),
            "rebuilt disbursement batch"
        );
        Ok(payment.items.len())
    }

    /// Resolves and writes `party_name`/`party_b` for an explicitly selected
    /// beneficiary. Both fields are cleared first so a failed resolution
    /// never leaves stale data behind.
    pub async fn set_party_from_selection(
        &self,
        payment: &mut PaymentRecord,
        party: &str,
    ) -> DisbursementResult<()> {
        payment.party = None;
        payment.party_name = None;
        payment.party_b = None;

        let (party_name, raw_phone) = match payment.party_type {
            PartyType::Employee => {
                let employee = self
                    .store
                    .get(
                        EMPLOYEE_DOCTYPE,
                        &RecordMatch::Name(party.to_string()),
                        &["employee_name", "cell_number"],
                    )
                    .await?
                    .ok_or_else(|| {
                        DisbursementError::no_data(format!("Employee {party} does not exist"))
                    })?;
                (
                    employee
                        .str_field("employee_name")
                        .unwrap_or(party)
                        .to_string(),
                    employee.str_field("cell_number").map(str::to_string),
                )
            }
            PartyType::Supplier => {
                let contact = self
                    .store
                    .get(
                        CONTACT_DOCTYPE,
                        &RecordMatch::NameLike(party.to_string()),
                        &["phone", "mobile_no"],
                    )
                    .await?;
                let raw_phone = contact.as_ref().and_then(|c| {
                    c.str_field("phone")
                        .or_else(|| c.str_field("mobile_no"))
                        .map(str::to_string)
                });
                (party.to_string(), raw_phone)
            }
        };

        payment.party = Some(party.to_string());
        payment.party_name = Some(party_name);
        payment.party_b = raw_phone.as_deref().map(phone::sanitize);
        Ok(())
    }

    /// Keeps `command_id` and `party_type` mutually consistent after the
    /// user edits one of them, clearing the beneficiary fields whenever the
    /// pairing changes so no stale party survives a category switch.
    pub fn reconcile_command_and_party_type(payment: &mut PaymentRecord, changed: ChangedField) {
        let consistent = match changed {
            ChangedField::CommandId => {
                let expected = payment.command_id.party_type();
                let consistent = payment.party_type == expected;
                payment.party_type = expected;
                consistent
            }
            ChangedField::PartyType => {
                let expected = payment.party_type.command_id();
                let consistent = payment.command_id == expected;
                payment.command_id = expected;
                consistent
            }
        };

        if !consistent {
            payment.party = None;
            payment.party_name = None;
            payment.party_b = None;
        }
    }

    /// Derives the ledger account to pay from, named after the gateway
    /// configuration and the company abbreviation.
    pub async fn resolve_funding_account(
        &self,
        company: &str,
        gateway_name: &str,
    ) -> DisbursementResult<Option<String>> {
        let Some(company_record) = self
            .store
            .get(
                COMPANY_DOCTYPE,
                &RecordMatch::Name(company.to_string()),
                &["abbr"],
            )
            .await?
        else {
            return Ok(None);
        };
        let Some(abbr) = company_record.str_field("abbr") else {
            return Ok(None);
        };

        let pattern = format!("Mpesa-{gateway_name} - {abbr}");
        let account = self
            .store
            .get(ACCOUNT_DOCTYPE, &RecordMatch::NameLike(pattern), &["name"])
            .await?;
        Ok(account.map(|record| record.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disbursement::types::CommandId;
    use rust_decimal::Decimal;

    fn payment(command_id: CommandId, party_type: PartyType) -> PaymentRecord {
        PaymentRecord {
            name: "B2C-0001".to_string(),
            command_id,
            party_type,
            party: Some("HR-EMP-001".to_string()),
            party_name: Some("John Doe".to_string()),
            party_b: Some("254712345678".to_string()),
            amount: Decimal::from(100),
            remarks: String::new(),
            occasion: String::new(),
            originator_conversation_id: None,
            status: Default::default(),
            account_paid_from: None,
            items: Vec::new(),
            doc_commit_state: Default::default(),
            gateway_conversation_id: None,
            error_code: None,
            error_description: None,
        }
    }

    #[test]
    fn changing_command_id_resets_party_fields() {
        let mut record = payment(CommandId::BusinessPayment, PartyType::Employee);
        BatchBuilder::reconcile_command_and_party_type(&mut record, ChangedField::CommandId);

        assert_eq!(record.party_type, PartyType::Supplier);
        assert_eq!(record.party, None);
        assert_eq!(record.party_name, None);
        assert_eq!(record.party_b, None);
    }

    #[test]
    fn changing_party_type_resets_command_id() {
        let mut record = payment(CommandId::SalaryPayment, PartyType::Supplier);
        BatchBuilder::reconcile_command_and_party_type(&mut record, ChangedField::PartyType);

        assert_eq!(record.command_id, CommandId::BusinessPayment);
        assert_eq!(record.party, None);
    }

    #[test]
    fn consistent_pairing_is_left_untouched() {
        let mut record = payment(CommandId::SalaryPayment, PartyType::Employee);
        BatchBuilder::reconcile_command_and_party_type(&mut record, ChangedField::CommandId);

        assert_eq!(record.party_type, PartyType::Employee);
        assert_eq!(record.party.as_deref(), Some("HR-EMP-001"));
        assert_eq!(record.party_b.as_deref(), Some("254712345678"));
    }
}
