//! Per-client account statement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paytrack_core::{Clock, ClientId, InvoiceId};
use paytrack_invoicing::{InvoiceAmountRule, InvoiceStatus, ValidationError};

use crate::record::InvoiceRecord;

/// What a client owes as of a given day.
///
/// Open invoices are re-evaluated so fines are current even if the stored
/// record was last written days ago. Records the rule rejects fall back to
/// their stored totals and are listed in `needs_review`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatement {
    pub client_id: ClientId,
    pub as_of: NaiveDate,
    pub invoice_count: usize,
    pub open_count: usize,
    pub overdue_count: usize,
    pub settled_count: usize,
    /// Sum of open base amounts.
    pub open_amount: Decimal,
    pub total_fines: Decimal,
    /// `open_amount + total_fines`.
    pub outstanding_amount: Decimal,
    pub needs_review: Vec<InvoiceId>,
}

impl AccountStatement {
    pub fn build<C: Clock>(
        client_id: ClientId,
        records: &[InvoiceRecord],
        rule: &InvoiceAmountRule<C>,
    ) -> Result<Self, ValidationError> {
        let mut statement = Self {
            client_id,
            as_of: rule.today(),
            invoice_count: records.len(),
            open_count: 0,
            overdue_count: 0,
            settled_count: 0,
            open_amount: Decimal::ZERO,
            total_fines: Decimal::ZERO,
            outstanding_amount: Decimal::ZERO,
            needs_review: Vec::new(),
        };

        for record in records {
            let (status, amount, fines) = match rule.evaluate(&record.edit_input(record.amount)) {
                Ok(result) => (result.status, result.base_amount, result.fines),
                Err(_) => {
                    statement.needs_review.push(record.id);
                    (record.status, record.amount, record.fines)
                }
            };

            if rule.policy().requires_payment_date(status) {
                statement.settled_count += 1;
                continue;
            }

            statement.open_count += 1;
            if status == InvoiceStatus::Overdue {
                statement.overdue_count += 1;
            }
            statement.open_amount = checked_sum(statement.open_amount, amount, "open amount")?;
            statement.total_fines = checked_sum(statement.total_fines, fines, "fines")?;
        }

        statement.outstanding_amount =
            checked_sum(statement.open_amount, statement.total_fines, "outstanding amount")?;
        Ok(statement)
    }
}

fn checked_sum(acc: Decimal, value: Decimal, what: &str) -> Result<Decimal, ValidationError> {
    acc.checked_add(value)
        .ok_or_else(|| ValidationError::AmountOutOfRange(format!("statement {what}")))
}
