//! Stored invoice record.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paytrack_core::{ClientId, Entity, InvoiceId};
use paytrack_invoicing::{InvoiceEditInput, InvoiceEditResult, InvoiceStatus};

/// Invoice as persisted: base fields plus the derived fields last written by
/// the amount rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub id: InvoiceId,
    pub client_id: ClientId,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub is_manual: bool,
    #[serde(default)]
    pub fines: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    #[serde(default)]
    pub days_overdue: u32,
    #[serde(default)]
    pub version: u64,
}

impl InvoiceRecord {
    /// A fresh pending invoice with no fines.
    pub fn new(id: InvoiceId, client_id: ClientId, amount: Decimal, due_date: NaiveDate) -> Self {
        Self {
            id,
            client_id,
            amount,
            status: InvoiceStatus::Pending,
            payment_date: None,
            due_date,
            is_manual: false,
            fines: Decimal::ZERO,
            total_amount: amount,
            days_overdue: 0,
            version: 0,
        }
    }

    pub fn manual(mut self) -> Self {
        self.is_manual = true;
        self
    }

    pub fn with_status(mut self, status: InvoiceStatus, payment_date: Option<NaiveDate>) -> Self {
        self.status = status;
        self.payment_date = payment_date;
        self
    }

    /// Edit request replacing the stored amount with `new_amount`.
    pub fn edit_input(&self, new_amount: Decimal) -> InvoiceEditInput {
        InvoiceEditInput::new(new_amount, self.status, self.due_date)
            .with_previous_amount(self.amount)
            .with_payment_date(self.payment_date)
            .manual(self.is_manual)
    }

    /// Copy the rule's derived fields onto the record. Does not touch `version`.
    pub fn apply(&mut self, result: &InvoiceEditResult) {
        self.amount = result.base_amount;
        self.status = result.status;
        self.payment_date = result.payment_date;
        self.fines = result.fines;
        self.total_amount = result.total_amount;
        self.days_overdue = result.days_overdue;
    }

    /// Whether writing `result` would change anything stored.
    pub fn differs_from(&self, result: &InvoiceEditResult) -> bool {
        self.amount != result.base_amount
            || self.status != result.status
            || self.payment_date != result.payment_date
            || self.fines != result.fines
            || self.total_amount != result.total_amount
            || self.days_overdue != result.days_overdue
    }
}

impl Entity for InvoiceRecord {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
