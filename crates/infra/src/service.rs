//! Invoice edit workflow: read the stored record, run the amount rule, write
//! the derived fields back, then send a receipt if the invoice just settled.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use paytrack_core::{Clock, ClientId, DomainError, InvoiceId, SystemClock};
use paytrack_invoicing::{
    InvoiceAmountRule, InvoiceEditInput, InvoiceEditResult, InvoiceStatus, ValidationError,
    ValidationReason,
};

use crate::notifier::ReceiptNotifier;
use crate::record::InvoiceRecord;
use crate::repository::InvoiceRepository;
use crate::statement::AccountStatement;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl EditError {
    /// Machine reason when the rule rejected the edit.
    pub fn reason(&self) -> Option<ValidationReason> {
        match self {
            EditError::Validation(err) => Some(err.reason()),
            EditError::Domain(_) => None,
        }
    }
}

/// A persisted edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Record as stored after the edit (new version).
    pub record: InvoiceRecord,
    pub result: InvoiceEditResult,
    pub receipt_sent: bool,
}

/// Result of a batch recompute over every stored invoice.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecomputeReport {
    pub updated: Vec<InvoiceId>,
    pub unchanged: usize,
    pub failed: Vec<(InvoiceId, EditError)>,
}

impl RecomputeReport {
    pub fn total(&self) -> usize {
        self.updated.len() + self.unchanged + self.failed.len()
    }
}

pub struct InvoiceEditService<R, N, C = SystemClock> {
    rule: InvoiceAmountRule<C>,
    repository: R,
    notifier: N,
}

impl<R, N, C> InvoiceEditService<R, N, C>
where
    R: InvoiceRepository,
    N: ReceiptNotifier,
    C: Clock,
{
    pub fn new(rule: InvoiceAmountRule<C>, repository: R, notifier: N) -> Self {
        Self {
            rule,
            repository,
            notifier,
        }
    }

    pub fn rule(&self) -> &InvoiceAmountRule<C> {
        &self.rule
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Replace the base amount of an invoice.
    pub fn edit_amount(&self, id: InvoiceId, new_amount: Decimal) -> Result<EditOutcome, EditError> {
        self.apply(id, |record| record.edit_input(new_amount))
    }

    /// Set status (and payment date) by hand, keeping the amount.
    ///
    /// Goes through the same rule, so a zero-amount invoice still settles into
    /// the policy's terminal status and a terminal status still needs a date.
    /// Without an explicit `payment_date`, the stored one is kept whenever the
    /// invoice stays settled.
    pub fn set_status(
        &self,
        id: InvoiceId,
        status: InvoiceStatus,
        payment_date: Option<NaiveDate>,
    ) -> Result<EditOutcome, EditError> {
        let policy = *self.rule.policy();
        self.apply(id, |record| {
            let stays_settled = record.amount.is_zero() || policy.requires_payment_date(status);
            let payment_date = match payment_date {
                Some(date) => Some(date),
                None if stays_settled => record.payment_date,
                None => None,
            };
            InvoiceEditInput {
                status,
                payment_date,
                ..record.edit_input(record.amount)
            }
        })
    }

    /// Re-apply the rule to every stored invoice with its current amount.
    ///
    /// Refreshes fines as of today and repairs derived fields left stale by
    /// older writers. Never sends receipts. A failing invoice is reported and
    /// skipped.
    pub fn recompute_all(&self) -> Result<RecomputeReport, EditError> {
        let mut report = RecomputeReport::default();

        for id in self.repository.list()?.into_iter().map(|r| r.id) {
            let mut rejected = None;
            let mut changed = false;

            let stored = self.repository.edit(id, &mut |draft| {
                let result = match self.rule.evaluate(&draft.edit_input(draft.amount)) {
                    Ok(result) => result,
                    Err(err) => {
                        rejected = Some(err);
                        return Ok(false);
                    }
                };
                changed = draft.differs_from(&result);
                draft.apply(&result);
                Ok(changed)
            });

            match (stored, rejected) {
                (Err(err), _) => {
                    tracing::warn!(invoice_id = %id, error = %err, "recompute write failed");
                    report.failed.push((id, err.into()));
                }
                (Ok(_), Some(err)) => {
                    tracing::warn!(invoice_id = %id, reason = %err.reason(), "recompute rejected");
                    report.failed.push((id, err.into()));
                }
                (Ok(_), None) if changed => report.updated.push(id),
                (Ok(_), None) => report.unchanged += 1,
            }
        }

        tracing::info!(
            updated = report.updated.len(),
            unchanged = report.unchanged,
            failed = report.failed.len(),
            "recompute finished"
        );
        Ok(report)
    }

    /// Summary of a client's invoices as of today.
    pub fn statement(&self, client_id: ClientId) -> Result<AccountStatement, EditError> {
        let records = self.repository.list_for_client(client_id)?;
        Ok(AccountStatement::build(client_id, &records, &self.rule)?)
    }

    /// Evaluate and store one edit under the repository's per-invoice lock.
    fn apply<F>(&self, id: InvoiceId, build_input: F) -> Result<EditOutcome, EditError>
    where
        F: Fn(&InvoiceRecord) -> InvoiceEditInput,
    {
        let policy = *self.rule.policy();
        let mut evaluated: Option<Result<InvoiceEditResult, ValidationError>> = None;
        let mut settled = false;

        let stored = self.repository.edit(id, &mut |draft| {
            match self.rule.evaluate(&build_input(draft)) {
                Ok(result) => {
                    settled = policy.requires_payment_date(result.status)
                        && !policy.requires_payment_date(draft.status);
                    draft.apply(&result);
                    evaluated = Some(Ok(result));
                    Ok(true)
                }
                Err(err) => {
                    evaluated = Some(Err(err));
                    Ok(false)
                }
            }
        })?;

        let result = match evaluated {
            Some(Ok(result)) => result,
            Some(Err(err)) => {
                tracing::warn!(invoice_id = %id, reason = %err.reason(), "invoice edit rejected");
                return Err(err.into());
            }
            None => return Err(DomainError::invariant("invoice edit was not evaluated").into()),
        };

        tracing::info!(
            invoice_id = %id,
            status = %stored.status,
            total_amount = %stored.total_amount,
            version = stored.version,
            "invoice edit stored"
        );

        let receipt_sent = settled && self.send_receipt(&stored);

        Ok(EditOutcome {
            record: stored,
            result,
            receipt_sent,
        })
    }

    fn send_receipt(&self, record: &InvoiceRecord) -> bool {
        match self.notifier.send_receipt(record) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(invoice_id = %record.id, error = %err, "receipt not sent");
                false
            }
        }
    }
}
