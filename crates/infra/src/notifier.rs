//! Receipt delivery after an invoice settles.

use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use paytrack_core::InvoiceId;

use crate::record::InvoiceRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("receipt delivery failed: {0}")]
    Delivery(String),
}

/// Sends a receipt for an invoice that just moved into a terminal status.
///
/// Called with the already-persisted record; a failure here never undoes the edit.
pub trait ReceiptNotifier: Send + Sync {
    fn send_receipt(&self, record: &InvoiceRecord) -> Result<(), NotifyError>;
}

impl<N> ReceiptNotifier for Arc<N>
where
    N: ReceiptNotifier + ?Sized,
{
    fn send_receipt(&self, record: &InvoiceRecord) -> Result<(), NotifyError> {
        (**self).send_receipt(record)
    }
}

/// Drops every receipt (batch fixes must not message clients).
#[derive(Debug, Default, Copy, Clone)]
pub struct NoopNotifier;

impl ReceiptNotifier for NoopNotifier {
    fn send_receipt(&self, _record: &InvoiceRecord) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Remembers which invoices got a receipt; can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: RwLock<Vec<InvoiceId>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            fail: true,
        }
    }

    /// Receipts recorded so far. A poisoned lock still yields what was recorded.
    pub fn sent(&self) -> Vec<InvoiceId> {
        self.sent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReceiptNotifier for RecordingNotifier {
    fn send_receipt(&self, record: &InvoiceRecord) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Delivery(format!(
                "channel unavailable for invoice {}",
                record.id
            )));
        }
        self.sent
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.id);
        Ok(())
    }
}
