//! Infrastructure layer: invoice storage, receipt delivery and the edit
//! workflow that runs the amount rule between them.

pub mod notifier;
pub mod record;
pub mod repository;
pub mod service;
pub mod statement;

pub use notifier::{NoopNotifier, NotifyError, ReceiptNotifier, RecordingNotifier};
pub use record::InvoiceRecord;
pub use repository::{EditFn, InMemoryInvoiceRepository, InvoiceRepository};
pub use service::{EditError, EditOutcome, InvoiceEditService, RecomputeReport};
pub use statement::AccountStatement;
