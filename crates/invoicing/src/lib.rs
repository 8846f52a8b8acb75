//! Invoicing domain module.
//!
//! This crate contains the business rules applied when an invoice's amount or
//! status is edited, implemented purely as deterministic domain logic (no IO,
//! no storage). "Today" is always taken from an injected [`paytrack_core::Clock`].

pub mod config;
pub mod error;
pub mod policy;
pub mod rule;
pub mod status;

pub use config::{ConfigError, RuleConfig};
pub use error::{ValidationError, ValidationReason};
pub use policy::{StatusPolicy, ZeroAmountPolicy};
pub use rule::{InvoiceAmountRule, InvoiceEditInput, InvoiceEditResult};
pub use status::InvoiceStatus;
