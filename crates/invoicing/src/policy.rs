//! Status policy: which label a zero-amount invoice settles into, and which
//! labels a deployment accepts at all.
//!
//! Two deployments of the billing system disagree on the zero-amount label
//! ("Pagado" vs "Cancelado"). A deployment picks exactly one
//! [`ZeroAmountPolicy`]; everything else is derived from it.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::status::InvoiceStatus;

/// Deployment-wide choice of the zero-amount terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroAmountPolicy {
    /// Zero amount settles as "Pagado". All four labels are accepted.
    #[default]
    Paid,
    /// Zero amount settles as "Cancelado". "Pagado" is not an accepted label.
    Cancelled,
}

impl FromStr for ZeroAmountPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paid" | "pagado" => Ok(ZeroAmountPolicy::Paid),
            "cancelled" | "canceled" | "cancelado" => Ok(ZeroAmountPolicy::Cancelled),
            other => Err(format!("unknown zero-amount policy '{other}'")),
        }
    }
}

/// Resolved status rules for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    terminal: InvoiceStatus,
    allowed: &'static [InvoiceStatus],
    requires_payment_date: &'static [InvoiceStatus],
}

const PAID_ALLOWED: &[InvoiceStatus] = &InvoiceStatus::ALL;
const PAID_DATED: &[InvoiceStatus] = &[InvoiceStatus::Paid, InvoiceStatus::Cancelled];

const CANCELLED_ALLOWED: &[InvoiceStatus] = &[
    InvoiceStatus::Pending,
    InvoiceStatus::Overdue,
    InvoiceStatus::Cancelled,
];
const CANCELLED_DATED: &[InvoiceStatus] = &[InvoiceStatus::Cancelled];

impl StatusPolicy {
    pub fn for_zero_amount(policy: ZeroAmountPolicy) -> Self {
        match policy {
            ZeroAmountPolicy::Paid => Self {
                terminal: InvoiceStatus::Paid,
                allowed: PAID_ALLOWED,
                requires_payment_date: PAID_DATED,
            },
            ZeroAmountPolicy::Cancelled => Self {
                terminal: InvoiceStatus::Cancelled,
                allowed: CANCELLED_ALLOWED,
                requires_payment_date: CANCELLED_DATED,
            },
        }
    }

    /// Status a zero-amount invoice moves to.
    pub fn terminal_status(&self) -> InvoiceStatus {
        self.terminal
    }

    pub fn allowed_statuses(&self) -> &'static [InvoiceStatus] {
        self.allowed
    }

    pub fn is_allowed(&self, status: InvoiceStatus) -> bool {
        self.allowed.contains(&status)
    }

    /// Terminal statuses: an invoice in one of these must carry a payment date.
    pub fn requires_payment_date(&self, status: InvoiceStatus) -> bool {
        self.requires_payment_date.contains(&status)
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::for_zero_amount(ZeroAmountPolicy::default())
    }
}

impl From<ZeroAmountPolicy> for StatusPolicy {
    fn from(policy: ZeroAmountPolicy) -> Self {
        Self::for_zero_amount(policy)
    }
}
