use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Invoice status labels as stored and displayed by the billing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "Pagado")]
    Paid,
    #[serde(rename = "Vencido")]
    Overdue,
    #[serde(rename = "Cancelado")]
    Cancelled,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Pending,
        InvoiceStatus::Paid,
        InvoiceStatus::Overdue,
        InvoiceStatus::Cancelled,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pendiente",
            InvoiceStatus::Paid => "Pagado",
            InvoiceStatus::Overdue => "Vencido",
            InvoiceStatus::Cancelled => "Cancelado",
        }
    }
}

impl core::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    /// Parses a stored label. Surrounding whitespace and letter case are
    /// ignored; anything else is `INVALID_STATUS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ValidationError::InvalidStatus(trimmed.to_string()))
    }
}
