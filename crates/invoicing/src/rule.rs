//! Amount-edit rule.
//!
//! Whenever an invoice's base amount is edited, its status, payment date,
//! fines and total are re-derived here. The rule is a pure function of its
//! input, its configuration and the injected clock.

use chrono::{FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paytrack_core::{Clock, SystemClock, ValueObject};

use crate::config::{ConfigError, RuleConfig};
use crate::error::ValidationError;
use crate::policy::StatusPolicy;
use crate::status::InvoiceStatus;

/// One edit request against an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEditInput {
    pub amount: Decimal,
    /// Amount stored before this edit.
    pub previous_amount: Decimal,
    pub status: InvoiceStatus,
    pub payment_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub is_manual: bool,
}

impl InvoiceEditInput {
    /// An edit that leaves the amount as it was.
    pub fn new(amount: Decimal, status: InvoiceStatus, due_date: NaiveDate) -> Self {
        Self {
            amount,
            previous_amount: amount,
            status,
            payment_date: None,
            due_date,
            is_manual: false,
        }
    }

    pub fn with_previous_amount(mut self, previous_amount: Decimal) -> Self {
        self.previous_amount = previous_amount;
        self
    }

    pub fn with_payment_date(mut self, payment_date: Option<NaiveDate>) -> Self {
        self.payment_date = payment_date;
        self
    }

    pub fn manual(mut self, is_manual: bool) -> Self {
        self.is_manual = is_manual;
        self
    }
}

impl ValueObject for InvoiceEditInput {}

/// Derived fields after an edit, plus what changed relative to the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEditResult {
    pub base_amount: Decimal,
    /// Always `base_amount + fines`.
    pub total_amount: Decimal,
    pub fines: Decimal,
    pub days_overdue: u32,
    pub status: InvoiceStatus,
    pub payment_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub is_manual: bool,

    pub status_changed: bool,
    pub payment_date_added: bool,
    pub payment_date_cleared: bool,
    pub fines_applied: bool,
}

impl InvoiceEditResult {
    /// Input for a follow-up edit that keeps the current amount.
    pub fn as_next_input(&self) -> InvoiceEditInput {
        InvoiceEditInput {
            amount: self.base_amount,
            previous_amount: self.base_amount,
            status: self.status,
            payment_date: self.payment_date,
            due_date: self.due_date,
            is_manual: self.is_manual,
        }
    }

    /// Status or payment date differ from the input.
    pub fn has_changes(&self) -> bool {
        self.status_changed || self.payment_date_added || self.payment_date_cleared
    }
}

impl ValueObject for InvoiceEditResult {}

/// Evaluator for invoice amount edits.
///
/// Holds no mutable state; one instance can serve any number of callers.
#[derive(Debug, Clone)]
pub struct InvoiceAmountRule<C = SystemClock> {
    policy: StatusPolicy,
    daily_penalty: Decimal,
    offset: FixedOffset,
    clock: C,
}

impl InvoiceAmountRule<SystemClock> {
    pub fn with_system_clock(config: &RuleConfig) -> Result<Self, ConfigError> {
        Self::new(config, SystemClock)
    }
}

impl<C: Clock> InvoiceAmountRule<C> {
    pub fn new(config: &RuleConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            policy: config.status_policy(),
            daily_penalty: config.daily_penalty,
            offset: config.utc_offset()?,
            clock,
        })
    }

    pub fn policy(&self) -> &StatusPolicy {
        &self.policy
    }

    pub fn daily_penalty(&self) -> Decimal {
        self.daily_penalty
    }

    /// Current calendar date in the reference timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().with_timezone(&self.offset).date_naive()
    }

    pub fn evaluate(&self, input: &InvoiceEditInput) -> Result<InvoiceEditResult, ValidationError> {
        if input.amount < Decimal::ZERO {
            return Err(ValidationError::NegativeAmount);
        }

        let today = self.today();
        let (status, payment_date) = self.transition(input, today);

        if self.policy.requires_payment_date(status) && payment_date.is_none() {
            return Err(ValidationError::MissingPaymentDate(status.to_string()));
        }
        if !self.policy.is_allowed(status) {
            return Err(ValidationError::InvalidStatus(status.to_string()));
        }

        let (days_overdue, fines) = self.fines(status, input.due_date, input.is_manual, today)?;
        let total_amount = input.amount.checked_add(fines).ok_or_else(|| {
            ValidationError::AmountOutOfRange(format!("{} + fines {}", input.amount, fines))
        })?;

        let result = InvoiceEditResult {
            base_amount: input.amount,
            total_amount,
            fines,
            days_overdue,
            status,
            payment_date,
            due_date: input.due_date,
            is_manual: input.is_manual,
            status_changed: status != input.status,
            payment_date_added: input.payment_date.is_none() && payment_date.is_some(),
            payment_date_cleared: input.payment_date.is_some() && payment_date.is_none(),
            fines_applied: fines > Decimal::ZERO,
        };

        tracing::debug!(
            status = %result.status,
            base_amount = %result.base_amount,
            fines = %result.fines,
            days_overdue = result.days_overdue,
            "invoice edit evaluated"
        );

        Ok(result)
    }

    fn transition(
        &self,
        input: &InvoiceEditInput,
        today: NaiveDate,
    ) -> (InvoiceStatus, Option<NaiveDate>) {
        if input.amount.is_zero() {
            let status = self.policy.terminal_status();
            if status != input.status {
                tracing::debug!(from = %input.status, to = %status, "zero amount settles invoice");
            }
            (status, input.payment_date.or(Some(today)))
        } else if input.previous_amount.is_zero() {
            if input.status != InvoiceStatus::Pending {
                tracing::debug!(from = %input.status, "invoice carries a balance again");
            }
            (InvoiceStatus::Pending, None)
        } else {
            (input.status, input.payment_date)
        }
    }

    fn fines(
        &self,
        status: InvoiceStatus,
        due_date: NaiveDate,
        is_manual: bool,
        today: NaiveDate,
    ) -> Result<(u32, Decimal), ValidationError> {
        if status != InvoiceStatus::Overdue || due_date >= today {
            return Ok((0, Decimal::ZERO));
        }

        let days = u32::try_from((today - due_date).num_days()).unwrap_or(u32::MAX);
        if is_manual {
            return Ok((days, Decimal::ZERO));
        }
        let fines = Decimal::from(days)
            .checked_mul(self.daily_penalty)
            .ok_or_else(|| {
                ValidationError::AmountOutOfRange(format!(
                    "{days} days x penalty {}",
                    self.daily_penalty
                ))
            })?;
        Ok((days, fines))
    }
}
