//! Rule configuration.
//!
//! Penalty rate, reference timezone and zero-amount policy are deployment
//! settings, never literals inside the rule.

use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{StatusPolicy, ZeroAmountPolicy};

pub const ENV_ZERO_AMOUNT_POLICY: &str = "PAYTRACK_ZERO_AMOUNT_POLICY";
pub const ENV_DAILY_PENALTY: &str = "PAYTRACK_DAILY_PENALTY";
pub const ENV_UTC_OFFSET_MINUTES: &str = "PAYTRACK_UTC_OFFSET_MINUTES";

/// Penalty charged per whole day an automated invoice stays overdue.
pub const DEFAULT_DAILY_PENALTY: Decimal = Decimal::from_parts(2000, 0, 0, false, 0);

/// UTC-05:00.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -5 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("daily penalty must be non-negative (got {0})")]
    NegativePenalty(Decimal),

    #[error("utc offset out of range: {0} minutes")]
    OffsetOutOfRange(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub policy: ZeroAmountPolicy,
    pub daily_penalty: Decimal,
    /// Offset of the reference timezone used to truncate "now" to a date.
    pub utc_offset_minutes: i32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            policy: ZeroAmountPolicy::default(),
            daily_penalty: DEFAULT_DAILY_PENALTY,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

impl RuleConfig {
    /// Load from `PAYTRACK_*` environment variables; unset keys keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (environment, parsed file, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ZERO_AMOUNT_POLICY) {
            config.policy = raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: ENV_ZERO_AMOUNT_POLICY,
                message,
            })?;
        }

        if let Some(raw) = lookup(ENV_DAILY_PENALTY) {
            config.daily_penalty =
                raw.trim()
                    .parse::<Decimal>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: ENV_DAILY_PENALTY,
                        message: e.to_string(),
                    })?;
        }

        if let Some(raw) = lookup(ENV_UTC_OFFSET_MINUTES) {
            config.utc_offset_minutes =
                raw.trim()
                    .parse::<i32>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: ENV_UTC_OFFSET_MINUTES,
                        message: e.to_string(),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_policy(mut self, policy: ZeroAmountPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_daily_penalty(mut self, penalty: Decimal) -> Self {
        self.daily_penalty = penalty;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daily_penalty < Decimal::ZERO {
            return Err(ConfigError::NegativePenalty(self.daily_penalty));
        }
        self.utc_offset()?;
        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::OffsetOutOfRange(self.utc_offset_minutes))
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy::for_zero_amount(self.policy)
    }
}
