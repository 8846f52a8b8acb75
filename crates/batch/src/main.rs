//! Batch fix: re-apply the amount rule to a JSON list of invoice records.
//!
//! Usage: `paytrack-recompute [records.json]` (stdin when no path is given).
//! Recomputed records are written to stdout as JSON.

use std::fs::File;
use std::io::{self, BufReader, Read};

use anyhow::{Context, Result};

use paytrack_core::SystemClock;
use paytrack_invoicing::{InvoiceAmountRule, RuleConfig};

fn open_input(path: Option<String>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(&path).with_context(|| format!("failed to read {path}"))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

fn main() -> Result<()> {
    paytrack_observability::init();

    let config = RuleConfig::from_env().context("invalid PAYTRACK_* configuration")?;
    let rule = InvoiceAmountRule::new(&config, SystemClock)?;
    tracing::info!(
        policy = ?config.policy,
        daily_penalty = %config.daily_penalty,
        utc_offset_minutes = config.utc_offset_minutes,
        today = %rule.today(),
        "recompute starting"
    );

    let input = open_input(std::env::args().nth(1))?;
    let report = paytrack_batch::run(input, io::stdout().lock(), rule)?;

    if !report.failed.is_empty() {
        tracing::warn!(
            failed = report.failed.len(),
            total = report.total(),
            "some invoices need manual review"
        );
    }
    Ok(())
}
