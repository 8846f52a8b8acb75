//! Batch recompute: re-apply the amount rule to a JSON list of invoice records.

use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use paytrack_core::Clock;
use paytrack_infra::{
    InMemoryInvoiceRepository, InvoiceEditService, InvoiceRecord, InvoiceRepository, NoopNotifier,
    RecomputeReport,
};
use paytrack_invoicing::InvoiceAmountRule;

/// Parse records from `input`, recompute them and return them sorted by id.
pub fn recompute<R, C>(
    input: R,
    rule: InvoiceAmountRule<C>,
) -> Result<(Vec<InvoiceRecord>, RecomputeReport)>
where
    R: Read,
    C: Clock,
{
    let records: Vec<InvoiceRecord> = serde_json::from_reader(input)
        .context("input is not a JSON array of invoice records")?;

    let repo = Arc::new(InMemoryInvoiceRepository::from_records(records)?);
    let service = InvoiceEditService::new(rule, repo.clone(), NoopNotifier);
    let report = service.recompute_all()?;

    for (id, err) in &report.failed {
        tracing::warn!(invoice_id = %id, error = %err, "left unchanged");
    }

    Ok((repo.list()?, report))
}

/// [`recompute`], writing the records to `output` as pretty JSON.
pub fn run<R, W, C>(input: R, mut output: W, rule: InvoiceAmountRule<C>) -> Result<RecomputeReport>
where
    R: Read,
    W: Write,
    C: Clock,
{
    let (records, report) = recompute(input, rule)?;
    serde_json::to_writer_pretty(&mut output, &records)?;
    writeln!(output)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use paytrack_core::FixedClock;
    use paytrack_invoicing::{InvoiceStatus, RuleConfig};
    use serde_json::Value;

    use super::*;

    fn rule() -> InvoiceAmountRule<FixedClock> {
        let today = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();
        InvoiceAmountRule::new(&RuleConfig::default(), FixedClock::at_date(today)).unwrap()
    }

    const INPUT: &str = r#"[
        {
            "id": "0190b5a4-7c1e-7d3a-9f00-000000000001",
            "client_id": "0190b5a4-7c1e-7d3a-9f00-0000000000aa",
            "amount": "50000",
            "status": "Vencido",
            "due_date": "2024-01-01"
        },
        {
            "id": "0190b5a4-7c1e-7d3a-9f00-000000000002",
            "client_id": "0190b5a4-7c1e-7d3a-9f00-0000000000aa",
            "amount": "0",
            "status": "Pendiente",
            "due_date": "2024-02-01"
        },
        {
            "id": "0190b5a4-7c1e-7d3a-9f00-000000000003",
            "client_id": "0190b5a4-7c1e-7d3a-9f00-0000000000aa",
            "amount": "700",
            "status": "Pagado",
            "due_date": "2024-02-01"
        }
    ]"#;

    #[test]
    fn recomputes_fines_and_settles_zero_amounts() {
        let (records, report) = recompute(INPUT.as_bytes(), rule()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(report.updated.len(), 2);
        assert_eq!(report.failed.len(), 1);

        assert_eq!(records[0].fines.to_string(), "20000");
        assert_eq!(records[0].total_amount.to_string(), "70000");
        assert_eq!(records[1].status, InvoiceStatus::Paid);
        assert_eq!(records[1].payment_date, NaiveDate::from_ymd_opt(2024, 1, 11));
        // Paid without a payment date is reported, not rewritten.
        assert_eq!(records[2].version, 0);
    }

    #[test]
    fn writes_json_array_of_records() {
        let mut out = Vec::new();
        run(INPUT.as_bytes(), &mut out, rule()).unwrap();

        let json: Value = serde_json::from_slice(&out).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["status"], "Vencido");
        assert_eq!(rows[1]["status"], "Pagado");
        assert_eq!(rows[1]["payment_date"], "2024-01-11");
    }

    #[test]
    fn rejects_malformed_input() {
        let err = recompute("{\"not\": \"a list\"}".as_bytes(), rule()).unwrap_err();
        assert!(err.to_string().contains("JSON array of invoice records"));
    }
}
