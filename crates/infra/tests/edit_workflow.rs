use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use paytrack_core::{ClientId, DomainError, FixedClock, InvoiceId};
use paytrack_infra::{
    EditError, InMemoryInvoiceRepository, InvoiceEditService, InvoiceRecord, InvoiceRepository,
    NoopNotifier, RecordingNotifier,
};
use paytrack_invoicing::{
    InvoiceAmountRule, InvoiceStatus, RuleConfig, ValidationReason, ZeroAmountPolicy,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 1, 11)
}

fn rule(policy: ZeroAmountPolicy) -> InvoiceAmountRule<FixedClock> {
    InvoiceAmountRule::new(
        &RuleConfig::default().with_policy(policy),
        FixedClock::at_date(today()),
    )
    .unwrap()
}

type Service = InvoiceEditService<Arc<InMemoryInvoiceRepository>, Arc<RecordingNotifier>, FixedClock>;

fn setup(policy: ZeroAmountPolicy) -> (Service, Arc<InMemoryInvoiceRepository>, Arc<RecordingNotifier>) {
    let repo = Arc::new(InMemoryInvoiceRepository::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let svc = InvoiceEditService::new(rule(policy), repo.clone(), notifier.clone());
    (svc, repo, notifier)
}

#[test]
fn zero_amount_edit_settles_and_sends_receipt() {
    let (svc, repo, notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(45000), date(2024, 12, 31));
    repo.insert(record.clone()).unwrap();

    let outcome = svc.edit_amount(record.id, dec!(0)).unwrap();

    assert_eq!(outcome.record.status, InvoiceStatus::Paid);
    assert_eq!(outcome.record.payment_date, Some(today()));
    assert_eq!(outcome.record.total_amount, dec!(0));
    assert!(outcome.result.status_changed);
    assert!(outcome.result.payment_date_added);
    assert!(outcome.receipt_sent);
    assert_eq!(notifier.sent(), vec![record.id]);
}

#[test]
fn cancelled_policy_settles_as_cancelled() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Cancelled);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(45000), date(2024, 12, 31));
    repo.insert(record.clone()).unwrap();

    let outcome = svc.edit_amount(record.id, dec!(0)).unwrap();
    assert_eq!(outcome.record.status, InvoiceStatus::Cancelled);

    // A zero-amount invoice cannot be relabelled away from the terminal status.
    let outcome = svc
        .set_status(record.id, InvoiceStatus::Pending, None)
        .unwrap();
    assert_eq!(outcome.record.status, InvoiceStatus::Cancelled);
    assert_eq!(outcome.record.payment_date, Some(today()));
    assert!(outcome.result.status_changed);
    assert!(!outcome.receipt_sent);
    assert_eq!(repo.get(record.id).unwrap().status, InvoiceStatus::Cancelled);
}

#[test]
fn reopening_clears_payment_date() {
    let (svc, repo, notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(0), date(2024, 2, 1))
        .with_status(InvoiceStatus::Paid, Some(date(2024, 1, 5)));
    repo.insert(record.clone()).unwrap();

    let outcome = svc.edit_amount(record.id, dec!(12000)).unwrap();

    assert_eq!(outcome.record.status, InvoiceStatus::Pending);
    assert_eq!(outcome.record.payment_date, None);
    assert!(outcome.result.payment_date_cleared);
    assert!(!outcome.receipt_sent);
    assert!(notifier.sent().is_empty());
}

#[test]
fn overdue_edit_stores_fines() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(40000), date(2024, 1, 1))
        .with_status(InvoiceStatus::Overdue, None);
    repo.insert(record.clone()).unwrap();

    let outcome = svc.edit_amount(record.id, dec!(50000)).unwrap();

    assert_eq!(outcome.record.days_overdue, 10);
    assert_eq!(outcome.record.fines, dec!(20000));
    assert_eq!(outcome.record.total_amount, dec!(70000));
}

#[test]
fn manual_status_change_requires_payment_date() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(9000), date(2024, 2, 1));
    repo.insert(record.clone()).unwrap();

    let err = svc.set_status(record.id, InvoiceStatus::Paid, None).unwrap_err();
    assert_eq!(err.reason(), Some(ValidationReason::MissingPaymentDate));

    let outcome = svc
        .set_status(record.id, InvoiceStatus::Paid, Some(date(2024, 1, 10)))
        .unwrap();
    assert_eq!(outcome.record.status, InvoiceStatus::Paid);
    assert!(outcome.receipt_sent);
}

#[test]
fn paid_label_is_rejected_under_cancelled_policy() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Cancelled);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(9000), date(2024, 2, 1));
    repo.insert(record.clone()).unwrap();

    let err = svc
        .set_status(record.id, InvoiceStatus::Paid, Some(today()))
        .unwrap_err();
    assert_eq!(err.reason(), Some(ValidationReason::InvalidStatus));
}

#[test]
fn notifier_failure_keeps_the_edit() {
    let repo = Arc::new(InMemoryInvoiceRepository::new());
    let svc = InvoiceEditService::new(
        rule(ZeroAmountPolicy::Paid),
        repo.clone(),
        RecordingNotifier::failing(),
    );
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(100), date(2024, 2, 1));
    repo.insert(record.clone()).unwrap();

    let outcome = svc.edit_amount(record.id, dec!(0)).unwrap();

    assert!(!outcome.receipt_sent);
    assert_eq!(repo.get(record.id).unwrap().status, InvoiceStatus::Paid);
}

#[test]
fn stale_write_is_rejected() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(100), date(2024, 2, 1));
    repo.insert(record.clone()).unwrap();

    svc.edit_amount(record.id, dec!(200)).unwrap();

    // A writer that read version 0 loses.
    let err = repo.update(record, 0).unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
}

#[test]
fn recompute_refreshes_fines_and_reports_bad_records() {
    let repo = Arc::new(InMemoryInvoiceRepository::new());
    let client = ClientId::new();

    let stale_fines = InvoiceRecord::new(InvoiceId::new(), client, dec!(50000), date(2024, 1, 1))
        .with_status(InvoiceStatus::Overdue, None);
    let up_to_date = InvoiceRecord::new(InvoiceId::new(), client, dec!(1000), date(2024, 2, 1));
    let unsettled_zero = InvoiceRecord::new(InvoiceId::new(), client, dec!(0), date(2024, 2, 1));
    let paid_without_date = InvoiceRecord::new(InvoiceId::new(), client, dec!(700), date(2024, 2, 1))
        .with_status(InvoiceStatus::Paid, None);

    for r in [&stale_fines, &up_to_date, &unsettled_zero, &paid_without_date] {
        repo.insert(r.clone()).unwrap();
    }

    let notifier = Arc::new(RecordingNotifier::new());
    let svc = InvoiceEditService::new(rule(ZeroAmountPolicy::Paid), repo.clone(), notifier.clone());
    let report = svc.recompute_all().unwrap();

    assert_eq!(report.total(), 4);
    assert_eq!(report.unchanged, 1);
    let mut updated = report.updated.clone();
    updated.sort();
    let mut expected = vec![stale_fines.id, unsettled_zero.id];
    expected.sort();
    assert_eq!(updated, expected);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, paid_without_date.id);
    assert_eq!(report.failed[0].1.reason(), Some(ValidationReason::MissingPaymentDate));

    let refreshed = repo.get(stale_fines.id).unwrap();
    assert_eq!(refreshed.fines, dec!(20000));
    assert_eq!(refreshed.total_amount, dec!(70000));
    assert_eq!(repo.get(unsettled_zero.id).unwrap().status, InvoiceStatus::Paid);
    assert!(notifier.sent().is_empty());

    // A second pass finds nothing left to fix.
    let again = svc.recompute_all().unwrap();
    assert!(again.updated.is_empty());
    assert_eq!(again.unchanged, 3);
}

#[test]
fn statement_covers_only_the_requested_client() {
    let repo = Arc::new(InMemoryInvoiceRepository::new());
    let client = ClientId::new();
    let other = ClientId::new();

    repo.insert(
        InvoiceRecord::new(InvoiceId::new(), client, dec!(50000), date(2024, 1, 1))
            .with_status(InvoiceStatus::Overdue, None),
    )
    .unwrap();
    repo.insert(InvoiceRecord::new(InvoiceId::new(), other, dec!(99999), date(2024, 1, 1)))
        .unwrap();

    let svc = InvoiceEditService::new(rule(ZeroAmountPolicy::Paid), repo, NoopNotifier);
    let statement = svc.statement(client).unwrap();

    assert_eq!(statement.invoice_count, 1);
    assert_eq!(statement.outstanding_amount, dec!(70000));
}

#[test]
fn edit_error_displays_rule_message() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(100), date(2024, 2, 1));
    repo.insert(record.clone()).unwrap();

    let err = svc.edit_amount(record.id, dec!(-1000)).unwrap_err();
    assert!(matches!(err, EditError::Validation(_)));
    assert_eq!(err.to_string(), "negative amount");
}

#[test]
fn concurrent_edits_of_one_invoice_all_succeed() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(100), date(2024, 2, 1));
    repo.insert(record.clone()).unwrap();
    let threads = 8;
    let barrier = std::sync::Barrier::new(threads);

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=threads)
            .map(|i| {
                let (svc, barrier) = (&svc, &barrier);
                scope.spawn(move || {
                    barrier.wait();
                    svc.edit_amount(record.id, rust_decimal::Decimal::from(i * 1000))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for result in &results {
        assert!(result.is_ok(), "edit failed: {result:?}");
    }
    let stored = repo.get(record.id).unwrap();
    assert_eq!(stored.version, threads as u64);
}

#[test]
fn relabelling_a_settled_invoice_keeps_its_payment_date() {
    let (svc, repo, notifier) = setup(ZeroAmountPolicy::Paid);
    let paid_on = date(2024, 1, 5);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(0), date(2024, 2, 1))
        .with_status(InvoiceStatus::Paid, Some(paid_on));
    repo.insert(record.clone()).unwrap();

    let outcome = svc.set_status(record.id, InvoiceStatus::Pending, None).unwrap();

    assert_eq!(outcome.record.status, InvoiceStatus::Paid);
    assert_eq!(outcome.record.payment_date, Some(paid_on));
    assert!(!outcome.receipt_sent);
    assert!(notifier.sent().is_empty());
}

#[test]
fn reopening_by_hand_drops_the_payment_date() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(500), date(2024, 2, 1))
        .with_status(InvoiceStatus::Paid, Some(date(2024, 1, 5)));
    repo.insert(record.clone()).unwrap();

    let outcome = svc.set_status(record.id, InvoiceStatus::Pending, None).unwrap();

    assert_eq!(outcome.record.status, InvoiceStatus::Pending);
    assert_eq!(outcome.record.payment_date, None);
}

#[test]
fn overflowing_edit_is_rejected_and_not_stored() {
    let (svc, repo, _notifier) = setup(ZeroAmountPolicy::Paid);
    let record = InvoiceRecord::new(InvoiceId::new(), ClientId::new(), dec!(100), date(2024, 1, 1))
        .with_status(InvoiceStatus::Overdue, None);
    repo.insert(record.clone()).unwrap();

    let err = svc
        .edit_amount(record.id, rust_decimal::Decimal::MAX)
        .unwrap_err();

    assert_eq!(err.reason(), Some(ValidationReason::AmountOutOfRange));
    assert_eq!(repo.get(record.id).unwrap(), record);
}
