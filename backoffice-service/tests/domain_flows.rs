//! Cross-module flows over the pure domain layer: plan schedules against
//! invoice totals, contract lifecycle rules, and template rendering.

use backoffice_service::models::{
    BookingStatus, ContractStatus, CreateLineItem, InvoiceStatus, PlanFrequency,
};
use backoffice_service::services::{ledger, render, schedule};
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn plan_over_invoice_total_settles_exactly() {
    let items = vec![
        CreateLineItem {
            description: "3-month coaching package".to_string(),
            quantity: d("1"),
            unit_price: d("1000.00"),
        },
        CreateLineItem {
            description: "onboarding session".to_string(),
            quantity: d("1"),
            unit_price: d("150.00"),
        },
    ];
    let totals = ledger::compute_totals(&items, d("50.00"), Some(d("0.0825")));

    let installments = schedule::build_schedule(
        totals.total,
        3,
        PlanFrequency::Monthly,
        date(2026, 9, 1),
    )
    .unwrap();

    let scheduled: Decimal = installments.iter().map(|i| i.amount).sum();
    assert_eq!(scheduled, totals.total);

    // paying every installment settles the invoice
    let mut paid = Decimal::ZERO;
    for installment in &installments {
        assert!(ledger::validate_payment(
            InvoiceStatus::Sent,
            installment.amount,
            ledger::balance_due(totals.total, paid),
        )
        .is_ok());
        paid += installment.amount;
    }
    assert_eq!(
        ledger::status_after_payment(totals.total, paid),
        InvoiceStatus::Paid
    );
}

#[test]
fn uneven_split_reconciles_in_the_last_installment() {
    let installments =
        schedule::build_schedule(d("100.00"), 3, PlanFrequency::Weekly, date(2026, 9, 7)).unwrap();
    let amounts: Vec<Decimal> = installments.iter().map(|i| i.amount).collect();
    assert_eq!(amounts, vec![d("33.33"), d("33.33"), d("33.34")]);

    let dates: Vec<NaiveDate> = installments.iter().map(|i| i.due_date).collect();
    assert_eq!(
        dates,
        vec![date(2026, 9, 7), date(2026, 9, 14), date(2026, 9, 21)]
    );
}

#[test]
fn monthly_schedule_clamps_to_month_end() {
    let installments =
        schedule::build_schedule(d("300.00"), 3, PlanFrequency::Monthly, date(2026, 1, 31))
            .unwrap();
    let dates: Vec<NaiveDate> = installments.iter().map(|i| i.due_date).collect();
    assert_eq!(
        dates,
        vec![date(2026, 1, 31), date(2026, 2, 28), date(2026, 3, 31)]
    );
}

#[test]
fn contract_lifecycle_only_moves_forward() {
    use ContractStatus::*;

    assert!(Draft.can_transition_to(Sent));
    assert!(Sent.can_transition_to(Viewed));
    assert!(Viewed.can_transition_to(Signed));
    assert!(Viewed.can_transition_to(Declined));

    // terminal states stay terminal
    for terminal in [Signed, Declined, Expired, Void] {
        for next in [Draft, Sent, Viewed, Signed, Declined, Expired, Void] {
            assert!(!terminal.can_transition_to(next));
        }
    }

    // void is reachable from every non-terminal state
    for open in [Draft, Sent, Viewed] {
        assert!(open.can_transition_to(Void));
    }
}

#[test]
fn booking_lifecycle_matches_confirmation_flow() {
    use BookingStatus::*;

    assert!(Pending.can_transition_to(Confirmed));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Confirmed.can_transition_to(Completed));
    assert!(Confirmed.can_transition_to(NoShow));
    assert!(!Completed.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(Confirmed));
}

#[test]
fn rendered_contract_content_hashes_stably() {
    let template = "This agreement is between {{coach_name}} and {{client_name}}.";
    let merge_data = serde_json::json!({
        "coach_name": "Jordan Avery",
        "client_name": "Sam Whitfield"
    });

    let content = render::render_template(template, &merge_data);
    assert_eq!(
        content,
        "This agreement is between Jordan Avery and Sam Whitfield."
    );

    // the frozen content hash is what signing later verifies against
    let hash = render::content_hash(&content);
    assert_eq!(hash.len(), 64);
    assert_eq!(hash, render::content_hash(&content));
    assert_ne!(hash, render::content_hash("tampered"));
}
