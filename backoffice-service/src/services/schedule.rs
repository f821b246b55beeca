//! Payment-plan schedule generation.
//!
//! The base installment is the total split evenly and rounded to cents; the
//! rounding drift is folded into the last installment so the schedule always
//! sums exactly to the plan total.

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::PlanFrequency;

/// One generated installment, before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledInstallment {
    pub sequence: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Generate an ordered installment schedule.
pub fn build_schedule(
    total_amount: Decimal,
    number_of_payments: i32,
    frequency: PlanFrequency,
    start_date: NaiveDate,
) -> Result<Vec<ScheduledInstallment>, AppError> {
    if number_of_payments < 1 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Number of payments must be at least 1"
        )));
    }
    if total_amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Plan total must be positive"
        )));
    }

    let count = Decimal::from(number_of_payments);
    let base_amount = (total_amount / count).round_dp(2);

    let mut schedule = Vec::with_capacity(number_of_payments as usize);
    for i in 0..number_of_payments {
        let due_date = due_date_for(start_date, frequency, i)?;
        schedule.push(ScheduledInstallment {
            sequence: i + 1,
            due_date,
            amount: base_amount,
        });
    }

    // Fold the rounding drift into the final installment.
    let sum: Decimal = schedule.iter().map(|s| s.amount).sum();
    let diff = total_amount - sum;
    if let Some(last) = schedule.last_mut() {
        last.amount += diff;
    }

    Ok(schedule)
}

/// Due date of the installment at 0-based offset `index` from the start.
///
/// Monthly advancement clamps to the last valid day of shorter months
/// (Jan 31 + 1 month = Feb 28/29).
fn due_date_for(
    start_date: NaiveDate,
    frequency: PlanFrequency,
    index: i32,
) -> Result<NaiveDate, AppError> {
    let out_of_range = || AppError::BadRequest(anyhow::anyhow!("Installment due date out of range"));
    match frequency {
        PlanFrequency::Weekly => start_date
            .checked_add_days(Days::new(7 * index as u64))
            .ok_or_else(out_of_range),
        PlanFrequency::BiWeekly => start_date
            .checked_add_days(Days::new(14 * index as u64))
            .ok_or_else(out_of_range),
        PlanFrequency::Monthly => start_date
            .checked_add_months(Months::new(index as u32))
            .ok_or_else(out_of_range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn hundred_over_three_monthly() {
        let schedule =
            build_schedule(d("100.00"), 3, PlanFrequency::Monthly, date(2026, 1, 15)).unwrap();
        let amounts: Vec<Decimal> = schedule.iter().map(|s| s.amount).collect();
        assert_eq!(amounts, vec![d("33.33"), d("33.33"), d("33.34")]);
        let sum: Decimal = amounts.iter().copied().sum();
        assert_eq!(sum, d("100.00"));
    }

    #[test]
    fn schedule_sums_to_total_for_every_frequency() {
        let cases = [
            (d("100.00"), 3),
            (d("99.99"), 7),
            (d("1000.00"), 12),
            (d("0.01"), 1),
            (d("250.10"), 6),
        ];
        for frequency in [
            PlanFrequency::Weekly,
            PlanFrequency::BiWeekly,
            PlanFrequency::Monthly,
        ] {
            for (total, n) in cases {
                let schedule = build_schedule(total, n, frequency, date(2026, 3, 1)).unwrap();
                assert_eq!(schedule.len(), n as usize);
                let sum: Decimal = schedule.iter().map(|s| s.amount).sum();
                assert_eq!(sum, total, "total={} n={} {:?}", total, n, frequency);
            }
        }
    }

    #[test]
    fn weekly_dates_advance_seven_days() {
        let schedule =
            build_schedule(d("300.00"), 3, PlanFrequency::Weekly, date(2026, 1, 1)).unwrap();
        let dates: Vec<NaiveDate> = schedule.iter().map(|s| s.due_date).collect();
        assert_eq!(
            dates,
            vec![date(2026, 1, 1), date(2026, 1, 8), date(2026, 1, 15)]
        );
    }

    #[test]
    fn bi_weekly_dates_advance_fourteen_days() {
        let schedule =
            build_schedule(d("300.00"), 3, PlanFrequency::BiWeekly, date(2026, 1, 1)).unwrap();
        let dates: Vec<NaiveDate> = schedule.iter().map(|s| s.due_date).collect();
        assert_eq!(
            dates,
            vec![date(2026, 1, 1), date(2026, 1, 15), date(2026, 1, 29)]
        );
    }

    #[test]
    fn monthly_clamps_to_end_of_month() {
        let schedule =
            build_schedule(d("400.00"), 4, PlanFrequency::Monthly, date(2026, 1, 31)).unwrap();
        let dates: Vec<NaiveDate> = schedule.iter().map(|s| s.due_date).collect();
        assert_eq!(
            dates,
            vec![
                date(2026, 1, 31),
                date(2026, 2, 28),
                date(2026, 3, 31),
                date(2026, 4, 30)
            ]
        );
    }

    #[test]
    fn monthly_clamps_to_leap_february() {
        let schedule =
            build_schedule(d("200.00"), 2, PlanFrequency::Monthly, date(2028, 1, 31)).unwrap();
        assert_eq!(schedule[1].due_date, date(2028, 2, 29));
    }

    #[test]
    fn single_payment_gets_the_full_total() {
        let schedule =
            build_schedule(d("123.45"), 1, PlanFrequency::Weekly, date(2026, 5, 1)).unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].amount, d("123.45"));
        assert_eq!(schedule[0].sequence, 1);
    }

    #[test]
    fn rejects_zero_payments() {
        assert!(build_schedule(d("100.00"), 0, PlanFrequency::Weekly, date(2026, 1, 1)).is_err());
    }

    #[test]
    fn rejects_non_positive_total() {
        assert!(build_schedule(d("0.00"), 3, PlanFrequency::Weekly, date(2026, 1, 1)).is_err());
        assert!(build_schedule(d("-5.00"), 3, PlanFrequency::Weekly, date(2026, 1, 1)).is_err());
    }
}
