//! The held-time integral — pure functions, no I/O, so the arithmetic can
//! be tested without a database.

use chrono::{DateTime, Duration, Utc};
use num_bigint::BigInt;

use crate::bigint::Amount;

/// `5% of balance per hour`, rendered as the integer-arithmetic formula
/// `floor(b * 5 * micro_minutes / (100 * 60 * 1_000_000))`.
///
/// `duration` is the only place a floating-point value appears: it is
/// converted to a minute count and scaled to whole micro-minutes before any
/// multiplication touches the arbitrary-precision balance.
pub fn points_for(balance: &Amount, duration: Duration) -> Amount {
    if duration <= Duration::zero() || balance.is_zero() {
        return Amount::zero();
    }

    let minutes = duration.num_milliseconds() as f64 / 60_000.0;
    let micro_minutes = (minutes * 1_000_000.0).round() as i64;
    if micro_minutes <= 0 {
        return Amount::zero();
    }

    let denominator = BigInt::from(100i64) * BigInt::from(60i64) * BigInt::from(1_000_000i64);
    let numerator = balance_as_bigint(balance) * BigInt::from(5i64) * BigInt::from(micro_minutes);
    Amount::from_bigint_floor_div(numerator, denominator)
}

fn balance_as_bigint(a: &Amount) -> BigInt {
    // Amount already wraps a BigInt; go through the decimal string boundary
    // so this module never needs a `pub(crate)` accessor into bigint.rs.
    a.to_string().parse().expect("Amount always prints a valid base-10 integer")
}

/// One change within a window, narrowed to what the integral needs.
#[derive(Debug, Clone)]
pub struct WindowChange {
    pub created_at: DateTime<Utc>,
    pub balance_after: Amount,
}

/// Integrate `balance × time` across `[period_start, period_end]` given the
/// balance held at `period_start` and the chronologically ordered changes
/// that occurred inside the window.
pub fn integrate_window(
    start_balance: &Amount,
    changes: &[WindowChange],
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> Amount {
    let mut segment_start = period_start;
    let mut current_bal = start_balance.clone();
    let mut total = Amount::zero();

    for change in changes {
        let dt = change.created_at - segment_start;
        if dt > Duration::zero() {
            total = &total + &points_for(&current_bal, dt);
        }
        current_bal = change.balance_after.clone();
        segment_start = change.created_at;
    }

    let dt = period_end - segment_start;
    if dt > Duration::zero() {
        total = &total + &points_for(&current_bal, dt);
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + minutes * 60, 0).unwrap()
    }

    #[test]
    fn constant_balance_for_one_hour_earns_five_percent() {
        // floor(10000 * 5 / 100) = floor(10000 * 0.05) = 500
        let balance = Amount::from(10_000i64);
        let points = points_for(&balance, Duration::minutes(60));
        assert_eq!(points.to_string(), "500");
    }

    #[test]
    fn splitting_a_window_in_two_sums_to_the_whole() {
        let balance = Amount::from(10_000i64);
        let whole = points_for(&balance, Duration::minutes(60));

        let half_a = points_for(&balance, Duration::minutes(30));
        let half_b = points_for(&balance, Duration::minutes(30));
        let split = &half_a + &half_b;

        let diff = (&whole - &split).to_string().trim_start_matches('-').parse::<i64>().unwrap();
        assert!(diff <= 1, "split {split} should equal whole {whole} within rounding");
    }

    #[test]
    fn sixty_minute_hold_with_no_changes() {
        let start_balance = Amount::from(10_000i64);
        let points = integrate_window(&start_balance, &[], at(0), at(60));
        assert_eq!(points.to_string(), "500");
    }

    #[test]
    fn mid_window_balance_change_splits_the_integral() {
        let start_balance = Amount::from(10_000i64);
        let changes = vec![WindowChange {
            created_at: at(30),
            balance_after: Amount::from(20_000i64),
        }];
        let points = integrate_window(&start_balance, &changes, at(0), at(60));
        // floor(10000*0.05*0.5) + floor(20000*0.05*0.5) = 250 + 500 = 750
        assert_eq!(points.to_string(), "750");
    }

    #[test]
    fn zero_duration_segments_contribute_nothing() {
        let points = points_for(&Amount::from(1_000i64), Duration::zero());
        assert!(points.is_zero());
    }

    #[test]
    fn zero_balance_contributes_nothing_even_over_long_duration() {
        let points = points_for(&Amount::zero(), Duration::days(365));
        assert!(points.is_zero());
    }
}
