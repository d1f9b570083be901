//! Expired-record sweep.
//!
//! Runs at midnight UTC on the first day of every month.

use crate::error::StoreResult;
use crate::store::LicenseStore;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tracing::info;

/// Returns the first sweep instant strictly after `now`: midnight UTC on the
/// first day of the following month.
#[must_use]
pub fn next_sweep_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Removes every record that expired at or before `now`.
pub fn sweep_expired(store: &LicenseStore, now: DateTime<Utc>) -> StoreResult<usize> {
    info!("Removing expired license keys at {}", now.to_rfc3339());
    let removed = store.remove_expired(now)?;
    info!("Removed {} expired license keys", removed);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mid_month_rolls_to_next_first() {
        let now = Utc.with_ymd_and_hms(2022, 5, 11, 10, 30, 28).unwrap();
        assert_eq!(
            next_sweep_after(now),
            Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn december_rolls_into_january() {
        let now = Utc.with_ymd_and_hms(2022, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            next_sweep_after(now),
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn exactly_at_sweep_time_schedules_the_next_one() {
        let now = Utc.with_ymd_and_hms(2022, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            next_sweep_after(now),
            Utc.with_ymd_and_hms(2022, 7, 1, 0, 0, 0).unwrap()
        );
    }
}
