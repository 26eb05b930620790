//! Daily low-stock mail.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Local, TimeZone};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

use crate::errors::ServiceError;
use crate::notifications::Notifier;
use crate::services::ReportService;

/// First top-of-hour `hour` strictly after `now`, in `now`'s time zone
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    (0..=2u64)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|day| day.and_hms_opt(hour, 0, 0))
        .filter_map(|naive| tz.from_local_datetime(&naive).earliest())
        .find(|candidate| candidate > now)
        // skipped by a DST gap on every candidate day
        .unwrap_or_else(|| now.clone() + chrono::Duration::days(1))
}

/// Looks for low stock and mails the admins; returns how many items were low
pub async fn run_low_stock_check(
    reports: &ReportService,
    notifier: &Notifier,
) -> Result<usize, ServiceError> {
    let items = reports.low_stock().await?;
    if let Some(handle) = notifier.send_low_stock_alert(&items) {
        if let Err(err) = handle.await {
            error!(error = %err, "low stock mail task failed");
        }
    }
    Ok(items.len())
}

/// Spawns the daily job at `hour` local time
pub fn start_low_stock_job(
    reports: Arc<ReportService>,
    notifier: Notifier,
    hour: u32,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now();
            let next = next_run_after(&now, hour);
            let wait = (next.clone() - now)
                .to_std()
                .unwrap_or(Duration::from_secs(60));
            info!(next_run = %next, "low stock check scheduled");
            sleep(wait).await;

            match run_low_stock_check(&reports, &notifier).await {
                Ok(low) => info!(low, "low stock check finished"),
                Err(err) => error!(error = %err, "low stock check failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn runs_later_today_when_hour_is_ahead() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 0).unwrap();
        let next = next_run_after(&now, 9);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap());
    }

    #[test]
    fn rolls_to_tomorrow_once_hour_has_passed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let next = next_run_after(&now, 9);
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap());
    }

    #[test]
    fn respects_offset_time_zones() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2024, 12, 31, 23, 15, 0).unwrap();
        let next = next_run_after(&now, 0);
        assert_eq!(next, tz.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }
}
