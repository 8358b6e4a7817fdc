//! Seven-day completion statistics

use chrono::{Duration, NaiveDate};
use common::{error::StoreResult, models::DayCount, store::TaskStore};
use uuid::Uuid;

use crate::models::DayStatistics;

const WINDOW_DAYS: i64 = 7;

/// Fold per-date counts into the trailing window ending at `today`, oldest first.
///
/// Dates missing from `counts` report zero completed out of zero.
pub fn weekly_statistics(today: NaiveDate, counts: &[DayCount]) -> Vec<DayStatistics> {
    (0..WINDOW_DAYS)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            let (completed, total) = counts
                .iter()
                .find(|count| count.date == date)
                .map(|count| (count.completed, count.total))
                .unwrap_or((0, 0));

            DayStatistics {
                day_name: date.format("%a").to_string(),
                date,
                completed,
                total,
            }
        })
        .collect()
}

/// Load the window for one user
pub async fn load_weekly_statistics(
    tasks: &dyn TaskStore,
    user_id: Uuid,
    today: NaiveDate,
) -> StoreResult<Vec<DayStatistics>> {
    let from = today - Duration::days(WINDOW_DAYS - 1);
    let counts = tasks.count_tasks_by_date(user_id, from, today).await?;
    Ok(weekly_statistics(today, &counts))
}
