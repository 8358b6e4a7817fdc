//! Demo data generator
//!
//! Writes a thirteen-day window of the standard day plan (ten past days, today
//! and two upcoming days) plus one check-in for each past day and today. Past
//! tasks are completed at random with the per-slot probabilities of the
//! configured [`SeedPolicy`].

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use common::{
    error::StoreResult,
    models::{
        NewCheckIn, Priority, TaskDraft,
        tracking::{Mood, SleepQuality},
    },
    store::Repositories,
};
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::SeedPolicy;

/// First and last day of the window, relative to today
const DAYS_BEFORE: i64 = 10;
const DAYS_AFTER: i64 = 2;

struct Slot {
    title: &'static str,
    time: &'static str,
    priority: Priority,
    reason: &'static str,
    ai_suggestion: &'static str,
}

/// Number of slots in every generated day, before the weekend extra
pub const DAILY_SLOT_COUNT: usize = 6;

const DAILY_SLOTS: [Slot; DAILY_SLOT_COUNT] = [
    Slot {
        title: "Morning Meditation",
        time: "07:00 AM - 07:30 AM",
        priority: Priority::Medium,
        reason: "Starting the day with mindfulness improves focus and reduces stress",
        ai_suggestion: "Better productivity follows days that start with meditation",
    },
    Slot {
        title: "Deep Work Session",
        time: "09:00 AM - 11:00 AM",
        priority: Priority::High,
        reason: "Peak energy hours for focused work",
        ai_suggestion: "Complex tasks go best during morning hours",
    },
    Slot {
        title: "Lunch Break",
        time: "12:30 PM - 01:00 PM",
        priority: Priority::Low,
        reason: "Regular meal times support energy regulation",
        ai_suggestion: "A consistent lunch schedule helps maintain afternoon energy",
    },
    Slot {
        title: "Team Meeting",
        time: "02:00 PM - 03:00 PM",
        priority: Priority::Medium,
        reason: "Afternoon slot suitable for collaborative work",
        ai_suggestion: "Energy dips slightly after lunch, a good time for social tasks",
    },
    Slot {
        title: "Exercise",
        time: "06:00 PM - 07:00 PM",
        priority: Priority::High,
        reason: "Evening exercise helps with sleep quality and stress relief",
        ai_suggestion: "Sleep improves with evening physical activity",
    },
    Slot {
        title: "Reading",
        time: "09:00 PM - 09:30 PM",
        priority: Priority::Low,
        reason: "Wind-down activity before sleep",
        ai_suggestion: "Reading before bed supports better sleep quality",
    },
];

const WEEKEND_SLOT: Slot = Slot {
    title: "Family Time",
    time: "10:00 AM - 12:00 PM",
    priority: Priority::High,
    reason: "Weekend quality time with loved ones",
    ai_suggestion: "Social connections improve overall well-being",
};

impl Slot {
    fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.to_string(),
            time: Some(self.time.to_string()),
            priority: self.priority,
            reason: self.reason.to_string(),
            ai_suggestion: self.ai_suggestion.to_string(),
            ..Default::default()
        }
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// The standard plan for one day, every task pending.
///
/// Also served as the fallback when the external planner is unavailable.
pub fn day_plan(date: NaiveDate) -> Vec<TaskDraft> {
    let mut drafts: Vec<TaskDraft> = DAILY_SLOTS.iter().map(Slot::draft).collect();
    if is_weekend(date) {
        drafts.push(WEEKEND_SLOT.draft());
    }
    drafts
}

/// Generated data, not yet written
#[derive(Debug, Clone)]
pub struct DemoPlan {
    pub days: Vec<(NaiveDate, Vec<TaskDraft>)>,
    pub check_ins: Vec<NewCheckIn>,
}

/// Generate the demo window around `today`
pub fn build_demo_plan(today: NaiveDate, policy: &SeedPolicy, rng: &mut impl Rng) -> DemoPlan {
    let mut days = Vec::new();
    let mut check_ins = Vec::new();

    for offset in -DAYS_BEFORE..=DAYS_AFTER {
        let date = today + Duration::days(offset);
        let is_past = offset < 0;

        let mut drafts = day_plan(date);
        for (index, draft) in drafts.iter_mut().enumerate() {
            draft.is_ai_generated = true;
            let probability = if index < DAILY_SLOTS.len() {
                policy.completion_probabilities.get(index).copied().unwrap_or(0.0)
            } else {
                policy.weekend_completion_probability
            };
            draft.completed = Some(is_past && rng.gen_bool(probability));
        }
        days.push((date, drafts));

        if offset <= 0 {
            check_ins.push(NewCheckIn {
                energy_level: rng.gen_range(policy.min_energy..=policy.max_energy),
                mood: *Mood::ALL.choose(rng).unwrap_or(&Mood::Neutral),
                sleep_quality: *SleepQuality::ALL.choose(rng).unwrap_or(&SleepQuality::Okay),
                date: Some(date.and_time(NaiveTime::MIN).and_utc()),
            });
        }
    }

    DemoPlan { days, check_ins }
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCount {
    pub total: usize,
    pub date_range: Option<DateRange>,
}

/// Summary returned to the caller
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub tasks: SeedCount,
    pub check_ins: SeedCount,
}

impl DemoPlan {
    fn report(&self) -> SeedReport {
        let task_dates: Vec<NaiveDate> = self
            .days
            .iter()
            .filter(|(_, drafts)| !drafts.is_empty())
            .map(|(date, _)| *date)
            .collect();
        let check_in_dates: Vec<NaiveDate> = self
            .check_ins
            .iter()
            .filter_map(|check_in| check_in.date.map(|at| at.date_naive()))
            .collect();

        SeedReport {
            tasks: SeedCount {
                total: self.days.iter().map(|(_, drafts)| drafts.len()).sum(),
                date_range: range_of(&task_dates),
            },
            check_ins: SeedCount {
                total: self.check_ins.len(),
                date_range: range_of(&check_in_dates),
            },
        }
    }

    /// Replace the user's tasks and check-ins with this plan
    pub async fn apply(self, repositories: &Repositories, user_id: Uuid) -> StoreResult<SeedReport> {
        let report = self.report();

        let deleted_tasks = repositories.tasks.delete_all_tasks(user_id).await?;
        let deleted_check_ins = repositories.tracking.delete_all_check_ins(user_id).await?;
        info!(
            %user_id,
            deleted_tasks,
            deleted_check_ins,
            "Cleared data before seeding"
        );

        for (date, drafts) in self.days {
            repositories
                .tasks
                .replace_tasks_for_date(user_id, date, drafts)
                .await?;
        }
        for check_in in self.check_ins {
            repositories.tracking.insert_check_in(user_id, check_in).await?;
        }

        info!(
            %user_id,
            tasks = report.tasks.total,
            check_ins = report.check_ins.total,
            "Seeded demo data"
        );
        Ok(report)
    }
}

fn range_of(dates: &[NaiveDate]) -> Option<DateRange> {
    let from = dates.iter().min()?;
    let to = dates.iter().max()?;
    Some(DateRange {
        from: *from,
        to: *to,
    })
}
