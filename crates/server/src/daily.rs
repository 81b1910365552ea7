//! Daily calendar progress and streak bookkeeping

use crate::db::queries::daily::{self, DailyPart};
use crate::db::queries::users;
use anyhow::Result;
use chrono::NaiveDate;
use deadpool_postgres::Pool;
use studyhub_core::streak::{Streak, StreakStep};
use studyhub_core::{DailyContent, DailyProgress, Profile, UserId};
use tracing::info;

/// Whether `item_id` is the `part` of the calendar entry.
pub fn is_daily_item(entry: &DailyContent, part: DailyPart, item_id: i64) -> bool {
    match part {
        DailyPart::Problem => entry.problem_id == item_id,
        DailyPart::Concept => entry.concept_id == item_id,
    }
}

pub fn profile_streak(profile: &Profile) -> Streak {
    Streak::new(
        profile.current_streak,
        profile.longest_streak,
        profile.last_streak_date,
    )
}

/// Streak shown to users on `today`. Reads 0 once the last completed day is
/// older than yesterday, whatever the stored counter says.
pub fn current_streak(profile: &Profile, today: NaiveDate) -> i32 {
    profile_streak(profile).effective(today)
}

/// Mark `item_id` done for the calendar entry of `day`, if it is that day's
/// problem or concept. Completing both halves extends the user's streak.
pub async fn record_progress(
    pool: &Pool,
    user_id: UserId,
    part: DailyPart,
    item_id: i64,
    day: NaiveDate,
) -> Result<Option<DailyProgress>> {
    let Some(entry) = daily::get_by_date(pool, day).await? else {
        return Ok(None);
    };
    if !is_daily_item(&entry, part, item_id) {
        return Ok(None);
    }

    let progress = daily::mark_done(pool, user_id, entry.id, part).await?;
    if progress.is_complete() {
        let profile = users::get_profile(pool, user_id).await?;
        let mut streak = profile_streak(&profile);
        let step = streak.step(day);
        if step != StreakStep::Unchanged {
            streak.apply(step, day);
            users::save_streak(pool, user_id, &streak).await?;
            info!(
                user_id,
                ?step,
                current = streak.current,
                longest = streak.longest,
                "Daily streak updated"
            );
        }
    }
    Ok(Some(progress))
}
