//! Daily calendar seeding

use anyhow::{bail, Result};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use studyhub_server::db::queries::{concepts, daily, problems};
use studyhub_server::DbPool;

/// One planned calendar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyPick {
    pub date: NaiveDate,
    pub concept_id: i64,
    pub problem_id: i64,
}

/// Pick a random concept and problem for every free day in `start..=end`.
pub fn plan<R: Rng>(
    start: NaiveDate,
    end: NaiveDate,
    taken: &HashSet<NaiveDate>,
    concept_ids: &[i64],
    problem_ids: &[i64],
    rng: &mut R,
) -> Result<Vec<DailyPick>> {
    if end < start {
        bail!("End date {} is before start date {}", end, start);
    }
    if concept_ids.is_empty() || problem_ids.is_empty() {
        bail!("Need at least one concept and one problem to seed the calendar");
    }

    let mut picks = Vec::new();
    for date in start.iter_days().take_while(|d| *d <= end) {
        if taken.contains(&date) {
            continue;
        }
        if let (Some(&concept_id), Some(&problem_id)) =
            (concept_ids.choose(rng), problem_ids.choose(rng))
        {
            picks.push(DailyPick {
                date,
                concept_id,
                problem_id,
            });
        }
    }
    Ok(picks)
}

/// Returns (inserted, skipped) day counts.
pub async fn run(pool: &DbPool, start: NaiveDate, end: NaiveDate) -> Result<(usize, usize)> {
    let concept_ids: Vec<i64> = concepts::list_concepts(pool)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let problem_ids: Vec<i64> = problems::list_problems(pool, None)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    let taken = daily::taken_dates(pool, start, end).await?;

    let picks = plan(
        start,
        end,
        &taken,
        &concept_ids,
        &problem_ids,
        &mut rand::thread_rng(),
    )?;

    let mut inserted = 0;
    for pick in &picks {
        // Another writer may have filled the date since the lookup.
        if daily::insert_daily(pool, pick.date, pick.concept_id, pick.problem_id).await? {
            inserted += 1;
        }
    }
    let total_days = (end - start).num_days() as usize + 1;
    Ok((inserted, total_days - inserted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_plan_skips_taken_dates() {
        let taken: HashSet<NaiveDate> = [day(2), day(4)].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(7);
        let picks = plan(day(1), day(5), &taken, &[10, 11], &[20], &mut rng).unwrap();

        let dates: Vec<NaiveDate> = picks.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(1), day(3), day(5)]);
        assert!(picks.iter().all(|p| [10, 11].contains(&p.concept_id)));
        assert!(picks.iter().all(|p| p.problem_id == 20));
    }

    #[test]
    fn test_plan_single_day() {
        let mut rng = StdRng::seed_from_u64(1);
        let picks = plan(day(9), day(9), &HashSet::new(), &[1], &[2], &mut rng).unwrap();
        assert_eq!(
            picks,
            vec![DailyPick {
                date: day(9),
                concept_id: 1,
                problem_id: 2
            }]
        );
    }

    #[test]
    fn test_plan_rejects_bad_input() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(plan(day(5), day(1), &HashSet::new(), &[1], &[2], &mut rng).is_err());
        assert!(plan(day(1), day(5), &HashSet::new(), &[], &[2], &mut rng).is_err());
        assert!(plan(day(1), day(5), &HashSet::new(), &[1], &[], &mut rng).is_err());
    }
}
