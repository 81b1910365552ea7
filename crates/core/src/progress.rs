//! Daily calendar progress
//!
//! Each calendar day pairs one concept with one problem. A day is complete for
//! a user once the concept is read and the problem solved.

use crate::filter::DifficultyCounts;
use crate::models::{
    Concept, ConceptLevel, DailyProgress, Level, Problem, ProblemKind, Track,
};
use crate::verdict::Verdict;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// The calendar starts in this year; earlier years are clamped up.
pub const FIRST_CALENDAR_YEAR: i32 = 2025;

/// Resolve `year` / `month` query values against `today`. Missing or
/// malformed values default to the current year and month.
pub fn resolve_month(year: Option<&str>, month: Option<&str>, today: NaiveDate) -> (i32, u32) {
    let year = year
        .and_then(|s| s.trim().parse::<i32>().ok())
        .unwrap_or(today.year())
        .max(FIRST_CALENDAR_YEAR);
    let month = month
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(|m| m.clamp(1, 12) as u32)
        .unwrap_or(today.month());
    (year, month)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

// ============================================================================
// MONTHLY CALENDAR
// ============================================================================

/// One calendar day as loaded from storage, with the viewer's progress.
#[derive(Debug, Clone)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub concept: Concept,
    pub problem: Problem,
    pub progress: DailyProgress,
    /// 3 when the viewer has an accepted submission for the problem, else 0
    pub problem_status: i16,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProblemCard {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub level: Level,
    #[serde(rename = "type")]
    pub track: Track,
    pub problem_type: ProblemKind,
    pub tags: Vec<String>,
    pub solved: u8,
    pub status: i16,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptCard {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub level: ConceptLevel,
    #[serde(rename = "type")]
    pub track: Track,
    pub tags: Vec<String>,
    pub read: u8,
}

impl ConceptCard {
    pub fn new(concept: &Concept, read: bool) -> Self {
        Self {
            id: concept.id,
            slug: concept.slug.clone(),
            title: concept.title.clone(),
            level: concept.level,
            track: concept.concept_type,
            tags: concept.tags.clone(),
            read: u8::from(read),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCard {
    pub problem_data: ProblemCard,
    pub concept_data: ConceptCard,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyContent {
    /// Keyed by `YYYY-MM-DD`
    pub monthly_content: BTreeMap<String, DayCard>,
    pub percentage_solved: f64,
}

/// Build the calendar view for one month. Days after `today` are hidden.
pub fn monthly_content(
    year: i32,
    month: u32,
    days: Vec<CalendarDay>,
    today: NaiveDate,
) -> MonthlyContent {
    let mut content = BTreeMap::new();
    let mut completed = 0u32;

    for day in days {
        if day.date > today || day.date.year() != year || day.date.month() != month {
            continue;
        }
        if day.progress.is_complete() {
            completed += 1;
        }
        let problem = &day.problem;
        content.insert(
            day.date.format("%Y-%m-%d").to_string(),
            DayCard {
                problem_data: ProblemCard {
                    id: problem.id,
                    slug: problem.slug.clone(),
                    title: problem.title.clone(),
                    level: problem.level,
                    track: problem.track,
                    problem_type: problem.kind,
                    tags: problem.tags.clone(),
                    solved: u8::from(day.progress.solved),
                    status: day.problem_status,
                },
                concept_data: ConceptCard::new(&day.concept, day.progress.concept_read),
            },
        );
    }

    let percentage_solved = if content.is_empty() {
        0.0
    } else {
        f64::from(completed) / f64::from(days_in_month(year, month)) * 100.0
    };

    MonthlyContent {
        monthly_content: content,
        percentage_solved,
    }
}

// ============================================================================
// USER HISTORY
// ============================================================================

/// A submission joined with its problem title.
#[derive(Debug, Clone)]
pub struct SubmissionEvent {
    pub submission_id: i64,
    pub problem_id: i64,
    pub problem_title: String,
    pub verdict: Verdict,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedProblem {
    pub problem_id: i64,
    pub submission_id: i64,
    pub problem_title: String,
    pub submission_status: Verdict,
}

/// Latest submission per (problem, verdict), newest first.
pub fn latest_per_problem_verdict(mut events: Vec<SubmissionEvent>) -> Vec<SubmittedProblem> {
    events.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.submission_id.cmp(&a.submission_id))
    });
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|e| seen.insert((e.problem_id, e.verdict)))
        .map(|e| SubmittedProblem {
            problem_id: e.problem_id,
            submission_id: e.submission_id,
            problem_title: e.problem_title,
            submission_status: e.verdict,
        })
        .collect()
}

// ============================================================================
// SOLVED STATS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProblemSolvedData {
    pub total_submissions_count: i64,
    pub easy_problems_submissions_count: i64,
    pub medium_problems_submissions_count: i64,
    pub hard_problems_submissions_count: i64,
    pub difficulty_totals: DifficultyCounts,
}

impl ProblemSolvedData {
    /// `accepted` holds the level of the problem behind every accepted
    /// submission; `totals` counts all problems per level.
    pub fn new<I>(accepted: I, totals: DifficultyCounts) -> Self
    where
        I: IntoIterator<Item = Level>,
    {
        let mut solved = DifficultyCounts::default();
        let mut total = 0;
        for level in accepted {
            solved.add(level, 1);
            total += 1;
        }
        Self {
            total_submissions_count: total,
            easy_problems_submissions_count: solved.easy,
            medium_problems_submissions_count: solved.medium,
            hard_problems_submissions_count: solved.hard,
            difficulty_totals: totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_resolve_month() {
        let today = d("2025-07-20");
        assert_eq!(resolve_month(None, None, today), (2025, 7));
        assert_eq!(resolve_month(Some("2023"), Some("2"), today), (2025, 2));
        assert_eq!(resolve_month(Some("2026"), Some("15"), today), (2026, 12));
        assert_eq!(resolve_month(Some("x"), Some("0"), today), (2025, 1));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2028, 2), 29);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2025, 4), 30);
    }

    fn concept(id: i64) -> Concept {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Concept {
            id,
            title: format!("Concept {}", id),
            slug: format!("concept-{}", id),
            description: String::new(),
            one_liner_desc: String::new(),
            level: ConceptLevel::Easy,
            preview_image_url: String::new(),
            author_id: 1,
            concept_type: Track::Ml,
            tags: vec!["ml".into()],
            created_at: ts,
            updated_at: ts,
        }
    }

    fn problem(id: i64) -> Problem {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Problem {
            id,
            kind: ProblemKind::Concept,
            title: format!("Problem {}", id),
            slug: format!("problem-{}", id),
            track: Track::Dl,
            author_id: 1,
            description: None,
            editorial: None,
            level: Level::Medium,
            accepted_submissions: 0,
            total_submissions: 0,
            course_id: None,
            course_slug: None,
            tags: vec![],
            created_at: ts,
            updated_at: ts,
        }
    }

    fn day(date: &str, solved: bool, read: bool) -> CalendarDay {
        CalendarDay {
            date: d(date),
            concept: concept(1),
            problem: problem(1),
            progress: DailyProgress {
                solved,
                concept_read: read,
            },
            problem_status: if solved { 3 } else { 0 },
        }
    }

    #[test]
    fn test_monthly_content_percentage() {
        let days = vec![
            day("2025-04-01", true, true),
            day("2025-04-02", true, false),
            day("2025-04-03", true, true),
            day("2025-04-20", true, true), // future
        ];
        let out = monthly_content(2025, 4, days, d("2025-04-10"));
        assert_eq!(out.monthly_content.len(), 3);
        assert!((out.percentage_solved - 2.0 / 30.0 * 100.0).abs() < 1e-9);

        let first = &out.monthly_content["2025-04-01"];
        assert_eq!(first.problem_data.solved, 1);
        assert_eq!(first.problem_data.status, 3);
        assert_eq!(first.concept_data.read, 1);
        let second = &out.monthly_content["2025-04-02"];
        assert_eq!(second.concept_data.read, 0);
    }

    #[test]
    fn test_monthly_content_empty() {
        let out = monthly_content(2025, 4, vec![], d("2025-04-10"));
        assert!(out.monthly_content.is_empty());
        assert_eq!(out.percentage_solved, 0.0);
    }

    #[test]
    fn test_card_wire_shape() {
        let out = monthly_content(2025, 4, vec![day("2025-04-01", false, false)], d("2025-04-30"));
        let json = serde_json::to_value(&out).unwrap();
        let card = &json["monthly_content"]["2025-04-01"];
        assert_eq!(card["problem_data"]["type"], "DL");
        assert_eq!(card["problem_data"]["problem_type"], "concept");
        assert_eq!(card["problem_data"]["level"], "medium");
        assert_eq!(card["concept_data"]["level"], "Easy");
        assert_eq!(card["concept_data"]["type"], "ML");
    }

    fn event(id: i64, problem_id: i64, verdict: Verdict, minute: u32) -> SubmissionEvent {
        SubmissionEvent {
            submission_id: id,
            problem_id,
            problem_title: format!("Problem {}", problem_id),
            verdict,
            created_at: Utc.with_ymd_and_hms(2025, 5, 5, 10, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_latest_per_problem_verdict() {
        let events = vec![
            event(1, 10, Verdict::WrongAnswer, 1),
            event(2, 10, Verdict::WrongAnswer, 2),
            event(3, 10, Verdict::Accepted, 3),
            event(4, 11, Verdict::WrongAnswer, 4),
        ];
        let out = latest_per_problem_verdict(events);
        let ids: Vec<i64> = out.iter().map(|s| s.submission_id).collect();
        assert_eq!(ids, vec![4, 3, 2]);
    }

    #[test]
    fn test_problem_solved_data() {
        let totals = DifficultyCounts {
            easy: 10,
            medium: 5,
            hard: 2,
        };
        let data = ProblemSolvedData::new(vec![Level::Easy, Level::Easy, Level::Hard], totals);
        assert_eq!(data.total_submissions_count, 3);
        assert_eq!(data.easy_problems_submissions_count, 2);
        assert_eq!(data.medium_problems_submissions_count, 0);
        assert_eq!(data.hard_problems_submissions_count, 1);
        assert_eq!(data.difficulty_totals.easy, 10);
    }
}
