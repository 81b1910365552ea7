//! Catalog filters
//!
//! Filters are built from raw query parameters and applied to rows already
//! loaded from the database. Unparseable values are ignored rather than
//! rejected, matching how the listing endpoints have always behaved.

use crate::models::{Concept, Level, Problem, ProblemKind, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Split a comma separated parameter, dropping empty entries.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a timestamp bound. Accepts RFC 3339 or a bare `YYYY-MM-DD`, which
/// means midnight UTC of that day.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
}

fn any_tag(wanted: &[String], have: &[String]) -> bool {
    wanted.iter().any(|t| have.contains(t))
}

// ============================================================================
// PROBLEMS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ProblemFilter {
    /// `None` lists both kinds
    pub kind: Option<ProblemKind>,
    pub levels: Vec<String>,
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub course_slug: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub author: Option<UserId>,
}

impl ProblemFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            kind: non_empty(params, "problem_type").and_then(|s| ProblemKind::parse(s).ok()),
            levels: non_empty(params, "problem_level")
                .map(|s| split_csv(&s.to_lowercase()))
                .unwrap_or_default(),
            search: non_empty(params, "search_query").map(|s| s.to_lowercase()),
            tags: non_empty(params, "tags").map(split_csv).unwrap_or_default(),
            course_slug: non_empty(params, "course_slug").map(str::to_string),
            created_after: non_empty(params, "created_after").and_then(parse_timestamp),
            created_before: non_empty(params, "created_before").and_then(parse_timestamp),
            author: non_empty(params, "author").and_then(|s| s.trim().parse().ok()),
        }
    }

    pub fn matches(&self, problem: &Problem) -> bool {
        if let Some(kind) = self.kind {
            if problem.kind != kind {
                return false;
            }
        }
        if !self.levels.is_empty() && !self.levels.iter().any(|l| l == problem.level.as_str()) {
            return false;
        }
        if let Some(q) = &self.search {
            if !problem.title.to_lowercase().contains(q) {
                return false;
            }
        }
        if !self.tags.is_empty() && !any_tag(&self.tags, &problem.tags) {
            return false;
        }
        if let Some(slug) = &self.course_slug {
            if problem.course_slug.as_deref() != Some(slug.as_str()) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if problem.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if problem.created_at > before {
                return false;
            }
        }
        if let Some(author) = self.author {
            if problem.author_id != author {
                return false;
            }
        }
        true
    }

    /// Keep matching problems, newest first.
    pub fn apply(&self, problems: Vec<Problem>) -> Vec<Problem> {
        let mut out: Vec<Problem> = problems.into_iter().filter(|p| self.matches(p)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DifficultyCounts {
    pub easy: i64,
    pub medium: i64,
    pub hard: i64,
}

impl DifficultyCounts {
    pub fn add(&mut self, level: Level, n: i64) {
        match level {
            Level::Easy => self.easy += n,
            Level::Medium => self.medium += n,
            Level::Hard => self.hard += n,
        }
    }
}

pub fn difficulty_counts<'a, I>(problems: I) -> DifficultyCounts
where
    I: IntoIterator<Item = &'a Problem>,
{
    let mut counts = DifficultyCounts::default();
    for p in problems {
        counts.add(p.level, 1);
    }
    counts
}

// ============================================================================
// CONCEPTS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ConceptFilter {
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Concept ids saved by the caller, when `show_saved_only` applies
    pub saved: Option<HashSet<i64>>,
    /// Concept ids read by the `user_id` parameter's user
    pub read: Option<HashSet<i64>>,
}

impl ConceptFilter {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            tags: non_empty(params, "tags").map(split_csv).unwrap_or_default(),
            search: non_empty(params, "search_query").map(|s| s.to_lowercase()),
            start: non_empty(params, "start_date").and_then(parse_timestamp),
            end: non_empty(params, "end_date").and_then(parse_timestamp),
            saved: None,
            read: None,
        }
    }

    /// Whether the query asks for saved concepts only.
    pub fn wants_saved_only(params: &HashMap<String, String>) -> bool {
        matches!(
            non_empty(params, "show_saved_only").map(|s| s.trim().to_ascii_lowercase()),
            Some(v) if v != "false" && v != "0"
        )
    }

    /// The `user_id` whose read concepts restrict the listing.
    pub fn read_by(params: &HashMap<String, String>) -> Option<UserId> {
        non_empty(params, "user_id").and_then(|s| s.trim().parse().ok())
    }

    pub fn matches(&self, concept: &Concept) -> bool {
        if !self.tags.is_empty() && !any_tag(&self.tags, &concept.tags) {
            return false;
        }
        if let Some(q) = &self.search {
            if !concept.title.to_lowercase().contains(q) {
                return false;
            }
        }
        if let Some(start) = self.start {
            if concept.created_at < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if concept.created_at > end {
                return false;
            }
        }
        if let Some(saved) = &self.saved {
            if !saved.contains(&concept.id) {
                return false;
            }
        }
        if let Some(read) = &self.read {
            if !read.contains(&concept.id) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, concepts: Vec<Concept>) -> Vec<Concept> {
        let mut out: Vec<Concept> = concepts.into_iter().filter(|c| self.matches(c)).collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConceptLevel, Track};
    use chrono::TimeZone;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn problem(id: i64, kind: ProblemKind, title: &str, level: Level, day: u32) -> Problem {
        let ts = Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap();
        Problem {
            id,
            kind,
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            track: Track::Ml,
            author_id: 1,
            description: None,
            editorial: None,
            level,
            accepted_submissions: 0,
            total_submissions: 0,
            course_id: None,
            course_slug: None,
            tags: vec![],
            created_at: ts,
            updated_at: ts,
        }
    }

    fn catalog() -> Vec<Problem> {
        let mut p1 = problem(1, ProblemKind::Concept, "Linear Regression", Level::Easy, 1);
        p1.tags = vec!["regression".into(), "basics".into()];
        p1.course_slug = Some("ml-101".into());
        let mut p2 = problem(2, ProblemKind::Dataset, "Titanic Survival", Level::Medium, 5);
        p2.tags = vec!["classification".into()];
        p2.author_id = 7;
        let p3 = problem(3, ProblemKind::Concept, "Logistic Regression", Level::Hard, 10);
        vec![p1, p2, p3]
    }

    fn ids(problems: &[Problem]) -> Vec<i64> {
        problems.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_no_filters_sorts_newest_first() {
        let out = ProblemFilter::from_params(&HashMap::new()).apply(catalog());
        assert_eq!(ids(&out), vec![3, 2, 1]);
    }

    #[test]
    fn test_kind_and_level_filters() {
        let f = ProblemFilter::from_params(&params(&[("problem_type", "concept")]));
        assert_eq!(ids(&f.apply(catalog())), vec![3, 1]);

        let f = ProblemFilter::from_params(&params(&[("problem_level", "Easy, HARD")]));
        assert_eq!(ids(&f.apply(catalog())), vec![3, 1]);

        // unknown kind lists both
        let f = ProblemFilter::from_params(&params(&[("problem_type", "video")]));
        assert_eq!(f.apply(catalog()).len(), 3);
    }

    #[test]
    fn test_search_tags_course_author() {
        let f = ProblemFilter::from_params(&params(&[("search_query", "REGRESSION")]));
        assert_eq!(ids(&f.apply(catalog())), vec![3, 1]);

        let f = ProblemFilter::from_params(&params(&[("tags", "basics,classification")]));
        assert_eq!(ids(&f.apply(catalog())), vec![2, 1]);

        let f = ProblemFilter::from_params(&params(&[("course_slug", "ml-101")]));
        assert_eq!(ids(&f.apply(catalog())), vec![1]);

        let f = ProblemFilter::from_params(&params(&[("author", "7")]));
        assert_eq!(ids(&f.apply(catalog())), vec![2]);
    }

    #[test]
    fn test_created_bounds() {
        let f = ProblemFilter::from_params(&params(&[
            ("created_after", "2025-03-02"),
            ("created_before", "2025-03-06T00:00:00Z"),
        ]));
        assert_eq!(ids(&f.apply(catalog())), vec![2]);

        // garbage bounds are ignored
        let f = ProblemFilter::from_params(&params(&[("created_after", "yesterday")]));
        assert_eq!(f.apply(catalog()).len(), 3);
    }

    #[test]
    fn test_difficulty_counts() {
        let counts = difficulty_counts(&catalog());
        assert_eq!(
            counts,
            DifficultyCounts {
                easy: 1,
                medium: 1,
                hard: 1
            }
        );
    }

    fn concept(id: i64, title: &str, tags: &[&str], day: u32) -> Concept {
        let ts = Utc.with_ymd_and_hms(2025, 4, day, 8, 0, 0).unwrap();
        Concept {
            id,
            title: title.to_string(),
            slug: title.to_lowercase(),
            description: String::new(),
            one_liner_desc: String::new(),
            level: ConceptLevel::Easy,
            preview_image_url: String::new(),
            author_id: 1,
            concept_type: Track::Ml,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_concept_filter() {
        let concepts = vec![
            concept(1, "Gradient Descent", &["optimization"], 1),
            concept(2, "Attention", &["transformers"], 2),
            concept(3, "Adam", &["optimization"], 3),
        ];

        let f = ConceptFilter::from_params(&params(&[("tags", "optimization")]));
        let out: Vec<i64> = f.apply(concepts.clone()).iter().map(|c| c.id).collect();
        assert_eq!(out, vec![3, 1]);

        let mut f = ConceptFilter::from_params(&params(&[("end_date", "2025-04-02T23:59:59Z")]));
        f.saved = Some([2, 3].into_iter().collect());
        let out: Vec<i64> = f.apply(concepts).iter().map(|c| c.id).collect();
        assert_eq!(out, vec![2]);
    }

    #[test]
    fn test_saved_only_flag() {
        assert!(ConceptFilter::wants_saved_only(&params(&[("show_saved_only", "true")])));
        assert!(!ConceptFilter::wants_saved_only(&params(&[("show_saved_only", "false")])));
        assert!(!ConceptFilter::wants_saved_only(&HashMap::new()));
        assert_eq!(
            ConceptFilter::read_by(&params(&[("user_id", "42")])),
            Some(42)
        );
    }
}
