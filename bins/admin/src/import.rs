//! Content import from a JSON document
//!
//! ```json
//! {
//!   "courses":  [{"title": "...", "description": "..."}],
//!   "concepts": [{"title": "...", "level": "Easy", "concept_type": "ML", "tags": ["..."]}],
//!   "problems": [{"kind": "concept", "title": "...", "level": "easy", "track": "ML",
//!                 "course": "<course title>", "submission_testcases": [...], ...}]
//! }
//! ```
//!
//! Slugs are generated from titles. Courses are matched by title and
//! updated in place; concepts and problems are always inserted.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use studyhub_core::slug::{slug_for_title, unique_slug, MAX_SLUG_RETRIES};
use studyhub_core::{ConceptLevel, Level, ProblemDetails, Track, UserId};
use studyhub_server::db::queries::{self, concepts, courses, problems};
use studyhub_server::DbPool;
use tracing::{debug, warn};

#[derive(Debug, Deserialize, Default)]
pub struct ContentFile {
    #[serde(default)]
    pub courses: Vec<ImportCourse>,
    #[serde(default)]
    pub concepts: Vec<ImportConcept>,
    #[serde(default)]
    pub problems: Vec<ImportProblem>,
}

#[derive(Debug, Deserialize)]
pub struct ImportCourse {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportConcept {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub one_liner_desc: String,
    pub level: String,
    #[serde(default)]
    pub preview_image_url: String,
    pub concept_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportProblem {
    pub title: String,
    pub track: String,
    pub level: String,
    pub description: Option<String>,
    pub editorial: Option<String>,
    /// Course title
    pub course: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub details: ProblemDetails,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub courses: usize,
    pub concepts: usize,
    pub problems: usize,
}

pub fn load(path: &Path) -> Result<ContentFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&raw)
}

pub fn parse(raw: &str) -> Result<ContentFile> {
    let content: ContentFile = serde_json::from_str(raw).context("Invalid content file")?;
    validate(&content)?;
    Ok(content)
}

/// Check every enum-like field up front so a bad entry aborts before
/// anything is written.
fn validate(content: &ContentFile) -> Result<()> {
    for c in &content.concepts {
        ConceptLevel::parse(&c.level).with_context(|| format!("concept {:?}", c.title))?;
        Track::parse(&c.concept_type).with_context(|| format!("concept {:?}", c.title))?;
    }
    let course_titles: Vec<&str> = content.courses.iter().map(|c| c.title.as_str()).collect();
    for p in &content.problems {
        Level::parse(&p.level).with_context(|| format!("problem {:?}", p.title))?;
        Track::parse(&p.track).with_context(|| format!("problem {:?}", p.title))?;
        if let Some(course) = &p.course {
            if !course_titles.contains(&course.as_str()) {
                bail!("problem {:?} references unknown course {:?}", p.title, course);
            }
        }
    }
    Ok(())
}

/// Insert with a fresh slug, retrying when a concurrent writer takes the
/// same slug between the lookup and the insert.
async fn insert_with_slug<T, S, SFut, I, IFut>(title: &str, slugs: S, insert: I) -> Result<T>
where
    S: Fn() -> SFut,
    SFut: Future<Output = Result<Vec<String>>>,
    I: Fn(String) -> IFut,
    IFut: Future<Output = Result<T>>,
{
    let base = slug_for_title(title);
    for attempt in 1..=MAX_SLUG_RETRIES {
        let taken = slugs().await?;
        let slug = unique_slug(&base, taken.iter().map(String::as_str));
        match insert(slug.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if queries::is_unique_violation(&e) => {
                warn!("Slug {} taken on attempt {}, retrying", slug, attempt);
            }
            Err(e) => return Err(e),
        }
    }
    Err(anyhow!("No free slug for {:?} after {} attempts", title, MAX_SLUG_RETRIES))
}

pub async fn run(pool: &DbPool, content: &ContentFile, author_id: UserId) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    let mut course_ids: HashMap<&str, i64> = HashMap::new();
    for course in &content.courses {
        let id = insert_with_slug(
            &course.title,
            || courses::course_slugs(pool),
            |slug| async move {
                courses::upsert_course(pool, &course.title, &slug, &course.description).await
            },
        )
        .await?;
        debug!("Course {} -> {}", course.title, id);
        course_ids.insert(course.title.as_str(), id);
        summary.courses += 1;
    }

    for concept in &content.concepts {
        let new = concepts::NewConcept {
            title: concept.title.clone(),
            slug: String::new(),
            description: concept.description.clone(),
            one_liner_desc: concept.one_liner_desc.clone(),
            level: ConceptLevel::parse(&concept.level)?,
            preview_image_url: concept.preview_image_url.clone(),
            author_id,
            concept_type: Track::parse(&concept.concept_type)?,
            tags: concept.tags.clone(),
        };
        let inserted = insert_with_slug(
            &new.title,
            || concepts::concept_slugs(pool),
            |slug| {
                let new = concepts::NewConcept { slug, ..new.clone() };
                async move { concepts::insert_concept(pool, &new).await }
            },
        )
        .await?;
        debug!("Concept {} -> {}", inserted.slug, inserted.id);
        summary.concepts += 1;
    }

    for problem in &content.problems {
        let new = problems::NewProblem {
            title: problem.title.clone(),
            slug: String::new(),
            track: Track::parse(&problem.track)?,
            author_id,
            description: problem.description.clone(),
            editorial: problem.editorial.clone(),
            level: Level::parse(&problem.level)?,
            course_id: problem
                .course
                .as_deref()
                .and_then(|title| course_ids.get(title).copied()),
            tags: problem.tags.clone(),
            details: problem.details.clone(),
        };
        let kind = new.kind();
        let id = insert_with_slug(
            &new.title,
            || problems::problem_slugs(pool, kind),
            |slug| {
                let new = problems::NewProblem { slug, ..new.clone() };
                async move { problems::insert_problem(pool, &new).await }
            },
        )
        .await?;
        debug!("Problem {} -> {}", new.title, id);
        summary.problems += 1;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "courses": [{"title": "Machine Learning 101", "description": "Basics"}],
        "concepts": [{
            "title": "Linear Regression",
            "level": "Easy",
            "concept_type": "ML",
            "tags": ["regression"]
        }],
        "problems": [
            {
                "kind": "concept",
                "title": "Fit a Line",
                "track": "ML",
                "level": "easy",
                "course": "Machine Learning 101",
                "validation_testcases": ["1 2"],
                "submission_testcases": [{"input": "1 2", "output": "3"}]
            },
            {
                "kind": "dataset",
                "title": "House Prices",
                "track": "ML",
                "level": "hard",
                "evaluation_metrics": {"rmse": 0.1},
                "data_available_to_user_file_path": "data/train.csv"
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let content = parse(SAMPLE).unwrap();
        assert_eq!(content.courses.len(), 1);
        assert_eq!(content.concepts[0].tags, vec!["regression"]);
        match &content.problems[0].details {
            ProblemDetails::Concept(d) => {
                assert_eq!(d.submission_testcases[0].output, "3");
                assert!(d.ideal_solution_code.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            content.problems[1].details,
            ProblemDetails::Dataset(_)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let content = load(file.path()).unwrap();
        assert_eq!(content.problems.len(), 2);
        assert!(load(Path::new("/nonexistent/content.json")).is_err());
    }

    #[test]
    fn test_rejects_bad_entries() {
        let bad_level = SAMPLE.replace("\"level\": \"hard\"", "\"level\": \"extreme\"");
        assert!(parse(&bad_level).is_err());

        let bad_course = SAMPLE.replace(
            "\"course\": \"Machine Learning 101\"",
            "\"course\": \"Nope\"",
        );
        let err = parse(&bad_course).unwrap_err().to_string();
        assert!(err.contains("unknown course"));
    }

    #[tokio::test]
    async fn test_insert_with_slug_retries_unique_violations() {
        let calls = Cell::new(0);
        let result = insert_with_slug(
            "Intro",
            || async { Ok(vec!["intro".to_string()]) },
            |slug| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, anyhow::Error>(slug) }
            },
        )
        .await
        .unwrap();
        assert_eq!(result, "intro-2");
        assert_eq!(calls.get(), 1);

        let err = insert_with_slug(
            "Intro",
            || async { Ok(Vec::new()) },
            |_slug| async { Err::<String, _>(anyhow!("boom")) },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
