//! Database schema and migrations

use anyhow::Result;
use deadpool_postgres::Object;
use tracing::info;

pub async fn run_migrations(client: &Object) -> Result<()> {
    client.batch_execute(SCHEMA_SQL).await?;
    info!("Database migrations applied");
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- StudyHub Database Schema

-- ============================================================================
-- ACCOUNTS
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    username VARCHAR(150) NOT NULL UNIQUE,
    email VARCHAR(254) NOT NULL UNIQUE,
    first_name VARCHAR(150) NOT NULL DEFAULT '',
    last_name VARCHAR(150) NOT NULL DEFAULT '',
    -- pbkdf2_sha256$<iterations>$<salt>$<hash>, '!' marks an unusable password
    password_hash TEXT NOT NULL,
    is_staff BOOLEAN NOT NULL DEFAULT FALSE,
    is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_login TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS profiles (
    user_id BIGINT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    phone_number VARCHAR(15),
    organisation_name VARCHAR(255),
    address TEXT,
    language_selected VARCHAR(255) NOT NULL DEFAULT 'eng',
    profile_photo TEXT,
    is_premium_user BOOLEAN NOT NULL DEFAULT FALSE,
    bio TEXT,
    occupation VARCHAR(255),
    kaggle_profile_url VARCHAR(500),
    github VARCHAR(500),
    twitter VARCHAR(500),
    portfolio VARCHAR(500),
    linkedin VARCHAR(500),
    pronouns VARCHAR(50),
    interests TEXT,
    date_of_birth DATE,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_streak_date DATE,
    is_onboarding_complete BOOLEAN NOT NULL DEFAULT FALSE,
    is_email_verified BOOLEAN NOT NULL DEFAULT FALSE
);

-- Issued refresh tokens; a token is live until it expires or is blacklisted
CREATE TABLE IF NOT EXISTS outstanding_tokens (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    jti VARCHAR(64) NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    expires_at TIMESTAMPTZ NOT NULL,
    blacklisted_at TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_outstanding_tokens_user ON outstanding_tokens(user_id, created_at);

-- ============================================================================
-- CONTENT
-- ============================================================================

CREATE TABLE IF NOT EXISTS concepts (
    id BIGSERIAL PRIMARY KEY,
    title VARCHAR(255) NOT NULL,
    slug VARCHAR(255) NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    one_liner_desc VARCHAR(255) NOT NULL DEFAULT '',
    level VARCHAR(16) NOT NULL DEFAULT 'Easy',
    preview_image_url TEXT NOT NULL DEFAULT '',
    author_id BIGINT NOT NULL REFERENCES users(id),
    concept_type VARCHAR(8) NOT NULL DEFAULT 'ML',
    tags TEXT[] NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_concepts_created ON concepts(created_at DESC);

CREATE TABLE IF NOT EXISTS concept_saves (
    concept_id BIGINT NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (concept_id, user_id)
);

CREATE TABLE IF NOT EXISTS concept_reads (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    concept_id BIGINT NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
    read_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, concept_id)
);

CREATE TABLE IF NOT EXISTS courses (
    id BIGSERIAL PRIMARY KEY,
    title VARCHAR(255) NOT NULL UNIQUE,
    slug VARCHAR(255) NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS course_likes (
    course_id BIGINT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (course_id, user_id)
);

CREATE TABLE IF NOT EXISTS course_followers (
    course_id BIGINT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    PRIMARY KEY (course_id, user_id)
);

-- Concept-based and dataset-based problems share one table; kind-specific
-- columns stay NULL for the other kind
CREATE TABLE IF NOT EXISTS problems (
    id BIGSERIAL PRIMARY KEY,
    kind VARCHAR(16) NOT NULL,
    title VARCHAR(255) NOT NULL,
    slug VARCHAR(255) NOT NULL,
    track VARCHAR(8) NOT NULL DEFAULT 'ML',
    author_id BIGINT NOT NULL REFERENCES users(id),
    description TEXT,
    editorial TEXT,
    level VARCHAR(16) NOT NULL DEFAULT 'easy',
    accepted_submissions BIGINT NOT NULL DEFAULT 0,
    total_submissions BIGINT NOT NULL DEFAULT 0,
    course_id BIGINT REFERENCES courses(id) ON DELETE SET NULL,
    tags TEXT[] NOT NULL DEFAULT '{}',
    -- concept problems
    code_editor_template TEXT,
    ideal_solution_code TEXT,
    validation_testcases JSONB,
    submission_testcases JSONB,
    -- dataset problems
    evaluation_metrics JSONB,
    test_data_file_path TEXT,
    data_available_to_user_file_path TEXT,
    ideal_metrics_json_file_path TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (kind, slug)
);

CREATE INDEX IF NOT EXISTS idx_problems_created ON problems(created_at DESC);

-- ============================================================================
-- ACTIVITY
-- ============================================================================

CREATE TABLE IF NOT EXISTS submissions (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    problem_id BIGINT NOT NULL REFERENCES problems(id) ON DELETE CASCADE,
    code TEXT,
    verdict SMALLINT NOT NULL DEFAULT 1,
    time_taken DOUBLE PRECISION,
    memory_taken DOUBLE PRECISION,
    failed_testcase_info JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_submissions_user ON submissions(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_submissions_problem ON submissions(problem_id, user_id);

CREATE TABLE IF NOT EXISTS notes (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    problem_id BIGINT NOT NULL REFERENCES problems(id) ON DELETE CASCADE,
    note TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, problem_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id BIGSERIAL PRIMARY KEY,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    problem_id BIGINT NOT NULL REFERENCES problems(id) ON DELETE CASCADE,
    parent_id BIGINT REFERENCES comments(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_comments_problem ON comments(problem_id, created_at DESC);

-- A user holds at most one reaction per comment
CREATE TABLE IF NOT EXISTS comment_reactions (
    comment_id BIGINT NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    reaction VARCHAR(8) NOT NULL,
    PRIMARY KEY (comment_id, user_id)
);

-- ============================================================================
-- DAILY CALENDAR
-- ============================================================================

CREATE TABLE IF NOT EXISTS daily_content (
    id BIGSERIAL PRIMARY KEY,
    date DATE NOT NULL UNIQUE,
    concept_id BIGINT NOT NULL REFERENCES concepts(id) ON DELETE CASCADE,
    problem_id BIGINT NOT NULL REFERENCES problems(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS daily_progress (
    user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    daily_content_id BIGINT NOT NULL REFERENCES daily_content(id) ON DELETE CASCADE,
    solved BOOLEAN NOT NULL DEFAULT FALSE,
    concept_read BOOLEAN NOT NULL DEFAULT FALSE,
    PRIMARY KEY (user_id, daily_content_id)
);

-- ============================================================================
-- AUDIT
-- ============================================================================

CREATE TABLE IF NOT EXISTS events (
    id BIGSERIAL PRIMARY KEY,
    event_type VARCHAR(64) NOT NULL,
    entity_id VARCHAR(128),
    entity_type VARCHAR(64),
    payload JSONB,
    actor VARCHAR(150),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_events_type ON events(event_type);
CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_events_created ON events(created_at DESC);
"#;
