//! Notes and comments

use anyhow::Result;
use deadpool_postgres::Pool;
use std::collections::HashMap;
use studyhub_core::{Comment, Note, Reaction, UserId};
use tokio_postgres::Row;

// ============================================================================
// NOTES
// ============================================================================

fn note_from_row(row: &Row) -> Note {
    Note {
        id: row.get(0),
        user_id: row.get(1),
        problem_id: row.get(2),
        note: row.get(3),
        created_at: row.get(4),
        updated_at: row.get(5),
    }
}

/// The user's note on a problem, created empty on first access.
pub async fn get_or_create_note(pool: &Pool, user_id: UserId, problem_id: i64) -> Result<Note> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO notes (user_id, problem_id) VALUES ($1, $2)
             ON CONFLICT (user_id, problem_id) DO UPDATE SET user_id = EXCLUDED.user_id
             RETURNING id, user_id, problem_id, note, created_at, updated_at",
            &[&user_id, &problem_id],
        )
        .await?;
    Ok(note_from_row(&row))
}

pub async fn save_note(pool: &Pool, user_id: UserId, problem_id: i64, note: &str) -> Result<Note> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO notes (user_id, problem_id, note) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, problem_id)
             DO UPDATE SET note = EXCLUDED.note, updated_at = NOW()
             RETURNING id, user_id, problem_id, note, created_at, updated_at",
            &[&user_id, &problem_id, &note],
        )
        .await?;
    Ok(note_from_row(&row))
}

/// Note ids keyed by problem id.
pub async fn note_ids(pool: &Pool, user_id: UserId) -> Result<HashMap<i64, i64>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            "SELECT problem_id, id FROM notes WHERE user_id = $1",
            &[&user_id],
        )
        .await?;
    Ok(rows.iter().map(|row| (row.get(0), row.get(1))).collect())
}

pub async fn note_id(pool: &Pool, user_id: UserId, problem_id: i64) -> Result<Option<i64>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            "SELECT id FROM notes WHERE user_id = $1 AND problem_id = $2",
            &[&user_id, &problem_id],
        )
        .await?;
    Ok(row.map(|row| row.get(0)))
}

// ============================================================================
// COMMENTS
// ============================================================================

const COMMENT_SELECT: &str = "SELECT c.id, c.user_id, c.problem_id, c.content, c.parent_id,
        (SELECT COUNT(*) FROM comment_reactions r
         WHERE r.comment_id = c.id AND r.reaction = 'like'),
        (SELECT COUNT(*) FROM comment_reactions r
         WHERE r.comment_id = c.id AND r.reaction = 'dislike'),
        (SELECT r.reaction FROM comment_reactions r WHERE r.comment_id = c.id AND r.user_id = $1),
        c.created_at, c.updated_at
     FROM comments c";

fn comment_from_row(row: &Row) -> Result<Comment> {
    let reaction: Option<&str> = row.get(7);
    Ok(Comment {
        id: row.get(0),
        user_id: row.get(1),
        problem_id: row.get(2),
        content: row.get(3),
        parent_id: row.get(4),
        like_count: row.get(5),
        dislike_count: row.get(6),
        viewer_reaction: reaction.map(Reaction::parse).transpose()?,
        created_at: row.get(8),
        updated_at: row.get(9),
    })
}

/// Every comment on a problem, oldest first, with `viewer`'s reactions.
pub async fn list_comments(pool: &Pool, problem_id: i64, viewer: UserId) -> Result<Vec<Comment>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "{} WHERE c.problem_id = $2 ORDER BY c.created_at ASC, c.id ASC",
                COMMENT_SELECT
            ),
            &[&viewer, &problem_id],
        )
        .await?;
    rows.iter().map(comment_from_row).collect()
}

pub async fn get_comment(pool: &Pool, id: i64, viewer: UserId) -> Result<Option<Comment>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(&format!("{} WHERE c.id = $2", COMMENT_SELECT), &[&viewer, &id])
        .await?;
    row.as_ref().map(comment_from_row).transpose()
}

pub async fn insert_comment(
    pool: &Pool,
    user_id: UserId,
    problem_id: i64,
    content: &str,
    parent_id: Option<i64>,
) -> Result<i64> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO comments (user_id, problem_id, content, parent_id)
             VALUES ($1, $2, $3, $4) RETURNING id",
            &[&user_id, &problem_id, &content, &parent_id],
        )
        .await?;
    Ok(row.get(0))
}

/// Set the user's reaction, replacing the opposite one.
pub async fn set_reaction(
    pool: &Pool,
    comment_id: i64,
    user_id: UserId,
    reaction: Reaction,
) -> Result<()> {
    let value = match reaction {
        Reaction::Like => "like",
        Reaction::Dislike => "dislike",
    };
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO comment_reactions (comment_id, user_id, reaction) VALUES ($1, $2, $3)
             ON CONFLICT (comment_id, user_id) DO UPDATE SET reaction = EXCLUDED.reaction",
            &[&comment_id, &user_id, &value],
        )
        .await?;
    Ok(())
}
