//! Courses, likes and followers

use anyhow::Result;
use deadpool_postgres::Pool;
use studyhub_core::{Course, UserId};
use tokio_postgres::Row;

const COURSE_SELECT: &str = "SELECT c.id, c.title, c.slug, c.description,
        (SELECT COUNT(*) FROM course_followers f WHERE f.course_id = c.id),
        (SELECT COUNT(*) FROM course_likes l WHERE l.course_id = c.id),
        c.created_at, c.updated_at
     FROM courses c";

fn course_from_row(row: &Row) -> Course {
    Course {
        id: row.get(0),
        title: row.get(1),
        slug: row.get(2),
        description: row.get(3),
        followers_count: row.get(4),
        likes_count: row.get(5),
        created_at: row.get(6),
        updated_at: row.get(7),
    }
}

pub async fn list_courses(pool: &Pool) -> Result<Vec<Course>> {
    let client = pool.get().await?;
    let rows = client
        .query(&format!("{} ORDER BY c.id", COURSE_SELECT), &[])
        .await?;
    Ok(rows.iter().map(course_from_row).collect())
}

pub async fn get_course_by_slug(pool: &Pool, slug: &str) -> Result<Option<Course>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(&format!("{} WHERE c.slug = $1", COURSE_SELECT), &[&slug])
        .await?;
    Ok(row.as_ref().map(course_from_row))
}

pub async fn get_course(pool: &Pool, id: i64) -> Result<Option<Course>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(&format!("{} WHERE c.id = $1", COURSE_SELECT), &[&id])
        .await?;
    Ok(row.as_ref().map(course_from_row))
}

pub async fn course_slugs(pool: &Pool) -> Result<Vec<String>> {
    let client = pool.get().await?;
    let rows = client.query("SELECT slug FROM courses", &[]).await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Insert a course, or update the description of the course with this title.
pub async fn upsert_course(pool: &Pool, title: &str, slug: &str, description: &str) -> Result<i64> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "INSERT INTO courses (title, slug, description) VALUES ($1, $2, $3)
             ON CONFLICT (title)
             DO UPDATE SET description = EXCLUDED.description, updated_at = NOW()
             RETURNING id",
            &[&title, &slug, &description],
        )
        .await?;
    Ok(row.get(0))
}

/// Flip the like state. Returns the new state and the course's like count.
pub async fn toggle_like(pool: &Pool, course_id: i64, user_id: UserId) -> Result<(bool, i64)> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let removed = tx
        .execute(
            "DELETE FROM course_likes WHERE course_id = $1 AND user_id = $2",
            &[&course_id, &user_id],
        )
        .await?;
    let liked = removed == 0;
    if liked {
        tx.execute(
            "INSERT INTO course_likes (course_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            &[&course_id, &user_id],
        )
        .await?;
    }

    let row = tx
        .query_one(
            "SELECT COUNT(*) FROM course_likes WHERE course_id = $1",
            &[&course_id],
        )
        .await?;
    tx.commit().await?;
    Ok((liked, row.get(0)))
}

/// Follow a course. Following twice is a no-op.
pub async fn follow(pool: &Pool, course_id: i64, user_id: UserId) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO course_followers (course_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            &[&course_id, &user_id],
        )
        .await?;
    Ok(())
}
