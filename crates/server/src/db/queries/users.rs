//! Users and profiles

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use deadpool_postgres::Pool;
use studyhub_core::streak::Streak;
use studyhub_core::{Profile, User, UserId};
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
     is_staff, is_superuser, is_active, date_joined, last_login";

const PROFILE_COLUMNS: &str = "user_id, phone_number, organisation_name, address, \
     language_selected, profile_photo, is_premium_user, bio, occupation, kaggle_profile_url, \
     github, twitter, portfolio, linkedin, pronouns, interests, date_of_birth, current_streak, \
     longest_streak, last_streak_date, is_onboarding_complete, is_email_verified";

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get(0),
        username: row.get(1),
        email: row.get(2),
        first_name: row.get(3),
        last_name: row.get(4),
        password_hash: row.get(5),
        is_staff: row.get(6),
        is_superuser: row.get(7),
        is_active: row.get(8),
        date_joined: row.get(9),
        last_login: row.get(10),
    }
}

fn profile_from_row(row: &Row) -> Profile {
    Profile {
        user_id: row.get(0),
        phone_number: row.get(1),
        organisation_name: row.get(2),
        address: row.get(3),
        language_selected: row.get(4),
        profile_photo: row.get(5),
        is_premium_user: row.get(6),
        bio: row.get(7),
        occupation: row.get(8),
        kaggle_profile_url: row.get(9),
        github: row.get(10),
        twitter: row.get(11),
        portfolio: row.get(12),
        linkedin: row.get(13),
        pronouns: row.get(14),
        interests: row.get(15),
        date_of_birth: row.get(16),
        current_streak: row.get(17),
        longest_streak: row.get(18),
        last_streak_date: row.get(19),
        is_onboarding_complete: row.get(20),
        is_email_verified: row.get(21),
    }
}

// ============================================================================
// USERS
// ============================================================================

pub async fn get_user_by_id(pool: &Pool, id: UserId) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS),
            &[&id],
        )
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

pub async fn get_user_by_email(pool: &Pool, email: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS),
            &[&email],
        )
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

pub async fn get_user_by_username(pool: &Pool, username: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS),
            &[&username],
        )
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

pub async fn email_exists(pool: &Pool, email: &str) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT 1 FROM users WHERE email = $1", &[&email])
        .await?;
    Ok(row.is_some())
}

pub async fn username_exists(pool: &Pool, username: &str) -> Result<bool> {
    let client = pool.get().await?;
    let row = client
        .query_opt("SELECT 1 FROM users WHERE username = $1", &[&username])
        .await?;
    Ok(row.is_some())
}

/// Usernames equal to `base` or starting with it, for suffix allocation.
pub async fn usernames_like(pool: &Pool, base: &str) -> Result<Vec<String>> {
    let client = pool.get().await?;
    let escaped = base
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("{}%", escaped);
    let rows = client
        .query(
            "SELECT username FROM users WHERE username LIKE $1",
            &[&pattern],
        )
        .await?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

pub async fn list_users(pool: &Pool) -> Result<Vec<User>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS),
            &[],
        )
        .await?;
    Ok(rows.iter().map(user_from_row).collect())
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub phone_number: Option<String>,
}

/// Insert a user together with their empty profile.
pub async fn create_user(pool: &Pool, new: &NewUser) -> Result<User> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let row = tx
        .query_one(
            &format!(
                "INSERT INTO users (username, email, first_name, last_name, password_hash, is_staff, is_superuser)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {}",
                USER_COLUMNS
            ),
            &[
                &new.username,
                &new.email,
                &new.first_name,
                &new.last_name,
                &new.password_hash,
                &new.is_staff,
                &new.is_superuser,
            ],
        )
        .await?;
    let user = user_from_row(&row);

    tx.execute(
        "INSERT INTO profiles (user_id, phone_number) VALUES ($1, $2)",
        &[&user.id, &new.phone_number],
    )
    .await?;

    tx.commit().await?;
    Ok(user)
}

pub async fn update_last_login(pool: &Pool, id: UserId) -> Result<DateTime<Utc>> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            "UPDATE users SET last_login = NOW() WHERE id = $1 RETURNING last_login",
            &[&id],
        )
        .await?;
    Ok(row.get(0))
}

pub async fn set_password(pool: &Pool, id: UserId, password_hash: &str) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE users SET password_hash = $2 WHERE id = $1",
            &[&id, &password_hash],
        )
        .await?;
    Ok(())
}

pub async fn update_names(
    pool: &Pool,
    id: UserId,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE users SET first_name = COALESCE($2, first_name),
                              last_name = COALESCE($3, last_name)
             WHERE id = $1",
            &[&id, &first_name, &last_name],
        )
        .await?;
    Ok(())
}

// ============================================================================
// PROFILES
// ============================================================================

/// Load a profile, creating an empty one for users that predate profiles.
pub async fn get_profile(pool: &Pool, user_id: UserId) -> Result<Profile> {
    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
            &[&user_id],
        )
        .await?;
    let row = client
        .query_one(
            &format!("SELECT {} FROM profiles WHERE user_id = $1", PROFILE_COLUMNS),
            &[&user_id],
        )
        .await?;
    Ok(profile_from_row(&row))
}

/// Partial profile update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub phone_number: Option<String>,
    pub organisation_name: Option<String>,
    pub address: Option<String>,
    pub language_selected: Option<String>,
    pub profile_photo: Option<String>,
    pub bio: Option<String>,
    pub occupation: Option<String>,
    pub kaggle_profile_url: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub portfolio: Option<String>,
    pub linkedin: Option<String>,
    pub pronouns: Option<String>,
    pub interests: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_onboarding_complete: Option<bool>,
}

impl ProfileUpdate {
    fn assignments(&self) -> Vec<(&'static str, &(dyn ToSql + Sync))> {
        let mut out: Vec<(&'static str, &(dyn ToSql + Sync))> = Vec::new();
        let text_fields: [(&'static str, &Option<String>); 14] = [
            ("phone_number", &self.phone_number),
            ("organisation_name", &self.organisation_name),
            ("address", &self.address),
            ("language_selected", &self.language_selected),
            ("profile_photo", &self.profile_photo),
            ("bio", &self.bio),
            ("occupation", &self.occupation),
            ("kaggle_profile_url", &self.kaggle_profile_url),
            ("github", &self.github),
            ("twitter", &self.twitter),
            ("portfolio", &self.portfolio),
            ("linkedin", &self.linkedin),
            ("pronouns", &self.pronouns),
            ("interests", &self.interests),
        ];
        for (column, value) in text_fields {
            if let Some(v) = value {
                out.push((column, v));
            }
        }
        if let Some(v) = &self.date_of_birth {
            out.push(("date_of_birth", v));
        }
        if let Some(v) = &self.is_onboarding_complete {
            out.push(("is_onboarding_complete", v));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.assignments().is_empty()
    }
}

pub async fn update_profile(pool: &Pool, user_id: UserId, update: &ProfileUpdate) -> Result<()> {
    let assignments = update.assignments();
    if assignments.is_empty() {
        return Ok(());
    }

    let mut params: Vec<&(dyn ToSql + Sync)> = vec![&user_id];
    let mut sets = Vec::with_capacity(assignments.len());
    for (column, value) in assignments {
        params.push(value);
        sets.push(format!("{} = ${}", column, params.len()));
    }

    let client = pool.get().await?;
    client
        .execute(
            "INSERT INTO profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING",
            &[&user_id],
        )
        .await?;
    client
        .execute(
            &format!("UPDATE profiles SET {} WHERE user_id = $1", sets.join(", ")),
            &params,
        )
        .await?;
    Ok(())
}

pub async fn save_streak(pool: &Pool, user_id: UserId, streak: &Streak) -> Result<()> {
    let client = pool.get().await?;
    client
        .execute(
            "UPDATE profiles SET current_streak = $2, longest_streak = $3, last_streak_date = $4
             WHERE user_id = $1",
            &[&user_id, &streak.current, &streak.longest, &streak.last_day],
        )
        .await?;
    Ok(())
}
