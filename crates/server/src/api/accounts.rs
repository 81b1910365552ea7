//! Account API handlers: registration, sessions, password reset, profile

use super::error::{ApiError, ApiResult};
use super::{is_valid_email, ApiJson, FieldErrors};
use crate::auth::google::{download_profile_photo, verify_google_token, verify_recaptcha};
use crate::auth::password::{
    hash_password_blocking, verify_password_blocking, UNUSABLE_PASSWORD,
};
use crate::auth::{AuthUser, TokenPair, TokenType};
use crate::daily::current_streak;
use crate::db::queries::{daily, is_unique_violation, tokens, users};
use crate::mail::password_reset_email;
use crate::media;
use crate::observability::{AuditEntry, AuditEventType, AuditLogger};
use crate::state::AppState;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use studyhub_core::{Profile, User};
use tracing::{info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;
const DATE_FORMAT_ERROR: &str =
    "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

// ============================================================================
// HELPERS
// ============================================================================

/// `base`, then `base1`, `base2`, ... until one is free.
pub fn next_free_username(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    (1u64..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| format!("{}{}", base, Uuid::new_v4().simple()))
}

fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

async fn free_username(state: &AppState, base: &str) -> ApiResult<String> {
    let taken: HashSet<String> = users::usernames_like(&state.db, base)
        .await?
        .into_iter()
        .collect();
    Ok(next_free_username(base, &taken))
}

/// Issue a token pair, revoking the oldest sessions past the session cap.
async fn issue_session(state: &AppState, user: &User) -> ApiResult<TokenPair> {
    let active = tokens::active_token_ids(&state.db, user.id).await?;
    let cap = state.config.max_sessions.max(1);
    if active.len() >= cap {
        let excess = active.len() + 1 - cap;
        for jti in active.iter().take(excess) {
            tokens::blacklist_token(&state.db, jti).await?;
        }
        info!(user_id = user.id, revoked = excess, "Session cap reached, revoked oldest");
    }

    let (pair, refresh) = state.jwt.issue_pair(user.id)?;
    tokens::record_refresh_token(&state.db, user.id, &refresh.jti, refresh.expires_at()).await?;
    users::update_last_login(&state.db, user.id).await?;
    Ok(pair)
}

fn photo_url(state: &AppState, profile: &Profile) -> String {
    profile
        .profile_photo
        .as_deref()
        .filter(|p| !p.is_empty())
        .map(|p| state.config.media_url(p))
        .unwrap_or_default()
}

fn parse_date_field(
    errors: &mut FieldErrors,
    field: &str,
    raw: &Option<String>,
) -> Option<NaiveDate> {
    let raw = raw.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            errors.add(field, DATE_FORMAT_ERROR);
            None
        }
    }
}

// ============================================================================
// REGISTRATION & SESSIONS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut errors = FieldErrors::default();
    let email = errors.require("email", &req.email).to_lowercase();
    let password = errors.require("password", &req.password).to_string();
    let first_name = errors.require("first_name", &req.first_name).to_string();
    let last_name = errors.require("last_name", &req.last_name).to_string();
    let requested_username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);

    if !email.is_empty() {
        if !is_valid_email(&email) {
            errors.add("email", "Enter a valid email address.");
        } else if users::email_exists(&state.db, &email).await? {
            errors.add("email", "User with this email already exists");
        }
    }
    if let Some(ref username) = requested_username {
        if users::username_exists(&state.db, username).await? {
            errors.add("username", "User with this username already exists");
        }
    }
    errors.finish()?;

    let username = match requested_username {
        Some(u) => u,
        None => free_username(&state, email_local_part(&email)).await?,
    };

    let password_hash =
        hash_password_blocking(password, state.config.password_iterations).await?;
    let new_user = users::NewUser {
        username,
        email,
        first_name,
        last_name,
        password_hash,
        phone_number: req.phone_number.filter(|p| !p.trim().is_empty()),
        ..Default::default()
    };

    let user = match users::create_user(&state.db, &new_user).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::field(
                "email",
                "User with this email already exists",
            ))
        }
        Err(e) => return Err(e.into()),
    };

    AuditLogger::account(&state, AuditEventType::Registration, user.id, &user.username).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "captchaToken")]
    pub captcha_token: Option<String>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenPair>> {
    let email = req.email.as_deref().unwrap_or("").trim().to_lowercase();

    if let Err(v) = state.rules.check_login(&email) {
        AuditLogger::security(&state, AuditEventType::RateLimitExceeded, &email, "login").await;
        return Err(v.into());
    }

    let captcha_ok = match req.captcha_token.as_deref() {
        None | Some("") if !state.config.recaptcha_secret.is_empty() => false,
        token => verify_recaptcha(
            &state.http,
            &state.config.recaptcha_secret,
            token.unwrap_or(""),
        )
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "reCAPTCHA verification request failed");
            false
        }),
    };
    if !captcha_ok {
        return Err(ApiError::bad_request("Invalid CAPTCHA"));
    }

    let Some(user) = users::get_user_by_email(&state.db, &email).await? else {
        AuditLogger::login(&state, &email, Some("unknown email")).await;
        return Err(ApiError::Body(
            StatusCode::BAD_REQUEST,
            json!(["User with this email does not exist"]),
        ));
    };

    let password = req.password.unwrap_or_default();
    let valid = verify_password_blocking(password, user.password_hash.clone()).await?;
    if !valid || !user.is_active {
        AuditLogger::login(&state, &email, Some("invalid credentials")).await;
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    let pair = issue_session(&state, &user).await?;
    AuditLogger::login(&state, &email, None).await;
    Ok(Json(pair))
}

#[derive(Debug, Deserialize)]
pub struct GoogleAuthRequest {
    pub token: Option<String>,
}

pub async fn google_auth(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GoogleAuthRequest>,
) -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::default();
    let token = errors.require("token", &req.token).to_string();
    errors.finish()?;

    let identity =
        verify_google_token(&state.http, &state.config.google_client_id, &token).await?;
    let email = identity.email.trim().to_lowercase();

    let (user, is_new_user) = match users::get_user_by_email(&state.db, &email).await? {
        Some(user) => (user, false),
        None => {
            let username = free_username(&state, email_local_part(&email)).await?;
            let user = users::create_user(
                &state.db,
                &users::NewUser {
                    username,
                    email: email.clone(),
                    first_name: identity.given_name.clone(),
                    last_name: identity.family_name.clone(),
                    password_hash: UNUSABLE_PASSWORD.to_string(),
                    ..Default::default()
                },
            )
            .await?;
            (user, true)
        }
    };

    if let Some(picture) = identity.picture.as_deref().filter(|p| !p.is_empty()) {
        let profile = users::get_profile(&state.db, user.id).await?;
        if is_new_user || profile.profile_photo.is_none() {
            match download_profile_photo(&state.http, picture, &state.config.media_root, user.id)
                .await
            {
                Ok(path) => {
                    let update = users::ProfileUpdate {
                        profile_photo: Some(path),
                        ..Default::default()
                    };
                    users::update_profile(&state.db, user.id, &update).await?;
                }
                Err(e) => warn!(
                    user_id = user.id,
                    error = %e,
                    "Failed to download Google profile photo"
                ),
            }
        }
    }

    let pair = issue_session(&state, &user).await?;
    AuditLogger::account(&state, AuditEventType::GoogleSignIn, user.id, &user.username).await;

    Ok(Json(json!({
        "refresh": pair.refresh,
        "access": pair.access,
        "message": "User authenticated successfully.",
        "is_new_user": is_new_user,
    })))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

pub async fn generate_access_token(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::default();
    let refresh = errors.require("refresh", &req.refresh).to_string();
    errors.finish()?;

    let invalid = || {
        ApiError::Detail(
            StatusCode::UNAUTHORIZED,
            "Token is invalid or expired".into(),
        )
    };
    let claims = state
        .jwt
        .decode(&refresh, TokenType::Refresh)
        .map_err(|_| invalid())?;
    if !tokens::is_token_usable(&state.db, &claims.jti).await? {
        return Err(ApiError::Detail(
            StatusCode::UNAUTHORIZED,
            "Token is blacklisted".into(),
        ));
    }
    let user = users::get_user_by_id(&state.db, claims.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(invalid)?;

    let (access, _) = state.jwt.issue(user.id, TokenType::Access)?;
    Ok(Json(json!({ "access": access })))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::default();
    let refresh = errors.require("refresh", &req.refresh).to_string();
    errors.finish()?;

    let claims = match state.jwt.decode(&refresh, TokenType::Refresh) {
        Ok(c) if c.user_id == user.id => c,
        _ => return Err(ApiError::bad_request("Invalid token")),
    };
    if !tokens::blacklist_token(&state.db, &claims.jti).await? {
        return Err(ApiError::bad_request("Invalid token"));
    }

    AuditLogger::account(&state, AuditEventType::Logout, user.id, &user.username).await;
    Ok(Json(json!({ "message": "Successfully logged out" })))
}

// ============================================================================
// PASSWORD RESET
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::default();
    let email = errors.require("email", &req.email).to_lowercase();
    errors.finish()?;
    if !is_valid_email(&email) {
        return Err(ApiError::field("email", "Enter a valid email address."));
    }

    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::field("email", "User with this email does not exist"))?;

    let token = state.reset_tokens.make_token(&user);
    let mail = password_reset_email(
        &state.config.support_email,
        &user.email,
        &state.config.reset_link(&token),
    );
    state.mailer.send(&mail).await?;

    AuditLogger::account(
        &state,
        AuditEventType::PasswordResetRequested,
        user.id,
        &user.email,
    )
    .await;
    Ok(Json(json!({ "message": "Password reset email sent" })))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub token: Option<String>,
    pub new_password: Option<String>,
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::default();
    let email = errors.require("email", &req.email).to_lowercase();
    let token = errors.require("token", &req.token).to_string();
    let new_password = errors.require("new_password", &req.new_password).to_string();
    if !new_password.is_empty() && new_password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "new_password",
            format!("Ensure this field has at least {} characters.", MIN_PASSWORD_LEN),
        );
    }
    errors.finish()?;

    let user = users::get_user_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::field("email", "Invalid email"))?;
    if !state.reset_tokens.check_token(&user, &token) {
        AuditLogger::log(
            &state,
            AuditEntry::new(AuditEventType::PasswordResetCompleted)
                .entity("user", &user.id.to_string())
                .actor(&user.email)
                .failed("invalid or expired token"),
        )
        .await;
        return Err(ApiError::field("token", "Invalid or expired token"));
    }

    let hash = hash_password_blocking(new_password, state.config.password_iterations).await?;
    users::set_password(&state.db, user.id, &hash).await?;

    AuditLogger::account(
        &state,
        AuditEventType::PasswordResetCompleted,
        user.id,
        &user.email,
    )
    .await;
    Ok(Json(json!({ "message": "Password reset successful" })))
}

// ============================================================================
// PROFILE
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub organisation_name: Option<String>,
    pub address: Option<String>,
    pub language_selected: Option<String>,
    pub occupation: Option<String>,
    pub pronouns: Option<String>,
    pub date_of_birth: Option<String>,
}

pub async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<OnboardingRequest>,
) -> ApiResult<Json<Value>> {
    let mut errors = FieldErrors::default();
    let date_of_birth = parse_date_field(&mut errors, "date_of_birth", &req.date_of_birth);
    errors.finish()?;

    let update = users::ProfileUpdate {
        organisation_name: req.organisation_name,
        address: req.address,
        language_selected: req.language_selected.filter(|l| !l.trim().is_empty()),
        occupation: req.occupation,
        pronouns: req.pronouns,
        date_of_birth,
        is_onboarding_complete: Some(true),
        ..Default::default()
    };
    users::update_profile(&state.db, user.id, &update).await?;

    Ok(Json(json!({ "message": "Onboarding completed successfully" })))
}

pub async fn user_detail(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let profile = users::get_profile(&state.db, user.id).await?;
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    Ok(Json(json!({
        "user": {
            "username": user.username,
            "first_name": user.first_name,
            "last_name": user.last_name,
            "email": user.email,
            "phone_number": text(&profile.phone_number),
            "organisation_name": text(&profile.organisation_name),
            "address": text(&profile.address),
            "language_selected": profile.language_selected,
            "profile_photo_url": photo_url(&state, &profile),
            "is_premium_user": profile.is_premium_user,
            "bio": text(&profile.bio),
            "occupation": text(&profile.occupation),
            "kaggle_profile_url": text(&profile.kaggle_profile_url),
            "github": text(&profile.github),
            "twitter": text(&profile.twitter),
            "portfolio": text(&profile.portfolio),
            "linkedin": text(&profile.linkedin),
            "pronouns": text(&profile.pronouns),
            "interests": text(&profile.interests),
            "date_of_birth": profile
                .date_of_birth
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            "current_streak": current_streak(&profile, state.today()),
            "longest_streak": profile.longest_streak,
            "location": text(&profile.address),
        }
    })))
}

/// Fields accepted by the profile update, as JSON or multipart form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub organisation_name: Option<String>,
    pub address: Option<String>,
    pub language_selected: Option<String>,
    pub bio: Option<String>,
    pub occupation: Option<String>,
    pub kaggle_profile_url: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
    pub portfolio: Option<String>,
    pub linkedin: Option<String>,
    pub pronouns: Option<String>,
    pub interests: Option<String>,
    pub date_of_birth: Option<String>,
    #[serde(skip)]
    pub photo: Option<UploadedPhoto>,
}

#[derive(Debug)]
pub struct UploadedPhoto {
    pub extension: &'static str,
    pub bytes: Vec<u8>,
}

pub struct ValidatedProfile {
    pub update: users::ProfileUpdate,
    pub photo: Option<UploadedPhoto>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

const URL_FIELDS: [&str; 5] = ["kaggle_profile_url", "github", "twitter", "portfolio", "linkedin"];

impl ProfileForm {
    fn set_text(&mut self, name: &str, value: String) {
        let slot = match name {
            "first_name" => &mut self.first_name,
            "last_name" => &mut self.last_name,
            "phone_number" => &mut self.phone_number,
            "organisation_name" => &mut self.organisation_name,
            "address" => &mut self.address,
            "language_selected" => &mut self.language_selected,
            "bio" => &mut self.bio,
            "occupation" => &mut self.occupation,
            "kaggle_profile_url" => &mut self.kaggle_profile_url,
            "github" => &mut self.github,
            "twitter" => &mut self.twitter,
            "portfolio" => &mut self.portfolio,
            "linkedin" => &mut self.linkedin,
            "pronouns" => &mut self.pronouns,
            "interests" => &mut self.interests,
            "date_of_birth" => &mut self.date_of_birth,
            _ => return,
        };
        *slot = Some(value);
    }

    async fn from_multipart(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = ProfileForm::default();
        let mut errors = FieldErrors::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "profile_photo" {
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                if bytes.is_empty() {
                    continue;
                }
                if bytes.len() > media::MAX_PHOTO_BYTES {
                    errors.add("profile_photo", "Profile photo size should not exceed 2MB.");
                    continue;
                }
                match media::photo_extension(&content_type) {
                    Some(extension) => {
                        form.photo = Some(UploadedPhoto {
                            extension,
                            bytes: bytes.to_vec(),
                        })
                    }
                    None => errors.add(
                        "profile_photo",
                        "Only JPEG, PNG, and GIF images are allowed.",
                    ),
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                form.set_text(&name, value);
            }
        }
        errors.finish()?;
        Ok(form)
    }

    fn url_value(&self, field: &str) -> Option<&str> {
        match field {
            "kaggle_profile_url" => self.kaggle_profile_url.as_deref(),
            "github" => self.github.as_deref(),
            "twitter" => self.twitter.as_deref(),
            "portfolio" => self.portfolio.as_deref(),
            "linkedin" => self.linkedin.as_deref(),
            _ => None,
        }
    }

    /// Validate and convert into a profile update. The photo path is filled
    /// in by the caller once the file is stored.
    pub fn into_update(self) -> ApiResult<ValidatedProfile> {
        let mut errors = FieldErrors::default();
        for field in URL_FIELDS {
            if let Some(v) = self.url_value(field).map(str::trim).filter(|v| !v.is_empty()) {
                if url::Url::parse(v).is_err() {
                    errors.add(field, "Enter a valid URL.");
                }
            }
        }
        let date_of_birth = parse_date_field(&mut errors, "date_of_birth", &self.date_of_birth);
        errors.finish()?;

        let update = users::ProfileUpdate {
            phone_number: self.phone_number,
            organisation_name: self.organisation_name,
            address: self.address,
            language_selected: self.language_selected.filter(|l| !l.trim().is_empty()),
            bio: self.bio,
            occupation: self.occupation,
            kaggle_profile_url: self.kaggle_profile_url,
            github: self.github,
            twitter: self.twitter,
            portfolio: self.portfolio,
            linkedin: self.linkedin,
            pronouns: self.pronouns,
            interests: self.interests,
            date_of_birth,
            ..Default::default()
        };
        Ok(ValidatedProfile {
            update,
            photo: self.photo,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}

pub async fn user_detail_update(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    request: Request,
) -> ApiResult<Json<Value>> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let form = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        ProfileForm::from_multipart(multipart).await?
    } else {
        let ApiJson(form) = ApiJson::<ProfileForm>::from_request(request, &state).await?;
        form
    };

    let ValidatedProfile {
        mut update,
        photo,
        first_name,
        last_name,
    } = form.into_update()?;

    if let Some(photo) = photo {
        let file_name = format!(
            "{}_{}.{}",
            user.id,
            Uuid::new_v4().simple(),
            photo.extension
        );
        let path =
            media::save_profile_photo(&state.config.media_root, &file_name, &photo.bytes).await?;
        update.profile_photo = Some(path);
    }

    if first_name.is_some() || last_name.is_some() {
        users::update_names(
            &state.db,
            user.id,
            first_name.as_deref(),
            last_name.as_deref(),
        )
        .await?;
    }
    users::update_profile(&state.db, user.id, &update).await?;

    Ok(Json(json!({ "message": "User details updated successfully" })))
}

pub async fn header_data(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let profile = users::get_profile(&state.db, user.id).await?;
    let today = state.today();

    let progress = match daily::get_by_date(&state.db, today).await? {
        Some(entry) => daily::progress_for(&state.db, user.id, &[entry.id])
            .await?
            .remove(&entry.id)
            .unwrap_or_default(),
        None => Default::default(),
    };

    Ok(Json(json!({
        "current_day_concept_read": progress.concept_read,
        "current_day_problem_solved": progress.solved,
        "current_streak": current_streak(&profile, today),
        "longest_streak": profile.longest_streak,
        "language_selected": profile.language_selected,
        "is_premium_user": profile.is_premium_user,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "profile_photo_url": photo_url(&state, &profile),
        "email": user.email,
        "username": user.username,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_free_username() {
        let taken: HashSet<String> = ["ada", "ada1", "ada2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(next_free_username("ada", &taken), "ada3");
        assert_eq!(next_free_username("grace", &taken), "grace");
    }

    #[test]
    fn test_email_local_part() {
        assert_eq!(email_local_part("ada.l@example.com"), "ada.l");
        assert_eq!(email_local_part("noat"), "noat");
    }

    #[test]
    fn test_profile_form_validation() {
        let form = ProfileForm {
            github: Some("not a url".to_string()),
            date_of_birth: Some("31/12/1990".to_string()),
            ..Default::default()
        };
        match form.into_update() {
            Err(ApiError::Fields(fields)) => {
                let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["github", "date_of_birth"]);
            }
            Err(other) => panic!("unexpected {:?}", other),
            Ok(_) => panic!("expected validation errors"),
        }
    }

    #[test]
    fn test_profile_form_into_update() {
        let mut form = ProfileForm::default();
        form.set_text("first_name", "Ada".to_string());
        form.set_text("github", "https://github.com/ada".to_string());
        form.set_text("date_of_birth", "1990-12-31".to_string());
        form.set_text("unknown", "ignored".to_string());
        let validated = form.into_update().unwrap();
        assert_eq!(
            validated.update.github.as_deref(),
            Some("https://github.com/ada")
        );
        assert_eq!(
            validated.update.date_of_birth,
            NaiveDate::from_ymd_opt(1990, 12, 31)
        );
        assert!(validated.photo.is_none());
        assert_eq!(validated.first_name.as_deref(), Some("Ada"));
        assert!(validated.last_name.is_none());
    }
}
