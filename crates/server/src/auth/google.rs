//! Google integrations: reCAPTCHA and sign-in with Google

use super::AuthError;
use crate::media;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use studyhub_core::UserId;
use tracing::{debug, warn};

const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";
const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const PHOTO_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct RecaptchaResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Verify a reCAPTCHA response token. Always passes when no secret is set.
pub async fn verify_recaptcha(http: &reqwest::Client, secret: &str, token: &str) -> Result<bool> {
    if secret.is_empty() {
        debug!("reCAPTCHA secret not configured, skipping verification");
        return Ok(true);
    }
    let response: RecaptchaResponse = http
        .post(RECAPTCHA_VERIFY_URL)
        .form(&[("secret", secret), ("response", token)])
        .send()
        .await?
        .json()
        .await?;
    if !response.success {
        warn!(errors = ?response.error_codes, "reCAPTCHA verification failed");
    }
    Ok(response.success)
}

/// Identity asserted by a verified Google ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleIdentity {
    pub email: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    #[serde(flatten)]
    identity: GoogleIdentity,
}

/// Verify an ID token through Google's tokeninfo endpoint and check that it
/// was issued for our client id.
pub async fn verify_google_token(
    http: &reqwest::Client,
    client_id: &str,
    id_token: &str,
) -> Result<GoogleIdentity, AuthError> {
    let response = http
        .get(TOKENINFO_URL)
        .query(&[("id_token", id_token)])
        .send()
        .await
        .map_err(|e| AuthError::Google(e.to_string()))?;
    if !response.status().is_success() {
        return Err(AuthError::Google(format!(
            "tokeninfo returned {}",
            response.status()
        )));
    }
    let info: TokenInfo = response
        .json()
        .await
        .map_err(|e| AuthError::Google(e.to_string()))?;
    check_audience(&info.aud, client_id)?;
    Ok(info.identity)
}

fn check_audience(aud: &str, client_id: &str) -> Result<(), AuthError> {
    if client_id.is_empty() || aud != client_id {
        return Err(AuthError::Google("audience mismatch".to_string()));
    }
    Ok(())
}

/// Download a Google profile picture into the media root. Returns the stored
/// path relative to the media root.
pub async fn download_profile_photo(
    http: &reqwest::Client,
    url: &str,
    media_root: &Path,
    user_id: UserId,
) -> Result<String> {
    let response = http
        .get(url)
        .timeout(PHOTO_DOWNLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let ext = media::photo_extension(&content_type)
        .ok_or_else(|| anyhow!("unsupported photo type {:?}", content_type))?;
    let bytes = response.bytes().await?;
    media::save_profile_photo(
        media_root,
        &format!("google_profile_{}.{}", user_id, ext),
        &bytes,
    )
    .await
}
