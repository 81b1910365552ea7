//! Password reset tokens
//!
//! A token is `<base36 seconds since 2001-01-01>-<truncated hmac>`. The hmac
//! covers the user's id, password hash, last login and e-mail, so changing the
//! password or logging in again invalidates every outstanding token.

use chrono::{DateTime, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use studyhub_core::User;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

const KEY_SALT: &str = "studyhub.auth.PasswordResetTokenGenerator";

/// Tokens older than this are rejected.
pub const RESET_TIMEOUT_SECS: i64 = 3 * 24 * 60 * 60;

fn epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2001, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

fn to_base36(mut n: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(s: &str) -> Option<i64> {
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    i64::from_str_radix(s, 36).ok()
}

pub struct ResetTokens {
    key: Vec<u8>,
}

impl ResetTokens {
    pub fn new(secret: &str) -> Self {
        let key = Sha256::digest(format!("{}{}", KEY_SALT, secret).as_bytes()).to_vec();
        Self { key }
    }

    fn signature(&self, user: &User, timestamp: i64) -> String {
        let login = user
            .last_login
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let value = format!(
            "{}{}{}{}{}",
            user.id, user.password_hash, login, timestamp, user.email
        );
        let mut mac = match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(value.as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        digest.chars().step_by(2).collect()
    }

    fn token_at(&self, user: &User, now: DateTime<Utc>) -> String {
        let ts = (now - epoch()).num_seconds();
        format!("{}-{}", to_base36(ts), self.signature(user, ts))
    }

    pub fn make_token(&self, user: &User) -> String {
        self.token_at(user, Utc::now())
    }

    fn check_at(&self, user: &User, token: &str, now: DateTime<Utc>) -> bool {
        let Some((ts_b36, sig)) = token.split_once('-') else {
            return false;
        };
        let Some(ts) = from_base36(ts_b36) else {
            return false;
        };
        let expected = self.signature(user, ts);
        if expected.is_empty() || !bool::from(expected.as_bytes().ct_eq(sig.as_bytes())) {
            return false;
        }
        let age = (now - epoch()).num_seconds() - ts;
        (0..=RESET_TIMEOUT_SECS).contains(&age)
    }

    pub fn check_token(&self, user: &User, token: &str) -> bool {
        self.check_at(user, token, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user() -> User {
        User {
            id: 5,
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "pbkdf2_sha256$1$salt$hash".to_string(),
            is_staff: false,
            is_superuser: false,
            is_active: true,
            date_joined: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(from_base36("10"), Some(36));
        assert_eq!(from_base36(""), None);
        assert_eq!(from_base36("!!"), None);
    }

    #[test]
    fn test_token_round_trip() {
        let tokens = ResetTokens::new("secret");
        let token = tokens.make_token(&user());
        assert!(tokens.check_token(&user(), &token));
        assert!(!ResetTokens::new("other").check_token(&user(), &token));
    }

    #[test]
    fn test_password_change_invalidates() {
        let tokens = ResetTokens::new("secret");
        let token = tokens.make_token(&user());
        let mut changed = user();
        changed.password_hash = "pbkdf2_sha256$1$salt$other".to_string();
        assert!(!tokens.check_token(&changed, &token));
    }

    #[test]
    fn test_login_invalidates() {
        let tokens = ResetTokens::new("secret");
        let token = tokens.make_token(&user());
        let mut logged_in = user();
        logged_in.last_login = Some(Utc::now());
        assert!(!tokens.check_token(&logged_in, &token));
    }

    #[test]
    fn test_expiry() {
        let tokens = ResetTokens::new("secret");
        let issued = Utc::now();
        let token = tokens.token_at(&user(), issued);
        assert!(tokens.check_at(&user(), &token, issued + Duration::days(2)));
        assert!(!tokens.check_at(&user(), &token, issued + Duration::days(4)));
    }

    #[test]
    fn test_malformed() {
        let tokens = ResetTokens::new("secret");
        assert!(!tokens.check_token(&user(), ""));
        assert!(!tokens.check_token(&user(), "abc"));
        assert!(!tokens.check_token(&user(), "zz-deadbeef"));
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let tokens = ResetTokens::new("secret");
        let token = tokens.make_token(&user());
        assert!(!tokens.check_token(&user(), &token[..token.len() - 1]));
        assert!(!tokens.check_token(&user(), &format!("{}0", token)));
    }
}
