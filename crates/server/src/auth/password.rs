//! Password hashing
//!
//! Hashes are stored as `pbkdf2_sha256$<iterations>$<salt>$<base64 hash>` so
//! existing credentials keep verifying after a migration.

use anyhow::Result;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const ALGORITHM: &str = "pbkdf2_sha256";

/// Marker for accounts that cannot log in with a password (e.g. Google sign-in).
pub const UNUSABLE_PASSWORD: &str = "!";

const SALT_LEN: usize = 22;

fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password, salt, iterations.max(1), &mut out);
    out
}

fn random_salt() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect()
}

fn encode_with_salt(password: &str, salt: &str, iterations: u32) -> String {
    let hash = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), iterations);
    format!(
        "{}${}${}${}",
        ALGORITHM,
        iterations,
        salt,
        base64::engine::general_purpose::STANDARD.encode(hash)
    )
}

pub fn hash_password(password: &str, iterations: u32) -> String {
    encode_with_salt(password, &random_salt(), iterations.max(1))
}

/// Check `password` against an encoded hash. Malformed or unusable hashes
/// never match.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.splitn(4, '$');
    let (Some(algorithm), Some(iterations), Some(salt), Some(expected)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if algorithm != ALGORITHM {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(expected) else {
        return false;
    };
    let actual = pbkdf2_sha256(password.as_bytes(), salt.as_bytes(), iterations);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

/// Hash on the blocking pool; 600k iterations take long enough to stall a
/// runtime worker.
pub async fn hash_password_blocking(password: String, iterations: u32) -> Result<String> {
    Ok(tokio::task::spawn_blocking(move || hash_password(&password, iterations)).await?)
}

pub async fn verify_password_blocking(password: String, encoded: String) -> Result<bool> {
    Ok(tokio::task::spawn_blocking(move || verify_password(&password, &encoded)).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_vectors() {
        assert_eq!(
            hex::encode(pbkdf2_sha256(b"password", b"salt", 1)),
            "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b"
        );
        assert_eq!(
            hex::encode(pbkdf2_sha256(b"password", b"salt", 4096)),
            "c5e478d59288c841aa530db6845c4c8d962893a001ce4e11a4963873aa98134a"
        );
    }

    #[test]
    fn test_hash_and_verify() {
        let encoded = hash_password("correct horse", 1000);
        assert!(encoded.starts_with("pbkdf2_sha256$1000$"));
        assert!(verify_password("correct horse", &encoded));
        assert!(!verify_password("battery staple", &encoded));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("pw", 10);
        let b = hash_password("pw", 10);
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hashes_never_match() {
        assert!(!verify_password("pw", UNUSABLE_PASSWORD));
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "md5$1$salt$abc"));
        assert!(!verify_password("pw", "pbkdf2_sha256$notanumber$salt$abc"));
    }

    #[test]
    fn test_truncated_hash_never_matches() {
        let encoded = hash_password("pw", 10);
        let (prefix, hash) = encoded.rsplit_once('$').unwrap();
        let raw = base64::engine::general_purpose::STANDARD
            .decode(hash)
            .unwrap();
        let short = base64::engine::general_purpose::STANDARD.encode(&raw[..16]);
        assert!(!verify_password("pw", &format!("{}${}", prefix, short)));
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let encoded = hash_password_blocking("secret".to_string(), 100)
            .await
            .unwrap();
        assert!(verify_password_blocking("secret".to_string(), encoded)
            .await
            .unwrap());
    }
}
