//! URL slugs
//!
//! Titles are turned into lowercase ASCII slugs. Collisions are resolved by
//! appending a numeric suffix one past the highest suffix already in use, so
//! `intro`, `intro-2`, `intro-7` yields `intro-8` for the next "Intro".

use rand::Rng;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const MAX_SLUG_LEN: usize = 255;

/// Number of insert attempts when a concurrent writer grabs the same slug.
pub const MAX_SLUG_RETRIES: usize = 3;

/// Turn a title into a slug. Returns an empty string when nothing survives.
///
/// Accented letters are folded to ASCII (`"Café"` becomes `cafe`), other
/// non-ASCII characters and punctuation are dropped. Underscores are kept;
/// runs of whitespace and dashes become one dash.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.nfkd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        }
    }

    slug.truncate(MAX_SLUG_LEN);
    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Slug for a title, falling back to a short random token when the title has
/// no usable characters (e.g. `"!@#$"`).
pub fn slug_for_title(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        random_token(7)
    } else {
        slug
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let n: u8 = rng.gen_range(0..16);
            char::from_digit(n as u32, 16).unwrap_or('0')
        })
        .collect()
}

/// `{base}-{n}`, with `base` shortened so the result fits in a slug column.
fn numbered(base: &str, n: u64) -> String {
    let suffix = format!("-{}", n);
    let keep = MAX_SLUG_LEN.saturating_sub(suffix.len());
    let end = base
        .char_indices()
        .nth(keep)
        .map_or(base.len(), |(i, _)| i);
    format!("{}{}", base[..end].trim_end_matches('-'), suffix)
}

/// Numeric suffix of `candidate` when it is `numbered(base, n)`.
fn suffix_of(base: &str, candidate: &str) -> Option<u64> {
    let (_, digits) = candidate.rsplit_once('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n = digits.parse().ok()?;
    (numbered(base, n) == candidate).then_some(n)
}

/// Pick a slug derived from `base` that is not in `taken`.
///
/// `taken` only needs to contain slugs that start with `base`; anything else
/// is ignored.
pub fn unique_slug<'a, I>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: HashSet<&str> = taken.into_iter().collect();

    let max_suffix = taken.iter().filter_map(|s| suffix_of(base, s)).max();
    let mut i = match max_suffix {
        Some(n) => n + 1,
        None if taken.contains(base) => 2,
        None => return base.to_string(),
    };

    loop {
        let candidate = numbered(base, i);
        if !taken.contains(candidate.as_str()) {
            return candidate;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Linear Regression"), "linear-regression");
        assert_eq!(slugify("  K-Means   Clustering!  "), "k-means-clustering");
        assert_eq!(slugify("snake_case_title"), "snake_case_title");
        assert_eq!(slugify("What's a GAN?"), "whats-a-gan");
    }

    #[test]
    fn test_slugify_keeps_underscores() {
        assert_eq!(slugify("two_sum"), "two_sum");
        assert_eq!(slugify("_private_ method_"), "private_-method");
    }

    #[test]
    fn test_slugify_folds_accents() {
        assert_eq!(slugify("Café"), "cafe");
        assert_eq!(slugify("Señor Naïve Bayes"), "senor-naive-bayes");
        assert_eq!(slugify("ﬁne-tuning"), "fine-tuning");
        assert_eq!(slugify("日本 Text"), "text");
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify("!@#$!@#$"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_slug_for_title_fallback() {
        let slug = slug_for_title("???");
        assert_eq!(slug.len(), 7);
        assert!(slug.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "a".repeat(400);
        assert_eq!(slugify(&long).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_unique_slug_free() {
        assert_eq!(unique_slug("intro", Vec::<&str>::new()), "intro");
        assert_eq!(unique_slug("intro", vec!["introduction"]), "intro");
    }

    #[test]
    fn test_unique_slug_base_taken() {
        assert_eq!(unique_slug("intro", vec!["intro"]), "intro-2");
        assert_eq!(unique_slug("intro", vec!["intro", "intro-2"]), "intro-3");
    }

    #[test]
    fn test_unique_slug_continues_after_highest_suffix() {
        let taken = vec!["intro", "intro-2", "intro-500"];
        assert_eq!(unique_slug("intro", taken), "intro-501");
    }

    #[test]
    fn test_unique_slug_ignores_non_numeric_suffix() {
        let taken = vec!["intro", "intro-to-ml", "intro-2x"];
        assert_eq!(unique_slug("intro", taken), "intro-2");
    }

    #[test]
    fn test_unique_slug_fits_column_for_long_base() {
        let base = "a".repeat(MAX_SLUG_LEN);
        let second = unique_slug(&base, vec![base.as_str()]);
        assert_eq!(second.len(), MAX_SLUG_LEN);
        assert!(second.ends_with("a-2"));

        let third = unique_slug(&base, vec![base.as_str(), second.as_str()]);
        assert_eq!(third.len(), MAX_SLUG_LEN);
        assert!(third.ends_with("a-3"));
    }
}
