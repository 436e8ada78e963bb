//! Utilities for generating deterministic, URL-safe slugs.
//!
//! ASCII slugification is delegated to the `slug` crate, which also folds
//! Latin diacritics. Chinese characters are transliterated with the `pinyin`
//! crate first, and emoji or other symbols are dropped so they never leak
//! into a slug as transliterated names. Uniqueness is decided by a
//! caller-supplied predicate so the generation logic stays pure.

use std::future::Future;

use pinyin::{Pinyin, ToPinyin};
use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

/// Errors that can occur while generating or validating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("`{slug}` is not a valid slug")]
    Malformed { slug: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

/// Errors that can occur while generating a slug via an async uniqueness check.
#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let transliterated = transliterate_to_ascii(input);
    let candidate = slugify(&transliterated);

    if candidate.trim_matches('-').is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Check a caller-supplied slug without rewriting it.
///
/// Accepts ASCII letters, digits, `-` and `_`, and requires at least one
/// letter or digit.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    let allowed = slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    let has_alphanumeric = slug.chars().any(|ch| ch.is_ascii_alphanumeric());

    if allowed && has_alphanumeric {
        Ok(())
    } else {
        Err(SlugError::Malformed {
            slug: slug.to_string(),
        })
    }
}

/// Produce a slug that does not collide according to the awaited predicate.
///
/// The `is_unique` closure must resolve to `true` when the provided slug does
/// not already exist. Collisions are retried with a monotonic counter suffix
/// (`-2`, `-3`, …).
pub async fn generate_unique_slug_async<F, Fut, E>(
    input: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(input)?;

    if is_unique(&base).await.map_err(SlugAsyncError::Predicate)? {
        return Ok(base);
    }

    for attempt in 2..=MAX_SUFFIX_ATTEMPTS + 1 {
        let candidate = format!("{base}-{attempt}");
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

fn transliterate_to_ascii(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => append_pinyin(&mut output, py),
            // Accented letters are folded to ASCII by `slugify`.
            None if ch.is_alphanumeric() => output.push(ch),
            // Emoji, symbols, combining marks and non-ASCII punctuation.
            None => output.push(' '),
        }
    }

    output
}

fn append_pinyin(buffer: &mut String, pinyin: Pinyin) {
    if !buffer.is_empty() && !buffer.ends_with(' ') {
        buffer.push(' ');
    }
    buffer.push_str(pinyin.plain());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_normalises_punctuation() {
        assert_eq!(derive_slug("My Post!").expect("slug"), "my-post");
        assert_eq!(
            derive_slug("  --Hello,   World--  ").expect("slug"),
            "hello-world"
        );
    }

    #[test]
    fn derive_slug_folds_diacritics_and_drops_emoji() {
        assert_eq!(derive_slug("Café & Crème").expect("slug"), "cafe-creme");
        assert_eq!(
            derive_slug("Rocket 🚀 Launch").expect("slug"),
            "rocket-launch"
        );
    }

    #[test]
    fn derive_slug_transliterates_chinese() {
        let slug = derive_slug("Rust 基础教程").expect("slug");
        assert_eq!(slug, "rust-ji-chu-jiao-cheng");
    }

    #[test]
    fn derive_slug_rejects_punctuation_only() {
        assert_eq!(
            derive_slug("!!!"),
            Err(SlugError::Unrepresentable {
                input: "!!!".to_string()
            })
        );
        assert!(matches!(
            derive_slug("🎉🎉"),
            Err(SlugError::Unrepresentable { .. })
        ));
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn validate_slug_accepts_verbatim_slugs() {
        assert!(validate_slug("test-post-1").is_ok());
        assert!(validate_slug("Mixed_Case").is_ok());
        assert!(matches!(
            validate_slug("---"),
            Err(SlugError::Malformed { .. })
        ));
        assert!(matches!(
            validate_slug("has space"),
            Err(SlugError::Malformed { .. })
        ));
        assert!(matches!(validate_slug(""), Err(SlugError::Malformed { .. })));
    }

    #[tokio::test]
    async fn generate_unique_slug_async_appends_counter() {
        use std::sync::Arc;
        use tokio::sync::Mutex;

        let existing = Arc::new(Mutex::new(vec!["pattern-library".to_string()]));

        let slug = generate_unique_slug_async("Pattern Library", |candidate| {
            let existing = existing.clone();
            let candidate = candidate.to_string();
            async move {
                let mut guard = existing.lock().await;
                if guard.contains(&candidate) {
                    Ok::<bool, std::convert::Infallible>(false)
                } else {
                    guard.push(candidate);
                    Ok::<bool, std::convert::Infallible>(true)
                }
            }
        })
        .await
        .expect("unique slug");

        assert_eq!(slug, "pattern-library-2");
        let guard = existing.lock().await;
        assert!(guard.contains(&slug));
    }

    #[tokio::test]
    async fn generate_unique_slug_async_exhausts() {
        let result = generate_unique_slug_async("Example", |_| async {
            Ok::<bool, std::convert::Infallible>(false)
        })
        .await;

        match result {
            Err(SlugAsyncError::Slug(err)) => assert_eq!(
                err,
                SlugError::Exhausted {
                    base: "example".to_string()
                }
            ),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
