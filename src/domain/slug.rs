//! Group slug derivation.
//!
//! `slug::slugify` transliterates non-Latin scripts, so a title such as
//! “Котики” becomes `kotiki`. Collisions are resolved by the caller walking
//! [`candidates`] until storage reports a free one.

use slug::slugify;
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 50;
const MAX_COLLISION_SUFFIX: u32 = 33;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("cannot build a slug from blank text")]
    Blank,
    #[error("`{0}` has no characters usable in a slug")]
    NoUsableCharacters(String),
    #[error("every suffix of `{0}` is already taken")]
    Exhausted(String),
}

/// Turn a group title into a slug no longer than [`MAX_SLUG_LEN`].
pub fn derive_slug(title: &str) -> Result<String, SlugError> {
    if title.trim().is_empty() {
        return Err(SlugError::Blank);
    }

    let mut slug = slugify(title);
    if slug.len() > MAX_SLUG_LEN {
        // slugify output is ASCII, so any byte index is a char boundary.
        slug.truncate(MAX_SLUG_LEN);
        slug.truncate(slug.trim_end_matches('-').len());
    }

    if slug.is_empty() {
        Err(SlugError::NoUsableCharacters(title.to_string()))
    } else {
        Ok(slug)
    }
}

/// Lowercase ASCII letters, digits, `-` and `_`, at most [`MAX_SLUG_LEN`] bytes.
pub fn is_valid_slug(value: &str) -> bool {
    (1..=MAX_SLUG_LEN).contains(&value.len())
        && value
            .bytes()
            .all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_'))
}

/// `base`, then `base-2`, `base-3`, and so on up to a fixed bound.
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(base.to_string())
        .chain((2..=MAX_COLLISION_SUFFIX).map(move |n| format!("{base}-{n}")))
}
