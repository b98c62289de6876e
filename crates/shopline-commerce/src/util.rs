//! Clock, numbering and slug helpers shared by the domain types.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::CommerceError;

static LAST_SEQUENCE: AtomicI64 = AtomicI64::new(0);

/// Get current Unix timestamp in seconds.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Get current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Next value of a strictly increasing sequence.
///
/// Values are Unix microseconds, bumped past the previous value when the
/// clock has not moved, so they also keep increasing across restarts.
pub fn next_sequence() -> i64 {
    let micros = chrono::Utc::now().timestamp_micros();
    let previous = LAST_SEQUENCE
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(micros.max(last.saturating_add(1)))
        })
        .unwrap_or_else(|last| last);
    micros.max(previous.saturating_add(1))
}

/// Build a document number such as `ORD-1718000000-3fa2`.
pub(crate) fn document_number(prefix: &str) -> String {
    format!("{}-{}-{}", prefix, now(), crate::ids::short_suffix())
}

/// Turn a display name into a URL slug.
///
/// Lowercase ASCII letters and digits are kept; every other run of
/// characters becomes a single `-`.
///
/// ```
/// use shopline_commerce::util::slugify;
/// assert_eq!(slugify("Men's  T-Shirts & Polos").unwrap(), "men-s-t-shirts-polos");
/// ```
pub fn slugify(name: &str) -> Result<String, CommerceError> {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        return Err(CommerceError::ValidationError(format!(
            "cannot derive a slug from {:?}",
            name
        )));
    }
    Ok(slug)
}

/// Validate a caller-supplied slug.
pub fn validate_slug(slug: &str) -> Result<(), CommerceError> {
    let valid = !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CommerceError::ValidationError(format!(
            "invalid slug: {:?}",
            slug
        )))
    }
}

/// Trim a required text field, rejecting blanks.
pub(crate) fn required(field: &str, value: &str) -> Result<String, CommerceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CommerceError::ValidationError(format!(
            "{} is required",
            field
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_strictly_increases() {
        let values: Vec<i64> = (0..1000).map(|_| next_sequence()).collect();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Electronics").unwrap(), "electronics");
        assert_eq!(slugify("  Home & Living ").unwrap(), "home-living");
        assert_eq!(slugify("4K TVs").unwrap(), "4k-tvs");
        assert!(slugify("&&&").is_err());
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("home-living").is_ok());
        assert!(validate_slug("Home").is_err());
        assert!(validate_slug("-home").is_err());
        assert!(validate_slug("home--living").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_document_number() {
        let number = document_number("PO");
        assert!(number.starts_with("PO-"));
        assert_eq!(number.rsplit('-').next().unwrap().len(), 4);
    }
}
