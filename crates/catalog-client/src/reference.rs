//! Relational reference resolution
//!
//! Every cross-entity link in the catalog API is an opaque URL whose trailing
//! path segment is the target's numeric id (for example
//! `https://example.com/api/location/1` points at location `1`). Nothing in
//! this layer ever dereferences the URL itself; only the id matters.

use thiserror::Error;

/// Errors raised while resolving reference strings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The trailing path segment was not a valid integer
    #[error("reference {reference:?} does not end in a numeric id")]
    Parse {
        /// The offending reference string
        reference: String,
    },
}

/// Result type for reference resolution
pub type Result<T> = std::result::Result<T, ReferenceError>;

/// Extract the numeric id carried by a reference string.
///
/// The id is parsed from the substring after the last `/`. A reference with
/// no separator at all is treated as a bare id and parsed whole.
///
/// # Examples
/// ```
/// use catalog_client::reference::resolve_id;
///
/// assert_eq!(resolve_id("https://x/api/location/1").unwrap(), 1);
/// assert_eq!(resolve_id("42").unwrap(), 42);
/// ```
pub fn resolve_id(reference: &str) -> Result<i64> {
    let tail = reference.rsplit('/').next().unwrap_or(reference);
    tail.parse().map_err(|_| ReferenceError::Parse {
        reference: reference.to_owned(),
    })
}

/// Resolve a reference that may be absent.
///
/// The API encodes "no linked entity" as an empty reference string (an
/// unknown origin, for instance). Returns `Ok(None)` for blank input so
/// callers can short-circuit navigation instead of attempting resolution.
pub fn linked_id(reference: &str) -> Result<Option<i64>> {
    if reference.trim().is_empty() {
        return Ok(None);
    }
    resolve_id(reference).map(Some)
}

/// Resolve a list of references, failing on the first malformed entry.
pub fn resolve_ids<S: AsRef<str>>(references: &[S]) -> Result<Vec<i64>> {
    references.iter().map(|r| resolve_id(r.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_trailing_segment() {
        assert_eq!(resolve_id("https://x/api/location/1").unwrap(), 1);
        assert_eq!(resolve_id("https://x/api/character/826").unwrap(), 826);
    }

    #[test]
    fn reference_without_separator_is_a_bare_id() {
        assert_eq!(resolve_id("42").unwrap(), 42);
    }

    #[test]
    fn non_numeric_tail_is_a_parse_error() {
        let err = resolve_id("https://x/api/location/abc").unwrap_err();
        assert!(matches!(err, ReferenceError::Parse { .. }));
        assert!(resolve_id("").is_err());
    }

    #[test]
    fn blank_reference_means_no_linked_entity() {
        assert_eq!(linked_id("").unwrap(), None);
        assert_eq!(linked_id("   ").unwrap(), None);
        assert_eq!(linked_id("https://x/api/location/3").unwrap(), Some(3));
    }

    #[test]
    fn resolves_lists_and_fails_fast() {
        let refs = ["https://x/api/episode/1", "https://x/api/episode/2"];
        assert_eq!(resolve_ids(&refs).unwrap(), vec![1, 2]);

        let bad = ["https://x/api/episode/1", "https://x/api/episode/oops"];
        assert!(resolve_ids(&bad).is_err());
    }
}
