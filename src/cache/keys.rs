//! Page cache key derivation.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub fn hash_value<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Key for a rendered page: path, hashed query string and hashed session token.
///
/// Anonymous viewers share one entry per path and query; each session gets
/// its own so personalised chrome never leaks between viewers.
pub fn page_key(path: &str, query: Option<&str>, session: Option<&str>) -> String {
    let query_hash = hash_value(query.unwrap_or(""));
    match session {
        Some(token) => format!("{path}?{query_hash:016x}#{:016x}", hash_value(token)),
        None => format!("{path}?{query_hash:016x}#anon"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_and_session_partition_keys() {
        let anon = page_key("/", None, None);
        assert_eq!(anon, page_key("/", Some(""), None));
        assert_ne!(anon, page_key("/", Some("page=2"), None));
        assert_ne!(anon, page_key("/", None, Some("token-a")));
        assert_ne!(
            page_key("/", None, Some("token-a")),
            page_key("/", None, Some("token-b"))
        );
    }

    #[test]
    fn raw_session_token_is_not_embedded() {
        let key = page_key("/", None, Some("very-secret-token"));
        assert!(!key.contains("very-secret-token"));
    }
}
