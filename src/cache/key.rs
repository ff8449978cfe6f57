//! Cache Key Module
//!
//! Structured `(namespace, id)` keys rendered as `"<namespace>:<id>"`.

use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

// == Cache Key ==
/// A namespaced cache key.
///
/// Keys compare as tuples, so `user:1` and `user:10` are unrelated and the
/// `user` namespace never overlaps `userData`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    namespace: String,
    id: String,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id: id.into(),
        }
    }

    /// Splits a raw key at the first `:`. Anything after it, including
    /// further `:`-separated suboptions, belongs to the id.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((namespace, id)) => Self::new(namespace, id),
            None => Self::new(raw, ""),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Length of the rendered key in bytes.
    pub fn rendered_len(&self) -> usize {
        if self.id.is_empty() {
            self.namespace.len()
        } else {
            self.namespace.len() + 1 + self.id.len()
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id.is_empty() {
            write!(f, "{}", self.namespace)
        } else {
            write!(f, "{}:{}", self.namespace, self.id)
        }
    }
}

impl FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
        }
        Ok(Self::parse(s))
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespaced_key() {
        let key = CacheKey::parse("user:abc123");
        assert_eq!(key.namespace(), "user");
        assert_eq!(key.id(), "abc123");
        assert_eq!(key.to_string(), "user:abc123");
    }

    #[test]
    fn test_parse_keeps_suboptions_in_id() {
        let key = CacheKey::parse("events:club1:upcoming");
        assert_eq!(key.namespace(), "events");
        assert_eq!(key.id(), "club1:upcoming");
        assert_eq!(key.to_string(), "events:club1:upcoming");
    }

    #[test]
    fn test_parse_bare_key() {
        let key = CacheKey::parse("settings");
        assert_eq!(key.namespace(), "settings");
        assert_eq!(key.id(), "");
        assert_eq!(key.to_string(), "settings");
        assert_eq!(key.rendered_len(), "settings".len());
    }

    #[test]
    fn test_similar_ids_are_distinct() {
        assert_ne!(CacheKey::parse("user:1"), CacheKey::parse("user:10"));
        assert_ne!(
            CacheKey::parse("user:1").namespace(),
            CacheKey::parse("userData:1").namespace()
        );
    }

    #[test]
    fn test_from_str_rejects_empty() {
        assert!("".parse::<CacheKey>().is_err());
        assert_eq!("tags:a,b".parse::<CacheKey>().unwrap().id(), "a,b");
    }
}
