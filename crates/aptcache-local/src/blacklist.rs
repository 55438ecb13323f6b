//! Thread-safe blacklist matcher.
//!
//! Patterns live in durable storage (owned by the caller) and an in-memory
//! snapshot here; the snapshot is reloaded wholesale on admin mutation.
//! Readers never block a writer and vice versa beyond the brief window of
//! swapping the `Arc<Vec<_>>`.

use aptcache_core::BlacklistPattern;
use regex::RegexBuilder;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
pub struct Blacklist {
    patterns: RwLock<Arc<Vec<String>>>,
}

impl Blacklist {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns: RwLock::new(Arc::new(patterns)),
        }
    }

    /// Replace the whole snapshot. Writers publish a new snapshot under a
    /// write lock; readers never block on it beyond the `Arc` swap itself.
    pub fn reload(&self, patterns: Vec<String>) {
        *self.patterns.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(patterns);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.patterns
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .clone()
    }

    /// `true` if `filename` matches any pattern. Malformed wildcard
    /// patterns are silently skipped rather than failing the request.
    pub fn is_blacklisted(&self, filename: &str) -> bool {
        let patterns = self.patterns.read().unwrap_or_else(|e| e.into_inner()).clone();
        patterns.iter().any(|p| pattern_matches(p, filename))
    }
}

fn pattern_matches(pattern: &str, filename: &str) -> bool {
    if pattern.contains('*') {
        let regex_src = pattern.replace('.', "\\.").replace('*', ".*");
        match RegexBuilder::new(&regex_src).case_insensitive(true).build() {
            Ok(re) => re.is_match(filename),
            Err(_) => false,
        }
    } else {
        filename
            .to_ascii_lowercase()
            .contains(&pattern.to_ascii_lowercase())
    }
}

impl From<&[BlacklistPattern]> for Blacklist {
    fn from(patterns: &[BlacklistPattern]) -> Self {
        Blacklist::new(patterns.iter().map(|p| p.0.clone()).collect())
    }
}
