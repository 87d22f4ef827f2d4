// src/bridge/cache.rs - Parse results keyed by exact command text
//!
//! The synchronous path's fast path. Parsing is pure, so a cached result is
//! exactly what the parser would return again; the two paths cannot disagree.

use std::collections::{HashMap, VecDeque};

use crate::command::parser::{parse_command, ParsedCommand};
use crate::error::CommandError;

#[derive(Debug, Clone)]
pub struct ParseCache {
    capacity: usize,
    entries: HashMap<String, Result<ParsedCommand, CommandError>>,
    /// Insertion order, oldest first, for eviction.
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl ParseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_parse(&mut self, text: &str) -> Result<ParsedCommand, CommandError> {
        if let Some(cached) = self.entries.get(text) {
            self.hits += 1;
            return cached.clone();
        }
        self.misses += 1;
        let parsed = parse_command(text);
        if self.capacity > 0 {
            if self.order.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
            self.order.push_back(text.to_string());
            self.entries.insert(text.to_string(), parsed.clone());
        }
        parsed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_text_hits() {
        let mut cache = ParseCache::new(4);
        let first = cache.get_or_parse("adc(get, 0)").unwrap();
        let second = cache.get_or_parse("adc(get, 0)").unwrap();
        assert_eq!(first, second);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn failures_are_cached_too() {
        let mut cache = ParseCache::new(4);
        assert!(cache.get_or_parse("nope(1)").is_err());
        assert!(cache.get_or_parse("nope(1)").is_err());
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn oldest_entry_evicted() {
        let mut cache = ParseCache::new(2);
        cache.get_or_parse("adc(get, 0)").ok();
        cache.get_or_parse("adc(get, 1)").ok();
        cache.get_or_parse("adc(get, 2)").ok();
        assert_eq!(cache.len(), 2);
        cache.get_or_parse("adc(get, 0)").ok();
        assert_eq!(cache.hits(), 0);
    }

    #[test]
    fn zero_capacity_disables() {
        let mut cache = ParseCache::new(0);
        cache.get_or_parse("adc(get, 0)").ok();
        cache.get_or_parse("adc(get, 0)").ok();
        assert!(cache.is_empty());
        assert_eq!(cache.misses(), 2);
    }
}
