//! Process-wide cache of compiled regular expressions.
//!
//! The `~` operator and the `match()`/`replace()` functions recompile the
//! same handful of patterns constantly; this keeps them behind a
//! fixed-capacity, mutex-guarded cache shared by all interpreter clones.
//! Eviction drops the oldest insertion; lookup is a linear scan, fine for
//! capacities in the tens.

use std::sync::Mutex;

use core_value::error::{MapyrusError, Result};
use regex::Regex;
use tracing::trace;

pub const DEFAULT_CAPACITY: usize = 64;

struct PatternCache {
    entries: Vec<(String, Regex)>,
    capacity: usize,
}

static CACHE: Mutex<PatternCache> = Mutex::new(PatternCache {
    entries: Vec::new(),
    capacity: DEFAULT_CAPACITY,
});

fn lock() -> std::sync::MutexGuard<'static, PatternCache> {
    match CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Compile through the cache. `Regex` clones share the compiled program,
/// so handing out clones is cheap.
pub fn compile(pattern: &str) -> Result<Regex> {
    let mut cache = lock();
    if let Some((_, re)) = cache.entries.iter().find(|(p, _)| p == pattern) {
        return Ok(re.clone());
    }
    let re = Regex::new(pattern).map_err(|e| {
        MapyrusError::InvalidExpression(format!("invalid regular expression '{pattern}': {e}"))
    })?;
    if cache.entries.len() >= cache.capacity {
        let evicted = cache.entries.remove(0);
        trace!(target: "lang.regex", pattern = evicted.0.as_str(), "evicted");
    }
    cache.entries.push((pattern.to_string(), re.clone()));
    Ok(re)
}

/// Resize the cache; never below one entry. Existing oldest entries drop
/// first when shrinking.
pub fn set_capacity(capacity: usize) {
    let mut cache = lock();
    cache.capacity = capacity.max(1);
    while cache.entries.len() > cache.capacity {
        cache.entries.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_patterns_are_reused() {
        let a = compile("^foo[0-9]+$").unwrap();
        let b = compile("^foo[0-9]+$").unwrap();
        assert_eq!(a.as_str(), b.as_str());
        assert!(a.is_match("foo42"));
    }

    #[test]
    fn bad_pattern_is_expression_error() {
        assert!(matches!(
            compile("(unclosed"),
            Err(MapyrusError::InvalidExpression(_))
        ));
    }
}
