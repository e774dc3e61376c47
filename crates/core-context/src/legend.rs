//! Accumulated legend entries.
//!
//! The `key` command enqueues an entry describing the currently executing
//! procedure block; the `legend` command drains them. While the legend
//! itself renders, additions are ignored so labels drawn by legend blocks
//! do not recurse into new entries.

use core_value::Value;
use core_value::error::{MapyrusError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendKind {
    Point,
    Line,
    Zigzag,
    Box,
}

impl LegendKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "line" => Ok(Self::Line),
            "zigzag" => Ok(Self::Zigzag),
            "box" => Ok(Self::Box),
            _ => Err(MapyrusError::InvalidLegendType(name.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LegendEntry {
    pub kind: LegendKind,
    pub description: String,
    pub block_name: String,
    pub args: Vec<Value>,
    /// How many times this entry was declared.
    pub reference_count: u32,
}

#[derive(Debug, Default)]
pub struct LegendList {
    entries: Vec<LegendEntry>,
    ignoring: bool,
}

impl LegendList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue, or bump the reference count of an identical entry.
    pub fn add(&mut self, entry: LegendEntry) {
        if self.ignoring {
            return;
        }
        if let Some(existing) = self.entries.iter_mut().find(|e| {
            e.kind == entry.kind
                && e.block_name == entry.block_name
                && e.description == entry.description
                && e.args == entry.args
        }) {
            existing.reference_count += 1;
            return;
        }
        self.entries.push(entry);
    }

    pub fn ignore_additions(&mut self) {
        self.ignoring = true;
    }

    pub fn accept_additions(&mut self) {
        self.ignoring = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return the oldest entry.
    pub fn pop_first(&mut self) -> Option<LegendEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(desc: &str) -> LegendEntry {
        LegendEntry {
            kind: LegendKind::Point,
            description: desc.to_string(),
            block_name: "dot".to_string(),
            args: vec![Value::Number(1.0)],
            reference_count: 1,
        }
    }

    #[test]
    fn duplicates_bump_reference_count() {
        let mut list = LegendList::new();
        list.add(entry("Well"));
        list.add(entry("Well"));
        list.add(entry("Bore"));
        assert_eq!(list.len(), 2);
        let first = list.pop_first().unwrap();
        assert_eq!(first.reference_count, 2);
    }

    #[test]
    fn ignored_additions_are_dropped() {
        let mut list = LegendList::new();
        list.ignore_additions();
        list.add(entry("Well"));
        assert!(list.is_empty());
        list.accept_additions();
        list.add(entry("Well"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(matches!(
            LegendKind::from_name("sparkle"),
            Err(MapyrusError::InvalidLegendType(_))
        ));
    }
}
