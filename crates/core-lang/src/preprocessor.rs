//! Character stream over a stack of script sources with include splicing.
//!
//! `read()` serves one character at a time from the innermost source,
//! popping exhausted sources; `unread()` pushes a single character back.
//! A line whose first word is `include` splices the named file at that
//! point and is never served to the caller. Comments are *not* handled
//! here; the parser strips them so that `#` keeps its meaning inside
//! quoted strings.
//!
//! Invariants:
//! * Reported locations (file, line) always name the innermost source.
//! * At most one character of pushback is in flight.
//! * Include depth is bounded to catch cycles.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use core_value::error::{MapyrusError, Result};
use tracing::debug;

const MAX_INCLUDE_DEPTH: usize = 64;

struct Source {
    name: Arc<str>,
    reader: Box<dyn BufRead>,
    line: u32,
    buf: Vec<char>,
    pos: usize,
}

impl Source {
    fn location(&self) -> (Arc<str>, u32) {
        (self.name.clone(), self.line)
    }
}

pub struct Preprocessor {
    sources: Vec<Source>,
    include_paths: Vec<PathBuf>,
    pushback: Option<char>,
    last_location: (Arc<str>, u32),
}

impl Preprocessor {
    /// Open a file path, or stdin for `-`.
    pub fn open(path: &str) -> Result<Self> {
        let mut pre = Self::empty();
        pre.push_source_path(path)?;
        Ok(pre)
    }

    /// Parse directly from an in-memory string (used by `eval` and tests).
    pub fn from_string(name: &str, content: &str) -> Self {
        let mut pre = Self::empty();
        pre.sources.push(Source {
            name: Arc::from(name),
            reader: Box::new(Cursor::new(content.to_string())),
            line: 0,
            buf: Vec::new(),
            pos: 0,
        });
        pre.last_location = (Arc::from(name), 0);
        pre
    }

    fn empty() -> Self {
        Self {
            sources: Vec::new(),
            include_paths: Vec::new(),
            pushback: None,
            last_location: (Arc::from(""), 0),
        }
    }

    /// Directories consulted when an include target is not found directly.
    pub fn set_include_paths(&mut self, paths: Vec<PathBuf>) {
        self.include_paths = paths;
    }

    fn push_source_path(&mut self, path: &str) -> Result<()> {
        if self.sources.len() >= MAX_INCLUDE_DEPTH {
            return Err(MapyrusError::Io(format!(
                "includes nested deeper than {MAX_INCLUDE_DEPTH}; include cycle?"
            )));
        }
        let reader: Box<dyn BufRead> = if path == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let resolved = self.resolve(path)?;
            Box::new(BufReader::new(File::open(&resolved).map_err(|e| {
                MapyrusError::Io(format!("cannot open {}: {e}", resolved.display()))
            })?))
        };
        debug!(target: "lang.preprocess", source = path, depth = self.sources.len(), "source_opened");
        self.sources.push(Source {
            name: Arc::from(path),
            reader,
            line: 0,
            buf: Vec::new(),
            pos: 0,
        });
        Ok(())
    }

    /// Try the name as given, then relative to the including file, then
    /// each configured include path.
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.exists() {
            return Ok(direct);
        }
        if let Some(top) = self.sources.last()
            && let Some(dir) = Path::new(top.name.as_ref()).parent()
        {
            let relative = dir.join(name);
            if relative.exists() {
                return Ok(relative);
            }
        }
        for dir in &self.include_paths {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Ok(candidate);
            }
        }
        Err(MapyrusError::Io(format!("cannot open {name}")))
    }

    /// Next character of the innermost source, or `None` at end of input.
    pub fn read(&mut self) -> Result<Option<char>> {
        if let Some(c) = self.pushback.take() {
            return Ok(Some(c));
        }
        loop {
            let Some(source) = self.sources.last_mut() else {
                return Ok(None);
            };
            if source.pos < source.buf.len() {
                let c = source.buf[source.pos];
                source.pos += 1;
                return Ok(Some(c));
            }
            // Refill from the next line of this source.
            let mut line = String::new();
            let n = source
                .reader
                .read_line(&mut line)
                .map_err(|e| MapyrusError::Io(format!("read error in {}: {e}", source.name)))?;
            if n == 0 {
                let closed = self.sources.pop();
                if let Some(s) = closed {
                    self.last_location = s.location();
                    debug!(target: "lang.preprocess", source = s.name.as_ref(), "source_exhausted");
                }
                continue;
            }
            source.line += 1;
            if let Some(target) = include_target(&line) {
                let target = target.to_string();
                self.push_source_path(&target)?;
                continue;
            }
            let source = match self.sources.last_mut() {
                Some(s) => s,
                None => continue,
            };
            source.buf = line.chars().collect();
            source.pos = 0;
        }
    }

    /// Push one character back; the next `read()` returns it.
    pub fn unread(&mut self, c: char) {
        debug_assert!(self.pushback.is_none(), "double unread");
        // Prefer rewinding the line buffer so location stays exact.
        if let Some(source) = self.sources.last_mut()
            && source.pos > 0
            && source.buf[source.pos - 1] == c
        {
            source.pos -= 1;
            return;
        }
        self.pushback = Some(c);
    }

    /// Innermost (file, line); after end of input, the last open source.
    pub fn location(&self) -> (Arc<str>, u32) {
        match self.sources.last() {
            Some(s) => s.location(),
            None => self.last_location.clone(),
        }
    }

    /// Drop all open sources; used on every exit path.
    pub fn close(&mut self) {
        if let Some(top) = self.sources.last() {
            self.last_location = top.location();
        }
        self.sources.clear();
        self.pushback = None;
    }
}

/// The include target when the line's first word is `include`.
fn include_target(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix("include")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let target = rest.trim();
    let target = target
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| target.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))
        .unwrap_or(target);
    if target.is_empty() { None } else { Some(target) }
}
