//! The stack of procedure frames and the variable scoping rules.
//!
//! Scoping: `local` marks a name in the top frame. Reads walk from the top
//! frame downwards and stop at a frame that declares the name local (a
//! local declared but never assigned reads as undefined). Writes go to the
//! top frame when the name is local there, otherwise to the bottom
//! (global) frame. Block parameters are implicitly local.
//!
//! The stack also resolves the read-only `Mapyrus.*` internal variables
//! and owns the accumulated legend entries.

use core_lang::VariableResolver;
use core_value::error::{MapyrusError, Result};
use core_value::{Value, ValueMap};
use tracing::{debug, trace};

use crate::attributes::AttributeMask;
use crate::context::Context;
use crate::legend::LegendList;

pub struct ContextStack {
    frames: Vec<Context>,
    legend: LegendList,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Context::new()],
            legend: LegendList::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn top(&self) -> &Context {
        match self.frames.last() {
            Some(frame) => frame,
            None => unreachable!("context stack is never empty"),
        }
    }

    pub fn top_mut(&mut self) -> &mut Context {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => unreachable!("context stack is never empty"),
        }
    }

    fn bottom_mut(&mut self) -> &mut Context {
        match self.frames.first_mut() {
            Some(frame) => frame,
            None => unreachable!("context stack is never empty"),
        }
    }

    /// Push a frame cloned from the current top (procedure entry, or an
    /// explicit save).
    pub fn push(&mut self) -> Result<()> {
        let child = Context::from_parent(self.top_mut())?;
        self.frames.push(child);
        trace!(target: "context.stack", depth = self.frames.len(), "push");
        Ok(())
    }

    /// Pop the top frame, applying the attribute-restore discipline: if
    /// the encoder restored the saved state the child's changes are
    /// forgotten, otherwise the parent must reflush them.
    pub fn pop(&mut self) -> Result<()> {
        if self.frames.len() <= 1 {
            return Err(MapyrusError::UnexpectedValues(
                "no saved graphics state to restore".to_string(),
            ));
        }
        let mut child = match self.frames.pop() {
            Some(c) => c,
            None => unreachable!("guarded by depth check"),
        };
        // The save in `from_parent` pairs with this restore; a frame that
        // opened its own page has no saved state on it to restore.
        let mut restored = false;
        if !child.output_defined()
            && let Some(page) = child.page()
        {
            let mut page = page.borrow_mut();
            if page.open {
                restored = page.device.restore_state()?;
            }
        }
        if restored {
            child.clear_changed();
        } else {
            let changed = child.changed_mask();
            self.top_mut().inherit_pending(changed);
        }
        trace!(
            target: "context.stack",
            depth = self.frames.len(),
            restored,
            "pop"
        );
        child.close()
    }

    /// Close every frame, bottom-most last; runs on every exit path.
    pub fn close_all(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Some(mut frame) = self.frames.pop() {
            if let Err(e) = frame.close()
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }
        self.frames.push(Context::new());
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Variables.
    // ------------------------------------------------------------------

    /// Read a variable, walking top to bottom; `Mapyrus.*` names resolve
    /// to internal state.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        if let Some(suffix) = name.strip_prefix("Mapyrus.") {
            return self.internal_variable(suffix);
        }
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get_var(name) {
                return Some(value.clone());
            }
            if frame.has_local(name) {
                // Declared local here but not yet assigned: hidden.
                return None;
            }
        }
        None
    }

    /// Assign a variable under the scoping rules.
    pub fn define_variable(&mut self, name: &str, value: Value) {
        if self.top().has_local(name) {
            self.top_mut().set_var(name, value);
        } else {
            self.bottom_mut().set_var(name, value);
        }
        trace!(target: "context.vars", name, "define");
    }

    /// Mark a name local to the current frame.
    pub fn set_local_scope(&mut self, name: &str) {
        self.top_mut().declare_local(name);
    }

    /// Assign one element of a map variable, creating the map on first
    /// use.
    pub fn define_map_element(&mut self, name: &str, key: &str, value: Value) -> Result<()> {
        let existing = self.get_variable(name);
        let mut map = match existing {
            Some(Value::Map(m)) => m,
            None => ValueMap::new(),
            Some(_) => return Err(MapyrusError::WrongTypes),
        };
        map.put(key, value);
        self.define_variable(name, Value::Map(map));
        Ok(())
    }

    fn internal_variable(&self, suffix: &str) -> Option<Value> {
        match suffix {
            "version" => return Some(Value::Str(env!("CARGO_PKG_VERSION").to_string())),
            _ => {}
        }
        if let Some(rest) = suffix.strip_prefix("page.") {
            let (width, height, dpi) = match self.top().page() {
                Some(page) => {
                    let p = page.borrow();
                    (p.width, p.height, p.resolution_dpi)
                }
                None => (0.0, 0.0, 0.0),
            };
            return match rest {
                "width" => Some(Value::Number(width)),
                "height" => Some(Value::Number(height)),
                "resolution.dpi" | "resolution" => Some(Value::Number(dpi)),
                _ => None,
            };
        }
        if let Some(rest) = suffix.strip_prefix("worlds.") {
            if rest == "units" {
                return self
                    .top()
                    .world_units()
                    .map(|u| Value::Str(u.name().to_string()));
            }
            let extents = self.top().world_extents()?;
            return match rest {
                "min.x" => Some(Value::Number(extents.x1.min(extents.x2))),
                "min.y" => Some(Value::Number(extents.y1.min(extents.y2))),
                "max.x" => Some(Value::Number(extents.x1.max(extents.x2))),
                "max.y" => Some(Value::Number(extents.y1.max(extents.y2))),
                "scale" => self.top().world_scale().map(Value::Number),
                _ => None,
            };
        }
        if let Some(rest) = suffix.strip_prefix("path.") {
            let tolerance = self.top().resolution_mm();
            let path = self.top().current_path();
            return match rest {
                "length" => Some(Value::Number(
                    path.map(|p| p.length(tolerance)).unwrap_or(0.0),
                )),
                "area" => Some(Value::Number(
                    path.map(|p| p.area(tolerance)).unwrap_or(0.0),
                )),
                "start.x" => Some(Value::Number(
                    path.and_then(|p| p.start_point()).map(|p| p.0).unwrap_or(0.0),
                )),
                "start.y" => Some(Value::Number(
                    path.and_then(|p| p.start_point()).map(|p| p.1).unwrap_or(0.0),
                )),
                "end.x" => Some(Value::Number(
                    path.and_then(|p| p.end_point()).map(|p| p.0).unwrap_or(0.0),
                )),
                "end.y" => Some(Value::Number(
                    path.and_then(|p| p.end_point()).map(|p| p.1).unwrap_or(0.0),
                )),
                "start.angle" => Some(Value::Number(
                    path.map(|p| p.start_angle(tolerance).to_degrees())
                        .unwrap_or(0.0),
                )),
                "end.angle" => Some(Value::Number(
                    path.map(|p| p.end_angle(tolerance).to_degrees())
                        .unwrap_or(0.0),
                )),
                _ => None,
            };
        }
        if let Some(rest) = suffix.strip_prefix("dataset.") {
            let handle = self
                .frames
                .iter()
                .rev()
                .find_map(|frame| frame.dataset())?;
            return match rest {
                "fieldnames" => {
                    let mut map = ValueMap::new();
                    for (i, field) in handle.field_names().iter().enumerate() {
                        map.put((i + 1).to_string(), Value::Str(field.clone()));
                    }
                    Some(Value::Map(map))
                }
                _ => None,
            };
        }
        if suffix == "fetch.more" {
            let more = self
                .frames
                .iter()
                .rev()
                .find_map(|frame| frame.dataset())
                .map(|h| h.has_more())
                .unwrap_or(false);
            return Some(Value::from_bool(more));
        }
        debug!(target: "context.vars", suffix, "unknown_internal_variable");
        None
    }

    /// Innermost frame holding an open dataset; `fetch` reads through it.
    pub fn nearest_dataset_mut(&mut self) -> Option<&mut crate::context::DatasetHandle> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.dataset_mut())
    }

    // ------------------------------------------------------------------
    // Legend accumulation.
    // ------------------------------------------------------------------

    pub fn legend(&self) -> &LegendList {
        &self.legend
    }

    pub fn legend_mut(&mut self) -> &mut LegendList {
        &mut self.legend
    }

    /// Union of pending bits needed by the attribute-idempotence property
    /// tests.
    pub fn pending_mask(&self) -> AttributeMask {
        self.top().pending_mask()
    }
}

impl VariableResolver for ContextStack {
    fn get_variable(&self, name: &str) -> Option<Value> {
        ContextStack::get_variable(self, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_default_to_global_frame() {
        let mut stack = ContextStack::new();
        stack.push().unwrap();
        stack.define_variable("a", Value::Number(1.0));
        stack.pop().unwrap();
        // Survives the frame pop because it was written to the bottom.
        assert_eq!(stack.get_variable("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn local_writes_die_with_the_frame() {
        let mut stack = ContextStack::new();
        stack.define_variable("a", Value::Number(1.0));
        stack.push().unwrap();
        stack.set_local_scope("a");
        stack.define_variable("a", Value::Number(99.0));
        assert_eq!(stack.get_variable("a"), Some(Value::Number(99.0)));
        stack.pop().unwrap();
        assert_eq!(stack.get_variable("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn unassigned_local_hides_global() {
        let mut stack = ContextStack::new();
        stack.define_variable("a", Value::Number(1.0));
        stack.push().unwrap();
        stack.set_local_scope("a");
        assert_eq!(stack.get_variable("a"), None);
        stack.pop().unwrap();
    }

    #[test]
    fn pop_on_bottom_frame_fails() {
        let mut stack = ContextStack::new();
        assert!(stack.pop().is_err());
    }

    #[test]
    fn map_element_assignment_creates_map() {
        let mut stack = ContextStack::new();
        stack
            .define_map_element("m", "k", Value::Number(5.0))
            .unwrap();
        match stack.get_variable("m") {
            Some(Value::Map(map)) => assert_eq!(map.get("k"), Some(&Value::Number(5.0))),
            other => panic!("expected map, got {other:?}"),
        }
        assert!(matches!(
            {
                stack.define_variable("s", Value::Number(3.0));
                stack.define_map_element("s", "k", Value::Number(1.0))
            },
            Err(MapyrusError::WrongTypes)
        ));
    }

    #[test]
    fn version_is_internal() {
        let stack = ContextStack::new();
        assert!(stack.get_variable("Mapyrus.version").is_some());
    }

    #[test]
    fn page_internals_default_to_zero() {
        let stack = ContextStack::new();
        assert_eq!(
            stack.get_variable("Mapyrus.page.width"),
            Some(Value::Number(0.0))
        );
    }
}
