use crate::codegen::CompileError;
use std::collections::HashMap;

/// One lexical frame: its bindings plus the slot counter to restore when
/// the frame exits.
#[derive(Debug, Default)]
struct Frame {
    names: HashMap<String, u32>,
    saved_base: u32,
}

/// Slot allocator for a single function body.
///
/// Slot ids count up from zero, parameters first. `base` is the next free
/// slot and is restored when a subscope exits, so sibling subscopes reuse
/// the same slots; `max` is the high-water mark and never shrinks, making
/// the function's local count the peak across all paths rather than the
/// sum.
#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Frame>,
    base: u32,
    max: u32,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![Frame::default()],
            base: 0,
            max: 0,
        }
    }

    /// Allocate a slot for `name` in the innermost scope. Redeclaring a
    /// name within one scope is an error; shadowing an outer scope is not.
    pub fn declare(&mut self, name: &str) -> Result<u32, CompileError> {
        let frame = self.frames.last_mut().expect("scope stack is empty");
        if frame.names.contains_key(name) {
            return Err(CompileError::DuplicateLocal(name.to_string()));
        }
        let slot = self.base;
        self.base += 1;
        if self.base > self.max {
            self.max = self.base;
        }
        frame.names.insert(name.to_string(), slot);
        Ok(slot)
    }

    /// Innermost-to-outermost lookup.
    pub fn resolve(&self, name: &str) -> Result<u32, CompileError> {
        for frame in self.frames.iter().rev() {
            if let Some(&slot) = frame.names.get(name) {
                return Ok(slot);
            }
        }
        Err(CompileError::UndeclaredLocal(name.to_string()))
    }

    pub fn enter(&mut self) {
        self.frames.push(Frame {
            names: HashMap::new(),
            saved_base: self.base,
        });
    }

    pub fn exit(&mut self) {
        let frame = self.frames.pop().expect("scope stack underflow");
        self.base = frame.saved_base;
    }

    /// Peak slot usage observed so far, parameters included.
    pub fn max_slots(&self) -> u32 {
        self.max
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_resolve() {
        let mut s = ScopeStack::new();
        assert_eq!(s.declare("x").unwrap(), 0);
        assert_eq!(s.declare("y").unwrap(), 1);
        assert_eq!(s.resolve("x").unwrap(), 0);
        assert_eq!(s.resolve("y").unwrap(), 1);
        assert_eq!(s.max_slots(), 2);
    }

    #[test]
    fn test_duplicate_in_same_scope_fails() {
        let mut s = ScopeStack::new();
        s.declare("a").unwrap();
        assert!(matches!(
            s.declare("a"),
            Err(CompileError::DuplicateLocal(name)) if name == "a"
        ));
    }

    #[test]
    fn test_undeclared_fails() {
        let s = ScopeStack::new();
        assert!(matches!(
            s.resolve("ghost"),
            Err(CompileError::UndeclaredLocal(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_shadowing_resolves_innermost_and_unwinds() {
        let mut s = ScopeStack::new();
        let outer = s.declare("a").unwrap();
        s.enter();
        let inner = s.declare("a").unwrap();
        assert_ne!(outer, inner);
        assert_eq!(s.resolve("a").unwrap(), inner);
        s.exit();
        assert_eq!(s.resolve("a").unwrap(), outer);
    }

    #[test]
    fn test_sibling_scopes_reuse_slots() {
        let mut s = ScopeStack::new();
        s.declare("p").unwrap(); // slot 0

        s.enter();
        let first = s.declare("a").unwrap();
        s.exit();

        s.enter();
        let second = s.declare("b").unwrap();
        s.exit();

        assert_eq!(first, 1);
        assert_eq!(second, 1, "sibling scope must reuse the freed slot");
        assert_eq!(s.max_slots(), 2, "peak usage, not the sum");
    }

    #[test]
    fn test_max_folds_across_nested_scopes() {
        let mut s = ScopeStack::new();
        s.enter();
        s.declare("a").unwrap();
        s.enter();
        s.declare("b").unwrap();
        s.declare("c").unwrap();
        s.exit();
        s.exit();
        s.enter();
        s.declare("d").unwrap();
        s.exit();
        assert_eq!(s.max_slots(), 3);
    }
}
