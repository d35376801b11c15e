//! Pattern variables and the per-translation naming authority.
//!
//! Every node or relationship binding in a rendered statement is a
//! [`Variable`]. Generated variables come from a single [`NameAuthority`]
//! owned by the translation, so two sibling patterns can never collide.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A named binding for a node, relationship or projected value.
///
/// Cloning a variable clones the handle, not the binding: every clone renders
/// to the same name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(Arc<str>);

impl Variable {
    /// A variable with a caller-chosen name (`this`, a custom column name).
    ///
    /// Prefer [`NameAuthority::fresh`] for anything generated during
    /// translation.
    pub fn named(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The name this variable renders as.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variable({})", self.0)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out unique variable names for one translation.
///
/// Generated names are `<prefix><n>` with a single counter shared across all
/// prefixes (`this0`, `this1`, `var2`), matching the numbering readers expect
/// from generated Cypher. Reserved names are never produced by [`fresh`].
///
/// The authority uses interior mutability so that compilers can mint
/// variables through a shared reference. It is deliberately not `Sync`:
/// each translation owns its own authority.
///
/// [`fresh`]: NameAuthority::fresh
#[derive(Debug, Default)]
pub struct NameAuthority {
    counter: Cell<usize>,
    reserved: RefCell<HashSet<String>>,
}

impl NameAuthority {
    /// Create an authority with no reserved names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fixed name and return its variable.
    pub fn reserve(&self, name: &str) -> Variable {
        self.reserved.borrow_mut().insert(name.to_string());
        Variable::named(name)
    }

    /// Mint a new variable named `<prefix><n>`.
    pub fn fresh(&self, prefix: &str) -> Variable {
        loop {
            let n = self.counter.get();
            self.counter.set(n + 1);
            let name = format!("{prefix}{n}");
            if !self.reserved.borrow().contains(&name) {
                return Variable(Arc::from(name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_shares_counter_across_prefixes() {
        let names = NameAuthority::new();
        assert_eq!(names.fresh("this").name(), "this0");
        assert_eq!(names.fresh("this").name(), "this1");
        assert_eq!(names.fresh("var").name(), "var2");
    }

    #[test]
    fn test_fresh_skips_reserved_names() {
        let names = NameAuthority::new();
        names.reserve("var0");
        assert_eq!(names.fresh("var").name(), "var1");
    }

    #[test]
    fn test_clones_render_identically() {
        let names = NameAuthority::new();
        let a = names.fresh("this");
        let b = a.clone();
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "this0");
    }
}
