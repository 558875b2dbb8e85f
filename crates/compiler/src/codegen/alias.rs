//! Scope aliasing for the target machine
//!
//! BIP has no lexical scoping, so every source-scope binding of an
//! identifier materialises as a distinct `.data` label: `<name>_s<depth>`
//! for the first binding at a depth, `<name>_s<depth>_<n>` for later ones.
//! Resolution picks the nearest-enclosing declaration for a reference:
//! the binding must have been declared earlier, its block span must still
//! contain the reference, and among the survivors the greatest scope depth
//! wins, ties broken towards the latest declaration.

#[derive(Debug, Clone)]
pub(crate) struct AliasEntry {
    pub original: String,
    pub alias: String,
    pub scope_depth: i32,
    pub position: usize,
    /// Position of the delimiter closing the binding's scope
    pub scope_end: usize,
}

#[derive(Debug, Default)]
pub(crate) struct AliasTable {
    entries: Vec<AliasEntry>,
}

impl AliasTable {
    pub fn new() -> Self {
        AliasTable::default()
    }

    /// Register a declaration and return its alias.
    pub fn register(
        &mut self,
        name: &str,
        scope_depth: i32,
        position: usize,
        scope_end: usize,
    ) -> String {
        let occurrence = self
            .entries
            .iter()
            .filter(|e| e.original == name && e.scope_depth == scope_depth)
            .count();
        let alias = if occurrence == 0 {
            format!("{}_s{}", name, scope_depth)
        } else {
            format!("{}_s{}_{}", name, scope_depth, occurrence + 1)
        };
        self.entries.push(AliasEntry {
            original: name.to_string(),
            alias: alias.clone(),
            scope_depth,
            position,
            scope_end,
        });
        alias
    }

    /// Resolve a reference to `name` at `position` with lexical depth
    /// `depth`. `None` when no enclosing declaration is visible there.
    pub fn resolve(&self, name: &str, position: usize, depth: i32) -> Option<&str> {
        self.entries
            .iter()
            .filter(|e| {
                e.original == name
                    && e.scope_depth <= depth
                    && e.position <= position
                    && position <= e.scope_end
            })
            .max_by_key(|e| (e.scope_depth, e.position))
            .map(|e| e.alias.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP: usize = usize::MAX;

    #[test]
    fn test_first_binding_per_depth() {
        let mut table = AliasTable::new();
        assert_eq!(table.register("x", 0, 4, TOP), "x_s0");
        assert_eq!(table.register("x", 1, 20, 60), "x_s1");
        assert_eq!(table.register("y", 1, 30, 60), "y_s1");
    }

    #[test]
    fn test_repeated_binding_at_same_depth() {
        let mut table = AliasTable::new();
        table.register("x", 1, 10, 40);
        assert_eq!(table.register("x", 1, 50, 90), "x_s1_2");
        assert_eq!(table.register("x", 1, 100, 140), "x_s1_3");
    }

    #[test]
    fn test_resolution_prefers_deepest_enclosing() {
        let mut table = AliasTable::new();
        table.register("x", 0, 0, TOP);
        table.register("x", 1, 20, 60);
        assert_eq!(table.resolve("x", 40, 1), Some("x_s1"));
        assert_eq!(table.resolve("x", 40, 0), Some("x_s0"));
        // Before the inner declaration only the outer binding exists.
        assert_eq!(table.resolve("x", 10, 1), Some("x_s0"));
    }

    #[test]
    fn test_resolution_ignores_closed_scopes() {
        let mut table = AliasTable::new();
        table.register("x", 0, 0, TOP);
        table.register("x", 1, 20, 44);
        // Past the inner block's close, only the outer binding encloses,
        // whatever the reference's own paren depth is.
        assert_eq!(table.resolve("x", 50, 1), Some("x_s0"));
        assert_eq!(table.resolve("x", 40, 2), Some("x_s1"));
    }

    #[test]
    fn test_resolution_ties_break_to_latest() {
        let mut table = AliasTable::new();
        table.register("x", 1, 10, 200);
        table.register("x", 1, 50, 200);
        assert_eq!(table.resolve("x", 80, 1), Some("x_s1_2"));
        assert_eq!(table.resolve("x", 30, 1), Some("x_s1"));
    }

    #[test]
    fn test_unknown_name_unresolved() {
        let table = AliasTable::new();
        assert_eq!(table.resolve("ghost", 10, 3), None);
    }
}
