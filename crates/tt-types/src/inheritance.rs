//! The entity inheritance table.
//!
//! `e1 <: e2` is modeled as a DAG of direct-parent edges with a
//! transitive `is_subtype` query — the minimal structure the
//! assignability and class-inheritance rules actually need.

use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Clone, Debug, Default)]
pub struct EntityInheritance {
    /// entity -> its direct parents.
    parents: FxHashMap<String, Vec<String>>,
}

impl EntityInheritance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parent(&mut self, entity: &str, parent: &str) {
        self.parents
            .entry(entity.to_string())
            .or_default()
            .push(parent.to_string());
    }

    /// `e1 <: e2`, reflexive and transitive.
    #[must_use]
    pub fn is_subtype(&self, e1: &str, e2: &str) -> bool {
        if e1 == e2 {
            return true;
        }
        let mut seen = FxHashSet::default();
        let mut stack = vec![e1.to_string()];
        while let Some(current) = stack.pop() {
            if current == e2 {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.parents.get(&current) {
                stack.extend(parents.iter().cloned());
            }
        }
        false
    }
}
