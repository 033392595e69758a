//! The mutable type scope threaded through assignability checks.
//!
//! Every call to `is_assignable` threads a `TypeScope` that maps
//! type-variable names (including the reserved `_unit` key) to the
//! concrete type they were bound to the first time they were seen. A
//! fresh `TypeScope` is used per overload-resolution attempt so a failed overload doesn't pollute the next one.

use crate::types::Type;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct TypeScope {
    bindings: FxHashMap<String, Type>,
}

impl TypeScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a binding for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Type> {
        self.bindings.get(name)
    }

    /// Bind `name` to `ty`. Returns `false` if `name` was already bound to
    /// a *different* type — the caller should treat that as an
    /// assignability failure (the type variable can't unify two distinct
    /// concrete types in the same scope).
    #[must_use]
    pub fn bind(&mut self, name: &str, ty: Type) -> bool {
        match self.bindings.get(name) {
            Some(existing) => existing == &ty,
            None => {
                self.bindings.insert(name.to_string(), ty);
                true
            }
        }
    }

    /// Substitute every bound type variable appearing in `ty` with its
    /// concrete binding, leaving unbound variables untouched.
    #[must_use]
    pub fn substitute(&self, ty: &Type) -> Type {
        match ty {
            Type::TypeVar(name) => self.bindings.get(name).cloned().unwrap_or_else(|| ty.clone()),
            Type::Measure(unit) if unit.is_empty() => {
                match self.bindings.get(Type::UNIT_SCOPE_KEY) {
                    Some(Type::Measure(u)) => Type::Measure(u.clone()),
                    _ => ty.clone(),
                }
            }
            Type::Array(elem) => Type::array(self.substitute(elem)),
            other => other.clone(),
        }
    }
}
