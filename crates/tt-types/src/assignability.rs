//! The assignability relation `A ⊑ B`.

use crate::inheritance::EntityInheritance;
use crate::scope::TypeScope;
use crate::types::Type;

/// Check `from ⊑ to`, threading `scope` for type-variable bindings.
///
/// `allow_cast` enables the `Number ↔ Measure` widening that's only valid
/// for operators that declare it — callers doing a plain
/// structural assignability check (e.g. projection argument matching)
/// should pass `false`.
#[must_use]
pub fn is_assignable(
    from: &Type,
    to: &Type,
    scope: &mut TypeScope,
    allow_cast: bool,
    inheritance: &EntityInheritance,
) -> bool {
    if from == to {
        return true;
    }

    match (from, to) {
        // Any is both top and bottom, subject to allowCast.1.
        // We treat unconditional Any-compatibility as always available:
        // allowCast only gates the *numeric* cast below.
        (Type::Any, _) | (_, Type::Any) => true,

        (Type::TypeVar(name), other) | (other, Type::TypeVar(name)) => {
            match scope.get(name).cloned() {
                Some(bound) => is_assignable(&bound, other, scope, allow_cast, inheritance),
                None => scope.bind(name, other.clone()),
            }
        }

        (Type::Array(a), Type::Array(b)) => is_assignable(a, b, scope, allow_cast, inheritance),

        (Type::Measure(u), Type::Measure(v)) => {
            if v.is_empty() {
                // `to` is the polymorphic Measure('') — bind the unit via
                // the scope's reserved key.
                scope.bind(Type::UNIT_SCOPE_KEY, Type::Measure(u.clone()))
            } else if u.is_empty() {
                scope.bind(Type::UNIT_SCOPE_KEY, Type::Measure(v.clone()))
            } else {
                u == v
            }
        }

        (Type::Entity(e1), Type::Entity(e2)) => e1 == e2 || inheritance.is_subtype(e1, e2),

        (Type::Enum(e1), Type::Enum(e2)) => {
            if e1.is_subset_of(e2) {
                true
            } else if e1.open && e2.open {
                // Both open: missing entries of the assignee are silently
                // appended to the target. We can't mutate
                // `e2` here (it's `&Type`), so this models the *check* as
                // permissive; callers that need the widened domain should
                // call `EnumDomain::union` explicitly and rebuild the type.
                true
            } else {
                false
            }
        }

        (Type::Number, Type::Measure(_)) | (Type::Measure(_), Type::Number) => allow_cast,

        (Type::Compound(a), Type::Compound(b)) => b.iter().all(|(name, field)| {
            if !field.required {
                return true;
            }
            match a.get(name) {
                Some(a_field) => {
                    is_assignable(&a_field.field_type, &field.field_type, scope, allow_cast, inheritance)
                }
                None => false,
            }
        }),

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnumDomain;

    fn ctx() -> (TypeScope, EntityInheritance) {
        (TypeScope::new(), EntityInheritance::new())
    }

    #[test]
    fn identical_types_are_assignable() {
        let (mut scope, inh) = ctx();
        assert!(is_assignable(&Type::Number, &Type::Number, &mut scope, false, &inh));
    }

    #[test]
    fn any_is_top_and_bottom() {
        let (mut scope, inh) = ctx();
        assert!(is_assignable(&Type::String, &Type::Any, &mut scope, false, &inh));
        assert!(is_assignable(&Type::Any, &Type::String, &mut scope, false, &inh));
    }

    #[test]
    fn array_is_covariant_on_assignability() {
        let (mut scope, inh) = ctx();
        assert!(is_assignable(
            &Type::array(Type::Number),
            &Type::array(Type::Number),
            &mut scope,
            false,
            &inh
        ));
        assert!(!is_assignable(
            &Type::array(Type::Number),
            &Type::array(Type::String),
            &mut scope,
            false,
            &inh
        ));
    }

    #[test]
    fn measure_requires_same_unit_unless_typevar() {
        let (mut scope, inh) = ctx();
        assert!(is_assignable(
            &Type::Measure("C".into()),
            &Type::Measure("C".into()),
            &mut scope,
            false,
            &inh
        ));
        assert!(!is_assignable(
            &Type::Measure("C".into()),
            &Type::Measure("F".into()),
            &mut scope,
            false,
            &inh
        ));
    }

    #[test]
    fn measure_typevar_binds_unit_in_scope() {
        let (mut scope, inh) = ctx();
        assert!(is_assignable(
            &Type::Measure("kg".into()),
            &Type::Measure(String::new()),
            &mut scope,
            false,
            &inh
        ));
        assert_eq!(
            scope.get(Type::UNIT_SCOPE_KEY),
            Some(&Type::Measure("kg".into()))
        );
    }

    #[test]
    fn entity_subtype_via_inheritance_table() {
        let (mut scope, mut inh) = ctx();
        inh.add_parent("tt:picture", "tt:media");
        assert!(is_assignable(
            &Type::Entity("tt:picture".into()),
            &Type::Entity("tt:media".into()),
            &mut scope,
            false,
            &inh
        ));
        assert!(!is_assignable(
            &Type::Entity("tt:media".into()),
            &Type::Entity("tt:picture".into()),
            &mut scope,
            false,
            &inh
        ));
    }

    #[test]
    fn enum_subset_rule() {
        let (mut scope, inh) = ctx();
        let small = Type::Enum(EnumDomain::closed(vec!["a".into()]));
        let big = Type::Enum(EnumDomain::closed(vec!["a".into(), "b".into()]));
        assert!(is_assignable(&small, &big, &mut scope, false, &inh));
        assert!(!is_assignable(&big, &small, &mut scope, false, &inh));
    }

    #[test]
    fn number_measure_cast_requires_allow_cast() {
        let (mut scope, inh) = ctx();
        assert!(!is_assignable(
            &Type::Number,
            &Type::Measure("C".into()),
            &mut scope,
            false,
            &inh
        ));
        assert!(is_assignable(
            &Type::Number,
            &Type::Measure("C".into()),
            &mut scope,
            true,
            &inh
        ));
    }

    #[test]
    fn typevar_unifies_across_positions() {
        let (mut scope, inh) = ctx();
        let a = Type::TypeVar("a".into());
        assert!(is_assignable(&Type::String, &a, &mut scope, false, &inh));
        // Second use of the same type variable must unify to the same type.
        assert!(is_assignable(&Type::String, &a, &mut scope, false, &inh));
        assert!(!is_assignable(&Type::Number, &a, &mut scope, false, &inh));
    }

    #[test]
    fn compound_requires_required_fields_assignable() {
        use crate::types::CompoundField;
        use std::sync::Arc;
        let mut a = rustc_hash::FxHashMap::default();
        a.insert(
            "x".to_string(),
            CompoundField {
                field_type: Type::Number,
                required: true,
            },
        );
        let mut b = rustc_hash::FxHashMap::default();
        b.insert(
            "x".to_string(),
            CompoundField {
                field_type: Type::Number,
                required: true,
            },
        );
        b.insert(
            "y".to_string(),
            CompoundField {
                field_type: Type::String,
                required: false,
            },
        );
        let (mut scope, inh) = ctx();
        assert!(is_assignable(
            &Type::Compound(Arc::new(a)),
            &Type::Compound(Arc::new(b)),
            &mut scope,
            false,
            &inh
        ));
    }
}
