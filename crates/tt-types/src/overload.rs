//! Operator overload tables and resolution.

use crate::inheritance::EntityInheritance;
use crate::scope::TypeScope;
use crate::types::Type;
use crate::assignability::is_assignable;

/// One overload: parameter types (may contain `TypeVar`/polymorphic
/// `Measure`) and the concrete result type template.
#[derive(Clone, Debug)]
pub struct Signature {
    pub params: Vec<Type>,
    pub result: Type,
}

impl Signature {
    #[must_use]
    pub fn new(params: Vec<Type>, result: Type) -> Self {
        Signature { params, result }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverloadError {
    pub op: String,
    pub args: Vec<String>,
}

impl std::fmt::Display for OverloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid operator overload for `{}` with arguments ({})",
            self.op,
            self.args.join(", ")
        )
    }
}

/// The filter operators that must never silently cast entity kinds.
pub const FILTER_OPERATORS: &[&str] = &[
    "==",
    "!=",
    "<",
    "<=",
    ">",
    ">=",
    "=~",
    "~=",
    "starts_with",
    "ends_with",
    "contains",
    "in_array",
    "has_member",
    "group_member",
];

#[must_use]
pub fn is_filter_operator(op: &str) -> bool {
    FILTER_OPERATORS.contains(&op)
}

/// The overload table: for each operator, its candidate signatures in
/// declaration order — resolution tries them in that order, taking the
/// first signature that matches.
#[derive(Default)]
pub struct OverloadTable {
    operators: Vec<(String, Vec<Signature>)>,
    /// Operators for which Number<->Measure widening and entity-subtype
    /// casts are enabled.
    allow_cast: Vec<String>,
}

impl OverloadTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, op: &str, signatures: Vec<Signature>, allow_cast: bool) {
        self.operators.push((op.to_string(), signatures));
        if allow_cast {
            self.allow_cast.push(op.to_string());
        }
    }

    fn signatures_for(&self, op: &str) -> Option<&[Signature]> {
        self.operators
            .iter()
            .find(|(name, _)| name == op)
            .map(|(_, sigs)| sigs.as_slice())
    }

    /// Resolve `op` against `args`, trying each declared overload in
    /// order and returning the first whose parameters are all assignable
    /// from `args` under a *fresh* type scope.
    ///
    /// Filter operators never get entity-kind casting: even
    /// if the operator is registered with `allow_cast`, entity-to-entity
    /// mismatches are rejected unless one side is a genuine subtype.
    pub fn resolve(
        &self,
        op: &str,
        args: &[Type],
        inheritance: &EntityInheritance,
    ) -> Result<(Signature, Type), OverloadError> {
        let allow_cast = self.allow_cast.iter().any(|o| o == op);
        let Some(signatures) = self.signatures_for(op) else {
            return Err(OverloadError {
                op: op.to_string(),
                args: args.iter().map(ToString::to_string).collect(),
            });
        };

        for sig in signatures {
            if sig.params.len() != args.len() {
                continue;
            }
            let mut scope = TypeScope::new();
            let matched = sig
                .params
                .iter()
                .zip(args.iter())
                .all(|(param, arg)| is_assignable(arg, param, &mut scope, allow_cast, inheritance));
            if matched {
                let resolved_params = sig.params.iter().map(|p| scope.substitute(p)).collect();
                let resolved_result = scope.substitute(&sig.result);
                return Ok((
                    Signature::new(resolved_params, resolved_result.clone()),
                    resolved_result,
                ));
            }
        }

        Err(OverloadError {
            op: op.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OverloadTable {
        let mut t = OverloadTable::new();
        t.declare(
            "+",
            vec![
                Signature::new(vec![Type::Number, Type::Number], Type::Number),
                Signature::new(
                    vec![Type::Measure(String::new()), Type::Measure(String::new())],
                    Type::Measure(String::new()),
                ),
                Signature::new(vec![Type::String, Type::String], Type::String),
            ],
            true,
        );
        t.declare(
            "==",
            vec![Signature::new(
                vec![Type::TypeVar("a".into()), Type::TypeVar("a".into())],
                Type::Boolean,
            )],
            false,
        );
        t
    }

    #[test]
    fn resolves_first_matching_overload_in_order() {
        let t = table();
        let inh = EntityInheritance::new();
        let (_, result) = t.resolve("+", &[Type::Number, Type::Number], &inh).unwrap();
        assert_eq!(result, Type::Number);

        let (_, result) = t
            .resolve("+", &[Type::Measure("C".into()), Type::Measure("C".into())], &inh)
            .unwrap();
        assert_eq!(result, Type::Measure("C".into()));
    }

    #[test]
    fn unknown_operator_fails() {
        let t = table();
        let inh = EntityInheritance::new();
        assert!(t.resolve("frobnicate", &[Type::Number], &inh).is_err());
    }

    #[test]
    fn mismatched_arity_or_types_fails() {
        let t = table();
        let inh = EntityInheritance::new();
        assert!(t.resolve("+", &[Type::Number], &inh).is_err());
        assert!(t
            .resolve("+", &[Type::Boolean, Type::Boolean], &inh)
            .is_err());
    }

    #[test]
    fn equality_unifies_type_var_across_both_args() {
        let t = table();
        let inh = EntityInheritance::new();
        let (_, result) = t.resolve("==", &[Type::String, Type::String], &inh).unwrap();
        assert_eq!(result, Type::Boolean);
        assert!(t.resolve("==", &[Type::String, Type::Number], &inh).is_err());
    }

    #[test]
    fn filter_operator_list_matches_spec() {
        assert!(is_filter_operator("=~"));
        assert!(is_filter_operator("group_member"));
        assert!(!is_filter_operator("+"));
    }
}
