//! The concrete ThingTalk operator overload table.
//!
//! `tt_types::overload::OverloadTable` is generic; this module populates
//! one with the operators ThingTalk ships by default (the filter-operator
//! list, `+`/`-` arithmetic, `count`). It's illustrative of the shape
//! rather than an exhaustive reproduction of every builtin ThingTalk
//! overload — entity/enum-specific widenings a production catalogue would
//! add are left to the catalogue, not hardcoded here (see DESIGN.md).

use tt_types::{OverloadTable, Signature, Type};

fn type_var(name: &str) -> Type {
    Type::TypeVar(name.to_string())
}

#[must_use]
pub fn default_overload_table() -> OverloadTable {
    let mut table = OverloadTable::new();

    for op in ["==", "!="] {
        table.declare(
            op,
            vec![
                Signature::new(vec![Type::Number, Type::Number], Type::Boolean),
                Signature::new(
                    vec![Type::Measure(String::new()), Type::Measure(String::new())],
                    Type::Boolean,
                ),
                Signature::new(vec![type_var("a"), type_var("a")], Type::Boolean),
            ],
            false,
        );
    }

    for op in ["<", "<=", ">", ">="] {
        table.declare(
            op,
            vec![
                Signature::new(vec![Type::Number, Type::Number], Type::Boolean),
                Signature::new(
                    vec![Type::Measure(String::new()), Type::Measure(String::new())],
                    Type::Boolean,
                ),
                Signature::new(vec![Type::Date, Type::Date], Type::Boolean),
                Signature::new(vec![Type::Time, Type::Time], Type::Boolean),
                Signature::new(vec![Type::String, Type::String], Type::Boolean),
            ],
            false,
        );
    }

    for op in ["=~", "~=", "starts_with", "ends_with", "contains"] {
        table.declare(
            op,
            vec![Signature::new(vec![Type::String, Type::String], Type::Boolean)],
            false,
        );
    }

    for op in ["in_array", "has_member", "group_member"] {
        table.declare(
            op,
            vec![Signature::new(
                vec![type_var("a"), Type::array(type_var("a"))],
                Type::Boolean,
            )],
            false,
        );
    }

    table.declare(
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
    for op in ["-", "*", "/"] {
        table.declare(
            op,
            vec![
                Signature::new(vec![Type::Number, Type::Number], Type::Number),
                Signature::new(
                    vec![Type::Measure(String::new()), Type::Measure(String::new())],
                    Type::Measure(String::new()),
                ),
            ],
            true,
        );
    }

    table.declare(
        "count",
        vec![Signature::new(vec![Type::array(type_var("a"))], Type::Number)],
        false,
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_types::EntityInheritance;

    #[test]
    fn equality_resolves_numbers() {
        let table = default_overload_table();
        let inh = EntityInheritance::new();
        let (_, result) = table.resolve("==", &[Type::Number, Type::Number], &inh).unwrap();
        assert_eq!(result, Type::Boolean);
    }

    #[test]
    fn string_contains_rejects_non_strings() {
        let table = default_overload_table();
        let inh = EntityInheritance::new();
        assert!(table.resolve("=~", &[Type::Number, Type::String], &inh).is_err());
    }
}
