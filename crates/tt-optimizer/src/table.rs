//! `Table` rewrites: filter-of-filter fusion,
//! filter/projection commute, and constant-false propagation.

use tt_ast::{BooleanExpression, Table};

use crate::boolean::optimize_boolean;

/// Optimize `table` in place. Returns whether it now statically produces
/// no rows (a `Filter` whose condition folded to `False`, or a combinator
/// wrapping such a table). A constant-`False` filter on a stream/table
/// deletes the node it's attached to; the caller (a `Statement`, or a
/// wrapping `Stream`) decides what "deletes" means at its level, since
/// `Table` itself has no empty variant to rewrite into.
pub fn optimize_table(table: &mut Table) -> bool {
    match table {
        Table::VarRef(_) => false,
        Table::Invocation { .. } => false,
        Table::Filter { table: inner, filter, .. } => {
            let inner_dead = optimize_table(inner);
            optimize_boolean(filter);

            // filter(filter(t, f), g) -> filter(t, f ∧ g)
            let fused = match inner.as_mut() {
                Table::Filter {
                    table: fused_table,
                    filter: fused_filter,
                    ..
                } => Some((
                    std::mem::replace(fused_table.as_mut(), Table::VarRef(String::new())),
                    std::mem::replace(fused_filter.as_mut(), BooleanExpression::True),
                )),
                _ => None,
            };
            if let Some((taken_table, taken_filter)) = fused {
                **inner = taken_table;
                *filter = Box::new(BooleanExpression::and(vec![taken_filter, (**filter).clone()]));
                optimize_boolean(filter);
            }

            // filter(project(t, a), f) -> project(filter(t, f), a) when f
            // references only names in a.
            let commuted = match inner.as_mut() {
                Table::Projection {
                    table: proj_table,
                    args,
                    computations,
                    schema,
                } => {
                    let mut names = Vec::new();
                    filter.referenced_names(&mut names);
                    if names.iter().all(|n| args.contains(n)) {
                        Some((
                            std::mem::replace(proj_table.as_mut(), Table::VarRef(String::new())),
                            args.clone(),
                            computations.clone(),
                            schema.clone(),
                        ))
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some((proj_inner, args, computations, schema)) = commuted {
                let moved_filter = std::mem::replace(filter.as_mut(), BooleanExpression::True);
                let new_filter_table = Table::Filter {
                    table: Box::new(proj_inner),
                    filter: Box::new(moved_filter),
                    schema: schema.clone(),
                };
                *table = Table::Projection {
                    table: Box::new(new_filter_table),
                    args,
                    computations,
                    schema,
                };
                return inner_dead;
            }

            inner_dead || filter.is_false()
        }
        Table::Projection { table: inner, .. } => optimize_table(inner),
        Table::Compute { table: inner, .. }
        | Table::Alias { table: inner, .. }
        | Table::Aggregation { table: inner, .. }
        | Table::Sort { table: inner, .. }
        | Table::Index { table: inner, .. }
        | Table::Slice { table: inner, .. } => optimize_table(inner),
        Table::Join { lhs, rhs, .. } => {
            let lhs_dead = optimize_table(lhs);
            let rhs_dead = optimize_table(rhs);
            lhs_dead || rhs_dead
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::{Invocation, Selector, Value};

    fn source_table() -> Table {
        Table::Invocation {
            invocation: Invocation::new(Selector::device("com.test"), "get"),
            schema: None,
        }
    }

    #[test]
    fn fuses_nested_filters() {
        let mut table = Table::Filter {
            table: Box::new(Table::Filter {
                table: Box::new(source_table()),
                filter: Box::new(BooleanExpression::atom("a", "==", Value::Number(1.0))),
                schema: None,
            }),
            filter: Box::new(BooleanExpression::atom("b", "==", Value::Number(2.0))),
            schema: None,
        };
        optimize_table(&mut table);
        match &table {
            Table::Filter { table: inner, filter, .. } => {
                assert!(matches!(inner.as_ref(), Table::Invocation { .. }));
                assert!(matches!(filter.as_ref(), BooleanExpression::And(ops) if ops.len() == 2));
            }
            other => panic!("expected a fused Filter, got {other:?}"),
        }
    }

    #[test]
    fn false_filter_is_reported_dead() {
        let mut table = Table::Filter {
            table: Box::new(source_table()),
            filter: Box::new(BooleanExpression::False),
            schema: None,
        };
        assert!(optimize_table(&mut table));
    }
}
