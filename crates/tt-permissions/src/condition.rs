//! Turning AST shapes into the boolean conditions the per-rule transform
//! algorithm reasons about.

use rustc_hash::FxHashMap;
use tt_ast::{BooleanExpression, PermissionFunction, PermissionRule, Statement, Stream, Table, Value};

/// The conjunction of every filter reachable in a rule's stream/table
/// pipeline. A rule
/// with no filters at all encodes to `True` — it's allowed to run
/// unconditionally as far as its own shape is concerned; permission
/// restrictions are what the rest of the algorithm adds.
#[must_use]
pub fn rule_filter(stmt: &Statement) -> BooleanExpression {
    let mut filters = Vec::new();
    match stmt {
        Statement::Rule(rule) => gather_stream_filters(&rule.stream, &mut filters),
        Statement::Command { table: Some(table), .. } => gather_table_filters(table, &mut filters),
        _ => {}
    }
    BooleanExpression::and(filters)
}

fn gather_stream_filters(stream: &Stream, out: &mut Vec<BooleanExpression>) {
    match stream {
        Stream::VarRef(_) | Stream::Timer { .. } | Stream::AtTimer { .. } => {}
        Stream::Monitor { table, .. } => gather_table_filters(table, out),
        Stream::Filter { stream, filter, .. } | Stream::EdgeFilter { stream, filter, .. } => {
            gather_stream_filters(stream, out);
            out.push((**filter).clone());
        }
        Stream::EdgeNew { stream, .. }
        | Stream::Projection { stream, .. }
        | Stream::Compute { stream, .. }
        | Stream::Alias { stream, .. } => gather_stream_filters(stream, out),
        Stream::Join { stream, table, .. } => {
            gather_stream_filters(stream, out);
            gather_table_filters(table, out);
        }
    }
}

fn gather_table_filters(table: &Table, out: &mut Vec<BooleanExpression>) {
    match table {
        Table::VarRef(_) | Table::Invocation { .. } => {}
        Table::Filter { table, filter, .. } => {
            gather_table_filters(table, out);
            out.push((**filter).clone());
        }
        Table::Projection { table, .. }
        | Table::Compute { table, .. }
        | Table::Alias { table, .. }
        | Table::Aggregation { table, .. }
        | Table::Sort { table, .. }
        | Table::Index { table, .. }
        | Table::Slice { table, .. } => gather_table_filters(table, out),
        Table::Join { lhs, rhs, .. } => {
            gather_table_filters(lhs, out);
            gather_table_filters(rhs, out);
        }
    }
}

/// A policy's full condition: its principal filter conjoined with
/// whichever of its query/action sides are `Specified`.
#[must_use]
pub fn permission_condition(rule: &PermissionRule) -> BooleanExpression {
    let mut parts = vec![rule.principal_filter.clone()];
    if let PermissionFunction::Specified { filter, .. } = &rule.query {
        parts.push(filter.clone());
    }
    if let PermissionFunction::Specified { filter, .. } = &rule.action {
        parts.push(filter.clone());
    }
    BooleanExpression::and(parts)
}

/// The query-side filter alone — the "precondition" the adjust pass asks
/// whether the program implies.
#[must_use]
pub fn precondition(rule: &PermissionRule) -> BooleanExpression {
    match &rule.query {
        PermissionFunction::Specified { filter, .. } => filter.clone(),
        _ => BooleanExpression::True,
    }
}

/// The action-side filter alone — the "postcondition."
#[must_use]
pub fn postcondition(rule: &PermissionRule) -> BooleanExpression {
    match &rule.action {
        PermissionFunction::Specified { filter, .. } => filter.clone(),
        _ => BooleanExpression::True,
    }
}

/// Names bound to a known constant by a top-level equality in `filter`
///. Only the shallow `And`
/// spine is inspected — a constant bound inside an `Or` branch isn't
/// known unconditionally, so it's conservatively left out.
#[must_use]
pub fn known_bindings(filter: &BooleanExpression) -> FxHashMap<String, Value> {
    let mut out = FxHashMap::default();
    collect_bindings(filter, &mut out);
    out
}

fn collect_bindings(filter: &BooleanExpression, out: &mut FxHashMap<String, Value>) {
    match filter {
        BooleanExpression::And(ops) => {
            for op in ops {
                collect_bindings(op, out);
            }
        }
        BooleanExpression::Atom { name, operator, value, .. }
            if operator == "==" && value.is_constant() =>
        {
            out.insert(name.clone(), value.clone());
        }
        _ => {}
    }
}

/// Partially evaluate `filter` against `known`:
/// an atom whose name is bound folds to a literal truth value when the
/// comparison is decidable; an atom whose name is still unknown is
/// dropped (folded to `True`) since the policy can't be evaluated for it
/// yet and a conservative drop keeps the residual sound without the
/// parameter.
#[must_use]
pub fn partial_eval(filter: &BooleanExpression, known: &FxHashMap<String, Value>) -> BooleanExpression {
    match filter {
        BooleanExpression::True | BooleanExpression::False | BooleanExpression::DontCare { .. } => {
            filter.clone()
        }
        BooleanExpression::And(ops) => {
            BooleanExpression::and(ops.iter().map(|op| partial_eval(op, known)).collect())
        }
        BooleanExpression::Or(ops) => {
            BooleanExpression::or(ops.iter().map(|op| partial_eval(op, known)).collect())
        }
        BooleanExpression::Not(op) => BooleanExpression::not(partial_eval(op, known)),
        BooleanExpression::Atom { name, operator, value, .. } => match known.get(name) {
            Some(bound) if operator == "==" && value.is_constant() => {
                if values_equal(bound, value) {
                    BooleanExpression::True
                } else {
                    BooleanExpression::False
                }
            }
            Some(_) => filter.clone(),
            None => BooleanExpression::True,
        },
        BooleanExpression::Compute { .. } | BooleanExpression::External { .. } => filter.clone(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Enum(a), Value::Enum(b)) => a == b,
        (Value::Entity { id: a, .. }, Value::Entity { id: b, .. }) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::{Action, Invocation, Rule, Selector};

    #[test]
    fn rule_filter_gathers_nested_stream_filters() {
        let stmt = Statement::Rule(Rule {
            stream: Stream::Filter {
                stream: Box::new(Stream::Monitor {
                    table: Box::new(Table::Invocation {
                        invocation: Invocation::new(Selector::device("com.test"), "get"),
                        schema: None,
                    }),
                    args: None,
                    schema: None,
                }),
                filter: Box::new(BooleanExpression::atom("x", "==", Value::Number(1.0))),
                schema: None,
            },
            actions: vec![Action::notify()],
        });
        let filter = rule_filter(&stmt);
        assert!(matches!(filter, BooleanExpression::Atom { .. }));
    }

    #[test]
    fn partial_eval_folds_known_equality_and_drops_unknown() {
        let mut known = FxHashMap::default();
        known.insert("flow".to_string(), Value::Number(3.0));
        let filter = BooleanExpression::and(vec![
            BooleanExpression::atom("flow", "==", Value::Number(3.0)),
            BooleanExpression::atom("other", "==", Value::Number(9.0)),
        ]);
        let residual = partial_eval(&filter, &known);
        assert!(matches!(residual, BooleanExpression::And(ops) if ops.len() == 2
            && ops[0].is_true() && ops[1].is_true()));
    }

    #[test]
    fn partial_eval_detects_contradiction() {
        let mut known = FxHashMap::default();
        known.insert("flow".to_string(), Value::Number(3.0));
        let filter = BooleanExpression::atom("flow", "==", Value::Number(4.0));
        assert!(partial_eval(&filter, &known).is_false());
    }
}
