//! A single polymorphic `visit` free function with `enter`/`exit` hooks.
//!
//! Rather than an inheritance-with-overrides scheme, callers implement
//! `Visitor` (all methods default to "continue") and pass it to
//! `walk_program`/`walk_statement`/etc. Returning `false` from a
//! `visit_*` hook stops descent into that node's children — the pattern
//! `tt-checker`'s dispatch doesn't use this (it needs return values from
//! each child to build a parent's schema — see `tt-checker::dispatch`),
//! but the optimizer's analysis passes and the primitive/slot iterators
//! in `iter.rs` both do.

use crate::action::Action;
use crate::boolean::BooleanExpression;
use crate::statement::{Declaration, DeclarationKind, Program, Rule, Statement};
use crate::stream::Stream;
use crate::table::Table;
use crate::value::Value;

#[allow(unused_variables)]
pub trait Visitor {
    fn enter_program(&mut self, program: &Program) {}
    fn exit_program(&mut self, program: &Program) {}

    fn visit_stream(&mut self, stream: &Stream) -> bool {
        true
    }
    fn visit_table(&mut self, table: &Table) -> bool {
        true
    }
    fn visit_action(&mut self, action: &Action) -> bool {
        true
    }
    fn visit_boolean_expression(&mut self, expr: &BooleanExpression) -> bool {
        true
    }
    fn visit_value(&mut self, value: &Value) -> bool {
        true
    }
}

pub fn walk_program(program: &Program, visitor: &mut impl Visitor) {
    visitor.enter_program(program);
    for decl in &program.declarations {
        walk_declaration(decl, visitor);
    }
    for stmt in &program.rules {
        walk_statement(stmt, visitor);
    }
    visitor.exit_program(program);
}

pub fn walk_declaration(decl: &Declaration, visitor: &mut impl Visitor) {
    match &decl.kind {
        DeclarationKind::Stream(stream) => walk_stream(stream, visitor),
        DeclarationKind::Table(table) => walk_table(table, visitor),
        DeclarationKind::Procedure { statements } => {
            for stmt in statements {
                walk_statement(stmt, visitor);
            }
        }
    }
}

pub fn walk_statement(stmt: &Statement, visitor: &mut impl Visitor) {
    match stmt {
        Statement::Declaration(decl) => walk_declaration(decl, visitor),
        Statement::Assignment { table, .. } => walk_table(table, visitor),
        Statement::Rule(Rule { stream, actions }) => {
            walk_stream(stream, visitor);
            for action in actions {
                walk_action(action, visitor);
            }
        }
        Statement::Command { table, actions } => {
            if let Some(table) = table {
                walk_table(table, visitor);
            }
            for action in actions {
                walk_action(action, visitor);
            }
        }
        Statement::OnInputChoice(choice) => {
            for stmt in &choice.statements {
                walk_statement(stmt, visitor);
            }
        }
    }
}

pub fn walk_action(action: &Action, visitor: &mut impl Visitor) {
    if !visitor.visit_action(action) {
        return;
    }
    if let Action::Invocation(inv) = action {
        for (_, value) in &inv.in_params {
            walk_value(value, visitor);
        }
    }
}

pub fn walk_stream(stream: &Stream, visitor: &mut impl Visitor) {
    if !visitor.visit_stream(stream) {
        return;
    }
    match stream {
        Stream::VarRef(_) => {}
        Stream::Timer { base, interval, .. } => {
            walk_value(base, visitor);
            walk_value(interval, visitor);
        }
        Stream::AtTimer {
            times, expiration, ..
        } => {
            for t in times {
                walk_value(t, visitor);
            }
            if let Some(e) = expiration {
                walk_value(e, visitor);
            }
        }
        Stream::Monitor { table, .. } => walk_table(table, visitor),
        Stream::EdgeNew { stream, .. } => walk_stream(stream, visitor),
        Stream::EdgeFilter { stream, filter, .. } | Stream::Filter { stream, filter, .. } => {
            walk_stream(stream, visitor);
            walk_boolean(filter, visitor);
        }
        Stream::Projection {
            stream,
            computations,
            ..
        } => {
            walk_stream(stream, visitor);
            for c in computations {
                walk_value(c, visitor);
            }
        }
        Stream::Compute { stream, value, .. } => {
            walk_stream(stream, visitor);
            walk_value(value, visitor);
        }
        Stream::Alias { stream, .. } => walk_stream(stream, visitor),
        Stream::Join {
            stream,
            table,
            in_params,
            ..
        } => {
            walk_stream(stream, visitor);
            walk_table(table, visitor);
            for (_, v) in in_params {
                walk_value(v, visitor);
            }
        }
    }
}

pub fn walk_table(table: &Table, visitor: &mut impl Visitor) {
    if !visitor.visit_table(table) {
        return;
    }
    match table {
        Table::VarRef(_) => {}
        Table::Invocation { invocation, .. } => {
            for (_, v) in &invocation.in_params {
                walk_value(v, visitor);
            }
        }
        Table::Filter { table, filter, .. } => {
            walk_table(table, visitor);
            walk_boolean(filter, visitor);
        }
        Table::Projection {
            table, computations, ..
        } => {
            walk_table(table, visitor);
            for c in computations {
                walk_value(c, visitor);
            }
        }
        Table::Compute { table, value, .. } => {
            walk_table(table, visitor);
            walk_value(value, visitor);
        }
        Table::Alias { table, .. } => walk_table(table, visitor),
        Table::Aggregation { table, .. } => walk_table(table, visitor),
        Table::Sort { table, .. } => walk_table(table, visitor),
        Table::Index { table, indices, .. } => {
            walk_table(table, visitor);
            for i in indices {
                walk_value(i, visitor);
            }
        }
        Table::Slice {
            table, base, limit, ..
        } => {
            walk_table(table, visitor);
            walk_value(base, visitor);
            walk_value(limit, visitor);
        }
        Table::Join {
            lhs, rhs, in_params, ..
        } => {
            walk_table(lhs, visitor);
            walk_table(rhs, visitor);
            for (_, v) in in_params {
                walk_value(v, visitor);
            }
        }
    }
}

pub fn walk_boolean(expr: &BooleanExpression, visitor: &mut impl Visitor) {
    if !visitor.visit_boolean_expression(expr) {
        return;
    }
    match expr {
        BooleanExpression::True | BooleanExpression::False | BooleanExpression::DontCare { .. } => {}
        BooleanExpression::And(ops) | BooleanExpression::Or(ops) => {
            for op in ops {
                walk_boolean(op, visitor);
            }
        }
        BooleanExpression::Not(op) => walk_boolean(op, visitor),
        BooleanExpression::Atom { value, .. } => walk_value(value, visitor),
        BooleanExpression::Compute { lhs, rhs, .. } => {
            walk_value(lhs, visitor);
            walk_value(rhs, visitor);
        }
        BooleanExpression::External {
            in_params, filter, ..
        } => {
            for (_, v) in in_params {
                walk_value(v, visitor);
            }
            walk_boolean(filter, visitor);
        }
    }
}

pub fn walk_value(value: &Value, visitor: &mut impl Visitor) {
    if !visitor.visit_value(value) {
        return;
    }
    match value {
        Value::ArrayValue(items) => {
            for item in items {
                walk_value(item, visitor);
            }
        }
        Value::Computation { operands, .. } => {
            for op in operands {
                walk_value(op, visitor);
            }
        }
        Value::ArrayFieldValue { value, .. } => walk_value(value, visitor),
        Value::FilterValue { value, filter } => {
            walk_value(value, visitor);
            walk_boolean(filter, visitor);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Invocation, Selector};
    use crate::value::Value;

    struct CountingVisitor {
        tables: usize,
        booleans: usize,
        values: usize,
    }

    impl Visitor for CountingVisitor {
        fn visit_table(&mut self, _table: &Table) -> bool {
            self.tables += 1;
            true
        }
        fn visit_boolean_expression(&mut self, _expr: &BooleanExpression) -> bool {
            self.booleans += 1;
            true
        }
        fn visit_value(&mut self, _value: &Value) -> bool {
            self.values += 1;
            true
        }
    }

    #[test]
    fn walk_table_visits_the_filter_and_its_child() {
        let table = Table::Filter {
            table: Box::new(Table::Invocation {
                invocation: Invocation::new(Selector::device("com.twitter"), "search"),
                schema: None,
            }),
            filter: Box::new(BooleanExpression::atom("text", "=~", Value::String("cat".into()))),
            schema: None,
        };

        let mut visitor = CountingVisitor {
            tables: 0,
            booleans: 0,
            values: 0,
        };
        walk_table(&table, &mut visitor);

        assert_eq!(visitor.tables, 2);
        assert_eq!(visitor.booleans, 1);
        assert_eq!(visitor.values, 1);
    }

    struct StoppingVisitor;

    impl Visitor for StoppingVisitor {
        fn visit_table(&mut self, _table: &Table) -> bool {
            false
        }
    }

    #[test]
    fn returning_false_stops_descent() {
        let table = Table::Invocation {
            invocation: Invocation::new(Selector::device("com.twitter"), "search"),
            schema: None,
        };
        // Should not panic even though the invocation's children are never
        // visited.
        walk_table(&table, &mut StoppingVisitor);
    }
}
