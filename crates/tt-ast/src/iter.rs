//! Primitive and slot iteration.
//!
//! Both could be lazy traversals over a `Program`; here they're collected
//! eagerly into a `Vec` and handed out through a plain `std::vec::IntoIter`
//! wrapper rather than a hand-rolled resumable state machine. A ThingTalk
//! program is small enough that the eager collection costs nothing, and
//! it sidesteps the "does this survive mutation mid-iteration" question
//! entirely: `iterate_slots` callers that rewrite a slot in place do so
//! after the walk has already finished, never during it.

use crate::action::{Action, Invocation, Selector};
use crate::boolean::BooleanExpression;
use crate::class::ExpressionSignature;
use crate::statement::{Declaration, DeclarationKind, Program, Statement};
use crate::stream::Stream;
use crate::table::Table;
use crate::value::Value;

/// An `External` filter's embedded invocation is inline (selector/channel/
/// in_params/schema), not a full `Invocation` node, so it
/// gets its own shape here rather than being force-fit into one.
pub struct ExternalInvocation<'a> {
    pub selector: &'a Selector,
    pub channel: &'a str,
    pub in_params: &'a [(String, Value)],
    pub schema: Option<&'a ExpressionSignature>,
}

/// One primitive found while walking a `Program`.
pub enum Primitive<'a> {
    Query(&'a Invocation),
    Action(&'a Invocation),
    Filter(ExternalInvocation<'a>),
}

/// Walk every statement of `program` collecting its primitives in
/// program order.
#[must_use]
pub fn iterate_primitives(program: &Program) -> std::vec::IntoIter<Primitive<'_>> {
    let mut out = Vec::new();
    for decl in &program.declarations {
        collect_decl_primitives(decl, &mut out);
    }
    for stmt in &program.rules {
        collect_stmt_primitives(stmt, &mut out);
    }
    out.into_iter()
}

fn collect_decl_primitives<'a>(decl: &'a Declaration, out: &mut Vec<Primitive<'a>>) {
    match &decl.kind {
        DeclarationKind::Stream(stream) => collect_stream_primitives(stream, out),
        DeclarationKind::Table(table) => collect_table_primitives(table, out),
        DeclarationKind::Procedure { statements } => {
            for stmt in statements {
                collect_stmt_primitives(stmt, out);
            }
        }
    }
}

fn collect_stmt_primitives<'a>(stmt: &'a Statement, out: &mut Vec<Primitive<'a>>) {
    match stmt {
        Statement::Declaration(decl) => collect_decl_primitives(decl, out),
        Statement::Assignment { table, .. } => collect_table_primitives(table, out),
        Statement::Rule(rule) => {
            collect_stream_primitives(&rule.stream, out);
            for action in &rule.actions {
                collect_action_primitives(action, out);
            }
        }
        Statement::Command { table, actions } => {
            if let Some(table) = table {
                collect_table_primitives(table, out);
            }
            for action in actions {
                collect_action_primitives(action, out);
            }
        }
        Statement::OnInputChoice(choice) => {
            for stmt in &choice.statements {
                collect_stmt_primitives(stmt, out);
            }
        }
    }
}

fn collect_action_primitives<'a>(action: &'a Action, out: &mut Vec<Primitive<'a>>) {
    if let Action::Invocation(inv) = action {
        out.push(Primitive::Action(inv));
        for (_, value) in &inv.in_params {
            collect_value_primitives(value, out);
        }
    }
}

fn collect_stream_primitives<'a>(stream: &'a Stream, out: &mut Vec<Primitive<'a>>) {
    match stream {
        Stream::VarRef(_) => {}
        Stream::Timer { base, interval, .. } => {
            collect_value_primitives(base, out);
            collect_value_primitives(interval, out);
        }
        Stream::AtTimer {
            times, expiration, ..
        } => {
            for t in times {
                collect_value_primitives(t, out);
            }
            if let Some(e) = expiration {
                collect_value_primitives(e, out);
            }
        }
        Stream::Monitor { table, .. } => collect_table_primitives(table, out),
        Stream::EdgeNew { stream, .. } => collect_stream_primitives(stream, out),
        Stream::EdgeFilter { stream, filter, .. } | Stream::Filter { stream, filter, .. } => {
            collect_stream_primitives(stream, out);
            collect_filter_primitives(filter, out);
        }
        Stream::Projection {
            stream,
            computations,
            ..
        } => {
            collect_stream_primitives(stream, out);
            for c in computations {
                collect_value_primitives(c, out);
            }
        }
        Stream::Compute { stream, value, .. } => {
            collect_stream_primitives(stream, out);
            collect_value_primitives(value, out);
        }
        Stream::Alias { stream, .. } => collect_stream_primitives(stream, out),
        Stream::Join {
            stream,
            table,
            in_params,
            ..
        } => {
            collect_stream_primitives(stream, out);
            collect_table_primitives(table, out);
            for (_, v) in in_params {
                collect_value_primitives(v, out);
            }
        }
    }
}

fn collect_table_primitives<'a>(table: &'a Table, out: &mut Vec<Primitive<'a>>) {
    match table {
        Table::VarRef(_) => {}
        Table::Invocation { invocation, .. } => {
            out.push(Primitive::Query(invocation));
            for (_, v) in &invocation.in_params {
                collect_value_primitives(v, out);
            }
        }
        Table::Filter { table, filter, .. } => {
            collect_table_primitives(table, out);
            collect_filter_primitives(filter, out);
        }
        Table::Projection {
            table, computations, ..
        } => {
            collect_table_primitives(table, out);
            for c in computations {
                collect_value_primitives(c, out);
            }
        }
        Table::Compute { table, value, .. } => {
            collect_table_primitives(table, out);
            collect_value_primitives(value, out);
        }
        Table::Alias { table, .. }
        | Table::Aggregation { table, .. }
        | Table::Sort { table, .. } => collect_table_primitives(table, out),
        Table::Index { table, indices, .. } => {
            collect_table_primitives(table, out);
            for i in indices {
                collect_value_primitives(i, out);
            }
        }
        Table::Slice {
            table, base, limit, ..
        } => {
            collect_table_primitives(table, out);
            collect_value_primitives(base, out);
            collect_value_primitives(limit, out);
        }
        Table::Join {
            lhs,
            rhs,
            in_params,
            ..
        } => {
            collect_table_primitives(lhs, out);
            collect_table_primitives(rhs, out);
            for (_, v) in in_params {
                collect_value_primitives(v, out);
            }
        }
    }
}

fn collect_filter_primitives<'a>(filter: &'a BooleanExpression, out: &mut Vec<Primitive<'a>>) {
    match filter {
        BooleanExpression::True
        | BooleanExpression::False
        | BooleanExpression::DontCare { .. } => {}
        BooleanExpression::And(ops) | BooleanExpression::Or(ops) => {
            for op in ops {
                collect_filter_primitives(op, out);
            }
        }
        BooleanExpression::Not(op) => collect_filter_primitives(op, out),
        BooleanExpression::Atom { value, .. } => collect_value_primitives(value, out),
        BooleanExpression::Compute { lhs, rhs, .. } => {
            collect_value_primitives(lhs, out);
            collect_value_primitives(rhs, out);
        }
        BooleanExpression::External {
            selector,
            channel,
            in_params,
            filter,
            schema,
        } => {
            out.push(Primitive::Filter(ExternalInvocation {
                selector,
                channel,
                in_params,
                schema: schema.as_ref(),
            }));
            for (_, v) in in_params {
                collect_value_primitives(v, out);
            }
            collect_filter_primitives(filter, out);
        }
    }
}

fn collect_value_primitives<'a>(value: &'a Value, out: &mut Vec<Primitive<'a>>) {
    match value {
        Value::ArrayValue(items) => {
            for item in items {
                collect_value_primitives(item, out);
            }
        }
        Value::Computation { operands, .. } => {
            for op in operands {
                collect_value_primitives(op, out);
            }
        }
        Value::ArrayFieldValue { value, .. } => collect_value_primitives(value, out),
        Value::FilterValue { value, filter } => {
            collect_value_primitives(value, out);
            collect_filter_primitives(filter, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, Invocation, Selector};
    use crate::boolean::BooleanExpression;
    use crate::statement::Statement;
    use crate::table::Table;
    use crate::value::Value;

    fn trivial_program() -> Program {
        let search = Invocation::new(Selector::device("com.twitter"), "search");
        let table = Table::Filter {
            table: Box::new(Table::Invocation {
                invocation: search,
                schema: None,
            }),
            filter: Box::new(BooleanExpression::atom("text", "=~", Value::String("cat".into()))),
            schema: None,
        };
        let mut program = Program::new();
        program.rules.push(Statement::Command {
            table: Some(table),
            actions: vec![Action::notify()],
        });
        program
    }

    #[test]
    fn iterate_primitives_yields_exactly_one_query() {
        let program = trivial_program();
        let prims: Vec<Primitive> = iterate_primitives(&program).collect();
        assert_eq!(prims.len(), 1);
        assert!(matches!(prims[0], Primitive::Query(inv) if inv.channel == "search"));
    }

    #[test]
    fn iterate_primitives_finds_external_filter_invocations() {
        let table = Table::Filter {
            table: Box::new(Table::Invocation {
                invocation: Invocation::new(Selector::device("com.twitter"), "search"),
                schema: None,
            }),
            filter: Box::new(BooleanExpression::External {
                selector: Selector::device("com.bing"),
                channel: "web_search".to_string(),
                in_params: Vec::new(),
                filter: Box::new(BooleanExpression::True),
                schema: None,
            }),
            schema: None,
        };
        let mut program = Program::new();
        program.rules.push(Statement::Command {
            table: Some(table),
            actions: vec![Action::notify()],
        });

        let prims: Vec<Primitive> = iterate_primitives(&program).collect();
        assert_eq!(prims.len(), 2);
        assert!(matches!(prims[0], Primitive::Query(_)));
        assert!(matches!(prims[1], Primitive::Filter(ref f) if f.channel == "web_search"));
    }

    #[test]
    fn iterate_slots_finds_an_undefined_input_param() {
        let mut invocation = Invocation::new(Selector::device("com.twitter"), "post");
        invocation.in_params.push(("status".to_string(), Value::Undefined { local: false }));
        let mut program = Program::new();
        program.rules.push(Statement::Command {
            table: None,
            actions: vec![Action::Invocation(invocation)],
        });

        let slots: Vec<Slot> = iterate_slots(&program).collect();
        assert_eq!(slots.len(), 1);
        assert!(matches!(slots[0].value, Value::Undefined { local: false }));
    }

    #[test]
    fn iterate_slots_on_trivial_program_finds_none() {
        let program = trivial_program();
        let slots: Vec<Slot> = iterate_slots(&program).collect();
        assert!(slots.is_empty());
    }
}

/// One slot found while walking a `Program`: a filter value still `Undefined`, tagged with the schema
/// and invocation it belongs to and the names already in scope at that
/// point.
pub struct Slot<'a> {
    pub schema: Option<&'a crate::class::ExpressionSignature>,
    pub prim: Option<&'a Invocation>,
    pub value: &'a Value,
    pub scope: Vec<String>,
}

/// Walk `program` collecting every `Value::Undefined` slot, in program
/// order, each tagged with the enclosing primitive's schema and the
/// output-parameter names already bound ahead of it.
#[must_use]
pub fn iterate_slots(program: &Program) -> std::vec::IntoIter<Slot<'_>> {
    let mut out = Vec::new();
    let mut scope = Vec::new();
    for decl in &program.declarations {
        collect_decl_slots(decl, &mut scope, &mut out);
    }
    for stmt in &program.rules {
        collect_stmt_slots(stmt, &mut scope, &mut out);
    }
    out.into_iter()
}

fn collect_decl_slots<'a>(
    decl: &'a Declaration,
    scope: &mut Vec<String>,
    out: &mut Vec<Slot<'a>>,
) {
    match &decl.kind {
        DeclarationKind::Stream(stream) => collect_stream_slots(stream, scope, out),
        DeclarationKind::Table(table) => collect_table_slots(table, scope, out),
        DeclarationKind::Procedure { statements } => {
            for stmt in statements {
                collect_stmt_slots(stmt, scope, out);
            }
        }
    }
}

fn collect_stmt_slots<'a>(stmt: &'a Statement, scope: &mut Vec<String>, out: &mut Vec<Slot<'a>>) {
    match stmt {
        Statement::Declaration(decl) => collect_decl_slots(decl, scope, out),
        Statement::Assignment { table, .. } => collect_table_slots(table, scope, out),
        Statement::Rule(rule) => {
            collect_stream_slots(&rule.stream, scope, out);
            for action in &rule.actions {
                collect_action_slots(action, None, scope, out);
            }
        }
        Statement::Command { table, actions } => {
            let schema = table.as_ref().and_then(Table::schema);
            if let Some(table) = table {
                collect_table_slots(table, scope, out);
            }
            for action in actions {
                collect_action_slots(action, schema, scope, out);
            }
        }
        Statement::OnInputChoice(choice) => {
            for stmt in &choice.statements {
                collect_stmt_slots(stmt, scope, out);
            }
        }
    }
}

fn collect_action_slots<'a>(
    action: &'a Action,
    table_schema: Option<&'a crate::class::ExpressionSignature>,
    scope: &mut Vec<String>,
    out: &mut Vec<Slot<'a>>,
) {
    if let Action::Invocation(inv) = action {
        let schema = inv.schema.as_ref().or(table_schema);
        for (_, value) in &inv.in_params {
            collect_value_slots(value, schema, Some(inv), scope, out);
        }
    }
}

fn collect_stream_slots<'a>(
    stream: &'a Stream,
    scope: &mut Vec<String>,
    out: &mut Vec<Slot<'a>>,
) {
    match stream {
        Stream::VarRef(_) => {}
        Stream::Timer { base, interval, .. } => {
            collect_value_slots(base, None, None, scope, out);
            collect_value_slots(interval, None, None, scope, out);
        }
        Stream::AtTimer {
            times, expiration, ..
        } => {
            for t in times {
                collect_value_slots(t, None, None, scope, out);
            }
            if let Some(e) = expiration {
                collect_value_slots(e, None, None, scope, out);
            }
        }
        Stream::Monitor { table, .. } => collect_table_slots(table, scope, out),
        Stream::EdgeNew { stream, .. } => collect_stream_slots(stream, scope, out),
        Stream::EdgeFilter { stream, filter, .. } | Stream::Filter { stream, filter, .. } => {
            collect_stream_slots(stream, scope, out);
            let schema = stream.schema();
            collect_filter_slots(filter, schema, None, scope, out);
        }
        Stream::Projection {
            stream,
            computations,
            ..
        } => {
            collect_stream_slots(stream, scope, out);
            for c in computations {
                collect_value_slots(c, stream.schema(), None, scope, out);
            }
        }
        Stream::Compute { stream, value, .. } => {
            collect_stream_slots(stream, scope, out);
            collect_value_slots(value, stream.schema(), None, scope, out);
        }
        Stream::Alias { stream, name, .. } => {
            collect_stream_slots(stream, scope, out);
            scope.push(name.clone());
        }
        Stream::Join {
            stream,
            table,
            in_params,
            ..
        } => {
            collect_stream_slots(stream, scope, out);
            collect_table_slots(table, scope, out);
            for (_, v) in in_params {
                collect_value_slots(v, stream.schema(), None, scope, out);
            }
        }
    }
    if let Some(schema) = stream.schema() {
        for arg in schema.out_args() {
            if !scope.iter().any(|n| n == &arg.name) {
                scope.push(arg.name.clone());
            }
        }
    }
}

fn collect_table_slots<'a>(table: &'a Table, scope: &mut Vec<String>, out: &mut Vec<Slot<'a>>) {
    match table {
        Table::VarRef(_) => {}
        Table::Invocation { invocation, .. } => {
            for (_, v) in &invocation.in_params {
                collect_value_slots(v, invocation.schema.as_ref(), Some(invocation), scope, out);
            }
        }
        Table::Filter { table, filter, .. } => {
            collect_table_slots(table, scope, out);
            let schema = table.schema();
            collect_filter_slots(filter, schema, None, scope, out);
        }
        Table::Projection {
            table, computations, ..
        } => {
            collect_table_slots(table, scope, out);
            for c in computations {
                collect_value_slots(c, table.schema(), None, scope, out);
            }
        }
        Table::Compute { table, value, .. } => {
            collect_table_slots(table, scope, out);
            collect_value_slots(value, table.schema(), None, scope, out);
        }
        Table::Alias { table, name, .. } => {
            collect_table_slots(table, scope, out);
            scope.push(name.clone());
        }
        Table::Aggregation { table, .. } | Table::Sort { table, .. } => {
            collect_table_slots(table, scope, out);
        }
        Table::Index { table, indices, .. } => {
            collect_table_slots(table, scope, out);
            for i in indices {
                collect_value_slots(i, table.schema(), None, scope, out);
            }
        }
        Table::Slice {
            table, base, limit, ..
        } => {
            collect_table_slots(table, scope, out);
            collect_value_slots(base, table.schema(), None, scope, out);
            collect_value_slots(limit, table.schema(), None, scope, out);
        }
        Table::Join {
            lhs,
            rhs,
            in_params,
            ..
        } => {
            collect_table_slots(lhs, scope, out);
            collect_table_slots(rhs, scope, out);
            for (_, v) in in_params {
                collect_value_slots(v, rhs.schema(), None, scope, out);
            }
        }
    }
    if let Some(schema) = table.schema() {
        for arg in schema.out_args() {
            if !scope.iter().any(|n| n == &arg.name) {
                scope.push(arg.name.clone());
            }
        }
    }
}

fn collect_filter_slots<'a>(
    filter: &'a BooleanExpression,
    schema: Option<&'a crate::class::ExpressionSignature>,
    prim: Option<&'a Invocation>,
    scope: &mut Vec<String>,
    out: &mut Vec<Slot<'a>>,
) {
    match filter {
        BooleanExpression::True
        | BooleanExpression::False
        | BooleanExpression::DontCare { .. } => {}
        BooleanExpression::And(ops) | BooleanExpression::Or(ops) => {
            for op in ops {
                collect_filter_slots(op, schema, prim, scope, out);
            }
        }
        BooleanExpression::Not(op) => collect_filter_slots(op, schema, prim, scope, out),
        BooleanExpression::Atom { value, .. } => {
            collect_value_slots(value, schema, prim, scope, out);
        }
        BooleanExpression::Compute { lhs, rhs, .. } => {
            collect_value_slots(lhs, schema, prim, scope, out);
            collect_value_slots(rhs, schema, prim, scope, out);
        }
        BooleanExpression::External {
            in_params,
            filter,
            schema: ext_schema,
            ..
        } => {
            for (_, v) in in_params {
                collect_value_slots(v, ext_schema.as_ref(), prim, scope, out);
            }
            collect_filter_slots(filter, ext_schema.as_ref(), prim, scope, out);
        }
    }
}

fn collect_value_slots<'a>(
    value: &'a Value,
    schema: Option<&'a crate::class::ExpressionSignature>,
    prim: Option<&'a Invocation>,
    scope: &mut Vec<String>,
    out: &mut Vec<Slot<'a>>,
) {
    match value {
        Value::Undefined { .. } => out.push(Slot {
            schema,
            prim,
            value,
            scope: scope.clone(),
        }),
        Value::ArrayValue(items) => {
            for item in items {
                collect_value_slots(item, schema, prim, scope, out);
            }
        }
        Value::Computation { operands, .. } => {
            for op in operands {
                collect_value_slots(op, schema, prim, scope, out);
            }
        }
        Value::ArrayFieldValue { value, .. } => {
            collect_value_slots(value, schema, prim, scope, out);
        }
        Value::FilterValue { value, filter } => {
            collect_value_slots(value, schema, prim, scope, out);
            collect_filter_slots(filter, schema, prim, scope, out);
        }
        _ => {}
    }
}
