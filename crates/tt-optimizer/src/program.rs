//! `Program`-level optimization: "A rule whose action list
//! is empty is deleted; a program with no rules becomes `None`."
//!
//! The `None` case is the caller's to express — `Program` itself always
//! has a `rules: Vec<Statement>`, so this returns whether it ended up
//! empty and leaves turning that into `Option<Program>` to the façade.

use tracing::warn;
use tt_ast::{Declaration, DeclarationKind, OnInputChoice, Program, Rule, Statement};
use tt_common::limits::MAX_OPTIMIZER_PASSES;

use crate::stream::optimize_stream;
use crate::table::optimize_table;

/// Optimize every declaration and rule in `program` to a fixed point,
/// deleting statements that became dead. Returns
/// whether the program now has no rules left.
///
/// Each rewrite rule is locally confluent under the recursive bottom-up
/// traversal `optimize_statement` already performs, so one pass normally
/// suffices; the outer loop and [`MAX_OPTIMIZER_PASSES`] cap are a
/// termination backstop for rewrites that interact across passes, not the
/// expected exit path.
pub fn optimize_program(program: &mut Program) -> bool {
    for decl in &mut program.declarations {
        optimize_declaration(decl);
    }

    let mut passes = 0;
    loop {
        let before = program.rules.clone();
        let mut i = 0;
        while i < program.rules.len() {
            if optimize_statement(&mut program.rules[i]) {
                program.rules.remove(i);
            } else {
                i += 1;
            }
        }
        passes += 1;
        if program.rules == before {
            break;
        }
        if passes >= MAX_OPTIMIZER_PASSES {
            warn!(passes, "optimizer did not reach a fixed point within the pass budget");
            break;
        }
    }
    program.rules.is_empty()
}

fn optimize_declaration(decl: &mut Declaration) {
    match &mut decl.kind {
        DeclarationKind::Stream(stream) => {
            optimize_stream(stream);
        }
        DeclarationKind::Table(table) => {
            optimize_table(table);
        }
        DeclarationKind::Procedure { statements } => retain_live_statements(statements),
    }
}

/// Optimize one top-level statement, returning whether it should be
/// deleted: its stream/table source folded to a statically-empty result,
/// or its action list is now empty.
fn optimize_statement(stmt: &mut Statement) -> bool {
    match stmt {
        Statement::Declaration(decl) => {
            optimize_declaration(decl);
            false
        }
        Statement::Assignment { table, .. } => {
            optimize_table(table);
            false
        }
        Statement::Rule(Rule { stream, actions }) => {
            let dead = optimize_stream(stream);
            dead || actions.is_empty()
        }
        Statement::Command { table, actions } => {
            let dead = table.as_mut().is_some_and(|t| optimize_table(t));
            dead || actions.is_empty()
        }
        Statement::OnInputChoice(OnInputChoice { statements, .. }) => {
            retain_live_statements(statements);
            false
        }
    }
}

fn retain_live_statements(statements: &mut Vec<Statement>) {
    let mut i = 0;
    while i < statements.len() {
        if optimize_statement(&mut statements[i]) {
            statements.remove(i);
        } else {
            i += 1;
        }
    }
}
