//! Schema pre-loading: "Walk the AST collecting
//! every primitive (Invocation, VarRef*, External). Batch-resolve all
//! schemas through the retriever."

use tt_ast::iter::{iterate_primitives, Primitive};
use tt_ast::{Program, Selector};

use crate::driver::{BUILTIN_CLASS, CANONICAL_REMOTE_CLASS};

fn selector_kind(selector: &Selector) -> String {
    match selector {
        Selector::Builtin => BUILTIN_CLASS.to_string(),
        Selector::Device { kind, .. } if kind == "remote" => CANONICAL_REMOTE_CLASS.to_string(),
        Selector::Device { kind, .. } => kind.clone(),
    }
}

/// Every distinct device kind a program's primitives (queries, actions,
/// `External` get-predicates) need a schema for.
#[must_use]
pub fn collect_kinds(program: &Program) -> Vec<String> {
    let mut kinds = Vec::new();
    for primitive in iterate_primitives(program) {
        let kind = match primitive {
            Primitive::Query(inv) | Primitive::Action(inv) => selector_kind(&inv.selector),
            Primitive::Filter(ext) => selector_kind(ext.selector),
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::{Action, Invocation, Statement};

    #[test]
    fn collect_kinds_dedupes_and_rewrites_remote_selectors() {
        let mut program = Program::new();
        program.rules.push(Statement::Command {
            table: None,
            actions: vec![
                Action::Invocation(Invocation::new(Selector::device("com.twitter"), "post")),
                Action::Invocation(Invocation::new(Selector::device("com.twitter"), "post")),
                Action::Invocation(Invocation::new(Selector::device("remote"), "send")),
                Action::Invocation(Invocation::new(Selector::Builtin, "notify")),
            ],
        });

        let kinds = collect_kinds(&program);
        assert_eq!(
            kinds,
            vec![
                "com.twitter".to_string(),
                CANONICAL_REMOTE_CLASS.to_string(),
                BUILTIN_CLASS.to_string(),
            ]
        );
    }
}
