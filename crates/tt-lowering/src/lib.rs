//! Remote lowering: splitting a program that runs on
//! behalf of a remote principal into a local "send" half and a
//! companion "our rule" program that receives the result and runs the
//! original `notify`.
//!
//! This is a pure AST rewrite with no solver/schema dependency — it runs
//! after typechecking and permission checking have already settled the
//! program's shape: transform only once every earlier pass has committed
//! to a shape.

use rustc_hash::FxHashMap;
use tt_ast::{
    Action, ArgDirection, ArgumentDef, ClassDef, ExpressionSignature, FunctionDef, FunctionKind,
    Invocation, Program, Rule, Selector, Statement, Stream, Table, Value,
};
use tt_types::Type;

/// Mirrors `tt_checker::driver::CANONICAL_REMOTE_CLASS`. Duplicated rather
/// than depending on `tt-checker` — lowering runs after typechecking as an
/// independent pass and doesn't need the rest of that crate's driver
/// machinery, so pulling in the dependency just for one string constant
/// would be backwards.
pub const CANONICAL_REMOTE_CLASS: &str = "org.thingpedia.builtin.thingengine.remote";

const CONTACT_ENTITY_KIND: &str = "tt:contact";

/// The result of lowering one cross-principal rule: the
/// original program rewritten to `send` instead of `notify`, plus a new
/// "our rule" program for the local user that `receive`s the result.
pub struct LoweredProgram {
    pub remote: Program,
    pub our_rule: Program,
}

/// Owns the monotonic counters a lowering pass needs.
#[derive(Default)]
pub struct Lowering {
    flow_counter: u64,
    class_counter: u64,
}

impl Lowering {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_flow(&mut self) -> u64 {
        let flow = self.flow_counter;
        self.flow_counter += 1;
        flow
    }

    fn next_class_name(&mut self) -> String {
        let n = self.class_counter;
        self.class_counter += 1;
        format!("__dyn_{n}")
    }

    /// Lower `program` on behalf of `program_id` if its `principal` field
    /// is set and differs from `self_principal`.
    /// Returns `None` when there's nothing to lower — no principal, or the
    /// principal already is `self_principal`, or no `notify` action is
    /// reachable.
    pub fn lower(&mut self, program: &Program, program_id: &str, self_principal: &str) -> Option<LoweredProgram> {
        let principal = program.principal.clone()?;
        let remote_id = match &principal {
            Value::Entity { id, kind, .. } if kind == CONTACT_ENTITY_KIND => id.clone(),
            _ => return None,
        };
        if remote_id == self_principal {
            return None;
        }

        let mut remote = program.clone();
        for stmt in &mut remote.rules {
            if let Some(producer_outputs) = notify_producer_outputs(stmt) {
                let flow = self.next_flow();
                let send_class_name = self.next_class_name();
                let send_class = send_class_def(&send_class_name, &producer_outputs);
                remote.classes.push(send_class.clone());
                rewrite_notify_to_send(
                    stmt,
                    &send_class_name,
                    &principal,
                    program_id,
                    flow,
                    &producer_outputs,
                );

                let receive_class_name = self.next_class_name();
                let receive_class = receive_class_def(&receive_class_name, &producer_outputs);
                let our_rule =
                    build_our_rule(receive_class, &receive_class_name, &principal, program_id, flow, &producer_outputs);
                return Some(LoweredProgram { remote, our_rule });
            }
        }
        None
    }
}

/// If `stmt`'s action list includes a bare `notify`, return the producer's
/// output argument list (the trigger/query's `out_args`) that `send`'s
/// schema needs to carry across.
fn notify_producer_outputs(stmt: &Statement) -> Option<Vec<ArgumentDef>> {
    let (schema, actions) = match stmt {
        Statement::Rule(Rule { stream, actions }) => (stream.schema(), actions.as_slice()),
        Statement::Command { table: Some(table), actions } => (table.schema(), actions.as_slice()),
        Statement::Command { table: None, actions } => (None, actions.as_slice()),
        _ => return None,
    };
    if !actions.iter().any(|a| matches!(a, Action::Notify(_))) {
        return None;
    }
    Some(schema.map(|sig| sig.out_args().cloned().collect()).unwrap_or_default())
}

/// The `send` action's input schema: `{principal, program_id, flow,
/// kindChannel, *producer-outputs}`, all required inputs —
/// it's a one-shot fire-and-forget invocation, nothing is ever read back
/// from it.
fn send_class_def(class_name: &str, producer_outputs: &[ArgumentDef]) -> ClassDef {
    let mut def = FunctionDef::new("send", FunctionKind::Action);
    def.args = fixed_flow_args(ArgDirection::InReq)
        .into_iter()
        .chain(producer_outputs.iter().map(|a| ArgumentDef::new(a.name.clone(), a.arg_type.clone(), ArgDirection::InReq)))
        .collect();

    let mut class = ClassDef::new(class_name);
    class.extends.push(CANONICAL_REMOTE_CLASS.to_string());
    class.actions.insert("send".to_string(), def);
    class
}

/// The companion `receive` query's output schema — the mirror image of
/// `send`'s input schema.
fn receive_class_def(class_name: &str, producer_outputs: &[ArgumentDef]) -> ClassDef {
    let mut def = FunctionDef::new("receive", FunctionKind::Query);
    def.is_monitorable = true;
    def.is_list = false;
    def.args = fixed_flow_args(ArgDirection::Out)
        .into_iter()
        .chain(producer_outputs.iter().map(|a| ArgumentDef::new(a.name.clone(), a.arg_type.clone(), ArgDirection::Out)))
        .collect();

    let mut class = ClassDef::new(class_name);
    class.extends.push(CANONICAL_REMOTE_CLASS.to_string());
    class.queries.insert("receive".to_string(), def);
    class
}

fn fixed_flow_args(direction: ArgDirection) -> Vec<ArgumentDef> {
    vec![
        ArgumentDef::new("principal", Type::Entity(CONTACT_ENTITY_KIND.to_string()), direction),
        ArgumentDef::new("program_id", Type::String, direction),
        ArgumentDef::new("flow", Type::Number, direction),
        ArgumentDef::new("kindChannel", Type::String, direction),
    ]
}

fn rewrite_notify_to_send(
    stmt: &mut Statement,
    send_class_name: &str,
    principal: &Value,
    program_id: &str,
    flow: u64,
    producer_outputs: &[ArgumentDef],
) {
    let actions = match stmt {
        Statement::Rule(Rule { actions, .. }) => actions,
        Statement::Command { actions, .. } => actions,
        _ => return,
    };
    for action in actions.iter_mut() {
        if matches!(action, Action::Notify(_)) {
            let mut invocation = Invocation::new(Selector::device(send_class_name), "send");
            invocation.in_params.push(("principal".to_string(), principal.clone()));
            invocation
                .in_params
                .push(("program_id".to_string(), Value::String(program_id.to_string())));
            #[allow(clippy::cast_precision_loss)]
            invocation.in_params.push(("flow".to_string(), Value::Number(flow as f64)));
            invocation.in_params.push((
                "kindChannel".to_string(),
                Value::String(format!("{send_class_name}:send")),
            ));
            for out in producer_outputs {
                invocation
                    .in_params
                    .push((out.name.clone(), Value::var_ref(out.name.clone())));
            }
            *action = Action::Invocation(invocation);
        }
    }
}

/// Build the "our rule" program: a trigger monitoring
/// `receive`, filtered to this exact `(principal, program_id, flow)`
/// triple, whose only action is `notify`.
fn build_our_rule(
    receive_class: ClassDef,
    receive_class_name: &str,
    principal: &Value,
    program_id: &str,
    flow: u64,
    producer_outputs: &[ArgumentDef],
) -> Program {
    let mut receive_sig_args = fixed_flow_args(ArgDirection::Out);
    receive_sig_args.extend(
        producer_outputs
            .iter()
            .map(|a| ArgumentDef::new(a.name.clone(), a.arg_type.clone(), ArgDirection::Out)),
    );
    let receive_sig = ExpressionSignature {
        kind: FunctionKind::Query,
        args: receive_sig_args,
        is_list: false,
        is_monitorable: true,
        no_filter: false,
        minimal_projection: Vec::new(),
    };

    let invocation = Invocation {
        selector: Selector::device(receive_class_name),
        channel: "receive".to_string(),
        in_params: Vec::new(),
        schema: Some(receive_sig.clone()),
    };
    let table = Table::Invocation {
        invocation,
        schema: Some(receive_sig.clone()),
    };
    let monitor = Stream::Monitor {
        table: Box::new(table),
        args: None,
        schema: Some(receive_sig.clone()),
    };
    #[allow(clippy::cast_precision_loss)]
    let filter = tt_ast::BooleanExpression::and(vec![
        tt_ast::BooleanExpression::atom("principal", "==", principal.clone()),
        tt_ast::BooleanExpression::atom("program_id", "==", Value::String(program_id.to_string())),
        tt_ast::BooleanExpression::atom("flow", "==", Value::Number(flow as f64)),
    ]);
    let trigger = Stream::Filter {
        stream: Box::new(monitor),
        filter: Box::new(filter),
        schema: Some(receive_sig),
    };

    let mut program = Program::new();
    program.classes.push(receive_class);
    program.rules.push(Statement::Rule(Rule {
        stream: trigger,
        actions: vec![Action::notify()],
    }));
    program
}

/// Every contact kind referenced by `kindChannel`-style synthetic classes
/// this pass produced, keyed by the class name — used by a caller that
/// needs to know which classes in a lowered program are synthetic rather
/// than catalogue-backed.
#[must_use]
pub fn synthetic_classes(program: &Program) -> FxHashMap<String, &ClassDef> {
    program
        .classes
        .iter()
        .filter(|c| c.name.starts_with("__dyn_"))
        .map(|c| (c.name.clone(), c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::{Declaration, DeclarationKind};

    fn producer_schema() -> ExpressionSignature {
        ExpressionSignature {
            kind: FunctionKind::Query,
            args: vec![ArgumentDef::new("text", Type::String, ArgDirection::Out)],
            is_list: true,
            is_monitorable: true,
            no_filter: false,
            minimal_projection: Vec::new(),
        }
    }

    fn remote_program() -> Program {
        let mut program = Program::new();
        program.principal = Some(Value::Entity {
            id: "bob@example.com".to_string(),
            kind: CONTACT_ENTITY_KIND.to_string(),
            display: None,
        });
        let invocation = Invocation {
            selector: Selector::device("com.twitter"),
            channel: "search".to_string(),
            in_params: Vec::new(),
            schema: Some(producer_schema()),
        };
        let table = Table::Invocation {
            invocation,
            schema: Some(producer_schema()),
        };
        let monitor = Stream::Monitor {
            table: Box::new(table),
            args: None,
            schema: Some(producer_schema()),
        };
        program.rules.push(Statement::Rule(Rule {
            stream: monitor,
            actions: vec![Action::notify()],
        }));
        program
    }

    #[test]
    fn lowers_notify_into_send_and_builds_our_rule() {
        let program = remote_program();
        let mut lowering = Lowering::new();
        let lowered = lowering.lower(&program, "prog-1", "me@example.com").unwrap();

        let rewritten = match &lowered.remote.rules[0] {
            Statement::Rule(r) => &r.actions[0],
            other => panic!("expected a Rule, got {other:?}"),
        };
        match rewritten {
            Action::Invocation(inv) => {
                assert_eq!(inv.channel, "send");
                assert!(inv.in_params.iter().any(|(n, _)| n == "text"));
            }
            other => panic!("expected Action::Invocation(send), got {other:?}"),
        }

        assert_eq!(lowered.our_rule.classes.len(), 1);
        match &lowered.our_rule.rules[0] {
            Statement::Rule(r) => {
                assert!(matches!(r.stream, Stream::Filter { .. }));
                assert!(matches!(r.actions[0], Action::Notify(_)));
            }
            other => panic!("expected a Rule, got {other:?}"),
        }
    }

    #[test]
    fn no_lowering_when_principal_is_self() {
        let mut program = remote_program();
        program.principal = Some(Value::Entity {
            id: "me@example.com".to_string(),
            kind: CONTACT_ENTITY_KIND.to_string(),
            display: None,
        });
        let mut lowering = Lowering::new();
        assert!(lowering.lower(&program, "prog-1", "me@example.com").is_none());
    }

    #[test]
    fn no_lowering_without_a_principal() {
        let mut program = remote_program();
        program.principal = None;
        let mut lowering = Lowering::new();
        assert!(lowering.lower(&program, "prog-1", "me@example.com").is_none());
    }

    #[test]
    fn flow_tokens_increase_monotonically_across_calls() {
        let program = remote_program();
        let mut lowering = Lowering::new();
        let first = lowering.lower(&program, "prog-1", "me@example.com").unwrap();
        let second = lowering.lower(&program, "prog-2", "me@example.com").unwrap();
        let flow_of = |p: &Program| match &p.rules[0] {
            Statement::Rule(r) => match &r.actions[0] {
                Action::Invocation(inv) => inv
                    .in_params
                    .iter()
                    .find(|(n, _)| n == "flow")
                    .map(|(_, v)| v.clone()),
                _ => None,
            },
            _ => None,
        };
        assert_ne!(flow_of(&first.remote), flow_of(&second.remote));
    }

    #[test]
    fn declaration_only_programs_are_left_alone() {
        let mut program = Program::new();
        program.principal = Some(Value::Entity {
            id: "bob@example.com".to_string(),
            kind: CONTACT_ENTITY_KIND.to_string(),
            display: None,
        });
        program.declarations.push(Declaration {
            name: "x".to_string(),
            kind: DeclarationKind::Table(Table::VarRef("y".to_string())),
        });
        let mut lowering = Lowering::new();
        assert!(lowering.lower(&program, "prog-1", "me@example.com").is_none());
    }
}
