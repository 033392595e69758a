//! The permission-check driver.
//!
//! Mirrors `tt_checker::TypeChecker`'s shape: a driver struct holding
//! borrowed collaborators (a solver factory, a group oracle) plus
//! whatever per-session state it accumulates, with one public entry point
//! for the one shape of input this crate handles (a program plus a policy
//! set).

use rustc_hash::FxHashMap;
use tracing::{span, Level};
use tt_ast::{BooleanExpression, PermissionRule, Program, Statement, Stream, Table};
use tt_common::cache::MultiMap;
use tt_common::diagnostics::Result;
use tt_optimizer::optimize_boolean;
use tt_smt::{CheckSatResult, Command, Encoder, ParamEnv, Script, SolverClient, Term};

use crate::condition::{known_bindings, partial_eval, permission_condition, postcondition, precondition, rule_filter};
use crate::index::{
    applicable_rules_indexed, collect_program_contacts, collect_rule_contacts, index_by_kind_channel,
    CONTACT_ENTITY_KIND, CONTACT_GROUP_ENTITY_KIND,
};
use crate::oracle::{CachedOracle, GroupOracle};

/// Produces one fresh solver session per SMT query: a
/// real SMT process is typically one-shot per `(check-sat)` call, so the
/// permission checker asks for a new handle every time it needs one
/// rather than reusing a single long-lived session.
pub trait SolverFactory {
    fn new_session(&mut self) -> Result<Box<dyn SolverClient>>;
}

/// What happened to one rule during the per-rule transform algorithm.
enum RuleOutcome {
    /// Steps 2 or 4: the rule is impossible, or no policy admits it.
    Deleted,
    /// Step 3: unconditionally allowed, no rewrite needed.
    Unchanged,
    /// Step 5/6: survives with `residual` conjoined onto its filter.
    Rewritten(BooleanExpression),
}

pub struct PermissionChecker<'f, 'o> {
    factory: &'f mut dyn SolverFactory,
    oracle: CachedOracle<'o>,
    /// Every contact reachable from the program/policy set under check,
    /// prefetched in `check_program` — asserted as concrete `getGroups`
    /// facts into every SMT session this checker opens (see `sat`).
    contacts: Vec<String>,
}

impl<'f, 'o> PermissionChecker<'f, 'o> {
    #[must_use]
    pub fn new(factory: &'f mut dyn SolverFactory, oracle: &'o mut dyn GroupOracle) -> Self {
        PermissionChecker {
            factory,
            oracle: CachedOracle::new(oracle),
            contacts: Vec::new(),
        }
    }

    /// `permission_check`: reduce `program` against `policies`
    /// for `principal`, returning the rewritten program or `None` if every
    /// rule was discarded.
    pub fn check_program(
        &mut self,
        principal: &str,
        program: &mut Program,
        policies: &[PermissionRule],
    ) -> Result<Option<Program>> {
        let _span = span!(Level::DEBUG, "permission_check").entered();

        let mut contacts = collect_program_contacts(program);
        for rule in policies {
            contacts.extend(collect_rule_contacts(rule));
        }
        contacts.sort();
        contacts.dedup();
        self.oracle.prefetch(&contacts)?;
        self.contacts = contacts;
        let _ = principal;

        let index = index_by_kind_channel(policies);
        let mut i = 0;
        while i < program.rules.len() {
            let outcome = self.check_statement(&program.rules[i], policies, &index)?;
            match outcome {
                RuleOutcome::Deleted => {
                    program.rules.remove(i);
                }
                RuleOutcome::Unchanged => {
                    i += 1;
                }
                RuleOutcome::Rewritten(residual) => {
                    attach_residual(&mut program.rules[i], residual);
                    i += 1;
                }
            }
        }

        if program.rules.is_empty() {
            Ok(None)
        } else {
            Ok(Some(std::mem::take(program)))
        }
    }

    fn check_statement(
        &mut self,
        stmt: &Statement,
        policies: &[PermissionRule],
        index: &MultiMap<(String, String), usize>,
    ) -> Result<RuleOutcome> {
        let (kind, channel) = match primary_function(stmt) {
            Some(kc) => kc,
            None => return Ok(RuleOutcome::Unchanged),
        };
        let applicable: Vec<PermissionRule> = applicable_rules_indexed(policies, index, &kind, &channel)
            .into_iter()
            .cloned()
            .collect();
        let filter = rule_filter(stmt);
        self.check_rule(&filter, &applicable)
    }

    /// Steps 2-6 of the per-rule transform algorithm: satisfiability,
    /// two SMT reductions, then a per-permission adjust pass.
    fn check_rule(&mut self, filter: &BooleanExpression, applicable: &[PermissionRule]) -> Result<RuleOutcome> {
        // Step 2: satisfiability check with no permission constraints.
        if !self.sat(filter)? {
            return Ok(RuleOutcome::Deleted);
        }

        let conditions: Vec<BooleanExpression> = applicable.iter().map(permission_condition).collect();
        let disjunction = BooleanExpression::or(conditions.clone());

        // Step 3: first reduction.
        let negated = BooleanExpression::and(vec![filter.clone(), BooleanExpression::not(disjunction.clone())]);
        if !self.sat(&negated)? {
            return Ok(RuleOutcome::Unchanged);
        }

        // Step 4: second reduction, with filter_N assignment tracking
        // so the adjust pass can
        // skip a redundant applicability check when the model already
        // pins a permission's condition to true or false.
        let (second_sat, shortcuts) = self.sat_with_filter_assignments(filter, &conditions)?;
        if !second_sat {
            return Ok(RuleOutcome::Deleted);
        }

        // Step 5: permission-by-permission adjust pass.
        let known = known_bindings(filter);
        let mut residual_parts = Vec::new();
        for (idx, rule) in applicable.iter().enumerate() {
            let is_applicable = match shortcuts.get(&idx) {
                Some(known_true) => *known_true,
                None => {
                    let check = BooleanExpression::and(vec![filter.clone(), conditions[idx].clone()]);
                    self.sat(&check)?
                }
            };
            if !is_applicable {
                continue;
            }

            let pre = precondition(rule);
            let post = postcondition(rule);
            let pre_implied = !self.sat(&BooleanExpression::and(vec![
                filter.clone(),
                BooleanExpression::not(pre.clone()),
            ]))?;
            let post_implied = !self.sat(&BooleanExpression::and(vec![
                filter.clone(),
                BooleanExpression::not(post.clone()),
            ]))?;

            if !(pre_implied && post_implied) {
                let combined = BooleanExpression::and(vec![pre, post]);
                residual_parts.push(partial_eval(&combined, &known));
            }
        }

        // Step 6.
        let mut residual = BooleanExpression::and(residual_parts);
        optimize_boolean(&mut residual);
        if residual.is_false() {
            Ok(RuleOutcome::Deleted)
        } else if residual.is_true() {
            Ok(RuleOutcome::Unchanged)
        } else {
            Ok(RuleOutcome::Rewritten(residual))
        }
    }

    /// Assert `getGroups(contact) = {oracle's answer}` for every
    /// contact under check, so `group_member` filters are solved against
    /// the real membership the oracle reported in `check_program`'s
    /// prefetch rather than an unconstrained uninterpreted function
    /// (spec.md §4.4's `getGroups`, §3.3's soundness invariant).
    fn assert_known_groups(&mut self, encoder: &mut Encoder) -> Result<()> {
        for contact in &self.contacts {
            let groups = self.oracle.groups_of(contact)?;
            encoder.assert_known_groups(CONTACT_ENTITY_KIND, CONTACT_GROUP_ENTITY_KIND, contact, &groups);
        }
        Ok(())
    }

    fn sat(&mut self, filter: &BooleanExpression) -> Result<bool> {
        let mut encoder = Encoder::new();
        self.assert_known_groups(&mut encoder)?;
        let term = encoder.encode_filter(filter, &ParamEnv::default());
        encoder.script.assert(term);
        let mut solver = self.factory.new_session()?;
        submit_script(solver.as_mut(), &encoder.script)?;
        Ok(solver.check_sat()?.is_sat())
    }

    /// Like `sat`, but also names each of `conditions` with a `filter_N`
    /// variable and, on a `Sat` result, returns which
    /// conditions the model pinned to a definite truth value.
    fn sat_with_filter_assignments(
        &mut self,
        filter: &BooleanExpression,
        conditions: &[BooleanExpression],
    ) -> Result<(bool, FxHashMap<usize, bool>)> {
        let mut encoder = Encoder::new();
        self.assert_known_groups(&mut encoder)?;
        let base = encoder.encode_filter(filter, &ParamEnv::default());
        let mut named_conditions = Vec::with_capacity(conditions.len());
        let mut names = Vec::with_capacity(conditions.len());
        for cond in conditions {
            let encoded = encoder.encode_filter(cond, &ParamEnv::default());
            let named = encoder.bind_named("filter", encoded);
            if let Term::Atom(name) = &named {
                names.push(name.clone());
            }
            named_conditions.push(named);
        }
        let disjunction = Term::or(named_conditions);
        encoder.script.assert(Term::and(vec![base, disjunction]));

        let mut solver = self.factory.new_session()?;
        solver.enable_assignments();
        submit_script(solver.as_mut(), &encoder.script)?;
        match solver.check_sat()? {
            CheckSatResult::Unsat { .. } => Ok((false, FxHashMap::default())),
            CheckSatResult::Sat { assignment, .. } => {
                let mut shortcuts = FxHashMap::default();
                for (idx, name) in names.iter().enumerate() {
                    if let Some(value) = assignment.get(name) {
                        shortcuts.insert(idx, *value);
                    }
                }
                Ok((true, shortcuts))
            }
        }
    }
}

/// The `(kind, channel)` a statement's invocations apply to, for the
/// purpose of locating applicable permission rules. A
/// statement can reference several invocations (a join, a trigger plus an
/// action); this takes the first one found, covering the common case of
/// one query feeding one action.
fn primary_function(stmt: &Statement) -> Option<(String, String)> {
    match stmt {
        Statement::Rule(rule) => function_of_stream(&rule.stream).or_else(|| function_of_actions(&rule.actions)),
        Statement::Command { table, actions } => table
            .as_ref()
            .and_then(function_of_table)
            .or_else(|| function_of_actions(actions)),
        _ => None,
    }
}

fn function_of_stream(stream: &Stream) -> Option<(String, String)> {
    match stream {
        Stream::Monitor { table, .. } => function_of_table(table),
        Stream::Filter { stream, .. } | Stream::EdgeFilter { stream, .. } | Stream::EdgeNew { stream, .. } => {
            function_of_stream(stream)
        }
        Stream::Projection { stream, .. } | Stream::Compute { stream, .. } | Stream::Alias { stream, .. } => {
            function_of_stream(stream)
        }
        Stream::Join { stream, .. } => function_of_stream(stream),
        Stream::VarRef(_) | Stream::Timer { .. } | Stream::AtTimer { .. } => None,
    }
}

fn function_of_table(table: &Table) -> Option<(String, String)> {
    match table {
        Table::Invocation { invocation, .. } => {
            invocation.selector.kind().map(|k| (k.to_string(), invocation.channel.clone()))
        }
        Table::Filter { table, .. }
        | Table::Projection { table, .. }
        | Table::Compute { table, .. }
        | Table::Alias { table, .. }
        | Table::Aggregation { table, .. }
        | Table::Sort { table, .. }
        | Table::Index { table, .. }
        | Table::Slice { table, .. } => function_of_table(table),
        Table::Join { lhs, .. } => function_of_table(lhs),
        Table::VarRef(_) => None,
    }
}

fn function_of_actions(actions: &[tt_ast::Action]) -> Option<(String, String)> {
    actions.iter().find_map(|action| match action {
        tt_ast::Action::Invocation(inv) => inv.selector.kind().map(|k| (k.to_string(), inv.channel.clone())),
        _ => None,
    })
}

/// Conjoin `residual` onto `stmt`'s outermost stream/table, wrapping it in
/// a new `Filter` node.
fn attach_residual(stmt: &mut Statement, residual: BooleanExpression) {
    match stmt {
        Statement::Rule(rule) => {
            let schema = rule.stream.schema().cloned();
            let old = std::mem::replace(&mut rule.stream, Stream::VarRef(String::new()));
            rule.stream = Stream::Filter {
                stream: Box::new(old),
                filter: Box::new(residual),
                schema,
            };
        }
        Statement::Command { table: Some(table), .. } => {
            let schema = table.schema().cloned();
            let old = std::mem::replace(table, Table::VarRef(String::new()));
            *table = Table::Filter {
                table: Box::new(old),
                filter: Box::new(residual),
                schema,
            };
        }
        _ => {}
    }
}

/// Send `script`'s commands to `solver`: declarations go through `add`,
/// constraints (named or not) go through `assert`.
fn submit_script(solver: &mut dyn SolverClient, script: &Script) -> Result<()> {
    for command in &script.commands {
        match command {
            Command::DeclareSort(_) | Command::DeclareDatatype { .. } | Command::DeclareFun { .. } => {
                solver.add(&Term::atom(command_text(command)))?;
            }
            Command::Assert(term) => solver.assert(term)?,
            Command::AssertNamed { name, term } => {
                let named = Term::app("!", vec![term.clone(), Term::atom(format!(":named {name}"))]);
                solver.assert(&named)?;
            }
        }
    }
    Ok(())
}

fn command_text(command: &Command) -> String {
    let mut script = Script::new();
    script.commands.push(command.clone());
    script.to_string().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::{Action, Invocation, PermissionFunction, Rule, Selector, Value};
    use tt_smt::FakeSolver;

    struct FixedFactory {
        results: Vec<CheckSatResult>,
    }

    impl SolverFactory for FixedFactory {
        fn new_session(&mut self) -> Result<Box<dyn SolverClient>> {
            let result = if self.results.is_empty() {
                CheckSatResult::Sat {
                    assignment: FxHashMap::default(),
                    constants: FxHashMap::default(),
                }
            } else {
                self.results.remove(0)
            };
            Ok(Box::new(FakeSolver::with_result(result)))
        }
    }

    struct NoGroupsOracle;
    impl GroupOracle for NoGroupsOracle {
        fn groups_of(&mut self, _contact: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    fn sat() -> CheckSatResult {
        CheckSatResult::Sat {
            assignment: FxHashMap::default(),
            constants: FxHashMap::default(),
        }
    }

    fn unsat() -> CheckSatResult {
        CheckSatResult::Unsat {
            unsat_core: Vec::new(),
        }
    }

    #[test]
    fn impossible_rule_is_deleted() {
        let mut factory = FixedFactory { results: vec![unsat()] };
        let mut oracle = NoGroupsOracle;
        let mut checker = PermissionChecker::new(&mut factory, &mut oracle);
        let mut program = Program::new();
        program.rules.push(Statement::Command {
            table: None,
            actions: vec![Action::Invocation(Invocation::new(Selector::device("com.test"), "send"))],
        });
        let result = checker.check_program("me", &mut program, &[]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn unconditionally_allowed_rule_survives_unchanged() {
        // sat0 (step2) sat, first reduction unsat => unconditionally allowed.
        let mut factory = FixedFactory {
            results: vec![sat(), unsat()],
        };
        let mut oracle = NoGroupsOracle;
        let mut checker = PermissionChecker::new(&mut factory, &mut oracle);
        let rule = PermissionRule {
            principal_filter: BooleanExpression::True,
            query: PermissionFunction::Builtin,
            action: PermissionFunction::Specified {
                kind: "com.test".to_string(),
                channel: "send".to_string(),
                filter: BooleanExpression::True,
                schema: None,
            },
        };
        let mut program = Program::new();
        program.rules.push(Statement::Command {
            table: None,
            actions: vec![Action::Invocation(Invocation::new(Selector::device("com.test"), "send"))],
        });
        let result = checker.check_program("me", &mut program, &[rule]).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().rules.len(), 1);
    }

    #[test]
    fn no_policy_admits_rule_is_discarded() {
        // sat0 sat, first reduction sat (not unconditional), second reduction unsat => discard.
        let mut factory = FixedFactory {
            results: vec![sat(), sat(), unsat()],
        };
        let mut oracle = NoGroupsOracle;
        let mut checker = PermissionChecker::new(&mut factory, &mut oracle);
        let rule = PermissionRule {
            principal_filter: BooleanExpression::atom("owner", "==", Value::Boolean(true)),
            query: PermissionFunction::Builtin,
            action: PermissionFunction::Specified {
                kind: "com.test".to_string(),
                channel: "send".to_string(),
                filter: BooleanExpression::atom("owner", "==", Value::Boolean(true)),
                schema: None,
            },
        };
        let mut program = Program::new();
        program.rules.push(Statement::Command {
            table: None,
            actions: vec![Action::Invocation(Invocation::new(Selector::device("com.test"), "send"))],
        });
        let result = checker.check_program("me", &mut program, &[rule]).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn group_facts_are_asserted_from_the_prefetched_oracle() {
        struct FixedGroups;
        impl GroupOracle for FixedGroups {
            fn groups_of(&mut self, contact: &str) -> Result<Vec<String>> {
                Ok(vec![format!("group-of-{contact}")])
            }
        }
        let mut factory = FixedFactory { results: vec![] };
        let mut oracle = FixedGroups;
        let mut checker = PermissionChecker::new(&mut factory, &mut oracle);
        checker.contacts = vec!["alice@example.com".to_string()];

        let mut encoder = Encoder::new();
        checker.assert_known_groups(&mut encoder).unwrap();

        let declares_get_groups = encoder.script.commands.iter().any(
            |c| matches!(c, Command::DeclareFun { name, .. } if name == tt_smt::GET_GROUPS_FN),
        );
        assert!(declares_get_groups);
        let asserts = encoder
            .script
            .commands
            .iter()
            .filter(|c| matches!(c, Command::Assert(_)))
            .count();
        assert_eq!(asserts, 1);
    }
}
