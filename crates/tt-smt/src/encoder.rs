//! The AST-to-SMT-LIB encoder.
//!
//! `Encoder` owns a single monotonic name counter shared across all four
//! unsat-core-friendly prefixes (`constr_N`, `filter_N`, `allowed_N`,
//! `check_N`) rather than one counter per prefix, since a shared counter
//! guarantees every name in a session is unique regardless of prefix.

use rustc_hash::FxHashMap;
use tracing::trace;
use tt_ast::{BooleanExpression, Invocation, Value};
use tt_common::limits::SMT_TIME_OF_DAY_MAX;
use tt_types::Type;

use crate::sort::{SortRegistry, GET_GROUPS_FN};
use crate::term::{Script, Term};

/// A parameter environment: SMT-LIB terms standing in for each name
/// currently in scope (invocation in/out-params, join-bound names,
/// `$event`). Threaded through filter/value encoding the way
/// `tt_checker::Scope` threads lexical bindings through typechecking.
pub type ParamEnv = FxHashMap<String, Term>;

/// One encoded invocation: the channel's parameter environment plus the
/// fresh variable standing for its `__principal`-marked contact
/// parameter, if any.
pub struct EncodedInvocation {
    pub params: ParamEnv,
    pub principal_param: Option<String>,
}

pub struct Encoder {
    pub script: Script,
    sorts: SortRegistry,
    counter: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Encoder {
            script: Script::new(),
            sorts: SortRegistry::new(),
            counter: 0,
        }
    }
}

impl Encoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next name under `prefix`: `constr_<N>`, `filter_<N>`, `allowed_<N>`, `check_<N>`.
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        let n = self.counter;
        self.counter += 1;
        format!("{prefix}_{n}")
    }

    /// Introduce a fresh named boolean variable equal to `term`, and
    /// return a reference to it. This is how both filter subformulas
    /// (`constr_N`) and whole permission-rule filters (`filter_N`) get
    /// named for unsat-core extraction and assignment retrieval.
    pub fn bind_named(&mut self, prefix: &str, term: Term) -> Term {
        let name = self.fresh_name(prefix);
        self.script.declare_fun(name.clone(), Vec::new(), "Bool");
        self.script
            .assert_named(name.clone(), Term::eq(Term::atom(name.clone()), term));
        Term::atom(name)
    }

    /// Declare one `param_<fn>_<arg>` variable per argument of `sig`,
    /// assert equality for every supplied `in_param`, and return the
    /// resulting environment plus the `__principal`-marked parameter name
    /// if the function declares one.
    pub fn encode_invocation(&mut self, fn_label: &str, invocation: &Invocation) -> EncodedInvocation {
        trace!(fn_label, channel = %invocation.channel, "encoding invocation");
        let mut params = ParamEnv::default();
        let mut principal_param = None;
        let Some(sig) = &invocation.schema else {
            return EncodedInvocation { params, principal_param };
        };

        for arg in &sig.args {
            let var_name = format!("param_{fn_label}_{}", arg.name);
            let sort = self.sorts.sort_of(&mut self.script, &arg.arg_type);
            self.script.declare_fun(var_name.clone(), Vec::new(), sort);
            let var = Term::atom(var_name.clone());

            if matches!(arg.arg_type, Type::Time) {
                self.script.assert(Term::ge(var.clone(), Term::int_lit(0)));
                self.script
                    .assert(Term::le(var.clone(), Term::int_lit(SMT_TIME_OF_DAY_MAX)));
            }
            if arg.is_principal {
                principal_param = Some(var_name.clone());
            }
            params.insert(arg.name.clone(), var);
        }

        for (name, value) in &invocation.in_params {
            if let Some(var) = params.get(name).cloned() {
                let ty = sig
                    .arg(name)
                    .map(|a| a.arg_type.clone())
                    .unwrap_or(Type::Any);
                let encoded = self.encode_value(value, &ty, &params);
                self.script.assert(Term::eq(var, encoded));
            }
        }

        EncodedInvocation { params, principal_param }
    }

    /// Assert `Allowed_<fn>(principal)` when `param` is equal to
    /// `principal` — the contract `__principal`-marked parameters carry.
    pub fn assert_principal_implication(&mut self, fn_label: &str, param: &Term, principal: &Term) {
        let allowed = Term::app(format!("Allowed_{fn_label}"), vec![principal.clone()]);
        self.script
            .assert(Term::implies(Term::eq(param.clone(), principal.clone()), allowed));
    }

    /// Encode `filter` under `params`, naming every subformula
    /// `constr_N`. Constant leaves (`True`/`False`/
    /// `DontCare`) aren't named — there's nothing for an unsat core to
    /// usefully point at.
    pub fn encode_filter(&mut self, filter: &BooleanExpression, params: &ParamEnv) -> Term {
        let term = match filter {
            BooleanExpression::True => return Term::bool_lit(true),
            BooleanExpression::False => return Term::bool_lit(false),
            BooleanExpression::DontCare { .. } => return Term::bool_lit(true),
            BooleanExpression::And(ops) => {
                Term::and(ops.iter().map(|op| self.encode_filter(op, params)).collect())
            }
            BooleanExpression::Or(ops) => {
                Term::or(ops.iter().map(|op| self.encode_filter(op, params)).collect())
            }
            BooleanExpression::Not(op) => Term::not(self.encode_filter(op, params)),
            BooleanExpression::Atom { name, operator, value, .. } => {
                let lhs = params.get(name).cloned().unwrap_or_else(|| Term::atom(name.clone()));
                let rhs_ty = value_hint_type(value);
                let rhs = self.encode_value(value, &rhs_ty, params);
                encode_operator(operator, lhs, rhs)
            }
            BooleanExpression::Compute { lhs, op, rhs } => {
                let lhs_ty = value_hint_type(lhs);
                let rhs_ty = value_hint_type(rhs);
                let l = self.encode_value(lhs, &lhs_ty, params);
                let r = self.encode_value(rhs, &rhs_ty, params);
                encode_operator(op, l, r)
            }
            BooleanExpression::External { in_params, filter: inner, schema, .. } => {
                let mut nested = params.clone();
                if let Some(sig) = schema {
                    for (name, value) in in_params {
                        let ty = sig.arg(name).map(|a| a.arg_type.clone()).unwrap_or(Type::Any);
                        let encoded = self.encode_value(value, &ty, params);
                        nested.insert(name.clone(), encoded);
                    }
                    for arg in sig.out_args() {
                        nested
                            .entry(arg.name.clone())
                            .or_insert_with(|| Term::atom(format!("ext_{}", arg.name)));
                    }
                }
                self.encode_filter(inner, &nested)
            }
        };
        self.bind_named("constr", term)
    }

    /// Encode a literal/reference `Value` against its expected type.
    pub fn encode_value(&mut self, value: &Value, ty: &Type, params: &ParamEnv) -> Term {
        match value {
            Value::Boolean(b) => Term::bool_lit(*b),
            Value::String(s) => Term::string_lit(s),
            Value::Number(n) => Term::real_lit(*n),
            Value::Measure { value, .. } | Value::Currency { value, .. } => Term::real_lit(*value),
            Value::Date(d) => Term::int_lit(date_to_epoch_days(d)),
            Value::Time(t) => Term::int_lit(t.to_seconds()),
            Value::Location(loc) => self.encode_location(loc),
            Value::Entity { id, kind, .. } => {
                let sort = self.sorts.declare_entity(&mut self.script, kind);
                Term::app(format!("mk-{sort}"), vec![Term::string_lit(id)])
            }
            Value::Enum(symbol) => match ty {
                Type::Enum(domain) => {
                    let sort = self.sorts.declare_enum(&mut self.script, domain);
                    Term::atom(format!("{sort}.{symbol}"))
                }
                _ => Term::string_lit(symbol),
            },
            Value::VarRef(name) => params
                .get(name)
                .cloned()
                .unwrap_or_else(|| Term::atom(name.clone())),
            Value::Event(field) => {
                Term::atom(format!("event${}", field.clone().unwrap_or_default()))
            }
            Value::Undefined { .. } => Term::atom(self.fresh_name("undef")),
            Value::ArrayValue(items) => {
                let elem_ty = match ty {
                    Type::Array(elem) => (**elem).clone(),
                    _ => Type::Any,
                };
                let elem_sort = self.sorts.sort_of(&mut self.script, &elem_ty);
                let mut set = Term::atom(format!("(as emptyset (Set {elem_sort}))"));
                for item in items {
                    let encoded = self.encode_value(item, &elem_ty, params);
                    set = Term::app("insert", vec![encoded, set]);
                }
                set
            }
            Value::Computation { op, operands } => {
                let args = operands
                    .iter()
                    .map(|op_value| self.encode_value(op_value, &Type::Any, params))
                    .collect();
                Term::app(format!("tt.{op}"), args)
            }
            Value::ArrayFieldValue { value, field } => {
                let inner = self.encode_value(value, ty, params);
                Term::app(format!("{field}-sel"), vec![inner])
            }
            Value::FilterValue { value, .. } => self.encode_value(value, ty, params),
        }
    }

    fn encode_location(&mut self, loc: &tt_ast::LocationValue) -> Term {
        self.sorts.declare_location(&mut self.script);
        match loc {
            tt_ast::LocationValue::Home => Term::atom("loc.home"),
            tt_ast::LocationValue::Work => Term::atom("loc.work"),
            tt_ast::LocationValue::Current => Term::atom("loc.current"),
            tt_ast::LocationValue::Absolute { latitude, longitude, .. } => Term::app(
                "loc.absolute",
                vec![Term::real_lit(*latitude), Term::real_lit(*longitude)],
            ),
        }
    }

    /// `getGroups(contact) ∋ group`.
    pub fn encode_group_membership(&mut self, contact: Term, group: Term) -> Term {
        Term::member(group, Term::app(GET_GROUPS_FN, vec![contact]))
    }

    /// Assert the concrete fact `getGroups(contact_id) = {groups}`, so
    /// `group_member` filters are solved against the oracle's actual
    /// answer instead of an unconstrained uninterpreted function
    /// (spec.md §3.3: a permission check must only ever accept a rewrite
    /// it can prove, and an unconstrained `getGroups` proves nothing).
    pub fn assert_known_groups(
        &mut self,
        contact_kind: &str,
        group_kind: &str,
        contact_id: &str,
        groups: &[String],
    ) {
        let contact_sort = self.sorts.declare_entity(&mut self.script, contact_kind);
        let group_sort = self.sorts.declare_entity(&mut self.script, group_kind);
        self.sorts.declare_get_groups(&mut self.script, &contact_sort, &group_sort);

        let contact_term = Term::app(format!("mk-{contact_sort}"), vec![Term::string_lit(contact_id)]);
        let mut set = Term::atom(format!("(as emptyset (Set {group_sort}))"));
        for group in groups {
            let group_term = Term::app(format!("mk-{group_sort}"), vec![Term::string_lit(group)]);
            set = Term::app("insert", vec![group_term, set]);
        }
        self.script
            .assert(Term::eq(Term::app(GET_GROUPS_FN, vec![contact_term]), set));
    }
}

fn value_hint_type(value: &Value) -> Type {
    match value {
        Value::Boolean(_) => Type::Boolean,
        Value::String(_) => Type::String,
        Value::Number(_) => Type::Number,
        Value::Measure { unit, .. } => Type::Measure(unit.clone()),
        Value::Currency { code, .. } => Type::Measure(code.clone()),
        Value::Date(_) => Type::Date,
        Value::Time(_) => Type::Time,
        Value::Location(_) => Type::Location,
        Value::Entity { kind, .. } => Type::Entity(kind.clone()),
        _ => Type::Any,
    }
}

fn encode_operator(op: &str, lhs: Term, rhs: Term) -> Term {
    match op {
        "==" => Term::eq(lhs, rhs),
        "!=" => Term::not(Term::eq(lhs, rhs)),
        "<" => Term::app("<", vec![lhs, rhs]),
        "<=" => Term::le(lhs, rhs),
        ">" => Term::app(">", vec![lhs, rhs]),
        ">=" => Term::ge(lhs, rhs),
        "=~" => Term::app("str.contains", vec![lhs, rhs]),
        "~=" => Term::app("str.contains", vec![rhs, lhs]),
        "starts_with" => Term::app("str.prefixof", vec![rhs, lhs]),
        "ends_with" => Term::app("str.suffixof", vec![rhs, lhs]),
        "in_array" | "has_member" => Term::member(lhs, rhs),
        "group_member" => Term::member(rhs, Term::app(GET_GROUPS_FN, vec![lhs])),
        other => Term::app(other, vec![lhs, rhs]),
    }
}

/// Days since the epoch, used only as a total order for `Date` asserts.
fn date_to_epoch_days(date: &tt_ast::DateValue) -> i64 {
    let y = i64::from(date.year);
    let m = i64::from(date.month);
    let d = i64::from(date.day);
    // A civil-to-epoch-days transform (Howard Hinnant's algorithm),
    // monotonic in calendar order, which is all the encoding needs.
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::Selector;

    #[test]
    fn fresh_names_share_one_counter_across_prefixes() {
        let mut enc = Encoder::new();
        assert_eq!(enc.fresh_name("constr"), "constr_0");
        assert_eq!(enc.fresh_name("filter"), "filter_1");
        assert_eq!(enc.fresh_name("constr"), "constr_2");
    }

    #[test]
    fn encodes_atom_with_named_subformula() {
        let mut enc = Encoder::new();
        let filter = BooleanExpression::atom("x", "==", Value::Number(1.0));
        let mut params = ParamEnv::default();
        params.insert("x".to_string(), Term::atom("param_foo_x"));
        let term = enc.encode_filter(&filter, &params);
        assert!(matches!(term, Term::Atom(ref n) if n.starts_with("constr_")));
        assert_eq!(enc.script.named_assertion_names().len(), 1);
    }

    #[test]
    fn and_of_atoms_names_every_subformula() {
        let mut enc = Encoder::new();
        let filter = BooleanExpression::and(vec![
            BooleanExpression::atom("x", "==", Value::Number(1.0)),
            BooleanExpression::atom("y", "==", Value::Number(2.0)),
        ]);
        enc.encode_filter(&filter, &ParamEnv::default());
        // Two atoms + the outer And = three named subformulas.
        assert_eq!(enc.script.named_assertion_names().len(), 3);
    }

    #[test]
    fn encode_invocation_declares_params_and_asserts_equalities() {
        let mut enc = Encoder::new();
        let mut invocation = Invocation::new(Selector::device("com.test"), "get");
        invocation.schema = Some(tt_ast::ExpressionSignature {
            kind: tt_ast::FunctionKind::Query,
            args: vec![tt_ast::ArgumentDef::new(
                "count",
                Type::Number,
                tt_ast::ArgDirection::InReq,
            )],
            is_list: false,
            is_monitorable: false,
            no_filter: false,
            minimal_projection: Vec::new(),
        });
        invocation.in_params.push(("count".to_string(), Value::Number(3.0)));
        let encoded = enc.encode_invocation("fn0", &invocation);
        assert!(encoded.params.contains_key("count"));
        assert!(enc
            .script
            .commands
            .iter()
            .any(|c| matches!(c, crate::term::Command::DeclareFun { name, .. } if name == "param_fn0_count")));
    }

    #[test]
    fn time_parameters_get_range_asserts() {
        let mut enc = Encoder::new();
        let mut invocation = Invocation::new(Selector::device("com.test"), "get");
        invocation.schema = Some(tt_ast::ExpressionSignature {
            kind: tt_ast::FunctionKind::Query,
            args: vec![tt_ast::ArgumentDef::new(
                "at",
                Type::Time,
                tt_ast::ArgDirection::Out,
            )],
            is_list: false,
            is_monitorable: false,
            no_filter: false,
            minimal_projection: Vec::new(),
        });
        enc.encode_invocation("fn1", &invocation);
        let asserts: Vec<_> = enc
            .script
            .commands
            .iter()
            .filter(|c| matches!(c, crate::term::Command::Assert(_)))
            .collect();
        assert_eq!(asserts.len(), 2);
    }

    #[test]
    fn assert_known_groups_declares_function_once_and_asserts_equality() {
        let mut enc = Encoder::new();
        enc.assert_known_groups(
            "tt:contact",
            "tt:contact_group",
            "alice@example.com",
            &["family".to_string(), "coworkers".to_string()],
        );
        enc.assert_known_groups("tt:contact", "tt:contact_group", "bob@example.com", &[]);

        let get_groups_decls = enc
            .script
            .commands
            .iter()
            .filter(|c| matches!(c, crate::term::Command::DeclareFun { name, .. } if name == GET_GROUPS_FN))
            .count();
        assert_eq!(get_groups_decls, 1);

        let equalities = enc
            .script
            .commands
            .iter()
            .filter(|c| matches!(c, crate::term::Command::Assert(_)))
            .count();
        assert_eq!(equalities, 2);
    }
}
