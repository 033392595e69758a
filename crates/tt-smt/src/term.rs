//! The SMT-LIB term builder: a small
//! S-expression tree plus constructors for the handful of top-level
//! commands the encoder emits (`declare-sort`, `declare-datatype`,
//! `declare-fun`, `assert`).
//!
//! This is deliberately not a full SMT-LIB parser/printer — the solver is
//! a pluggable interface and a caller backing it with a real
//! solver process is free to print `Term` however its binding wants; the
//! `Display` impl here exists so tests and diagnostics have something
//! human-readable to compare against.

/// One SMT-LIB term: an atom (`x`, `true`, `3.0`) or an application
/// (`(f a b)`).
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Atom(String),
    App(String, Vec<Term>),
}

impl Term {
    #[must_use]
    pub fn atom(name: impl Into<String>) -> Term {
        Term::Atom(name.into())
    }

    #[must_use]
    pub fn app(head: impl Into<String>, args: Vec<Term>) -> Term {
        Term::App(head.into(), args)
    }

    #[must_use]
    pub fn bool_lit(value: bool) -> Term {
        Term::Atom(if value { "true".to_string() } else { "false".to_string() })
    }

    #[must_use]
    pub fn real_lit(value: f64) -> Term {
        Term::Atom(format!("{value:?}"))
    }

    #[must_use]
    pub fn string_lit(value: &str) -> Term {
        Term::Atom(format!("\"{}\"", value.replace('"', "\"\"")))
    }

    #[must_use]
    pub fn int_lit(value: i64) -> Term {
        Term::Atom(value.to_string())
    }

    #[must_use]
    pub fn and(terms: Vec<Term>) -> Term {
        match terms.len() {
            0 => Term::bool_lit(true),
            1 => terms.into_iter().next().unwrap(),
            _ => Term::app("and", terms),
        }
    }

    #[must_use]
    pub fn or(terms: Vec<Term>) -> Term {
        match terms.len() {
            0 => Term::bool_lit(false),
            1 => terms.into_iter().next().unwrap(),
            _ => Term::app("or", terms),
        }
    }

    #[must_use]
    pub fn not(term: Term) -> Term {
        Term::app("not", vec![term])
    }

    #[must_use]
    pub fn eq(a: Term, b: Term) -> Term {
        Term::app("=", vec![a, b])
    }

    #[must_use]
    pub fn implies(a: Term, b: Term) -> Term {
        Term::app("=>", vec![a, b])
    }

    #[must_use]
    pub fn le(a: Term, b: Term) -> Term {
        Term::app("<=", vec![a, b])
    }

    #[must_use]
    pub fn ge(a: Term, b: Term) -> Term {
        Term::app(">=", vec![a, b])
    }

    #[must_use]
    pub fn member(elem: Term, set: Term) -> Term {
        Term::app("member", vec![elem, set])
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Atom(name) => write!(f, "{name}"),
            Term::App(head, args) if args.is_empty() => write!(f, "({head})"),
            Term::App(head, args) => {
                write!(f, "({head}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One SMT-LIB top-level command, building toward an `(check-sat)` call.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    DeclareSort(String),
    /// `(declare-datatype name ((ctor1 (field Sort) ...) (ctor2) ...))`.
    DeclareDatatype {
        name: String,
        constructors: Vec<(String, Vec<(String, String)>)>,
    },
    DeclareFun {
        name: String,
        params: Vec<String>,
        result: String,
    },
    /// A named assertion: `(assert (! term :named name))`, used so the
    /// unsat core can reference it by `name`.
    AssertNamed {
        name: String,
        term: Term,
    },
    Assert(Term),
}

/// An ordered sequence of commands: a full encoder session's worth of
/// SMT-LIB input.
#[derive(Clone, Debug, Default)]
pub struct Script {
    pub commands: Vec<Command>,
}

impl Script {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_sort(&mut self, name: impl Into<String>) {
        self.commands.push(Command::DeclareSort(name.into()));
    }

    pub fn declare_datatype(
        &mut self,
        name: impl Into<String>,
        constructors: Vec<(String, Vec<(String, String)>)>,
    ) {
        self.commands.push(Command::DeclareDatatype {
            name: name.into(),
            constructors,
        });
    }

    pub fn declare_fun(&mut self, name: impl Into<String>, params: Vec<String>, result: impl Into<String>) {
        self.commands.push(Command::DeclareFun {
            name: name.into(),
            params,
            result: result.into(),
        });
    }

    pub fn assert_named(&mut self, name: impl Into<String>, term: Term) {
        self.commands.push(Command::AssertNamed {
            name: name.into(),
            term,
        });
    }

    pub fn assert(&mut self, term: Term) {
        self.commands.push(Command::Assert(term));
    }

    /// Every name introduced via `assert_named`, in declaration order —
    /// the candidate set a solver's unsat core is drawn from.
    #[must_use]
    pub fn named_assertion_names(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::AssertNamed { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for command in &self.commands {
            match command {
                Command::DeclareSort(name) => writeln!(f, "(declare-sort {name} 0)")?,
                Command::DeclareDatatype { name, constructors } => {
                    write!(f, "(declare-datatype {name} (")?;
                    for (i, (ctor, fields)) in constructors.iter().enumerate() {
                        if i > 0 {
                            write!(f, " ")?;
                        }
                        if fields.is_empty() {
                            write!(f, "({ctor})")?;
                        } else {
                            write!(f, "({ctor}")?;
                            for (field, sort) in fields {
                                write!(f, " ({field} {sort})")?;
                            }
                            write!(f, ")")?;
                        }
                    }
                    writeln!(f, "))")?;
                }
                Command::DeclareFun { name, params, result } => {
                    writeln!(f, "(declare-fun {name} ({}) {result})", params.join(" "))?;
                }
                Command::AssertNamed { name, term } => {
                    writeln!(f, "(assert (! {term} :named {name}))")?;
                }
                Command::Assert(term) => writeln!(f, "(assert {term})")?,
            }
        }
        Ok(())
    }
}
