//! `Statement`, `Program`, and `PermissionRule`.

use crate::action::Action;
use crate::boolean::BooleanExpression;
use crate::class::{ClassDef, ExpressionSignature};
use crate::stream::Stream;
use crate::table::Table;

/// A `let`-bound name.
#[derive(Clone, Debug, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeclarationKind {
    Stream(Stream),
    Table(Table),
    Procedure { statements: Vec<Statement> },
}

/// A stream-triggered rule: `stream => actions`.
#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub stream: Stream,
    pub actions: Vec<Action>,
}

/// A choice presented to the user mid-dialogue.
#[derive(Clone, Debug, PartialEq)]
pub struct OnInputChoice {
    pub label: String,
    pub statements: Vec<Statement>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Declaration(Declaration),
    Assignment { name: String, table: Table },
    Rule(Rule),
    /// A one-shot command: `table? => actions` (`table` is absent for a
    /// pure-action command like `now => @foo.bar();`).
    Command {
        table: Option<Table>,
        actions: Vec<Action>,
    },
    OnInputChoice(OnInputChoice),
}

impl Statement {
    /// The action list of a `Rule`/`Command` statement, used by the
    /// optimizer's "empty action list deletes the statement" rule.
    #[must_use]
    pub fn actions(&self) -> Option<&[Action]> {
        match self {
            Statement::Rule(r) => Some(&r.actions),
            Statement::Command { actions, .. } => Some(actions),
            _ => None,
        }
    }
}

/// A program: the typechecker/optimizer/permission-checker's unit of work.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub classes: Vec<ClassDef>,
    pub declarations: Vec<Declaration>,
    pub rules: Vec<Statement>,
    /// Non-null identifies a remote user this program runs on behalf of.
    pub principal: Option<crate::value::Value>,
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// One of the three permission-function shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum PermissionFunction {
    Builtin,
    Star,
    ClassStar(String),
    Specified {
        kind: String,
        channel: String,
        filter: BooleanExpression,
        schema: Option<ExpressionSignature>,
    },
}

impl PermissionFunction {
    /// Whether this permission function matches an invocation of
    /// `(kind, channel)`.
    #[must_use]
    pub fn matches(&self, kind: &str, channel: &str) -> bool {
        match self {
            PermissionFunction::Builtin => kind == "org.thingpedia.builtin.thingengine.builtin",
            PermissionFunction::Star => true,
            PermissionFunction::ClassStar(k) => k == kind,
            PermissionFunction::Specified {
                kind: k, channel: c, ..
            } => k == kind && c == channel,
        }
    }
}

/// A policy / permission rule.
#[derive(Clone, Debug, PartialEq)]
pub struct PermissionRule {
    pub principal_filter: BooleanExpression,
    pub query: PermissionFunction,
    pub action: PermissionFunction,
}
