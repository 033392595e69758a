//! `BooleanExpression`.

use crate::action::{Invocation, Selector};
use crate::class::ExpressionSignature;
use crate::value::Value;

/// `BooleanExpression`.
///
/// `True`/`False` are the two "boolean leaves" exempt from carrying a
/// schema. Every other variant is filled in by the
/// typechecker: `Atom` gets a resolved `overload`, `External` gets a
/// resolved `schema` for its embedded invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum BooleanExpression {
    True,
    False,
    And(Vec<BooleanExpression>),
    Or(Vec<BooleanExpression>),
    Not(Box<BooleanExpression>),
    Atom {
        name: String,
        operator: String,
        value: Value,
        /// `[lhs_type, rhs_type, result_type]`, filled by the typechecker
        /// after overload resolution.
        overload: Option<[String; 3]>,
    },
    Compute {
        lhs: Value,
        op: String,
        rhs: Value,
    },
    External {
        selector: Selector,
        channel: String,
        in_params: Vec<(String, Value)>,
        filter: Box<BooleanExpression>,
        schema: Option<ExpressionSignature>,
    },
    /// A filter slot the dialogue agent should ask the user to specify.
    DontCare {
        name: String,
    },
}

impl BooleanExpression {
    #[must_use]
    pub fn and(ops: Vec<BooleanExpression>) -> BooleanExpression {
        BooleanExpression::And(ops)
    }

    #[must_use]
    pub fn or(ops: Vec<BooleanExpression>) -> BooleanExpression {
        BooleanExpression::Or(ops)
    }

    #[must_use]
    pub fn not(op: BooleanExpression) -> BooleanExpression {
        BooleanExpression::Not(Box::new(op))
    }

    #[must_use]
    pub fn atom(name: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        BooleanExpression::Atom {
            name: name.into(),
            operator: operator.into(),
            value,
            overload: None,
        }
    }

    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, BooleanExpression::True)
    }

    #[must_use]
    pub fn is_false(&self) -> bool {
        matches!(self, BooleanExpression::False)
    }

    /// Every name referenced as the LHS of an `Atom`/`Compute`, used by
    /// the optimizer's filter/projection commute rule to
    /// check "`f` references only `a`".
    pub fn referenced_names(&self, out: &mut Vec<String>) {
        match self {
            BooleanExpression::True | BooleanExpression::False => {}
            BooleanExpression::And(ops) | BooleanExpression::Or(ops) => {
                for op in ops {
                    op.referenced_names(out);
                }
            }
            BooleanExpression::Not(op) => op.referenced_names(out),
            BooleanExpression::Atom { name, .. } => out.push(name.clone()),
            BooleanExpression::Compute { .. } => {}
            BooleanExpression::External { filter, .. } => filter.referenced_names(out),
            BooleanExpression::DontCare { name } => out.push(name.clone()),
        }
    }

    /// `External`'s selector/channel are inline, not a full
    /// `Invocation` node, so there's nothing to recurse into there;
    /// invocation primitives come from Table/Stream/Action, not filters.
    /// This just walks the connective structure looking for nested ones.
    pub fn for_each_invocation(&self, f: &mut impl FnMut(&Invocation)) {
        match self {
            BooleanExpression::And(ops) | BooleanExpression::Or(ops) => {
                for op in ops {
                    op.for_each_invocation(f);
                }
            }
            BooleanExpression::Not(op) => op.for_each_invocation(f),
            _ => {}
        }
    }
}
