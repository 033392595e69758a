//! Filter algebra simplification: `And`/`Or` flattening and
//! constant folding, `Not` folding, and the `x op x` tautology rule.

use tt_ast::{BooleanExpression, Value};

/// Simplify `expr` in place. Returns whether anything changed, so callers
/// that loop to a fixed point can stop early.
pub fn optimize_boolean(expr: &mut BooleanExpression) -> bool {
    let mut changed = false;
    match expr {
        BooleanExpression::And(ops) => {
            for op in ops.iter_mut() {
                changed |= optimize_boolean(op);
            }
            changed |= flatten(ops, true);
            if ops.iter().any(BooleanExpression::is_false) {
                *expr = BooleanExpression::False;
                return true;
            }
            ops.retain(|op| !op.is_true());
            if ops.is_empty() {
                *expr = BooleanExpression::True;
                return true;
            }
            if ops.len() == 1 {
                *expr = ops.remove(0);
                return true;
            }
        }
        BooleanExpression::Or(ops) => {
            for op in ops.iter_mut() {
                changed |= optimize_boolean(op);
            }
            changed |= flatten(ops, false);
            if ops.iter().any(BooleanExpression::is_true) {
                *expr = BooleanExpression::True;
                return true;
            }
            ops.retain(|op| !op.is_false());
            if ops.is_empty() {
                *expr = BooleanExpression::False;
                return true;
            }
            if ops.len() == 1 {
                *expr = ops.remove(0);
                return true;
            }
        }
        BooleanExpression::Not(inner) => {
            changed |= optimize_boolean(inner);
            match inner.as_ref() {
                BooleanExpression::True => {
                    *expr = BooleanExpression::False;
                    return true;
                }
                BooleanExpression::False => {
                    *expr = BooleanExpression::True;
                    return true;
                }
                BooleanExpression::Not(grandchild) => {
                    *expr = (**grandchild).clone();
                    return true;
                }
                _ => {}
            }
        }
        BooleanExpression::Atom {
            name, operator, value, ..
        } => {
            if matches!(value, Value::VarRef(rhs) if rhs == name)
                && matches!(operator.as_str(), "==" | "=~" | "<=" | ">=")
            {
                *expr = BooleanExpression::True;
                return true;
            }
        }
        BooleanExpression::External { filter, .. } => {
            changed |= optimize_boolean(filter);
        }
        BooleanExpression::True
        | BooleanExpression::False
        | BooleanExpression::Compute { .. }
        | BooleanExpression::DontCare { .. } => {}
    }
    changed
}

/// Splice any direct child of the same connective kind into `ops`.
fn flatten(ops: &mut Vec<BooleanExpression>, is_and: bool) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i < ops.len() {
        let nested = matches!(
            (&ops[i], is_and),
            (BooleanExpression::And(_), true) | (BooleanExpression::Or(_), false)
        );
        if !nested {
            i += 1;
            continue;
        }
        let inner = match ops.remove(i) {
            BooleanExpression::And(inner) | BooleanExpression::Or(inner) => inner,
            _ => unreachable!("matched above"),
        };
        for (offset, op) in inner.into_iter().enumerate() {
            ops.insert(i + offset, op);
        }
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str, op: &str, value: Value) -> BooleanExpression {
        BooleanExpression::atom(name, op, value)
    }

    #[test]
    fn flattens_and_folds_constants() {
        // (A ∧ True) ∨ False ∨ (B ∧ ¬¬C) → A ∨ (B ∧ C)
        let a = atom("a", "==", Value::Number(1.0));
        let b = atom("b", "==", Value::Number(2.0));
        let c = atom("c", "==", Value::Number(3.0));
        let mut expr = BooleanExpression::or(vec![
            BooleanExpression::and(vec![a.clone(), BooleanExpression::True]),
            BooleanExpression::False,
            BooleanExpression::and(vec![
                b.clone(),
                BooleanExpression::not(BooleanExpression::not(c.clone())),
            ]),
        ]);
        while optimize_boolean(&mut expr) {}
        assert_eq!(expr, BooleanExpression::or(vec![a, BooleanExpression::and(vec![b, c])]));
    }

    #[test]
    fn empty_and_is_true_empty_or_is_false() {
        let mut and_expr = BooleanExpression::And(Vec::new());
        while optimize_boolean(&mut and_expr) {}
        assert_eq!(and_expr, BooleanExpression::True);

        let mut or_expr = BooleanExpression::Or(Vec::new());
        while optimize_boolean(&mut or_expr) {}
        assert_eq!(or_expr, BooleanExpression::False);
    }

    #[test]
    fn self_comparison_atom_folds_to_true() {
        let mut expr = atom("x", "==", Value::var_ref("x"));
        assert!(optimize_boolean(&mut expr));
        assert_eq!(expr, BooleanExpression::True);
    }

    #[test]
    fn unrelated_atom_is_left_alone() {
        let mut expr = atom("x", "==", Value::Number(5.0));
        assert!(!optimize_boolean(&mut expr));
    }
}
