//! Boolean expression typechecking.

use tt_ast::{BooleanExpression, ExpressionSignature, FunctionKind, Selector};
use tt_common::diagnostics::{Result, TypeCheckError};
use tt_common::Location;
use tt_schema::SchemaClient;
use tt_types::Type;

use crate::driver::{TypeChecker, BUILTIN_CLASS, CANONICAL_REMOTE_CLASS};
use crate::scope::Scope;

fn external_selector_kind(selector: &Selector) -> String {
    match selector {
        Selector::Builtin => BUILTIN_CLASS.to_string(),
        Selector::Device { kind, .. } if kind == "remote" => CANONICAL_REMOTE_CLASS.to_string(),
        Selector::Device { kind, .. } => kind.clone(),
    }
}

impl<'r> TypeChecker<'r> {
    /// Typecheck a filter, resolving atom names against `schema`'s
    /// arguments (falling back to the lexical `scope`) and filling in
    /// each `Atom`'s `overload` field.
    pub(crate) fn typecheck_boolean(
        &mut self,
        filter: &mut BooleanExpression,
        schema: Option<&ExpressionSignature>,
        scope: &mut Scope,
        client: &mut impl SchemaClient,
    ) -> Result<()> {
        match filter {
            BooleanExpression::True | BooleanExpression::False => Ok(()),
            BooleanExpression::And(ops) | BooleanExpression::Or(ops) => {
                for op in ops {
                    self.typecheck_boolean(op, schema, scope, client)?;
                }
                Ok(())
            }
            BooleanExpression::Not(op) => self.typecheck_boolean(op, schema, scope, client),
            BooleanExpression::DontCare { name } => {
                if let Some(schema) = schema {
                    if schema.arg(name).is_none() && scope.lookup_local(name).is_none() {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("Unknown name {name}"),
                        ));
                    }
                }
                Ok(())
            }
            BooleanExpression::Atom {
                name,
                operator,
                value,
                overload,
            } => {
                let lhs_ty = schema
                    .and_then(|s| s.arg(name))
                    .map(|a| a.arg_type.clone())
                    .or_else(|| scope.lookup_local(name).cloned())
                    .ok_or_else(|| {
                        TypeCheckError::type_error(Location::UNKNOWN, format!("Unknown name {name}"))
                    })?;

                if let Some(schema) = schema {
                    if let Some(arg) = schema.arg(name) {
                        if arg.unique && schema.no_filter {
                            return Err(TypeCheckError::type_error(
                                Location::UNKNOWN,
                                format!("Cannot filter on {name}: already uniquely identified"),
                            ));
                        }
                    }
                }

                let rhs_ty = self.compute_value_type(value, scope, client)?;

                // Filter operators never silently cast entity kinds
                //: resolve with casting disabled regardless
                // of the operator's general `allow_cast` declaration.
                let (_, result_ty) = self
                    .overloads
                    .resolve(operator, &[lhs_ty.clone(), rhs_ty.clone()], &self.inheritance)
                    .map_err(|e| TypeCheckError::type_error(Location::UNKNOWN, e.to_string()))?;

                *overload = Some([lhs_ty.to_string(), rhs_ty.to_string(), result_ty.to_string()]);
                Ok(())
            }
            BooleanExpression::Compute { lhs, op, rhs } => {
                let lhs_ty = self.compute_value_type(lhs, scope, client)?;
                let rhs_ty = self.compute_value_type(rhs, scope, client)?;
                let (_, result_ty) = self
                    .overloads
                    .resolve(op, &[lhs_ty, rhs_ty], &self.inheritance)
                    .map_err(|e| TypeCheckError::type_error(Location::UNKNOWN, e.to_string()))?;
                if result_ty != Type::Boolean {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Compute expression must resolve to Boolean, got {result_ty}"),
                    ));
                }
                Ok(())
            }
            BooleanExpression::External {
                selector,
                channel,
                in_params,
                filter: inner_filter,
                schema: ext_schema,
            } => {
                let kind = external_selector_kind(selector);
                self.retriever.request(&kind);
                self.retriever.flush(client)?;
                self.validate_fetched(client)?;
                let Some(signatures) = self.retriever.signatures(&kind) else {
                    return Err(TypeCheckError::invalid_kind(Location::UNKNOWN, &kind));
                };
                let sig = signatures
                    .get(FunctionKind::Query, channel)
                    .cloned()
                    .ok_or_else(|| {
                        TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("Unknown function {channel} on {kind}"),
                        )
                    })?;

                self.typecheck_invocation_params(in_params, &sig, scope, client)?;

                *ext_schema = Some(sig.clone());
                scope.push_frame();
                scope.bind_outputs(&sig);
                let result = self.typecheck_boolean(inner_filter, Some(&sig), scope, client);
                scope.pop_frame();
                result
            }
        }
    }

    /// Is `filter` a direct `Atom` on a field the schema marks `unique`?
    /// Only a bare top-level atom counts: a unique-field atom nested under
    /// `And`/`Or`/`Not` passes through untouched, since only a query
    /// reduced to a single equality on a unique field is provably already
    /// `no_filter`.
    pub(crate) fn filter_touches_unique(
        filter: &BooleanExpression,
        schema: &ExpressionSignature,
    ) -> bool {
        match filter {
            BooleanExpression::Atom { name, .. } => schema.arg(name).is_some_and(|a| a.unique),
            _ => false,
        }
    }
}
