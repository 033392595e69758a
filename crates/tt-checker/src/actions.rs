//! Invocation and `Action` typechecking.

use tt_ast::{Action, ArgDirection, ExpressionSignature, FunctionKind, Invocation, Selector, Value};
use tt_common::diagnostics::{Result, TypeCheckError};
use tt_common::Location;
use tt_schema::SchemaClient;
use tt_types::is_assignable;

use crate::driver::{TypeChecker, BUILTIN_CLASS, CANONICAL_REMOTE_CLASS};
use crate::scope::Scope;

pub(crate) fn selector_kind(selector: &Selector) -> String {
    match selector {
        Selector::Builtin => BUILTIN_CLASS.to_string(),
        Selector::Device { kind, .. } if kind == "remote" => CANONICAL_REMOTE_CLASS.to_string(),
        Selector::Device { kind, .. } => kind.clone(),
    }
}

impl<'r> TypeChecker<'r> {
    /// Check a selector's `id`/`all`/`attributes` shape.
    fn typecheck_selector(&self, selector: &Selector) -> Result<()> {
        if let Selector::Device { id, all, attributes, .. } = selector {
            if id.is_some() && *all {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    "A selector cannot be both `id`-bound and `all`",
                ));
            }
            for (name, _) in attributes {
                if !self.options.selector_attributes.iter().any(|a| a == name) {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Unknown selector attribute {name}"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Typecheck `in_params` against `sig`'s declared input arguments:
    /// every name must exist and be an input, no duplicates, values must
    /// be assignable, and every unfilled `InReq` argument is auto-filled
    /// with `Undefined { local: false }`.
    pub(crate) fn typecheck_invocation_params(
        &mut self,
        in_params: &mut Vec<(String, Value)>,
        sig: &ExpressionSignature,
        scope: &mut Scope,
        client: &mut impl SchemaClient,
    ) -> Result<()> {
        let mut seen: Vec<String> = Vec::new();
        for (name, value) in in_params.iter_mut() {
            if seen.contains(name) {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("Duplicate input parameter {name}"),
                ));
            }
            seen.push(name.clone());

            let arg = sig.arg(name).ok_or_else(|| {
                TypeCheckError::type_error(Location::UNKNOWN, format!("Unknown input parameter {name}"))
            })?;
            if !arg.direction.is_input() {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("{name} is an output parameter, not an input"),
                ));
            }

            let value_ty = self.compute_value_type(value, scope, client)?;
            if !is_assignable(&value_ty, &arg.arg_type, &mut Default::default(), true, &self.inheritance) {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!(
                        "Cannot assign {value_ty} to parameter {name} of type {}",
                        arg.arg_type
                    ),
                ));
            }
        }

        for arg in sig.args.iter().filter(|a| a.direction == ArgDirection::InReq) {
            if !seen.iter().any(|n| n == &arg.name) {
                in_params.push((arg.name.clone(), Value::Undefined { local: false }));
            }
        }
        Ok(())
    }

    /// `typecheck_invocation`: resolves the
    /// selector's schema, validates/fills `in_params`, and stamps the
    /// resolved `ExpressionSignature` onto the node.
    pub(crate) fn typecheck_invocation(
        &mut self,
        invocation: &mut Invocation,
        kind: FunctionKind,
        client: &mut impl SchemaClient,
        scope: &mut Scope,
    ) -> Result<ExpressionSignature> {
        self.typecheck_selector(&invocation.selector)?;

        if let Selector::Device { id: Some(id), .. } = &invocation.selector {
            let id = id.clone();
            if self.retriever.full_class(&id).is_none() && !self.retriever.is_negatively_cached(&id) {
                self.retriever.fetch_one(&id, client)?;
                self.validate_fetched(client)?;
            }
        }

        let owner_kind = selector_kind(&invocation.selector);
        self.retriever.request(&owner_kind);
        self.retriever.flush(client)?;
        self.validate_fetched(client)?;
        let Some(signatures) = self.retriever.signatures(&owner_kind) else {
            return Err(TypeCheckError::invalid_kind(Location::UNKNOWN, &owner_kind));
        };
        let sig = signatures
            .get(kind, &invocation.channel)
            .cloned()
            .ok_or_else(|| {
                TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("Unknown function {} on {owner_kind}", invocation.channel),
                )
            })?;

        self.typecheck_invocation_params(&mut invocation.in_params, &sig, scope, client)?;
        invocation.schema = Some(sig.clone());
        Ok(sig)
    }

    /// `typecheck_action`. `Notify` carries no
    /// schema; `VarRef` resolves against a `let`-bound procedure.
    pub(crate) fn typecheck_action(
        &mut self,
        action: &mut Action,
        scope: &mut Scope,
        client: &mut impl SchemaClient,
    ) -> Result<()> {
        match action {
            Action::Notify(_) => Ok(()),
            Action::VarRef(name) => match scope.lookup_global(name) {
                Some(crate::scope::GlobalBinding::Procedure) => Ok(()),
                Some(_) => Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("{name} is not a procedure"),
                )),
                None => Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("Unknown procedure {name}"),
                )),
            },
            Action::Invocation(invocation) => {
                self.typecheck_invocation(invocation, FunctionKind::Action, client, scope)?;
                Ok(())
            }
        }
    }
}
