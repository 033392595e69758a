//! `Declaration`/`Statement` typechecking.

use tt_ast::{Declaration, DeclarationKind, OnInputChoice, Rule, Statement};
use tt_common::diagnostics::Result;
use tt_schema::SchemaClient;

use crate::driver::TypeChecker;
use crate::scope::{GlobalBinding, Scope};

impl<'r> TypeChecker<'r> {
    pub(crate) fn typecheck_declaration(
        &mut self,
        decl: &mut Declaration,
        scope: &mut Scope,
        client: &mut impl SchemaClient,
    ) -> Result<()> {
        match &mut decl.kind {
            DeclarationKind::Stream(stream) => {
                scope.set_has_event(false);
                let sig = self.typecheck_stream(stream, scope, client)?;
                scope.set_has_event(false);
                scope.bind_global(decl.name.clone(), GlobalBinding::Stream(sig));
            }
            DeclarationKind::Table(table) => {
                scope.set_has_event(false);
                let sig = self.typecheck_table(table, scope, client)?;
                scope.set_has_event(false);
                scope.bind_global(decl.name.clone(), GlobalBinding::Table(sig));
            }
            DeclarationKind::Procedure { statements } => {
                for stmt in statements {
                    self.typecheck_statement(stmt, scope, client)?;
                }
                scope.bind_global(decl.name.clone(), GlobalBinding::Procedure);
            }
        }
        Ok(())
    }

    pub(crate) fn typecheck_statement(
        &mut self,
        stmt: &mut Statement,
        scope: &mut Scope,
        client: &mut impl SchemaClient,
    ) -> Result<()> {
        match stmt {
            Statement::Declaration(decl) => self.typecheck_declaration(decl, scope, client),
            Statement::Assignment { name, table } => {
                scope.set_has_event(false);
                let sig = self.typecheck_table(table, scope, client)?;
                scope.set_has_event(false);
                scope.bind_global(name.clone(), GlobalBinding::Table(sig));
                Ok(())
            }
            Statement::Rule(Rule { stream, actions }) => {
                let sig = self.typecheck_stream(stream, scope, client)?;
                scope.push_frame();
                scope.bind_outputs(&sig);
                scope.set_has_event(true);
                for action in actions.iter_mut() {
                    self.typecheck_action(action, scope, client)?;
                }
                scope.set_has_event(false);
                scope.pop_frame();
                Ok(())
            }
            Statement::Command { table, actions } => {
                scope.push_frame();
                if let Some(table) = table {
                    let sig = self.typecheck_table(table, scope, client)?;
                    scope.bind_outputs(&sig);
                    scope.set_has_event(true);
                }
                for action in actions.iter_mut() {
                    self.typecheck_action(action, scope, client)?;
                }
                scope.set_has_event(false);
                scope.pop_frame();
                Ok(())
            }
            Statement::OnInputChoice(OnInputChoice { statements, .. }) => {
                for stmt in statements {
                    self.typecheck_statement(stmt, scope, client)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::{ArgDirection, ArgumentDef, ExpressionSignature, FunctionKind, Stream};
    use tt_common::diagnostics::TypeCheckError;
    use tt_schema::SchemaRetriever;

    struct NoopClient;

    impl SchemaClient for NoopClient {
        fn get_device_code(&mut self, kind: &str) -> Result<tt_ast::ClassDef> {
            Err(TypeCheckError::invalid_kind(tt_common::Location::UNKNOWN, kind))
        }
        fn get_schemas(&mut self, _kinds: &[String], _include_metadata: bool) -> Result<Vec<tt_ast::ClassDef>> {
            Ok(Vec::new())
        }
        fn get_mixins(&mut self) -> Result<rustc_hash::FxHashMap<String, tt_schema::MixinDef>> {
            Ok(rustc_hash::FxHashMap::default())
        }
    }

    fn join_producing_signature() -> ExpressionSignature {
        ExpressionSignature {
            kind: FunctionKind::Query,
            args: vec![ArgumentDef::new("x", Type::Number, ArgDirection::Out)],
            is_list: false,
            is_monitorable: true,
            no_filter: false,
            minimal_projection: Vec::new(),
        }
    }

    /// A declaration whose body is a `Stream::Join` sets `scope.has_event`
    /// to `true` while typechecking the join's table side and never clears
    /// it itself (that's correct for a `Join` reached through a `Rule`'s own
    /// trigger, where the flag is meant to persist into the rule's
    /// actions). A `let`-bound declaration has no downstream actions of its
    /// own, so that `true` must not survive past `typecheck_declaration` and
    /// leak into the next thing typechecked against the same `Scope`.
    #[test]
    fn declaration_join_does_not_leak_has_event_forward() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = NoopClient;
        let mut scope = Scope::new();
        scope.bind_global("lhs", GlobalBinding::Stream(join_producing_signature()));
        scope.bind_global("rhs", GlobalBinding::Table(join_producing_signature()));

        let mut decl = Declaration {
            name: "joined".to_string(),
            kind: DeclarationKind::Stream(Stream::Join {
                stream: Box::new(Stream::VarRef("lhs".to_string())),
                table: Box::new(Table::VarRef("rhs".to_string())),
                in_params: Vec::new(),
                schema: None,
            }),
        };

        checker
            .typecheck_declaration(&mut decl, &mut scope, &mut client)
            .expect("join declaration typechecks");
        assert!(!scope.has_event(), "has_event must not leak out of a declaration");
    }
}
