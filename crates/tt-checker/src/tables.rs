//! `Table` typechecking.

use rustc_hash::FxHashMap;
use tt_ast::{ArgDirection, ArgumentDef, ExpressionSignature, FunctionKind, Table};
use tt_common::diagnostics::{Result, TypeCheckError};
use tt_common::Location;
use tt_schema::SchemaClient;
use tt_types::Type;

use crate::driver::TypeChecker;
use crate::scope::{GlobalBinding, Scope};

impl<'r> TypeChecker<'r> {
    pub(crate) fn typecheck_table(
        &mut self,
        table: &mut Table,
        scope: &mut Scope,
        client: &mut impl SchemaClient,
    ) -> Result<ExpressionSignature> {
        let sig = match table {
            Table::VarRef(name) => match scope.lookup_global(name) {
                Some(GlobalBinding::Table(sig)) => sig.clone(),
                Some(_) => {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("{name} is not a table"),
                    ))
                }
                None => {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Unknown table {name}"),
                    ))
                }
            },
            Table::Invocation { invocation, .. } => {
                self.typecheck_invocation(invocation, FunctionKind::Query, client, scope)?
            }
            Table::Filter { table, filter, .. } => {
                let inner = self.typecheck_table(table, scope, client)?;
                scope.push_frame();
                scope.bind_outputs(&inner);
                let result = self.typecheck_boolean(filter, Some(&inner), scope, client);
                scope.pop_frame();
                result?;

                let mut narrowed = inner.clone();
                if Self::filter_touches_unique(filter, &inner) {
                    narrowed.no_filter = true;
                }
                narrowed
            }
            Table::Projection {
                table,
                args,
                computations,
                ..
            } => {
                let inner = self.typecheck_table(table, scope, client)?;
                for name in args.iter() {
                    if inner.arg(name).is_none() {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("Cannot project unknown field {name}"),
                        ));
                    }
                }
                if args.len() == 1 && inner.out_args().count() == 1 {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        "Projecting to the only output a function has is redundant",
                    ));
                }
                scope.push_frame();
                scope.bind_outputs(&inner);
                for computation in computations.iter_mut() {
                    self.compute_value_type(computation, scope, client)?;
                }
                scope.pop_frame();
                inner.projected(args)
            }
            Table::Compute {
                table,
                value,
                alias,
                ..
            } => {
                let inner = self.typecheck_table(table, scope, client)?;
                scope.push_frame();
                scope.bind_outputs(&inner);
                let computed_ty = self.compute_value_type(value, scope, client)?;
                scope.pop_frame();

                let field_name = alias.clone().unwrap_or_else(|| "result".to_string());
                let mut widened = inner.clone();
                widened.args.push(ArgumentDef::new(field_name, computed_ty, ArgDirection::Out));
                widened
            }
            Table::Alias { table, .. } => self.typecheck_table(table, scope, client)?,
            Table::Aggregation {
                table, op, field, ..
            } => {
                let inner = self.typecheck_table(table, scope, client)?;
                let result_ty = if op == "count" {
                    Type::Number
                } else {
                    let field_name = field.as_deref().ok_or_else(|| {
                        TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("Aggregation {op} requires a field"),
                        )
                    })?;
                    let arg = inner.arg(field_name).ok_or_else(|| {
                        TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("Unknown field {field_name}"),
                        )
                    })?;
                    let (_, result) = self
                        .overloads
                        .resolve(op, &[arg.arg_type.clone()], &self.inheritance)
                        .map_err(|e| TypeCheckError::type_error(Location::UNKNOWN, e.to_string()))?;
                    result
                };
                ExpressionSignature {
                    kind: FunctionKind::Query,
                    args: vec![ArgumentDef::new("result", result_ty, ArgDirection::Out)],
                    is_list: false,
                    is_monitorable: false,
                    no_filter: false,
                    minimal_projection: Vec::new(),
                }
            }
            Table::Sort { table, field, .. } => {
                let inner = self.typecheck_table(table, scope, client)?;
                let arg = inner.arg(field).ok_or_else(|| {
                    TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Cannot sort on unknown field {field}"),
                    )
                })?;
                if !arg.arg_type.is_comparable() {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Cannot sort on {field}: {} is not comparable", arg.arg_type),
                    ));
                }
                inner
            }
            Table::Index { table, indices, .. } => {
                let inner = self.typecheck_table(table, scope, client)?;
                for index in indices.iter_mut() {
                    let ty = self.compute_value_type(index, scope, client)?;
                    let is_array_of_numbers = matches!(&ty, Type::Array(elem) if matches!(**elem, Type::Number));
                    if ty != Type::Number && ty != Type::Any && !is_array_of_numbers {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("Index must be a Number or Array(Number), got {ty}"),
                        ));
                    }
                }
                let mut narrowed = inner;
                if indices.len() == 1 {
                    narrowed.is_list = false;
                }
                narrowed
            }
            Table::Slice { table, base, limit, .. } => {
                let inner = self.typecheck_table(table, scope, client)?;
                for value in [base, limit] {
                    let ty = self.compute_value_type(value, scope, client)?;
                    if ty != Type::Number && ty != Type::Any {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            "Slice bounds must be Numbers",
                        ));
                    }
                }
                inner
            }
            Table::Join {
                lhs,
                rhs,
                in_params,
                ..
            } => {
                let lhs_sig = self.typecheck_table(lhs, scope, client)?;
                scope.push_frame();
                scope.bind_outputs(&lhs_sig);
                let rhs_sig = self.typecheck_table(rhs, scope, client)?;
                self.typecheck_invocation_params(in_params, &rhs_sig, scope, client)?;
                scope.pop_frame();

                let mut merged_args: Vec<ArgumentDef> = lhs_sig.args.clone();
                for arg in &rhs_sig.args {
                    if !merged_args.iter().any(|a| a.name == arg.name) {
                        merged_args.push(arg.clone());
                    }
                }
                let mut joined: FxHashMap<String, ()> = FxHashMap::default();
                merged_args.retain(|a| joined.insert(a.name.clone(), ()).is_none());

                ExpressionSignature {
                    kind: FunctionKind::Query,
                    args: merged_args,
                    is_list: lhs_sig.is_list || rhs_sig.is_list,
                    is_monitorable: lhs_sig.is_monitorable && rhs_sig.is_monitorable,
                    no_filter: false,
                    minimal_projection: Vec::new(),
                }
            }
        };
        table.set_schema(sig.clone());
        Ok(sig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::Value;
    use tt_common::TypeCheckError;
    use tt_schema::{SchemaClient, SchemaRetriever};

    use crate::scope::GlobalBinding;

    struct NoopClient;

    impl SchemaClient for NoopClient {
        fn get_device_code(&mut self, kind: &str) -> Result<tt_ast::ClassDef> {
            Err(TypeCheckError::invalid_kind(Location::UNKNOWN, kind))
        }
        fn get_schemas(&mut self, _kinds: &[String], _include_metadata: bool) -> Result<Vec<tt_ast::ClassDef>> {
            Ok(Vec::new())
        }
        fn get_mixins(&mut self) -> Result<rustc_hash::FxHashMap<String, tt_schema::MixinDef>> {
            Ok(rustc_hash::FxHashMap::default())
        }
    }

    fn source_with_field(name: &str, ty: Type, is_list: bool) -> (Table, ExpressionSignature) {
        let sig = ExpressionSignature {
            kind: FunctionKind::Query,
            args: vec![ArgumentDef::new(name, ty, ArgDirection::Out)],
            is_list,
            is_monitorable: false,
            no_filter: false,
            minimal_projection: Vec::new(),
        };
        (Table::VarRef("source".to_string()), sig)
    }

    fn scope_with_source(sig: ExpressionSignature) -> Scope {
        let mut scope = Scope::new();
        scope.bind_global("source", GlobalBinding::Table(sig));
        scope
    }

    #[test]
    fn sort_on_comparable_field_is_accepted() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = NoopClient;
        let (source, sig) = source_with_field("price", Type::Number, true);
        let mut scope = scope_with_source(sig);

        let mut table = Table::Sort {
            table: Box::new(source),
            field: "price".to_string(),
            direction: tt_ast::SortDirection::Asc,
            schema: None,
        };
        assert!(checker.typecheck_table(&mut table, &mut scope, &mut client).is_ok());
    }

    #[test]
    fn sort_on_non_comparable_field_is_rejected() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = NoopClient;
        let (source, sig) = source_with_field("picture", Type::Entity("tt:picture".to_string()), true);
        let mut scope = scope_with_source(sig);

        let mut table = Table::Sort {
            table: Box::new(source),
            field: "picture".to_string(),
            direction: tt_ast::SortDirection::Asc,
            schema: None,
        };
        assert!(checker.typecheck_table(&mut table, &mut scope, &mut client).is_err());
    }

    #[test]
    fn index_accepts_a_single_number() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = NoopClient;
        let (source, sig) = source_with_field("x", Type::String, true);
        let mut scope = scope_with_source(sig);

        let mut table = Table::Index {
            table: Box::new(source),
            indices: vec![Value::Number(1.0)],
            schema: None,
        };
        assert!(checker.typecheck_table(&mut table, &mut scope, &mut client).is_ok());
    }

    #[test]
    fn index_accepts_an_array_of_numbers() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = NoopClient;
        let (source, sig) = source_with_field("x", Type::String, true);
        let mut scope = scope_with_source(sig);

        let mut table = Table::Index {
            table: Box::new(source),
            indices: vec![Value::ArrayValue(vec![Value::Number(1.0), Value::Number(2.0)])],
            schema: None,
        };
        assert!(checker.typecheck_table(&mut table, &mut scope, &mut client).is_ok());
    }

    #[test]
    fn index_rejects_a_string() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = NoopClient;
        let (source, sig) = source_with_field("x", Type::String, true);
        let mut scope = scope_with_source(sig);

        let mut table = Table::Index {
            table: Box::new(source),
            indices: vec![Value::String("nope".to_string())],
            schema: None,
        };
        assert!(checker.typecheck_table(&mut table, &mut scope, &mut client).is_err());
    }
}
