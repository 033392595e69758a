//! `Stream` typechecking.

use tt_ast::{ArgDirection, ArgumentDef, ExpressionSignature, FunctionKind, Stream};
use tt_common::diagnostics::{Result, TypeCheckError};
use tt_common::Location;
use tt_schema::SchemaClient;
use tt_types::Type;

use crate::driver::TypeChecker;
use crate::scope::{GlobalBinding, Scope};

impl<'r> TypeChecker<'r> {
    pub(crate) fn typecheck_stream(
        &mut self,
        stream: &mut Stream,
        scope: &mut Scope,
        client: &mut impl SchemaClient,
    ) -> Result<ExpressionSignature> {
        let sig = match stream {
            Stream::VarRef(name) => match scope.lookup_global(name) {
                Some(GlobalBinding::Stream(sig)) => sig.clone(),
                Some(_) => {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("{name} is not a stream"),
                    ))
                }
                None => {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Unknown stream {name}"),
                    ))
                }
            },
            Stream::Timer { base, interval, .. } => {
                let base_ty = self.compute_value_type(base, scope, client)?;
                if base_ty != Type::Date && base_ty != Type::Any {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Timer base must be a Date, got {base_ty}"),
                    ));
                }
                let interval_ty = self.compute_value_type(interval, scope, client)?;
                if !matches!(interval_ty, Type::Measure(_) | Type::Any) {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Timer interval must be a Measure, got {interval_ty}"),
                    ));
                }
                empty_query_signature(false)
            }
            Stream::AtTimer { times, expiration, .. } => {
                for time in times.iter_mut() {
                    self.compute_value_type(time, scope, client)?;
                }
                if let Some(expiration) = expiration {
                    self.compute_value_type(expiration, scope, client)?;
                }
                empty_query_signature(false)
            }
            Stream::Monitor { table, args, .. } => {
                let inner = self.typecheck_table(table, scope, client)?;
                if !inner.is_monitorable {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        "This table is not monitorable",
                    ));
                }
                match args {
                    Some(names) => {
                        for name in names {
                            if inner.arg(name).is_none() {
                                return Err(TypeCheckError::type_error(
                                    Location::UNKNOWN,
                                    format!("Cannot monitor unknown field {name}"),
                                ));
                            }
                        }
                        inner.projected(names)
                    }
                    None => inner,
                }
            }
            Stream::EdgeNew { stream, .. } => self.typecheck_stream(stream, scope, client)?,
            Stream::EdgeFilter { stream, filter, .. } => {
                let inner = self.typecheck_stream(stream, scope, client)?;
                scope.push_frame();
                scope.bind_outputs(&inner);
                let result = self.typecheck_boolean(filter, Some(&inner), scope, client);
                scope.pop_frame();
                result?;
                inner
            }
            Stream::Filter { stream, filter, .. } => {
                let inner = self.typecheck_stream(stream, scope, client)?;
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
            Stream::Projection {
                stream,
                args,
                computations,
                ..
            } => {
                let inner = self.typecheck_stream(stream, scope, client)?;
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
            Stream::Compute {
                stream,
                value,
                alias,
                ..
            } => {
                let inner = self.typecheck_stream(stream, scope, client)?;
                scope.push_frame();
                scope.bind_outputs(&inner);
                let computed_ty = self.compute_value_type(value, scope, client)?;
                scope.pop_frame();

                let field_name = alias.clone().unwrap_or_else(|| "result".to_string());
                let mut widened = inner.clone();
                widened.args.push(ArgumentDef::new(field_name, computed_ty, ArgDirection::Out));
                widened
            }
            Stream::Alias { stream, .. } => self.typecheck_stream(stream, scope, client)?,
            Stream::Join {
                stream,
                table,
                in_params,
                ..
            } => {
                let stream_sig = self.typecheck_stream(stream, scope, client)?;
                scope.push_frame();
                scope.bind_outputs(&stream_sig);
                scope.set_has_event(true);
                let table_sig = self.typecheck_table(table, scope, client)?;
                self.typecheck_invocation_params(in_params, &table_sig, scope, client)?;
                scope.pop_frame();

                let mut merged_args: Vec<ArgumentDef> = stream_sig.args.clone();
                for arg in &table_sig.args {
                    if !merged_args.iter().any(|a| a.name == arg.name) {
                        merged_args.push(arg.clone());
                    }
                }
                ExpressionSignature {
                    kind: FunctionKind::Query,
                    args: merged_args,
                    is_list: stream_sig.is_list || table_sig.is_list,
                    is_monitorable: stream_sig.is_monitorable && table_sig.is_monitorable,
                    no_filter: false,
                    minimal_projection: Vec::new(),
                }
            }
        };
        stream.set_schema(sig.clone());
        Ok(sig)
    }
}

fn empty_query_signature(is_list: bool) -> ExpressionSignature {
    ExpressionSignature {
        kind: FunctionKind::Query,
        args: Vec::new(),
        is_list,
        is_monitorable: true,
        no_filter: false,
        minimal_projection: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::Table;
    use tt_common::diagnostics::TypeCheckError;
    use tt_schema::SchemaRetriever;

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

    #[test]
    fn monitor_on_a_non_monitorable_table_errors() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = NoopClient;

        let sig = ExpressionSignature {
            kind: FunctionKind::Query,
            args: Vec::new(),
            is_list: true,
            is_monitorable: false,
            no_filter: false,
            minimal_projection: Vec::new(),
        };
        let mut scope = Scope::new();
        scope.bind_global("source", GlobalBinding::Table(sig));

        let mut stream = Stream::Monitor {
            table: Box::new(Table::VarRef("source".to_string())),
            args: None,
            schema: None,
        };

        let err = checker
            .typecheck_stream(&mut stream, &mut scope, &mut client)
            .unwrap_err();
        assert!(matches!(err, TypeCheckError::TypeError { .. }));
    }

    #[test]
    fn monitor_on_a_monitorable_table_projects_the_listed_args() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = NoopClient;

        let sig = ExpressionSignature {
            kind: FunctionKind::Query,
            args: vec![
                ArgumentDef::new("a", Type::Number, ArgDirection::Out),
                ArgumentDef::new("b", Type::Number, ArgDirection::Out),
            ],
            is_list: true,
            is_monitorable: true,
            no_filter: false,
            minimal_projection: Vec::new(),
        };
        let mut scope = Scope::new();
        scope.bind_global("source", GlobalBinding::Table(sig));

        let mut stream = Stream::Monitor {
            table: Box::new(Table::VarRef("source".to_string())),
            args: Some(vec!["a".to_string()]),
            schema: None,
        };

        let result = checker
            .typecheck_stream(&mut stream, &mut scope, &mut client)
            .unwrap();
        assert!(result.arg("a").is_some());
        assert!(result.arg("b").is_none());
    }
}
