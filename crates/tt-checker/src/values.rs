//! Value type computation.

use tt_ast::{LocationValue, Value};
use tt_common::diagnostics::{Result, TypeCheckError};
use tt_common::Location;
use tt_schema::SchemaClient;
use tt_types::{EnumDomain, Type};

use crate::driver::TypeChecker;
use crate::scope::Scope;

impl<'r> TypeChecker<'r> {
    pub(crate) fn compute_value_type(
        &mut self,
        value: &mut Value,
        scope: &mut Scope,
        client: &mut impl SchemaClient,
    ) -> Result<Type> {
        let ty = match value {
            Value::Boolean(_) => Type::Boolean,
            Value::String(_) => Type::String,
            Value::Number(_) => Type::Number,
            Value::Measure { unit, .. } => Type::Measure(unit.clone()),
            // Currency has no dedicated sort; its code behaves exactly like a Measure unit for
            // assignability purposes, so it's modeled as one.
            Value::Currency { code, .. } => Type::Measure(code.clone()),
            Value::Date(_) => Type::Date,
            Value::Time(_) => Type::Time,
            Value::Location(loc) => match loc {
                LocationValue::Home | LocationValue::Work | LocationValue::Current => {
                    Type::Location
                }
                LocationValue::Absolute { .. } => Type::Location,
            },
            Value::Entity { kind, .. } => Type::Entity(kind.clone()),
            // A literal enum symbol's domain is modeled open: it carries
            // no information about sibling symbols, so it should unify
            // against whatever domain the argument position declares
            // rather than rejecting on a subset check against a single
            // symbol.
            Value::Enum(symbol) => Type::Enum(EnumDomain {
                symbols: vec![symbol.clone()],
                open: true,
            }),
            Value::VarRef(name) => {
                if let Some(ty) = scope.lookup_local(name) {
                    ty.clone()
                } else {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Unknown identifier {name}"),
                    ));
                }
            }
            Value::Event(_) => {
                if !scope.has_event() {
                    return Err(TypeCheckError::type_error(
                        Location::UNKNOWN,
                        "$event is not available here",
                    ));
                }
                Type::String
            }
            Value::Undefined { .. } => Type::Any,
            Value::ArrayValue(items) => {
                let mut element_ty: Option<Type> = None;
                for item in items.iter_mut() {
                    let item_ty = self.compute_value_type(item, scope, client)?;
                    element_ty = Some(match element_ty {
                        None => item_ty,
                        Some(Type::Enum(mut acc)) => {
                            if let Type::Enum(domain) = item_ty {
                                for s in domain.symbols {
                                    if !acc.symbols.contains(&s) {
                                        acc.symbols.push(s);
                                    }
                                }
                                acc.open = acc.open || domain.open;
                            }
                            Type::Enum(acc)
                        }
                        Some(existing) => existing,
                    });
                }
                Type::array(element_ty.unwrap_or(Type::Any))
            }
            Value::Computation { op, operands } => {
                let mut arg_types = Vec::with_capacity(operands.len());
                for operand in operands.iter_mut() {
                    arg_types.push(self.compute_value_type(operand, scope, client)?);
                }
                let (_, result) = self
                    .overloads
                    .resolve(op, &arg_types, &self.inheritance)
                    .map_err(|e| TypeCheckError::type_error(Location::UNKNOWN, e.to_string()))?;
                result
            }
            Value::ArrayFieldValue { value, field } => {
                let inner = self.compute_value_type(value, scope, client)?;
                match inner {
                    Type::Array(elem) => match *elem {
                        Type::Compound(fields) => fields
                            .get(field)
                            .map(|f| Type::array(f.field_type.clone()))
                            .ok_or_else(|| {
                                TypeCheckError::type_error(
                                    Location::UNKNOWN,
                                    format!("Unknown field {field}"),
                                )
                            })?,
                        _ => {
                            return Err(TypeCheckError::type_error(
                                Location::UNKNOWN,
                                format!("Cannot project field {field} off a non-compound array"),
                            ))
                        }
                    },
                    Type::Compound(fields) => fields
                        .get(field)
                        .map(|f| f.field_type.clone())
                        .ok_or_else(|| {
                            TypeCheckError::type_error(
                                Location::UNKNOWN,
                                format!("Unknown field {field}"),
                            )
                        })?,
                    other => {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("Cannot project field {field} off {other}"),
                        ))
                    }
                }
            }
            Value::FilterValue { value, filter } => {
                let inner = self.compute_value_type(value, scope, client)?;
                let fields = match &inner {
                    Type::Array(elem) => match elem.as_ref() {
                        Type::Compound(fields) => Some(fields.clone()),
                        _ => None,
                    },
                    Type::Compound(fields) => Some(fields.clone()),
                    _ => None,
                };
                scope.push_frame();
                if let Some(fields) = fields {
                    for (name, field) in fields.iter() {
                        scope.bind_local(name.clone(), field.field_type.clone());
                    }
                }
                let result = self.typecheck_boolean(filter, None, scope, client);
                scope.pop_frame();
                result?;
                inner
            }
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_common::diagnostics::TypeCheckError;
    use tt_schema::SchemaRetriever;
    use tt_types::types::CompoundField;

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

    fn checker(retriever: &mut SchemaRetriever) -> TypeChecker<'_> {
        TypeChecker::new(retriever, crate::options::CheckerOptions::new())
    }

    #[test]
    fn array_value_merges_enum_element_domains() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = checker(&mut retriever);
        let mut client = NoopClient;
        let mut scope = Scope::new();

        let mut value = Value::ArrayValue(vec![Value::Enum("a".to_string()), Value::Enum("b".to_string())]);
        let ty = checker.compute_value_type(&mut value, &mut scope, &mut client).unwrap();
        match ty {
            Type::Array(elem) => match *elem {
                Type::Enum(domain) => {
                    assert!(domain.symbols.contains(&"a".to_string()));
                    assert!(domain.symbols.contains(&"b".to_string()));
                }
                other => panic!("expected Enum element, got {other:?}"),
            },
            other => panic!("expected Array, got {other:?}"),
        }
    }

    #[test]
    fn event_is_rejected_outside_an_event_bearing_scope() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = checker(&mut retriever);
        let mut client = NoopClient;
        let mut scope = Scope::new();

        let mut value = Value::Event(None);
        let err = checker
            .compute_value_type(&mut value, &mut scope, &mut client)
            .unwrap_err();
        assert!(matches!(err, TypeCheckError::TypeError { .. }));
    }

    #[test]
    fn event_is_accepted_once_scope_marks_it_available() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = checker(&mut retriever);
        let mut client = NoopClient;
        let mut scope = Scope::new();
        scope.set_has_event(true);

        let mut value = Value::Event(None);
        let ty = checker.compute_value_type(&mut value, &mut scope, &mut client).unwrap();
        assert_eq!(ty, Type::String);
    }

    #[test]
    fn array_field_value_projects_a_compound_field_off_each_array_element() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = checker(&mut retriever);
        let mut client = NoopClient;
        let mut scope = Scope::new();

        let mut fields = rustc_hash::FxHashMap::default();
        fields.insert(
            "name".to_string(),
            CompoundField {
                field_type: Type::String,
                required: true,
            },
        );
        let element = Type::compound(fields);
        scope.bind_local("items", Type::array(element));

        let mut value = Value::ArrayFieldValue {
            value: Box::new(Value::VarRef("items".to_string())),
            field: "name".to_string(),
        };
        let ty = checker.compute_value_type(&mut value, &mut scope, &mut client).unwrap();
        assert_eq!(ty, Type::array(Type::String));
    }

    #[test]
    fn filter_value_binds_compound_fields_into_a_nested_scope() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = checker(&mut retriever);
        let mut client = NoopClient;
        let mut scope = Scope::new();

        let mut fields = rustc_hash::FxHashMap::default();
        fields.insert(
            "name".to_string(),
            CompoundField {
                field_type: Type::String,
                required: true,
            },
        );
        scope.bind_local("item", Type::compound(fields));

        let mut value = Value::FilterValue {
            value: Box::new(Value::VarRef("item".to_string())),
            filter: Box::new(tt_ast::BooleanExpression::atom(
                "name",
                "==",
                Value::String("x".to_string()),
            )),
        };
        let ty = checker.compute_value_type(&mut value, &mut scope, &mut client).unwrap();
        assert!(matches!(ty, Type::Compound(_)));
        // The nested scope used to typecheck the filter must not leak
        // `name` back out into the caller's frame.
        assert!(scope.lookup_local("name").is_none());
    }
}
