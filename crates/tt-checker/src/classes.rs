//! `ClassDef` typechecking.

use rustc_hash::{FxHashMap, FxHashSet};
use tt_ast::{ClassDef, FunctionDef};
use tt_common::diagnostics::{Result, TypeCheckError};
use tt_common::Location;
use tt_schema::SchemaClient;
use tt_types::{is_assignable, Type};

use crate::driver::TypeChecker;
use crate::scope::Scope;

impl<'r> TypeChecker<'r> {
    /// `typecheck_class_def`: abstract classes
    /// may not carry mixin imports, `poll_interval` must be a `Measure(ms)`
    /// and only meaningful on monitorable functions, and `extends` may not
    /// introduce a duplicate argument name across the chain.
    pub(crate) fn typecheck_class_def(
        &mut self,
        class: &mut ClassDef,
        client: &mut impl SchemaClient,
    ) -> Result<()> {
        if class.is_abstract && !class.imports.is_empty() {
            return Err(TypeCheckError::type_error(
                Location::UNKNOWN,
                format!("Abstract class {} cannot import mixins", class.name),
            ));
        }

        if !class.imports.is_empty() {
            let mixins = client.get_mixins()?;
            for import in &mut class.imports {
                let mixin = mixins.get(&import.kind).ok_or_else(|| {
                    TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Unknown mixin {} imported by {}", import.kind, class.name),
                    )
                })?;
                let mut scope = Scope::new();
                for (name, value) in import.in_params.iter_mut() {
                    let Some(index) = mixin.arg_index(name) else {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("Mixin {} has no argument {name}", import.kind),
                        ));
                    };
                    if !mixin.is_input[index] {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!("{name} is not an input argument of mixin {}", import.kind),
                        ));
                    }
                    let value_ty = self.compute_value_type(value, &mut scope, client)?;
                    if !is_assignable(&value_ty, &mixin.types[index], &mut Default::default(), true, &self.inheritance) {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!(
                                "Cannot assign {value_ty} to mixin argument {name} of type {}",
                                mixin.types[index]
                            ),
                        ));
                    }
                }
                for (index, required) in mixin.required.iter().enumerate() {
                    if *required && !import.in_params.iter().any(|(n, _)| n == &mixin.args[index]) {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!(
                                "Mixin {} requires argument {}",
                                import.kind, mixin.args[index]
                            ),
                        ));
                    }
                }
            }
        }

        let siblings: FxHashMap<&str, &FunctionDef> = class
            .queries
            .values()
            .chain(class.actions.values())
            .map(|f| (f.name.as_str(), f))
            .collect();

        for function in class.queries.values().chain(class.actions.values()) {
            self.typecheck_function_def(function, &siblings)?;
        }
        Ok(())
    }

    fn typecheck_function_def(
        &self,
        function: &FunctionDef,
        siblings: &FxHashMap<&str, &FunctionDef>,
    ) -> Result<()> {
        if let Some(interval) = &function.poll_interval {
            if !function.is_monitorable {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("{} is not monitorable, poll_interval has no effect", function.name),
                ));
            }
            if !matches!(interval, Type::Measure(unit) if unit == "ms") {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("{}'s poll_interval must be a Measure(ms)", function.name),
                ));
            }
        }

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for arg in &function.args {
            if !seen.insert(arg.name.as_str()) {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("Duplicate argument {} in {}", arg.name, function.name),
                ));
            }
        }
        for name in function.minimal_projection.iter().chain(&function.default_projection) {
            if function.arg(name).is_none() {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("{name} is not an argument of {}", function.name),
                ));
            }
        }

        self.typecheck_extends(function, siblings)
    }

    /// `extends` validation: a monitorable query may
    /// not extend a non-monitorable one (the reverse is fine — a
    /// non-monitorable query refining a monitorable base loses nothing),
    /// and duplicate argument names across the chain must agree on type,
    /// except for `Entity` args (entity inheritance may legitimately narrow
    /// or widen the type, so equality is not required there).
    fn typecheck_extends(
        &self,
        function: &FunctionDef,
        siblings: &FxHashMap<&str, &FunctionDef>,
    ) -> Result<()> {
        for base_name in &function.extends {
            let base = siblings.get(base_name.as_str()).ok_or_else(|| {
                TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!("{} extends unknown function {base_name}", function.name),
                )
            })?;

            if function.is_monitorable && !base.is_monitorable {
                return Err(TypeCheckError::type_error(
                    Location::UNKNOWN,
                    format!(
                        "Monitorable query {} cannot extend non-monitorable query {base_name}",
                        function.name
                    ),
                ));
            }

            for arg in &function.args {
                if let Some(base_arg) = base.arg(&arg.name) {
                    let both_entities =
                        matches!(arg.arg_type, Type::Entity(_)) && matches!(base_arg.arg_type, Type::Entity(_));
                    if !both_entities && arg.arg_type != base_arg.arg_type {
                        return Err(TypeCheckError::type_error(
                            Location::UNKNOWN,
                            format!(
                                "{}'s argument {} ({}) disagrees with {base_name}'s ({})",
                                function.name, arg.name, arg.arg_type, base_arg.arg_type
                            ),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::{ArgDirection, ArgumentDef, FunctionKind};
    use tt_schema::SchemaRetriever;

    fn checker() -> (SchemaRetriever, crate::options::CheckerOptions) {
        (SchemaRetriever::new(), crate::options::CheckerOptions::new())
    }

    #[test]
    fn monitorable_query_cannot_extend_non_monitorable_base() {
        let (mut retriever, options) = checker();
        let checker = TypeChecker::new(&mut retriever, options);

        let mut base = FunctionDef::new("base", FunctionKind::Query);
        base.is_monitorable = false;
        let mut derived = FunctionDef::new("derived", FunctionKind::Query);
        derived.is_monitorable = true;
        derived.extends.push("base".to_string());

        let mut siblings = FxHashMap::default();
        siblings.insert("base", &base);
        siblings.insert("derived", &derived);

        assert!(checker.typecheck_extends(&derived, &siblings).is_err());
    }

    #[test]
    fn non_monitorable_query_may_extend_monitorable_base() {
        let (mut retriever, options) = checker();
        let checker = TypeChecker::new(&mut retriever, options);

        let mut base = FunctionDef::new("base", FunctionKind::Query);
        base.is_monitorable = true;
        let mut derived = FunctionDef::new("derived", FunctionKind::Query);
        derived.is_monitorable = false;
        derived.extends.push("base".to_string());

        let mut siblings = FxHashMap::default();
        siblings.insert("base", &base);
        siblings.insert("derived", &derived);

        assert!(checker.typecheck_extends(&derived, &siblings).is_ok());
    }

    #[test]
    fn duplicate_argument_type_mismatch_across_extends_is_rejected() {
        let (mut retriever, options) = checker();
        let checker = TypeChecker::new(&mut retriever, options);

        let mut base = FunctionDef::new("base", FunctionKind::Query);
        base.args.push(ArgumentDef::new("count", Type::Number, ArgDirection::Out));
        let mut derived = FunctionDef::new("derived", FunctionKind::Query);
        derived.args.push(ArgumentDef::new("count", Type::String, ArgDirection::Out));
        derived.extends.push("base".to_string());

        let mut siblings = FxHashMap::default();
        siblings.insert("base", &base);
        siblings.insert("derived", &derived);

        assert!(checker.typecheck_extends(&derived, &siblings).is_err());
    }

    #[test]
    fn entity_typed_duplicate_arguments_are_exempt_from_equality() {
        let (mut retriever, options) = checker();
        let checker = TypeChecker::new(&mut retriever, options);

        let mut base = FunctionDef::new("base", FunctionKind::Query);
        base.args
            .push(ArgumentDef::new("who", Type::Entity("tt:contact".to_string()), ArgDirection::Out));
        let mut derived = FunctionDef::new("derived", FunctionKind::Query);
        derived
            .args
            .push(ArgumentDef::new("who", Type::Entity("tt:username".to_string()), ArgDirection::Out));
        derived.extends.push("base".to_string());

        let mut siblings = FxHashMap::default();
        siblings.insert("base", &base);
        siblings.insert("derived", &derived);

        assert!(checker.typecheck_extends(&derived, &siblings).is_ok());
    }

    struct MixinClient {
        mixins: FxHashMap<String, tt_schema::MixinDef>,
    }

    impl tt_schema::SchemaClient for MixinClient {
        fn get_device_code(&mut self, kind: &str) -> Result<ClassDef> {
            Err(TypeCheckError::invalid_kind(Location::UNKNOWN, kind))
        }
        fn get_schemas(&mut self, _kinds: &[String], _include_metadata: bool) -> Result<Vec<ClassDef>> {
            Ok(Vec::new())
        }
        fn get_mixins(&mut self) -> Result<FxHashMap<String, tt_schema::MixinDef>> {
            Ok(self.mixins.clone())
        }
    }

    fn oauth_mixin_client() -> MixinClient {
        let mut mixins = FxHashMap::default();
        mixins.insert(
            "org.thingpedia.config.oauth2".to_string(),
            tt_schema::MixinDef {
                kind: "org.thingpedia.config.oauth2".to_string(),
                args: vec!["client_id".to_string()],
                types: vec![Type::String],
                required: vec![true],
                is_input: vec![true],
                facets: Vec::new(),
            },
        );
        MixinClient { mixins }
    }

    #[test]
    fn abstract_class_rejects_any_mixin_import() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = oauth_mixin_client();

        let mut class = ClassDef::new("com.test");
        class.is_abstract = true;
        class.imports.push(tt_ast::MixinImport::new("org.thingpedia.config.oauth2"));

        assert!(checker.typecheck_class_def(&mut class, &mut client).is_err());
    }

    #[test]
    fn mixin_import_missing_required_argument_is_rejected() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = oauth_mixin_client();

        let mut class = ClassDef::new("com.test");
        class.imports.push(tt_ast::MixinImport::new("org.thingpedia.config.oauth2"));

        assert!(checker.typecheck_class_def(&mut class, &mut client).is_err());
    }

    #[test]
    fn mixin_import_with_matching_signature_is_accepted() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = oauth_mixin_client();

        let mut class = ClassDef::new("com.test");
        let mut import = tt_ast::MixinImport::new("org.thingpedia.config.oauth2");
        import
            .in_params
            .push(("client_id".to_string(), tt_ast::Value::String("abc".to_string())));
        class.imports.push(import);

        assert!(checker.typecheck_class_def(&mut class, &mut client).is_ok());
    }

    #[test]
    fn unknown_mixin_kind_is_rejected() {
        let mut retriever = SchemaRetriever::new();
        let mut checker = TypeChecker::new(&mut retriever, crate::options::CheckerOptions::new());
        let mut client = oauth_mixin_client();

        let mut class = ClassDef::new("com.test");
        class.imports.push(tt_ast::MixinImport::new("org.thingpedia.nonexistent"));

        assert!(checker.typecheck_class_def(&mut class, &mut client).is_err());
    }
}
