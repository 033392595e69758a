//! The typechecker driver.

use rustc_hash::FxHashMap;
use tracing::{span, Level};
use tt_ast::{ClassDef, Program, Statement};
use tt_common::diagnostics::{Result, TypeCheckError};
use tt_common::Location;
use tt_schema::SchemaClient;
use tt_schema::SchemaRetriever;
use tt_types::{EntityInheritance, OverloadTable};

use crate::options::CheckerOptions;
use crate::overloads::default_overload_table;
use crate::scope::Scope;

/// The canonical class a `remote` selector kind is rewritten to.
pub const CANONICAL_REMOTE_CLASS: &str = "org.thingpedia.builtin.thingengine.remote";

/// The builtin class backing `Selector::Builtin` invocations (e.g. `notify`).
pub const BUILTIN_CLASS: &str = "org.thingpedia.builtin.thingengine.builtin";

/// A single driver object, constructed from a schema retriever and a
/// `useMeta` flag.
///
/// `_classes` (here `class_map`) is per-driver, not shared; the schema
/// cache inside `retriever` is expected to be shared across requests by
/// the caller — hence it's borrowed
/// rather than owned.
pub struct TypeChecker<'r> {
    pub(crate) retriever: &'r mut SchemaRetriever,
    pub(crate) class_map: FxHashMap<String, ClassDef>,
    pub(crate) inheritance: EntityInheritance,
    pub(crate) overloads: OverloadTable,
    pub(crate) options: CheckerOptions,
}

impl<'r> TypeChecker<'r> {
    #[must_use]
    pub fn new(retriever: &'r mut SchemaRetriever, options: CheckerOptions) -> Self {
        TypeChecker {
            retriever,
            class_map: FxHashMap::default(),
            inheritance: EntityInheritance::new(),
            overloads: default_overload_table(),
            options,
        }
    }

    /// Seed the entity inheritance table this driver consults for
    /// assignability. A production catalogue
    /// populates this from Thingpedia's entity metadata; the retrieval of
    /// that table is itself out of scope.
    pub fn set_inheritance(&mut self, inheritance: EntityInheritance) {
        self.inheritance = inheritance;
    }

    /// Typecheck every class the retriever just fetched over the network
    /// since the last drain. A remote catalogue is not a trusted input:
    /// a class fetched via `flush`/`fetch_one` gets the exact same
    /// `typecheck_class_def` pass as one declared inline in the program,
    /// before anything is allowed to resolve a signature against it.
    pub(crate) fn validate_fetched(&mut self, client: &mut impl SchemaClient) -> Result<()> {
        for kind in self.retriever.take_last_fetched() {
            let Some(mut class) = self.retriever.full_class(&kind).cloned() else {
                continue;
            };
            self.typecheck_class_def(&mut class, client)?;
        }
        Ok(())
    }

    /// `type_check_program`.
    pub fn type_check_program(
        &mut self,
        client: &mut impl SchemaClient,
        program: &mut Program,
    ) -> Result<()> {
        let _span = span!(Level::DEBUG, "type_check_program").entered();

        for class in &program.classes {
            self.class_map.insert(class.name.clone(), class.clone());
            self.retriever.inject(class.clone());
        }
        for class in &mut program.classes {
            self.typecheck_class_def(class, client)?;
        }

        for kind in crate::primitives::collect_kinds(program) {
            self.retriever.request(&kind);
        }
        self.retriever.flush(client)?;
        self.validate_fetched(client)?;

        let mut scope = Scope::new();
        for decl in &mut program.declarations {
            self.typecheck_declaration(decl, &mut scope, client)?;
        }
        for stmt in &mut program.rules {
            self.typecheck_statement(stmt, &mut scope, client)?;
        }
        Ok(())
    }

    /// `type_check_permission_rule`.
    pub fn type_check_permission_rule(
        &mut self,
        client: &mut impl SchemaClient,
        rule: &mut tt_ast::PermissionRule,
    ) -> Result<()> {
        let _span = span!(Level::DEBUG, "type_check_permission_rule").entered();
        let mut scope = Scope::new();
        self.typecheck_boolean(&mut rule.principal_filter, None, &mut scope, client)?;
        self.typecheck_permission_function(&mut rule.query, client)?;
        self.typecheck_permission_function(&mut rule.action, client)?;
        Ok(())
    }

    fn typecheck_permission_function(
        &mut self,
        func: &mut tt_ast::PermissionFunction,
        client: &mut impl SchemaClient,
    ) -> Result<()> {
        if let tt_ast::PermissionFunction::Specified {
            kind,
            channel,
            filter,
            schema,
        } = func
        {
            self.retriever.request(kind);
            self.retriever.flush(client)?;
            self.validate_fetched(client)?;
            let Some(signatures) = self.retriever.signatures(kind) else {
                return Err(TypeCheckError::invalid_kind(Location::UNKNOWN, kind));
            };
            let sig = signatures
                .queries
                .get(channel)
                .or_else(|| signatures.actions.get(channel))
                .cloned()
                .ok_or_else(|| {
                    TypeCheckError::type_error(
                        Location::UNKNOWN,
                        format!("Unknown function {channel} on {kind}"),
                    )
                })?;
            *schema = Some(sig.clone());
            let mut scope = Scope::new();
            scope.bind_outputs(&sig);
            self.typecheck_boolean(filter, Some(&sig), &mut scope, client)?;
        }
        Ok(())
    }

    /// `type_check_library`: a bare collection of class
    /// definitions, no executable statements.
    pub fn type_check_library(
        &mut self,
        client: &mut impl SchemaClient,
        classes: &mut [ClassDef],
    ) -> Result<()> {
        let _span = span!(Level::DEBUG, "type_check_library").entered();
        for class in classes.iter() {
            self.class_map.insert(class.name.clone(), class.clone());
            self.retriever.inject(class.clone());
        }
        for class in classes {
            self.typecheck_class_def(class, client)?;
        }
        Ok(())
    }

    /// `type_check_dialogue`: a sequence of statements
    /// typechecked mid-conversation, where `$event` is already available
    /// (the dialogue agent is reacting to a previous turn's result,
    /// unlike a fresh `Rule`'s trigger).
    pub fn type_check_dialogue(
        &mut self,
        client: &mut impl SchemaClient,
        statements: &mut [Statement],
    ) -> Result<()> {
        let _span = span!(Level::DEBUG, "type_check_dialogue").entered();
        let mut scope = Scope::new();
        scope.set_has_event(true);
        for stmt in statements {
            self.typecheck_statement(stmt, &mut scope, client)?;
        }
        Ok(())
    }
}
