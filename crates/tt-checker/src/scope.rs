//! The typechecker's environment.
//!
//! An immutable parent-pointer chain with a mutable top-of-stack cell
//! would work too, but since the driver only ever processes one program
//! depth-first on a single thread, a plain `Vec` of frames
//! pushed/popped around nested constructs (join right-hand sides,
//! `FilterValue`'s compound scope) gives the same semantics with less
//! machinery — no sharing, no `Rc`, just a stack.

use rustc_hash::FxHashMap;
use tt_ast::ExpressionSignature;
use tt_types::Type;

/// A `let`-bound name's shape.
#[derive(Clone, Debug)]
pub enum GlobalBinding {
    Stream(ExpressionSignature),
    Table(ExpressionSignature),
    /// A `let`-bound procedure: callable, but has no output schema of its
    /// own to resolve a `VarRef` against as a value.
    Procedure,
}

/// The typechecker's environment.
pub struct Scope {
    /// Compartment 1: names bound by `Declaration`.
    globals: FxHashMap<String, GlobalBinding>,
    /// Compartment 2: lambda/procedure arguments. ThingTalk's core
    /// grammar doesn't give `Procedure` its own formal
    /// parameter list, so this stays empty in practice; it's kept as its
    /// own compartment so a surface extension adding parameterized
    /// procedures would populate
    /// it without otherwise touching `Scope`'s shape.
    lambda_args: FxHashMap<String, Type>,
    /// Compartment 3: locally-bound output parameters, stacked so a
    /// nested construct (join right-hand side, filter-value's compound
    /// fields) can shadow and then discard its bindings.
    frames: Vec<FxHashMap<String, Type>>,
    /// Compartment 4: whether `$event` may be referenced here.
    has_event: bool,
}

impl Default for Scope {
    fn default() -> Self {
        Scope {
            globals: FxHashMap::default(),
            lambda_args: FxHashMap::default(),
            frames: vec![FxHashMap::default()],
            has_event: false,
        }
    }
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn bind_local(&mut self, name: impl Into<String>, ty: Type) {
        self.frames
            .last_mut()
            .expect("scope always has a root frame")
            .insert(name.into(), ty);
    }

    /// Look up `name` in the local frame stack, most-recent first, then
    /// lambda arguments.
    #[must_use]
    pub fn lookup_local(&self, name: &str) -> Option<&Type> {
        for frame in self.frames.iter().rev() {
            if let Some(ty) = frame.get(name) {
                return Some(ty);
            }
        }
        self.lambda_args.get(name)
    }

    pub fn bind_global(&mut self, name: impl Into<String>, binding: GlobalBinding) {
        self.globals.insert(name.into(), binding);
    }

    #[must_use]
    pub fn lookup_global(&self, name: &str) -> Option<&GlobalBinding> {
        self.globals.get(name)
    }

    #[must_use]
    pub fn has_event(&self) -> bool {
        self.has_event
    }

    pub fn set_has_event(&mut self, value: bool) {
        self.has_event = value;
    }

    /// Bind every output argument of `schema` into the current frame,
    /// the scope-merge step after typechecking a Stream/Table node.
    pub fn bind_outputs(&mut self, schema: &ExpressionSignature) {
        for arg in schema.out_args() {
            self.bind_local(arg.name.clone(), arg.arg_type.clone());
        }
    }
}
