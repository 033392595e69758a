//! `ClassDef` / `FunctionDef`.

use rustc_hash::FxHashMap;
use tt_types::Type;

use crate::value::Value;

/// An argument's direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgDirection {
    InReq,
    InOpt,
    Out,
}

impl ArgDirection {
    #[must_use]
    pub fn is_input(&self) -> bool {
        matches!(self, ArgDirection::InReq | ArgDirection::InOpt)
    }
}

/// A single formal argument of a `FunctionDef`.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentDef {
    pub name: String,
    pub arg_type: Type,
    pub direction: ArgDirection,
    /// The field is annotated `unique`.
    pub unique: bool,
    /// Device-identifying parameter.
    pub is_principal: bool,
}

impl ArgumentDef {
    #[must_use]
    pub fn new(name: impl Into<String>, arg_type: Type, direction: ArgDirection) -> Self {
        ArgumentDef {
            name: name.into(),
            arg_type,
            direction,
            unique: false,
            is_principal: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Query,
    Action,
}

/// A fully-resolved function signature, the payload of the `schema` slot
/// carried by `Table::Invocation`, `Action::Invocation`, `Stream::Monitor`,
/// joins, projections, and so on.
///
/// This is distinct from `FunctionDef`: a `FunctionDef` is the catalogue
/// declaration; an `ExpressionSignature` is what a *specific node* in the
/// program resolves to, after projection/join/aggregation have narrowed
/// its argument list.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionSignature {
    pub kind: FunctionKind,
    pub args: Vec<ArgumentDef>,
    pub is_list: bool,
    pub is_monitorable: bool,
    pub no_filter: bool,
    pub minimal_projection: Vec<String>,
}

impl ExpressionSignature {
    #[must_use]
    pub fn from_function_def(def: &FunctionDef) -> Self {
        ExpressionSignature {
            kind: def.kind,
            args: def.args.clone(),
            is_list: def.is_list,
            is_monitorable: def.is_monitorable,
            no_filter: false,
            minimal_projection: def.minimal_projection.clone(),
        }
    }

    #[must_use]
    pub fn in_args(&self) -> impl Iterator<Item = &ArgumentDef> {
        self.args.iter().filter(|a| a.direction.is_input())
    }

    #[must_use]
    pub fn out_args(&self) -> impl Iterator<Item = &ArgumentDef> {
        self.args
            .iter()
            .filter(|a| a.direction == ArgDirection::Out)
    }

    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&ArgumentDef> {
        self.args.iter().find(|a| a.name == name)
    }

    /// Project down to `names` plus anything `minimal_projection` forces
    /// to stay.
    #[must_use]
    pub fn projected(&self, names: &[String]) -> ExpressionSignature {
        let mut kept: Vec<ArgumentDef> = self
            .args
            .iter()
            .filter(|a| {
                a.direction.is_input()
                    || names.iter().any(|n| n == &a.name)
                    || self.minimal_projection.iter().any(|n| n == &a.name)
            })
            .cloned()
            .collect();
        kept.dedup_by(|a, b| a.name == b.name);
        ExpressionSignature {
            kind: self.kind,
            args: kept,
            is_list: self.is_list,
            is_monitorable: self.is_monitorable,
            no_filter: self.no_filter,
            minimal_projection: Vec::new(),
        }
    }
}

/// A catalogue function declaration.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub kind: FunctionKind,
    /// Names of other functions in the same class this one `extends`.
    pub extends: Vec<String>,
    pub args: Vec<ArgumentDef>,
    pub is_list: bool,
    pub is_monitorable: bool,
    pub require_filter: bool,
    pub minimal_projection: Vec<String>,
    pub default_projection: Vec<String>,
    /// `poll_interval`; only meaningful when
    /// `is_monitorable` is set and must be of type `Measure(ms)`.
    pub poll_interval: Option<tt_types::Type>,
    pub doc: Option<String>,
    pub url: Option<String>,
    pub handle_thingtalk: bool,
}

impl FunctionDef {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FunctionKind) -> Self {
        FunctionDef {
            name: name.into(),
            kind,
            extends: Vec::new(),
            args: Vec::new(),
            is_list: false,
            is_monitorable: false,
            require_filter: false,
            minimal_projection: Vec::new(),
            default_projection: Vec::new(),
            poll_interval: None,
            doc: None,
            url: None,
            handle_thingtalk: false,
        }
    }

    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&ArgumentDef> {
        self.args.iter().find(|a| a.name == name)
    }
}

/// A single `import config/loader from @kind(args...)` mixin invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct MixinImport {
    pub kind: String,
    pub in_params: Vec<(String, Value)>,
}

impl MixinImport {
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        MixinImport {
            kind: kind.into(),
            in_params: Vec::new(),
        }
    }
}

/// A class declaration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub extends: Vec<String>,
    pub queries: FxHashMap<String, FunctionDef>,
    pub actions: FxHashMap<String, FunctionDef>,
    pub is_abstract: bool,
    /// Mixin imports: `config`/`loader` names,
    /// forbidden on abstract classes.
    pub imports: Vec<MixinImport>,
}

impl ClassDef {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ClassDef {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn function(&self, kind: FunctionKind, channel: &str) -> Option<&FunctionDef> {
        match kind {
            FunctionKind::Query => self.queries.get(channel),
            FunctionKind::Action => self.actions.get(channel),
        }
    }
}
