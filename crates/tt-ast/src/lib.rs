//! The ThingTalk abstract syntax tree and its traversal
//! machinery.
//!
//! Node variants are plain tagged enums with owned/boxed children rather
//! than an arena — unlike a textual-source AST, a ThingTalk program is
//! small (a handful of statements) and is usually built once per request,
//! so there's no interning/incremental-reuse pressure that would justify
//! arena indices here.
//!
//! Every node that the typechecker resolves carries a mutable `schema`
//! field, initially `None`, filled in by `tt-checker`. `Value` literals,
//! `BooleanExpression::True`/`False`, and `Action::Notify` are the three
//! nodes with nothing left to resolve, so they carry no `schema` slot.

pub mod action;
pub mod boolean;
pub mod class;
pub mod iter;
pub mod statement;
pub mod stream;
pub mod table;
pub mod value;
pub mod visitor;

pub use action::{Action, Invocation, InputParam, Selector};
pub use boolean::BooleanExpression;
pub use class::{
    ArgDirection, ArgumentDef, ClassDef, ExpressionSignature, FunctionDef, FunctionKind, MixinImport,
};
pub use statement::{
    Declaration, DeclarationKind, OnInputChoice, PermissionFunction, PermissionRule, Program, Rule,
    Statement,
};
pub use stream::Stream;
pub use table::Table;
pub use value::{DateValue, LocationValue, TimeValue, Value};
