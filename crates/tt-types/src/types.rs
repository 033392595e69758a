//! The `Type` enum.

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A compound field: its type, whether it's required, and free-form
/// annotations.
#[derive(Clone, Debug, PartialEq)]
pub struct CompoundField {
    pub field_type: Type,
    pub required: bool,
}

/// An ordered enum domain. `open` marks a domain that ended with the
/// open-enum marker `"*"` in the surface syntax.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct EnumDomain {
    pub symbols: Vec<String>,
    pub open: bool,
}

impl EnumDomain {
    #[must_use]
    pub fn closed(symbols: Vec<String>) -> Self {
        EnumDomain {
            symbols,
            open: false,
        }
    }

    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }

    /// `E1 ⊆ E2`.1's `Enum(E1) ⊑ Enum(E2)` rule.
    #[must_use]
    pub fn is_subset_of(&self, other: &EnumDomain) -> bool {
        self.symbols.iter().all(|s| other.contains(s))
    }
}

/// A ThingTalk type.
///
/// `TypeVar` and `Unknown` are internal-only: `TypeVar` exists purely to
/// drive overload unification and `Unknown` marks a name
/// the typechecker hasn't resolved yet. Neither may remain anywhere
/// reachable from a typechecked `Program`.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Any,
    Boolean,
    Number,
    String,
    Date,
    Time,
    Location,
    Entity(String),
    /// `unit` is the unit symbol (e.g. `"C"`, `"kg"`); the empty string is
    /// the polymorphic `Measure('')` used in overload signatures, unified
    /// against the scope's reserved `_unit` key.
    Measure(String),
    Enum(EnumDomain),
    Array(Box<Type>),
    Compound(Arc<FxHashMap<String, CompoundField>>),
    /// Internal: a type variable participating in overload unification.
    TypeVar(String),
    /// Internal: an unresolved name. Must not survive typechecking.
    Unknown(String),
}

impl Type {
    #[must_use]
    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    #[must_use]
    pub fn compound(fields: FxHashMap<String, CompoundField>) -> Type {
        Type::Compound(Arc::new(fields))
    }

    /// The reserved scope key unit-typevars bind through.
    pub const UNIT_SCOPE_KEY: &'static str = "_unit";

    #[must_use]
    pub fn is_type_var(&self) -> bool {
        matches!(self, Type::TypeVar(_))
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown(_))
    }

    /// True for types allowed to survive into a fully typechecked program
    ///. `TypeVar` is likewise
    /// excluded — it's an artifact of overload resolution, not a surface
    /// type.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match self {
            Type::Unknown(_) | Type::TypeVar(_) => false,
            Type::Array(elem) => elem.is_resolved(),
            Type::Compound(fields) => fields.values().all(|f| f.field_type.is_resolved()),
            _ => true,
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Number | Type::Measure(_))
    }

    #[must_use]
    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            Type::Number | Type::Measure(_) | Type::String | Type::Date | Type::Time
        )
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Any => write!(f, "Any"),
            Type::Boolean => write!(f, "Boolean"),
            Type::Number => write!(f, "Number"),
            Type::String => write!(f, "String"),
            Type::Date => write!(f, "Date"),
            Type::Time => write!(f, "Time"),
            Type::Location => write!(f, "Location"),
            Type::Entity(e) => write!(f, "Entity({e})"),
            Type::Measure(u) => write!(f, "Measure({u})"),
            Type::Enum(e) => write!(
                f,
                "Enum({}{})",
                e.symbols.join(","),
                if e.open { ",*" } else { "" }
            ),
            Type::Array(elem) => write!(f, "Array({elem})"),
            Type::Compound(_) => write!(f, "Compound"),
            Type::TypeVar(name) => write!(f, "TypeVar({name})"),
            Type::Unknown(name) => write!(f, "Unknown({name})"),
        }
    }
}
