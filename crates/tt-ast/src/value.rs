//! `Value`.

use crate::boolean::BooleanExpression;

/// A calendar date. Kept as plain y/m/d rather than a `chrono` type — the
/// parser (out of scope) is responsible for producing valid dates; we
/// don't revalidate calendar arithmetic here.
#[derive(Clone, Debug, PartialEq)]
pub struct DateValue {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

/// A time of day. The SMT encoding treats `Time` as
/// seconds-since-midnight; `to_seconds` is the canonical conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeValue {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeValue {
    #[must_use]
    pub fn to_seconds(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60 + i64::from(self.second)
    }
}

/// A location literal, matching the SMT-LIB datatype the encoder declares
/// for it: `(loc.home | loc.work | loc.current | loc.absolute Real Real)`.
#[derive(Clone, Debug, PartialEq)]
pub enum LocationValue {
    Home,
    Work,
    Current,
    Absolute {
        latitude: f64,
        longitude: f64,
        display: Option<String>,
    },
}

/// `Value`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    String(String),
    Number(f64),
    Measure {
        value: f64,
        unit: String,
    },
    Currency {
        value: f64,
        code: String,
    },
    Date(DateValue),
    Time(TimeValue),
    Location(LocationValue),
    Entity {
        id: String,
        kind: String,
        display: Option<String>,
    },
    Enum(String),
    VarRef(String),
    /// `$event` or a specific field of it (e.g. `$event.type`).
    Event(Option<String>),
    /// A not-yet-filled slot. `local` marks a
    /// slot the dialogue agent should fill locally rather than by asking.
    Undefined {
        local: bool,
    },
    ArrayValue(Vec<Value>),
    Computation {
        op: String,
        operands: Vec<Value>,
    },
    ArrayFieldValue {
        value: Box<Value>,
        field: String,
    },
    FilterValue {
        value: Box<Value>,
        filter: Box<BooleanExpression>,
    },
}

impl Value {
    #[must_use]
    pub fn is_constant(&self) -> bool {
        !matches!(
            self,
            Value::VarRef(_) | Value::Undefined { .. } | Value::Event(_)
        )
    }

    #[must_use]
    pub fn var_ref(name: impl Into<String>) -> Value {
        Value::VarRef(name.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_value_converts_to_seconds_since_midnight() {
        let t = TimeValue {
            hour: 1,
            minute: 2,
            second: 3,
        };
        assert_eq!(t.to_seconds(), 3723);
    }

    #[test]
    fn is_constant_excludes_var_ref_undefined_and_event() {
        assert!(!Value::var_ref("x").is_constant());
        assert!(!Value::Undefined { local: true }.is_constant());
        assert!(!Value::Event(None).is_constant());
        assert!(Value::Number(1.0).is_constant());
        assert!(Value::String("a".into()).is_constant());
    }
}
