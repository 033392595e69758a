//! `Action` and the invocation machinery shared with `Table`/`Stream`.

use crate::class::ExpressionSignature;
use crate::value::Value;

/// The device selector.
///
/// `id`/`all` are mutually exclusive; `attributes`
/// is checked against a closed allow-list (`CheckerOptions::selector_attributes`,
/// default `["name"]`).
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    Builtin,
    Device {
        kind: String,
        id: Option<String>,
        all: bool,
        attributes: Vec<(String, Value)>,
    },
}

impl Selector {
    #[must_use]
    pub fn device(kind: impl Into<String>) -> Self {
        Selector::Device {
            kind: kind.into(),
            id: None,
            all: false,
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        match self {
            Selector::Builtin => None,
            Selector::Device { kind, .. } => Some(kind),
        }
    }
}

pub type InputParam = (String, Value);

/// An invocation of a device function.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    pub selector: Selector,
    pub channel: String,
    pub in_params: Vec<InputParam>,
    pub schema: Option<ExpressionSignature>,
}

impl Invocation {
    #[must_use]
    pub fn new(selector: Selector, channel: impl Into<String>) -> Self {
        Invocation {
            selector,
            channel: channel.into(),
            in_params: Vec::new(),
            schema: None,
        }
    }
}

/// `Action`.
///
/// `Notify` is exempt from carrying a schema — there's no
/// device function behind it, just a presentation kind for the dialogue
/// agent.
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Notify(String),
    Invocation(Invocation),
    VarRef(String),
}

impl Action {
    #[must_use]
    pub fn notify() -> Action {
        Action::Notify("notify".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_selector_starts_with_no_id_and_no_attributes() {
        let sel = Selector::device("com.twitter");
        assert_eq!(sel.kind(), Some("com.twitter"));
        assert!(matches!(sel, Selector::Device { id: None, all: false, .. }));
    }

    #[test]
    fn builtin_selector_has_no_kind() {
        assert_eq!(Selector::Builtin.kind(), None);
    }

    #[test]
    fn notify_builds_the_default_notify_action() {
        assert_eq!(Action::notify(), Action::Notify("notify".to_string()));
    }
}
