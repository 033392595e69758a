//! Sort mapping: maps a ThingTalk `Type`
//! to an SMT-LIB sort, declaring entity/enum datatypes on first use.

use rustc_hash::FxHashSet;
use tt_types::{EnumDomain, Type};

use crate::term::Script;

/// The `Location` datatype declared once per encoder session: `(loc.home | loc.work | loc.current | loc.absolute Real Real)`.
pub const LOCATION_SORT: &str = "Location";

/// The contact-group membership function name.
pub const GET_GROUPS_FN: &str = "getGroups";

/// Registry of sorts declared so far in a `Script`, so each distinct
/// entity type and each distinct enum domain is declared exactly once.
#[derive(Default)]
pub struct SortRegistry {
    entities: FxHashSet<String>,
    /// Enum domains already declared, keyed by their ordered symbol list
    /// (the natural dedup key for two enum types with the same domain)
    /// mapped to the datatype name assigned to them.
    enums: Vec<(EnumDomain, String)>,
    location_declared: bool,
    enum_counter: usize,
    get_groups_declared: bool,
}

impl SortRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `Entity_<name-with-dots-as-underscores>`, e.g.
    /// `Entity_tt_contact_group`.
    #[must_use]
    pub fn entity_sort_name(kind: &str) -> String {
        format!("Entity_{}", kind.replace(['.', ':', '-'], "_"))
    }

    /// Ensure the datatype for `Entity(kind)` is declared in `script`,
    /// wrapping a `String` constructor.
    pub fn declare_entity(&mut self, script: &mut Script, kind: &str) -> String {
        let name = Self::entity_sort_name(kind);
        if self.entities.insert(kind.to_string()) {
            script.declare_datatype(
                name.clone(),
                vec![(
                    format!("mk-{name}"),
                    vec![("value".to_string(), "String".to_string())],
                )],
            );
        }
        name
    }

    /// Ensure the datatype for an enum domain is declared, deduplicated
    /// by its ordered symbol list. Returns the datatype
    /// name and the SMT-LIB constructor for each symbol (in order).
    pub fn declare_enum(&mut self, script: &mut Script, domain: &EnumDomain) -> String {
        if let Some((_, name)) = self.enums.iter().find(|(d, _)| d == domain) {
            return name.clone();
        }
        let name = format!("Enum_{}", self.enum_counter);
        self.enum_counter += 1;
        let constructors = domain
            .symbols
            .iter()
            .map(|s| (format!("{name}.{s}"), Vec::new()))
            .collect();
        script.declare_datatype(name.clone(), constructors);
        self.enums.push((domain.clone(), name.clone()));
        self.enums.last().unwrap().1.clone()
    }

    pub fn declare_location(&mut self, script: &mut Script) {
        if self.location_declared {
            return;
        }
        self.location_declared = true;
        script.declare_datatype(
            LOCATION_SORT,
            vec![
                ("loc.home".to_string(), Vec::new()),
                ("loc.work".to_string(), Vec::new()),
                ("loc.current".to_string(), Vec::new()),
                (
                    "loc.absolute".to_string(),
                    vec![
                        ("lat".to_string(), "Real".to_string()),
                        ("long".to_string(), "Real".to_string()),
                    ],
                ),
            ],
        );
    }

    /// Ensure `getGroups : contact_sort -> (Set group_sort)` is declared
    /// exactly once per session (spec.md §4.4's "explicit `getGroups`
    /// function from contacts to groups").
    pub fn declare_get_groups(&mut self, script: &mut Script, contact_sort: &str, group_sort: &str) {
        if self.get_groups_declared {
            return;
        }
        self.get_groups_declared = true;
        script.declare_fun(
            GET_GROUPS_FN,
            vec![contact_sort.to_string()],
            format!("(Set {group_sort})"),
        );
    }

    /// Resolve `ty`'s SMT-LIB sort name, declaring any datatype it needs
    /// along the way.
    pub fn sort_of(&mut self, script: &mut Script, ty: &Type) -> String {
        match ty {
            Type::Number | Type::Measure(_) => "Real".to_string(),
            Type::Boolean => "Bool".to_string(),
            Type::String => "String".to_string(),
            Type::Time | Type::Date => "Int".to_string(),
            Type::Location => {
                self.declare_location(script);
                LOCATION_SORT.to_string()
            }
            Type::Entity(kind) => self.declare_entity(script, kind),
            Type::Enum(domain) => self.declare_enum(script, domain),
            Type::Array(elem) => {
                let elem_sort = self.sort_of(script, elem);
                format!("(Set {elem_sort})")
            }
            // Compound, Any, TypeVar, Unknown have no encoding; the
            // permission checker never needs to constrain a bare
            // compound/Any-typed parameter directly.
            _ => "String".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_sort_declared_once() {
        let mut script = Script::new();
        let mut registry = SortRegistry::new();
        let a = registry.declare_entity(&mut script, "tt:contact");
        let b = registry.declare_entity(&mut script, "tt:contact");
        assert_eq!(a, b);
        assert_eq!(script.commands.len(), 1);
    }

    #[test]
    fn get_groups_declared_once() {
        let mut script = Script::new();
        let mut registry = SortRegistry::new();
        registry.declare_get_groups(&mut script, "Entity_tt_contact", "Entity_tt_contact_group");
        registry.declare_get_groups(&mut script, "Entity_tt_contact", "Entity_tt_contact_group");
        let declared = script
            .commands
            .iter()
            .filter(|c| matches!(c, crate::term::Command::DeclareFun { name, .. } if name == GET_GROUPS_FN))
            .count();
        assert_eq!(declared, 1);
    }

    #[test]
    fn enum_domains_dedup_by_symbol_list() {
        let mut script = Script::new();
        let mut registry = SortRegistry::new();
        let d1 = EnumDomain::closed(vec!["a".into(), "b".into()]);
        let d2 = EnumDomain::closed(vec!["a".into(), "b".into()]);
        let d3 = EnumDomain::closed(vec!["c".into()]);
        let n1 = registry.declare_enum(&mut script, &d1);
        let n2 = registry.declare_enum(&mut script, &d2);
        let n3 = registry.declare_enum(&mut script, &d3);
        assert_eq!(n1, n2);
        assert_ne!(n1, n3);
        assert_eq!(script.commands.len(), 2);
    }

    #[test]
    fn array_sort_wraps_element_as_set() {
        let mut script = Script::new();
        let mut registry = SortRegistry::new();
        assert_eq!(registry.sort_of(&mut script, &Type::array(Type::Number)), "(Set Real)");
    }
}
