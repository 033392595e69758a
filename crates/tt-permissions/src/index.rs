//! Preprocessing: indexing applicable permission rules by
//! `(kind, channel)` and collecting every contact entity a program or rule
//! set references.

use tt_ast::{
    iterate_primitives, BooleanExpression, PermissionFunction, PermissionRule, Primitive, Program,
    Value,
};
use tt_common::cache::MultiMap;

/// `tt:contact`'s entity kind string — the only one group-membership
/// lookups care about; every other entity kind is irrelevant here.
pub const CONTACT_ENTITY_KIND: &str = "tt:contact";

/// The entity kind group-membership facts are encoded as a `Set` of
/// (spec.md §4.4: "Contact groups use a `Set<Entity_tt_contact_group>`").
pub const CONTACT_GROUP_ENTITY_KIND: &str = "tt:contact_group";

/// Build the `(kind, channel) -> applicable rules` index. A rule is indexed
/// under every `(kind, channel)` its query or action side could match;
/// `Builtin`/`Star`/`ClassStar` never narrow to one key, so the lookup
/// side (`applicable_rules`) re-checks with `PermissionFunction::matches`.
#[must_use]
pub fn index_by_kind_channel(policies: &[PermissionRule]) -> MultiMap<(String, String), usize> {
    let mut index = MultiMap::new();
    for (i, rule) in policies.iter().enumerate() {
        if let PermissionFunction::Specified { kind, channel, .. } = &rule.query {
            index.insert((kind.clone(), channel.clone()), i);
        }
        if let PermissionFunction::Specified { kind, channel, .. } = &rule.action {
            index.insert((kind.clone(), channel.clone()), i);
        }
    }
    index
}

/// Every policy in `policies` whose query or action side matches
/// `(kind, channel)`.
///
/// A full linear scan — used directly only by callers that haven't built
/// an `index_by_kind_channel` index (e.g. tests exercising a handful of
/// rules); `applicable_rules_indexed` is the preprocessed equivalent
/// `PermissionChecker` actually drives (spec.md §4.5, "Preprocessing").
#[must_use]
pub fn applicable_rules<'p>(
    policies: &'p [PermissionRule],
    kind: &str,
    channel: &str,
) -> Vec<&'p PermissionRule> {
    policies
        .iter()
        .filter(|rule| rule.query.matches(kind, channel) || rule.action.matches(kind, channel))
        .collect()
}

/// Like `applicable_rules`, but consults the `(kind, channel) -> rules`
/// index built once per `check_program` call instead of scanning every
/// policy: `Specified` rules matching `(kind, channel)` come straight out
/// of the index, and only the (typically few) `Builtin`/`Star`/`ClassStar`
/// rules — which apply to more than one key and so can't be indexed by a
/// single `(kind, channel)` — fall back to a direct `matches` check.
#[must_use]
pub fn applicable_rules_indexed<'p>(
    policies: &'p [PermissionRule],
    index: &MultiMap<(String, String), usize>,
    kind: &str,
    channel: &str,
) -> Vec<&'p PermissionRule> {
    let mut indices: Vec<usize> = index.get(&(kind.to_string(), channel.to_string())).to_vec();
    for (i, rule) in policies.iter().enumerate() {
        let query_unindexed = !matches!(rule.query, PermissionFunction::Specified { .. });
        let action_unindexed = !matches!(rule.action, PermissionFunction::Specified { .. });
        if (query_unindexed && rule.query.matches(kind, channel))
            || (action_unindexed && rule.action.matches(kind, channel))
        {
            indices.push(i);
        }
    }
    indices.sort_unstable();
    indices.dedup();
    indices.into_iter().map(|i| &policies[i]).collect()
}

/// Every `tt:contact` entity id reachable from `program`'s invocations and
/// filters.
#[must_use]
pub fn collect_program_contacts(program: &Program) -> Vec<String> {
    let mut out = Vec::new();
    for prim in iterate_primitives(program) {
        match prim {
            Primitive::Query(inv) | Primitive::Action(inv) => {
                for (_, value) in &inv.in_params {
                    collect_value_contacts(value, &mut out);
                }
            }
            Primitive::Filter(ext) => {
                for (_, value) in ext.in_params {
                    collect_value_contacts(value, &mut out);
                }
            }
        }
    }
    out.sort();
    out.dedup();
    out
}

/// Every `tt:contact` entity id referenced in a single permission rule's
/// principal filter and its query/action filters.
#[must_use]
pub fn collect_rule_contacts(rule: &PermissionRule) -> Vec<String> {
    let mut out = Vec::new();
    collect_filter_contacts(&rule.principal_filter, &mut out);
    if let PermissionFunction::Specified { filter, .. } = &rule.query {
        collect_filter_contacts(filter, &mut out);
    }
    if let PermissionFunction::Specified { filter, .. } = &rule.action {
        collect_filter_contacts(filter, &mut out);
    }
    out.sort();
    out.dedup();
    out
}

fn collect_filter_contacts(filter: &BooleanExpression, out: &mut Vec<String>) {
    match filter {
        BooleanExpression::True | BooleanExpression::False | BooleanExpression::DontCare { .. } => {}
        BooleanExpression::And(ops) | BooleanExpression::Or(ops) => {
            for op in ops {
                collect_filter_contacts(op, out);
            }
        }
        BooleanExpression::Not(op) => collect_filter_contacts(op, out),
        BooleanExpression::Atom { value, .. } => collect_value_contacts(value, out),
        BooleanExpression::Compute { lhs, rhs, .. } => {
            collect_value_contacts(lhs, out);
            collect_value_contacts(rhs, out);
        }
        BooleanExpression::External { in_params, filter, .. } => {
            for (_, value) in in_params {
                collect_value_contacts(value, out);
            }
            collect_filter_contacts(filter, out);
        }
    }
}

fn collect_value_contacts(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Entity { id, kind, .. } if kind == CONTACT_ENTITY_KIND => out.push(id.clone()),
        Value::ArrayValue(items) => {
            for item in items {
                collect_value_contacts(item, out);
            }
        }
        Value::Computation { operands, .. } => {
            for op in operands {
                collect_value_contacts(op, out);
            }
        }
        Value::ArrayFieldValue { value, .. } => collect_value_contacts(value, out),
        Value::FilterValue { value, filter } => {
            collect_value_contacts(value, out);
            collect_filter_contacts(filter, out);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_ast::{Invocation, Selector};

    fn specified(kind: &str, channel: &str) -> PermissionFunction {
        PermissionFunction::Specified {
            kind: kind.to_string(),
            channel: channel.to_string(),
            filter: BooleanExpression::True,
            schema: None,
        }
    }

    #[test]
    fn indexes_rules_by_query_and_action_kind_channel() {
        let rules = vec![PermissionRule {
            principal_filter: BooleanExpression::True,
            query: specified("com.twitter", "search"),
            action: PermissionFunction::Builtin,
        }];
        let index = index_by_kind_channel(&rules);
        assert_eq!(index.get(&("com.twitter".to_string(), "search".to_string())), &[0]);
    }

    #[test]
    fn applicable_rules_matches_star_and_class_star() {
        let rules = vec![
            PermissionRule {
                principal_filter: BooleanExpression::True,
                query: PermissionFunction::Star,
                action: PermissionFunction::Builtin,
            },
            PermissionRule {
                principal_filter: BooleanExpression::True,
                query: specified("com.other", "get"),
                action: PermissionFunction::Builtin,
            },
        ];
        let found = applicable_rules(&rules, "com.twitter", "search");
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn indexed_lookup_matches_the_linear_scan() {
        let rules = vec![
            PermissionRule {
                principal_filter: BooleanExpression::True,
                query: PermissionFunction::Star,
                action: PermissionFunction::Builtin,
            },
            PermissionRule {
                principal_filter: BooleanExpression::True,
                query: specified("com.twitter", "search"),
                action: PermissionFunction::Builtin,
            },
            PermissionRule {
                principal_filter: BooleanExpression::True,
                query: specified("com.other", "get"),
                action: PermissionFunction::Builtin,
            },
        ];
        let index = index_by_kind_channel(&rules);
        let indexed = applicable_rules_indexed(&rules, &index, "com.twitter", "search");
        let scanned = applicable_rules(&rules, "com.twitter", "search");
        assert_eq!(indexed.len(), scanned.len());
        assert_eq!(indexed.len(), 2);
    }

    #[test]
    fn collects_contact_entities_from_invocation_params() {
        let mut program = Program::new();
        let mut invocation = Invocation::new(Selector::device("com.test"), "send");
        invocation.in_params.push((
            "to".to_string(),
            Value::Entity {
                id: "alice@example.com".to_string(),
                kind: CONTACT_ENTITY_KIND.to_string(),
                display: None,
            },
        ));
        program.rules.push(tt_ast::Statement::Command {
            table: None,
            actions: vec![tt_ast::Action::Invocation(invocation)],
        });
        let contacts = collect_program_contacts(&program);
        assert_eq!(contacts, vec!["alice@example.com".to_string()]);
    }
}
