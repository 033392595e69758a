//! `Stream` rewrites: filter-of-filter fusion, filter/
//! projection commute, filter/monitor commute, and edge-operator folding.

use tt_ast::{BooleanExpression, Stream, Table};

use crate::boolean::optimize_boolean;
use crate::table::optimize_table;

/// Optimize `stream` in place. Returns whether it now statically produces
/// no records; the caller (a `Rule`/`Declaration`) decides what
/// "deletes" means at its level.
pub fn optimize_stream(stream: &mut Stream) -> bool {
    match stream {
        Stream::VarRef(_) => false,
        Stream::Timer { .. } | Stream::AtTimer { .. } => false,
        Stream::Monitor { table, .. } => optimize_table(table),
        Stream::EdgeNew { stream: inner, .. } => {
            let inner_dead = optimize_stream(inner);

            // edge_new(monitor(t)) -> monitor(t); edge_new(edge_new(t)) -> edge_new(t)
            let collapsed = matches!(
                inner.as_ref(),
                Stream::Monitor { .. } | Stream::EdgeNew { .. }
            );
            if collapsed {
                *stream = (**inner).clone();
            }
            inner_dead
        }
        Stream::EdgeFilter { stream: inner, filter, .. } => {
            let inner_dead = optimize_stream(inner);
            optimize_boolean(filter);
            inner_dead || filter.is_false()
        }
        Stream::Filter { stream: inner, filter, .. } => {
            let inner_dead = optimize_stream(inner);
            optimize_boolean(filter);

            // filter(filter(s, f), g) -> filter(s, f ∧ g)
            let fused = match inner.as_mut() {
                Stream::Filter {
                    stream: fused_stream,
                    filter: fused_filter,
                    ..
                } => Some((
                    std::mem::replace(fused_stream.as_mut(), Stream::VarRef(String::new())),
                    std::mem::replace(fused_filter.as_mut(), BooleanExpression::True),
                )),
                _ => None,
            };
            if let Some((taken_stream, taken_filter)) = fused {
                **inner = taken_stream;
                *filter = Box::new(BooleanExpression::and(vec![taken_filter, (**filter).clone()]));
                optimize_boolean(filter);
            }

            // filter(project(s, a), f) -> project(filter(s, f), a) when f
            // references only names in a.
            let commuted = match inner.as_mut() {
                Stream::Projection {
                    stream: proj_stream,
                    args,
                    computations,
                    schema,
                } => {
                    let mut names = Vec::new();
                    filter.referenced_names(&mut names);
                    if names.iter().all(|n| args.contains(n)) {
                        Some((
                            std::mem::replace(proj_stream.as_mut(), Stream::VarRef(String::new())),
                            args.clone(),
                            computations.clone(),
                            schema.clone(),
                        ))
                    } else {
                        None
                    }
                }
                _ => None,
            };
            if let Some((proj_inner, args, computations, schema)) = commuted {
                let moved_filter = std::mem::replace(filter.as_mut(), BooleanExpression::True);
                let new_filter_stream = Stream::Filter {
                    stream: Box::new(proj_inner),
                    filter: Box::new(moved_filter),
                    schema: schema.clone(),
                };
                *stream = Stream::Projection {
                    stream: Box::new(new_filter_stream),
                    args,
                    computations,
                    schema,
                };
                return inner_dead;
            }

            // filter(monitor(t), f) -> monitor(filter(t, f)): moves the
            // filter under the monitor.
            if matches!(inner.as_ref(), Stream::Monitor { .. }) {
                if let Stream::Monitor {
                    table: mon_table,
                    args: mon_args,
                    schema: mon_schema,
                } = inner.as_mut()
                {
                    let moved_filter = std::mem::replace(filter.as_mut(), BooleanExpression::True);
                    let inner_table =
                        std::mem::replace(mon_table.as_mut(), Table::VarRef(String::new()));
                    let new_filter_table = Table::Filter {
                        table: Box::new(inner_table),
                        filter: Box::new(moved_filter),
                        schema: mon_schema.clone(),
                    };
                    *stream = Stream::Monitor {
                        table: Box::new(new_filter_table),
                        args: mon_args.clone(),
                        schema: mon_schema.clone(),
                    };
                    return inner_dead;
                }
            }

            inner_dead || filter.is_false()
        }
        Stream::Projection { stream: inner, .. } => optimize_stream(inner),
        Stream::Compute { stream: inner, .. } | Stream::Alias { stream: inner, .. } => {
            optimize_stream(inner)
        }
        Stream::Join { stream: inner, table, .. } => {
            let stream_dead = optimize_stream(inner);
            let table_dead = optimize_table(table);
            stream_dead || table_dead
        }
    }
}
