//! Statement processing - the recursive walk over AST statement lists
//!
//! Dispatches on each statement's `type` tag and populates the call-graph
//! and table-usage accumulators. Best-effort over heterogeneous input:
//! unrecognized tags and missing fields degrade to a skip or a `["*"]`
//! column list, never an error.

use std::collections::HashSet;

use crate::analyzer::{expr, AnalysisContext, UsageRecord, SENTINEL_TABLES};
use crate::document::{collect_strings, Statement};
use crate::lineage::UsageKind;

pub(crate) fn process_statements(
    ctx: &mut AnalysisContext,
    object: &str,
    statements: &[Statement],
    cte_names: &HashSet<String>,
) {
    for stmt in statements {
        process_statement(ctx, object, stmt, cte_names);
    }
}

fn process_statement(
    ctx: &mut AnalysisContext,
    object: &str,
    stmt: &Statement,
    cte_names: &HashSet<String>,
) {
    match stmt.kind.to_ascii_uppercase().as_str() {
        "EXECUTE_PROCEDURE" => {
            if let Some(name) = stmt.name.as_deref() {
                ctx.record_call(object, name);
            }
        }

        "SET" => {
            if let Some(value) = &stmt.value {
                expr::walk_expression(ctx, object, value);
            }
        }

        "WITH_CTE" => {
            let mut scope = cte_names.clone();
            scope.extend(stmt.cte_list.iter().filter_map(|cte| cte.name.clone()));
            for cte in &stmt.cte_list {
                if let Some(query) = &cte.query {
                    process_statement(ctx, object, query, &scope);
                }
            }
            if let Some(main_query) = &stmt.main_query {
                process_statement(ctx, object, main_query, &scope);
            }
        }

        "DECLARE_CURSOR" => {
            if let Some(select) = &stmt.select_statement {
                process_statement(ctx, object, select, cte_names);
            }
        }

        "SELECT" | "SELECT_INTO" => {
            let query = if stmt.kind.eq_ignore_ascii_case("SELECT") {
                Some(stmt)
            } else {
                stmt.query.as_deref()
            };
            if let Some(query) = query {
                process_select(ctx, object, query, cte_names);
            }
        }

        "UPDATE" => process_update(ctx, object, stmt),

        "INSERT" => {
            if let Some(table) = stmt.table.as_deref() {
                let mut cols: Vec<String> = stmt.columns.clone().unwrap_or_default();
                if cols.is_empty() {
                    cols.push("*".to_string());
                }
                ctx.record_usage(
                    table,
                    object,
                    UsageRecord {
                        op: UsageKind::Write,
                        cols,
                    },
                );
            }
            if let Some(select) = &stmt.select_statement {
                process_statement(ctx, object, select, cte_names);
            }
        }

        "DELETE" => process_delete(ctx, object, stmt),

        other => {
            let has_nested = stmt.condition.is_some()
                || stmt.then_branch.is_some()
                || stmt.else_branch.is_some()
                || stmt.body.is_some();
            if !other.is_empty() && !has_nested {
                tracing::debug!(object, kind = other, "skipping unrecognized statement type");
            }
        }
    }

    // Conditions and nested branches apply to every statement kind
    if let Some(condition) = &stmt.condition {
        expr::walk_expression(ctx, object, condition);
    }
    for branch in [
        stmt.then_branch.as_ref(),
        stmt.else_branch.as_ref(),
        stmt.body.as_ref(),
    ]
    .into_iter()
    .flatten()
    {
        process_statements(ctx, object, branch, cte_names);
    }
}

/// SELECT: register a read against the FROM table with the columns
/// referenced in the projection and WHERE clause
fn process_select(
    ctx: &mut AnalysisContext,
    object: &str,
    query: &Statement,
    cte_names: &HashSet<String>,
) {
    let Some(table) = query.from_table() else {
        return;
    };
    if SENTINEL_TABLES.contains(&table) || cte_names.contains(table) {
        return;
    }

    let column_exprs = query.columns.clone().unwrap_or_default();
    let mut fragments = column_exprs.clone();
    if let Some(where_clause) = &query.where_clause {
        collect_strings(where_clause, &mut fragments);
    }

    let mut excluded = HashSet::new();
    ctx.add_exclusion(&mut excluded, table);
    excluded.extend(cte_names.iter().cloned());
    excluded.extend(expr::extract_aliases(&column_exprs));

    let cols = expr::extract_columns(
        &fragments.join(" "),
        &excluded,
        ctx.normalizer().bind_marker(),
    );
    ctx.record_usage(
        table,
        object,
        UsageRecord {
            op: UsageKind::Read,
            cols,
        },
    );
}

/// UPDATE: the SET targets are a write; identifiers in the WHERE clause and
/// on the SET right-hand sides are a read. Both records may be emitted for
/// one statement.
fn process_update(ctx: &mut AnalysisContext, object: &str, stmt: &Statement) {
    let Some(table) = stmt.table.as_deref() else {
        return;
    };

    let mut written: Vec<String> = stmt
        .set
        .as_ref()
        .map(|set| set.keys().cloned().collect())
        .unwrap_or_default();

    let mut read_fragments = Vec::new();
    if let Some(set) = &stmt.set {
        for value in set.values() {
            collect_strings(value, &mut read_fragments);
        }
    }
    if let Some(where_clause) = &stmt.where_clause {
        collect_strings(where_clause, &mut read_fragments);
    }

    if !read_fragments.is_empty() {
        let mut excluded = HashSet::new();
        ctx.add_exclusion(&mut excluded, table);
        excluded.extend(written.iter().cloned());
        let cols = expr::extract_columns(
            &read_fragments.join(" "),
            &excluded,
            ctx.normalizer().bind_marker(),
        );
        ctx.record_usage(
            table,
            object,
            UsageRecord {
                op: UsageKind::Read,
                cols,
            },
        );
    }

    if written.is_empty() {
        written.push("*".to_string());
    }
    ctx.record_usage(
        table,
        object,
        UsageRecord {
            op: UsageKind::Write,
            cols: written,
        },
    );
}

/// DELETE: recorded as a write whose columns are the WHERE-referenced
/// identifiers, since those describe the rows being removed
fn process_delete(ctx: &mut AnalysisContext, object: &str, stmt: &Statement) {
    let Some(table) = stmt.table.as_deref() else {
        return;
    };

    let mut fragments = Vec::new();
    if let Some(where_clause) = &stmt.where_clause {
        collect_strings(where_clause, &mut fragments);
    }

    let mut excluded = HashSet::new();
    ctx.add_exclusion(&mut excluded, table);
    let cols = expr::extract_columns(
        &fragments.join(" "),
        &excluded,
        ctx.normalizer().bind_marker(),
    );
    ctx.record_usage(
        table,
        object,
        UsageRecord {
            op: UsageKind::Write,
            cols,
        },
    );
}
