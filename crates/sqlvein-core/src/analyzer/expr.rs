//! Expression and condition walking
//!
//! Raw SQL fragments inside expression nodes are scanned with regexes, not
//! parsed. That is a known precision/recall tradeoff inherited from the
//! upstream AST format (fragments are free text), kept behind the narrow
//! [`extract_calls`] / [`extract_columns`] interface so a real expression
//! parser could replace it without touching the statement dispatch.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::analyzer::{AnalysisContext, UsageRecord, SENTINEL_TABLES};
use crate::lineage::UsageKind;
use crate::normalize::is_sql_keyword;

/// Optionally-qualified identifier immediately followed by `(`
static CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*\(")
        .expect("call pattern")
});

/// Bare identifier token
static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("identifier pattern"));

/// `AS <alias>` in a projected column expression
static ALIAS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bAS\s+([A-Za-z_][A-Za-z0-9_]*)\b").expect("alias pattern"));

/// Table reference after FROM or JOIN in an embedded fragment
static EMBEDDED_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN)\s+([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)?)")
        .expect("embedded table pattern")
});

/// Projection span of an embedded SELECT
static SELECT_SPAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bSELECT\b(.*?)\bFROM\b").expect("select span pattern"));

/// Scan a SQL fragment for call-like patterns.
///
/// Returns raw (possibly qualified) names in order of first occurrence,
/// deduplicated, with SQL keywords and builtin functions filtered out.
pub fn extract_calls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut calls = Vec::new();
    for cap in CALL_RE.captures_iter(text) {
        let name = &cap[1];
        let bare = name.rsplit('.').next().unwrap_or(name);
        if is_sql_keyword(bare) {
            continue;
        }
        if seen.insert(name.to_string()) {
            calls.push(name.to_string());
        }
    }
    calls
}

/// Extract candidate column names from a SQL fragment.
///
/// Tokens that are SQL keywords, bind variables, or members of `excluded`
/// (tables, CTE names, aliases, in any spelling) are dropped. Falls back to
/// `["*"]` when no text is given or no identifier survives: unresolved
/// means "assume all columns", never an empty list.
pub fn extract_columns(text: &str, excluded: &HashSet<String>, bind_marker: char) -> Vec<String> {
    if text.trim().is_empty() {
        return vec!["*".to_string()];
    }

    let mut columns: Vec<String> = Vec::new();
    for m in IDENT_RE.find_iter(text) {
        let token = m.as_str();
        if is_sql_keyword(token) || excluded.contains(token) {
            continue;
        }
        // A token preceded by the bind marker is a parameter, not a column
        if text[..m.start()].ends_with(bind_marker) {
            continue;
        }
        if !columns.iter().any(|c| c.as_str() == token) {
            columns.push(token.to_string());
        }
    }

    if columns.is_empty() {
        return vec!["*".to_string()];
    }
    columns.sort();
    columns
}

/// Collect `AS <alias>` names from projected column expressions, so aliases
/// are not mistaken for source columns
pub(crate) fn extract_aliases(column_exprs: &[String]) -> HashSet<String> {
    column_exprs
        .iter()
        .filter_map(|expr| ALIAS_RE.captures(expr))
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Recursively walk an expression node, registering call edges and any
/// table reads hidden in embedded sub-query fragments
pub(crate) fn walk_expression(ctx: &mut AnalysisContext, object: &str, node: &Value) {
    match node {
        Value::String(text) => walk_fragment(ctx, object, text),
        Value::Object(map) => {
            if map.contains_key("op") {
                if let Some(left) = map.get("left") {
                    walk_expression(ctx, object, left);
                }
                if let Some(right) = map.get("right") {
                    walk_expression(ctx, object, right);
                }
            } else if let Some(sql) = map.get("sql").and_then(Value::as_str) {
                walk_fragment(ctx, object, sql);
            }
        }
        _ => {}
    }
}

fn walk_fragment(ctx: &mut AnalysisContext, object: &str, text: &str) {
    for callee in extract_calls(text) {
        ctx.record_call(object, &callee);
    }
    scan_embedded_query(ctx, object, text);
}

/// Best-effort handling of a raw fragment that embeds a `SELECT`: read
/// usage is registered against every table named after FROM/JOIN, with
/// columns lifted from the SELECT..FROM span
fn scan_embedded_query(ctx: &mut AnalysisContext, object: &str, text: &str) {
    let upper = text.to_ascii_uppercase();
    if !upper.contains("SELECT") {
        return;
    }

    let mut tables = Vec::new();
    for cap in EMBEDDED_TABLE_RE.captures_iter(text) {
        let table = cap[1].to_string();
        let bare = table.rsplit('.').next().unwrap_or(&table);
        if SENTINEL_TABLES.contains(&table.as_str()) || is_sql_keyword(bare) {
            continue;
        }
        if !tables.contains(&table) {
            tables.push(table);
        }
    }
    if tables.is_empty() {
        return;
    }

    let mut excluded = HashSet::new();
    for table in &tables {
        ctx.add_exclusion(&mut excluded, table);
    }
    let cols = match SELECT_SPAN_RE.captures(text) {
        Some(cap) => extract_columns(&cap[1], &excluded, ctx.normalizer().bind_marker()),
        None => vec!["*".to_string()],
    };

    tracing::trace!(object, tables = ?tables, "embedded query fragment");
    for table in tables {
        ctx.record_usage(
            &table,
            object,
            UsageRecord {
                op: UsageKind::Read,
                cols: cols.clone(),
            },
        );
    }
}
