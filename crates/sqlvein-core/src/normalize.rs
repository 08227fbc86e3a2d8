//! Object name normalization

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::flavor::SqlFlavor;

/// SQL keywords and builtin function names that must never be mistaken for
/// object or column references when scanning raw fragments.
pub static SQL_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "JOIN",
        "INNER", "LEFT", "RIGHT", "OUTER", "ON", "GROUP", "BY", "ORDER", "HAVING", "AS",
        "DISTINCT", "TOP", "CASE", "WHEN", "THEN", "ELSE", "END", "AND", "OR", "NOT", "CREATE",
        "TABLE", "PROCEDURE", "FUNCTION", "TRIGGER", "VIEW", "INDEX", "ALTER", "DROP", "TRUNCATE",
        "DECLARE", "EXEC", "EXECUTE", "CURSOR", "FOR", "OPEN", "FETCH", "CLOSE", "DEALLOCATE",
        "BEGIN", "COMMIT", "ROLLBACK", "TRANSACTION", "GO", "PRINT", "SUM", "AVG", "MAX", "MIN",
        "COUNT", "CAST", "CONVERT", "GETDATE", "YEAR", "OVER", "PARTITION", "ROWS", "BETWEEN",
        "UNBOUNDED", "PRECEDING", "CURRENT", "ROW", "IS", "NULL", "RAISERROR", "RETURN", "WHILE",
        "WITH", "CTE", "IN",
    ]
    .into_iter()
    .collect()
});

/// Check whether an identifier is a SQL keyword or builtin function name
pub fn is_sql_keyword(ident: &str) -> bool {
    SQL_KEYWORDS.contains(ident.to_ascii_uppercase().as_str())
}

/// Canonicalizes object references to schema-qualified form.
///
/// Every name that enters the lineage graph passes through [`Normalizer::normalize`]:
/// names declared in the index, names declared in the AST, and every
/// table/procedure/function reference discovered while walking statements.
/// A table and its qualified alias must land on the same key or the graph
/// splits into disconnected duplicates.
#[derive(Debug, Clone)]
pub struct Normalizer {
    default_schema: String,
    bind_marker: char,
}

impl Normalizer {
    pub fn new(flavor: SqlFlavor) -> Self {
        Self {
            default_schema: flavor.default_schema().to_string(),
            bind_marker: flavor.bind_marker(),
        }
    }

    /// Override the schema that unqualified names resolve into
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    pub fn bind_marker(&self) -> char {
        self.bind_marker
    }

    /// Schema-qualify an object name, or return it unchanged when it is not
    /// a plain object reference.
    ///
    /// Passed through unchanged: empty strings, SQL keywords, bind variables,
    /// and names that already carry a schema separator. Idempotent.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty()
            || raw.contains('.')
            || raw.starts_with(self.bind_marker)
            || is_sql_keyword(raw)
        {
            return raw.to_string();
        }
        format!("{}.{}", self.default_schema, raw)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(SqlFlavor::default())
    }
}
