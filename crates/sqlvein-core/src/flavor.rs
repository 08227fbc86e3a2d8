//! SQL flavor support

use std::str::FromStr;

/// Supported SQL flavors
///
/// The analyzer consumes pre-parsed ASTs, so the flavor only controls the
/// naming conventions applied during normalization: the schema an
/// unqualified object name is resolved into, and the marker that
/// distinguishes bind variables from column references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlFlavor {
    #[default]
    Tsql,
    PostgreSql,
}

impl SqlFlavor {
    /// Get default schema name for this flavor
    pub fn default_schema(&self) -> &'static str {
        match self {
            SqlFlavor::Tsql => "dbo",
            SqlFlavor::PostgreSql => "public",
        }
    }

    /// Prefix that marks a bind variable / parameter reference
    pub fn bind_marker(&self) -> char {
        match self {
            SqlFlavor::Tsql => '@',
            SqlFlavor::PostgreSql => '$',
        }
    }
}

impl FromStr for SqlFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tsql" | "t-sql" | "mssql" | "sqlserver" => Ok(SqlFlavor::Tsql),
            "postgresql" | "postgres" | "pg" => Ok(SqlFlavor::PostgreSql),
            _ => Err(format!(
                "Unknown flavor: '{}'. Supported flavors: tsql, postgresql.",
                s
            )),
        }
    }
}

impl std::fmt::Display for SqlFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlFlavor::Tsql => write!(f, "tsql"),
            SqlFlavor::PostgreSql => write!(f, "postgresql"),
        }
    }
}
