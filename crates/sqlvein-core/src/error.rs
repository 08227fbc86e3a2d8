//! Error and report types

use serde::Serialize;
use thiserror::Error;

/// Which input/output document an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Index,
    Ast,
    Lineage,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Index => write!(f, "index"),
            DocumentKind::Ast => write!(f, "AST"),
            DocumentKind::Lineage => write!(f, "lineage"),
        }
    }
}

/// A single JSON Schema violation
#[derive(Debug, Clone, Serialize)]
pub struct SchemaViolation {
    /// Path of the offending value inside the instance document
    pub instance_path: String,
    /// Path of the failed rule inside the schema document
    pub schema_path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.instance_path.is_empty() {
            "<root>"
        } else {
            &self.instance_path
        };
        write!(f, "{}: {} (rule: {})", path, self.message, self.schema_path)
    }
}

/// Name-set mismatch between index and AST for one object category
#[derive(Debug, Clone, Serialize)]
pub struct CategoryMismatch {
    pub category: String,
    /// Declared in the index but absent from the AST
    pub missing_in_ast: Vec<String>,
    /// Present in the AST but not declared in the index
    pub missing_in_index: Vec<String>,
}

/// Full result of the index/AST name consistency check
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyReport {
    pub mismatches: Vec<CategoryMismatch>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl std::fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, m) in self.mismatches.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            if !m.missing_in_ast.is_empty() {
                write!(
                    f,
                    "{} declared in the index but missing from the AST: {}",
                    m.category,
                    m.missing_in_ast.join(", ")
                )?;
            }
            if !m.missing_in_index.is_empty() {
                if !m.missing_in_ast.is_empty() {
                    writeln!(f)?;
                }
                write!(
                    f,
                    "{} present in the AST but missing from the index: {}",
                    m.category,
                    m.missing_in_index.join(", ")
                )?;
            }
        }
        Ok(())
    }
}

/// Fatal analysis errors
///
/// Per-statement problems (unknown statement types, missing table or column
/// information) are deliberately not represented here: the statement
/// processor degrades to `["*"]` or skips instead of failing the run.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("{document} document failed schema validation with {} violation(s)", .violations.len())]
    Schema {
        document: DocumentKind,
        violations: Vec<SchemaViolation>,
    },

    #[error("index and AST disagree on declared object names:\n{0}")]
    Consistency(ConsistencyReport),

    #[error("malformed {document} document: {message}")]
    Document {
        document: DocumentKind,
        message: String,
    },

    #[error("invalid JSON Schema for the {document} document: {message}")]
    InvalidSchema {
        document: DocumentKind,
        message: String,
    },
}
