//! Schema validation and index/AST consistency checking
//!
//! Both checks are gates: they run before graph construction (inputs) and
//! before the output file is written (lineage), and any failure is fatal.
//! Graph construction itself never consults the schemas.

use std::collections::BTreeSet;

use jsonschema::Validator;
use serde_json::Value;

use crate::document::{AstDocument, IndexDocument, ObjectCategory};
use crate::error::{
    AnalyzeError, CategoryMismatch, ConsistencyReport, DocumentKind, SchemaViolation,
};
use crate::normalize::Normalizer;

const AST_SCHEMA: &str = include_str!("../schemas/ast.schema.json");
const INDEX_SCHEMA: &str = include_str!("../schemas/index.schema.json");
const LINEAGE_SCHEMA: &str = include_str!("../schemas/lineage.schema.json");

/// Compiled JSON Schemas for the two input documents and the lineage output
pub struct SchemaValidator {
    index: Validator,
    ast: Validator,
    lineage: Validator,
}

impl SchemaValidator {
    /// Compile the schemas shipped with the crate
    pub fn from_embedded() -> Result<Self, AnalyzeError> {
        Self::from_sources(INDEX_SCHEMA, AST_SCHEMA, LINEAGE_SCHEMA)
    }

    /// Compile caller-supplied schema documents (e.g. loaded from a
    /// `--schema-dir` override)
    pub fn from_sources(index: &str, ast: &str, lineage: &str) -> Result<Self, AnalyzeError> {
        Ok(Self {
            index: compile(DocumentKind::Index, index)?,
            ast: compile(DocumentKind::Ast, ast)?,
            lineage: compile(DocumentKind::Lineage, lineage)?,
        })
    }

    pub fn validate_index(&self, doc: &Value) -> Result<(), AnalyzeError> {
        check(&self.index, DocumentKind::Index, doc)
    }

    pub fn validate_ast(&self, doc: &Value) -> Result<(), AnalyzeError> {
        check(&self.ast, DocumentKind::Ast, doc)
    }

    pub fn validate_lineage(&self, doc: &Value) -> Result<(), AnalyzeError> {
        check(&self.lineage, DocumentKind::Lineage, doc)
    }
}

fn compile(kind: DocumentKind, source: &str) -> Result<Validator, AnalyzeError> {
    let schema: Value = serde_json::from_str(source).map_err(|e| AnalyzeError::InvalidSchema {
        document: kind,
        message: e.to_string(),
    })?;
    jsonschema::validator_for(&schema).map_err(|e| AnalyzeError::InvalidSchema {
        document: kind,
        message: e.to_string(),
    })
}

fn check(validator: &Validator, kind: DocumentKind, doc: &Value) -> Result<(), AnalyzeError> {
    let violations: Vec<SchemaViolation> = validator
        .iter_errors(doc)
        .map(|error| SchemaViolation {
            instance_path: error.instance_path.to_string(),
            schema_path: error.schema_path.to_string(),
            message: error.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(AnalyzeError::Schema {
            document: kind,
            violations,
        })
    }
}

/// Cross-check the object names declared in the index against the object
/// names present in the AST, per category, after normalization.
///
/// Returns an empty report when the sets agree; every name present on one
/// side but missing from the other is listed explicitly.
pub fn check_consistency(
    index: &IndexDocument,
    ast: &AstDocument,
    normalizer: &Normalizer,
) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();

    for category in ObjectCategory::ALL {
        let index_names: BTreeSet<String> = index
            .category(category)
            .keys()
            .map(|name| normalizer.normalize(name))
            .collect();
        let ast_names: BTreeSet<String> = ast
            .category(category)
            .iter()
            .filter_map(|def| def.name.as_deref())
            .map(|name| normalizer.normalize(name))
            .collect();

        let missing_in_ast: Vec<String> = index_names.difference(&ast_names).cloned().collect();
        let missing_in_index: Vec<String> = ast_names.difference(&index_names).cloned().collect();

        if !missing_in_ast.is_empty() || !missing_in_index.is_empty() {
            report.mismatches.push(CategoryMismatch {
                category: category.key().to_string(),
                missing_in_ast,
                missing_in_index,
            });
        }
    }

    report
}
