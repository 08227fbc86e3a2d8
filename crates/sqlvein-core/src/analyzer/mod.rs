//! Lineage analyzer module

mod expr;
mod statements;

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use serde_json::Value;

use crate::document::{AstDocument, IndexDocument, ObjectCategory, ObjectType};
use crate::error::AnalyzeError;
use crate::flavor::SqlFlavor;
use crate::lineage::{build_lineage, Lineage, UsageKind};
use crate::normalize::{is_sql_keyword, Normalizer};
use crate::validate::{check_consistency, SchemaValidator};

pub use expr::{extract_calls, extract_columns};

/// Placeholder table names the upstream parser emits when a statement has
/// no real source table
pub(crate) const SENTINEL_TABLES: [&str; 2] = ["DUMMY_TABLE", "NO_TABLE"];

/// One table access attributed to a calling object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageRecord {
    pub op: UsageKind,
    /// Referenced column names; `["*"]` when unresolved
    pub cols: Vec<String>,
}

/// Table -> caller -> usage records
pub(crate) type TableUsageMap = IndexMap<String, IndexMap<String, Vec<UsageRecord>>>;

/// Mutable accumulators for a single analysis run.
///
/// Owned by one top-level [`Analyzer::analyze_documents`] call and threaded
/// by `&mut` through the statement recursion; nothing else writes to it.
pub(crate) struct AnalysisContext<'a> {
    pub(crate) normalizer: &'a Normalizer,
    /// Caller -> set of normalized callee names
    pub(crate) calls: IndexMap<String, BTreeSet<String>>,
    pub(crate) table_usage: TableUsageMap,
    /// Every known object and its resolved type; index declarations first,
    /// then tables discovered while walking statements
    pub(crate) registry: IndexMap<String, ObjectType>,
}

impl<'a> AnalysisContext<'a> {
    pub(crate) fn new(normalizer: &'a Normalizer) -> Self {
        Self {
            normalizer,
            calls: IndexMap::new(),
            table_usage: IndexMap::new(),
            registry: IndexMap::new(),
        }
    }

    pub(crate) fn normalizer(&self) -> &Normalizer {
        self.normalizer
    }

    /// Register a declared object; first declaration wins
    pub(crate) fn declare(&mut self, name: String, object_type: ObjectType) {
        self.registry.entry(name).or_insert(object_type);
    }

    /// Register a call edge from `caller` to the (raw) callee name.
    ///
    /// Keyword matches from the heuristic scanner (builtins like COUNT or
    /// GETDATE) and self-calls are dropped here, so every insertion site
    /// shares one policy.
    pub(crate) fn record_call(&mut self, caller: &str, callee: &str) {
        if callee.is_empty() {
            return;
        }
        let bare = callee.rsplit('.').next().unwrap_or(callee);
        if is_sql_keyword(bare) {
            return;
        }
        let callee = self.normalizer.normalize(callee);
        if callee == caller {
            return;
        }
        self.calls.entry(caller.to_string()).or_default().insert(callee);
    }

    /// Attribute a table access to `caller`. The table name is normalized
    /// here and the table is added to the registry if nothing declared it.
    pub(crate) fn record_usage(&mut self, table: &str, caller: &str, record: UsageRecord) {
        let table = self.normalizer.normalize(table);
        self.declare(table.clone(), ObjectType::Table);
        self.table_usage
            .entry(table)
            .or_default()
            .entry(caller.to_string())
            .or_default()
            .push(record);
    }

    /// Seed an exclusion set with every spelling a name can appear under in
    /// raw SQL text: as given, schema-qualified, and each dotted segment.
    pub(crate) fn add_exclusion(&self, excluded: &mut HashSet<String>, name: &str) {
        excluded.insert(name.to_string());
        excluded.insert(self.normalizer.normalize(name));
        for part in name.split('.') {
            excluded.insert(part.to_string());
        }
    }
}

/// Derives the lineage document from the index and AST documents
pub struct Analyzer {
    normalizer: Normalizer,
}

impl Analyzer {
    pub fn new(flavor: SqlFlavor) -> Self {
        Self {
            normalizer: Normalizer::new(flavor),
        }
    }

    pub fn with_normalizer(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Build the lineage graph from already-validated documents.
    ///
    /// This is pure graph construction: no schema gate, no consistency
    /// check. Use [`analyze`] for the full gated pipeline.
    pub fn analyze_documents(&self, index: &IndexDocument, ast: &AstDocument) -> Lineage {
        let mut ctx = AnalysisContext::new(&self.normalizer);

        for category in ObjectCategory::ALL {
            for name in index.category(category).keys() {
                ctx.declare(self.normalizer.normalize(name), category.object_type());
            }
        }

        for category in ObjectCategory::ALL {
            for def in ast.category(category) {
                let Some(name) = def.name.as_deref() else {
                    tracing::debug!(category = category.key(), "skipping unnamed object definition");
                    continue;
                };
                let object = self.normalizer.normalize(name);
                tracing::debug!(object = %object, statements = def.statements.len(), "processing object");
                statements::process_statements(&mut ctx, &object, &def.statements, &HashSet::new());
            }
        }

        build_lineage(ctx, index)
    }
}

/// Run the full analysis pipeline with the embedded JSON Schemas:
/// validate both inputs, check index/AST name consistency, build the
/// lineage graph, and validate the result before returning it.
pub fn analyze(index: &Value, ast: &Value, flavor: SqlFlavor) -> Result<Lineage, AnalyzeError> {
    let validator = SchemaValidator::from_embedded()?;
    analyze_with_validator(index, ast, flavor, &validator)
}

/// Same as [`analyze`] but against caller-supplied schemas
pub fn analyze_with_validator(
    index: &Value,
    ast: &Value,
    flavor: SqlFlavor,
    validator: &SchemaValidator,
) -> Result<Lineage, AnalyzeError> {
    validator.validate_index(index)?;
    validator.validate_ast(ast)?;

    let index_doc = IndexDocument::from_value(index)?;
    let ast_doc = AstDocument::from_value(ast)?;

    let normalizer = Normalizer::new(flavor);
    let report = check_consistency(&index_doc, &ast_doc, &normalizer);
    if !report.is_consistent() {
        return Err(AnalyzeError::Consistency(report));
    }

    let analyzer = Analyzer::with_normalizer(normalizer);
    let lineage = analyzer.analyze_documents(&index_doc, &ast_doc);

    validator.validate_lineage(&lineage.to_value()?)?;
    Ok(lineage)
}
