//! Lineage document model and aggregation
//!
//! The aggregator merges the per-object call sets and the table-usage map
//! into the final lineage document. Everything is emitted in sorted order
//! (top-level keys, call lists, reverse edges, column lists) so two runs
//! over identical input produce byte-identical output.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use indexmap::IndexMap;

use crate::analyzer::{AnalysisContext, TableUsageMap};
use crate::document::{IndexDocument, ObjectType};
use crate::error::{AnalyzeError, DocumentKind};

/// How a column was touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageKind {
    Read,
    Write,
}

/// One column-level attribution on a table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnUsage {
    pub name: String,
    pub usage: UsageKind,
    pub caller: String,
    pub caller_type: ObjectType,
}

/// One entry in the lineage document
///
/// Table entries never carry `calls`; non-table entries never carry
/// `columns`. The `called_by_*` lists are derived from `calls` during
/// aggregation and are never mutated independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LineageEntry {
    Table {
        called_by: Vec<String>,
        columns: Vec<ColumnUsage>,
    },
    Procedure {
        calls: Vec<String>,
        called_by_procedure: Vec<String>,
        called_by_function: Vec<String>,
        called_by_trigger: Vec<String>,
    },
    Function {
        calls: Vec<String>,
        called_by_procedure: Vec<String>,
        called_by_function: Vec<String>,
        called_by_trigger: Vec<String>,
    },
    Trigger {
        on_table: Option<String>,
        event: Option<String>,
        calls: Vec<String>,
    },
}

impl LineageEntry {
    pub fn object_type(&self) -> ObjectType {
        match self {
            LineageEntry::Table { .. } => ObjectType::Table,
            LineageEntry::Procedure { .. } => ObjectType::Procedure,
            LineageEntry::Function { .. } => ObjectType::Function,
            LineageEntry::Trigger { .. } => ObjectType::Trigger,
        }
    }
}

/// The derived lineage document: normalized object name -> entry,
/// key-sorted for deterministic output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lineage {
    entries: BTreeMap<String, LineageEntry>,
}

impl Lineage {
    pub fn entries(&self) -> &BTreeMap<String, LineageEntry> {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&LineageEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_value(&self) -> Result<Value, AnalyzeError> {
        serde_json::to_value(self).map_err(|e| AnalyzeError::Document {
            document: DocumentKind::Lineage,
            message: e.to_string(),
        })
    }

    /// Render as pretty-printed JSON with a trailing newline, the on-disk
    /// format downstream consumers read
    pub fn to_pretty_json(&self) -> Result<String, AnalyzeError> {
        let mut out = serde_json::to_string_pretty(self).map_err(|e| AnalyzeError::Document {
            document: DocumentKind::Lineage,
            message: e.to_string(),
        })?;
        out.push('\n');
        Ok(out)
    }
}

/// Merge the run's accumulators and the object registry into the final
/// document
pub(crate) fn build_lineage(ctx: AnalysisContext, index: &IndexDocument) -> Lineage {
    let AnalysisContext {
        normalizer,
        calls,
        table_usage,
        registry,
    } = ctx;

    // Invert the call graph, partitioned by the caller's type
    let mut called_by: HashMap<&str, BTreeMap<ObjectType, BTreeSet<&str>>> = HashMap::new();
    for (caller, callees) in &calls {
        let Some(caller_type) = registry.get(caller.as_str()).copied() else {
            continue;
        };
        if caller_type == ObjectType::Table {
            continue;
        }
        for callee in callees {
            called_by
                .entry(callee.as_str())
                .or_default()
                .entry(caller_type)
                .or_default()
                .insert(caller.as_str());
        }
    }
    let reverse = |name: &str, ty: ObjectType| -> Vec<String> {
        called_by
            .get(name)
            .and_then(|by_type| by_type.get(&ty))
            .map(|callers| callers.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default()
    };

    // Trigger metadata is declared in the index under raw names
    let trigger_meta: HashMap<String, (Option<String>, Option<String>)> = index
        .triggers
        .iter()
        .map(|(raw, meta)| {
            (
                normalizer.normalize(raw),
                (
                    meta.on_table.as_deref().map(|t| normalizer.normalize(t)),
                    meta.event.clone(),
                ),
            )
        })
        .collect();

    let sorted_calls = |name: &str| -> Vec<String> {
        calls
            .get(name)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    };

    let mut entries = BTreeMap::new();
    for (name, object_type) in &registry {
        let entry = match object_type {
            ObjectType::Table => build_table_entry(name, &table_usage, &registry),
            ObjectType::Procedure => LineageEntry::Procedure {
                calls: sorted_calls(name),
                called_by_procedure: reverse(name, ObjectType::Procedure),
                called_by_function: reverse(name, ObjectType::Function),
                called_by_trigger: reverse(name, ObjectType::Trigger),
            },
            ObjectType::Function => LineageEntry::Function {
                calls: sorted_calls(name),
                called_by_procedure: reverse(name, ObjectType::Procedure),
                called_by_function: reverse(name, ObjectType::Function),
                called_by_trigger: reverse(name, ObjectType::Trigger),
            },
            ObjectType::Trigger => {
                let (on_table, event) = trigger_meta.get(name).cloned().unwrap_or_default();
                LineageEntry::Trigger {
                    on_table,
                    event,
                    calls: sorted_calls(name),
                }
            }
        };
        entries.insert(name.clone(), entry);
    }

    Lineage { entries }
}

fn build_table_entry(
    name: &str,
    table_usage: &TableUsageMap,
    registry: &IndexMap<String, ObjectType>,
) -> LineageEntry {
    let usage = table_usage.get(name);

    let called_by: Vec<String> = usage
        .map(|callers| callers.keys().cloned().collect::<BTreeSet<_>>())
        .unwrap_or_default()
        .into_iter()
        .collect();

    let mut columns = Vec::new();
    let mut seen: HashSet<(String, UsageKind, String)> = HashSet::new();
    if let Some(callers) = usage {
        for (caller, records) in callers {
            // A usage record is only emitted when the caller's type is
            // known; unresolved callers are dropped rather than guessed
            let Some(caller_type) = registry.get(caller.as_str()).copied() else {
                tracing::debug!(table = name, caller = %caller, "dropping usage from caller of unknown type");
                continue;
            };
            for record in records {
                let unique: BTreeSet<&String> = record.cols.iter().collect();
                for col in unique {
                    if col == "*" {
                        continue;
                    }
                    let col = col.trim().to_string();
                    if seen.insert((col.clone(), record.op, caller.clone())) {
                        columns.push(ColumnUsage {
                            name: col,
                            usage: record.op,
                            caller: caller.clone(),
                            caller_type,
                        });
                    }
                }
            }
        }
    }
    columns.sort_by(|a, b| (&a.name, &a.caller).cmp(&(&b.name, &b.caller)));

    LineageEntry::Table { called_by, columns }
}
