//! Output formatting

use sqlvein_core::{AnalyzeError, Lineage, LineageEntry, ObjectType};

use crate::args::OutputFormat;

/// Formatter for gate failures and run summaries
pub struct ReportFormatter {
    format: OutputFormat,
}

impl ReportFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a schema-validation or consistency failure in the configured
    /// format
    pub fn print_failure(&self, error: &AnalyzeError) {
        match self.format {
            OutputFormat::Human => self.print_human(error),
            OutputFormat::Json => self.print_json(error),
        }
    }

    fn print_human(&self, error: &AnalyzeError) {
        match error {
            AnalyzeError::Schema {
                document,
                violations,
            } => {
                eprintln!(
                    "\x1b[31merror\x1b[0m: {} document failed schema validation",
                    document
                );
                for violation in violations {
                    eprintln!("  {}", violation);
                }
            }
            AnalyzeError::Consistency(report) => {
                eprintln!("\x1b[31merror\x1b[0m: index and AST disagree on declared object names");
                for mismatch in &report.mismatches {
                    for name in &mismatch.missing_in_ast {
                        eprintln!(
                            "  {}: '{}' declared in the index but missing from the AST",
                            mismatch.category, name
                        );
                    }
                    for name in &mismatch.missing_in_index {
                        eprintln!(
                            "  {}: '{}' present in the AST but missing from the index",
                            mismatch.category, name
                        );
                    }
                }
            }
            other => eprintln!("\x1b[31merror\x1b[0m: {}", other),
        }
    }

    fn print_json(&self, error: &AnalyzeError) {
        let output = match error {
            AnalyzeError::Schema {
                document,
                violations,
            } => serde_json::json!({
                "error": "schema",
                "document": document,
                "violations": violations,
            }),
            AnalyzeError::Consistency(report) => serde_json::json!({
                "error": "consistency",
                "mismatches": report.mismatches,
            }),
            other => serde_json::json!({
                "error": "other",
                "message": other.to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
    }
}

/// Print per-type object counts and edge totals for a lineage document
pub fn print_summary(lineage: &Lineage) {
    let mut tables = 0usize;
    let mut procedures = 0usize;
    let mut functions = 0usize;
    let mut triggers = 0usize;
    let mut call_edges = 0usize;
    let mut column_usages = 0usize;

    for entry in lineage.entries().values() {
        match entry {
            LineageEntry::Table { columns, .. } => {
                tables += 1;
                column_usages += columns.len();
            }
            LineageEntry::Procedure { calls, .. } => {
                procedures += 1;
                call_edges += calls.len();
            }
            LineageEntry::Function { calls, .. } => {
                functions += 1;
                call_edges += calls.len();
            }
            LineageEntry::Trigger { calls, .. } => {
                triggers += 1;
                call_edges += calls.len();
            }
        }
    }

    eprintln!("Lineage summary:");
    eprintln!("  tables:        {}", tables);
    eprintln!("  procedures:    {}", procedures);
    eprintln!("  functions:     {}", functions);
    eprintln!("  triggers:      {}", triggers);
    eprintln!("  call edges:    {}", call_edges);
    eprintln!("  column usages: {}", column_usages);
}

/// Print the objects of one type with their outgoing edges
pub fn print_objects(lineage: &Lineage, object_type: ObjectType) {
    for (name, entry) in lineage.entries() {
        if entry.object_type() != object_type {
            continue;
        }
        match entry {
            LineageEntry::Table { called_by, .. } => {
                println!("  {} (used by {} object(s))", name, called_by.len());
            }
            LineageEntry::Procedure { calls, .. } | LineageEntry::Function { calls, .. } => {
                println!("  {} (calls {} object(s))", name, calls.len());
            }
            LineageEntry::Trigger {
                on_table, event, ..
            } => {
                println!(
                    "  {} (on {}, event {})",
                    name,
                    on_table.as_deref().unwrap_or("?"),
                    event.as_deref().unwrap_or("?")
                );
            }
        }
    }
}
