//! Typed model for the two input documents
//!
//! Both documents are produced by an upstream parsing stage and arrive as
//! opaque JSON. The model is deliberately lenient: every statement field is
//! optional, unknown fields are ignored, and shape-variable fields
//! (`where`, `condition`, `value`, `from`) stay as raw [`Value`]s so that
//! heterogeneous or incomplete ASTs never abort a run. Shape guarantees for
//! the fields the analyzer does rely on come from the JSON Schema gate that
//! runs before deserialization.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnalyzeError, DocumentKind};

/// The three object categories the inputs are keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectCategory {
    Procedures,
    Functions,
    Triggers,
}

impl ObjectCategory {
    pub const ALL: [ObjectCategory; 3] = [
        ObjectCategory::Procedures,
        ObjectCategory::Functions,
        ObjectCategory::Triggers,
    ];

    /// Key of this category in the index and AST documents
    pub fn key(&self) -> &'static str {
        match self {
            ObjectCategory::Procedures => "procedures",
            ObjectCategory::Functions => "functions",
            ObjectCategory::Triggers => "triggers",
        }
    }

    /// The object type declared objects of this category default to
    pub fn object_type(&self) -> ObjectType {
        match self {
            ObjectCategory::Procedures => ObjectType::Procedure,
            ObjectCategory::Functions => ObjectType::Function,
            ObjectCategory::Triggers => ObjectType::Trigger,
        }
    }
}

/// Kind of a database object in the lineage graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Table,
    Procedure,
    Function,
    Trigger,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Table => "table",
            ObjectType::Procedure => "procedure",
            ObjectType::Function => "function",
            ObjectType::Trigger => "trigger",
        }
    }
}

/// The index document: shallow per-object metadata, ground truth for
/// object existence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexDocument {
    pub procedures: IndexMap<String, ObjectMeta>,
    pub functions: IndexMap<String, ObjectMeta>,
    pub triggers: IndexMap<String, ObjectMeta>,
}

impl IndexDocument {
    pub fn from_value(value: &Value) -> Result<Self, AnalyzeError> {
        Self::deserialize(value).map_err(|e| AnalyzeError::Document {
            document: DocumentKind::Index,
            message: e.to_string(),
        })
    }

    pub fn category(&self, category: ObjectCategory) -> &IndexMap<String, ObjectMeta> {
        match category {
            ObjectCategory::Procedures => &self.procedures,
            ObjectCategory::Functions => &self.functions,
            ObjectCategory::Triggers => &self.triggers,
        }
    }
}

/// Declared metadata for one object in the index
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectMeta {
    pub params: Vec<ParamDecl>,
    pub tables: Vec<String>,
    pub calls: Vec<String>,
    /// Triggers only: the table the trigger is attached to
    pub on_table: Option<String>,
    /// Triggers only: the firing event (INSERT, UPDATE, DELETE)
    pub event: Option<String>,
}

/// A declared parameter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParamDecl {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub data_type: Option<String>,
}

/// The AST document: per-category ordered object definitions
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AstDocument {
    pub procedures: Vec<ObjectDef>,
    pub functions: Vec<ObjectDef>,
    pub triggers: Vec<ObjectDef>,
}

impl AstDocument {
    pub fn from_value(value: &Value) -> Result<Self, AnalyzeError> {
        Self::deserialize(value).map_err(|e| AnalyzeError::Document {
            document: DocumentKind::Ast,
            message: e.to_string(),
        })
    }

    pub fn category(&self, category: ObjectCategory) -> &[ObjectDef] {
        match category {
            ObjectCategory::Procedures => &self.procedures,
            ObjectCategory::Functions => &self.functions,
            ObjectCategory::Triggers => &self.triggers,
        }
    }
}

/// One object definition in the AST
///
/// The upstream parser keys the name by category (`proc_name`, `func_name`,
/// `trigger_name`); the aliases fold them into one field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ObjectDef {
    #[serde(alias = "proc_name", alias = "func_name", alias = "trigger_name")]
    pub name: Option<String>,
    pub statements: Vec<Statement>,
}

/// A statement node: a tagged variant keyed by the `type` string
///
/// All fields beyond the tag are type-specific and optional; the processor
/// treats unmatched fields as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Statement {
    #[serde(rename = "type")]
    pub kind: String,
    /// EXECUTE_PROCEDURE: the callee
    pub name: Option<String>,
    /// INSERT/UPDATE/DELETE: the target table
    pub table: Option<String>,
    /// SELECT: the source, a table name string or a structured join tree
    pub from: Option<Value>,
    /// SELECT: projected column expressions; INSERT: explicit column list
    pub columns: Option<Vec<String>>,
    /// UPDATE: assignment targets to value expressions
    pub set: Option<IndexMap<String, Value>>,
    #[serde(rename = "where")]
    pub where_clause: Option<Value>,
    /// SET statement: the assigned expression
    pub value: Option<Value>,
    /// Control-flow nodes: the branch/loop condition expression
    pub condition: Option<Value>,
    pub cte_list: Vec<Cte>,
    pub main_query: Option<Box<Statement>>,
    /// SELECT_INTO: the inner query
    pub query: Option<Box<Statement>>,
    /// DECLARE_CURSOR and INSERT..SELECT: the nested select
    pub select_statement: Option<Box<Statement>>,
    #[serde(rename = "then")]
    pub then_branch: Option<Vec<Statement>>,
    #[serde(rename = "else")]
    pub else_branch: Option<Vec<Statement>>,
    pub body: Option<Vec<Statement>>,
}

impl Statement {
    /// The FROM table when it is a plain name; structured join trees are
    /// out of reach of the heuristics and yield `None`
    pub fn from_table(&self) -> Option<&str> {
        self.from.as_ref().and_then(Value::as_str)
    }
}

/// One common table expression inside a WITH_CTE statement
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Cte {
    pub name: Option<String>,
    pub query: Option<Box<Statement>>,
}

/// Recursively harvest every string value from a nested AST node.
///
/// WHERE clauses arrive in whatever nesting the upstream parser produced;
/// the column heuristics only need the raw SQL text fragments inside.
pub fn collect_strings(node: &Value, out: &mut Vec<String>) {
    match node {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        Value::Object(map) => {
            for value in map.values() {
                collect_strings(value, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_statement_deserializes_tagged_fields() {
        let stmt = Statement::deserialize(&json!({
            "type": "UPDATE",
            "table": "Orders",
            "set": {"status": "'shipped'"},
            "where": {"op": "=", "left": "order_id", "right": "@id"}
        }))
        .unwrap();
        assert_eq!(stmt.kind, "UPDATE");
        assert_eq!(stmt.table.as_deref(), Some("Orders"));
        assert!(stmt.set.unwrap().contains_key("status"));
    }

    #[test]
    fn test_statement_tolerates_unknown_type_and_fields() {
        let stmt = Statement::deserialize(&json!({
            "type": "MERGE",
            "unheard_of_field": {"deeply": ["nested", 1]}
        }))
        .unwrap();
        assert_eq!(stmt.kind, "MERGE");
        assert!(stmt.table.is_none());
    }

    #[test]
    fn test_else_branch_rename() {
        let stmt = Statement::deserialize(&json!({
            "type": "IF",
            "condition": "x > 1",
            "then": [{"type": "SET", "value": "1"}],
            "else": [{"type": "SET", "value": "2"}]
        }))
        .unwrap();
        assert_eq!(stmt.then_branch.unwrap().len(), 1);
        assert_eq!(stmt.else_branch.unwrap().len(), 1);
    }

    #[test]
    fn test_object_def_name_aliases() {
        let def = ObjectDef::deserialize(&json!({
            "proc_name": "UpdateInventory",
            "statements": []
        }))
        .unwrap();
        assert_eq!(def.name.as_deref(), Some("UpdateInventory"));

        let def = ObjectDef::deserialize(&json!({
            "trigger_name": "trg_audit",
            "statements": []
        }))
        .unwrap();
        assert_eq!(def.name.as_deref(), Some("trg_audit"));
    }

    #[test]
    fn test_collect_strings_walks_nesting() {
        let mut out = Vec::new();
        collect_strings(
            &json!({"op": "AND", "left": "a = 1", "right": {"op": "=", "left": "b", "right": ["c", 2]}}),
            &mut out,
        );
        out.sort();
        assert_eq!(out, vec!["=", "AND", "a = 1", "b", "c"]);
    }
}
