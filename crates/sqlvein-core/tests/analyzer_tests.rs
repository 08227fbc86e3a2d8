// Integration tests for the lineage analyzer
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use sqlvein_core::lineage::{ColumnUsage, Lineage, LineageEntry, UsageKind};
use sqlvein_core::{analyze, ObjectType, SqlFlavor};

/// Index document declaring procedures (and nothing else)
fn proc_index(names: &[&str]) -> Value {
    let mut procedures = serde_json::Map::new();
    for name in names {
        procedures.insert(
            name.to_string(),
            json!({"params": [], "tables": [], "calls": []}),
        );
    }
    json!({"procedures": procedures, "functions": {}, "triggers": {}})
}

/// AST document with one procedure per (name, statements) pair
fn proc_ast(defs: &[(&str, Value)]) -> Value {
    let procedures: Vec<Value> = defs
        .iter()
        .map(|(name, statements)| json!({"proc_name": name, "statements": statements}))
        .collect();
    json!({"procedures": procedures, "functions": [], "triggers": []})
}

fn run(index: &Value, ast: &Value) -> Lineage {
    analyze(index, ast, SqlFlavor::Tsql).expect("analysis should succeed")
}

fn table_entry<'a>(lineage: &'a Lineage, name: &str) -> (&'a [String], &'a [ColumnUsage]) {
    match lineage.get(name) {
        Some(LineageEntry::Table { called_by, columns }) => (called_by, columns),
        other => panic!("expected table entry for {}, got {:?}", name, other),
    }
}

fn proc_calls<'a>(lineage: &'a Lineage, name: &str) -> &'a [String] {
    match lineage.get(name) {
        Some(LineageEntry::Procedure { calls, .. }) => calls,
        other => panic!("expected procedure entry for {}, got {:?}", name, other),
    }
}

fn column(name: &str, usage: UsageKind, caller: &str) -> ColumnUsage {
    ColumnUsage {
        name: name.to_string(),
        usage,
        caller: caller.to_string(),
        caller_type: ObjectType::Procedure,
    }
}

#[test]
fn test_select_registers_column_reads() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{"type": "SELECT", "from": "T", "columns": ["col1"], "where": "col2 = 1"}]),
    )]);

    let lineage = run(&index, &ast);

    let (called_by, columns) = table_entry(&lineage, "dbo.T");
    assert_eq!(called_by, ["dbo.P"]);
    assert_eq!(
        columns,
        [
            column("col1", UsageKind::Read, "dbo.P"),
            column("col2", UsageKind::Read, "dbo.P"),
        ]
    );
    assert!(proc_calls(&lineage, "dbo.P").is_empty());
}

#[test]
fn test_execute_procedure_creates_call_and_reverse_edge() {
    let index = proc_index(&["P", "Q"]);
    let ast = proc_ast(&[
        ("P", json!([{"type": "EXECUTE_PROCEDURE", "name": "Q"}])),
        ("Q", json!([])),
    ]);

    let lineage = run(&index, &ast);

    assert_eq!(proc_calls(&lineage, "dbo.P"), ["dbo.Q"]);
    match lineage.get("dbo.Q") {
        Some(LineageEntry::Procedure {
            calls,
            called_by_procedure,
            called_by_function,
            called_by_trigger,
        }) => {
            assert!(calls.is_empty());
            assert_eq!(called_by_procedure, &["dbo.P"]);
            assert!(called_by_function.is_empty());
            assert!(called_by_trigger.is_empty());
        }
        other => panic!("expected procedure entry for dbo.Q, got {:?}", other),
    }
}

#[test]
fn test_update_records_write_and_read() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{
            "type": "UPDATE",
            "table": "T",
            "set": {"col1": 5},
            "where": {"op": "=", "left": "col2", "right": "col3"}
        }]),
    )]);

    let lineage = run(&index, &ast);

    let (_, columns) = table_entry(&lineage, "dbo.T");
    assert_eq!(
        columns,
        [
            column("col1", UsageKind::Write, "dbo.P"),
            column("col2", UsageKind::Read, "dbo.P"),
            column("col3", UsageKind::Read, "dbo.P"),
        ]
    );
}

#[test]
fn test_update_without_predicate_is_write_only() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{"type": "UPDATE", "table": "T", "set": {"col1": 5}}]),
    )]);

    let lineage = run(&index, &ast);

    let (_, columns) = table_entry(&lineage, "dbo.T");
    assert_eq!(columns, [column("col1", UsageKind::Write, "dbo.P")]);
}

#[test]
fn test_delete_attributes_predicate_columns_to_the_write() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{"type": "DELETE", "table": "T", "where": "status = 'stale' AND age > @cutoff"}]),
    )]);

    let lineage = run(&index, &ast);

    let (_, columns) = table_entry(&lineage, "dbo.T");
    assert_eq!(
        columns,
        [
            column("age", UsageKind::Write, "dbo.P"),
            column("stale", UsageKind::Write, "dbo.P"),
            column("status", UsageKind::Write, "dbo.P"),
        ]
    );
}

#[test]
fn test_trigger_entry_resolves_metadata_and_calls() {
    let index = json!({
        "procedures": {"P": {"params": [], "tables": [], "calls": []}},
        "functions": {},
        "triggers": {"TR": {"on_table": "T", "event": "INSERT"}}
    });
    let ast = json!({
        "procedures": [{"proc_name": "P", "statements": []}],
        "functions": [],
        "triggers": [{"trigger_name": "TR", "statements": [
            {"type": "EXECUTE_PROCEDURE", "name": "P"}
        ]}]
    });

    let lineage = run(&index, &ast);

    match lineage.get("dbo.TR") {
        Some(LineageEntry::Trigger {
            on_table,
            event,
            calls,
        }) => {
            assert_eq!(on_table.as_deref(), Some("dbo.T"));
            assert_eq!(event.as_deref(), Some("INSERT"));
            assert_eq!(calls, &["dbo.P"]);
        }
        other => panic!("expected trigger entry for dbo.TR, got {:?}", other),
    }
    match lineage.get("dbo.P") {
        Some(LineageEntry::Procedure {
            called_by_trigger, ..
        }) => assert_eq!(called_by_trigger, &["dbo.TR"]),
        other => panic!("expected procedure entry for dbo.P, got {:?}", other),
    }
}

#[test]
fn test_self_calls_are_suppressed() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([
            {"type": "EXECUTE_PROCEDURE", "name": "P"},
            {"type": "SET", "value": "dbo.P(1)"}
        ]),
    )]);

    let lineage = run(&index, &ast);
    assert!(proc_calls(&lineage, "dbo.P").is_empty());
}

#[test]
fn test_function_caller_lands_in_called_by_function() {
    let index = json!({
        "procedures": {"P": {}},
        "functions": {"F": {}},
        "triggers": {}
    });
    let ast = json!({
        "procedures": [{"proc_name": "P", "statements": []}],
        "functions": [{"func_name": "F", "statements": [
            {"type": "EXECUTE_PROCEDURE", "name": "P"}
        ]}],
        "triggers": []
    });

    let lineage = run(&index, &ast);

    match lineage.get("dbo.P") {
        Some(LineageEntry::Procedure {
            called_by_function, ..
        }) => assert_eq!(called_by_function, &["dbo.F"]),
        other => panic!("expected procedure entry for dbo.P, got {:?}", other),
    }
}

#[test]
fn test_cte_names_are_not_tables() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{
            "type": "WITH_CTE",
            "cte_list": [{"name": "recent", "query": {
                "type": "SELECT", "from": "Orders", "columns": ["id"]
            }}],
            "main_query": {"type": "SELECT", "from": "recent", "columns": ["id"]}
        }]),
    )]);

    let lineage = run(&index, &ast);

    assert!(lineage.get("dbo.recent").is_none());
    let (called_by, columns) = table_entry(&lineage, "dbo.Orders");
    assert_eq!(called_by, ["dbo.P"]);
    assert_eq!(columns, [column("id", UsageKind::Read, "dbo.P")]);
}

#[test]
fn test_insert_recurses_into_nested_select() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{
            "type": "INSERT",
            "table": "Archive",
            "select_statement": {"type": "SELECT", "from": "Orders", "columns": ["id"]}
        }]),
    )]);

    let lineage = run(&index, &ast);

    // No explicit column list: the write degrades to "*", which never
    // surfaces as a concrete column entry
    let (called_by, columns) = table_entry(&lineage, "dbo.Archive");
    assert_eq!(called_by, ["dbo.P"]);
    assert!(columns.is_empty());

    let (_, columns) = table_entry(&lineage, "dbo.Orders");
    assert_eq!(columns, [column("id", UsageKind::Read, "dbo.P")]);
}

#[test]
fn test_cursor_select_is_processed() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{
            "type": "DECLARE_CURSOR",
            "name": "order_cursor",
            "select_statement": {"type": "SELECT", "from": "Orders", "columns": ["id", "total"]}
        }]),
    )]);

    let lineage = run(&index, &ast);

    let (_, columns) = table_entry(&lineage, "dbo.Orders");
    assert_eq!(
        columns,
        [
            column("id", UsageKind::Read, "dbo.P"),
            column("total", UsageKind::Read, "dbo.P"),
        ]
    );
}

#[test]
fn test_condition_and_branches_are_walked() {
    let index = proc_index(&["P", "Q"]);
    let ast = proc_ast(&[
        (
            "P",
            json!([{
                "type": "IF",
                "condition": "dbo.fn_check(@id) > 0",
                "then": [{"type": "EXECUTE_PROCEDURE", "name": "Q"}]
            }]),
        ),
        ("Q", json!([])),
    ]);

    let lineage = run(&index, &ast);
    assert_eq!(proc_calls(&lineage, "dbo.P"), ["dbo.Q", "dbo.fn_check"]);
}

#[test]
fn test_embedded_select_in_expression_registers_read() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{"type": "SET", "value": "(SELECT total FROM Balances WHERE id = 1)"}]),
    )]);

    let lineage = run(&index, &ast);

    let (called_by, columns) = table_entry(&lineage, "dbo.Balances");
    assert_eq!(called_by, ["dbo.P"]);
    assert_eq!(columns, [column("total", UsageKind::Read, "dbo.P")]);
}

#[test]
fn test_unrecognized_statement_type_is_skipped() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{"type": "MERGE", "table": "T", "something_else": [1, 2, 3]}]),
    )]);

    let lineage = run(&index, &ast);

    assert!(lineage.get("dbo.T").is_none());
    assert!(proc_calls(&lineage, "dbo.P").is_empty());
}

#[test]
fn test_unresolved_columns_fall_back_to_star() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{"type": "SELECT", "from": "T", "columns": [], "where": "1 = 1"}]),
    )]);

    let lineage = run(&index, &ast);

    // The read is attributed, but "*" never appears as a column entry
    let (called_by, columns) = table_entry(&lineage, "dbo.T");
    assert_eq!(called_by, ["dbo.P"]);
    assert!(columns.is_empty());
}

#[test]
fn test_duplicate_usage_is_deduplicated() {
    let index = proc_index(&["P"]);
    let select = json!({"type": "SELECT", "from": "T", "columns": ["col1"]});
    let ast = proc_ast(&[("P", json!([select.clone(), select]))]);

    let lineage = run(&index, &ast);

    let (_, columns) = table_entry(&lineage, "dbo.T");
    assert_eq!(columns, [column("col1", UsageKind::Read, "dbo.P")]);
}

#[test]
fn test_aliases_are_not_source_columns() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{
            "type": "SELECT",
            "from": "Orders",
            "columns": ["SUM(total) AS order_total"],
            "where": "region = 'EU'"
        }]),
    )]);

    let lineage = run(&index, &ast);

    let (_, columns) = table_entry(&lineage, "dbo.Orders");
    assert_eq!(
        columns,
        [
            column("EU", UsageKind::Read, "dbo.P"),
            column("region", UsageKind::Read, "dbo.P"),
            column("total", UsageKind::Read, "dbo.P"),
        ]
    );
}

#[test]
fn test_output_is_deterministic() {
    let index = proc_index(&["P", "Q"]);
    let ast = proc_ast(&[
        (
            "P",
            json!([
                {"type": "SELECT", "from": "T", "columns": ["col1"], "where": "col2 = 1"},
                {"type": "EXECUTE_PROCEDURE", "name": "Q"}
            ]),
        ),
        ("Q", json!([{"type": "UPDATE", "table": "T", "set": {"col1": 1}}])),
    ]);

    let first = run(&index, &ast).to_pretty_json().unwrap();
    let second = run(&index, &ast).to_pretty_json().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_entries_are_shape_disjoint() {
    let index = proc_index(&["P"]);
    let ast = proc_ast(&[(
        "P",
        json!([{"type": "SELECT", "from": "T", "columns": ["col1"]}]),
    )]);

    let value = run(&index, &ast).to_value().unwrap();

    let table = value.get("dbo.T").unwrap().as_object().unwrap();
    assert!(table.get("calls").is_none());
    assert!(table.get("columns").is_some());

    let proc = value.get("dbo.P").unwrap().as_object().unwrap();
    assert!(proc.get("columns").is_none());
    assert!(proc.get("calls").is_some());
}

#[test]
fn test_qualified_names_are_not_requalified() {
    let index = proc_index(&["audit.P"]);
    let ast = proc_ast(&[(
        "audit.P",
        json!([{"type": "SELECT", "from": "audit.Log", "columns": ["entry"]}]),
    )]);

    let lineage = run(&index, &ast);

    assert!(lineage.get("audit.P").is_some());
    let (called_by, _) = table_entry(&lineage, "audit.Log");
    assert_eq!(called_by, ["audit.P"]);
}
