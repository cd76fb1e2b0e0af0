use std::fs;
use std::path::PathBuf;

use tabletalk::command::{Executor, Severity};
use tabletalk::storage::{CsvStore, DataType, MemoryStore, Table, TableStore, Value};

fn sample_store(dir: &tempfile::TempDir) -> CsvStore {
    let source = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("samples")
        .join("people.csv");
    let target = dir.path().join("people.csv");
    fs::copy(&source, &target).expect("Failed to copy people.csv");
    CsvStore::new(target)
}

fn names(table: &Table) -> Vec<String> {
    let index = table.get_column_index("name").unwrap();
    table.column_values(index).map(|v| v.to_text()).collect()
}

#[test]
fn test_sample_loads_with_types() {
    let dir = tempfile::tempdir().unwrap();
    let table = sample_store(&dir).load().unwrap();

    assert_eq!(table.row_count(), 12);
    assert_eq!(table.dtype_of("id"), Some(DataType::Integer));
    assert_eq!(table.dtype_of("city"), Some(DataType::Text));
    assert_eq!(table.dtype_of("active"), Some(DataType::Boolean));
    assert_eq!(table.dtype_of("score"), Some(DataType::Float));
    assert_eq!(table.rows[3].values[3], Value::Missing);
    assert_eq!(table.rows[9].values[3], Value::Text("New York".to_string()));
}

#[test]
fn test_add_then_search_exact() {
    let executor = Executor::new(MemoryStore::default());
    assert_eq!(
        executor.execute("add name=Tom age=18").severity,
        Severity::Success
    );

    let result = executor.execute("search_exact name=Tom");
    assert_eq!(result.severity, Severity::Info);
    let found = result.table.unwrap();
    assert_eq!(found.row_count(), 1);
    assert_eq!(found.rows[0].values[1], Value::Integer(18));
}

#[test]
fn test_delete_eleven_requires_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let result = executor.execute("delete id=>=2");
    assert_eq!(result.severity, Severity::Warning);
    assert!(result.message.contains("delete 11 rows"));
    assert!(result.message.contains("confirm=yes"));
    assert_eq!(executor.store().load().unwrap().row_count(), 12);

    let result = executor.execute("delete id=>=2 confirm=yes");
    assert_eq!(result.severity, Severity::Success);
    assert_eq!(result.affected_rows, Some(11));
    assert_eq!(names(&executor.store().load().unwrap()), vec!["Tom"]);
}

#[test]
fn test_delete_ten_needs_no_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let result = executor.execute("delete active=true");
    assert_eq!(result.severity, Severity::Success);
    assert_eq!(result.affected_rows, Some(10));
    assert_eq!(names(&executor.store().load().unwrap()), vec!["Bob", "Evan"]);
}

#[test]
fn test_confirmation_hint_can_be_retyped() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let warning = executor.execute("delete age=>25");
    let hint = warning.message.split("E.g., ").nth(1).unwrap().to_string();
    let result = executor.execute(&hint);
    assert_eq!(result.affected_rows, Some(11));
}

#[test]
fn test_add_batch_length_mismatch() {
    let executor = Executor::new(MemoryStore::default());
    let result = executor.execute("add_batch col1=a,b col2=1,2,3");

    assert_eq!(result.severity, Severity::Error);
    assert!(result
        .message
        .contains("Column 'col2' has 3 values, but expected 2."));
    assert!(executor.store().load().unwrap().is_empty());
}

#[test]
fn test_update_new_column_leaves_others_missing() {
    let executor = Executor::new(MemoryStore::default());
    executor.execute("add_batch name=A,B,C");

    let result = executor.execute("update name=B set tier=gold");
    assert_eq!(result.affected_rows, Some(1));

    let table = executor.store().load().unwrap();
    let tier = table.get_column_index("tier").unwrap();
    let cells: Vec<&Value> = table.column_values(tier).collect();
    assert_eq!(
        cells,
        vec![
            &Value::Missing,
            &Value::Text("gold".to_string()),
            &Value::Missing
        ]
    );
}

#[test]
fn test_missing_conditions_match_missing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let result = executor.execute("search_exact city=''");
    assert_eq!(names(&result.table.unwrap()), vec!["Diana"]);

    let result = executor.execute("search_exact score=nan");
    assert_eq!(names(&result.table.unwrap()), vec!["Evan"]);

    let result = executor.execute("search_exact score=!=88.5");
    assert_eq!(result.table.unwrap().row_count(), 10);
}

#[test]
fn test_wildcard_patterns() {
    let executor = Executor::new(MemoryStore::default());
    executor.execute("add_batch name=Tom,Bob,Rome");

    let result = executor.execute("search_exact name=*om*");
    assert_eq!(names(&result.table.unwrap()), vec!["Tom", "Rome"]);
}

#[test]
fn test_search_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let result = executor.execute("search OSLO");
    assert_eq!(names(&result.table.unwrap()), vec!["Bob", "Hana"]);

    let result = executor.execute("search nowhere");
    assert_eq!(result.severity, Severity::Info);
    assert_eq!(result.message, "No rows found containing 'nowhere'.");
    assert!(result.table.is_none());
}

#[test]
fn test_conjunction_of_conditions() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let result = executor.execute("update city=Rome age=>32 set tier=senior");
    assert_eq!(result.affected_rows, Some(3));

    let found = executor.execute("search_exact tier=senior").table.unwrap();
    assert_eq!(names(&found), vec!["Alice", "Fiona", "Lena"]);
}

#[test]
fn test_failed_commands_leave_file_identical() {
    let dir = tempfile::tempdir().unwrap();
    let store = sample_store(&dir);
    let before = fs::read(store.path()).unwrap();
    let executor = Executor::new(&store);

    for line in [
        "update nosuch=1 set age=3",
        "update name=Tom age=3",
        "delete id=>=2",
        "delete_all",
        "add_batch a=1,2 b=1",
        "add name='unterminated",
        "drop everything",
    ] {
        let result = executor.execute(line);
        assert_ne!(result.severity, Severity::Success, "{line}");
    }

    assert_eq!(fs::read(store.path()).unwrap(), before);
}

#[test]
fn test_add_persists_defaults_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let store = sample_store(&dir);
    Executor::new(&store).execute("add name=Zoe city='San Marino'");

    let table = CsvStore::new(store.path()).load().unwrap();
    let zoe = &table.rows[12].values;
    assert_eq!(zoe[0], Value::Integer(0));
    assert_eq!(zoe[1], Value::Text("Zoe".to_string()));
    assert_eq!(zoe[3], Value::Text("San Marino".to_string()));
    assert_eq!(zoe[4], Value::Boolean(false));
    assert_eq!(zoe[5], Value::Float(0.0));
}

#[test]
fn test_lenient_coercion_keeps_stray_text() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let result = executor.execute("add name=Odd age=unknown");
    assert_eq!(result.severity, Severity::Success);

    let table = executor.store().load().unwrap();
    assert_eq!(table.rows[12].values[2], Value::Text("unknown".to_string()));
}

#[test]
fn test_signed_nan_is_stored_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let result = executor.execute("add name=Nia score=-nan ratio=+NaN");
    assert_eq!(result.severity, Severity::Success);
    assert!(!result.message.contains("NaN"));

    let table = executor.store().load().unwrap();
    assert_eq!(table.rows[12].values[5], Value::Missing);
    assert_eq!(table.dtype_of("score"), Some(DataType::Float));
    assert_eq!(table.rows[12].values[6], Value::Missing);

    let found = executor.execute("search_exact score=nan").table.unwrap();
    assert_eq!(names(&found), vec!["Evan", "Nia"]);
}

#[test]
fn test_boolean_column_falls_back_to_text_match() {
    let executor = Executor::new(MemoryStore::default());
    executor.execute("add_batch name=Ann,Bob active=true,false");
    executor.execute("add name=Odd active=Maybe");
    assert_eq!(
        executor.store().load().unwrap().dtype_of("active"),
        Some(DataType::Boolean)
    );

    let result = executor.execute("search_exact active=MAYBE");
    assert_eq!(result.severity, Severity::Info);
    assert_eq!(names(&result.table.unwrap()), vec!["Odd"]);
}

#[test]
fn test_delete_all_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Executor::new(sample_store(&dir));

    let result = executor.execute("delete_all");
    assert_eq!(result.severity, Severity::Warning);
    assert!(result.message.contains("delete all 12 rows"));

    let result = executor.execute("delete_all CONFIRM");
    assert_eq!(result.message, "All data deleted. Original row count: 12");
    assert!(executor.store().load().unwrap().is_empty());

    let result = executor.execute("list");
    assert_eq!(result.severity, Severity::Warning);
}

#[test]
fn test_first_write_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("table.csv");
    let executor = Executor::new(CsvStore::new(&path));

    assert_eq!(executor.execute("columns").severity, Severity::Warning);
    executor.execute("add_batch name=Tom,Ann age=25,30");

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "name,age\nTom,25\nAnn,30\n"
    );
    assert_eq!(
        executor.execute("columns").message,
        "Available columns (2): name (text), age (integer)"
    );
}

#[test]
fn test_result_json_shape() {
    let executor = Executor::new(MemoryStore::default());
    let added = serde_json::to_value(executor.execute("add name=Tom")).unwrap();
    assert_eq!(added["severity"], "success");
    assert_eq!(added["affected_rows"], 1);
    assert!(added.get("table").is_none());

    let listed = serde_json::to_value(executor.execute("list")).unwrap();
    assert_eq!(listed["severity"], "info");
    assert!(listed.get("affected_rows").is_none());
    assert_eq!(listed["table"]["columns"][0]["name"], "name");
    assert_eq!(listed["table"]["rows"][0][0], "Tom");
}

#[test]
fn test_corrupt_file_is_an_error_result() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "name,age\n\"Tom,30\n").unwrap();
    let executor = Executor::new(CsvStore::new(&path));

    let result = executor.execute("list");
    assert_eq!(result.severity, Severity::Error);
    assert!(result.message.contains("bad.csv"));
}
