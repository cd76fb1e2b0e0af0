use std::collections::HashMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Semantic type of a column. `Unknown` only describes a column without rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    Float,
    Boolean,
    Text,
    Unknown,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Text => "text",
            DataType::Unknown => "unknown",
        }
    }

    /// Value given to a column that a new row does not mention.
    pub fn default_value(&self) -> Value {
        match self {
            DataType::Integer => Value::Integer(0),
            DataType::Float => Value::Float(0.0),
            DataType::Boolean => Value::Boolean(false),
            DataType::Text => Value::Text(String::new()),
            DataType::Unknown => Value::Missing,
        }
    }

    /// Combine two observed types. `Unknown` is the identity.
    pub fn merge(self, other: DataType) -> DataType {
        match (self, other) {
            (DataType::Unknown, other) | (other, DataType::Unknown) => other,
            (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => {
                DataType::Float
            }
            (a, b) if a == b => a,
            _ => DataType::Text,
        }
    }

    /// Merged type of a column's values. Columns that hold only missing
    /// values settle on `Text`.
    pub fn infer_from<'a>(values: impl IntoIterator<Item = &'a Value>) -> DataType {
        let merged = values
            .into_iter()
            .fold(DataType::Unknown, |acc, v| acc.merge(v.data_type()));
        if merged == DataType::Unknown {
            DataType::Text
        } else {
            merged
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Missing,
}

impl Value {
    /// Type carried by the value; `Missing` carries none.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Boolean(_) => DataType::Boolean,
            Value::Text(_) => DataType::Text,
            Value::Missing => DataType::Unknown,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// String form used for matching. Missing stringifies to nothing.
    pub fn to_text(&self) -> String {
        match self {
            Value::Missing => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            // keep a fractional part so the text casts back to a float
            Value::Float(fl) if fl.is_finite() && fl.fract() == 0.0 && fl.abs() < 1e16 => {
                write!(f, "{:.1}", fl)
            }
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => write!(f, "<NA>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(f) => serializer.serialize_str(&f.to_string()),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Missing => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub columns: Vec<Column>,
    column_index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        Self {
            columns,
            column_index,
        }
    }

    /// Column names are case-sensitive.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_index.get(name).copied()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn push(&mut self, column: Column) -> usize {
        let index = self.columns.len();
        self.column_index.insert(column.name.clone(), index);
        self.columns.push(column);
        index
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// The single dataset the engine works on: an ordered column list plus rows
/// aligned to it.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_rows(schema: Schema, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    pub fn add_row(&mut self, row: Row) {
        debug_assert_eq!(row.values.len(), self.column_count());
        self.rows.push(row);
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.schema.column_count()
    }

    /// True for the zero-column, zero-row state.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.schema.columns.is_empty()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.schema.column_index(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.get_column_index(name).map(|i| &self.schema.columns[i])
    }

    pub fn dtype_of(&self, name: &str) -> Option<DataType> {
        self.column(name).map(|c| c.data_type)
    }

    pub fn set_dtype(&mut self, index: usize, data_type: DataType) {
        if let Some(column) = self.schema.columns.get_mut(index) {
            column.data_type = data_type;
        }
    }

    /// Append a column, filling every existing row with Missing. Returns the
    /// index of the column; an existing column of that name is left as is.
    pub fn add_column(&mut self, name: &str, data_type: DataType) -> usize {
        if let Some(index) = self.get_column_index(name) {
            return index;
        }
        for row in &mut self.rows {
            row.values.push(Value::Missing);
        }
        self.schema.push(Column::new(name, data_type))
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Give every `Unknown` column that now has rows the type of its values.
    pub fn settle_dtypes(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        for index in 0..self.column_count() {
            if self.schema.columns[index].data_type == DataType::Unknown {
                let inferred = DataType::infer_from(self.column_values(index));
                self.set_dtype(index, inferred);
            }
        }
    }

    /// Rows selected by `mask`, in order, under the same schema.
    pub fn filter(&self, mask: &[bool]) -> Table {
        let rows = self
            .rows
            .iter()
            .zip(mask)
            .filter(|(_, keep)| **keep)
            .map(|(row, _)| row.clone())
            .collect();
        Table::with_rows(self.schema.clone(), rows)
    }

    /// Drop the rows selected by `mask`, preserving the order of the rest.
    /// Returns the number of rows removed.
    pub fn remove_rows(&mut self, mask: &[bool]) -> usize {
        let before = self.rows.len();
        let mut flags = mask.iter();
        self.rows
            .retain(|_| !flags.next().copied().unwrap_or(false));
        before - self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Rows<'a>(&'a [Row]);

        impl Serialize for Rows<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
                for row in self.0 {
                    seq.serialize_element(&row.values)?;
                }
                seq.end()
            }
        }

        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("columns", &self.schema.columns)?;
        map.serialize_entry("rows", &Rows(&self.rows))?;
        map.serialize_entry("row_count", &self.rows.len())?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::Text),
        ]);
        let mut table = Table::new(schema);
        table.add_row(Row::new(vec![Value::Integer(1), Value::Text("one".to_string())]));
        table.add_row(Row::new(vec![Value::Integer(2), Value::Text("two".to_string())]));
        table.add_row(Row::new(vec![Value::Integer(3), Value::Text("three".to_string())]));
        table
    }

    #[test]
    fn test_schema_column_index() {
        let schema = Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("name", DataType::Text),
        ]);
        assert_eq!(schema.column_index("id"), Some(0));
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("ID"), None);
        assert_eq!(schema.column_index("unknown"), None);
    }

    #[test]
    fn test_add_column_backfills_missing() {
        let mut table = people();
        let index = table.add_column("score", DataType::Float);

        assert_eq!(index, 2);
        assert_eq!(table.column_count(), 3);
        assert!(table.rows.iter().all(|r| r.values[2].is_missing()));
        assert_eq!(table.dtype_of("score"), Some(DataType::Float));
    }

    #[test]
    fn test_add_existing_column_is_noop() {
        let mut table = people();
        assert_eq!(table.add_column("name", DataType::Integer), 1);
        assert_eq!(table.dtype_of("name"), Some(DataType::Text));
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_remove_rows_keeps_order() {
        let mut table = people();
        let removed = table.remove_rows(&[false, true, false]);

        assert_eq!(removed, 1);
        assert_eq!(table.rows[0].values[0], Value::Integer(1));
        assert_eq!(table.rows[1].values[0], Value::Integer(3));
    }

    #[test]
    fn test_filter() {
        let table = people();
        let result = table.filter(&[true, false, true]);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.column_count(), 2);
    }

    #[test]
    fn test_type_merge() {
        assert_eq!(DataType::Integer.merge(DataType::Float), DataType::Float);
        assert_eq!(DataType::Unknown.merge(DataType::Boolean), DataType::Boolean);
        assert_eq!(DataType::Integer.merge(DataType::Text), DataType::Text);
        assert_eq!(DataType::Boolean.merge(DataType::Integer), DataType::Text);
    }

    #[test]
    fn test_settle_dtypes() {
        let schema = Schema::new(vec![
            Column::new("a", DataType::Unknown),
            Column::new("b", DataType::Unknown),
        ]);
        let mut table = Table::new(schema);
        table.add_row(Row::new(vec![Value::Integer(1), Value::Missing]));
        table.add_row(Row::new(vec![Value::Float(2.5), Value::Missing]));
        table.settle_dtypes();

        assert_eq!(table.dtype_of("a"), Some(DataType::Float));
        assert_eq!(table.dtype_of("b"), Some(DataType::Text));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float(5.0).to_string(), "5.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Missing.to_string(), "<NA>");
        assert_eq!(Value::Missing.to_text(), "");
    }

    #[test]
    fn test_serialize_table() {
        let table = people();
        let json = serde_json::to_value(&table).unwrap();

        assert_eq!(json["row_count"], 3);
        assert_eq!(json["columns"][0]["name"], "id");
        assert_eq!(json["columns"][0]["data_type"], "integer");
        assert_eq!(json["rows"][1][1], "two");
    }
}
