use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use super::coerce::{cast_to, infer_type, is_missing_token, is_nan_text};
use super::table::{Column, DataType, Row, Schema, Table, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("Empty CSV file")]
    EmptyFile,
}

/// One parsed field. Quoting is remembered so that `""` stays an empty
/// string while a bare empty field reads as missing.
#[derive(Debug, Clone, PartialEq)]
struct Field {
    text: String,
    quoted: bool,
}

impl Field {
    fn is_missing(&self) -> bool {
        !self.quoted && (is_missing_token(&self.text) || is_nan_text(&self.text))
    }
}

pub struct CsvReader {
    delimiter: char,
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvReader {
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn read_file(&self, path: &Path) -> Result<Table, CsvError> {
        let content = fs::read_to_string(path)?;
        self.read_str(&content)
    }

    pub fn read_str(&self, content: &str) -> Result<Table, CsvError> {
        let mut records = self.parse_records(content)?.into_iter();

        let (_, header) = records.next().ok_or(CsvError::EmptyFile)?;
        let headers: Vec<String> = header.into_iter().map(|f| f.text).collect();

        let mut seen = HashSet::new();
        for name in &headers {
            if !seen.insert(name.as_str()) {
                return Err(CsvError::DuplicateColumn(name.clone()));
            }
        }

        let mut raw_rows: Vec<Vec<Field>> = Vec::new();
        for (line, mut fields) in records {
            if fields.len() > headers.len() {
                return Err(CsvError::Parse {
                    line,
                    message: format!(
                        "expected {} fields, found {}",
                        headers.len(),
                        fields.len()
                    ),
                });
            }
            fields.resize(
                headers.len(),
                Field {
                    text: String::new(),
                    quoted: false,
                },
            );
            raw_rows.push(fields);
        }

        let types = self.infer_types(&raw_rows, headers.len());

        let columns: Vec<Column> = headers
            .iter()
            .zip(types.iter())
            .map(|(name, dtype)| Column::new(name.clone(), *dtype))
            .collect();
        let schema = Schema::new(columns);

        let rows: Vec<Row> = raw_rows
            .iter()
            .map(|raw_row| {
                let values: Vec<Value> = raw_row
                    .iter()
                    .zip(types.iter())
                    .map(|(field, dtype)| self.parse_value(field, *dtype))
                    .collect();
                Row::new(values)
            })
            .collect();

        Ok(Table::with_rows(schema, rows))
    }

    /// Split the whole document into records, keeping the line each record
    /// starts on. Quoted fields may span lines.
    fn parse_records(&self, content: &str) -> Result<Vec<(usize, Vec<Field>)>, CsvError> {
        let mut records = Vec::new();
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut in_quotes = false;
        let mut line = 1;
        let mut record_line = 1;
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if in_quotes {
                if c == '"' {
                    // Check for escaped quote
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    if c == '\n' {
                        line += 1;
                    }
                    current.push(c);
                }
            } else if c == '"' {
                in_quotes = true;
                quoted = true;
                current.clear();
            } else if c == self.delimiter {
                fields.push(Self::finish_field(&mut current, &mut quoted));
            } else if c == '\n' || c == '\r' {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                fields.push(Self::finish_field(&mut current, &mut quoted));
                if !(fields.len() == 1 && fields[0].text.is_empty() && !fields[0].quoted) {
                    records.push((record_line, std::mem::take(&mut fields)));
                } else {
                    fields.clear();
                }
                line += 1;
                record_line = line;
            } else if !quoted {
                current.push(c);
            }
        }

        if in_quotes {
            return Err(CsvError::Parse {
                line: record_line,
                message: "Unclosed quote".to_string(),
            });
        }

        if !current.is_empty() || quoted || !fields.is_empty() {
            fields.push(Self::finish_field(&mut current, &mut quoted));
            records.push((record_line, fields));
        }

        Ok(records)
    }

    fn finish_field(current: &mut String, quoted: &mut bool) -> Field {
        let text = std::mem::take(current);
        let field = if *quoted {
            Field { text, quoted: true }
        } else {
            Field {
                text: text.trim().to_string(),
                quoted: false,
            }
        };
        *quoted = false;
        field
    }

    fn infer_types(&self, rows: &[Vec<Field>], num_columns: usize) -> Vec<DataType> {
        let mut types = vec![DataType::Unknown; num_columns];

        for row in rows {
            for (i, field) in row.iter().enumerate().take(num_columns) {
                if !field.is_missing() {
                    types[i] = types[i].merge(infer_type(&field.text).data_type());
                }
            }
        }

        // Columns that have rows but no values settle on text; columns
        // without rows stay unknown.
        if !rows.is_empty() {
            for dtype in &mut types {
                if *dtype == DataType::Unknown {
                    *dtype = DataType::Text;
                }
            }
        }

        types
    }

    fn parse_value(&self, field: &Field, dtype: DataType) -> Value {
        if field.is_missing() {
            return Value::Missing;
        }
        if field.quoted && dtype == DataType::Text {
            return Value::Text(field.text.clone());
        }
        match cast_to(&field.text, dtype) {
            Value::Missing => Value::Text(field.text.clone()),
            value => value,
        }
    }
}

/// Serializes a table back into the form `CsvReader` reads.
pub struct CsvWriter {
    delimiter: char,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// The empty table is written as an empty document.
    pub fn write<W: Write>(&self, table: &Table, mut out: W) -> io::Result<()> {
        if table.column_count() == 0 {
            return Ok(());
        }

        let header: Vec<String> = table
            .schema
            .columns
            .iter()
            .map(|c| self.escape_text(&c.name))
            .collect();
        writeln!(out, "{}", header.join(&self.delimiter.to_string()))?;

        for row in &table.rows {
            let fields: Vec<String> = row.values.iter().map(|v| self.format_value(v)).collect();
            let line = fields.join(&self.delimiter.to_string());
            // a blank line would be skipped on read
            if line.is_empty() {
                writeln!(out, "NA")?;
            } else {
                writeln!(out, "{}", line)?;
            }
        }
        out.flush()
    }

    pub fn to_string(&self, table: &Table) -> String {
        let mut buf = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write(table, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Missing => String::new(),
            Value::Text(s) => self.escape_text(s),
            other => other.to_string(),
        }
    }

    fn escape_text(&self, s: &str) -> String {
        let needs_quotes = is_missing_token(s)
            || is_nan_text(s)
            || s.contains(self.delimiter)
            || s.contains('"')
            || s.contains('\n')
            || s.contains('\r')
            || s.trim() != s;
        if needs_quotes {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let csv_data = "id,name,age\n1,Alice,30\n2,Bob,25";
        let table = CsvReader::new().read_str(csv_data).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn test_quoted_fields() {
        let csv_data = "name,description\n\"John Doe\",\"A \"\"quoted\"\" value\"";
        let table = CsvReader::new().read_str(csv_data).unwrap();

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows[0].values[0], Value::Text("John Doe".to_string()));
        assert_eq!(
            table.rows[0].values[1],
            Value::Text("A \"quoted\" value".to_string())
        );
    }

    #[test]
    fn test_type_inference() {
        let csv_data = "int_col,float_col,bool_col,str_col\n1,1.5,true,hello\n2,2,False,world";
        let table = CsvReader::new().read_str(csv_data).unwrap();

        assert_eq!(table.schema.columns[0].data_type, DataType::Integer);
        assert_eq!(table.schema.columns[1].data_type, DataType::Float);
        assert_eq!(table.schema.columns[2].data_type, DataType::Boolean);
        assert_eq!(table.schema.columns[3].data_type, DataType::Text);
        assert_eq!(table.rows[1].values[1], Value::Float(2.0));
    }

    #[test]
    fn test_missing_handling() {
        let csv_data = "a,b\n1,\n,2\nnan,NA\n4,\"\"";
        let table = CsvReader::new().read_str(csv_data).unwrap();

        assert!(table.rows[0].values[1].is_missing());
        assert!(table.rows[1].values[0].is_missing());
        assert!(table.rows[2].values[0].is_missing());
        assert!(table.rows[2].values[1].is_missing());
        assert_eq!(table.schema.columns[0].data_type, DataType::Integer);
        // the quoted empty string is a value, which makes b a text column
        assert_eq!(table.schema.columns[1].data_type, DataType::Text);
        assert_eq!(table.rows[3].values[1], Value::Text(String::new()));
    }

    #[test]
    fn test_signed_nan_reads_as_missing() {
        let table = CsvReader::new().read_str("x,note\n1.5,a\n-nan,\"-nan\"").unwrap();

        assert_eq!(table.dtype_of("x"), Some(DataType::Float));
        assert!(table.rows[1].values[0].is_missing());
        assert_eq!(table.rows[1].values[1], Value::Text("-nan".to_string()));

        let text = CsvWriter::new().to_string(&table);
        assert!(text.ends_with("\n,\"-nan\"\n"));
    }

    #[test]
    fn test_header_only_has_unknown_columns() {
        let table = CsvReader::new().read_str("a,b\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.dtype_of("a"), Some(DataType::Unknown));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            CsvReader::new().read_str("").unwrap_err(),
            CsvError::EmptyFile
        ));
        assert!(matches!(
            CsvReader::new().read_str("\n\n").unwrap_err(),
            CsvError::EmptyFile
        ));
    }

    #[test]
    fn test_custom_delimiter() {
        let csv_data = "a;b;c\n1;2;3";
        let table = CsvReader::new().with_delimiter(';').read_str(csv_data).unwrap();

        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn test_unclosed_quote() {
        let err = CsvReader::new().read_str("a\n\"open").unwrap_err();
        assert!(matches!(err, CsvError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_too_many_fields() {
        let err = CsvReader::new().read_str("a,b\n1,2,3").unwrap_err();
        assert!(matches!(err, CsvError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_duplicate_header() {
        let err = CsvReader::new().read_str("a,a\n1,2").unwrap_err();
        assert!(matches!(err, CsvError::DuplicateColumn(ref c) if c == "a"));
    }

    #[test]
    fn test_write_then_read_preserves_cells() {
        let schema = Schema::new(vec![
            Column::new("name", DataType::Text),
            Column::new("score", DataType::Float),
        ]);
        let table = Table::with_rows(
            schema,
            vec![
                Row::new(vec![Value::Text("Lee, Ann".to_string()), Value::Float(1.0)]),
                Row::new(vec![Value::Text(String::new()), Value::Missing]),
                Row::new(vec![Value::Text("NA".to_string()), Value::Float(2.5)]),
                Row::new(vec![Value::Missing, Value::Float(-4.0)]),
                Row::new(vec![Value::Text("two\nlines".to_string()), Value::Float(0.5)]),
            ],
        );

        let text = CsvWriter::new().to_string(&table);
        let back = CsvReader::new().read_str(&text).unwrap();

        assert_eq!(back.dtype_of("name"), Some(DataType::Text));
        assert_eq!(back.dtype_of("score"), Some(DataType::Float));
        assert_eq!(back.rows, table.rows);
    }

    #[test]
    fn test_single_column_missing_survives() {
        let schema = Schema::new(vec![Column::new("n", DataType::Integer)]);
        let table = Table::with_rows(
            schema,
            vec![Row::new(vec![Value::Integer(1)]), Row::new(vec![Value::Missing])],
        );

        let back = CsvReader::new()
            .read_str(&CsvWriter::new().to_string(&table))
            .unwrap();
        assert_eq!(back.row_count(), 2);
        assert!(back.rows[1].values[0].is_missing());
    }

    #[test]
    fn test_write_empty_table() {
        assert_eq!(CsvWriter::new().to_string(&Table::empty()), "");
    }
}
