pub mod table;
pub mod coerce;
pub mod csv;
pub mod store;

pub use table::{Table, DataType, Value, Schema, Column, Row};
pub use csv::{CsvReader, CsvWriter};
pub use store::{CsvStore, MemoryStore, StoreError, TableStore};
