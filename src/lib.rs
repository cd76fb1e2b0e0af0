pub mod command;
pub mod storage;
pub mod format;
pub mod logging;
pub mod tui;
pub mod cli;

pub use command::{CommandError, CommandResult, Executor, Severity, StructuredCommand};
pub use storage::table::{Table, DataType, Value, Schema, Column};
pub use storage::{CsvStore, MemoryStore, TableStore};
