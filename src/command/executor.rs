use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, field, info, info_span, warn};

use super::ast::{describe_pairs, Assignments, Command, Conditions};
use super::condition::{column_mask, evaluate};
use super::error::{CommandError, Result};
use super::lexer::quote;
use super::parser::{Parser, DELETE_CONFIRM_TOKEN};
use super::translate::{parse_agent_reply, translate, StructuredCommand};
use crate::format::HELP;
use crate::storage::coerce::{cast_to, infer_column_type};
use crate::storage::{DataType, Row, Table, TableStore, Value};

/// Deletes touching more rows than this need `confirm=yes`.
pub const DELETE_CONFIRM_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Outcome of one command, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<Table>,
    /// Operation that produced the result, when the line parsed.
    #[serde(skip)]
    pub command: Option<&'static str>,
}

impl CommandResult {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            affected_rows: None,
            table: None,
            command: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn with_affected_rows(mut self, rows: usize) -> Self {
        self.affected_rows = Some(rows);
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    pub fn from_error(err: &CommandError) -> Self {
        let severity = match err {
            CommandError::ConfirmationRequired { .. } | CommandError::UnknownCommand(_) => {
                Severity::Warning
            }
            _ => Severity::Error,
        };
        Self::new(severity, err.to_string())
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// A result plus whether the table it ran against was changed.
#[derive(Debug)]
pub struct Applied {
    pub result: CommandResult,
    pub mutated: bool,
}

impl Applied {
    fn read(result: CommandResult) -> Self {
        Self {
            result,
            mutated: false,
        }
    }

    fn write(result: CommandResult) -> Self {
        Self {
            result,
            mutated: true,
        }
    }
}

/// Runs command lines against a store: load, apply, save on success.
pub struct Executor<S> {
    store: S,
}

impl<S: TableStore> Executor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute one command line. Errors come back as error or warning
    /// results; nothing is saved unless the command succeeded.
    pub fn execute(&self, line: &str) -> CommandResult {
        let span = info_span!("command", op = field::Empty);
        let _guard = span.enter();

        match self.try_execute(line, &span) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "command failed");
                CommandResult::from_error(&err)
            }
        }
    }

    fn try_execute(&self, line: &str, span: &tracing::Span) -> Result<CommandResult> {
        let parser = Parser::new(line)?;
        debug!(tokens = ?parser.tokens(), "tokenized");
        let command = parser.parse()?;
        span.record("op", command.name());
        self.run(&command)
    }

    /// Apply an already parsed command.
    pub fn run(&self, command: &Command) -> Result<CommandResult> {
        let mut table = match command {
            Command::Help | Command::Clear => Table::empty(),
            _ => self.store.load()?,
        };

        let applied = apply(&mut table, command)?;
        if applied.mutated {
            self.store.save(&table)?;
            info!(
                op = command.name(),
                affected = applied.result.affected_rows.unwrap_or(0),
                "table updated"
            );
        }

        let mut result = applied.result;
        result.command = Some(command.name());
        Ok(result)
    }

    /// Translate a structured command and run it through the same path as a
    /// typed line. Returns the translated line alongside the result.
    pub fn execute_structured(&self, command: &StructuredCommand) -> (Option<String>, CommandResult) {
        match translate(command) {
            Ok(line) => {
                debug!(%line, "translated structured command");
                let result = self.execute(&line);
                (Some(line), result)
            }
            Err(err) => {
                warn!(error = %err, "structured command rejected");
                (None, err.to_result())
            }
        }
    }

    /// Decode a raw agent reply and run it.
    pub fn execute_agent_reply(&self, reply: &str) -> (Option<String>, CommandResult) {
        match parse_agent_reply(reply) {
            Ok(command) => self.execute_structured(&command),
            Err(err) => {
                warn!(error = %err, "agent reply rejected");
                (None, err.to_result())
            }
        }
    }
}

/// Apply `command` to `table` in memory.
pub fn apply(table: &mut Table, command: &Command) -> Result<Applied> {
    match command {
        Command::Help => Ok(Applied::read(CommandResult::info(HELP))),
        Command::Clear => Ok(Applied::read(CommandResult::success("Terminal cleared."))),
        Command::List => Ok(Applied::read(list(table))),
        Command::Columns => Ok(Applied::read(columns(table))),
        Command::Add { values } => Ok(add(table, values)),
        Command::AddBatch { columns, row_count } => Ok(add_batch(table, columns, *row_count)),
        Command::Update {
            conditions,
            assignments,
        } => update(table, conditions, assignments),
        Command::Delete {
            conditions,
            confirmed,
        } => delete(table, conditions, *confirmed),
        Command::DeleteAll { confirmed } => delete_all(table, *confirmed),
        Command::Search { keyword } => Ok(Applied::read(search(table, keyword))),
        Command::SearchExact { column, condition } => {
            search_exact(table, column, condition).map(Applied::read)
        }
    }
}

fn has_no_rows(table: &Table) -> bool {
    table.row_count() == 0
}

fn list(table: &Table) -> CommandResult {
    if has_no_rows(table) {
        return CommandResult::warning("No data available.");
    }
    CommandResult::info(format!("Showing all {} row(s).", table.row_count()))
        .with_table(table.clone())
}

fn columns(table: &Table) -> CommandResult {
    if has_no_rows(table) {
        return CommandResult::warning("No data loaded.");
    }
    let described: Vec<String> = table
        .schema
        .columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.data_type))
        .collect();
    CommandResult::info(format!(
        "Available columns ({}): {}",
        table.column_count(),
        described.join(", ")
    ))
}

fn add(table: &mut Table, values: &Assignments) -> Applied {
    let columns: IndexMap<String, Vec<String>> = values
        .iter()
        .map(|(k, v)| (k.clone(), vec![v.clone()]))
        .collect();
    let start = table.row_count();
    append_rows(table, &columns, 1);

    let row: IndexMap<String, String> = table
        .schema
        .columns
        .iter()
        .zip(&table.rows[start].values)
        .map(|(c, v)| (c.name.clone(), v.to_string()))
        .collect();
    Applied::write(
        CommandResult::success(format!("Row added successfully: {}", describe_pairs(&row)))
            .with_affected_rows(1),
    )
}

fn add_batch(table: &mut Table, columns: &IndexMap<String, Vec<String>>, row_count: usize) -> Applied {
    append_rows(table, columns, row_count);
    Applied::write(
        CommandResult::success(format!("Added {} rows successfully", row_count))
            .with_affected_rows(row_count),
    )
}

/// Append `row_count` rows built from per-column raw values. Columns not
/// mentioned take their type's default; unseen columns are created and typed
/// from the incoming values.
fn append_rows(table: &mut Table, columns: &IndexMap<String, Vec<String>>, row_count: usize) {
    let defaults: Vec<Value> = table
        .schema
        .columns
        .iter()
        .map(|c| c.data_type.default_value())
        .collect();

    let mut supplied: Vec<(usize, DataType, &Vec<String>)> = Vec::with_capacity(columns.len());
    for (name, raw) in columns {
        let incoming = || infer_column_type(raw.iter().map(String::as_str));
        let index = match table.get_column_index(name) {
            Some(index) => {
                if table.schema.columns[index].data_type == DataType::Unknown {
                    table.set_dtype(index, incoming());
                }
                index
            }
            None => {
                let data_type = incoming();
                debug!(column = %name, %data_type, "creating column");
                table.add_column(name, data_type)
            }
        };
        supplied.push((index, table.schema.columns[index].data_type, raw));
    }

    for i in 0..row_count {
        let mut values: Vec<Value> = defaults.clone();
        values.resize(table.column_count(), Value::Missing);
        for (index, data_type, raw) in &supplied {
            if let Some(text) = raw.get(i) {
                values[*index] = cast_to(text, *data_type);
            }
        }
        table.add_row(Row::new(values));
    }
    table.settle_dtypes();
}

fn update(table: &mut Table, conditions: &Conditions, assignments: &Assignments) -> Result<Applied> {
    if has_no_rows(table) {
        return Ok(Applied::read(CommandResult::warning("No data to update.")));
    }

    let mask = evaluate(conditions, table)?;
    let matched = mask.iter().filter(|m| **m).count();
    debug!(matched, "update mask");
    if matched == 0 {
        return Ok(Applied::read(CommandResult::info(
            "No rows found matching conditions for update.",
        )));
    }

    for (name, raw) in assignments {
        let index = match table.get_column_index(name) {
            Some(index) => index,
            None => table.add_column(name, infer_column_type([raw.as_str()])),
        };
        let data_type = table.schema.columns[index].data_type;
        for (row, _) in table.rows.iter_mut().zip(&mask).filter(|(_, m)| **m) {
            row.values[index] = cast_to(raw, data_type);
        }
    }

    Ok(Applied::write(
        CommandResult::success(format!(
            "Updated {} row(s). Conditions: {}, Updates: {}",
            matched,
            describe_pairs(conditions),
            describe_pairs(assignments)
        ))
        .with_affected_rows(matched),
    ))
}

fn delete(table: &mut Table, conditions: &Conditions, confirmed: bool) -> Result<Applied> {
    if has_no_rows(table) {
        return Ok(Applied::read(CommandResult::warning("No data to delete.")));
    }

    let mask = evaluate(conditions, table)?;
    let matched = mask.iter().filter(|m| **m).count();
    debug!(matched, confirmed, "delete mask");
    if matched == 0 {
        return Ok(Applied::read(CommandResult::info(
            "No rows found matching conditions for delete.",
        )));
    }

    if matched > DELETE_CONFIRM_THRESHOLD && !confirmed {
        let retyped: Vec<String> = conditions
            .iter()
            .map(|(k, v)| format!("{}={}", quote(k), quote(v)))
            .collect();
        return Err(CommandError::ConfirmationRequired {
            rows: matched,
            message: format!(
                "This command will delete {} rows. To proceed, add '{}' to your command. E.g., delete {} {}",
                matched,
                DELETE_CONFIRM_TOKEN,
                retyped.join(" "),
                DELETE_CONFIRM_TOKEN
            ),
        });
    }

    let removed = table.remove_rows(&mask);
    Ok(Applied::write(
        CommandResult::success(format!(
            "Deleted {} row(s). Conditions: {}",
            removed,
            describe_pairs(conditions)
        ))
        .with_affected_rows(removed),
    ))
}

fn delete_all(table: &mut Table, confirmed: bool) -> Result<Applied> {
    if has_no_rows(table) {
        return Ok(Applied::read(CommandResult::warning("No data to delete.")));
    }

    let rows = table.row_count();
    if !confirmed {
        return Err(CommandError::ConfirmationRequired {
            rows,
            message: format!(
                "You are about to delete all {} rows. To confirm, type: delete_all confirm",
                rows
            ),
        });
    }

    *table = Table::empty();
    Ok(Applied::write(
        CommandResult::success(format!("All data deleted. Original row count: {}", rows))
            .with_affected_rows(rows),
    ))
}

fn search(table: &Table, keyword: &str) -> CommandResult {
    if has_no_rows(table) {
        return CommandResult::warning("No data to search.");
    }

    let needle = keyword.to_lowercase();
    let mask: Vec<bool> = table
        .iter()
        .map(|row| {
            row.values
                .iter()
                .any(|v| v.to_text().to_lowercase().contains(&needle))
        })
        .collect();
    let found = table.filter(&mask);
    if found.row_count() == 0 {
        return CommandResult::info(format!("No rows found containing '{}'.", keyword));
    }
    CommandResult::info(format!(
        "Found {} row(s) containing '{}'.",
        found.row_count(),
        keyword
    ))
    .with_table(found)
}

fn search_exact(table: &Table, column: &str, condition: &str) -> Result<CommandResult> {
    if has_no_rows(table) {
        return Ok(CommandResult::warning("No data to search."));
    }

    let mask = column_mask(table, column, condition)?;
    let found = table.filter(&mask);
    if found.row_count() == 0 {
        return Ok(CommandResult::info(format!(
            "No rows found where '{}' matches '{}'.",
            column, condition
        )));
    }
    Ok(CommandResult::info(format!(
        "Found {} row(s) where '{}' matches '{}'.",
        found.row_count(),
        column,
        condition
    ))
    .with_table(found))
}
