//! Plain-text rendering of results for the terminal.

use crate::command::CommandResult;
use crate::storage::Table;

/// Tables longer than this are shown as a head and a tail.
pub const PREVIEW_LIMIT: usize = 10;
const PREVIEW_EDGE: usize = 5;

pub const HELP: &str = "Supported commands:
help                                 Show this help
clear                                Clear terminal content
list                                 List all data
columns                              Show column information
add col1=val1 col2=val2 ...          Add a new row
add_batch col1=val1,val2,... col2=val3,val4,...    Add multiple rows at once
update cond1=val1 ... set col_to_update1=new_val1 ...  Update rows based on conditions
delete cond1=val1 cond2=val2 ...     Delete rows based on conditions (add confirm=yes for more than 10 rows)
delete_all                           Delete all data (with confirmation)
search keyword                       Fuzzy search all fields containing the keyword
search_exact col=val                 Exactly search for rows where col equals val

Advanced features:
- For numeric columns, you can use comparison operators: >, <, >=, <=, !=
- For string columns, you can use patterns: 'prefix*', '*suffix', '*contains*'
- Supported special values: nan, na, none, '' (empty string) for missing values";

/// Message followed by the attached rows, if any.
pub fn render_result(result: &CommandResult) -> String {
    match &result.table {
        Some(table) => format!("{}\n{}", result.message, render_preview(table)),
        None => result.message.clone(),
    }
}

/// Every row, or the first and last five with an omission marker once the
/// table is longer than `PREVIEW_LIMIT`.
pub fn render_preview(table: &Table) -> String {
    let total = table.row_count();
    if total <= PREVIEW_LIMIT {
        return render_table(table);
    }

    let head: Vec<usize> = (0..PREVIEW_EDGE).collect();
    let tail: Vec<usize> = (total - PREVIEW_EDGE..total).collect();
    let widths = column_widths(table, head.iter().chain(&tail).copied());

    let mut lines = header_lines(table, &widths);
    lines.extend(head.iter().map(|&i| row_line(table, i, &widths)));
    lines.push(format!(
        "... (Total {} rows, middle part omitted) ...",
        total
    ));
    lines.extend(tail.iter().map(|&i| row_line(table, i, &widths)));
    lines.join("\n")
}

pub fn render_table(table: &Table) -> String {
    if table.row_count() == 0 {
        return "(0 rows)".to_string();
    }

    let widths = column_widths(table, 0..table.row_count());
    let mut lines = header_lines(table, &widths);
    lines.extend((0..table.row_count()).map(|i| row_line(table, i, &widths)));
    lines.push(format!("({} rows)", table.row_count()));
    lines.join("\n")
}

fn column_widths(table: &Table, rows: impl Iterator<Item = usize> + Clone) -> Vec<usize> {
    table
        .schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let max_value_width = rows
                .clone()
                .filter_map(|r| table.rows[r].get(i))
                .map(|v| v.to_string().chars().count())
                .max()
                .unwrap_or(0);
            col.name.chars().count().max(max_value_width)
        })
        .collect()
}

fn header_lines(table: &Table, widths: &[usize]) -> Vec<String> {
    let header: Vec<String> = table
        .schema
        .columns
        .iter()
        .zip(widths)
        .map(|(col, &width)| format!("{:width$}", col.name, width = width))
        .collect();
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    vec![header.join(" | "), sep.join("-+-")]
}

fn row_line(table: &Table, index: usize, widths: &[usize]) -> String {
    let values: Vec<String> = table.rows[index]
        .values
        .iter()
        .zip(widths)
        .map(|(v, &width)| format!("{:width$}", v.to_string(), width = width))
        .collect();
    values.join(" | ")
}
