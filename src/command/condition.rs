//! Row matching for condition clauses.
//!
//! A condition is plain text whose meaning depends on the column type:
//! comparison operators on numeric columns, boolean tokens on boolean
//! columns, and `*` wildcards on everything else. Missing-value tokens match
//! missing cells on any column.

use tracing::debug;

use super::ast::Conditions;
use super::error::{CommandError, Result};
use crate::storage::coerce::{is_missing_token, is_nan_text, parse_bool_token, parse_number};
use crate::storage::{DataType, Table, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Ge,
    Le,
    Ne,
    Gt,
    Lt,
    Eq,
}

impl Comparison {
    /// Prefixes in the order they are tried.
    const PREFIXES: [(&'static str, Comparison); 5] = [
        (">=", Comparison::Ge),
        ("<=", Comparison::Le),
        ("!=", Comparison::Ne),
        (">", Comparison::Gt),
        ("<", Comparison::Lt),
    ];

    fn split(condition: &str) -> (Comparison, &str) {
        Self::PREFIXES
            .iter()
            .find_map(|(prefix, op)| condition.strip_prefix(prefix).map(|rest| (*op, rest)))
            .unwrap_or((Comparison::Eq, condition))
    }

    fn test(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Ge => left >= right,
            Comparison::Le => left <= right,
            Comparison::Ne => left != right,
            Comparison::Gt => left > right,
            Comparison::Lt => left < right,
            Comparison::Eq => left == right,
        }
    }
}

/// A condition compiled against one column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    IsMissing,
    Compare(Comparison, f64),
    IsBool(bool),
    /// Whole-text equality, used when the condition does not fit the column.
    TextEquals { text: String, ignore_case: bool },
    Contains(String),
    EndsWith(String),
    StartsWith(String),
    Equals(String),
}

impl Predicate {
    pub fn build(condition: &str, data_type: DataType) -> Predicate {
        if is_missing_token(condition) || is_nan_text(condition) {
            return Predicate::IsMissing;
        }

        match data_type {
            DataType::Integer | DataType::Float => {
                let (op, operand) = Comparison::split(condition);
                match parse_number(operand) {
                    Some(n) => Predicate::Compare(op, n),
                    None => Predicate::TextEquals {
                        text: condition.to_string(),
                        ignore_case: false,
                    },
                }
            }
            DataType::Boolean => match parse_bool_token(condition) {
                Some(b) => Predicate::IsBool(b),
                None => Predicate::TextEquals {
                    text: condition.to_string(),
                    ignore_case: true,
                },
            },
            DataType::Text | DataType::Unknown => Self::build_pattern(condition),
        }
    }

    fn build_pattern(condition: &str) -> Predicate {
        let starts = condition.starts_with('*');
        let ends = condition.ends_with('*');
        if starts && ends {
            Predicate::Contains(condition.trim_matches('*').to_string())
        } else if starts {
            Predicate::EndsWith(condition[1..].to_string())
        } else if ends {
            Predicate::StartsWith(condition[..condition.len() - 1].to_string())
        } else {
            Predicate::Equals(condition.to_string())
        }
    }

    /// Missing cells only ever satisfy `IsMissing`.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Predicate::IsMissing => value.is_missing(),
            _ if value.is_missing() => false,
            Predicate::Compare(op, operand) => value
                .as_float()
                .is_some_and(|v| op.test(v, *operand)),
            Predicate::IsBool(expected) => value.as_bool() == Some(*expected),
            Predicate::TextEquals { text, ignore_case } => {
                let cell = value.to_text();
                if *ignore_case {
                    cell.to_lowercase() == text.to_lowercase()
                } else {
                    cell == *text
                }
            }
            Predicate::Contains(s) => value.to_text().contains(s.as_str()),
            Predicate::EndsWith(s) => value.to_text().ends_with(s.as_str()),
            Predicate::StartsWith(s) => value.to_text().starts_with(s.as_str()),
            Predicate::Equals(s) => value.to_text() == *s,
        }
    }
}

/// Mask of the rows whose `column` satisfies `condition`.
pub fn column_mask(table: &Table, column: &str, condition: &str) -> Result<Vec<bool>> {
    let index = table
        .get_column_index(column)
        .ok_or_else(|| CommandError::UnknownColumn(column.to_string()))?;
    let data_type = table.schema.columns[index].data_type;
    let predicate = Predicate::build(condition, data_type);
    debug!(column, condition, ?predicate, "compiled condition");

    Ok(table
        .rows
        .iter()
        .map(|row| row.get(index).is_some_and(|v| predicate.matches(v)))
        .collect())
}

/// Conjunction of every condition. Fails on the first unknown column.
pub fn evaluate(conditions: &Conditions, table: &Table) -> Result<Vec<bool>> {
    let mut mask = vec![true; table.row_count()];
    for (column, condition) in conditions {
        let current = column_mask(table, column, condition)?;
        for (m, c) in mask.iter_mut().zip(current) {
            *m &= c;
        }
    }
    Ok(mask)
}
