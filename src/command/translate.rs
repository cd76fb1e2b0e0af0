//! Structured commands, as produced by a language-model agent, and their
//! translation into ordinary command lines.
//!
//! Translated lines go through the same lexer, parser and executor as typed
//! input, so an agent can do nothing a user could not type.

use std::borrow::Cow;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::executor::CommandResult;
use super::lexer::quote;
use super::parser::{DELETE_CONFIRM_TOKEN, SET_KEYWORD};

type JsonPairs = IndexMap<String, JsonValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum StructuredCommand {
    List,
    Columns,
    Add {
        #[serde(default)]
        data: JsonPairs,
    },
    AddBatch {
        #[serde(default)]
        columns: Vec<String>,
        #[serde(default)]
        values: Vec<Vec<JsonValue>>,
    },
    Update {
        #[serde(default)]
        conditions: JsonPairs,
        #[serde(default)]
        data: JsonPairs,
    },
    Delete {
        #[serde(default)]
        conditions: JsonPairs,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confirm: Option<JsonValue>,
    },
    Search {
        #[serde(default)]
        keyword: Option<JsonValue>,
    },
    SearchExact {
        #[serde(default)]
        column: Option<JsonValue>,
        #[serde(default)]
        value: Option<JsonValue>,
    },
    /// The agent could not map the request onto a command.
    Error {
        #[serde(default)]
        message: Option<String>,
    },
}

impl StructuredCommand {
    pub fn from_json(text: &str) -> Result<Self, TranslateError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Structured command could not be decoded: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Structured command cannot be translated: {0}")]
    Untranslatable(String),

    #[error("Agent reported an error: {0}")]
    Agent(String),
}

impl TranslateError {
    /// An agent refusal is a warning; anything else is an error.
    pub fn to_result(&self) -> CommandResult {
        match self {
            TranslateError::Agent(_) => CommandResult::warning(self.to_string()),
            _ => CommandResult::error(self.to_string()),
        }
    }
}

fn untranslatable(message: impl Into<String>) -> TranslateError {
    TranslateError::Untranslatable(message.into())
}

/// Render a command line that tokenizes back to the intended words.
pub fn translate(command: &StructuredCommand) -> Result<String, TranslateError> {
    match command {
        StructuredCommand::List => Ok("list".to_string()),
        StructuredCommand::Columns => Ok("columns".to_string()),
        StructuredCommand::Add { data } => {
            if data.is_empty() {
                return Err(untranslatable("add requires a non-empty 'data' mapping"));
            }
            Ok(format!("add {}", render_pairs(data)?))
        }
        StructuredCommand::AddBatch { columns, values } => translate_batch(columns, values),
        StructuredCommand::Update { conditions, data } => {
            if conditions.is_empty() || data.is_empty() {
                return Err(untranslatable(
                    "update requires non-empty 'conditions' and 'data'",
                ));
            }
            Ok(format!(
                "update {} {} {}",
                render_pairs(conditions)?,
                SET_KEYWORD,
                render_pairs(data)?
            ))
        }
        StructuredCommand::Delete {
            conditions,
            confirm,
        } => {
            if conditions.is_empty() {
                return Err(untranslatable("delete requires non-empty 'conditions'"));
            }
            for (k, v) in conditions {
                if format!("{}={}", k, scalar(v)).eq_ignore_ascii_case(DELETE_CONFIRM_TOKEN) {
                    return Err(untranslatable(format!(
                        "'{}' cannot be used as a delete condition",
                        DELETE_CONFIRM_TOKEN
                    )));
                }
            }
            let mut line = format!("delete {}", render_pairs(conditions)?);
            if confirm == &Some(JsonValue::Bool(true)) {
                line.push(' ');
                line.push_str(DELETE_CONFIRM_TOKEN);
            }
            Ok(line)
        }
        StructuredCommand::Search { keyword } => match keyword {
            Some(keyword) => Ok(format!("search {}", quote(&scalar(keyword)))),
            None => Err(untranslatable("search requires a 'keyword'")),
        },
        StructuredCommand::SearchExact { column, value } => match (column, value) {
            (Some(column), Some(value)) => Ok(format!(
                "search_exact {}={}",
                render_key(&scalar(column))?,
                quote(&scalar(value))
            )),
            _ => Err(untranslatable(
                "search_exact requires a 'column' and a 'value'",
            )),
        },
        StructuredCommand::Error { message } => Err(TranslateError::Agent(
            message
                .clone()
                .unwrap_or_else(|| "Only specified command formats are supported.".to_string()),
        )),
    }
}

fn translate_batch(columns: &[String], values: &[Vec<JsonValue>]) -> Result<String, TranslateError> {
    if columns.is_empty() || values.is_empty() {
        return Err(untranslatable(
            "add_batch requires non-empty 'columns' and 'values'",
        ));
    }
    if let Some(row) = values.iter().find(|row| row.len() != columns.len()) {
        return Err(untranslatable(format!(
            "add_batch row has {} values, but {} columns were given",
            row.len(),
            columns.len()
        )));
    }

    let mut parts = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        let mut cells = Vec::with_capacity(values.len());
        for row in values {
            let cell = scalar(&row[i]);
            if cell.contains(',') {
                return Err(untranslatable(format!(
                    "add_batch value '{}' contains ','",
                    cell
                )));
            }
            cells.push(quote(&cell));
        }
        parts.push(format!("{}={}", render_key(column)?, cells.join(",")));
    }
    Ok(format!("add_batch {}", parts.join(" ")))
}

fn render_pairs(pairs: &JsonPairs) -> Result<String, TranslateError> {
    let rendered = pairs
        .iter()
        .map(|(k, v)| Ok(format!("{}={}", render_key(k)?, quote(&scalar(v)))))
        .collect::<Result<Vec<_>, TranslateError>>()?;
    Ok(rendered.join(" "))
}

fn render_key(key: &str) -> Result<String, TranslateError> {
    if key.is_empty() || key.contains('=') {
        return Err(untranslatable(format!("invalid column name '{}'", key)));
    }
    Ok(quote(key))
}

/// Text form of a JSON scalar. Null becomes the empty missing-value token.
fn scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Decode a raw agent reply, tolerating a Markdown code fence and
/// JavaScript `undefined` values.
pub fn parse_agent_reply(reply: &str) -> Result<StructuredCommand, TranslateError> {
    let body = strip_fence(reply);
    StructuredCommand::from_json(&undefined_to_null(body))
}

fn strip_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(body) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    else {
        return trimmed;
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

static UNDEFINED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*undefined").unwrap());

fn undefined_to_null(text: &str) -> Cow<'_, str> {
    UNDEFINED_RE.replace_all(text, ": null")
}
