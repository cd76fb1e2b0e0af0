use indexmap::IndexMap;

use super::ast::{Assignments, Command, Conditions};
use super::error::{CommandError, Result};
use super::lexer::Lexer;

/// Token that lifts the confirmation gate on `delete`.
pub const DELETE_CONFIRM_TOKEN: &str = "confirm=yes";
/// Token that confirms `delete_all`.
pub const DELETE_ALL_CONFIRM_TOKEN: &str = "confirm";
/// Separates conditions from assignments in `update`.
pub const SET_KEYWORD: &str = "set";

pub struct Parser {
    tokens: Vec<String>,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self> {
        let tokens = Lexer::new(input)
            .tokenize()
            .map_err(CommandError::Parse)?;
        Ok(Self { tokens })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn parse(&self) -> Result<Command> {
        let Some(first) = self.tokens.first() else {
            return Err(CommandError::Validation("No command input".to_string()));
        };
        let args = &self.tokens[1..];

        match first.to_lowercase().as_str() {
            "help" => Ok(Command::Help),
            "clear" => Ok(Command::Clear),
            "list" => Ok(Command::List),
            "columns" => Ok(Command::Columns),
            "add" => self.parse_add(args),
            "add_batch" => self.parse_add_batch(args),
            "update" => self.parse_update(args),
            "delete" => self.parse_delete(args),
            "delete_all" => Ok(Command::DeleteAll {
                confirmed: args
                    .first()
                    .is_some_and(|t| t.eq_ignore_ascii_case(DELETE_ALL_CONFIRM_TOKEN)),
            }),
            "search" => match args.first() {
                Some(keyword) => Ok(Command::Search {
                    keyword: keyword.clone(),
                }),
                None => Err(CommandError::Validation(
                    "search command requires a keyword. Usage: search <keyword>".to_string(),
                )),
            },
            "search_exact" => self.parse_search_exact(args),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }

    fn parse_add(&self, args: &[String]) -> Result<Command> {
        let values = loose_pairs(args);
        if values.is_empty() {
            return Err(CommandError::Validation(
                "add requires fields and values, e.g., add name=Tom age=18".to_string(),
            ));
        }
        Ok(Command::Add { values })
    }

    fn parse_add_batch(&self, args: &[String]) -> Result<Command> {
        let lists = loose_pairs(args);
        if lists.is_empty() {
            return Err(CommandError::Validation(
                "add_batch requires column lists, e.g., add_batch name=Tom,Alice,Bob age=25,30,28"
                    .to_string(),
            ));
        }

        let mut columns = IndexMap::new();
        let mut row_count = None;
        for (column, list) in lists {
            let values: Vec<String> = list.split(',').map(|v| v.trim().to_string()).collect();
            match row_count {
                None => row_count = Some(values.len()),
                Some(expected) if expected != values.len() => {
                    return Err(CommandError::Validation(format!(
                        "All columns must have the same number of values. Column '{}' has {} values, but expected {}.",
                        column,
                        values.len(),
                        expected
                    )));
                }
                Some(_) => {}
            }
            columns.insert(column, values);
        }

        Ok(Command::AddBatch {
            columns,
            row_count: row_count.unwrap_or(0),
        })
    }

    fn parse_update(&self, args: &[String]) -> Result<Command> {
        let set_idx = args.iter().position(|t| t == SET_KEYWORD).ok_or_else(|| {
            CommandError::Parse(
                "update command format error: missing 'set' keyword. Usage: update condition1=value1 ... set update_col1=new_val1 ..."
                    .to_string(),
            )
        })?;

        let (condition_args, update_args) = (&args[..set_idx], &args[set_idx + 1..]);
        if condition_args.is_empty() {
            return Err(CommandError::Validation(
                "update command format error: missing update conditions.".to_string(),
            ));
        }
        if update_args.is_empty() {
            return Err(CommandError::Validation(
                "update command format error: missing fields and values to update.".to_string(),
            ));
        }

        let conditions = strict_pairs(condition_args, |token| {
            format!(
                "update command format error: condition '{}' format is incorrect.",
                token
            )
        })?;
        let assignments = strict_pairs(update_args, |token| {
            format!(
                "update command format error: update '{}' format is incorrect.",
                token
            )
        })?;

        Ok(Command::Update {
            conditions,
            assignments,
        })
    }

    fn parse_delete(&self, args: &[String]) -> Result<Command> {
        if args.is_empty() {
            return Err(CommandError::Validation(
                "delete command requires conditions, e.g., delete name=Tom age=30. For bulk delete confirmation, add confirm=yes"
                    .to_string(),
            ));
        }

        let (confirm, condition_args): (Vec<&String>, Vec<&String>) = args
            .iter()
            .partition(|t| t.eq_ignore_ascii_case(DELETE_CONFIRM_TOKEN));
        if condition_args.is_empty() {
            return Err(CommandError::Validation(
                "delete command requires conditions to specify which rows to delete (beyond just 'confirm=yes')."
                    .to_string(),
            ));
        }

        let mut conditions = Conditions::new();
        for token in condition_args {
            let (k, v) = token.split_once('=').ok_or_else(|| {
                CommandError::Parse(format!(
                    "delete command format error: condition '{}' format is incorrect. Expected 'column=value'.",
                    token
                ))
            })?;
            conditions.insert(k.to_string(), v.to_string());
        }

        Ok(Command::Delete {
            conditions,
            confirmed: !confirm.is_empty(),
        })
    }

    fn parse_search_exact(&self, args: &[String]) -> Result<Command> {
        let usage = || {
            CommandError::Parse(
                "search_exact command format error. Usage: search_exact column_name=value_to_search"
                    .to_string(),
            )
        };
        match args {
            [pair] => {
                let (column, condition) = pair.split_once('=').ok_or_else(usage)?;
                Ok(Command::SearchExact {
                    column: column.to_string(),
                    condition: condition.to_string(),
                })
            }
            _ => Err(usage()),
        }
    }
}

pub fn parse_command(input: &str) -> Result<Command> {
    Parser::new(input)?.parse()
}

/// `key=value` tokens; tokens without `=` are skipped. A repeated key keeps
/// its first position and its last value.
fn loose_pairs(tokens: &[String]) -> Assignments {
    tokens
        .iter()
        .filter_map(|t| t.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// `key=value` tokens where every token must carry a `=`.
fn strict_pairs(tokens: &[String], bad_token: impl Fn(&str) -> String) -> Result<Assignments> {
    let mut pairs = Assignments::new();
    for token in tokens {
        let (k, v) = token
            .split_once('=')
            .ok_or_else(|| CommandError::Parse(bad_token(token)))?;
        pairs.insert(k.to_string(), v.to_string());
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_is_case_insensitive() {
        assert_eq!(parse_command("LIST").unwrap(), Command::List);
        assert_eq!(parse_command("Columns extra").unwrap(), Command::Columns);
        assert_eq!(parse_command("HELP").unwrap(), Command::Help);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            parse_command("   "),
            Err(CommandError::Validation(ref m)) if m == "No command input"
        ));
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            parse_command("drop table"),
            Err(CommandError::UnknownCommand(ref op)) if op == "drop"
        ));
    }

    #[test]
    fn test_add_pairs() {
        let cmd = parse_command("add name='Tom Lee' junk age=18 name=Tim").unwrap();
        let Command::Add { values } = cmd else {
            panic!("expected add");
        };
        let pairs: Vec<(&str, &str)> = values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("name", "Tim"), ("age", "18")]);
    }

    #[test]
    fn test_add_requires_pairs() {
        assert!(matches!(
            parse_command("add junk"),
            Err(CommandError::Validation(_))
        ));
    }

    #[test]
    fn test_add_batch_lengths() {
        let err = parse_command("add_batch col1=a,b col2=1,2,3").unwrap_err();
        let CommandError::Validation(message) = err else {
            panic!("expected validation error");
        };
        assert!(message.contains("'col2'"));
        assert!(message.contains("has 3 values"));
        assert!(message.contains("expected 2"));
    }

    #[test]
    fn test_add_batch_trims_values() {
        let cmd = parse_command("add_batch name='Tom, Ann' age=1,2").unwrap();
        let Command::AddBatch { columns, row_count } = cmd else {
            panic!("expected add_batch");
        };
        assert_eq!(row_count, 2);
        assert_eq!(columns["name"], vec!["Tom", "Ann"]);
    }

    #[test]
    fn test_update_needs_set() {
        assert!(matches!(
            parse_command("update name=Tom age=3"),
            Err(CommandError::Parse(_))
        ));
        assert!(matches!(
            parse_command("update set age=3"),
            Err(CommandError::Validation(_))
        ));
        assert!(matches!(
            parse_command("update name=Tom set"),
            Err(CommandError::Validation(_))
        ));
        assert!(matches!(
            parse_command("update name set age=3"),
            Err(CommandError::Parse(ref m)) if m.contains("'name'")
        ));
    }

    #[test]
    fn test_update_splits_on_set() {
        let cmd = parse_command("update age=>30 city=Rome set tier=gold").unwrap();
        let Command::Update {
            conditions,
            assignments,
        } = cmd
        else {
            panic!("expected update");
        };
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions["age"], ">30");
        assert_eq!(assignments["tier"], "gold");
    }

    #[test]
    fn test_delete_confirmation() {
        let cmd = parse_command("delete age=<5 CONFIRM=YES").unwrap();
        assert!(matches!(cmd, Command::Delete { confirmed: true, ref conditions } if conditions.len() == 1));

        let cmd = parse_command("delete age=<5").unwrap();
        assert!(matches!(cmd, Command::Delete { confirmed: false, .. }));

        assert!(matches!(
            parse_command("delete confirm=yes"),
            Err(CommandError::Validation(_))
        ));
        assert!(matches!(
            parse_command("delete"),
            Err(CommandError::Validation(_))
        ));
        assert!(matches!(
            parse_command("delete Tom"),
            Err(CommandError::Parse(_))
        ));
    }

    #[test]
    fn test_delete_all() {
        assert_eq!(
            parse_command("delete_all Confirm").unwrap(),
            Command::DeleteAll { confirmed: true }
        );
        assert_eq!(
            parse_command("delete_all").unwrap(),
            Command::DeleteAll { confirmed: false }
        );
    }

    #[test]
    fn test_search() {
        assert_eq!(
            parse_command("search 'new york' ignored").unwrap(),
            Command::Search {
                keyword: "new york".to_string()
            }
        );
        assert!(matches!(
            parse_command("search"),
            Err(CommandError::Validation(_))
        ));
    }

    #[test]
    fn test_search_exact() {
        assert_eq!(
            parse_command("search_exact age=>=30").unwrap(),
            Command::SearchExact {
                column: "age".to_string(),
                condition: ">=30".to_string()
            }
        );
        assert!(matches!(
            parse_command("search_exact age"),
            Err(CommandError::Parse(_))
        ));
        assert!(matches!(
            parse_command("search_exact a=1 b=2"),
            Err(CommandError::Parse(_))
        ));
    }

    #[test]
    fn test_unbalanced_quote_is_parse_error() {
        assert!(matches!(
            parse_command("add name='Tom"),
            Err(CommandError::Parse(_))
        ));
    }
}
