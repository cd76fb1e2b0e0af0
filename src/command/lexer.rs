//! Shell-style word splitting for command lines.

use std::iter::Peekable;
use std::str::Chars;

/// Characters `quote` leaves bare. `,` is deliberately absent so batch
/// values never reach the splitter unquoted.
const SAFE_CHARS: &str = "@%+=:./-_";

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Between,
    Word,
    Single,
    Double,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    /// Split the input into words, honoring single quotes, double quotes
    /// and backslash escapes.
    pub fn tokenize(&mut self) -> Result<Vec<String>, String> {
        let mut words = Vec::new();
        let mut current = String::new();
        let mut state = State::Between;
        let mut quote_start = 0;

        while let Some(c) = self.advance() {
            match state {
                State::Between | State::Word => match c {
                    c if c.is_whitespace() => {
                        if state == State::Word {
                            words.push(std::mem::take(&mut current));
                            state = State::Between;
                        }
                    }
                    '\'' => {
                        quote_start = self.position - 1;
                        state = State::Single;
                    }
                    '"' => {
                        quote_start = self.position - 1;
                        state = State::Double;
                    }
                    '\\' => match self.advance() {
                        Some(escaped) => {
                            current.push(escaped);
                            state = State::Word;
                        }
                        None => return Err("No escaped character".to_string()),
                    },
                    c => {
                        current.push(c);
                        state = State::Word;
                    }
                },
                State::Single => match c {
                    '\'' => state = State::Word,
                    c => current.push(c),
                },
                State::Double => match c {
                    '"' => state = State::Word,
                    '\\' => match self.peek() {
                        Some(next @ ('"' | '\\' | '$' | '`')) => {
                            current.push(next);
                            self.advance();
                        }
                        Some('\n') => {
                            self.advance();
                        }
                        _ => current.push('\\'),
                    },
                    c => current.push(c),
                },
            }
        }

        match state {
            State::Single | State::Double => Err(format!(
                "No closing quotation for quote at position {}",
                quote_start
            )),
            State::Word => {
                words.push(current);
                Ok(words)
            }
            State::Between => Ok(words),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }
}

/// Quote `word` so that `Lexer` reads it back as exactly one word.
pub fn quote(word: &str) -> String {
    if word.is_empty() {
        return "''".to_string();
    }
    if word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || SAFE_CHARS.contains(c))
    {
        return word.to_string();
    }
    format!("'{}'", word.replace('\'', "'\"'\"'"))
}
