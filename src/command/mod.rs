pub mod lexer;
pub mod ast;
pub mod error;
pub mod parser;
pub mod condition;
pub mod executor;
pub mod translate;

pub use lexer::{quote, Lexer};
pub use ast::{Assignments, Command, Conditions};
pub use error::{CommandError, Result};
pub use parser::{parse_command, Parser};
pub use condition::{evaluate, Predicate};
pub use executor::{apply, CommandResult, Executor, Severity};
pub use translate::{parse_agent_reply, translate, StructuredCommand, TranslateError};
