use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tabletalk")]
#[command(author, version, about = "Manage a single CSV-backed table with shell-style commands")]
pub struct Cli {
    /// CSV file holding the table (created on first write)
    #[arg(short = 'D', long, env = "TABLETALK_DATA", default_value = "data/table.csv")]
    pub data: PathBuf,

    /// Execute one command directly (non-interactive mode)
    #[arg(short, long, conflicts_with = "structured")]
    pub command: Option<String>,

    /// Execute one structured (JSON) command read from a file, or `-` for stdin
    #[arg(short, long)]
    pub structured: Option<PathBuf>,

    /// Output format for non-interactive mode
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// CSV delimiter
    #[arg(short, long, default_value = ",")]
    pub delimiter: char,

    /// Log filter, e.g. `info` or `tabletalk=debug`
    #[arg(long, env = "TABLETALK_LOG", default_value = "warn")]
    pub log: String,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    pub fn is_interactive(&self) -> bool {
        self.command.is_none() && self.structured.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tabletalk"]).unwrap();
        assert!(cli.is_interactive());
        assert_eq!(cli.delimiter, ',');
        assert!(matches!(cli.format, OutputFormat::Table));
    }

    #[test]
    fn test_command_mode() {
        let cli = Cli::try_parse_from([
            "tabletalk",
            "-D",
            "people.csv",
            "-c",
            "search_exact age=>30",
            "-f",
            "json",
        ])
        .unwrap();
        assert!(!cli.is_interactive());
        assert_eq!(cli.data, PathBuf::from("people.csv"));
        assert_eq!(cli.command.as_deref(), Some("search_exact age=>30"));
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn test_command_and_structured_conflict() {
        assert!(Cli::try_parse_from(["tabletalk", "-c", "list", "-s", "-"]).is_err());
    }
}
