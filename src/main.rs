use std::fs;
use std::io::{stdout, Read};
use std::path::Path;
use std::process::ExitCode;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::info;

use tabletalk::cli::{Cli, OutputFormat};
use tabletalk::command::{CommandResult, Executor};
use tabletalk::format::render_result;
use tabletalk::logging;
use tabletalk::storage::{CsvStore, CsvWriter};
use tabletalk::tui::{app::App, input::handle_events, ui::draw};

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    logging::init(&cli.log, cli.log_file.as_deref())?;

    let store = CsvStore::new(&cli.data).with_delimiter(cli.delimiter);
    info!(path = %store.path().display(), "using table store");
    let executor = Executor::new(store);

    if let Some(line) = &cli.command {
        // Non-interactive mode
        let result = executor.execute(line);
        return Ok(report(&result, cli.format, cli.delimiter));
    }

    if let Some(source) = &cli.structured {
        let reply = read_structured(source)?;
        let (line, result) = executor.execute_agent_reply(&reply);
        if let Some(line) = line {
            eprintln!("> {}", line);
        }
        return Ok(report(&result, cli.format, cli.delimiter));
    }

    // Interactive TUI mode
    run_tui(executor)?;
    Ok(ExitCode::SUCCESS)
}

fn read_structured(source: &Path) -> std::io::Result<String> {
    if source == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(source)
    }
}

/// Print the result and map its severity to the process exit code.
fn report(result: &CommandResult, format: OutputFormat, delimiter: char) -> ExitCode {
    match format {
        OutputFormat::Table => println!("{}", render_result(result)),
        OutputFormat::Csv => match &result.table {
            Some(table) => print!("{}", CsvWriter::new().with_delimiter(delimiter).to_string(table)),
            None => eprintln!("{}", result.message),
        },
        OutputFormat::Json => match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to encode result: {}", e),
        },
    }

    if result.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_tui(executor: Executor<CsvStore>) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(executor);

    // Main loop
    loop {
        terminal.draw(|frame| draw(frame, &app))?;

        if handle_events(&mut app)? {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
