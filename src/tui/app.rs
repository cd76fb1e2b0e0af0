use std::collections::VecDeque;

use chrono::Local;

use crate::command::{CommandResult, Executor, Severity};
use crate::storage::{Table, TableStore};

/// Transcript lines kept on screen; older lines scroll away.
pub const TRANSCRIPT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Normal,
    Insert,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Input,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineKind {
    Echo,
    Outcome(Severity),
}

#[derive(Debug, Clone)]
pub struct TranscriptLine {
    pub time: String,
    pub kind: LineKind,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Transcript {
    lines: VecDeque<TranscriptLine>,
}

impl Transcript {
    pub fn push(&mut self, kind: LineKind, text: &str) {
        let time = Local::now().format("%H:%M:%S").to_string();
        for line in text.lines() {
            self.lines.push_back(TranscriptLine {
                time: time.clone(),
                kind,
                text: line.to_string(),
            });
        }
        while self.lines.len() > TRANSCRIPT_LIMIT {
            self.lines.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranscriptLine> {
        self.lines.iter()
    }
}

pub struct App<S> {
    pub input: String,
    pub cursor_pos: usize,
    pub mode: Mode,
    pub focus: Focus,
    pub should_quit: bool,
    pub executor: Executor<S>,
    pub command_buffer: String,
    pub transcript: Transcript,
    pub result: Option<Table>,
    pub result_title: String,
    pub result_scroll: usize,
    pub result_horizontal_scroll: usize,
    pub history: Vec<String>,
    pub history_index: Option<usize>,
    pub column_widths: Vec<usize>,
}

impl<S: TableStore> App<S> {
    pub fn new(executor: Executor<S>) -> Self {
        let mut app = Self {
            input: String::new(),
            cursor_pos: 0,
            mode: Mode::Normal,
            focus: Focus::Input,
            should_quit: false,
            executor,
            command_buffer: String::new(),
            transcript: Transcript::default(),
            result: None,
            result_title: String::new(),
            result_scroll: 0,
            result_horizontal_scroll: 0,
            history: Vec::new(),
            history_index: None,
            column_widths: Vec::new(),
        };
        app.reload_table();
        app
    }

    /// Run the line in the input box.
    pub fn submit(&mut self) {
        let line = self.input.trim().to_string();
        if line.is_empty() {
            return;
        }

        if self.history.last() != Some(&line) {
            self.history.push(line.clone());
        }
        self.history_index = None;
        self.clear_input();

        self.transcript.push(LineKind::Echo, &format!("> {}", line));
        let result = self.executor.execute(&line);
        self.show_result(result);
    }

    /// Run a raw agent reply (structured JSON command).
    pub fn submit_agent_reply(&mut self, reply: &str) {
        let (line, result) = self.executor.execute_agent_reply(reply);
        if let Some(line) = line {
            self.transcript.push(LineKind::Echo, &format!("agent> {}", line));
        }
        self.show_result(result);
    }

    fn show_result(&mut self, result: CommandResult) {
        if result.command == Some("clear") {
            self.transcript.clear();
        }
        self.transcript
            .push(LineKind::Outcome(result.severity), &result.message);

        match result.table {
            Some(table) => self.set_result(format!("Results ({} rows)", table.row_count()), table),
            None => self.reload_table(),
        }
    }

    /// Show the stored table in the results pane.
    pub fn reload_table(&mut self) {
        match self.executor.store().load() {
            Ok(table) => self.set_result(format!("Table ({} rows)", table.row_count()), table),
            Err(e) => {
                self.transcript
                    .push(LineKind::Outcome(Severity::Error), &e.to_string());
                self.result = None;
                self.result_title = "Table unavailable".to_string();
            }
        }
    }

    fn set_result(&mut self, title: String, table: Table) {
        self.calculate_column_widths(&table);
        self.result = Some(table);
        self.result_title = title;
        self.result_scroll = 0;
        self.result_horizontal_scroll = 0;
    }

    fn calculate_column_widths(&mut self, table: &Table) {
        self.column_widths = table
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let header_width = col.name.chars().count();
                let max_value_width = table
                    .column_values(i)
                    .map(|v| v.to_string().chars().count())
                    .max()
                    .unwrap_or(0);
                header_width.max(max_value_width).max(4) // minimum width of 4
            })
            .collect();
    }

    fn prev_boundary(&self) -> usize {
        self.input[..self.cursor_pos]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    fn next_boundary(&self) -> usize {
        self.input[self.cursor_pos..]
            .chars()
            .next()
            .map(|c| self.cursor_pos + c.len_utf8())
            .unwrap_or(self.input.len())
    }

    pub fn insert_char(&mut self, c: char) {
        self.input.insert(self.cursor_pos, c);
        self.cursor_pos += c.len_utf8();
    }

    pub fn delete_char(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos = self.prev_boundary();
            self.input.remove(self.cursor_pos);
        }
    }

    pub fn delete_char_forward(&mut self) {
        if self.cursor_pos < self.input.len() {
            self.input.remove(self.cursor_pos);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_pos = self.prev_boundary();
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor_pos = self.next_boundary();
    }

    pub fn move_cursor_start(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_pos = self.input.len();
    }

    pub fn move_cursor_word_forward(&mut self) {
        let rest = &self.input[self.cursor_pos..];
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let after = &rest[word_end..];
        let next_word = after
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(after.len());
        self.cursor_pos += word_end + next_word;
    }

    pub fn move_cursor_word_backward(&mut self) {
        let before = self.input[..self.cursor_pos].trim_end();
        self.cursor_pos = before
            .rfind(char::is_whitespace)
            .map(|i| i + before[i..].chars().next().map(char::len_utf8).unwrap_or(1))
            .unwrap_or(0);
    }

    pub fn delete_word_backward(&mut self) {
        let start = self.cursor_pos;
        self.move_cursor_word_backward();
        let end = self.cursor_pos;
        self.input.drain(end..start);
    }

    pub fn delete_to_end(&mut self) {
        self.input.truncate(self.cursor_pos);
    }

    pub fn delete_to_start(&mut self) {
        self.input = self.input[self.cursor_pos..].to_string();
        self.cursor_pos = 0;
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }

    pub fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }

        let new_index = match self.history_index {
            None => self.history.len() - 1,
            Some(0) => 0,
            Some(i) => i - 1,
        };

        self.history_index = Some(new_index);
        self.input = self.history[new_index].clone();
        self.cursor_pos = self.input.len();
    }

    pub fn history_down(&mut self) {
        if self.history.is_empty() {
            return;
        }

        match self.history_index {
            None => {}
            Some(i) if i >= self.history.len() - 1 => {
                self.history_index = None;
                self.clear_input();
            }
            Some(i) => {
                self.history_index = Some(i + 1);
                self.input = self.history[i + 1].clone();
                self.cursor_pos = self.input.len();
            }
        }
    }

    pub fn scroll_results_up(&mut self) {
        if self.result_scroll > 0 {
            self.result_scroll -= 1;
        }
    }

    pub fn scroll_results_down(&mut self) {
        if let Some(ref table) = self.result {
            if self.result_scroll < table.row_count().saturating_sub(1) {
                self.result_scroll += 1;
            }
        }
    }

    pub fn scroll_results_left(&mut self) {
        if self.result_horizontal_scroll > 0 {
            self.result_horizontal_scroll -= 1;
        }
    }

    pub fn scroll_results_right(&mut self) {
        if self.result_horizontal_scroll + 1 < self.column_widths.len() {
            self.result_horizontal_scroll += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(10);
    }

    pub fn page_down(&mut self) {
        if let Some(ref table) = self.result {
            self.result_scroll = (self.result_scroll + 10).min(table.row_count().saturating_sub(1));
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.result_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        if let Some(ref table) = self.result {
            self.result_scroll = table.row_count().saturating_sub(1);
        }
    }

    pub fn enter_insert_mode(&mut self) {
        self.mode = Mode::Insert;
        self.focus = Focus::Input;
    }

    pub fn enter_normal_mode(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_buffer.clear();
    }

    pub fn execute_command(&mut self) {
        let cmd = self.command_buffer.trim().to_string();
        match cmd.as_str() {
            "q" | "quit" => self.should_quit = true,
            "e" | "exec" | "execute" => self.submit(),
            "r" | "reload" => self.reload_table(),
            "clear" => {
                self.clear_input();
                self.transcript.clear();
            }
            other => {
                if let Some(reply) = other.strip_prefix("agent ") {
                    self.submit_agent_reply(reply);
                }
            }
        }
        self.command_buffer.clear();
        self.mode = Mode::Normal;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Input => Focus::Results,
            Focus::Results => Focus::Input,
        };
    }
}
