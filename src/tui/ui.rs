use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use super::app::{App, Focus, LineKind, Mode};
use crate::command::Severity;

const OPERATIONS: [&str; 11] = [
    "help",
    "clear",
    "list",
    "columns",
    "add",
    "add_batch",
    "update",
    "delete",
    "delete_all",
    "search",
    "search_exact",
];

pub fn draw<S>(frame: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Header
            Constraint::Length(3),  // Command input
            Constraint::Min(10),    // Transcript + results
            Constraint::Length(1),  // Status bar
        ])
        .split(frame.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[2]);

    draw_header(frame, chunks[0]);
    draw_input(frame, app, chunks[1]);
    draw_transcript(frame, app, panes[0]);
    draw_results(frame, app, panes[1]);
    draw_status_bar(frame, app, chunks[3]);

    if app.mode == Mode::Command {
        draw_command_line(frame, app);
    }
}

fn draw_header(frame: &mut Frame, area: Rect) {
    let header = Line::from(vec![
        Span::styled("  ", Style::default()),
        Span::styled("▤", Style::default().fg(Color::Yellow)),
        Span::styled(" tabletalk", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled("Table Terminal", Style::default().fg(Color::DarkGray)),
    ]);

    let paragraph = Paragraph::new(header)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

fn draw_input<S>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let is_focused = app.focus == Focus::Input;
    let border_color = if is_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .title(" Command (i: insert, Enter: run, help: commands) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let paragraph = Paragraph::new(highlight_command(&app.input));
    frame.render_widget(paragraph, inner);

    if app.mode == Mode::Insert && is_focused {
        let before_cursor = &app.input[..app.cursor_pos.min(app.input.len())];
        let cursor_x = inner.x + before_cursor.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }
}

/// Operation name, `key=value` pairs, quotes and condition operators each
/// get their own color.
pub fn highlight_command(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut string_char = ' ';
    let mut first_word = true;
    let mut after_equals = false;

    let flush = |current: &mut String, spans: &mut Vec<Span<'static>>, first_word: &mut bool, after_equals: bool| {
        if current.is_empty() {
            return;
        }
        let style = if *first_word {
            if OPERATIONS.contains(&current.to_lowercase().as_str()) {
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Red)
            }
        } else if !after_equals {
            Style::default().fg(Color::Yellow)
        } else if current.chars().all(|c| c.is_ascii_digit() || c == '.') {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        *first_word = false;
        spans.push(Span::styled(std::mem::take(current), style));
    };

    for c in line.chars() {
        if in_string {
            current.push(c);
            if c == string_char {
                spans.push(Span::styled(
                    std::mem::take(&mut current),
                    Style::default().fg(Color::Green),
                ));
                in_string = false;
            }
        } else if c == '\'' || c == '"' {
            flush(&mut current, &mut spans, &mut first_word, after_equals);
            current.push(c);
            in_string = true;
            string_char = c;
        } else if c.is_whitespace() {
            flush(&mut current, &mut spans, &mut first_word, after_equals);
            after_equals = false;
            spans.push(Span::raw(c.to_string()));
        } else if matches!(c, '=' | '<' | '>' | '!' | '*' | ',') {
            flush(&mut current, &mut spans, &mut first_word, after_equals);
            after_equals = true;
            spans.push(Span::styled(c.to_string(), Style::default().fg(Color::Magenta)));
        } else {
            current.push(c);
        }
    }

    if in_string {
        spans.push(Span::styled(current, Style::default().fg(Color::Green)));
    } else {
        flush(&mut current, &mut spans, &mut first_word, after_equals);
    }

    Line::from(spans)
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::White,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

fn draw_transcript<S>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let block = Block::default()
        .title(" Transcript ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.transcript.is_empty() {
        let hint = Paragraph::new("Type a command and press Enter. Try 'help'.")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(hint, inner);
        return;
    }

    // newest lines stay in view
    let visible = inner.height as usize;
    let lines: Vec<Line> = app
        .transcript
        .iter()
        .skip(app.transcript.len().saturating_sub(visible))
        .map(|line| {
            let style = match line.kind {
                LineKind::Echo => Style::default().fg(Color::Cyan),
                LineKind::Outcome(severity) => Style::default().fg(severity_color(severity)),
            };
            Line::from(vec![
                Span::styled(format!("[{}] ", line.time), Style::default().fg(Color::DarkGray)),
                Span::styled(line.text.clone(), style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_results<S>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let is_focused = app.focus == Focus::Results;
    let border_color = if is_focused {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .title(format!(" {} ", app.result_title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(ref table) = app.result else {
        let help = Paragraph::new("No table loaded")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, inner);
        return;
    };

    if table.row_count() == 0 {
        let empty = Paragraph::new("No data. Add rows with 'add' or 'add_batch'.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let header_cells: Vec<Cell> = table
        .schema
        .columns
        .iter()
        .enumerate()
        .skip(app.result_horizontal_scroll)
        .map(|(i, col)| {
            let width = app.column_widths.get(i).copied().unwrap_or(10);
            Cell::from(truncate_string(&col.name, width))
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        })
        .collect();

    let header = Row::new(header_cells).height(1);

    let visible_height = inner.height.saturating_sub(2) as usize;
    let rows: Vec<Row> = table
        .rows
        .iter()
        .skip(app.result_scroll)
        .take(visible_height)
        .map(|row| {
            let cells: Vec<Cell> = row
                .values
                .iter()
                .enumerate()
                .skip(app.result_horizontal_scroll)
                .map(|(i, val)| {
                    let width = app.column_widths.get(i).copied().unwrap_or(10);
                    let cell = Cell::from(truncate_string(&val.to_string(), width));
                    if val.is_missing() {
                        cell.style(Style::default().fg(Color::DarkGray))
                    } else {
                        cell
                    }
                })
                .collect();
            Row::new(cells)
        })
        .collect();

    let widths: Vec<Constraint> = app
        .column_widths
        .iter()
        .skip(app.result_horizontal_scroll)
        .map(|&w| Constraint::Length(w as u16 + 2))
        .collect();

    let table_widget = Table::new(rows, &widths)
        .header(header)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    frame.render_widget(table_widget, inner);
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else {
        s.chars().take(max_len).collect()
    }
}

fn draw_status_bar<S>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let mode_str = match app.mode {
        Mode::Normal => "NORMAL",
        Mode::Insert => "INSERT",
        Mode::Command => "COMMAND",
    };

    let mode_color = match app.mode {
        Mode::Normal => Color::Blue,
        Mode::Insert => Color::Green,
        Mode::Command => Color::Yellow,
    };

    let focus_str = match app.focus {
        Focus::Input => "Command",
        Focus::Results => "Results",
    };

    let help = match app.mode {
        Mode::Normal => "i:insert  j/k:history/scroll  Tab:focus  Enter:run  ::command  q:quit",
        Mode::Insert => "Esc:normal  Enter:run  Up/Down:history  Ctrl+L:clear transcript",
        Mode::Command => "e:run  r:reload  agent <json>:structured  clear  q:quit  Esc:cancel",
    };

    let status = Line::from(vec![
        Span::styled(
            format!(" {} ", mode_str),
            Style::default().fg(Color::Black).bg(mode_color),
        ),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", focus_str),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]);

    let paragraph = Paragraph::new(status);
    frame.render_widget(paragraph, area);
}

fn draw_command_line<S>(frame: &mut Frame, app: &App<S>) {
    let area = frame.area();
    let popup_area = Rect {
        x: 0,
        y: area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    frame.render_widget(Clear, popup_area);

    let command_line = Paragraph::new(format!(":{}", app.command_buffer))
        .style(Style::default().fg(Color::White));

    frame.render_widget(command_line, popup_area);

    frame.set_cursor_position((1 + app.command_buffer.chars().count() as u16, popup_area.y));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &Line) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlight_splits_pairs() {
        let line = highlight_command("update age=>30 set name='Tom Lee'");
        assert_eq!(
            texts(&line),
            vec!["update", " ", "age", "=", ">", "30", " ", "set", " ", "name", "=", "'Tom Lee'"]
        );
        assert_eq!(line.spans[0].style.fg, Some(Color::Blue));
        assert_eq!(line.spans[5].style.fg, Some(Color::Cyan));
        assert_eq!(line.spans[11].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_unknown_operation_is_flagged() {
        let line = highlight_command("drop x");
        assert_eq!(line.spans[0].style.fg, Some(Color::Red));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Rome", 10), "Rome");
        assert_eq!(truncate_string("Copenhagen", 7), "Cope...");
        assert_eq!(truncate_string("añbñc", 2), "añ");
    }
}
