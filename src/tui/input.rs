use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use super::app::{App, Focus, Mode};
use crate::storage::TableStore;

pub fn handle_events<S: TableStore>(app: &mut App<S>) -> std::io::Result<bool> {
    if event::poll(Duration::from_millis(100))? {
        if let Event::Key(key) = event::read()? {
            handle_key_event(app, key);
        }
    }
    Ok(app.should_quit)
}

pub fn handle_key_event<S: TableStore>(app: &mut App<S>, key: KeyEvent) {
    // Handle Ctrl+C globally
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        if app.mode == Mode::Insert {
            app.enter_normal_mode();
        } else {
            app.should_quit = true;
        }
        return;
    }

    match app.mode {
        Mode::Normal => handle_normal_mode(app, key),
        Mode::Insert => handle_insert_mode(app, key),
        Mode::Command => handle_command_mode(app, key),
    }
}

fn handle_normal_mode<S: TableStore>(app: &mut App<S>, key: KeyEvent) {
    let on_input = app.focus == Focus::Input;
    match key.code {
        // Mode switching
        KeyCode::Char('i') => app.enter_insert_mode(),
        KeyCode::Char('I') => {
            app.move_cursor_start();
            app.enter_insert_mode();
        }
        KeyCode::Char('a') => {
            app.move_cursor_right();
            app.enter_insert_mode();
        }
        KeyCode::Char('A') => {
            app.move_cursor_end();
            app.enter_insert_mode();
        }
        KeyCode::Char(':') => app.enter_command_mode(),

        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => app.toggle_focus(),

        KeyCode::Char('h') | KeyCode::Left if on_input => app.move_cursor_left(),
        KeyCode::Char('h') | KeyCode::Left => app.scroll_results_left(),
        KeyCode::Char('l') | KeyCode::Right if on_input => app.move_cursor_right(),
        KeyCode::Char('l') | KeyCode::Right => app.scroll_results_right(),
        KeyCode::Char('j') | KeyCode::Down if on_input => app.history_down(),
        KeyCode::Char('j') | KeyCode::Down => app.scroll_results_down(),
        KeyCode::Char('k') | KeyCode::Up if on_input => app.history_up(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_results_up(),
        KeyCode::Char('0') if on_input => app.move_cursor_start(),
        KeyCode::Char('$') if on_input => app.move_cursor_end(),
        KeyCode::Char('w') if on_input => app.move_cursor_word_forward(),
        KeyCode::Char('b') if on_input => app.move_cursor_word_backward(),
        KeyCode::Char('g') if !on_input => app.scroll_to_top(),
        KeyCode::Char('G') if !on_input => app.scroll_to_bottom(),

        // Page navigation
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_down(),
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => app.page_up(),

        KeyCode::Char('x') if on_input => app.delete_char_forward(),
        KeyCode::Char('D') if on_input => app.delete_to_end(),

        KeyCode::Enter => app.submit(),

        _ => {}
    }
}

fn handle_insert_mode<S: TableStore>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.enter_normal_mode(),
        // stay in insert mode so the next command can be typed right away
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Delete => app.delete_char_forward(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_start(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::Up => app.history_up(),
        KeyCode::Down => app.history_down(),

        // Ctrl shortcuts
        KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.delete_word_backward();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.delete_to_start();
        }
        KeyCode::Char('k') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.delete_to_end();
        }
        KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.move_cursor_start();
        }
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.move_cursor_end();
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.transcript.clear();
        }

        KeyCode::Char(c) => app.insert_char(c),

        _ => {}
    }
}

fn handle_command_mode<S: TableStore>(app: &mut App<S>, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.command_buffer.clear();
            app.enter_normal_mode();
        }
        KeyCode::Enter => app.execute_command(),
        KeyCode::Backspace => {
            app.command_buffer.pop();
            if app.command_buffer.is_empty() {
                app.enter_normal_mode();
            }
        }
        KeyCode::Char(c) => app.command_buffer.push(c),
        _ => {}
    }
}
