use crossterm::event::KeyCode;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::generator::{LogLevel, LogLine};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const SUCCESS_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));
pub const ERROR_STYLE: Style = Style::new().fg(Color::Red);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

pub const INVALID_STYLE: Style = Style::new()
    .fg(Color::Red)
    .add_modifier(Modifier::BOLD);

/// Wrap text to a given width. Returns (wrapped_string, line_count).
pub fn wrap_text(text: &str, width: usize) -> (String, u16) {
    if width == 0 {
        return (text.to_string(), 1);
    }
    let wrapped = textwrap::fill(text, width);
    let lines = u16::try_from(wrapped.lines().count().max(1)).unwrap_or(u16::MAX);
    (wrapped, lines)
}

/// Log lines coloured by level, wrapped to `width`.
pub fn log_lines(log: &[LogLine], width: usize) -> Vec<Line<'static>> {
    log.iter()
        .flat_map(|entry| {
            let style = match entry.level {
                LogLevel::Info => Style::default(),
                LogLevel::Success => SUCCESS_STYLE,
                LogLevel::Error => ERROR_STYLE,
            };
            let (wrapped, _) = wrap_text(&entry.message, width);
            wrapped
                .lines()
                .map(|l| Line::from(Span::styled(l.to_string(), style)))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Build a display string with a block cursor inserted at `cursor_pos`.
pub fn insert_cursor(value: &str, cursor_pos: usize) -> String {
    let mut display = value.to_string();
    let byte_pos = display
        .char_indices()
        .nth(cursor_pos)
        .map(|(i, _)| i)
        .unwrap_or(display.len());
    display.insert(byte_pos, '\u{2588}');
    display
}

/// A single editable text value with a char-indexed cursor.
#[derive(Debug, Clone, Default)]
pub struct TextField {
    pub value: String,
    pub cursor: usize,
}

impl TextField {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    /// Convert the char-index cursor to a byte offset in the value.
    fn byte_pos(&self) -> usize {
        self.value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let pos = self.byte_pos();
        self.value.insert(pos, c);
        self.cursor += 1;
    }

    /// Apply an editing key. Returns false for keys that are not edits, so
    /// callers can use them for navigation.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let pos = self.byte_pos();
                    self.value.remove(pos);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    let pos = self.byte_pos();
                    self.value.remove(pos);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.len()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.len(),
            _ => return false,
        }
        true
    }

    pub fn display(&self, active: bool) -> String {
        if active {
            insert_cursor(&self.value, self.cursor)
        } else {
            self.value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_field_editing() {
        let mut f = TextField::new("2024");
        assert_eq!(f.cursor, 4);
        f.handle_key(KeyCode::Backspace);
        f.handle_key(KeyCode::Char('5'));
        assert_eq!(f.value, "2025");
        f.handle_key(KeyCode::Home);
        f.handle_key(KeyCode::Delete);
        assert_eq!(f.value, "025");
        assert_eq!(f.cursor, 0);
        assert!(!f.handle_key(KeyCode::Enter));
    }

    #[test]
    fn test_text_field_multibyte_cursor() {
        let mut f = TextField::new("Sàrl");
        f.handle_key(KeyCode::Left);
        f.handle_key(KeyCode::Left);
        f.handle_key(KeyCode::Backspace);
        assert_eq!(f.value, "Srl");
        assert_eq!(f.display(true), "S\u{2588}rl");
    }

    #[test]
    fn test_log_lines_wrap() {
        let log = vec![LogLine {
            level: LogLevel::Error,
            message: "un message assez long pour être coupé".into(),
        }];
        let lines = log_lines(&log, 12);
        assert!(lines.len() > 1);
    }
}
