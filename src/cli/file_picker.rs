use std::path::{Path, PathBuf};

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::error::Result;
use crate::tui::{FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE};

const REPORT_EXTENSIONS: &[&str] = &["xlsx", "xls", "ods"];

pub fn is_report_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| REPORT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

pub enum PickerAction {
    Continue,
    Picked(PathBuf),
    Cancel,
}

/// Directory browser listing sub-directories and spreadsheet files.
pub struct FilePicker {
    dir: PathBuf,
    entries: Vec<Entry>,
    selection: usize,
    scroll: usize,
    error: Option<String>,
}

impl FilePicker {
    pub fn new(start: &Path) -> Self {
        let dir = if start.is_dir() {
            start.to_path_buf()
        } else {
            start
                .parent()
                .filter(|p| p.is_dir())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
        };
        let mut picker = Self {
            dir,
            entries: Vec::new(),
            selection: 0,
            scroll: 0,
            error: None,
        };
        picker.refresh();
        picker
    }

    fn refresh(&mut self) {
        self.selection = 0;
        self.scroll = 0;
        match list_dir(&self.dir) {
            Ok(entries) => {
                self.entries = entries;
                self.error = None;
            }
            Err(e) => {
                self.entries = Vec::new();
                self.error = Some(e.to_string());
            }
        }
        if let Some(parent) = self.dir.parent() {
            self.entries.insert(
                0,
                Entry {
                    name: "..".into(),
                    path: parent.to_path_buf(),
                    is_dir: true,
                },
            );
        }
    }

    fn enter(&mut self, dir: PathBuf) {
        self.dir = dir;
        self.refresh();
    }

    pub fn handle_key(&mut self, code: KeyCode) -> PickerAction {
        match code {
            KeyCode::Up => self.selection = self.selection.saturating_sub(1),
            KeyCode::Down => {
                if self.selection + 1 < self.entries.len() {
                    self.selection += 1;
                }
            }
            KeyCode::PageUp => self.selection = self.selection.saturating_sub(10),
            KeyCode::PageDown => {
                self.selection = (self.selection + 10).min(self.entries.len().saturating_sub(1))
            }
            KeyCode::Backspace | KeyCode::Left => {
                if let Some(parent) = self.dir.parent().map(Path::to_path_buf) {
                    self.enter(parent);
                }
            }
            KeyCode::Enter | KeyCode::Right => {
                if let Some(entry) = self.entries.get(self.selection).cloned() {
                    if entry.is_dir {
                        self.enter(entry.path);
                    } else if code == KeyCode::Enter {
                        return PickerAction::Picked(entry.path);
                    }
                }
            }
            KeyCode::Esc => return PickerAction::Cancel,
            _ => {}
        }
        PickerAction::Continue
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let popup = centered(area, 70, 20);
        frame.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" Sélectionnez le fichier KDP ", HEADER_STYLE));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let [dir_area, list_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        frame.render_widget(
            Paragraph::new(self.dir.display().to_string()).style(FOOTER_STYLE),
            dir_area,
        );

        let height = list_area.height as usize;
        if height > 0 {
            if self.selection < self.scroll {
                self.scroll = self.selection;
            } else if self.selection >= self.scroll + height {
                self.scroll = self.selection + 1 - height;
            }
        }

        let lines: Vec<Line> = if let Some(err) = &self.error {
            vec![Line::from(Span::styled(err.clone(), Style::default().fg(Color::Red)))]
        } else {
            self.entries
                .iter()
                .enumerate()
                .skip(self.scroll)
                .take(height)
                .map(|(i, e)| {
                    let label = if e.is_dir {
                        format!(" {}/", e.name)
                    } else {
                        format!(" {}", e.name)
                    };
                    let style = if i == self.selection {
                        SELECTED_STYLE
                    } else if e.is_dir {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    };
                    Line::from(Span::styled(label, style))
                })
                .collect()
        };
        frame.render_widget(Paragraph::new(lines), list_area);

        frame.render_widget(
            Paragraph::new(" Enter=ouvrir/choisir  Backspace=dossier parent  Esc=annuler")
                .style(FOOTER_STYLE),
            hints_area,
        );
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

/// Visible sub-directories then report files, each sorted by name.
fn list_dir(dir: &Path) -> Result<Vec<Entry>> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for item in std::fs::read_dir(dir)? {
        let item = item?;
        let name = item.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        let path = item.path();
        if path.is_dir() {
            dirs.push(Entry { name, path, is_dir: true });
        } else if is_report_file(&path) {
            files.push(Entry { name, path, is_dir: false });
        }
    }
    dirs.sort_by_key(|e| e.name.to_lowercase());
    files.sort_by_key(|e| e.name.to_lowercase());
    dirs.extend(files);
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("rapports")).unwrap();
        std::fs::create_dir(dir.path().join(".cache")).unwrap();
        std::fs::write(dir.path().join("KDP_mars.xlsx"), b"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();
        std::fs::write(dir.path().join("ancien.ODS"), b"").unwrap();
        std::fs::write(dir.path().join("rapports").join("avril.xlsx"), b"").unwrap();
        dir
    }

    fn names(p: &FilePicker) -> Vec<&str> {
        p.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_lists_dirs_then_report_files() {
        let dir = setup();
        let picker = FilePicker::new(dir.path());
        assert_eq!(names(&picker), vec!["..", "rapports", "ancien.ODS", "KDP_mars.xlsx"]);
    }

    #[test]
    fn test_enter_directory_and_pick_file() {
        let dir = setup();
        let mut picker = FilePicker::new(dir.path());
        picker.handle_key(KeyCode::Down);
        picker.handle_key(KeyCode::Enter);
        assert_eq!(names(&picker), vec!["..", "avril.xlsx"]);
        picker.handle_key(KeyCode::Down);
        match picker.handle_key(KeyCode::Enter) {
            PickerAction::Picked(path) => {
                assert_eq!(path, dir.path().join("rapports").join("avril.xlsx"))
            }
            _ => panic!("expected a picked file"),
        }
    }

    #[test]
    fn test_backspace_goes_to_parent() {
        let dir = setup();
        let mut picker = FilePicker::new(&dir.path().join("rapports"));
        picker.handle_key(KeyCode::Backspace);
        assert_eq!(picker.dir, dir.path());
    }

    #[test]
    fn test_start_from_file_opens_its_directory() {
        let dir = setup();
        let picker = FilePicker::new(&dir.path().join("KDP_mars.xlsx"));
        assert_eq!(picker.dir, dir.path());
    }

    #[test]
    fn test_esc_cancels() {
        let dir = setup();
        let mut picker = FilePicker::new(dir.path());
        assert!(matches!(picker.handle_key(KeyCode::Esc), PickerAction::Cancel));
    }

    #[test]
    fn test_is_report_file() {
        assert!(is_report_file(Path::new("a.xlsx")));
        assert!(is_report_file(Path::new("a.XLS")));
        assert!(!is_report_file(Path::new("a.csv")));
        assert!(!is_report_file(Path::new("xlsx")));
    }
}
