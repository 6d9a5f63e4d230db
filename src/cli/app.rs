use std::path::Path;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout},
    style::{Color, Style},
    text::Line,
    widgets::{Paragraph, Tabs},
    Frame,
};

use super::about;
use super::config_editor::ConfigEditor;
use super::file_picker::{FilePicker, PickerAction};
use super::generation::{GenerationAction, GenerationForm};
use crate::error::Result;
use crate::generator::LogLevel;
use crate::opener::open_all;
use crate::tui::{HEADER_STYLE, SELECTED_STYLE};
use crate::worker::GenerationWorker;

const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Generation,
    Settings,
    Version,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Generation, Tab::Settings, Tab::Version];

    fn title(self) -> &'static str {
        match self {
            Tab::Generation => "Génération",
            Tab::Settings => "Paramétrage",
            Tab::Version => "Version",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

struct App {
    tab: Tab,
    form: GenerationForm,
    editor: ConfigEditor,
    picker: Option<FilePicker>,
    worker: GenerationWorker,
}

impl App {
    fn new(config_path: &Path) -> Self {
        Self {
            tab: Tab::Generation,
            form: GenerationForm::new(config_path, chrono::Local::now().date_naive()),
            editor: ConfigEditor::load(config_path),
            picker: None,
            worker: GenerationWorker::new(),
        }
    }

    /// Collect a finished generation and open what it produced.
    fn poll_worker(&mut self) {
        if let Some(outcome) = self.worker.try_recv() {
            let files = self.form.finish(outcome);
            for message in open_all(&files) {
                self.form.push_log(LogLevel::Error, message);
            }
        }
    }

    fn open_picker(&mut self) {
        let start = self
            .form
            .source
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| ".".into());
        self.picker = Some(FilePicker::new(&start));
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        if let Some(picker) = self.picker.as_mut() {
            match picker.handle_key(key.code) {
                PickerAction::Continue => {}
                PickerAction::Cancel => self.picker = None,
                PickerAction::Picked(path) => {
                    self.form.source = Some(path);
                    self.picker = None;
                }
            }
            return false;
        }

        let editing = self.tab == Tab::Settings && self.editor.is_editing();
        if !editing {
            match key.code {
                KeyCode::Tab => {
                    self.tab = self.tab.next();
                    return false;
                }
                KeyCode::BackTab => {
                    self.tab = self.tab.previous();
                    return false;
                }
                KeyCode::Char('q') => return true,
                _ => {}
            }
        }

        match self.tab {
            Tab::Generation => match self.form.handle_key(key.code) {
                GenerationAction::Continue => {}
                GenerationAction::OpenPicker => self.open_picker(),
                GenerationAction::Submit(request) => match self.worker.submit(request) {
                    Ok(()) => self.form.busy = true,
                    Err(e) => self.form.push_log(LogLevel::Error, format!("❌ Erreur : {e}")),
                },
            },
            Tab::Settings => self.editor.handle_key(key),
            Tab::Version => {}
        }
        false
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, tabs_area, body_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Fill(1),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" {}", about::TITLE)).style(HEADER_STYLE),
            header_area,
        );

        let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
        frame.render_widget(
            Tabs::new(titles)
                .select(self.tab.index())
                .style(Style::default().fg(Color::DarkGray))
                .highlight_style(SELECTED_STYLE)
                .divider("|"),
            tabs_area,
        );

        match self.tab {
            Tab::Generation => self.form.draw(frame, body_area),
            Tab::Settings => self.editor.draw(frame, body_area),
            Tab::Version => about::draw(frame, body_area),
        }

        if let Some(picker) = self.picker.as_mut() {
            picker.draw(frame, area);
        }
    }
}

/// Run the interactive app until the user quits.
pub fn run(config_path: &Path) -> Result<()> {
    let mut app = App::new(config_path);

    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let exit: Result<()> = loop {
        app.poll_worker();

        if let Err(e) = terminal.draw(|frame| app.draw(frame)) {
            break Err(e.into());
        }

        match event::poll(TICK) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => break Err(e.into()),
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key) {
                    break Ok(());
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    exit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(&dir.path().join("config.json"));
        (dir, app)
    }

    #[test]
    fn test_tab_cycles_through_tabs() {
        let (_dir, mut app) = app();
        assert_eq!(app.tab, Tab::Generation);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.tab, Tab::Settings);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.tab, Tab::Version);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.tab, Tab::Generation);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.tab, Tab::Version);
    }

    #[test]
    fn test_quit_keys() {
        let (_dir, mut app) = app();
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn test_tab_is_kept_by_field_being_edited() {
        let (_dir, mut app) = app();
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.editor.is_editing());
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.tab, Tab::Settings);
        assert!(!app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn test_enter_on_file_field_opens_picker() {
        let (dir, mut app) = app();
        app.form.source = Some(dir.path().join("kdp.xlsx"));
        app.handle_key(key(KeyCode::Enter));
        assert!(app.picker.is_some());
        app.handle_key(key(KeyCode::Esc));
        assert!(app.picker.is_none());
        assert_eq!(app.form.source, Some(dir.path().join("kdp.xlsx")));
    }
}
