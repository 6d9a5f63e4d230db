use std::path::{Path, PathBuf};

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::fmt::month_name;
use crate::generator::{GenerationOutcome, GenerationRequest, LogLevel, LogLine};
use crate::models::OutputFormat;
use crate::reports::Period;
use crate::tui::{log_lines, TextField, FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE};

const FIELD_FILE: usize = 0;
const FIELD_YEAR: usize = 1;
const FIELD_MONTH: usize = 2;
const FIELD_FORMAT: usize = 3;
const FIELD_BUTTON: usize = 4;

pub enum GenerationAction {
    Continue,
    OpenPicker,
    Submit(GenerationRequest),
}

/// State of the "Génération" tab.
pub struct GenerationForm {
    pub source: Option<PathBuf>,
    year: TextField,
    month: u32,
    format: OutputFormat,
    active_field: usize,
    pub busy: bool,
    log: Vec<LogLine>,
    /// Lines scrolled up from the bottom of the log.
    log_scroll: u16,
    config_path: PathBuf,
}

impl GenerationForm {
    pub fn new(config_path: &Path, today: chrono::NaiveDate) -> Self {
        let previous = Period::previous_month(today);
        Self {
            source: None,
            year: TextField::new(previous.year.to_string()),
            month: previous.month,
            format: OutputFormat::Both,
            active_field: FIELD_FILE,
            busy: false,
            log: Vec::new(),
            log_scroll: 0,
            config_path: config_path.to_path_buf(),
        }
    }

    pub fn push_log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log.push(LogLine {
            level,
            message: message.into(),
        });
        self.log_scroll = 0;
    }

    /// Check the form and build the request, or explain what is wrong.
    fn request(&self) -> Result<GenerationRequest, String> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| "Veuillez sélectionner un fichier.".to_string())?;
        let year_text = self.year.value.trim();
        if year_text.is_empty() || !year_text.chars().all(|c| c.is_ascii_digit()) {
            return Err("Année et mois invalides.".into());
        }
        let year: i32 = year_text
            .parse()
            .map_err(|_| "Année et mois invalides.".to_string())?;
        Ok(GenerationRequest::new(
            source,
            year,
            self.month,
            self.format,
            &self.config_path,
        ))
    }

    fn submit(&mut self) -> GenerationAction {
        if self.busy {
            return GenerationAction::Continue;
        }
        match self.request() {
            Ok(request) => {
                self.log.clear();
                self.push_log(LogLevel::Info, "Lancement de la génération...");
                GenerationAction::Submit(request)
            }
            Err(message) => {
                self.push_log(LogLevel::Error, message);
                GenerationAction::Continue
            }
        }
    }

    /// Record a finished run. Returns the files to open.
    pub fn finish(&mut self, outcome: GenerationOutcome) -> Vec<PathBuf> {
        self.busy = false;
        self.log.extend(outcome.log);
        self.log_scroll = 0;
        if !outcome.success {
            return Vec::new();
        }
        for f in &outcome.files {
            self.push_log(LogLevel::Info, format!("Ouverture : {}", f.display()));
        }
        outcome.files
    }

    fn cycle_month(&mut self, forward: bool) {
        self.month = if forward {
            self.month % 12 + 1
        } else {
            (self.month + 10) % 12 + 1
        };
    }

    fn cycle_format(&mut self, forward: bool) {
        let all = OutputFormat::ALL;
        let i = all.iter().position(|f| *f == self.format).unwrap_or(0);
        let next = if forward {
            (i + 1) % all.len()
        } else {
            (i + all.len() - 1) % all.len()
        };
        self.format = all[next];
    }

    pub fn handle_key(&mut self, code: KeyCode) -> GenerationAction {
        match code {
            KeyCode::Up => {
                self.active_field = self.active_field.saturating_sub(1);
                return GenerationAction::Continue;
            }
            KeyCode::Down => {
                self.active_field = (self.active_field + 1).min(FIELD_BUTTON);
                return GenerationAction::Continue;
            }
            KeyCode::PageUp => {
                self.log_scroll = self.log_scroll.saturating_add(5);
                return GenerationAction::Continue;
            }
            KeyCode::PageDown => {
                self.log_scroll = self.log_scroll.saturating_sub(5);
                return GenerationAction::Continue;
            }
            _ => {}
        }

        match self.active_field {
            FIELD_FILE => {
                if code == KeyCode::Enter {
                    return GenerationAction::OpenPicker;
                }
            }
            FIELD_YEAR => {
                if code == KeyCode::Enter {
                    self.active_field = FIELD_MONTH;
                } else if let KeyCode::Char(c) = code {
                    if c.is_ascii_digit() {
                        self.year.insert(c);
                    }
                } else {
                    self.year.handle_key(code);
                }
            }
            FIELD_MONTH => match code {
                KeyCode::Left => self.cycle_month(false),
                KeyCode::Right | KeyCode::Char(' ') => self.cycle_month(true),
                KeyCode::Enter => self.active_field = FIELD_FORMAT,
                _ => {}
            },
            FIELD_FORMAT => match code {
                KeyCode::Left => self.cycle_format(false),
                KeyCode::Right | KeyCode::Char(' ') => self.cycle_format(true),
                KeyCode::Enter => self.active_field = FIELD_BUTTON,
                _ => {}
            },
            _ => {
                if code == KeyCode::Enter {
                    return self.submit();
                }
            }
        }
        GenerationAction::Continue
    }

    fn field_line(&self, idx: usize, label: &str, value: String) -> Line<'static> {
        let active = self.active_field == idx;
        let label_style = if active {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let value_style = if active {
            SELECTED_STYLE
        } else {
            Style::default().fg(Color::Gray)
        };
        Line::from(vec![
            Span::styled(format!("{label:<20}"), label_style),
            Span::styled(value, value_style),
        ])
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let [form_area, _gap, button_area, log_area, hints_area] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        let file = self
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(aucun fichier, Entrée pour parcourir)".to_string());
        let formats: Vec<String> = OutputFormat::ALL
            .iter()
            .map(|f| {
                if *f == self.format {
                    format!("(•) {}", f.label())
                } else {
                    format!("( ) {}", f.label())
                }
            })
            .collect();
        let lines = vec![
            self.field_line(FIELD_FILE, "Fichier KDP :", file),
            self.field_line(
                FIELD_YEAR,
                "Année :",
                self.year.display(self.active_field == FIELD_YEAR),
            ),
            self.field_line(
                FIELD_MONTH,
                "Mois :",
                format!("< {:>2} > {}", self.month, month_name(self.month)),
            ),
            self.field_line(FIELD_FORMAT, "Format de sortie :", formats.join("  ")),
        ];
        frame.render_widget(Paragraph::new(lines), form_area);

        let (label, style) = if self.busy {
            ("[ Génération en cours... ]", Style::default().fg(Color::DarkGray))
        } else if self.active_field == FIELD_BUTTON {
            (
                "[ Générer la facture ]",
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )
        } else {
            ("[ Générer la facture ]", Style::default())
        };
        frame.render_widget(
            Paragraph::new(Span::styled(label, style)).alignment(ratatui::layout::Alignment::Center),
            button_area,
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(" Journal ", HEADER_STYLE));
        let inner_width = log_area.width.saturating_sub(2) as usize;
        let inner_height = log_area.height.saturating_sub(2);
        let lines = log_lines(&self.log, inner_width);
        let offset = log_offset(lines.len(), inner_height, self.log_scroll);
        frame.render_widget(Paragraph::new(lines).block(block).scroll((offset, 0)), log_area);

        frame.render_widget(
            Paragraph::new(" Haut/Bas=champ  Gauche/Droite=choisir  Entrée=valider  PgUp/PgDn=journal  Tab=onglet  Ctrl-C=quitter")
                .style(FOOTER_STYLE),
            hints_area,
        );
    }
}

/// First visible log line: the bottom of the log, moved up by `scroll_up`.
fn log_offset(total_lines: usize, height: u16, scroll_up: u16) -> u16 {
    let total = u16::try_from(total_lines).unwrap_or(u16::MAX);
    total.saturating_sub(height).saturating_sub(scroll_up)
}
