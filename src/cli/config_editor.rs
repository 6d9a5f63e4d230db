use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::error::InvoiceError;
use crate::settings::{is_multiline, read_config, validate_and_save, Config, FieldProblem, SaveError};
use crate::tui::{
    TextField, ERROR_STYLE, FOOTER_STYLE, HEADER_STYLE, INVALID_STYLE, SELECTED_STYLE,
    SUCCESS_STYLE,
};

/// State of the "Paramétrage" tab: every section/field of the config file.
pub struct ConfigEditor {
    path: PathBuf,
    config: Config,
    selection: usize,
    scroll: usize,
    editing: Option<TextField>,
    problems: Vec<FieldProblem>,
    status: Option<(bool, String)>,
    /// Set when the file exists but could not be read; saving is refused.
    load_error: Option<String>,
}

impl ConfigEditor {
    pub fn load(path: &Path) -> Self {
        let (config, status, load_error) = match read_config(path) {
            Ok(c) => (c, None, None),
            Err(e @ InvoiceError::ConfigNotFound(_)) => (
                Config::template(),
                Some((false, format!("{e} Modèle chargé, à compléter puis enregistrer."))),
                None,
            ),
            Err(e) => (
                Config::default(),
                Some((false, format!("Lecture impossible : {e}"))),
                Some(e.to_string()),
            ),
        };
        Self {
            path: path.to_path_buf(),
            config,
            selection: 0,
            scroll: 0,
            editing: None,
            problems: Vec::new(),
            status,
            load_error,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    /// (section, field) pairs in display order.
    fn rows(&self) -> Vec<(String, String)> {
        self.config
            .sections
            .iter()
            .flat_map(|(s, fields)| fields.keys().map(move |f| (s.clone(), f.clone())))
            .collect()
    }

    fn selected(&self) -> Option<(String, String)> {
        self.rows().into_iter().nth(self.selection)
    }

    fn problem_for(&self, section: &str, field: &str) -> Option<&FieldProblem> {
        self.problems
            .iter()
            .find(|p| p.section == section && p.field == field)
    }

    pub fn save(&mut self) {
        if let Some(e) = &self.load_error {
            self.status = Some((
                false,
                format!("{e} Corrigez le fichier puis rechargez (r) ; rien n'a été enregistré."),
            ));
            return;
        }
        match validate_and_save(self.config.clone(), &self.path) {
            Ok(saved) => {
                self.config = saved;
                self.problems.clear();
                self.status = Some((true, "Configuration enregistrée.".into()));
            }
            Err(SaveError::Invalid(problems)) => {
                self.status = Some((
                    false,
                    format!("{} erreur(s) de validation, rien n'a été enregistré.", problems.len()),
                ));
                self.problems = problems;
            }
            Err(SaveError::Write(e)) => {
                self.status = Some((false, format!("Enregistrement impossible : {e}")));
            }
        }
    }

    fn commit_edit(&mut self) {
        if let (Some(field), Some((section, name))) = (self.editing.take(), self.selected()) {
            self.config.set(&section, &name, field.value);
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let code = key.code;
        if key.modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('s') {
            self.commit_edit();
            self.save();
            return;
        }

        let multiline = self
            .selected()
            .is_some_and(|(_, name)| is_multiline(&name));
        if let Some(field) = self.editing.as_mut() {
            match code {
                KeyCode::Enter if multiline => field.insert('\n'),
                KeyCode::Enter => self.commit_edit(),
                KeyCode::Esc if multiline => self.commit_edit(),
                KeyCode::Esc => self.editing = None,
                other => {
                    field.handle_key(other);
                }
            }
            return;
        }

        let count = self.rows().len();
        match code {
            KeyCode::Up => self.selection = self.selection.saturating_sub(1),
            KeyCode::Down => {
                if self.selection + 1 < count {
                    self.selection += 1;
                }
            }
            KeyCode::Enter => {
                if let Some((section, name)) = self.selected() {
                    let value = self.config.get(&section, &name).unwrap_or("").to_string();
                    self.editing = Some(TextField::new(value));
                    self.status = None;
                }
            }
            KeyCode::Char('s') => self.save(),
            KeyCode::Char('r') => {
                let selection = self.selection;
                *self = Self::load(&self.path);
                self.selection = selection.min(self.rows().len().saturating_sub(1));
            }
            _ => {}
        }
    }

    pub fn draw(&mut self, frame: &mut Frame, area: Rect) {
        let [list_area, status_area, hints_area] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(self.status_height()),
            Constraint::Length(1),
        ])
        .areas(area);

        let block = Block::default().borders(Borders::ALL).title(Span::styled(
            format!(" {} ", self.path.display()),
            HEADER_STYLE,
        ));
        let inner_height = list_area.height.saturating_sub(2) as usize;

        let mut lines: Vec<Line> = Vec::new();
        let mut selected_line = 0;
        let mut current_section = String::new();
        for (i, (section, name)) in self.rows().into_iter().enumerate() {
            if section != current_section {
                if !current_section.is_empty() {
                    lines.push(Line::from(""));
                }
                lines.push(Line::from(Span::styled(
                    format!("[{section}]"),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                current_section = section.clone();
            }
            if i == self.selection {
                selected_line = lines.len();
            }
            lines.extend(self.field_lines(i, &section, &name));
        }

        if inner_height > 0 {
            if selected_line < self.scroll {
                self.scroll = selected_line;
            } else if selected_line >= self.scroll + inner_height {
                self.scroll = selected_line + 1 - inner_height;
            }
        }
        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .scroll((u16::try_from(self.scroll).unwrap_or(u16::MAX), 0)),
            list_area,
        );

        let mut status_lines = Vec::new();
        if let Some((ok, message)) = &self.status {
            let style = if *ok { SUCCESS_STYLE } else { ERROR_STYLE };
            status_lines.push(Line::from(Span::styled(message.clone(), style)));
        }
        for p in &self.problems {
            status_lines.push(Line::from(Span::styled(p.to_string(), ERROR_STYLE)));
        }
        frame.render_widget(Paragraph::new(status_lines), status_area);

        let hints = if self.is_editing() {
            " Entrée=valider  Échap=annuler (multi-lignes : Entrée=nouvelle ligne, Échap=valider)"
        } else {
            " Haut/Bas=champ  Entrée=modifier  s=enregistrer  r=recharger  Tab=onglet"
        };
        frame.render_widget(Paragraph::new(hints).style(FOOTER_STYLE), hints_area);
    }

    fn status_height(&self) -> u16 {
        let n = self.problems.len() + usize::from(self.status.is_some());
        n.min(8) as u16
    }

    fn field_lines(&self, i: usize, section: &str, name: &str) -> Vec<Line<'static>> {
        let selected = i == self.selection;
        let invalid = self.problem_for(section, name).is_some();
        let label_style = if invalid {
            INVALID_STYLE
        } else if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let value = match (&self.editing, selected) {
            (Some(field), true) => field.display(true),
            _ => self.config.get(section, name).unwrap_or("").to_string(),
        };
        let value_style = if selected {
            SELECTED_STYLE
        } else if invalid {
            INVALID_STYLE
        } else {
            Style::default().fg(Color::Gray)
        };

        let marker = if invalid { "!" } else { " " };
        let mut out = Vec::new();
        for (n, part) in value.split('\n').enumerate() {
            let label = if n == 0 {
                format!(" {marker} {name:<22}")
            } else {
                format!("   {:<22}", "")
            };
            out.push(Line::from(vec![
                Span::styled(label, label_style),
                Span::styled(part.to_string(), value_style),
            ]));
        }
        out
    }
}
