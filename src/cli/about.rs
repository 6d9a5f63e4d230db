use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::error::Result;
use crate::tui::HEADER_STYLE;

pub const TITLE: &str = "Générateur de factures Word et PDF pour les revenus Amazon KDP";

pub fn version_text() -> String {
    format!(
        "{TITLE}\nVersion: {}\n\nFormats : DOCX, PDF\nFeuille lue : Paiements\nConfiguration : {}",
        env!("CARGO_PKG_VERSION"),
        crate::settings::default_config_path().display()
    )
}

pub fn run() -> Result<()> {
    println!("{}", version_text());
    Ok(())
}

pub fn draw(frame: &mut Frame, area: Rect) {
    let [title_area, _gap, body_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(Span::styled("Version", HEADER_STYLE)),
        title_area,
    );
    let lines: Vec<Line> = version_text().lines().map(|l| Line::from(l.to_string())).collect();
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), body_area);
}
