use std::io::BufWriter;

use printpdf::*;

use crate::error::{InvoiceError, Result};
use crate::fmt;
use crate::invoice::{Invoice, Party, TABLE_HEADERS};

// A4 dimensions (mm)
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 15.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_RIGHT: f32 = 20.0;
const LINE_H: f32 = 5.0;
const CELL_H: f32 = 7.0;
const FONT_SIZE: f32 = 10.0;
const TABLE_FONT_SIZE: f32 = 8.0;
const TITLE_SIZE: f32 = 12.0;

const COL_WIDTHS: [f32; 6] = [24.0, 58.0, 18.0, 24.0, 20.0, 26.0];

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

/// The builtin Helvetica fonts only cover ASCII reliably: strip accents and
/// spell out the euro sign.
pub fn ascii_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'à' | 'â' | 'ä' | 'á' => out.push('a'),
            'À' | 'Â' | 'Ä' | 'Á' => out.push('A'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'É' | 'È' | 'Ê' | 'Ë' => out.push('E'),
            'î' | 'ï' | 'í' => out.push('i'),
            'Î' | 'Ï' | 'Í' => out.push('I'),
            'ô' | 'ö' | 'ó' => out.push('o'),
            'Ô' | 'Ö' | 'Ó' => out.push('O'),
            'ù' | 'û' | 'ü' | 'ú' => out.push('u'),
            'Ù' | 'Û' | 'Ü' | 'Ú' => out.push('U'),
            'ç' => out.push('c'),
            'Ç' => out.push('C'),
            'ñ' => out.push('n'),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            '€' => out.push_str("EUR"),
            '°' => out.push('o'),
            '\u{a0}' | '\u{202f}' => out.push(' '),
            '\u{2019}' | '\u{2018}' => out.push('\''),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Shorten `text` so it fits in `width` at `size`.
fn fit(text: &str, width: f32, size: f32) -> String {
    let max_chars = ((width - 2.0) / (size * 0.18)).floor().max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut s: String = text.chars().take(max_chars.saturating_sub(2)).collect();
    s.push_str("..");
    s
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy)]
enum Style {
    Regular,
    Bold,
    Italic,
}

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    font_italic: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| InvoiceError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| InvoiceError::Pdf(format!("{e:?}")))?;
        let font_italic = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| InvoiceError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            font_italic,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
        })
    }

    fn pdf_y(&self) -> f32 {
        PAGE_H - self.y
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
        self.current_page = page;
        self.current_layer = layer;
        self.y = MARGIN_TOP;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > PAGE_H - MARGIN_BOTTOM {
            self.new_page();
        }
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
    }

    /// Draw text with its baseline at `baseline` (mm from the top).
    fn text_at(&self, s: &str, x: f32, baseline: f32, size: f32, style: Style) {
        let font = match style {
            Style::Regular => &self.font,
            Style::Bold => &self.font_bold,
            Style::Italic => &self.font_italic,
        };
        self.layer()
            .use_text(ascii_safe(s), size, Mm(x), Mm(PAGE_H - baseline), font);
    }

    fn text(&self, s: &str, x: f32, size: f32, style: Style) {
        self.text_at(s, x, self.y, size, style);
    }

    /// One line of text across the printable width, then advance.
    fn line(&mut self, s: &str, size: f32, style: Style, align: Align) {
        self.ensure_space(LINE_H);
        let s = ascii_safe(s);
        let tw = approx_text_width(&s, size);
        let x = match align {
            Align::Left => MARGIN_LEFT,
            Align::Center => (PAGE_W - tw) / 2.0,
            Align::Right => PAGE_W - MARGIN_RIGHT - tw,
        };
        self.y += LINE_H * 0.8;
        self.text(&s, x, size, style);
        self.y += LINE_H * 0.2;
    }

    fn wrapped(&mut self, s: &str, size: f32, style: Style) {
        let width = ((PAGE_W - MARGIN_LEFT - MARGIN_RIGHT) / (size * 0.18)) as usize;
        for paragraph in s.lines() {
            for line in textwrap::wrap(paragraph, width.max(20)) {
                self.line(&line, size, style, Align::Left);
            }
        }
    }

    fn gap(&mut self, h: f32) {
        self.y += h;
    }

    fn rect(&self, x: f32, top: f32, w: f32, h: f32) {
        let layer = self.layer();
        layer.set_outline_thickness(0.3);
        let (left, right) = (Mm(x), Mm(x + w));
        let (upper, lower) = (Mm(PAGE_H - top), Mm(PAGE_H - top - h));
        layer.add_line(Line {
            points: vec![
                (Point::new(left, upper), false),
                (Point::new(right, upper), false),
                (Point::new(right, lower), false),
                (Point::new(left, lower), false),
            ],
            is_closed: true,
        });
    }

    /// A row of bordered cells, as in a grid table.
    fn grid_row(&mut self, values: &[String], aligns: &[Align], style: Style) {
        self.ensure_space(CELL_H);
        let top = self.y;
        let baseline = top + CELL_H * 0.68;
        let mut x = MARGIN_LEFT;
        for (i, width) in COL_WIDTHS.iter().enumerate() {
            self.rect(x, top, *width, CELL_H);
            if let Some(value) = values.get(i) {
                let v = fit(&ascii_safe(value), *width, TABLE_FONT_SIZE);
                let tw = approx_text_width(&v, TABLE_FONT_SIZE);
                let tx = match aligns.get(i).copied().unwrap_or(Align::Left) {
                    Align::Left => x + 1.0,
                    Align::Center => x + (width - tw) / 2.0,
                    Align::Right => x + width - tw - 1.0,
                };
                self.text_at(&v, tx, baseline, TABLE_FONT_SIZE, style);
            }
            x += width;
        }
        self.y += CELL_H;
    }

    fn party(&mut self, party: &Party) {
        for l in &party.address_lines {
            self.line(l, FONT_SIZE, Style::Regular, Align::Left);
        }
        for (label, value) in &party.identifiers {
            self.line(&format!("{label} : {value}"), FONT_SIZE, Style::Regular, Align::Left);
        }
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| InvoiceError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| InvoiceError::Pdf(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Invoice rendering
// ---------------------------------------------------------------------------

pub fn render_invoice(invoice: &Invoice) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new(&format!("Facture {}", invoice.number))?;

    // Seller
    pdf.line(&invoice.seller.name, TITLE_SIZE, Style::Bold, Align::Left);
    pdf.party(&invoice.seller);
    pdf.gap(10.0);

    // Client
    pdf.line("Destinataire de la facture", 11.0, Style::Bold, Align::Left);
    pdf.gap(2.0);
    pdf.line(&invoice.client.name, FONT_SIZE, Style::Regular, Align::Left);
    pdf.party(&invoice.client);
    pdf.gap(10.0);

    // Invoice information
    pdf.line(&format!("Facture n° : {}", invoice.number), TITLE_SIZE, Style::Bold, Align::Left);
    let info = [
        format!("Date de la facture : {}", invoice.issue_date),
        format!("Période concernée : {}", invoice.period_label()),
        format!("Date de paiement constatée : {}", invoice.payment_date),
        format!("Mode de règlement : {}", invoice.payment_method),
        format!("IBAN : {}", invoice.iban),
        format!("BIC : {}", invoice.bic),
    ];
    for l in &info {
        pdf.line(l, FONT_SIZE, Style::Regular, Align::Left);
    }
    pdf.gap(10.0);

    let headers: Vec<String> = TABLE_HEADERS.iter().map(|h| h.to_string()).collect();
    let header_aligns = [Align::Center; 6];
    let aligns = [
        Align::Left,
        Align::Left,
        Align::Left,
        Align::Right,
        Align::Right,
        Align::Right,
    ];

    for table in &invoice.markets {
        // Keep the title with at least the header and one row.
        pdf.ensure_space(LINE_H + CELL_H * 3.0);
        pdf.line(
            &format!("Détail pour le marché : {}", table.market),
            11.0,
            Style::Bold,
            Align::Center,
        );
        pdf.gap(1.0);
        pdf.grid_row(&headers, &header_aligns, Style::Bold);
        for l in &table.lines {
            pdf.grid_row(&l.cells(), &aligns, Style::Regular);
        }
        pdf.grid_row(&table.total_cells(), &aligns, Style::Bold);
        pdf.gap(8.0);
    }

    // Totals
    pdf.gap(5.0);
    pdf.line(
        &format!("Montant total HT : {}", fmt::euro(invoice.total_ht)),
        FONT_SIZE,
        Style::Regular,
        Align::Right,
    );
    pdf.line("TVA : 0,00 € (Autoliquidation)", FONT_SIZE, Style::Regular, Align::Right);
    pdf.gap(2.0);
    pdf.line(
        &format!("Montant TTC : {}", fmt::euro(invoice.total_ttc())),
        TITLE_SIZE,
        Style::Bold,
        Align::Right,
    );
    pdf.gap(10.0);
    if !invoice.reverse_charge_notice.is_empty() {
        pdf.wrapped(&invoice.reverse_charge_notice, 9.0, Style::Italic);
    }

    pdf.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{DetailLine, MarketAggregate, MarketSummary, Period};
    use crate::settings::Config;

    fn sample_invoice(markets: usize) -> Invoice {
        let summary = MarketSummary {
            markets: (0..markets)
                .map(|i| MarketAggregate {
                    market: format!("Amazon.{i}"),
                    origin_currency: "USD".into(),
                    exchange_rate: Some(0.92),
                    total_origine: 100.0,
                    total_eur: 92.0,
                    details: vec![DetailLine {
                        designation: "Kindle eBook, édition très longue pour tester la coupe".into(),
                        currency: "USD".into(),
                        amount: 100.0,
                    }],
                })
                .collect(),
        };
        let mut config = Config::template();
        config.set("entreprise", "nom", "Jérôme Écrivain");
        Invoice::build(&config, &summary, Period::new(2024, 3).unwrap(), None, None)
    }

    #[test]
    fn test_render_invoice_produces_pdf() {
        let bytes = render_invoice(&sample_invoice(2)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_many_markets_spans_pages() {
        let bytes = render_invoice(&sample_invoice(30)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_ascii_safe() {
        assert_eq!(ascii_safe("Détail pour le marché"), "Detail pour le marche");
        assert_eq!(ascii_safe("92.50 €"), "92.50 EUR");
        assert_eq!(ascii_safe("Facture n°"), "Facture no");
        assert_eq!(ascii_safe("plain"), "plain");
    }

    #[test]
    fn test_fit_truncates_long_cells() {
        assert_eq!(fit("US", 24.0, 8.0), "US");
        let long = fit(&"x".repeat(100), 24.0, 8.0);
        assert!(long.ends_with(".."));
        assert!(long.len() < 20);
    }
}
