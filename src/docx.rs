//! Minimal WordprocessingML writer for invoices.
//!
//! The package holds the three parts Word needs to open a document:
//! content types, the package relationships and `word/document.xml`.

use std::io::{Cursor, Write};

use quick_xml::events::{BytesDecl, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{InvoiceError, Result};
use crate::fmt;
use crate::invoice::{Invoice, TABLE_HEADERS};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

// Twentieths of a point.
const PAGE_W: &str = "11906";
const PAGE_H: &str = "16838";
const MARGIN_TB: &str = "720";
const MARGIN_LR: &str = "1152";

fn xml_err<E: std::fmt::Display>(e: E) -> InvoiceError {
    InvoiceError::Docx(e.to_string())
}

#[derive(Clone, Copy)]
struct RunStyle {
    bold: bool,
    italic: bool,
}

const PLAIN: RunStyle = RunStyle { bold: false, italic: false };
const BOLD: RunStyle = RunStyle { bold: true, italic: false };
const ITALIC: RunStyle = RunStyle { bold: false, italic: true };

struct DocWriter<W: Write> {
    xml: Writer<W>,
}

impl<W: Write> DocWriter<W> {
    fn start(&mut self, tag: &str) -> Result<()> {
        self.xml
            .write_event(Event::Start(BytesStart::new(tag)))
            .map_err(xml_err)
    }

    fn start_with(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let el = BytesStart::new(tag).with_attributes(attrs.iter().copied());
        self.xml.write_event(Event::Start(el)).map_err(xml_err)
    }

    fn end(&mut self, tag: &str) -> Result<()> {
        self.xml
            .write_event(Event::End(BytesStart::new(tag).to_end()))
            .map_err(xml_err)
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let el = BytesStart::new(tag).with_attributes(attrs.iter().copied());
        self.xml.write_event(Event::Empty(el)).map_err(xml_err)
    }

    /// A run of text; embedded newlines become line breaks.
    fn run(&mut self, text: &str, style: RunStyle) -> Result<()> {
        self.start("w:r")?;
        if style.bold || style.italic {
            self.start("w:rPr")?;
            if style.bold {
                self.empty("w:b", &[])?;
            }
            if style.italic {
                self.empty("w:i", &[])?;
            }
            self.end("w:rPr")?;
        }
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.empty("w:br", &[])?;
            }
            self.start_with("w:t", &[("xml:space", "preserve")])?;
            self.xml
                .write_event(Event::Text(BytesText::new(line)))
                .map_err(xml_err)?;
            self.end("w:t")?;
        }
        self.end("w:r")
    }

    fn paragraph(&mut self, runs: &[(&str, RunStyle)], align: Option<&str>) -> Result<()> {
        self.start("w:p")?;
        if let Some(a) = align {
            self.start("w:pPr")?;
            self.empty("w:jc", &[("w:val", a)])?;
            self.end("w:pPr")?;
        }
        for (text, style) in runs {
            self.run(text, *style)?;
        }
        self.end("w:p")
    }

    fn blank(&mut self) -> Result<()> {
        self.empty("w:p", &[])
    }

    fn cell(&mut self, text: &str, bold: bool, align: Option<&str>) -> Result<()> {
        self.start("w:tc")?;
        self.start("w:tcPr")?;
        self.empty("w:vAlign", &[("w:val", "center")])?;
        self.end("w:tcPr")?;
        let style = if bold { BOLD } else { PLAIN };
        self.paragraph(&[(text, style)], align)?;
        self.end("w:tc")
    }

    fn row(&mut self, cells: &[String], bold: bool, header: bool) -> Result<()> {
        self.start("w:tr")?;
        for c in cells {
            self.cell(c, bold, header.then_some("center"))?;
        }
        self.end("w:tr")
    }

    /// Start a six-column table with single borders on every cell.
    fn start_grid_table(&mut self) -> Result<()> {
        self.start("w:tbl")?;
        self.start("w:tblPr")?;
        self.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
        self.start("w:tblBorders")?;
        for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            self.empty(
                side,
                &[("w:val", "single"), ("w:sz", "4"), ("w:space", "0"), ("w:color", "auto")],
            )?;
        }
        self.end("w:tblBorders")?;
        self.end("w:tblPr")?;
        self.start("w:tblGrid")?;
        for _ in TABLE_HEADERS {
            self.empty("w:gridCol", &[])?;
        }
        self.end("w:tblGrid")
    }

    fn section_properties(&mut self) -> Result<()> {
        self.start("w:sectPr")?;
        self.empty("w:pgSz", &[("w:w", PAGE_W), ("w:h", PAGE_H)])?;
        self.empty(
            "w:pgMar",
            &[
                ("w:top", MARGIN_TB),
                ("w:bottom", MARGIN_TB),
                ("w:left", MARGIN_LR),
                ("w:right", MARGIN_LR),
                ("w:header", "708"),
                ("w:footer", "708"),
                ("w:gutter", "0"),
            ],
        )?;
        self.end("w:sectPr")
    }
}

/// Render `word/document.xml`.
pub fn document_xml(invoice: &Invoice) -> Result<Vec<u8>> {
    let mut doc = DocWriter {
        xml: Writer::new(Vec::new()),
    };
    doc.xml
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_err)?;
    doc.start_with("w:document", &[("xmlns:w", WORD_NS)])?;
    doc.start("w:body")?;

    // Seller header
    let mut seller = String::new();
    for l in &invoice.seller.address_lines {
        seller.push('\n');
        seller.push_str(l);
    }
    for (label, value) in &invoice.seller.identifiers {
        seller.push_str(&format!("\n{label} : {value}"));
    }
    doc.paragraph(&[(invoice.seller.name.as_str(), BOLD), (seller.as_str(), PLAIN)], None)?;
    doc.blank()?;

    // Client
    let mut client = format!("\n\n{}", invoice.client.name);
    for l in &invoice.client.address_lines {
        client.push('\n');
        client.push_str(l);
    }
    for (label, value) in &invoice.client.identifiers {
        client.push_str(&format!("\n{label} : {value}"));
    }
    doc.paragraph(&[("Destinataire de la facture", BOLD), (client.as_str(), PLAIN)], None)?;
    doc.blank()?;

    // Invoice information
    let title = format!("Facture n° : {}", invoice.number);
    let info = format!(
        "\nDate de la facture : {}\nPériode concernée : {}\nDate de paiement constatée : {}\nMode de règlement : {}\nIBAN : {}\nBIC : {}",
        invoice.issue_date,
        invoice.period_label(),
        invoice.payment_date,
        invoice.payment_method,
        invoice.iban,
        invoice.bic,
    );
    doc.paragraph(&[(title.as_str(), BOLD), (info.as_str(), PLAIN)], None)?;

    let headers: Vec<String> = TABLE_HEADERS.iter().map(|h| h.to_string()).collect();
    for table in &invoice.markets {
        doc.blank()?;
        let heading = format!("Détail pour le marché : {}", table.market);
        doc.paragraph(&[(heading.as_str(), BOLD)], Some("center"))?;
        doc.start_grid_table()?;
        doc.row(&headers, true, true)?;
        for line in &table.lines {
            doc.row(&line.cells(), false, false)?;
        }
        doc.row(&table.total_cells(), true, false)?;
        doc.end("w:tbl")?;
    }

    // Totals
    doc.blank()?;
    let ht = format!("Montant total HT : {}\nTVA : 0,00 € (Autoliquidation)\n\n", fmt::euro(invoice.total_ht));
    let ttc = format!("Montant TTC : {}", fmt::euro(invoice.total_ttc()));
    doc.paragraph(&[(ht.as_str(), PLAIN), (ttc.as_str(), BOLD)], None)?;
    doc.blank()?;
    doc.paragraph(&[(invoice.reverse_charge_notice.as_str(), ITALIC)], None)?;

    doc.section_properties()?;
    doc.end("w:body")?;
    doc.end("w:document")?;
    Ok(doc.xml.into_inner())
}

/// Render the invoice as a .docx package.
pub fn render_invoice(invoice: &Invoice) -> Result<Vec<u8>> {
    let body = document_xml(invoice)?;

    let mut package = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let parts: [(&str, &[u8]); 3] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/document.xml", body.as_slice()),
    ];
    for (name, data) in parts {
        package.start_file(name, opts).map_err(xml_err)?;
        package.write_all(data)?;
    }
    let cursor = package.finish().map_err(xml_err)?;
    Ok(cursor.into_inner())
}
