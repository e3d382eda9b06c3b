use std::io::BufWriter;

use printpdf::*;

use crate::error::{LedgerError, Result};
use crate::models::Transaction;
use crate::reports::aggregate;

// A4 portrait (mm)
const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN_TOP: f32 = 20.0;
const MARGIN_BOTTOM: f32 = 20.0;
const MARGIN_LEFT: f32 = 14.0;
const MARGIN_RIGHT: f32 = 14.0;
const ROW_H: f32 = 5.5;
const FONT_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 16.0;
const SUBTITLE_SIZE: f32 = 10.0;

pub const HEADERS: [&str; 6] = ["Date", "Type", "Category", "Sub Category", "Details", "Amount"];

fn approx_text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.18
}

/// Cut `text` so it fits in `width`, marking the cut with "..".
fn fit(text: &str, width: f32, size: f32) -> String {
    if approx_text_width(text, size) <= width {
        return text.to_string();
    }
    let max_chars = (width / (size * 0.18)) as usize;
    let kept: String = text.chars().take(max_chars.saturating_sub(2)).collect();
    format!("{kept}..")
}

#[derive(Clone, Copy)]
enum Align {
    Left,
    Right,
}

struct Col {
    width: f32,
    align: Align,
}

const COLS: [Col; 6] = [
    Col { width: 22.0, align: Align::Left },
    Col { width: 20.0, align: Align::Left },
    Col { width: 30.0, align: Align::Left },
    Col { width: 30.0, align: Align::Left },
    Col { width: 54.0, align: Align::Left },
    Col { width: 26.0, align: Align::Right },
];

struct PdfWriter {
    doc: PdfDocumentReference,
    font: IndirectFontRef,
    font_bold: IndirectFontRef,
    current_page: PdfPageIndex,
    current_layer: PdfLayerIndex,
    y: f32,
}

impl PdfWriter {
    fn new(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| LedgerError::Pdf(format!("{e:?}")))?;
        let font_bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| LedgerError::Pdf(format!("{e:?}")))?;
        Ok(Self {
            doc,
            font,
            font_bold,
            current_page: page,
            current_layer: layer,
            y: MARGIN_TOP,
        })
    }

    fn pdf_y(&self) -> f32 {
        PAGE_H - self.y
    }

    fn layer(&self) -> PdfLayerReference {
        self.doc
            .get_page(self.current_page)
            .get_layer(self.current_layer)
    }

    fn text(&self, s: &str, x: f32, size: f32, bold: bool) {
        let font = if bold { &self.font_bold } else { &self.font };
        self.layer().use_text(s, size, Mm(x), Mm(self.pdf_y()), font);
    }

    fn hline(&self) {
        let layer = self.layer();
        layer.set_outline_thickness(0.5);
        layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT), Mm(self.pdf_y())), false),
                (Point::new(Mm(PAGE_W - MARGIN_RIGHT), Mm(self.pdf_y())), false),
            ],
            is_closed: false,
        });
    }

    fn header(&mut self, title: &str, subtitle: &str) {
        self.text(title, MARGIN_LEFT, TITLE_SIZE, true);
        self.y += 7.0;
        if !subtitle.is_empty() {
            self.text(subtitle, MARGIN_LEFT, SUBTITLE_SIZE, false);
            self.y += 5.0;
        }
        let ts = chrono::Local::now()
            .format("Generated %Y-%m-%d %H:%M")
            .to_string();
        self.text(&ts, MARGIN_LEFT, 8.0, false);
        self.y += 5.0;
        self.hline();
        self.y += 5.0;
    }

    fn row(&mut self, values: &[&str], bold: bool) {
        let mut x = MARGIN_LEFT;
        for (col, value) in COLS.iter().zip(values) {
            let shown = fit(value, col.width - 1.5, FONT_SIZE);
            match col.align {
                Align::Left => self.text(&shown, x, FONT_SIZE, bold),
                Align::Right => {
                    let tw = approx_text_width(&shown, FONT_SIZE);
                    self.text(&shown, x + col.width - tw, FONT_SIZE, bold);
                }
            }
            x += col.width;
        }
        self.y += ROW_H;
    }

    fn table_header(&mut self) {
        self.row(&HEADERS, true);
        self.hline();
        self.y += 2.0;
    }

    /// Start a new page when the next row would cross the bottom margin,
    /// repeating the column headers.
    fn ensure_row_space(&mut self) {
        if self.y + ROW_H > PAGE_H - MARGIN_BOTTOM {
            let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer");
            self.current_page = page;
            self.current_layer = layer;
            self.y = MARGIN_TOP;
            self.table_header();
        }
    }

    fn to_bytes(self) -> Result<Vec<u8>> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| LedgerError::Pdf(format!("{e:?}")))?;
        buf.into_inner().map_err(|e| LedgerError::Pdf(e.to_string()))
    }
}

/// Cells for one exported transaction, in [`HEADERS`] order.
pub fn table_cells(t: &Transaction) -> [String; 6] {
    [
        t.date.format("%Y-%m-%d").to_string(),
        t.kind.as_str().to_uppercase(),
        t.category.clone(),
        t.sub_category.clone().unwrap_or_else(|| "-".to_string()),
        t.details.clone(),
        t.amount.to_string(),
    ]
}

pub fn render_table(rows: &[&Transaction], title: &str, subtitle: &str) -> Result<Vec<u8>> {
    let mut pdf = PdfWriter::new(title)?;
    pdf.header(title, subtitle);
    pdf.table_header();

    for t in rows {
        pdf.ensure_row_space();
        let cells = table_cells(t);
        let refs: Vec<&str> = cells.iter().map(String::as_str).collect();
        pdf.row(&refs, false);
    }

    let summary = aggregate(rows.iter().copied());
    pdf.ensure_row_space();
    pdf.hline();
    pdf.y += 2.0;
    for (label, value) in [
        ("Total Income", summary.total_income),
        ("Total Expense", summary.total_expense),
        ("Balance", summary.balance),
    ] {
        pdf.ensure_row_space();
        let amount = format!("{value:.2}");
        pdf.row(&["", "", "", "", label, &amount], true);
    }

    pdf.to_bytes()
}
