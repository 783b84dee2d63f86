//! PDF report for a sample.
//!
//! Layout is computed first as pages of placed text lines (top-down
//! millimetres on an A4 page) and then drawn with `printpdf`.

use super::models::Sample;
use crate::common::errors::BusinessError;
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::io::BufWriter;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const FIRST_PAGE_TOP: f32 = 40.0;
const CONTINUATION_TOP: f32 = 20.0;
const LINE_PITCH: f32 = 6.0;
const PAGE_BREAK_Y: f32 = 270.0;
const FOOTER_Y: f32 = 285.0;
const SECTION_GAP: f32 = 4.0;
const LEFT_MARGIN: f32 = 16.0;
const RESULT_COLUMNS: [f32; 4] = [16.0, 36.0, 56.0, 76.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    /// Distance from the top of the page in millimetres
    pub y: f32,
    pub size: f32,
    pub weight: FontWeight,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportLayout {
    pub pages: Vec<Vec<PlacedLine>>,
}

struct Cursor {
    pages: Vec<Vec<PlacedLine>>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: FIRST_PAGE_TOP,
        }
    }

    fn place(&mut self, x: f32, y: f32, size: f32, weight: FontWeight, text: String) {
        if let Some(page) = self.pages.last_mut() {
            page.push(PlacedLine {
                x,
                y,
                size,
                weight,
                text,
            });
        }
    }

    fn break_if_needed(&mut self) {
        if self.y > PAGE_BREAK_Y {
            self.pages.push(Vec::new());
            self.y = CONTINUATION_TOP;
        }
    }

    /// Emits one row of cells sharing the same baseline
    fn row(&mut self, cells: &[(f32, String)], weight: FontWeight) {
        self.break_if_needed();
        let y = self.y;
        for (x, text) in cells {
            self.place(*x, y, 10.0, weight, text.clone());
        }
        self.y += LINE_PITCH;
    }

    fn line(&mut self, text: String) {
        self.row(&[(LEFT_MARGIN, text)], FontWeight::Regular);
    }

    fn heading(&mut self, text: &str) {
        self.y += SECTION_GAP;
        self.break_if_needed();
        let y = self.y;
        self.place(LEFT_MARGIN, y, 12.0, FontWeight::Bold, text.to_string());
        self.y += LINE_PITCH + 1.0;
    }
}

fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => "-",
    }
}

fn cell(value: &str) -> String {
    or_dash(Some(value)).to_string()
}

pub fn report_file_name(sample: &Sample) -> String {
    format!("Sample_Report_{}.pdf", sample.sample_id)
}

/// Computes the report layout. `generated_on` is printed in every footer.
pub fn layout(sample: &Sample, lab_name: &str, generated_on: &str) -> ReportLayout {
    let mut cursor = Cursor::new();
    cursor.place(LEFT_MARGIN, 20.0, 18.0, FontWeight::Bold, "SAMPLE ANALYSIS REPORT".to_string());
    cursor.place(LEFT_MARGIN, 28.0, 11.0, FontWeight::Regular, lab_name.to_string());

    cursor.heading("SAMPLE INFORMATION");
    cursor.line(format!("Sample ID: {}", sample.sample_id));
    cursor.line(format!("Request Ref No: {}", sample.request_ref_no));
    cursor.line(format!("Sample Ref No: {}", or_dash(sample.sample_ref_no.as_deref())));
    cursor.line(format!("From: {}", or_dash(sample.from.as_deref())));
    cursor.line(format!("To: {}", or_dash(sample.to.as_deref())));
    cursor.line(format!("Sample Route: {}", or_dash(sample.sample_route.as_deref())));
    cursor.line(format!("Test Method: {}", or_dash(sample.test_method.as_deref())));
    cursor.line(format!("Gate Pass No: {}", or_dash(sample.gate_pass_no.as_deref())));
    cursor.line(format!(
        "Sample In: {} {}",
        or_dash(sample.sample_in_date.as_deref()),
        sample.sample_in_time.as_deref().unwrap_or_default()
    ));
    cursor.line(format!("Remarks: {}", or_dash(sample.remarks.as_deref())));

    cursor.heading("LABORATORY INFORMATION");
    cursor.line(format!("Received: {}", if sample.received { "Yes" } else { "No" }));
    cursor.line(format!(
        "Received Date: {}",
        or_dash(sample.sample_received_date.as_deref())
    ));
    cursor.line(format!(
        "Received Time: {}",
        or_dash(sample.sample_received_time.as_deref())
    ));
    cursor.line(format!("Analysed By: {}", or_dash(sample.analysed_by.as_deref())));

    cursor.heading("ANALYSIS RESULTS (PPB)");
    if sample.results.is_empty() {
        cursor.line("No results available".to_string());
    } else {
        let header = ["Row", "As", "Sb", "Al"].map(str::to_string);
        cursor.row(&RESULT_COLUMNS.into_iter().zip(header).collect::<Vec<_>>(), FontWeight::Bold);
        for (index, result) in sample.results.iter().enumerate() {
            let values = [
                (index + 1).to_string(),
                cell(&result.as_ppb),
                cell(&result.sb_ppb),
                cell(&result.al_ppb),
            ];
            cursor.row(
                &RESULT_COLUMNS.into_iter().zip(values).collect::<Vec<_>>(),
                FontWeight::Regular,
            );
        }
    }

    cursor.heading("COMPLETION DETAILS");
    cursor.line(format!(
        "Status: {}",
        if sample.is_finalized { "FINALIZED" } else { "PENDING" }
    ));
    cursor.line(format!(
        "Completed Date: {}",
        or_dash(sample.completed_date.as_deref())
    ));
    cursor.line(format!(
        "Completed Time: {}",
        or_dash(sample.completed_time.as_deref())
    ));
    if let Some(finalized_at) = sample.finalized_at {
        cursor.line(format!(
            "Finalized At: {}",
            finalized_at.format("%Y-%m-%d %H:%M UTC")
        ));
    }

    let footer = format!(
        "Generated {generated_on} | {} | {lab_name}",
        sample.sample_id
    );
    let mut pages = cursor.pages;
    for page in &mut pages {
        page.push(PlacedLine {
            x: LEFT_MARGIN,
            y: FOOTER_Y,
            size: 8.0,
            weight: FontWeight::Regular,
            text: footer.clone(),
        });
    }

    ReportLayout { pages }
}

fn pdf_error(e: impl std::fmt::Display) -> BusinessError {
    BusinessError::internal(format!("Failed to render PDF: {e}"))
}

fn draw(layout: &ReportLayout, title: &str) -> Result<Vec<u8>, BusinessError> {

    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    for (index, lines) in layout.pages.iter().enumerate() {
        let (page, layer) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
        };
        let layer = doc.get_page(page).get_layer(layer);
        for line in lines {
            let font = match line.weight {
                FontWeight::Regular => &regular,
                FontWeight::Bold => &bold,
            };
            // printpdf measures from the bottom edge
            layer.use_text(
                line.text.clone(),
                line.size,
                Mm(line.x),
                Mm(PAGE_HEIGHT_MM - line.y),
                font,
            );
        }
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer).map_err(pdf_error)?;
    buffer.into_inner().map_err(pdf_error)
}

/// Renders the report off the async runtime
pub async fn render_pdf(
    sample: &Sample,
    lab_name: &str,
    generated_on: &str,
) -> Result<Vec<u8>, BusinessError> {
    let layout = layout(sample, lab_name, generated_on);
    let title = format!("Sample Report {}", sample.sample_id);
    tokio::task::spawn_blocking(move || draw(&layout, &title))
        .await
        .map_err(|e| BusinessError::internal(format!("PDF rendering task failed: {e}")))?
}
