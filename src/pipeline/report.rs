//! Persisted report artifacts: one JSON record, one rendered PDF, one HTML
//! snippet per processed document. These are write targets only — nothing
//! in the pipeline reads them back, and a failed write never fails a run.
//!
//! PDF generation via `printpdf` with builtin fonts.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use printpdf::*;
use thiserror::Error;

use super::state::{ProcessingRecord, ProcessingStatus};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

/// Human-readable verdict derived from a terminal record.
pub fn verdict(record: &ProcessingRecord) -> &'static str {
    match record.status {
        ProcessingStatus::Failed => "SYSTEM FAILURE",
        _ => match &record.validation {
            Some(report) if report.is_valid => "APPROVED",
            _ => "NEEDS REVIEW",
        },
    }
}

/// Writes the three artifacts for a terminal record.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Emit `{stem}.json`, `{stem}.pdf`, and `{stem}.html`.
    /// Each artifact is attempted independently; failures are logged.
    pub fn write_artifacts(&self, record: &ProcessingRecord) {
        if let Err(e) = std::fs::create_dir_all(&self.output_dir) {
            tracing::error!(dir = %self.output_dir.display(), error = %e, "Cannot create reports dir");
            return;
        }

        let stem = Path::new(&record.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("report")
            .to_string();

        if let Err(e) = self.write_json(record, &stem) {
            tracing::error!(file = %record.file_name, error = %e, "JSON report failed");
        }
        if let Err(e) = self.write_pdf(record, &stem) {
            tracing::error!(file = %record.file_name, error = %e, "PDF report failed");
        }
        if let Err(e) = self.write_html(record, &stem) {
            tracing::error!(file = %record.file_name, error = %e, "HTML report failed");
        }
    }

    fn write_json(&self, record: &ProcessingRecord, stem: &str) -> Result<(), ReportError> {
        let path = self.output_dir.join(format!("{stem}.json"));
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn write_pdf(&self, record: &ProcessingRecord, stem: &str) -> Result<(), ReportError> {
        let bytes = render_pdf(record)?;
        std::fs::write(self.output_dir.join(format!("{stem}.pdf")), bytes)?;
        Ok(())
    }

    fn write_html(&self, record: &ProcessingRecord, stem: &str) -> Result<(), ReportError> {
        let path = self.output_dir.join(format!("{stem}.html"));
        std::fs::write(path, render_html(record))?;
        Ok(())
    }
}

/// Render the audit report as PDF bytes (A4, builtin Helvetica).
fn render_pdf(record: &ProcessingRecord) -> Result<Vec<u8>, ReportError> {
    let title = format!("Invoice Audit — {}", record.file_name);
    let (doc, page1, layer1) = PdfDocument::new(&title, Mm(210.0), Mm(297.0), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReportError::Pdf(format!("PDF font error: {e}")))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReportError::Pdf(format!("PDF font error: {e}")))?;

    let mut y = Mm(280.0);

    layer.use_text(&title, 14.0, Mm(20.0), y, &bold);
    y -= Mm(10.0);

    layer.use_text(format!("Verdict: {}", verdict(record)), 11.0, Mm(20.0), y, &bold);
    y -= Mm(6.0);

    if let Some(error) = &record.error {
        for line in wrap_text(&format!("Failure: {error}"), 90) {
            layer.use_text(&line, 9.0, Mm(20.0), y, &font);
            y -= Mm(4.5);
        }
        y -= Mm(2.0);
    }

    if let Some(invoice) = &record.invoice {
        let header = format!(
            "Invoice {} — vendor {} — total {:.2} {}",
            invoice.invoice_number.as_deref().unwrap_or("(unknown)"),
            invoice.vendor_id.as_deref().unwrap_or("(unknown)"),
            invoice.total_amount,
            invoice.currency,
        );
        layer.use_text(&header, 9.0, Mm(20.0), y, &font);
        y -= Mm(6.0);
    }

    if let Some(validation) = &record.validation {
        layer.use_text(
            format!("Lines checked: {}", validation.lines_checked),
            9.0,
            Mm(20.0),
            y,
            &font,
        );
        y -= Mm(6.0);

        if !validation.discrepancies.is_empty() {
            layer.use_text("DISCREPANCIES:", 11.0, Mm(20.0), y, &bold);
            y -= Mm(6.0);
            for issue in &validation.discrepancies {
                for line in wrap_text(&format!("  · {issue}"), 90) {
                    layer.use_text(&line, 9.0, Mm(25.0), y, &font);
                    y -= Mm(4.5);
                }
                y -= Mm(1.5);
            }
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Pdf(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| ReportError::Pdf(format!("PDF buffer error: {e}")))
}

/// Render a minimal embeddable HTML snippet with the verdict and issues.
fn render_html(record: &ProcessingRecord) -> String {
    let mut html = String::new();
    html.push_str("<section class=\"invoice-audit\">\n");
    html.push_str(&format!("  <h2>{}</h2>\n", escape(&record.file_name)));
    html.push_str(&format!(
        "  <p class=\"verdict\">Verdict: <strong>{}</strong></p>\n",
        verdict(record)
    ));

    if let Some(error) = &record.error {
        html.push_str(&format!("  <p class=\"error\">{}</p>\n", escape(error)));
    }

    if let Some(validation) = &record.validation {
        html.push_str(&format!(
            "  <p>Lines checked: {}</p>\n",
            validation.lines_checked
        ));
        if !validation.discrepancies.is_empty() {
            html.push_str("  <ul class=\"discrepancies\">\n");
            for issue in &validation.discrepancies {
                html.push_str(&format!("    <li>{}</li>\n", escape(issue)));
            }
            html.push_str("  </ul>\n");
        }
    }

    html.push_str("</section>\n");
    html
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}
