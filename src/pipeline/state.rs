//! Processing record, invoice data model, and the pure stage-routing rule.
//!
//! The record is moved into each stage function and handed back — exclusive
//! ownership, no shared mutation between stages. Routing is a pure function
//! of (stage, status) so the short-circuit policy is testable without I/O.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Lifecycle status of one document's pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Extracted,
    Translated,
    Validated,
    Completed,
    Failed,
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extract,
    Standardize,
    Validate,
    Report,
}

/// Routing rule applied after each stage.
///
/// A failure after extraction or standardization skips straight to
/// reporting; validation always reports. `None` means the run is over.
pub fn next_stage(current: Stage, status: ProcessingStatus) -> Option<Stage> {
    match current {
        Stage::Extract | Stage::Standardize if status == ProcessingStatus::Failed => {
            Some(Stage::Report)
        }
        Stage::Extract => Some(Stage::Standardize),
        Stage::Standardize => Some(Stage::Validate),
        Stage::Validate => Some(Stage::Report),
        Stage::Report => None,
    }
}

/// One line of a standardized invoice.
///
/// Wire names follow the standardization service (`qty`, `total`); absent
/// numeric fields default to zero and currency to USD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub item_code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "qty")]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, alias = "total")]
    pub line_total: f64,
}

/// A standardized (English, schema-mapped) invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredInvoice {
    #[serde(default, alias = "invoice_no")]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub total_amount: f64,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default = "default_language")]
    pub original_language: String,
    #[serde(default = "default_confidence")]
    pub translation_confidence: f64,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_confidence() -> f64 {
    1.0
}

/// Outcome of cross-checking an invoice's line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub discrepancies: Vec<String>,
    pub lines_checked: usize,
}

impl ValidationReport {
    /// `is_valid` is derived, keeping the
    /// `is_valid == discrepancies.is_empty()` invariant by construction.
    pub fn from_discrepancies(discrepancies: Vec<String>, lines_checked: usize) -> Self {
        Self {
            is_valid: discrepancies.is_empty(),
            discrepancies,
            lines_checked,
        }
    }
}

/// The unit threaded through the pipeline — one per document per run.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingRecord {
    pub file_name: String,
    pub file_path: PathBuf,
    pub metadata: BTreeMap<String, String>,
    pub raw_text: Option<String>,
    pub invoice: Option<StructuredInvoice>,
    pub validation: Option<ValidationReport>,
    pub current_stage: Option<Stage>,
    pub status: ProcessingStatus,
    pub error: Option<String>,
}

impl ProcessingRecord {
    pub fn for_file(path: &Path, metadata: BTreeMap<String, String>) -> Self {
        Self {
            file_name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown")
                .to_string(),
            file_path: path.to_path_buf(),
            metadata,
            raw_text: None,
            invoice: None,
            validation: None,
            current_stage: None,
            status: ProcessingStatus::Pending,
            error: None,
        }
    }

    /// Record a stage failure: status flips to `Failed` and the message is
    /// kept for the report. Stage functions call this instead of returning
    /// errors — a failure is a state, not an exception.
    pub fn fail(&mut self, stage: Stage, message: String) {
        self.current_stage = Some(stage);
        self.status = ProcessingStatus::Failed;
        self.error = Some(message);
    }
}
