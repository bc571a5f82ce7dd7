//! Cross-check of one invoice line item against ERP reference records.
//!
//! Classification order: unknown SKU → mismatch; known SKU without price
//! history → warning; price outside tolerance → discrepancy; else match.

use serde::Serialize;

use super::store::ReferenceStore;

/// Price tolerance before a line is flagged, in percent.
/// A fixed policy constant for now — tunable here, not per item.
pub const PRICE_TOLERANCE_PCT: f64 = 5.0;

/// Outcome classification for a single line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Match,
    Warning,
    Discrepancy,
    Mismatch,
}

/// Result of cross-checking one line item.
#[derive(Debug, Clone, Serialize)]
pub struct LineCheck {
    pub status: CheckStatus,
    pub reason: String,
    pub reference_price: Option<f64>,
    pub percent_diff: Option<f64>,
}

/// Validate a single line item against the SKU master and PO history.
pub fn check_line_item(
    store: &ReferenceStore,
    item_code: &str,
    unit_price: f64,
    currency: &str,
) -> LineCheck {
    tracing::debug!(item_code, unit_price, currency, "Cross-checking line item");

    if store.sku(item_code).is_none() {
        return LineCheck {
            status: CheckStatus::Mismatch,
            reason: format!("SKU {item_code} not found in reference master."),
            reference_price: None,
            percent_diff: None,
        };
    }

    let Some(reference_price) = store.first_po_price(item_code) else {
        return LineCheck {
            status: CheckStatus::Warning,
            reason: format!("SKU {item_code} found, but no PO history to compare price."),
            reference_price: None,
            percent_diff: None,
        };
    };

    let percent_diff = (unit_price - reference_price).abs() / reference_price * 100.0;

    if percent_diff > PRICE_TOLERANCE_PCT {
        let rounded = (percent_diff * 100.0).round() / 100.0;
        return LineCheck {
            status: CheckStatus::Discrepancy,
            reason: format!(
                "Price mismatch > {PRICE_TOLERANCE_PCT}%. Invoice: {unit_price}, Reference: {reference_price}"
            ),
            reference_price: Some(reference_price),
            percent_diff: Some(rounded),
        };
    }

    LineCheck {
        status: CheckStatus::Match,
        reason: "Price and SKU validated successfully.".to_string(),
        reference_price: Some(reference_price),
        percent_diff: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erp::store::{PoLine, PurchaseOrder, ReferenceStore, SkuRecord};

    fn store() -> ReferenceStore {
        ReferenceStore::from_records(
            vec![PurchaseOrder {
                po_number: "PO-1001".into(),
                vendor_id: None,
                line_items: vec![PoLine {
                    item_code: "SKU-001".into(),
                    quantity: 10.0,
                    unit_price: 12.0,
                }],
            }],
            vec![
                SkuRecord {
                    item_code: "SKU-001".into(),
                    description: None,
                },
                SkuRecord {
                    item_code: "SKU-003".into(),
                    description: None,
                },
            ],
            vec![],
        )
    }

    #[test]
    fn exact_price_matches() {
        let check = check_line_item(&store(), "SKU-001", 12.0, "USD");
        assert_eq!(check.status, CheckStatus::Match);
        assert_eq!(check.reference_price, Some(12.0));
    }

    #[test]
    fn within_tolerance_matches() {
        // 12.50 vs 12.00 is ~4.17% — inside the 5% band
        let check = check_line_item(&store(), "SKU-001", 12.5, "USD");
        assert_eq!(check.status, CheckStatus::Match);
    }

    #[test]
    fn below_reference_within_tolerance_matches() {
        let check = check_line_item(&store(), "SKU-001", 11.5, "USD");
        assert_eq!(check.status, CheckStatus::Match);
    }

    #[test]
    fn above_tolerance_is_discrepancy() {
        let check = check_line_item(&store(), "SKU-001", 13.0, "USD");
        assert_eq!(check.status, CheckStatus::Discrepancy);
        // |13 - 12| / 12 * 100 = 8.33
        assert_eq!(check.percent_diff, Some(8.33));
    }

    #[test]
    fn far_below_reference_is_discrepancy() {
        let check = check_line_item(&store(), "SKU-001", 6.0, "USD");
        assert_eq!(check.status, CheckStatus::Discrepancy);
        assert_eq!(check.percent_diff, Some(50.0));
    }

    #[test]
    fn inflated_price_rounds_percent() {
        // The end-to-end scenario: invoiced 50.00 against reference 12.00
        let check = check_line_item(&store(), "SKU-001", 50.0, "USD");
        assert_eq!(check.status, CheckStatus::Discrepancy);
        assert_eq!(check.percent_diff, Some(316.67));
        assert_eq!(check.reference_price, Some(12.0));
    }

    #[test]
    fn unknown_sku_is_mismatch() {
        let check = check_line_item(&store(), "UNKNOWN-CODE", 1.0, "USD");
        assert_eq!(check.status, CheckStatus::Mismatch);
        assert!(check.reason.contains("UNKNOWN-CODE"));
        assert!(check.reference_price.is_none());
    }

    #[test]
    fn known_sku_without_history_is_warning() {
        let check = check_line_item(&store(), "SKU-003", 10.0, "USD");
        assert_eq!(check.status, CheckStatus::Warning);
        assert!(check.reason.contains("no PO history"));
    }
}
