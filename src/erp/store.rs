//! Read-only ERP reference data: purchase orders, SKU master, vendors.
//!
//! Backed by three JSON files in a data directory. The store is immutable
//! after load and is shared across pipeline runs via `Arc` — components
//! receive it by injection, never through a global.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ErpError;

/// One line of a historical purchase order.
#[derive(Debug, Clone, Deserialize)]
pub struct PoLine {
    pub item_code: String,
    #[serde(default)]
    pub quantity: f64,
    pub unit_price: f64,
}

/// A historical purchase order with its lines.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseOrder {
    pub po_number: String,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub line_items: Vec<PoLine>,
}

/// An entry in the SKU item master.
#[derive(Debug, Clone, Deserialize)]
pub struct SkuRecord {
    pub item_code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A known vendor.
#[derive(Debug, Clone, Deserialize)]
pub struct Vendor {
    pub vendor_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Read-only lookup over the mock ERP records.
pub struct ReferenceStore {
    po_records: Vec<PurchaseOrder>,
    sku_master: Vec<SkuRecord>,
    vendors: Vec<Vendor>,
}

impl ReferenceStore {
    /// Load the three reference files from `data_dir`.
    ///
    /// A missing file loads as an empty collection with a warning (the
    /// store still answers lookups, they just miss). Malformed JSON is an
    /// error — silently dropping records would corrupt every cross-check.
    pub fn load(data_dir: &Path) -> Result<Self, ErpError> {
        let po_records = load_json_list(&data_dir.join("PO_Records.json"))?;
        let sku_master = load_json_list(&data_dir.join("sku_master.json"))?;
        let vendors = load_json_list(&data_dir.join("vendors.json"))?;

        tracing::info!(
            purchase_orders = po_records.len(),
            skus = sku_master.len(),
            vendors = vendors.len(),
            "Reference data loaded"
        );

        Ok(Self {
            po_records,
            sku_master,
            vendors,
        })
    }

    /// Build a store from in-memory records (for tests).
    pub fn from_records(
        po_records: Vec<PurchaseOrder>,
        sku_master: Vec<SkuRecord>,
        vendors: Vec<Vendor>,
    ) -> Self {
        Self {
            po_records,
            sku_master,
            vendors,
        }
    }

    /// Look up a SKU in the item master.
    pub fn sku(&self, item_code: &str) -> Option<&SkuRecord> {
        self.sku_master.iter().find(|s| s.item_code == item_code)
    }

    /// Look up a purchase order by number.
    pub fn purchase_order(&self, po_number: &str) -> Option<&PurchaseOrder> {
        self.po_records.iter().find(|po| po.po_number == po_number)
    }

    /// Look up a vendor by id.
    pub fn vendor(&self, vendor_id: &str) -> Option<&Vendor> {
        self.vendors.iter().find(|v| v.vendor_id == vendor_id)
    }

    /// First historical price for `item_code` across all PO lines.
    /// Record order determines which price wins.
    pub fn first_po_price(&self, item_code: &str) -> Option<f64> {
        self.po_records
            .iter()
            .flat_map(|po| po.line_items.iter())
            .find(|line| line.item_code == item_code)
            .map(|line| line.unit_price)
    }
}

fn load_json_list<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, ErpError> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Reference file missing — loading empty");
        return Ok(Vec::new());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ErpError::Io {
        path: PathBuf::from(path),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|e| ErpError::MalformedFile {
        path: PathBuf::from(path),
        reason: e.to_string(),
    })
}
