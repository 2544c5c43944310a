//! # Inventory Ledger Updater
//!
//! The only code that changes batch quantities.
//!
//! ## Stock Movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Purchase line ──► find (product, batch_code)                           │
//! │                     ├── found   → quantity += qty + free                │
//! │                     └── missing → new batch (unit_cost = line rate)     │
//! │                                                                         │
//! │  Sale line ──────► batch by id                                          │
//! │                     ├── found   → quantity −= qty  (never below 0)      │
//! │                     └── missing → no-op, reported                       │
//! │                                                                         │
//! │  Every function validates the whole document first, then mutates.      │
//! │  A rejected call leaves the batch list untouched.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Depleted batches are never removed; [`active_batches`] filters them out
//! of the working view.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::allocation::{sort_fefo, ExpiryRisk};
use crate::error::{CoreError, CoreResult};
use crate::types::{next_id, InventoryBatch, Product, Purchase, PurchaseLine, SaleLine};

// =============================================================================
// Reports
// =============================================================================

/// What a purchase receipt did to one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchReceipt {
    pub batch_id: i64,
    pub created: bool,
    pub received: i64,
}

/// Outcome of applying sale lines to stock.
///
/// `missing_batches` lists batch ids a line referenced that no longer exist;
/// those lines were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub units: i64,
    pub missing_batches: Vec<i64>,
}

// =============================================================================
// Purchase Receipt
// =============================================================================

fn receive_line(
    batches: &mut Vec<InventoryBatch>,
    supplier_id: i64,
    date: NaiveDate,
    line: &PurchaseLine,
) -> BatchReceipt {
    let received = line.received_quantity();

    if let Some(batch) = batches
        .iter_mut()
        .find(|b| b.matches(line.product_id, &line.batch_code))
    {
        batch.quantity += received;
        return BatchReceipt {
            batch_id: batch.id,
            created: false,
            received,
        };
    }

    let id = next_id(batches);
    batches.push(InventoryBatch {
        id,
        product_id: line.product_id,
        supplier_id,
        brand: line.brand.clone(),
        batch_code: line.batch_code.trim().to_string(),
        quantity: received,
        purchase_date: date,
        expiry_date: line.expiry_date,
        unit_cost: line.rate,
    });

    BatchReceipt {
        batch_id: id,
        created: true,
        received,
    }
}

/// Adds every line's `quantity + free_quantity` to stock.
pub fn receive_purchase(batches: &mut Vec<InventoryBatch>, purchase: &Purchase) -> Vec<BatchReceipt> {
    purchase
        .lines
        .iter()
        .map(|line| receive_line(batches, purchase.supplier_id, purchase.date, line))
        .collect()
}

/// Net quantity change per existing batch index when `original` is
/// replaced by `edited`. Edited lines matching no batch create new ones and
/// cannot go negative, so they are left out.
fn revision_deltas(batches: &[InventoryBatch], original: &Purchase, edited: &Purchase) -> BTreeMap<usize, i64> {
    let mut deltas: BTreeMap<usize, i64> = BTreeMap::new();

    for line in &original.lines {
        if let Some(idx) = batches
            .iter()
            .position(|b| b.matches(line.product_id, &line.batch_code))
        {
            *deltas.entry(idx).or_default() -= line.received_quantity();
        }
    }

    for line in &edited.lines {
        if let Some(idx) = batches
            .iter()
            .position(|b| b.matches(line.product_id, &line.batch_code))
        {
            *deltas.entry(idx).or_default() += line.received_quantity();
        }
    }

    deltas
}

/// Replaces a saved purchase's stock contribution with an edited version.
///
/// Equivalent to reversing `original` and receiving `edited`, so repeated
/// edits never double count. Validated on the net effect per batch: the edit
/// is rejected only when a batch would end below zero.
pub fn revise_purchase(
    batches: &mut Vec<InventoryBatch>,
    original: &Purchase,
    edited: &Purchase,
) -> CoreResult<Vec<BatchReceipt>> {
    let deltas = revision_deltas(batches, original, edited);

    for (&idx, &delta) in &deltas {
        let batch = &batches[idx];
        if batch.quantity + delta < 0 {
            return Err(CoreError::InsufficientStock {
                batch_code: batch.batch_code.clone(),
                available: batch.quantity,
                requested: -delta,
            });
        }
    }

    for line in &original.lines {
        if let Some(batch) = batches
            .iter_mut()
            .find(|b| b.matches(line.product_id, &line.batch_code))
        {
            batch.quantity -= line.received_quantity();
        }
    }

    Ok(receive_purchase(batches, edited))
}

// =============================================================================
// Sale Consumption
// =============================================================================

/// Units requested per batch id across all lines.
fn units_by_batch(lines: &[SaleLine]) -> BTreeMap<i64, (i64, i64)> {
    let mut units: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    for line in lines {
        let entry = units.entry(line.batch_id).or_insert((line.product_id, 0));
        entry.1 += line.quantity;
    }
    units
}

/// Decrements each line's batch by the sold quantity.
///
/// Lines drawing on the same batch are summed before the stock check, so two
/// lines can never jointly oversell a batch.
pub fn consume_sale(batches: &mut [InventoryBatch], lines: &[SaleLine]) -> CoreResult<StockAdjustment> {
    let requested = units_by_batch(lines);
    let mut adjustment = StockAdjustment::default();

    for (&batch_id, &(product_id, units)) in &requested {
        let Some(batch) = batches.iter().find(|b| b.id == batch_id) else {
            adjustment.missing_batches.push(batch_id);
            continue;
        };

        if batch.product_id != product_id {
            return Err(CoreError::BatchProductMismatch {
                batch_id,
                product_id,
            });
        }

        if units > batch.quantity {
            return Err(CoreError::InsufficientStock {
                batch_code: batch.batch_code.clone(),
                available: batch.quantity,
                requested: units,
            });
        }
    }

    for batch in batches.iter_mut() {
        if let Some(&(_, units)) = requested.get(&batch.id) {
            batch.quantity -= units;
            adjustment.units += units;
        }
    }

    Ok(adjustment)
}

/// Puts a sale's quantities back on their batches (sale cancellation).
pub fn restore_sale(batches: &mut [InventoryBatch], lines: &[SaleLine]) -> StockAdjustment {
    let mut adjustment = StockAdjustment::default();

    for (batch_id, (_, units)) in units_by_batch(lines) {
        match batches.iter_mut().find(|b| b.id == batch_id) {
            Some(batch) => {
                batch.quantity += units;
                adjustment.units += units;
            }
            None => adjustment.missing_batches.push(batch_id),
        }
    }

    adjustment
}

// =============================================================================
// Stock Views
// =============================================================================

/// Batches with stock on hand, FEFO ordered.
pub fn active_batches(batches: &[InventoryBatch]) -> Vec<InventoryBatch> {
    let mut active: Vec<InventoryBatch> = batches.iter().filter(|b| b.quantity > 0).cloned().collect();
    sort_fefo(&mut active);
    active
}

/// Units on hand per product id.
pub fn stock_by_product(batches: &[InventoryBatch]) -> BTreeMap<i64, i64> {
    let mut totals = BTreeMap::new();
    for batch in batches.iter().filter(|b| b.quantity > 0) {
        *totals.entry(batch.product_id).or_default() += batch.quantity;
    }
    totals
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LowStock {
    pub product_id: i64,
    pub name: String,
    pub on_hand: i64,
    pub min_stock: i64,
}

/// Active products whose total stock is below their minimum-stock threshold.
pub fn low_stock(products: &[Product], batches: &[InventoryBatch]) -> Vec<LowStock> {
    let totals = stock_by_product(batches);

    products
        .iter()
        .filter(|p| p.is_active)
        .filter_map(|p| {
            let on_hand = totals.get(&p.id).copied().unwrap_or(0);
            (on_hand < p.min_stock).then(|| LowStock {
                product_id: p.id,
                name: p.name.clone(),
                on_hand,
                min_stock: p.min_stock,
            })
        })
        .collect()
}

/// Count of batches with stock on hand in each expiry band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpirySummary {
    pub expired: usize,
    pub critical: usize,
    pub warning: usize,
    pub caution: usize,
    pub safe: usize,
}

impl ExpirySummary {
    pub fn count(&self, risk: ExpiryRisk) -> usize {
        match risk {
            ExpiryRisk::Expired => self.expired,
            ExpiryRisk::Critical => self.critical,
            ExpiryRisk::Warning => self.warning,
            ExpiryRisk::Caution => self.caution,
            ExpiryRisk::Safe => self.safe,
        }
    }
}

pub fn expiry_summary(batches: &[InventoryBatch], today: NaiveDate) -> ExpirySummary {
    let mut summary = ExpirySummary::default();
    for batch in batches.iter().filter(|b| b.quantity > 0) {
        let slot = match ExpiryRisk::for_batch(batch, today) {
            ExpiryRisk::Expired => &mut summary.expired,
            ExpiryRisk::Critical => &mut summary.critical,
            ExpiryRisk::Warning => &mut summary.warning,
            ExpiryRisk::Caution => &mut summary.caution,
            ExpiryRisk::Safe => &mut summary.safe,
        };
        *slot += 1;
    }
    summary
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::PurchasePaymentStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn purchase_line(product_id: i64, code: &str, qty: i64, free: i64) -> PurchaseLine {
        PurchaseLine {
            product_id,
            brand: "Calpol".to_string(),
            quantity: qty,
            free_quantity: free,
            batch_code: code.to_string(),
            expiry_date: date(2026, 6, 30),
            rate: Money::from_rupees(10),
            scheme_id: None,
            discount: Money::zero(),
            effective_rate: Money::from_rupees(10),
            amount: Money::from_rupees(10) * qty,
        }
    }

    fn purchase(lines: Vec<PurchaseLine>) -> Purchase {
        Purchase {
            id: 1,
            supplier_id: 3,
            invoice_number: "SUP-881".to_string(),
            date: date(2025, 1, 5),
            lines,
            subtotal: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
            payment_status: PurchasePaymentStatus::Pending,
            paid_amount: Money::zero(),
        }
    }

    fn sale_line(product_id: i64, batch_id: i64, qty: i64) -> SaleLine {
        SaleLine {
            product_id,
            batch_id,
            batch_code: String::new(),
            quantity: qty,
            rate: Money::from_rupees(14),
            amount: Money::from_rupees(14) * qty,
        }
    }

    #[test]
    fn test_receive_creates_then_augments() {
        let mut batches = Vec::new();

        let receipts = receive_purchase(&mut batches, &purchase(vec![purchase_line(1, "CP2401", 100, 10)]));
        assert_eq!(
            receipts,
            vec![BatchReceipt {
                batch_id: 1,
                created: true,
                received: 110
            }]
        );
        assert_eq!(batches[0].unit_cost, Money::from_rupees(10));
        assert_eq!(batches[0].supplier_id, 3);

        let receipts = receive_purchase(&mut batches, &purchase(vec![purchase_line(1, "cp2401", 20, 0)]));
        assert!(!receipts[0].created);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].quantity, 130);
    }

    #[test]
    fn test_same_code_different_product_is_separate_batch() {
        let mut batches = Vec::new();
        receive_purchase(
            &mut batches,
            &purchase(vec![purchase_line(1, "X1", 10, 0), purchase_line(2, "X1", 5, 0)]),
        );
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].id, 2);
    }

    #[test]
    fn test_revision_never_double_counts() {
        let mut batches = Vec::new();
        let original = purchase(vec![purchase_line(1, "CP2401", 100, 10)]);
        receive_purchase(&mut batches, &original);

        let edited = purchase(vec![purchase_line(1, "CP2401", 80, 0)]);
        revise_purchase(&mut batches, &original, &edited).unwrap();
        assert_eq!(batches[0].quantity, 80);

        let edited_again = purchase(vec![purchase_line(1, "CP2401", 90, 0)]);
        revise_purchase(&mut batches, &edited, &edited_again).unwrap();
        assert_eq!(batches[0].quantity, 90);
    }

    #[test]
    fn test_revision_rejected_when_stock_already_sold() {
        let mut batches = Vec::new();
        let original = purchase(vec![purchase_line(1, "CP2401", 100, 0)]);
        receive_purchase(&mut batches, &original);
        consume_sale(&mut batches, &[sale_line(1, 1, 70)]).unwrap();

        let edited = purchase(vec![purchase_line(1, "CP2401", 50, 0)]);
        let before = batches.clone();
        let err = revise_purchase(&mut batches, &original, &edited).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!(batches, before);

        // Editing upwards still works after a partial sale.
        let edited = purchase(vec![purchase_line(1, "CP2401", 120, 0)]);
        revise_purchase(&mut batches, &original, &edited).unwrap();
        assert_eq!(batches[0].quantity, 50);
    }

    #[test]
    fn test_revision_moving_to_new_batch_code() {
        let mut batches = Vec::new();
        let original = purchase(vec![purchase_line(1, "CP2401", 100, 0)]);
        receive_purchase(&mut batches, &original);

        let edited = purchase(vec![purchase_line(1, "CP2402", 100, 0)]);
        let receipts = revise_purchase(&mut batches, &original, &edited).unwrap();
        assert!(receipts[0].created);
        assert_eq!(batches[0].quantity, 0);
        assert_eq!(batches[1].quantity, 100);
    }

    #[test]
    fn test_consume_rejects_oversell_without_mutation() {
        let mut batches = Vec::new();
        receive_purchase(
            &mut batches,
            &purchase(vec![purchase_line(1, "A", 10, 0), purchase_line(2, "B", 45, 0)]),
        );

        let lines = vec![sale_line(1, 1, 5), sale_line(2, 2, 60)];
        let err = consume_sale(&mut batches, &lines).unwrap_err();
        assert_eq!(
            err,
            CoreError::InsufficientStock {
                batch_code: "B".to_string(),
                available: 45,
                requested: 60
            }
        );
        assert_eq!(batches[0].quantity, 10);
        assert_eq!(batches[1].quantity, 45);
    }

    #[test]
    fn test_consume_sums_lines_on_same_batch() {
        let mut batches = Vec::new();
        receive_purchase(&mut batches, &purchase(vec![purchase_line(1, "A", 10, 0)]));

        let lines = vec![sale_line(1, 1, 6), sale_line(1, 1, 6)];
        assert!(consume_sale(&mut batches, &lines).is_err());
        assert_eq!(batches[0].quantity, 10);

        let lines = vec![sale_line(1, 1, 6), sale_line(1, 1, 4)];
        let adjustment = consume_sale(&mut batches, &lines).unwrap();
        assert_eq!(adjustment.units, 10);
        assert_eq!(batches[0].quantity, 0);
        assert!(active_batches(&batches).is_empty());
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn test_missing_batch_is_noop() {
        let mut batches = Vec::new();
        receive_purchase(&mut batches, &purchase(vec![purchase_line(1, "A", 10, 0)]));

        let adjustment = consume_sale(&mut batches, &[sale_line(1, 1, 2), sale_line(1, 42, 5)]).unwrap();
        assert_eq!(adjustment.missing_batches, vec![42]);
        assert_eq!(batches[0].quantity, 8);

        let restored = restore_sale(&mut batches, &[sale_line(1, 1, 2), sale_line(1, 42, 5)]);
        assert_eq!(restored.units, 2);
        assert_eq!(restored.missing_batches, vec![42]);
        assert_eq!(batches[0].quantity, 10);
    }

    #[test]
    fn test_stock_views() {
        let today = date(2025, 1, 1);
        let mut batches = Vec::new();
        receive_purchase(
            &mut batches,
            &purchase(vec![
                purchase_line(1, "A", 10, 0),
                purchase_line(1, "B", 15, 0),
                purchase_line(2, "C", 3, 0),
            ]),
        );
        batches[1].expiry_date = date(2025, 1, 20);
        batches[2].expiry_date = date(2024, 12, 1);

        let totals = stock_by_product(&batches);
        assert_eq!(totals.get(&1), Some(&25));
        assert_eq!(totals.get(&2), Some(&3));

        let active = active_batches(&batches);
        assert_eq!(active[0].batch_code, "C");
        assert_eq!(active[1].batch_code, "B");

        let summary = expiry_summary(&batches, today);
        assert_eq!(summary.expired, 1);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.safe, 1);
        assert_eq!(summary.count(ExpiryRisk::Warning), 0);

        let products = vec![
            Product {
                id: 1,
                generic_name: "Paracetamol".to_string(),
                name: "Calpol 500".to_string(),
                hsn_code: "3004".to_string(),
                gst_rate_bps: 1200,
                packing: "10x10".to_string(),
                min_stock: 20,
                is_active: true,
            },
            Product {
                id: 2,
                generic_name: "Cetirizine".to_string(),
                name: "Cetzine".to_string(),
                hsn_code: "3004".to_string(),
                gst_rate_bps: 1200,
                packing: "10x10".to_string(),
                min_stock: 10,
                is_active: true,
            },
        ];
        let low = low_stock(&products, &batches);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id, 2);
        assert_eq!(low[0].on_hand, 3);
    }
}
