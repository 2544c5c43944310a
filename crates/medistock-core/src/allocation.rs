//! # Batch Allocator
//!
//! Offers the batches that can fulfil a sale line, first-expiry-first-out.
//!
//! ## FEFO Ordering
//! ```text
//! batches for product 12 (quantity > 0)
//!      │
//!      ▼  sort by expiry_date ↑, then purchase_date ↑, then id ↑
//! ┌──────────┬────────────┬──────┬──────────┐
//! │ batch    │ expiry     │ days │ risk     │
//! ├──────────┼────────────┼──────┼──────────┤
//! │ CP2309   │ 2025-01-10 │  -5  │ expired  │  ← still listed, flagged
//! │ CP2401   │ 2025-02-01 │  17  │ critical │
//! │ CP2406   │ 2025-09-30 │ 258  │ safe     │
//! └──────────┴────────────┴──────┴──────────┘
//! ```
//!
//! A sale line draws from exactly one batch. Lines are never split across
//! batches: the operator adds a second line for a second batch.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::margin::MarginTable;
use crate::pricing::{suggest_price, PriceSuggestion};
use crate::types::{CustomerType, InventoryBatch};

/// Expiry band of a batch relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryRisk {
    /// Past expiry (< 0 days).
    Expired,
    /// 0 to 29 days.
    Critical,
    /// 30 to 89 days.
    Warning,
    /// 90 to 179 days.
    Caution,
    /// 180 days or more.
    Safe,
}

impl ExpiryRisk {
    pub const ALL: [ExpiryRisk; 5] = [
        ExpiryRisk::Expired,
        ExpiryRisk::Critical,
        ExpiryRisk::Warning,
        ExpiryRisk::Caution,
        ExpiryRisk::Safe,
    ];

    pub fn from_days(days_to_expiry: i64) -> Self {
        match days_to_expiry {
            d if d < 0 => ExpiryRisk::Expired,
            0..=29 => ExpiryRisk::Critical,
            30..=89 => ExpiryRisk::Warning,
            90..=179 => ExpiryRisk::Caution,
            _ => ExpiryRisk::Safe,
        }
    }

    pub fn for_batch(batch: &InventoryBatch, today: NaiveDate) -> Self {
        Self::from_days(batch.days_to_expiry(today))
    }
}

/// Customer context for a margin-aware price suggestion.
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    pub table: MarginTable<'a>,
    pub customer_type: CustomerType,
}

/// One batch offered for a sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BatchCandidate {
    pub batch: InventoryBatch,
    pub days_to_expiry: i64,
    pub risk: ExpiryRisk,
    pub expired: bool,
    /// Present when a customer was supplied.
    pub suggested: Option<PriceSuggestion>,
}

/// FEFO ordering key. Ties on expiry fall back to the older purchase, then id.
fn fefo_key(batch: &InventoryBatch) -> (NaiveDate, NaiveDate, i64) {
    (batch.expiry_date, batch.purchase_date, batch.id)
}

/// Sorts batches first-expiry-first-out in place.
pub fn sort_fefo(batches: &mut [InventoryBatch]) {
    batches.sort_by_key(fefo_key);
}

/// Batches of `product_id` with stock on hand, in FEFO order.
///
/// Expired batches are included and flagged so write-off workflows can see
/// them.
pub fn candidate_batches(
    batches: &[InventoryBatch],
    product_id: i64,
    today: NaiveDate,
    pricing: Option<PricingContext<'_>>,
) -> Vec<BatchCandidate> {
    let mut available: Vec<&InventoryBatch> = batches
        .iter()
        .filter(|b| b.product_id == product_id && b.quantity > 0)
        .collect();
    available.sort_by_key(|b| fefo_key(b));

    available
        .into_iter()
        .map(|batch| {
            let days_to_expiry = batch.days_to_expiry(today);
            BatchCandidate {
                batch: batch.clone(),
                days_to_expiry,
                risk: ExpiryRisk::from_days(days_to_expiry),
                expired: batch.is_expired(today),
                suggested: pricing.map(|ctx| {
                    suggest_price(&ctx.table, ctx.customer_type, product_id, batch.unit_cost)
                }),
            }
        })
        .collect()
}

/// Checks that `batch_id` can supply `quantity` units of `product_id`.
pub fn select_batch<'b>(
    batches: &'b [InventoryBatch],
    product_id: i64,
    batch_id: i64,
    quantity: i64,
) -> CoreResult<&'b InventoryBatch> {
    let batch = batches
        .iter()
        .find(|b| b.id == batch_id)
        .ok_or_else(|| CoreError::not_found("batch", batch_id))?;

    if batch.product_id != product_id {
        return Err(CoreError::BatchProductMismatch {
            batch_id,
            product_id,
        });
    }

    if quantity > batch.quantity {
        return Err(CoreError::InsufficientStock {
            batch_code: batch.batch_code.clone(),
            available: batch.quantity,
            requested: quantity,
        });
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::margin::{MarginDefaults, MarginSource};
    use crate::money::Money;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn batch(id: i64, product_id: i64, code: &str, qty: i64, expiry: NaiveDate) -> InventoryBatch {
        InventoryBatch {
            id,
            product_id,
            supplier_id: 1,
            brand: "Calpol".to_string(),
            batch_code: code.to_string(),
            quantity: qty,
            purchase_date: date(2024, 6, 1),
            expiry_date: expiry,
            unit_cost: Money::from_rupees(10),
        }
    }

    #[test]
    fn test_expiry_bands() {
        assert_eq!(ExpiryRisk::from_days(-1), ExpiryRisk::Expired);
        assert_eq!(ExpiryRisk::from_days(0), ExpiryRisk::Critical);
        assert_eq!(ExpiryRisk::from_days(29), ExpiryRisk::Critical);
        assert_eq!(ExpiryRisk::from_days(30), ExpiryRisk::Warning);
        assert_eq!(ExpiryRisk::from_days(89), ExpiryRisk::Warning);
        assert_eq!(ExpiryRisk::from_days(90), ExpiryRisk::Caution);
        assert_eq!(ExpiryRisk::from_days(179), ExpiryRisk::Caution);
        assert_eq!(ExpiryRisk::from_days(180), ExpiryRisk::Safe);
    }

    #[test]
    fn test_candidates_are_fefo_and_keep_expired() {
        let today = date(2025, 1, 15);
        let batches = vec![
            batch(1, 12, "CP2406", 50, date(2025, 9, 30)),
            batch(2, 12, "CP2309", 5, date(2025, 1, 10)),
            batch(3, 12, "CP2401", 20, date(2025, 2, 1)),
            batch(4, 12, "EMPTY", 0, date(2025, 1, 20)),
            batch(5, 99, "OTHER", 10, date(2025, 1, 1)),
        ];

        let candidates = candidate_batches(&batches, 12, today, None);
        let codes: Vec<&str> = candidates.iter().map(|c| c.batch.batch_code.as_str()).collect();
        assert_eq!(codes, vec!["CP2309", "CP2401", "CP2406"]);

        assert!(candidates
            .windows(2)
            .all(|w| w[0].batch.expiry_date <= w[1].batch.expiry_date));

        assert!(candidates[0].expired);
        assert_eq!(candidates[0].days_to_expiry, -5);
        assert_eq!(candidates[0].risk, ExpiryRisk::Expired);
        assert_eq!(candidates[1].risk, ExpiryRisk::Critical);
        assert_eq!(candidates[2].risk, ExpiryRisk::Safe);
        assert!(candidates[0].suggested.is_none());
    }

    #[test]
    fn test_expiry_ties_break_on_purchase_date() {
        let expiry = date(2025, 6, 30);
        let mut newer = batch(1, 12, "NEW", 10, expiry);
        newer.purchase_date = date(2024, 12, 1);
        let older = batch(2, 12, "OLD", 10, expiry);

        let candidates = candidate_batches(&[newer, older], 12, date(2025, 1, 1), None);
        assert_eq!(candidates[0].batch.batch_code, "OLD");
    }

    #[test]
    fn test_candidates_carry_price_suggestion() {
        let batches = vec![batch(1, 12, "CP2401", 20, date(2025, 9, 1))];
        let ctx = PricingContext {
            table: MarginTable::new(&[], MarginDefaults::default()),
            customer_type: CustomerType::B,
        };
        let candidates = candidate_batches(&batches, 12, date(2025, 1, 1), Some(ctx));
        let suggested = candidates[0].suggested.unwrap();
        assert_eq!(suggested.quote.price, Money::from_rupees(14));
        assert_eq!(suggested.source, MarginSource::TierDefault);
    }

    #[test]
    fn test_select_batch_checks_stock_and_product() {
        let batches = vec![batch(1, 12, "B-1042", 45, date(2025, 9, 1))];

        assert!(select_batch(&batches, 12, 1, 45).is_ok());
        assert_eq!(
            select_batch(&batches, 12, 1, 60).unwrap_err(),
            CoreError::InsufficientStock {
                batch_code: "B-1042".to_string(),
                available: 45,
                requested: 60,
            }
        );
        assert!(matches!(
            select_batch(&batches, 13, 1, 1),
            Err(CoreError::BatchProductMismatch { .. })
        ));
        assert!(matches!(
            select_batch(&batches, 12, 7, 1),
            Err(CoreError::NotFound { entity: "batch", id: 7 })
        ));
    }
}
