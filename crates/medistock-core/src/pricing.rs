//! # Pricing Calculator
//!
//! Turns a batch's unit cost into a suggested selling rate.
//!
//! ```text
//! price = round_half_up(cost × (1 + margin / 100), 2)
//! price < floor ? floor (floor_applied = true) : price
//! ```
//!
//! The result is a suggestion only: the operator types the final rate on the
//! sale line.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::margin::{MarginSource, MarginTable};
use crate::money::Money;
use crate::types::{CustomerType, Percent};

/// Outcome of a price calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    /// Price to suggest (floor already applied).
    pub price: Money,
    /// Margin-derived price before the floor check.
    pub computed: Money,
    pub margin: Percent,
    pub floor: Option<Money>,
    pub floor_applied: bool,
}

/// Computes a selling price from cost and margin with an optional floor.
///
/// A zero or negative cost computes to zero; the floor, if any, still applies.
///
/// ```rust
/// use medistock_core::money::Money;
/// use medistock_core::pricing::calculate_price;
/// use medistock_core::types::Percent;
///
/// let quote = calculate_price(Money::from_rupees(100), Percent::whole(30), None);
/// assert_eq!(quote.price, Money::from_rupees(130));
///
/// let quote = calculate_price(
///     Money::from_rupees(10),
///     Percent::whole(30),
///     Some(Money::from_rupees(15)),
/// );
/// assert_eq!(quote.price, Money::from_rupees(15));
/// assert!(quote.floor_applied);
/// ```
pub fn calculate_price(cost: Money, margin: Percent, floor: Option<Money>) -> PriceQuote {
    let computed = if cost.is_positive() {
        cost.marked_up(margin)
    } else {
        Money::zero()
    };

    let (price, floor_applied) = match floor {
        Some(min) if computed < min => (min, true),
        _ => (computed, false),
    };

    PriceQuote {
        price,
        computed,
        margin,
        floor,
        floor_applied,
    }
}

/// Price suggestion for a customer tier, with the margin's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceSuggestion {
    pub quote: PriceQuote,
    pub source: MarginSource,
}

/// Resolves the margin for (customer type, product) and prices the cost.
pub fn suggest_price(
    table: &MarginTable<'_>,
    customer_type: CustomerType,
    product_id: i64,
    cost: Money,
) -> PriceSuggestion {
    let resolved = table.resolve(customer_type, product_id);
    PriceSuggestion {
        quote: calculate_price(cost, resolved.margin, resolved.floor),
        source: resolved.source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::margin::MarginDefaults;
    use crate::types::MarginRule;

    #[test]
    fn test_price_without_floor_matches_rounded_markup() {
        // (cost paise, margin bps, expected paise)
        let cases = [
            (10_000, 3_000, 13_000),
            (1_005, 1_000, 1_106), // 11.055 rounds up
            (999, 1_250, 1_124),   // 11.23875
            (4_545, 0, 4_545),
            (1, 4_999, 1),         // 0.014999 rounds down
        ];
        for (cost, bps, expected) in cases {
            let quote = calculate_price(Money::from_paise(cost), Percent::from_bps(bps), None);
            assert_eq!(quote.price.paise(), expected, "cost={cost} bps={bps}");
            assert!(!quote.floor_applied);
        }
    }

    #[test]
    fn test_floor_applied_only_when_below() {
        let cost = Money::from_rupees(10);
        let margin = Percent::whole(30);

        let below = calculate_price(cost, margin, Some(Money::from_rupees(14)));
        assert_eq!(below.price, Money::from_rupees(14));
        assert_eq!(below.computed, Money::from_rupees(13));
        assert!(below.floor_applied);

        let equal = calculate_price(cost, margin, Some(Money::from_rupees(13)));
        assert_eq!(equal.price, Money::from_rupees(13));
        assert!(!equal.floor_applied);

        let above = calculate_price(cost, margin, Some(Money::from_rupees(5)));
        assert_eq!(above.price, Money::from_rupees(13));
        assert!(!above.floor_applied);
    }

    #[test]
    fn test_non_positive_cost_prices_to_zero() {
        let quote = calculate_price(Money::zero(), Percent::whole(40), None);
        assert_eq!(quote.price, Money::zero());

        let quote = calculate_price(Money::from_paise(-500), Percent::whole(40), None);
        assert_eq!(quote.price, Money::zero());

        let quote = calculate_price(Money::zero(), Percent::whole(40), Some(Money::from_rupees(2)));
        assert_eq!(quote.price, Money::from_rupees(2));
        assert!(quote.floor_applied);
    }

    #[test]
    fn test_suggest_price_uses_rule_then_default() {
        let rules = vec![MarginRule {
            id: 3,
            customer_type: CustomerType::A,
            product_id: 7,
            margin: Percent::whole(20),
            min_price: Some(Money::from_rupees(125)),
        }];
        let table = MarginTable::new(&rules, MarginDefaults::default());
        let cost = Money::from_rupees(100);

        let a = suggest_price(&table, CustomerType::A, 7, cost);
        assert_eq!(a.quote.price, Money::from_rupees(125));
        assert!(a.quote.floor_applied);
        assert_eq!(a.source, MarginSource::Rule { rule_id: 3 });

        let c = suggest_price(&table, CustomerType::C, 7, cost);
        assert_eq!(c.quote.price, Money::from_rupees(150));
        assert_eq!(c.source, MarginSource::TierDefault);
    }
}
