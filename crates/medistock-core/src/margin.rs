//! # Margin Table
//!
//! Resolves the markup applied to a batch cost for a given customer tier and
//! product.
//!
//! ## Resolution Order
//! ```text
//! (customer_type, product_id)
//!      │
//!      ├── explicit MarginRule for the pair? ──► rule.margin, rule.min_price
//!      │
//!      └── otherwise ──► tier default (A 30%, B 40%, C 50%), no floor
//! ```
//!
//! A missing rule is a lookup miss, not an error: the tier default always
//! answers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CustomerType, MarginRule, Percent};

/// Tier-level fallback margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarginDefaults {
    pub tier_a: Percent,
    pub tier_b: Percent,
    pub tier_c: Percent,
}

impl Default for MarginDefaults {
    fn default() -> Self {
        MarginDefaults {
            tier_a: Percent::whole(30),
            tier_b: Percent::whole(40),
            tier_c: Percent::whole(50),
        }
    }
}

impl MarginDefaults {
    pub fn for_type(&self, customer_type: CustomerType) -> Percent {
        match customer_type {
            CustomerType::A => self.tier_a,
            CustomerType::B => self.tier_b,
            CustomerType::C => self.tier_c,
        }
    }
}

/// Where a resolved margin came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarginSource {
    Rule { rule_id: i64 },
    TierDefault,
}

/// Margin and optional floor for one (customer type, product) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedMargin {
    pub margin: Percent,
    pub floor: Option<Money>,
    pub source: MarginSource,
}

/// Read-only view over the margin rules collection plus tier defaults.
#[derive(Debug, Clone, Copy)]
pub struct MarginTable<'a> {
    rules: &'a [MarginRule],
    defaults: MarginDefaults,
}

impl<'a> MarginTable<'a> {
    pub fn new(rules: &'a [MarginRule], defaults: MarginDefaults) -> Self {
        MarginTable { rules, defaults }
    }

    pub fn defaults(&self) -> MarginDefaults {
        self.defaults
    }

    /// Explicit rule for the pair, if one exists. The first rule in
    /// collection order wins when duplicates slipped in.
    pub fn rule_for(&self, customer_type: CustomerType, product_id: i64) -> Option<&'a MarginRule> {
        self.rules
            .iter()
            .find(|r| r.customer_type == customer_type && r.product_id == product_id)
    }

    pub fn resolve(&self, customer_type: CustomerType, product_id: i64) -> ResolvedMargin {
        match self.rule_for(customer_type, product_id) {
            Some(rule) => ResolvedMargin {
                margin: rule.margin,
                floor: rule.min_price,
                source: MarginSource::Rule { rule_id: rule.id },
            },
            None => ResolvedMargin {
                margin: self.defaults.for_type(customer_type),
                floor: None,
                source: MarginSource::TierDefault,
            },
        }
    }
}
