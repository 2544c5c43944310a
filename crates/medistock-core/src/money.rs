//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Effective rate for 100 units @ ₹90.90 with 10 free:                   │
//! │    100 * 90.90 / 110 = 82.63636...                                      │
//! │                                                                         │
//! │  In f64 the intermediate 9090.000000000002 can tip a half-up rounding  │
//! │  the wrong way. OUR SOLUTION: integer paise and explicit rounding.     │
//! │    909000 paise / 110 = 8263.63 → 8264 paise = ₹82.64                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every monetary value carries exactly two fractional digits. Rounding is
//! always half-up (half away from zero), the convention invoices are printed
//! with.
//!
//! ## Usage
//! ```rust
//! use medistock_core::money::Money;
//!
//! let rate = Money::from_rupees_paise(90, 90); // ₹90.90
//! let line = rate * 100;                       // ₹9090.00
//! assert_eq!(line.paise(), 909_000);
//! assert_eq!(Money::per_unit(line, 110).paise(), 8264);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{Percent, TaxRate};

/// Divides with half-up rounding (half away from zero). `den` must be positive.
pub(crate) fn div_round_half_up(num: i128, den: i128) -> i128 {
    debug_assert!(den > 0);
    if num >= 0 {
        (num + den / 2) / den
    } else {
        -((-num + den / 2) / den)
    }
}

// =============================================================================
// Money Type
// =============================================================================

/// A rupee amount held in paise (1/100 rupee).
///
/// ## Where Money Flows
/// ```text
/// Batch.unit_cost ──► Pricing (cost × (1 + margin)) ──► suggested rate
///
/// PurchaseLine.rate ──► Scheme evaluation ──► effective unit cost
///
/// Sale.total ──► Credit check ──► Customer.outstanding ◄── Payment.amount
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// ```rust
    /// use medistock_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_paise(10, 99).paise(), 1099);
    /// assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    /// ```
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the larger of `self` and zero.
    #[inline]
    pub fn clamp_non_negative(self) -> Self {
        Money(self.0.max(0))
    }

    /// Multiplies by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `self × pct`, rounded half-up to the paisa.
    ///
    /// ```rust
    /// use medistock_core::money::Money;
    /// use medistock_core::types::Percent;
    ///
    /// let line = Money::from_rupees(1000);
    /// assert_eq!(line.percent_of(Percent::from_bps(250)).paise(), 2500); // 2.5%
    /// ```
    pub fn percent_of(&self, pct: Percent) -> Money {
        Money(div_round_half_up(self.0 as i128 * pct.bps() as i128, 10_000) as i64)
    }

    /// Returns `self × (1 + pct)`, rounded half-up.
    ///
    /// This is the margin markup: a ₹100.00 batch at 30% becomes ₹130.00.
    pub fn marked_up(&self, pct: Percent) -> Money {
        let factor = 10_000 + pct.bps() as i128;
        Money(div_round_half_up(self.0 as i128 * factor, 10_000) as i64)
    }

    /// Returns `self × (1 − pct)`, rounded half-up. Never goes below zero
    /// for discounts above 100%.
    pub fn discounted(&self, pct: Percent) -> Money {
        let factor = (10_000 - pct.bps() as i128).max(0);
        Money(div_round_half_up(self.0 as i128 * factor, 10_000) as i64)
    }

    /// Spreads a total over `units`, rounded half-up to the paisa.
    ///
    /// Returns zero when `units` is not positive.
    pub fn per_unit(total: Money, units: i64) -> Money {
        if units <= 0 {
            return Money::zero();
        }
        Money(div_round_half_up(total.0 as i128, units as i128) as i64)
    }

    /// Calculates GST on this amount, rounded half-up.
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money(div_round_half_up(self.0 as i128 * rate.bps() as i128, 10_000) as i64)
    }

    /// Renders with exactly two fractional digits and no symbol, e.g. `"82.64"`.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_paise(1099)), "₹10.99");
        assert_eq!(format!("{}", Money::from_paise(500)), "₹5.00");
        assert_eq!(format!("{}", Money::from_paise(-550)), "-₹5.50");
        assert_eq!(Money::from_paise(8264).to_decimal_string(), "82.64");
        assert_eq!(Money::zero().to_decimal_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);

        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);
        assert_eq!((-a).paise(), -1000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.paise(), 2000);
    }

    #[test]
    fn test_marked_up_rounds_half_up() {
        // ₹10.05 at 10% = 11.055 → 11.06
        let cost = Money::from_paise(1005);
        assert_eq!(cost.marked_up(Percent::from_bps(1000)).paise(), 1106);

        // ₹100 at 12.5%
        let cost = Money::from_rupees(100);
        assert_eq!(cost.marked_up(Percent::from_bps(1250)).paise(), 11250);
    }

    #[test]
    fn test_discounted() {
        let rate = Money::from_rupees(100);
        assert_eq!(rate.discounted(Percent::from_bps(1000)).paise(), 9000);
        assert_eq!(rate.discounted(Percent::from_bps(15_000)).paise(), 0);
    }

    #[test]
    fn test_per_unit() {
        let total = Money::from_paise(909_000);
        assert_eq!(Money::per_unit(total, 110).paise(), 8264);
        assert_eq!(Money::per_unit(total, 0), Money::zero());
    }

    #[test]
    fn test_tax_calculation() {
        // ₹10.00 at 12% GST
        let amount = Money::from_paise(1000);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(1200)).paise(), 120);

        // ₹10.05 at 5% = 0.5025 → 0.50
        let amount = Money::from_paise(1005);
        assert_eq!(amount.calculate_tax(TaxRate::from_bps(500)).paise(), 50);
    }

    #[test]
    fn test_negative_rounding_is_symmetric() {
        assert_eq!(div_round_half_up(15, 10), 2);
        assert_eq!(div_round_half_up(-15, 10), -2);
        assert_eq!(div_round_half_up(14, 10), 1);
    }
}
