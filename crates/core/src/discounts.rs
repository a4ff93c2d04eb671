//! Volume discounts
//!
//! The venue discounts whole orders by how many sticks they contain. A
//! [`DiscountSchedule`] is a step function over the total stick count: the
//! highest tier whose threshold is met sets the discount amount. Order totals
//! are clamped so the discount can never push a total below zero.

use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;

use crate::cart::CartItem;

/// Errors raised while building a discount schedule.
#[derive(Debug, Error, PartialEq)]
pub enum DiscountScheduleError {
    /// Tier thresholds must be strictly ascending (index of the offending tier).
    #[error("tier {0} does not have a higher threshold than the tier before it")]
    UnorderedThresholds(usize),

    /// Tier amounts must never decrease as thresholds rise (index of the offending tier).
    #[error("tier {0} discounts less than the tier before it")]
    DecreasingAmount(usize),

    /// Tier amounts must not be negative (index of the offending tier).
    #[error("tier {0} has a negative discount")]
    NegativeAmount(usize),

    /// A tier's currency differs from the schedule currency (index, tier currency, schedule currency).
    #[error("tier {0} has currency {1}, but the schedule has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),
}

/// Errors raised while totalling a cart.
#[derive(Debug, Error, PartialEq)]
pub enum TotalsError {
    /// A line or running total exceeded the representable range.
    #[error("cart total overflowed")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// A single discount step: carts with at least `min_sticks` sticks get `amount` off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscountTier<'a> {
    min_sticks: u32,
    amount: Money<'a, Currency>,
}

impl<'a> DiscountTier<'a> {
    /// Create a tier.
    pub fn new(min_sticks: u32, amount: Money<'a, Currency>) -> Self {
        Self { min_sticks, amount }
    }

    /// Minimum stick count needed to reach this tier.
    pub const fn min_sticks(&self) -> u32 {
        self.min_sticks
    }

    /// Discount granted at this tier.
    pub fn amount(&self) -> &Money<'a, Currency> {
        &self.amount
    }
}

/// Validated, monotonic discount step function.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountSchedule<'a> {
    tiers: Vec<DiscountTier<'a>>,
    currency: &'a Currency,
}

impl<'a> DiscountSchedule<'a> {
    /// Build a schedule from tiers ordered by ascending threshold.
    ///
    /// # Errors
    ///
    /// Returns a [`DiscountScheduleError`] if the tiers are unordered, decrease,
    /// are negative or are priced in another currency.
    pub fn new(
        tiers: impl Into<Vec<DiscountTier<'a>>>,
        currency: &'a Currency,
    ) -> Result<Self, DiscountScheduleError> {
        let tiers = tiers.into();

        let mut previous: Option<&DiscountTier<'a>> = None;

        for (idx, tier) in tiers.iter().enumerate() {
            if tier.amount.currency() != currency {
                return Err(DiscountScheduleError::CurrencyMismatch(
                    idx,
                    tier.amount.currency().iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }

            if tier.amount.is_negative() {
                return Err(DiscountScheduleError::NegativeAmount(idx));
            }

            if let Some(previous) = previous {
                if tier.min_sticks <= previous.min_sticks {
                    return Err(DiscountScheduleError::UnorderedThresholds(idx));
                }

                if tier.amount.to_minor_units() < previous.amount.to_minor_units() {
                    return Err(DiscountScheduleError::DecreasingAmount(idx));
                }
            }

            previous = Some(tier);
        }

        Ok(Self { tiers, currency })
    }

    /// The venue's standard schedule: 10 off from 10 sticks, 20 off from 20,
    /// 40 off from 30.
    pub fn standard(currency: &'a Currency) -> Self {
        let major = 10_i64.pow(currency.exponent);

        Self {
            tiers: vec![
                DiscountTier::new(10, Money::from_minor(10 * major, currency)),
                DiscountTier::new(20, Money::from_minor(20 * major, currency)),
                DiscountTier::new(30, Money::from_minor(40 * major, currency)),
            ],
            currency,
        }
    }

    /// The tiers in ascending threshold order.
    pub fn tiers(&self) -> &[DiscountTier<'a>] {
        &self.tiers
    }

    /// Currency the schedule is priced in.
    pub fn currency(&self) -> &'a Currency {
        self.currency
    }

    /// Discount for an order of `stick_count` sticks.
    pub fn discount_for(&self, stick_count: u32) -> Money<'a, Currency> {
        self.tiers
            .iter()
            .rev()
            .find(|tier| stick_count >= tier.min_sticks)
            .map_or_else(|| Money::from_minor(0, self.currency), |tier| tier.amount)
    }

    /// Price a set of cart lines.
    ///
    /// # Errors
    ///
    /// Returns [`TotalsError::Overflow`] if the subtotal or stick count cannot be represented.
    pub fn totals(&self, items: &[CartItem]) -> Result<Totals<'a>, TotalsError> {
        let (subtotal, stick_count) = items.iter().try_fold(
            (0_i64, 0_u32),
            |(subtotal, sticks), item| -> Result<(i64, u32), TotalsError> {
                let line = item.line_subtotal_minor().ok_or(TotalsError::Overflow)?;

                Ok((
                    subtotal.checked_add(line).ok_or(TotalsError::Overflow)?,
                    sticks
                        .checked_add(item.quantity())
                        .ok_or(TotalsError::Overflow)?,
                ))
            },
        )?;

        let discount = self.discount_for(stick_count);
        let total = subtotal
            .checked_sub(discount.to_minor_units())
            .ok_or(TotalsError::Overflow)?
            .max(0);

        Ok(Totals {
            subtotal: Money::from_minor(subtotal, self.currency),
            discount,
            total: Money::from_minor(total, self.currency),
            stick_count,
        })
    }
}

/// Priced summary of a cart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals<'a> {
    /// Sum of every line's unit price times quantity.
    pub subtotal: Money<'a, Currency>,

    /// Volume discount for `stick_count`.
    pub discount: Money<'a, Currency>,

    /// `subtotal - discount`, never below zero.
    pub total: Money<'a, Currency>,

    /// Total quantity across all lines.
    pub stick_count: u32,
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{cart::CartItem, uuids::TypedUuid};

    use super::*;

    fn line(price: u64, quantity: u32) -> CartItem {
        CartItem::new(TypedUuid::now_v7(), "Skewer", None, price, quantity, None)
    }

    #[test]
    fn standard_schedule_steps() {
        let schedule = DiscountSchedule::standard(iso::THB);

        let cases = [
            (0, 0),
            (9, 0),
            (10, 10_00),
            (19, 10_00),
            (20, 20_00),
            (29, 20_00),
            (30, 40_00),
            (1000, 40_00),
        ];

        for (sticks, expected) in cases {
            assert_eq!(
                schedule.discount_for(sticks),
                Money::from_minor(expected, iso::THB),
                "discount for {sticks} sticks"
            );
        }
    }

    #[test]
    fn discount_is_monotonic() {
        let schedule = DiscountSchedule::standard(iso::THB);

        let amounts: Vec<i64> = (0..=100)
            .map(|sticks| schedule.discount_for(sticks).to_minor_units())
            .collect();

        assert!(
            amounts.windows(2).all(|pair| pair.first() <= pair.get(1)),
            "discounts should never decrease"
        );
    }

    #[test]
    fn totals_of_empty_cart_are_zero() -> TestResult {
        let totals = DiscountSchedule::standard(iso::THB).totals(&[])?;

        assert_eq!(totals.subtotal, Money::from_minor(0, iso::THB));
        assert_eq!(totals.discount, Money::from_minor(0, iso::THB));
        assert_eq!(totals.total, Money::from_minor(0, iso::THB));
        assert_eq!(totals.stick_count, 0);

        Ok(())
    }

    #[test]
    fn totals_apply_tier_discount() -> TestResult {
        let totals = DiscountSchedule::standard(iso::THB).totals(&[line(5_00, 30)])?;

        assert_eq!(totals.subtotal, Money::from_minor(150_00, iso::THB));
        assert_eq!(totals.discount, Money::from_minor(40_00, iso::THB));
        assert_eq!(totals.total, Money::from_minor(110_00, iso::THB));

        Ok(())
    }

    #[test]
    fn totals_never_go_negative() -> TestResult {
        let totals = DiscountSchedule::standard(iso::THB).totals(&[line(1_00, 30)])?;

        assert_eq!(totals.subtotal, Money::from_minor(30_00, iso::THB));
        assert_eq!(totals.discount, Money::from_minor(40_00, iso::THB));
        assert_eq!(totals.total, Money::from_minor(0, iso::THB));

        Ok(())
    }

    #[test]
    fn totals_are_idempotent() -> TestResult {
        let schedule = DiscountSchedule::standard(iso::THB);
        let items = [line(15_00, 2), line(20_00, 1)];

        assert_eq!(schedule.totals(&items)?, schedule.totals(&items)?);

        Ok(())
    }

    #[test]
    fn totals_report_overflow() {
        let schedule = DiscountSchedule::standard(iso::THB);

        let result = schedule.totals(&[line(u64::MAX, 2)]);

        assert_eq!(result, Err(TotalsError::Overflow));
    }

    #[test]
    fn new_rejects_unordered_thresholds() {
        let result = DiscountSchedule::new(
            [
                DiscountTier::new(20, Money::from_minor(10_00, iso::THB)),
                DiscountTier::new(10, Money::from_minor(20_00, iso::THB)),
            ],
            iso::THB,
        );

        assert_eq!(result, Err(DiscountScheduleError::UnorderedThresholds(1)));
    }

    #[test]
    fn new_rejects_decreasing_amounts() {
        let result = DiscountSchedule::new(
            [
                DiscountTier::new(10, Money::from_minor(20_00, iso::THB)),
                DiscountTier::new(20, Money::from_minor(10_00, iso::THB)),
            ],
            iso::THB,
        );

        assert_eq!(result, Err(DiscountScheduleError::DecreasingAmount(1)));
    }

    #[test]
    fn new_rejects_currency_mismatch() {
        let result = DiscountSchedule::new(
            [DiscountTier::new(10, Money::from_minor(10_00, iso::GBP))],
            iso::THB,
        );

        assert_eq!(
            result,
            Err(DiscountScheduleError::CurrencyMismatch(
                0,
                iso::GBP.iso_alpha_code,
                iso::THB.iso_alpha_code
            ))
        );
    }

    #[test]
    fn misconfigured_schedule_still_clamps_total() -> TestResult {
        let schedule = DiscountSchedule::new(
            [DiscountTier::new(1, Money::from_minor(1_000_00, iso::THB))],
            iso::THB,
        )?;

        let totals = schedule.totals(&[line(10_00, 1)])?;

        assert_eq!(totals.total, Money::from_minor(0, iso::THB));

        Ok(())
    }
}
