use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::booking::stay_nights;
use super::pricing::{OverrideTable, resolve_price};
use super::property::Property;
use crate::error::{CalendarError, Result};

pub const WEEKLY_MIN_NIGHTS: u32 = 7;
pub const MONTHLY_MIN_NIGHTS: u32 = 28;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Weekly,
    Monthly,
}

impl DiscountType {
    pub fn min_nights(self) -> u32 {
        match self {
            Self::Weekly => WEEKLY_MIN_NIGHTS,
            Self::Monthly => MONTHLY_MIN_NIGHTS,
        }
    }
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

/// At most one rule exists per (property, type).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountRule {
    pub property_id: String,
    pub discount_type: DiscountType,
    pub percentage: f64,
    #[serde(default = "default_true")]
    pub is_percentage: bool,
}

fn default_true() -> bool {
    true
}

impl DiscountRule {
    pub fn new(property_id: &str, discount_type: DiscountType, percentage: f64) -> Result<Self> {
        let rule = Self {
            property_id: property_id.to_string(),
            discount_type,
            percentage,
            is_percentage: true,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<()> {
        if self.property_id.trim().is_empty() {
            return Err(CalendarError::invalid("discount rule needs a property"));
        }
        if !self.percentage.is_finite() || !(0.0..=100.0).contains(&self.percentage) {
            return Err(CalendarError::invalid(format!(
                "{} discount must be between 0 and 100, got {}",
                self.discount_type, self.percentage
            )));
        }
        Ok(())
    }
}

/// Rule that applies to a stay of `nights`; monthly wins when both thresholds are met.
pub fn applicable_rule(nights: u32, rules: &[DiscountRule]) -> Option<&DiscountRule> {
    let find = |kind: DiscountType| rules.iter().find(|r| r.discount_type == kind);
    if nights >= MONTHLY_MIN_NIGHTS
        && let Some(rule) = find(DiscountType::Monthly)
    {
        return Some(rule);
    }
    if nights >= WEEKLY_MIN_NIGHTS
        && let Some(rule) = find(DiscountType::Weekly)
    {
        return Some(rule);
    }
    None
}

pub fn applicable_discount(nights: u32, rules: &[DiscountRule]) -> Option<f64> {
    applicable_rule(nights, rules).map(|r| r.percentage)
}

// ---------------------------------------------------------------------------
// Stay quote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NightPrice {
    pub date: NaiveDate,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StayQuote {
    pub property_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights: u32,
    pub nightly: Vec<NightPrice>,
    pub subtotal: f64,
    pub discount_type: Option<DiscountType>,
    pub discount_percentage: Option<f64>,
    pub discount_amount: f64,
    pub total: f64,
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Price every night of `[check_in, check_out)` and apply the length-of-stay discount.
///
/// A rule with `is_percentage == false` is a fixed amount off the stay, capped
/// at the subtotal.
pub fn quote_stay(
    property: &Property,
    check_in: NaiveDate,
    check_out: NaiveDate,
    overrides: &OverrideTable,
    rules: &[DiscountRule],
) -> Result<StayQuote> {
    if check_out <= check_in {
        return Err(CalendarError::invalid(format!(
            "check-out {check_out} must be after check-in {check_in}"
        )));
    }
    let nightly: Vec<NightPrice> = check_in
        .iter_days()
        .take_while(|d| *d < check_out)
        .map(|date| NightPrice {
            date,
            price: resolve_price(property, date, overrides),
        })
        .collect();
    let nights = stay_nights(check_in, check_out);
    let subtotal = round_cents(nightly.iter().map(|n| n.price).sum());

    let rule = applicable_rule(nights, rules);
    let discount_amount = match rule {
        Some(r) if r.is_percentage => round_cents(subtotal * r.percentage / 100.0),
        Some(r) => r.percentage.min(subtotal),
        None => 0.0,
    };

    Ok(StayQuote {
        property_id: property.id.clone(),
        check_in,
        check_out,
        nights,
        nightly,
        subtotal,
        discount_type: rule.map(|r| r.discount_type),
        discount_percentage: rule.filter(|r| r.is_percentage).map(|r| r.percentage),
        discount_amount,
        total: round_cents(subtotal - discount_amount),
    })
}

impl std::fmt::Display for StayQuote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "# Stay quote: property {} ({} to {}, {} nights)",
            self.property_id, self.check_in, self.check_out, self.nights
        )?;
        for night in &self.nightly {
            writeln!(f, "  {}  {:>10.2}", night.date, night.price)?;
        }
        writeln!(f, "Subtotal: {:.2}", self.subtotal)?;
        if let Some(kind) = self.discount_type {
            match self.discount_percentage {
                Some(pct) => writeln!(
                    f,
                    "Discount ({kind}, {pct}%): -{:.2}",
                    self.discount_amount
                )?,
                None => writeln!(f, "Discount ({kind}): -{:.2}", self.discount_amount)?,
            }
        }
        writeln!(f, "Total: {:.2}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{date, make_override, make_property};

    fn both_rules() -> Vec<DiscountRule> {
        vec![
            DiscountRule::new("p1", DiscountType::Weekly, 10.0).unwrap(),
            DiscountRule::new("p1", DiscountType::Monthly, 25.0).unwrap(),
        ]
    }

    #[test]
    fn threshold_boundaries() {
        let rules = both_rules();
        assert_eq!(applicable_discount(1, &rules), None);
        assert_eq!(applicable_discount(6, &rules), None);
        assert_eq!(applicable_discount(7, &rules), Some(10.0));
        assert_eq!(applicable_discount(27, &rules), Some(10.0));
        assert_eq!(applicable_discount(28, &rules), Some(25.0));
        assert_eq!(applicable_discount(90, &rules), Some(25.0));
    }

    #[test]
    fn long_stay_without_monthly_rule_gets_weekly() {
        let rules = vec![DiscountRule::new("p1", DiscountType::Weekly, 10.0).unwrap()];
        assert_eq!(applicable_discount(40, &rules), Some(10.0));
    }

    #[test]
    fn monthly_only_does_not_apply_to_week() {
        let rules = vec![DiscountRule::new("p1", DiscountType::Monthly, 25.0).unwrap()];
        assert_eq!(applicable_discount(10, &rules), None);
        assert_eq!(applicable_discount(28, &rules), Some(25.0));
    }

    #[test]
    fn no_rules_no_discount() {
        assert_eq!(applicable_discount(30, &[]), None);
    }

    #[test]
    fn rule_validation() {
        assert!(DiscountRule::new("p1", DiscountType::Weekly, 0.0).is_ok());
        assert!(DiscountRule::new("p1", DiscountType::Weekly, 100.0).is_ok());
        assert!(DiscountRule::new("p1", DiscountType::Weekly, 100.5).is_err());
        assert!(DiscountRule::new("p1", DiscountType::Weekly, -1.0).is_err());
        assert!(DiscountRule::new("p1", DiscountType::Weekly, f64::NAN).is_err());
        assert!(DiscountRule::new(" ", DiscountType::Weekly, 5.0).is_err());
    }

    #[test]
    fn quote_uses_overrides_and_weekly_discount() {
        let property = make_property("p1", 100.0);
        let overrides = OverrideTable::from_rows(vec![make_override("p1", "2024-06-12", 150.0)]);
        let quote = quote_stay(
            &property,
            date("2024-06-10"),
            date("2024-06-17"),
            &overrides,
            &both_rules(),
        )
        .unwrap();
        assert_eq!(quote.nights, 7);
        assert_eq!(quote.nightly.len(), 7);
        assert!((quote.subtotal - 750.0).abs() < 1e-9);
        assert_eq!(quote.discount_type, Some(DiscountType::Weekly));
        assert!((quote.discount_amount - 75.0).abs() < 1e-9);
        assert!((quote.total - 675.0).abs() < 1e-9);
    }

    #[test]
    fn quote_short_stay_has_no_discount() {
        let property = make_property("p1", 99.99);
        let quote = quote_stay(
            &property,
            date("2024-06-10"),
            date("2024-06-12"),
            &OverrideTable::default(),
            &both_rules(),
        )
        .unwrap();
        assert!(quote.discount_type.is_none());
        assert!((quote.total - 199.98).abs() < 1e-9);
        assert!(quote.to_string().contains("Total: 199.98"));
    }

    #[test]
    fn quote_fixed_amount_rule_is_capped() {
        let property = make_property("p1", 10.0);
        let rules = vec![DiscountRule {
            property_id: "p1".into(),
            discount_type: DiscountType::Weekly,
            percentage: 500.0,
            is_percentage: false,
        }];
        let quote = quote_stay(
            &property,
            date("2024-06-01"),
            date("2024-06-08"),
            &OverrideTable::default(),
            &rules,
        )
        .unwrap();
        assert!((quote.discount_amount - 70.0).abs() < 1e-9);
        assert!(quote.total.abs() < 1e-9);
        assert!(quote.discount_percentage.is_none());
    }

    #[test]
    fn quote_rejects_inverted_dates() {
        let property = make_property("p1", 100.0);
        let err = quote_stay(
            &property,
            date("2024-06-10"),
            date("2024-06-10"),
            &OverrideTable::default(),
            &[],
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be after"));
    }
}
