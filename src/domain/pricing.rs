use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::property::Property;
use crate::error::{CalendarError, Result};

/// Manual or simulator-applied price for exactly one (property, date).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceOverride {
    pub property_id: String,
    pub date: NaiveDate,
    pub price: f64,
}

/// In-memory override lookup keyed by (property, calendar day).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    prices: HashMap<(String, NaiveDate), f64>,
}

impl OverrideTable {
    /// Later rows for the same key replace earlier ones.
    pub fn from_rows(rows: impl IntoIterator<Item = PriceOverride>) -> Self {
        let mut table = Self::default();
        for row in rows {
            table.upsert(row);
        }
        table
    }

    pub fn upsert(&mut self, row: PriceOverride) {
        self.prices.insert((row.property_id, row.date), row.price);
    }

    pub fn get(&self, property_id: &str, date: NaiveDate) -> Option<f64> {
        self.prices.get(&(property_id.to_string(), date)).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Rows sorted by property then date.
    pub fn rows(&self) -> Vec<PriceOverride> {
        let mut rows: Vec<PriceOverride> = self
            .prices
            .iter()
            .map(|((property_id, date), price)| PriceOverride {
                property_id: property_id.clone(),
                date: *date,
                price: *price,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.property_id
                .cmp(&b.property_id)
                .then_with(|| a.date.cmp(&b.date))
        });
        rows
    }
}

/// Effective nightly price: an override for the exact day wins over the base rate.
pub fn resolve_price(property: &Property, date: NaiveDate, overrides: &OverrideTable) -> f64 {
    overrides
        .get(&property.id, date)
        .unwrap_or(property.base_price)
}

/// Validate a price typed into a calendar cell.
pub fn parse_price(input: &str) -> Result<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CalendarError::invalid("price is required"));
    }
    let price: f64 = trimmed
        .parse()
        .map_err(|_| CalendarError::invalid(format!("price '{trimmed}' is not a number")))?;
    validate_price(price)?;
    Ok(price)
}

pub fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        return Err(CalendarError::invalid(format!(
            "price must be a positive amount, got {price}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{date, make_override, make_property};

    #[test]
    fn override_takes_precedence() {
        let property = make_property("p1", 200.0);
        let overrides = OverrideTable::from_rows(vec![make_override("p1", "2024-06-15", 350.0)]);
        assert!((resolve_price(&property, date("2024-06-15"), &overrides) - 350.0).abs() < f64::EPSILON);
        assert!((resolve_price(&property, date("2024-06-14"), &overrides) - 200.0).abs() < f64::EPSILON);
        assert!((resolve_price(&property, date("2024-06-16"), &overrides) - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn override_for_other_property_is_ignored() {
        let property = make_property("p1", 200.0);
        let overrides = OverrideTable::from_rows(vec![make_override("p2", "2024-06-15", 350.0)]);
        assert!((resolve_price(&property, date("2024-06-15"), &overrides) - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn upsert_replaces_same_key() {
        let mut table = OverrideTable::default();
        table.upsert(make_override("p1", "2024-06-15", 300.0));
        table.upsert(make_override("p1", "2024-06-15", 320.0));
        table.upsert(make_override("p1", "2024-06-16", 310.0));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("p1", date("2024-06-15")), Some(320.0));
    }

    #[test]
    fn rows_are_sorted() {
        let table = OverrideTable::from_rows(vec![
            make_override("p2", "2024-06-01", 1.0),
            make_override("p1", "2024-06-03", 2.0),
            make_override("p1", "2024-06-02", 3.0),
        ]);
        let keys: Vec<(String, NaiveDate)> = table
            .rows()
            .into_iter()
            .map(|r| (r.property_id, r.date))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("p1".to_string(), date("2024-06-02")),
                ("p1".to_string(), date("2024-06-03")),
                ("p2".to_string(), date("2024-06-01")),
            ]
        );
    }

    #[test]
    fn parse_price_accepts_decimal() {
        assert!((parse_price(" 149.5 ").unwrap() - 149.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_price_rejects_bad_input() {
        for input in ["", "   ", "abc", "12e", "-5", "0", "NaN", "inf"] {
            let err = parse_price(input).unwrap_err();
            assert!(
                matches!(err, CalendarError::InvalidInput { .. }),
                "{input:?} should be rejected"
            );
        }
    }
}
