#![allow(clippy::cast_precision_loss)]

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::calendar::{build_month_grid, month_bounds};
use super::pricing::PriceOverride;
use super::property::Property;
use crate::ports::holidays::HolidayCalendar;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Conservative,
    Balanced,
    Aggressive,
}

impl Strategy {
    pub fn multiplier(self, multipliers: &StrategyMultipliers) -> f64 {
        match self {
            Self::Conservative => multipliers.conservative,
            Self::Balanced => multipliers.balanced,
            Self::Aggressive => multipliers.aggressive,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conservative => write!(f, "conservative"),
            Self::Balanced => write!(f, "balanced"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PriceReason {
    BasePrice,
    Weekend,
    Holiday,
}

impl std::fmt::Display for PriceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BasePrice => write!(f, "Base Price"),
            Self::Weekend => write!(f, "Weekend"),
            Self::Holiday => write!(f, "Holiday"),
        }
    }
}

pub const DEFAULT_HOLIDAY_BOOST: f64 = 0.3;

/// Weekend multiplier of each strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StrategyMultipliers {
    #[serde(default = "default_conservative")]
    pub conservative: f64,
    #[serde(default = "default_balanced")]
    pub balanced: f64,
    #[serde(default = "default_aggressive")]
    pub aggressive: f64,
}

impl Default for StrategyMultipliers {
    fn default() -> Self {
        Self {
            conservative: default_conservative(),
            balanced: default_balanced(),
            aggressive: default_aggressive(),
        }
    }
}

fn default_conservative() -> f64 {
    1.1
}

fn default_balanced() -> f64 {
    1.2
}

fn default_aggressive() -> f64 {
    1.3
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub multipliers: StrategyMultipliers,
    pub holiday_boost: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            multipliers: StrategyMultipliers::default(),
            holiday_boost: DEFAULT_HOLIDAY_BOOST,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatedDay {
    pub date: NaiveDate,
    pub price: f64,
    pub reason: PriceReason,
}

/// Proposed prices for one property and month, held between "simulate" and
/// "apply". Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingSimulation {
    pub property_id: String,
    pub property_title: String,
    /// First day of the simulated month.
    pub month: NaiveDate,
    pub strategy: Strategy,
    pub base_price: f64,
    pub days: Vec<SimulatedDay>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimulationSummary {
    pub base_days: u32,
    pub weekend_days: u32,
    pub holiday_days: u32,
    pub average_price: Option<f64>,
    /// Average proposed price relative to the base price, in percent.
    pub uplift_pct: Option<f64>,
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Propose a price for every day of `target_month`.
///
/// Holidays get `base * (multiplier + holiday_boost)`, weekends
/// `base * multiplier`, other days the base price. Results are rounded to
/// whole currency units.
pub fn simulate(
    property: &Property,
    target_month: NaiveDate,
    strategy: Strategy,
    settings: &SimulationSettings,
    holidays: &dyn HolidayCalendar,
) -> PendingSimulation {
    let multiplier = strategy.multiplier(&settings.multipliers);
    let base = property.base_price;
    let days = build_month_grid(target_month)
        .into_iter()
        .map(|date| {
            let (price, reason) = if holidays.is_holiday(date) {
                (
                    base * (multiplier + settings.holiday_boost),
                    PriceReason::Holiday,
                )
            } else if is_weekend(date) {
                (base * multiplier, PriceReason::Weekend)
            } else {
                (base, PriceReason::BasePrice)
            };
            SimulatedDay {
                date,
                price: price.round(),
                reason,
            }
        })
        .collect();

    PendingSimulation {
        property_id: property.id.clone(),
        property_title: property.title.clone(),
        month: month_bounds(target_month).0,
        strategy,
        base_price: base,
        days,
    }
}

impl PendingSimulation {
    pub fn to_overrides(&self) -> Vec<PriceOverride> {
        self.days
            .iter()
            .map(|d| PriceOverride {
                property_id: self.property_id.clone(),
                date: d.date,
                price: d.price,
            })
            .collect()
    }

    pub fn summary(&self) -> SimulationSummary {
        let count = |reason: PriceReason| {
            self.days.iter().filter(|d| d.reason == reason).count() as u32
        };
        let average_price = if self.days.is_empty() {
            None
        } else {
            Some(self.days.iter().map(|d| d.price).sum::<f64>() / self.days.len() as f64)
        };
        let uplift_pct = average_price
            .filter(|_| self.base_price > 0.0)
            .map(|avg| (avg / self.base_price - 1.0) * 100.0);
        SimulationSummary {
            base_days: count(PriceReason::BasePrice),
            weekend_days: count(PriceReason::Weekend),
            holiday_days: count(PriceReason::Holiday),
            average_price,
            uplift_pct,
        }
    }
}

impl std::fmt::Display for PendingSimulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "# Pricing simulation: {} (ID: {})",
            self.property_title, self.property_id
        )?;
        writeln!(
            f,
            "Month: {} | Strategy: {} | Base price: {:.0}",
            self.month.format("%Y-%m"),
            self.strategy,
            self.base_price
        )?;
        let summary = self.summary();
        write!(
            f,
            "Days: {} base, {} weekend, {} holiday",
            summary.base_days, summary.weekend_days, summary.holiday_days
        )?;
        if let Some(avg) = summary.average_price {
            write!(f, " | Avg: {avg:.0}")?;
        }
        if let Some(uplift) = summary.uplift_pct {
            write!(f, " ({uplift:+.1}%)")?;
        }
        writeln!(f)?;
        writeln!(f, "{:<12} {:<4} {:>8}  {}", "Date", "Day", "Price", "Reason")?;
        writeln!(f, "{}", "-".repeat(40))?;
        for day in &self.days {
            writeln!(
                f,
                "{:<12} {:<4} {:>8.0}  {}",
                day.date.to_string(),
                day.date.format("%a").to_string(),
                day.price,
                day.reason
            )?;
        }
        Ok(())
    }
}
