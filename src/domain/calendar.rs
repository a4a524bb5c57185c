#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::availability::find_booking_for_date;
use super::booking::{Booking, BookingStatus};
use super::pricing::{OverrideTable, resolve_price};
use super::property::Property;
use crate::error::{CalendarError, Result};

// ---------------------------------------------------------------------------
// Date ranges and the month grid
// ---------------------------------------------------------------------------

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(CalendarError::invalid(format!(
                "date range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The whole calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let (start, end) = month_bounds(date);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// First and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date - Days::new(u64::from(date.day0()));
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    (first, last)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    month_bounds(date).1.day()
}

/// Every day of the month containing `month_reference`, ascending.
pub fn build_month_grid(month_reference: NaiveDate) -> Vec<NaiveDate> {
    DateRange::month_of(month_reference).days().collect()
}

/// Parse `YYYY-MM` or any `YYYY-MM-DD` inside the wanted month.
pub fn parse_month(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let full = if trimmed.len() == 7 {
        format!("{trimmed}-01")
    } else {
        trimmed.to_string()
    };
    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .map(|d| month_bounds(d).0)
        .map_err(|_| {
            CalendarError::invalid(format!("invalid month '{input}', expected YYYY-MM"))
        })
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        CalendarError::invalid(format!("invalid date '{input}', expected YYYY-MM-DD"))
    })
}

// ---------------------------------------------------------------------------
// Master calendar view
// ---------------------------------------------------------------------------

/// What the calendar shows for one (property, day): a booking pill or an
/// editable price cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarCell {
    Booked {
        date: NaiveDate,
        booking_id: String,
        status: BookingStatus,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    Open {
        date: NaiveDate,
        price: f64,
        overridden: bool,
    },
}

impl CalendarCell {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Booked { date, .. } | Self::Open { date, .. } => *date,
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            Self::Open { price, .. } => Some(*price),
            Self::Booked { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RowStats {
    pub booked_nights: u32,
    pub open_nights: u32,
    pub occupancy_rate: f64,
    pub average_open_price: Option<f64>,
    pub min_open_price: Option<f64>,
    pub max_open_price: Option<f64>,
}

impl RowStats {
    fn compute(cells: &[CalendarCell]) -> Self {
        let prices: Vec<f64> = cells.iter().filter_map(CalendarCell::price).collect();
        let total = cells.len() as u32;
        let open_nights = prices.len() as u32;
        let booked_nights = total - open_nights;
        let occupancy_rate = if total > 0 {
            f64::from(booked_nights) / f64::from(total) * 100.0
        } else {
            0.0
        };
        let average_open_price = if prices.is_empty() {
            None
        } else {
            Some(prices.iter().sum::<f64>() / prices.len() as f64)
        };
        Self {
            booked_nights,
            open_nights,
            occupancy_rate,
            average_open_price,
            min_open_price: prices.iter().copied().reduce(f64::min),
            max_open_price: prices.iter().copied().reduce(f64::max),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyRow {
    pub property_id: String,
    pub title: String,
    pub base_price: f64,
    pub cells: Vec<CalendarCell>,
    pub stats: RowStats,
}

impl PropertyRow {
    pub fn cell(&self, date: NaiveDate) -> Option<&CalendarCell> {
        self.cells.iter().find(|c| c.date() == date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterCalendar {
    /// First day of the displayed month.
    pub month: NaiveDate,
    pub rows: Vec<PropertyRow>,
}

impl MasterCalendar {
    pub fn row(&self, property_id: &str) -> Option<&PropertyRow> {
        self.rows.iter().find(|r| r.property_id == property_id)
    }
}

/// Decide, for every property and every day of the month, whether the day is
/// held by a booking or shows an editable price.
pub fn build_master_calendar(
    month: NaiveDate,
    properties: &[Property],
    bookings: &[Booking],
    overrides: &OverrideTable,
) -> MasterCalendar {
    let grid = build_month_grid(month);
    let rows = properties
        .iter()
        .map(|property| {
            let cells: Vec<CalendarCell> = grid
                .iter()
                .map(|&day| match find_booking_for_date(&property.id, day, bookings) {
                    Some(booking) => CalendarCell::Booked {
                        date: day,
                        booking_id: booking.id.clone(),
                        status: booking.status,
                        check_in: booking.check_in,
                        check_out: booking.check_out,
                    },
                    None => CalendarCell::Open {
                        date: day,
                        price: resolve_price(property, day, overrides),
                        overridden: overrides.get(&property.id, day).is_some(),
                    },
                })
                .collect();
            let stats = RowStats::compute(&cells);
            PropertyRow {
                property_id: property.id.clone(),
                title: property.title.clone(),
                base_price: property.base_price,
                cells,
                stats,
            }
        })
        .collect();

    MasterCalendar {
        month: month_bounds(month).0,
        rows,
    }
}

impl std::fmt::Display for MasterCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Master calendar for {}", self.month.format("%Y-%m"))?;
        if self.rows.is_empty() {
            writeln!(f, "No properties selected.")?;
            return Ok(());
        }
        for row in &self.rows {
            writeln!(f)?;
            writeln!(
                f,
                "## {} (ID: {}) base {:.0}/night",
                row.title, row.property_id, row.base_price
            )?;
            write!(
                f,
                "Booked: {} nights | Open: {} nights | Occupancy: {:.1}%",
                row.stats.booked_nights, row.stats.open_nights, row.stats.occupancy_rate
            )?;
            if let Some(avg) = row.stats.average_open_price {
                write!(f, " | Avg open price: {avg:.0}")?;
            }
            writeln!(f)?;
            writeln!(f, "{:<12} {:<4} {:>10}  {}", "Date", "Day", "Price", "Status")?;
            writeln!(f, "{}", "-".repeat(44))?;
            for cell in &row.cells {
                let date = cell.date().to_string();
                let day = cell.date().format("%a").to_string();
                match cell {
                    CalendarCell::Open {
                        price, overridden, ..
                    } => {
                        let marker = if *overridden { "*" } else { " " };
                        writeln!(f, "{date:<12} {day:<4} {price:>9.0}{marker}  open")?;
                    }
                    CalendarCell::Booked {
                        booking_id, status, ..
                    } => {
                        writeln!(
                            f,
                            "{date:<12} {day:<4} {:>10}  booked ({booking_id}, {status})",
                            "-"
                        )?;
                    }
                }
            }
        }
        writeln!(f, "\n* manual price override")?;
        Ok(())
    }
}
