use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};

use crate::error::{CalendarError, Result};
use crate::ports::holidays::HolidayCalendar;

/// Holidays read from configuration: one-off `YYYY-MM-DD` dates plus
/// `MM-DD` dates that repeat every year.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredHolidays {
    fixed: HashSet<NaiveDate>,
    recurring: HashSet<(u32, u32)>,
}

impl ConfiguredHolidays {
    pub fn from_entries(entries: &[String]) -> Result<Self> {
        let mut calendar = Self::default();
        for raw in entries {
            let entry = raw.trim();
            match entry.len() {
                10 => {
                    let date = NaiveDate::parse_from_str(entry, "%Y-%m-%d")
                        .map_err(|e| invalid_entry(entry, &e.to_string()))?;
                    calendar.fixed.insert(date);
                }
                5 => {
                    // 2024 is a leap year so 02-29 is accepted
                    let date = NaiveDate::parse_from_str(&format!("2024-{entry}"), "%Y-%m-%d")
                        .map_err(|e| invalid_entry(entry, &e.to_string()))?;
                    calendar.recurring.insert((date.month(), date.day()));
                }
                _ => return Err(invalid_entry(entry, "expected YYYY-MM-DD or MM-DD")),
            }
        }
        tracing::debug!(
            fixed = calendar.fixed.len(),
            recurring = calendar.recurring.len(),
            "Holiday calendar loaded"
        );
        Ok(calendar)
    }

    pub fn len(&self) -> usize {
        self.fixed.len() + self.recurring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn invalid_entry(entry: &str, reason: &str) -> CalendarError {
    CalendarError::Config(format!("invalid holiday '{entry}': {reason}"))
}

impl HolidayCalendar for ConfiguredHolidays {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.fixed.contains(&date) || self.recurring.contains(&(date.month(), date.day()))
    }

    fn covers_year(&self, year: i32) -> bool {
        !self.recurring.is_empty() || self.fixed.iter().any(|d| d.year() == year)
    }
}
