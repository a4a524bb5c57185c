use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::DateRange;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Cancelled,
        Self::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reservation occupying the half-open interval `[check_in, check_out)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub property_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
    pub total_price: f64,
}

impl Booking {
    /// The checkout day is the turnover day and is not occupied.
    pub fn occupies(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    /// Cancelled bookings are kept for audit but never hold dates.
    pub fn blocks_availability(&self) -> bool {
        self.status != BookingStatus::Cancelled
    }

    pub fn nights(&self) -> u32 {
        stay_nights(self.check_in, self.check_out)
    }

    /// True when at least one occupied night falls inside `range`.
    pub fn overlaps(&self, range: &DateRange) -> bool {
        self.check_in <= range.end && self.check_out > range.start
    }
}

/// Night count between two calendar days, floored at 1 so that zero or
/// inverted stays never yield a zero/negative count.
pub fn stay_nights(check_in: NaiveDate, check_out: NaiveDate) -> u32 {
    let days = (check_out - check_in).num_days();
    u32::try_from(days).unwrap_or(0).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{date, make_booking};

    #[test]
    fn occupies_is_half_open() {
        let b = make_booking("b1", "p1", "2024-06-10", "2024-06-13", BookingStatus::Confirmed);
        assert!(!b.occupies(date("2024-06-09")));
        assert!(b.occupies(date("2024-06-10")));
        assert!(b.occupies(date("2024-06-12")));
        assert!(!b.occupies(date("2024-06-13")));
    }

    #[test]
    fn nights_counts_days_between() {
        let b = make_booking("b1", "p1", "2024-06-10", "2024-06-13", BookingStatus::Pending);
        assert_eq!(b.nights(), 3);
    }

    #[test]
    fn stay_nights_floors_at_one() {
        assert_eq!(stay_nights(date("2024-06-10"), date("2024-06-10")), 1);
        assert_eq!(stay_nights(date("2024-06-10"), date("2024-06-01")), 1);
        assert_eq!(stay_nights(date("2024-01-01"), date("2024-02-01")), 31);
    }

    #[test]
    fn cancelled_does_not_block() {
        let b = make_booking("b1", "p1", "2024-06-10", "2024-06-13", BookingStatus::Cancelled);
        assert!(!b.blocks_availability());
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Completed,
        ] {
            let b = make_booking("b2", "p1", "2024-06-10", "2024-06-13", status);
            assert!(b.blocks_availability(), "{status} should block");
        }
    }

    #[test]
    fn overlaps_month_edges() {
        let june = DateRange::new(date("2024-06-01"), date("2024-06-30")).unwrap();
        // Leaves on the 1st: the night of May 31 is the last occupied one
        let before = make_booking("b1", "p1", "2024-05-28", "2024-06-01", BookingStatus::Confirmed);
        assert!(!before.overlaps(&june));
        let spanning = make_booking("b2", "p1", "2024-05-30", "2024-06-02", BookingStatus::Confirmed);
        assert!(spanning.overlaps(&june));
        let last_night = make_booking("b3", "p1", "2024-06-30", "2024-07-03", BookingStatus::Confirmed);
        assert!(last_night.overlaps(&june));
        let after = make_booking("b4", "p1", "2024-07-01", "2024-07-03", BookingStatus::Confirmed);
        assert!(!after.overlaps(&june));
    }

    #[test]
    fn status_serde_lowercase() {
        let json = serde_json::to_string(&BookingStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        let parsed: BookingStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, BookingStatus::Completed);
    }
}
