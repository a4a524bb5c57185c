use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::booking::{Booking, BookingStatus};
use super::calendar::DateRange;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingReport {
    pub range: DateRange,
    pub total_bookings: u32,
    pub by_status: BTreeMap<BookingStatus, u32>,
    /// Nights and revenue count only `confirmed` and `completed` bookings.
    pub revenue_nights: u32,
    pub revenue: f64,
    pub average_booking_value: Option<f64>,
}

fn counts_as_revenue(status: BookingStatus) -> bool {
    matches!(status, BookingStatus::Confirmed | BookingStatus::Completed)
}

/// Summarize bookings overlapping `range`, all statuses included.
pub fn compute_booking_report(range: DateRange, bookings: &[Booking]) -> BookingReport {
    let mut by_status: BTreeMap<BookingStatus, u32> =
        BookingStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    let mut total_bookings = 0;
    let mut revenue_nights = 0;
    let mut revenue = 0.0;
    let mut revenue_bookings = 0_u32;

    for booking in bookings.iter().filter(|b| b.overlaps(&range)) {
        total_bookings += 1;
        *by_status.entry(booking.status).or_insert(0) += 1;
        if counts_as_revenue(booking.status) {
            revenue_nights += booking.nights();
            revenue += booking.total_price;
            revenue_bookings += 1;
        }
    }

    let average_booking_value = if revenue_bookings > 0 {
        Some(revenue / f64::from(revenue_bookings))
    } else {
        None
    };

    BookingReport {
        range,
        total_bookings,
        by_status,
        revenue_nights,
        revenue,
        average_booking_value,
    }
}

impl std::fmt::Display for BookingReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# Booking report: {}", self.range)?;
        writeln!(f, "Bookings: {}", self.total_bookings)?;
        for (status, count) in &self.by_status {
            writeln!(f, "  {status:<10} {count:>4}")?;
        }
        writeln!(f, "Revenue nights: {}", self.revenue_nights)?;
        writeln!(f, "Revenue: {:.2}", self.revenue)?;
        if let Some(avg) = self.average_booking_value {
            writeln!(f, "Avg booking value: {avg:.2}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{date, make_booking};

    fn june() -> DateRange {
        DateRange::new(date("2024-06-01"), date("2024-06-30")).unwrap()
    }

    #[test]
    fn revenue_excludes_cancelled_and_pending() {
        let mut confirmed =
            make_booking("b1", "p1", "2024-06-01", "2024-06-04", BookingStatus::Confirmed);
        confirmed.total_price = 300.0;
        let mut completed =
            make_booking("b2", "p1", "2024-06-10", "2024-06-12", BookingStatus::Completed);
        completed.total_price = 200.0;
        let mut cancelled =
            make_booking("b3", "p1", "2024-06-15", "2024-06-20", BookingStatus::Cancelled);
        cancelled.total_price = 999.0;
        let mut pending =
            make_booking("b4", "p2", "2024-06-20", "2024-06-22", BookingStatus::Pending);
        pending.total_price = 150.0;

        let report = compute_booking_report(june(), &[confirmed, completed, cancelled, pending]);
        assert_eq!(report.total_bookings, 4);
        assert_eq!(report.by_status[&BookingStatus::Cancelled], 1);
        assert_eq!(report.by_status[&BookingStatus::Pending], 1);
        assert_eq!(report.revenue_nights, 5);
        assert!((report.revenue - 500.0).abs() < f64::EPSILON);
        assert!((report.average_booking_value.unwrap() - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bookings_outside_range_are_skipped() {
        let b = make_booking("b1", "p1", "2024-07-02", "2024-07-05", BookingStatus::Confirmed);
        let report = compute_booking_report(june(), &[b]);
        assert_eq!(report.total_bookings, 0);
        assert!(report.average_booking_value.is_none());
        assert_eq!(report.by_status.len(), 4);
    }

    #[test]
    fn display_lists_statuses() {
        let report = compute_booking_report(june(), &[]);
        let s = report.to_string();
        assert!(s.contains("2024-06-01 to 2024-06-30"));
        assert!(s.contains("cancelled"));
        assert!(s.contains("Revenue: 0.00"));
    }
}
