use chrono::NaiveDate;

use super::booking::Booking;

/// Booking holding `property_id` on `date`, if any.
///
/// Cancelled bookings never match. Overlapping bookings for the same property
/// are an upstream integrity violation; the first match in `bookings` order
/// wins and no overlap check is made here.
pub fn find_booking_for_date<'a>(
    property_id: &str,
    date: NaiveDate,
    bookings: &'a [Booking],
) -> Option<&'a Booking> {
    bookings
        .iter()
        .find(|b| b.property_id == property_id && b.blocks_availability() && b.occupies(date))
}

/// A price cell is directly editable when no booking holds the date.
pub fn is_date_editable(property_id: &str, date: NaiveDate, bookings: &[Booking]) -> bool {
    find_booking_for_date(property_id, date, bookings).is_none()
}
