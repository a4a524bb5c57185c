use chrono::NaiveDate;

/// Source of holiday dates for the pricing simulator.
pub trait HolidayCalendar: Send + Sync {
    fn is_holiday(&self, date: NaiveDate) -> bool;

    /// Whether the calendar has any holiday data for `year`. A `false` here
    /// means simulations for that year will show no holiday pricing.
    fn covers_year(&self, _year: i32) -> bool {
        true
    }
}

/// Calendar with no holidays at all.
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn is_holiday(&self, _date: NaiveDate) -> bool {
        false
    }
}
