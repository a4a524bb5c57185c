//! Application service joining the store, the holiday calendar and the pure
//! pricing domain. Every operation validates its input before touching the
//! store and performs at most one write.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::domain::availability::find_booking_for_date;
use crate::domain::booking::Booking;
use crate::domain::calendar::{DateRange, MasterCalendar, build_master_calendar};
use crate::domain::discount::{DiscountRule, DiscountType, StayQuote, quote_stay};
use crate::domain::pricing::{OverrideTable, PriceOverride, parse_price, validate_price};
use crate::domain::report::{BookingReport, compute_booking_report};
use crate::domain::simulation::{PendingSimulation, SimulationSettings, Strategy, simulate};
use crate::error::{CalendarError, Result};
use crate::ports::holidays::HolidayCalendar;
use crate::ports::store::{BookingFilter, PricingStore};

pub struct PricingDesk {
    store: Arc<dyn PricingStore>,
    holidays: Arc<dyn HolidayCalendar>,
    settings: SimulationSettings,
}

impl PricingDesk {
    pub fn new(
        store: Arc<dyn PricingStore>,
        holidays: Arc<dyn HolidayCalendar>,
        settings: SimulationSettings,
    ) -> Self {
        Self {
            store,
            holidays,
            settings,
        }
    }

    /// Overrides for the range, or an empty table when the read fails. A
    /// missing override only means the base price shows.
    async fn overrides_or_empty(
        &self,
        property_ids: &[String],
        range: DateRange,
    ) -> OverrideTable {
        match self.store.list_overrides(property_ids, range).await {
            Ok(rows) => OverrideTable::from_rows(rows),
            Err(e) => {
                warn!(error = %e, %range, "Override read failed, showing base prices");
                OverrideTable::default()
            }
        }
    }

    /// Master calendar for the month containing `month`.
    pub async fn month_view(
        &self,
        property_ids: &[String],
        month: NaiveDate,
    ) -> Result<MasterCalendar> {
        let range = DateRange::month_of(month);
        if property_ids.is_empty() {
            return Ok(build_master_calendar(month, &[], &[], &OverrideTable::default()));
        }
        let properties = self.store.list_properties(property_ids).await?;
        if properties.len() < property_ids.len() {
            debug!(
                requested = property_ids.len(),
                found = properties.len(),
                "Some properties were not found"
            );
        }
        let bookings = self
            .store
            .list_bookings(property_ids, range, BookingFilter::Active)
            .await?;
        let overrides = self.overrides_or_empty(property_ids, range).await;
        debug!(
            properties = properties.len(),
            bookings = bookings.len(),
            overrides = overrides.len(),
            %range,
            "Month view loaded"
        );
        Ok(build_master_calendar(month, &properties, &bookings, &overrides))
    }

    /// Set one day's price from raw operator input.
    pub async fn set_override_input(
        &self,
        property_id: &str,
        date: NaiveDate,
        raw_price: &str,
    ) -> Result<PriceOverride> {
        let price = parse_price(raw_price)?;
        self.set_override(property_id, date, price).await
    }

    /// Upsert the override for one (property, date). Booked days are not
    /// editable.
    pub async fn set_override(
        &self,
        property_id: &str,
        date: NaiveDate,
        price: f64,
    ) -> Result<PriceOverride> {
        require_property_id(property_id)?;
        validate_price(price)?;

        let property = self.store.get_property(property_id).await?;
        let day = DateRange { start: date, end: date };
        let ids = [property.id.clone()];
        let bookings = self
            .store
            .list_bookings(&ids, day, BookingFilter::Active)
            .await?;
        if let Some(booking) = find_booking_for_date(&property.id, date, &bookings) {
            return Err(CalendarError::invalid(format!(
                "{date} is held by booking {} ({})",
                booking.id, booking.status
            )));
        }

        let row = PriceOverride {
            property_id: property.id,
            date,
            price,
        };
        let written = self.store.upsert_overrides(std::slice::from_ref(&row)).await?;
        if written != 1 {
            return Err(CalendarError::PartialWrite {
                expected: 1,
                written,
            });
        }
        info!(property_id = %row.property_id, %date, price, "Price override saved");
        Ok(row)
    }

    /// Preview prices for a month. Nothing is written.
    pub async fn simulate(
        &self,
        property_id: Option<&str>,
        month: NaiveDate,
        strategy: Strategy,
    ) -> Result<PendingSimulation> {
        let property_id = property_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CalendarError::invalid("select a property before simulating"))?;

        let property = self.store.get_property(property_id).await?;
        if !self.holidays.covers_year(month.year()) {
            warn!(
                year = month.year(),
                "Holiday calendar has no dates for this year, no holiday pricing applied"
            );
        }
        let pending = simulate(&property, month, strategy, &self.settings, self.holidays.as_ref());
        debug!(
            property_id = %pending.property_id,
            month = %pending.month,
            %strategy,
            days = pending.days.len(),
            "Simulation computed"
        );
        Ok(pending)
    }

    /// Commit a simulation as one batch upsert. The batch either lands in
    /// full or the call fails; a short confirmation is reported as
    /// [`CalendarError::PartialWrite`].
    pub async fn apply_simulation(&self, pending: &PendingSimulation) -> Result<usize> {
        let rows = pending.to_overrides();
        if rows.is_empty() {
            return Err(CalendarError::invalid("simulation has no days to apply"));
        }
        for row in &rows {
            validate_price(row.price)?;
        }

        let expected = rows.len();
        let written = self.store.upsert_overrides(&rows).await?;
        if written != expected {
            warn!(
                property_id = %pending.property_id,
                expected,
                written,
                "Batch upsert confirmed a different row count"
            );
            return Err(CalendarError::PartialWrite { expected, written });
        }
        info!(
            property_id = %pending.property_id,
            month = %pending.month,
            rows = written,
            "Simulation applied"
        );
        Ok(written)
    }

    pub async fn discount_rules(&self, property_id: &str) -> Result<Vec<DiscountRule>> {
        require_property_id(property_id)?;
        self.store.list_discount_rules(property_id).await
    }

    pub async fn save_discount_rule(
        &self,
        property_id: &str,
        discount_type: DiscountType,
        percentage: f64,
    ) -> Result<DiscountRule> {
        let rule = DiscountRule::new(property_id, discount_type, percentage)?;
        self.store.get_property(property_id).await?;
        let written = self
            .store
            .upsert_discount_rules(std::slice::from_ref(&rule))
            .await?;
        if written != 1 {
            return Err(CalendarError::PartialWrite {
                expected: 1,
                written,
            });
        }
        info!(property_id, %discount_type, percentage, "Discount rule saved");
        Ok(rule)
    }

    pub async fn quote_stay(
        &self,
        property_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<StayQuote> {
        require_property_id(property_id)?;
        if check_out <= check_in {
            return Err(CalendarError::invalid(format!(
                "check-out {check_out} must be after check-in {check_in}"
            )));
        }
        let property = self.store.get_property(property_id).await?;
        let last_night = check_out.pred_opt().unwrap_or(check_in);
        let nights = DateRange {
            start: check_in,
            end: last_night,
        };
        let overrides = self
            .overrides_or_empty(std::slice::from_ref(&property.id), nights)
            .await;
        let rules = self.store.list_discount_rules(&property.id).await?;
        quote_stay(&property, check_in, check_out, &overrides, &rules)
    }

    /// Report over bookings of every status overlapping `range`.
    pub async fn booking_report(
        &self,
        property_ids: &[String],
        range: DateRange,
    ) -> Result<BookingReport> {
        if property_ids.is_empty() {
            return Err(CalendarError::invalid("select at least one property"));
        }
        let bookings: Vec<Booking> = self
            .store
            .list_bookings(property_ids, range, BookingFilter::All)
            .await?;
        Ok(compute_booking_report(range, &bookings))
    }
}

fn require_property_id(property_id: &str) -> Result<()> {
    if property_id.trim().is_empty() {
        return Err(CalendarError::invalid("property id is required"));
    }
    Ok(())
}
