use async_trait::async_trait;

use crate::domain::booking::Booking;
use crate::domain::calendar::DateRange;
use crate::domain::discount::DiscountRule;
use crate::domain::pricing::PriceOverride;
use crate::domain::property::Property;
use crate::error::{CalendarError, Result};

/// Which bookings a read should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingFilter {
    /// Everything except `cancelled`, for availability.
    Active,
    /// All statuses, for reporting.
    All,
}

/// Persistence boundary: the managed database that owns properties and
/// bookings and stores price overrides and discount rules.
#[async_trait]
pub trait PricingStore: Send + Sync {
    /// Properties with the given ids; unknown ids are skipped.
    async fn list_properties(&self, ids: &[String]) -> Result<Vec<Property>>;

    /// Bookings for `property_ids` with at least one night inside `range`.
    async fn list_bookings(
        &self,
        property_ids: &[String],
        range: DateRange,
        filter: BookingFilter,
    ) -> Result<Vec<Booking>>;

    /// Overrides for `property_ids` dated within `range` (inclusive).
    async fn list_overrides(
        &self,
        property_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<PriceOverride>>;

    async fn list_discount_rules(&self, property_id: &str) -> Result<Vec<DiscountRule>>;

    /// Upsert keyed on (property, date) as one atomic batch. Returns the
    /// number of rows the store confirmed.
    async fn upsert_overrides(&self, rows: &[PriceOverride]) -> Result<usize>;

    /// Upsert keyed on (property, discount type). Returns confirmed rows.
    async fn upsert_discount_rules(&self, rows: &[DiscountRule]) -> Result<usize>;

    async fn get_property(&self, id: &str) -> Result<Property> {
        self.list_properties(&[id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CalendarError::PropertyNotFound { id: id.to_string() })
    }
}
