use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::calendar::DateRange;
use crate::domain::discount::{DiscountRule, DiscountType};
use crate::domain::pricing::PriceOverride;
use crate::domain::property::Property;
use crate::error::Result;
use crate::ports::store::{BookingFilter, PricingStore};

type PropertiesFn = Box<dyn Fn(&[String]) -> Result<Vec<Property>> + Send + Sync>;
type BookingsFn =
    Box<dyn Fn(&[String], DateRange, BookingFilter) -> Result<Vec<Booking>> + Send + Sync>;
type OverridesFn = Box<dyn Fn(&[String], DateRange) -> Result<Vec<PriceOverride>> + Send + Sync>;
type DiscountsFn = Box<dyn Fn(&str) -> Result<Vec<DiscountRule>> + Send + Sync>;
type UpsertOverridesFn = Box<dyn Fn(&[PriceOverride]) -> Result<usize> + Send + Sync>;
type UpsertDiscountsFn = Box<dyn Fn(&[DiscountRule]) -> Result<usize> + Send + Sync>;

/// Store whose every call is answered by a replaceable closure. Writes are
/// recorded so tests can inspect the batches that were sent.
pub struct MockStore {
    properties_fn: Mutex<PropertiesFn>,
    bookings_fn: Mutex<BookingsFn>,
    overrides_fn: Mutex<OverridesFn>,
    discounts_fn: Mutex<DiscountsFn>,
    upsert_overrides_fn: Mutex<UpsertOverridesFn>,
    upsert_discounts_fn: Mutex<UpsertDiscountsFn>,
    override_batches: Mutex<Vec<Vec<PriceOverride>>>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    /// Every requested property exists with a base price of 100; nothing is
    /// booked or overridden; writes confirm every row.
    pub fn new() -> Self {
        Self {
            properties_fn: Mutex::new(Box::new(|ids| {
                Ok(ids.iter().map(|id| make_property(id, 100.0)).collect())
            })),
            bookings_fn: Mutex::new(Box::new(|_, _, _| Ok(vec![]))),
            overrides_fn: Mutex::new(Box::new(|_, _| Ok(vec![]))),
            discounts_fn: Mutex::new(Box::new(|_| Ok(vec![]))),
            upsert_overrides_fn: Mutex::new(Box::new(|rows| Ok(rows.len()))),
            upsert_discounts_fn: Mutex::new(Box::new(|rows| Ok(rows.len()))),
            override_batches: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_properties(
        self,
        f: impl Fn(&[String]) -> Result<Vec<Property>> + Send + Sync + 'static,
    ) -> Self {
        *self.properties_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_bookings(
        self,
        f: impl Fn(&[String], DateRange, BookingFilter) -> Result<Vec<Booking>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        *self.bookings_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_overrides(
        self,
        f: impl Fn(&[String], DateRange) -> Result<Vec<PriceOverride>> + Send + Sync + 'static,
    ) -> Self {
        *self.overrides_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_discounts(
        self,
        f: impl Fn(&str) -> Result<Vec<DiscountRule>> + Send + Sync + 'static,
    ) -> Self {
        *self.discounts_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_upsert_overrides(
        self,
        f: impl Fn(&[PriceOverride]) -> Result<usize> + Send + Sync + 'static,
    ) -> Self {
        *self.upsert_overrides_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_upsert_discounts(
        self,
        f: impl Fn(&[DiscountRule]) -> Result<usize> + Send + Sync + 'static,
    ) -> Self {
        *self.upsert_discounts_fn.lock().unwrap() = Box::new(f);
        self
    }

    /// Override batches received so far, in call order.
    pub fn override_batches(&self) -> Vec<Vec<PriceOverride>> {
        self.override_batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PricingStore for MockStore {
    async fn list_properties(&self, ids: &[String]) -> Result<Vec<Property>> {
        (self.properties_fn.lock().unwrap())(ids)
    }

    async fn list_bookings(
        &self,
        property_ids: &[String],
        range: DateRange,
        filter: BookingFilter,
    ) -> Result<Vec<Booking>> {
        (self.bookings_fn.lock().unwrap())(property_ids, range, filter)
    }

    async fn list_overrides(
        &self,
        property_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<PriceOverride>> {
        (self.overrides_fn.lock().unwrap())(property_ids, range)
    }

    async fn list_discount_rules(&self, property_id: &str) -> Result<Vec<DiscountRule>> {
        (self.discounts_fn.lock().unwrap())(property_id)
    }

    async fn upsert_overrides(&self, rows: &[PriceOverride]) -> Result<usize> {
        self.override_batches.lock().unwrap().push(rows.to_vec());
        (self.upsert_overrides_fn.lock().unwrap())(rows)
    }

    async fn upsert_discount_rules(&self, rows: &[DiscountRule]) -> Result<usize> {
        (self.upsert_discounts_fn.lock().unwrap())(rows)
    }
}

// ---------------------------------------------------------------------------
// Factory helpers
// ---------------------------------------------------------------------------

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_property(id: &str, base_price: f64) -> Property {
    Property {
        id: id.to_string(),
        title: format!("Property {id}"),
        base_price,
        bedrooms: Some(2),
        beds: Some(3),
        bathrooms: Some(1.0),
        amenities: BTreeMap::new(),
    }
}

pub fn make_booking(
    id: &str,
    property_id: &str,
    check_in: &str,
    check_out: &str,
    status: BookingStatus,
) -> Booking {
    let check_in = date(check_in);
    let check_out = date(check_out);
    Booking {
        id: id.to_string(),
        property_id: property_id.to_string(),
        check_in,
        check_out,
        status,
        total_price: 100.0 * f64::from(crate::domain::booking::stay_nights(check_in, check_out)),
    }
}

pub fn make_override(property_id: &str, d: &str, price: f64) -> PriceOverride {
    PriceOverride {
        property_id: property_id.to_string(),
        date: date(d),
        price,
    }
}

pub fn make_discount(
    property_id: &str,
    discount_type: DiscountType,
    percentage: f64,
) -> DiscountRule {
    DiscountRule {
        property_id: property_id.to_string(),
        discount_type,
        percentage,
        is_percentage: true,
    }
}
