use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::booking::Booking;
use crate::domain::calendar::DateRange;
use crate::domain::discount::{DiscountRule, DiscountType};
use crate::domain::pricing::{OverrideTable, PriceOverride, validate_price};
use crate::domain::property::Property;
use crate::error::{CalendarError, Result};
use crate::ports::store::{BookingFilter, PricingStore};

/// Initial content for a [`MemoryStore`], usually read from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    #[serde(default)]
    pub price_overrides: Vec<PriceOverride>,
    #[serde(default)]
    pub discount_rules: Vec<DiscountRule>,
}

impl SeedData {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CalendarError::Config(format!("failed to read seed file {}: {e}", path.display()))
        })?;
        Ok(serde_yml::from_str(&content)?)
    }
}

#[derive(Default)]
struct StoreData {
    properties: BTreeMap<String, Property>,
    bookings: Vec<Booking>,
    overrides: OverrideTable,
    discounts: HashMap<(String, DiscountType), DiscountRule>,
}

/// In-process store. Batch writes are validated in full before any row is
/// applied, so a rejected batch leaves the data untouched.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Self {
        let data = StoreData {
            properties: seed
                .properties
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
            bookings: seed.bookings,
            overrides: OverrideTable::from_rows(seed.price_overrides),
            discounts: seed
                .discount_rules
                .into_iter()
                .map(|r| ((r.property_id.clone(), r.discount_type), r))
                .collect(),
        };
        debug!(
            properties = data.properties.len(),
            bookings = data.bookings.len(),
            overrides = data.overrides.len(),
            "Memory store seeded"
        );
        Self {
            inner: RwLock::new(data),
        }
    }

    /// Every stored override, sorted by property then date.
    pub fn override_rows(&self) -> Result<Vec<PriceOverride>> {
        Ok(self.read()?.overrides.rows())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreData>> {
        self.inner.read().map_err(|_| CalendarError::Persistence {
            reason: "memory store lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreData>> {
        self.inner.write().map_err(|_| CalendarError::Persistence {
            reason: "memory store lock poisoned".into(),
        })
    }
}

fn unknown_property(id: &str) -> CalendarError {
    CalendarError::Persistence {
        reason: format!("property '{id}' does not exist"),
    }
}

#[async_trait]
impl PricingStore for MemoryStore {
    async fn list_properties(&self, ids: &[String]) -> Result<Vec<Property>> {
        let data = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| data.properties.get(id).cloned())
            .collect())
    }

    async fn list_bookings(
        &self,
        property_ids: &[String],
        range: DateRange,
        filter: BookingFilter,
    ) -> Result<Vec<Booking>> {
        let data = self.read()?;
        Ok(data
            .bookings
            .iter()
            .filter(|b| property_ids.contains(&b.property_id))
            .filter(|b| b.overlaps(&range))
            .filter(|b| filter == BookingFilter::All || b.blocks_availability())
            .cloned()
            .collect())
    }

    async fn list_overrides(
        &self,
        property_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<PriceOverride>> {
        let data = self.read()?;
        Ok(data
            .overrides
            .rows()
            .into_iter()
            .filter(|r| property_ids.contains(&r.property_id) && range.contains(r.date))
            .collect())
    }

    async fn list_discount_rules(&self, property_id: &str) -> Result<Vec<DiscountRule>> {
        let data = self.read()?;
        let mut rules: Vec<DiscountRule> = [DiscountType::Weekly, DiscountType::Monthly]
            .into_iter()
            .filter_map(|kind| data.discounts.get(&(property_id.to_string(), kind)).cloned())
            .collect();
        rules.sort_by_key(|r| r.discount_type.min_nights());
        Ok(rules)
    }

    async fn upsert_overrides(&self, rows: &[PriceOverride]) -> Result<usize> {
        let mut data = self.write()?;
        for row in rows {
            if !data.properties.contains_key(&row.property_id) {
                return Err(unknown_property(&row.property_id));
            }
            validate_price(row.price).map_err(|e| CalendarError::Persistence {
                reason: e.to_string(),
            })?;
        }
        for row in rows {
            data.overrides.upsert(row.clone());
        }
        debug!(rows = rows.len(), "Overrides upserted");
        Ok(rows.len())
    }

    async fn upsert_discount_rules(&self, rows: &[DiscountRule]) -> Result<usize> {
        let mut data = self.write()?;
        for rule in rows {
            if !data.properties.contains_key(&rule.property_id) {
                return Err(unknown_property(&rule.property_id));
            }
            rule.validate().map_err(|e| CalendarError::Persistence {
                reason: e.to_string(),
            })?;
        }
        for rule in rows {
            data.discounts
                .insert((rule.property_id.clone(), rule.discount_type), rule.clone());
        }
        Ok(rows.len())
    }
}
