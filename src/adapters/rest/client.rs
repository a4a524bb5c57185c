use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::config::types::{CacheConfig, StoreConfig, TableNames};
use crate::domain::booking::Booking;
use crate::domain::calendar::DateRange;
use crate::domain::discount::DiscountRule;
use crate::domain::pricing::PriceOverride;
use crate::domain::property::Property;
use crate::error::{CalendarError, Result};
use crate::ports::cache::RecordCache;
use crate::ports::store::{BookingFilter, PricingStore};

use super::rows::{
    BookingRecord, DiscountRecord, DiscountUpsert, OverrideRecord, OverrideUpsert, PropertyRecord,
    convert_all,
};

const UPSERT_PREFER: &str = "resolution=merge-duplicates,return=representation";

/// Store backed by a PostgREST-style HTTP endpoint (`/rest/v1/{table}`).
pub struct RestStore {
    http: Client,
    cache: Arc<dyn RecordCache>,
    base_url: String,
    api_key: Option<String>,
    tables: TableNames,
    property_ttl: Duration,
}

impl RestStore {
    pub fn new(
        config: &StoreConfig,
        cache_config: &CacheConfig,
        cache: Arc<dyn RecordCache>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            cache,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            tables: config.tables.clone(),
            property_ttl: Duration::from_secs(cache_config.property_ttl_secs),
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}/rest/v1/{table}", self.base_url))?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.api_key {
            Some(key) => request
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}")),
            None => request,
        }
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut url = self.table_url(table)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", "*");
            for (column, condition) in filters {
                query.append_pair(column, condition);
            }
        }
        debug!(url = %url, "Store GET request");

        let response = self
            .authorize(self.http.get(url.as_str()))
            .send()
            .await
            .map_err(CalendarError::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(CalendarError::Http)?;
        if !status.is_success() {
            return Err(CalendarError::Persistence {
                reason: format!("GET {table} returned HTTP {status}: {body}"),
            });
        }
        trace!(table, body = %body, "Store raw response");

        serde_json::from_str(&body)
            .map_err(|e| CalendarError::decode(format!("{table} response: {e}")))
    }

    /// POST the whole batch as one request. The store either applies every
    /// row or rejects the request; the returned representation tells how many
    /// rows it confirmed.
    async fn upsert<T: Serialize>(
        &self,
        table: &str,
        on_conflict: &str,
        rows: &[T],
    ) -> Result<usize> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("on_conflict", on_conflict);
        debug!(url = %url, rows = rows.len(), "Store upsert request");

        let response = self
            .authorize(self.http.post(url.as_str()))
            .header("Prefer", UPSERT_PREFER)
            .json(rows)
            .send()
            .await
            .map_err(CalendarError::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(CalendarError::Http)?;
        if !status.is_success() {
            return Err(CalendarError::Persistence {
                reason: format!("upsert into {table} returned HTTP {status}: {body}"),
            });
        }

        let confirmed: Vec<serde_json::Value> = serde_json::from_str(&body)
            .map_err(|e| CalendarError::decode(format!("{table} upsert response: {e}")))?;
        if confirmed.len() != rows.len() {
            warn!(
                table,
                sent = rows.len(),
                confirmed = confirmed.len(),
                "Store confirmed a different row count"
            );
        }
        Ok(confirmed.len())
    }
}

/// PostgREST `in.(...)` list with each value double-quoted.
fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn property_cache_key(id: &str) -> String {
    format!("property:{id}")
}

#[async_trait]
impl PricingStore for RestStore {
    async fn list_properties(&self, ids: &[String]) -> Result<Vec<Property>> {
        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();
        for id in ids {
            if let Some(cached) = self.cache.get(&property_cache_key(id))
                && let Ok(property) = serde_json::from_str::<Property>(&cached)
            {
                debug!(property_id = %id, "Cache hit for property");
                found.push(property);
            } else {
                missing.push(id.clone());
            }
        }

        if !missing.is_empty() {
            let records: Vec<PropertyRecord> = self
                .select(&self.tables.properties, &[("id", in_list(&missing))])
                .await?;
            let fetched: Vec<Property> = convert_all(records)?;
            for property in &fetched {
                if let Ok(json) = serde_json::to_string(property) {
                    self.cache
                        .set(&property_cache_key(&property.id), &json, self.property_ttl);
                }
            }
            found.extend(fetched);
        }

        // keep the caller's order
        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|p| &p.id == id).cloned())
            .collect())
    }

    async fn list_bookings(
        &self,
        property_ids: &[String],
        range: DateRange,
        filter: BookingFilter,
    ) -> Result<Vec<Booking>> {
        if property_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut filters = vec![
            ("property_id", in_list(property_ids)),
            ("check_in", format!("lte.{}", range.end)),
            ("check_out", format!("gt.{}", range.start)),
            ("order", "check_in.asc".to_string()),
        ];
        if filter == BookingFilter::Active {
            filters.push(("status", "neq.cancelled".to_string()));
        }
        let records: Vec<BookingRecord> = self.select(&self.tables.bookings, &filters).await?;
        let bookings: Vec<Booking> = convert_all(records)?;
        // the store filter is advisory; re-apply it locally
        Ok(bookings
            .into_iter()
            .filter(|b| b.overlaps(&range))
            .filter(|b| filter == BookingFilter::All || b.blocks_availability())
            .collect())
    }

    async fn list_overrides(
        &self,
        property_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<PriceOverride>> {
        if property_ids.is_empty() {
            return Ok(Vec::new());
        }
        let filters = [
            ("property_id", in_list(property_ids)),
            ("date", format!("gte.{}", range.start)),
            ("date", format!("lte.{}", range.end)),
        ];
        let records: Vec<OverrideRecord> =
            self.select(&self.tables.daily_prices, &filters).await?;
        convert_all(records)
    }

    async fn list_discount_rules(&self, property_id: &str) -> Result<Vec<DiscountRule>> {
        let filters = [("property_id", format!("eq.{property_id}"))];
        let records: Vec<DiscountRecord> = self.select(&self.tables.discounts, &filters).await?;
        let mut rules: Vec<DiscountRule> = convert_all(records)?;
        rules.sort_by_key(|r| r.discount_type.min_nights());
        Ok(rules)
    }

    async fn upsert_overrides(&self, rows: &[PriceOverride]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let payload: Vec<OverrideUpsert<'_>> = rows.iter().map(OverrideUpsert::from).collect();
        self.upsert(&self.tables.daily_prices, "property_id,date", &payload)
            .await
    }

    async fn upsert_discount_rules(&self, rows: &[DiscountRule]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        let payload: Vec<DiscountUpsert<'_>> = rows.iter().map(DiscountUpsert::from).collect();
        self.upsert(&self.tables.discounts, "property_id,discount_type", &payload)
            .await
    }
}
