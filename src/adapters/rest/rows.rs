//! Wire records of the managed database's REST endpoint and their
//! conversion into domain types.
//!
//! Ids may come back as numbers or strings, numeric columns as JSON numbers
//! or strings, and date columns as `YYYY-MM-DD` or full timestamps. Timestamps
//! are cut to the date part as written; no timezone conversion happens.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{Booking, BookingStatus};
use crate::domain::discount::{DiscountRule, DiscountType};
use crate::domain::pricing::PriceOverride;
use crate::domain::property::Property;
use crate::error::{CalendarError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Text(String),
    Number(i64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberValue {
    Number(f64),
    Text(String),
}

impl NumberValue {
    fn to_f64(&self, field: &str) -> Result<f64> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| CalendarError::decode(format!("{field} '{s}' is not a number"))),
        }
    }
}

/// Amenities stored either as `{"Pool": true}` or `["Pool"]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmenitiesValue {
    Flags(BTreeMap<String, bool>),
    Names(Vec<String>),
}

impl AmenitiesValue {
    fn into_map(self) -> BTreeMap<String, bool> {
        match self {
            Self::Flags(map) => map,
            Self::Names(names) => names.into_iter().map(|n| (n, true)).collect(),
        }
    }
}

pub fn parse_store_date(raw: &str, field: &str) -> Result<NaiveDate> {
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
        .ok_or_else(|| CalendarError::decode(format!("{field} '{raw}' is not a date")))
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyRecord {
    pub id: IdValue,
    #[serde(default)]
    pub title: Option<String>,
    pub base_price: Option<NumberValue>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub beds: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<NumberValue>,
    #[serde(default)]
    pub amenities: Option<AmenitiesValue>,
}

impl TryFrom<PropertyRecord> for Property {
    type Error = CalendarError;

    fn try_from(record: PropertyRecord) -> Result<Self> {
        let id = record.id.into_string();
        let base_price = record
            .base_price
            .as_ref()
            .ok_or_else(|| CalendarError::decode(format!("property {id} has no base_price")))?
            .to_f64("base_price")?;
        let bathrooms = record
            .bathrooms
            .as_ref()
            .map(|b| b.to_f64("bathrooms"))
            .transpose()?;
        Ok(Property {
            title: record.title.unwrap_or_else(|| format!("Property {id}")),
            id,
            base_price,
            bedrooms: record.bedrooms,
            beds: record.beds,
            bathrooms,
            amenities: record
                .amenities
                .map(AmenitiesValue::into_map)
                .unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRecord {
    pub id: IdValue,
    pub property_id: IdValue,
    pub check_in: String,
    pub check_out: String,
    pub status: String,
    #[serde(default)]
    pub total_price: Option<NumberValue>,
}

fn parse_status(raw: &str) -> Result<BookingStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(BookingStatus::Pending),
        "confirmed" => Ok(BookingStatus::Confirmed),
        "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
        "completed" => Ok(BookingStatus::Completed),
        other => Err(CalendarError::decode(format!(
            "unknown booking status '{other}'"
        ))),
    }
}

impl TryFrom<BookingRecord> for Booking {
    type Error = CalendarError;

    fn try_from(record: BookingRecord) -> Result<Self> {
        Ok(Booking {
            id: record.id.into_string(),
            property_id: record.property_id.into_string(),
            check_in: parse_store_date(&record.check_in, "check_in")?,
            check_out: parse_store_date(&record.check_out, "check_out")?,
            status: parse_status(&record.status)?,
            total_price: record
                .total_price
                .as_ref()
                .map(|p| p.to_f64("total_price"))
                .transpose()?
                .unwrap_or(0.0),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverrideRecord {
    pub property_id: IdValue,
    pub date: String,
    pub price: NumberValue,
}

impl TryFrom<OverrideRecord> for PriceOverride {
    type Error = CalendarError;

    fn try_from(record: OverrideRecord) -> Result<Self> {
        Ok(PriceOverride {
            property_id: record.property_id.into_string(),
            date: parse_store_date(&record.date, "date")?,
            price: record.price.to_f64("price")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountRecord {
    pub property_id: IdValue,
    pub discount_type: DiscountType,
    pub value: NumberValue,
    #[serde(default)]
    pub is_percentage: Option<bool>,
}

impl TryFrom<DiscountRecord> for DiscountRule {
    type Error = CalendarError;

    fn try_from(record: DiscountRecord) -> Result<Self> {
        Ok(DiscountRule {
            property_id: record.property_id.into_string(),
            discount_type: record.discount_type,
            percentage: record.value.to_f64("value")?,
            is_percentage: record.is_percentage.unwrap_or(true),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OverrideUpsert<'a> {
    pub property_id: &'a str,
    pub date: String,
    pub price: f64,
}

impl<'a> From<&'a PriceOverride> for OverrideUpsert<'a> {
    fn from(row: &'a PriceOverride) -> Self {
        Self {
            property_id: &row.property_id,
            date: row.date.format("%Y-%m-%d").to_string(),
            price: row.price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscountUpsert<'a> {
    pub property_id: &'a str,
    pub discount_type: DiscountType,
    pub value: f64,
    pub is_percentage: bool,
}

impl<'a> From<&'a DiscountRule> for DiscountUpsert<'a> {
    fn from(rule: &'a DiscountRule) -> Self {
        Self {
            property_id: &rule.property_id,
            discount_type: rule.discount_type,
            value: rule.percentage,
            is_percentage: rule.is_percentage,
        }
    }
}

/// Convert every record, failing on the first malformed one.
pub fn convert_all<R, T>(records: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = CalendarError>,
{
    records.into_iter().map(T::try_from).collect()
}
