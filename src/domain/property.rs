use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Property {
    pub id: String,
    pub title: String,
    /// Nightly rate used whenever a date has no override.
    pub base_price: f64,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub beds: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<f64>,
    #[serde(default)]
    pub amenities: BTreeMap<String, bool>,
}

impl Property {
    /// Amenity names flagged as present, in alphabetical order.
    pub fn amenity_list(&self) -> Vec<&str> {
        self.amenities
            .iter()
            .filter(|(_, present)| **present)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# {} (ID: {})", self.title, self.id)?;
        writeln!(f, "Base price: {:.0}/night", self.base_price)?;
        let mut layout = Vec::new();
        if let Some(n) = self.bedrooms {
            layout.push(format!("{n} bedrooms"));
        }
        if let Some(n) = self.beds {
            layout.push(format!("{n} beds"));
        }
        if let Some(n) = self.bathrooms {
            layout.push(format!("{n} bathrooms"));
        }
        if !layout.is_empty() {
            writeln!(f, "{}", layout.join(" | "))?;
        }
        let amenities = self.amenity_list();
        if !amenities.is_empty() {
            writeln!(f, "Amenities: {}", amenities.join(", "))?;
        }
        Ok(())
    }
}
