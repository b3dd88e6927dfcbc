use foundation::math::LatLon;
use serde::Deserialize;

use crate::config::RegionHint;

/// Structured address fields of a reverse-geocode response. Any may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressParts {
    pub house_number: Option<String>,
    pub road: Option<String>,
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
}

/// Body of a Nominatim `/reverse` answer.
///
/// Misses come back as `200 OK` with only an `error` field set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReverseResponse {
    pub display_name: Option<String>,
    pub address: Option<AddressParts>,
    pub error: Option<String>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl AddressParts {
    /// `house road, locality, state`, leaving out whatever is missing.
    /// A house number without a road is dropped.
    pub fn compose(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::with_capacity(3);

        match (present(&self.house_number), present(&self.road)) {
            (Some(house), Some(road)) => parts.push(format!("{house} {road}")),
            (None, Some(road)) => parts.push(road.to_string()),
            _ => {}
        }

        if let Some(locality) = present(&self.city)
            .or_else(|| present(&self.town))
            .or_else(|| present(&self.village))
        {
            parts.push(locality.to_string());
        }

        if let Some(state) = present(&self.state) {
            parts.push(state.to_string());
        }

        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl ReverseResponse {
    /// Short display address: composed parts first, then the provider's full
    /// display name.
    pub fn short_address(&self) -> Option<String> {
        self.address
            .as_ref()
            .and_then(AddressParts::compose)
            .or_else(|| present(&self.display_name).map(str::to_string))
    }
}

/// Appends the region name when `point` is inside the region and the address
/// does not already mention it.
pub fn with_region(address: String, point: LatLon, region: Option<&RegionHint>) -> String {
    let Some(region) = region else {
        return address;
    };
    if !region.bounds.contains(point) {
        return address;
    }
    if address
        .to_lowercase()
        .contains(&region.name.to_lowercase())
    {
        return address;
    }
    format!("{address}, {}", region.name)
}

/// `lat, lon` with fixed precision, shown when no address is available.
pub fn coordinate_fallback(point: LatLon, decimals: usize) -> String {
    format!("{:.decimals$}, {:.decimals$}", point.lat, point.lon)
}
