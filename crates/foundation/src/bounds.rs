use serde::{Deserialize, Serialize};

use crate::math::{LatLon, MERCATOR_MAX_LAT};

/// Axis-aligned geographic bounding box in degrees.
///
/// Boxes never wrap the antimeridian: `south_west.lon <= north_east.lon`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLonBounds {
    pub south_west: LatLon,
    pub north_east: LatLon,
}

impl LatLonBounds {
    /// Builds a box from two opposite corners in any order.
    pub fn new(a: LatLon, b: LatLon) -> Self {
        Self {
            south_west: LatLon::new(a.lat.min(b.lat), a.lon.min(b.lon)),
            north_east: LatLon::new(a.lat.max(b.lat), a.lon.max(b.lon)),
        }
    }

    /// The single-copy Web Mercator world.
    pub fn world() -> Self {
        Self::new(
            LatLon::new(-MERCATOR_MAX_LAT, -180.0),
            LatLon::new(MERCATOR_MAX_LAT, 180.0),
        )
    }

    /// Smallest box holding every point, or `None` for an empty input.
    pub fn from_points(points: impl IntoIterator<Item = LatLon>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Self::new(first, first);
        for p in iter {
            out.extend(p);
        }
        Some(out)
    }

    pub fn extend(&mut self, p: LatLon) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lon = self.south_west.lon.min(p.lon);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lon = self.north_east.lon.max(p.lon);
    }

    pub fn contains(&self, p: LatLon) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&p.lat)
            && (self.south_west.lon..=self.north_east.lon).contains(&p.lon)
    }

    pub fn center(&self) -> LatLon {
        LatLon::new(
            (self.south_west.lat + self.north_east.lat) * 0.5,
            (self.south_west.lon + self.north_east.lon) * 0.5,
        )
    }

    /// Grows each side by `ratio` of the box's span on that axis.
    pub fn pad(&self, ratio: f64) -> Self {
        let dlat = (self.north_east.lat - self.south_west.lat).abs() * ratio;
        let dlon = (self.north_east.lon - self.south_west.lon).abs() * ratio;
        Self {
            south_west: LatLon::new(self.south_west.lat - dlat, self.south_west.lon - dlon),
            north_east: LatLon::new(self.north_east.lat + dlat, self.north_east.lon + dlon),
        }
    }

    /// Nearest point inside the box.
    pub fn clamp(&self, p: LatLon) -> LatLon {
        LatLon::new(
            p.lat.clamp(self.south_west.lat, self.north_east.lat),
            p.lon.clamp(self.south_west.lon, self.north_east.lon),
        )
    }
}
