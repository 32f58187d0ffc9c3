//! Geographic helpers: great-circle distance and bounding-box filtering.
//! Pure and stateless; used by the nearby-resorts lookup.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance in kilometers (haversine formula).
pub fn haversine_km(a: Coord, b: Coord) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Axis-aligned lat/lon box used as a cheap prefilter before the exact
/// distance check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box that fully contains the circle of `radius_km` around `center`.
    /// Longitude span widens with latitude; clamped near the poles.
    pub fn around(center: Coord, radius_km: f64) -> Self {
        let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
        let cos_lat = center.lat.to_radians().cos().max(1e-6);
        let lon_delta = (radius_km / (EARTH_RADIUS_KM * cos_lat)).to_degrees();

        Self {
            min_lat: (center.lat - lat_delta).max(-90.0),
            max_lat: (center.lat + lat_delta).min(90.0),
            min_lon: (center.lon - lon_delta).max(-180.0),
            max_lon: (center.lon + lon_delta).min(180.0),
        }
    }

    pub fn contains(&self, p: Coord) -> bool {
        p.lat >= self.min_lat
            && p.lat <= self.max_lat
            && p.lon >= self.min_lon
            && p.lon <= self.max_lon
    }
}

/// Filter items to those within `radius_km` of `center`, sorted nearest
/// first. The bounding box rejects far-away items before the exact check.
pub fn within_radius<T, F>(
    items: &[T],
    center: Coord,
    radius_km: f64,
    coord_of: F,
) -> Vec<(&T, f64)>
where
    F: Fn(&T) -> Coord,
{
    let bbox = BoundingBox::around(center, radius_km);
    let mut hits: Vec<(&T, f64)> = items
        .iter()
        .filter(|it| bbox.contains(coord_of(it)))
        .map(|it| (it, haversine_km(center, coord_of(it))))
        .filter(|(_, d)| *d <= radius_km)
        .collect();
    hits.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    const INNSBRUCK: Coord = Coord {
        lat: 47.2692,
        lon: 11.4041,
    };
    const ZURICH: Coord = Coord {
        lat: 47.3769,
        lon: 8.5417,
    };

    #[test]
    fn zero_distance_for_identical_points() {
        assert!(haversine_km(INNSBRUCK, INNSBRUCK) < 1e-9);
    }

    #[test]
    fn innsbruck_zurich_distance_is_plausible() {
        let d = haversine_km(INNSBRUCK, ZURICH);
        // Roughly 216 km great-circle.
        assert!(d > 200.0 && d < 230.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_km(INNSBRUCK, ZURICH);
        let ba = haversine_km(ZURICH, INNSBRUCK);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn bbox_contains_circle() {
        let bbox = BoundingBox::around(INNSBRUCK, 50.0);
        assert!(bbox.contains(Coord {
            lat: INNSBRUCK.lat + 0.3,
            lon: INNSBRUCK.lon - 0.3
        }));
        assert!(!bbox.contains(ZURICH));
    }

    #[test]
    fn within_radius_filters_and_sorts() {
        let points = vec![ZURICH, INNSBRUCK];
        let near = within_radius(&points, INNSBRUCK, 100.0, |c| *c);
        assert_eq!(near.len(), 1);
        assert!(near[0].1 < 1e-9);

        let wide = within_radius(&points, INNSBRUCK, 500.0, |c| *c);
        assert_eq!(wide.len(), 2);
        assert!(wide[0].1 <= wide[1].1);
    }
}
