use super::domain::{Coordinates, IbgeId, VacancyListing};
use geo::{GeodesicDistance, Point};
use std::collections::HashMap;

/// Ellipsoidal (WGS84, Karney) distance in kilometers.
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    if from == to {
        return 0.0;
    }

    let from = Point::new(from.longitude, from.latitude);
    let to = Point::new(to.longitude, to.latitude);
    (from.geodesic_distance(&to) / 1000.0).max(0.0)
}

/// Distance from `origin` to every listed city, keyed by IBGE id.
pub fn compute_distances(listings: &[VacancyListing], origin: Coordinates) -> HashMap<IbgeId, f64> {
    listings
        .iter()
        .map(|listing| {
            (
                listing.ibge_id.clone(),
                distance_km(origin, listing.coordinates),
            )
        })
        .collect()
}
