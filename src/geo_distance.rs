//! Spherical error metric for the simplifier.

use crate::osm_types::Location;
use geo::{Bearing, Distance, Haversine};

/// Mean earth radius used by `geo`'s haversine metric space.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Cross-track distance in metres from `point` to the great circle through
/// `start` and `end`.
///
/// If `start == end` (the baseline of a closed ring) the great-circle
/// distance between `start` and `point` is returned instead.
pub fn distance_from_line(start: Location, end: Location, point: Location) -> f64 {
    let degenerate = start == end;
    let (start, end, point) = (start.to_point(), end.to_point(), point.to_point());

    if degenerate {
        return Haversine.distance(start, point);
    }

    let angular_13 = Haversine.distance(start, point) / EARTH_RADIUS_M;
    let bearing_12 = Haversine.bearing(start, end).to_radians();
    let bearing_13 = Haversine.bearing(start, point).to_radians();

    (angular_13.sin() * (bearing_13 - bearing_12).sin())
        .asin()
        .abs()
        * EARTH_RADIUS_M
}
