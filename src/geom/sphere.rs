use geo::{Coord, LineString, Point, Polygon};

/// Mean Earth radius (IUGG), in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance between two (lon, lat) points, in meters.
pub fn haversine_m(a: Point<f64>, b: Point<f64>) -> f64 {
    let (lat1, lat2) = (a.y().to_radians(), b.y().to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.x() - a.x()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Point reached from `origin` after travelling `distance_m` along `bearing_deg` (clockwise from north).
pub fn destination(origin: Point<f64>, bearing_deg: f64, distance_m: f64) -> Point<f64> {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let (lat1, lon1) = (origin.y().to_radians(), origin.x().to_radians());

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1 + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    // normalize longitude into [-180, 180)
    let lon2 = (lon2.to_degrees() + 540.0) % 360.0 - 180.0;
    Point::new(lon2, lat2.to_degrees())
}

/// Closed polygon approximating the geodesic circle of `radius_m` around `center`.
pub fn circle_polygon(center: Point<f64>, radius_m: f64, segments: usize) -> Polygon<f64> {
    let segments = segments.max(3);
    let mut ring: Vec<Coord<f64>> = (0..segments)
        .map(|i| destination(center, 360.0 * i as f64 / segments as f64, radius_m).0)
        .collect();
    ring.push(ring[0]);
    Polygon::new(LineString(ring), vec![])
}

/// Half-widths (dlon, dlat) in degrees of a box that contains every point within `radius_m` of `center`.
pub fn degree_span(center: Point<f64>, radius_m: f64) -> (f64, f64) {
    let delta = radius_m / EARTH_RADIUS_M;
    let dlat = delta.to_degrees();
    let ratio = delta.sin() / center.y().to_radians().cos().abs();
    let dlon = if delta >= std::f64::consts::PI / 2.0 || ratio >= 1.0 { 180.0 } else { ratio.asin().to_degrees() };
    (dlon, dlat)
}
