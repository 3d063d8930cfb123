//! Pure geometric predicates on latitude/longitude coordinates.
//!
//! Polygons are tested in the plane (longitude as x, latitude as y) with
//! the even-odd ray-casting rule. Circles are tested on a sphere with the
//! haversine great-circle distance.
//!
//! # Known limitations
//!
//! - Polygons crossing the antimeridian (longitude wraparound at ±180°) are
//!   not handled; their edges are interpreted as spanning the long way round.
//! - Self-intersecting polygons yield whatever parity ray casting produces.

use geofence_types::{Area, Circle, Point, Shape};

use crate::error::GeoError;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Minimum number of vertices for a polygon to enclose any region.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Ray-casting (even-odd) point-in-polygon test.
///
/// Casts a horizontal ray from `point` and toggles on every polygon edge it
/// crosses; an odd number of crossings means inside. Each edge runs from a
/// vertex to the previous one, wrapping at the start. Fewer than three
/// vertices always yields `false`. Winding direction does not matter.
pub fn point_in_polygon(point: Point, vertices: &[Point]) -> bool {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return false;
    }
    let Some(&last) = vertices.last() else {
        return false;
    };

    let (x, y) = (point.lng, point.lat);
    let mut inside = false;
    let mut previous = last;

    for &current in vertices {
        let (xi, yi) = (current.lng, current.lat);
        let (xj, yj) = (previous.lng, previous.lat);

        // The straddle check guarantees yj != yi, so the division is safe.
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        previous = current;
    }

    inside
}

/// Great-circle distance between two points in meters (haversine formula).
pub fn haversine_distance_meters(a: Point, b: Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h marginally outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Whether `point` lies within `circle`. The boundary counts as inside.
pub fn point_in_circle(point: Point, circle: &Circle) -> bool {
    haversine_distance_meters(point, circle.center) <= circle.radius
}

/// The point reached by travelling `distance_m` meters from `origin` along
/// the great circle with initial bearing `bearing_deg` (clockwise from
/// north). Longitude is normalized to [-180, 180).
pub fn destination_point(origin: Point, bearing_deg: f64, distance_m: f64) -> Point {
    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    let lng = (lng2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    Point::new(lat2.to_degrees(), lng)
}

/// Check that an area's shape can be evaluated.
///
/// # Errors
///
/// - [`GeoError::MalformedArea`] for polygons with fewer than three vertices
///   and circles whose radius is not a positive finite number.
/// - [`GeoError::InvalidAreaCoordinate`] for any vertex or center outside
///   the valid coordinate range.
pub fn validate_area(area: &Area) -> Result<(), GeoError> {
    match &area.shape {
        Shape::Polygon(polygon) => {
            if polygon.vertices.len() < MIN_POLYGON_VERTICES {
                return Err(GeoError::MalformedArea {
                    area: area.id.clone(),
                    reason: format!(
                        "polygon needs at least {MIN_POLYGON_VERTICES} vertices, got {}",
                        polygon.vertices.len()
                    ),
                });
            }
            if let Some(bad) = polygon.vertices.iter().find(|v| !v.is_valid()) {
                return Err(GeoError::InvalidAreaCoordinate {
                    area: area.id.clone(),
                    lat: bad.lat,
                    lng: bad.lng,
                });
            }
            Ok(())
        }
        Shape::Circle(circle) => {
            if !circle.center.is_valid() {
                return Err(GeoError::InvalidAreaCoordinate {
                    area: area.id.clone(),
                    lat: circle.center.lat,
                    lng: circle.center.lng,
                });
            }
            if !circle.radius.is_finite() || circle.radius <= 0.0 {
                return Err(GeoError::MalformedArea {
                    area: area.id.clone(),
                    reason: format!("circle radius must be positive, got {}", circle.radius),
                });
            }
            Ok(())
        }
    }
}

/// Whether `point` lies inside `area`, dispatching on the shape type.
///
/// The active flag is not consulted; filtering inactive areas is the
/// registry's job.
///
/// # Errors
///
/// Returns the [`validate_area`] error if the shape is unusable.
pub fn area_contains(area: &Area, point: Point) -> Result<bool, GeoError> {
    validate_area(area)?;
    Ok(match &area.shape {
        Shape::Polygon(polygon) => point_in_polygon(point, &polygon.vertices),
        Shape::Circle(circle) => point_in_circle(point, circle),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const EPS_M: f64 = 1e-6;

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        ]
    }

    /// Random convex polygon: vertices on a circle at sorted random angles.
    fn random_convex_polygon(rng: &mut StdRng) -> Vec<Point> {
        let center_lat = rng.random_range(-60.0..60.0);
        let center_lng = rng.random_range(-170.0..170.0);
        let radius = rng.random_range(0.01..5.0);
        let count = rng.random_range(3..12_usize);

        let mut angles: Vec<f64> = (0..count)
            .map(|_| rng.random_range(0.0..std::f64::consts::TAU))
            .collect();
        angles.sort_by(f64::total_cmp);

        angles
            .into_iter()
            .map(|a| Point::new(center_lat + radius * a.sin(), center_lng + radius * a.cos()))
            .collect()
    }

    #[test]
    fn square_contains_center() {
        assert!(point_in_polygon(Point::new(0.5, 0.5), &unit_square()));
    }

    #[test]
    fn square_excludes_outside_points() {
        let square = unit_square();
        assert!(!point_in_polygon(Point::new(1.5, 0.5), &square));
        assert!(!point_in_polygon(Point::new(0.5, -0.5), &square));
        assert!(!point_in_polygon(Point::new(-3.0, -3.0), &square));
    }

    #[test]
    fn winding_direction_does_not_matter() {
        let mut reversed = unit_square();
        reversed.reverse();
        assert!(point_in_polygon(Point::new(0.25, 0.75), &reversed));
        assert!(!point_in_polygon(Point::new(2.0, 0.75), &reversed));
    }

    #[test]
    fn fewer_than_three_vertices_is_never_inside() {
        let line = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        assert!(!point_in_polygon(Point::new(0.5, 0.5), &line));
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        // U shape opening north: the notch between the arms is outside.
        let u_shape = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 3.0),
            Point::new(3.0, 3.0),
            Point::new(3.0, 2.0),
            Point::new(1.0, 2.0),
            Point::new(1.0, 1.0),
            Point::new(3.0, 1.0),
            Point::new(3.0, 0.0),
        ];
        assert!(point_in_polygon(Point::new(2.0, 0.5), &u_shape));
        assert!(point_in_polygon(Point::new(2.0, 2.5), &u_shape));
        assert!(!point_in_polygon(Point::new(2.0, 1.5), &u_shape));
    }

    #[test]
    fn random_convex_polygons_contain_interior_points() {
        let mut rng = StdRng::seed_from_u64(0x6e0f);
        for _ in 0..500 {
            let polygon = random_convex_polygon(&mut rng);
            let weights: Vec<f64> = polygon.iter().map(|_| rng.random_range(0.2..1.0)).collect();
            let total: f64 = weights.iter().sum();
            let lat = polygon.iter().zip(&weights).map(|(p, w)| p.lat * w).sum::<f64>() / total;
            let lng = polygon.iter().zip(&weights).map(|(p, w)| p.lng * w).sum::<f64>() / total;
            assert!(
                point_in_polygon(Point::new(lat, lng), &polygon),
                "interior point ({lat}, {lng}) reported outside {polygon:?}"
            );
        }
    }

    #[test]
    fn random_convex_polygons_exclude_points_beyond_bounding_box() {
        let mut rng = StdRng::seed_from_u64(0xb0c5);
        for _ in 0..500 {
            let polygon = random_convex_polygon(&mut rng);
            let max_lat = polygon.iter().map(|p| p.lat).fold(f64::MIN, f64::max);
            let min_lng = polygon.iter().map(|p| p.lng).fold(f64::MAX, f64::min);
            let north = Point::new(max_lat + rng.random_range(0.001..1.0), min_lng);
            let west = Point::new(max_lat, min_lng - rng.random_range(0.001..1.0));
            assert!(!point_in_polygon(north, &polygon));
            assert!(!point_in_polygon(west, &polygon));
        }
    }

    #[test]
    fn haversine_of_identical_points_is_zero() {
        let p = Point::new(48.8566, 2.3522);
        assert!(haversine_distance_meters(p, p).abs() < EPS_M);
    }

    #[test]
    fn haversine_is_symmetric() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let a = Point::new(rng.random_range(-90.0..90.0), rng.random_range(-180.0..180.0));
            let b = Point::new(rng.random_range(-90.0..90.0), rng.random_range(-180.0..180.0));
            let ab = haversine_distance_meters(a, b);
            let ba = haversine_distance_meters(b, a);
            assert!((ab - ba).abs() < EPS_M, "d(a,b)={ab} d(b,a)={ba}");
        }
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Berlin to Paris is roughly 878 km.
        let berlin = Point::new(52.5200, 13.4050);
        let paris = Point::new(48.8566, 2.3522);
        let km = haversine_distance_meters(berlin, paris) / 1000.0;
        assert!((km - 878.0).abs() < 5.0, "got {km} km");
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_distance_meters(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 1.0, "got {d} m");
    }

    #[test]
    fn destination_point_lands_at_requested_distance() {
        let origin = Point::new(37.7749, -122.4194);
        for bearing in [0.0, 45.0, 90.0, 180.0, 270.0, 333.0] {
            let target = destination_point(origin, bearing, 1234.5);
            let d = haversine_distance_meters(origin, target);
            assert!((d - 1234.5).abs() < 1e-3, "bearing {bearing}: got {d}");
        }
    }

    #[test]
    fn destination_point_wraps_longitude() {
        let target = destination_point(Point::new(0.0, 179.999), 90.0, 1000.0);
        assert!(target.lng < 0.0);
        assert!(target.is_valid());
    }

    #[test]
    fn circle_contains_its_center() {
        let center = Point::new(10.0, 20.0);
        assert!(point_in_circle(center, &Circle::new(center, 1000.0)));
    }

    #[test]
    fn circle_boundary_is_inclusive() {
        let center = Point::new(-33.8688, 151.2093);
        let on_edge = destination_point(center, 60.0, 1000.0);
        let exact = haversine_distance_meters(on_edge, center);

        assert!(point_in_circle(on_edge, &Circle::new(center, exact)));
    }

    #[test]
    fn circle_excludes_points_just_beyond_radius() {
        let center = Point::new(51.5074, -0.1278);
        let beyond = destination_point(center, 200.0, 1000.5);
        assert!(!point_in_circle(beyond, &Circle::new(center, 1000.0)));
    }

    #[test]
    fn two_vertex_polygon_area_is_malformed() {
        let area = Area::polygon("line", "Line", vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        let err = area_contains(&area, Point::new(0.5, 0.5)).unwrap_err();
        assert!(matches!(err, GeoError::MalformedArea { .. }));
    }

    #[test]
    fn non_positive_radius_is_malformed() {
        for radius in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let area = Area::circle("c", "C", Point::new(0.0, 0.0), radius);
            assert!(matches!(
                validate_area(&area),
                Err(GeoError::MalformedArea { .. })
            ));
        }
    }

    #[test]
    fn out_of_range_vertex_is_invalid_coordinate() {
        let area = Area::polygon(
            "bad",
            "Bad",
            vec![
                Point::new(0.0, 0.0),
                Point::new(95.0, 0.0),
                Point::new(0.0, 1.0),
            ],
        );
        let err = validate_area(&area).unwrap_err();
        assert!(matches!(err, GeoError::InvalidAreaCoordinate { lat, .. } if lat > 90.0));
    }

    #[test]
    fn area_contains_dispatches_on_shape() {
        let square = Area::polygon("sq", "Square", unit_square());
        let circle = Area::circle("c", "Circle", Point::new(5.0, 5.0), 500.0);
        assert!(area_contains(&square, Point::new(0.5, 0.5)).unwrap());
        assert!(!area_contains(&square, Point::new(5.0, 5.0)).unwrap());
        assert!(area_contains(&circle, Point::new(5.0, 5.0)).unwrap());
        assert!(!area_contains(&circle, Point::new(0.5, 0.5)).unwrap());
    }
}
