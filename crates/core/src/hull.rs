//! Convex hull reduction for a cell's accumulated spread points: once a
//! cell has accumulated more than three extremal points, it reduces to
//! their convex hull to bound growth.
//!
//! A cell's point set only ever needs its outer boundary: interior points
//! can't push the fire edge any further than the hull already does, so
//! dropping them bounds how many points one cell can accumulate without
//! changing where the fire can spread from there.

use crate::point::Offset;

/// Cross product of `(o -> a)` and `(o -> b)`, positive for a left turn.
fn cross(o: Offset, a: Offset, b: Offset) -> f64 {
    (a.x() - o.x()) * (b.y() - o.y()) - (a.y() - o.y()) * (b.x() - o.x())
}

/// Reduce `points` to their convex hull via Andrew's monotone chain.
/// Returns the hull vertices in counter-clockwise order, duplicates
/// removed. Inputs with 3 or fewer points are returned unchanged (a
/// triangle or smaller is already its own hull).
#[must_use]
pub fn convex_hull(points: &[Offset]) -> Vec<Offset> {
    if points.len() <= 3 {
        return points.to_vec();
    }

    let mut sorted: Vec<Offset> = points.to_vec();
    sorted.sort_by(|a, b| a.x().partial_cmp(&b.x()).unwrap().then(a.y().partial_cmp(&b.y()).unwrap()));
    sorted.dedup_by(|a, b| a.x() == b.x() && a.y() == b.y());

    if sorted.len() <= 3 {
        return sorted;
    }

    let mut lower: Vec<Offset> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Offset> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_or_fewer_points_pass_through_unchanged() {
        let pts = vec![Offset::new(0.0, 0.0), Offset::new(1.0, 0.0), Offset::new(0.5, 1.0)];
        assert_eq!(convex_hull(&pts), pts);
    }

    #[test]
    fn interior_point_is_dropped() {
        let square = vec![Offset::new(0.0, 0.0), Offset::new(2.0, 0.0), Offset::new(2.0, 2.0), Offset::new(0.0, 2.0)];
        let mut pts = square.clone();
        pts.push(Offset::new(1.0, 1.0));
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.iter().any(|p| (p.x() - 1.0).abs() < 1e-9 && (p.y() - 1.0).abs() < 1e-9));
    }

    #[test]
    fn collinear_duplicates_collapse() {
        let pts = vec![
            Offset::new(0.0, 0.0),
            Offset::new(0.0, 0.0),
            Offset::new(1.0, 0.0),
            Offset::new(0.5, 1.0),
            Offset::new(0.5, 1.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 3);
    }

    #[test]
    fn hull_of_many_points_bounds_the_original_set() {
        let pts = vec![
            Offset::new(0.0, 0.0),
            Offset::new(4.0, 0.0),
            Offset::new(4.0, 4.0),
            Offset::new(0.0, 4.0),
            Offset::new(2.0, 2.0),
            Offset::new(1.0, 1.0),
            Offset::new(3.0, 3.0),
        ];
        let hull = convex_hull(&pts);
        assert!(hull.len() <= 4);
        assert!(hull.len() >= 3);
    }
}
