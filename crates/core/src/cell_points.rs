//! `CellPoints`: the 16-direction extremal point set bounding per-cell
//! memory.
//!
//! For each of 16 compass directions we keep only the point closest to a
//! fixed outer-corner
//! reference for that direction. A cell reached by thousands of propagated
//! points this way never stores more than 16 of them.

use crate::location::{DirectionMask, Location};
use crate::point::{InnerPos, Offset, XyPos};
use std::collections::BTreeSet;

/// Number of compass directions tracked per cell.
pub const NUM_DIRECTIONS: usize = 16;

// Index order: N, NNE, NE, ENE, E, ESE, SE, SSE, S, SSW, SW, WSW, W, WNW, NW, NNW.
const DIST_22_5: f64 = 0.207_106_781_186_547_5;
const P_0_5: f64 = 0.5 + DIST_22_5;
const M_0_5: f64 = 0.5 - DIST_22_5;

/// Fixed reference points near the cell perimeter that each direction's
/// extremal point is measured against (`POINTS_OUTER` in the original).
const OUTER: [(f64, f64); NUM_DIRECTIONS] = [
    (0.5, 1.0),   // N
    (P_0_5, 1.0), // NNE
    (1.0, 1.0),   // NE
    (1.0, P_0_5), // ENE
    (1.0, 0.5),   // E
    (1.0, M_0_5), // ESE
    (1.0, 0.0),   // SE
    (P_0_5, 0.0), // SSE
    (0.5, 0.0),   // S
    (M_0_5, 0.0), // SSW
    (0.0, 0.0),   // SW
    (0.0, M_0_5), // WSW
    (0.0, 0.5),   // W
    (0.0, P_0_5), // WNW
    (0.0, 1.0),   // NW
    (M_0_5, 1.0), // NNW
];

/// Squared distance large enough that no real point can exceed it, used as
/// the "no point stored yet" sentinel (`INVALID_DISTANCE` in the original).
const INVALID_DISTANCE: f64 = (crate::location::MAX_ROWS * crate::location::MAX_ROWS) as f64;

/// Extremal-point set for one cell: for each of the 16 compass directions,
/// the closest point inserted so far to that direction's outer reference.
#[derive(Debug, Clone)]
pub struct CellPoints {
    distances: [f64; NUM_DIRECTIONS],
    points: [InnerPos; NUM_DIRECTIONS],
    cell_row: i32,
    cell_col: i32,
    sources: DirectionMask,
}

impl CellPoints {
    /// An empty `CellPoints`, not yet tied to any cell.
    #[must_use]
    pub fn empty() -> Self {
        CellPoints {
            distances: [INVALID_DISTANCE; NUM_DIRECTIONS],
            points: [Offset::new(0.0, 0.0); NUM_DIRECTIONS],
            cell_row: -1,
            cell_col: -1,
            sources: 0,
        }
    }

    /// A `CellPoints` holding a single inserted point.
    #[must_use]
    pub fn with_point(p: XyPos) -> Self {
        let mut cp = CellPoints::empty();
        cp.insert(p);
        cp
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances[0] == INVALID_DISTANCE
    }

    #[must_use]
    pub fn cell(&self) -> Option<Location> {
        if self.is_empty() {
            None
        } else {
            Some(Location::new(self.cell_row, self.cell_col))
        }
    }

    #[must_use]
    pub fn sources(&self) -> DirectionMask {
        self.sources
    }

    pub fn add_source(&mut self, src: DirectionMask) {
        self.sources |= src;
    }

    /// Insert a world-coordinate point. The enclosing cell of `p` becomes
    /// (or must already be) this `CellPoints`'s cell.
    pub fn insert(&mut self, p: XyPos) -> &mut Self {
        let (row, col) = p.enclosing_cell();
        if self.is_empty() {
            self.cell_row = row;
            self.cell_col = col;
        } else {
            debug_assert_eq!((self.cell_row, self.cell_col), (row, col), "insert into wrong cell");
        }
        let inner = p.inner_offset();
        for i in 0..NUM_DIRECTIONS {
            let (ox, oy) = OUTER[i];
            let d = (inner.x() - ox) * (inner.x() - ox) + (inner.y() - oy) * (inner.y() - oy);
            if d < self.distances[i] {
                self.distances[i] = d;
                self.points[i] = inner;
            }
        }
        self
    }

    /// Merge `other` into `self`, keeping the nearer point per direction and
    /// the union of source masks. Either side may be empty.
    pub fn merge(&mut self, other: &CellPoints) -> &mut Self {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() {
            self.cell_row = other.cell_row;
            self.cell_col = other.cell_col;
        } else {
            debug_assert_eq!(
                (self.cell_row, self.cell_col),
                (other.cell_row, other.cell_col),
                "merge across different cells"
            );
        }
        for i in 0..NUM_DIRECTIONS {
            if other.distances[i] < self.distances[i] {
                self.distances[i] = other.distances[i];
                self.points[i] = other.points[i];
            }
        }
        self.sources |= other.sources;
        self
    }

    /// The deduplicated set of stored points, translated back to world
    /// coordinates.
    #[must_use]
    pub fn unique(&self) -> BTreeSet<(u64, u64)> {
        if self.is_empty() {
            return BTreeSet::new();
        }
        self.points
            .iter()
            .map(|p| {
                let x = p.x() + f64::from(self.cell_col);
                let y = p.y() + f64::from(self.cell_row);
                (x.to_bits(), y.to_bits())
            })
            .collect()
    }

    #[must_use]
    pub fn unique_points(&self) -> Vec<XyPos> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for p in &self.points {
            let x = p.x() + f64::from(self.cell_col);
            let y = p.y() + f64::from(self.cell_row);
            let key = (x.to_bits(), y.to_bits());
            if seen.insert(key) {
                out.push(Offset::new(x, y));
            }
        }
        out
    }

    pub fn clear(&mut self) {
        *self = CellPoints::empty();
    }
}

impl Default for CellPoints {
    fn default() -> Self {
        CellPoints::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_unique_points() {
        let cp = CellPoints::empty();
        assert!(cp.unique().is_empty());
        assert!(cp.cell().is_none());
    }

    #[test]
    fn single_insert_is_representative_in_all_directions() {
        let p = Offset::new(3.25, 7.75);
        let cp = CellPoints::with_point(p);
        for i in 0..NUM_DIRECTIONS {
            assert_ne!(cp.distances[i], INVALID_DISTANCE, "direction {i} still empty");
        }
        let unique = cp.unique_points();
        assert_eq!(unique.len(), 1);
        assert!((unique[0].x() - 3.25).abs() < 1e-9);
        assert!((unique[0].y() - 7.75).abs() < 1e-9);
    }

    #[test]
    fn cell_matches_location_of_inserted_point() {
        let p = Offset::new(10.2, 5.9);
        let cp = CellPoints::with_point(p);
        let loc = cp.cell().unwrap();
        assert_eq!(loc.row(), 5);
        assert_eq!(loc.column(), 10);
    }

    #[test]
    fn merge_is_idempotent_on_unique_points() {
        let mut a = CellPoints::empty();
        a.insert(Offset::new(2.1, 2.9));
        a.insert(Offset::new(2.9, 2.1));
        let before = a.unique();
        let snapshot = a.clone();
        a.merge(&snapshot);
        assert_eq!(a.unique(), before);
    }

    #[test]
    fn merge_keeps_nearer_point_per_direction() {
        let mut a = CellPoints::empty();
        a.insert(Offset::new(2.0, 2.0)); // bottom-left corner: closest to SW (index 10)
        let mut b = CellPoints::empty();
        b.insert(Offset::new(2.99, 2.99)); // near top-right: closest to NE (index 2)
        a.merge(&b);
        // both extremes should now be present
        let pts = a.unique_points();
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn merge_unions_source_masks() {
        let mut a = CellPoints::with_point(Offset::new(1.5, 1.5));
        a.add_source(crate::location::Direction::North as DirectionMask);
        let mut b = CellPoints::with_point(Offset::new(1.5, 1.5));
        b.add_source(crate::location::Direction::East as DirectionMask);
        a.merge(&b);
        assert_eq!(
            a.sources(),
            crate::location::Direction::North as DirectionMask | crate::location::Direction::East as DirectionMask
        );
    }
}
