//! `CellPointsMap`: accumulates [`CellPoints`] per [`Location`] across a
//! spread step, merging contributions from every source cell that reaches
//! the same destination.

use crate::cell_points::CellPoints;
use crate::location::Location;
use rustc_hash::FxHashMap;

/// Map from destination cell to the accumulated extremal points that landed
/// in it this step.
#[derive(Debug, Clone, Default)]
pub struct CellPointsMap {
    cells: FxHashMap<Location, CellPoints>,
}

impl CellPointsMap {
    #[must_use]
    pub fn new() -> Self {
        CellPointsMap { cells: FxHashMap::default() }
    }

    /// Merge `points` into whatever is already stored for `points`'s cell.
    /// Panics (via debug assertion deeper in [`CellPoints::merge`]) if
    /// `points` is non-empty but claims a different cell than what's on
    /// file, which would indicate a caller bug.
    pub fn insert(&mut self, points: CellPoints) {
        if points.is_empty() {
            return;
        }
        let loc = points.cell().expect("non-empty CellPoints has a cell");
        self.cells.entry(loc).or_default().merge(&points);
    }

    #[must_use]
    pub fn get(&self, loc: Location) -> Option<&CellPoints> {
        self.cells.get(&loc)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn locations(&self) -> impl Iterator<Item = Location> + '_ {
        self.cells.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Location, &CellPoints)> {
        self.cells.iter().map(|(&loc, cp)| (loc, cp))
    }

    /// Drop every entry for which `keep` returns `false`. Used to purge
    /// cells that cannot burn (non-fuel) or that did not actually survive
    /// the step: a point landing exactly on a cell boundary or in non-fuel
    /// is discarded rather than propagated.
    pub fn retain(&mut self, mut keep: impl FnMut(Location, &CellPoints) -> bool) {
        self.cells.retain(|&loc, cp| keep(loc, cp));
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::Offset;

    #[test]
    fn insert_merges_same_cell_contributions() {
        let mut map = CellPointsMap::new();
        map.insert(CellPoints::with_point(Offset::new(3.1, 3.9)));
        map.insert(CellPoints::with_point(Offset::new(3.9, 3.1)));
        assert_eq!(map.len(), 1);
        let cp = map.get(Location::new(3, 3)).unwrap();
        assert_eq!(cp.unique_points().len(), 2);
    }

    #[test]
    fn insert_ignores_empty_cell_points() {
        let mut map = CellPointsMap::new();
        map.insert(CellPoints::empty());
        assert!(map.is_empty());
    }

    #[test]
    fn retain_purges_non_surviving_cells() {
        let mut map = CellPointsMap::new();
        map.insert(CellPoints::with_point(Offset::new(1.5, 1.5)));
        map.insert(CellPoints::with_point(Offset::new(2.5, 2.5)));
        map.retain(|loc, _| loc.row() != 1);
        assert_eq!(map.len(), 1);
        assert!(map.get(Location::new(2, 2)).is_some());
        assert!(map.get(Location::new(1, 1)).is_none());
    }

    #[test]
    fn distinct_cells_do_not_merge() {
        let mut map = CellPointsMap::new();
        map.insert(CellPoints::with_point(Offset::new(1.1, 1.1)));
        map.insert(CellPoints::with_point(Offset::new(5.1, 5.1)));
        assert_eq!(map.len(), 2);
    }
}
