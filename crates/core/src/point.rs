//! 2D floating-point points and displacements, in "world coordinates" (cell
//! units, not metres).
//!
//! A single `Offset` type plays three roles depending on context: a world
//! position (`XYPos`), a position inside one cell (`InnerPos`), and a
//! per-minute spread displacement. Keeping one type for all three avoids an
//! explosion of near-identical newtypes while the aliases document intent
//! at each call site.

use crate::location::Location;

/// A 2D point or displacement in cell units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    x: f64,
    y: f64,
}

impl Offset {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Offset { x, y }
    }

    #[must_use]
    pub const fn x(self) -> f64 {
        self.x
    }

    #[must_use]
    pub const fn y(self) -> f64 {
        self.y
    }

    /// Scale both components by `duration` (used to turn a per-minute
    /// spread vector into the displacement for one spread step).
    #[must_use]
    pub fn scaled(self, duration: f64) -> Self {
        Offset::new(self.x * duration, self.y * duration)
    }

    #[must_use]
    pub fn translated(self, by: Offset) -> Self {
        Offset::new(self.x + by.x, self.y + by.y)
    }

    /// The cell that contains this point: `floor(x), floor(y)`.
    #[must_use]
    pub fn enclosing_cell(self) -> (i32, i32) {
        (self.y.floor() as i32, self.x.floor() as i32)
    }

    /// This point expressed relative to the lower-left corner of its
    /// enclosing cell (i.e. the fractional part of each coordinate).
    #[must_use]
    pub fn inner_offset(self) -> Offset {
        let (row, col) = self.enclosing_cell();
        Offset::new(self.x - f64::from(col), self.y - f64::from(row))
    }

    #[must_use]
    pub fn squared_distance(self, other: Offset) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// A point in world (grid) coordinates: integer part is the cell, fractional
/// part the position inside it.
pub type XyPos = Offset;
/// A point expressed relative to the lower-left corner of one cell.
pub type InnerPos = Offset;
/// A set of spread displacements (cells-per-minute, pre-duration-scaling).
pub type OffsetSet = Vec<Offset>;

/// Multiply every offset in `offsets` by `duration` in place, turning
/// per-minute spread vectors into the displacement for this step.
pub fn apply_duration(duration: f64, offsets: &OffsetSet) -> OffsetSet {
    offsets.iter().map(|o| o.scaled(duration)).collect()
}

/// Translate `origin` by every offset in `offsets`, grouping the resulting
/// points by the [`Location`] of their enclosing cell.
#[must_use]
pub fn apply_offsets(origin: XyPos, offsets: &OffsetSet) -> Vec<(Location, XyPos)> {
    offsets
        .iter()
        .map(|&o| {
            let p = origin.translated(o);
            let (row, col) = p.enclosing_cell();
            (Location::new(row, col), p)
        })
        .collect()
}
