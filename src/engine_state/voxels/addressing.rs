//! # Voxel Addressing
//!
//! Pure coordinate math mapping world-space voxel coordinates to cell ids
//! and linear in-chunk offsets, and back. No state, no errors except when
//! parsing a cell id from its canonical string form.

use std::fmt;
use std::str::FromStr;

use cgmath::Point3;
use thiserror::Error;

/// Identifies one cell (chunk) of the world by its cell coordinates.
///
/// A cell id is derived from a world voxel coordinate by flooring each axis
/// against the configured cell size. The canonical string form is
/// `"cx,cy,cz"`, which is what [`fmt::Display`] produces and [`FromStr`]
/// accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellId(
    /// The raw cell coordinates.
    pub Point3<i32>,
);

impl CellId {
    /// Creates a cell id from explicit cell coordinates.
    pub fn new(cx: i32, cy: i32, cz: i32) -> Self {
        CellId(Point3::new(cx, cy, cz))
    }

    /// Returns the id of the cell containing the world voxel `(x, y, z)`.
    ///
    /// Uses floored division, so negative coordinates map to negative cell
    /// coordinates rather than clustering around zero.
    pub fn containing(x: i32, y: i32, z: i32, cell_size: i32) -> Self {
        CellId(Point3::new(
            x.div_euclid(cell_size),
            y.div_euclid(cell_size),
            z.div_euclid(cell_size),
        ))
    }

    /// The world voxel coordinate of this cell's minimum corner.
    ///
    /// Inverse of [`CellId::containing`] up to the local offset.
    pub fn origin(&self, cell_size: i32) -> Point3<i32> {
        Point3::new(
            self.0.x * cell_size,
            self.0.y * cell_size,
            self.0.z * cell_size,
        )
    }

    /// The cell id displaced by `(dx, dy, dz)` whole cells.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        CellId(Point3::new(self.0.x + dx, self.0.y + dy, self.0.z + dz))
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.0.x, self.0.y, self.0.z)
    }
}

/// Error produced when a cell id string does not parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CellIdParseError {
    /// The input was not three comma-separated integers.
    #[error("malformed cell id `{0}`")]
    Malformed(String),
}

impl FromStr for CellId {
    type Err = CellIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let mut next = || {
            parts
                .next()
                .and_then(|p| p.trim().parse::<i32>().ok())
                .ok_or_else(|| CellIdParseError::Malformed(s.to_string()))
        };
        let (cx, cy, cz) = (next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(CellIdParseError::Malformed(s.to_string()));
        }
        Ok(CellId::new(cx, cy, cz))
    }
}

/// Reduces each axis of a world voxel coordinate into `[0, cell_size)`.
///
/// Euclidean modulo keeps the result non-negative for negative input, which
/// a truncating `%` would not.
pub fn local_coords(x: i32, y: i32, z: i32, cell_size: i32) -> (i32, i32, i32) {
    (
        x.rem_euclid(cell_size),
        y.rem_euclid(cell_size),
        z.rem_euclid(cell_size),
    )
}

/// The linear in-chunk offset of the world voxel `(x, y, z)`.
///
/// Layout is `ly * cell_size^2 + lz * cell_size + lx`, matching the chunk's
/// dense storage order.
pub fn local_offset(x: i32, y: i32, z: i32, cell_size: i32) -> usize {
    let (lx, ly, lz) = local_coords(x, y, z, cell_size);
    (ly * cell_size * cell_size + lz * cell_size + lx) as usize
}
