//! # Dirty Tracking
//!
//! Maps a voxel edit to the set of cells whose mesh is now stale. The edited
//! coordinate is offset by one voxel along each axis; whenever such an
//! offset crosses into another cell, that neighbor's visible faces depend on
//! the edited voxel and it must be remeshed too. Offsets that stay inside
//! the owning cell collapse onto it during deduplication, so interior edits
//! dirty exactly one cell and boundary edits dirty exactly the neighbors
//! that share the edited face.

use super::addressing::CellId;

/// One remesh request: which cell, and whether regeneration must be applied
/// even if the resulting geometry is empty (needed to clear the mesh of a
/// cell whose last voxel was removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRequest {
    /// The cell to remesh.
    pub cell: CellId,
    /// Apply the rebuild even when the geometry comes back empty.
    pub force_update: bool,
}

/// Voxel offsets visited per edit: the edited voxel itself, then its six
/// face-adjacent voxels.
const EDIT_NEIGHBOR_OFFSETS: [[i32; 3]; 7] = [
    [0, 0, 0],
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

/// Computes remesh batches for voxel edits.
pub struct DirtyTracker {
    cell_size: i32,
}

impl DirtyTracker {
    /// A tracker for the given chunk edge length.
    pub fn new(cell_size: i32) -> Self {
        DirtyTracker { cell_size }
    }

    /// The deduplicated batch of cells to remesh after editing `(x, y, z)`.
    ///
    /// With `neighbor` false only the owning cell is returned, for bulk
    /// edits known not to affect neighbor visibility. At most one request
    /// per cell id is produced; ordering within the batch carries no
    /// meaning.
    pub fn requests_for_edit(
        &self,
        x: i32,
        y: i32,
        z: i32,
        neighbor: bool,
        force_update: bool,
    ) -> Vec<DirtyRequest> {
        let mut requests: Vec<DirtyRequest> = Vec::with_capacity(EDIT_NEIGHBOR_OFFSETS.len());

        for &[dx, dy, dz] in EDIT_NEIGHBOR_OFFSETS.iter() {
            let cell = CellId::containing(x + dx, y + dy, z + dz, self.cell_size);
            if !requests.iter().any(|request| request.cell == cell) {
                requests.push(DirtyRequest { cell, force_update });
            }
            if !neighbor {
                break;
            }
        }

        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(requests: &[DirtyRequest]) -> Vec<CellId> {
        requests.iter().map(|r| r.cell).collect()
    }

    #[test]
    fn interior_edit_dirties_exactly_one_cell() {
        let tracker = DirtyTracker::new(16);
        let requests = tracker.requests_for_edit(5, 5, 5, true, false);
        assert_eq!(cells(&requests), vec![CellId::new(0, 0, 0)]);
    }

    #[test]
    fn boundary_edit_dirties_the_face_neighbor() {
        let tracker = DirtyTracker::new(16);
        // Local offset (0, 5, 5): only the -x neighbor shares a face.
        let requests = tracker.requests_for_edit(0, 5, 5, true, false);
        let ids = cells(&requests);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&CellId::new(0, 0, 0)));
        assert!(ids.contains(&CellId::new(-1, 0, 0)));
    }

    #[test]
    fn corner_edit_dirties_one_neighbor_per_touching_face() {
        let tracker = DirtyTracker::new(16);
        let requests = tracker.requests_for_edit(0, 0, 0, true, false);
        let ids = cells(&requests);
        // Owning cell plus -x, -y and -z face neighbors; face offsets never
        // reach diagonal cells.
        assert_eq!(ids.len(), 4);
        assert!(ids.contains(&CellId::new(0, 0, 0)));
        assert!(ids.contains(&CellId::new(-1, 0, 0)));
        assert!(ids.contains(&CellId::new(0, -1, 0)));
        assert!(ids.contains(&CellId::new(0, 0, -1)));
    }

    #[test]
    fn neighbor_false_restricts_to_the_owning_cell() {
        let tracker = DirtyTracker::new(16);
        let requests = tracker.requests_for_edit(0, 0, 0, false, true);
        assert_eq!(cells(&requests), vec![CellId::new(0, 0, 0)]);
        assert!(requests[0].force_update);
    }

    #[test]
    fn negative_coordinates_map_to_negative_cells() {
        let tracker = DirtyTracker::new(16);
        let requests = tracker.requests_for_edit(-16, 5, 5, true, false);
        let ids = cells(&requests);
        assert!(ids.contains(&CellId::new(-1, 0, 0)));
        assert!(ids.contains(&CellId::new(-2, 0, 0)));
        assert_eq!(ids.len(), 2);
    }
}
