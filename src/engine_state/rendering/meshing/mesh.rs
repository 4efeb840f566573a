//! Geometry generation for voxel cells.
//!
//! The builder is a pure function over a dispatch-time snapshot: it scans
//! every voxel in the cell, culls faces against the six adjacent voxels
//! (crossing into neighbor snapshots at the cell boundary) and emits one
//! quad per visible face. Output is fully regenerated on every rebuild --
//! there is no incremental patching -- so identical input always produces
//! bit-identical buffers.

use crate::config::AtlasLayout;
use crate::engine_state::voxels::block::BlockTypeTable;
use crate::engine_state::voxels::world::MeshInput;
use crate::engine_state::voxels::AIR;

/// One per-chunk geometry buffer, ready for upload.
///
/// `positions` and `normals` hold three floats per vertex, `uvs` two, and
/// `indices` reference vertices as two triangles per emitted quad. One
/// instance is produced per render class (opaque, transparent) per rebuild.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryBuffer {
    /// Vertex positions, `3 * n` floats.
    pub positions: Vec<f32>,
    /// Vertex normals, `3 * n` floats.
    pub normals: Vec<f32>,
    /// Vertex texture coordinates, `2 * n` floats.
    pub uvs: Vec<f32>,
    /// Triangle indices into the vertex arrays.
    pub indices: Vec<u32>,
}

impl GeometryBuffer {
    /// Whether the buffer holds no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangle indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// One corner of a face quad: unit-cube position and tile-relative UV.
struct FaceCorner {
    pos: [i32; 3],
    uv: [f32; 2],
}

/// Static description of one face direction: outward normal, the atlas row
/// its texture comes from, and the four corners in emission order.
struct FaceSpec {
    dir: [i32; 3],
    uv_row: u32,
    corners: [FaceCorner; 4],
}

/// The six face directions, in the same order as
/// [`crate::engine_state::voxels::world::NEIGHBOR_CELL_OFFSETS`]:
/// left, right, bottom, top, back, front. Corner ordering and winding are
/// fixed per direction so that indices `(n, n+1, n+2, n+2, n+1, n+3)` always
/// produce outward-facing triangles.
const FACES: [FaceSpec; 6] = [
    // left
    FaceSpec {
        dir: [-1, 0, 0],
        uv_row: 0,
        corners: [
            FaceCorner { pos: [0, 1, 0], uv: [0.0, 1.0] },
            FaceCorner { pos: [0, 0, 0], uv: [0.0, 0.0] },
            FaceCorner { pos: [0, 1, 1], uv: [1.0, 1.0] },
            FaceCorner { pos: [0, 0, 1], uv: [1.0, 0.0] },
        ],
    },
    // right
    FaceSpec {
        dir: [1, 0, 0],
        uv_row: 0,
        corners: [
            FaceCorner { pos: [1, 1, 1], uv: [0.0, 1.0] },
            FaceCorner { pos: [1, 0, 1], uv: [0.0, 0.0] },
            FaceCorner { pos: [1, 1, 0], uv: [1.0, 1.0] },
            FaceCorner { pos: [1, 0, 0], uv: [1.0, 0.0] },
        ],
    },
    // bottom
    FaceSpec {
        dir: [0, -1, 0],
        uv_row: 1,
        corners: [
            FaceCorner { pos: [1, 0, 1], uv: [1.0, 0.0] },
            FaceCorner { pos: [0, 0, 1], uv: [0.0, 0.0] },
            FaceCorner { pos: [1, 0, 0], uv: [1.0, 1.0] },
            FaceCorner { pos: [0, 0, 0], uv: [0.0, 1.0] },
        ],
    },
    // top
    FaceSpec {
        dir: [0, 1, 0],
        uv_row: 2,
        corners: [
            FaceCorner { pos: [0, 1, 1], uv: [1.0, 1.0] },
            FaceCorner { pos: [1, 1, 1], uv: [0.0, 1.0] },
            FaceCorner { pos: [0, 1, 0], uv: [1.0, 0.0] },
            FaceCorner { pos: [1, 1, 0], uv: [0.0, 0.0] },
        ],
    },
    // back
    FaceSpec {
        dir: [0, 0, -1],
        uv_row: 0,
        corners: [
            FaceCorner { pos: [1, 0, 0], uv: [0.0, 0.0] },
            FaceCorner { pos: [0, 0, 0], uv: [1.0, 0.0] },
            FaceCorner { pos: [1, 1, 0], uv: [0.0, 1.0] },
            FaceCorner { pos: [0, 1, 0], uv: [1.0, 1.0] },
        ],
    },
    // front
    FaceSpec {
        dir: [0, 0, 1],
        uv_row: 0,
        corners: [
            FaceCorner { pos: [0, 0, 1], uv: [0.0, 0.0] },
            FaceCorner { pos: [1, 0, 1], uv: [1.0, 0.0] },
            FaceCorner { pos: [0, 1, 1], uv: [0.0, 1.0] },
            FaceCorner { pos: [1, 1, 1], uv: [1.0, 1.0] },
        ],
    },
];

/// Builds the opaque and transparent geometry for one cell snapshot.
///
/// A face is emitted when the adjacent voxel is air or belongs to the other
/// transparency class: opaque neighbors occlude opaque faces, transparent
/// neighbors never occlude opaque faces, and faces between two
/// transparent-class voxels are culled. Absent chunks (own or neighbor)
/// read as air, so a cell deleted mid-flight resolves to empty buffers.
pub fn build_cell_geometry(
    input: &MeshInput,
    table: &dyn BlockTypeTable,
    atlas: &AtlasLayout,
    block_size: f32,
) -> (GeometryBuffer, GeometryBuffer) {
    let mut opaque = GeometryBuffer::default();
    let mut transparent = GeometryBuffer::default();

    if input.voxels.is_none() {
        return (opaque, transparent);
    }

    let cell_size = input.cell_size;
    let tile_size = atlas.tile_size as f32;
    let atlas_width = atlas.width as f32;
    let atlas_height = atlas.height as f32;

    for ly in 0..cell_size {
        for lz in 0..cell_size {
            for lx in 0..cell_size {
                let voxel = input.voxel_at(lx, ly, lz);
                if voxel == AIR {
                    continue;
                }

                let transparent_class = table.is_transparent(voxel);
                let tile = table.atlas_tile(voxel) as f32;
                let buffer = if transparent_class {
                    &mut transparent
                } else {
                    &mut opaque
                };

                for face in FACES.iter() {
                    let [dx, dy, dz] = face.dir;
                    let adjacent = input.voxel_at(lx + dx, ly + dy, lz + dz);
                    let occluded =
                        adjacent != AIR && table.is_transparent(adjacent) == transparent_class;
                    if occluded {
                        continue;
                    }

                    let base = (buffer.positions.len() / 3) as u32;
                    for corner in face.corners.iter() {
                        buffer.positions.extend_from_slice(&[
                            (corner.pos[0] + lx) as f32 * block_size,
                            (corner.pos[1] + ly) as f32 * block_size,
                            (corner.pos[2] + lz) as f32 * block_size,
                        ]);
                        buffer
                            .normals
                            .extend_from_slice(&[dx as f32, dy as f32, dz as f32]);
                        buffer.uvs.extend_from_slice(&[
                            (tile + corner.uv[0]) * tile_size / atlas_width,
                            1.0 - (face.uv_row as f32 + 1.0 - corner.uv[1]) * tile_size
                                / atlas_height,
                        ]);
                    }
                    buffer.indices.extend_from_slice(&[
                        base,
                        base + 1,
                        base + 2,
                        base + 2,
                        base + 1,
                        base + 3,
                    ]);
                }
            }
        }
    }

    (opaque, transparent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::addressing::{local_offset, CellId};
    use crate::engine_state::voxels::block::{BlockRegistry, GRASS, STONE, WATER};
    use crate::engine_state::voxels::world::MeshInput;
    use crate::engine_state::voxels::VoxelId;

    fn input_with(cell_size: i32, voxels: &[((i32, i32, i32), VoxelId)]) -> MeshInput {
        let mut input = MeshInput::empty(CellId::new(0, 0, 0), cell_size, false);
        let mut data = vec![0u8; (cell_size * cell_size * cell_size) as usize];
        for &((x, y, z), v) in voxels {
            data[local_offset(x, y, z, cell_size)] = v;
        }
        input.voxels = Some(data);
        input
    }

    fn build(input: &MeshInput) -> (GeometryBuffer, GeometryBuffer) {
        let registry = BlockRegistry::with_builtins();
        build_cell_geometry(input, &registry, &AtlasLayout::default(), 1.0)
    }

    #[test]
    fn empty_cell_builds_empty_buffers() {
        let input = input_with(4, &[]);
        let (opaque, transparent) = build(&input);
        assert!(opaque.is_empty());
        assert!(transparent.is_empty());
        assert_eq!(opaque.index_count(), 0);
    }

    #[test]
    fn absent_cell_builds_empty_buffers() {
        let input = MeshInput::empty(CellId::new(0, 0, 0), 4, true);
        let (opaque, transparent) = build(&input);
        assert!(opaque.is_empty());
        assert!(transparent.is_empty());
    }

    #[test]
    fn single_voxel_emits_six_faces() {
        let input = input_with(4, &[((0, 0, 0), STONE)]);
        let (opaque, transparent) = build(&input);
        assert_eq!(opaque.vertex_count(), 24);
        assert_eq!(opaque.index_count(), 36);
        assert_eq!(opaque.normals.len(), 72);
        assert_eq!(opaque.uvs.len(), 48);
        assert!(transparent.is_empty());
    }

    #[test]
    fn fully_enclosed_cell_emits_no_faces() {
        let cell_size = 4;
        let volume = (cell_size * cell_size * cell_size) as usize;
        let mut input = MeshInput::empty(CellId::new(0, 0, 0), cell_size, false);
        input.voxels = Some(vec![STONE; volume]);
        for side in 0..6 {
            input.neighbors[side] = Some(vec![STONE; volume]);
        }
        let (opaque, transparent) = build_cell_geometry(
            &input,
            &BlockRegistry::with_builtins(),
            &AtlasLayout::default(),
            1.0,
        );
        assert!(opaque.is_empty(), "interior faces must be culled");
        assert!(transparent.is_empty());
    }

    #[test]
    fn boundary_faces_cull_against_neighbor_snapshots() {
        // A full cell with one solid neighbor: the shared wall is culled,
        // the other five walls remain.
        let cell_size = 2;
        let volume = (cell_size * cell_size * cell_size) as usize;
        let mut input = MeshInput::empty(CellId::new(0, 0, 0), cell_size, false);
        input.voxels = Some(vec![STONE; volume]);
        input.neighbors[0] = Some(vec![STONE; volume]); // left (-x)

        let (opaque, _) = build_cell_geometry(
            &input,
            &BlockRegistry::with_builtins(),
            &AtlasLayout::default(),
            1.0,
        );
        // 5 exposed walls * 4 voxel faces each.
        assert_eq!(opaque.index_count() / 6, 20);
    }

    #[test]
    fn transparency_classes_split_buffers() {
        let input = input_with(4, &[((0, 0, 0), STONE), ((1, 0, 0), WATER), ((2, 0, 0), WATER)]);
        let (opaque, transparent) = build(&input);

        // The stone keeps all six faces: water does not occlude opaque.
        assert_eq!(opaque.vertex_count(), 24);
        // Each water voxel drops exactly one face against the adjacent
        // water (same class) and keeps the face against the stone.
        assert_eq!(transparent.index_count() / 6, 10);
    }

    #[test]
    fn rebuild_of_unchanged_input_is_bit_identical() {
        let input = input_with(
            4,
            &[((0, 0, 0), STONE), ((1, 2, 3), GRASS), ((3, 3, 3), WATER)],
        );
        let first = build(&input);
        let second = build(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn uvs_are_derived_from_atlas_layout() {
        // Grass occupies tile 0; the first emitted face is `left` whose
        // first corner has tile-relative uv (0, 1) -> atlas (0, 1).
        let input = input_with(4, &[((0, 0, 0), GRASS)]);
        let (opaque, _) = build(&input);
        assert_eq!(&opaque.uvs[0..2], &[0.0, 1.0]);
        assert!(opaque.uvs.iter().all(|&c| (0.0..=1.0).contains(&c)));
    }

    #[test]
    fn block_size_scales_positions() {
        let input = input_with(4, &[((1, 0, 0), STONE)]);
        let registry = BlockRegistry::with_builtins();
        let (scaled, _) =
            build_cell_geometry(&input, &registry, &AtlasLayout::default(), 16.0);
        // Max x coordinate of the voxel at lx=1 is (1+1) * 16.
        let max_x = scaled
            .positions
            .chunks(3)
            .map(|p| p[0])
            .fold(f32::MIN, f32::max);
        assert_eq!(max_x, 32.0);
    }
}
