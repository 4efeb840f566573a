//! # Block Module
//!
//! The block-type table: per-voxel-id transparency class and texture-atlas
//! tile. The mesher never consults an ambient global; it is handed a
//! [`BlockTypeTable`] capability when a build is dispatched.
//!
//! Built-in block types live in a const table; additional types can be
//! registered at runtime from JSON definitions.

use std::collections::HashMap;
use std::fmt;

use num_derive::FromPrimitive;
use serde::Deserialize;
use thiserror::Error;

use super::{VoxelId, AIR};

/// Transparency and atlas lookups for voxel ids.
///
/// Implementations must be shareable with mesh workers, hence the
/// `Send + Sync` bound. Queries for unknown ids must fall back to a sane
/// default (opaque, tile 0) rather than fail: the store accepts any id
/// opaquely, so the table can always be asked about ids it never defined.
pub trait BlockTypeTable: Send + Sync {
    /// Whether the voxel belongs to the transparent render class.
    /// Air is not a block and is never transparent-classed.
    fn is_transparent(&self, id: VoxelId) -> bool;

    /// The texture-atlas tile column for the voxel.
    fn atlas_tile(&self, id: VoxelId) -> u32;
}

/// The built-in block types shipped with the engine.
///
/// The discriminants are the voxel ids the built-ins occupy. `FromPrimitive`
/// allows converting a raw [`VoxelId`] back into the enum.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockKind {
    /// The empty voxel.
    Air = 0,
    /// Grass-topped surface block.
    Grass = 1,
    /// Plain dirt.
    Dirt = 2,
    /// Default solid fill for as-yet-unexplored cells.
    Stone = 3,
    /// Tree trunk.
    Wood = 4,
    /// Transparent foliage.
    Leaves = 5,
    /// Transparent liquid.
    Water = 6,
    /// Fully transparent pane.
    Glass = 7,
}

impl BlockKind {
    /// Converts a raw voxel id into a built-in kind, if it is one.
    pub fn from_id(id: VoxelId) -> Option<Self> {
        num::FromPrimitive::from_u8(id)
    }
}

/// Voxel id of [`BlockKind::Grass`].
pub const GRASS: VoxelId = BlockKind::Grass as VoxelId;
/// Voxel id of [`BlockKind::Dirt`].
pub const DIRT: VoxelId = BlockKind::Dirt as VoxelId;
/// Voxel id of [`BlockKind::Stone`].
pub const STONE: VoxelId = BlockKind::Stone as VoxelId;
/// Voxel id of [`BlockKind::Wood`].
pub const WOOD: VoxelId = BlockKind::Wood as VoxelId;
/// Voxel id of [`BlockKind::Leaves`].
pub const LEAVES: VoxelId = BlockKind::Leaves as VoxelId;
/// Voxel id of [`BlockKind::Water`].
pub const WATER: VoxelId = BlockKind::Water as VoxelId;
/// Voxel id of [`BlockKind::Glass`].
pub const GLASS: VoxelId = BlockKind::Glass as VoxelId;

/// Name -> voxel id for the built-in block types.
static BUILTIN_NAMES: phf::Map<&'static str, VoxelId> = phf::phf_map! {
    "air" => 0u8,
    "grass" => 1u8,
    "dirt" => 2u8,
    "stone" => 3u8,
    "wood" => 4u8,
    "leaves" => 5u8,
    "water" => 6u8,
    "glass" => 7u8,
};

/// `(id, name, transparent, atlas tile)` for every built-in block type.
const BUILTIN_DEFS: [(VoxelId, &str, bool, u32); 7] = [
    (GRASS, "grass", false, 0),
    (DIRT, "dirt", false, 1),
    (STONE, "stone", false, 2),
    (WOOD, "wood", false, 3),
    (LEAVES, "leaves", true, 4),
    (WATER, "water", true, 5),
    (GLASS, "glass", true, 6),
];

/// One block-type definition, deserializable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockDef {
    /// The voxel id this definition occupies.
    pub id: VoxelId,
    /// Human-readable name, unique within the registry.
    pub name: String,
    /// Whether voxels of this type render in the transparent pass.
    #[serde(default)]
    pub transparent: bool,
    /// Texture-atlas tile column for this type.
    #[serde(default)]
    pub atlas_tile: u32,
}

/// Errors raised while extending the block registry.
#[derive(Debug, Error)]
pub enum BlockTableError {
    /// The JSON payload did not parse as a list of [`BlockDef`]s.
    #[error("block definition parse failed: {0}")]
    Json(#[from] serde_json::Error),
    /// A definition tried to claim the air id.
    #[error("voxel id 0 is reserved for air")]
    ReservedId,
}

/// The shipped [`BlockTypeTable`] implementation.
///
/// Starts from the built-in const table and accepts further definitions at
/// runtime, either individually or as a JSON array.
pub struct BlockRegistry {
    defs: HashMap<VoxelId, BlockDef>,
}

impl BlockRegistry {
    /// A registry containing only the built-in block types.
    pub fn with_builtins() -> Self {
        let mut defs = HashMap::new();
        for &(id, name, transparent, atlas_tile) in BUILTIN_DEFS.iter() {
            defs.insert(
                id,
                BlockDef {
                    id,
                    name: name.to_string(),
                    transparent,
                    atlas_tile,
                },
            );
        }
        BlockRegistry { defs }
    }

    /// Registers one definition, replacing any previous entry for its id.
    pub fn register(&mut self, def: BlockDef) -> Result<(), BlockTableError> {
        if def.id == AIR {
            return Err(BlockTableError::ReservedId);
        }
        self.defs.insert(def.id, def);
        Ok(())
    }

    /// Registers every definition in a JSON array, returning how many were
    /// added.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, BlockTableError> {
        let defs: Vec<BlockDef> = serde_json::from_str(json)?;
        let count = defs.len();
        for def in defs {
            self.register(def)?;
        }
        Ok(count)
    }

    /// Looks up a voxel id by block name. Built-ins resolve through a
    /// compile-time map; runtime registrations are scanned.
    pub fn id_by_name(&self, name: &str) -> Option<VoxelId> {
        if let Some(&id) = BUILTIN_NAMES.get(name) {
            return Some(id);
        }
        self.defs
            .values()
            .find(|def| def.name == name)
            .map(|def| def.id)
    }

    /// The definition registered for `id`, if any.
    pub fn def(&self, id: VoxelId) -> Option<&BlockDef> {
        self.defs.get(&id)
    }

    /// Number of registered (non-air) block types.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether no block types are registered.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl BlockTypeTable for BlockRegistry {
    fn is_transparent(&self, id: VoxelId) -> bool {
        self.defs.get(&id).map(|def| def.transparent).unwrap_or(false)
    }

    fn atlas_tile(&self, id: VoxelId) -> u32 {
        self.defs.get(&id).map(|def| def.atlas_tile).unwrap_or(0)
    }
}

impl fmt::Debug for BlockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRegistry")
            .field("types", &self.defs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_by_name_and_id() {
        let registry = BlockRegistry::with_builtins();
        assert_eq!(registry.id_by_name("stone"), Some(STONE));
        assert_eq!(registry.id_by_name("air"), Some(AIR));
        assert_eq!(registry.id_by_name("unobtainium"), None);
        assert_eq!(registry.def(WATER).map(|d| d.name.as_str()), Some("water"));
        assert_eq!(BlockKind::from_id(STONE), Some(BlockKind::Stone));
        assert_eq!(BlockKind::from_id(200), None);
    }

    #[test]
    fn transparency_classes_match_builtins() {
        let registry = BlockRegistry::with_builtins();
        assert!(!registry.is_transparent(STONE));
        assert!(registry.is_transparent(WATER));
        assert!(registry.is_transparent(GLASS));
        // Air and unknown ids are not transparent-classed.
        assert!(!registry.is_transparent(AIR));
        assert!(!registry.is_transparent(250));
        assert_eq!(registry.atlas_tile(250), 0);
    }

    #[test]
    fn json_definitions_extend_the_registry() {
        let mut registry = BlockRegistry::with_builtins();
        let added = registry
            .extend_from_json(
                r#"[
                    {"id": 10, "name": "marble", "atlas_tile": 9},
                    {"id": 11, "name": "ice", "transparent": true, "atlas_tile": 10}
                ]"#,
            )
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(registry.id_by_name("marble"), Some(10));
        assert!(registry.is_transparent(11));
        assert_eq!(registry.atlas_tile(10), 9);
    }

    #[test]
    fn air_id_is_reserved() {
        let mut registry = BlockRegistry::with_builtins();
        let result = registry.extend_from_json(r#"[{"id": 0, "name": "void"}]"#);
        assert!(matches!(result, Err(BlockTableError::ReservedId)));
    }

    #[test]
    fn malformed_json_is_a_typed_error() {
        let mut registry = BlockRegistry::with_builtins();
        assert!(matches!(
            registry.extend_from_json("not json"),
            Err(BlockTableError::Json(_))
        ));
    }
}
