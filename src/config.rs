//! # Configuration
//!
//! World and atlas configuration, deserializable from JSON. Everything has
//! a default so embedding code can start from `WorldConfig::default()` and
//! override selectively.

use serde::Deserialize;
use thiserror::Error;

use crate::engine_state::voxels::chunk::ChunkFill;

/// Pixel geometry of the texture atlas the mesher computes UVs against.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AtlasLayout {
    /// Edge length of one tile in pixels.
    pub tile_size: u32,
    /// Atlas width in pixels.
    pub width: u32,
    /// Atlas height in pixels.
    pub height: u32,
}

impl Default for AtlasLayout {
    fn default() -> Self {
        AtlasLayout {
            tile_size: 16,
            width: 256,
            height: 64,
        }
    }
}

impl AtlasLayout {
    /// Number of tile columns in the atlas.
    pub fn columns(&self) -> u32 {
        self.width / self.tile_size
    }

    /// Number of tile rows in the atlas.
    pub fn rows(&self) -> u32 {
        self.height / self.tile_size
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk edge length in voxels. A power of two keeps the modulo cheap,
    /// but any positive value is accepted.
    pub cell_size: i32,
    /// World-space edge length of one voxel.
    pub block_size: f32,
    /// Fill strategy for cells created by `ensure_generated`.
    pub chunk_fill: ChunkFill,
    /// Number of parallel meshing workers.
    pub mesh_workers: usize,
    /// Texture atlas geometry.
    pub atlas: AtlasLayout,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            cell_size: 16,
            block_size: 16.0,
            chunk_fill: ChunkFill::default(),
            mesh_workers: 4,
            atlas: AtlasLayout::default(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The chunk edge length must be positive.
    #[error("cell size must be positive, got {0}")]
    InvalidCellSize(i32),
    /// At least one meshing worker is required.
    #[error("mesh worker count must be nonzero")]
    NoWorkers,
    /// The atlas tile size must divide the atlas dimensions.
    #[error("atlas tile size {tile_size} does not fit atlas {width}x{height}")]
    InvalidAtlas {
        /// Offending tile size.
        tile_size: u32,
        /// Atlas width in pixels.
        width: u32,
        /// Atlas height in pixels.
        height: u32,
    },
    /// The JSON payload did not parse.
    #[error("config parse failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorldConfig {
    /// Parses and validates a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_size <= 0 {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        if self.mesh_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        let atlas = &self.atlas;
        if atlas.tile_size == 0
            || atlas.width % atlas.tile_size != 0
            || atlas.height % atlas.tile_size != 0
        {
            return Err(ConfigError::InvalidAtlas {
                tile_size: atlas.tile_size,
                width: atlas.width,
                height: atlas.height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::STONE;

    #[test]
    fn defaults_validate() {
        let config = WorldConfig::default();
        assert_eq!(config.cell_size, 16);
        assert_eq!(config.chunk_fill, ChunkFill::Solid { voxel: STONE });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_selectively() {
        let config = WorldConfig::from_json_str(
            r#"{
                "cell_size": 4,
                "chunk_fill": {"kind": "noise", "seed": 42},
                "atlas": {"tile_size": 8, "width": 64, "height": 32}
            }"#,
        )
        .unwrap();
        assert_eq!(config.cell_size, 4);
        assert_eq!(config.chunk_fill, ChunkFill::Noise { seed: 42 });
        assert_eq!(config.atlas.columns(), 8);
        assert_eq!(config.block_size, 16.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            WorldConfig::from_json_str(r#"{"cell_size": 0}"#),
            Err(ConfigError::InvalidCellSize(0))
        ));
        assert!(matches!(
            WorldConfig::from_json_str(r#"{"mesh_workers": 0}"#),
            Err(ConfigError::NoWorkers)
        ));
        assert!(matches!(
            WorldConfig::from_json_str(r#"{"atlas": {"tile_size": 10, "width": 64, "height": 32}}"#),
            Err(ConfigError::InvalidAtlas { .. })
        ));
        assert!(matches!(
            WorldConfig::from_json_str("nope"),
            Err(ConfigError::Json(_))
        ));
    }
}
