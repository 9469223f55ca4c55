//! Density cache persistence.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use carve_chunk::DensityCache;
use carve_world::{ChunkCoord, WorldConfig};
use serde::{Deserialize, Serialize};

/// The scalar parameters a saved world was generated under. A load is only
/// valid against a live config with the same values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveParams {
    pub cells_per_axis: usize,
    pub cell_size: f32,
    pub threshold: f32,
    pub cache_densities: bool,
}

impl SaveParams {
    pub fn of(cfg: &WorldConfig) -> Self {
        Self {
            cells_per_axis: cfg.cells_per_axis,
            cell_size: cfg.cell_size,
            threshold: cfg.threshold,
            cache_densities: cfg.cache_densities,
        }
    }
}

/// One persisted chunk: its coordinates and flattened density samples.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkSave {
    pub coord: ChunkCoord,
    pub densities: Vec<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldSave {
    pub params: SaveParams,
    pub chunks: Vec<ChunkSave>,
}

#[derive(Debug)]
pub enum PersistError {
    /// Saved parameters disagree with the live world configuration.
    ConfigMismatch { field: &'static str },
    /// A chunk record's density array has the wrong length.
    BadChunkLength { coord: ChunkCoord, len: usize },
    /// A chunk record lies outside the live world extent.
    OutOfBounds { coord: ChunkCoord },
    /// Flattening a cache that still has unfilled samples.
    Unpopulated { coord: ChunkCoord },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::ConfigMismatch { field } => {
                write!(f, "saved world parameter `{field}` does not match live config")
            }
            PersistError::BadChunkLength { coord, len } => write!(
                f,
                "chunk ({},{},{}) has {} density samples, wrong for its parameters",
                coord.cx, coord.cy, coord.cz, len
            ),
            PersistError::OutOfBounds { coord } => write!(
                f,
                "chunk ({},{},{}) lies outside the live world extent",
                coord.cx, coord.cy, coord.cz
            ),
            PersistError::Unpopulated { coord } => write!(
                f,
                "chunk ({},{},{}) has unfilled density samples and cannot be flattened",
                coord.cx, coord.cy, coord.cz
            ),
        }
    }
}

impl Error for PersistError {}

/// Copies the cache's samples into a linear array, `i = x + y*S + z*S*S`.
pub fn flatten(cache: &DensityCache, coord: ChunkCoord) -> Result<Vec<f32>, PersistError> {
    if !cache.is_fully_populated() {
        return Err(PersistError::Unpopulated { coord });
    }
    Ok(cache.values().to_vec())
}

/// Exact inverse of [`flatten`].
pub fn unflatten(
    cfg: &WorldConfig,
    save: &ChunkSave,
) -> Result<DensityCache, PersistError> {
    let dim = cfg.samples_per_axis();
    DensityCache::from_values(dim, save.densities.clone()).ok_or(PersistError::BadChunkLength {
        coord: save.coord,
        len: save.densities.len(),
    })
}

fn check_params(live: &WorldConfig, saved: &SaveParams) -> Result<(), PersistError> {
    if saved.cells_per_axis != live.cells_per_axis {
        return Err(PersistError::ConfigMismatch {
            field: "cells_per_axis",
        });
    }
    if saved.cell_size != live.cell_size {
        return Err(PersistError::ConfigMismatch { field: "cell_size" });
    }
    if saved.threshold != live.threshold {
        return Err(PersistError::ConfigMismatch { field: "threshold" });
    }
    if saved.cache_densities != live.cache_densities {
        return Err(PersistError::ConfigMismatch {
            field: "cache_densities",
        });
    }
    Ok(())
}

/// Serializes the populated chunks of a world to a TOML document.
pub fn save_world(
    cfg: &WorldConfig,
    chunks: &[(ChunkCoord, &DensityCache)],
) -> Result<WorldSave, PersistError> {
    let mut out = Vec::with_capacity(chunks.len());
    for (coord, cache) in chunks {
        out.push(ChunkSave {
            coord: *coord,
            densities: flatten(cache, *coord)?,
        });
    }
    Ok(WorldSave {
        params: SaveParams::of(cfg),
        chunks: out,
    })
}

pub fn save_world_to_path(
    path: &Path,
    cfg: &WorldConfig,
    chunks: &[(ChunkCoord, &DensityCache)],
) -> Result<(), Box<dyn Error>> {
    let save = save_world(cfg, chunks)?;
    let txt = toml::to_string(&save)?;
    fs::write(path, txt)?;
    log::info!("saved {} chunks to {}", save.chunks.len(), path.display());
    Ok(())
}

/// Validates a parsed save against the live config and rebuilds every
/// chunk's cache. Fails fast on the first mismatch; nothing partial.
pub fn load_world(
    cfg: &WorldConfig,
    save: &WorldSave,
) -> Result<Vec<(ChunkCoord, DensityCache)>, PersistError> {
    check_params(cfg, &save.params)?;
    let mut out = Vec::with_capacity(save.chunks.len());
    for chunk in &save.chunks {
        if !cfg.in_bounds(chunk.coord) {
            return Err(PersistError::OutOfBounds { coord: chunk.coord });
        }
        out.push((chunk.coord, unflatten(cfg, chunk)?));
    }
    Ok(out)
}

pub fn load_world_from_path(
    path: &Path,
    cfg: &WorldConfig,
) -> Result<Vec<(ChunkCoord, DensityCache)>, Box<dyn Error>> {
    let txt = fs::read_to_string(path)?;
    let save: WorldSave = toml::from_str(&txt)?;
    let chunks = load_world(cfg, &save)?;
    log::info!("loaded {} chunks from {}", chunks.len(), path.display());
    Ok(chunks)
}
