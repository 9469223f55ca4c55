use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashMap;

use carve_chunk::{Axis, DensityCache};
use carve_edit::{Brush, BrushShape, affected_chunks, apply_brush_to_cache};
use carve_geom::Vec3;
use carve_mesh_cpu::{ChunkMeshData, CornerSource, build_chunk_mesh};
use carve_runtime::{BuildJob, JobOut, Runtime};
use carve_world::{ChunkCoord, DensityField, WorldConfig};

use crate::sink::MeshSink;

/// Which worker lane an asynchronous remesh goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lane {
    Edit,
    Bg,
}

/// One chunk's state inside the grid.
///
/// Records live for the lifetime of the grid once created; coordinates
/// never change. `rev` advances on every density mutation, `built_rev`
/// trails it and marks the density state the stored mesh was built from.
pub struct ChunkRecord {
    pub coord: ChunkCoord,
    pub cache: Option<DensityCache>,
    pub mesh: Option<ChunkMeshData>,
    pub visible: bool,
    rev: u64,
    built_rev: u64,
}

impl ChunkRecord {
    fn new(coord: ChunkCoord, cache: Option<DensityCache>) -> Self {
        Self {
            coord,
            cache,
            mesh: None,
            visible: true,
            rev: 1,
            built_rev: 0,
        }
    }

    #[inline]
    pub fn rev(&self) -> u64 {
        self.rev
    }

    #[inline]
    pub fn needs_rebuild(&self) -> bool {
        self.rev > self.built_rev
    }
}

/// The world's chunk arena plus the remesh machinery around it.
///
/// Chunks are stored flat, addressed by linearized coordinates over the
/// configured extent. All grid methods run on the consumer thread; workers
/// only ever see cache snapshots, which is what keeps density mutation and
/// meshing reads from racing.
pub struct TerrainGrid {
    cfg: Arc<WorldConfig>,
    field: Arc<dyn DensityField>,
    records: Vec<Option<ChunkRecord>>,
    runtime: Runtime,
    sink: Box<dyn MeshSink>,
    inflight: HashMap<ChunkCoord, u64>,
    completed: VecDeque<JobOut>,
    next_job_id: u64,
}

impl TerrainGrid {
    pub fn new(cfg: WorldConfig, field: Arc<dyn DensityField>, sink: Box<dyn MeshSink>) -> Self {
        let cfg = Arc::new(cfg);
        let runtime = Runtime::new(cfg.clone(), field.clone());
        let mut records = Vec::new();
        records.resize_with(cfg.chunk_count(), || None);
        Self {
            cfg,
            field,
            records,
            runtime,
            sink,
            inflight: HashMap::new(),
            completed: VecDeque::new(),
            next_job_id: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.cfg
    }

    #[inline]
    fn arena_idx(&self, coord: ChunkCoord) -> Option<usize> {
        if !self.cfg.in_bounds(coord) {
            return None;
        }
        let (x, y, z) = (coord.cx as usize, coord.cy as usize, coord.cz as usize);
        Some(x + y * self.cfg.chunks_x + z * self.cfg.chunks_x * self.cfg.chunks_y)
    }

    /// Existing record, if the chunk has been created.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&ChunkRecord> {
        self.arena_idx(coord)
            .and_then(|i| self.records[i].as_ref())
    }

    /// Returns the chunk's record, creating it on first touch.
    /// Out-of-bounds coordinates yield `None`; callers handle that policy
    /// explicitly, it is never an error.
    pub fn get_or_create(&mut self, coord: ChunkCoord) -> Option<&mut ChunkRecord> {
        let idx = self.arena_idx(coord)?;
        let cache_enabled = self.cfg.cache_densities;
        let samples = self.cfg.samples_per_axis();
        let rec = self.records[idx].get_or_insert_with(|| {
            let cache = cache_enabled.then(|| DensityCache::new(samples));
            ChunkRecord::new(coord, cache)
        });
        Some(rec)
    }

    /// Replaces the chunk's density cache (from a persistence load) and
    /// marks it for rebuild. Returns false when out of bounds.
    pub fn insert_cache(&mut self, coord: ChunkCoord, cache: DensityCache) -> bool {
        let Some(rec) = self.get_or_create(coord) else {
            return false;
        };
        rec.cache = Some(cache);
        rec.rev += 1;
        true
    }

    /// Caches of every created, fully populated chunk, for saving.
    pub fn populated_chunks(&self) -> Vec<(ChunkCoord, &DensityCache)> {
        self.records
            .iter()
            .flatten()
            .filter_map(|r| {
                let cache = r.cache.as_ref()?;
                cache.is_fully_populated().then_some((r.coord, cache))
            })
            .collect()
    }

    /// Meshes the chunk now (synchronously) or hands it to the background
    /// lane. A chunk with an unapplied background job is not resubmitted;
    /// its revision bookkeeping makes the consumer reissue on apply.
    pub fn request_remesh(&mut self, coord: ChunkCoord, background: bool) {
        if background {
            self.submit_remesh(coord, Lane::Bg);
        } else {
            self.remesh_now(coord);
        }
    }

    fn remesh_now(&mut self, coord: ChunkCoord) {
        let Some(idx) = self.arena_idx(coord) else {
            return;
        };
        self.get_or_create(coord);
        let cfg = self.cfg.clone();
        let field = self.field.clone();
        let Some(rec) = self.records[idx].as_mut() else {
            return;
        };
        let mesh = match rec.cache.as_mut() {
            Some(cache) => build_chunk_mesh(
                &cfg,
                coord,
                CornerSource::Cached {
                    cache,
                    field: field.as_ref(),
                },
            ),
            None => build_chunk_mesh(&cfg, coord, CornerSource::Field(field.as_ref())),
        };
        rec.built_rev = rec.rev;
        self.sink.update_mesh(coord, &mesh);
        rec.mesh = Some(mesh);
    }

    fn submit_remesh(&mut self, coord: ChunkCoord, lane: Lane) {
        if self.inflight.contains_key(&coord) {
            // Serialized per chunk: the in-flight job's apply step sees the
            // advanced revision and reissues.
            return;
        }
        let job_id = self.next_job_id;
        let Some(rec) = self.get_or_create(coord) else {
            return;
        };
        let job = BuildJob {
            coord,
            rev: rec.rev,
            job_id,
            cache: rec.cache.clone(),
        };
        self.inflight.insert(coord, job_id);
        self.next_job_id += 1;
        match lane {
            Lane::Edit => self.runtime.submit_build_job_edit(job),
            Lane::Bg => self.runtime.submit_build_job_bg(job),
        }
    }

    /// Consumer pump: applies up to `max_applies` completed background
    /// meshes. Call on the host's update cadence. Returns how many chunks
    /// were applied.
    pub fn update(&mut self, max_applies: usize) -> usize {
        self.completed.extend(self.runtime.drain_worker_results());
        let mut applied = 0;
        while applied < max_applies {
            let Some(out) = self.completed.pop_front() else {
                break;
            };
            if self.apply_job(out) {
                applied += 1;
            }
        }
        applied
    }

    /// Whether any background work is still queued, running, or unapplied.
    pub fn has_pending_work(&self) -> bool {
        !self.inflight.is_empty() || !self.completed.is_empty()
    }

    fn apply_job(&mut self, out: JobOut) -> bool {
        self.inflight.remove(&out.coord);
        let idx = self.arena_idx(out.coord);
        let Some(rec) = idx.and_then(|i| self.records[i].as_mut()) else {
            // Target chunk is gone; stale results are dropped silently.
            log::debug!(
                "dropping mesh for absent chunk ({},{},{})",
                out.coord.cx,
                out.coord.cy,
                out.coord.cz
            );
            return false;
        };
        if rec.rev == out.rev {
            // Adopt the worker's cache: same density state, now fully
            // populated.
            if let Some(cache) = out.cache {
                rec.cache = Some(cache);
            }
        }
        rec.built_rev = out.rev;
        let reissue = rec.rev > out.rev;
        log::debug!(
            "applied chunk ({},{},{}) rev {} occupancy {:?} in {}ms",
            out.coord.cx,
            out.coord.cy,
            out.coord.cz,
            out.rev,
            out.occupancy,
            out.t_mesh_ms
        );
        self.sink.update_mesh(out.coord, &out.mesh);
        rec.mesh = Some(out.mesh);
        if reissue {
            // Densities moved on while the job ran; go again.
            self.submit_remesh(out.coord, Lane::Bg);
        }
        true
    }

    pub fn set_visibility(&mut self, coord: ChunkCoord, visible: bool) {
        let Some(rec) = self.get_or_create(coord) else {
            return;
        };
        rec.visible = visible;
        self.sink.set_visible(coord, visible);
    }

    pub fn set_all_visibility(&mut self, visible: bool) {
        let coords: Vec<ChunkCoord> = self
            .records
            .iter()
            .flatten()
            .map(|r| r.coord)
            .collect();
        for coord in coords {
            self.set_visibility(coord, visible);
        }
    }

    /// Repairs shared boundary densities across the whole grid, then
    /// remeshes every repaired chunk.
    ///
    /// Runs in ascending coordinate order along every axis so a chunk is
    /// repaired only after all lower neighbors already hold final boundary
    /// values; any other order silently leaves seams.
    pub fn fix_seams(&mut self) {
        let coords = self.all_coords_ascending();
        self.fix_seams_for(&coords);
    }

    /// Seam repair restricted to `coords` (sorted ascending internally).
    pub fn fix_seams_for(&mut self, coords: &[ChunkCoord]) {
        let mut coords = coords.to_vec();
        coords.sort_by_key(|c| (c.cz, c.cy, c.cx));
        for coord in coords {
            if self.repair_chunk_seams(coord) {
                self.remesh_now(coord);
            }
        }
    }

    /// Copies each lower neighbor's far density layer onto this chunk's
    /// near layer. Returns whether the chunk exists and was touched.
    fn repair_chunk_seams(&mut self, coord: ChunkCoord) -> bool {
        let Some(idx) = self.arena_idx(coord) else {
            return false;
        };
        if self.records[idx].is_none() {
            return false;
        }
        let mut repaired = false;
        for axis in Axis::ALL {
            let (dx, dy, dz) = axis.lower_offset();
            let neighbor = coord.offset(dx, dy, dz);
            // No neighbor yet: nothing to correct from, retried on a later
            // pass once it exists.
            let layer = match self
                .chunk(neighbor)
                .and_then(|r| r.cache.as_ref())
                .filter(|c| c.is_fully_populated())
            {
                Some(cache) => cache.max_layer(axis),
                None => continue,
            };
            let Some(rec) = self.records[idx].as_mut() else {
                continue;
            };
            let Some(cache) = rec.cache.as_mut() else {
                continue;
            };
            // Skip the overwrite only when it provably changes nothing; an
            // unfilled layer still needs the seeding side effect.
            if cache.is_fully_populated() && cache.min_layer(axis) == layer {
                continue;
            }
            cache.overwrite_min_layer(axis, &layer);
            rec.rev += 1;
            repaired = true;
        }
        repaired
    }

    /// Applies a brush delta to one chunk's cached densities, pulls the
    /// boundary layers back in from already-edited lower neighbors, and
    /// remeshes. Callers editing across a boundary invoke this on every
    /// overlapped chunk (see [`apply_brush`](Self::apply_brush)).
    pub fn edit_density(&mut self, coord: ChunkCoord, brush: &Brush, background: bool) {
        if !self.cfg.cache_densities {
            log::warn!("edit_density ignored: density caching is disabled");
            return;
        }
        let Some(idx) = self.arena_idx(coord) else {
            return;
        };
        self.get_or_create(coord);
        let cfg = self.cfg.clone();
        let field = self.field.clone();
        {
            let Some(rec) = self.records[idx].as_mut() else {
                return;
            };
            let Some(cache) = rec.cache.as_mut() else {
                return;
            };
            // Edits add onto real samples, so fill anything still unseeded.
            cache.populate(field.as_ref(), cfg.chunk_origin(coord), cfg.cell_size);
            if apply_brush_to_cache(cache, &cfg, coord, brush) {
                rec.rev += 1;
            }
        }
        self.repair_chunk_seams(coord);
        if background {
            self.submit_remesh(coord, Lane::Edit);
        } else {
            self.remesh_now(coord);
        }
    }

    /// World-space sculpt: applies the brush to every chunk whose cached
    /// volume it overlaps (ascending coordinate order), then fixes seams
    /// for the touched chunks and their neighbors.
    pub fn apply_brush(
        &mut self,
        center: Vec3,
        radius: f32,
        strength: f32,
        shape: BrushShape,
        invert: bool,
        background: bool,
    ) {
        let mut brush = Brush::new(center, radius, strength, shape);
        if invert {
            brush = brush.inverted();
        }
        let mut touched = affected_chunks(&self.cfg, &brush);
        touched.sort_by_key(|c| (c.cz, c.cy, c.cx));
        for coord in &touched {
            self.edit_density(*coord, &brush, background);
        }
        // Touched chunks plus every in-bounds neighbor.
        let mut repair: Vec<ChunkCoord> = Vec::new();
        for c in &touched {
            for dz in -1..=1 {
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let n = c.offset(dx, dy, dz);
                        if self.cfg.in_bounds(n) && !repair.contains(&n) {
                            repair.push(n);
                        }
                    }
                }
            }
        }
        self.fix_seams_for(&repair);
    }

    /// Debug counters from the runtime lanes.
    pub fn queue_debug_counts(&self) -> (usize, usize, usize, usize) {
        self.runtime.queue_debug_counts()
    }

    fn all_coords_ascending(&self) -> Vec<ChunkCoord> {
        let mut out = Vec::with_capacity(self.cfg.chunk_count());
        for cz in 0..self.cfg.chunks_z as i32 {
            for cy in 0..self.cfg.chunks_y as i32 {
                for cx in 0..self.cfg.chunks_x as i32 {
                    out.push(ChunkCoord::new(cx, cy, cz));
                }
            }
        }
        out
    }
}
