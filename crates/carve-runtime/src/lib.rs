//! Background mesh job queues and worker orchestration.
//!
//! Workers only ever touch the `DensityCache` snapshot carried inside their
//! job, so they can never race the consumer thread's cache mutations; the
//! result channel is the single structure shared between producers and the
//! consumer.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};

use carve_chunk::{ChunkOccupancy, DensityCache};
use carve_mesh_cpu::{ChunkMeshData, CornerSource, build_chunk_mesh};
use carve_world::{ChunkCoord, DensityField, WorldConfig};

/// A requested chunk remesh. Consumed exactly once.
#[derive(Clone, Debug)]
pub struct BuildJob {
    pub coord: ChunkCoord,
    /// Revision of the chunk's density state this job was built from.
    pub rev: u64,
    pub job_id: u64,
    /// Snapshot of the chunk's cache; `None` makes the worker populate a
    /// fresh one (or mesh straight off the field when caching is off).
    pub cache: Option<DensityCache>,
}

/// A completed remesh, handed back to the single consumer.
pub struct JobOut {
    pub coord: ChunkCoord,
    pub rev: u64,
    pub job_id: u64,
    /// The cache the mesh was built from, returned so the consumer can
    /// adopt a freshly populated one. `None` when caching is disabled.
    pub cache: Option<DensityCache>,
    pub occupancy: ChunkOccupancy,
    pub mesh: ChunkMeshData,
    pub t_mesh_ms: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Lane {
    Edit,
    Bg,
}

fn process_build_job(
    job: BuildJob,
    lane: Lane,
    cfg: &WorldConfig,
    field: &dyn DensityField,
    tx: &Sender<JobOut>,
) {
    let BuildJob {
        coord,
        rev,
        job_id,
        cache,
    } = job;

    let t0 = Instant::now();
    let (mesh, cache, occupancy) = if cfg.cache_densities {
        let mut cache = cache.unwrap_or_else(|| DensityCache::new(cfg.samples_per_axis()));
        // Fill unseeded samples up front so the occupancy fast path can
        // skip surfaceless chunks before the cell loop.
        cache.populate(field, cfg.chunk_origin(coord), cfg.cell_size);
        let mesh = build_chunk_mesh(
            cfg,
            coord,
            CornerSource::Cached {
                cache: &mut cache,
                field,
            },
        );
        let occ = cache.occupancy(cfg.threshold);
        (mesh, Some(cache), occ)
    } else {
        let mesh = build_chunk_mesh(cfg, coord, CornerSource::Field(field));
        let occ = if mesh.is_empty() {
            ChunkOccupancy::Empty
        } else {
            ChunkOccupancy::Populated
        };
        (mesh, None, occ)
    };
    let t_mesh_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;

    log::debug!(
        "{:?} lane meshed chunk ({},{},{}) rev {} in {}ms",
        lane,
        coord.cx,
        coord.cy,
        coord.cz,
        rev,
        t_mesh_ms
    );
    let _ = tx.send(JobOut {
        coord,
        rev,
        job_id,
        cache,
        occupancy,
        mesh,
        t_mesh_ms,
    });
}

/// Owns the worker pools and the completion channel.
///
/// Two lanes: `edit` (one worker, kept free for latency-sensitive brush
/// remeshes) and `bg` (remaining parallelism, bulk generation). Exactly one
/// consumer is expected to call [`drain_worker_results`](Self::drain_worker_results)
/// on its own cadence.
pub struct Runtime {
    job_tx_edit: Sender<BuildJob>,
    job_tx_bg: Sender<BuildJob>,
    res_rx: Receiver<JobOut>,
    _edit_pool: Arc<ThreadPool>,
    bg_pool: Option<Arc<ThreadPool>>,
    q_edit: Arc<AtomicUsize>,
    q_bg: Arc<AtomicUsize>,
    inflight_edit: Arc<AtomicUsize>,
    inflight_bg: Arc<AtomicUsize>,
    pub w_edit: usize,
    pub w_bg: usize,
}

impl Runtime {
    pub fn new(cfg: Arc<WorldConfig>, field: Arc<dyn DensityField>) -> Self {
        let (job_tx_edit, job_rx_edit) = unbounded::<BuildJob>();
        let (job_tx_bg, job_rx_bg) = unbounded::<BuildJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();

        let worker_count: usize = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let w_edit = 1usize;
        let w_bg = worker_count.saturating_sub(w_edit);

        let q_edit_ctr = Arc::new(AtomicUsize::new(0));
        let q_bg_ctr = Arc::new(AtomicUsize::new(0));
        let inflight_edit_ctr = Arc::new(AtomicUsize::new(0));
        let inflight_bg_ctr = Arc::new(AtomicUsize::new(0));

        let edit_pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(w_edit)
                .thread_name(|i| format!("carve-edit-{i}"))
                .build()
                .expect("edit pool"),
        );
        for _ in 0..w_edit {
            let rx = job_rx_edit.clone();
            let tx = res_tx.clone();
            let cfg = cfg.clone();
            let field = field.clone();
            let q_edit = q_edit_ctr.clone();
            let inflight_edit = inflight_edit_ctr.clone();
            edit_pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    q_edit.fetch_sub(1, Ordering::Relaxed);
                    inflight_edit.fetch_add(1, Ordering::Relaxed);
                    process_build_job(job, Lane::Edit, cfg.as_ref(), field.as_ref(), &tx);
                    inflight_edit.fetch_sub(1, Ordering::Relaxed);
                }
            });
        }

        let bg_pool = if w_bg > 0 {
            let pool = Arc::new(
                ThreadPoolBuilder::new()
                    .num_threads(w_bg)
                    .thread_name(|i| format!("carve-bg-{i}"))
                    .build()
                    .expect("bg pool"),
            );
            for _ in 0..w_bg {
                let rx = job_rx_bg.clone();
                let tx = res_tx.clone();
                let cfg = cfg.clone();
                let field = field.clone();
                let q_bg = q_bg_ctr.clone();
                let inflight_bg = inflight_bg_ctr.clone();
                pool.spawn(move || {
                    while let Ok(job) = rx.recv() {
                        q_bg.fetch_sub(1, Ordering::Relaxed);
                        inflight_bg.fetch_add(1, Ordering::Relaxed);
                        process_build_job(job, Lane::Bg, cfg.as_ref(), field.as_ref(), &tx);
                        inflight_bg.fetch_sub(1, Ordering::Relaxed);
                    }
                });
            }
            Some(pool)
        } else {
            None
        };

        Self {
            job_tx_edit,
            job_tx_bg,
            res_rx,
            _edit_pool: edit_pool,
            bg_pool,
            q_edit: q_edit_ctr,
            q_bg: q_bg_ctr,
            inflight_edit: inflight_edit_ctr,
            inflight_bg: inflight_bg_ctr,
            w_edit,
            w_bg,
        }
    }

    pub fn submit_build_job_edit(&self, job: BuildJob) {
        self.q_edit.fetch_add(1, Ordering::Relaxed);
        if self.job_tx_edit.send(job).is_err() {
            self.q_edit.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn submit_build_job_bg(&self, job: BuildJob) {
        if self.bg_pool.is_some() {
            self.q_bg.fetch_add(1, Ordering::Relaxed);
            if self.job_tx_bg.send(job).is_err() {
                self.q_bg.fetch_sub(1, Ordering::Relaxed);
            }
        } else {
            self.submit_build_job_edit(job);
        }
    }

    /// Non-blocking drain of every completed job. Single-consumer.
    pub fn drain_worker_results(&self) -> Vec<JobOut> {
        self.res_rx.try_iter().collect()
    }

    /// `(queued_edit, inflight_edit, queued_bg, inflight_bg)`.
    pub fn queue_debug_counts(&self) -> (usize, usize, usize, usize) {
        (
            self.q_edit.load(Ordering::Relaxed),
            self.inflight_edit.load(Ordering::Relaxed),
            self.q_bg.load(Ordering::Relaxed),
            self.inflight_bg.load(Ordering::Relaxed),
        )
    }
}
