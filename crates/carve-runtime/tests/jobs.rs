use std::sync::Arc;
use std::time::{Duration, Instant};

use carve_mesh_cpu::{CornerSource, build_chunk_mesh};
use carve_runtime::{BuildJob, JobOut, Runtime};
use carve_world::{ChunkCoord, FlatGround, WorldConfig};

fn cfg() -> Arc<WorldConfig> {
    Arc::new(WorldConfig {
        cells_per_axis: 4,
        cell_size: 1.0,
        threshold: 0.0,
        chunks_x: 2,
        chunks_y: 2,
        chunks_z: 2,
        ..WorldConfig::default()
    })
}

fn drain_until(rt: &Runtime, want: usize, timeout: Duration) -> Vec<JobOut> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::new();
    while out.len() < want && Instant::now() < deadline {
        out.extend(rt.drain_worker_results());
        std::thread::sleep(Duration::from_millis(5));
    }
    out
}

#[test]
fn bg_job_matches_synchronous_mesh() {
    let cfg = cfg();
    let field = Arc::new(FlatGround::new(1.0, 2.5));
    let rt = Runtime::new(cfg.clone(), field.clone());
    let coord = ChunkCoord::new(1, 0, 1);
    rt.submit_build_job_bg(BuildJob {
        coord,
        rev: 1,
        job_id: 7,
        cache: None,
    });
    let results = drain_until(&rt, 1, Duration::from_secs(10));
    assert_eq!(results.len(), 1);
    let out = &results[0];
    assert_eq!(out.coord, coord);
    assert_eq!(out.rev, 1);
    assert_eq!(out.job_id, 7);
    assert!(out.cache.is_some(), "caching enabled returns the cache");

    let expected = build_chunk_mesh(&cfg, coord, CornerSource::Field(field.as_ref()));
    assert_eq!(out.mesh, expected);
}

#[test]
fn edit_lane_also_delivers() {
    let cfg = cfg();
    let field = Arc::new(FlatGround::new(1.0, 2.5));
    let rt = Runtime::new(cfg, field);
    rt.submit_build_job_edit(BuildJob {
        coord: ChunkCoord::new(0, 0, 0),
        rev: 3,
        job_id: 1,
        cache: None,
    });
    let results = drain_until(&rt, 1, Duration::from_secs(10));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].rev, 3);
}

#[test]
fn uncached_worlds_return_no_cache() {
    let mut c = (*cfg()).clone();
    c.cache_densities = false;
    let cfg = Arc::new(c);
    let field = Arc::new(FlatGround::new(1.0, 2.5));
    let rt = Runtime::new(cfg, field);
    rt.submit_build_job_bg(BuildJob {
        coord: ChunkCoord::new(0, 0, 0),
        rev: 1,
        job_id: 1,
        cache: None,
    });
    let results = drain_until(&rt, 1, Duration::from_secs(10));
    assert_eq!(results.len(), 1);
    assert!(results[0].cache.is_none());
    assert!(!results[0].mesh.is_empty());
}

#[test]
fn many_jobs_all_complete() {
    let cfg = cfg();
    let field = Arc::new(FlatGround::new(1.0, 2.5));
    let rt = Runtime::new(cfg.clone(), field);
    let mut want = 0;
    for cx in 0..cfg.chunks_x as i32 {
        for cy in 0..cfg.chunks_y as i32 {
            for cz in 0..cfg.chunks_z as i32 {
                rt.submit_build_job_bg(BuildJob {
                    coord: ChunkCoord::new(cx, cy, cz),
                    rev: 1,
                    job_id: want,
                    cache: None,
                });
                want += 1;
            }
        }
    }
    let results = drain_until(&rt, want as usize, Duration::from_secs(30));
    assert_eq!(results.len(), want as usize);
    let (qe, ie, qb, ib) = rt.queue_debug_counts();
    assert_eq!((qe, ie, qb, ib), (0, 0, 0, 0));
}
