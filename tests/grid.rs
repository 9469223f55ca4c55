use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use carve::{
    Axis, Brush, BrushShape, ChunkCoord, ChunkMeshData, ConstantField, CornerSource, FlatGround,
    MeshSink, NullSink, TerrainGrid, Vec3, WorldConfig, build_chunk_mesh, load_world,
    populate_density_cache, save_world,
};

fn cfg() -> WorldConfig {
    WorldConfig {
        cells_per_axis: 4,
        cell_size: 1.0,
        threshold: 0.0,
        chunks_x: 2,
        chunks_y: 2,
        chunks_z: 2,
        ..WorldConfig::default()
    }
}

fn all_coords(cfg: &WorldConfig) -> Vec<ChunkCoord> {
    let mut out = Vec::new();
    for cz in 0..cfg.chunks_z as i32 {
        for cy in 0..cfg.chunks_y as i32 {
            for cx in 0..cfg.chunks_x as i32 {
                out.push(ChunkCoord::new(cx, cy, cz));
            }
        }
    }
    out
}

// Ground surface at y = 2, inside the bottom chunk layer.
fn ground_grid() -> TerrainGrid {
    TerrainGrid::new(
        cfg(),
        Arc::new(FlatGround::new(1.0, 2.0)),
        Box::new(NullSink),
    )
}

fn pump(grid: &mut TerrainGrid, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while grid.has_pending_work() && Instant::now() < deadline {
        if grid.update(64) == 0 {
            std::thread::sleep(Duration::from_millis(2));
        }
    }
    assert!(!grid.has_pending_work(), "background meshing timed out");
}

fn mesh_of(grid: &TerrainGrid, coord: ChunkCoord) -> ChunkMeshData {
    grid.chunk(coord)
        .and_then(|r| r.mesh.clone())
        .expect("chunk has a mesh")
}

#[test]
fn sync_remesh_stores_a_surface_mesh() {
    let mut grid = ground_grid();
    let c = ChunkCoord::new(0, 0, 0);
    grid.request_remesh(c, false);
    let mesh = mesh_of(&grid, c);
    assert!(!mesh.is_empty());
    // The top chunk layer is entirely above the surface.
    let top = ChunkCoord::new(0, 1, 0);
    grid.request_remesh(top, false);
    assert!(mesh_of(&grid, top).is_empty());
}

#[test]
fn out_of_bounds_chunks_are_refused() {
    let mut grid = ground_grid();
    assert!(grid.get_or_create(ChunkCoord::new(-1, 0, 0)).is_none());
    grid.request_remesh(ChunkCoord::new(5, 0, 0), false);
    assert!(grid.chunk(ChunkCoord::new(5, 0, 0)).is_none());
}

#[test]
fn background_build_matches_synchronous() {
    let cfg = cfg();
    let field = Arc::new(FlatGround::new(1.0, 2.0));
    let mut grid = TerrainGrid::new(cfg.clone(), field.clone(), Box::new(NullSink));
    for c in all_coords(&cfg) {
        grid.request_remesh(c, true);
    }
    pump(&mut grid, Duration::from_secs(30));
    for c in all_coords(&cfg) {
        let expected = build_chunk_mesh(&cfg, c, CornerSource::Field(field.as_ref()));
        assert_eq!(mesh_of(&grid, c), expected, "chunk ({},{},{})", c.cx, c.cy, c.cz);
    }
}

#[test]
fn zero_strength_edit_changes_nothing() {
    let mut grid = ground_grid();
    let c = ChunkCoord::new(0, 0, 0);
    grid.request_remesh(c, false);
    let before = mesh_of(&grid, c);
    let brush = Brush::new(Vec3::splat(2.0), 3.0, 0.0, BrushShape::Sphere);
    grid.edit_density(c, &brush, false);
    assert_eq!(mesh_of(&grid, c), before);
}

#[test]
fn fix_seams_copies_lower_boundary_into_upper() {
    let mut grid = ground_grid();
    for c in all_coords(grid.config()) {
        grid.request_remesh(c, false);
    }
    let lower = ChunkCoord::new(0, 0, 0);
    let upper = ChunkCoord::new(1, 0, 0);
    // Raise ground near the shared x face, in the lower chunk only.
    let brush = Brush::new(Vec3::new(4.0, 2.0, 2.0), 1.5, 1.0, BrushShape::Sphere);
    grid.edit_density(lower, &brush, false);

    let max_x = |grid: &TerrainGrid, c: ChunkCoord| {
        grid.chunk(c).unwrap().cache.as_ref().unwrap().max_layer(Axis::X)
    };
    let min_x = |grid: &TerrainGrid, c: ChunkCoord| {
        grid.chunk(c).unwrap().cache.as_ref().unwrap().min_layer(Axis::X)
    };
    let want = max_x(&grid, lower);
    assert_ne!(want, min_x(&grid, upper));
    grid.fix_seams();
    assert_eq!(want, min_x(&grid, upper));
}

#[test]
fn apply_brush_keeps_boundary_caches_bit_identical() {
    let mut grid = ground_grid();
    for c in all_coords(grid.config()) {
        grid.request_remesh(c, false);
    }
    // Carve a sphere centered on the corner shared by all eight chunks.
    grid.apply_brush(
        Vec3::splat(4.0),
        2.0,
        1.0,
        BrushShape::Sphere,
        true,
        false,
    );
    for axis in Axis::ALL {
        let lower = ChunkCoord::new(0, 0, 0);
        let (dx, dy, dz) = axis.lower_offset();
        let upper = lower.offset(-dx, -dy, -dz);
        let a = grid.chunk(lower).unwrap().cache.as_ref().unwrap().max_layer(axis);
        let b = grid.chunk(upper).unwrap().cache.as_ref().unwrap().min_layer(axis);
        assert_eq!(a, b, "axis {axis:?}");
    }
}

#[test]
fn loaded_cache_marks_chunk_for_rebuild() {
    let cfg = cfg();
    let mut grid = ground_grid();
    let c = ChunkCoord::new(0, 0, 0);
    // A uniform solid has no surface regardless of the grid's own field.
    grid.insert_cache(c, populate_density_cache(&cfg, c, &ConstantField(1.0)));
    assert!(grid.chunk(c).unwrap().needs_rebuild());
    grid.request_remesh(c, false);
    assert!(!grid.chunk(c).unwrap().needs_rebuild());
    assert!(mesh_of(&grid, c).is_empty());
}

#[test]
fn saved_world_reloads_into_identical_meshes() {
    let cfg = cfg();
    let mut grid = ground_grid();
    for c in all_coords(&cfg) {
        grid.request_remesh(c, false);
    }
    grid.apply_brush(
        Vec3::new(3.0, 2.0, 3.0),
        2.0,
        0.5,
        BrushShape::Sphere,
        false,
        false,
    );
    let save = save_world(&cfg, &grid.populated_chunks()).unwrap();

    let mut reloaded = ground_grid();
    for (coord, cache) in load_world(&cfg, &save).unwrap() {
        assert!(reloaded.insert_cache(coord, cache));
    }
    for c in all_coords(&cfg) {
        reloaded.request_remesh(c, false);
        assert_eq!(mesh_of(&reloaded, c), mesh_of(&grid, c));
    }
}

struct RecordingSink {
    meshes: Arc<Mutex<Vec<ChunkCoord>>>,
    vis: Arc<Mutex<Vec<(ChunkCoord, bool)>>>,
}

impl MeshSink for RecordingSink {
    fn update_mesh(&mut self, coord: ChunkCoord, _mesh: &ChunkMeshData) {
        self.meshes.lock().unwrap().push(coord);
    }
    fn set_visible(&mut self, coord: ChunkCoord, visible: bool) {
        self.vis.lock().unwrap().push((coord, visible));
    }
}

#[test]
fn sink_sees_mesh_and_visibility_events() {
    let meshes = Arc::new(Mutex::new(Vec::new()));
    let vis = Arc::new(Mutex::new(Vec::new()));
    let sink = RecordingSink {
        meshes: meshes.clone(),
        vis: vis.clone(),
    };
    let mut grid = TerrainGrid::new(cfg(), Arc::new(FlatGround::new(1.0, 2.0)), Box::new(sink));
    let c = ChunkCoord::new(0, 0, 0);
    grid.request_remesh(c, false);
    grid.set_visibility(c, false);
    assert_eq!(*meshes.lock().unwrap(), vec![c]);
    assert_eq!(*vis.lock().unwrap(), vec![(c, false)]);
}
