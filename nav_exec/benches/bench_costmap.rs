//! # Costmap Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use comms_if::eqpt::grid::GridInfo;
use nalgebra::Vector2;
use nav_lib::{
    loc::Pose2D,
    map::OccupancyGrid,
    nav::{overlaps, CostmapEscapePlanner},
    params::MovementParams,
};

fn costmap_benchmark(c: &mut Criterion) {
    // ---- Build dummy costmap ----

    let mut grid = OccupancyGrid::new(
        GridInfo {
            width: 200,
            height: 200,
            resolution_m: 0.05,
            origin_x_m: 0.0,
            origin_y_m: 0.0,
        },
        0,
    );

    // Scatter some blocks of occupied cells
    for i in 0..10 {
        let x = 0.5 + i as f64 * 0.9;
        let y = 0.5 + ((i * 7) % 10) as f64 * 0.9;
        grid.fill_rect(Vector2::new(x, y), Vector2::new(x + 0.4, y + 0.6), 100);
    }

    let params = MovementParams::default();
    let pose = Pose2D::new(5.0, 5.0, 0.3);

    c.bench_function("overlaps", |b| {
        b.iter(|| overlaps(&pose, &grid, params.costmap_margin_m))
    });

    let planner = CostmapEscapePlanner::new(&params);
    c.bench_function("CostmapEscapePlanner::plan", |b| {
        b.iter(|| planner.plan(&pose, &grid))
    });

    let wide = CostmapEscapePlanner::new(&MovementParams {
        div_x: 9,
        div_y: 9,
        esc_map_x_m: 4.0,
        esc_map_y_m: 4.0,
        ..MovementParams::default()
    });
    c.bench_function("CostmapEscapePlanner::plan::wide", |b| {
        b.iter(|| wide.plan(&pose, &grid))
    });
}

criterion_group!(benches, costmap_benchmark);
criterion_main!(benches);
