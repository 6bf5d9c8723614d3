//! Progressive density sweep on a synthetic template set.
//!
//! Purpose
//! - Show that raising `max_rank` only adds points (earlier sets are prefixes)
//!   and that the count in a fixed window grows roughly linearly with the threshold.
//! - Give a quick, code-backed timing for the traversal at a few thresholds.
//!
//! Usage: `cargo run --release -p wangtiles --example progressive [seed]`

use std::time::Instant;

use wangtiles::prelude::*;

fn main() {
    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1);
    let set = synth_tileset(SynthCfg::default(), seed).expect("synthetic set");
    let window = [0.25, 0.25, 0.75, 0.75];

    let mut previous = (0u64, 0usize);
    for max_rank in [100u64, 1_000, 10_000, 100_000] {
        let start = Instant::now();
        let mut it = set.point_iter(window, max_rank).expect("valid query");
        let mut points: Vec<(Vec2<f64>, u64)> = Vec::new();
        for batch in it.by_ref() {
            points.extend(batch.iter());
        }
        let elapsed_ms = start.elapsed().as_secs_f64() * 1e3;

        let kept = points.iter().filter(|(_, r)| *r <= previous.0).count();
        assert_eq!(kept, previous.1, "lower threshold must be a subset");

        let stats = it.stats();
        println!(
            "max_rank={max_rank} points={} per_rank={:.4} visited={} pruned_rank={} pruned_space={} depth={} time_ms={elapsed_ms:.3}",
            points.len(),
            points.len() as f64 / max_rank as f64,
            stats.instances_visited,
            stats.rank_pruned,
            stats.spatial_pruned,
            stats.max_depth,
        );
        previous = (max_rank, points.len());
    }
}

