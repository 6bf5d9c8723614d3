//! Seeded synthetic template sets.
//!
//! Purpose
//! - Reproducible fixtures with the shape of a real tile hierarchy: every
//!   template subdivides into an `s × s` grid of random templates, points sit on
//!   a jittered grid, and ranks grow by `s²` per level.
//! - Feeds property tests, benches, and the CLI `--synthetic` mode. These sets
//!   obey the data model but not Wang edge rules, and are not blue noise.
//!
//! Ranks
//! - Each template's `m` points take the ranks `lo..lo + m` in shuffled order
//!   with `lo = 1 + max(1, ceil((m - 1) / (s² - 1)))`. Then
//!   `1 + (lo - 1) · s² >= lo + m - 1`, so children never undercut their
//!   parent, and `lo >= 2` keeps rank 1 off the template cycles.

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::geom::{Box2, Symmetry};
use crate::tileset::{
    BaseInstance, ChildSlot, EdgeColors, LocalPoint, Result, TemplateId, TemplateSet,
    TemplateSpec,
};

/// Synthetic set configuration.
#[derive(Clone, Copy, Debug)]
pub struct SynthCfg {
    /// Number of templates (at least 1).
    pub templates: usize,
    /// Grid side of each subdivision (at least 2).
    pub subdivision: usize,
    /// Points per template.
    pub points_per_tile: usize,
    /// Draw a random square symmetry per child slot.
    pub symmetries: bool,
}

impl Default for SynthCfg {
    fn default() -> Self {
        Self {
            templates: 4,
            subdivision: 2,
            points_per_tile: 12,
            symmetries: true,
        }
    }
}

/// Deterministic for a given `(cfg, seed)`.
pub fn synth_tileset(cfg: SynthCfg, seed: u64) -> Result<TemplateSet> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = cfg.templates.max(1);
    let s = cfg.subdivision.max(2);
    let m = cfg.points_per_tile;
    let rank_scale = (s * s) as u64;
    let lo = (m.saturating_sub(1) as u64)
        .div_ceil(rank_scale - 1)
        .max(1)
        + 1;

    let specs: Vec<TemplateSpec> = (0..n)
        .map(|id| {
            let points = jittered_points(&mut rng, m, lo);
            let children = grid_slots(&mut rng, n, s, rank_scale, cfg.symmetries);
            TemplateSpec {
                id,
                edge_colors: EdgeColors {
                    north: rng.gen_range(0..2),
                    east: rng.gen_range(0..2),
                    south: rng.gen_range(0..2),
                    west: rng.gen_range(0..2),
                },
                points,
                children,
            }
        })
        .collect();
    TemplateSet::new(specs, vec![BaseInstance::unit(TemplateId(0))])
}

fn jittered_points(rng: &mut StdRng, m: usize, lo: u64) -> Vec<LocalPoint> {
    let g = (m as f64).sqrt().ceil().max(1.0) as usize;
    let below_one = 1.0 - f64::EPSILON;
    let mut cells: Vec<usize> = (0..g * g).collect();
    cells.shuffle(rng);
    let mut ranks: Vec<u64> = (lo..lo + m as u64).collect();
    ranks.shuffle(rng);
    cells
        .into_iter()
        .zip(ranks)
        .map(|(cell, rank)| {
            let (ix, iy) = (cell % g, cell / g);
            let x = ((ix as f64 + rng.gen::<f64>()) / g as f64).min(below_one);
            let y = ((iy as f64 + rng.gen::<f64>()) / g as f64).min(below_one);
            LocalPoint {
                pos: Vector2::new(x, y),
                rank,
            }
        })
        .collect()
}

fn grid_slots(
    rng: &mut StdRng,
    n: usize,
    s: usize,
    rank_scale: u64,
    symmetries: bool,
) -> Vec<ChildSlot> {
    let side = 1.0 / s as f64;
    let mut out = Vec::with_capacity(s * s);
    for iy in 0..s {
        for ix in 0..s {
            let min = Vector2::new(ix as f64 * side, iy as f64 * side);
            let symmetry = if symmetries {
                Symmetry::from_index(rng.gen_range(0..8))
            } else {
                Symmetry::Identity
            };
            out.push(ChildSlot {
                template: TemplateId(rng.gen_range(0..n)),
                rect: Box2::new(min, min + Vector2::new(side, side)),
                symmetry,
                rank_scale,
            });
        }
    }
    out
}
