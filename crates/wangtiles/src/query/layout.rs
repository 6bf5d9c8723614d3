//! Base layouts: which root instances cover a query box.
//!
//! How the infinite plane is tiled is a property of the dataset, not of the
//! traversal. `SinglePeriod` uses the dataset's base instances as given;
//! `Lattice` repeats them on a rectangular lattice when the caller knows the
//! dataset is periodic with that period.
//!
//! A lattice query enumerates one candidate per cell, so the number of cells and
//! the size of their indices are checked before any root is built.

use nalgebra::Vector2;

use crate::geom::{Box2, EPS};
use crate::tileset::{TemplateSet, TileInstance};

use super::QueryError;

/// Most lattice cells one query may enumerate, summed over base instances.
pub const MAX_LATTICE_ROOTS: usize = 1 << 20;

/// Largest lattice index magnitude; beyond it `i as f64` skips integers.
const MAX_LATTICE_INDEX: f64 = 9_007_199_254_740_992.0;

/// Source of root instances for a query.
pub trait BaseLayout {
    /// Push every root whose subtree may hold points inside `bounds`.
    /// Returning extra roots is allowed (they are pruned); omitting one is not.
    fn roots(
        &self,
        set: &TemplateSet,
        bounds: &Box2,
        out: &mut Vec<TileInstance>,
    ) -> Result<(), QueryError>;
}

/// The dataset's base instances, in dataset order.
#[derive(Clone, Copy, Debug, Default)]
pub struct SinglePeriod;

impl BaseLayout for SinglePeriod {
    fn roots(
        &self,
        set: &TemplateSet,
        _bounds: &Box2,
        out: &mut Vec<TileInstance>,
    ) -> Result<(), QueryError> {
        out.extend(set.base_instances().iter().map(TileInstance::root));
        Ok(())
    }
}

/// Base instances translated by every `(i·period.x, j·period.y)`, `i, j ∈ ℤ`.
#[derive(Clone, Copy, Debug)]
pub struct Lattice {
    period: Vector2<f64>,
}

impl Lattice {
    pub fn new(period: Vector2<f64>) -> Result<Self, QueryError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !(ok(period.x) && ok(period.y)) {
            return Err(QueryError::InvalidPeriod {
                x: period.x,
                y: period.y,
            });
        }
        Ok(Self { period })
    }

    /// Period of the canonical unit square.
    pub fn unit() -> Self {
        Self {
            period: Vector2::new(1.0, 1.0),
        }
    }

    #[inline]
    pub fn period(&self) -> Vector2<f64> {
        self.period
    }
}

/// Inclusive cell index range `[i0, i1] × [j0, j1]`, still in `f64`.
type CellRange = [f64; 4];

impl Lattice {
    /// Cells whose translate of `tile` can reach the box, one cell of slack.
    fn cell_range(&self, bounds: &Box2, tile: &Box2) -> CellRange {
        let p = self.period;
        [
            ((bounds.min.x - tile.max.x) / p.x).floor() - 1.0,
            ((bounds.min.y - tile.max.y) / p.y).floor() - 1.0,
            ((bounds.max.x - tile.min.x) / p.x).ceil() + 1.0,
            ((bounds.max.y - tile.min.y) / p.y).ceil() + 1.0,
        ]
    }
}

impl BaseLayout for Lattice {
    fn roots(
        &self,
        set: &TemplateSet,
        bounds: &Box2,
        out: &mut Vec<TileInstance>,
    ) -> Result<(), QueryError> {
        let p = self.period;
        let ranges: Vec<(TileInstance, CellRange)> = set
            .base_instances()
            .iter()
            .map(|base| {
                let root = TileInstance::root(base);
                (root, self.cell_range(bounds, &root.world_bounds()))
            })
            .collect();

        let cells: f64 = ranges
            .iter()
            .map(|(_, [i0, j0, i1, j1])| (i1 - i0 + 1.0) * (j1 - j0 + 1.0))
            .sum();
        // also rejects NaN and infinite spans
        if !(cells <= MAX_LATTICE_ROOTS as f64) {
            return Err(QueryError::LatticeSpan {
                cells,
                limit: MAX_LATTICE_ROOTS,
            });
        }
        if let Some(&index) = ranges
            .iter()
            .flat_map(|(_, r)| r.iter())
            .find(|v| v.abs() > MAX_LATTICE_INDEX)
        {
            return Err(QueryError::LatticeOffset { index });
        }

        for (root, [i0, j0, i1, j1]) in ranges {
            let tile = root.world_bounds();
            let (i0, j0, i1, j1) = (i0 as i64, j0 as i64, i1 as i64, j1 as i64);
            for j in j0..=j1 {
                for i in i0..=i1 {
                    let d = Vector2::new(i as f64 * p.x, j as f64 * p.y);
                    // slack covers the different rounding of `t + d` below
                    let slack = EPS * (1.0 + tile.width() + d.amax());
                    if !bounds.may_contain_any_of(&tile.translated(d).expanded(slack)) {
                        continue;
                    }
                    let mut inst = root;
                    inst.transform.t += d;
                    out.push(inst);
                }
            }
        }
        Ok(())
    }
}
