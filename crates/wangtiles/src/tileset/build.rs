//! Validation of raw templates and precomputation of rank floors.

use tracing::debug;

use crate::geom::EPS;

use super::types::{
    scaled_rank, BaseInstance, DatasetFormatError, LoadCfg, Result, TemplateSet, TemplateSpec,
    TileTemplate,
};

impl TemplateSet {
    /// Validate `specs` and `base_instances` and build the immutable set.
    ///
    /// `specs[i].id` must equal `i`. Rank floors are derived here; callers never
    /// supply them.
    pub fn new(specs: Vec<TemplateSpec>, base_instances: Vec<BaseInstance>) -> Result<Self> {
        Self::with_cfg(specs, base_instances, LoadCfg::default())
    }

    pub fn with_cfg(
        specs: Vec<TemplateSpec>,
        base_instances: Vec<BaseInstance>,
        cfg: LoadCfg,
    ) -> Result<Self> {
        if specs.is_empty() {
            return Err(DatasetFormatError::Empty { what: "templates" });
        }
        if base_instances.is_empty() {
            return Err(DatasetFormatError::Empty {
                what: "base instances",
            });
        }
        for (i, spec) in specs.iter().enumerate() {
            validate_template(i, spec, specs.len())?;
        }
        for (i, base) in base_instances.iter().enumerate() {
            validate_base(i, base, specs.len())?;
        }
        check_rank_growth(&specs)?;

        let floors = rank_floors(&specs);
        let templates: Vec<TileTemplate> = specs
            .into_iter()
            .zip(floors)
            .map(|(spec, floor)| {
                let min_own_rank = spec.points.iter().map(|p| p.rank).min().unwrap_or(u64::MAX);
                let max_own_rank = spec.points.iter().map(|p| p.rank).max().unwrap_or(0);
                TileTemplate {
                    id: super::TemplateId(spec.id),
                    edge_colors: spec.edge_colors,
                    own_points: spec.points,
                    children: spec.children,
                    level_rank_floor: floor,
                    min_own_rank,
                    max_own_rank,
                }
            })
            .collect();
        check_cycles_outgrow_rank_one(&templates)?;

        if cfg.verify_rank_order {
            for t in &templates {
                if !t.is_terminal() && t.level_rank_floor < t.max_own_rank {
                    return Err(DatasetFormatError::RankOrderViolation {
                        template: t.id.0,
                        max_own: t.max_own_rank,
                        floor: t.level_rank_floor,
                    });
                }
            }
        }

        debug!(
            templates = templates.len(),
            base_instances = base_instances.len(),
            points = templates.iter().map(|t| t.own_points.len()).sum::<usize>(),
            min_floor = templates.iter().map(|t| t.level_rank_floor).min(),
            "template set built"
        );
        Ok(Self {
            templates,
            base_instances,
        })
    }
}

fn validate_template(index: usize, spec: &TemplateSpec, n: usize) -> Result<()> {
    if spec.id != index {
        return Err(DatasetFormatError::TemplateIdMismatch {
            index,
            found: spec.id,
        });
    }
    for (k, p) in spec.points.iter().enumerate() {
        let inside = p.pos.x.is_finite()
            && p.pos.y.is_finite()
            && (0.0..1.0).contains(&p.pos.x)
            && (0.0..1.0).contains(&p.pos.y);
        if !inside {
            return Err(DatasetFormatError::PointOutOfTile {
                template: index,
                index: k,
                x: p.pos.x,
                y: p.pos.y,
            });
        }
        if p.rank == 0 {
            return Err(DatasetFormatError::ZeroRank {
                template: index,
                index: k,
            });
        }
    }
    for (slot, c) in spec.children.iter().enumerate() {
        if c.template.0 >= n {
            return Err(DatasetFormatError::DanglingTemplate {
                target: c.template.0,
                referrer: format!("child slot {slot} of template {index}"),
            });
        }
        if c.rank_scale == 0 {
            return Err(DatasetFormatError::ZeroRankScale {
                template: index,
                slot,
            });
        }
        let bad = |reason| DatasetFormatError::BadChildRect {
            template: index,
            slot,
            reason,
        };
        let r = &c.rect;
        if !r.is_finite() {
            return Err(bad("rectangle is not finite"));
        }
        let w = r.width();
        if w <= EPS || r.height() <= EPS {
            return Err(bad("rectangle has no area"));
        }
        if (w - r.height()).abs() > EPS {
            return Err(bad("rectangle is not square"));
        }
        if w >= 1.0 - EPS {
            return Err(bad("rectangle is not strictly smaller than its parent"));
        }
        if !crate::geom::Box2::unit().encloses_eps(r, EPS) {
            return Err(bad("rectangle leaves the parent's unit square"));
        }
    }
    Ok(())
}

fn validate_base(index: usize, base: &BaseInstance, n: usize) -> Result<()> {
    if base.template.0 >= n {
        return Err(DatasetFormatError::DanglingTemplate {
            target: base.template.0,
            referrer: format!("base instance {index}"),
        });
    }
    if !base.transform.is_valid() {
        return Err(DatasetFormatError::BadBaseInstance {
            index,
            reason: "transform needs a positive finite scale and finite offset",
        });
    }
    if base.rank_scale == 0 {
        return Err(DatasetFormatError::BadBaseInstance {
            index,
            reason: "rank_scale must be at least 1",
        });
    }
    Ok(())
}

/// Reject cycles made only of `rank_scale == 1` slots: ranks would never grow
/// along them, so rank pruning could not bound the descent.
fn check_rank_growth(specs: &[TemplateSpec]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Open,
        Done,
    }
    let mut mark = vec![Mark::New; specs.len()];
    for start in 0..specs.len() {
        if mark[start] != Mark::New {
            continue;
        }
        // (template, next child index)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        mark[start] = Mark::Open;
        while let Some(top) = stack.last_mut() {
            let (t, k) = *top;
            let children = &specs[t].children;
            if k == children.len() {
                mark[t] = Mark::Done;
                stack.pop();
                continue;
            }
            top.1 += 1;
            let c = &children[k];
            if c.rank_scale != 1 {
                continue;
            }
            let u = c.template.0;
            match mark[u] {
                Mark::Open => return Err(DatasetFormatError::UnboundedRecursion { template: u }),
                Mark::New => {
                    mark[u] = Mark::Open;
                    stack.push((u, 0));
                }
                Mark::Done => {}
            }
        }
    }
    Ok(())
}

/// Fixed-point relaxation of
/// `floor(T) = min_c scaled_rank(min(min_own(c), floor(c)), scale_c)`.
///
/// `scaled_rank` never lowers a rank, so improving paths are simple and the loop
/// settles within `n + 1` rounds (Bellman-Ford argument).
fn rank_floors(specs: &[TemplateSpec]) -> Vec<u64> {
    let min_own: Vec<u64> = specs
        .iter()
        .map(|s| s.points.iter().map(|p| p.rank).min().unwrap_or(u64::MAX))
        .collect();
    let mut floor = vec![u64::MAX; specs.len()];
    for _ in 0..=specs.len() {
        let mut changed = false;
        for (i, spec) in specs.iter().enumerate() {
            let best = spec
                .children
                .iter()
                .map(|c| {
                    let j = c.template.0;
                    let reach = min_own[j].min(floor[j]);
                    scaled_rank(reach, c.rank_scale).unwrap_or(u64::MAX)
                })
                .min()
                .unwrap_or(u64::MAX);
            if best < floor[i] {
                floor[i] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    floor
}

/// Reject templates that repeat below themselves while reaching a rank-1 point.
///
/// `scaled_rank(1, _) == 1`, so every repetition would carry another rank-1
/// point and no threshold would bound the descent.
fn check_cycles_outgrow_rank_one(templates: &[TileTemplate]) -> Result<()> {
    let n = templates.len();
    let mut seen = vec![false; n];
    let mut stack = Vec::new();
    for (t, template) in templates.iter().enumerate() {
        if template.min_reach() > 1 {
            continue;
        }
        seen.iter_mut().for_each(|s| *s = false);
        stack.clear();
        stack.extend(template.children.iter().map(|c| c.template.0));
        while let Some(u) = stack.pop() {
            if u == t {
                return Err(DatasetFormatError::UnboundedRecursion { template: t });
            }
            if !std::mem::replace(&mut seen[u], true) {
                stack.extend(templates[u].children.iter().map(|c| c.template.0));
            }
        }
    }
    Ok(())
}
