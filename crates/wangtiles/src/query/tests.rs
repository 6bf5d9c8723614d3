use super::*;
use crate::geom::{Box2, Symmetry};
use crate::synth::{synth_tileset, SynthCfg};
use crate::tileset::{
    BaseInstance, ChildSlot, EdgeColors, LocalPoint, TemplateId, TemplateSet, TemplateSpec,
    TileInstance,
};
use nalgebra::{vector, Vector2};
use proptest::prelude::*;

type Key = (u64, u64, u64);

fn key(p: Vector2<f64>, rank: u64) -> Key {
    (rank, p.x.to_bits(), p.y.to_bits())
}

fn sorted_keys(points: impl IntoIterator<Item = (Vector2<f64>, u64)>) -> Vec<Key> {
    let mut out: Vec<Key> = points.into_iter().map(|(p, r)| key(p, r)).collect();
    out.sort_unstable();
    out
}

fn query(set: &TemplateSet, bounds: [f64; 4], max_rank: u64) -> Vec<Key> {
    sorted_keys(collect_points(set.point_iter(bounds, max_rank).unwrap()))
}

/// Four corner points, ranks 1..=4, no children.
fn corner_set() -> TemplateSet {
    let spec = TemplateSpec {
        id: 0,
        edge_colors: EdgeColors::default(),
        points: vec![
            LocalPoint::new(0.1, 0.1, 1),
            LocalPoint::new(0.9, 0.1, 2),
            LocalPoint::new(0.1, 0.9, 3),
            LocalPoint::new(0.9, 0.9, 4),
        ],
        children: vec![],
    };
    TemplateSet::new(vec![spec], vec![BaseInstance::unit(TemplateId(0))]).unwrap()
}

fn synth(seed: u64) -> TemplateSet {
    synth_tileset(
        SynthCfg {
            templates: 3,
            subdivision: 2,
            points_per_tile: 12,
            symmetries: true,
        },
        seed,
    )
    .unwrap()
}

/// Exhaustive walk without floors or spatial pruning. Synthetic local ranks are
/// >= 2, so every world rank below an instance is at least `1 + rank_scale`.
fn oracle(set: &TemplateSet, bounds: [f64; 4], max_rank: u64) -> Vec<Key> {
    let b = Box2::from_bounds(bounds);
    let mut out = Vec::new();
    let mut stack: Vec<TileInstance> = set.base_instances().iter().map(TileInstance::root).collect();
    while let Some(inst) = stack.pop() {
        if inst.rank_scale >= max_rank {
            continue;
        }
        let t = set.template(inst.template);
        for p in &t.own_points {
            let rank = 1 + (p.rank - 1) * inst.rank_scale;
            let pos = inst.transform.apply(p.pos);
            if rank <= max_rank && b.contains(pos) {
                out.push(key(pos, rank));
            }
        }
        stack.extend(t.children.iter().filter_map(|c| inst.child(c)));
    }
    out.sort_unstable();
    out
}

#[test]
fn corner_scenario_rank_two() {
    let set = corner_set();
    let got = query(&set, [0.0, 0.0, 1.0, 1.0], 2);
    let want = sorted_keys([(vector![0.1, 0.1], 1), (vector![0.9, 0.1], 2)]);
    assert_eq!(got, want);
}

#[test]
fn corner_scenario_box_without_points() {
    let set = corner_set();
    let mut it = set.point_iter([0.5, 0.5, 0.6, 0.6], 1000).unwrap();
    assert!(it.next().is_none());
    assert!(it.next().is_none());
}

#[test]
fn zero_rank_yields_no_batches() {
    for set in [corner_set(), synth(5)] {
        let it = set.point_iter([-10.0, -10.0, 10.0, 10.0], 0).unwrap();
        assert_eq!(it.count(), 0);
    }
}

#[test]
fn degenerate_box_is_empty_not_an_error() {
    let set = corner_set();
    assert_eq!(set.point_iter([0.1, 0.0, 0.1, 1.0], 10).unwrap().count(), 0);
}

#[test]
fn malformed_queries_fail_before_traversal() {
    let set = corner_set();
    assert!(matches!(
        set.point_iter([1.0, 0.0, 0.0, 1.0], 3).unwrap_err(),
        QueryError::InvertedBounds { axis: 'x', .. }
    ));
    assert!(matches!(
        set.point_iter([0.0, 0.7, 1.0, 0.2], 3).unwrap_err(),
        QueryError::InvertedBounds { axis: 'y', .. }
    ));
    assert!(matches!(
        set.point_iter([0.0, f64::NAN, 1.0, 1.0], 3).unwrap_err(),
        QueryError::NonFiniteBounds { .. }
    ));
    assert!(set.point_iter([0.0, 0.0, f64::INFINITY, 1.0], 3).is_err());
    assert_eq!(max_rank_from_signed(-1), Err(QueryError::NegativeRank(-1)));
    assert_eq!(max_rank_from_signed(17), Ok(17));
}

#[test]
fn scale_and_symmetry_carry_into_children() {
    // root point rank 1; child in the lower-left quadrant rotated a quarter turn,
    // its point ranked 2 locally and 1 + 1 * 4 in the world
    let root = TemplateSpec {
        id: 0,
        edge_colors: EdgeColors::default(),
        points: vec![LocalPoint::new(0.7, 0.7, 1)],
        children: vec![ChildSlot {
            template: TemplateId(1),
            rect: Box2::new(vector![0.0, 0.0], vector![0.5, 0.5]),
            symmetry: Symmetry::Rot90,
            rank_scale: 4,
        }],
    };
    let leaf = TemplateSpec {
        id: 1,
        edge_colors: EdgeColors::default(),
        points: vec![LocalPoint::new(0.1, 0.2, 2)],
        children: vec![],
    };
    let set = TemplateSet::new(vec![root, leaf], vec![BaseInstance::unit(TemplateId(0))]).unwrap();
    assert_eq!(set.template(TemplateId(0)).level_rank_floor, 5);

    let only_root = collect_points(set.point_iter([0.0, 0.0, 1.0, 1.0], 4).unwrap());
    assert_eq!(only_root.len(), 1);
    assert_eq!(only_root[0].1, 1);

    let mut it = set.point_iter([0.0, 0.0, 1.0, 1.0], 5).unwrap();
    let batch = it.next().unwrap();
    assert!(it.next().is_none());
    assert_eq!(batch.len(), 2);
    let (pos, rank) = batch.iter().find(|(_, r)| *r == 5).unwrap();
    assert_eq!(rank, 5);
    assert!((pos - vector![0.4, 0.05]).norm() < 1e-12, "{pos:?}");
    assert_eq!(batch.depths, vec![0, 1]);
    assert_eq!(it.stats().max_depth, 1);
}

#[test]
fn matches_exhaustive_walk() {
    for seed in 0..6 {
        let set = synth(seed);
        for (bounds, r) in [
            ([0.0, 0.0, 1.0, 1.0], 300),
            ([0.2, 0.1, 0.55, 0.9], 1000),
            ([-0.5, 0.5, 0.5, 1.5], 200),
            ([0.25, 0.25, 0.75, 0.75], 4),
        ] {
            assert_eq!(query(&set, bounds, r), oracle(&set, bounds, r), "seed {seed} {bounds:?} {r}");
        }
    }
}

#[test]
fn batches_are_full_except_the_last() {
    let set = synth(11);
    let bounds = [0.0, 0.0, 1.0, 1.0];
    let reference = query(&set, bounds, 500);
    for cap in [1, 3, 7, 64, 100_000] {
        let cfg = QueryCfg {
            batch_capacity: cap,
            ..QueryCfg::default()
        };
        let batches: Vec<PointBatch> = set
            .point_iter_with(bounds, 500, &SinglePeriod, cfg)
            .unwrap()
            .collect();
        assert!(batches.iter().all(|b| !b.is_empty()));
        assert!(batches.iter().all(|b| b.positions.len() == b.ranks.len()
            && b.depths.len() == b.ranks.len()));
        if let Some((last, full)) = batches.split_last() {
            assert!(full.iter().all(|b| b.len() == cap));
            assert!(last.len() <= cap);
        }
        assert_eq!(sorted_keys(collect_points(batches)), reference, "capacity {cap}");
    }
}

#[test]
fn stats_count_pruning() {
    let set = corner_set();
    let mut it = set.point_iter([0.0, 0.0, 1.0, 1.0], 2).unwrap();
    while it.next().is_some() {}
    let s = *it.stats();
    assert_eq!(s.instances_visited, 1);
    assert_eq!(s.points_emitted, 2);
    assert_eq!(s.batches, 1);

    let mut far = set.point_iter([5.0, 5.0, 6.0, 6.0], 2).unwrap();
    assert!(far.next().is_none());
    assert_eq!(far.stats().spatial_pruned, 1);
    assert_eq!(far.stats().instances_visited, 0);
}

#[test]
fn stopping_early_is_cancellation() {
    let set = synth(2);
    let cfg = QueryCfg {
        batch_capacity: 4,
        ..QueryCfg::default()
    };
    let mut it = set
        .point_iter_with([0.0, 0.0, 1.0, 1.0], 10_000, &SinglePeriod, cfg)
        .unwrap();
    let first = it.next().unwrap();
    assert_eq!(first.len(), 4);
    drop(it);
    // a fresh call re-walks from the root
    let again = set
        .point_iter_with([0.0, 0.0, 1.0, 1.0], 10_000, &SinglePeriod, cfg)
        .unwrap()
        .next()
        .unwrap();
    assert_eq!(first, again);
}

#[test]
fn unbounded_rank_terminates_on_scale_overflow() {
    let set = synth(9);
    let side = 1e-9;
    let bounds = [0.3, 0.3, 0.3 + side, 0.3 + side];
    let mut it = set.point_iter(bounds, u64::MAX).unwrap();
    let mut n = 0usize;
    for batch in it.by_ref() {
        for (p, _) in batch.iter() {
            assert!(Box2::from_bounds(bounds).contains(p));
            n += 1;
        }
    }
    // 4^32 overflows u64: no instance deeper than 31 levels can carry a rank
    assert!(it.stats().max_depth <= 31);
    assert_eq!(it.stats().points_emitted as usize, n);
}

#[test]
fn lattice_repeats_the_period() {
    let set = corner_set();
    let lattice = Lattice::unit();
    let pts = collect_points(
        set.point_iter_with([-1.0, -1.0, 1.0, 1.0], 4, &lattice, QueryCfg::default())
            .unwrap(),
    );
    assert_eq!(pts.len(), 16);
    assert!(pts.iter().any(|(p, r)| *r == 4 && (p - vector![-0.1, -0.1]).norm() < 1e-12));
    // single period ignores the neighbours
    assert_eq!(query(&set, [-1.0, -1.0, 1.0, 1.0], 4).len(), 4);

    let shifted = collect_points(
        set.point_iter_with([3.0, 7.0, 4.0, 8.0], 1, &lattice, QueryCfg::default())
            .unwrap(),
    );
    assert_eq!(shifted.len(), 1);
    assert!((shifted[0].0 - vector![3.1, 7.1]).norm() < 1e-12);

    assert!(Lattice::new(vector![0.0, 1.0]).is_err());
    assert!(Lattice::new(vector![1.0, f64::NAN]).is_err());
    assert_eq!(Lattice::new(vector![2.0, 1.0]).unwrap().period(), vector![2.0, 1.0]);
}

#[test]
fn lattice_refuses_spans_it_cannot_enumerate() {
    let set = corner_set();
    let lattice = Lattice::unit();
    let run = |bounds| set.point_iter_with(bounds, 4, &lattice, QueryCfg::default());
    assert!(matches!(
        run([0.0, 0.0, 1e19, 0.5]).unwrap_err(),
        QueryError::LatticeSpan { limit: MAX_LATTICE_ROOTS, .. }
    ));
    assert!(matches!(
        run([0.0, 0.0, 1e7, 1e7]).unwrap_err(),
        QueryError::LatticeSpan { .. }
    ));
    // few cells, but their offsets no longer land on exact multiples of 1
    assert!(matches!(
        run([1e17, 0.0, 1e17 + 1.0, 1.0]).unwrap_err(),
        QueryError::LatticeOffset { .. }
    ));
    // the default layout never enumerates cells
    assert_eq!(query(&set, [0.0, 0.0, 1e19, 0.5], 4).len(), 2);

    let wide = collect_points(
        set.point_iter_with([-10.0, -10.0, 10.0, 10.0], 1, &lattice, QueryCfg::default())
            .unwrap(),
    );
    assert_eq!(wide.len(), 400);
}

#[test]
fn partition_on_a_point_coordinate() {
    let set = synth(4);
    let whole = collect_points(set.point_iter([0.0, 0.0, 1.0, 1.0], 400).unwrap());
    let split = whole[whole.len() / 2].0.x;
    let left = query(&set, [0.0, 0.0, split, 1.0], 400);
    let right = query(&set, [split, 0.0, 1.0, 1.0], 400);
    let target = key(whole[whole.len() / 2].0, whole[whole.len() / 2].1);
    assert!(!left.contains(&target));
    assert!(right.contains(&target));
    let mut union = left;
    union.extend(right);
    union.sort_unstable();
    assert_eq!(union, sorted_keys(whole));
}

#[test]
fn concurrent_queries_share_the_set() {
    let set = synth(21);
    let bounds = [0.1, 0.1, 0.9, 0.9];
    let reference = query(&set, bounds, 800);
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| query(&set, bounds, 800)))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), reference);
        }
    });
}

fn arb_box() -> impl Strategy<Value = [f64; 4]> {
    (-0.25f64..1.0, -0.25f64..1.0, 0.0f64..0.8, 0.0f64..0.8)
        .prop_map(|(x, y, w, h)| [x, y, x + w, y + h])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_contained_and_exact(seed in 0u64..1000, bounds in arb_box(), r in 0u64..600) {
        let set = synth(seed);
        let b = Box2::from_bounds(bounds);
        let pts = collect_points(set.point_iter(bounds, r).unwrap());
        for (p, rank) in &pts {
            prop_assert!(*rank <= r && *rank >= 1);
            prop_assert!(b.contains(*p));
        }
        prop_assert_eq!(sorted_keys(pts), oracle(&set, bounds, r));
    }

    #[test]
    fn prop_one_rank_step(seed in 0u64..1000, bounds in arb_box(), r in 0u64..600) {
        let set = synth(seed);
        let lower = query(&set, bounds, r);
        let upper = query(&set, bounds, r + 1);
        let trimmed: Vec<Key> = upper.iter().copied().filter(|k| k.0 <= r).collect();
        prop_assert_eq!(&trimmed, &lower);
        prop_assert!(upper.iter().filter(|k| k.0 > r).all(|k| k.0 == r + 1));
        prop_assert!(upper.len() >= lower.len());
    }

    #[test]
    fn prop_idempotent(seed in 0u64..1000, bounds in arb_box(), r in 0u64..600) {
        let set = synth(seed);
        prop_assert_eq!(query(&set, bounds, r), query(&set, bounds, r));
    }

    #[test]
    fn prop_partition(seed in 0u64..1000, bounds in arb_box(), t in 0.0f64..1.0, r in 0u64..600) {
        let set = synth(seed);
        let [x0, y0, x1, y1] = bounds;
        let xm = x0 + (x1 - x0) * t;
        let mut union = query(&set, [x0, y0, xm, y1], r);
        union.extend(query(&set, [xm, y0, x1, y1], r));
        union.sort_unstable();
        prop_assert_eq!(union, query(&set, bounds, r));
    }
}
