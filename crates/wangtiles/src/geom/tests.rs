use super::*;
use nalgebra::{vector, Vector2};

fn near(a: Vector2<f64>, b: Vector2<f64>, eps: f64) -> bool {
    (a - b).amax() <= eps
}

#[test]
fn symmetry_apply_matches_matrix() {
    let v = vector![0.3, -1.7];
    for s in Symmetry::ALL {
        assert_eq!(s.apply(v), s.matrix() * v, "{s:?}");
        assert!((s.matrix().determinant().abs() - 1.0).abs() < 1e-15);
        assert_eq!(s.is_mirrored(), s.matrix().determinant() < 0.0);
    }
}

#[test]
fn symmetry_group_table_is_exact() {
    for a in Symmetry::ALL {
        for b in Symmetry::ALL {
            let ab = a.compose(b);
            assert_eq!(ab.matrix(), a.matrix() * b.matrix(), "{a:?} ∘ {b:?}");
        }
        assert_eq!(a.compose(a.inverse()), Symmetry::Identity);
        assert_eq!(a.inverse().compose(a), Symmetry::Identity);
        assert_eq!(Symmetry::from_index(a.index()), a);
        assert_eq!(Symmetry::from_parts(a.quarter_turns(), a.is_mirrored()), a);
    }
}

#[test]
fn symmetry_group_is_associative() {
    for a in Symmetry::ALL {
        for b in Symmetry::ALL {
            for c in Symmetry::ALL {
                assert_eq!(a.compose(b).compose(c), a.compose(b.compose(c)));
            }
        }
    }
}

#[test]
fn apply_unit_permutes_corners() {
    let corners = [
        vector![0.0, 0.0],
        vector![1.0, 0.0],
        vector![1.0, 1.0],
        vector![0.0, 1.0],
    ];
    for s in Symmetry::ALL {
        for c in corners {
            let img = s.apply_unit(c);
            assert!(corners.iter().any(|k| *k == img), "{s:?} moved {c:?} off the square");
        }
    }
    // quarter turn about the centre sends (1,0) to (1,1)
    assert_eq!(Symmetry::Rot90.apply_unit(vector![1.0, 0.0]), vector![1.0, 1.0]);
}

#[test]
fn child_placement_maps_unit_square_onto_rect() {
    let rect = Box2::new(vector![0.5, 0.25], vector![0.75, 0.5]);
    for s in Symmetry::ALL {
        let f = child_placement(&rect, s);
        let b = f.unit_bounds();
        assert!(near(b.min, rect.min, 1e-15) && near(b.max, rect.max, 1e-15), "{s:?}");
        // centre is fixed by every symmetry
        assert!(near(f.apply(vector![0.5, 0.5]), vector![0.625, 0.375], 1e-15));
        // the local point lands where the symmetry-about-centre puts it
        let p = vector![0.1, 0.8];
        let expect = rect.min + s.apply_unit(p) * rect.width();
        assert!(near(f.apply(p), expect, 1e-15));
    }
}

#[test]
fn similarity_compose_applies_inner_first() {
    let parent = Similarity2 {
        scale: 0.5,
        symmetry: Symmetry::Diagonal,
        t: vector![1.0, -2.0],
    };
    let rect = Box2::new(vector![0.0, 0.5], vector![0.5, 1.0]);
    let inner = child_placement(&rect, Symmetry::Rot90);
    let child = compose(&parent, &rect, Symmetry::Rot90);
    let p = vector![0.2, 0.7];
    assert!(near(child.apply(p), parent.apply(inner.apply(p)), 1e-14));
    // linear part is exactly the product of the symmetry matrices times the scale
    let m = parent.symmetry.matrix() * Symmetry::Rot90.matrix() * 0.25;
    assert!(near(child.apply(p) - child.t, m * p, 1e-15));
    assert!((child.scale - 0.25).abs() < 1e-15);
    assert!(child.symmetry.is_mirrored());
}

#[test]
fn deep_composition_stays_on_the_grid() {
    // Descend 40 levels along the lower-left quadrant with alternating symmetries;
    // the tile origin must stay within rounding of the exact dyadic answer.
    let rect = Box2::new(vector![0.0, 0.0], vector![0.5, 0.5]);
    let mut f = Similarity2::identity();
    for level in 0..40 {
        let s = if level % 2 == 0 { Symmetry::Identity } else { Symmetry::Rot180 };
        f = compose(&f, &rect, s);
        let b = f.unit_bounds();
        assert!((b.width() - 0.5f64.powi(level + 1)).abs() < 1e-15);
        assert!(Box2::unit().encloses_eps(&b, 1e-12));
    }
}

#[test]
fn box_membership_is_half_open() {
    let b = Box2::from_bounds([0.0, 0.0, 1.0, 1.0]);
    assert!(b.contains(vector![0.0, 0.0]));
    assert!(b.contains(vector![0.999, 0.5]));
    assert!(!b.contains(vector![1.0, 0.5]));
    assert!(!b.contains(vector![0.5, 1.0]));
    assert!(!b.is_empty());
    assert!(Box2::from_bounds([0.5, 0.0, 0.5, 1.0]).is_empty());
    assert_eq!(b.to_bounds(), [0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn box_overlap_predicates() {
    let q = Box2::from_bounds([0.0, 0.0, 0.5, 0.5]);
    let right = Box2::from_bounds([0.5, 0.0, 1.0, 0.5]);
    let left = Box2::from_bounds([-0.5, 0.0, 0.0, 0.5]);
    // shared edges do not overlap as open sets
    assert!(!q.overlaps(&right));
    // a closed tile touching max.x cannot hold a point with x < 0.5
    assert!(!q.may_contain_any_of(&right));
    // a closed tile touching min.x may hold points at x == 0.0
    assert!(q.may_contain_any_of(&left));
    assert!((q.area() - 0.25).abs() < 1e-15);
    assert_eq!(q.translated(vector![1.0, 0.0]).min, vector![1.0, 0.0]);
}
