//! End-to-end runs of the boolean operations on primitive solids.

#![allow(clippy::unwrap_used)]

use std::f64::consts::PI;

use approx::assert_abs_diff_eq;

use crate::math::{Point3, ToleranceConfig, Vector3};
use crate::operations::creation::{MakeBox, MakeCylinder};
use crate::operations::query::{BoundingBox, Invalidity, IsValid, PointInSolid, Volume};
use crate::topology::{Shape, TopologyStore};

use super::*;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn p(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

fn cube(store: &mut TopologyStore, min: Point3, max: Point3) -> Shape {
    Shape::Solid(MakeBox::new(min, max).execute(store).unwrap())
}

fn serial() -> BooleanOptions {
    BooleanOptions::default().with_parallel(false)
}

fn volume(store: &TopologyStore, shape: Shape) -> f64 {
    Volume::new(shape).execute(store).unwrap()
}

#[test]
fn half_overlapping_cubes() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
    let b = cube(&mut store, p(0.5, 0.0, 0.0), p(1.5, 1.0, 1.0));

    let fuse = Fuse::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let common = Common::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let cut = Cut::new(a, b).with_options(serial()).execute(&mut store).unwrap();

    assert_abs_diff_eq!(volume(&store, fuse.shape), 1.5, epsilon = 1e-6);
    assert_abs_diff_eq!(volume(&store, common.shape), 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(volume(&store, cut.shape), 0.5, epsilon = 1e-6);
    assert!(fuse
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::CoincidentFaces { .. })));
    assert!(IsValid::new(fuse.shape).execute(&store));
}

#[test]
fn disjoint_cubes() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
    let b = cube(&mut store, p(3.0, 0.0, 0.0), p(4.0, 1.0, 1.0));

    let fuse = Fuse::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let Shape::Compound(id) = fuse.shape else {
        panic!("expected a compound, got {:?}", fuse.shape);
    };
    assert_eq!(store.compound(id).unwrap().children.len(), 2);
    assert_abs_diff_eq!(volume(&store, fuse.shape), 2.0, epsilon = 1e-9);

    let common = Common::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    assert!(store.faces_of(common.shape).is_empty());

    let cut = Cut::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    assert_abs_diff_eq!(volume(&store, cut.shape), 1.0, epsilon = 1e-9);
}

#[test]
fn cube_inside_cube() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(3.0, 3.0, 3.0));
    let b = cube(&mut store, p(1.0, 1.0, 1.0), p(2.0, 2.0, 2.0));

    let fuse = Fuse::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    assert_abs_diff_eq!(volume(&store, fuse.shape), 27.0, epsilon = 1e-9);
    let common = Common::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    assert_abs_diff_eq!(volume(&store, common.shape), 1.0, epsilon = 1e-9);

    let cut = Cut::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    assert_abs_diff_eq!(volume(&store, cut.shape), 26.0, epsilon = 1e-9);
    let Shape::Solid(solid) = cut.shape else {
        panic!("expected a solid, got {:?}", cut.shape);
    };
    assert_eq!(store.solid(solid).unwrap().inner_shells.len(), 1);
    assert_eq!(
        PointInSolid::new(solid, p(1.5, 1.5, 1.5)).execute(&store).unwrap(),
        PointClassification::Outside
    );
    assert_eq!(
        PointInSolid::new(solid, p(0.5, 1.5, 1.5)).execute(&store).unwrap(),
        PointClassification::Inside
    );
}

#[test]
fn cubes_sharing_a_face_fuse_without_duplicates() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
    let b = cube(&mut store, p(1.0, 0.0, 0.0), p(2.0, 1.0, 1.0));

    let mut op = BooleanOperation::new(BooleanOp::Fuse, serial());
    let fuse = op.perform(&mut store, a, b).unwrap();
    assert!(op.is_done());
    assert!(!op.warnings().is_empty());
    assert!(matches!(fuse.shape, Shape::Solid(_)));
    assert_eq!(store.faces_of(fuse.shape).len(), 10);
    assert_abs_diff_eq!(volume(&store, fuse.shape), 2.0, epsilon = 1e-9);

    let simplified = Fuse::new(a, b)
        .with_options(serial().with_simplify(true))
        .execute(&mut store)
        .unwrap();
    assert_eq!(store.faces_of(simplified.shape).len(), 6);
    assert_abs_diff_eq!(volume(&store, simplified.shape), 2.0, epsilon = 1e-9);
    assert!(IsValid::new(simplified.shape).execute(&store));
}

#[test]
fn partition_law_with_a_cylinder() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(-2.0, -2.0, 0.0), p(2.0, 2.0, 2.0));
    let b = Shape::Solid(
        MakeCylinder::new(p(0.0, 0.0, -1.0), 1.0, Vector3::z(), 4.0)
            .execute(&mut store)
            .unwrap(),
    );

    let cut = Cut::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let common = Common::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let (v_cut, v_common) = (volume(&store, cut.shape), volume(&store, common.shape));
    assert!((v_common - 2.0 * PI).abs() < 5e-2, "common {v_common}");
    assert!((v_cut + v_common - 32.0).abs() < 5e-2, "cut {v_cut}");
}

#[test]
fn fuse_and_common_commute() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0));
    let b = cube(&mut store, p(1.0, 1.0, 1.0), p(3.0, 3.0, 3.0));
    for op in [BooleanOp::Fuse, BooleanOp::Common] {
        let ab = BooleanOperation::new(op, serial()).perform(&mut store, a, b).unwrap();
        let ba = BooleanOperation::new(op, serial()).perform(&mut store, b, a).unwrap();
        assert!((volume(&store, ab.shape) - volume(&store, ba.shape)).abs() < 1e-9);
    }
}

#[test]
fn operations_with_itself_are_idempotent() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(1.0, 2.0, 3.0));
    let common = Common::new(a, a).with_options(serial()).execute(&mut store).unwrap();
    let fuse = Fuse::new(a, a).with_options(serial()).execute(&mut store).unwrap();
    assert_abs_diff_eq!(volume(&store, common.shape), 6.0, epsilon = 1e-9);
    assert_abs_diff_eq!(volume(&store, fuse.shape), 6.0, epsilon = 1e-9);
}

#[test]
fn fuse_vertices_lie_in_an_operand() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0));
    let b = cube(&mut store, p(1.0, 1.0, 1.0), p(3.0, 3.0, 3.0));
    let fuse = Fuse::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let tol = ToleranceConfig::default();
    for v in store.vertices_of(fuse.shape) {
        let point = store.point(v).unwrap();
        let in_a = classify_point_in_solid(&store, &point, a, &tol).unwrap();
        let in_b = classify_point_in_solid(&store, &point, b, &tol).unwrap();
        assert!(
            in_a != PointClassification::Outside || in_b != PointClassification::Outside,
            "vertex {point} is outside both operands"
        );
    }
}

#[test]
fn section_points_lie_on_both_boundaries() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0));
    let b = cube(&mut store, p(1.0, 1.0, 1.0), p(3.0, 3.0, 3.0));
    let section = Section::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let edges = store.edges_of(section.shape);
    assert_eq!(edges.len(), 6);
    let tol = ToleranceConfig::default();
    for v in store.vertices_of(section.shape) {
        let point = store.point(v).unwrap();
        for operand in [a, b] {
            assert!(matches!(
                classify_point_in_solid(&store, &point, operand, &tol).unwrap(),
                PointClassification::OnBoundary(_)
            ));
        }
    }
    assert!(section.history.has_generated());
}

#[test]
fn history_reports_split_kept_and_removed_faces() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0));
    let b = cube(&mut store, p(1.0, 1.0, 1.0), p(3.0, 3.0, 3.0));
    let cut = Cut::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let result_faces = store.faces_of(cut.shape);

    let face_at = |shape: Shape, axis: usize, value: f64| {
        store
            .faces_of(shape)
            .into_iter()
            .find(|&f| {
                let bbox = BoundingBox::new(f).execute(&store).unwrap();
                (bbox.min[axis] - value).abs() < 1e-9 && (bbox.max[axis] - value).abs() < 1e-9
            })
            .unwrap()
    };

    // Untouched by B: kept as is.
    let a_left = face_at(a, 0, 0.0);
    assert!(result_faces.contains(&a_left));
    assert!(cut.history.modified(Shape::Face(a_left)).is_empty());
    assert!(!cut.history.is_deleted(Shape::Face(a_left)));

    // Crossed by B: split, one piece kept.
    let a_top = face_at(a, 2, 2.0);
    let images = cut.history.modified(Shape::Face(a_top));
    assert_eq!(images.len(), 1);
    assert_abs_diff_eq!(volume(&store, cut.shape), 7.0, epsilon = 1e-9);

    // Entirely outside A: gone from a cut.
    let b_right = face_at(b, 0, 3.0);
    assert!(cut.history.is_deleted(Shape::Face(b_right)));
}

#[test]
fn parallel_and_serial_runs_agree() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = cube(&mut store, p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0));
    let b = Shape::Solid(
        MakeCylinder::new(p(1.0, 1.0, -1.0), 0.5, Vector3::z(), 4.0)
            .execute(&mut store)
            .unwrap(),
    );
    let serial_run = Cut::new(a, b).with_options(serial()).execute(&mut store).unwrap();
    let parallel_run = Cut::new(a, b).execute(&mut store).unwrap();
    assert!((volume(&store, serial_run.shape) - volume(&store, parallel_run.shape)).abs() < 1e-9);
    assert_eq!(
        store.faces_of(serial_run.shape).len(),
        store.faces_of(parallel_run.shape).len()
    );
}

#[test]
fn crossing_equal_cylinders_stay_within_their_volumes() {
    init_logging();
    let mut store = TopologyStore::new();
    let a = Shape::Solid(
        MakeCylinder::new(p(0.0, 0.0, -2.0), 1.0, Vector3::z(), 4.0)
            .execute(&mut store)
            .unwrap(),
    );
    let b = Shape::Solid(
        MakeCylinder::new(p(-2.0, 0.0, 0.0), 1.0, Vector3::x(), 4.0)
            .execute(&mut store)
            .unwrap(),
    );
    let v_a = volume(&store, a);
    let v_b = volume(&store, b);

    for (op, bound) in [
        (BooleanOp::Fuse, v_a + v_b),
        (BooleanOp::Common, v_a.min(v_b)),
        (BooleanOp::Cut, v_a),
    ] {
        let result = BooleanOperation::new(op, serial()).perform(&mut store, a, b).unwrap();
        let v = volume(&store, result.shape);
        assert!(v >= 0.0, "{op:?} volume {v}");
        assert!(v <= bound * 1.02, "{op:?} volume {v} above {bound}");

        let problems = IsValid::new(result.shape).problems(&store);
        assert!(!problems.iter().any(|issue| matches!(issue, Invalidity::InvertedSolid(_))));
        if problems.iter().any(|issue| matches!(issue, Invalidity::FreeShell(_))) {
            assert!(result
                .warnings
                .iter()
                .any(|w| matches!(w, Warning::NonManifoldResult { .. })));
        }
    }
}
