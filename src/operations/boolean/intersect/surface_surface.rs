use std::collections::HashMap;

use crate::geometry::curve::{CurveGeom, Line, Polyline};
use crate::geometry::surface::{Surface, SurfaceGeom};
use crate::math::intersect_3d::{plane_plane_intersect, PlanePairRelation};
use crate::math::{Point2, Point3, ToleranceConfig, Vector3};
use crate::operations::boolean::report::Diagnostic;
use crate::tessellation::{FaceDomain, UvMap};

use super::roots::bracketed_root;
use super::{IntersectResult, Locus, Param};

/// Deepest midpoint subdivision applied to a chain segment.
const MAX_REFINE_DEPTH: usize = 8;

/// Chains turning sharper than this between consecutive segments are
/// broken (cosine of the turn angle).
const MIN_TURN_COS: f64 = 0.5;

/// Intersects the surfaces of two faces.
///
/// The search is limited to the region both faces can reach: plane pairs
/// are clipped to the common bounding box, and other pairs are sampled
/// over the parameter box of the smaller face.
///
/// # Errors
///
/// Returns [`Diagnostic::Undetermined`] if a crossing on the sampling grid
/// cannot be refined.
pub fn intersect_surfaces(
    a: &FaceDomain,
    b: &FaceDomain,
    tolerance: f64,
    tol: &ToleranceConfig,
) -> IntersectResult {
    let (sa, sb) = (a.map().surface(), b.map().surface());
    if sa.same_domain(sb, tolerance) {
        return Ok(vec![Locus::Coincident {
            first: None,
            second: None,
        }]);
    }

    if let (SurfaceGeom::Plane(pa), SurfaceGeom::Plane(pb)) = (sa, sb) {
        let tol_here = ToleranceConfig {
            confusion: tolerance,
            ..*tol
        };
        return Ok(match plane_plane_intersect(pa, pb, &tol_here) {
            PlanePairRelation::Coincident => vec![Locus::Coincident {
                first: None,
                second: None,
            }],
            PlanePairRelation::Parallel { .. } => Vec::new(),
            PlanePairRelation::IntersectionLine { origin, direction } => {
                let window = a.bbox().intersection(b.bbox());
                match window.clip_line(&origin, &direction) {
                    Some((t0, t1)) if t1 - t0 > tolerance => match Line::new(origin, direction) {
                        Ok(line) => vec![Locus::Curve {
                            curve: CurveGeom::Line(line),
                            range: (t0, t1),
                            closed: false,
                        }],
                        Err(_) => Vec::new(),
                    },
                    _ => Vec::new(),
                }
            }
        });
    }

    let diag_a = a.surface_bbox(8).diagonal();
    let diag_b = b.surface_bbox(8).diagonal();
    if diag_b < diag_a {
        let mut loci = march(b, sa, tolerance, tol)?;
        for locus in &mut loci {
            if let Locus::Point { first, second, .. } = locus {
                std::mem::swap(first, second);
            }
        }
        Ok(loci)
    } else {
        march(a, sb, tolerance, tol)
    }
}

/// Samples `other` along the parameter box of `grid` and chains the
/// crossings with marching squares.
fn march(
    grid: &FaceDomain,
    other: &SurfaceGeom,
    tolerance: f64,
    tol: &ToleranceConfig,
) -> IntersectResult {
    let map = grid.map();
    let (lo, hi) = (grid.uv_min(), grid.uv_max());
    let n = tol.surface_grid.max(4);
    #[allow(clippy::cast_precision_loss)]
    let uv_at = |i: usize, j: usize| {
        Point2::new(
            lo.x + (hi.x - lo.x) * i as f64 / n as f64,
            lo.y + (hi.y - lo.y) * j as f64 / n as f64,
        )
    };
    let residual = |uv: &Point2| {
        map.point(uv)
            .map_or(f64::NAN, |p| other.signed_distance(&p))
    };

    let values: Vec<Vec<f64>> = (0..=n)
        .map(|i| (0..=n).map(|j| residual(&uv_at(i, j))).collect())
        .collect();
    let all_zero = values.iter().flatten().all(|g| g.abs() <= tolerance);
    if all_zero {
        return Ok(vec![Locus::Coincident {
            first: None,
            second: None,
        }]);
    }

    let wrap_u = map
        .u_period()
        .is_some_and(|p| hi.x - lo.x >= p - 1e-9);
    let wrap_v = map
        .v_period()
        .is_some_and(|p| hi.y - lo.y >= p - 1e-9);
    let canonical = |key: EdgeKey| match key {
        EdgeKey::V(i, j) if wrap_u && i == n => EdgeKey::V(0, j),
        EdgeKey::H(i, j) if wrap_v && j == n => EdgeKey::H(i, 0),
        key => key,
    };

    // Refined crossing on every grid edge whose ends differ in sign.
    let mut nodes: HashMap<EdgeKey, Point3> = HashMap::new();
    let mut crossing = |key: EdgeKey| -> Result<Option<Point3>, Diagnostic> {
        let key = canonical(key);
        if let Some(p) = nodes.get(&key) {
            return Ok(Some(*p));
        }
        let ((i0, j0), (i1, j1)) = key.ends();
        let (g0, g1) = (values[i0][j0], values[i1][j1]);
        if g0.is_nan() || g1.is_nan() || (g0 < 0.0) == (g1 < 0.0) {
            return Ok(None);
        }
        let (uv0, uv1) = (uv_at(i0, j0), uv_at(i1, j1));
        let along = |s: f64| residual(&(uv0 + (uv1 - uv0) * s));
        let s = bracketed_root(along, 0.0, 1.0, tolerance * 1e-3, tol).ok_or_else(|| {
            Diagnostic::Undetermined {
                near: map.point(&uv0).unwrap_or_else(|_| Point3::origin()),
                iterations: tol.max_iterations,
            }
        })?;
        let p = map
            .point(&(uv0 + (uv1 - uv0) * s))
            .map_err(|e| Diagnostic::Degenerate {
                near: Point3::origin(),
                reason: e.to_string(),
            })?;
        nodes.insert(key, p);
        Ok(Some(p))
    };

    let mut links: HashMap<EdgeKey, Vec<EdgeKey>> = HashMap::new();
    let mut link = |a: EdgeKey, b: EdgeKey| {
        let (a, b) = (canonical(a), canonical(b));
        if a != b {
            links.entry(a).or_default().push(b);
            links.entry(b).or_default().push(a);
        }
    };
    for i in 0..n {
        for j in 0..n {
            let sides = [
                EdgeKey::H(i, j),
                EdgeKey::V(i + 1, j),
                EdgeKey::H(i, j + 1),
                EdgeKey::V(i, j),
            ];
            let mut hit = Vec::with_capacity(4);
            for side in sides {
                if crossing(side)?.is_some() {
                    hit.push(side);
                }
            }
            match hit.len() {
                2 => link(hit[0], hit[1]),
                4 => {
                    // Saddle: the centre decides which corners connect.
                    let centre = residual(&nalgebra::center(&uv_at(i, j), &uv_at(i + 1, j + 1)));
                    if (centre < 0.0) == (values[i][j] < 0.0) {
                        link(sides[0], sides[1]);
                        link(sides[2], sides[3]);
                    } else {
                        link(sides[0], sides[3]);
                        link(sides[1], sides[2]);
                    }
                }
                _ => {}
            }
        }
    }

    let refiner = ChainRefiner {
        a: map.surface(),
        b: other,
        tolerance,
        tol,
    };
    let mut loci: Vec<Locus> = Vec::new();
    for (points, closed) in chains(&nodes, &links) {
        let refined = refiner.refine(points, closed);
        for (piece, piece_closed) in break_at_turns(refined, closed, tolerance) {
            if let Some(locus) = curve_locus(piece, piece_closed) {
                loci.push(locus);
            }
        }
    }
    loci.extend(tangent_contacts(&values, &uv_at, map, other, tolerance, tol));
    Ok(loci)
}

/// A grid edge: `H(i, j)` joins corners `(i, j)` and `(i + 1, j)`,
/// `V(i, j)` joins `(i, j)` and `(i, j + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EdgeKey {
    H(usize, usize),
    V(usize, usize),
}

impl EdgeKey {
    fn ends(self) -> ((usize, usize), (usize, usize)) {
        match self {
            Self::H(i, j) => ((i, j), (i + 1, j)),
            Self::V(i, j) => ((i, j), (i, j + 1)),
        }
    }
}

/// Walks the link graph into point sequences: open chains first, from
/// their ends, then the remaining cycles.
fn chains(
    nodes: &HashMap<EdgeKey, Point3>,
    links: &HashMap<EdgeKey, Vec<EdgeKey>>,
) -> Vec<(Vec<Point3>, bool)> {
    let mut keys: Vec<EdgeKey> = links.keys().copied().collect();
    keys.sort_by_key(|k| match *k {
        EdgeKey::H(i, j) => (0, i, j),
        EdgeKey::V(i, j) => (1, i, j),
    });
    let mut visited: std::collections::HashSet<EdgeKey> = std::collections::HashSet::new();
    let mut out = Vec::new();

    let starts = keys
        .iter()
        .filter(|k| links[*k].len() == 1)
        .chain(keys.iter())
        .copied()
        .collect::<Vec<_>>();
    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        let open = links[&start].len() == 1;
        let mut order = vec![start];
        visited.insert(start);
        let mut current = start;
        while let Some(&next) = links[&current].iter().find(|k| !visited.contains(*k)) {
            visited.insert(next);
            order.push(next);
            current = next;
        }
        let closed = !open && order.len() > 2 && links[&current].contains(&start);
        let mut points: Vec<Point3> = order.iter().filter_map(|k| nodes.get(k).copied()).collect();
        points.dedup_by(|q, p| (*q - *p).norm() <= 1e-12);
        if points.len() >= 2 {
            out.push((points, closed));
        }
    }
    out
}

/// Inserts projected midpoints until every chord is within the deflection
/// of the true intersection.
struct ChainRefiner<'a> {
    a: &'a SurfaceGeom,
    b: &'a SurfaceGeom,
    tolerance: f64,
    tol: &'a ToleranceConfig,
}

impl ChainRefiner<'_> {
    fn refine(&self, points: Vec<Point3>, closed: bool) -> Vec<Point3> {
        let mut ring = points;
        if closed {
            if let Some(&first) = ring.first() {
                ring.push(first);
            }
        }
        let mut out = Vec::with_capacity(ring.len() * 2);
        for pair in ring.windows(2) {
            out.push(pair[0]);
            self.split(pair[0], pair[1], 0, &mut out);
        }
        if let Some(&last) = ring.last() {
            out.push(last);
        }
        if closed {
            out.pop();
        }
        out
    }

    fn split(&self, p: Point3, q: Point3, depth: usize, out: &mut Vec<Point3>) {
        if depth >= MAX_REFINE_DEPTH || (q - p).norm() <= self.tolerance {
            return;
        }
        let mid = nalgebra::center(&p, &q);
        let Some(m) = project_to_intersection(self.a, self.b, &mid, self.tolerance, self.tol) else {
            return;
        };
        if (m - mid).norm() <= self.tol.deflection {
            return;
        }
        self.split(p, m, depth + 1, out);
        out.push(m);
        self.split(m, q, depth + 1, out);
    }
}

/// Splits a chain where it turns back on itself, which happens where the
/// grid linked two branches of the intersection.
fn break_at_turns(points: Vec<Point3>, closed: bool, tolerance: f64) -> Vec<(Vec<Point3>, bool)> {
    let n = points.len();
    let turns_sharply = |k: usize| {
        let (prev, here, next) = (points[(k + n - 1) % n], points[k], points[(k + 1) % n]);
        let (d0, d1): (Vector3, Vector3) = (here - prev, next - here);
        d0.norm() > tolerance
            && d1.norm() > tolerance
            && d0.normalize().dot(&d1.normalize()) < MIN_TURN_COS
    };
    let interior = if closed { 0..n } else { 1..n.saturating_sub(1) };
    let breaks: Vec<usize> = interior.filter(|&k| n >= 3 && turns_sharply(k)).collect();
    if breaks.is_empty() {
        return vec![(points, closed)];
    }

    let mut pieces = Vec::new();
    if closed {
        // Rotate so the walk starts at a break, then cut at the others.
        let mut ring: Vec<Point3> = points[breaks[0]..].to_vec();
        ring.extend_from_slice(&points[..=breaks[0]]);
        let offsets: Vec<usize> = breaks.iter().map(|&b| (b + n - breaks[0]) % n).collect();
        let mut from = 0;
        for &cut in offsets.iter().skip(1).chain(std::iter::once(&n)) {
            pieces.push((ring[from..=cut].to_vec(), false));
            from = cut;
        }
    } else {
        let mut from = 0;
        for &cut in breaks.iter().chain(std::iter::once(&(n - 1))) {
            pieces.push((points[from..=cut].to_vec(), false));
            from = cut;
        }
    }
    pieces
}

fn curve_locus(mut points: Vec<Point3>, closed: bool) -> Option<Locus> {
    if closed {
        let first = *points.first()?;
        points.push(first);
    }
    let segments = points.len().checked_sub(1)?;
    if segments == 0 {
        return None;
    }
    let polyline = Polyline::new(points).ok()?;
    #[allow(clippy::cast_precision_loss)]
    Some(Locus::Curve {
        curve: CurveGeom::Polyline(polyline),
        range: (0.0, segments as f64),
        closed,
    })
}

/// Grid corners where the surfaces touch without the residual changing
/// sign around them.
fn tangent_contacts(
    values: &[Vec<f64>],
    uv_at: &impl Fn(usize, usize) -> Point2,
    map: &UvMap,
    other: &SurfaceGeom,
    tolerance: f64,
    tol: &ToleranceConfig,
) -> Vec<Locus> {
    let n = values.len() - 1;
    let mut out: Vec<Locus> = Vec::new();
    for i in 1..n {
        for j in 1..n {
            let g = values[i][j];
            let around = [values[i - 1][j], values[i + 1][j], values[i][j - 1], values[i][j + 1]];
            if around.iter().any(|v| v.is_nan()) {
                continue;
            }
            let same_side = around.iter().all(|&v| v > tolerance)
                || around.iter().all(|&v| v < -tolerance);
            let lowest = around.iter().all(|&v| v.abs() > g.abs());
            if !(same_side && lowest) {
                continue;
            }
            let Ok(start) = map.point(&uv_at(i, j)) else {
                continue;
            };
            let touch = if g.abs() <= tolerance {
                Some(start)
            } else {
                project_to_intersection(map.surface(), other, &start, tolerance, tol)
            };
            let Some(point) = touch else {
                continue;
            };
            if out.iter().any(|l| matches!(l, Locus::Point { point: q, .. } if (q - point).norm() <= tolerance)) {
                continue;
            }
            let (u, v) = map.surface().inverse(&point);
            let (s, t) = other.inverse(&point);
            out.push(Locus::Point {
                point,
                first: Param::Surface(u, v),
                second: Param::Surface(s, t),
                tangent: true,
            });
        }
    }
    out
}

/// Central-difference gradient of a surface's signed distance.
fn gradient(s: &SurfaceGeom, p: &Point3) -> Vector3 {
    let h = 1e-6 * p.coords.amax().max(1.0);
    let mut g = Vector3::zeros();
    for k in 0..3 {
        let mut plus = *p;
        let mut minus = *p;
        plus[k] += h;
        minus[k] -= h;
        g[k] = (s.signed_distance(&plus) - s.signed_distance(&minus)) / (2.0 * h);
    }
    g
}

/// Moves `p` onto both surfaces with minimum-norm Newton steps.
///
/// Where the normals are parallel the step alternates between the two
/// surfaces instead. Returns `None` if the residual stays above
/// `tolerance` after the iteration budget.
#[must_use]
fn project_to_intersection(
    a: &SurfaceGeom,
    b: &SurfaceGeom,
    p: &Point3,
    tolerance: f64,
    tol: &ToleranceConfig,
) -> Option<Point3> {
    let mut x = *p;
    for _ in 0..tol.max_iterations {
        let (ga, gb) = (a.signed_distance(&x), b.signed_distance(&x));
        if !ga.is_finite() || !gb.is_finite() {
            return None;
        }
        if ga.abs() <= tolerance * 1e-3 && gb.abs() <= tolerance * 1e-3 {
            return Some(x);
        }
        let (na, nb) = (gradient(a, &x), gradient(b, &x));
        let (m00, m01, m11) = (na.dot(&na), na.dot(&nb), nb.dot(&nb));
        if m00 <= f64::EPSILON || m11 <= f64::EPSILON {
            return None;
        }
        let det = m00 * m11 - m01 * m01;
        if det <= 1e-12 * m00 * m11 {
            x -= na * (ga / m00);
            let gb = b.signed_distance(&x);
            x -= nb * (gb / m11);
            continue;
        }
        let la = (m11 * ga - m01 * gb) / det;
        let lb = (m00 * gb - m01 * ga) / det;
        x -= na * la + nb * lb;
    }
    (a.signed_distance(&x).abs() <= tolerance && b.signed_distance(&x).abs() <= tolerance)
        .then_some(x)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::curve::Curve;
    use crate::geometry::surface::{Cylinder, Plane, Sphere};
    use crate::operations::creation::{MakeBox, MakeCylinder};
    use crate::topology::{FaceId, Shape, TopologyStore};

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn face_where(store: &TopologyStore, root: Shape, pred: impl Fn(&SurfaceGeom) -> bool) -> FaceId {
        store
            .faces_of(root)
            .into_iter()
            .find(|&f| pred(&store.face(f).unwrap().surface))
            .unwrap()
    }

    fn curves(loci: &[Locus]) -> Vec<(Vec<Point3>, bool)> {
        loci.iter()
            .filter_map(|l| match l {
                Locus::Curve { curve, range, closed } => {
                    let params = curve.sample_params(range.0, range.1, 1e-3);
                    Some((params.iter().map(|&t| curve.evaluate(t).unwrap()).collect(), *closed))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn crossing_box_faces_meet_in_a_clipped_line() {
        let tol = ToleranceConfig::default();
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let b = MakeBox::new(p(0.5, 0.5, 0.5), p(1.5, 1.5, 1.5)).execute(&mut store).unwrap();
        let top_a = face_where(&store, Shape::Solid(a), |s| {
            s.as_plane().is_some_and(|pl| (pl.origin().z - 1.0).abs() < 1e-12 && pl.plane_normal().z.abs() > 0.5)
        });
        let side_b = face_where(&store, Shape::Solid(b), |s| {
            s.as_plane().is_some_and(|pl| (pl.origin().x - 0.5).abs() < 1e-12 && pl.plane_normal().x.abs() > 0.5)
        });
        let da = FaceDomain::new(&store, top_a, &tol).unwrap();
        let db = FaceDomain::new(&store, side_b, &tol).unwrap();
        let loci = intersect_surfaces(&da, &db, 1e-7, &tol).unwrap();
        let lines = curves(&loci);
        assert_eq!(lines.len(), 1);
        let (ends, closed) = &lines[0];
        assert!(!closed);
        let mut ys: Vec<f64> = [ends[0], ends[ends.len() - 1]].iter().map(|q| q.y).collect();
        ys.sort_by(f64::total_cmp);
        assert!((ys[0] - 0.5).abs() < 1e-6 && (ys[1] - 1.0).abs() < 1e-6);
        for q in ends {
            assert!((q.x - 0.5).abs() < 1e-9 && (q.z - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn plane_cuts_cylinder_in_a_closed_circle() {
        let tol = ToleranceConfig::default();
        let mut store = TopologyStore::new();
        let cyl = MakeCylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), 2.0).execute(&mut store).unwrap();
        let cutter = MakeBox::new(p(-2.0, -2.0, -1.0), p(2.0, 2.0, 1.0)).execute(&mut store).unwrap();
        let lateral = face_where(&store, Shape::Solid(cyl), |s| matches!(s, SurfaceGeom::Cylinder(_)));
        let top = face_where(&store, Shape::Solid(cutter), |s| {
            s.as_plane().is_some_and(|pl| (pl.origin().z - 1.0).abs() < 1e-12)
        });
        let dl = FaceDomain::new(&store, lateral, &tol).unwrap();
        let dt = FaceDomain::new(&store, top, &tol).unwrap();
        let loci = intersect_surfaces(&dl, &dt, 1e-7, &tol).unwrap();
        let circles = curves(&loci);
        assert_eq!(circles.len(), 1);
        let (points, closed) = &circles[0];
        assert!(closed);
        for q in points {
            assert!((q.z - 1.0).abs() < 1e-7);
            assert!(((q.x * q.x + q.y * q.y).sqrt() - 1.0).abs() < 1e-7);
        }
        // Chords stay within the deflection.
        for w in points.windows(2) {
            let mid = nalgebra::center(&w[0], &w[1]);
            assert!(1.0 - (mid.x * mid.x + mid.y * mid.y).sqrt() <= 1.1e-3);
        }
    }

    #[test]
    fn coaxial_cylinders_are_coincident() {
        let tol = ToleranceConfig::default();
        let mut store = TopologyStore::new();
        let c1 = MakeCylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), 2.0).execute(&mut store).unwrap();
        let c2 = MakeCylinder::new(p(0.0, 0.0, 1.0), 1.0, Vector3::z(), 2.0).execute(&mut store).unwrap();
        let is_cyl = |s: &SurfaceGeom| matches!(s, SurfaceGeom::Cylinder(_));
        let d1 = FaceDomain::new(&store, face_where(&store, Shape::Solid(c1), is_cyl), &tol).unwrap();
        let d2 = FaceDomain::new(&store, face_where(&store, Shape::Solid(c2), is_cyl), &tol).unwrap();
        let loci = intersect_surfaces(&d1, &d2, 1e-7, &tol).unwrap();
        assert!(matches!(loci[..], [Locus::Coincident { first: None, second: None }]));
    }

    #[test]
    fn projection_lands_on_both_surfaces() {
        let tol = ToleranceConfig::default();
        let sphere = SurfaceGeom::Sphere(Sphere::new(p(0.0, 0.0, 0.0), 2.0, Vector3::z(), Vector3::x()).unwrap());
        let plane = SurfaceGeom::Plane(Plane::from_normal(p(0.0, 0.0, 1.0), Vector3::z()).unwrap());
        let q = project_to_intersection(&sphere, &plane, &p(1.0, 0.3, 0.8), 1e-7, &tol).unwrap();
        assert!(sphere.signed_distance(&q).abs() < 1e-7);
        assert!(plane.signed_distance(&q).abs() < 1e-7);
    }

    #[test]
    fn projection_between_crossing_cylinders() {
        let tol = ToleranceConfig::default();
        let c1 = SurfaceGeom::Cylinder(Cylinder::new(p(0.0, 0.0, 0.0), 1.0, Vector3::z(), Vector3::x()).unwrap());
        let c2 = SurfaceGeom::Cylinder(Cylinder::new(p(1.5, 0.0, 0.0), 1.0, Vector3::z(), Vector3::x()).unwrap());
        let q = project_to_intersection(&c1, &c2, &p(0.8, 0.7, 0.3), 1e-7, &tol).unwrap();
        assert!((q.x - 0.75).abs() < 1e-6);
        assert!((q.z - 0.3).abs() < 1e-6);
    }
}
