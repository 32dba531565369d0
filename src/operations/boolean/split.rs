//! Splitting faces along section and in-edges.
//!
//! The boundary pieces and the cut edges of a face are laid out in face
//! coordinates as an arrangement of arcs. Boundary arcs are walked once in
//! their loop direction; cut arcs are walked once each way. Following the
//! sharpest left turn at every node traces the cycles of the arrangement:
//! counter-clockwise cycles bound fragments, clockwise ones are holes.

use std::collections::HashSet;
use std::f64::consts::TAU;

use tracing::trace;

use crate::error::Result;
use crate::math::polygon_2d::{point_in_polygon, signed_area};
use crate::math::Point2;
use crate::tessellation::{sample_oriented_edge, FaceDomain, UvMap};
use crate::topology::{EdgeId, FaceId, OrientedEdge, TopologyStore, VertexId};

use super::ds::{BopDs, Operand};
use super::report::Warning;

/// A region of a face bounded by loops of split edges.
#[derive(Debug, Clone)]
pub struct FaceFragment {
    /// The original face the fragment was cut from.
    pub source_face: FaceId,
    pub source: Operand,
    /// Outer loop first, then holes.
    pub loops: Vec<Vec<OrientedEdge>>,
    pub domain: FaceDomain,
    /// `true` if the fragment is the whole source face with its original
    /// boundary edges.
    pub unchanged: bool,
}

/// Result of splitting one face.
#[derive(Debug, Default)]
pub struct SplitFace {
    pub fragments: Vec<FaceFragment>,
    pub warnings: Vec<Warning>,
}

struct Arc {
    oe: OrientedEdge,
    uv: Vec<Point2>,
    from: usize,
    to: usize,
    twin: Option<usize>,
    boundary: bool,
}

impl Arc {
    fn out_angle(&self) -> f64 {
        let first = self.uv[0];
        let next = self
            .uv
            .iter()
            .skip(1)
            .find(|q| (*q - first).norm() > 1e-12)
            .unwrap_or(&first);
        (next.y - first.y).atan2(next.x - first.x)
    }

    /// Direction pointing back along the arc from its end.
    fn back_angle(&self) -> f64 {
        let last = self.uv[self.uv.len() - 1];
        let prev = self
            .uv
            .iter()
            .rev()
            .skip(1)
            .find(|q| (*q - last).norm() > 1e-12)
            .unwrap_or(&last);
        (prev.y - last.y).atan2(prev.x - last.x)
    }
}

struct Arrangement<'m> {
    map: &'m UvMap,
    nodes: Vec<(VertexId, Point2)>,
    arcs: Vec<Arc>,
}

impl<'m> Arrangement<'m> {
    fn new(map: &'m UvMap) -> Self {
        Self {
            map,
            nodes: Vec::new(),
            arcs: Vec::new(),
        }
    }

    /// The node of `vertex` at `uv`, one per period copy.
    fn node(&mut self, vertex: VertexId, uv: Point2) -> usize {
        let close = |a: f64, b: f64, period: Option<f64>| {
            period.map_or(true, |p| (a - b).abs() < 0.5 * p)
        };
        let (pu, pv) = (self.map.u_period(), self.map.v_period());
        if let Some(i) = self
            .nodes
            .iter()
            .position(|(v, q)| *v == vertex && close(q.x, uv.x, pu) && close(q.y, uv.y, pv))
        {
            return i;
        }
        self.nodes.push((vertex, uv));
        self.nodes.len() - 1
    }

    fn add_arc(
        &mut self,
        store: &TopologyStore,
        oe: OrientedEdge,
        mut uv: Vec<Point2>,
        boundary: bool,
    ) -> Result<usize> {
        let (start, end) = store.oriented_ends(oe)?;
        let from = self.node(start, uv[0]);
        let to = self.node(end, uv[uv.len() - 1]);
        uv[0] = self.nodes[from].1;
        let last = uv.len() - 1;
        uv[last] = self.nodes[to].1;
        self.arcs.push(Arc {
            oe,
            uv,
            from,
            to,
            twin: None,
            boundary,
        });
        Ok(self.arcs.len() - 1)
    }

    /// Drops cut arcs with an end no other arc reaches.
    fn prune(&self, live: &mut [bool]) {
        loop {
            let mut degree = vec![0usize; self.nodes.len()];
            for (i, arc) in self.arcs.iter().enumerate() {
                // A cut is counted once through its forward arc.
                if live[i] && (arc.boundary || arc.twin.is_some_and(|t| t > i)) {
                    degree[arc.from] += 1;
                    degree[arc.to] += 1;
                }
            }
            let mut changed = false;
            for (i, arc) in self.arcs.iter().enumerate() {
                if live[i] && !arc.boundary && (degree[arc.from] < 2 || degree[arc.to] < 2) {
                    live[i] = false;
                    changed = true;
                }
            }
            if !changed {
                return;
            }
        }
    }

    /// The arc leaving the end node of `h` with the sharpest left turn.
    fn next(&self, h: usize, live: &[bool]) -> Option<usize> {
        let arc = &self.arcs[h];
        let back = arc.back_angle();
        self.arcs
            .iter()
            .enumerate()
            .filter(|(g, out)| live[*g] && out.from == arc.to)
            .map(|(g, out)| {
                let mut turn = (back - out.out_angle()).rem_euclid(TAU);
                if arc.twin == Some(g) || turn < 1e-12 {
                    turn = TAU;
                }
                (g, turn)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(g, _)| g)
    }

    fn cycles(&self, live: &[bool]) -> Vec<Vec<usize>> {
        let mut used = vec![false; self.arcs.len()];
        let mut out = Vec::new();
        for start in 0..self.arcs.len() {
            if !live[start] || used[start] {
                continue;
            }
            let mut cycle = vec![start];
            used[start] = true;
            let mut cur = start;
            let closed = loop {
                let Some(g) = self.next(cur, live) else {
                    break false;
                };
                if g == start {
                    break true;
                }
                if used[g] || cycle.len() > self.arcs.len() {
                    break false;
                }
                used[g] = true;
                cycle.push(g);
                cur = g;
            };
            if closed {
                out.push(cycle);
            } else {
                trace!(arcs = cycle.len(), "open walk in face arrangement");
            }
        }
        out
    }

    fn polygon(&self, cycle: &[usize]) -> Vec<Point2> {
        let mut pts = Vec::new();
        for &i in cycle {
            let uv = &self.arcs[i].uv;
            pts.extend_from_slice(&uv[..uv.len() - 1]);
        }
        pts
    }
}

/// Splits a face of the run along its section edges and in-edges.
///
/// # Errors
///
/// Returns an error if an edge is missing or a fragment boundary does not
/// close in face coordinates.
pub fn split_face(
    store: &TopologyStore,
    ds: &BopDs,
    face_id: FaceId,
    source: Operand,
) -> Result<SplitFace> {
    let tol = *ds.tol();
    let face = store.face(face_id)?;
    let map = UvMap::of_face(face);
    let tolerance = tol.linear(face.tolerance);
    let original = store.face_loops(face_id)?;
    let boundary: Vec<Vec<OrientedEdge>> = original
        .iter()
        .map(|lp| lp.iter().flat_map(|&oe| ds.pieces(oe)).collect())
        .collect();

    let on_boundary: HashSet<EdgeId> = boundary.iter().flatten().map(|oe| oe.edge).collect();
    let mut cuts: Vec<EdgeId> = Vec::new();
    for &e in ds.section_edges(face_id).iter().chain(ds.in_edges(face_id)) {
        let e = ds.image(OrientedEdge::new(e, true)).edge;
        if !on_boundary.contains(&e) && !cuts.contains(&e) {
            cuts.push(e);
        }
    }

    let whole = |loops: Vec<Vec<OrientedEdge>>| -> Result<SplitFace> {
        let unchanged = loops == original;
        let domain = FaceDomain::from_edge_loops(store, map.clone(), &loops, tolerance, &tol)?;
        Ok(SplitFace {
            fragments: vec![FaceFragment {
                source_face: face_id,
                source,
                loops,
                domain,
                unchanged,
            }],
            warnings: Vec::new(),
        })
    };
    if cuts.is_empty() {
        return whole(boundary);
    }

    let mut arr = Arrangement::new(&map);
    let mut uv_min = Point2::new(f64::INFINITY, f64::INFINITY);
    for lp in &boundary {
        let mut samples = Vec::new();
        let mut counts = Vec::with_capacity(lp.len());
        for &oe in lp {
            let mut pts = sample_oriented_edge(store, oe, tol.deflection)?;
            pts.pop();
            counts.push(pts.len());
            samples.extend(pts);
        }
        let uv = map.project_polyline(&samples, None);
        for q in &uv {
            uv_min = uv_min.inf(q);
        }
        let mut at = 0;
        for (k, &oe) in lp.iter().enumerate() {
            let end = at + counts[k];
            let mut piece: Vec<Point2> = uv[at..end].to_vec();
            let closing = if end < uv.len() { uv[end] } else { uv[0] };
            piece.push(closing);
            arr.add_arc(store, oe, piece, true)?;
            at = end;
        }
    }

    let place = |value: f64, lo: f64, period: Option<f64>| -> f64 {
        period.map_or(0.0, |p| lo + (value - lo).rem_euclid(p) - value)
    };
    for &e in &cuts {
        let fwd = OrientedEdge::new(e, true);
        let samples = sample_oriented_edge(store, fwd, tol.deflection)?;
        let mut uv = map.project_polyline(&samples, None);
        let mid = uv[uv.len() / 2];
        let shift = Point2::new(
            place(mid.x, uv_min.x, map.u_period()),
            place(mid.y, uv_min.y, map.v_period()),
        );
        for q in &mut uv {
            q.x += shift.x;
            q.y += shift.y;
        }
        let mut back = uv.clone();
        back.reverse();
        let a = arr.add_arc(store, fwd, uv, false)?;
        let b = arr.add_arc(store, fwd.reversed(), back, false)?;
        arr.arcs[a].twin = Some(b);
        arr.arcs[b].twin = Some(a);
    }

    let mut live = vec![true; arr.arcs.len()];
    arr.prune(&mut live);
    if arr.arcs.iter().zip(&live).all(|(a, &l)| a.boundary || !l) {
        return whole(boundary);
    }

    let min_area = tolerance * tolerance;
    let mut outers: Vec<(Vec<usize>, Vec<Point2>, f64)> = Vec::new();
    let mut holes: Vec<(Vec<usize>, Vec<Point2>)> = Vec::new();
    for cycle in arr.cycles(&live) {
        let poly = arr.polygon(&cycle);
        let area = signed_area(&poly);
        if area > min_area {
            outers.push((cycle, poly, area));
        } else if area < -min_area {
            holes.push((cycle, poly));
        }
    }

    let outer_polys: Vec<(&[Point2], f64)> =
        outers.iter().map(|(_, poly, area)| (poly.as_slice(), *area)).collect();
    let hole_polys: Vec<&[Point2]> = holes.iter().map(|(_, poly)| poly.as_slice()).collect();
    let (hole_of, warnings) = assign_holes(&outer_polys, &hole_polys, face_id);

    let mut fragments = Vec::with_capacity(outers.len());
    for (i, (cycle, _, _)) in outers.iter().enumerate() {
        let mut loops = vec![cycle.iter().map(|&a| arr.arcs[a].oe).collect::<Vec<_>>()];
        for &h in &hole_of[i] {
            loops.push(holes[h].0.iter().map(|&a| arr.arcs[a].oe).collect());
        }
        let domain = FaceDomain::from_edge_loops(store, map.clone(), &loops, tolerance, &tol)?;
        fragments.push(FaceFragment {
            source_face: face_id,
            source,
            loops,
            domain,
            unchanged: false,
        });
    }
    trace!(face = ?face_id, fragments = fragments.len(), "split face");
    Ok(SplitFace {
        fragments,
        warnings,
    })
}

/// Gives each hole to the smallest outer loop around it, by index. A hole
/// with no outer loop around it is dropped with a warning.
fn assign_holes(
    outers: &[(&[Point2], f64)],
    holes: &[&[Point2]],
    face: FaceId,
) -> (Vec<Vec<usize>>, Vec<Warning>) {
    let mut hole_of: Vec<Vec<usize>> = vec![Vec::new(); outers.len()];
    let mut warnings = Vec::new();
    for (h, poly) in holes.iter().enumerate() {
        let sample = poly[0];
        let host = outers
            .iter()
            .enumerate()
            .filter(|(_, (outer, _))| {
                point_in_polygon(&sample, outer)
                    && !outer.iter().any(|q| (q - sample).norm() < 1e-12)
            })
            .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
            .map(|(i, _)| i);
        match host {
            Some(i) => hole_of[i].push(h),
            None => warnings.push(Warning::DroppedHole { face }),
        }
    }
    (hole_of, warnings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::{Point3, ToleranceConfig, Vector3};
    use crate::operations::boolean::options::BooleanOptions;
    use crate::operations::boolean::pave::PaveFiller;
    use crate::operations::creation::{MakeBox, MakeCylinder};
    use crate::topology::Shape;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn filled(store: &mut TopologyStore, a: Shape, b: Shape) -> BopDs {
        let options = BooleanOptions::default().with_parallel(false);
        let mut ds = BopDs::new(store, a, b, ToleranceConfig::default()).unwrap();
        let mut filler = PaveFiller::new(store, &ds, &options).unwrap();
        filler.perform(store, &mut ds).unwrap();
        ds
    }

    fn area(fragment: &FaceFragment) -> f64 {
        fragment.domain.loops().iter().map(|lp| signed_area(lp)).sum()
    }

    #[test]
    fn untouched_face_is_one_unchanged_fragment() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let b = MakeBox::new(p(5.0, 0.0, 0.0), p(6.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let ds = filled(&mut store, a.into(), b.into());
        let f = ds.faces(Operand::A)[0];
        let split = split_face(&store, &ds, f, Operand::A).unwrap();
        assert_eq!(split.fragments.len(), 1);
        assert!(split.fragments[0].unchanged);
    }

    #[test]
    fn crossed_face_splits_into_fragments_covering_it() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0)).execute(&mut store).unwrap();
        let b = MakeBox::new(p(1.0, 1.0, 1.0), p(3.0, 3.0, 3.0)).execute(&mut store).unwrap();
        let ds = filled(&mut store, a.into(), b.into());
        let mut split_faces = 0;
        for &f in ds.faces(Operand::A) {
            let split = split_face(&store, &ds, f, Operand::A).unwrap();
            assert!(split.warnings.is_empty());
            let total: f64 = split.fragments.iter().map(area).sum();
            assert!((total - 4.0).abs() < 1e-9);
            if split.fragments.len() == 2 {
                split_faces += 1;
                let mut areas: Vec<f64> = split.fragments.iter().map(area).collect();
                areas.sort_by(f64::total_cmp);
                assert!((areas[0] - 1.0).abs() < 1e-9);
                assert!((areas[1] - 3.0).abs() < 1e-9);
            }
        }
        assert_eq!(split_faces, 3);
    }

    #[test]
    fn circle_inside_face_makes_island_and_hole() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(-2.0, -2.0, 0.0), p(2.0, 2.0, 2.0)).execute(&mut store).unwrap();
        let b = MakeCylinder::new(p(0.0, 0.0, -1.0), 1.0, Vector3::z(), 4.0)
            .execute(&mut store)
            .unwrap();
        let ds = filled(&mut store, a.into(), b.into());
        let top = ds
            .faces(Operand::A)
            .iter()
            .copied()
            .find(|&f| {
                let c = ds_center(&store, f);
                (c.z - 2.0).abs() < 1e-9
            })
            .unwrap();
        let split = split_face(&store, &ds, top, Operand::A).unwrap();
        assert_eq!(split.fragments.len(), 2);
        let with_hole = split.fragments.iter().filter(|f| f.loops.len() == 2).count();
        assert_eq!(with_hole, 1);
        let total: f64 = split.fragments.iter().map(area).sum();
        assert!((total - 16.0).abs() < 1e-6);
    }

    #[test]
    fn cylinder_side_splits_into_bands() {
        let mut store = TopologyStore::new();
        let a = MakeBox::new(p(-2.0, -2.0, 0.0), p(2.0, 2.0, 2.0)).execute(&mut store).unwrap();
        let b = MakeCylinder::new(p(0.0, 0.0, -1.0), 1.0, Vector3::z(), 4.0)
            .execute(&mut store)
            .unwrap();
        let ds = filled(&mut store, a.into(), b.into());
        let side = ds
            .faces(Operand::B)
            .iter()
            .copied()
            .find(|&f| store.face(f).unwrap().surface.as_plane().is_none())
            .unwrap();
        let split = split_face(&store, &ds, side, Operand::B).unwrap();
        assert_eq!(split.fragments.len(), 3);
        assert!(split.fragments.iter().all(|f| f.loops.len() == 1));
    }

    fn ds_center(store: &TopologyStore, f: FaceId) -> Point3 {
        let domain = FaceDomain::new(store, f, &ToleranceConfig::default()).unwrap();
        domain.bbox().center()
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64, ccw: bool) -> Vec<Point2> {
        let mut pts = vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ];
        if !ccw {
            pts.reverse();
        }
        pts
    }

    #[test]
    fn holes_go_to_the_tightest_outer_or_are_dropped() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(&mut store).unwrap();
        let face = store.faces_of(solid.into())[0];

        let big = square(0.0, 0.0, 4.0, 4.0, true);
        let small = square(1.0, 1.0, 3.0, 3.0, true);
        let nested = square(1.5, 1.5, 2.0, 2.0, false);
        let corner = square(0.2, 0.2, 0.5, 0.5, false);
        let stray = square(6.0, 6.0, 7.0, 7.0, false);

        let outers = [(big.as_slice(), signed_area(&big)), (small.as_slice(), signed_area(&small))];
        let holes = [nested.as_slice(), corner.as_slice(), stray.as_slice()];
        let (hole_of, warnings) = assign_holes(&outers, &holes, face);
        assert_eq!(hole_of, vec![vec![1], vec![0]]);
        assert_eq!(warnings, vec![Warning::DroppedHole { face }]);
    }
}
