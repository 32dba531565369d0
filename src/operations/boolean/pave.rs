//! Intersection phases of a boolean run.
//!
//! Interferences are computed in order of increasing dimension so that
//! each phase can reuse the vertices found by the previous ones:
//! vertex/vertex, vertex/edge, vertex/face, edge/edge, edge/face. Edges are
//! then split at their paves, overlapping pieces are merged into common
//! blocks, and face/face intersection produces the section edges.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::{OperationError, Result};
use crate::geometry::curve::{Curve, CurveGeom, Polyline};
use crate::geometry::surface::Surface;
use crate::math::{Aabb, Point3};
use crate::tessellation::{FaceDomain, PointState};
use crate::topology::{EdgeData, EdgeId, FaceId, OrientedEdge, Shape, TopologyStore, VertexId};

use super::ds::{BopDs, Interference, InterferenceKind, Operand, Pave};
use super::intersect::{
    intersect_curve_surface, intersect_curves, intersect_surfaces, IntersectResult, Locus, Param,
};
use super::options::BooleanOptions;
use super::report::Warning;

/// Maps `f` over `items`, on the rayon pool when `parallel` is set.
pub(super) fn map_items<T, R, F>(parallel: bool, items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

pub(super) fn check_cancelled(options: &BooleanOptions, ds: &BopDs) -> Result<()> {
    if options.is_cancelled() {
        return Err(OperationError::Cancelled {
            warnings: ds.warnings().len(),
        }
        .into());
    }
    Ok(())
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    (a.min(b), a.max(b))
}

/// Drops paves within `parametric` of the previous one. The paves at the
/// ends of the edge always survive: an inner pave too close to the last
/// one gives way to it.
fn thin_paves(paves: Vec<Pave>, parametric: f64) -> Vec<Pave> {
    let last = paves.len().saturating_sub(1);
    let mut kept: Vec<Pave> = Vec::with_capacity(paves.len());
    for (i, pave) in paves.into_iter().enumerate() {
        match kept.last() {
            Some(prev) if (pave.t - prev.t).abs() <= parametric => {
                if i == last && kept.len() > 1 {
                    kept.pop();
                    kept.push(pave);
                }
            }
            _ => kept.push(pave),
        }
    }
    kept
}

/// Loci of one intersected pair, or `None` once the reason they are
/// unknown is recorded as a warning.
fn settle(ds: &mut BopDs, result: IntersectResult, pair: &str) -> Option<Vec<Locus>> {
    match result {
        Ok(loci) => Some(loci),
        Err(diagnostic) => {
            debug!(%diagnostic, pair, "pair undetermined");
            ds.warn(diagnostic.into());
            None
        }
    }
}

/// Runs the intersection phases and fills the [`BopDs`].
pub struct PaveFiller<'a> {
    options: &'a BooleanOptions,
    domains: HashMap<FaceId, FaceDomain>,
    face_boxes: HashMap<FaceId, Aabb>,
    edge_boxes: HashMap<EdgeId, Aabb>,
    coincident_edges: Vec<(EdgeId, EdgeId)>,
    edges_on_faces: Vec<(EdgeId, FaceId)>,
}

impl<'a> PaveFiller<'a> {
    /// Samples the faces and edges of both operands.
    ///
    /// # Errors
    ///
    /// Returns an error if a face boundary cannot be sampled.
    pub fn new(store: &TopologyStore, ds: &BopDs, options: &'a BooleanOptions) -> Result<Self> {
        let tol = ds.tol();
        let mut domains = HashMap::new();
        let mut face_boxes = HashMap::new();
        for &f in ds.faces(Operand::A).iter().chain(ds.faces(Operand::B)) {
            let domain = FaceDomain::new(store, f, tol)?;
            face_boxes.insert(f, domain.surface_bbox(8));
            domains.insert(f, domain);
        }
        let mut edge_boxes = HashMap::new();
        for &e in ds.edges(Operand::A).iter().chain(ds.edges(Operand::B)) {
            let data = store.edge(e)?;
            let points = data
                .curve
                .sample_params(data.t_start, data.t_end, tol.deflection)
                .into_iter()
                .map(|t| data.curve.evaluate(t))
                .collect::<Result<Vec<_>>>()?;
            let margin = tol.linear(data.tolerance) + tol.deflection;
            edge_boxes.insert(e, Aabb::from_points(&points).expanded(margin));
        }
        Ok(Self {
            options,
            domains,
            face_boxes,
            edge_boxes,
            coincident_edges: Vec::new(),
            edges_on_faces: Vec::new(),
        })
    }

    /// The sampled domain of an original face.
    #[must_use]
    pub fn domain(&self, face: FaceId) -> Option<&FaceDomain> {
        self.domains.get(&face)
    }

    /// Runs every phase in order.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::Cancelled`] when the cancel token fires,
    /// or an error if the store is inconsistent.
    pub fn perform(&mut self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<()> {
        self.vertex_vertex(store, ds)?;
        self.vertex_edge(store, ds)?;
        self.vertex_face(store, ds)?;
        check_cancelled(self.options, ds)?;
        self.edge_edge(store, ds)?;
        check_cancelled(self.options, ds)?;
        self.edge_face(store, ds)?;
        check_cancelled(self.options, ds)?;
        self.split_edges(store, ds)?;
        self.common_blocks(store, ds)?;
        self.edges_in_faces(store, ds)?;
        self.face_face(store, ds)?;
        check_cancelled(self.options, ds)?;
        debug!(
            interferences = ds.interferences().len(),
            warnings = ds.warnings().len(),
            "intersection phases done"
        );
        Ok(())
    }

    fn vertex_vertex(&self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<()> {
        let mut merged = 0usize;
        for vb in ds.vertices(Operand::B).to_vec() {
            let data = store.vertex(vb)?.clone();
            let reach = ds.tol().linear(data.tolerance);
            match ds.find_vertex(store, &data.point, reach)? {
                Some((va, _)) if ds.owner(Shape::Vertex(va)) == Some(Operand::A) => {
                    ds.merge_vertex(store, va, vb)?;
                    ds.add_interference(Interference {
                        kind: InterferenceKind::VertexVertex,
                        first: Shape::Vertex(va),
                        second: Shape::Vertex(vb),
                        result: vec![Shape::Vertex(va)],
                    });
                    merged += 1;
                }
                _ => ds.register_vertex(store, vb)?,
            }
        }
        trace!(merged, "vertex/vertex");
        Ok(())
    }

    /// Vertices of an operand that were not merged into the other one.
    fn live_vertices(ds: &BopDs, operand: Operand) -> Vec<VertexId> {
        ds.vertices(operand)
            .iter()
            .copied()
            .filter(|&v| ds.real(v) == v)
            .collect()
    }

    fn vertex_edge(&self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<()> {
        let tol = *ds.tol();
        let mut pairs = Vec::new();
        for operand in [Operand::A, Operand::B] {
            for v in Self::live_vertices(ds, operand) {
                let p = store.point(v)?;
                for &e in ds.edges(operand.other()) {
                    let data = store.edge(e)?;
                    if ds.real(data.start) == v || ds.real(data.end) == v {
                        continue;
                    }
                    if self.edge_boxes.get(&e).is_some_and(|b| b.contains(&p)) {
                        pairs.push((v, e));
                    }
                }
            }
        }
        let found = {
            let store = &*store;
            map_items(self.options.run_parallel, &pairs, |&(v, e)| -> Result<Option<f64>> {
                let vertex = store.vertex(v)?;
                let data = store.edge(e)?;
                let t = data.curve.parameter_in_range(&vertex.point, data.t_start, data.t_end);
                let (lo, hi) = ordered(data.t_start, data.t_end);
                if t <= lo + tol.parametric || t >= hi - tol.parametric {
                    return Ok(None);
                }
                let d = (data.curve.evaluate(t)? - vertex.point).norm();
                let reach = tol.linear(vertex.tolerance) + tol.linear(data.tolerance);
                Ok((d <= reach).then_some(t))
            })
        };
        for (&(v, e), t) in pairs.iter().zip(found) {
            if let Some(t) = t? {
                ds.add_pave(e, t, v);
                ds.add_interference(Interference {
                    kind: InterferenceKind::VertexEdge,
                    first: Shape::Vertex(v),
                    second: Shape::Edge(e),
                    result: vec![Shape::Vertex(v)],
                });
            }
        }
        Ok(())
    }

    fn vertex_face(&self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<()> {
        let tol = *ds.tol();
        let mut pairs = Vec::new();
        for operand in [Operand::A, Operand::B] {
            for v in Self::live_vertices(ds, operand) {
                let p = store.point(v)?;
                for &f in ds.faces(operand.other()) {
                    if self.face_boxes.get(&f).is_some_and(|b| b.contains(&p)) {
                        let on_boundary = store
                            .vertices_of(Shape::Face(f))
                            .into_iter()
                            .any(|w| ds.real(w) == v);
                        if !on_boundary {
                            pairs.push((v, f));
                        }
                    }
                }
            }
        }
        let found = {
            let store = &*store;
            map_items(self.options.run_parallel, &pairs, |&(v, f)| -> Result<bool> {
                let vertex = store.vertex(v)?;
                let face = store.face(f)?;
                let Some(domain) = self.domains.get(&f) else {
                    return Ok(false);
                };
                let reach = tol.linear(vertex.tolerance) + tol.linear(face.tolerance);
                Ok(face.surface.signed_distance(&vertex.point).abs() <= reach
                    && domain.classify_point(&vertex.point) == PointState::Inside)
            })
        };
        for (&(v, f), hit) in pairs.iter().zip(found) {
            if hit? {
                ds.add_face_vertex(f, v);
                ds.add_interference(Interference {
                    kind: InterferenceKind::VertexFace,
                    first: Shape::Vertex(v),
                    second: Shape::Face(f),
                    result: vec![Shape::Vertex(v)],
                });
            }
        }
        Ok(())
    }

    fn edge_edge(&mut self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<()> {
        let tol = *ds.tol();
        let mut pairs = Vec::new();
        for &ea in ds.edges(Operand::A) {
            for &eb in ds.edges(Operand::B) {
                if let (Some(ba), Some(bb)) = (self.edge_boxes.get(&ea), self.edge_boxes.get(&eb)) {
                    if ba.overlaps(bb) {
                        pairs.push((ea, eb));
                    }
                }
            }
        }
        let options = self.options;
        let results = {
            let store = &*store;
            map_items(options.run_parallel, &pairs, |&(ea, eb)| -> Result<_> {
                if options.is_cancelled() {
                    return Ok(Ok(Vec::new()));
                }
                let (a, b) = (store.edge(ea)?, store.edge(eb)?);
                let reach = tol.linear(a.tolerance) + tol.linear(b.tolerance);
                Ok(intersect_curves(
                    &a.curve,
                    (a.t_start, a.t_end),
                    &b.curve,
                    (b.t_start, b.t_end),
                    reach,
                    &tol,
                ))
            })
        };
        for (&(ea, eb), result) in pairs.iter().zip(results) {
            let Some(loci) = settle(ds, result?, "edge/edge") else {
                continue;
            };
            let reach = tol.linear(store.edge(ea)?.tolerance.max(store.edge(eb)?.tolerance));
            for locus in loci {
                match locus {
                    Locus::Point {
                        point,
                        first: Param::Curve(s),
                        second: Param::Curve(t),
                        ..
                    } => {
                        let v = place_vertex(store, ds, point, reach, &[(ea, s), (eb, t)])?;
                        ds.add_interference(Interference {
                            kind: InterferenceKind::EdgeEdge,
                            first: Shape::Edge(ea),
                            second: Shape::Edge(eb),
                            result: vec![Shape::Vertex(v)],
                        });
                    }
                    Locus::Coincident {
                        first: Some((s0, s1)),
                        second: Some((t0, t1)),
                    } => {
                        for (s, t) in [(s0, t0), (s1, t1)] {
                            let point = store.edge(ea)?.curve.evaluate(s)?;
                            place_vertex(store, ds, point, reach, &[(ea, s), (eb, t)])?;
                        }
                        self.coincident_edges.push((ea, eb));
                        ds.add_interference(Interference {
                            kind: InterferenceKind::EdgeEdge,
                            first: Shape::Edge(ea),
                            second: Shape::Edge(eb),
                            result: Vec::new(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn edge_face(&mut self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<()> {
        let tol = *ds.tol();
        let mut pairs = Vec::new();
        for operand in [Operand::A, Operand::B] {
            for &e in ds.edges(operand) {
                for &f in ds.faces(operand.other()) {
                    if let (Some(be), Some(bf)) = (self.edge_boxes.get(&e), self.face_boxes.get(&f)) {
                        if be.overlaps(bf) {
                            pairs.push((e, f));
                        }
                    }
                }
            }
        }
        let options = self.options;
        let results = {
            let store = &*store;
            map_items(options.run_parallel, &pairs, |&(e, f)| -> Result<_> {
                if options.is_cancelled() {
                    return Ok(Ok(Vec::new()));
                }
                let (edge, face) = (store.edge(e)?, store.face(f)?);
                let reach = tol.linear(edge.tolerance) + tol.linear(face.tolerance);
                Ok(intersect_curve_surface(
                    &edge.curve,
                    (edge.t_start, edge.t_end),
                    &face.surface,
                    reach,
                    &tol,
                ))
            })
        };
        for (&(e, f), result) in pairs.iter().zip(results) {
            let Some(loci) = settle(ds, result?, "edge/face") else {
                continue;
            };
            let Some(domain) = self.domains.get(&f) else {
                continue;
            };
            let reach = tol.linear(store.edge(e)?.tolerance.max(store.face(f)?.tolerance));
            for locus in loci {
                match locus {
                    Locus::Point {
                        point,
                        first: Param::Curve(t),
                        tangent,
                        ..
                    } => {
                        if domain.classify_point(&point) != PointState::Inside {
                            continue;
                        }
                        let v = place_vertex(store, ds, point, reach, &[(e, t)])?;
                        ds.add_face_vertex(f, v);
                        if tangent {
                            ds.warn(Warning::TangentialContact { near: point });
                        }
                        ds.add_interference(Interference {
                            kind: InterferenceKind::EdgeFace,
                            first: Shape::Edge(e),
                            second: Shape::Face(f),
                            result: vec![Shape::Vertex(v)],
                        });
                    }
                    Locus::Coincident { first: Some(_), .. } => {
                        self.edges_on_faces.push((e, f));
                        ds.add_interference(Interference {
                            kind: InterferenceKind::EdgeFace,
                            first: Shape::Edge(e),
                            second: Shape::Face(f),
                            result: Vec::new(),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Cuts every original edge at its paves. Edges with no paves and
    /// unmerged ends are kept as they are.
    fn split_edges(&self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<()> {
        let tol = *ds.tol();
        let edges: Vec<EdgeId> = ds
            .edges(Operand::A)
            .iter()
            .chain(ds.edges(Operand::B))
            .copied()
            .collect();
        let mut created = 0usize;
        for e in edges {
            let data = store.edge(e)?.clone();
            let (start, end) = (ds.real(data.start), ds.real(data.end));
            let dir = if data.t_end >= data.t_start { 1.0 } else { -1.0 };
            let mut inner: Vec<Pave> = ds.paves(e).to_vec();
            inner.sort_by(|a, b| (dir * a.t).total_cmp(&(dir * b.t)));

            if inner.is_empty() && start == data.start && end == data.end {
                ds.set_splits(e, vec![OrientedEdge::new(e, true)]);
                continue;
            }

            let mut paves = vec![Pave {
                vertex: start,
                t: data.t_start,
            }];
            paves.extend(inner);
            paves.push(Pave {
                vertex: end,
                t: data.t_end,
            });

            let reach = tol.linear(data.tolerance);
            let mut kept: Vec<Pave> = Vec::with_capacity(paves.len());
            for pave in thin_paves(paves, tol.parametric) {
                if let Some(prev) = kept.last() {
                    if pave.vertex == prev.vertex {
                        let mid = data.curve.evaluate(0.5 * (prev.t + pave.t))?;
                        let vertex = store.vertex(pave.vertex)?;
                        if (mid - vertex.point).norm() <= reach + tol.linear(vertex.tolerance) {
                            continue;
                        }
                    }
                }
                kept.push(pave);
            }
            if kept.len() < 2 {
                ds.set_splits(e, Vec::new());
                continue;
            }

            let mut pieces = Vec::with_capacity(kept.len() - 1);
            for pair in kept.windows(2) {
                let (p0, p1) = (pair[0], pair[1]);
                for pave in [p0, p1] {
                    let on_curve = data.curve.evaluate(pave.t)?;
                    let d = (on_curve - store.point(pave.vertex)?).norm();
                    ds.grow_tolerance(store, pave.vertex, d)?;
                }
                let mut piece = EdgeData::new(p0.vertex, p1.vertex, data.curve.clone(), p0.t, p1.t);
                piece.tolerance = data.tolerance;
                pieces.push(OrientedEdge::new(ds.new_edge(store, piece), true));
                created += 1;
            }
            ds.set_splits(e, pieces);
        }
        trace!(created, "split edges");
        Ok(())
    }

    /// Replaces pieces of the second operand that run along a piece of the
    /// first by that piece.
    fn common_blocks(&self, store: &TopologyStore, ds: &mut BopDs) -> Result<()> {
        let tol = *ds.tol();
        let mut seen = HashSet::new();
        let mut blocks = 0usize;
        for &(ea, eb) in &self.coincident_edges {
            if !seen.insert((ea, eb)) {
                continue;
            }
            for pb in ds.splits(eb).to_vec() {
                if ds.is_replaced(pb.edge) {
                    continue;
                }
                let b = store.edge(pb.edge)?;
                for pa in ds.splits(ea).to_vec() {
                    let a = store.edge(pa.edge)?;
                    let same_ends = (a.start == b.start && a.end == b.end)
                        || (a.start == b.end && a.end == b.start);
                    if !same_ends {
                        continue;
                    }
                    let mid = b.midpoint()?;
                    let ta = a.curve.parameter_in_range(&mid, a.t_start, a.t_end);
                    let reach = tol.linear(a.tolerance) + tol.linear(b.tolerance);
                    if (a.curve.evaluate(ta)? - mid).norm() > reach {
                        continue;
                    }
                    let forward = if a.start == a.end {
                        let tb = 0.5 * (b.t_start + b.t_end);
                        let sa = if a.t_end >= a.t_start { 1.0 } else { -1.0 };
                        let sb = if b.t_end >= b.t_start { 1.0 } else { -1.0 };
                        sa * sb * a.curve.tangent(ta)?.dot(&b.curve.tangent(tb)?) > 0.0
                    } else {
                        a.start == b.start
                    };
                    ds.add_common(pb.edge, OrientedEdge::new(pa.edge, forward));
                    blocks += 1;
                    break;
                }
            }
        }
        trace!(blocks, "common blocks");
        Ok(())
    }

    /// Pieces of an edge lying on the surface of a face of the other
    /// operand become in-edges of that face when they are inside it.
    fn edges_in_faces(&self, store: &TopologyStore, ds: &mut BopDs) -> Result<()> {
        let tol = *ds.tol();
        for &(e, f) in &self.edges_on_faces {
            let Some(domain) = self.domains.get(&f) else {
                continue;
            };
            let face = store.face(f)?;
            for piece in ds.pieces(OrientedEdge::new(e, true)) {
                let data = store.edge(piece.edge)?;
                let mid = data.midpoint()?;
                let reach = tol.linear(data.tolerance) + tol.linear(face.tolerance);
                if face.surface.signed_distance(&mid).abs() <= reach
                    && domain.classify_point(&mid) == PointState::Inside
                {
                    ds.add_in_edge(f, piece.edge);
                }
            }
        }
        Ok(())
    }

    fn face_face(&self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<()> {
        let tol = *ds.tol();
        let mut pairs = Vec::new();
        for &fa in ds.faces(Operand::A) {
            for &fb in ds.faces(Operand::B) {
                if let (Some(ba), Some(bb)) = (self.face_boxes.get(&fa), self.face_boxes.get(&fb)) {
                    if ba.overlaps(bb) {
                        pairs.push((fa, fb));
                    }
                }
            }
        }
        let options = self.options;
        let results = {
            let store = &*store;
            map_items(options.run_parallel, &pairs, |&(fa, fb)| -> Result<_> {
                if options.is_cancelled() {
                    return Ok(Ok(Vec::new()));
                }
                let (Some(da), Some(db)) = (self.domains.get(&fa), self.domains.get(&fb)) else {
                    return Ok(Ok(Vec::new()));
                };
                let reach =
                    tol.linear(store.face(fa)?.tolerance) + tol.linear(store.face(fb)?.tolerance);
                Ok(intersect_surfaces(da, db, reach, &tol))
            })
        };
        let mut sections = 0usize;
        for (&(fa, fb), result) in pairs.iter().zip(results) {
            let Some(loci) = settle(ds, result?, "face/face") else {
                continue;
            };
            let (Some(da), Some(db)) = (self.domains.get(&fa), self.domains.get(&fb)) else {
                continue;
            };
            let mut made = Vec::new();
            for locus in loci {
                match locus {
                    Locus::Coincident { .. } => {
                        if overlap_area(da, db, tol.confusion) {
                            ds.add_coincident_faces(fa, fb);
                            ds.warn(Warning::CoincidentFaces {
                                first: fa,
                                second: fb,
                            });
                        }
                    }
                    Locus::Point { point, tangent, .. } => {
                        if tangent
                            && da.classify_point(&point) != PointState::Outside
                            && db.classify_point(&point) != PointState::Outside
                        {
                            ds.warn(Warning::TangentialContact { near: point });
                        }
                    }
                    Locus::Curve {
                        curve,
                        range,
                        closed,
                    } => {
                        let section = SectionCurve {
                            faces: (fa, fb),
                            domains: (da, db),
                            curve: &curve,
                            range,
                            closed,
                        };
                        made.extend(section.trim(store, ds)?);
                    }
                }
            }
            if !made.is_empty() {
                sections += made.len();
                ds.add_interference(Interference {
                    kind: InterferenceKind::FaceFace,
                    first: Shape::Face(fa),
                    second: Shape::Face(fb),
                    result: made.into_iter().map(Shape::Edge).collect(),
                });
            }
        }
        debug!(pairs = pairs.len(), sections, "face/face");
        Ok(())
    }
}

/// Returns a vertex for a contact point on the given edges and records a
/// pave on every edge the point is interior to.
///
/// A point within reach of an end vertex of one of the edges takes that
/// vertex.
fn place_vertex(
    store: &mut TopologyStore,
    ds: &mut BopDs,
    point: Point3,
    tolerance: f64,
    on: &[(EdgeId, f64)],
) -> Result<VertexId> {
    let tol = *ds.tol();
    let mut end_vertex = None;
    let mut interior = Vec::new();
    for &(e, t) in on {
        let data = store.edge(e)?;
        let mut at_end = None;
        for (v, te) in [(data.start, data.t_start), (data.end, data.t_end)] {
            let v = ds.real(v);
            let reach = tol.linear(store.vertex(v)?.tolerance) + tolerance;
            if (t - te).abs() <= tol.parametric || (store.point(v)? - point).norm() <= reach {
                at_end = Some(v);
                break;
            }
        }
        match at_end {
            Some(v) => end_vertex = end_vertex.or(Some(v)),
            None => interior.push((e, t)),
        }
    }
    let v = match end_vertex {
        Some(v) => {
            let d = (store.point(v)? - point).norm();
            ds.grow_tolerance(store, v, d + tol.confusion)?;
            v
        }
        None => ds.new_vertex(store, point, tolerance)?,
    };
    for (e, t) in interior {
        ds.add_pave(e, t, v);
    }
    Ok(v)
}

/// `true` if two faces on the same surface share some area.
fn overlap_area(a: &FaceDomain, b: &FaceDomain, tolerance: f64) -> bool {
    let common = a.bbox().intersection(b.bbox());
    if common.is_empty() {
        return false;
    }
    let extent = common.max - common.min;
    let spread = (0..3).filter(|&i| extent[i] > 10.0 * tolerance).count();
    if spread < 2 {
        return false;
    }
    // The boxes of curved faces overlap far more often than the faces do.
    let center = common.center();
    a.map().surface().as_plane().is_some()
        || (a.classify_point(&center) != PointState::Outside
            && b.classify_point(&center) != PointState::Outside)
}

/// One surface/surface intersection curve being cut into section edges.
struct SectionCurve<'c> {
    faces: (FaceId, FaceId),
    domains: (&'c FaceDomain, &'c FaceDomain),
    curve: &'c CurveGeom,
    range: (f64, f64),
    closed: bool,
}

impl SectionCurve<'_> {
    /// Vertices of both faces that lie on the curve, with their curve
    /// parameters, sorted along the curve.
    fn vertices_on_curve(
        &self,
        store: &TopologyStore,
        ds: &BopDs,
        reach: f64,
    ) -> Result<Vec<(f64, VertexId)>> {
        let tol = ds.tol();
        let (fa, fb) = self.faces;
        let mut cands: Vec<VertexId> = Vec::new();
        cands.extend_from_slice(ds.face_vertices(fa));
        cands.extend_from_slice(ds.face_vertices(fb));
        for f in [fa, fb] {
            cands.extend(boundary_vertices(store, ds, f)?);
        }
        let mut seen = HashSet::new();
        let (lo, hi) = ordered(self.range.0, self.range.1);
        let mut on_curve = Vec::new();
        for v in cands {
            if !seen.insert(v) {
                continue;
            }
            let vertex = store.vertex(v)?;
            let t = self.curve.parameter_in_range(&vertex.point, lo, hi);
            if t < lo - tol.parametric || t > hi + tol.parametric {
                continue;
            }
            let t = t.clamp(lo, hi);
            let d = (self.curve.evaluate(t)? - vertex.point).norm();
            if d <= tol.linear(vertex.tolerance) + reach {
                on_curve.push((t, v));
            }
        }
        on_curve.sort_by(|a, b| a.0.total_cmp(&b.0));
        if self.closed && on_curve.len() > 1 {
            if let (Some(first), Some(last)) = (on_curve.first(), on_curve.last()) {
                if first.1 == last.1 {
                    on_curve.pop();
                }
            }
        }
        Ok(on_curve)
    }

    /// Splits the curve at vertices on both faces and keeps the pieces
    /// lying on both faces. Returns the section edges created.
    fn trim(&self, store: &mut TopologyStore, ds: &mut BopDs) -> Result<Vec<EdgeId>> {
        let tol = *ds.tol();
        let (fa, fb) = self.faces;
        let base = tol.linear(store.face(fa)?.tolerance.max(store.face(fb)?.tolerance));
        let reach = match self.curve {
            CurveGeom::Line(_) => base,
            _ => base + tol.deflection,
        };
        let (lo, hi) = ordered(self.range.0, self.range.1);
        let mut stops = self.vertices_on_curve(store, ds, reach)?;

        // Each piece: curve, parameter range and end vertices.
        let mut pieces: Vec<(CurveGeom, f64, f64, VertexId, VertexId)> = Vec::new();
        if self.closed {
            if stops.is_empty() {
                let v = ds.new_vertex(store, self.curve.evaluate(lo)?, reach)?;
                stops.push((lo, v));
            }
            for pair in stops.windows(2) {
                pieces.push((self.curve.clone(), pair[0].0, pair[1].0, pair[0].1, pair[1].1));
            }
            if let (Some(&(t_last, v_last)), Some(&(t_first, v_first))) =
                (stops.last(), stops.first())
            {
                if (hi - t_last) + (t_first - lo) > tol.parametric {
                    let (curve, t0, t1) =
                        wrap_piece(self.curve, lo, hi, t_last, t_first, tol.deflection)?;
                    pieces.push((curve, t0, t1, v_last, v_first));
                }
            }
        } else {
            for pair in stops.windows(2) {
                pieces.push((self.curve.clone(), pair[0].0, pair[1].0, pair[0].1, pair[1].1));
            }
        }

        let (da, db) = self.domains;
        let mut made = Vec::new();
        for (curve, t0, t1, v0, v1) in pieces {
            if (t1 - t0).abs() <= tol.parametric {
                continue;
            }
            let mid = curve.evaluate(0.5 * (t0 + t1))?;
            if v0 == v1 && (mid - store.point(v0)?).norm() <= reach {
                continue;
            }
            let (sa, sb) = (da.classify_point(&mid), db.classify_point(&mid));
            match (sa, sb) {
                (PointState::Outside, _) | (_, PointState::Outside) => {}
                (PointState::Boundary, PointState::Boundary) => {}
                (PointState::Boundary, PointState::Inside) => {
                    if let Some(e) = boundary_piece(store, ds, fa, v0, v1, &mid, reach)? {
                        ds.add_in_edge(fb, e);
                    }
                }
                (PointState::Inside, PointState::Boundary) => {
                    if let Some(e) = boundary_piece(store, ds, fb, v0, v1, &mid, reach)? {
                        ds.add_in_edge(fa, e);
                    }
                }
                (PointState::Inside, PointState::Inside) => {
                    if let Some(e) = existing_section(store, ds, fa, v0, v1, &mid, reach)? {
                        ds.add_section_edge(fb, e);
                        continue;
                    }
                    for (v, t) in [(v0, t0), (v1, t1)] {
                        let d = (curve.evaluate(t)? - store.point(v)?).norm();
                        ds.grow_tolerance(store, v, d)?;
                    }
                    let mut data = EdgeData::new(v0, v1, curve, t0, t1);
                    data.tolerance = reach;
                    let e = ds.new_edge(store, data);
                    for f in [fa, fb] {
                        ds.add_section_edge(f, e);
                        ds.record_generated(Shape::Face(f), Shape::Edge(e));
                    }
                    made.push(e);
                }
            }
        }
        Ok(made)
    }
}

/// Re-parametrizes the part of a closed curve running from `from` past
/// the closing point to `to` as one polyline.
fn wrap_piece(
    curve: &CurveGeom,
    lo: f64,
    hi: f64,
    from: f64,
    to: f64,
    deflection: f64,
) -> Result<(CurveGeom, f64, f64)> {
    let mut points = Vec::new();
    for t in curve.sample_params(from, hi, deflection) {
        points.push(curve.evaluate(t)?);
    }
    for t in curve.sample_params(lo, to, deflection).into_iter().skip(1) {
        points.push(curve.evaluate(t)?);
    }
    points.dedup_by(|a, b| (*a - *b).norm() < 1e-12);
    #[allow(clippy::cast_precision_loss)]
    let last = (points.len().max(2) - 1) as f64;
    Ok((CurveGeom::Polyline(Polyline::new(points)?), 0.0, last))
}

/// Vertices of a face boundary after splitting.
fn boundary_vertices(store: &TopologyStore, ds: &BopDs, face: FaceId) -> Result<Vec<VertexId>> {
    let mut out = Vec::new();
    for lp in store.face_loops(face)? {
        for oe in lp {
            for piece in ds.pieces(oe) {
                out.push(store.oriented_ends(piece)?.0);
            }
        }
    }
    Ok(out)
}

fn same_edge(
    store: &TopologyStore,
    e: EdgeId,
    v0: VertexId,
    v1: VertexId,
    mid: &Point3,
    reach: f64,
) -> Result<bool> {
    let data = store.edge(e)?;
    let ends = (data.start == v0 && data.end == v1) || (data.start == v1 && data.end == v0);
    if !ends {
        return Ok(false);
    }
    let t = data.curve.parameter_in_range(mid, data.t_start, data.t_end);
    Ok((data.curve.evaluate(t)? - mid).norm() <= reach + data.tolerance)
}

/// The split boundary edge of `face` running between `v0` and `v1`
/// through `mid`.
fn boundary_piece(
    store: &TopologyStore,
    ds: &BopDs,
    face: FaceId,
    v0: VertexId,
    v1: VertexId,
    mid: &Point3,
    reach: f64,
) -> Result<Option<EdgeId>> {
    for lp in store.face_loops(face)? {
        for oe in lp {
            for piece in ds.pieces(oe) {
                if same_edge(store, piece.edge, v0, v1, mid, reach)? {
                    return Ok(Some(piece.edge));
                }
            }
        }
    }
    Ok(None)
}

/// A section edge already made on `face` between `v0` and `v1`.
fn existing_section(
    store: &TopologyStore,
    ds: &BopDs,
    face: FaceId,
    v0: VertexId,
    v1: VertexId,
    mid: &Point3,
    reach: f64,
) -> Result<Option<EdgeId>> {
    for &e in ds.section_edges(face) {
        if same_edge(store, e, v0, v1, mid, reach)? {
            return Ok(Some(e));
        }
    }
    Ok(None)
}
