//! Shared state of one boolean run.
//!
//! The structure owns nothing geometric: every vertex, edge and face lives
//! in the [`TopologyStore`]. What it adds are the side tables the phases
//! hand to each other: merged vertices, paves on edges, split and common
//! edges, section curves per face, interferences and provenance.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::Result;
use crate::math::{Point3, ToleranceConfig};
use crate::topology::{
    EdgeData, EdgeId, FaceData, FaceId, OrientedEdge, Shape, TopologyStore, VertexData, VertexId,
};

use super::report::Warning;

/// Which argument of the boolean a shape belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    A,
    B,
}

impl Operand {
    /// The other argument.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Dimension pair of an interference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterferenceKind {
    VertexVertex,
    VertexEdge,
    VertexFace,
    EdgeEdge,
    EdgeFace,
    FaceFace,
}

/// A recorded contact between a sub-shape of each operand.
#[derive(Debug, Clone)]
pub struct Interference {
    pub kind: InterferenceKind,
    pub first: Shape,
    pub second: Shape,
    /// Shapes standing for the contact: the vertex of a point contact or
    /// the section edges of a face pair. Empty for coincidences.
    pub result: Vec<Shape>,
}

/// A vertex placed on an edge at curve parameter `t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pave {
    pub vertex: VertexId,
    pub t: f64,
}

#[derive(Debug, Default)]
struct Side {
    root: Option<Shape>,
    vertices: Vec<VertexId>,
    edges: Vec<EdgeId>,
    faces: Vec<FaceId>,
}

type CellKey = (i64, i64, i64);

/// Side tables of a boolean run.
#[derive(Debug)]
pub struct BopDs {
    tol: ToleranceConfig,
    sides: [Side; 2],
    owner: HashMap<Shape, Operand>,
    cell: f64,
    grid: HashMap<CellKey, Vec<VertexId>>,
    same_domain: HashMap<VertexId, VertexId>,
    paves: HashMap<EdgeId, Vec<Pave>>,
    splits: HashMap<EdgeId, Vec<OrientedEdge>>,
    common: HashMap<EdgeId, OrientedEdge>,
    face_vertices: HashMap<FaceId, Vec<VertexId>>,
    section_edges: HashMap<FaceId, Vec<EdgeId>>,
    in_edges: HashMap<FaceId, Vec<EdgeId>>,
    interferences: Vec<Interference>,
    coincident_faces: Vec<(FaceId, FaceId)>,
    modified: HashMap<Shape, Vec<Shape>>,
    generated: HashMap<Shape, Vec<Shape>>,
    created: HashSet<Shape>,
    kept: HashSet<Shape>,
    warnings: Vec<Warning>,
}

impl BopDs {
    /// Collects the sub-shapes of both operands.
    ///
    /// Vertices of `a` are registered in the vertex table; vertices of `b`
    /// are registered by the vertex/vertex phase once it has decided which
    /// of them merge into `a`.
    ///
    /// # Errors
    ///
    /// Returns an error if an operand references a missing entity.
    pub fn new(store: &TopologyStore, a: Shape, b: Shape, tol: ToleranceConfig) -> Result<Self> {
        let mut ds = Self {
            tol,
            sides: [Side::default(), Side::default()],
            owner: HashMap::new(),
            cell: tol.deflection.max(10.0 * tol.confusion),
            grid: HashMap::new(),
            same_domain: HashMap::new(),
            paves: HashMap::new(),
            splits: HashMap::new(),
            common: HashMap::new(),
            face_vertices: HashMap::new(),
            section_edges: HashMap::new(),
            in_edges: HashMap::new(),
            interferences: Vec::new(),
            coincident_faces: Vec::new(),
            modified: HashMap::new(),
            generated: HashMap::new(),
            created: HashSet::new(),
            kept: HashSet::new(),
            warnings: Vec::new(),
        };
        for (operand, root) in [(Operand::A, a), (Operand::B, b)] {
            let side = Side {
                root: Some(root),
                vertices: store.vertices_of(root),
                edges: store.edges_of(root),
                faces: store.faces_of(root),
            };
            for &v in &side.vertices {
                ds.owner.insert(Shape::Vertex(v), operand);
            }
            for &e in &side.edges {
                ds.owner.insert(Shape::Edge(e), operand);
            }
            for &f in &side.faces {
                ds.owner.insert(Shape::Face(f), operand);
            }
            ds.sides[operand.index()] = side;
        }
        for i in 0..ds.sides[0].vertices.len() {
            let v = ds.sides[0].vertices[i];
            ds.register_vertex(store, v)?;
        }
        Ok(ds)
    }

    /// Numerical policy of the run, fuzzy value included.
    #[must_use]
    pub fn tol(&self) -> &ToleranceConfig {
        &self.tol
    }

    /// The root shape of an operand.
    #[must_use]
    pub fn root(&self, operand: Operand) -> Option<Shape> {
        self.sides[operand.index()].root
    }

    #[must_use]
    pub fn vertices(&self, operand: Operand) -> &[VertexId] {
        &self.sides[operand.index()].vertices
    }

    #[must_use]
    pub fn edges(&self, operand: Operand) -> &[EdgeId] {
        &self.sides[operand.index()].edges
    }

    #[must_use]
    pub fn faces(&self, operand: Operand) -> &[FaceId] {
        &self.sides[operand.index()].faces
    }

    /// The operand an original sub-shape belongs to.
    #[must_use]
    pub fn owner(&self, shape: Shape) -> Option<Operand> {
        self.owner.get(&shape).copied()
    }

    // ---- vertices ----

    fn key(&self, p: &Point3) -> CellKey {
        #[allow(clippy::cast_possible_truncation)]
        let q = |x: f64| (x / self.cell).floor() as i64;
        (q(p.x), q(p.y), q(p.z))
    }

    /// Adds a vertex to the lookup table without merging it.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is missing.
    pub fn register_vertex(&mut self, store: &TopologyStore, v: VertexId) -> Result<()> {
        let key = self.key(&store.point(v)?);
        self.grid.entry(key).or_default().push(v);
        Ok(())
    }

    /// The nearest registered vertex whose tolerance sphere, grown by
    /// `radius`, contains `p`. Returns the vertex and its distance.
    ///
    /// # Errors
    ///
    /// Returns an error if a registered vertex is missing.
    pub fn find_vertex(
        &self,
        store: &TopologyStore,
        p: &Point3,
        radius: f64,
    ) -> Result<Option<(VertexId, f64)>> {
        let (cx, cy, cz) = self.key(p);
        let reach = radius + self.cell;
        #[allow(clippy::cast_possible_truncation)]
        let k = ((reach / self.cell).ceil() as i64).clamp(1, 8);
        let mut best: Option<(VertexId, f64)> = None;
        for dx in -k..=k {
            for dy in -k..=k {
                for dz in -k..=k {
                    let Some(cands) = self.grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &v in cands {
                        let data = store.vertex(v)?;
                        let d = (data.point - p).norm();
                        let reach_v = self.tol.linear(data.tolerance) + radius;
                        if d <= reach_v && best.map_or(true, |(_, bd)| d < bd) {
                            best = Some((v, d));
                        }
                    }
                }
            }
        }
        Ok(best)
    }

    /// Returns a vertex at `p`: an existing one within reach, grown to
    /// cover `p`, or a new one with the given tolerance.
    ///
    /// # Errors
    ///
    /// Returns an error if a registered vertex is missing.
    pub fn new_vertex(
        &mut self,
        store: &mut TopologyStore,
        p: Point3,
        tolerance: f64,
    ) -> Result<VertexId> {
        let tolerance = self.tol.linear(tolerance);
        if let Some((v, d)) = self.find_vertex(store, &p, tolerance)? {
            self.grow_tolerance(store, v, d + tolerance)?;
            return Ok(v);
        }
        let v = store.add_vertex(VertexData::with_tolerance(p, tolerance));
        self.created.insert(Shape::Vertex(v));
        self.register_vertex(store, v)?;
        Ok(v)
    }

    /// Raises the tolerance of `v` to at least `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex is missing.
    pub fn grow_tolerance(&self, store: &mut TopologyStore, v: VertexId, to: f64) -> Result<()> {
        let data = store.vertex_mut(v)?;
        if to > data.tolerance {
            data.tolerance = to;
        }
        Ok(())
    }

    /// Records that `merged` is the same vertex as `keep`.
    ///
    /// # Errors
    ///
    /// Returns an error if either vertex is missing.
    pub fn merge_vertex(
        &mut self,
        store: &mut TopologyStore,
        keep: VertexId,
        merged: VertexId,
    ) -> Result<()> {
        let keep = self.real(keep);
        if keep == merged {
            return Ok(());
        }
        let other = store.vertex(merged)?.clone();
        let d = (store.point(keep)? - other.point).norm();
        self.grow_tolerance(store, keep, d + other.tolerance)?;
        self.same_domain.insert(merged, keep);
        self.record_modified(Shape::Vertex(merged), Shape::Vertex(keep));
        Ok(())
    }

    /// The vertex that stands for `v` after merging.
    #[must_use]
    pub fn real(&self, v: VertexId) -> VertexId {
        let mut cur = v;
        while let Some(&next) = self.same_domain.get(&cur) {
            if next == cur {
                break;
            }
            cur = next;
        }
        cur
    }

    // ---- edges ----

    pub fn add_pave(&mut self, edge: EdgeId, t: f64, vertex: VertexId) {
        let vertex = self.real(vertex);
        let paves = self.paves.entry(edge).or_default();
        if !paves.iter().any(|p| p.vertex == vertex && (p.t - t).abs() <= self.tol.parametric) {
            paves.push(Pave { vertex, t });
        }
    }

    /// Interior paves recorded on an original edge.
    #[must_use]
    pub fn paves(&self, edge: EdgeId) -> &[Pave] {
        self.paves.get(&edge).map_or(&[], Vec::as_slice)
    }

    /// Stores the pieces an original edge was split into, in the edge's
    /// own direction.
    pub fn set_splits(&mut self, edge: EdgeId, pieces: Vec<OrientedEdge>) {
        for piece in &pieces {
            if piece.edge != edge {
                self.record_modified(Shape::Edge(edge), Shape::Edge(piece.edge));
            }
        }
        self.splits.insert(edge, pieces);
    }

    /// Raw split pieces of an original edge, before common-block
    /// substitution.
    #[must_use]
    pub fn splits(&self, edge: EdgeId) -> &[OrientedEdge] {
        self.splits.get(&edge).map_or(&[], Vec::as_slice)
    }

    /// Declares that split piece `piece` is geometrically the same edge as
    /// `representative`, traversed in the direction given by its
    /// orientation.
    pub fn add_common(&mut self, piece: EdgeId, representative: OrientedEdge) {
        if piece != representative.edge {
            self.common.insert(piece, representative);
        }
    }

    /// `true` if `piece` was replaced by a piece of the other operand.
    #[must_use]
    pub fn is_replaced(&self, piece: EdgeId) -> bool {
        self.common.contains_key(&piece)
    }

    /// The edge actually used for an oriented piece.
    #[must_use]
    pub fn image(&self, oe: OrientedEdge) -> OrientedEdge {
        match self.common.get(&oe.edge) {
            Some(rep) if oe.is_forward() => *rep,
            Some(rep) => rep.reversed(),
            None => oe,
        }
    }

    /// Pieces of an original edge traversed as `oe` traverses it.
    #[must_use]
    pub fn pieces(&self, oe: OrientedEdge) -> Vec<OrientedEdge> {
        let Some(split) = self.splits.get(&oe.edge) else {
            return vec![self.image(oe)];
        };
        if oe.is_forward() {
            split.iter().map(|&p| self.image(p)).collect()
        } else {
            split.iter().rev().map(|&p| self.image(p.reversed())).collect()
        }
    }

    /// Creates an edge owned by the run.
    pub fn new_edge(&mut self, store: &mut TopologyStore, data: EdgeData) -> EdgeId {
        let e = store.add_edge(data);
        self.created.insert(Shape::Edge(e));
        e
    }

    /// Creates a face owned by the run.
    pub fn new_face(&mut self, store: &mut TopologyStore, data: FaceData) -> FaceId {
        let f = store.add_face(data);
        self.created.insert(Shape::Face(f));
        f
    }

    /// `true` for shapes created during the run.
    #[must_use]
    pub fn is_created(&self, shape: Shape) -> bool {
        self.created.contains(&shape)
    }

    // ---- faces ----

    pub fn add_face_vertex(&mut self, face: FaceId, v: VertexId) {
        let v = self.real(v);
        let list = self.face_vertices.entry(face).or_default();
        if !list.contains(&v) {
            list.push(v);
        }
    }

    /// Vertices found strictly inside a face.
    #[must_use]
    pub fn face_vertices(&self, face: FaceId) -> &[VertexId] {
        self.face_vertices.get(&face).map_or(&[], Vec::as_slice)
    }

    pub fn add_section_edge(&mut self, face: FaceId, edge: EdgeId) {
        let list = self.section_edges.entry(face).or_default();
        if !list.contains(&edge) {
            list.push(edge);
        }
    }

    /// Section edges created on a face by face/face intersection.
    #[must_use]
    pub fn section_edges(&self, face: FaceId) -> &[EdgeId] {
        self.section_edges.get(&face).map_or(&[], Vec::as_slice)
    }

    /// Every section edge of the run, without repeats.
    #[must_use]
    pub fn all_section_edges(&self) -> Vec<EdgeId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &f in self.sides.iter().flat_map(|s| s.faces.iter()) {
            for &e in self.section_edges(f) {
                if seen.insert(e) {
                    out.push(e);
                }
            }
        }
        out
    }

    pub fn add_in_edge(&mut self, face: FaceId, edge: EdgeId) {
        let list = self.in_edges.entry(face).or_default();
        if !list.contains(&edge) {
            list.push(edge);
        }
    }

    /// Edges of the other operand lying inside a face.
    #[must_use]
    pub fn in_edges(&self, face: FaceId) -> &[EdgeId] {
        self.in_edges.get(&face).map_or(&[], Vec::as_slice)
    }

    /// Every in-edge of the run, without repeats.
    #[must_use]
    pub fn all_in_edges(&self) -> Vec<EdgeId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &f in self.sides.iter().flat_map(|s| s.faces.iter()) {
            for &e in self.in_edges(f) {
                if seen.insert(e) {
                    out.push(e);
                }
            }
        }
        out
    }

    /// Representatives of every common block.
    #[must_use]
    pub fn common_edges(&self) -> Vec<EdgeId> {
        let mut seen = HashSet::new();
        self.common
            .values()
            .map(|oe| oe.edge)
            .filter(|e| seen.insert(*e))
            .collect()
    }

    pub fn add_coincident_faces(&mut self, a: FaceId, b: FaceId) {
        self.coincident_faces.push((a, b));
    }

    /// Face pairs of the two operands lying on the same surface.
    #[must_use]
    pub fn coincident_faces(&self) -> &[(FaceId, FaceId)] {
        &self.coincident_faces
    }

    // ---- bookkeeping ----

    pub fn add_interference(&mut self, interference: Interference) {
        self.interferences.push(interference);
    }

    /// Interferences in which `shape` takes part.
    pub fn interferences_of(&self, shape: Shape) -> impl Iterator<Item = &Interference> + '_ {
        self.interferences
            .iter()
            .filter(move |i| i.first == shape || i.second == shape)
    }

    #[must_use]
    pub fn interferences(&self) -> &[Interference] {
        &self.interferences
    }

    pub fn record_modified(&mut self, original: Shape, image: Shape) {
        let list = self.modified.entry(original).or_default();
        if !list.contains(&image) {
            list.push(image);
        }
    }

    pub fn record_generated(&mut self, source: Shape, image: Shape) {
        let list = self.generated.entry(source).or_default();
        if !list.contains(&image) {
            list.push(image);
        }
    }

    /// Shapes an original was split or merged into.
    #[must_use]
    pub fn modified(&self, original: Shape) -> &[Shape] {
        self.modified.get(&original).map_or(&[], Vec::as_slice)
    }

    /// Shapes of lower dimension an original gave rise to.
    #[must_use]
    pub fn generated(&self, source: Shape) -> &[Shape] {
        self.generated.get(&source).map_or(&[], Vec::as_slice)
    }

    /// Replaces `old` by `new` wherever it stands as an image. An input
    /// shape that is replaced becomes modified into `new`.
    pub fn substitute(&mut self, old: Shape, new: Shape) {
        for list in self.modified.values_mut().chain(self.generated.values_mut()) {
            if let Some(pos) = list.iter().position(|s| *s == old) {
                list.remove(pos);
                if !list.contains(&new) {
                    list.insert(pos, new);
                }
            }
        }
        if self.owner.contains_key(&old) {
            self.record_modified(old, new);
        }
        if self.kept.remove(&old) {
            self.kept.insert(new);
        }
    }

    /// Flags a shape as part of the result, or clears the flag.
    pub fn mark_kept(&mut self, shape: Shape, kept: bool) {
        if kept {
            self.kept.insert(shape);
        } else {
            self.kept.remove(&shape);
        }
    }

    #[must_use]
    pub fn is_kept(&self, shape: Shape) -> bool {
        self.kept.contains(&shape)
    }

    /// Records a warning unless an equal one is already present.
    pub fn warn(&mut self, warning: Warning) {
        if !self.warnings.contains(&warning) {
            warn!(%warning, "warning recorded");
            self.warnings.push(warning);
        }
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Moves the warnings out.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::boolean::options::BooleanOptions;
    use crate::operations::boolean::pave::PaveFiller;
    use crate::operations::creation::MakeBox;
    use crate::operations::query::BoundingBox;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn two_boxes(store: &mut TopologyStore) -> (Shape, Shape) {
        let a = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0)).execute(store).unwrap();
        let b = MakeBox::new(p(0.5, 0.0, 0.0), p(1.5, 1.0, 1.0)).execute(store).unwrap();
        (Shape::Solid(a), Shape::Solid(b))
    }

    #[test]
    fn crossed_face_lists_its_partners() {
        let mut store = TopologyStore::new();
        let a = Shape::Solid(MakeBox::new(p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0)).execute(&mut store).unwrap());
        let b = Shape::Solid(MakeBox::new(p(1.0, 1.0, 1.0), p(3.0, 3.0, 3.0)).execute(&mut store).unwrap());
        let mut ds = BopDs::new(&store, a, b, ToleranceConfig::default()).unwrap();
        let options = BooleanOptions::default().with_parallel(false);
        let mut filler = PaveFiller::new(&store, &ds, &options).unwrap();
        filler.perform(&mut store, &mut ds).unwrap();

        let flat_at = |side: Operand, axis: usize, value: f64| {
            ds.faces(side)
                .iter()
                .copied()
                .find(|&f| {
                    let bbox = BoundingBox::new(f).execute(&store).unwrap();
                    (bbox.min[axis] - value).abs() < 1e-9 && (bbox.max[axis] - value).abs() < 1e-9
                })
                .unwrap()
        };
        let a_right = flat_at(Operand::A, 0, 2.0);
        let b_front = flat_at(Operand::B, 1, 1.0);
        let b_bottom = flat_at(Operand::B, 2, 1.0);

        let mut partners: Vec<Shape> = ds
            .interferences_of(Shape::Face(a_right))
            .filter(|i| i.kind == InterferenceKind::FaceFace)
            .map(|i| {
                assert_eq!(i.first, Shape::Face(a_right));
                assert!(!i.result.is_empty());
                i.second
            })
            .collect();
        partners.sort();
        let mut expected = vec![Shape::Face(b_front), Shape::Face(b_bottom)];
        expected.sort();
        assert_eq!(partners, expected);

        // The edge of `b` along x through (2, 1, 1) pierces the face.
        assert!(ds
            .interferences_of(Shape::Face(a_right))
            .any(|i| i.kind == InterferenceKind::EdgeFace));
        assert_eq!(
            ds.interferences_of(Shape::Face(b_front)).count(),
            ds.interferences()
                .iter()
                .filter(|i| i.first == Shape::Face(b_front) || i.second == Shape::Face(b_front))
                .count()
        );
    }

    #[test]
    fn collects_sub_shapes_per_operand() {
        let mut store = TopologyStore::new();
        let (a, b) = two_boxes(&mut store);
        let ds = BopDs::new(&store, a, b, ToleranceConfig::default()).unwrap();
        assert_eq!(ds.faces(Operand::A).len(), 6);
        assert_eq!(ds.edges(Operand::B).len(), 12);
        assert_eq!(ds.vertices(Operand::A).len(), 8);
        let fb = ds.faces(Operand::B)[0];
        assert_eq!(ds.owner(Shape::Face(fb)), Some(Operand::B));
    }

    #[test]
    fn new_vertex_reuses_vertices_within_tolerance() {
        let mut store = TopologyStore::new();
        let (a, b) = two_boxes(&mut store);
        let mut ds = BopDs::new(&store, a, b, ToleranceConfig::default()).unwrap();
        let corner = ds
            .find_vertex(&store, &p(0.0, 0.0, 0.0), 0.0)
            .unwrap()
            .map(|(v, _)| v)
            .unwrap();
        let again = ds.new_vertex(&mut store, p(0.0, 0.0, 5e-8), 1e-7).unwrap();
        assert_eq!(again, corner);
        assert!(store.vertex(corner).unwrap().tolerance >= 1.5e-7 - 1e-15);
        let fresh = ds.new_vertex(&mut store, p(0.5, 0.5, 0.5), 1e-7).unwrap();
        assert_ne!(fresh, corner);
        assert!(ds.is_created(Shape::Vertex(fresh)));
    }

    #[test]
    fn merged_vertices_resolve_to_the_kept_one() {
        let mut store = TopologyStore::new();
        let (a, b) = two_boxes(&mut store);
        let mut ds = BopDs::new(&store, a, b, ToleranceConfig::default()).unwrap();
        let va = ds.vertices(Operand::A)[0];
        let vb = ds.vertices(Operand::B)[0];
        ds.merge_vertex(&mut store, va, vb).unwrap();
        assert_eq!(ds.real(vb), va);
        assert_eq!(ds.modified(Shape::Vertex(vb)), &[Shape::Vertex(va)]);
    }

    #[test]
    fn pieces_follow_orientation_and_common_blocks() {
        let mut store = TopologyStore::new();
        let (a, b) = two_boxes(&mut store);
        let mut ds = BopDs::new(&store, a, b, ToleranceConfig::default()).unwrap();
        let e = ds.edges(Operand::A)[0];
        let (x, y) = (ds.edges(Operand::B)[0], ds.edges(Operand::B)[1]);
        ds.set_splits(e, vec![OrientedEdge::new(x, true), OrientedEdge::new(y, true)]);
        ds.add_common(y, OrientedEdge::new(x, false));
        let fwd = ds.pieces(OrientedEdge::new(e, true));
        assert_eq!(fwd, vec![OrientedEdge::new(x, true), OrientedEdge::new(x, false)]);
        let rev = ds.pieces(OrientedEdge::new(e, false));
        assert_eq!(rev, vec![OrientedEdge::new(x, true), OrientedEdge::new(x, false)]);
        assert!(ds.is_replaced(y));
        assert_eq!(ds.common_edges(), vec![x]);
    }

    #[test]
    fn warnings_are_not_repeated() {
        let mut store = TopologyStore::new();
        let (a, b) = two_boxes(&mut store);
        let mut ds = BopDs::new(&store, a, b, ToleranceConfig::default()).unwrap();
        let w = Warning::TangentialContact { near: p(0.0, 0.0, 0.0) };
        ds.warn(w.clone());
        ds.warn(w);
        assert_eq!(ds.take_warnings().len(), 1);
        assert!(ds.warnings().is_empty());
    }
}
