use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation};

use crate::error::{Result, TessellationError};
use crate::geometry::surface::SurfaceGeom;
use crate::math::{Point2, ToleranceConfig, Vector3};
use crate::topology::{FaceId, TopologyStore};

use super::face_domain::{FaceDomain, PointState};
use super::{TessellationParams, TriangleMesh};

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Tessellates a face into a triangle mesh.
pub struct TessellateFace {
    face: FaceId,
    params: TessellationParams,
}

impl TessellateFace {
    /// Creates a new `TessellateFace` operation.
    #[must_use]
    pub fn new(face: FaceId, params: TessellationParams) -> Self {
        Self { face, params }
    }

    /// Executes the tessellation, returning a triangle mesh whose triangles
    /// wind counter-clockwise around the outward face normal.
    ///
    /// # Errors
    ///
    /// Returns an error if the face cannot be tessellated.
    pub fn execute(&self, store: &TopologyStore) -> Result<TriangleMesh> {
        let tol = ToleranceConfig {
            deflection: self.params.deflection,
            ..ToleranceConfig::default()
        };
        let domain = FaceDomain::new(store, self.face, &tol)?;
        triangulate_domain(&domain, &self.params)
    }
}

/// Triangulates a face domain in face coordinates.
///
/// Curved surfaces get interior grid points spaced so that flat triangles
/// stay within the deflection of the surface.
///
/// # Errors
///
/// Returns an error if the constrained triangulation fails.
#[allow(clippy::cast_possible_truncation)]
pub fn triangulate_domain(domain: &FaceDomain, params: &TessellationParams) -> Result<TriangleMesh> {
    let mut cdt = Cdt::new();
    for lp in domain.loops() {
        insert_constraint_loop(&mut cdt, lp)?;
    }
    let (du, dv) = grid_steps(domain, params);
    insert_grid(&mut cdt, domain, du, dv)?;

    let interior = classify_interior_faces(&cdt);
    let map = domain.map();

    let mut mesh = TriangleMesh::default();
    let mut vertex_map: HashMap<FixedVertexHandle, u32> = HashMap::new();
    for face_handle in cdt.inner_faces() {
        if !interior.contains(&face_handle.fix()) {
            continue;
        }
        let mut tri = [0u32; 3];
        for (slot, vh) in tri.iter_mut().zip(face_handle.vertices()) {
            *slot = if let Some(&existing) = vertex_map.get(&vh.fix()) {
                existing
            } else {
                let pos = vh.position();
                let uv = Point2::new(pos.x, pos.y);
                let idx = mesh.vertices.len() as u32;
                mesh.vertices.push(map.point(&uv)?);
                // Apex and pole samples have no normal.
                mesh.normals.push(map.normal(&uv).unwrap_or_else(|_| Vector3::zeros()));
                mesh.uvs.push(uv);
                vertex_map.insert(vh.fix(), idx);
                idx
            };
        }
        mesh.indices.push(tri);
    }

    if mesh.indices.is_empty() {
        return Err(TessellationError::Failed("face domain produced no triangles".into()).into());
    }
    Ok(mesh)
}

/// A point well inside the domain: the centroid of the largest interior
/// triangle of the boundary-only triangulation.
///
/// # Errors
///
/// Returns an error if the domain has no interior triangle.
pub fn interior_point(domain: &FaceDomain) -> Result<Point2> {
    let mut cdt = Cdt::new();
    for lp in domain.loops() {
        insert_constraint_loop(&mut cdt, lp)?;
    }
    let interior = classify_interior_faces(&cdt);

    let mut best: Option<(f64, Point2)> = None;
    for face_handle in cdt.inner_faces() {
        if !interior.contains(&face_handle.fix()) {
            continue;
        }
        let [a, b, c] = face_handle.positions();
        let area = ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() * 0.5;
        let centroid = Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
        if best.map_or(true, |(best_area, _)| area > best_area)
            && domain.classify_uv(&centroid) == PointState::Inside
        {
            best = Some((area, centroid));
        }
    }

    best.map(|(_, c)| c).ok_or_else(|| {
        TessellationError::Failed("face domain has no interior triangle".into()).into()
    })
}

/// Grid spacing in face coordinates; zero means no interior points.
fn grid_steps(domain: &FaceDomain, params: &TessellationParams) -> (f64, f64) {
    let angle_step = |radius: f64| -> f64 {
        let ratio = (1.0 - params.deflection / radius.max(params.deflection * 2.0)).clamp(-1.0, 1.0);
        (2.0 * ratio.acos()).max(1e-3)
    };
    let span = domain.uv_max() - domain.uv_min();
    let (du, dv) = match domain.map().surface() {
        SurfaceGeom::Plane(_) => return (0.0, 0.0),
        SurfaceGeom::Cylinder(c) => {
            let du = angle_step(c.radius());
            (du, du * c.radius())
        }
        SurfaceGeom::Cone(c) => {
            let v_max = domain.uv_min().y.abs().max(domain.uv_max().y.abs());
            let r = (v_max * c.half_angle().sin()).max(params.deflection);
            let du = angle_step(r);
            (du, du * r)
        }
        SurfaceGeom::Sphere(s) => {
            let d = angle_step(s.radius());
            (d, d)
        }
        SurfaceGeom::Torus(t) => (
            angle_step(t.major_radius() + t.minor_radius()),
            angle_step(t.minor_radius()),
        ),
    };
    // Cap the grid size.
    #[allow(clippy::cast_precision_loss)]
    let cap = params.max_segments as f64;
    (du.max(span.x / cap), dv.max(span.y / cap))
}

fn insert_grid(cdt: &mut Cdt, domain: &FaceDomain, du: f64, dv: f64) -> Result<()> {
    if du <= 0.0 || dv <= 0.0 {
        return Ok(());
    }
    let (lo, hi) = (domain.uv_min(), domain.uv_max());
    let clearance = 0.25 * du.min(dv);
    let mut u = lo.x + du * 0.5;
    while u < hi.x {
        let mut v = lo.y + dv * 0.5;
        while v < hi.y {
            let q = Point2::new(u, v);
            if domain.classify_uv(&q) == PointState::Inside
                && domain.uv_boundary_distance(&q) > clearance
            {
                cdt.insert(SpadePoint2::new(u, v)).map_err(|e: InsertionError| {
                    TessellationError::Failed(format!("CDT insert: {e}"))
                })?;
            }
            v += dv;
        }
        u += du;
    }
    Ok(())
}

/// Inserts a closed polygon as constraint edges into the CDT.
///
/// Constraints that would cross an existing one are skipped; the parity
/// flood fill then still separates inside from outside for loops that do
/// not overlap.
pub(crate) fn insert_constraint_loop(cdt: &mut Cdt, points: &[Point2]) -> Result<()> {
    if points.len() < 2 {
        return Err(
            TessellationError::Failed("constraint loop needs at least 2 points".into()).into(),
        );
    }

    let mut handles = Vec::with_capacity(points.len());
    for pt in points {
        let h = cdt
            .insert(SpadePoint2::new(pt.x, pt.y))
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to && cdt.can_add_constraint(from, to) {
            cdt.add_constraint(from, to);
        }
    }

    Ok(())
}

/// Classifies which inner faces of the CDT are inside the polygon using flood-fill.
///
/// Starts from faces adjacent to the outer (infinite) face at depth 0. Each time
/// a constraint edge is crossed, depth increments. Odd depth = interior.
pub(crate) fn classify_interior_faces(cdt: &Cdt) -> HashSet<FixedFaceHandle<InnerTag>> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<FixedFaceHandle<InnerTag>, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() == outer_fix {
            if let Some(inner) = edge.rev().face().as_inner() {
                let fix = inner.fix();
                if depth_map.contains_key(&fix) {
                    continue;
                }
                let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
                depth_map.insert(fix, depth);
                if depth % 2 == 1 {
                    interior.insert(fix);
                }
                queue.push_back((fix, depth));
            }
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        let face = cdt.face(face_fix);
        for edge in face.adjacent_edges() {
            if let Some(neighbor) = edge.rev().face().as_inner() {
                let fix = neighbor.fix();
                if depth_map.contains_key(&fix) {
                    continue;
                }
                let new_depth = if cdt.is_constraint_edge(edge.as_undirected().fix()) {
                    depth + 1
                } else {
                    depth
                };
                depth_map.insert(fix, new_depth);
                if new_depth % 2 == 1 {
                    interior.insert(fix);
                }
                queue.push_back((fix, new_depth));
            }
        }
    }

    interior
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::{MakeCylinder, MakeFace, MakeWire};
    use crate::topology::Shape;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn make_face_from_points(store: &mut TopologyStore, points: Vec<Point3>) -> FaceId {
        let wire = MakeWire::new(points, true).execute(store).unwrap();
        MakeFace::new(wire, vec![]).execute(store).unwrap()
    }

    fn mesh_area(mesh: &TriangleMesh) -> f64 {
        mesh.indices
            .iter()
            .map(|t| {
                let a = mesh.vertices[t[0] as usize];
                let b = mesh.vertices[t[1] as usize];
                let c = mesh.vertices[t[2] as usize];
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    #[test]
    fn square_produces_2_triangles() {
        let mut store = TopologyStore::new();
        let face = make_face_from_points(&mut store, vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]);
        let mesh = TessellateFace::new(face, TessellationParams::default())
            .execute(&store)
            .unwrap();
        assert_eq!(mesh.indices.len(), 2);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn l_shape_concave_tessellates() {
        let mut store = TopologyStore::new();
        let face = make_face_from_points(
            &mut store,
            vec![p(0.0, 0.0), p(2.0, 0.0), p(2.0, 1.0), p(1.0, 1.0), p(1.0, 2.0), p(0.0, 2.0)],
        );
        let mesh = TessellateFace::new(face, TessellationParams::default())
            .execute(&store)
            .unwrap();
        assert_eq!(mesh.indices.len(), 4);
        assert!((mesh_area(&mesh) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn face_with_hole_excludes_interior() {
        let mut store = TopologyStore::new();
        let outer = MakeWire::new(vec![p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0), p(0.0, 4.0)], true)
            .execute(&mut store)
            .unwrap();
        let hole = MakeWire::new(vec![p(1.0, 1.0), p(1.0, 3.0), p(3.0, 3.0), p(3.0, 1.0)], true)
            .execute(&mut store)
            .unwrap();
        let face = MakeFace::new(outer, vec![hole]).execute(&mut store).unwrap();
        let mesh = TessellateFace::new(face, TessellationParams::default())
            .execute(&store)
            .unwrap();
        assert!((mesh_area(&mesh) - 12.0).abs() < 1e-9);
        for tri in &mesh.indices {
            let c = (mesh.vertices[tri[0] as usize].coords
                + mesh.vertices[tri[1] as usize].coords
                + mesh.vertices[tri[2] as usize].coords)
                / 3.0;
            assert!(!(c.x > 1.0 && c.x < 3.0 && c.y > 1.0 && c.y < 3.0));
        }
    }

    #[test]
    fn triangles_wind_around_the_face_normal() {
        let mut store = TopologyStore::new();
        let face = make_face_from_points(&mut store, vec![p(0.0, 0.0), p(0.0, 1.0), p(1.0, 1.0), p(1.0, 0.0)]);
        let normal = store.face_normal(face, 0.0, 0.0).unwrap();
        let mesh = TessellateFace::new(face, TessellationParams::default())
            .execute(&store)
            .unwrap();
        for t in &mesh.indices {
            let a = mesh.vertices[t[0] as usize];
            let b = mesh.vertices[t[1] as usize];
            let c = mesh.vertices[t[2] as usize];
            assert!((b - a).cross(&(c - a)).dot(&normal) > 0.0);
        }
    }

    #[test]
    fn cylinder_lateral_area_is_close() {
        let mut store = TopologyStore::new();
        let solid = MakeCylinder::new(Point3::origin(), 1.0, Vector3::z(), 2.0)
            .execute(&mut store)
            .unwrap();
        let lateral = store
            .faces_of(Shape::Solid(solid))
            .into_iter()
            .find(|&f| store.face(f).unwrap().surface.as_plane().is_none())
            .unwrap();
        let mesh = TessellateFace::new(lateral, TessellationParams::default())
            .execute(&store)
            .unwrap();
        let exact = std::f64::consts::TAU * 2.0;
        assert!((mesh_area(&mesh) - exact).abs() / exact < 5e-3);
        for (v, n) in mesh.vertices.iter().zip(&mesh.normals) {
            assert!(n.dot(&Vector3::new(v.x, v.y, 0.0)) > 0.0);
        }
    }

    #[test]
    fn interior_point_avoids_the_hole() {
        let mut store = TopologyStore::new();
        let outer = MakeWire::new(vec![p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0), p(0.0, 4.0)], true)
            .execute(&mut store)
            .unwrap();
        let hole = MakeWire::new(vec![p(0.5, 0.5), p(0.5, 3.5), p(3.5, 3.5), p(3.5, 0.5)], true)
            .execute(&mut store)
            .unwrap();
        let face = MakeFace::new(outer, vec![hole]).execute(&mut store).unwrap();
        let domain = FaceDomain::new(&store, face, &ToleranceConfig::default()).unwrap();
        let uv = interior_point(&domain).unwrap();
        assert_eq!(domain.classify_uv(&uv), PointState::Inside);
        let q = domain.map().point(&uv).unwrap();
        assert!(!(q.x > 0.5 && q.x < 3.5 && q.y > 0.5 && q.y < 3.5));
    }
}
