use std::f64::consts::PI;
use std::sync::OnceLock;

use tracing::trace;

use crate::error::Result;
use crate::geometry::curve::{CurveGeom, Line};
use crate::math::{Aabb, Point3, ToleranceConfig, Vector3};
use crate::tessellation::{FaceDomain, PointState, TessellateFace, TessellationParams, TriangleMesh};
use crate::topology::{FaceId, Shape, TopologyStore};

use super::intersect::{intersect_curve_surface, line_hits, Locus};

/// Classification of a point relative to a solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClassification {
    Inside,
    Outside,
    /// On the boundary, lying on the given face.
    OnBoundary(FaceId),
}

/// Fixed ray directions, chosen away from the coordinate axes and
/// diagonals.
const RAY_DIRECTIONS: [[f64; 3]; 7] = [
    [0.6234, 0.5127, 0.5903],
    [-0.4472, 0.7071, 0.5477],
    [0.3162, -0.8165, 0.4830],
    [-0.7071, -0.3651, -0.6030],
    [0.5345, 0.2673, -0.8018],
    [-0.2182, -0.8729, 0.4364],
    [0.8944, -0.1826, -0.4082],
];

struct ClassifiedFace {
    id: FaceId,
    domain: FaceDomain,
    bbox: Aabb,
    tolerance: f64,
}

enum Ray {
    Clean(PointClassification),
    Degenerate,
}

/// A solid prepared for repeated point classification.
///
/// Face domains and bounding boxes are sampled once; the tessellation
/// used by the winding-number fallback is built on first use.
pub struct SolidClassifier {
    faces: Vec<ClassifiedFace>,
    bbox: Aabb,
    tol: ToleranceConfig,
    mesh: OnceLock<Option<TriangleMesh>>,
}

impl SolidClassifier {
    /// Prepares the faces of `shape`.
    ///
    /// # Errors
    ///
    /// Returns an error if a face boundary cannot be sampled.
    pub fn new(store: &TopologyStore, shape: Shape, tol: &ToleranceConfig) -> Result<Self> {
        Self::from_faces(store, &store.faces_of(shape), tol)
    }

    /// Prepares a closed set of faces.
    ///
    /// # Errors
    ///
    /// Returns an error if a face boundary cannot be sampled.
    pub fn from_faces(store: &TopologyStore, faces: &[FaceId], tol: &ToleranceConfig) -> Result<Self> {
        let mut prepared = Vec::with_capacity(faces.len());
        let mut bbox = Aabb::empty();
        for &id in faces {
            let domain = FaceDomain::new(store, id, tol)?;
            let face_box = domain.surface_bbox(8);
            bbox.merge(&face_box);
            prepared.push(ClassifiedFace {
                id,
                bbox: face_box,
                tolerance: tol.linear(store.face(id)?.tolerance),
                domain,
            });
        }
        Ok(Self {
            faces: prepared,
            bbox,
            tol: *tol,
            mesh: OnceLock::new(),
        })
    }

    /// Bounding box of the solid.
    #[must_use]
    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    /// The sampled domain of one of the solid's faces.
    #[must_use]
    pub fn domain(&self, face: FaceId) -> Option<&FaceDomain> {
        self.faces.iter().find(|f| f.id == face).map(|f| &f.domain)
    }

    /// Classifies `point` as inside, outside or on the boundary.
    ///
    /// Rays are cast in fixed directions until two rays that hit no edge,
    /// vertex or tangency agree. If that does not happen within the ray
    /// budget, the generalized winding number of the tessellated boundary
    /// decides.
    ///
    /// # Errors
    ///
    /// Returns an error if the fallback tessellation cannot be built.
    pub fn classify(&self, store: &TopologyStore, point: &Point3) -> Result<PointClassification> {
        if !self.bbox.expanded(self.tol.confusion).contains(point) {
            return Ok(PointClassification::Outside);
        }
        if let Some(face) = self.on_face(point) {
            return Ok(PointClassification::OnBoundary(face));
        }

        let reach = (self.bbox.min - point).norm().max((self.bbox.max - point).norm()) * 2.0 + 1.0;
        let attempts = self.tol.max_ray_attempts.clamp(1, RAY_DIRECTIONS.len());
        let mut clean: Vec<PointClassification> = Vec::new();
        for d in RAY_DIRECTIONS.iter().take(attempts) {
            let dir = Vector3::new(d[0], d[1], d[2]).normalize();
            if let Ray::Clean(c) = self.cast(point, &dir, reach) {
                if clean.contains(&c) {
                    return Ok(c);
                }
                clean.push(c);
            }
        }
        trace!(?point, clean = clean.len(), "rays inconclusive, using winding number");
        match self.winding_number(store, point) {
            Some(w) if w >= 0.5 => Ok(PointClassification::Inside),
            Some(_) => Ok(PointClassification::Outside),
            None => Ok(clean.first().copied().unwrap_or(PointClassification::Outside)),
        }
    }

    fn on_face(&self, point: &Point3) -> Option<FaceId> {
        use crate::geometry::surface::Surface;
        self.faces
            .iter()
            .filter(|f| f.bbox.expanded(f.tolerance).contains(point))
            .find(|f| {
                f.domain.map().surface().signed_distance(point).abs() <= f.tolerance
                    && f.domain.classify_point(point) != PointState::Outside
            })
            .map(|f| f.id)
    }

    fn cast(&self, origin: &Point3, dir: &Vector3, reach: f64) -> Ray {
        let Ok(line) = Line::new(*origin, *dir) else {
            return Ray::Degenerate;
        };
        let far = origin + dir * reach;
        let mut ray_box = Aabb::from_points([origin, &far]);
        ray_box = ray_box.expanded(self.tol.confusion);
        let mut balance = 0i32;
        for face in &self.faces {
            if !face.bbox.overlaps(&ray_box) {
                continue;
            }
            let surface = face.domain.map().surface();
            let hits = match line_hits(&line, (0.0, reach), surface, face.tolerance, &self.tol) {
                Some(hits) => hits,
                None => match intersect_curve_surface(
                    &CurveGeom::Line(line.clone()),
                    (0.0, reach),
                    surface,
                    face.tolerance,
                    &self.tol,
                ) {
                    Ok(hits) => hits,
                    Err(_) => return Ray::Degenerate,
                },
            };
            for hit in hits {
                match hit {
                    Locus::Point { point, tangent, .. } => {
                        match face.domain.classify_point(&point) {
                            PointState::Outside => {}
                            PointState::Boundary => return Ray::Degenerate,
                            PointState::Inside => {
                                if tangent {
                                    return Ray::Degenerate;
                                }
                                let map = face.domain.map();
                                let Ok(normal) = map.normal(&map.project(&point)) else {
                                    return Ray::Degenerate;
                                };
                                let cos = normal.dot(dir);
                                if cos.abs() < 1e-6 {
                                    return Ray::Degenerate;
                                }
                                balance += if cos > 0.0 { 1 } else { -1 };
                            }
                        }
                    }
                    Locus::Coincident { .. } | Locus::Curve { .. } => return Ray::Degenerate,
                }
            }
        }
        match balance {
            0 => Ray::Clean(PointClassification::Outside),
            1 => Ray::Clean(PointClassification::Inside),
            _ => Ray::Degenerate,
        }
    }

    /// Generalized winding number of the tessellated boundary around
    /// `point`; about 1 inside and 0 outside.
    fn winding_number(&self, store: &TopologyStore, point: &Point3) -> Option<f64> {
        let mesh = self.mesh.get_or_init(|| {
            let params = TessellationParams {
                deflection: self.tol.deflection,
                ..TessellationParams::default()
            };
            let mut mesh = TriangleMesh::default();
            for face in &self.faces {
                match TessellateFace::new(face.id, params).execute(store) {
                    Ok(m) => mesh.merge(&m),
                    Err(_) => return None,
                }
            }
            Some(mesh)
        });
        let mesh = mesh.as_ref()?;
        let total: f64 = mesh
            .triangles()
            .map(|[a, b, c]| solid_angle(&(a - point), &(b - point), &(c - point)))
            .sum();
        Some(total / (4.0 * PI))
    }
}

/// Signed solid angle of a triangle seen from the origin
/// (Van Oosterom and Strackee).
fn solid_angle(a: &Vector3, b: &Vector3, c: &Vector3) -> f64 {
    let (la, lb, lc) = (a.norm(), b.norm(), c.norm());
    let num = a.dot(&b.cross(c));
    let den = la * lb * lc + a.dot(b) * lc + a.dot(c) * lb + b.dot(c) * la;
    2.0 * num.atan2(den)
}

/// Classifies a point against the faces of a shape.
///
/// # Errors
///
/// Returns an error if a face cannot be sampled.
pub fn classify_point_in_solid(
    store: &TopologyStore,
    point: &Point3,
    solid: Shape,
    tol: &ToleranceConfig,
) -> Result<PointClassification> {
    SolidClassifier::new(store, solid, tol)?.classify(store, point)
}
