use crate::error::{OperationError, Result};
use crate::geometry::curve::CurveGeom;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{FaceId, SolidId, TopologyStore};

use super::make_face::newell_normal;
use super::polyhedron::build_polyhedron;

/// Sweeps a polygonal face along a direction vector to create a solid.
pub struct MakePrism {
    face: FaceId,
    direction: Vector3,
}

impl MakePrism {
    /// Creates a new `MakePrism` operation.
    #[must_use]
    pub fn new(face: FaceId, direction: Vector3) -> Self {
        Self { face, direction }
    }

    /// Executes the sweep, creating the solid in the topology store.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if the direction is zero or
    /// lies in the profile plane, the face has holes, or its boundary has
    /// curved edges.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        if self.direction.norm() < TOLERANCE {
            return Err(
                OperationError::InvalidInput("prism direction must be non-zero".into()).into(),
            );
        }

        let face = store.face(self.face)?;
        if !face.inner_wires.is_empty() {
            return Err(OperationError::InvalidInput(
                "prism profiles with holes are not supported".into(),
            )
            .into());
        }

        let mut base = Vec::new();
        for oe in &store.wire(face.outer_wire)?.edges {
            if !matches!(store.edge(oe.edge)?.curve, CurveGeom::Line(_)) {
                return Err(OperationError::InvalidInput(
                    "prism profile must be a polygon".into(),
                )
                .into());
            }
            let (start, _) = store.oriented_ends(*oe)?;
            base.push(store.point(start)?);
        }

        let normal = newell_normal(&base)?;
        let lift = normal.dot(&self.direction);
        if lift.abs() < TOLERANCE * self.direction.norm().max(1.0) {
            return Err(OperationError::InvalidInput(
                "prism direction lies in the profile plane".into(),
            )
            .into());
        }
        // The base must wind counter-clockwise around the sweep direction.
        if lift < 0.0 {
            base.reverse();
        }

        let n = base.len();
        let mut points: Vec<Point3> = base.clone();
        points.extend(base.iter().map(|p| p + self.direction));

        let mut loops = Vec::with_capacity(n + 2);
        loops.push((0..n).rev().collect::<Vec<_>>());
        loops.push((n..2 * n).collect());
        for i in 0..n {
            let j = (i + 1) % n;
            loops.push(vec![i, j, n + j, n + i]);
        }
        build_polyhedron(store, &points, &loops)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::{MakeFace, MakeWire};
    use crate::topology::Shape;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn make_face(store: &mut TopologyStore, points: Vec<Point3>) -> FaceId {
        let wire = MakeWire::new(points, true).execute(store).unwrap();
        MakeFace::new(wire, vec![]).execute(store).unwrap()
    }

    #[test]
    fn triangle_prism_has_5_faces() {
        let mut store = TopologyStore::new();
        let face = make_face(&mut store, vec![p(0.0, 0.0, 0.0), p(3.0, 0.0, 0.0), p(1.5, 2.0, 0.0)]);
        let solid = MakePrism::new(face, Vector3::new(0.0, 0.0, 3.0))
            .execute(&mut store)
            .unwrap();
        let shell = store.solid(solid).unwrap().outer_shell;
        let data = store.shell(shell).unwrap();
        assert_eq!(data.faces.len(), 5);
        assert!(data.is_closed);
        assert_eq!(store.edges_of(Shape::Solid(solid)).len(), 9);
    }

    #[test]
    fn l_shape_has_8_faces() {
        let mut store = TopologyStore::new();
        let face = make_face(
            &mut store,
            vec![
                p(0.0, 0.0, 0.0), p(4.0, 0.0, 0.0), p(4.0, 2.0, 0.0),
                p(2.0, 2.0, 0.0), p(2.0, 4.0, 0.0), p(0.0, 4.0, 0.0),
            ],
        );
        let solid = MakePrism::new(face, Vector3::new(0.0, 0.0, 3.0))
            .execute(&mut store)
            .unwrap();
        assert_eq!(store.faces_of(Shape::Solid(solid)).len(), 8);
    }

    #[test]
    fn normals_point_outward_for_either_winding() {
        let mut store = TopologyStore::new();
        // Clockwise seen from +z, swept upward.
        let face = make_face(
            &mut store,
            vec![p(0.0, 0.0, 0.0), p(0.0, 2.0, 0.0), p(2.0, 2.0, 0.0), p(2.0, 0.0, 0.0)],
        );
        let solid = MakePrism::new(face, Vector3::new(0.0, 0.0, 3.0))
            .execute(&mut store)
            .unwrap();
        let centroid = p(1.0, 1.0, 1.5);
        for f in store.faces_of(Shape::Solid(solid)) {
            let plane = store.face(f).unwrap().surface.as_plane().unwrap().clone();
            let n = store.face_normal(f, 0.0, 0.0).unwrap();
            assert!(n.dot(&(plane.origin() - centroid)) > 0.0);
        }
    }

    #[test]
    fn zero_direction_returns_error() {
        let mut store = TopologyStore::new();
        let face = make_face(&mut store, vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)]);
        assert!(MakePrism::new(face, Vector3::zeros()).execute(&mut store).is_err());
    }

    #[test]
    fn in_plane_direction_returns_error() {
        let mut store = TopologyStore::new();
        let face = make_face(&mut store, vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)]);
        assert!(MakePrism::new(face, Vector3::x()).execute(&mut store).is_err());
    }
}
