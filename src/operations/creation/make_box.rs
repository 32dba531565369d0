use crate::error::{OperationError, Result};
use crate::math::Point3;
use crate::topology::{SolidId, TopologyStore};

use super::polyhedron::build_polyhedron;

/// Face loops of an axis-aligned box over corners indexed `x + 2y + 4z`.
const BOX_FACES: [[usize; 4]; 6] = [
    [0, 2, 3, 1],
    [4, 5, 7, 6],
    [0, 1, 5, 4],
    [2, 6, 7, 3],
    [0, 4, 6, 2],
    [1, 3, 7, 5],
];

/// Creates an axis-aligned box solid from two corner points.
pub struct MakeBox {
    min_corner: Point3,
    max_corner: Point3,
}

impl MakeBox {
    /// Creates a new `MakeBox` operation.
    #[must_use]
    pub fn new(min_corner: Point3, max_corner: Point3) -> Self {
        Self {
            min_corner,
            max_corner,
        }
    }

    /// Executes the operation, creating the box in the topology store.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if the box has no extent
    /// along some axis.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        let (lo, hi) = (self.min_corner, self.max_corner);
        if (0..3).any(|i| hi[i] - lo[i] <= 0.0) {
            return Err(OperationError::InvalidInput(
                "box max corner must exceed min corner on every axis".into(),
            )
            .into());
        }

        let corners: Vec<Point3> = (0..8)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { lo.x } else { hi.x },
                    if i & 2 == 0 { lo.y } else { hi.y },
                    if i & 4 == 0 { lo.z } else { hi.z },
                )
            })
            .collect();
        let loops: Vec<Vec<usize>> = BOX_FACES.iter().map(|f| f.to_vec()).collect();
        build_polyhedron(store, &corners, &loops)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::topology::Shape;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn box_is_closed() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 2.0, 3.0))
            .execute(&mut store)
            .unwrap();
        let shell = store.solid(solid).unwrap().outer_shell;
        let data = store.shell(shell).unwrap();
        assert_eq!(data.faces.len(), 6);
        assert!(data.is_closed);
    }

    #[test]
    fn face_normals_point_outward() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(p(-1.0, -1.0, -1.0), p(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        for face in store.faces_of(Shape::Solid(solid)) {
            let plane = store.face(face).unwrap().surface.as_plane().unwrap().clone();
            let n = store.face_normal(face, 0.0, 0.0).unwrap();
            // Center of the box is the origin.
            assert!(n.dot(&plane.origin().coords) > 0.0);
        }
    }

    #[test]
    fn degenerate_box_is_rejected() {
        let mut store = TopologyStore::new();
        assert!(MakeBox::new(p(0.0, 0.0, 0.0), p(1.0, 0.0, 1.0))
            .execute(&mut store)
            .is_err());
    }
}
