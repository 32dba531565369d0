use crate::error::{OperationError, Result, TopologyError};
use crate::geometry::curve::Curve;
use crate::geometry::surface::{Plane, SurfaceGeom};
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::topology::{FaceData, FaceId, TopologyStore, WireId};

/// Creates a planar face bounded by an outer wire and optional holes.
///
/// The face normal follows the outer wire: walking it counter-clockwise
/// when seen from the tip of the normal. Hole wires are reversed if needed
/// so that they run the other way.
pub struct MakeFace {
    outer_wire: WireId,
    inner_wires: Vec<WireId>,
}

impl MakeFace {
    /// Creates a new `MakeFace` operation.
    #[must_use]
    pub fn new(outer_wire: WireId, inner_wires: Vec<WireId>) -> Self {
        Self {
            outer_wire,
            inner_wires,
        }
    }

    /// Executes the operation, creating the face in the topology store.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::WireNotClosed`] for an open wire and
    /// [`OperationError::InvalidInput`] if the wires are not coplanar or
    /// enclose no area.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<FaceId> {
        for w in std::iter::once(self.outer_wire).chain(self.inner_wires.iter().copied()) {
            if !store.wire(w)?.is_closed {
                return Err(TopologyError::WireNotClosed.into());
            }
        }

        let outer = sample_wire(store, self.outer_wire)?;
        let normal = newell_normal(&outer)?;
        let origin = outer[0];
        let u_dir = outer_axis(&outer, &normal);
        let plane = Plane::new(origin, u_dir, normal.cross(&u_dir))?;

        for w in std::iter::once(self.outer_wire).chain(self.inner_wires.iter().copied()) {
            for q in sample_wire(store, w)? {
                if (q - origin).dot(&normal).abs() > 1e-6 {
                    return Err(
                        OperationError::InvalidInput("face wires are not coplanar".into()).into(),
                    );
                }
            }
        }

        for &w in &self.inner_wires {
            let hole = sample_wire(store, w)?;
            if newell_normal(&hole)?.dot(&normal) > 0.0 {
                let wire = store.wire_mut(w)?;
                wire.edges = wire.edges.iter().rev().map(|oe| oe.reversed()).collect();
            }
        }

        Ok(store.add_face(FaceData::new(
            SurfaceGeom::Plane(plane),
            self.outer_wire,
            self.inner_wires.clone(),
            true,
        )))
    }
}

/// Points along a closed wire in traversal order, dense enough that the
/// polygon through them stays within a small deflection of curved edges.
pub(crate) fn sample_wire(store: &TopologyStore, wire: WireId) -> Result<Vec<Point3>> {
    let mut points = Vec::new();
    for oe in &store.wire(wire)?.edges {
        let edge = store.edge(oe.edge)?;
        let mut params = edge.curve.sample_params(edge.t_start, edge.t_end, 1e-3);
        if !oe.is_forward() {
            params.reverse();
        }
        params.pop();
        for t in params {
            points.push(edge.curve.evaluate(t)?);
        }
    }
    Ok(points)
}

/// Unit normal of a closed polygon by Newell's method.
pub(crate) fn newell_normal(points: &[Point3]) -> Result<Vector3> {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    let len = normal.norm();
    if len < TOLERANCE {
        return Err(
            OperationError::InvalidInput("degenerate polygon: cannot compute normal".into()).into(),
        );
    }
    Ok(normal / len)
}

/// In-plane direction from the first polygon point to the farthest one.
fn outer_axis(points: &[Point3], normal: &Vector3) -> Vector3 {
    let far = points
        .iter()
        .map(|q| q - points[0])
        .map(|d| d - normal * d.dot(normal))
        .fold(Vector3::zeros(), |best, d| if d.norm() > best.norm() { d } else { best });
    if far.norm() < TOLERANCE {
        crate::math::any_perpendicular(normal)
    } else {
        far
    }
}
