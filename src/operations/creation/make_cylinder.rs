use std::f64::consts::TAU;

use crate::error::{OperationError, Result};
use crate::geometry::curve::{Circle, CurveGeom, Line};
use crate::geometry::surface::{Cylinder, Plane, SurfaceGeom};
use crate::math::{any_perpendicular, Point3, Vector3, TOLERANCE};
use crate::topology::{
    EdgeData, FaceData, OrientedEdge, SolidId, TopologyStore, VertexData, WireData,
};

use super::MakeSolid;

/// Creates a right circular cylinder from base center, radius, axis, and
/// height.
///
/// The lateral face is closed by a seam edge that its boundary runs along
/// twice; each cap is bounded by one full-circle edge.
pub struct MakeCylinder {
    center: Point3,
    radius: f64,
    axis: Vector3,
    height: f64,
}

impl MakeCylinder {
    /// Creates a new `MakeCylinder` operation.
    #[must_use]
    pub fn new(center: Point3, radius: f64, axis: Vector3, height: f64) -> Self {
        Self {
            center,
            radius,
            axis,
            height,
        }
    }

    /// Executes the operation, creating the cylinder in the topology store.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError::InvalidInput`] if the radius or height is
    /// not positive or the axis is zero.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<SolidId> {
        if self.radius < TOLERANCE {
            return Err(
                OperationError::InvalidInput("cylinder radius must be positive".into()).into(),
            );
        }
        if self.height < TOLERANCE {
            return Err(
                OperationError::InvalidInput("cylinder height must be positive".into()).into(),
            );
        }
        let axis_len = self.axis.norm();
        if axis_len < TOLERANCE {
            return Err(
                OperationError::InvalidInput("cylinder axis must be non-zero".into()).into(),
            );
        }
        let axis = self.axis / axis_len;
        let ref_dir = any_perpendicular(&axis);
        let top_center = self.center + axis * self.height;

        let vb = store.add_vertex(VertexData::new(self.center + ref_dir * self.radius));
        let vt = store.add_vertex(VertexData::new(top_center + ref_dir * self.radius));

        let bottom = store.add_edge(EdgeData::new(
            vb,
            vb,
            CurveGeom::Circle(Circle::new(self.center, self.radius, axis, ref_dir)?),
            0.0,
            TAU,
        ));
        let top = store.add_edge(EdgeData::new(
            vt,
            vt,
            CurveGeom::Circle(Circle::new(top_center, self.radius, axis, ref_dir)?),
            0.0,
            TAU,
        ));
        let seam = store.add_edge(EdgeData::new(
            vb,
            vt,
            CurveGeom::Line(Line::new(self.center + ref_dir * self.radius, axis)?),
            0.0,
            self.height,
        ));

        // In (u, v) the lateral boundary is the rectangle
        // (0,0) -> (2pi,0) -> (2pi,h) -> (0,h).
        let lateral_wire = store.add_wire(WireData {
            edges: vec![
                OrientedEdge::new(bottom, true),
                OrientedEdge::new(seam, true),
                OrientedEdge::new(top, false),
                OrientedEdge::new(seam, false),
            ],
            is_closed: true,
        });
        let lateral = store.add_face(FaceData::new(
            SurfaceGeom::Cylinder(Cylinder::new(self.center, self.radius, axis, ref_dir)?),
            lateral_wire,
            vec![],
            true,
        ));

        let bottom_wire = store.add_wire(WireData {
            edges: vec![OrientedEdge::new(bottom, false)],
            is_closed: true,
        });
        let bottom_cap = store.add_face(FaceData::new(
            SurfaceGeom::Plane(Plane::from_normal(self.center, -axis)?),
            bottom_wire,
            vec![],
            true,
        ));

        let top_wire = store.add_wire(WireData {
            edges: vec![OrientedEdge::new(top, true)],
            is_closed: true,
        });
        let top_cap = store.add_face(FaceData::new(
            SurfaceGeom::Plane(Plane::from_normal(top_center, axis)?),
            top_wire,
            vec![],
            true,
        ));

        MakeSolid::from_faces(store, vec![lateral, bottom_cap, top_cap])
    }
}
