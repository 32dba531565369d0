use std::collections::HashMap;

use crate::error::Result;
use crate::geometry::curve::{CurveGeom, Line};
use crate::geometry::surface::{Plane, SurfaceGeom};
use crate::math::Point3;
use crate::topology::{
    EdgeData, EdgeId, FaceData, OrientedEdge, SolidId, TopologyStore, VertexData, WireData,
};

use super::make_face::newell_normal;
use super::MakeSolid;

/// Builds a planar-faced solid from corner points and face loops given as
/// point indices, counter-clockwise when seen from outside.
///
/// Each corner becomes one vertex and each pair of adjacent indices one
/// straight edge shared by the two faces that use it.
pub(crate) fn build_polyhedron(
    store: &mut TopologyStore,
    points: &[Point3],
    loops: &[Vec<usize>],
) -> Result<SolidId> {
    let vertices: Vec<_> = points
        .iter()
        .map(|p| store.add_vertex(VertexData::new(*p)))
        .collect();
    let mut edges: HashMap<(usize, usize), EdgeId> = HashMap::new();

    let mut faces = Vec::with_capacity(loops.len());
    for lp in loops {
        let mut oriented = Vec::with_capacity(lp.len());
        for (k, &a) in lp.iter().enumerate() {
            let b = lp[(k + 1) % lp.len()];
            let key = (a.min(b), a.max(b));
            let edge = match edges.get(&key) {
                Some(&e) => e,
                None => {
                    let (lo, hi) = (points[key.0], points[key.1]);
                    let e = store.add_edge(EdgeData::new(
                        vertices[key.0],
                        vertices[key.1],
                        CurveGeom::Line(Line::through(lo, hi)?),
                        0.0,
                        (hi - lo).norm(),
                    ));
                    edges.insert(key, e);
                    e
                }
            };
            oriented.push(OrientedEdge::new(edge, a < b));
        }
        let wire = store.add_wire(WireData {
            edges: oriented,
            is_closed: true,
        });

        let corners: Vec<Point3> = lp.iter().map(|&i| points[i]).collect();
        let normal = newell_normal(&corners)?;
        let plane = Plane::new(corners[0], corners[1] - corners[0], normal.cross(&(corners[1] - corners[0])))?;
        faces.push(store.add_face(FaceData::new(SurfaceGeom::Plane(plane), wire, vec![], true)));
    }

    MakeSolid::from_faces(store, faces)
}
