use std::collections::HashMap;

use crate::error::Result;

use super::{
    CompoundData, EdgeId, FaceId, OrientedEdge, Shape, ShellData, ShellId, SolidData, SolidId,
    TopologyStore, VertexId, WireData, WireId,
};

/// Deep copy of a shape graph inside one store.
///
/// Shared sub-shapes stay shared in the copy. `map` records the copy of
/// every visited original.
#[derive(Debug, Default)]
pub struct ShapeCopy {
    /// Original shape to its copy.
    pub map: HashMap<Shape, Shape>,
}

impl ShapeCopy {
    /// Copies `root` and everything below it.
    ///
    /// # Errors
    ///
    /// Returns an error if a referenced entity is missing.
    pub fn run(store: &mut TopologyStore, root: Shape) -> Result<(Shape, Self)> {
        let mut copy = Self::default();
        let new_root = copy.copy_shape(store, root)?;
        Ok((new_root, copy))
    }

    fn copy_shape(&mut self, store: &mut TopologyStore, shape: Shape) -> Result<Shape> {
        if let Some(&done) = self.map.get(&shape) {
            return Ok(done);
        }
        let copied = match shape {
            Shape::Vertex(id) => Shape::Vertex(self.vertex(store, id)?),
            Shape::Edge(id) => Shape::Edge(self.edge(store, id)?),
            Shape::Wire(id) => Shape::Wire(self.wire(store, id)?),
            Shape::Face(id) => Shape::Face(self.face(store, id)?),
            Shape::Shell(id) => Shape::Shell(self.shell(store, id)?),
            Shape::Solid(id) => Shape::Solid(self.solid(store, id)?),
            Shape::Compound(id) => {
                let children = store.compound(id)?.children.clone();
                let mut out = CompoundData::default();
                for (child, orientation) in children {
                    out.children.push((self.copy_shape(store, child)?, orientation));
                }
                Shape::Compound(store.add_compound(out))
            }
        };
        self.map.insert(shape, copied);
        Ok(copied)
    }

    fn vertex(&mut self, store: &mut TopologyStore, id: VertexId) -> Result<VertexId> {
        if let Some(Shape::Vertex(v)) = self.map.get(&Shape::Vertex(id)) {
            return Ok(*v);
        }
        let data = store.vertex(id)?.clone();
        let new_id = store.add_vertex(data);
        self.map.insert(Shape::Vertex(id), Shape::Vertex(new_id));
        Ok(new_id)
    }

    fn edge(&mut self, store: &mut TopologyStore, id: EdgeId) -> Result<EdgeId> {
        if let Some(Shape::Edge(e)) = self.map.get(&Shape::Edge(id)) {
            return Ok(*e);
        }
        let mut data = store.edge(id)?.clone();
        data.start = self.vertex(store, data.start)?;
        data.end = self.vertex(store, data.end)?;
        let new_id = store.add_edge(data);
        self.map.insert(Shape::Edge(id), Shape::Edge(new_id));
        Ok(new_id)
    }

    fn wire(&mut self, store: &mut TopologyStore, id: WireId) -> Result<WireId> {
        if let Some(Shape::Wire(w)) = self.map.get(&Shape::Wire(id)) {
            return Ok(*w);
        }
        let data = store.wire(id)?.clone();
        let mut edges = Vec::with_capacity(data.edges.len());
        for oe in &data.edges {
            edges.push(OrientedEdge {
                edge: self.edge(store, oe.edge)?,
                orientation: oe.orientation,
            });
        }
        let new_id = store.add_wire(WireData {
            edges,
            is_closed: data.is_closed,
        });
        self.map.insert(Shape::Wire(id), Shape::Wire(new_id));
        Ok(new_id)
    }

    fn face(&mut self, store: &mut TopologyStore, id: FaceId) -> Result<FaceId> {
        if let Some(Shape::Face(f)) = self.map.get(&Shape::Face(id)) {
            return Ok(*f);
        }
        let mut data = store.face(id)?.clone();
        data.outer_wire = self.wire(store, data.outer_wire)?;
        let mut inner = Vec::with_capacity(data.inner_wires.len());
        for &w in &data.inner_wires {
            inner.push(self.wire(store, w)?);
        }
        data.inner_wires = inner;
        let new_id = store.add_face(data);
        self.map.insert(Shape::Face(id), Shape::Face(new_id));
        Ok(new_id)
    }

    fn shell(&mut self, store: &mut TopologyStore, id: ShellId) -> Result<ShellId> {
        if let Some(Shape::Shell(s)) = self.map.get(&Shape::Shell(id)) {
            return Ok(*s);
        }
        let data = store.shell(id)?.clone();
        let mut faces = Vec::with_capacity(data.faces.len());
        for &f in &data.faces {
            faces.push(self.face(store, f)?);
        }
        let new_id = store.add_shell(ShellData {
            faces,
            is_closed: data.is_closed,
        });
        self.map.insert(Shape::Shell(id), Shape::Shell(new_id));
        Ok(new_id)
    }

    fn solid(&mut self, store: &mut TopologyStore, id: SolidId) -> Result<SolidId> {
        let data = store.solid(id)?.clone();
        let outer_shell = self.shell(store, data.outer_shell)?;
        let mut inner_shells = Vec::with_capacity(data.inner_shells.len());
        for &s in &data.inner_shells {
            inner_shells.push(self.shell(store, s)?);
        }
        Ok(store.add_solid(SolidData {
            outer_shell,
            inner_shells,
        }))
    }
}
