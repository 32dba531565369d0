pub mod compound;
pub mod copy;
pub mod edge;
pub mod face;
pub mod shape;
pub mod shell;
pub mod solid;
pub mod vertex;
pub mod wire;

pub use compound::{CompoundData, CompoundId};
pub use copy::ShapeCopy;
pub use edge::{EdgeData, EdgeId};
pub use face::{FaceData, FaceId};
pub use shape::{Explorer, Shape, ShapeKind};
pub use shell::{ShellData, ShellId};
pub use solid::{SolidData, SolidId};
pub use vertex::{VertexData, VertexId, DEFAULT_VERTEX_TOLERANCE};
pub use wire::{Orientation, OrientedEdge, WireData, WireId};

use crate::error::TopologyError;
use crate::math::Point3;
use slotmap::SlotMap;

/// Central arena that owns all topological entities.
///
/// Entities reference each other via typed IDs (generational indices).
/// Nothing in the boolean pipeline removes records, so ids handed out
/// during a run stay valid for the lifetime of the store.
#[derive(Debug, Default, Clone)]
pub struct TopologyStore {
    vertices: SlotMap<VertexId, VertexData>,
    edges: SlotMap<EdgeId, EdgeData>,
    wires: SlotMap<WireId, WireData>,
    faces: SlotMap<FaceId, FaceData>,
    shells: SlotMap<ShellId, ShellData>,
    solids: SlotMap<SolidId, SolidData>,
    compounds: SlotMap<CompoundId, CompoundData>,
}

macro_rules! arena_accessors {
    ($field:ident, $id:ty, $data:ty, $add:ident, $get:ident, $get_mut:ident, $label:literal) => {
        #[doc = concat!("Inserts a ", $label, " and returns its ID.")]
        pub fn $add(&mut self, data: $data) -> $id {
            self.$field.insert(data)
        }

        #[doc = concat!("Returns the ", $label, " data.")]
        ///
        /// # Errors
        ///
        /// Returns an error if the entity is not found in the store.
        pub fn $get(&self, id: $id) -> Result<&$data, TopologyError> {
            self.$field
                .get(id)
                .ok_or_else(|| TopologyError::EntityNotFound($label.into()))
        }

        #[doc = concat!("Returns the ", $label, " data mutably.")]
        ///
        /// # Errors
        ///
        /// Returns an error if the entity is not found in the store.
        pub fn $get_mut(&mut self, id: $id) -> Result<&mut $data, TopologyError> {
            self.$field
                .get_mut(id)
                .ok_or_else(|| TopologyError::EntityNotFound($label.into()))
        }
    };
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    arena_accessors!(vertices, VertexId, VertexData, add_vertex, vertex, vertex_mut, "vertex");
    arena_accessors!(edges, EdgeId, EdgeData, add_edge, edge, edge_mut, "edge");
    arena_accessors!(wires, WireId, WireData, add_wire, wire, wire_mut, "wire");
    arena_accessors!(faces, FaceId, FaceData, add_face, face, face_mut, "face");
    arena_accessors!(shells, ShellId, ShellData, add_shell, shell, shell_mut, "shell");
    arena_accessors!(solids, SolidId, SolidData, add_solid, solid, solid_mut, "solid");
    arena_accessors!(
        compounds,
        CompoundId,
        CompoundData,
        add_compound,
        compound,
        compound_mut,
        "compound"
    );

    /// Returns `true` if the handle refers to a live record.
    #[must_use]
    pub fn contains(&self, shape: Shape) -> bool {
        match shape {
            Shape::Vertex(id) => self.vertices.contains_key(id),
            Shape::Edge(id) => self.edges.contains_key(id),
            Shape::Wire(id) => self.wires.contains_key(id),
            Shape::Face(id) => self.faces.contains_key(id),
            Shape::Shell(id) => self.shells.contains_key(id),
            Shape::Solid(id) => self.solids.contains_key(id),
            Shape::Compound(id) => self.compounds.contains_key(id),
        }
    }

    /// Lazily iterates the distinct sub-shapes of `root` of the given kind.
    #[must_use]
    pub fn explore(&self, root: Shape, kind: ShapeKind) -> Explorer<'_> {
        Explorer::new(self, root, kind)
    }

    /// Collects the faces under `root`.
    #[must_use]
    pub fn faces_of(&self, root: Shape) -> Vec<FaceId> {
        self.explore(root, ShapeKind::Face)
            .filter_map(|s| match s {
                Shape::Face(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Collects the edges under `root`.
    #[must_use]
    pub fn edges_of(&self, root: Shape) -> Vec<EdgeId> {
        self.explore(root, ShapeKind::Edge)
            .filter_map(|s| match s {
                Shape::Edge(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Collects the vertices under `root`.
    #[must_use]
    pub fn vertices_of(&self, root: Shape) -> Vec<VertexId> {
        self.explore(root, ShapeKind::Vertex)
            .filter_map(|s| match s {
                Shape::Vertex(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Collects the solids under `root`.
    #[must_use]
    pub fn solids_of(&self, root: Shape) -> Vec<SolidId> {
        self.explore(root, ShapeKind::Solid)
            .filter_map(|s| match s {
                Shape::Solid(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Position of a vertex.
    ///
    /// # Errors
    ///
    /// Returns an error if the vertex does not exist.
    pub fn point(&self, id: VertexId) -> Result<Point3, TopologyError> {
        Ok(self.vertex(id)?.point)
    }

    /// Start and end vertex of an edge as traversed by `oe`.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge does not exist.
    pub fn oriented_ends(&self, oe: OrientedEdge) -> Result<(VertexId, VertexId), TopologyError> {
        let e = self.edge(oe.edge)?;
        Ok(if oe.is_forward() {
            (e.start, e.end)
        } else {
            (e.end, e.start)
        })
    }

    /// The loops of a face as oriented edge lists, outer loop first.
    ///
    /// # Errors
    ///
    /// Returns an error if the face or one of its wires does not exist.
    pub fn face_loops(&self, face: FaceId) -> Result<Vec<Vec<OrientedEdge>>, TopologyError> {
        let f = self.face(face)?;
        f.wires()
            .map(|w| Ok(self.wire(w)?.edges.clone()))
            .collect()
    }

    /// Returns `true` if every edge of `faces` is used exactly twice, once
    /// in each direction.
    ///
    /// # Errors
    ///
    /// Returns an error if a face, wire, or edge does not exist.
    pub fn is_closed_shell(&self, faces: &[FaceId]) -> Result<bool, TopologyError> {
        let mut uses: std::collections::HashMap<EdgeId, (usize, usize)> =
            std::collections::HashMap::new();
        for &f in faces {
            for lp in self.face_loops(f)? {
                for oe in lp {
                    let entry = uses.entry(oe.edge).or_default();
                    if oe.is_forward() {
                        entry.0 += 1;
                    } else {
                        entry.1 += 1;
                    }
                }
            }
        }
        Ok(!uses.is_empty() && uses.values().all(|&(fwd, rev)| fwd == 1 && rev == 1))
    }

    /// Outward unit normal of the face at surface parameters `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the face is missing or the normal is degenerate.
    pub fn face_normal(&self, face: FaceId, u: f64, v: f64) -> crate::error::Result<crate::math::Vector3> {
        use crate::geometry::surface::Surface;
        let f = self.face(face)?;
        let n = f.surface.normal(u, v)?;
        Ok(if f.same_sense { n } else { -n })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::operations::creation::MakeBox;

    #[test]
    fn missing_entity_is_an_error() {
        let mut store = TopologyStore::new();
        let v = store.add_vertex(VertexData::new(Point3::origin()));
        let other = TopologyStore::new();
        assert!(store.vertex(v).is_ok());
        assert!(other.vertex(v).is_err());
    }

    #[test]
    fn explorer_visits_shared_entities_once() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
            .execute(&mut store)
            .unwrap();
        let root = Shape::Solid(solid);
        assert_eq!(store.faces_of(root).len(), 6);
        assert_eq!(store.edges_of(root).len(), 12);
        assert_eq!(store.vertices_of(root).len(), 8);
    }

    #[test]
    fn explorer_is_lazy_and_restartable() {
        let mut store = TopologyStore::new();
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 2.0, 3.0))
            .execute(&mut store)
            .unwrap();
        let first: Vec<Shape> = store.explore(Shape::Solid(solid), ShapeKind::Edge).take(2).collect();
        let again: Vec<Shape> = store.explore(Shape::Solid(solid), ShapeKind::Edge).take(2).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(first, again);
    }

    #[test]
    fn orientation_composition() {
        assert_eq!(Orientation::Forward.compose(Orientation::Reversed), Orientation::Reversed);
        assert_eq!(Orientation::Reversed.compose(Orientation::Reversed), Orientation::Forward);
        assert_eq!(Orientation::Internal.reversed(), Orientation::Internal);
    }
}
