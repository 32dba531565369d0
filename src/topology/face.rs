use crate::geometry::surface::SurfaceGeom;

use super::vertex::DEFAULT_VERTEX_TOLERANCE;
use super::wire::WireId;

slotmap::new_key_type! {
    /// Unique identifier for a face in the topology store.
    pub struct FaceId;
}

/// Data associated with a topological face.
///
/// A face is a bounded region on a surface, defined by an outer wire
/// and optionally inner wires (holes). Walking any of its wires with the
/// face normal pointing at the viewer keeps the face material on the left.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// The geometric surface on which this face lies.
    pub surface: SurfaceGeom,
    /// The outer boundary wire.
    pub outer_wire: WireId,
    /// Inner boundary wires (holes).
    pub inner_wires: Vec<WireId>,
    /// If `true`, the face normal agrees with the surface normal.
    pub same_sense: bool,
    /// Distance within which points are considered on the face.
    pub tolerance: f64,
}

impl FaceData {
    /// Creates a face with the default tolerance.
    #[must_use]
    pub fn new(
        surface: SurfaceGeom,
        outer_wire: WireId,
        inner_wires: Vec<WireId>,
        same_sense: bool,
    ) -> Self {
        Self {
            surface,
            outer_wire,
            inner_wires,
            same_sense,
            tolerance: DEFAULT_VERTEX_TOLERANCE,
        }
    }

    /// All wires, outer first.
    pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
        std::iter::once(self.outer_wire).chain(self.inner_wires.iter().copied())
    }
}
