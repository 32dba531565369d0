use crate::error::Result;
use crate::topology::{Shape, TopologyStore};

use super::{TessellateFace, TessellationParams, TriangleMesh};

/// Tessellates every face under a shape into one combined mesh.
pub struct TessellateShape {
    shape: Shape,
    params: TessellationParams,
}

impl TessellateShape {
    /// Creates a new `TessellateShape` operation.
    #[must_use]
    pub fn new(shape: impl Into<Shape>, params: TessellationParams) -> Self {
        Self {
            shape: shape.into(),
            params,
        }
    }

    /// Executes the tessellation, returning a combined triangle mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape or any of its faces cannot be tessellated.
    pub fn execute(&self, store: &TopologyStore) -> Result<TriangleMesh> {
        let mut combined = TriangleMesh::default();
        for face in store.faces_of(self.shape) {
            let face_mesh = TessellateFace::new(face, self.params).execute(store)?;
            combined.merge(&face_mesh);
        }
        Ok(combined)
    }
}
