use crate::error::Result;
use crate::geometry::Curve;
use crate::math::{Aabb, ToleranceConfig};
use crate::tessellation::FaceDomain;
use crate::topology::{Shape, TopologyStore};

/// Computes the axis-aligned bounding box of any shape.
///
/// Faces contribute their boundary and the surface samples inside them,
/// edges their sampled curve and vertices their point. No tolerance band
/// is added.
pub struct BoundingBox {
    shape: Shape,
    tol: ToleranceConfig,
}

impl BoundingBox {
    /// Creates a new `BoundingBox` query.
    #[must_use]
    pub fn new(shape: impl Into<Shape>) -> Self {
        Self {
            shape: shape.into(),
            tol: ToleranceConfig::default(),
        }
    }

    /// Sets the sampling tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tol: ToleranceConfig) -> Self {
        self.tol = tol;
        self
    }

    /// Executes the query. An empty shape gives an empty box.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity is missing or a face cannot be
    /// sampled.
    pub fn execute(&self, store: &TopologyStore) -> Result<Aabb> {
        let mut bbox = Aabb::empty();
        for face in store.faces_of(self.shape) {
            let domain = FaceDomain::new(store, face, &self.tol)?;
            bbox.merge(&domain.tight_bbox(16));
        }
        for edge in store.edges_of(self.shape) {
            let data = store.edge(edge)?;
            for t in data.curve.sample_params(data.t_start, data.t_end, self.tol.deflection) {
                bbox.include(&data.curve.evaluate(t)?);
            }
        }
        for vertex in store.vertices_of(self.shape) {
            bbox.include(&store.point(vertex)?);
        }
        Ok(bbox)
    }
}
