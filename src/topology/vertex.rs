use crate::math::Point3;

slotmap::new_key_type! {
    /// Unique identifier for a vertex in the topology store.
    pub struct VertexId;
}

/// Default tolerance radius of a freshly built vertex.
pub const DEFAULT_VERTEX_TOLERANCE: f64 = 1e-7;

/// Data associated with a topological vertex.
#[derive(Debug, Clone)]
pub struct VertexData {
    /// The 3D position of the vertex.
    pub point: Point3,
    /// Radius of the sphere within which the vertex is considered to lie.
    pub tolerance: f64,
}

impl VertexData {
    /// Creates a new vertex at the given point with the default tolerance.
    #[must_use]
    pub fn new(point: Point3) -> Self {
        Self {
            point,
            tolerance: DEFAULT_VERTEX_TOLERANCE,
        }
    }

    /// Creates a vertex with an explicit tolerance.
    #[must_use]
    pub fn with_tolerance(point: Point3, tolerance: f64) -> Self {
        Self { point, tolerance }
    }
}
