use super::edge::EdgeId;

slotmap::new_key_type! {
    /// Unique identifier for a wire in the topology store.
    pub struct WireId;
}

/// How a child's intrinsic direction maps into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Forward,
    Reversed,
    /// Embedded in the parent's interior (both sides belong to the parent).
    Internal,
    /// Touching the parent from outside (neither side belongs to it).
    External,
}

impl Orientation {
    /// Returns the opposite orientation. Internal and External are their
    /// own reverse.
    #[must_use]
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Reversed,
            Self::Reversed => Self::Forward,
            other => other,
        }
    }

    /// Composes a child orientation with the parent's.
    #[must_use]
    pub fn compose(self, parent: Orientation) -> Self {
        match parent {
            Self::Reversed => self.reversed(),
            _ => self,
        }
    }
}

/// An edge with orientation information within a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrientedEdge {
    /// The edge identifier.
    pub edge: EdgeId,
    /// Direction of travel along the edge.
    pub orientation: Orientation,
}

impl OrientedEdge {
    /// Creates a new oriented edge.
    #[must_use]
    pub fn new(edge: EdgeId, forward: bool) -> Self {
        Self {
            edge,
            orientation: if forward {
                Orientation::Forward
            } else {
                Orientation::Reversed
            },
        }
    }

    /// Returns `true` if the edge is traversed start to end.
    #[must_use]
    pub fn is_forward(&self) -> bool {
        self.orientation != Orientation::Reversed
    }

    /// Returns the same edge traversed the other way.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            edge: self.edge,
            orientation: self.orientation.reversed(),
        }
    }
}

/// Data associated with a topological wire.
///
/// A wire is an ordered sequence of oriented edges forming a connected path.
#[derive(Debug, Clone)]
pub struct WireData {
    /// The ordered sequence of oriented edges.
    pub edges: Vec<OrientedEdge>,
    /// Whether this wire forms a closed loop.
    pub is_closed: bool,
}
