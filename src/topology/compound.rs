use super::shape::Shape;
use super::wire::Orientation;

slotmap::new_key_type! {
    /// Unique identifier for a compound in the topology store.
    pub struct CompoundId;
}

/// An unordered group of arbitrary shapes.
#[derive(Debug, Clone, Default)]
pub struct CompoundData {
    /// Children with their orientation in the compound.
    pub children: Vec<(Shape, Orientation)>,
}

impl CompoundData {
    /// Builds a compound of forward-oriented children.
    #[must_use]
    pub fn of(children: impl IntoIterator<Item = Shape>) -> Self {
        Self {
            children: children
                .into_iter()
                .map(|s| (s, Orientation::Forward))
                .collect(),
        }
    }
}
