use crate::error::Result;
use crate::topology::{Shape, TopologyStore};

use super::engine::{BooleanOperation, BooleanResult};
use super::options::BooleanOptions;
use super::select::BooleanOp;

/// Computes the region shared by both operands.
pub struct Common {
    a: Shape,
    b: Shape,
    options: BooleanOptions,
}

impl Common {
    /// Creates a new `Common` operation.
    #[must_use]
    pub fn new(a: impl Into<Shape>, b: impl Into<Shape>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
            options: BooleanOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BooleanOptions) -> Self {
        self.options = options;
        self
    }

    /// Executes the operation, creating the result in the topology store.
    ///
    /// # Errors
    ///
    /// Returns an error if an operand is invalid or the run is cancelled.
    pub fn execute(&self, store: &mut TopologyStore) -> Result<BooleanResult> {
        BooleanOperation::new(BooleanOp::Common, self.options.clone()).perform(store, self.a, self.b)
    }
}
