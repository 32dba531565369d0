//! Boolean operations (fuse, common, cut, section) on boundary-representation
//! solids.

pub mod error;
pub mod geometry;
pub mod math;
pub mod operations;
pub mod tessellation;
pub mod topology;

pub use error::{BopError, Result};
