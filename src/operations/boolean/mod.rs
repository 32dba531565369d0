//! Boolean operations on solids.
//!
//! A run intersects the operands ([`PaveFiller`]), splits every face
//! along the intersection ([`split_face`]), classifies the fragments
//! against the other operand ([`SolidClassifier`]) and stitches the kept
//! ones into the result.

mod assemble;
mod classify;
mod common;
mod cut;
mod ds;
mod engine;
mod fuse;
mod history;
mod intersect;
mod merge;
mod options;
mod pave;
mod report;
#[cfg(test)]
mod scenarios;
mod section;
mod select;
mod split;

pub use classify::{classify_point_in_solid, PointClassification, SolidClassifier};
pub use common::Common;
pub use cut::{Cut, Cut21};
pub use ds::{BopDs, Interference, InterferenceKind, Operand, Pave};
pub use engine::{BooleanOperation, BooleanResult, OperationState};
pub use fuse::Fuse;
pub use history::History;
pub use intersect::{
    intersect_curve_surface, intersect_curves, intersect_surfaces, IntersectResult, Locus, Param,
};
pub use options::{BooleanOptions, CancelToken};
pub use pave::PaveFiller;
pub use report::{Diagnostic, Warning};
pub use section::Section;
pub use select::{should_keep_fragment, BooleanOp, FragmentState, KeepDecision};
pub use split::{split_face, FaceFragment, SplitFace};
