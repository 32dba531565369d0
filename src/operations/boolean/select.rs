use crate::error::Result;
use crate::tessellation::interior_point;
use crate::topology::TopologyStore;

use super::classify::{PointClassification, SolidClassifier};
use super::ds::Operand;
use super::split::FaceFragment;

/// The type of boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    /// Everything in either operand.
    Fuse,
    /// What the operands share.
    Common,
    /// The first operand minus the second.
    Cut,
    /// The second operand minus the first.
    Cut21,
    /// The intersection curves of the two boundaries.
    Section,
}

/// Where a face fragment lies relative to the other operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentState {
    In,
    Out,
    /// On a face of the other operand with the same outward normal.
    OnSame,
    /// On a face of the other operand with the opposite outward normal.
    OnOpposite,
}

/// Decision about whether to keep a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepDecision {
    Keep,
    KeepFlipped,
    Discard,
}

/// Determines whether a fragment should be kept based on its state
/// relative to the other operand and the boolean operation.
///
/// | Fragment | State      | Fuse | Common | Cut  | Cut21 |
/// |----------|------------|------|--------|------|-------|
/// | from A   | Out        | keep | -      | keep | -     |
/// | from A   | In         | -    | keep   | -    | flip  |
/// | from A   | OnSame     | keep | keep   | -    | -     |
/// | from A   | OnOpposite | -    | -      | keep | -     |
/// | from B   | Out        | keep | -      | -    | keep  |
/// | from B   | In         | -    | keep   | flip | -     |
/// | from B   | OnSame     | -    | -      | -    | -     |
/// | from B   | OnOpposite | -    | -      | -    | keep  |
///
/// Shared same-normal regions come from A only; section runs keep no
/// faces.
#[allow(clippy::match_same_arms)]
#[must_use]
pub fn should_keep_fragment(source: Operand, state: FragmentState, op: BooleanOp) -> KeepDecision {
    use FragmentState::{In, OnOpposite, OnSame, Out};
    match (op, source, state) {
        (BooleanOp::Section, _, _) => KeepDecision::Discard,

        (BooleanOp::Fuse, Operand::A, Out | OnSame) => KeepDecision::Keep,
        (BooleanOp::Fuse, Operand::B, Out) => KeepDecision::Keep,

        (BooleanOp::Common, Operand::A, In | OnSame) => KeepDecision::Keep,
        (BooleanOp::Common, Operand::B, In) => KeepDecision::Keep,

        (BooleanOp::Cut, Operand::A, Out | OnOpposite) => KeepDecision::Keep,
        (BooleanOp::Cut, Operand::B, In) => KeepDecision::KeepFlipped,

        (BooleanOp::Cut21, Operand::A, In) => KeepDecision::KeepFlipped,
        (BooleanOp::Cut21, Operand::B, Out | OnOpposite) => KeepDecision::Keep,

        _ => KeepDecision::Discard,
    }
}

/// Classifies a fragment by a point strictly inside it.
///
/// A point on the other operand's boundary is refined by comparing the
/// outward normals of the fragment and of the face it lies on.
///
/// # Errors
///
/// Returns an error if no interior point can be found or the classifier
/// fails.
pub fn fragment_state(
    store: &TopologyStore,
    other: &SolidClassifier,
    fragment: &FaceFragment,
) -> Result<FragmentState> {
    let map = fragment.domain.map();
    let uv = interior_point(&fragment.domain)?;
    let point = map.point(&uv)?;
    Ok(match other.classify(store, &point)? {
        PointClassification::Inside => FragmentState::In,
        PointClassification::Outside => FragmentState::Out,
        PointClassification::OnBoundary(face) => {
            let normal = map.normal(&uv)?;
            let Some(domain) = other.domain(face) else {
                return Ok(FragmentState::Out);
            };
            let theirs = domain.map().normal(&domain.map().project(&point))?;
            if normal.dot(&theirs) > 0.0 {
                FragmentState::OnSame
            } else {
                FragmentState::OnOpposite
            }
        }
    })
}
