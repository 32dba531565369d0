use std::fmt;

use thiserror::Error;

use crate::math::Point3;
use crate::topology::FaceId;

/// Why a single intersection or classification could not be trusted.
///
/// Returned per pair or per fragment; the driver downgrades it to a
/// [`Warning`] and carries on with the remaining work.
#[derive(Debug, Clone, Error)]
pub enum Diagnostic {
    #[error("no convergence within {iterations} iterations near {near}")]
    Undetermined { near: Point3, iterations: usize },

    #[error("degenerate geometry near {near}: {reason}")]
    Degenerate { near: Point3, reason: String },
}

impl Diagnostic {
    /// Location the diagnostic refers to.
    #[must_use]
    pub fn near(&self) -> Point3 {
        match self {
            Self::Undetermined { near, .. } | Self::Degenerate { near, .. } => *near,
        }
    }
}

/// A recoverable condition recorded with a successful result.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// An intersection or classification gave no reliable answer.
    Undetermined { near: Point3 },
    /// Two faces share their surface over a region.
    CoincidentFaces { first: FaceId, second: FaceId },
    /// Two surfaces touch without crossing.
    TangentialContact { near: Point3 },
    /// A shell of the result bounds no solid and was emitted free.
    NonManifoldResult { faces: usize },
    /// A hole of a split face had no enclosing boundary and was dropped.
    DroppedHole { face: FaceId },
}

impl Warning {
    fn locus(&self) -> String {
        match self {
            Self::Undetermined { near } | Self::TangentialContact { near } => {
                format!("({:.6}, {:.6}, {:.6})", near.x, near.y, near.z)
            }
            Self::CoincidentFaces { first, second } => {
                format!("coincident faces {first:?} and {second:?}")
            }
            Self::NonManifoldResult { faces } => format!("an open shell of {faces} face(s)"),
            Self::DroppedHole { face } => format!("a hole of face {face:?}"),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "result is geometrically valid but may contain approximations near {}",
            self.locus()
        )
    }
}

impl From<Diagnostic> for Warning {
    fn from(d: Diagnostic) -> Self {
        Self::Undetermined { near: d.near() }
    }
}
