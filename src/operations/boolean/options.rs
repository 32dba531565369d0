use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::math::ToleranceConfig;

/// Cooperative cancellation flag shared between a caller and a running
/// boolean.
///
/// Clones share the flag. The driver polls it between face pairs and
/// between classified fragments.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`CancelToken::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Parameters of a boolean run.
#[derive(Debug, Clone)]
pub struct BooleanOptions {
    /// Extra distance within which entities of the two operands are
    /// merged. Defaults to the smaller of the operands' largest vertex
    /// tolerances.
    pub fuzzy: Option<f64>,
    /// Run the pairwise phases on the rayon thread pool.
    pub run_parallel: bool,
    /// Merge adjacent result faces that share a surface.
    pub simplify: bool,
    /// Reject operands whose own faces cross each other.
    pub check_self_intersection: bool,
    /// Cancellation flag polled during the run.
    pub cancel: Option<CancelToken>,
    /// Numerical policy.
    pub tolerance: ToleranceConfig,
}

impl Default for BooleanOptions {
    fn default() -> Self {
        Self {
            fuzzy: None,
            run_parallel: true,
            simplify: false,
            check_self_intersection: true,
            cancel: None,
            tolerance: ToleranceConfig::default(),
        }
    }
}

impl BooleanOptions {
    /// Sets the fuzzy tolerance.
    #[must_use]
    pub fn with_fuzzy(mut self, fuzzy: f64) -> Self {
        self.fuzzy = Some(fuzzy);
        self
    }

    /// Enables or disables parallel execution.
    #[must_use]
    pub fn with_parallel(mut self, run_parallel: bool) -> Self {
        self.run_parallel = run_parallel;
        self
    }

    /// Enables or disables merging of same-surface faces.
    #[must_use]
    pub fn with_simplify(mut self, simplify: bool) -> Self {
        self.simplify = simplify;
        self
    }

    /// Enables or disables the operand self-intersection check.
    #[must_use]
    pub fn with_self_intersection_check(mut self, check: bool) -> Self {
        self.check_self_intersection = check;
        self
    }

    /// Attaches a cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Replaces the numerical policy.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: ToleranceConfig) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}
