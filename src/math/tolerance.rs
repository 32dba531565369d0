/// Numerical policy for a boolean run.
///
/// One value is threaded through every intersection, classification and
/// splitting call so that a run is reproducible from its inputs alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceConfig {
    /// Distance below which two points are the same point.
    pub confusion: f64,
    /// Angle (radians) below which two directions are parallel.
    pub angular: f64,
    /// Parameter-space resolution used by root finders.
    pub parametric: f64,
    /// Iteration cap for every Newton/bisection loop.
    pub max_iterations: usize,
    /// Ray directions tried by the point classifier before falling back to
    /// the winding number.
    pub max_ray_attempts: usize,
    /// Maximum chord deviation when sampling curved geometry.
    pub deflection: f64,
    /// Cells per parameter direction of the surface/surface sampling grid.
    pub surface_grid: usize,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            confusion: 1e-7,
            angular: 1e-9,
            parametric: 1e-9,
            max_iterations: 64,
            max_ray_attempts: 5,
            deflection: 1e-3,
            surface_grid: 32,
        }
    }
}

impl ToleranceConfig {
    /// Returns the effective distance tolerance when an entity carries its
    /// own tolerance `extra`.
    #[must_use]
    pub fn linear(&self, extra: f64) -> f64 {
        self.confusion.max(extra)
    }

    /// Widens the confusion distance to at least `fuzzy`.
    #[must_use]
    pub fn with_fuzzy(mut self, fuzzy: f64) -> Self {
        if fuzzy.is_finite() && fuzzy > self.confusion {
            self.confusion = fuzzy;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_only_widens() {
        let tol = ToleranceConfig::default().with_fuzzy(1e-3);
        assert!((tol.confusion - 1e-3).abs() < 1e-15);
        let tol = ToleranceConfig::default().with_fuzzy(1e-12);
        assert!((tol.confusion - 1e-7).abs() < 1e-15);
    }

    #[test]
    fn linear_takes_the_larger() {
        let tol = ToleranceConfig::default();
        assert!((tol.linear(1e-5) - 1e-5).abs() < 1e-15);
        assert!((tol.linear(0.0) - 1e-7).abs() < 1e-15);
    }
}
