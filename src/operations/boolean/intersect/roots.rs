use crate::math::ToleranceConfig;

/// Root of `f` in `[a, b]` where `f(a)` and `f(b)` differ in sign.
///
/// Newton steps with a central-difference slope; a step that leaves the
/// bracket is replaced by bisection. Returns `None` if the bracket is not
/// a sign change or the iteration budget runs out.
pub(super) fn bracketed_root(
    f: impl Fn(f64) -> f64,
    a: f64,
    b: f64,
    value_tol: f64,
    tol: &ToleranceConfig,
) -> Option<f64> {
    let (mut lo, mut hi) = (a.min(b), a.max(b));
    let mut f_lo = f(lo);
    let f_hi = f(hi);
    if f_lo.abs() <= value_tol {
        return Some(lo);
    }
    if f_hi.abs() <= value_tol {
        return Some(hi);
    }
    if f_lo.is_nan() || f_hi.is_nan() || (f_lo < 0.0) == (f_hi < 0.0) {
        return None;
    }

    let mut x = 0.5 * (lo + hi);
    for _ in 0..tol.max_iterations {
        let fx = f(x);
        if fx.is_nan() {
            return None;
        }
        if fx.abs() <= value_tol || hi - lo <= tol.parametric {
            return Some(x);
        }
        if (fx < 0.0) == (f_lo < 0.0) {
            lo = x;
            f_lo = fx;
        } else {
            hi = x;
        }

        let h = (1e-7 * x.abs().max(1.0)).min(0.25 * (hi - lo)).max(f64::EPSILON);
        let slope = (f(x + h) - f(x - h)) / (2.0 * h);
        let newton = x - fx / slope;
        x = if slope.is_finite() && slope != 0.0 && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
    }
    None
}

/// Golden-section search for the minimum of `f` over `[a, b]`.
///
/// Returns the location and value of the smallest sample seen.
pub(super) fn minimize(f: impl Fn(f64) -> f64, a: f64, b: f64, tol: &ToleranceConfig) -> (f64, f64) {
    const INV_PHI: f64 = 0.618_033_988_749_894_8;
    let (mut lo, mut hi) = (a.min(b), a.max(b));
    let mut x1 = hi - INV_PHI * (hi - lo);
    let mut x2 = lo + INV_PHI * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);
    for _ in 0..tol.max_iterations {
        if hi - lo <= tol.parametric {
            break;
        }
        if f1 < f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_PHI * (hi - lo);
            f1 = f(x1);
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_PHI * (hi - lo);
            f2 = f(x2);
        }
    }
    let candidates = [(a, f(a)), (b, f(b)), (x1, f1), (x2, f2)];
    candidates
        .into_iter()
        .filter(|(_, v)| !v.is_nan())
        .min_by(|p, q| p.1.total_cmp(&q.1))
        .unwrap_or((0.5 * (lo + hi), f64::INFINITY))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_a_simple_root() {
        let tol = ToleranceConfig::default();
        let root = bracketed_root(|x| x * x - 2.0, 0.0, 3.0, 1e-12, &tol);
        assert!(root.is_some_and(|r| (r - 2f64.sqrt()).abs() < 1e-9));
    }

    #[test]
    fn rejects_a_bracket_without_sign_change() {
        let tol = ToleranceConfig::default();
        assert!(bracketed_root(|x| x * x + 1.0, -1.0, 2.0, 1e-12, &tol).is_none());
    }

    #[test]
    fn survives_a_flat_slope() {
        let tol = ToleranceConfig::default();
        // Newton from the midpoint would divide by zero.
        let root = bracketed_root(|x: f64| x.powi(3), -1.0, 1.0, 1e-15, &tol);
        assert!(root.is_some_and(|r| r.abs() < 1e-5));
    }

    #[test]
    fn golden_section_finds_the_minimum() {
        let tol = ToleranceConfig::default();
        let (x, fx) = minimize(|x| (x - 0.3).powi(2) + 1.0, -2.0, 2.0, &tol);
        assert!((x - 0.3).abs() < 1e-6);
        assert!((fx - 1.0).abs() < 1e-10);
    }
}
