//! Tolerance comparison of floating-point outputs.
//!
//! Host and device backends agree exactly when the functor is independent of
//! evaluation order. When it is not, callers compare with a tolerance.

use num_traits::Float;

/// Largest absolute element-wise difference, or `None` when the lengths differ.
/// A NaN on either side yields NaN.
pub fn max_abs_diff<T: Float>(a: &[T], b: &[T]) -> Option<T> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| {
        let d = (x - y).abs();
        if d.is_nan() || d > acc { d } else { acc }
    }))
}

/// Element-wise equality within `tol`.
pub fn approx_eq<T: Float>(a: &[T], b: &[T], tol: T) -> bool {
    matches!(max_abs_diff(a, b), Some(d) if d <= tol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_tolerance() {
        assert!(approx_eq(&[1.0f64, 2.0], &[1.0 + 1e-12, 2.0], 1e-9));
        assert!(!approx_eq(&[1.0f32], &[1.1], 1e-3));
    }

    #[test]
    fn length_mismatch_is_never_equal() {
        assert_eq!(max_abs_diff(&[1.0f64], &[1.0, 2.0]), None);
        assert!(!approx_eq(&[1.0f64], &[], 1.0));
    }

    #[test]
    fn nan_never_matches() {
        assert!(!approx_eq(&[f64::NAN], &[f64::NAN], 1.0));
    }
}
