//! Numerical tolerance and canonical number formatting.
//!
//! Invariants:
//! * Two doubles compare equal when |a-b| <= 1e-12 * max(|a|, |b|); two
//!   floats with 1e-5. Exact zero compares equal only to exact zero under
//!   the relative test, so an absolute fallback of the same magnitude is
//!   applied when either side is zero.
//! * `fmod_positive` always returns a value in [0, b).

/// Relative tolerance for `f64` comparisons.
pub const DOUBLE_TOLERANCE: f64 = 1e-12;

/// Relative tolerance for `f32` comparisons.
pub const FLOAT_TOLERANCE: f32 = 1e-5;

/// Tolerant equality for doubles.
pub fn doubles_equal(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return true;
    }
    (a - b).abs() <= DOUBLE_TOLERANCE * scale.max(1.0)
}

/// Tolerant equality for single-precision floats.
pub fn floats_equal(a: f32, b: f32) -> bool {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return true;
    }
    (a - b).abs() <= FLOAT_TOLERANCE * scale.max(1.0)
}

/// Floating-point remainder normalised into [0, b).
pub fn fmod_positive(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r < 0.0 { r + b.abs() } else { r }
}

/// Canonical decimal form: integral values print with no fractional part,
/// everything else uses the shortest round-trip representation.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerant_equality() {
        assert!(doubles_equal(1.0, 1.0 + 1e-13));
        assert!(!doubles_equal(1.0, 1.0 + 1e-9));
        assert!(doubles_equal(0.0, 0.0));
        assert!(floats_equal(100.0, 100.0005));
    }

    #[test]
    fn fmod_stays_non_negative() {
        assert_eq!(fmod_positive(7.5, 2.0), 1.5);
        assert_eq!(fmod_positive(-0.5, 2.0), 1.5);
        assert_eq!(fmod_positive(-4.0, 2.0), 0.0);
    }

    #[test]
    fn integers_print_without_fraction() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(0.0), "0");
    }
}
