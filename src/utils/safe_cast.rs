//! Safe casting utilities to prevent overflow on 32-bit systems

use crate::{Error, Result};

/// Safely convert usize to i32 with overflow checking
///
/// # Errors
///
/// Returns an error if the value exceeds `i32::MAX`
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Safely convert f64 to i32 with bounds checking
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
pub fn f64_to_i32(value: f64) -> Result<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to i32"
        )))
    }
}

/// Clamp and convert f64 to i32 for pixel coordinates
#[allow(clippy::cast_possible_truncation)] // Truncation after clamping is safe
#[must_use]
pub fn f64_to_i32_clamp(value: f64, min: i32, max: i32) -> i32 {
    if value.is_nan() {
        return min;
    }
    (value.clamp(f64::from(min), f64::from(max))) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usize_to_i32() {
        assert_eq!(usize_to_i32(0).unwrap(), 0);
        assert_eq!(usize_to_i32(640).unwrap(), 640);
        assert!(usize_to_i32(usize::try_from(i64::from(i32::MAX) + 1).unwrap()).is_err());
    }

    #[test]
    fn test_f64_to_i32() {
        assert_eq!(f64_to_i32(3.7).unwrap(), 3);
        assert_eq!(f64_to_i32(-2.1).unwrap(), -2);
        assert!(f64_to_i32(f64::NAN).is_err());
        assert!(f64_to_i32(f64::INFINITY).is_err());
        assert!(f64_to_i32(1e12).is_err());
    }

    #[test]
    fn test_f64_to_i32_clamp() {
        assert_eq!(f64_to_i32_clamp(100.4, 0, 640), 100);
        assert_eq!(f64_to_i32_clamp(-5.0, 0, 640), 0);
        assert_eq!(f64_to_i32_clamp(10_000.0, 0, 640), 640);
        assert_eq!(f64_to_i32_clamp(f64::NAN, 0, 640), 0);
    }
}
