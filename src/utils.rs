//! Utility functions for rounding and coordinate conversions.

pub mod safe_cast;

/// Round with ties going up (`floor(n * 10^d + 0.5) / 10^d`), used for all
/// keyboard pixel arithmetic.
#[must_use]
pub fn round_half_up(n: f64, decimals: u32) -> f64 {
    let multiplier = 10f64.powi(decimals as i32);
    (n * multiplier + 0.5).floor() / multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5, 0), 3.0);
        assert_eq!(round_half_up(2.4, 0), 2.0);
        assert_eq!(round_half_up(1.25, 1), 1.3);
        assert_eq!(round_half_up(-0.5, 0), 0.0);
    }

    #[test]
    fn test_round_half_up_identity_on_integers() {
        for i in 0..100 {
            let v = f64::from(i);
            assert_eq!(round_half_up(v, 0), v);
        }
    }
}
