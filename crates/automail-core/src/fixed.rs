use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_converts_exactly_at_bounds() {
        assert_eq!(f64_to_fixed64(0.0), Fixed64::ZERO);
        assert_eq!(f64_to_fixed64(1.0), Fixed64::ONE);
    }

    #[test]
    fn tenth_survives_conversion_closely() {
        let p = f64_to_fixed64(0.1);
        assert!((fixed64_to_f64(p) - 0.1).abs() < 1e-9);
    }
}
