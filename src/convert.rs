use std::convert::TryInto;
use std::fmt::Debug;

/// Convert `n` to `usize` using `TryFrom` or panic.
///
/// # Panics
/// Panics if the conversion returns an error.
pub fn cast_usize<T>(n: T) -> usize
where
    T: TryInto<usize>,
    <T as TryInto<usize>>::Error: Debug,
{
    n.try_into().expect("Expected N to fit in usize")
}

/// Convert `n` to `i64` using `TryFrom` or panic.
///
/// # Panics
/// Panics if the conversion returns an error.
pub fn cast_i64<T>(n: T) -> i64
where
    T: TryInto<i64>,
    <T as TryInto<i64>>::Error: Debug,
{
    n.try_into().expect("Expected N to fit in i64")
}

/// Rounds to the nearest integer, breaking ties towards the even neighbor.
///
/// 2.5 rounds to 2, 3.5 rounds to 4 and -2.5 rounds to -2.
pub fn round_half_to_even(n: f64) -> f64 {
    let rounded = n.round();
    if (n - n.trunc()).abs() == 0.5 {
        // `round` breaks ties away from zero, step back if that made it odd.
        if rounded % 2.0 != 0.0 {
            return rounded - n.signum();
        }
    }

    rounded
}

/// Converts a float voxel coordinate to `i64`. Out of range values saturate
/// and NaN maps to `i64::MIN`, so bounds checks reject both.
pub fn saturating_cast_f64_to_i64(n: f64) -> i64 {
    if n.is_nan() {
        i64::MIN
    } else {
        n as i64
    }
}
