//! Piecewise-linear compression of ranked fitness values.
//!
//! A generation's fitness distribution is stored as `(rank, value)` pairs
//! chosen so that linear interpolation between consecutive pairs stays
//! within [`MAX_FITNESS_DEVIATION`] (relative) of every skipped value.
//! The first value is always kept, and so is the last one when there is
//! more than one value.
//!
//! Consumers recover an approximate curve with [`interpolate_fitness`].

use darwin_types::CompressedFitnessValue;

/// Default maximum relative deviation between a skipped value and the
/// interpolated curve.
pub const MAX_FITNESS_DEVIATION: f32 = 0.01;

/// Compress ranked fitness values with the default deviation.
pub fn compress_fitness(ranked: &[f32]) -> Vec<CompressedFitnessValue> {
    compress_fitness_with(ranked, MAX_FITNESS_DEVIATION)
}

/// Compress ranked fitness values with a custom maximum deviation.
///
/// A zero value cannot carry a relative deviation, so the absolute one is
/// used against it instead.
#[allow(
    clippy::arithmetic_side_effects,
    clippy::cast_precision_loss,
    clippy::float_cmp
)]
pub fn compress_fitness_with(ranked: &[f32], max_deviation: f32) -> Vec<CompressedFitnessValue> {
    let Some(&first) = ranked.first() else {
        return Vec::new();
    };

    let mut compressed = vec![CompressedFitnessValue(0, first)];
    let (mut last_index, mut last_value) = (0_usize, first);

    // window k holds (ranked[k], ranked[k + 1]); the candidate is k + 1
    for (prev_index, window) in ranked.windows(2).enumerate().skip(1) {
        let &[prev_value, value] = window else {
            continue;
        };
        let index = prev_index + 1;

        let slope = (value - last_value) / (index - last_index) as f32;
        let approx = (prev_index - last_index) as f32 * slope + last_value;
        let deviation = if prev_value == 0.0 {
            approx.abs()
        } else {
            ((approx - prev_value) / prev_value).abs()
        };

        if deviation > max_deviation {
            last_index = prev_index;
            last_value = prev_value;
            compressed.push(CompressedFitnessValue(last_index, last_value));
        }
    }

    if let (true, Some(&last)) = (ranked.len() > 1, ranked.last()) {
        compressed.push(CompressedFitnessValue(ranked.len() - 1, last));
    }

    compressed
}

/// Expand compressed points back into one value per rank.
///
/// Points are expected in increasing rank order starting at rank 0.
#[allow(clippy::arithmetic_side_effects, clippy::cast_precision_loss)]
pub fn interpolate_fitness(points: &[CompressedFitnessValue]) -> Vec<f32> {
    let Some(last) = points.last() else {
        return Vec::new();
    };

    let mut curve = Vec::with_capacity(last.rank().saturating_add(1));
    for window in points.windows(2) {
        let &[from, to] = window else {
            continue;
        };
        let span = to.rank().saturating_sub(from.rank());
        for offset in 0..span {
            let t = offset as f32 / span as f32;
            curve.push((to.value() - from.value()).mul_add(t, from.value()));
        }
    }
    curve.push(last.value());
    curve
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn ranks(points: &[CompressedFitnessValue]) -> Vec<usize> {
        points.iter().map(|p| p.rank()).collect()
    }

    #[test]
    fn single_value_is_kept() {
        let compressed = compress_fitness(&[-125.1]);
        assert_eq!(compressed, vec![CompressedFitnessValue(0, -125.1)]);
    }

    #[test]
    fn ends_are_always_included() {
        assert_eq!(ranks(&compress_fitness(&[100.0, 100.0])), [0, 1]);
        assert_eq!(ranks(&compress_fitness(&[100.0, 100.0, 100.0])), [0, 2]);
        assert_eq!(ranks(&compress_fitness(&[100.0, 10.0, 10.0])), [0, 1, 2]);
        assert!(compress_fitness(&[]).is_empty());
    }

    #[test]
    fn equal_values_collapse_to_two_points() {
        let values = vec![0.0125_f32; 1000];
        let compressed = compress_fitness(&values);
        assert_eq!(ranks(&compressed), [0, 999]);
        assert_eq!(compressed[1].value(), 0.0125);
    }

    #[test]
    fn exponential_values_keep_every_point() {
        let values: Vec<f32> = (0..100).map(|i| 2.0_f32.powi(i)).collect();
        assert_eq!(compress_fitness(&values).len(), 100);
    }

    #[test]
    fn steps_keep_two_points_per_step() {
        let values: Vec<f32> = (0..10_000_u16).map(|i| f32::from(i / 1000)).collect();
        assert_eq!(compress_fitness(&values).len(), 20);
    }

    #[test]
    fn gradient_collapses_to_its_ends() {
        let values: Vec<f32> = (0..10_000_u16).map(f32::from).collect();
        assert_eq!(ranks(&compress_fitness(&values)), [0, 9_999]);
    }

    #[test]
    fn interpolation_recovers_a_descending_curve() {
        let values: Vec<f32> = (0..500_u16).map(|i| 1000.0 - f32::from(i) * 1.5).collect();
        let compressed = compress_fitness(&values);
        let curve = interpolate_fitness(&compressed);
        assert_eq!(curve.len(), values.len());
        for (approx, exact) in curve.iter().zip(&values) {
            assert!(((approx - exact) / exact).abs() <= MAX_FITNESS_DEVIATION);
        }
    }

    #[test]
    fn interpolation_of_nothing_is_empty() {
        assert!(interpolate_fitness(&[]).is_empty());
        assert_eq!(interpolate_fitness(&[CompressedFitnessValue(0, 3.0)]), vec![3.0]);
    }
}
