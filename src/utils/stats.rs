use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(Statistics::mean(values.iter().copied()))
    }
}

/// Sample standard deviation (n-1 denominator), `None` below two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        None
    } else {
        Some(Statistics::std_dev(values.iter().copied()))
    }
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Median via sorted copy, averaging the middle pair for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Empirical percentile with linear interpolation between order statistics,
/// `p` in [0, 1].
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }

    let weight = rank - lower as f64;
    Some(sorted[lower] * (1.0 - weight) + sorted[upper] * weight)
}

/// Pearson correlation coefficient over paired samples.
///
/// Returns `None` for fewer than two pairs or a zero-variance side.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let mean_x = Statistics::mean(xs.iter().copied());
    let mean_y = Statistics::mean(ys.iter().copied());

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }

    Some(cov / denom)
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// Linearly interpolate interior gaps of missing values in place.
///
/// Only gaps bounded by present values on both sides and no longer than
/// `max_gap` are filled; leading and trailing gaps are left untouched.
pub fn interpolate_gaps(values: &mut [Option<f64>], max_gap: usize) {
    let mut i = 0;
    while i < values.len() {
        if values[i].is_some() {
            i += 1;
            continue;
        }

        let gap_start = i;
        let mut gap_end = i;
        while gap_end + 1 < values.len() && values[gap_end + 1].is_none() {
            gap_end += 1;
        }

        let gap_len = gap_end - gap_start + 1;
        let before = gap_start.checked_sub(1).and_then(|j| values[j]);
        let after = values.get(gap_end + 1).copied().flatten();

        if let (Some(left), Some(right)) = (before, after) {
            if gap_len <= max_gap {
                let span = (gap_len + 1) as f64;
                for (k, slot) in values[gap_start..=gap_end].iter_mut().enumerate() {
                    let t = (k + 1) as f64 / span;
                    *slot = Some(left + (right - left) * t);
                }
            }
        }

        i = gap_end + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_std_dev_needs_two_values() {
        assert_eq!(std_dev(&[5.0]), None);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138089935).abs() < 1e-6);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&values, 0.0), Some(10.0));
        assert_eq!(percentile(&values, 1.0), Some(40.0));
        assert_eq!(percentile(&values, 0.5), Some(25.0));
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let r = pearson(&xs, &ys).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let neg = [8.0, 6.0, 4.0, 2.0];
        let r = pearson(&xs, &neg).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_zero_variance() {
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[2.0, 3.0, 4.0]), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(2.675, 0), 3.0);
        assert_eq!(round_to(1234.5, 0), 1235.0);
    }

    #[test]
    fn test_interpolate_short_interior_gap() {
        let mut values = vec![Some(1.0), None, None, Some(4.0)];
        interpolate_gaps(&mut values, 3);
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_interpolate_skips_long_gap_and_edges() {
        let mut values = vec![None, Some(1.0), None, None, None, None, Some(6.0), None];
        interpolate_gaps(&mut values, 3);
        // 4-wide interior gap exceeds the limit; edge gaps never fill.
        assert_eq!(
            values,
            vec![None, Some(1.0), None, None, None, None, Some(6.0), None]
        );
    }
}
