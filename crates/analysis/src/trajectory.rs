//! Citation trajectory engine
//!
//! Derives the forward citation slope of an article from its yearly
//! citation series: the projected next-year change in annual citation
//! count. Short series fall back to the arithmetic mean annual delta;
//! longer ones fit an AR(1) model on the first differences.

/// Series length below which the mean annual delta is used instead of
/// the autoregressive fit.
const MIN_FIT_POINTS: usize = 4;

/// Projected next-year change in annual citation count.
///
/// Pure function of the series; returns 0.0 for fewer than two points.
/// Years may arrive unsorted and with gaps; deltas are normalized per
/// elapsed year.
pub fn forward_slope(series: &[(i32, i32)]) -> f64 {
    let mut points: Vec<(i32, i32)> = series.to_vec();
    points.sort_by_key(|&(year, _)| year);
    points.dedup_by_key(|&mut (year, _)| year);

    if points.len() < 2 {
        return 0.0;
    }

    let deltas: Vec<f64> = points
        .windows(2)
        .map(|pair| {
            let (year0, count0) = pair[0];
            let (year1, count1) = pair[1];
            f64::from(count1 - count0) / f64::from(year1 - year0)
        })
        .collect();

    let mean = deltas.iter().sum::<f64>() / deltas.len() as f64;

    if points.len() < MIN_FIT_POINTS {
        return mean;
    }

    // AR(1) on the centered deltas; the lag-1 coefficient comes from a
    // least-squares fit and is clamped to keep the forecast stable.
    let centered: Vec<f64> = deltas.iter().map(|d| d - mean).collect();
    let numerator: f64 = centered.windows(2).map(|w| w[0] * w[1]).sum();
    let denominator: f64 = centered[..centered.len() - 1].iter().map(|x| x * x).sum();

    let phi = if denominator.abs() < f64::EPSILON {
        0.0
    } else {
        (numerator / denominator).clamp(-0.99, 0.99)
    };

    let last_centered = centered.last().copied().unwrap_or(0.0);
    mean + phi * last_centered
}
