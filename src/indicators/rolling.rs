// =============================================================================
// Series primitives over optional values
// =============================================================================
//
// Every series in the pipeline is a `[Option<f64>]` where `None` marks an
// undefined point. These helpers never invent values: a result is defined
// only when every operand it depends on is defined.

/// Difference with the previous element: `out[i] = v[i] - v[i-1]`.
///
/// The first element, and any element whose operand is undefined, is `None`.
pub fn diff(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let d = if i == 0 {
            None
        } else {
            match (values[i], values[i - 1]) {
                (Some(cur), Some(prev)) => Some(cur - prev),
                _ => None,
            }
        };
        out.push(d);
    }
    out
}

/// Shift the series forward by `lag` positions: `out[i] = v[i - lag]`.
pub fn shift<T: Clone>(values: &[Option<T>], lag: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|i| if i >= lag { values[i - lag].clone() } else { None })
        .collect()
}

/// Propagate the last defined value forward over `None` gaps.
///
/// Leading `None`s stay `None`; nothing is filled backward.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect()
}

/// Sample (n - 1) standard deviation of the trailing `window` elements.
///
/// `out[i]` is `None` until `window` elements are available, or when any
/// element inside the window is undefined. A `window` below 2 yields an
/// all-`None` series since the sample deviation is undefined there.
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    for end in window..=values.len() {
        let slice = &values[end - window..end];
        let defined: Option<Vec<f64>> = slice.iter().copied().collect();
        let Some(xs) = defined else {
            continue;
        };
        let mean = xs.iter().sum::<f64>() / window as f64;
        let variance =
            xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        let std_dev = variance.sqrt();
        if std_dev.is_finite() {
            out[end - 1] = Some(std_dev);
        }
    }

    out
}

/// Round half away from zero to `decimals` digits.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
