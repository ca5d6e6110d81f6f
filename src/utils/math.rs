use num::{ToPrimitive, Zero};

/// Division by a zero corpus-wide denominator.
///
/// Never leaves this module's callers, `safe_ratio` turns it into 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyDenominator;

/// numerator / denominator as f64
///
/// # Returns
/// * `Err(EmptyDenominator)` - if `den` is zero
#[inline]
pub fn ratio<N, D>(num: N, den: D) -> Result<f64, EmptyDenominator>
where
    N: ToPrimitive,
    D: ToPrimitive + Zero,
{
    if den.is_zero() {
        return Err(EmptyDenominator);
    }
    let n = num.to_f64().unwrap_or(0.0);
    let d = den.to_f64().ok_or(EmptyDenominator)?;
    Ok(n / d)
}

/// Ratio feature clamped to 0.0 - 1.0
///
/// A zero denominator gives 0.0, never NaN.
#[inline]
pub fn safe_ratio<N, D>(num: N, den: D) -> f64
where
    N: ToPrimitive,
    D: ToPrimitive + Zero,
{
    match ratio(num, den) {
        Ok(r) if r.is_finite() => r.clamp(0.0, 1.0),
        Ok(_) | Err(EmptyDenominator) => 0.0,
    }
}

/// Arithmetic mean, `None` for an empty slice
#[inline]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Kullback-Leibler divergence `Σ p ln(p/q)` over `(p, q)` pairs.
///
/// Terms with `p == 0` contribute 0. Terms with `q == 0` are undefined;
/// they are left out of the sum and counted.
///
/// # Returns
/// * `(f64, usize)` - divergence, number of undefined terms skipped
pub fn kl_divergence<I>(pairs: I) -> (f64, usize)
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut sum = 0.0;
    let mut undefined = 0usize;
    for (p, q) in pairs {
        if p <= 0.0 {
            continue;
        }
        if q <= 0.0 {
            undefined += 1;
            continue;
        }
        sum += p * (p / q).ln();
    }
    (sum, undefined)
}
