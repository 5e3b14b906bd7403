use super::round_to;
use crate::metrics::Field;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

/// A metric pair to correlate, with the label shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationPair {
    pub first: Field,
    pub second: Field,
    pub label: &'static str,
}

/// The pairs reported by the statistics view.
pub const DEFAULT_CORRELATION_PAIRS: &[CorrelationPair] = &[
    CorrelationPair {
        first: Field::TemperatureMax,
        second: Field::Rainfall,
        label: "Temperature vs Rainfall",
    },
    CorrelationPair {
        first: Field::TemperatureMax,
        second: Field::HumidityMax,
        label: "Temperature vs Humidity",
    },
    CorrelationPair {
        first: Field::Rainfall,
        second: Field::HumidityMax,
        label: "Rainfall vs Humidity",
    },
    CorrelationPair {
        first: Field::Wind,
        second: Field::TemperatureMax,
        label: "Wind Speed vs Temperature",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
    #[serde(rename = "Very Weak")]
    VeryWeak,
}

impl Strength {
    pub fn classify(correlation: f64) -> Self {
        let abs_corr = correlation.abs();
        if abs_corr >= 0.7 {
            Strength::Strong
        } else if abs_corr >= 0.4 {
            Strength::Moderate
        } else if abs_corr >= 0.2 {
            Strength::Weak
        } else {
            Strength::VeryWeak
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub pair: &'static str,
    /// Pearson r, rounded to 3 decimals.
    pub correlation: f64,
    /// Two-sided p-value, rounded to 4 decimals.
    pub p_value: f64,
    pub strength: Strength,
}

/// Correlates every configured pair.
///
/// The two value lists of a pair are aligned by position and truncated to the
/// shorter one, so callers should extract them from the same row order. Pairs
/// with fewer than two aligned points, or with a constant series, are left out.
pub fn analyze(values: &BTreeMap<Field, Vec<f64>>, pairs: &[CorrelationPair]) -> Vec<Correlation> {
    let empty: Vec<f64> = Vec::new();
    let mut correlations = Vec::with_capacity(pairs.len());

    for pair in pairs {
        let xs = values.get(&pair.first).unwrap_or(&empty);
        let ys = values.get(&pair.second).unwrap_or(&empty);
        let len = xs.len().min(ys.len());
        if len < 2 {
            debug!("Skipping '{}': {} aligned points", pair.label, len);
            continue;
        }

        let Some((r, p_value)) = pearson(&xs[..len], &ys[..len]) else {
            debug!("Skipping '{}': constant series", pair.label);
            continue;
        };
        correlations.push(Correlation {
            pair: pair.label,
            correlation: round_to(r, 3),
            p_value: round_to(p_value, 4),
            strength: Strength::classify(r),
        });
    }

    correlations
}

/// Pearson correlation coefficient and its two-sided p-value.
///
/// Returns `None` when the slices differ in length, hold fewer than two
/// points, or either has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    Some((r, two_sided_p_value(r, n)))
}

/// p-value of Student's t test for r with n - 2 degrees of freedom.
fn two_sided_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let one_minus_r2 = 1.0 - r * r;
    if one_minus_r2 <= 0.0 {
        return 0.0;
    }
    let t_squared = r * r * df / one_minus_r2;
    regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t_squared))
}

/// I_x(a, b), evaluated with a continued fraction.
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    if x < (a + 1.0) / (a + b + 2.0) {
        ln_front.exp() * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - ln_front.exp() * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: usize = 300;
    const EPSILON: f64 = 3e-16;
    const FLOOR: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < FLOOR { FLOOR } else { v };
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(1.0 + even * d);
        c = guard(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(1.0 + odd * d);
        c = guard(1.0 + odd / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }
    h
}

/// Lanczos approximation of ln Γ(x) for x > 0.
fn ln_gamma(x: f64) -> f64 {
    const G: f64 = 7.0;
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + G + 0.5;
    let series = COEFFICIENTS[1..]
        .iter()
        .enumerate()
        .fold(COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + (i + 1) as f64));
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}
