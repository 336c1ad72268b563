//! Intensity stretch normalization for image stamps.
//!
//! Two families: a sigmoid normalizer driven by the stamp's own mean and
//! standard deviation (the default, robust against hot pixels without any
//! percentile tuning), and a percentile cut with a choice of transfer
//! curves. Both map pixel values into `[0, 1]`.

const DEFAULT_PMIN: f64 = 0.5;
const DEFAULT_PMAX: f64 = 99.5;

/// Transfer curve applied between the percentile cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StretchCurve {
    Linear,
    Sqrt,
    Power,
    Log,
    Asinh,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StretchSpec {
    /// Logistic stretch around the stamp mean, scaled by its deviation.
    Sigmoid,
    /// Clip at the given percentiles, then apply `curve` to the normalized
    /// value.
    Percentile {
        curve: StretchCurve,
        pmin: f64,
        pmax: f64,
    },
}

impl StretchSpec {
    /// Build a stretch from request parameters. `name` absent selects the
    /// sigmoid default; percentile bounds only apply to curve stretches.
    pub fn from_params(
        name: Option<&str>,
        pmin: Option<f64>,
        pmax: Option<f64>,
    ) -> Result<Self, String> {
        let curve = match name {
            None | Some("sigmoid") => return Ok(Self::Sigmoid),
            Some("linear") => StretchCurve::Linear,
            Some("sqrt") => StretchCurve::Sqrt,
            Some("power") => StretchCurve::Power,
            Some("log") => StretchCurve::Log,
            Some("asinh") => StretchCurve::Asinh,
            Some(other) => {
                return Err(format!(
                    "unknown stretch `{}` (expected sigmoid, linear, sqrt, power, log or asinh)",
                    other
                ))
            }
        };
        let pmin = pmin.unwrap_or(DEFAULT_PMIN);
        let pmax = pmax.unwrap_or(DEFAULT_PMAX);
        if !(0.0..=100.0).contains(&pmin) || !(0.0..=100.0).contains(&pmax) {
            return Err("percentile cuts must lie in [0, 100]".to_string());
        }
        if pmin >= pmax {
            return Err(format!(
                "lower percentile {} must be below upper percentile {}",
                pmin, pmax
            ));
        }
        Ok(Self::Percentile { curve, pmin, pmax })
    }

    /// Normalize `data` into `[0, 1]` in place.
    pub fn apply(&self, data: &mut [f64]) {
        if data.is_empty() {
            return;
        }
        match self {
            Self::Sigmoid => sigmoid_stretch(data),
            Self::Percentile { curve, pmin, pmax } => {
                let vmin = percentile(data, *pmin);
                let vmax = percentile(data, *pmax);
                let span = vmax - vmin;
                for value in data.iter_mut() {
                    let t = if span > 0.0 {
                        ((*value - vmin) / span).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    *value = curve.transfer(t);
                }
            }
        }
    }
}

impl StretchCurve {
    fn transfer(&self, t: f64) -> f64 {
        match self {
            Self::Linear => t,
            Self::Sqrt => t.sqrt(),
            Self::Power => t * t,
            Self::Log => (1000.0 * t + 1.0).ln() / 1001f64.ln(),
            Self::Asinh => (10.0 * t).asinh() / 10f64.asinh(),
        }
    }
}

fn sigmoid_stretch(data: &mut [f64]) {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let var = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std == 0.0 {
        data.fill(0.5);
        return;
    }
    for value in data.iter_mut() {
        *value = 1.0 / (1.0 + (-(*value - mean) / std).exp());
    }
}

/// Linearly-interpolated percentile, matching the conventional definition
/// over the sorted sample.
fn percentile(data: &[f64], p: f64) -> f64 {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
