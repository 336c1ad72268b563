//! Color ramps for rendered cutouts.
//!
//! Viridis and magma are piecewise-linear approximations over a handful of
//! anchor points, which is plenty at 8 bits per channel for thumbnail-sized
//! stamps.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColormapKind {
    Grayscale,
    Viridis,
    Magma,
}

const VIRIDIS: [[f64; 3]; 5] = [
    [68.0, 1.0, 84.0],
    [59.0, 82.0, 139.0],
    [33.0, 145.0, 140.0],
    [94.0, 201.0, 98.0],
    [253.0, 231.0, 37.0],
];

const MAGMA: [[f64; 3]; 5] = [
    [0.0, 0.0, 4.0],
    [81.0, 18.0, 124.0],
    [183.0, 55.0, 121.0],
    [252.0, 137.0, 97.0],
    [252.0, 253.0, 191.0],
];

impl ColormapKind {
    pub fn parse(spec: &str) -> Result<Self, String> {
        match spec.to_ascii_lowercase().as_str() {
            "grayscale" | "greys" => Ok(Self::Grayscale),
            "viridis" => Ok(Self::Viridis),
            "magma" => Ok(Self::Magma),
            other => Err(format!(
                "unknown colormap `{}` (expected grayscale, viridis or magma)",
                other
            )),
        }
    }

    /// Map a normalized intensity in `[0, 1]` to an RGB triple.
    pub fn rgb(&self, t: f64) -> [u8; 3] {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Grayscale => {
                let v = (t * 255.0).round() as u8;
                [v, v, v]
            }
            Self::Viridis => interpolate(&VIRIDIS, t),
            Self::Magma => interpolate(&MAGMA, t),
        }
    }
}

fn interpolate(anchors: &[[f64; 3]], t: f64) -> [u8; 3] {
    let scaled = t * (anchors.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(anchors.len() - 1);
    let frac = scaled - lo as f64;
    let mut out = [0u8; 3];
    for channel in 0..3 {
        let v = anchors[lo][channel] * (1.0 - frac) + anchors[hi][channel] * frac;
        out[channel] = v.round() as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            ColormapKind::parse("Viridis").unwrap(),
            ColormapKind::Viridis
        );
        assert_eq!(
            ColormapKind::parse("grayscale").unwrap(),
            ColormapKind::Grayscale
        );
        assert!(ColormapKind::parse("jet").is_err());
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(ColormapKind::Grayscale.rgb(0.0), [0, 0, 0]);
        assert_eq!(ColormapKind::Grayscale.rgb(1.0), [255, 255, 255]);
        assert_eq!(ColormapKind::Viridis.rgb(0.0), [68, 1, 84]);
        assert_eq!(ColormapKind::Viridis.rgb(1.0), [253, 231, 37]);
        assert_eq!(ColormapKind::Magma.rgb(0.0), [0, 0, 4]);
    }

    #[test]
    fn test_out_of_range_clamped() {
        assert_eq!(ColormapKind::Magma.rgb(-3.0), ColormapKind::Magma.rgb(0.0));
        assert_eq!(ColormapKind::Magma.rgb(7.0), ColormapKind::Magma.rgb(1.0));
    }
}
