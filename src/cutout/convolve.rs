//! 2-D smoothing kernels for cutout rendering.

use super::fits::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelKind {
    Gauss,
    Box,
}

impl KernelKind {
    pub fn parse(spec: &str) -> Result<Self, String> {
        match spec.to_ascii_lowercase().as_str() {
            "gauss" => Ok(Self::Gauss),
            "box" => Ok(Self::Box),
            other => Err(format!(
                "unknown convolution kernel `{}` (expected gauss or box)",
                other
            )),
        }
    }
}

/// Convolve with the requested kernel at the given smoothing scale.
///
/// `smooth` is the Gaussian standard deviation in pixels, or one fifth of
/// the box side. Pixels beyond the image edge take the nearest edge value,
/// so the output keeps the input's dimensions without dark borders.
pub fn convolve(image: &Image, kernel: KernelKind, smooth: f64) -> Image {
    let weights = match kernel {
        KernelKind::Gauss => gaussian_kernel(smooth),
        KernelKind::Box => box_kernel(smooth),
    };
    apply_kernel(image, &weights)
}

/// A normalized square kernel, stored row-major with its odd side length.
struct Kernel {
    side: usize,
    weights: Vec<f64>,
}

fn gaussian_kernel(sigma: f64) -> Kernel {
    let sigma = sigma.max(f64::EPSILON);
    // truncate at 4 sigma, rounded up to an odd side
    let half = (4.0 * sigma).ceil() as usize;
    let side = 2 * half + 1;
    let mut weights = Vec::with_capacity(side * side);
    let denom = 2.0 * sigma * sigma;
    for y in 0..side {
        for x in 0..side {
            let dx = x as f64 - half as f64;
            let dy = y as f64 - half as f64;
            weights.push((-(dx * dx + dy * dy) / denom).exp());
        }
    }
    normalize(&mut weights);
    Kernel { side, weights }
}

fn box_kernel(smooth: f64) -> Kernel {
    let mut side = (5.0 * smooth).round().max(1.0) as usize;
    if side % 2 == 0 {
        side += 1;
    }
    let count = side * side;
    Kernel {
        side,
        weights: vec![1.0 / count as f64; count],
    }
}

fn normalize(weights: &mut [f64]) {
    let total: f64 = weights.iter().sum();
    for w in weights.iter_mut() {
        *w /= total;
    }
}

fn apply_kernel(image: &Image, kernel: &Kernel) -> Image {
    let half = (kernel.side / 2) as isize;
    let width = image.width as isize;
    let height = image.height as isize;
    let mut out = Vec::with_capacity(image.data.len());
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0.0;
            for ky in 0..kernel.side as isize {
                for kx in 0..kernel.side as isize {
                    let sx = (x + kx - half).clamp(0, width - 1) as usize;
                    let sy = (y + ky - half).clamp(0, height - 1) as usize;
                    let w = kernel.weights[(ky * kernel.side as isize + kx) as usize];
                    acc += w * image.pixel(sx, sy);
                }
            }
            out.push(acc);
        }
    }
    Image::new(image.width, image.height, out)
}
