//! Image stamp retrieval and rendering.

pub mod colormap;
pub mod convolve;
pub mod fits;
pub mod pipeline;
pub mod stretch;

pub use colormap::ColormapKind;
pub use convolve::KernelKind;
pub use fits::Image;
pub use pipeline::{fetch_cutout, CutoutData, CutoutKind, CutoutOutputKind};
pub use stretch::StretchSpec;
