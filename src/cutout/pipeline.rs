//! Cutout retrieval and rendering.
//!
//! Stamps live in the main alert table as gzipped FITS blobs, one per
//! cutout kind. The pipeline picks the alert (explicit candidate id or most
//! recent), decompresses, and either passes the container through, returns
//! the decoded array, or renders a PNG: sign correction for
//! negative-subtraction differences, stretch, optional smoothing, colormap.

use base64::Engine as _;
use flate2::read::GzDecoder;
use std::io::Read;

use crate::error::{PortalError, PortalResult};
use crate::models::rowkey::KEY_SEPARATOR;
use crate::query::CutoutQuery;
use crate::store::{ColumnFilter, Index, RawRow, RowRange, ScanOptions, StoreGateway};

use super::colormap::ColormapKind;
use super::convolve::convolve;
use super::fits::{decode_image, Image};

/// Smoothing scale applied when a convolution kernel is requested.
const SMOOTH_SCALE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoutKind {
    Science,
    Template,
    Difference,
}

impl CutoutKind {
    pub fn parse(spec: &str) -> Result<Self, String> {
        match spec.to_ascii_lowercase().as_str() {
            "science" => Ok(Self::Science),
            "template" => Ok(Self::Template),
            "difference" => Ok(Self::Difference),
            other => Err(format!(
                "unknown cutout kind `{}` (expected Science, Template or Difference)",
                other
            )),
        }
    }

    /// Column holding this kind's stamp blob.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Science => "b:cutoutScience_stampData",
            Self::Template => "b:cutoutTemplate_stampData",
            Self::Difference => "b:cutoutDifference_stampData",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutoutOutputKind {
    /// Rendered 8-bit raster.
    #[default]
    Png,
    /// The stored FITS container, decompressed.
    Fits,
    /// The decoded pixel array, untouched.
    Array,
}

impl CutoutOutputKind {
    pub fn parse(spec: &str) -> Result<Self, String> {
        match spec.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "fits" => Ok(Self::Fits),
            "array" => Ok(Self::Array),
            other => Err(format!(
                "unknown cutout output `{}` (expected PNG, FITS or array)",
                other
            )),
        }
    }
}

/// One produced cutout, in the requested representation.
#[derive(Debug, Clone, PartialEq)]
pub enum CutoutData {
    Png(Vec<u8>),
    Fits(Vec<u8>),
    Array(Image),
}

/// Fetch and render one cutout.
pub async fn fetch_cutout(
    store: &dyn StoreGateway,
    query: &CutoutQuery,
) -> PortalResult<CutoutData> {
    let columns = ColumnFilter::Columns(vec![
        query.kind.column().to_string(),
        "i:jd".to_string(),
        "i:candid".to_string(),
        "i:isdiffpos".to_string(),
    ]);
    let range = RowRange::prefix(format!("{}{}", query.object_id, KEY_SEPARATOR));
    let opts = ScanOptions::default().with_columns(columns);
    let rows = store
        .scan(Index::Objects.table_name(), &range, &opts)
        .await?;

    let row = select_alert(&rows, query.candid.as_deref())?;
    let blob = row.cell(query.kind.column()).ok_or_else(|| {
        PortalError::validation(
            "kind",
            format!("alert `{}` carries no {:?} stamp", row.key, query.kind),
        )
    })?;
    let container = decompress_stamp(blob)?;

    match query.output {
        CutoutOutputKind::Fits => Ok(CutoutData::Fits(container)),
        CutoutOutputKind::Array => {
            let image = decode_image(&container)
                .map_err(|e| PortalError::internal(format!("stamp decode: {}", e)))?;
            Ok(CutoutData::Array(image))
        }
        CutoutOutputKind::Png => {
            let mut image = decode_image(&container)
                .map_err(|e| PortalError::internal(format!("stamp decode: {}", e)))?;
            if query.kind == CutoutKind::Difference && row.cell("i:isdiffpos") == Some("f") {
                invert_sign(&mut image);
            }
            query.stretch.apply(&mut image.data);
            if let Some(kernel) = query.kernel {
                image = convolve(&image, kernel, SMOOTH_SCALE);
            }
            let colormap = query.colormap.unwrap_or(ColormapKind::Grayscale);
            let png = render_png(&image, colormap)?;
            Ok(CutoutData::Png(png))
        }
    }
}

/// Pick the alert row: by explicit candidate id, or the most recent.
fn select_alert<'a>(rows: &'a [RawRow], candid: Option<&str>) -> PortalResult<&'a RawRow> {
    match candid {
        Some(candid) => rows
            .iter()
            .find(|r| r.cell("i:candid") == Some(candid))
            .ok_or_else(|| {
                PortalError::validation("candid", format!("no alert with candid `{}`", candid))
            }),
        None => rows
            .iter()
            .max_by(|a, b| row_jd(a).total_cmp(&row_jd(b)))
            .ok_or_else(|| PortalError::validation("objectId", "no alert found")),
    }
}

fn row_jd(row: &RawRow) -> f64 {
    row.cell("i:jd")
        .and_then(|v| v.parse().ok())
        .unwrap_or(f64::NEG_INFINITY)
}

/// Negative-subtraction stamps are stored sign-flipped.
fn invert_sign(image: &mut Image) {
    for v in image.data.iter_mut() {
        *v = -*v;
    }
}

/// Base64-decode the stored cell and gunzip when the blob is compressed.
/// Uncompressed FITS passes through untouched.
fn decompress_stamp(cell: &str) -> PortalResult<Vec<u8>> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(cell)
        .map_err(|e| PortalError::internal(format!("stamp cell is not base64: {}", e)))?;
    if raw.starts_with(&[0x1f, 0x8b]) {
        let mut out = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut out)
            .map_err(|e| PortalError::internal(format!("stamp gunzip: {}", e)))?;
        Ok(out)
    } else {
        Ok(raw)
    }
}

/// Encode a `[0, 1]`-normalized image as an RGB PNG.
///
/// FITS arrays are bottom-up; the rows are flipped so the raster displays
/// north-up like the survey's own previews.
fn render_png(image: &Image, colormap: ColormapKind) -> PortalResult<Vec<u8>> {
    let mut rgb = Vec::with_capacity(image.width * image.height * 3);
    for y in (0..image.height).rev() {
        for x in 0..image.width {
            rgb.extend_from_slice(&colormap.rgb(image.pixel(x, y)));
        }
    }
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, image.width as u32, image.height as u32);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| PortalError::internal(format!("png header: {}", e)))?;
        writer
            .write_image_data(&rgb)
            .map_err(|e| PortalError::internal(format!("png encode: {}", e)))?;
    }
    Ok(out)
}
