//! Gravitational-wave skymap crossmatch.
//!
//! The probability map arrives as a FITS binary table (inline upload or
//! downloaded by event name). Pixels are ranked by probability, assigned
//! cumulative credible levels, regridded to the spatial index resolution,
//! and every pixel at or below the requested credible level is scanned over
//! a fixed window around the event time.

use std::io::Read;

use flate2::read::GzDecoder;

use crate::cutout::fits::BinTable;
use crate::error::{PortalError, PortalResult};
use crate::format::{FormatOptions, FormattedTable, Record};
use crate::models::{JulianDate, RowKey};
use crate::query::{SkymapQuery, SkymapSource};
use crate::store::{CellValue, Index, RawRow, RowRange, ScanOptions, StoreGateway};

use super::healpix::{npix, ring2nest, ud_grade_nest, NSIDE};
use super::{format_scan, ExternalServices};

/// Days before the event opening the search window.
const WINDOW_BEFORE_DAYS: f64 = 1.0;
/// Total window length, in days.
const WINDOW_LENGTH_DAYS: f64 = 6.0;

/// A parsed probability map at the spatial index resolution, NESTED order.
#[derive(Debug)]
pub struct ProbabilityMap {
    /// Per-pixel cumulative credible level, in [0, 1].
    pub credible_levels: Vec<f64>,
    /// Event observation time.
    pub event_time: JulianDate,
}

impl ProbabilityMap {
    /// Decode a (possibly gzipped) FITS skymap.
    pub fn parse(bytes: &[u8]) -> PortalResult<Self> {
        let raw = if bytes.starts_with(&[0x1f, 0x8b]) {
            let mut out = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut out)
                .map_err(|e| PortalError::validation("skymap", format!("gunzip: {}", e)))?;
            out
        } else {
            bytes.to_vec()
        };

        let table = BinTable::parse(&raw)
            .map_err(|e| PortalError::validation("skymap", format!("not a FITS skymap: {}", e)))?;
        let probs = table
            .column_f64("PROB")
            .map_err(|e| PortalError::validation("skymap", format!("PROB column: {}", e)))?;
        if probs.len() % 12 != 0 || probs.is_empty() {
            return Err(PortalError::validation(
                "skymap",
                "probability column is not a HEALPix map",
            ));
        }

        let date_obs = table.header.get("DATE-OBS").ok_or_else(|| {
            PortalError::validation("skymap", "missing DATE-OBS in the skymap header")
        })?;
        let event_time = JulianDate::parse(date_obs)
            .map_err(|e| PortalError::validation("skymap", format!("DATE-OBS: {}", e)))?;

        // reorder RING maps to NESTED before any regridding
        let ordering = table.header.get("ORDERING").unwrap_or("NESTED");
        let nside_in = ((probs.len() / 12) as f64).sqrt() as u64;
        let nested = if ordering == "RING" {
            let mut out = vec![0.0; probs.len()];
            for (ring_ipix, p) in probs.iter().enumerate() {
                out[ring2nest(nside_in, ring_ipix as u64) as usize] = *p;
            }
            out
        } else {
            probs
        };

        let mut regridded = ud_grade_nest(&nested, NSIDE);
        // renormalize so credible levels still sum to one
        let total: f64 = regridded.iter().sum();
        if total > 0.0 {
            for v in regridded.iter_mut() {
                *v /= total;
            }
        }

        Ok(Self {
            credible_levels: credible_levels(&regridded),
            event_time,
        })
    }

    /// Pixels within the requested credible level, sorted ascending.
    pub fn pixels_within(&self, credible_level: f64) -> Vec<u64> {
        self.credible_levels
            .iter()
            .enumerate()
            .filter(|(_, level)| **level <= credible_level)
            .map(|(ipix, _)| ipix as u64)
            .collect()
    }
}

/// Assign each pixel its cumulative credible level: pixels sorted by
/// descending probability, cumulative-summed, re-assigned in place. The
/// most probable pixel gets the smallest level.
fn credible_levels(probs: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|a, b| probs[*b].total_cmp(&probs[*a]));
    let mut levels = vec![1.0; probs.len()];
    let mut cumulative = 0.0;
    for ipix in order {
        cumulative += probs[ipix];
        levels[ipix] = cumulative;
    }
    levels
}

/// Run the skymap crossmatch.
pub async fn skymap_search(
    store: &dyn StoreGateway,
    services: &ExternalServices,
    query: &SkymapQuery,
) -> PortalResult<FormattedTable> {
    let bytes = match &query.source {
        SkymapSource::Inline(bytes) => bytes.clone(),
        SkymapSource::Event(name) => download_skymap(services, name).await?,
    };
    let map = ProbabilityMap::parse(&bytes)?;

    let jd_start = map.event_time.value() - WINDOW_BEFORE_DAYS;
    let jd_stop = jd_start + WINDOW_LENGTH_DAYS;

    let opts = ScanOptions::default();
    let mut rows: Vec<RawRow> = Vec::new();
    for pixel in map.pixels_within(query.credible_level) {
        let range = RowRange::between(
            RowKey::pixel_time(pixel, jd_start).encode(),
            RowKey::pixel_time(pixel, jd_stop).encode(),
        );
        rows.extend(
            store
                .scan(Index::Pixel.table_name(), &range, &opts)
                .await?,
        );
    }

    let table = format_scan(store, Index::Pixel, &rows, &FormatOptions::grouped()).await?;

    // keep only alerts whose history started inside the window
    let records: Vec<Record> = table
        .into_records()
        .into_iter()
        .filter(|record| {
            let jd = record.get("i:jd").and_then(CellValue::as_f64);
            let start_hist = record.get("i:jdstarthist").and_then(CellValue::as_f64);
            match (jd, start_hist) {
                (Some(jd), Some(start_hist)) => jd - start_hist <= WINDOW_LENGTH_DAYS,
                _ => false,
            }
        })
        .map(|mut record| {
            record.insert("v:jdstartgw".to_string(), CellValue::Double(jd_start));
            record
        })
        .collect();
    Ok(FormattedTable::new(records))
}

/// Download a skymap by event name from the event archive.
async fn download_skymap(services: &ExternalServices, event: &str) -> PortalResult<Vec<u8>> {
    let url = format!(
        "{}/api/superevents/{}/files/bayestar.fits.gz",
        services.gracedb_url, event
    );
    let response = services
        .client
        .get(&url)
        .send()
        .await
        .map_err(|e| PortalError::upstream("gracedb", "request", e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PortalError::upstream(
            "gracedb",
            status.as_str(),
            format!("skymap download failed for event `{}`", event),
        ));
    }
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| PortalError::upstream("gracedb", "body", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cutout::fits::encode_prob_bintable;
    use crate::engine::fixtures;
    use crate::engine::healpix::{ang2pix_nest, ORDER};

    /// A map concentrating all probability on the fixture field.
    fn field_map(date_obs: &str) -> Vec<u8> {
        let hot = ang2pix_nest(ORDER, fixtures::FIELD_RA, fixtures::FIELD_DEC) as usize;
        let mut probs = vec![0.0; npix(NSIDE) as usize];
        probs[hot] = 0.9;
        // a little probability elsewhere so credible levels are non-trivial
        let len = probs.len();
        probs[(hot + 7) % len] = 0.1;
        encode_prob_bintable(&probs, "NESTED", date_obs)
    }

    fn query(bytes: Vec<u8>, credible_level: f64) -> SkymapQuery {
        SkymapQuery {
            source: SkymapSource::Inline(bytes),
            credible_level,
        }
    }

    #[test]
    fn test_credible_levels_ordering() {
        let levels = credible_levels(&[0.1, 0.6, 0.3]);
        assert!((levels[1] - 0.6).abs() < 1e-12);
        assert!((levels[2] - 0.9).abs() < 1e-12);
        assert!((levels[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pixels_within_is_monotonic_in_level() {
        let map = ProbabilityMap::parse(&field_map("2021-03-01T12:00:00")).unwrap();
        let tight = map.pixels_within(0.2);
        let loose = map.pixels_within(1.0);
        assert!(!tight.is_empty());
        assert!(loose.len() >= tight.len());
        for pixel in &tight {
            assert!(loose.contains(pixel));
        }
    }

    #[tokio::test]
    async fn test_skymap_search_finds_field_alerts() {
        let store = fixtures::seeded_store();
        // event half a day after epoch 1, so the window covers both epochs
        let bytes = field_map("2020-05-31T12:00:00");
        let table = skymap_search(&store, &ExternalServices::default(), &query(bytes, 0.95))
            .await
            .unwrap();
        assert!(!table.is_empty());
        for record in table.records() {
            assert!(record.contains_key("v:jdstartgw"));
        }
    }

    #[tokio::test]
    async fn test_old_transients_filtered_out() {
        let store = fixtures::seeded_store();
        // OBJ2 started its history 12 days before epoch 2
        let hot = ang2pix_nest(ORDER, fixtures::FIELD_RA + 0.5, fixtures::FIELD_DEC + 0.2) as usize;
        let mut probs = vec![0.0; npix(NSIDE) as usize];
        probs[hot] = 1.0;
        let bytes = encode_prob_bintable(&probs, "NESTED", "2020-06-02T12:00:00");
        let table = skymap_search(&store, &ExternalServices::default(), &query(bytes, 0.95))
            .await
            .unwrap();
        for record in table.records() {
            assert_ne!(
                record.get("i:objectId"),
                Some(&CellValue::Str("OBJ2".into()))
            );
        }
    }

    #[test]
    fn test_ring_map_accepted() {
        let probs = vec![1.0 / npix(NSIDE) as f64; npix(NSIDE) as usize];
        let bytes = encode_prob_bintable(&probs, "RING", "2021-03-01T12:00:00");
        let map = ProbabilityMap::parse(&bytes).unwrap();
        assert_eq!(map.credible_levels.len(), npix(NSIDE) as usize);
    }

    #[test]
    fn test_garbage_is_a_validation_error() {
        let err = ProbabilityMap::parse(b"not a skymap").unwrap_err();
        assert!(matches!(err, PortalError::Validation { .. }));
    }
}
