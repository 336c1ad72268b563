//! Catalog crossmatch: one cone search per caller-supplied catalog row.

use crate::error::{PortalError, PortalResult};
use crate::format::{FormattedTable, Record};
use crate::models::{JulianDate, SkyCoord};
use crate::query::{XmatchQuery, MAX_CATALOG_ROWS};
use crate::store::{CellValue, StoreGateway};

use super::cone::cone_search;
use crate::query::ConeSearch;

/// Run the per-row crossmatch. Every hit carries the originating catalog
/// row's columns joined back under their own names, the id column included.
pub async fn crossmatch(
    store: &dyn StoreGateway,
    query: &XmatchQuery,
) -> PortalResult<FormattedTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(query.catalog_csv.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| PortalError::validation("catalog", format!("invalid CSV: {}", e)))?
        .clone();

    let position = |name: &str| -> PortalResult<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            PortalError::validation("header", format!("column `{}` not found in the catalog", name))
        })
    };
    let ra_idx = position(&query.header.ra)?;
    let dec_idx = position(&query.header.dec)?;
    let time_idx = match &query.header.time {
        Some(name) => Some(position(name)?),
        None => None,
    };
    // the id column must exist even though all columns are joined back
    position(&query.header.id)?;

    let mut catalog_rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| PortalError::validation("catalog", format!("invalid CSV: {}", e)))?;
        catalog_rows.push(record);
        if catalog_rows.len() > MAX_CATALOG_ROWS {
            return Err(PortalError::validation(
                "catalog",
                format!("catalog too large; maximum is {} rows", MAX_CATALOG_ROWS),
            ));
        }
    }

    let mut merged: Vec<Record> = Vec::new();
    for row in &catalog_rows {
        let ra = row.get(ra_idx).unwrap_or("");
        let dec = row.get(dec_idx).unwrap_or("");
        let center = SkyCoord::parse(ra, dec)
            .map_err(|e| PortalError::validation("catalog", format!("row ({}, {}): {}", ra, dec, e)))?;

        // bounded window around the catalog timestamp when provided
        let time = match (time_idx, query.window_days) {
            (Some(idx), Some(window)) => {
                let raw = row.get(idx).unwrap_or("");
                let t = JulianDate::parse(raw)
                    .map_err(|e| PortalError::validation("catalog", e))?;
                Some((
                    JulianDate::new(t.value() - window),
                    JulianDate::new(t.value() + window),
                ))
            }
            _ => None,
        };

        let cone = ConeSearch {
            center,
            radius_arcsec: query.radius_arcsec,
            time,
            limit: 1000,
        };
        let hits = cone_search(store, &cone).await?;
        for mut hit in hits.into_records() {
            for (header, value) in headers.iter().zip(row.iter()) {
                hit.insert(header.to_string(), CellValue::Str(value.to_string()));
            }
            merged.push(hit);
        }
    }

    Ok(FormattedTable::new(merged))
}
