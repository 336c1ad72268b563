//! Cone search over the spatial index.
//!
//! Enumerates the HEALPix pixels overlapping the search disc, scans each
//! pixel partition (bounded by the optional time window), merges by row key
//! and applies the exact separation post-filter. The pixel enumeration is a
//! conservative superset, so the post-filter is mandatory, not an
//! optimization.

use std::collections::BTreeMap;

use crate::error::PortalResult;
use crate::format::{format_rows, FormatOptions, FormattedTable, Record};
use crate::models::{angular_separation_deg, RowKey};
use crate::query::ConeSearch;
use crate::store::{CellValue, Index, RawRow, RowRange, ScanOptions, StoreGateway};

use super::healpix::query_disc_nest;

/// Run a cone search; results carry `v:separation_degree` and are sorted by
/// ascending separation with a row-key tiebreak.
pub async fn cone_search(
    store: &dyn StoreGateway,
    query: &ConeSearch,
) -> PortalResult<FormattedTable> {
    let radius_deg = query.radius_deg();
    let pixels = query_disc_nest(query.center.ra_deg, query.center.dec_deg, radius_deg);

    let opts = ScanOptions::default().with_limit(query.limit);
    let mut merged: BTreeMap<String, RawRow> = BTreeMap::new();
    for pixel in pixels {
        let range = match query.time {
            Some((start, stop)) => RowRange::between(
                RowKey::pixel_time(pixel, start.value()).encode(),
                RowKey::pixel_time(pixel, stop.value()).encode(),
            ),
            None => RowRange::prefix(RowKey::pixel_prefix(pixel).encode()),
        };
        let rows = store
            .scan(Index::Pixel.table_name(), &range, &opts)
            .await?;
        for row in rows {
            merged.insert(row.key.clone(), row);
        }
    }

    // exact post-filter on the true angular separation
    let mut inside: Vec<(f64, RawRow)> = Vec::new();
    for row in merged.into_values() {
        let Some(separation) = row_separation(&row, query) else {
            continue;
        };
        if separation <= radius_deg {
            inside.push((separation, row));
        }
    }

    let separations: BTreeMap<String, f64> = inside
        .iter()
        .map(|(sep, row)| (row.key.clone(), *sep))
        .collect();
    let rows: Vec<RawRow> = inside.into_iter().map(|(_, row)| row).collect();

    let schema = store.schema(Index::Pixel.table_name()).await?;
    let opts = FormatOptions::grouped();
    let table = format_rows(&rows, &schema, &opts);

    // attach the separation and re-sort ascending
    let mut records: Vec<Record> = table.into_records();
    for record in &mut records {
        if let Some(sep) = record_separation(record, query) {
            record.insert("v:separation_degree".to_string(), CellValue::Double(sep));
        }
    }
    records.sort_by(|a, b| {
        let sa = record_separation(a, query).unwrap_or(f64::MAX);
        let sb = record_separation(b, query).unwrap_or(f64::MAX);
        sa.partial_cmp(&sb)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| object_id(a).cmp(&object_id(b)))
    });
    Ok(FormattedTable::new(records))
}

fn object_id(record: &Record) -> Option<&str> {
    record.get("i:objectId").and_then(CellValue::as_str)
}

fn record_separation(record: &Record, query: &ConeSearch) -> Option<f64> {
    let ra = record.get("i:ra").and_then(CellValue::as_f64)?;
    let dec = record.get("i:dec").and_then(CellValue::as_f64)?;
    Some(angular_separation_deg(
        query.center.ra_deg,
        query.center.dec_deg,
        ra,
        dec,
    ))
}

fn row_separation(row: &RawRow, query: &ConeSearch) -> Option<f64> {
    let ra: f64 = row.cell("i:ra")?.parse().ok()?;
    let dec: f64 = row.cell("i:dec")?.parse().ok()?;
    Some(angular_separation_deg(
        query.center.ra_deg,
        query.center.dec_deg,
        ra,
        dec,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;
    use crate::models::SkyCoord;

    fn cone(ra: f64, dec: f64, radius_arcsec: f64) -> ConeSearch {
        ConeSearch {
            center: SkyCoord {
                ra_deg: ra,
                dec_deg: dec,
            },
            radius_arcsec,
            time: None,
            limit: 1000,
        }
    }

    #[tokio::test]
    async fn test_all_results_within_radius() {
        let store = fixtures::seeded_store();
        let query = cone(fixtures::FIELD_RA, fixtures::FIELD_DEC, 7200.0);
        let table = cone_search(&store, &query).await.unwrap();
        assert!(!table.is_empty());
        for sep in table.f64_column("v:separation_degree") {
            assert!(sep.unwrap() <= query.radius_deg());
        }
    }

    #[tokio::test]
    async fn test_sorted_by_ascending_separation() {
        let store = fixtures::seeded_store();
        let query = cone(fixtures::FIELD_RA, fixtures::FIELD_DEC, 18000.0);
        let table = cone_search(&store, &query).await.unwrap();
        let seps: Vec<f64> = table
            .f64_column("v:separation_degree")
            .into_iter()
            .flatten()
            .collect();
        assert!(seps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_distant_alert_excluded() {
        let store = fixtures::seeded_store();
        // FAR1 sits ~20 degrees away
        let query = cone(fixtures::FIELD_RA, fixtures::FIELD_DEC, 18000.0);
        let table = cone_search(&store, &query).await.unwrap();
        for record in table.records() {
            assert_ne!(
                record.get("i:objectId").and_then(CellValue::as_str),
                Some("FAR1")
            );
        }
    }

    #[tokio::test]
    async fn test_grouped_no_duplicate_objects() {
        let store = fixtures::seeded_store();
        let query = cone(fixtures::FIELD_RA, fixtures::FIELD_DEC, 18000.0);
        let table = cone_search(&store, &query).await.unwrap();
        let mut oids: Vec<String> = table
            .records()
            .iter()
            .filter_map(|r| r.get("i:objectId").and_then(|v| v.as_str().map(String::from)))
            .collect();
        let total = oids.len();
        oids.sort();
        oids.dedup();
        assert_eq!(oids.len(), total);
    }

    #[tokio::test]
    async fn test_time_bound_excludes_out_of_window_alerts() {
        let store = fixtures::seeded_store();
        let mut query = cone(fixtures::FIELD_RA, fixtures::FIELD_DEC, 18000.0);
        // a window that covers only the first epoch
        query.time = Some((
            crate::models::JulianDate::new(fixtures::JD_EPOCH1 - 0.1),
            crate::models::JulianDate::new(fixtures::JD_EPOCH1 + 0.1),
        ));
        let table = cone_search(&store, &query).await.unwrap();
        for jd in table.f64_column("i:jd").into_iter().flatten() {
            assert!((jd - fixtures::JD_EPOCH1).abs() <= 0.1);
        }
    }

    #[tokio::test]
    async fn test_deterministic_for_fixed_store() {
        let store = fixtures::seeded_store();
        let query = cone(fixtures::FIELD_RA, fixtures::FIELD_DEC, 18000.0);
        let a = cone_search(&store, &query).await.unwrap();
        let b = cone_search(&store, &query).await.unwrap();
        assert_eq!(a, b);
    }
}
