//! Bidirectional name resolution across three naming authorities.
//!
//! The transient-name and Solar-System designation tables live in the store
//! with lower-cased keys; the astronomical-object catalog is a live Sesame
//! service queried over HTTP. Upstream failures are surfaced, never
//! retried.

use crate::error::{PortalError, PortalResult};
use crate::format::{FormatOptions, FormattedTable, Record};
use crate::models::{RowKey, KEY_SEPARATOR};
use crate::query::{ResolverKind, ResolverQuery};
use crate::store::{CellValue, ColumnFilter, Index, RowRange, ScanOptions, StoreGateway};

use super::{format_scan, ExternalServices};

pub async fn resolve(
    store: &dyn StoreGateway,
    services: &ExternalServices,
    query: &ResolverQuery,
) -> PortalResult<FormattedTable> {
    match (query.resolver, query.reverse) {
        (ResolverKind::Tns, false) => tns_forward(store, query).await,
        (ResolverKind::Tns, true) => tns_reverse(store, query).await,
        (ResolverKind::Simbad, false) => simbad_forward(services, query).await,
        (ResolverKind::Simbad, true) => simbad_reverse(store, query).await,
        (ResolverKind::SsoDnet, false) => ssodnet_forward(store, query).await,
        (ResolverKind::SsoDnet, true) => ssodnet_reverse(store, query).await,
    }
}

/// Forward TNS lookup: lower-cased prefix on the resolver table. An exact
/// lookup (`nmax == 1`) pins the prefix with the key separator; an empty
/// name dumps the table, capped.
async fn tns_forward(store: &dyn StoreGateway, query: &ResolverQuery) -> PortalResult<FormattedTable> {
    let name = query.name.to_lowercase();
    let range = if name.is_empty() {
        RowRange::Full
    } else if query.nmax == 1 {
        RowRange::prefix(format!("{}{}", name, KEY_SEPARATOR))
    } else {
        RowRange::prefix(name)
    };
    let opts = ScanOptions::default().with_limit(query.nmax);
    let rows = store
        .scan(Index::TnsResolver.table_name(), &range, &opts)
        .await?;
    format_scan(store, Index::TnsResolver, &rows, &truncated()).await
}

/// Reverse TNS lookup: substring match of the native identifier against the
/// second key component.
async fn tns_reverse(store: &dyn StoreGateway, query: &ResolverQuery) -> PortalResult<FormattedTable> {
    let needle = query.name.to_lowercase();
    let opts = ScanOptions::default();
    let rows = store
        .scan(Index::TnsResolver.table_name(), &RowRange::Full, &opts)
        .await?;
    let matching: Vec<_> = rows
        .into_iter()
        .filter(|row| RowKey::last_component(&row.key).contains(&needle))
        .take(query.nmax)
        .collect();
    format_scan(store, Index::TnsResolver, &matching, &truncated()).await
}

/// Forward catalog lookup via the live Sesame service.
async fn simbad_forward(
    services: &ExternalServices,
    query: &ResolverQuery,
) -> PortalResult<FormattedTable> {
    let url = format!("{}/-ox/S?{}", services.sesame_url, query.name);
    let response = services
        .client
        .get(&url)
        .send()
        .await
        .map_err(|e| PortalError::upstream("sesame", "request", e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PortalError::upstream(
            "sesame",
            status.as_str(),
            format!("name resolution failed for `{}`", query.name),
        ));
    }
    let body = response
        .text()
        .await
        .map_err(|e| PortalError::upstream("sesame", "body", e.to_string()))?;
    let mut records = parse_sesame_xml(&body);
    records.truncate(query.nmax);
    Ok(FormattedTable::new(records))
}

/// Extract resolved names from a Sesame XML document: `<oname>` is the
/// principal identifier, `<alias>` entries are alternatives.
pub(crate) fn parse_sesame_xml(xml: &str) -> Vec<Record> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut records = Vec::new();
    let mut current: Option<&'static str> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = match e.name().as_ref() {
                    b"oname" => Some("oname"),
                    b"alias" => Some("alias"),
                    _ => None,
                };
            }
            Ok(Event::Text(t)) => {
                if let Some(kind) = current {
                    if let Ok(text) = t.unescape() {
                        let mut record = Record::new();
                        record.insert("d:name".to_string(), CellValue::Str(text.into_owned()));
                        record.insert("d:kind".to_string(), CellValue::Str(kind.to_string()));
                        records.push(record);
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    records
}

/// Reverse catalog lookup: the stored crossmatch label of the object.
async fn simbad_reverse(store: &dyn StoreGateway, query: &ResolverQuery) -> PortalResult<FormattedTable> {
    let columns = ColumnFilter::parse("i:objectId,d:cdsxmatch,i:ra,i:dec,i:candid,i:jd");
    let opts = ScanOptions::default()
        .with_limit(query.nmax)
        .with_columns(columns);
    let range = RowRange::prefix(format!("{}{}", query.name, KEY_SEPARATOR));
    let rows = store
        .scan(Index::Objects.table_name(), &range, &opts)
        .await?;
    format_scan(store, Index::Objects, &rows, &truncated()).await
}

/// Forward Solar-System designation lookup. Keys are `{name}-{n}` lower
/// cased; exact match pins the `-` marker.
async fn ssodnet_forward(
    store: &dyn StoreGateway,
    query: &ResolverQuery,
) -> PortalResult<FormattedTable> {
    let name = query.name.to_lowercase().replace(' ', "");
    let range = if name.is_empty() {
        RowRange::Full
    } else if query.nmax == 1 {
        RowRange::prefix(format!("{}-", name))
    } else {
        RowRange::prefix(name)
    };
    let opts = ScanOptions::default().with_limit(query.nmax);
    let rows = store
        .scan(Index::SsoResolver.table_name(), &range, &opts)
        .await?;
    format_scan(store, Index::SsoResolver, &rows, &truncated()).await
}

/// Reverse Solar-System lookup: object table → designations → resolver
/// entries per designation.
async fn ssodnet_reverse(
    store: &dyn StoreGateway,
    query: &ResolverQuery,
) -> PortalResult<FormattedTable> {
    let opts = ScanOptions::default().with_columns(ColumnFilter::parse("i:ssnamenr"));
    let range = RowRange::prefix(format!("{}{}", query.name, KEY_SEPARATOR));
    let rows = store
        .scan(Index::Objects.table_name(), &range, &opts)
        .await?;
    let mut designations: Vec<String> = rows
        .iter()
        .filter_map(|row| row.cell("i:ssnamenr").map(str::to_string))
        .collect();
    designations.sort();
    designations.dedup();

    let mut matches = Vec::new();
    for designation in designations {
        let range = RowRange::prefix(format!("{}-", designation.to_lowercase()));
        matches.extend(
            store
                .scan(
                    Index::SsoResolver.table_name(),
                    &range,
                    &ScanOptions::default().with_limit(query.nmax),
                )
                .await?,
        );
    }
    matches.truncate(query.nmax);
    format_scan(store, Index::SsoResolver, &matches, &truncated()).await
}

/// Resolver outputs never carry derived columns.
fn truncated() -> FormatOptions {
    FormatOptions::default().truncated(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;

    fn query(resolver: ResolverKind, name: &str, nmax: usize, reverse: bool) -> ResolverQuery {
        ResolverQuery {
            resolver,
            name: name.to_string(),
            nmax,
            reverse,
        }
    }

    fn services() -> ExternalServices {
        ExternalServices::default()
    }

    #[tokio::test]
    async fn test_tns_forward_prefix() {
        let store = fixtures::seeded_store();
        let q = query(ResolverKind::Tns, "SN 2021a", 10, false);
        let table = resolve(&store, &services(), &q).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "d:fullname"),
            CellValue::Str("SN 2021abc".into())
        );
    }

    #[tokio::test]
    async fn test_tns_forward_case_insensitive() {
        let store = fixtures::seeded_store();
        let q = query(ResolverKind::Tns, "sn 2021ABC", 1, false);
        let table = resolve(&store, &services(), &q).await.unwrap();
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_tns_empty_name_dumps_capped() {
        let store = fixtures::seeded_store();
        let q = query(ResolverKind::Tns, "", 1, false);
        let table = resolve(&store, &services(), &q).await.unwrap();
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_tns_reverse_by_internal_name() {
        let store = fixtures::seeded_store();
        let q = query(ResolverKind::Tns, "OBJ2", 10, true);
        let table = resolve(&store, &services(), &q).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "d:internalname"),
            CellValue::Str("OBJ2".into())
        );
    }

    #[tokio::test]
    async fn test_ssodnet_forward_exact() {
        let store = fixtures::seeded_store();
        let q = query(ResolverKind::SsoDnet, "2010 JO69", 1, false);
        let table = resolve(&store, &services(), &q).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "i:name"),
            CellValue::Str("2010 JO69".into())
        );
    }

    #[tokio::test]
    async fn test_ssodnet_reverse_from_object() {
        let store = fixtures::seeded_store();
        let q = query(ResolverKind::SsoDnet, "SSO1", 10, true);
        let table = resolve(&store, &services(), &q).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "i:ssnamenr"),
            CellValue::Str("2010JO69".into())
        );
    }

    #[tokio::test]
    async fn test_simbad_reverse_uses_object_table() {
        let store = fixtures::seeded_store();
        let q = query(ResolverKind::Simbad, "OBJ2", 10, true);
        let table = resolve(&store, &services(), &q).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.value(0, "d:cdsxmatch"),
            CellValue::Str("RRLyr".into())
        );
    }

    #[test]
    fn test_parse_sesame_xml() {
        let xml = r#"<Sesame><Target><Resolver name="S=Simbad">
            <oname>M  31</oname>
            <alias>NGC 224</alias>
            <alias>UGC 454</alias>
        </Resolver></Target></Sesame>"#;
        let records = parse_sesame_xml(xml);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["d:name"], CellValue::Str("M  31".into()));
        assert_eq!(records[1]["d:kind"], CellValue::Str("alias".into()));
    }
}
