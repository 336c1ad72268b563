//! Result formatting: typed decode, group-by-object deduplication, derived
//! columns and photometry merging.
//!
//! Raw scan rows carry string cells. The formatter decodes them with the
//! table schema, optionally keeps only the most recent alert per object, and
//! computes the on-the-fly `v:` columns when the caller did not restrict the
//! column set (a truncated fetch may lack the inputs, so derivation is
//! skipped entirely).

use std::collections::BTreeMap;

use crate::models::JulianDate;
use crate::store::{CellValue, RawRow, TableSchema};

use super::table::{FormattedTable, Record};

/// Formatting flags for one query.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Keep only the most recent alert per object id.
    pub group_by_object: bool,
    /// The caller restricted the column set; derived columns are skipped.
    pub truncated: bool,
    /// Compute paired-band color columns (`v:g-r` and friends).
    pub extract_color: bool,
    /// Attach the `v:constellation` column.
    pub with_constellation: bool,
    /// Decimal precision of the timestamp comparison used to deduplicate
    /// upper-limit rows against the valid set. A heuristic tolerance, not a
    /// physical constant.
    pub jd_round_decimals: u32,
    /// Maximum time separation of a g/r measurement pair, in days.
    pub color_window_days: f64,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            group_by_object: false,
            truncated: false,
            extract_color: false,
            with_constellation: false,
            jd_round_decimals: 6,
            color_window_days: 0.3,
        }
    }
}

impl FormatOptions {
    pub fn grouped() -> Self {
        Self {
            group_by_object: true,
            ..Self::default()
        }
    }

    pub fn truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    pub fn with_color(mut self, extract_color: bool) -> Self {
        self.extract_color = extract_color;
        self
    }

    pub fn with_constellation(mut self, with_constellation: bool) -> Self {
        self.with_constellation = with_constellation;
        self
    }
}

/// Decode raw rows with the table schema, dropping the `key:*` bookkeeping
/// columns.
pub fn decode_rows(rows: &[RawRow], schema: &TableSchema) -> Vec<Record> {
    rows.iter()
        .map(|row| {
            row.cells
                .iter()
                .filter(|(col, _)| !col.starts_with("key:"))
                .map(|(col, raw)| (col.clone(), schema.decode(col, raw)))
                .collect()
        })
        .collect()
}

/// Full formatting pass: decode, group, derive, sort.
pub fn format_rows(rows: &[RawRow], schema: &TableSchema, opts: &FormatOptions) -> FormattedTable {
    let mut records = decode_rows(rows, schema);

    if opts.group_by_object {
        records = group_by_object(records);
    }

    if !opts.truncated {
        for record in &mut records {
            add_lastdate(record);
            add_classification(record);
        }
        if opts.extract_color {
            add_colors(&mut records, opts.color_window_days);
        }
    }
    if opts.with_constellation {
        for record in &mut records {
            add_constellation(record);
        }
    }

    sort_by_jd_desc(&mut records);
    FormattedTable::new(records)
}

fn object_id(record: &Record) -> Option<String> {
    record.get("i:objectId").and_then(|v| v.as_str().map(str::to_string))
}

fn jd(record: &Record) -> Option<f64> {
    record.get("i:jd").and_then(CellValue::as_f64)
}

/// Retain exactly one record per object id: the one with maximum
/// observation time.
pub fn group_by_object(records: Vec<Record>) -> Vec<Record> {
    let mut best: BTreeMap<String, Record> = BTreeMap::new();
    let mut keyless = Vec::new();
    for record in records {
        match object_id(&record) {
            Some(oid) => {
                let candidate_jd = jd(&record).unwrap_or(f64::MIN);
                match best.get(&oid) {
                    Some(current) if jd(current).unwrap_or(f64::MIN) >= candidate_jd => {}
                    _ => {
                        best.insert(oid, record);
                    }
                }
            }
            None => keyless.push(record),
        }
    }
    let mut out: Vec<Record> = best.into_values().collect();
    out.extend(keyless);
    out
}

/// Most-recent-first ordering with a deterministic object-id tiebreak.
pub fn sort_by_jd_desc(records: &mut [Record]) {
    records.sort_by(|a, b| {
        let ja = jd(a).unwrap_or(f64::MIN);
        let jb = jd(b).unwrap_or(f64::MIN);
        jb.partial_cmp(&ja)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| object_id(a).cmp(&object_id(b)))
    });
}

fn add_lastdate(record: &mut Record) {
    if let Some(jd) = jd(record) {
        record.insert(
            "v:lastdate".to_string(),
            CellValue::Str(JulianDate::new(jd).to_iso()),
        );
    }
}

/// Taxonomy of the on-the-fly classification: an external crossmatch label
/// wins, then the Solar-System flag, then supernova scores, then
/// microlensing. Everything else is `Unknown`.
pub fn classification(record: &Record) -> String {
    let cdsxmatch = record
        .get("d:cdsxmatch")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown");
    if cdsxmatch != "Unknown" && !cdsxmatch.is_empty() {
        return cdsxmatch.to_string();
    }
    let roid = record.get("d:roid").and_then(CellValue::as_i64).unwrap_or(0);
    if roid == 2 || roid == 3 {
        return "Solar System".to_string();
    }
    let snn_snia = record
        .get("d:snn_snia_vs_nonia")
        .and_then(CellValue::as_f64)
        .unwrap_or(0.0);
    let snn_all = record
        .get("d:snn_sn_vs_all")
        .and_then(CellValue::as_f64)
        .unwrap_or(0.0);
    if snn_snia > 0.5 && snn_all > 0.5 {
        return "SN candidate".to_string();
    }
    let ml1 = record.get("d:mulens_class_1").and_then(|v| v.as_str());
    let ml2 = record.get("d:mulens_class_2").and_then(|v| v.as_str());
    if ml1 == Some("ML") && ml2 == Some("ML") {
        return "Microlensing candidate".to_string();
    }
    "Unknown".to_string()
}

fn add_classification(record: &mut Record) {
    let label = classification(record);
    record.insert("v:classification".to_string(), CellValue::Str(label));
}

/// Paired-band color extraction.
///
/// For each g-band measurement (`i:fid == 1`), find the nearest r-band
/// measurement (`i:fid == 2`) of the same object within the time window and
/// attach `v:g-r` and its uncertainty. `v:rate(g-r)` is the color change per
/// day between consecutive pairs. Requires the raw magnitude columns, so the
/// caller skips this for truncated fetches.
fn add_colors(records: &mut [Record], window_days: f64) {
    // (object, fid) -> [(jd, mag, sigma, index)]
    let mut by_object: BTreeMap<String, Vec<(f64, f64, f64, i64, usize)>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        let (Some(oid), Some(jd)) = (object_id(record), jd(record)) else {
            continue;
        };
        let Some(fid) = record.get("i:fid").and_then(CellValue::as_i64) else {
            continue;
        };
        let Some(mag) = record.get("i:magpsf").and_then(CellValue::as_f64) else {
            continue;
        };
        let sigma = record
            .get("i:sigmapsf")
            .and_then(CellValue::as_f64)
            .unwrap_or(0.0);
        by_object.entry(oid).or_default().push((jd, mag, sigma, fid, idx));
    }

    for measurements in by_object.values() {
        let g_band: Vec<_> = measurements.iter().filter(|m| m.3 == 1).collect();
        let r_band: Vec<_> = measurements.iter().filter(|m| m.3 == 2).collect();

        // (jd of the g measurement, color) pairs in time order
        let mut pairs: Vec<(f64, f64, usize)> = Vec::new();
        for g in &g_band {
            let nearest = r_band
                .iter()
                .filter(|r| (r.0 - g.0).abs() <= window_days)
                .min_by(|a, b| {
                    (a.0 - g.0)
                        .abs()
                        .partial_cmp(&(b.0 - g.0).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(r) = nearest {
                let color = g.1 - r.1;
                let sigma = (g.2 * g.2 + r.2 * r.2).sqrt();
                pairs.push((g.0, color, g.4));
                records[g.4].insert("v:g-r".to_string(), CellValue::Double(color));
                records[g.4].insert("v:sigma(g-r)".to_string(), CellValue::Double(sigma));
            }
        }
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        for window in pairs.windows(2) {
            let (jd0, color0, _) = window[0];
            let (jd1, color1, idx1) = window[1];
            if jd1 > jd0 {
                let rate = (color1 - color0) / (jd1 - jd0);
                records[idx1].insert("v:rate(g-r)".to_string(), CellValue::Double(rate));
            }
        }
    }
}

fn add_constellation(record: &mut Record) {
    let ra = record.get("i:ra").and_then(CellValue::as_f64);
    let dec = record.get("i:dec").and_then(CellValue::as_f64);
    if let (Some(ra), Some(dec)) = (ra, dec) {
        record.insert(
            "v:constellation".to_string(),
            CellValue::Str(constellation_at(ra, dec).to_string()),
        );
    }
}

/// Merge of valid, upper-limit and below-quality-threshold measurements.
///
/// Rows are tagged with `d:tag`, upper rows get a sentinel candidate id,
/// upper-limit rows whose rounded timestamp already exists in the valid set
/// are dropped (the two tables render the same JD with different float
/// precision), and the union is sorted most-recent-first. Missing columns
/// across source tables read as `Null` in the resulting table.
pub fn merge_photometry(
    valid: Vec<Record>,
    upper: Vec<Record>,
    bad_quality: Vec<Record>,
    jd_round_decimals: u32,
) -> FormattedTable {
    let scale = 10f64.powi(jd_round_decimals as i32);
    let round = |v: f64| (v * scale).round() / scale;

    let valid_jds: Vec<f64> = valid.iter().filter_map(jd).map(round).collect();
    let seen = |candidate: f64| valid_jds.iter().any(|v| *v == round(candidate));

    let mut merged = Vec::new();
    for mut record in valid {
        record.insert("d:tag".to_string(), CellValue::Str("valid".to_string()));
        merged.push(record);
    }
    for mut record in upper {
        record.insert("d:tag".to_string(), CellValue::Str("upperlim".to_string()));
        record.insert("i:candid".to_string(), CellValue::Int(-1));
        merged.push(record);
    }
    for mut record in bad_quality {
        if let Some(jd) = jd(&record) {
            if seen(jd) {
                continue;
            }
        }
        record.insert("d:tag".to_string(), CellValue::Str("badquality".to_string()));
        record.insert("i:candid".to_string(), CellValue::Int(-1));
        merged.push(record);
    }

    sort_by_jd_desc(&mut merged);
    FormattedTable::new(merged)
}

/// Nearest constellation center.
///
/// An approximation of the IAU boundaries: the sky is assigned to the
/// closest of the 88 constellation centers by angular distance.
pub fn constellation_at(ra_deg: f64, dec_deg: f64) -> &'static str {
    CONSTELLATION_CENTERS
        .iter()
        .min_by(|a, b| {
            let da = crate::models::angular_separation_deg(ra_deg, dec_deg, a.1, a.2);
            let db = crate::models::angular_separation_deg(ra_deg, dec_deg, b.1, b.2);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|c| c.0)
        .unwrap_or("Unknown")
}

/// Approximate centers of the 88 IAU constellations, (name, ra, dec) in
/// degrees.
const CONSTELLATION_CENTERS: [(&str, f64, f64); 88] = [
    ("Andromeda", 8.5, 38.0),
    ("Antlia", 150.0, -33.0),
    ("Apus", 240.0, -76.0),
    ("Aquarius", 335.0, -10.0),
    ("Aquila", 295.0, 3.0),
    ("Ara", 260.0, -55.0),
    ("Aries", 40.0, 20.0),
    ("Auriga", 90.0, 42.0),
    ("Bootes", 218.0, 31.0),
    ("Caelum", 70.0, -38.0),
    ("Camelopardalis", 90.0, 69.0),
    ("Cancer", 130.0, 20.0),
    ("Canes Venatici", 195.0, 40.0),
    ("Canis Major", 105.0, -22.0),
    ("Canis Minor", 114.0, 6.0),
    ("Capricornus", 315.0, -18.0),
    ("Carina", 130.0, -63.0),
    ("Cassiopeia", 15.0, 62.0),
    ("Centaurus", 200.0, -47.0),
    ("Cepheus", 330.0, 71.0),
    ("Cetus", 25.0, -8.0),
    ("Chamaeleon", 160.0, -79.0),
    ("Circinus", 225.0, -63.0),
    ("Columba", 87.0, -35.0),
    ("Coma Berenices", 190.0, 23.0),
    ("Corona Australis", 280.0, -41.0),
    ("Corona Borealis", 235.0, 33.0),
    ("Corvus", 186.0, -18.0),
    ("Crater", 170.0, -16.0),
    ("Crux", 187.0, -60.0),
    ("Cygnus", 310.0, 45.0),
    ("Delphinus", 309.0, 12.0),
    ("Dorado", 80.0, -59.0),
    ("Draco", 240.0, 67.0),
    ("Equuleus", 318.0, 8.0),
    ("Eridanus", 50.0, -28.0),
    ("Fornax", 42.0, -31.0),
    ("Gemini", 105.0, 23.0),
    ("Grus", 335.0, -46.0),
    ("Hercules", 255.0, 30.0),
    ("Horologium", 48.0, -53.0),
    ("Hydra", 160.0, -20.0),
    ("Hydrus", 30.0, -70.0),
    ("Indus", 320.0, -58.0),
    ("Lacerta", 337.0, 46.0),
    ("Leo", 160.0, 15.0),
    ("Leo Minor", 155.0, 33.0),
    ("Lepus", 83.0, -19.0),
    ("Libra", 230.0, -15.0),
    ("Lupus", 230.0, -42.0),
    ("Lynx", 120.0, 47.0),
    ("Lyra", 284.0, 37.0),
    ("Mensa", 82.0, -77.0),
    ("Microscopium", 315.0, -36.0),
    ("Monoceros", 107.0, -3.0),
    ("Musca", 188.0, -70.0),
    ("Norma", 243.0, -51.0),
    ("Octans", 330.0, -85.0),
    ("Ophiuchus", 255.0, -4.0),
    ("Orion", 83.0, 5.0),
    ("Pavo", 295.0, -65.0),
    ("Pegasus", 340.0, 19.0),
    ("Perseus", 55.0, 45.0),
    ("Phoenix", 15.0, -48.0),
    ("Pictor", 85.0, -53.0),
    ("Pisces", 15.0, 13.0),
    ("Piscis Austrinus", 340.0, -30.0),
    ("Puppis", 117.0, -31.0),
    ("Pyxis", 133.0, -27.0),
    ("Reticulum", 59.0, -60.0),
    ("Sagitta", 297.0, 18.0),
    ("Sagittarius", 285.0, -28.0),
    ("Scorpius", 253.0, -27.0),
    ("Sculptor", 10.0, -32.0),
    ("Scutum", 280.0, -10.0),
    ("Serpens", 240.0, 6.0),
    ("Sextans", 155.0, -2.0),
    ("Taurus", 67.0, 16.0),
    ("Telescopium", 277.0, -51.0),
    ("Triangulum", 32.0, 31.0),
    ("Triangulum Australe", 240.0, -65.0),
    ("Tucana", 355.0, -64.0),
    ("Ursa Major", 165.0, 53.0),
    ("Ursa Minor", 230.0, 78.0),
    ("Vela", 140.0, -47.0),
    ("Virgo", 200.0, -3.0),
    ("Volans", 120.0, -69.0),
    ("Vulpecula", 302.0, 24.0),
];
