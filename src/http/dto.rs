//! Endpoint argument descriptions.
//!
//! A GET on any data endpoint returns the list of accepted parameters, so
//! clients can discover the call shape without leaving the API.

use serde::Serialize;

/// Description of one accepted parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ArgDoc {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

const fn arg(name: &'static str, required: bool, description: &'static str) -> ArgDoc {
    ArgDoc {
        name,
        required,
        description,
    }
}

/// Health response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Ingestion upload response body.
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub rows: usize,
}

pub fn objects_args() -> Vec<ArgDoc> {
    vec![
        arg("objectId", true, "single object identifier, or a comma-separated list"),
        arg("columns", false, "comma-separated columns to return; restricting disables derived columns"),
        arg("withupperlim", false, "merge upper limits and bad-quality measurements, tagged d:tag"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn explorer_args() -> Vec<ArgDoc> {
    vec![
        arg("objectId", false, "object identifiers; conflicts with the cone-search group"),
        arg("ra", false, "cone center right ascension (degrees or sexagesimal)"),
        arg("dec", false, "cone center declination (degrees or sexagesimal)"),
        arg("radius", false, "cone radius in arcseconds, at most 18000"),
        arg("startdate", false, "lower time bound (ISO, JD or MJD)"),
        arg("stopdate", false, "upper time bound"),
        arg("window", false, "window length in days, alternative to stopdate"),
        arg("n", false, "maximum number of rows (default 1000)"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn latests_args() -> Vec<ArgDoc> {
    vec![
        arg("class", true, "class label, `allclasses`, or `(TNS) <label>`"),
        arg("n", false, "number of alerts, at most 1000 (default 10)"),
        arg("startdate", false, "lower time bound (default: start of survey)"),
        arg("stopdate", false, "upper time bound (default: now)"),
        arg("columns", false, "comma-separated columns to return"),
        arg("color", false, "compute paired-band color columns"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn anomaly_args() -> Vec<ArgDoc> {
    vec![
        arg("n", false, "number of anomalous alerts (default 10)"),
        arg("start_date", false, "lower time bound"),
        arg("stop_date", false, "upper time bound; selects the whole day"),
        arg("columns", false, "comma-separated columns to return"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn sso_args() -> Vec<ArgDoc> {
    vec![
        arg("n_or_d", true, "Solar-System number or designation, or a comma-separated list"),
        arg("columns", false, "comma-separated columns to return"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn tracklet_args() -> Vec<ArgDoc> {
    vec![
        arg("id", false, "tracklet identifier, e.g. TRCK_20210810_055711"),
        arg("date", false, "observation date, format YYYY-MM-DD hh:mm:ss; partial dates match by prefix"),
        arg("columns", false, "comma-separated columns to return"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn cutouts_args() -> Vec<ArgDoc> {
    vec![
        arg("objectId", true, "object identifier"),
        arg("kind", true, "Science, Template or Difference"),
        arg("candid", false, "candidate id; absent means the most recent alert"),
        arg("output-format", false, "PNG (default), FITS or array"),
        arg("stretch", false, "sigmoid (default), linear, sqrt, power, log or asinh"),
        arg("pmin", false, "lower percentile of the stretch (default 0.5)"),
        arg("pmax", false, "upper percentile of the stretch (default 99.5)"),
        arg("convolution_kernel", false, "gauss or box"),
        arg("colormap", false, "grayscale (default), viridis or magma"),
    ]
}

pub fn xmatch_args() -> Vec<ArgDoc> {
    vec![
        arg("catalog", true, "CSV catalog content, at most 1000 rows"),
        arg("header", true, "comma-separated coordinate columns: RA,Dec,ID or RA,Dec,ID,Time"),
        arg("radius", true, "crossmatch radius in arcseconds, at most 18000"),
        arg("window", false, "time window in days around each catalog timestamp"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn skymap_args() -> Vec<ArgDoc> {
    vec![
        arg("skymap", false, "base64 of a (possibly gzipped) FITS probability map"),
        arg("event_name", false, "event name to download from the archive; alternative to skymap"),
        arg("credible_level", true, "cumulative-probability threshold in [0, 1]"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn statistics_args() -> Vec<ArgDoc> {
    vec![
        arg("date", true, "night date or prefix, e.g. 20211103, 202111 or empty with schema"),
        arg("columns", false, "comma-separated columns to return"),
        arg("schema", false, "return the statistics column list instead of data"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn random_args() -> Vec<ArgDoc> {
    vec![
        arg("n", true, "number of objects to sample, at most 16"),
        arg("seed", false, "sampling seed, for reproducible draws"),
        arg("class", false, "restrict sampling to one class label"),
        arg("columns", false, "comma-separated columns to return"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}

pub fn resolver_args() -> Vec<ArgDoc> {
    vec![
        arg("resolver", true, "tns, simbad or ssodnet"),
        arg("name", true, "name to resolve; empty dumps the table (tns only)"),
        arg("nmax", false, "maximum number of matches (default 10)"),
        arg("reverse", false, "resolve from survey identifier to external names"),
    ]
}

pub fn metadata_args() -> Vec<ArgDoc> {
    vec![
        arg("objectId", false, "object identifier to annotate or fetch"),
        arg("internal_name", false, "internal name to attach, or to reverse-look up"),
        arg("comments", false, "free-text comment attached with the name"),
        arg("username", false, "author of the annotation; required on writes"),
    ]
}

pub fn ingest_args() -> Vec<ArgDoc> {
    vec![
        arg("pipeline", true, "pipeline name; selects the per-pipeline schema"),
        arg("payload", false, "space-delimited table with a header line; presence selects upload"),
        arg("version", false, "pipeline version, required on upload"),
        arg("date", false, "observation date of the batch, required on upload"),
        arg("EID", false, "exposure identifier of the batch, required on upload"),
        arg("dates", false, "download selection: `*`, one date, or start:stop (inclusive)"),
        arg("columns", false, "comma-separated columns to return on download"),
        arg("mode", false, "`sandbox` targets the sandbox table"),
        arg("output-format", false, "json (default), csv, parquet or votable"),
    ]
}
