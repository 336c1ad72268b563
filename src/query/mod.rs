//! Query router and validator.
//!
//! Incoming requests arrive as a flat parameter map. Each supported query
//! kind has a typed struct here, built by a `from_params` constructor that
//! checks required parameters, mutually-exclusive groups and bounds before
//! any store access. Table-specific code only ever sees validated queries.

pub mod params;

pub use params::Params;

use crate::cutout::colormap::ColormapKind;
use crate::cutout::convolve::KernelKind;
use crate::cutout::pipeline::{CutoutKind, CutoutOutputKind};
use crate::cutout::stretch::StretchSpec;
use crate::error::{PortalError, PortalResult};
use crate::models::{JulianDate, SkyCoord};
use crate::store::ColumnFilter;

/// Maximum cone-search radius, in arcseconds (5 degrees).
pub const MAX_RADIUS_ARCSEC: f64 = 18_000.0;

/// Maximum window of a plain date-range search, in days (3 hours).
/// Windows over the maximum are truncated, not rejected.
pub const MAX_DATE_WINDOW_DAYS: f64 = 3.0 / 24.0;

/// Row cap for latest-N queries.
pub const MAX_LATEST_ROWS: usize = 1000;

/// Maximum number of objects returned by the random sampler.
pub const MAX_RANDOM_OBJECTS: usize = 16;

/// Maximum number of rows accepted in a crossmatch catalog.
pub const MAX_CATALOG_ROWS: usize = 1000;

/// Parse the optional `columns` parameter; a restricted column list marks
/// the query as truncated, which disables derived-column computation.
fn column_filter(params: &Params) -> (ColumnFilter, bool) {
    match params.str("columns") {
        Some(spec) => {
            let filter = ColumnFilter::parse(&spec);
            let truncated = !filter.is_all();
            (filter, truncated)
        }
        None => (ColumnFilter::All, false),
    }
}

/// Parse a time bound, defaulting to the start of survey operations for
/// the lower bound and `now` for the upper bound.
fn time_bounds(params: &Params, start_name: &str, stop_name: &str) -> PortalResult<(JulianDate, JulianDate)> {
    let start = match params.str(start_name) {
        Some(s) => JulianDate::parse(&s).map_err(|e| PortalError::validation(start_name, e))?,
        None => JulianDate::survey_start(),
    };
    let stop = match params.str(stop_name) {
        Some(s) => JulianDate::parse(&s).map_err(|e| PortalError::validation(stop_name, e))?,
        None => JulianDate::now(),
    };
    Ok((start, stop))
}

fn split_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Object lookup
// ---------------------------------------------------------------------------

/// Lookup of one or more objects by identifier on the main table.
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    pub object_ids: Vec<String>,
    pub columns: ColumnFilter,
    pub truncated: bool,
    /// Merge upper-limit and below-quality-threshold measurements.
    pub with_upper_limits: bool,
}

impl ObjectQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let raw = params.required_str("objectId")?;
        let object_ids = split_ids(&raw);
        if object_ids.is_empty() {
            return Err(PortalError::validation("objectId", "no object identifier given"));
        }
        let (columns, truncated) = column_filter(params);
        Ok(Self {
            object_ids,
            columns,
            truncated,
            with_upper_limits: params.flag("withupperlim"),
        })
    }
}

// ---------------------------------------------------------------------------
// Explorer: object id XOR cone XOR date window
// ---------------------------------------------------------------------------

/// Spatial cone search parameters.
#[derive(Debug, Clone)]
pub struct ConeSearch {
    pub center: SkyCoord,
    pub radius_arcsec: f64,
    /// Optional time bound restricting each pixel scan.
    pub time: Option<(JulianDate, JulianDate)>,
    pub limit: usize,
}

impl ConeSearch {
    pub fn radius_deg(&self) -> f64 {
        self.radius_arcsec / 3600.0
    }
}

/// The explorer request shape: exactly one of three search groups.
#[derive(Debug, Clone)]
pub enum ExplorerQuery {
    ObjectIds(Vec<String>),
    Cone(ConeSearch),
    DateWindow {
        start: JulianDate,
        stop: JulianDate,
        limit: usize,
    },
}

impl ExplorerQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let groups: &[(&str, &[&str])] = &[
            ("objectId", &["objectId"]),
            ("conesearch", &["ra", "dec", "radius"]),
            ("daterange", &["startdate", "window", "stopdate"]),
        ];
        // Cone searches may carry a date bound, so the date group only
        // selects when no coordinates are present.
        let has_cone = params.has("ra") || params.has("dec") || params.has("radius");
        if params.has("objectId") && has_cone {
            return Err(PortalError::validation_in_group(
                "objectId",
                "conesearch",
                "conflicts with cone-search coordinates",
            ));
        }

        let limit = params.usize("n")?.unwrap_or(1000);

        if params.has("objectId") {
            let ids = split_ids(&params.required_str("objectId")?);
            if ids.is_empty() {
                return Err(PortalError::validation("objectId", "no object identifier given"));
            }
            return Ok(Self::ObjectIds(ids));
        }

        if has_cone {
            let ra = params.required_str("ra")?;
            let dec = params.required_str("dec")?;
            let radius_arcsec = params.required_f64("radius")?;
            if radius_arcsec > MAX_RADIUS_ARCSEC {
                return Err(PortalError::validation(
                    "radius",
                    format!(
                        "`radius` cannot be bigger than {} arcseconds (5 degrees)",
                        MAX_RADIUS_ARCSEC
                    ),
                ));
            }
            if radius_arcsec <= 0.0 {
                return Err(PortalError::validation("radius", "radius must be positive"));
            }
            let center =
                SkyCoord::parse(&ra, &dec).map_err(|e| PortalError::validation("ra", e))?;

            let time = if params.has("startdate") {
                let start = JulianDate::parse(&params.required_str("startdate")?)
                    .map_err(|e| PortalError::validation("startdate", e))?;
                let stop = if params.has("stopdate") {
                    JulianDate::parse(&params.required_str("stopdate")?)
                        .map_err(|e| PortalError::validation("stopdate", e))?
                } else if let Some(window) = params.f64("window")? {
                    JulianDate::new(start.value() + window)
                } else {
                    JulianDate::now()
                };
                Some((start, stop))
            } else {
                None
            };

            return Ok(Self::Cone(ConeSearch {
                center,
                radius_arcsec,
                time,
                limit,
            }));
        }

        if params.has("startdate") {
            let start = JulianDate::parse(&params.required_str("startdate")?)
                .map_err(|e| PortalError::validation("startdate", e))?;
            let stop = if params.has("stopdate") {
                JulianDate::parse(&params.required_str("stopdate")?)
                    .map_err(|e| PortalError::validation("stopdate", e))?
            } else if let Some(window) = params.f64("window")? {
                JulianDate::new(start.value() + window)
            } else {
                JulianDate::now()
            };
            // Windows over the maximum truncate rather than fail.
            let stop = if stop.value() - start.value() > MAX_DATE_WINDOW_DAYS {
                JulianDate::new(start.value() + MAX_DATE_WINDOW_DAYS)
            } else {
                stop
            };
            return Ok(Self::DateWindow { start, stop, limit });
        }

        // Nothing matched; report against the declared groups.
        let _ = params.exclusive_group(groups)?;
        Err(PortalError::validation(
            "objectId",
            "one of `objectId`, (`ra`, `dec`, `radius`) or `startdate` is required",
        ))
    }
}

// ---------------------------------------------------------------------------
// Latests: class-filtered reverse time scan
// ---------------------------------------------------------------------------

/// Which classification index a latest-N query targets.
///
/// Externally-classified labels carry a provider prefix: `(TNS) Ia` routes
/// to the external-class index, `(SIMBAD) Star` strips to the bare label on
/// the default class index. The `allclasses` sentinel falls through to the
/// plain time index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassSelector {
    All,
    Class(String),
    Tns(String),
}

impl ClassSelector {
    pub fn parse(label: &str) -> Self {
        if label == "allclasses" {
            Self::All
        } else if let Some(rest) = label.strip_prefix("(TNS) ") {
            Self::Tns(rest.to_string())
        } else if let Some(rest) = label.strip_prefix("(SIMBAD) ") {
            Self::Class(rest.to_string())
        } else {
            Self::Class(label.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct LatestsQuery {
    pub class: ClassSelector,
    pub limit: usize,
    pub start: JulianDate,
    pub stop: JulianDate,
    pub columns: ColumnFilter,
    pub truncated: bool,
    pub extract_color: bool,
}

impl LatestsQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let class = ClassSelector::parse(&params.required_str("class")?);
        let limit = params.usize("n")?.unwrap_or(10);
        if limit > MAX_LATEST_ROWS {
            return Err(PortalError::validation(
                "n",
                format!("`n` cannot exceed {}", MAX_LATEST_ROWS),
            ));
        }
        let (start, stop) = time_bounds(params, "startdate", "stopdate")?;
        let (columns, truncated) = column_filter(params);
        Ok(Self {
            class,
            limit,
            start,
            stop,
            columns,
            truncated,
            extract_color: params.flag("color"),
        })
    }
}

// ---------------------------------------------------------------------------
// Anomaly: reverse time scan over the anomaly index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AnomalyQuery {
    pub limit: usize,
    pub start: JulianDate,
    pub stop: JulianDate,
    pub columns: ColumnFilter,
    pub truncated: bool,
}

impl AnomalyQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let limit = params.usize("n")?.unwrap_or(10);
        let (start, mut stop) = time_bounds(params, "start_date", "stop_date")?;
        // An explicit stop date selects the whole day.
        if params.has("stop_date") {
            stop = JulianDate::new(stop.value() + 1.0);
        }
        let (columns, truncated) = column_filter(params);
        Ok(Self {
            limit,
            start,
            stop,
            columns,
            truncated,
        })
    }
}

// ---------------------------------------------------------------------------
// Solar-System objects and tracklets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SsoQuery {
    pub designations: Vec<String>,
    pub columns: ColumnFilter,
    pub truncated: bool,
}

impl SsoQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let raw = params.required_str("n_or_d")?;
        let designations = split_ids(&raw);
        if designations.is_empty() {
            return Err(PortalError::validation("n_or_d", "no designation given"));
        }
        let (columns, truncated) = column_filter(params);
        Ok(Self {
            designations,
            columns,
            truncated,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TrackletQuery {
    /// Row-key prefix of the tracklet index, either an explicit tracklet id
    /// or one derived from an observation date.
    pub prefix: String,
    pub columns: ColumnFilter,
    pub truncated: bool,
}

impl TrackletQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let prefix = if let Some(id) = params.str("id") {
            id
        } else if let Some(date) = params.str("date") {
            // `2021-08-10 05:57:11` -> `TRCK_20210810_055711`
            format!(
                "TRCK_{}",
                date.replace('-', "").replace(':', "").replace(' ', "_")
            )
        } else {
            return Err(PortalError::validation(
                "date",
                "specify a tracklet `id` or a `date` at the format YYYY-MM-DD hh:mm:ss",
            ));
        };
        let (columns, truncated) = column_filter(params);
        Ok(Self {
            prefix,
            columns,
            truncated,
        })
    }
}

// ---------------------------------------------------------------------------
// Name resolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    Tns,
    Simbad,
    SsoDnet,
}

#[derive(Debug, Clone)]
pub struct ResolverQuery {
    pub resolver: ResolverKind,
    pub name: String,
    pub nmax: usize,
    pub reverse: bool,
}

impl ResolverQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let resolver = match params.required_str("resolver")?.as_str() {
            "tns" => ResolverKind::Tns,
            "simbad" => ResolverKind::Simbad,
            "ssodnet" => ResolverKind::SsoDnet,
            other => {
                return Err(PortalError::validation(
                    "resolver",
                    format!("unknown resolver `{}`; choose among tns, simbad, ssodnet", other),
                ))
            }
        };
        Ok(Self {
            resolver,
            name: params.required_str("name")?,
            nmax: params.usize("nmax")?.unwrap_or(10).max(1),
            reverse: params.flag("reverse"),
        })
    }
}

// ---------------------------------------------------------------------------
// Random sampling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RandomQuery {
    pub count: usize,
    pub seed: Option<u64>,
    pub class: Option<String>,
    pub columns: ColumnFilter,
    pub truncated: bool,
}

impl RandomQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let requested = params
            .usize("n")?
            .ok_or_else(|| PortalError::validation("n", "missing required parameter"))?;
        let count = requested.min(MAX_RANDOM_OBJECTS).max(1);
        let seed = params.usize("seed")?.map(|s| s as u64);
        let class = params.str("class").filter(|c| !c.is_empty());
        let (columns, truncated) = column_filter(params);
        Ok(Self {
            count,
            seed,
            class,
            columns,
            truncated,
        })
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StatsQuery {
    /// Date or date prefix, e.g. `20211103` or `202111`.
    pub date: String,
    pub columns: ColumnFilter,
    /// Return the column-name list instead of data rows.
    pub schema_only: bool,
}

impl StatsQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let schema_only = params.flag("schema");
        let date = if schema_only {
            params.str("date").unwrap_or_default()
        } else {
            params.required_str("date")?
        };
        let (columns, _) = column_filter(params);
        Ok(Self {
            date,
            columns,
            schema_only,
        })
    }
}

// ---------------------------------------------------------------------------
// Cutouts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CutoutQuery {
    pub object_id: String,
    pub kind: CutoutKind,
    /// Explicit candidate id; absent means the most recent alert.
    pub candid: Option<String>,
    pub output: CutoutOutputKind,
    pub stretch: StretchSpec,
    pub kernel: Option<KernelKind>,
    pub colormap: Option<ColormapKind>,
}

impl CutoutQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let object_id = params.required_str("objectId")?;
        let kind = CutoutKind::parse(&params.required_str("kind")?)
            .map_err(|e| PortalError::validation("kind", e))?;
        let output = match params.str("output-format") {
            Some(spec) => CutoutOutputKind::parse(&spec)
                .map_err(|e| PortalError::validation("output-format", e))?,
            None => CutoutOutputKind::Png,
        };
        let stretch = StretchSpec::from_params(
            params.str("stretch").as_deref(),
            params.f64("pmin")?,
            params.f64("pmax")?,
        )
        .map_err(|e| PortalError::validation("stretch", e))?;
        let kernel = match params.str("convolution_kernel") {
            Some(spec) => Some(
                KernelKind::parse(&spec)
                    .map_err(|e| PortalError::validation("convolution_kernel", e))?,
            ),
            None => None,
        };
        let colormap = match params.str("colormap") {
            Some(spec) => Some(
                ColormapKind::parse(&spec).map_err(|e| PortalError::validation("colormap", e))?,
            ),
            None => None,
        };
        Ok(Self {
            object_id,
            kind,
            candid: params.str("candid"),
            output,
            stretch,
            kernel,
            colormap,
        })
    }
}

// ---------------------------------------------------------------------------
// Crossmatch
// ---------------------------------------------------------------------------

/// Column mapping of a caller-supplied catalog: 3 or 4 comma-separated
/// column names (`RA,Dec,ID` or `RA,Dec,ID,Time`).
#[derive(Debug, Clone)]
pub struct CatalogHeader {
    pub ra: String,
    pub dec: String,
    pub id: String,
    pub time: Option<String>,
}

impl CatalogHeader {
    pub fn parse(spec: &str) -> PortalResult<Self> {
        let parts: Vec<String> = spec.split(',').map(|s| s.trim().to_string()).collect();
        match parts.as_slice() {
            [ra, dec, id] => Ok(Self {
                ra: ra.clone(),
                dec: dec.clone(),
                id: id.clone(),
                time: None,
            }),
            [ra, dec, id, time] => Ok(Self {
                ra: ra.clone(),
                dec: dec.clone(),
                id: id.clone(),
                time: Some(time.clone()),
            }),
            _ => Err(PortalError::validation(
                "header",
                "header should contain 3 or 4 entries, e.g. RA,DEC,ID or RA,DEC,ID,Time",
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct XmatchQuery {
    pub catalog_csv: String,
    pub header: CatalogHeader,
    pub radius_arcsec: f64,
    /// Per-row search window in days, used when the catalog carries a time
    /// column.
    pub window_days: Option<f64>,
}

impl XmatchQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let radius_arcsec = params.required_f64("radius")?;
        if radius_arcsec > MAX_RADIUS_ARCSEC {
            return Err(PortalError::validation(
                "radius",
                format!(
                    "`radius` cannot be bigger than {} arcseconds (5 degrees)",
                    MAX_RADIUS_ARCSEC
                ),
            ));
        }
        Ok(Self {
            catalog_csv: params.required_str("catalog")?,
            header: CatalogHeader::parse(&params.required_str("header")?)?,
            radius_arcsec,
            window_days: params.f64("window")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Skymap crossmatch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum SkymapSource {
    /// Caller-supplied map, base64 of the (possibly gzipped) file.
    Inline(Vec<u8>),
    /// Event name to download from the gravitational-wave event archive.
    Event(String),
}

#[derive(Debug, Clone)]
pub struct SkymapQuery {
    pub source: SkymapSource,
    /// Cumulative-probability threshold in [0, 1].
    pub credible_level: f64,
}

impl SkymapQuery {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let source = if let Some(encoded) = params.str("skymap") {
            use base64::Engine as _;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| PortalError::validation("skymap", format!("invalid base64: {}", e)))?;
            SkymapSource::Inline(bytes)
        } else if let Some(event) = params.str("event_name") {
            SkymapSource::Event(event)
        } else {
            return Err(PortalError::validation(
                "skymap",
                "one of `skymap` or `event_name` is required",
            ));
        };
        let credible_level = params.required_f64("credible_level")?;
        if !(0.0..=1.0).contains(&credible_level) {
            return Err(PortalError::validation(
                "credible_level",
                "credible level must be between 0 and 1",
            ));
        }
        Ok(Self {
            source,
            credible_level,
        })
    }
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct IngestUpload {
    pub pipeline: String,
    /// Space-separated CSV payload with a header line.
    pub payload: String,
    pub version: String,
    pub date: String,
    pub eid: String,
    pub sandbox: bool,
}

impl IngestUpload {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        Ok(Self {
            pipeline: params.required_str("pipeline")?.to_lowercase(),
            payload: params.required_str("payload")?,
            version: params.required_str("version")?,
            date: params.required_str("date")?,
            eid: params.required_str("EID")?,
            sandbox: params.str("mode").as_deref() == Some("sandbox"),
        })
    }
}

/// Date selection of an ingestion download: everything, one date (prefix),
/// or an inclusive `start:stop` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSelection {
    All,
    Single(String),
    Range(String, String),
}

#[derive(Debug, Clone)]
pub struct IngestDownload {
    pub pipeline: String,
    pub dates: DateSelection,
    pub columns: ColumnFilter,
    pub sandbox: bool,
}

impl IngestDownload {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        let raw = params.required_str("dates")?;
        let dates = if raw.replace(' ', "") == "*" {
            DateSelection::All
        } else if let Some((start, stop)) = raw.split_once(':') {
            DateSelection::Range(start.to_string(), stop.to_string())
        } else {
            DateSelection::Single(raw)
        };
        let (columns, _) = column_filter(params);
        Ok(Self {
            pipeline: params.required_str("pipeline")?.to_lowercase(),
            dates,
            columns,
            sandbox: params.str("mode").as_deref() == Some("sandbox"),
        })
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetadataPut {
    pub object_id: String,
    pub internal_name: String,
    pub comments: String,
    pub username: String,
}

impl MetadataPut {
    pub fn from_params(params: &Params) -> PortalResult<Self> {
        Ok(Self {
            object_id: params.required_str("objectId")?.trim().to_string(),
            internal_name: params.required_str("internal_name")?,
            comments: params.str("comments").unwrap_or_default(),
            username: params.required_str("username")?,
        })
    }
}
