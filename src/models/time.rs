use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Offset between Julian Date and Unix epoch, in days.
const JD_UNIX_EPOCH: f64 = 2440587.5;

/// Offset between Julian Date and Modified Julian Date.
const JD_MJD_OFFSET: f64 = 2400000.5;

/// Julian Date representation (days, UTC).
///
/// All index tables key time as JD, so this is the canonical time type of
/// the engine. Conversions to and from calendar dates go through chrono.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct JulianDate(f64);

impl JulianDate {
    pub fn new(jd: f64) -> Self {
        Self(jd)
    }

    /// Raw JD value as f64.
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Current time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Start of survey operations (2019-11-01 00:00:00 UTC), used as the
    /// default lower time bound.
    pub fn survey_start() -> Self {
        Self(2_458_788.5)
    }

    pub fn from_mjd(mjd: f64) -> Self {
        Self(mjd + JD_MJD_OFFSET)
    }

    pub fn to_mjd(&self) -> f64 {
        self.0 - JD_MJD_OFFSET
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let secs = dt.timestamp() as f64 + dt.timestamp_subsec_nanos() as f64 / 1e9;
        Self(secs / 86400.0 + JD_UNIX_EPOCH)
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        let secs = (self.0 - JD_UNIX_EPOCH) * 86400.0;
        let secs_i64 = secs.floor() as i64;
        let nanos = ((secs - secs.floor()) * 1e9) as u32;
        DateTime::from_timestamp(secs_i64, nanos).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// ISO 8601 rendering (UTC, second precision).
    pub fn to_iso(&self) -> String {
        self.to_datetime().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Parse a user-supplied time string.
    ///
    /// Accepts ISO dates (`2021-03-01`, `2021-03-01 12:00:00`,
    /// `2021-03-01T12:00:00`), plain Julian dates (`2459274.5`) and
    /// Modified Julian dates (`59274.0`). Bare numbers are disambiguated by
    /// magnitude: MJD values for the survey era are below one million.
    pub fn parse(input: &str) -> Result<Self, String> {
        let s = input.trim();
        if s.is_empty() {
            return Err("empty time string".to_string());
        }

        if let Ok(v) = s.parse::<f64>() {
            if v > 1_000_000.0 {
                return Ok(Self::new(v));
            }
            return Ok(Self::from_mjd(v));
        }

        let datetime_formats = [
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%d %H",
        ];
        for fmt in datetime_formats {
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self::from_datetime(dt.and_utc()));
            }
        }
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_datetime(
                d.and_time(chrono::NaiveTime::MIN).and_utc(),
            ));
        }
        Err(format!("unrecognized time format: `{}`", input))
    }
}

impl From<f64> for JulianDate {
    fn from(v: f64) -> Self {
        JulianDate::new(v)
    }
}

impl std::fmt::Display for JulianDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::JulianDate;

    #[test]
    fn test_parse_iso_date() {
        let jd = JulianDate::parse("2019-11-01").unwrap();
        assert!((jd.value() - 2458788.5).abs() < 1e-6);
    }

    #[test]
    fn test_parse_iso_datetime() {
        let jd = JulianDate::parse("2019-11-01 12:00:00").unwrap();
        assert!((jd.value() - 2458789.0).abs() < 1e-6);
    }

    #[test]
    fn test_parse_jd() {
        let jd = JulianDate::parse("2459274.5").unwrap();
        assert_eq!(jd.value(), 2459274.5);
    }

    #[test]
    fn test_parse_mjd() {
        let jd = JulianDate::parse("59274.0").unwrap();
        assert!((jd.value() - 2459274.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(JulianDate::parse("not a date").is_err());
        assert!(JulianDate::parse("").is_err());
    }

    #[test]
    fn test_survey_start_matches_iso() {
        let a = JulianDate::survey_start();
        let b = JulianDate::parse("2019-11-01 00:00:00").unwrap();
        assert!((a.value() - b.value()).abs() < 1e-9);
    }

    #[test]
    fn test_datetime_roundtrip() {
        let jd = JulianDate::new(2459000.25);
        let back = JulianDate::from_datetime(jd.to_datetime());
        assert!((jd.value() - back.value()).abs() < 1e-8);
    }

    #[test]
    fn test_mjd_roundtrip() {
        let jd = JulianDate::from_mjd(59000.5);
        assert!((jd.to_mjd() - 59000.5).abs() < 1e-9);
    }

    #[test]
    fn test_ordering() {
        assert!(JulianDate::new(2459000.0) < JulianDate::new(2459001.0));
    }
}
