//! Composite row keys for the index tables.
//!
//! All composite keys join their components with a single `_` separator,
//! ordered so that a lexicographic scan over the physical table matches the
//! intended access pattern (`{pixel}_{jd}`, `{class}_{jd}`,
//! `{pipeline}_{date}_{eid}_{row}`). Construction and parsing live here so
//! the separator contract is covered by round-trip tests in one place.

/// Separator between row key components.
pub const KEY_SEPARATOR: char = '_';

/// A composite row key with typed construction helpers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    components: Vec<String>,
}

impl RowKey {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// Spatial index key, `{pixel}_{jd}`.
    pub fn pixel_time(pixel: u64, jd: f64) -> Self {
        Self::new([pixel.to_string(), format_jd(jd)])
    }

    /// Prefix `{pixel}_` covering a whole pixel partition.
    pub fn pixel_prefix(pixel: u64) -> Self {
        Self::new([pixel.to_string(), String::new()])
    }

    /// Classification index key, `{class}_{jd}`. Class labels may contain
    /// spaces; they are preserved verbatim.
    pub fn class_time(class: &str, jd: f64) -> Self {
        Self::new([class.to_string(), format_jd(jd)])
    }

    /// Time index key, `{jd}`.
    pub fn time(jd: f64) -> Self {
        Self::new([format_jd(jd)])
    }

    /// Solar-System-object index prefix, `{designation}_`. The trailing
    /// separator prevents designation `91` from matching `915`.
    pub fn sso_prefix(designation: &str) -> Self {
        Self::new([designation.replace(' ', ""), String::new()])
    }

    /// Ingestion stream key, `{pipeline}_{date}_{eid}_{row}`.
    pub fn ingest(pipeline: &str, date: &str, eid: &str, row: usize) -> Self {
        Self::new([
            pipeline.to_lowercase(),
            date.to_string(),
            eid.to_string(),
            row.to_string(),
        ])
    }

    /// Lower-cased copy, for the case-insensitive resolver tables.
    pub fn to_lowercase(&self) -> Self {
        Self {
            components: self.components.iter().map(|c| c.to_lowercase()).collect(),
        }
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Split a stored key back into components.
    pub fn parse(key: &str) -> Self {
        Self::new(key.split(KEY_SEPARATOR))
    }

    /// Last component of a stored key (e.g. the object id of a `{jd}_{oid}`
    /// time-index row).
    pub fn last_component(key: &str) -> &str {
        key.rsplit(KEY_SEPARATOR).next().unwrap_or(key)
    }

    /// Render to the stored string form.
    pub fn encode(&self) -> String {
        self.components.join(&KEY_SEPARATOR.to_string())
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Render a JD for use inside a row key.
///
/// Survey-era JD values all have seven integer digits, so the plain decimal
/// rendering sorts lexicographically in time order within any one partition.
fn format_jd(jd: f64) -> String {
    format!("{}", jd)
}

#[cfg(test)]
mod tests {
    use super::RowKey;

    #[test]
    fn test_pixel_time_encoding() {
        let key = RowKey::pixel_time(1234, 2459000.5);
        assert_eq!(key.encode(), "1234_2459000.5");
    }

    #[test]
    fn test_pixel_prefix_trailing_separator() {
        assert_eq!(RowKey::pixel_prefix(42).encode(), "42_");
    }

    #[test]
    fn test_sso_prefix_strips_spaces() {
        assert_eq!(RowKey::sso_prefix("2010 JO69").encode(), "2010JO69_");
    }

    #[test]
    fn test_class_time_preserves_spaces() {
        let key = RowKey::class_time("SN candidate", 2459000.5);
        assert_eq!(key.encode(), "SN candidate_2459000.5");
    }

    #[test]
    fn test_roundtrip() {
        let key = RowKey::ingest("nir", "20240101", "E123", 7);
        let parsed = RowKey::parse(&key.encode());
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_last_component() {
        assert_eq!(RowKey::last_component("2459000.5_OBJ1"), "OBJ1");
        assert_eq!(RowKey::last_component("plainkey"), "plainkey");
    }

    #[test]
    fn test_lowercase() {
        let key = RowKey::new(["SN2021abc", "Internal"]).to_lowercase();
        assert_eq!(key.encode(), "sn2021abc_internal");
    }

    #[test]
    fn test_time_order_is_lexicographic_within_partition() {
        let early = RowKey::pixel_time(7, 2458800.25).encode();
        let late = RowKey::pixel_time(7, 2459900.75).encode();
        assert!(early < late);
    }
}
