//! Registry of the denormalized index tables.
//!
//! Each logical index is a physical table with its own row-key ordering,
//! optimized for exactly one access pattern. Query code never hard-codes a
//! table name; it goes through this registry.

/// The logical indices of the alert dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    /// Main table, keyed by object id; full alert payload including cutouts.
    Objects,
    /// Spatial index, keyed by `{healpix}_{jd}`.
    Pixel,
    /// Time index, keyed by `{jd}_{objectId}`.
    Time,
    /// Classification index, keyed by `{class}_{jd}`.
    Class,
    /// Externally-classified index, keyed by `{tns-class}_{jd}`.
    TnsClass,
    /// Solar-System designations, keyed by `{designation}_{jd}`.
    SsoName,
    /// Tracklets, keyed by `{tracklet-id}_{candid}`.
    Tracklet,
    /// Upper-limit measurements, keyed by object id.
    Upper,
    /// Below-quality-threshold measurements, keyed by object id.
    UpperValid,
    /// Anomalous alerts, keyed by `{jd}_{objectId}`.
    Anomaly,
    /// External transient-name resolver, lower-cased `{name}_{internal}` keys.
    TnsResolver,
    /// Solar-System designation resolver, lower-cased `{name}-{n}` keys.
    SsoResolver,
    /// Nightly statistics, keyed by `{prefix}_{date}`.
    Statistics,
    /// Free-form per-object annotations.
    Metadata,
    /// External-survey ingestion stream (production).
    Ingest,
    /// External-survey ingestion stream (sandbox).
    IngestSandbox,
}

impl Index {
    /// Physical table name.
    pub fn table_name(&self) -> &'static str {
        match self {
            Index::Objects => "alerts",
            Index::Pixel => "alerts.pixel",
            Index::Time => "alerts.time",
            Index::Class => "alerts.class",
            Index::TnsClass => "alerts.tnsclass",
            Index::SsoName => "alerts.ssoname",
            Index::Tracklet => "alerts.tracklet",
            Index::Upper => "alerts.upper",
            Index::UpperValid => "alerts.uppervalid",
            Index::Anomaly => "alerts.anomaly",
            Index::TnsResolver => "resolver.tns",
            Index::SsoResolver => "resolver.sso",
            Index::Statistics => "statistics",
            Index::Metadata => "alerts.metadata",
            Index::Ingest => "ingest.main",
            Index::IngestSandbox => "ingest.sandbox",
        }
    }

    /// Whether keys of this index are stored lower-cased for
    /// case-insensitive lookup.
    pub fn case_insensitive(&self) -> bool {
        matches!(self, Index::TnsResolver | Index::SsoResolver)
    }

    /// All indices, for store provisioning.
    pub fn all() -> &'static [Index] {
        &[
            Index::Objects,
            Index::Pixel,
            Index::Time,
            Index::Class,
            Index::TnsClass,
            Index::SsoName,
            Index::Tracklet,
            Index::Upper,
            Index::UpperValid,
            Index::Anomaly,
            Index::TnsResolver,
            Index::SsoResolver,
            Index::Statistics,
            Index::Metadata,
            Index::Ingest,
            Index::IngestSandbox,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::Index;

    #[test]
    fn test_table_names_are_unique() {
        let mut names: Vec<&str> = Index::all().iter().map(|i| i.table_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Index::all().len());
    }

    #[test]
    fn test_resolver_tables_are_case_insensitive() {
        assert!(Index::TnsResolver.case_insensitive());
        assert!(Index::SsoResolver.case_insensitive());
        assert!(!Index::Objects.case_insensitive());
    }
}
