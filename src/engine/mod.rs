//! Query execution engines, one module per query family.
//!
//! Engines consume validated queries, issue bounded scans through the store
//! gateway and hand decoded rows to the formatter. No engine keeps state
//! between requests.

pub mod cone;
pub mod healpix;
pub mod ingest;
pub mod metadata;
pub mod objects;
pub mod random;
pub mod resolver;
pub mod skymap;
pub mod sso;
pub mod stats;
pub mod timeline;
pub mod xmatch;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::error::PortalResult;
use crate::format::{format_rows, FormatOptions, FormattedTable};
use crate::store::{Index, RawRow, StoreGateway};

/// Live external services the resolver and skymap engines talk to. No
/// retries anywhere; failures surface as upstream errors.
#[derive(Debug, Clone)]
pub struct ExternalServices {
    pub client: reqwest::Client,
    /// Base URL of the Sesame name resolution service.
    pub sesame_url: String,
    /// Base URL of the gravitational-wave event archive.
    pub gracedb_url: String,
}

impl Default for ExternalServices {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            sesame_url: "https://cds.unistra.fr/cgi-bin/nph-sesame".to_string(),
            gracedb_url: "https://gracedb.ligo.org".to_string(),
        }
    }
}

/// Fetch the table schema and run the formatting pass over scanned rows.
pub(crate) async fn format_scan(
    store: &dyn StoreGateway,
    index: Index,
    rows: &[RawRow],
    opts: &FormatOptions,
) -> PortalResult<FormattedTable> {
    let schema = store.schema(index.table_name()).await?;
    Ok(format_rows(rows, &schema, opts))
}
