//! Result formatting and wire-format serialization.

pub mod formatter;
pub mod output;
pub mod table;

pub use formatter::{format_rows, merge_photometry, FormatOptions};
pub use output::{decode, encode, OutputFormat};
pub use table::{FormattedTable, Record};
