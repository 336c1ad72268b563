//! Domain value types shared across the engine.

pub mod coords;
pub mod rowkey;
pub mod time;

pub use coords::{angular_separation_deg, SkyCoord};
pub use rowkey::{RowKey, KEY_SEPARATOR};
pub use time::JulianDate;
