//! # Alert Portal Backend
//!
//! Query engine and REST API over a sparse, range-scannable wide-column
//! store of astronomical transient alerts.
//!
//! The engine maps semantically different query shapes (object lookup, cone
//! search, time-range search, class search, Solar-System-object search, name
//! resolution, catalog crossmatch, gravitational-wave skymap crossmatch) onto
//! a store that only supports efficient scans over a single sorted row key
//! per physical table. Several denormalized index tables simulate secondary
//! indices; results are merged, deduplicated and serialized into multiple
//! wire formats.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                              │
//! │  - Parameter parsing, wire-format selection              │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Query Router & Validator (query/)                       │
//! │  - Typed query variants, bounds, mutex groups            │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Engine (engine/) + Result Formatter (format/)           │
//! │  - Index selection, scans, merge/dedup, derived columns  │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Store Gateway (store/)                                  │
//! │  - scan / get / put / schema over the wide-column store  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The cutout pipeline (`cutout/`) is a side path invoked when binary image
//! data is requested.

pub mod cutout;
pub mod engine;
pub mod error;
pub mod format;
pub mod http;
pub mod models;
pub mod query;
pub mod store;

pub use error::{PortalError, PortalResult};
