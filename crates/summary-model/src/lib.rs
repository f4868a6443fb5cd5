//! frameaudit Summary Model
//!
//! Defines the data contracts exchanged between frameaudit stages:
//! - **Analyzer kinds:** the closed set of analyzer variants
//! - **Metadata values:** the normalized, JSON-safe tree analyzers produce
//! - **Summaries:** per-video, per-analyzer time series of frame records
//! - **Reports:** frame-to-frame deltas over a frame range
//! - **Manifests:** the aggregate index written by a batch run
//!
//! Every artifact is JSON and is written atomically. Non-finite floats are
//! encoded as the strings `"Infinity"`, `"-Infinity"` and `"NaN"`.

pub mod float;
pub mod io;
pub mod kind;
pub mod manifest;
pub mod report;
pub mod summary;
pub mod value;

pub use io::ModelError;
pub use kind::*;
pub use manifest::*;
pub use report::*;
pub use summary::*;
pub use value::*;
