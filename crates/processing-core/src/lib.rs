//! frameaudit Processing Core
//!
//! The two data-shaping stages of frameaudit:
//! - **Normalization:** reduce arbitrary analyzer output (scalars,
//!   containers, tensors, opaque objects) to a canonical [`MetaValue`] tree
//! - **Comparison:** align per-analyzer time series over a frame range and
//!   compute typed deltas between consecutive frames
//!
//! This crate is pure computation with no I/O. All inputs are data; all
//! outputs are data.
//!
//! [`MetaValue`]: frameaudit_summary_model::MetaValue

pub mod compare;
pub mod normalize;

pub use compare::ComparisonEngine;
pub use normalize::{normalize, OpaqueValue, RawValue, ShapeMismatch, Tensor, TensorData};
