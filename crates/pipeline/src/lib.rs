//! frameaudit Pipeline
//!
//! Runs analyzers over sampled frames of recorded videos.
//!
//! ```text
//!  dataset root ──▶ BatchDriver ──per video──▶ AnalyzerRegistry (fresh)
//!                        │                          │
//!                        ▼                          ▼
//!                   FrameSource ──frames──▶ FrameProcessingPipeline
//!                                                   │
//!                                                   ▼
//!                         <out>/<subject>/<stem>/<stem>_summary.json
//!                         <out>/all_results.json
//! ```
//!
//! Failures are contained at the narrowest scope: a bad frame skips that
//! index, a failing analyzer call skips that (frame, analyzer) pair, and a
//! video with no analyzers or no readable frames is left out of the
//! manifest while the batch carries on.

pub mod batch;
pub mod pipeline;
pub mod registry;

pub use batch::{BatchDriver, BatchOptions, BatchReport, VideoJob};
pub use pipeline::{sample_indices, FrameProcessingPipeline, PipelineOptions, PipelineOutput};
pub use registry::AnalyzerRegistry;
