//! frameaudit Analyzers
//!
//! One [`Analyzer`] per supported check. Every analyzer takes its own copy
//! of a frame, may draw on it, and returns it together with a metadata
//! value:
//!
//! | analyzer   | metadata                                  |
//! |------------|-------------------------------------------|
//! | `gaze`     | `gaze_away: bool`, `gaze_angle: f64`      |
//! | `headpose` | `yaw`, `pitch`, `roll: f64` (degrees)     |
//! | `identity` | `is_match: bool`, `distance: f64`         |
//! | `persons`  | `person_count: u64`                       |
//! | `phone`    | `phone_count: u64`                        |
//!
//! The vision models live outside this crate behind the detector traits
//! in [`backend`]. The shipped backend runs an external program per frame
//! (see [`backend::CommandBackend`]).

pub mod analyzer;
pub mod backend;
mod draw;
pub mod error;
pub mod factory;
pub mod gaze;
pub mod headpose;
pub mod identity;
pub mod persons;
pub mod phone;

pub use analyzer::{Analyzer, AnalyzerOutput};
pub use error::AnalyzerError;
pub use factory::{AnalyzerFactory, CommandAnalyzerFactory};
pub use gaze::GazeAnalyzer;
pub use headpose::HeadPoseAnalyzer;
pub use identity::{Enrollment, IdentityAnalyzer};
pub use persons::PersonsAnalyzer;
pub use phone::PhoneAnalyzer;
