//! Diagnostics data model exposed by the analyzer and the demo binary.
//!
//! `AnalysisReport` is the entry point returned by
//! [`PivAnalyzer::analyze_with_diagnostics`](crate::PivAnalyzer), bundling the
//! final [`PivResult`](crate::PivResult) with a per-pass trace and timings.

pub mod report;
pub mod timing;

pub use report::{AnalysisReport, AnalysisTrace, InputDescriptor, PassReport, PostSmoothingReport};
pub use timing::{StageTiming, TimingBreakdown};
