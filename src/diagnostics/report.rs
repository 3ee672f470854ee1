use crate::diagnostics::TimingBreakdown;
use crate::params::PassParameters;
use crate::types::PivResult;
use serde::Serialize;

/// Result produced by [`PivAnalyzer::analyze_with_diagnostics`](crate::PivAnalyzer).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub result: PivResult,
    pub trace: AnalysisTrace,
}

/// Per-stage record of one analysis run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTrace {
    pub input: InputDescriptor,
    pub timings: TimingBreakdown,
    pub passes: Vec<PassReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_smoothing: Option<PostSmoothingReport>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub masked_pixels: usize,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub index: usize,
    pub params: PassParameters,
    pub nx: usize,
    pub ny: usize,
    /// Vectors excluded by the mask.
    pub masked: usize,
    /// Flat patches.
    pub cc_failed: usize,
    /// Missing or out-of-range peaks.
    pub peak_failed: usize,
    pub spurious: usize,
    pub replaced: usize,
    pub smoothed: bool,
    /// Mean displacement of the replaced field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_displacement: Option<[f32; 2]>,
    pub elapsed_ms: f64,
}

/// Re-validation of the smoothed final field.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSmoothingReport {
    pub spurious: usize,
    pub replaced: usize,
    pub elapsed_ms: f64,
}
