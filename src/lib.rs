#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod analyzer;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod image;
pub mod params;
pub mod types;

// Stage modules – public so tools can run or inspect single stages.
pub mod correlation;
pub mod grid;
pub mod pass;
pub mod replace;
pub mod smooth;
pub mod validate;

// --- High-level re-exports -------------------------------------------------

// Main entry points: analyzer + results.
pub use crate::analyzer::{analyze_image_pair, PivAnalyzer};
pub use crate::error::{ConfigError, PivError, ShapeError};
pub use crate::params::PivParams;
pub use crate::types::PivResult;

// High-level diagnostics returned by the analyzer.
pub use crate::diagnostics::{AnalysisReport, AnalysisTrace};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use piv_engine::prelude::*;
///
/// # fn main() -> Result<(), PivError> {
/// let (w, h) = (256usize, 256usize);
/// let first = ImageF32::new(w, h);
/// let second = ImageF32::new(w, h);
///
/// let analyzer = PivAnalyzer::new(PivParams {
///     vl_thresh: 3.0,
///     ..Default::default()
/// });
///
/// let result = analyzer.analyze(&first, &second, None)?;
/// println!("n={} spurious={}", result.n, result.spurious_n);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::field::{Origin, StatusFlags, VectorField};
    pub use crate::image::{ImageF32, Mask};
    pub use crate::{PivAnalyzer, PivError, PivParams, PivResult};
}

// --- Stage-level API (for tools & advanced users) ---------------------------

pub mod stages {
    // Stage runners.
    pub use crate::analyzer::assemble_result;
    pub use crate::pass::{run_pass, ImagePair, ParallelOptions};
    pub use crate::replace::{replace_invalid, ReplaceOutcome};
    pub use crate::smooth::{gaussian_kernel, smooth_field, SmoothingOptions};
    pub use crate::validate::{median_test, ValidationOptions, ValidationOutcome};

    // Building blocks.
    pub use crate::correlation::{CorrelationOptions, CorrelationPeak, Correlator, PeakOutcome};
    pub use crate::grid::{GridPoint, InterrogationGrid};
    pub use crate::params::{AnalysisPlan, PassParameters};

    // Structured diagnostics types.
    pub use crate::diagnostics::{
        InputDescriptor, PassReport, PostSmoothingReport, StageTiming, TimingBreakdown,
    };
}
