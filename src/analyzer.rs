//! Multi-pass analysis controller.
//!
//! The [`PivAnalyzer`] runs the configured passes coarse to fine. Each pass
//! measures a raw field on its own grid, flags outliers with the median test,
//! repairs invalid vectors and hands the result to the next pass as the
//! predictor. After the last pass the field is smoothed and, optionally,
//! validated and repaired once more.
//!
//! ```no_run
//! use piv_engine::image::ImageF32;
//! use piv_engine::{PivAnalyzer, PivParams};
//!
//! # fn example(first: ImageF32, second: ImageF32) -> Result<(), piv_engine::PivError> {
//! let analyzer = PivAnalyzer::new(PivParams::default());
//! let report = analyzer.analyze_with_diagnostics(&first, &second, None)?;
//! for pass in &report.trace.passes {
//!     println!("pass {}: {} spurious", pass.index, pass.spurious);
//! }
//! # Ok(())
//! # }
//! ```
use crate::diagnostics::{
    AnalysisReport, AnalysisTrace, InputDescriptor, PassReport, PostSmoothingReport,
    TimingBreakdown,
};
use crate::error::{ConfigError, PivError};
use crate::field::{Origin, StatusFlags, VectorField};
use crate::grid::InterrogationGrid;
use crate::image::{ImageF32, Mask};
use crate::params::{AnalysisPlan, PivParams};
use crate::pass::{run_pass, ImagePair, ParallelOptions};
use crate::replace::replace_invalid;
use crate::smooth::smooth_field;
use crate::types::PivResult;
use crate::validate::median_test;
use log::debug;
use std::time::Instant;

pub struct PivAnalyzer {
    params: PivParams,
    parallel: ParallelOptions,
}

impl PivAnalyzer {
    pub fn new(params: PivParams) -> Self {
        Self {
            params,
            parallel: ParallelOptions::default(),
        }
    }

    /// Override how grid points are distributed across threads.
    pub fn with_parallel(mut self, parallel: ParallelOptions) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn params(&self) -> &PivParams {
        &self.params
    }

    /// Analyze an image pair and return the final field.
    pub fn analyze(
        &self,
        first: &ImageF32,
        second: &ImageF32,
        mask: Option<&Mask>,
    ) -> Result<PivResult, PivError> {
        Ok(self.analyze_with_diagnostics(first, second, mask)?.result)
    }

    /// Analyze an image pair and keep a per-pass trace.
    pub fn analyze_with_diagnostics(
        &self,
        first: &ImageF32,
        second: &ImageF32,
        mask: Option<&Mask>,
    ) -> Result<AnalysisReport, PivError> {
        let total_start = Instant::now();
        let plan = self.params.validate()?;
        let pair = ImagePair::new(first, second, mask)?;
        // Build every grid up front so geometry problems surface before the
        // first correlation.
        let grids = plan
            .passes
            .iter()
            .map(|p| {
                InterrogationGrid::build(pair.dims(), (p.area_x, p.area_y), (p.step_x, p.step_y))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut timings = TimingBreakdown::default();
        let mut passes = Vec::with_capacity(plan.passes.len());
        let mut predictor: Option<VectorField> = None;
        let last = plan.passes.len() - 1;

        for (index, (pass, grid)) in plan.passes.iter().zip(&grids).enumerate() {
            let pass_start = Instant::now();
            let raw = run_pass(
                &pair,
                grid,
                pass,
                &plan.correlation,
                predictor.as_ref(),
                self.parallel,
            );
            let validated = median_test(&raw, &plan.validation);
            let replaced = replace_invalid(&validated.field, plan.replacement);
            let smooth_now = index != last && plan.smooth_each_pass && plan.smoothing.is_enabled();
            let field = if smooth_now {
                smooth_field(&replaced.field, &plan.smoothing)
            } else {
                replaced.field
            };

            let elapsed_ms = pass_start.elapsed().as_secs_f64() * 1000.0;
            let report = PassReport {
                index,
                params: *pass,
                nx: grid.nx,
                ny: grid.ny,
                masked: raw.count_flag(StatusFlags::MASKED),
                cc_failed: raw.count_flag(StatusFlags::CC_FAILED),
                peak_failed: raw.count_flag(StatusFlags::PEAK_FAILED),
                spurious: validated.spurious,
                replaced: replaced.replaced,
                smoothed: smooth_now,
                mean_displacement: field.mean_displacement().map(|(u, v)| [u, v]),
                elapsed_ms,
            };
            debug!(
                "PivAnalyzer::analyze pass {} area={}x{} grid={}x{} masked={} failed={} spurious={} replaced={} elapsed_ms={:.3}",
                index,
                pass.area_x,
                pass.area_y,
                grid.nx,
                grid.ny,
                report.masked,
                report.cc_failed + report.peak_failed,
                report.spurious,
                report.replaced,
                elapsed_ms
            );
            timings.push(format!("pass{index}"), elapsed_ms);
            passes.push(report);
            predictor = Some(field);
        }

        let Some(mut field) = predictor else {
            return Err(ConfigError::NoPasses.into());
        };
        let post_smoothing = self.finish_field(&plan, &mut field, &mut timings);

        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        let result = assemble_result(field, self.params.clone());
        debug!(
            "PivAnalyzer::analyze done n={} masked={} spurious={} total_ms={:.3}",
            result.n, result.masked_n, result.spurious_n, timings.total_ms
        );

        Ok(AnalysisReport {
            result,
            trace: AnalysisTrace {
                input: InputDescriptor {
                    width: first.w,
                    height: first.h,
                    masked_pixels: mask.map_or(0, Mask::count),
                },
                timings,
                passes,
                post_smoothing,
            },
        })
    }

    /// Final smoothing and optional re-validation of the last pass's field.
    fn finish_field(
        &self,
        plan: &AnalysisPlan,
        field: &mut VectorField,
        timings: &mut TimingBreakdown,
    ) -> Option<PostSmoothingReport> {
        if !plan.smoothing.is_enabled() {
            return None;
        }
        let smooth_start = Instant::now();
        *field = smooth_field(field, &plan.smoothing);
        timings.push("smooth", smooth_start.elapsed().as_secs_f64() * 1000.0);

        if !plan.revalidate_after_smoothing {
            return None;
        }
        let start = Instant::now();
        let validated = median_test(field, &plan.validation);
        let replaced = replace_invalid(&validated.field, plan.replacement);
        *field = replaced.field;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        timings.push("revalidate", elapsed_ms);
        debug!(
            "PivAnalyzer::analyze post-smoothing spurious={} replaced={}",
            validated.spurious, replaced.replaced
        );
        Some(PostSmoothingReport {
            spurious: validated.spurious,
            replaced: replaced.replaced,
            elapsed_ms,
        })
    }
}

/// Analyze an image pair with the given parameters.
///
/// Convenience wrapper around [`PivAnalyzer::analyze`] with default
/// parallelism.
pub fn analyze_image_pair(
    first: &ImageF32,
    second: &ImageF32,
    mask: Option<&Mask>,
    params: PivParams,
) -> Result<PivResult, PivError> {
    PivAnalyzer::new(params).analyze(first, second, mask)
}

/// Package the final field with its summary counts.
pub fn assemble_result(field: VectorField, params: PivParams) -> PivResult {
    let n = field.len();
    let masked_n = field.count_origin(Origin::Masked);
    let spurious_n = field.count_flag(StatusFlags::SPURIOUS);
    debug_assert_eq!(
        masked_n + field.count_origin(Origin::Measured) + field.count_origin(Origin::Replaced),
        n
    );
    PivResult {
        field,
        n,
        masked_n,
        spurious_n,
        params,
    }
}
