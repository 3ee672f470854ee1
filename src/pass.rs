//! One interrogation pass: patch extraction, correlation and raw field
//! assembly.
//!
//! Patches are formed according to the pass's [`InterrogationMethod`]:
//!
//! - `basic`: co-located areas in both images.
//! - `offset`: areas moved symmetrically by the integer-rounded predictor.
//! - `deformed-spline`: every pixel resampled (Catmull–Rom) half a predictor
//!   step backwards in the first image and forwards in the second.
//!
//! Each grid point writes only its own slot, so the sequential and Rayon
//! paths produce identical fields.
use crate::correlation::{CorrelationOptions, CorrelationScratch, Correlator, PeakOutcome};
use crate::error::ShapeError;
use crate::field::{FieldSampler, StatusFlags, VectorField, VectorStatus};
use crate::grid::{GridPoint, InterrogationGrid};
use crate::image::{sample_cubic, ImageF32, Mask};
use crate::params::{InterrogationMethod, PassParameters};

/// Two recordings of the same scene plus an optional exclusion mask.
#[derive(Clone, Copy, Debug)]
pub struct ImagePair<'a> {
    pub first: &'a ImageF32,
    pub second: &'a ImageF32,
    pub mask: Option<&'a Mask>,
}

impl<'a> ImagePair<'a> {
    pub fn new(
        first: &'a ImageF32,
        second: &'a ImageF32,
        mask: Option<&'a Mask>,
    ) -> Result<Self, ShapeError> {
        if (first.w, first.h) != (second.w, second.h) {
            return Err(ShapeError::ImagePair {
                first_w: first.w,
                first_h: first.h,
                second_w: second.w,
                second_h: second.h,
            });
        }
        if let Some(mask) = mask {
            if (mask.w, mask.h) != (first.w, first.h) {
                return Err(ShapeError::Mask {
                    mask_w: mask.w,
                    mask_h: mask.h,
                    image_w: first.w,
                    image_h: first.h,
                });
            }
        }
        Ok(Self {
            first,
            second,
            mask,
        })
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.first.w, self.first.h)
    }

    #[inline]
    fn is_masked(&self, x: isize, y: isize) -> bool {
        self.mask.is_some_and(|mask| {
            let xi = x.clamp(0, mask.w as isize - 1) as usize;
            let yi = y.clamp(0, mask.h as isize - 1) as usize;
            mask.get(xi, yi)
        })
    }
}

/// Controls whether grid points are correlated sequentially or with Rayon.
#[derive(Clone, Copy, Debug)]
pub struct ParallelOptions {
    enabled: bool,
    min_points_for_parallel: usize,
}

impl ParallelOptions {
    pub fn new(enabled: bool, min_points_for_parallel: usize) -> Self {
        Self {
            enabled,
            min_points_for_parallel: min_points_for_parallel.max(1),
        }
    }

    /// Always run sequentially.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            min_points_for_parallel: usize::MAX,
        }
    }

    /// Returns true when a grid of `point_count` points should run in parallel.
    pub fn should_parallelize(&self, point_count: usize) -> bool {
        self.enabled && point_count >= self.min_points_for_parallel
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points_for_parallel = min_points.max(1);
        self
    }
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            enabled: cfg!(feature = "parallel"),
            min_points_for_parallel: 64,
        }
    }
}

/// Measure the displacement at every point of `grid`.
///
/// `predictor` is the previous pass's (validated, replaced) field; it is
/// ignored by `basic` and treated as zero when absent.
pub fn run_pass(
    pair: &ImagePair<'_>,
    grid: &InterrogationGrid,
    pass: &PassParameters,
    correlation: &CorrelationOptions,
    predictor: Option<&VectorField>,
    parallel: ParallelOptions,
) -> VectorField {
    let ctx = PassContext {
        pair,
        method: pass.method,
        area: (pass.area_x, pass.area_y),
        correlator: Correlator::new(pass.area_x, pass.area_y, pass.window, *correlation),
        predictor: match pass.method {
            InterrogationMethod::Basic => None,
            _ => predictor.map(VectorField::sampler),
        },
    };

    let measurements = measure_grid(&ctx, grid, parallel);
    let mut field = VectorField::from_grid(grid);
    for (i, m) in measurements.into_iter().enumerate() {
        field.u[i] = m.u;
        field.v[i] = m.v;
        field.status[i] = m.status;
        field.peak[i] = m.peak;
        field.quality[i] = m.quality;
    }
    field
}

fn measure_grid(
    ctx: &PassContext<'_, '_>,
    grid: &InterrogationGrid,
    parallel: ParallelOptions,
) -> Vec<Measurement> {
    if parallel.should_parallelize(grid.len()) {
        #[cfg(feature = "parallel")]
        {
            return measure_parallel(ctx, grid);
        }
    }
    measure_sequential(ctx, grid)
}

fn measure_sequential(ctx: &PassContext<'_, '_>, grid: &InterrogationGrid) -> Vec<Measurement> {
    let mut scratch = ctx.scratch();
    grid.iter().map(|p| ctx.measure(&mut scratch, p)).collect()
}

#[cfg(feature = "parallel")]
fn measure_parallel(ctx: &PassContext<'_, '_>, grid: &InterrogationGrid) -> Vec<Measurement> {
    use rayon::prelude::*;

    grid.points
        .par_iter()
        .map_init(|| ctx.scratch(), |scratch, p| ctx.measure(scratch, p))
        .collect()
}

struct Measurement {
    u: f32,
    v: f32,
    status: VectorStatus,
    peak: f32,
    quality: f32,
}

impl Measurement {
    fn failed(flags: StatusFlags, peak: f32) -> Self {
        Self {
            u: f32::NAN,
            v: f32::NAN,
            status: VectorStatus::masked(flags),
            peak,
            quality: 0.0,
        }
    }
}

struct PassScratch {
    correlation: CorrelationScratch,
    first: Vec<f32>,
    second: Vec<f32>,
    first_masked: Vec<bool>,
    second_masked: Vec<bool>,
}

struct PassContext<'p, 'f> {
    pair: &'p ImagePair<'p>,
    method: InterrogationMethod,
    area: (usize, usize),
    correlator: Correlator,
    predictor: Option<FieldSampler<'f>>,
}

impl PassContext<'_, '_> {
    fn scratch(&self) -> PassScratch {
        let n = self.area.0 * self.area.1;
        PassScratch {
            correlation: self.correlator.scratch(),
            first: vec![0.0; n],
            second: vec![0.0; n],
            first_masked: vec![false; n],
            second_masked: vec![false; n],
        }
    }

    fn predict(&self, x: f32, y: f32) -> (f32, f32) {
        self.predictor
            .as_ref()
            .map_or((0.0, 0.0), |sampler| sampler.sample(x, y))
    }

    fn measure(&self, scratch: &mut PassScratch, point: &GridPoint) -> Measurement {
        if self.pair.is_masked(point.col as isize, point.row as isize) {
            return Measurement::failed(StatusFlags::MASKED, 0.0);
        }

        let (base_u, base_v) = self.extract(scratch, point);
        if self.pair.mask.is_some() {
            fill_masked(&mut scratch.first, &scratch.first_masked);
            fill_masked(&mut scratch.second, &scratch.second_masked);
        }

        let peak = self.correlator.correlate(
            &mut scratch.correlation,
            &scratch.first,
            &scratch.second,
        );
        match peak.outcome {
            PeakOutcome::Found => Measurement {
                u: base_u + peak.du,
                v: base_v + peak.dv,
                status: VectorStatus::measured(),
                peak: peak.peak,
                quality: peak.quality,
            },
            PeakOutcome::FlatPatch => Measurement::failed(StatusFlags::CC_FAILED, peak.peak),
            PeakOutcome::PeakFailed => Measurement::failed(StatusFlags::PEAK_FAILED, peak.peak),
        }
    }

    /// Fill both patches for `point`; returns the displacement already
    /// accounted for by the patch placement.
    fn extract(&self, scratch: &mut PassScratch, point: &GridPoint) -> (f32, f32) {
        let (w, h) = self.area;
        let (left, top) = (point.left as isize, point.top as isize);
        let pair = self.pair;
        match self.method {
            InterrogationMethod::Basic | InterrogationMethod::Offset => {
                let (ou, ov) = match self.method {
                    InterrogationMethod::Offset => {
                        let (pu, pv) = self.predict(point.x, point.y);
                        (round_finite(pu), round_finite(pv))
                    }
                    _ => (0, 0),
                };
                let (hu, hv) = (ou / 2, ov / 2);
                let (x1, y1) = (left - hu, top - hv);
                let (x2, y2) = (left + ou - hu, top + ov - hv);
                for j in 0..h {
                    for i in 0..w {
                        let k = j * w + i;
                        let (i, j) = (i as isize, j as isize);
                        scratch.first[k] = pair.first.get_clamped(x1 + i, y1 + j);
                        scratch.second[k] = pair.second.get_clamped(x2 + i, y2 + j);
                        scratch.first_masked[k] = pair.is_masked(x1 + i, y1 + j);
                        scratch.second_masked[k] = pair.is_masked(x2 + i, y2 + j);
                    }
                }
                (ou as f32, ov as f32)
            }
            InterrogationMethod::DeformedSpline => {
                if self.predictor.is_none() {
                    // Without a predictor the deformation is the identity.
                    for j in 0..h {
                        for i in 0..w {
                            let k = j * w + i;
                            let (x, y) = (left + i as isize, top + j as isize);
                            scratch.first[k] = pair.first.get_clamped(x, y);
                            scratch.second[k] = pair.second.get_clamped(x, y);
                            scratch.first_masked[k] = pair.is_masked(x, y);
                            scratch.second_masked[k] = scratch.first_masked[k];
                        }
                    }
                    return (0.0, 0.0);
                }
                for j in 0..h {
                    let y = (top + j as isize) as f32;
                    for i in 0..w {
                        let k = j * w + i;
                        let x = (left + i as isize) as f32;
                        let (pu, pv) = self.predict(x, y);
                        let (x1, y1) = (x - 0.5 * pu, y - 0.5 * pv);
                        let (x2, y2) = (x + 0.5 * pu, y + 0.5 * pv);
                        scratch.first[k] = sample_cubic(pair.first, x1, y1);
                        scratch.second[k] = sample_cubic(pair.second, x2, y2);
                        scratch.first_masked[k] =
                            pair.is_masked(x1.round() as isize, y1.round() as isize);
                        scratch.second_masked[k] =
                            pair.is_masked(x2.round() as isize, y2.round() as isize);
                    }
                }
                self.predict(point.x, point.y)
            }
        }
    }
}

#[inline]
fn round_finite(v: f32) -> isize {
    if v.is_finite() {
        v.round() as isize
    } else {
        0
    }
}

/// Replace masked samples by the mean of the unmasked ones; a fully masked
/// patch becomes flat.
fn fill_masked(patch: &mut [f32], masked: &[bool]) {
    let (mut sum, mut count) = (0.0f32, 0usize);
    for (&p, &m) in patch.iter().zip(masked) {
        if !m {
            sum += p;
            count += 1;
        }
    }
    if count == patch.len() {
        return;
    }
    let fill = if count > 0 { sum / count as f32 } else { 0.0 };
    for (p, &m) in patch.iter_mut().zip(masked) {
        if m {
            *p = fill;
        }
    }
}
