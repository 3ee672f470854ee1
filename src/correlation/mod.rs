//! Windowed, normalized cross-correlation of interrogation patches.
//!
//! A [`Correlator`] is built once per pass for a fixed patch size. It owns the
//! FFT plans and window weights and is shared read-only between grid points;
//! per-point buffers live in a [`CorrelationScratch`] so that points can be
//! processed concurrently.
//!
//! The correlation plane is the circular cross-correlation
//! `R(s) = Σ a(x) · b(x + s)` of the mean-removed, windowed patches, divided by
//! `sqrt(Σa² · Σb²)` so that its values lie in `[-1, 1]`. A peak at `s` means
//! the pattern moved by `s` from the first patch to the second.

mod peak;
mod window;

use crate::params::{SubpixelMethod, WindowFunction};
use peak::CorrelationPlane;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::Serialize;
use std::sync::Arc;

/// Standard deviation below which a patch is considered flat.
const FLAT_STD: f32 = 1e-6;
/// Chebyshev radius around the primary peak ignored by the secondary search.
const SECONDARY_EXCLUSION: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CorrelationOptions {
    pub remove_mean: bool,
    /// Largest accepted displacement as a fraction of the patch size.
    pub max_displacement: f32,
    pub subpixel: SubpixelMethod,
}

impl Default for CorrelationOptions {
    fn default() -> Self {
        Self {
            remove_mean: true,
            max_displacement: 0.5,
            subpixel: SubpixelMethod::Gauss3x2p,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakOutcome {
    Found,
    /// One of the patches carries no signal.
    FlatPatch,
    /// No usable peak (non-positive, or beyond the displacement limit).
    PeakFailed,
}

/// Dominant correlation peak of a patch pair.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CorrelationPeak {
    /// Sub-pixel displacement along x (NaN unless `Found`).
    pub du: f32,
    /// Sub-pixel displacement along y (NaN unless `Found`).
    pub dv: f32,
    /// Normalized correlation at the integer peak.
    pub peak: f32,
    /// Peak height over the highest value outside the main lobe.
    pub quality: f32,
    pub outcome: PeakOutcome,
}

impl CorrelationPeak {
    fn failed(outcome: PeakOutcome, peak: f32) -> Self {
        Self {
            du: f32::NAN,
            dv: f32::NAN,
            peak,
            quality: 0.0,
            outcome,
        }
    }

    pub fn is_found(&self) -> bool {
        self.outcome == PeakOutcome::Found
    }
}

/// Per-worker buffers for [`Correlator::correlate`].
pub struct CorrelationScratch {
    first: Vec<Complex<f32>>,
    second: Vec<Complex<f32>>,
    column: Vec<Complex<f32>>,
    plane: Vec<f32>,
}

pub struct Correlator {
    w: usize,
    h: usize,
    window_x: Vec<f32>,
    window_y: Vec<f32>,
    options: CorrelationOptions,
    row_forward: Arc<dyn Fft<f32>>,
    col_forward: Arc<dyn Fft<f32>>,
    row_inverse: Arc<dyn Fft<f32>>,
    col_inverse: Arc<dyn Fft<f32>>,
}

impl Correlator {
    /// Plan correlations of `w × h` patches.
    pub fn new(w: usize, h: usize, window: WindowFunction, options: CorrelationOptions) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            w,
            h,
            window_x: window.weights(w),
            window_y: window.weights(h),
            options,
            row_forward: planner.plan_fft_forward(w),
            col_forward: planner.plan_fft_forward(h),
            row_inverse: planner.plan_fft_inverse(w),
            col_inverse: planner.plan_fft_inverse(h),
        }
    }

    pub fn scratch(&self) -> CorrelationScratch {
        let n = self.w * self.h;
        CorrelationScratch {
            first: vec![Complex::new(0.0, 0.0); n],
            second: vec![Complex::new(0.0, 0.0); n],
            column: vec![Complex::new(0.0, 0.0); self.h],
            plane: vec![0.0; n],
        }
    }

    /// Correlate two row-major `w × h` patches and locate the dominant peak.
    ///
    /// Flat patches and missing peaks are reported through
    /// [`CorrelationPeak::outcome`] with NaN displacement.
    pub fn correlate(
        &self,
        scratch: &mut CorrelationScratch,
        first: &[f32],
        second: &[f32],
    ) -> CorrelationPeak {
        let n = self.w * self.h;
        assert_eq!(first.len(), n, "first patch size mismatch");
        assert_eq!(second.len(), n, "second patch size mismatch");

        let (Some(e1), Some(e2)) = (
            self.load_patch(first, &mut scratch.first),
            self.load_patch(second, &mut scratch.second),
        ) else {
            return CorrelationPeak::failed(PeakOutcome::FlatPatch, 0.0);
        };

        self.fft2(&mut scratch.first, &mut scratch.column, false);
        self.fft2(&mut scratch.second, &mut scratch.column, false);
        for (a, b) in scratch.first.iter_mut().zip(&scratch.second) {
            *a = a.conj() * b;
        }
        self.fft2(&mut scratch.first, &mut scratch.column, true);

        // Inverse FFT is unnormalized; fold the 1/N into the energy norm and
        // move zero displacement to the plane center.
        let norm = 1.0 / (n as f32 * (e1 * e2).sqrt());
        let (hw, hh) = (self.w / 2, self.h / 2);
        for y in 0..self.h {
            let sy = (y + hh) % self.h;
            for x in 0..self.w {
                let sx = (x + hw) % self.w;
                scratch.plane[sy * self.w + sx] = scratch.first[y * self.w + x].re * norm;
            }
        }

        let plane = CorrelationPlane {
            w: self.w,
            h: self.h,
            data: &scratch.plane,
        };
        let Some((px, py)) = plane.argmax() else {
            return CorrelationPeak::failed(PeakOutcome::PeakFailed, 0.0);
        };
        let peak = plane.data[py * self.w + px];
        if peak <= 0.0 {
            return CorrelationPeak::failed(PeakOutcome::PeakFailed, peak);
        }

        let ix = px as f32 - hw as f32;
        let iy = py as f32 - hh as f32;
        let limit_x = self.options.max_displacement * self.w as f32;
        let limit_y = self.options.max_displacement * self.h as f32;
        if ix.abs() > limit_x || iy.abs() > limit_y {
            return CorrelationPeak::failed(PeakOutcome::PeakFailed, peak);
        }

        let (fx, fy) = plane.refine(px, py, self.options.subpixel);
        let secondary = plane
            .secondary_peak(px, py, SECONDARY_EXCLUSION)
            .unwrap_or(0.0)
            .max(f32::EPSILON);

        CorrelationPeak {
            du: ix + fx,
            dv: iy + fy,
            peak,
            quality: peak / secondary,
            outcome: PeakOutcome::Found,
        }
    }

    /// Mean-remove, window and copy a patch into `out`; returns its energy or
    /// `None` for a flat patch.
    fn load_patch(&self, patch: &[f32], out: &mut [Complex<f32>]) -> Option<f32> {
        let n = patch.len() as f32;
        let mean = patch.iter().sum::<f32>() / n;
        let var = patch.iter().map(|&p| (p - mean) * (p - mean)).sum::<f32>() / n;
        if var.sqrt() < FLAT_STD {
            return None;
        }
        let offset = if self.options.remove_mean { mean } else { 0.0 };

        let mut energy = 0.0f32;
        for (y, (src_row, dst_row)) in patch
            .chunks_exact(self.w)
            .zip(out.chunks_exact_mut(self.w))
            .enumerate()
        {
            let wy = self.window_y[y];
            for (x, (&p, dst)) in src_row.iter().zip(dst_row.iter_mut()).enumerate() {
                let v = (p - offset) * self.window_x[x] * wy;
                energy += v * v;
                *dst = Complex::new(v, 0.0);
            }
        }
        (energy > f32::MIN_POSITIVE).then_some(energy)
    }

    /// In-place 2D FFT: all rows in one batch, then column by column.
    fn fft2(&self, buf: &mut [Complex<f32>], column: &mut [Complex<f32>], inverse: bool) {
        let (row_plan, col_plan) = if inverse {
            (&self.row_inverse, &self.col_inverse)
        } else {
            (&self.row_forward, &self.col_forward)
        };
        row_plan.process(buf);
        for x in 0..self.w {
            for (y, c) in column.iter_mut().enumerate() {
                *c = buf[y * self.w + x];
            }
            col_plan.process(column);
            for (y, c) in column.iter().enumerate() {
                buf[y * self.w + x] = *c;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Particle pattern on a low-discrepancy (R2) sequence, displaced by `shift`.
    fn particle_patch(w: usize, h: usize, shift: (f32, f32)) -> Vec<f32> {
        let (a1, a2) = (0.754_877_7f32, 0.569_840_3f32);
        let count = w * h / 12;
        let mut data = vec![0.0; w * h];
        for k in 0..count {
            let px = ((0.5 + a1 * k as f32) % 1.0) * (w as f32 + 8.0) - 4.0 + shift.0;
            let py = ((0.5 + a2 * k as f32) % 1.0) * (h as f32 + 8.0) - 4.0 + shift.1;
            for y in 0..h {
                for x in 0..w {
                    let dx = x as f32 - px;
                    let dy = y as f32 - py;
                    data[y * w + x] += (-(dx * dx + dy * dy) / 2.0).exp();
                }
            }
        }
        data
    }

    #[test]
    fn recovers_subpixel_translation() {
        let first = particle_patch(32, 32, (0.0, 0.0));
        let second = particle_patch(32, 32, (2.3, -1.6));
        let correlator = Correlator::new(32, 32, WindowFunction::Uniform, Default::default());
        let mut scratch = correlator.scratch();
        let peak = correlator.correlate(&mut scratch, &first, &second);
        assert!(peak.is_found());
        assert!((peak.du - 2.3).abs() < 0.1, "du={}", peak.du);
        assert!((peak.dv + 1.6).abs() < 0.1, "dv={}", peak.dv);
        assert!(peak.peak > 0.5 && peak.peak <= 1.0 + 1e-4);
        assert!(peak.quality > 1.0);
    }

    #[test]
    fn identical_patches_peak_at_zero_with_unit_height() {
        let patch = particle_patch(16, 24, (0.0, 0.0));
        let correlator = Correlator::new(16, 24, WindowFunction::Welch, Default::default());
        let mut scratch = correlator.scratch();
        let peak = correlator.correlate(&mut scratch, &patch, &patch);
        assert!(peak.du.abs() < 1e-3 && peak.dv.abs() < 1e-3);
        assert!((peak.peak - 1.0).abs() < 1e-3);
    }

    #[test]
    fn flat_patch_is_not_an_error() {
        let flat = vec![0.25f32; 16 * 16];
        let textured = particle_patch(16, 16, (0.0, 0.0));
        let correlator = Correlator::new(16, 16, WindowFunction::Uniform, Default::default());
        let mut scratch = correlator.scratch();
        let peak = correlator.correlate(&mut scratch, &flat, &textured);
        assert_eq!(peak.outcome, PeakOutcome::FlatPatch);
        assert!(peak.du.is_nan() && peak.dv.is_nan());
        assert_eq!(peak.quality, 0.0);
    }

    #[test]
    fn displacement_limit_rejects_far_peaks() {
        let first = particle_patch(32, 32, (0.0, 0.0));
        let second = particle_patch(32, 32, (6.0, 0.0));
        let options = CorrelationOptions {
            max_displacement: 0.1,
            ..Default::default()
        };
        let correlator = Correlator::new(32, 32, WindowFunction::Uniform, options);
        let mut scratch = correlator.scratch();
        let peak = correlator.correlate(&mut scratch, &first, &second);
        assert_eq!(peak.outcome, PeakOutcome::PeakFailed);
        assert!(peak.du.is_nan());
    }
}
