//! Gaussian smoothing of displacement fields.
use crate::field::{Origin, StatusFlags, VectorField};
use crate::params::SmoothMethod;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SmoothingOptions {
    pub method: SmoothMethod,
    /// Kernel width in grid cells.
    pub sigma: f32,
}

impl Default for SmoothingOptions {
    fn default() -> Self {
        Self {
            method: SmoothMethod::Gaussian,
            sigma: 1.0,
        }
    }
}

impl SmoothingOptions {
    pub fn is_enabled(&self) -> bool {
        self.method != SmoothMethod::None
    }
}

/// 1D Gaussian taps for offsets `-r..=r`, `r = ceil(3σ)`. Unnormalized; the
/// smoother normalizes over contributing vectors.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).ceil().max(0.0) as isize;
    (-radius..=radius)
        .map(|d| (-0.5 * (d as f32 / sigma).powi(2)).exp())
        .collect()
}

/// Smooth `u` and `v`; masked vectors neither contribute nor change.
///
/// Returns the input unchanged when smoothing is disabled.
pub fn smooth_field(field: &VectorField, options: &SmoothingOptions) -> VectorField {
    let mut out = field.clone();
    if !options.is_enabled() || field.is_empty() {
        return out;
    }
    let kernel = gaussian_kernel(options.sigma);
    let radius = (kernel.len() / 2) as isize;
    let contributes = |i: usize| field.status[i].origin != Origin::Masked && !field.u[i].is_nan();

    for iy in 0..field.ny {
        for ix in 0..field.nx {
            let i = field.index(ix, iy);
            if field.status[i].origin == Origin::Masked {
                continue;
            }
            let (mut su, mut sv, mut sw) = (0.0f32, 0.0f32, 0.0f32);
            for (ky, &wy) in kernel.iter().enumerate() {
                let jy = iy as isize + ky as isize - radius;
                if jy < 0 || jy >= field.ny as isize {
                    continue;
                }
                for (kx, &wx) in kernel.iter().enumerate() {
                    let jx = ix as isize + kx as isize - radius;
                    if jx < 0 || jx >= field.nx as isize {
                        continue;
                    }
                    let j = field.index(jx as usize, jy as usize);
                    if !contributes(j) {
                        continue;
                    }
                    let w = wx * wy;
                    su += w * field.u[j];
                    sv += w * field.v[j];
                    sw += w;
                }
            }
            if sw > 0.0 {
                out.u[i] = su / sw;
                out.v[i] = sv / sw;
                out.status[i].flags.insert(StatusFlags::SMOOTHED);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::VectorStatus;
    use crate::grid::InterrogationGrid;

    fn field_with(u: f32, v: f32) -> VectorField {
        let grid = InterrogationGrid::build((96, 64), (16, 16), (8, 8)).unwrap();
        let mut field = VectorField::from_grid(&grid);
        field.u.fill(u);
        field.v.fill(v);
        field
    }

    #[test]
    fn kernel_radius_is_three_sigma() {
        let k = gaussian_kernel(1.0);
        assert_eq!(k.len(), 7);
        assert_eq!(k[3], 1.0);
        assert_eq!(gaussian_kernel(0.5).len(), 5);
    }

    #[test]
    fn uniform_field_is_unchanged() {
        let field = field_with(1.25, -3.5);
        let smoothed = smooth_field(&field, &SmoothingOptions::default());
        for i in 0..field.len() {
            assert!((smoothed.u[i] - 1.25).abs() < 1e-5);
            assert!((smoothed.v[i] + 3.5).abs() < 1e-5);
        }
        assert_eq!(smoothed.count_flag(StatusFlags::SMOOTHED), field.len());
    }

    #[test]
    fn masked_vectors_do_not_leak() {
        let mut field = field_with(1.0, 0.0);
        let i = field.index(4, 3);
        field.status[i] = VectorStatus::masked(StatusFlags::MASKED);
        field.u[i] = 100.0;
        let smoothed = smooth_field(&field, &SmoothingOptions::default());
        assert_eq!(smoothed.u[i], 100.0);
        assert!(!smoothed.status[i].flags.contains(StatusFlags::SMOOTHED));
        let neighbor = field.index(5, 3);
        assert!((smoothed.u[neighbor] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn spike_is_attenuated_and_disabled_is_identity() {
        let mut field = field_with(0.0, 0.0);
        let i = field.index(5, 3);
        field.u[i] = 1.0;
        let smoothed = smooth_field(&field, &SmoothingOptions::default());
        assert!(smoothed.u[i] < 0.5 && smoothed.u[i] > 0.0);
        assert!(smoothed.u[field.index(6, 3)] > 0.0);

        let off = SmoothingOptions {
            method: SmoothMethod::None,
            sigma: 1.0,
        };
        assert_eq!(smooth_field(&field, &off), field);
    }
}
