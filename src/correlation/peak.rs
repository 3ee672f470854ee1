//! Peak search and sub-pixel refinement on a correlation plane.
//!
//! The plane is periodic (circular correlation), so neighbor lookups wrap
//! around its borders.
use crate::params::SubpixelMethod;
use nalgebra::{Matrix2, SMatrix, SVector, Vector2};

/// Correlation values arranged row-major with zero displacement at
/// `(w / 2, h / 2)`.
pub(crate) struct CorrelationPlane<'a> {
    pub w: usize,
    pub h: usize,
    pub data: &'a [f32],
}

impl CorrelationPlane<'_> {
    #[inline]
    fn at_wrapped(&self, x: isize, y: isize) -> f32 {
        let xi = x.rem_euclid(self.w as isize) as usize;
        let yi = y.rem_euclid(self.h as isize) as usize;
        self.data[yi * self.w + xi]
    }

    /// Index `(x, y)` of the highest finite value.
    pub fn argmax(&self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            if !v.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, b)| v > b) {
                best = Some((i, v));
            }
        }
        best.map(|(i, _)| (i % self.w, i / self.w))
    }

    /// Highest value outside the (circular) Chebyshev `radius` around `(px, py)`.
    pub fn secondary_peak(&self, px: usize, py: usize, radius: usize) -> Option<f32> {
        let mut best: Option<f32> = None;
        for y in 0..self.h {
            let dy = circular_distance(y, py, self.h);
            for x in 0..self.w {
                let dx = circular_distance(x, px, self.w);
                if dx <= radius && dy <= radius {
                    continue;
                }
                let v = self.data[y * self.w + x];
                if v.is_finite() && best.map_or(true, |b| v > b) {
                    best = Some(v);
                }
            }
        }
        best
    }

    /// Sub-pixel offset `(dx, dy)` of the peak relative to integer `(px, py)`.
    pub fn refine(&self, px: usize, py: usize, method: SubpixelMethod) -> (f32, f32) {
        let (x, y) = (px as isize, py as isize);
        let c = self.at_wrapped(x, y);
        let (xm, xp) = (self.at_wrapped(x - 1, y), self.at_wrapped(x + 1, y));
        let (ym, yp) = (self.at_wrapped(x, y - 1), self.at_wrapped(x, y + 1));
        match method {
            SubpixelMethod::Gauss3x2p => (gauss3(xm, c, xp), gauss3(ym, c, yp)),
            SubpixelMethod::Parabolic => (parabolic3(xm, c, xp), parabolic3(ym, c, yp)),
            SubpixelMethod::Gauss2d => self
                .gauss2d(x, y)
                .unwrap_or_else(|| (gauss3(xm, c, xp), gauss3(ym, c, yp))),
        }
    }

    /// Least-squares fit of `ln C = a0 + a1 x + a2 y + a3 x² + a4 xy + a5 y²`
    /// over the 3×3 neighborhood; returns the vertex of the fitted paraboloid.
    fn gauss2d(&self, x: isize, y: isize) -> Option<(f32, f32)> {
        let mut samples = [0.0f32; 9];
        for (k, sample) in samples.iter_mut().enumerate() {
            let dx = k as isize % 3 - 1;
            let dy = k as isize / 3 - 1;
            let v = self.at_wrapped(x + dx, y + dy);
            if v <= 0.0 {
                return None;
            }
            *sample = v.ln();
        }

        let design = SMatrix::<f32, 9, 6>::from_fn(|r, c| {
            let dx = (r % 3) as f32 - 1.0;
            let dy = (r / 3) as f32 - 1.0;
            match c {
                0 => 1.0,
                1 => dx,
                2 => dy,
                3 => dx * dx,
                4 => dx * dy,
                _ => dy * dy,
            }
        });
        let rhs = SVector::<f32, 9>::from_column_slice(&samples);
        let normal = design.transpose() * design;
        let coeffs = normal.lu().solve(&(design.transpose() * rhs))?;

        let hessian = Matrix2::new(2.0 * coeffs[3], coeffs[4], coeffs[4], 2.0 * coeffs[5]);
        // A maximum needs a negative-definite Hessian.
        if hessian[(0, 0)] >= 0.0 || hessian.determinant() <= 0.0 {
            return None;
        }
        let offset = hessian.try_inverse()? * -Vector2::new(coeffs[1], coeffs[2]);
        if !offset.iter().all(|v| v.is_finite() && v.abs() <= 1.0) {
            return None;
        }
        Some((offset[0], offset[1]))
    }
}

/// Three-point Gaussian vertex; falls back to a parabola when a sample is
/// not positive.
#[inline]
fn gauss3(minus: f32, center: f32, plus: f32) -> f32 {
    if minus <= 0.0 || center <= 0.0 || plus <= 0.0 {
        return parabolic3(minus, center, plus);
    }
    let (lm, lc, lp) = (minus.ln(), center.ln(), plus.ln());
    let denom = 2.0 * (lm - 2.0 * lc + lp);
    if denom >= 0.0 {
        return parabolic3(minus, center, plus);
    }
    let d = (lm - lp) / denom;
    if d.is_finite() {
        d
    } else {
        0.0
    }
}

#[inline]
fn parabolic3(minus: f32, center: f32, plus: f32) -> f32 {
    let denom = 2.0 * (minus - 2.0 * center + plus);
    if denom >= 0.0 {
        return 0.0;
    }
    let d = (minus - plus) / denom;
    if d.is_finite() {
        d.clamp(-0.5, 0.5)
    } else {
        0.0
    }
}

#[inline]
fn circular_distance(a: usize, b: usize, n: usize) -> usize {
    let d = a.abs_diff(b);
    d.min(n - d)
}
