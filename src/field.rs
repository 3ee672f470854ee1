//! Displacement field on an interrogation grid.
//!
//! A [`VectorField`] stores one vector per grid point in parallel row-major
//! arrays. Every vector carries a [`VectorStatus`]: an origin tag saying how
//! its value came about plus a set of flags recording what happened to it
//! along the pipeline.
use crate::grid::InterrogationGrid;
use serde::Serialize;

/// How a vector's current value was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Measured,
    Replaced,
    /// Under the mask or without a usable correlation.
    Masked,
}

/// Bit set of per-vector status flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StatusFlags(u8);

impl StatusFlags {
    pub const EMPTY: Self = Self(0);
    pub const MASKED: Self = Self(1);
    pub const CC_FAILED: Self = Self(1 << 1);
    pub const PEAK_FAILED: Self = Self(1 << 2);
    pub const SPURIOUS: Self = Self(1 << 3);
    pub const REPLACED: Self = Self(1 << 4);
    pub const SMOOTHED: Self = Self(1 << 5);

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for StatusFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct VectorStatus {
    pub origin: Origin,
    pub flags: StatusFlags,
}

impl VectorStatus {
    pub fn measured() -> Self {
        Self {
            origin: Origin::Measured,
            flags: StatusFlags::EMPTY,
        }
    }

    pub fn masked(flags: StatusFlags) -> Self {
        Self {
            origin: Origin::Masked,
            flags,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorField {
    pub nx: usize,
    pub ny: usize,
    /// Grid point x positions (pixels).
    pub x: Vec<f32>,
    /// Grid point y positions (pixels).
    pub y: Vec<f32>,
    /// Displacement along x (pixels).
    pub u: Vec<f32>,
    /// Displacement along y (pixels).
    pub v: Vec<f32>,
    pub status: Vec<VectorStatus>,
    /// Normalized correlation peak height.
    pub peak: Vec<f32>,
    /// Peak-to-secondary-peak ratio.
    pub quality: Vec<f32>,
}

impl VectorField {
    /// Zero field of measured vectors at the points of `grid`.
    pub fn from_grid(grid: &InterrogationGrid) -> Self {
        let n = grid.len();
        Self {
            nx: grid.nx,
            ny: grid.ny,
            x: grid.iter().map(|p| p.x).collect(),
            y: grid.iter().map(|p| p.y).collect(),
            u: vec![0.0; n],
            v: vec![0.0; n],
            status: vec![VectorStatus::measured(); n],
            peak: vec![0.0; n],
            quality: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.u.len()
    }

    pub fn is_empty(&self) -> bool {
        self.u.is_empty()
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.nx + ix
    }

    /// Measured and not flagged spurious.
    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        let status = self.status[i];
        status.origin == Origin::Measured && !status.flags.contains(StatusFlags::SPURIOUS)
    }

    pub fn count_origin(&self, origin: Origin) -> usize {
        self.status.iter().filter(|s| s.origin == origin).count()
    }

    pub fn count_flag(&self, flag: StatusFlags) -> usize {
        self.status.iter().filter(|s| s.flags.contains(flag)).count()
    }

    pub fn has_nan(&self) -> bool {
        self.u.iter().chain(&self.v).any(|d| d.is_nan())
    }

    pub fn magnitude(&self) -> Vec<f32> {
        self.u
            .iter()
            .zip(&self.v)
            .map(|(&u, &v)| u.hypot(v))
            .collect()
    }

    /// Out-of-plane vorticity `∂v/∂x − ∂u/∂y` in 1/pixel.
    ///
    /// Central differences inside the grid, one-sided at the border; zero
    /// along an axis with a single point.
    pub fn vorticity(&self) -> Vec<f32> {
        let (dx, dy) = self.spacing();
        let mut out = vec![0.0; self.len()];
        for iy in 0..self.ny {
            for ix in 0..self.nx {
                let dvdx = if self.nx > 1 {
                    let (a, b) = (ix.saturating_sub(1), (ix + 1).min(self.nx - 1));
                    (self.v[self.index(b, iy)] - self.v[self.index(a, iy)])
                        / ((b - a) as f32 * dx)
                } else {
                    0.0
                };
                let dudy = if self.ny > 1 {
                    let (a, b) = (iy.saturating_sub(1), (iy + 1).min(self.ny - 1));
                    (self.u[self.index(ix, b)] - self.u[self.index(ix, a)])
                        / ((b - a) as f32 * dy)
                } else {
                    0.0
                };
                out[self.index(ix, iy)] = dvdx - dudy;
            }
        }
        out
    }

    /// Mean displacement over vectors that are not masked.
    pub fn mean_displacement(&self) -> Option<(f32, f32)> {
        let (mut su, mut sv, mut count) = (0.0f64, 0.0f64, 0usize);
        for i in 0..self.len() {
            if self.status[i].origin == Origin::Masked || self.u[i].is_nan() || self.v[i].is_nan()
            {
                continue;
            }
            su += self.u[i] as f64;
            sv += self.v[i] as f64;
            count += 1;
        }
        (count > 0).then(|| ((su / count as f64) as f32, (sv / count as f64) as f32))
    }

    /// Grid spacing `(dx, dy)` in pixels; 1 along an axis with a single point.
    pub fn spacing(&self) -> (f32, f32) {
        let dx = if self.nx > 1 { self.x[1] - self.x[0] } else { 1.0 };
        let dy = if self.ny > 1 {
            self.y[self.nx] - self.y[0]
        } else {
            1.0
        };
        (dx, dy)
    }

    /// Continuous view of the field for predictor lookups.
    pub fn sampler(&self) -> FieldSampler<'_> {
        let (dx, dy) = self.spacing();
        FieldSampler {
            field: self,
            x0: self.x.first().copied().unwrap_or(0.0),
            y0: self.y.first().copied().unwrap_or(0.0),
            dx,
            dy,
        }
    }
}

/// Bilinear interpolation of `(u, v)` between grid points, clamped to the
/// outermost points beyond the grid.
pub struct FieldSampler<'a> {
    field: &'a VectorField,
    x0: f32,
    y0: f32,
    dx: f32,
    dy: f32,
}

impl FieldSampler<'_> {
    pub fn sample(&self, x: f32, y: f32) -> (f32, f32) {
        let f = self.field;
        if f.is_empty() {
            return (0.0, 0.0);
        }
        let (ix0, ix1, tx) = axis_cell((x - self.x0) / self.dx, f.nx);
        let (iy0, iy1, ty) = axis_cell((y - self.y0) / self.dy, f.ny);
        let i00 = f.index(ix0, iy0);
        let i10 = f.index(ix1, iy0);
        let i01 = f.index(ix0, iy1);
        let i11 = f.index(ix1, iy1);
        let lerp2 = |c: &[f32]| {
            let top = c[i00] + (c[i10] - c[i00]) * tx;
            let bottom = c[i01] + (c[i11] - c[i01]) * tx;
            top + (bottom - top) * ty
        };
        (lerp2(&f.u), lerp2(&f.v))
    }
}

#[inline]
fn axis_cell(t: f32, n: usize) -> (usize, usize, f32) {
    let t = t.clamp(0.0, (n - 1) as f32);
    let i0 = (t.floor() as usize).min(n - 1);
    let i1 = (i0 + 1).min(n - 1);
    (i0, i1, t - i0 as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_field() -> VectorField {
        let grid = InterrogationGrid::build((64, 48), (16, 16), (8, 8)).unwrap();
        let mut field = VectorField::from_grid(&grid);
        for i in 0..field.len() {
            field.u[i] = 0.1 * field.y[i];
            field.v[i] = -0.05 * field.x[i] + 1.0;
        }
        field
    }

    #[test]
    fn flags_accumulate() {
        let mut flags = StatusFlags::MASKED;
        flags.insert(StatusFlags::REPLACED);
        assert!(flags.contains(StatusFlags::MASKED | StatusFlags::REPLACED));
        assert!(!flags.contains(StatusFlags::SPURIOUS));
        assert_eq!(flags.bits(), 17);
    }

    #[test]
    fn sampler_is_exact_on_linear_fields_and_clamps_outside() {
        let field = linear_field();
        let sampler = field.sampler();
        let (u, v) = sampler.sample(20.3, 17.9);
        assert!((u - 1.79).abs() < 1e-4);
        assert!((v - (1.0 - 0.05 * 20.3)).abs() < 1e-4);

        let (u_far, _) = sampler.sample(-100.0, -100.0);
        assert!((u_far - field.u[0]).abs() < 1e-6);
    }

    #[test]
    fn vorticity_of_linear_shear() {
        let field = linear_field();
        // dv/dx = -0.05, du/dy = 0.1
        for w in field.vorticity() {
            assert!((w + 0.15).abs() < 1e-4, "w={w}");
        }
        assert_eq!(field.magnitude().len(), field.len());
    }

    #[test]
    fn validity_and_counts_follow_status() {
        let mut field = linear_field();
        field.status[0] = VectorStatus::masked(StatusFlags::MASKED);
        field.status[1].flags.insert(StatusFlags::SPURIOUS);
        assert!(!field.is_valid(0));
        assert!(!field.is_valid(1));
        assert!(field.is_valid(2));
        assert_eq!(field.count_origin(Origin::Masked), 1);
        assert_eq!(field.count_flag(StatusFlags::SPURIOUS), 1);
        assert!(!field.has_nan());
        field.u[3] = f32::NAN;
        assert!(field.has_nan());
    }
}
