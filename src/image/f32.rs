//! Owned single-channel f32 image in row-major layout (stride == width).
//!
//! Holds the intensity samples of one PIV recording. Provides row access,
//! edge-clamped reads for signed coordinates, and a contiguous slice.
use crate::error::ShapeError;

#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Number of f32 elements between consecutive rows (equals `w`)
    pub stride: usize,
    /// Backing storage in row-major order
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![0.0; w * h],
        }
    }

    /// Wrap a row-major buffer, checking that it holds exactly `w × h` samples.
    pub fn from_vec(w: usize, h: usize, data: Vec<f32>) -> Result<Self, ShapeError> {
        let expected = w * h;
        if data.len() != expected {
            return Err(ShapeError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            w,
            h,
            stride: w,
            data,
        })
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }
    #[inline]
    /// Get the pixel value at (x, y).
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.idx(x, y)]
    }
    #[inline]
    /// Set the pixel value at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Pixel read with coordinates clamped to the image extents.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let xi = x.clamp(0, self.w as isize - 1) as usize;
        let yi = y.clamp(0, self.h as isize - 1) as usize;
        self.get(xi, yi)
    }
}

impl crate::image::traits::ImageView for ImageF32 {
    type Pixel = f32;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

impl crate::image::traits::ImageViewMut for ImageF32 {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.stride;
        let end = start + self.w;
        &mut self.data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageView;

    #[test]
    fn from_vec_checks_length() {
        let err = ImageF32::from_vec(3, 2, vec![0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            ShapeError::BufferSize {
                expected: 6,
                actual: 5
            }
        );
        let img = ImageF32::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(img.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(img.rows().count(), 2);
    }

    #[test]
    fn clamped_reads_stay_inside() {
        let img = ImageF32::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(img.get_clamped(-5, 0), 1.0);
        assert_eq!(img.get_clamped(7, -1), 2.0);
        assert_eq!(img.get_clamped(9, 9), 4.0);
    }
}
