//! Boolean exclusion mask (`true` = pixel excluded from analysis).
use crate::error::ShapeError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<bool>,
}

impl Mask {
    /// Mask of size `w × h` with no excluded pixels.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![false; w * h],
        }
    }

    pub fn from_vec(w: usize, h: usize, data: Vec<bool>) -> Result<Self, ShapeError> {
        let expected = w * h;
        if data.len() != expected {
            return Err(ShapeError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { w, h, data })
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x]
    }

    /// Mark the rectangle `[x0, x0 + w) × [y0, y0 + h)` as excluded, clipped
    /// to the mask extents.
    pub fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize) {
        let x1 = (x0 + w).min(self.w);
        let y1 = (y0 + h).min(self.h);
        for y in y0.min(self.h)..y1 {
            let row = &mut self.data[y * self.w..(y + 1) * self.w];
            for px in &mut row[x0.min(x1)..x1] {
                *px = true;
            }
        }
    }

    /// Number of excluded pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&m| m).count()
    }
}

impl crate::image::traits::ImageView for Mask {
    type Pixel = bool;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[bool] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageView;

    #[test]
    fn fill_rect_clips_to_extents() {
        let mut mask = Mask::new(4, 3);
        mask.fill_rect(2, 1, 10, 10);
        assert_eq!(mask.count(), 4);
        assert!(mask.get(3, 2));
        assert!(!mask.get(1, 1));
    }

    #[test]
    fn rows_expose_excluded_pixels() {
        let mut mask = Mask::new(3, 2);
        mask.fill_rect(1, 1, 1, 1);
        let rows: Vec<&[bool]> = mask.rows().collect();
        assert_eq!(rows, vec![&[false, false, false][..], &[false, true, false][..]]);
    }
}
