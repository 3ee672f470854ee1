//! Interrogation grid construction.
//!
//! Areas never cross the image border: the lattice keeps only areas that fit
//! entirely inside the image and is centered, with the leftover margin split
//! evenly (the odd pixel goes to the right/bottom). Points are stored
//! row-major so indices stay stable for every consumer of a pass.
use crate::error::ConfigError;
use serde::Serialize;

/// One interrogation area of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GridPoint {
    /// Column index within the grid.
    pub ix: usize,
    /// Row index within the grid.
    pub iy: usize,
    /// Integer center row (`top + h/2`).
    pub row: usize,
    /// Integer center column (`left + w/2`).
    pub col: usize,
    /// Leftmost pixel column covered by the area.
    pub left: usize,
    /// Topmost pixel row covered by the area.
    pub top: usize,
    /// Geometric center of the area in pixel coordinates.
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InterrogationGrid {
    pub nx: usize,
    pub ny: usize,
    /// Area size `[w, h]`.
    pub area: [usize; 2],
    /// Center spacing `[sx, sy]`.
    pub step: [usize; 2],
    pub points: Vec<GridPoint>,
}

impl InterrogationGrid {
    /// Lay out areas of `area = (w, h)` every `step = (sx, sy)` pixels over an
    /// image of `image = (width, height)`.
    pub fn build(
        image: (usize, usize),
        area: (usize, usize),
        step: (usize, usize),
    ) -> Result<Self, ConfigError> {
        let (image_w, image_h) = image;
        let (area_w, area_h) = area;
        let (step_x, step_y) = step;
        if area_w == 0 || area_h == 0 {
            return Err(ConfigError::EmptyArea { area_w, area_h });
        }
        if step_x == 0 || step_y == 0 {
            return Err(ConfigError::ZeroStep { step_x, step_y });
        }
        if area_w > image_w || area_h > image_h {
            return Err(ConfigError::AreaExceedsImage {
                area_w,
                area_h,
                image_w,
                image_h,
            });
        }

        let (nx, left0) = axis_layout(image_w, area_w, step_x);
        let (ny, top0) = axis_layout(image_h, area_h, step_y);

        let mut points = Vec::with_capacity(nx * ny);
        for iy in 0..ny {
            let top = top0 + iy * step_y;
            for ix in 0..nx {
                let left = left0 + ix * step_x;
                points.push(GridPoint {
                    ix,
                    iy,
                    row: top + area_h / 2,
                    col: left + area_w / 2,
                    left,
                    top,
                    x: left as f32 + (area_w as f32 - 1.0) * 0.5,
                    y: top as f32 + (area_h as f32 - 1.0) * 0.5,
                });
            }
        }

        Ok(Self {
            nx,
            ny,
            area: [area_w, area_h],
            step: [step_x, step_y],
            points,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn index(&self, ix: usize, iy: usize) -> usize {
        iy * self.nx + ix
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GridPoint> {
        self.points.iter()
    }

    /// Center x coordinate of every grid column.
    pub fn xs(&self) -> Vec<f32> {
        self.points[..self.nx].iter().map(|p| p.x).collect()
    }

    /// Center y coordinate of every grid row.
    pub fn ys(&self) -> Vec<f32> {
        self.points.iter().step_by(self.nx).map(|p| p.y).collect()
    }
}

/// Number of areas along one axis and the offset of the first one.
fn axis_layout(extent: usize, area: usize, step: usize) -> (usize, usize) {
    let count = (extent - area) / step + 1;
    let used = (count - 1) * step + area;
    (count, (extent - used) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_covers_image_with_overlap() {
        let grid = InterrogationGrid::build((128, 96), (32, 32), (16, 16)).unwrap();
        assert_eq!(grid.nx, 7);
        assert_eq!(grid.ny, 5);
        assert_eq!(grid.len(), 35);
        let first = grid.points[0];
        assert_eq!((first.left, first.top), (0, 0));
        assert_eq!((first.col, first.row), (16, 16));
        assert_eq!(first.x, 15.5);
        let last = grid.points[grid.len() - 1];
        assert_eq!(last.left + 32, 128);
        assert_eq!(last.top + 32, 96);
        assert_eq!(grid.xs().len(), 7);
        assert_eq!(grid.ys(), vec![15.5, 31.5, 47.5, 63.5, 79.5]);
    }

    #[test]
    fn leftover_margin_is_centered() {
        let grid = InterrogationGrid::build((100, 40), (32, 16), (16, 8)).unwrap();
        // Five areas span 96 px, leaving a 4 px margin.
        assert_eq!(grid.nx, 5);
        assert_eq!(grid.points[0].left, 2);
        assert_eq!(grid.points[grid.nx - 1].left + 32, 98);
    }

    #[test]
    fn identical_inputs_give_identical_grids() {
        let a = InterrogationGrid::build((256, 200), (24, 16), (12, 8)).unwrap();
        let b = InterrogationGrid::build((256, 200), (24, 16), (12, 8)).unwrap();
        assert_eq!(a, b);
        for (i, p) in a.iter().enumerate() {
            assert_eq!(a.index(p.ix, p.iy), i);
        }
    }

    #[test]
    fn rejects_bad_geometry() {
        assert_eq!(
            InterrogationGrid::build((64, 64), (128, 16), (8, 8)),
            Err(ConfigError::AreaExceedsImage {
                area_w: 128,
                area_h: 16,
                image_w: 64,
                image_h: 64
            })
        );
        assert!(matches!(
            InterrogationGrid::build((64, 64), (16, 16), (0, 8)),
            Err(ConfigError::ZeroStep { .. })
        ));
        assert!(matches!(
            InterrogationGrid::build((64, 64), (0, 16), (8, 8)),
            Err(ConfigError::EmptyArea { .. })
        ));
    }
}
