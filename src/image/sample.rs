//! Sub-pixel intensity sampling with edge clamping.
//!
//! Coordinates refer to pixel centers: `(0.0, 0.0)` is the center of the
//! top-left pixel. Samples outside the image repeat the nearest edge pixel.
use super::ImageF32;

/// Cubic-spline (Catmull-Rom) interpolation over the 4×4 neighborhood.
///
/// Interpolating: integer coordinates return the pixel value exactly.
pub fn sample_cubic(img: &ImageF32, x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let wx = catmull_rom_weights(x - x0);
    let wy = catmull_rom_weights(y - y0);
    let (xi, yi) = (x0 as isize, y0 as isize);

    let mut acc = 0.0f32;
    for (j, &wyj) in wy.iter().enumerate() {
        let sy = yi + j as isize - 1;
        let mut row_acc = 0.0f32;
        for (i, &wxi) in wx.iter().enumerate() {
            row_acc += wxi * img.get_clamped(xi + i as isize - 1, sy);
        }
        acc += wyj * row_acc;
    }
    acc
}

/// Weights of the taps at offsets -1, 0, 1, 2 for fractional position `t`.
#[inline]
fn catmull_rom_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}
