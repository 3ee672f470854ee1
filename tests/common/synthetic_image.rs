use piv_engine::image::{ImageF32, ImageViewMut, Mask};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Particles per pixel used by the generators.
pub const PARTICLE_DENSITY: f32 = 0.05;
/// Gaussian particle image radius (standard deviation, pixels).
pub const PARTICLE_SIGMA: f32 = 1.0;
/// Particles are seeded this far outside the frame so they can move in.
const MARGIN: f32 = 12.0;

/// Generates a recording pair of Gaussian particles where each particle moves
/// by `displacement(x, y)` between the first and the second image.
pub fn particle_pair_with<F>(
    width: usize,
    height: usize,
    seed: u64,
    displacement: F,
) -> (ImageF32, ImageF32)
where
    F: Fn(f32, f32) -> (f32, f32),
{
    assert!(width > 0 && height > 0, "image dimensions must be positive");

    let mut rng = StdRng::seed_from_u64(seed);
    let area = (width as f32 + 2.0 * MARGIN) * (height as f32 + 2.0 * MARGIN);
    let count = (area * PARTICLE_DENSITY).round() as usize;

    let mut first = ImageF32::new(width, height);
    let mut second = ImageF32::new(width, height);
    for _ in 0..count {
        let x = rng.random_range(-MARGIN..width as f32 + MARGIN);
        let y = rng.random_range(-MARGIN..height as f32 + MARGIN);
        let intensity = rng.random_range(0.5f32..1.0);
        let (dx, dy) = displacement(x, y);
        splat(&mut first, x, y, intensity);
        splat(&mut second, x + dx, y + dy, intensity);
    }
    (first, second)
}

/// Particle pair with a uniform translation `(u, v)`.
pub fn particle_pair(
    width: usize,
    height: usize,
    seed: u64,
    u: f32,
    v: f32,
) -> (ImageF32, ImageF32) {
    particle_pair_with(width, height, seed, |_, _| (u, v))
}

/// Mask excluding the rectangle `[x0, x0 + w) × [y0, y0 + h)`.
pub fn rect_mask(width: usize, height: usize, x0: usize, y0: usize, w: usize, h: usize) -> Mask {
    let mut mask = Mask::new(width, height);
    mask.fill_rect(x0, y0, w, h);
    mask
}

/// Add a Gaussian particle image centered at `(px, py)`.
fn splat(img: &mut ImageF32, px: f32, py: f32, intensity: f32) {
    let reach = (3.0 * PARTICLE_SIGMA).ceil() as isize;
    let (cx, cy) = (px.round() as isize, py.round() as isize);
    let x0 = (cx - reach).max(0);
    let x1 = (cx + reach + 1).min(img.w as isize);
    let two_s2 = 2.0 * PARTICLE_SIGMA * PARTICLE_SIGMA;
    for y in (cy - reach).max(0)..(cy + reach + 1).min(img.h as isize) {
        let dy = y as f32 - py;
        let row = img.row_mut(y as usize);
        for x in x0..x1 {
            let dx = x as f32 - px;
            row[x as usize] += intensity * (-(dx * dx + dy * dy) / two_s2).exp();
        }
    }
}
