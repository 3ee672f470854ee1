//! Normalized median test.
//!
//! Each measured vector is compared with the median of its neighbors;
//! the deviation is normalized by the neighbors' median absolute deviation,
//! floored at `epsilon` so that near-uniform regions do not flag noise.
use crate::field::{Origin, StatusFlags, VectorField};
use log::debug;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ValidationOptions {
    pub threshold: f32,
    /// Floor for the median absolute deviation (pixels).
    pub epsilon: f32,
    /// Chebyshev neighborhood radius in grid cells.
    pub radius: usize,
    pub iterations: usize,
    pub min_neighbors: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            threshold: 2.0,
            epsilon: 0.1,
            radius: 1,
            iterations: 2,
            min_neighbors: 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ValidationOutcome {
    pub field: VectorField,
    /// Vectors newly flagged by this run.
    pub spurious: usize,
}

/// Flag outliers with `SPURIOUS`, iterating `options.iterations` times.
///
/// Neighbors are measured or replaced vectors that are not spurious. Vectors
/// flagged by an earlier iteration no longer serve as neighbors.
pub fn median_test(field: &VectorField, options: &ValidationOptions) -> ValidationOutcome {
    let mut out = field.clone();
    let radius = options.radius as isize;
    let mut spurious = 0usize;
    let window = (2 * options.radius + 1).pow(2);
    let mut us: Vec<f32> = Vec::with_capacity(window);
    let mut vs: Vec<f32> = Vec::with_capacity(window);

    for iteration in 0..options.iterations {
        let mut flagged = Vec::new();
        for iy in 0..out.ny {
            for ix in 0..out.nx {
                let i = out.index(ix, iy);
                if !out.is_valid(i) {
                    continue;
                }
                us.clear();
                vs.clear();
                for dy in -radius..=radius {
                    for dx in -radius..=radius {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let (jx, jy) = (ix as isize + dx, iy as isize + dy);
                        if jx < 0 || jy < 0 || jx >= out.nx as isize || jy >= out.ny as isize {
                            continue;
                        }
                        let j = out.index(jx as usize, jy as usize);
                        if is_neighbor(&out, j) {
                            us.push(out.u[j]);
                            vs.push(out.v[j]);
                        }
                    }
                }
                if us.is_empty() || us.len() < options.min_neighbors {
                    continue;
                }
                if is_outlier(out.u[i], &mut us, options) || is_outlier(out.v[i], &mut vs, options)
                {
                    flagged.push(i);
                }
            }
        }

        debug!(
            "median_test iteration {} flagged {} vectors",
            iteration,
            flagged.len()
        );
        if flagged.is_empty() {
            break;
        }
        spurious += flagged.len();
        for i in flagged {
            out.status[i].flags.insert(StatusFlags::SPURIOUS);
        }
    }

    debug_assert!(out
        .status
        .iter()
        .all(|s| s.origin != Origin::Masked || !s.flags.contains(StatusFlags::SPURIOUS)));
    ValidationOutcome {
        field: out,
        spurious,
    }
}

fn is_neighbor(field: &VectorField, j: usize) -> bool {
    let status = field.status[j];
    status.origin != Origin::Masked && !status.flags.contains(StatusFlags::SPURIOUS)
}

fn is_outlier(value: f32, neighbors: &mut [f32], options: &ValidationOptions) -> bool {
    let med = median(neighbors);
    for n in neighbors.iter_mut() {
        *n = (*n - med).abs();
    }
    let mad = median(neighbors);
    (value - med).abs() > options.threshold * mad.max(options.epsilon)
}

/// Median of a non-empty slice; reorders the slice.
fn median(values: &mut [f32]) -> f32 {
    let mid = values.len() / 2;
    let (_, upper, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    let upper = *upper;
    if values.len() % 2 == 1 {
        upper
    } else {
        let lower = values[..mid]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        0.5 * (lower + upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::VectorStatus;
    use crate::grid::InterrogationGrid;

    fn uniform_field(u: f32, v: f32) -> VectorField {
        let grid = InterrogationGrid::build((96, 96), (16, 16), (8, 8)).unwrap();
        let mut field = VectorField::from_grid(&grid);
        field.u.fill(u);
        field.v.fill(v);
        field
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn single_outlier_is_flagged_alone() {
        let mut field = uniform_field(1.5, -0.5);
        let center = field.index(5, 5);
        field.u[center] = 6.0;
        let outcome = median_test(&field, &ValidationOptions::default());
        assert_eq!(outcome.spurious, 1);
        assert!(outcome.field.status[center]
            .flags
            .contains(StatusFlags::SPURIOUS));
        assert_eq!(outcome.field.count_flag(StatusFlags::SPURIOUS), 1);
    }

    #[test]
    fn small_noise_stays_below_epsilon_floor() {
        let mut field = uniform_field(2.0, 0.0);
        for (i, u) in field.u.iter_mut().enumerate() {
            *u += if i % 2 == 0 { 0.05 } else { -0.05 };
        }
        let outcome = median_test(&field, &ValidationOptions::default());
        assert_eq!(outcome.spurious, 0);
    }

    #[test]
    fn masked_vectors_are_never_spurious_nor_neighbors() {
        let mut field = uniform_field(1.0, 1.0);
        for ix in 0..field.nx {
            let i = field.index(ix, 3);
            field.status[i] = VectorStatus::masked(StatusFlags::MASKED);
            field.u[i] = f32::NAN;
            field.v[i] = f32::NAN;
        }
        let outcome = median_test(&field, &ValidationOptions::default());
        assert_eq!(outcome.spurious, 0);
        assert_eq!(outcome.field.count_origin(Origin::Masked), field.nx);
    }

    #[test]
    fn too_few_neighbors_leaves_vector_alone() {
        let mut field = uniform_field(0.0, 0.0);
        field.u[0] = 10.0;
        let options = ValidationOptions {
            min_neighbors: 4,
            ..Default::default()
        };
        // The corner has exactly three neighbors.
        let outcome = median_test(&field, &options);
        assert_eq!(outcome.spurious, 0);
    }

    #[test]
    fn isolated_vector_without_neighbors_is_skipped() {
        let mut field = uniform_field(1.0, 0.0);
        let center = field.index(4, 4);
        for i in 0..field.len() {
            if i != center {
                field.status[i] = VectorStatus::masked(StatusFlags::MASKED);
            }
        }
        let options = ValidationOptions {
            min_neighbors: 0,
            ..Default::default()
        };
        let outcome = median_test(&field, &options);
        assert_eq!(outcome.spurious, 0);
        assert!(outcome.field.is_valid(center));
    }

    #[test]
    fn replaced_vectors_count_as_neighbors() {
        let mut field = uniform_field(2.0, 0.0);
        let center = field.index(4, 4);
        field.u[center] = 8.0;
        // Only replaced vectors surround the measured center.
        for iy in 3..=5 {
            for ix in 3..=5 {
                let i = field.index(ix, iy);
                if i != center {
                    field.status[i].origin = Origin::Replaced;
                    field.status[i].flags.insert(StatusFlags::REPLACED);
                }
            }
        }
        let outcome = median_test(&field, &ValidationOptions::default());
        assert!(outcome.field.status[center]
            .flags
            .contains(StatusFlags::SPURIOUS));
        let replaced = field.index(3, 3);
        assert!(!outcome.field.status[replaced]
            .flags
            .contains(StatusFlags::SPURIOUS));
    }
}
