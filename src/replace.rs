//! Replacement of invalid vectors.
//!
//! Estimates are always drawn from the valid vectors of the input field, so a
//! replaced vector never feeds another replacement within the same run.
use crate::field::{Origin, StatusFlags, VectorField};
use crate::params::ReplaceMethod;
use log::warn;

#[derive(Clone, Debug)]
pub struct ReplaceOutcome {
    pub field: VectorField,
    /// Number of vectors that received a new value.
    pub replaced: usize,
}

/// Fill every vector that is not valid (spurious, failed, masked) and has
/// not been replaced before.
///
/// Spurious and failed vectors become `Replaced`; masked vectors keep their
/// origin. Both gain the `REPLACED` flag. No displacement is NaN afterwards.
pub fn replace_invalid(field: &VectorField, method: ReplaceMethod) -> ReplaceOutcome {
    let mut out = field.clone();
    let valid: Vec<bool> = (0..field.len()).map(|i| field.is_valid(i)).collect();
    let sources: Vec<usize> = (0..field.len()).filter(|&i| valid[i]).collect();
    let targets: Vec<usize> = (0..field.len())
        .filter(|&i| !valid[i] && !field.status[i].flags.contains(StatusFlags::REPLACED))
        .collect();
    if targets.is_empty() {
        return ReplaceOutcome {
            field: out,
            replaced: 0,
        };
    }
    if sources.is_empty() {
        warn!(
            "replace_invalid: no valid vectors among {}, filling with zero",
            field.len()
        );
    }

    for &i in &targets {
        let (u, v) = if sources.is_empty() {
            (0.0, 0.0)
        } else {
            match method {
                ReplaceMethod::Linear => linear_estimate(field, &valid, i)
                    .unwrap_or_else(|| nearest_estimate(field, &sources, i)),
                ReplaceMethod::Nearest => nearest_estimate(field, &sources, i),
            }
        };
        out.u[i] = u;
        out.v[i] = v;
        let status = &mut out.status[i];
        if status.origin == Origin::Measured {
            status.origin = Origin::Replaced;
        }
        status.flags.insert(StatusFlags::REPLACED);
    }

    ReplaceOutcome {
        field: out,
        replaced: targets.len(),
    }
}

/// Nearest valid vector on each side of `i` along one axis.
struct AxisNeighbors {
    before: Option<(usize, usize)>,
    after: Option<(usize, usize)>,
}

impl AxisNeighbors {
    /// `(u, v)` and its weight: interpolated pairs are weighted by 1/span,
    /// single sides by 1/distance.
    fn estimate(&self, field: &VectorField) -> Option<AxisEstimate> {
        match (self.before, self.after) {
            (Some((a, da)), Some((b, db))) => {
                let span = (da + db) as f32;
                let wa = db as f32 / span;
                let wb = da as f32 / span;
                Some(AxisEstimate {
                    u: field.u[a] * wa + field.u[b] * wb,
                    v: field.v[a] * wa + field.v[b] * wb,
                    weight: 1.0 / span,
                    two_sided: true,
                })
            }
            (Some((j, d)), None) | (None, Some((j, d))) => Some(AxisEstimate {
                u: field.u[j],
                v: field.v[j],
                weight: 1.0 / d as f32,
                two_sided: false,
            }),
            (None, None) => None,
        }
    }
}

struct AxisEstimate {
    u: f32,
    v: f32,
    weight: f32,
    two_sided: bool,
}

fn linear_estimate(field: &VectorField, valid: &[bool], i: usize) -> Option<(f32, f32)> {
    let (ix, iy) = (i % field.nx, i / field.nx);
    let row = AxisNeighbors {
        before: first_valid(valid, (1..=ix).map(|d| (d, field.index(ix - d, iy)))),
        after: first_valid(valid, (1..field.nx - ix).map(|d| (d, field.index(ix + d, iy)))),
    };
    let column = AxisNeighbors {
        before: first_valid(valid, (1..=iy).map(|d| (d, field.index(ix, iy - d)))),
        after: first_valid(valid, (1..field.ny - iy).map(|d| (d, field.index(ix, iy + d)))),
    };

    let estimates: Vec<AxisEstimate> = [row.estimate(field), column.estimate(field)]
        .into_iter()
        .flatten()
        .collect();
    let any_two_sided = estimates.iter().any(|e| e.two_sided);
    let (mut su, mut sv, mut sw) = (0.0f32, 0.0f32, 0.0f32);
    for e in estimates.iter().filter(|e| e.two_sided || !any_two_sided) {
        su += e.u * e.weight;
        sv += e.v * e.weight;
        sw += e.weight;
    }
    (sw > 0.0).then(|| (su / sw, sv / sw))
}

/// First `(index, distance)` along `steps` (yielding `(distance, index)`) that
/// is valid.
fn first_valid(
    valid: &[bool],
    mut steps: impl Iterator<Item = (usize, usize)>,
) -> Option<(usize, usize)> {
    steps.find(|&(_, j)| valid[j]).map(|(d, j)| (j, d))
}

/// Nearest valid vector by grid distance; ties resolve to the first in
/// row-major order.
fn nearest_estimate(field: &VectorField, sources: &[usize], i: usize) -> (f32, f32) {
    let (ix, iy) = ((i % field.nx) as isize, (i / field.nx) as isize);
    let mut best: Option<(isize, usize)> = None;
    for &j in sources {
        let dx = (j % field.nx) as isize - ix;
        let dy = (j / field.nx) as isize - iy;
        let d2 = dx * dx + dy * dy;
        if best.map_or(true, |(b, _)| d2 < b) {
            best = Some((d2, j));
        }
    }
    best.map_or((0.0, 0.0), |(_, j)| (field.u[j], field.v[j]))
}
