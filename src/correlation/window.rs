//! One-dimensional window weights; patches are weighted by the separable
//! product `w_x[i] · w_y[j]`.
use crate::params::WindowFunction;
use std::f32::consts::PI;

impl WindowFunction {
    /// Weights for a patch axis of `n` samples, centered at `(n - 1) / 2`.
    pub fn weights(self, n: usize) -> Vec<f32> {
        if n <= 1 {
            return vec![1.0; n];
        }
        let c = (n as f32 - 1.0) * 0.5;
        (0..n)
            .map(|i| {
                let d = i as f32 - c;
                match self {
                    Self::Uniform => 1.0,
                    Self::Welch => 1.0 - (d / c) * (d / c),
                    Self::Hanning => 0.5 - 0.5 * (2.0 * PI * i as f32 / (n as f32 - 1.0)).cos(),
                    Self::Parzen => {
                        let r = d.abs() / (c + 1.0);
                        if r <= 0.5 {
                            1.0 - 6.0 * r * r + 6.0 * r * r * r
                        } else {
                            2.0 * (1.0 - r).powi(3)
                        }
                    }
                    Self::Gaussian => {
                        let sigma = 0.4 * c;
                        (-0.5 * (d / sigma) * (d / sigma)).exp()
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welch_is_zero_at_edges_and_one_in_center() {
        let w = WindowFunction::Welch.weights(9);
        assert_eq!(w.len(), 9);
        assert!(w[0].abs() < 1e-6 && w[8].abs() < 1e-6);
        assert!((w[4] - 1.0).abs() < 1e-6);
        assert!((w[2] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn windows_are_symmetric_and_bounded() {
        for window in [
            WindowFunction::Uniform,
            WindowFunction::Welch,
            WindowFunction::Hanning,
            WindowFunction::Parzen,
            WindowFunction::Gaussian,
        ] {
            let w = window.weights(16);
            for i in 0..8 {
                assert!((w[i] - w[15 - i]).abs() < 1e-5, "{window} not symmetric");
            }
            assert!(w.iter().all(|&v| (0.0..=1.0 + 1e-6).contains(&v)));
        }
    }
}
