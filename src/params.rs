//! Parameter types configuring the analysis passes.
//!
//! [`PivParams`] mirrors the flat, string-keyed parameter set used by PIV
//! tooling (`ia_*` interrogation, `cc_*` correlation, `vl_*` validation,
//! `rp_*` replacement, `sm_*` smoothing). Method names are parsed into enums
//! when the parameters are deserialized or parsed, and [`PivParams::validate`]
//! turns the whole set into an [`AnalysisPlan`] before any pass runs.
//!
//! Defaults follow a common three-pass setup (64 → 32 → 16 px areas at 50 %
//! overlap) with spline window deformation.

use crate::correlation::CorrelationOptions;
use crate::error::ConfigError;
use crate::smooth::SmoothingOptions;
use crate::validate::ValidationOptions;
use serde::{Deserialize, Serialize};

/// Generates name parsing/printing for a closed set of methods.
macro_rules! named_methods {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(ConfigError::UnknownMethod {
                        kind: $kind,
                        name: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(method: $ty) -> Self {
                method.as_str().to_string()
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// How the second-image patch is formed from the predictor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InterrogationMethod {
    /// Co-located patches, predictor ignored.
    ///
    /// Particle pairs leave the window as the displacement grows, so keep the
    /// displacement small against the final pass's area (a quarter of it at
    /// most) or use one of the predictor-driven methods.
    Basic,
    /// Patches shifted by the rounded predictor.
    Offset,
    /// Patches resampled along the continuous predictor field.
    DeformedSpline,
}

named_methods!(InterrogationMethod, "interrogation method", {
    Basic => "basic",
    Offset => "offset",
    DeformedSpline => "deformed-spline" | "defspline" | "deformed_spline",
});

/// Weighting applied to both patches before correlation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WindowFunction {
    Uniform,
    Welch,
    Hanning,
    Parzen,
    Gaussian,
}

named_methods!(WindowFunction, "correlation window", {
    Uniform => "uniform" | "none",
    Welch => "welch",
    Hanning => "hanning" | "hann",
    Parzen => "parzen",
    Gaussian => "gaussian",
});

/// Sub-pixel peak estimator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SubpixelMethod {
    /// Independent three-point Gaussian fits along x and y.
    Gauss3x2p,
    /// Independent three-point parabolic fits along x and y.
    Parabolic,
    /// Least-squares 2D Gaussian over the 3×3 neighborhood.
    Gauss2d,
}

named_methods!(SubpixelMethod, "sub-pixel method", {
    Gauss3x2p => "gauss3x2p" | "gauss",
    Parabolic => "parabolic",
    Gauss2d => "gauss2d",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReplaceMethod {
    /// Axis-wise linear interpolation between the nearest valid vectors.
    Linear,
    /// Copy of the nearest valid vector.
    Nearest,
}

named_methods!(ReplaceMethod, "replacement method", {
    Linear => "linear",
    Nearest => "nearest",
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SmoothMethod {
    None,
    Gaussian,
}

named_methods!(SmoothMethod, "smoothing method", {
    None => "none" | "off",
    Gaussian => "gaussian",
});

/// Flat parameter set for a full analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PivParams {
    /// Interrogation area width per pass (pixels).
    pub ia_size_x: Vec<usize>,
    /// Interrogation area height per pass (pixels).
    pub ia_size_y: Vec<usize>,
    /// Horizontal spacing of area centers per pass (pixels).
    pub ia_step_x: Vec<usize>,
    /// Vertical spacing of area centers per pass (pixels).
    pub ia_step_y: Vec<usize>,
    pub ia_method: InterrogationMethod,
    pub cc_window: WindowFunction,
    /// Subtract each patch's mean before correlating.
    pub cc_remove_ia_mean: bool,
    /// Largest accepted peak displacement as a fraction of the area size.
    pub cc_max_displacement: f32,
    pub cc_subpixel: SubpixelMethod,
    /// Normalized median test threshold.
    pub vl_thresh: f32,
    /// Floor for the neighborhood median absolute deviation (pixels).
    pub vl_eps: f32,
    /// Neighborhood radius of the median test (grid cells).
    pub vl_dist: usize,
    /// Number of median test iterations per validation run.
    pub vl_passes: usize,
    /// Minimum number of valid neighbors needed to judge a vector.
    pub vl_min_neighbors: usize,
    /// Validate and replace once more after the final smoothing.
    pub vl_after_smoothing: bool,
    pub rp_method: ReplaceMethod,
    pub sm_method: SmoothMethod,
    /// Gaussian smoothing width (grid cells).
    pub sm_sigma: f32,
    /// Also smooth every intermediate predictor field.
    pub sm_each_pass: bool,
}

impl Default for PivParams {
    fn default() -> Self {
        Self {
            ia_size_x: vec![64, 32, 16],
            ia_size_y: vec![64, 32, 16],
            ia_step_x: vec![32, 16, 8],
            ia_step_y: vec![32, 16, 8],
            ia_method: InterrogationMethod::DeformedSpline,
            cc_window: WindowFunction::Welch,
            cc_remove_ia_mean: true,
            cc_max_displacement: 0.5,
            cc_subpixel: SubpixelMethod::Gauss3x2p,
            vl_thresh: 2.0,
            vl_eps: 0.1,
            vl_dist: 1,
            vl_passes: 2,
            vl_min_neighbors: 3,
            vl_after_smoothing: true,
            rp_method: ReplaceMethod::Linear,
            sm_method: SmoothMethod::Gaussian,
            sm_sigma: 1.0,
            sm_each_pass: false,
        }
    }
}

/// Configuration of a single interrogation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PassParameters {
    pub area_x: usize,
    pub area_y: usize,
    pub step_x: usize,
    pub step_y: usize,
    pub method: InterrogationMethod,
    pub window: WindowFunction,
}

/// Validated, typed form of [`PivParams`] consumed by the analyzer.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisPlan {
    pub passes: Vec<PassParameters>,
    pub correlation: CorrelationOptions,
    pub validation: ValidationOptions,
    pub replacement: ReplaceMethod,
    pub smoothing: SmoothingOptions,
    pub smooth_each_pass: bool,
    pub revalidate_after_smoothing: bool,
}

impl PivParams {
    /// Parameters with a single pass of the given area and step.
    pub fn single_pass(area: usize, step: usize) -> Self {
        Self {
            ia_size_x: vec![area],
            ia_size_y: vec![area],
            ia_step_x: vec![step],
            ia_step_y: vec![step],
            ..Self::default()
        }
    }

    /// Replace the pass schedule with square areas and steps.
    pub fn with_passes(mut self, sizes: &[usize], steps: &[usize]) -> Self {
        self.ia_size_x = sizes.to_vec();
        self.ia_size_y = sizes.to_vec();
        self.ia_step_x = steps.to_vec();
        self.ia_step_y = steps.to_vec();
        self
    }

    /// Check consistency and build the typed per-stage configuration.
    pub fn validate(&self) -> Result<AnalysisPlan, ConfigError> {
        let count = self.ia_size_x.len();
        if count == 0 {
            return Err(ConfigError::NoPasses);
        }
        for (name, list) in [
            ("ia_size_y", &self.ia_size_y),
            ("ia_step_x", &self.ia_step_x),
            ("ia_step_y", &self.ia_step_y),
        ] {
            if list.len() != count {
                return Err(ConfigError::PassListLength {
                    name,
                    expected: count,
                    actual: list.len(),
                });
            }
        }

        let mut passes = Vec::with_capacity(count);
        for pass in 0..count {
            let pass_params = PassParameters {
                area_x: self.ia_size_x[pass],
                area_y: self.ia_size_y[pass],
                step_x: self.ia_step_x[pass],
                step_y: self.ia_step_y[pass],
                method: self.ia_method,
                window: self.cc_window,
            };
            for (name, value) in [
                ("ia_size_x", pass_params.area_x),
                ("ia_size_y", pass_params.area_y),
                ("ia_step_x", pass_params.step_x),
                ("ia_step_y", pass_params.step_y),
            ] {
                if value == 0 {
                    return Err(ConfigError::NonPositive { name, pass });
                }
            }
            passes.push(pass_params);
        }

        require_positive("cc_max_displacement", self.cc_max_displacement)?;
        require_positive("vl_thresh", self.vl_thresh)?;
        if !self.vl_eps.is_finite() || self.vl_eps < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "vl_eps",
                value: self.vl_eps,
            });
        }
        for (name, value) in [
            ("vl_dist", self.vl_dist),
            ("vl_passes", self.vl_passes),
            ("vl_min_neighbors", self.vl_min_neighbors),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositive { name, pass: 0 });
            }
        }
        if self.sm_method == SmoothMethod::Gaussian {
            require_positive("sm_sigma", self.sm_sigma)?;
        }

        Ok(AnalysisPlan {
            passes,
            correlation: CorrelationOptions {
                remove_mean: self.cc_remove_ia_mean,
                max_displacement: self.cc_max_displacement,
                subpixel: self.cc_subpixel,
            },
            validation: ValidationOptions {
                threshold: self.vl_thresh,
                epsilon: self.vl_eps,
                radius: self.vl_dist,
                iterations: self.vl_passes,
                min_neighbors: self.vl_min_neighbors,
            },
            replacement: self.rp_method,
            smoothing: SmoothingOptions {
                method: self.sm_method,
                sigma: self.sm_sigma,
            },
            smooth_each_pass: self.sm_each_pass,
            revalidate_after_smoothing: self.vl_after_smoothing,
        })
    }
}

fn require_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_into_three_passes() {
        let plan = PivParams::default().validate().unwrap();
        assert_eq!(plan.passes.len(), 3);
        assert_eq!(plan.passes[2].area_x, 16);
        assert_eq!(plan.passes[0].step_y, 32);
        assert_eq!(plan.passes[1].method, InterrogationMethod::DeformedSpline);
        assert!(plan.revalidate_after_smoothing);
    }

    #[test]
    fn mismatched_lists_are_rejected() {
        let params = PivParams {
            ia_step_y: vec![32, 16],
            ..PivParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigError::PassListLength {
                name: "ia_step_y",
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn zero_sizes_and_bad_thresholds_are_rejected() {
        let params = PivParams {
            ia_size_x: vec![64, 0, 16],
            ..PivParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigError::NonPositive {
                name: "ia_size_x",
                pass: 1
            })
        );

        let params = PivParams {
            vl_thresh: -1.0,
            ..PivParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::InvalidValue {
                name: "vl_thresh",
                ..
            })
        ));

        let params = PivParams {
            sm_sigma: 0.0,
            ..PivParams::default()
        };
        assert!(params.validate().is_err());
        let params = PivParams {
            sm_sigma: 0.0,
            sm_method: SmoothMethod::None,
            ..PivParams::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn method_names_parse_once() {
        assert_eq!(
            "defspline".parse::<InterrogationMethod>(),
            Ok(InterrogationMethod::DeformedSpline)
        );
        assert_eq!("Welch".parse::<WindowFunction>(), Ok(WindowFunction::Welch));
        assert_eq!(
            "spline".parse::<ReplaceMethod>(),
            Err(ConfigError::UnknownMethod {
                kind: "replacement method",
                name: "spline".to_string()
            })
        );
    }

    #[test]
    fn json_round_trip_uses_method_names() {
        let json = r#"{
            "ia_size_x": [32, 16],
            "ia_size_y": [32, 16],
            "ia_step_x": [16, 8],
            "ia_step_y": [16, 8],
            "ia_method": "offset",
            "cc_window": "uniform",
            "sm_method": "none"
        }"#;
        let params: PivParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.ia_method, InterrogationMethod::Offset);
        assert_eq!(params.sm_method, SmoothMethod::None);
        assert_eq!(params.vl_thresh, 2.0);

        let out = serde_json::to_value(&params).unwrap();
        assert_eq!(out["ia_method"], "offset");
        assert_eq!(out["cc_window"], "uniform");

        let bad = r#"{ "rp_method": "kriging" }"#;
        let err = serde_json::from_str::<PivParams>(bad).unwrap_err();
        assert!(err.to_string().contains("unknown replacement method"));
    }
}
