//! Error types surfaced by the analysis entry points.
//!
//! Only structural problems propagate to the caller: malformed parameters
//! ([`ConfigError`]) and mismatched input dimensions ([`ShapeError`]).
//! Numerical trouble inside a pass (flat patches, missing peaks, outliers) is
//! recorded in the vector status and repaired by the replacement stage.

use thiserror::Error;

/// Malformed or inconsistent analysis parameters.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no interrogation passes configured")]
    NoPasses,
    #[error("per-pass list `{name}` has {actual} entries, expected {expected}")]
    PassListLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("`{name}` must be positive in pass {pass}")]
    NonPositive { name: &'static str, pass: usize },
    #[error("interrogation area {area_w}x{area_h} exceeds image {image_w}x{image_h}")]
    AreaExceedsImage {
        area_w: usize,
        area_h: usize,
        image_w: usize,
        image_h: usize,
    },
    #[error("interrogation area must be non-empty, got {area_w}x{area_h}")]
    EmptyArea { area_w: usize, area_h: usize },
    #[error("interrogation step must be positive, got {step_x}x{step_y}")]
    ZeroStep { step_x: usize, step_y: usize },
    #[error("`{name}` has invalid value {value}")]
    InvalidValue { name: &'static str, value: f32 },
    #[error("unknown {kind} `{name}`")]
    UnknownMethod { kind: &'static str, name: String },
}

/// Dimension mismatch between inputs.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("image pair mismatch: first is {first_w}x{first_h}, second is {second_w}x{second_h}")]
    ImagePair {
        first_w: usize,
        first_h: usize,
        second_w: usize,
        second_h: usize,
    },
    #[error("mask is {mask_w}x{mask_h}, images are {image_w}x{image_h}")]
    Mask {
        mask_w: usize,
        mask_h: usize,
        image_w: usize,
        image_h: usize,
    },
    #[error("buffer holds {actual} samples, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Any error returned by [`analyze_image_pair`](crate::analyze_image_pair).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PivError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}
