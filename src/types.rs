use crate::field::{Origin, VectorField};
use crate::params::PivParams;
use serde::Serialize;

/// Final displacement field of an analysis with summary counts.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivResult {
    pub field: VectorField,
    /// Number of vectors on the final grid.
    pub n: usize,
    /// Vectors under the mask or without a usable correlation.
    pub masked_n: usize,
    /// Vectors of the final grid flagged by the median test.
    pub spurious_n: usize,
    pub params: PivParams,
}

impl PivResult {
    pub fn measured_n(&self) -> usize {
        self.field.count_origin(Origin::Measured)
    }

    pub fn replaced_n(&self) -> usize {
        self.field.count_origin(Origin::Replaced)
    }
}
