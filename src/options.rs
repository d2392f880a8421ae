use crate::error::SimplifyError;
use serde::{Deserialize, Serialize};

/// Strategy used to place the single representative point of a cluster.
///
/// Marked non-exhaustive so further strategies (e.g. center of the minimum
/// bounding circle) can be added without touching the other pipeline stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum CenterStrategy {
    /// Geometric centroid of the core face only. Ignores adjacent faces.
    #[default]
    Centroid,
    /// Arithmetic mean of every exterior-ring coordinate across all parts of
    /// the cluster. More representative when adjacent faces skew the shape.
    Mean,
}

/// Tuning knobs for the roundabout collapse pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimplifyOptions {
    /// Minimum circular compactness (4·π·area / perimeter²) for a face to
    /// qualify as a roundabout core.
    pub circom_threshold: f64,
    /// Percentile in [0, 1] over the areas of the full face population; core
    /// faces must fall strictly below the resulting area threshold.
    pub area_percentile: f64,
    /// Absorb qualifying adjacent faces into each cluster.
    pub include_adjacent: bool,
    pub center_strategy: CenterStrategy,
    /// Deflection tolerance in degrees for stroke continuity. 0 chains only
    /// colinear segments.
    pub angle_threshold: f64,
    /// Quantization step, in coordinate units, for connector bundling and
    /// stroke node keys.
    pub snap_grid: f64,
    /// Fail on recoverable per-record defects instead of warning.
    pub strict: bool,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            circom_threshold: 0.7,
            area_percentile: 0.85,
            include_adjacent: true,
            center_strategy: CenterStrategy::default(),
            angle_threshold: 0.0,
            snap_grid: 1e-6,
            strict: false,
        }
    }
}

impl SimplifyOptions {
    pub(crate) fn validate(&self) -> Result<(), SimplifyError> {
        if !self.area_percentile.is_finite() || !(0.0..=1.0).contains(&self.area_percentile) {
            return Err(SimplifyError::InvalidOptions(format!(
                "area_percentile must be in [0, 1], got {}",
                self.area_percentile
            )));
        }
        if !self.circom_threshold.is_finite() {
            return Err(SimplifyError::InvalidOptions(
                "circom_threshold must be finite".into(),
            ));
        }
        if !self.angle_threshold.is_finite() || self.angle_threshold < 0.0 {
            return Err(SimplifyError::InvalidOptions(format!(
                "angle_threshold must be a non-negative angle in degrees, got {}",
                self.angle_threshold
            )));
        }
        if !(self.snap_grid.is_finite() && self.snap_grid > 0.0) {
            return Err(SimplifyError::InvalidOptions(format!(
                "snap_grid must be a positive coordinate step, got {}",
                self.snap_grid
            )));
        }
        Ok(())
    }
}
