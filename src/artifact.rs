// Copyright 2022-2024 bift developers
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # IFT artifact
//!
//! The result of a completed search or single solve: the reported P(r) with
//! its real-space grid, the windowed measurement it was derived from, the
//! model intensity, and the scalar metadata (hyperparameters, I(0), R_g,
//! chi-squared). Serialization keys follow the established `.ift` metadata
//! naming so downstream consumers keep working.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Inverse-transform result.
///
/// Invariants: `p` and `r` have identical length `N + 2`; `p[0]` and
/// `p[N+1]` are exactly zero; `r` is strictly increasing from 0 to `dmax`;
/// `fit`, `i_orig`, `q_orig` and `err_orig` share the windowed measurement
/// length.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IftArtifact {
    /// Reported pair-distance distribution, endpoints pinned to zero.
    pub p: DVector<f64>,
    /// Real-space grid of `p`.
    pub r: DVector<f64>,
    /// Uncertainty placeholder for `p` (all ones).
    pub err_p: DVector<f64>,
    /// Windowed measured intensity.
    pub i_orig: DVector<f64>,
    /// Windowed scattering vector.
    pub q_orig: DVector<f64>,
    /// Windowed intensity errors.
    pub err_orig: DVector<f64>,
    /// Model intensity on `q_orig`.
    pub fit: DVector<f64>,
    /// Scalar metadata of the solve.
    pub info: IftInfo,
}

/// Scalar metadata attached to an [`IftArtifact`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IftInfo {
    /// Selected regularization strength (linear).
    pub alpha: f64,
    /// Selected maximum dimension.
    pub dmax: f64,
    /// Forward scattering intensity `4π·∫P dr`.
    #[serde(rename = "I0")]
    pub i0: f64,
    /// Reduced chi-squared of the fit.
    #[serde(rename = "ChiSquared")]
    pub chi_squared: f64,
    /// Radius of gyration.
    #[serde(rename = "Rg")]
    pub rg: f64,
    /// Log-evidence of the solve; populated by the single-solve path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<f64>,
    /// Measurement filename with its extension replaced by `.ift`.
    pub filename: String,
    /// Name of the producing algorithm, always `"BIFT"`.
    pub algorithm: String,
    /// Grid-search posterior surface; populated by the full-search path.
    #[serde(flatten, default)]
    pub grid: Option<GridInfo>,
}

/// The evidence surface explored by the grid stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridInfo {
    /// Evaluated maximum dimensions.
    pub dmax_points: DVector<f64>,
    /// Evaluated regularization strengths, as `ln(alpha)`.
    pub alpha_points: DVector<f64>,
    /// Negated log-evidence per grid cell, `dmax` rows by `alpha` columns.
    pub all_posteriors: DMatrix<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_trait_impl;

    test_trait_impl!(ift_artifact, IftArtifact);

    #[test]
    fn test_metadata_key_names() {
        let info = IftInfo {
            alpha: 1e4,
            dmax: 120.0,
            i0: 42.0,
            chi_squared: 1.1,
            rg: 46.5,
            evidence: None,
            filename: "lys.ift".to_string(),
            algorithm: "BIFT".to_string(),
            grid: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["I0"], 42.0);
        assert_eq!(json["ChiSquared"], 1.1);
        assert_eq!(json["Rg"], 46.5);
        assert_eq!(json["algorithm"], "BIFT");
        assert!(json.get("evidence").is_none());
        assert!(json.get("all_posteriors").is_none());
    }

    #[test]
    fn test_grid_metadata_flattens() {
        let info = IftInfo {
            alpha: 1e4,
            dmax: 120.0,
            i0: 42.0,
            chi_squared: 1.1,
            rg: 46.5,
            evidence: None,
            filename: "lys.ift".to_string(),
            algorithm: "BIFT".to_string(),
            grid: Some(GridInfo {
                dmax_points: DVector::from_column_slice(&[10.0, 400.0]),
                alpha_points: DVector::from_column_slice(&[1.0, 2.0, 3.0]),
                all_posteriors: DMatrix::zeros(2, 3),
            }),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("dmax_points").is_some());
        assert!(json.get("alpha_points").is_some());
        assert!(json.get("all_posteriors").is_some());
        assert!(json.get("grid").is_none());

        let back: IftInfo = serde_json::from_value(json).unwrap();
        let grid = back.grid.unwrap();
        assert_eq!(grid.all_posteriors.shape(), (2, 3));
    }
}
